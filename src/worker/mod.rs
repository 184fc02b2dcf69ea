//! Fixed-size worker pool with ordered task numbering and optional
//! early-stop semantics. Every data-parallel loop in
//! this crate (bulk image operators, rasterization, SH evaluation, seeding,
//! EDT marching) is expressed as a call to [`WorkerPool::run`] or
//! [`WorkerPool::run_until`] rather than hand-rolled `std::thread::spawn`.

mod pool;
mod progress;

pub use pool::{Barrier, RunSummary, Task, WorkerPool};
