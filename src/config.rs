//! Process-wide initialisation and verbosity.
//!
//! The original C++ core seeds a datestamp and sets up the worker pool from
//! a single idempotent `MTINIT()`-style routine. The Rust rendering keeps
//! the same shape: one `Once`-guarded `init()`, plus a process-wide
//! verbosity level that gates the worker pool's progress thread and the
//! `tracing` events emitted from readers/writers/solvers.

use std::sync::atomic::{AtomicU8, Ordering};
use std::sync::Once;

/// Controls whether the worker pool's progress thread renders, and whether
/// diagnostic `tracing` events at `debug`/`trace` level fire.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
pub enum Verbosity {
    /// No progress thread, warnings only.
    Quiet = 0,
    /// Warnings and top-level `info!` events.
    Normal = 1,
    /// Everything in `Normal`, plus the worker pool's progress thread.
    Progress = 2,
}

impl Verbosity {
    fn from_u8(v: u8) -> Self {
        match v {
            0 => Verbosity::Quiet,
            2 => Verbosity::Progress,
            _ => Verbosity::Normal,
        }
    }
}

static VERBOSITY: AtomicU8 = AtomicU8::new(Verbosity::Normal as u8);
static INIT: Once = Once::new();

/// Idempotent process-wide initialisation. Safe to call from multiple
/// threads or multiple times; only the first call has any effect.
pub fn init() {
    INIT.call_once(|| {
        crate::worker::WorkerPool::bootstrap_global();
        tracing::debug!("nibrary initialised");
    });
}

/// Current process-wide verbosity level.
pub fn verbosity() -> Verbosity {
    Verbosity::from_u8(VERBOSITY.load(Ordering::Relaxed))
}

/// Set the process-wide verbosity level.
pub fn set_verbosity(v: Verbosity) {
    VERBOSITY.store(v as u8, Ordering::Relaxed);
}
