#![deny(
    rust_2018_compatibility,
    rust_2018_idioms,
    nonstandard_style,
    future_incompatible,
    non_camel_case_types,
    unused_parens,
    non_upper_case_globals,
    bare_trait_objects,
    ellipsis_inclusive_range_patterns,
    elided_lifetimes_in_paths
)]
#![warn(clippy::explicit_into_iter_loop)]

//! Geometry <-> image interaction core: a typed voxel image container, a
//! triangulated surface container, a surface-to-image rasterizer, segment/
//! triangle intersection, spherical harmonics, an Eikonal/EDT solver, a
//! Dirichlet-Laplace PDE solve and a seeding strategy family, all driven by
//! a single fixed-size worker pool.
//!
//! Out of scope: tractography
//! algorithms, diffusion model fitting, file-format parsing of third-party
//! formats, and CLI/logging front-ends for client applications.

pub mod error;
pub mod geometry;
pub mod image;
pub mod numeric;
pub mod pde;
pub mod rasterizer;
pub mod seeder;
pub mod sphere;
pub mod surface;
pub mod worker;

mod config;
mod parallel_slice;

pub use config::{init, verbosity, set_verbosity, Verbosity};
pub use error::{NibrError, Result};

pub mod prelude {
    pub use crate::error::{NibrError, Result};
    pub use crate::geometry::{Segment, SegmentTriangleHit};
    pub use crate::image::{AnyImage, Image, InterpMethod};
    pub use crate::seeder::{SeedQuantity, SeedSample, Seeder, SeederOutputState};
    pub use crate::surface::{MeshFormat, MeshReader, MeshWriter, Surface};
    pub use crate::worker::{Barrier, Task, WorkerPool};
}
