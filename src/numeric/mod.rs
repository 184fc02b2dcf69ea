//! Numeric primitives shared by every other module: vectors, 3x4/4x4
//! affines, quaternion<->matrix conversion, axis-angle, Hermite
//! interpolation and a per-worker random source.
//!
//! Vector/matrix algebra is built on `glam`, matching the vector math
//! crate already in the retrieval pack's geometry repos.

mod affine;
mod hermite;
mod quaternion;
mod rng;

pub use affine::Affine3x4;
pub use hermite::hermite_interpolate;
pub use quaternion::{axis_angle_to_quat, quat_to_axis_angle, quat_to_mat3, mat3_to_quat};
pub use rng::RandomSource;

pub use glam::{DVec3, Mat3, Mat4, Quat, Vec3, Vec3A};

/// World-space point, always f64 to avoid affine round-trip drift (§8
/// invariant 1 demands `1e-5` world-unit precision after a round trip).
pub type WorldPoint = DVec3;
