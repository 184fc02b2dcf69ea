//! Sphere discretizations, spherical-harmonics basis evaluation, and the
//! reorientation/rotation layer relating the two.

mod fod;
mod reorient;
mod sh;

pub use fod::FodImage;
pub use reorient::OrderOfDirections;
pub use sh::Sh;

use crate::error::{NibrError, Result};
use crate::numeric::WorldPoint;

const SQRT3_OVER_2: f64 = 0.866_025_403_784_438_6;

/// A fixed set of unit directions together with a nearest-direction
/// lookup.
///
/// Two constructions are supported: [`SphereSet::lattice`] builds an
/// (odd-edge) voxelised half- or full-sphere sample set the way the
/// source's default `sfDim`-based grid does, with an O(1) nearest-sample
/// lookup; [`SphereSet::from_directions`] accepts caller-supplied
/// directions (e.g. a gradient table) and falls back to a brute-force
/// nearest search, matching the source's `sfHasOwnCoordinates` path.
#[derive(Debug, Clone)]
pub struct SphereSet {
    directions: Vec<WorldPoint>,
    even: bool,
    lookup: Lookup,
}

#[derive(Debug, Clone)]
enum Lookup {
    Lattice { dim: i32, radius: f64, shift: i32, index: Vec<i32> },
    BruteForce,
}

impl SphereSet {
    /// Builds a lattice-voxelised sphere discretization.
    /// `even` selects the even-symmetric (antipodal pairs identified,
    /// half-sphere) vs. full-sphere sample set; `dim` is the odd lattice
    /// edge length (defaults to 13 for even, 11 for full, matching the
    /// source's default `sfDim`).
    pub fn lattice(even: bool, dim: Option<i32>) -> Result<Self> {
        let default_dim = if even { 13 } else { 11 };
        let dim = match dim {
            Some(d) if d > 0 && d % 2 == 1 => d,
            Some(_) => default_dim,
            None => default_dim,
        };

        let radius = (dim as f64 - 1.0) / 2.0 - 0.5;
        let shift = ((dim as f64 - 1.0) / 2.0) as i32;
        let r = (dim as f64 - 1.0) / 2.0;
        let r_i = r as i32;
        let zs_start: i32 = if even { 0 } else { -r_i };

        let z_extent = if even { r_i + 1 } else { dim };
        let index_len = (dim as usize) * (dim as usize) * (z_extent as usize);
        let mut index = vec![-1i32; index_len];
        let mut directions = Vec::new();

        for xi in -r_i..=r_i {
            for yi in -r_i..=r_i {
                for zi in zs_start..=r_i {
                    let (x, y, z) = (xi as f64, yi as f64, zi as f64);
                    let dist = (x * x + y * y + z * z).sqrt();
                    let slot = ((xi + r_i) + ((yi + r_i) + (zi - zs_start) * dim) * dim) as usize;
                    if (dist - radius).abs() < SQRT3_OVER_2 {
                        let p = if x * x + y * y + z * z > 1e-12 {
                            WorldPoint::new(x, y, z).normalize()
                        } else {
                            WorldPoint::new(x, y, z)
                        };
                        index[slot] = directions.len() as i32;
                        directions.push(p);
                    }
                }
            }
        }

        Ok(Self {
            directions,
            even,
            lookup: Lookup::Lattice { dim, radius, shift, index },
        })
    }

    /// Wraps a caller-supplied direction set: nearest-direction lookup is a
    /// brute-force scan, antipodal-aware when `even` is set.
    pub fn from_directions(directions: Vec<WorldPoint>, even: bool) -> Self {
        Self {
            directions,
            even,
            lookup: Lookup::BruteForce,
        }
    }

    pub fn directions(&self) -> &[WorldPoint] {
        &self.directions
    }

    pub fn len(&self) -> usize {
        self.directions.len()
    }

    pub fn is_empty(&self) -> bool {
        self.directions.is_empty()
    }

    pub fn is_even(&self) -> bool {
        self.even
    }

    /// Index of the discretization sample nearest `dir`,
    /// grounded on `sphericalFunctions.cpp`'s `coordinate2index`.
    pub fn nearest_index(&self, dir: WorldPoint) -> Option<usize> {
        if dir.length_squared() < 1e-20 {
            return None;
        }
        let d = dir.normalize();
        match &self.lookup {
            Lookup::Lattice { dim, radius, shift, index } => {
                let (xi, yi, zi) = if self.even && d.z < 0.0 {
                    ((-d.x * radius).round() as i32 + shift, (-d.y * radius).round() as i32 + shift, (-d.z * radius).round() as i32)
                } else if self.even {
                    ((d.x * radius).round() as i32 + shift, (d.y * radius).round() as i32 + shift, (d.z * radius).round() as i32)
                } else {
                    (
                        (d.x * radius).round() as i32 + shift,
                        (d.y * radius).round() as i32 + shift,
                        (d.z * radius).round() as i32 + shift,
                    )
                };
                if xi < 0 || xi >= *dim || yi < 0 || yi >= *dim || zi < 0 {
                    return None;
                }
                let slot = (xi + (yi + zi * dim) * dim) as usize;
                index.get(slot).copied().filter(|&v| v >= 0).map(|v| v as usize)
            }
            Lookup::BruteForce => {
                let mut best = (f64::INFINITY, 0usize);
                for (i, &s) in self.directions.iter().enumerate() {
                    let mut dist = (d - s).length_squared();
                    if self.even {
                        dist = dist.min((d + s).length_squared());
                    }
                    if dist < best.0 {
                        best = (dist, i);
                    }
                }
                if self.directions.is_empty() {
                    None
                } else {
                    Some(best.1)
                }
            }
        }
    }
}

/// Returns the (valid) lattice dimension if the requested dimension is
/// invalid, mirroring the source's warn-and-fallback behaviour rather
/// than a hard error, since an even `dim` is only ever a caller mistake
/// and not a data-integrity issue.
pub fn default_lattice_dim(even: bool) -> i32 {
    if even {
        13
    } else {
        11
    }
}

pub(crate) fn invalid_order(order: i32) -> NibrError {
    NibrError::InvalidArgument(format!("spherical harmonics order {order} is out of range (max 33)"))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn lattice_directions_are_unit_length() {
        let set = SphereSet::lattice(false, None).unwrap();
        assert!(!set.is_empty());
        for d in set.directions() {
            assert!((d.length() - 1.0).abs() < 1e-6);
        }
    }

    #[test]
    fn nearest_index_of_a_sample_is_itself() {
        let set = SphereSet::lattice(false, None).unwrap();
        for (i, &d) in set.directions().iter().enumerate() {
            assert_eq!(set.nearest_index(d), Some(i));
        }
    }

    #[test]
    fn even_set_identifies_antipodal_directions() {
        let set = SphereSet::lattice(true, None).unwrap();
        for &d in set.directions() {
            let a = set.nearest_index(d);
            let b = set.nearest_index(-d);
            assert_eq!(a, b);
        }
    }

    #[test]
    fn brute_force_matches_requested_direction() {
        let dirs = vec![WorldPoint::new(1.0, 0.0, 0.0), WorldPoint::new(0.0, 1.0, 0.0), WorldPoint::new(0.0, 0.0, 1.0)];
        let set = SphereSet::from_directions(dirs, false);
        assert_eq!(set.nearest_index(WorldPoint::new(0.9, 0.1, 0.05)), Some(0));
    }
}
