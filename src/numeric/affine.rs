use crate::error::{NibrError, Result};
use glam::{DMat4, DVec3};

/// A 3x4 affine map between voxel-centre coordinates and world coordinates
///, augmented with an implicit
/// `[0 0 0 1]` bottom row. Stored as a `glam::DMat4` internally so that
/// composing and inverting reuses a well-tested implementation; the bottom
/// row is never mutated.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Affine3x4 {
    mat: DMat4,
}

impl Affine3x4 {
    /// Builds an affine from three rows of four coefficients each
    /// (`[row][col]`, row-major, as the on-disk/in-memory `ijk2xyz[3][4]`
    /// layout is specified).
    pub fn from_rows(rows: [[f64; 4]; 3]) -> Self {
        // glam matrices are column-major; transpose while inserting the
        // implicit affine bottom row.
        let cols = [
            DVec3::new(rows[0][0], rows[1][0], rows[2][0]).extend(0.0),
            DVec3::new(rows[0][1], rows[1][1], rows[2][1]).extend(0.0),
            DVec3::new(rows[0][2], rows[1][2], rows[2][2]).extend(0.0),
            DVec3::new(rows[0][3], rows[1][3], rows[2][3]).extend(1.0),
        ];
        Self {
            mat: DMat4::from_cols(cols[0], cols[1], cols[2], cols[3]),
        }
    }

    /// The identity affine (voxel coordinates equal world coordinates).
    pub fn identity() -> Self {
        Self { mat: DMat4::IDENTITY }
    }

    /// Returns the matrix as three rows of four coefficients, the inverse
    /// operation of [`Self::from_rows`].
    pub fn to_rows(&self) -> [[f64; 4]; 3] {
        let c = self.mat.to_cols_array_2d(); // c[col][row]
        [
            [c[0][0], c[1][0], c[2][0], c[3][0]],
            [c[0][1], c[1][1], c[2][1], c[3][1]],
            [c[0][2], c[1][2], c[2][2], c[3][2]],
        ]
    }

    /// Applies the affine to a point (not a direction: translation is
    /// included).
    pub fn transform_point(&self, p: DVec3) -> DVec3 {
        self.mat.transform_point3(p)
    }

    /// Applies the linear part only (no translation) -- used to map
    /// direction vectors between voxel and world space.
    pub fn transform_vector(&self, v: DVec3) -> DVec3 {
        self.mat.transform_vector3(v)
    }

    /// Inverts the affine. Fails with `NibrError::InvalidArgument` if the
    /// linear part is singular: `xyz2ijk` requires a genuine inverse of
    /// `ijk2xyz` to exist.
    pub fn inverse(&self) -> Result<Affine3x4> {
        let det = self.mat.determinant();
        if !det.is_finite() || det.abs() < 1e-12 {
            return Err(NibrError::InvalidArgument(
                "affine is not invertible (singular or near-singular linear part)".to_string(),
            ));
        }
        Ok(Self {
            mat: self.mat.inverse(),
        })
    }

    /// Composes `self` then `other`, i.e. `other * self` applied to a
    /// point transforms through `self` first.
    pub fn then(&self, other: &Affine3x4) -> Affine3x4 {
        Affine3x4 {
            mat: other.mat * self.mat,
        }
    }

    /// Voxel spacing implied by the linear part: the Euclidean norm of
    /// each column of the 3x3 linear block.
    pub fn column_scales(&self) -> [f64; 3] {
        let c = self.mat.to_cols_array_2d();
        [
            DVec3::new(c[0][0], c[0][1], c[0][2]).length(),
            DVec3::new(c[1][0], c[1][1], c[1][2]).length(),
            DVec3::new(c[2][0], c[2][1], c[2][2]).length(),
        ]
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;

    #[test]
    fn identity_round_trips() {
        let a = Affine3x4::identity();
        let inv = a.inverse().unwrap();
        let p = DVec3::new(1.5, -2.25, 7.0);
        assert_relative_eq!(inv.transform_point(a.transform_point(p)), p, epsilon = 1e-10);
    }

    #[test]
    fn scaled_translated_round_trips() {
        let a = Affine3x4::from_rows([
            [2.0, 0.0, 0.0, 10.0],
            [0.0, 2.0, 0.0, -4.0],
            [0.0, 0.0, 3.0, 1.0],
        ]);
        let inv = a.inverse().unwrap();
        for p in [
            DVec3::new(0.0, 0.0, 0.0),
            DVec3::new(3.0, 4.0, -2.0),
            DVec3::new(-100.0, 50.5, 0.25),
        ] {
            let world = a.transform_point(p);
            let back = inv.transform_point(world);
            assert_relative_eq!(back, p, epsilon = 1e-5);
        }
    }

    #[test]
    fn singular_affine_rejected() {
        let a = Affine3x4::from_rows([
            [1.0, 0.0, 0.0, 0.0],
            [0.0, 0.0, 0.0, 0.0],
            [0.0, 0.0, 1.0, 0.0],
        ]);
        assert!(a.inverse().is_err());
    }

    #[test]
    fn column_scales_match_spacing() {
        let a = Affine3x4::from_rows([
            [1.5, 0.0, 0.0, 0.0],
            [0.0, 2.0, 0.0, 0.0],
            [0.0, 0.0, 0.5, 0.0],
        ]);
        let scales = a.column_scales();
        assert_relative_eq!(scales[0], 1.5, epsilon = 1e-10);
        assert_relative_eq!(scales[1], 2.0, epsilon = 1e-10);
        assert_relative_eq!(scales[2], 0.5, epsilon = 1e-10);
    }

    // Round-trip invariant `ijk2xyz . xyz2ijk . p = p` to 1e-5, checked
    // over arbitrary (non-degenerate) diagonal-plus-translation affines and
    // arbitrary points rather than a handful of hand-picked cases.
    mod prop {
        use super::*;
        use proptest::prelude::*;

        proptest! {
            #[test]
            fn round_trips_for_arbitrary_scale_translation(
                sx in 0.1f64..20.0, sy in 0.1f64..20.0, sz in 0.1f64..20.0,
                tx in -50.0f64..50.0, ty in -50.0f64..50.0, tz in -50.0f64..50.0,
                px in -1000.0f64..1000.0, py in -1000.0f64..1000.0, pz in -1000.0f64..1000.0,
            ) {
                let a = Affine3x4::from_rows([
                    [sx, 0.0, 0.0, tx],
                    [0.0, sy, 0.0, ty],
                    [0.0, 0.0, sz, tz],
                ]);
                let inv = a.inverse().unwrap();
                let p = DVec3::new(px, py, pz);
                let back = inv.transform_point(a.transform_point(p));
                prop_assert!((back - p).length() < 1e-5);
            }
        }
    }
}
