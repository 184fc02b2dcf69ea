//! A 4D image specialised as "one spherical function per voxel"
//!: the first three axes are spatial, the
//! fourth indexes either per-direction samples against a shared
//! [`SphereSet`] or SH coefficients, with the sphere's nearest-direction
//! lookup precomputed once and reused for every voxel rather than
//! rebuilt per query.

use crate::error::{NibrError, Result};
use crate::image::storage::MAX_DIMS;
use crate::image::Image;
use crate::numeric::{Affine3x4, WorldPoint};

use super::{Sh, SphereSet};

/// What the fourth axis of a [`FodImage`] holds.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FodRepresentation {
    /// One sample per [`SphereSet`] direction.
    Samples,
    /// SH coefficients (order implied by the axis length).
    ShCoeffs,
}

/// A per-voxel spherical function, either sample- or SH-coefficient
/// valued, grounded on the `Image<T>`
/// container with a shared [`SphereSet`] standing in for
/// the source's per-call sphere-index precomputation.
#[derive(Debug, Clone)]
pub struct FodImage {
    image: Image<f32>,
    sphere: SphereSet,
    representation: FodRepresentation,
}

impl FodImage {
    fn new(
        img_dims: [usize; 3],
        pix_dims: [f64; 3],
        ijk2xyz: Affine3x4,
        sphere: SphereSet,
        representation: FodRepresentation,
        fourth_axis_len: usize,
    ) -> Result<Self> {
        let mut dims7 = [1usize; MAX_DIMS];
        dims7[0] = img_dims[0];
        dims7[1] = img_dims[1];
        dims7[2] = img_dims[2];
        dims7[3] = fourth_axis_len;
        let mut pix7 = [1.0f64; MAX_DIMS];
        pix7[0] = pix_dims[0];
        pix7[1] = pix_dims[1];
        pix7[2] = pix_dims[2];
        let image = Image::create(4, dims7, pix7, ijk2xyz, true)?;
        Ok(Self { image, sphere, representation })
    }

    /// Allocates a per-direction (sample-domain) FOD image over `sphere`.
    pub fn create_samples(img_dims: [usize; 3], pix_dims: [f64; 3], ijk2xyz: Affine3x4, sphere: SphereSet) -> Result<Self> {
        let n = sphere.len();
        Self::new(img_dims, pix_dims, ijk2xyz, sphere, FodRepresentation::Samples, n)
    }

    /// Allocates an SH-coefficient FOD image; `sphere` is retained as the
    /// discretization used for any later sample-domain conversion or
    /// reorientation, not as the coefficient axis itself.
    pub fn create_sh_coeffs(img_dims: [usize; 3], pix_dims: [f64; 3], ijk2xyz: Affine3x4, sphere: SphereSet, sh: &Sh) -> Result<Self> {
        Self::new(img_dims, pix_dims, ijk2xyz, sphere, FodRepresentation::ShCoeffs, sh.coeff_count())
    }

    pub fn representation(&self) -> FodRepresentation {
        self.representation
    }

    pub fn sphere(&self) -> &SphereSet {
        &self.sphere
    }

    pub fn image(&self) -> &Image<f32> {
        &self.image
    }

    pub fn image_mut(&mut self) -> &mut Image<f32> {
        &mut self.image
    }

    fn len_per_voxel(&self) -> usize {
        self.image.img_dims()[3]
    }

    /// The per-voxel vector (samples or SH coefficients) at `(i, j, k)`.
    pub fn at(&self, i: usize, j: usize, k: usize) -> Option<Vec<f32>> {
        let n = self.len_per_voxel();
        let dims = self.image.img_dims();
        if i >= dims[0] || j >= dims[1] || k >= dims[2] {
            return None;
        }
        let mut out = Vec::with_capacity(n);
        for c in 0..n {
            out.push(*self.image.at([i, j, k, c, 0, 0, 0])?);
        }
        Some(out)
    }

    pub fn set_at(&mut self, i: usize, j: usize, k: usize, values: &[f32]) -> Result<()> {
        let n = self.len_per_voxel();
        if values.len() != n {
            return Err(NibrError::InvalidArgument(format!(
                "expected {n} values per voxel, got {}",
                values.len()
            )));
        }
        for (c, &v) in values.iter().enumerate() {
            *self
                .image
                .at_mut([i, j, k, c, 0, 0, 0])
                .ok_or_else(|| NibrError::OutOfRange(format!("voxel ({i},{j},{k}) out of bounds")))? = v;
        }
        Ok(())
    }

    /// Looks up the amplitude nearest `dir` by indexing straight into the
    /// precomputed [`SphereSet`] lookup, only valid when [`Self::representation`] is
    /// [`FodRepresentation::Samples`].
    pub fn sample_in_direction(&self, i: usize, j: usize, k: usize, dir: WorldPoint) -> Option<f32> {
        if self.representation != FodRepresentation::Samples {
            return None;
        }
        let idx = self.sphere.nearest_index(dir)?;
        self.image.at([i, j, k, idx, 0, 0, 0]).copied()
    }

    /// Converts every voxel from samples to SH coefficients, via
    /// [`Sh::sf2sh`] against the image's own [`SphereSet`].
    pub fn to_sh(&self, sh: &Sh) -> Result<FodImage> {
        if self.representation != FodRepresentation::Samples {
            return Err(NibrError::InvalidArgument("to_sh requires a sample-domain FodImage".to_string()));
        }
        let dims = self.image.img_dims();
        let mut out = FodImage::create_sh_coeffs([dims[0], dims[1], dims[2]], self.image.pix_dims(), self.image.ijk2xyz().clone(), self.sphere.clone(), sh)?;
        let directions = self.sphere.directions();
        for i in 0..dims[0] {
            for j in 0..dims[1] {
                for k in 0..dims[2] {
                    let samples: Vec<f64> = self.at(i, j, k).unwrap().into_iter().map(|v| v as f64).collect();
                    let coeffs = sh.sf2sh(&samples, directions);
                    let coeffs32: Vec<f32> = coeffs.into_iter().map(|c| c as f32).collect();
                    out.set_at(i, j, k, &coeffs32)?;
                }
            }
        }
        Ok(out)
    }

    /// Converts every voxel from SH coefficients back to samples over
    /// this image's own [`SphereSet`], via [`Sh::sh2sf`].
    pub fn to_samples(&self, sh: &Sh) -> Result<FodImage> {
        if self.representation != FodRepresentation::ShCoeffs {
            return Err(NibrError::InvalidArgument("to_samples requires an SH-coefficient FodImage".to_string()));
        }
        let dims = self.image.img_dims();
        let mut out = FodImage::create_samples([dims[0], dims[1], dims[2]], self.image.pix_dims(), self.image.ijk2xyz().clone(), self.sphere.clone())?;
        let directions = self.sphere.directions();
        for i in 0..dims[0] {
            for j in 0..dims[1] {
                for k in 0..dims[2] {
                    let coeffs: Vec<f64> = self.at(i, j, k).unwrap().into_iter().map(|v| v as f64).collect();
                    let samples = sh.sh2sf(&coeffs, directions);
                    let samples32: Vec<f32> = samples.into_iter().map(|s| s as f32).collect();
                    out.set_at(i, j, k, &samples32)?;
                }
            }
        }
        Ok(out)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;

    fn identity_affine() -> Affine3x4 {
        Affine3x4::from_rows([[1.0, 0.0, 0.0, 0.0], [0.0, 1.0, 0.0, 0.0], [0.0, 0.0, 1.0, 0.0]])
    }

    #[test]
    fn sample_lookup_matches_nearest_direction() {
        let sphere = SphereSet::lattice(false, None).unwrap();
        let n = sphere.len();
        let mut fod = FodImage::create_samples([2, 2, 2], [1.0, 1.0, 1.0], identity_affine(), sphere.clone()).unwrap();
        let values: Vec<f32> = (0..n).map(|i| i as f32).collect();
        fod.set_at(0, 0, 0, &values).unwrap();

        let d = sphere.directions()[3];
        let expected = sphere.nearest_index(d).unwrap() as f32;
        assert_eq!(fod.sample_in_direction(0, 0, 0, d), Some(expected));
    }

    #[test]
    fn sh_round_trip_preserves_constant_function() {
        let sphere = SphereSet::lattice(false, None).unwrap();
        let n = sphere.len();
        let sh = Sh::new(0, false).unwrap();
        let mut fod = FodImage::create_samples([1, 1, 1], [1.0, 1.0, 1.0], identity_affine(), sphere).unwrap();
        fod.set_at(0, 0, 0, &vec![1.0f32; n]).unwrap();

        let as_sh = fod.to_sh(&sh).unwrap();
        let back = as_sh.to_samples(&sh).unwrap();
        let recovered = back.at(0, 0, 0).unwrap();
        for v in recovered {
            assert_relative_eq!(v as f64, 1.0, epsilon = 0.2);
        }
    }
}
