//! "Image mask" and "Image PVF" seeding strategies: samples seed points
//! from the voxels a mask (or partial-volume-fraction image) selects.

use crate::error::{NibrError, Result};
use crate::image::ops::{dilate, min_max, nonzero_indices, pad, Connectivity};
use crate::image::{Image, VoxelElement};
use crate::numeric::{Affine3x4, RandomSource, WorldPoint};
use crate::worker::WorkerPool;

use super::{SeedBudget, SeedQuantity, SeedSample, SeederOutputState};

enum ImageSeedMode {
    Mask,
    Rejection { pvf: Image<f32>, max_value: f64 },
}

/// Uniform-over-mask ("`SEED_IMAGE_MASK`") or value-weighted
/// rejection-sampled ("`SEED_IMAGE_RS`") seeding inside an image.
pub struct ImageSeeder {
    mode: ImageSeedMode,
    voxel_ijk: Vec<WorldPoint>,
    ijk2xyz: Affine3x4,
    budget: SeedBudget,
}

fn voxel_ijk_centres<T: VoxelElement>(img: &Image<T>, indices: &[usize]) -> Vec<WorldPoint> {
    let dims = img.img_dims();
    indices
        .iter()
        .map(|&flat| {
            let idx = img.index_order().ind2sub(flat, dims);
            WorldPoint::new(idx[0] as f64, idx[1] as f64, idx[2] as f64)
        })
        .collect()
}

fn image_volume<T: VoxelElement>(img: &Image<T>, n_indices: usize) -> f64 {
    let p = img.pix_dims();
    p[0] * p[1] * p[2] * n_indices as f64
}

impl ImageSeeder {
    /// Builds from a binary mask, sampling uniformly over its non-zero
    /// voxels ("Seeder will random samples from voxel that have value 1",
    /// `seedImage.cpp::setSeed(Image<int8_t>*)`).
    pub fn from_binary_mask(pool: &WorkerPool, mask: &Image<bool>, quantity: SeedQuantity) -> Self {
        let indices = nonzero_indices(pool, mask);
        let voxel_ijk = voxel_ijk_centres(mask, &indices);
        let measure = image_volume(mask, indices.len());
        let max_possible = if indices.is_empty() { 0 } else { usize::MAX };
        Self {
            mode: ImageSeedMode::Mask,
            voxel_ijk,
            ijk2xyz: mask.ijk2xyz().clone(),
            budget: SeedBudget::new(quantity, measure, max_possible),
        }
    }

    /// Builds from a label image, sampling uniformly over voxels equal to
    /// `label` (`seedImage.cpp::setSeed(Image<int>*, int)`).
    pub fn from_label_mask(pool: &WorkerPool, labels: &Image<i32>, label: i32, quantity: SeedQuantity) -> Self {
        let indices = crate::image::ops::indices_with_label(pool, labels, label);
        let voxel_ijk = voxel_ijk_centres(labels, &indices);
        let measure = image_volume(labels, indices.len());
        let max_possible = if indices.is_empty() { 0 } else { usize::MAX };
        Self {
            mode: ImageSeedMode::Mask,
            voxel_ijk,
            ijk2xyz: labels.ijk2xyz().clone(),
            budget: SeedBudget::new(quantity, measure, max_possible),
        }
    }

    /// Builds a rejection-sampling strategy from a partial volume fraction
    /// image: voxels with positive value are dilated by one ring to build
    /// the candidate set, then a candidate voxel's jittered point is kept
    /// with probability `value / max` (`seedImage.cpp::setSeed(Image<float>*)`).
    pub fn from_partial_volume(pool: &WorkerPool, pvf: &Image<f32>, quantity: SeedQuantity) -> Result<Self> {
        let (lo, hi) = min_max(pool, pvf);
        if lo < 0.0 {
            return Err(NibrError::InvalidArgument("seed image can't have negative values".to_string()));
        }

        let dims = pvf.img_dims();
        let mut mask = Image::<bool>::create(3, dims, pvf.pix_dims(), pvf.ijk2xyz().clone(), true)?;
        for (flat, v) in pvf.data().iter().enumerate() {
            mask.data_mut()[flat] = *v > 0.0;
        }
        let padded = pad(&mask, [1, 1, 1], false)?;
        let dilated = dilate(pool, &padded, Connectivity::Six);
        let indices = nonzero_indices(pool, &dilated);
        let voxel_ijk = voxel_ijk_centres(&dilated, &indices);
        let measure = image_volume(&dilated, indices.len());
        let max_possible = if indices.is_empty() || hi == 0.0 { 0 } else { usize::MAX };

        Ok(Self {
            mode: ImageSeedMode::Rejection { pvf: pvf.clone(), max_value: hi },
            voxel_ijk,
            ijk2xyz: dilated.ijk2xyz().clone(),
            budget: SeedBudget::new(quantity, measure, max_possible),
        })
    }

    pub fn count(&self) -> usize {
        self.budget.count()
    }

    pub fn density(&self) -> f64 {
        self.budget.density()
    }

    pub fn get_seed(&self, rng: &mut RandomSource) -> (SeederOutputState, Option<SeedSample>) {
        let (state, _) = self.budget.reserve();
        if state != SeederOutputState::Ok {
            return (state, None);
        }
        if self.voxel_ijk.is_empty() {
            return (SeederOutputState::Error, None);
        }

        match &self.mode {
            ImageSeedMode::Mask => {
                let idx = rng.uniform_index(self.voxel_ijk.len());
                let ijk = rng.jitter_in_voxel(self.voxel_ijk[idx], WorldPoint::ONE);
                let point = self.ijk2xyz.transform_point(ijk);
                (SeederOutputState::Ok, Some(SeedSample { point, direction: None }))
            }
            ImageSeedMode::Rejection { pvf, max_value } => loop {
                let idx = rng.uniform_index(self.voxel_ijk.len());
                let ijk = rng.jitter_in_voxel(self.voxel_ijk[idx], WorldPoint::ONE);
                let point = self.ijk2xyz.transform_point(ijk);
                let val = pvf.sample_world_f64(point);
                if val >= rng.uniform01() * max_value {
                    return (SeederOutputState::Ok, Some(SeedSample { point, direction: None }));
                }
            },
        }
    }
}
