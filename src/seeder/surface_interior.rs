//! "Surface interior" seeding strategy: samples seed points uniformly
//! within the volume a mesh encloses.

use crate::error::{NibrError, Result};
use crate::numeric::{RandomSource, WorldPoint};
use crate::surface::{GridResolution, Surface};

use super::{SeedBudget, SeedQuantity, SeedSample, SeederOutputState};

/// Uniform seeding over the interior of a closed surface, rejecting any
/// jittered point that lands exactly on the boundary
/// (`seedInsideSurface.cpp::getSeed`: "Make sure that the point is not
/// exactly on the border").
pub struct SurfaceInteriorSeeder {
    surface: Surface,
    centres: Vec<WorldPoint>,
    spacing: f64,
    budget: SeedBudget,
}

impl SurfaceInteriorSeeder {
    /// Clones `surface`, voxelises the clone at `resolution` (via
    /// [`Surface::enable_point_check`]) and precomputes the interior
    /// voxel set this strategy samples from
    /// (`seedInsideSurface.cpp::setSeed`). The strategy keeps its own
    /// copy so [`Self::get_seed`] needs no outside reference, matching
    /// every other strategy's self-contained `get_seed`.
    pub fn new(surface: &Surface, resolution: GridResolution, quantity: SeedQuantity) -> Result<Self> {
        let mut surface = surface.clone();
        surface.enable_point_check(resolution);
        let pc = surface
            .point_check()
            .ok_or_else(|| NibrError::Fatal("point check was just enabled but is absent".to_string()))?;

        let centres = pc.inside_voxel_centres();
        let spacing = pc.spacing();
        let measure = spacing.powi(3) * centres.len() as f64;
        let max_possible = if centres.is_empty() { 0 } else { usize::MAX };

        Ok(Self {
            surface,
            centres,
            spacing,
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
        if self.centres.is_empty() {
            return (SeederOutputState::Error, None);
        }

        loop {
            let idx = rng.uniform_index(self.centres.len());
            let point = rng.jitter_in_voxel(self.centres[idx], WorldPoint::splat(self.spacing));
            if self.surface.is_point_inside(point) == Some(true) {
                return (SeederOutputState::Ok, Some(SeedSample { point, direction: None }));
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn unit_cube() -> Surface {
        let h = 0.5;
        let v = vec![
            WorldPoint::new(-h, -h, -h),
            WorldPoint::new(h, -h, -h),
            WorldPoint::new(h, h, -h),
            WorldPoint::new(-h, h, -h),
            WorldPoint::new(-h, -h, h),
            WorldPoint::new(h, -h, h),
            WorldPoint::new(h, h, h),
            WorldPoint::new(-h, h, h),
        ];
        let f = vec![
            [0, 2, 1], [0, 3, 2],
            [4, 5, 6], [4, 6, 7],
            [0, 1, 5], [0, 5, 4],
            [1, 2, 6], [1, 6, 5],
            [2, 3, 7], [2, 7, 6],
            [3, 0, 4], [3, 4, 7],
        ];
        Surface::new(v, f)
    }

    #[test]
    fn samples_land_strictly_inside_the_cube() {
        let cube = unit_cube();
        let seeder = SurfaceInteriorSeeder::new(&cube, GridResolution { spacing: 0.1 }, SeedQuantity::Count(100)).unwrap();
        let mut rng = RandomSource::from_seed(9, 0);
        for _ in 0..100 {
            let (state, sample) = seeder.get_seed(&mut rng);
            assert_eq!(state, SeederOutputState::Ok);
            let p = sample.unwrap().point;
            assert!(p.x.abs() < 0.5 && p.y.abs() < 0.5 && p.z.abs() < 0.5);
        }
    }
}
