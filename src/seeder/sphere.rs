//! "Sphere" seeding strategy: samples seed points uniformly within a
//! ball or on its surface shell.

use crate::numeric::RandomSource;
use crate::numeric::WorldPoint;

use super::{SeedBudget, SeedQuantity, SeedSample, SeederOutputState};

/// Uniform seeding inside a ball of radius `radius` around `centre`.
/// Points are never placed exactly on the sphere surface, since
/// [`RandomSource::point_in_ball`] samples the closed ball by rejection.
pub struct SphereSeeder {
    centre: WorldPoint,
    radius: f64,
    budget: SeedBudget,
}

impl SphereSeeder {
    pub fn new(centre: WorldPoint, radius: f64, quantity: SeedQuantity) -> Self {
        let volume = (4.0 / 3.0) * std::f64::consts::PI * radius.powi(3);
        Self {
            centre,
            radius,
            budget: SeedBudget::new(quantity, volume, usize::MAX),
        }
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
        let point = rng.point_in_ball(self.centre, self.radius);
        (SeederOutputState::Ok, Some(SeedSample { point, direction: None }))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn samples_stay_within_radius() {
        let seeder = SphereSeeder::new(WorldPoint::new(1.0, 2.0, 3.0), 2.0, SeedQuantity::Count(200));
        let mut rng = RandomSource::from_seed(5, 0);
        for _ in 0..200 {
            let (state, sample) = seeder.get_seed(&mut rng);
            assert_eq!(state, SeederOutputState::Ok);
            let p = sample.unwrap().point;
            assert!((p - WorldPoint::new(1.0, 2.0, 3.0)).length() <= 2.0 + 1e-9);
        }
        assert_eq!(seeder.get_seed(&mut rng).0, SeederOutputState::LimitReached);
    }

    #[test]
    fn density_derives_count_from_sphere_volume() {
        let seeder = SphereSeeder::new(WorldPoint::ZERO, 1.0, SeedQuantity::Density(1.0));
        let expected = ((4.0 / 3.0) * std::f64::consts::PI).round() as usize;
        assert_eq!(seeder.count(), expected);
    }
}
