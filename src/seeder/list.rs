//! "List" seeding strategy: iterates a caller-supplied coordinate (and
//! optional direction) sequence rather than sampling one.

use crate::error::{NibrError, Result};
use crate::numeric::{RandomSource, WorldPoint};

use super::{SeedBudget, SeedSample, SeederOutputState};

/// Replays a fixed list of seed points (and optionally per-point
/// directions) in order. Density is meaningless for an explicit list
/// (`seedList.cpp::computeSeedCountAndDensity`: "Density is ignored when
/// seed coordinates are explicitly defined"), so [`SeedQuantity`] is not
/// accepted here; the count is always the list length.
///
/// [`SeedQuantity`]: super::SeedQuantity
pub struct ListSeeder {
    points: Vec<WorldPoint>,
    directions: Option<Vec<WorldPoint>>,
    budget: SeedBudget,
}

impl ListSeeder {
    pub fn new(points: Vec<WorldPoint>) -> Self {
        let count = points.len();
        Self { points, directions: None, budget: SeedBudget::fixed(count) }
    }

    pub fn with_directions(points: Vec<WorldPoint>, directions: Vec<WorldPoint>) -> Result<Self> {
        if points.len() != directions.len() {
            return Err(NibrError::InvalidArgument(
                "size of seed coordinates and directions must be the same".to_string(),
            ));
        }
        let count = points.len();
        Ok(Self {
            points,
            directions: Some(directions),
            budget: SeedBudget::fixed(count),
        })
    }

    pub fn count(&self) -> usize {
        self.budget.count()
    }

    pub fn density(&self) -> f64 {
        self.budget.density()
    }

    pub fn get_seed(&self, _rng: &mut RandomSource) -> (SeederOutputState, Option<SeedSample>) {
        let (state, slot) = self.budget.reserve();
        if state != SeederOutputState::Ok {
            return (state, None);
        }
        let point = self.points[slot];
        let direction = self.directions.as_ref().map(|d| d[slot]);
        (SeederOutputState::Ok, Some(SeedSample { point, direction }))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn replays_points_in_order() {
        let points = vec![WorldPoint::new(0.0, 0.0, 0.0), WorldPoint::new(1.0, 1.0, 1.0)];
        let seeder = ListSeeder::new(points.clone());
        let mut rng = RandomSource::from_seed(1, 0);
        for expected in &points {
            let (state, sample) = seeder.get_seed(&mut rng);
            assert_eq!(state, SeederOutputState::Ok);
            assert_eq!(sample.unwrap().point, *expected);
        }
        assert_eq!(seeder.get_seed(&mut rng).0, SeederOutputState::LimitReached);
    }

    #[test]
    fn mismatched_direction_count_is_rejected() {
        let points = vec![WorldPoint::ZERO; 2];
        let dirs = vec![WorldPoint::X; 1];
        assert!(ListSeeder::with_directions(points, dirs).is_err());
    }

    #[test]
    fn empty_list_is_reported_empty() {
        let seeder = ListSeeder::new(Vec::new());
        let mut rng = RandomSource::from_seed(1, 0);
        assert_eq!(seeder.get_seed(&mut rng).0, SeederOutputState::Empty);
    }
}
