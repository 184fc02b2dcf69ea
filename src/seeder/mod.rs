//! Seeding strategy family: six concrete strategies behind
//! one `get_seed` entry point, expressed as a tagged enum rather than a
//! class hierarchy. Shares a common seed-count/density conversion and
//! seeding-limit check across all six.

mod image_mask;
mod list;
mod sphere;
mod surface_interior;
mod surface_mesh;

pub use image_mask::ImageSeeder;
pub use list::ListSeeder;
pub use sphere::SphereSeeder;
pub use surface_interior::SurfaceInteriorSeeder;
pub use surface_mesh::SurfaceSeeder;

use std::sync::Mutex;

use crate::numeric::{RandomSource, WorldPoint};

/// Outcome of a single [`Seeder::get_seed`] call.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SeederOutputState {
    Ok,
    LimitReached,
    Empty,
    Error,
}

/// One emitted seed point, with an optional emission direction.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct SeedSample {
    pub point: WorldPoint,
    pub direction: Option<WorldPoint>,
}

/// Either a fixed seed count or a density (seeds per unit region measure:
/// volume for Image/Surface-interior/Sphere strategies, area for Surface),
/// with the other derived once the strategy's region measure is known
///.
#[derive(Debug, Clone, Copy)]
pub enum SeedQuantity {
    Count(usize),
    Density(f64),
}

impl SeedQuantity {
    fn resolve(self, measure: f64) -> (usize, f64) {
        match self {
            SeedQuantity::Count(count) => {
                let density = if measure > 0.0 { count as f64 / measure } else { 0.0 };
                (count, density)
            }
            SeedQuantity::Density(density) => {
                let count = (density * measure).round().max(0.0) as usize;
                (count, density)
            }
        }
    }
}

/// Shared check-then-reserve budget every strategy embeds: the Rust
/// rendering of `Seeder::checkSeedingLimits` plus the locked `curSeed++`
/// every `getSeed` override performs, folded into one critical section
/// since nothing outside this type needs to observe the two steps
/// separately.
#[derive(Debug)]
struct SeedBudget {
    cur_seed: Mutex<usize>,
    count: usize,
    density: f64,
    max_possible_seed_count: usize,
}

impl SeedBudget {
    fn new(quantity: SeedQuantity, measure: f64, max_possible_seed_count: usize) -> Self {
        let (count, density) = quantity.resolve(measure);
        Self {
            cur_seed: Mutex::new(0),
            count,
            density,
            max_possible_seed_count,
        }
    }

    /// A budget with an explicit seed count and no derived density, for
    /// strategies where density is meaningless.
    fn fixed(count: usize) -> Self {
        Self {
            cur_seed: Mutex::new(0),
            count,
            density: 0.0,
            max_possible_seed_count: count,
        }
    }

    fn count(&self) -> usize {
        self.count
    }

    fn density(&self) -> f64 {
        self.density
    }

    /// Checks the seeding limits and, if still open, reserves and returns
    /// the next 0-based slot.
    fn reserve(&self) -> (SeederOutputState, usize) {
        if self.max_possible_seed_count == 0 {
            return (SeederOutputState::Empty, 0);
        }
        let mut cur = self.cur_seed.lock().unwrap_or_else(|p| p.into_inner());
        if *cur >= self.count.min(self.max_possible_seed_count) {
            return (SeederOutputState::LimitReached, 0);
        }
        let slot = *cur;
        *cur += 1;
        (SeederOutputState::Ok, slot)
    }
}

/// One of the six concrete seeding strategies, dispatched
/// through a single [`Seeder::get_seed`] entry point rather than a class
/// hierarchy.
pub enum Seeder {
    Image(ImageSeeder),
    SurfaceInterior(SurfaceInteriorSeeder),
    Surface(SurfaceSeeder),
    Sphere(SphereSeeder),
    List(ListSeeder),
}

impl Seeder {
    /// Produces the next seed, or the reason none is available right now
    ///. `rng` should be the calling worker
    /// thread's own [`RandomSource`] (e.g. `pool.rng(task.thread_id)`), so
    /// concurrent callers never contend on randomness.
    pub fn get_seed(&self, rng: &mut RandomSource) -> (SeederOutputState, Option<SeedSample>) {
        match self {
            Seeder::Image(s) => s.get_seed(rng),
            Seeder::SurfaceInterior(s) => s.get_seed(rng),
            Seeder::Surface(s) => s.get_seed(rng),
            Seeder::Sphere(s) => s.get_seed(rng),
            Seeder::List(s) => s.get_seed(rng),
        }
    }

    pub fn count(&self) -> usize {
        match self {
            Seeder::Image(s) => s.count(),
            Seeder::SurfaceInterior(s) => s.count(),
            Seeder::Surface(s) => s.count(),
            Seeder::Sphere(s) => s.count(),
            Seeder::List(s) => s.count(),
        }
    }

    pub fn density(&self) -> f64 {
        match self {
            Seeder::Image(s) => s.density(),
            Seeder::SurfaceInterior(s) => s.density(),
            Seeder::Surface(s) => s.density(),
            Seeder::Sphere(s) => s.density(),
            Seeder::List(s) => s.density(),
        }
    }
}
