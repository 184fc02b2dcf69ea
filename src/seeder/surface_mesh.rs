//! "Surface" seeding strategy: samples seed points uniformly across a
//! mesh's triangles, area-weighted.

use crate::error::{NibrError, Result};
use crate::numeric::{RandomSource, WorldPoint};
use crate::surface::Surface;

use super::{SeedBudget, SeedQuantity, SeedSample, SeederOutputState};

/// Distance, in world units, a generated point may sit off the mesh on the
/// side opposite its face normal before it is rejected and resampled
/// (`seedSurface.cpp`: "within surface border, i.e. (0.0 SURFTHICKNESS]").
/// Not given a fixed value upstream; chosen to match
/// [`crate::surface::pointcheck`]'s own boundary thickness tolerance.
const SURFTHICKNESS: f64 = 1e-3;

/// Area-weighted (or caller-supplied density-weighted) rejection sampling
/// over the faces of a surface, placing each point just inside the mesh on
/// the far side of its face normal, with an optional vertex-normal
/// direction (`useSurfNorm`).
pub struct SurfaceSeeder {
    vertices: Vec<WorldPoint>,
    faces: Vec<[usize; 3]>,
    face_normals: Vec<WorldPoint>,
    vertex_normals: Vec<WorldPoint>,
    faces_vec_dens: Vec<f64>,
    max4rs: f64,
    emit_direction: bool,
    budget: SeedBudget,
}

impl SurfaceSeeder {
    /// Clones `surface`, area-weights every face by default
    /// (`computeSeedCountAndDensity`) and keeps its own copy of the
    /// geometry it needs so [`Self::get_seed`] needs no outside reference.
    pub fn new(surface: &Surface, quantity: SeedQuantity) -> Self {
        let mut surface = surface.clone();
        let geom = surface.geometry().clone();
        let faces_vec_dens = geom.face_areas.clone();
        let max4rs = faces_vec_dens.iter().cloned().fold(0.0_f64, f64::max);
        let nf = surface.nf();
        let max_possible = if nf == 0 || max4rs == 0.0 { 0 } else { usize::MAX };
        Self {
            vertices: surface.vertices.clone(),
            faces: surface.faces.clone(),
            face_normals: geom.face_normals,
            vertex_normals: geom.vertex_normals,
            faces_vec_dens,
            max4rs,
            emit_direction: false,
            budget: SeedBudget::new(quantity, geom.total_area, max_possible),
        }
    }

    /// Enables emission of a barycentrically interpolated vertex-normal
    /// direction alongside each point (`useSurfNorm(true)`).
    pub fn with_surf_norm(mut self) -> Self {
        self.emit_direction = true;
        self
    }

    /// Overrides the default area weighting with a caller-supplied
    /// per-face density vector (`useDensity`).
    pub fn with_density(mut self, density: Vec<f64>) -> Result<Self> {
        if density.len() != self.faces.len() {
            return Err(NibrError::InvalidArgument(
                "surface sampling density size does not match the surface face count".to_string(),
            ));
        }
        self.max4rs = density.iter().cloned().fold(0.0_f64, f64::max);
        self.faces_vec_dens = density;
        Ok(self)
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
        if self.faces.is_empty() {
            return (SeederOutputState::Error, None);
        }

        loop {
            let f = rng.uniform_index(self.faces.len());
            // Faces weigh in proportional to `faces_vec_dens`, scaled
            // against `max4rs`: rejection sampling over a uniform face
            // pick.
            if rng.uniform01() * self.max4rs > self.faces_vec_dens[f] {
                continue;
            }

            let face = self.faces[f];
            let a = self.vertices[face[0]];
            let b = self.vertices[face[1]];
            let c = self.vertices[face[2]];
            let normal = self.face_normals[f];

            let (u, v) = rng.barycentric_uniform();
            let w = 1.0 - u - v;
            let mut p = a * w + b * u + c * v;

            // Normals point outward; place the point on the opposite side,
            // reflecting across the face plane if it landed on the wrong
            // one.
            let mut dist = normal.dot(a - p);
            if dist < 0.0 {
                p -= normal * (2.0 * dist);
                dist = normal.dot(p - a);
            }
            if dist <= 0.0 || dist > SURFTHICKNESS {
                continue;
            }

            let direction = if self.emit_direction {
                let na = self.vertex_normals[face[0]];
                let nb = self.vertex_normals[face[1]];
                let nc = self.vertex_normals[face[2]];
                let d = na * w + nb * u + nc * v;
                Some(if d.length_squared() > 1e-30 { d.normalize() } else { WorldPoint::ZERO })
            } else {
                None
            };

            return (SeederOutputState::Ok, Some(SeedSample { point: p, direction }));
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
    fn samples_stay_within_surf_thickness_of_the_cube() {
        let cube = unit_cube();
        let seeder = SurfaceSeeder::new(&cube, SeedQuantity::Count(200));
        let mut rng = RandomSource::from_seed(4, 0);
        for _ in 0..200 {
            let (state, sample) = seeder.get_seed(&mut rng);
            assert_eq!(state, SeederOutputState::Ok);
            let p = sample.unwrap().point;
            // Just inside the +-0.5 cube, never farther than SURFTHICKNESS
            // past any face.
            assert!(p.x.abs() <= 0.5 + SURFTHICKNESS);
            assert!(p.y.abs() <= 0.5 + SURFTHICKNESS);
            assert!(p.z.abs() <= 0.5 + SURFTHICKNESS);
        }
    }

    #[test]
    fn surf_norm_directions_are_unit_length() {
        let cube = unit_cube();
        let seeder = SurfaceSeeder::new(&cube, SeedQuantity::Count(50)).with_surf_norm();
        let mut rng = RandomSource::from_seed(6, 0);
        for _ in 0..50 {
            let (state, sample) = seeder.get_seed(&mut rng);
            assert_eq!(state, SeederOutputState::Ok);
            let dir = sample.unwrap().direction.unwrap();
            assert!((dir.length() - 1.0).abs() < 1e-6);
        }
    }

    #[test]
    fn mismatched_density_vector_is_rejected() {
        let cube = unit_cube();
        let seeder = SurfaceSeeder::new(&cube, SeedQuantity::Count(10));
        assert!(seeder.with_density(vec![1.0; 3]).is_err());
    }

    #[test]
    fn empty_surface_is_reported_empty() {
        let empty = Surface::new(Vec::new(), Vec::new());
        let seeder = SurfaceSeeder::new(&empty, SeedQuantity::Count(10));
        let mut rng = RandomSource::from_seed(1, 0);
        assert_eq!(seeder.get_seed(&mut rng).0, SeederOutputState::Empty);
    }
}
