//! Point-in-mesh queries via a voxelised classification grid.
//!
//! `isPointInsideSurface.cpp` rasterizes the surface into a mask-with-
//! boundary image, then for a query point: OUTSIDE -> false, INSIDE ->
//! true, BOUNDARY -> falls back to a thickness-banded distance test, and
//! finally to the winding number for closed components. The rasterizer
//! proper (producing a full classification image tied to an `Image`) is
//! `crate::rasterizer`; `PointCheck` here builds its own throwaway grid
//! local to the surface's bounding box, since `enablePointCheck` does not
//! need to share geometry with any particular `Image`.

use rustc_hash::FxHashSet;
use smallvec::SmallVec;

use crate::geometry::{segment_triangle_intersect, voxel_triangle_overlap, Segment};
use crate::numeric::WorldPoint;

use super::spatial::AabbTree;
use super::Surface;

/// Voxel edge length used to build the point-check grid.
#[derive(Debug, Clone, Copy)]
pub struct GridResolution {
    pub spacing: f64,
}

/// Distance, in world units, within which a BOUNDARY-classified voxel is
/// still considered "inside".
const THICKNESS_EPS: f64 = 1e-3;

/// Step taken past a voxel boundary crossing before re-classifying, so
/// that the walk lands strictly inside the next voxel, grounded on `intersectSegment.cpp`'s `EPS4`.
const STEP_EPS: f64 = 1e-4;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Classification {
    Inside,
    Outside,
    Boundary,
}

/// Result of [`PointCheck::intersect`]:
/// whether each endpoint lies inside the mesh, the distance to the
/// nearest crossing (`None` if the segment never meets the boundary), the
/// index of the crossed face, and whether the crossing exits the mesh.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct SegmentIntersection {
    pub beg_inside: bool,
    pub end_inside: bool,
    pub dist: Option<f64>,
    pub face_index: Option<usize>,
    pub towards_outside: bool,
}

impl SegmentIntersection {
    fn outside() -> Self {
        Self { beg_inside: false, end_inside: false, dist: None, face_index: None, towards_outside: false }
    }

    fn fully_inside() -> Self {
        Self { beg_inside: true, end_inside: true, dist: None, face_index: None, towards_outside: false }
    }
}

pub struct PointCheck {
    origin: WorldPoint,
    spacing: f64,
    dims: [usize; 3],
    classification: Vec<Classification>,
    boundary_faces: Vec<SmallVec<[u32; 8]>>,
    tree: AabbTree,
}

impl PointCheck {
    fn index_of(&self, ijk: [isize; 3]) -> Option<usize> {
        if ijk.iter().any(|&c| c < 0) {
            return None;
        }
        let (i, j, k) = (ijk[0] as usize, ijk[1] as usize, ijk[2] as usize);
        if i >= self.dims[0] || j >= self.dims[1] || k >= self.dims[2] {
            return None;
        }
        Some((k * self.dims[1] + j) * self.dims[0] + i)
    }

    fn voxel_centre(&self, i: usize, j: usize, k: usize) -> WorldPoint {
        self.origin + WorldPoint::new((i as f64 + 0.5) * self.spacing, (j as f64 + 0.5) * self.spacing, (k as f64 + 0.5) * self.spacing)
    }

    /// Converts a world point into the voxel-index space used by
    /// [`Self::intersect`], where voxel `i` is centred exactly on integer
    /// `i` and spans `[i-0.5, i+0.5)`.
    fn world_to_grid(&self, p: WorldPoint) -> WorldPoint {
        (p - self.origin) / self.spacing - WorldPoint::splat(0.5)
    }

    pub(super) fn build(surface: &Surface, resolution: GridResolution) -> Self {
        let spacing = resolution.spacing;
        let tree = AabbTree::build(surface);

        if surface.vertices.is_empty() {
            return Self {
                origin: WorldPoint::ZERO,
                spacing,
                dims: [0, 0, 0],
                classification: Vec::new(),
                boundary_faces: Vec::new(),
                tree,
            };
        }

        let mut lo = surface.vertices[0];
        let mut hi = surface.vertices[0];
        for &v in &surface.vertices {
            lo = lo.min(v);
            hi = hi.max(v);
        }
        let margin = spacing * 2.0;
        let origin = lo - WorldPoint::splat(margin);
        let extent = hi - lo + WorldPoint::splat(2.0 * margin);
        let dims = [
            (extent.x / spacing).ceil().max(1.0) as usize,
            (extent.y / spacing).ceil().max(1.0) as usize,
            (extent.z / spacing).ceil().max(1.0) as usize,
        ];

        let mut classification = vec![Classification::Outside; dims[0] * dims[1] * dims[2]];
        let mut boundary_faces = vec![SmallVec::new(); dims[0] * dims[1] * dims[2]];

        for (fi, face) in surface.faces.iter().enumerate() {
            let v0 = surface.vertices[face[0]];
            let v1 = surface.vertices[face[1]];
            let v2 = surface.vertices[face[2]];
            let mut flo = v0.min(v1).min(v2) - origin;
            let mut fhi = v0.max(v1).max(v2) - origin;
            flo /= spacing;
            fhi /= spacing;
            let i0 = (flo.x.floor() as isize - 1).max(0) as usize;
            let j0 = (flo.y.floor() as isize - 1).max(0) as usize;
            let k0 = (flo.z.floor() as isize - 1).max(0) as usize;
            let i1 = ((fhi.x.ceil() as isize + 1).max(0) as usize).min(dims[0].saturating_sub(1));
            let j1 = ((fhi.y.ceil() as isize + 1).max(0) as usize).min(dims[1].saturating_sub(1));
            let k1 = ((fhi.z.ceil() as isize + 1).max(0) as usize).min(dims[2].saturating_sub(1));

            for k in k0..=k1 {
                for j in j0..=j1 {
                    for i in i0..=i1 {
                        let centre = origin + WorldPoint::new((i as f64 + 0.5) * spacing, (j as f64 + 0.5) * spacing, (k as f64 + 0.5) * spacing);
                        if voxel_triangle_overlap(v0 - centre, v1 - centre, v2 - centre, spacing * 0.5, 1e-9) {
                            let idx = (k * dims[1] + j) * dims[0] + i;
                            classification[idx] = Classification::Boundary;
                            boundary_faces[idx].push(fi as u32);
                        }
                    }
                }
            }
        }

        let mut out = Self {
            origin,
            spacing,
            dims,
            classification,
            boundary_faces,
            tree,
        };

        for k in 0..dims[2] {
            for j in 0..dims[1] {
                for i in 0..dims[0] {
                    let idx = (k * dims[1] + j) * dims[0] + i;
                    if out.classification[idx] == Classification::Boundary {
                        continue;
                    }
                    let centre = out.voxel_centre(i, j, k);
                    out.classification[idx] = if out.tree.fast_winding_number(surface, centre) > 0.5 {
                        Classification::Inside
                    } else {
                        Classification::Outside
                    };
                }
            }
        }

        out
    }

    /// World-space centres of every voxel classified strictly `Inside`
    /// (never `Boundary`).
    pub fn inside_voxel_centres(&self) -> Vec<WorldPoint> {
        let mut out = Vec::new();
        for k in 0..self.dims[2] {
            for j in 0..self.dims[1] {
                for i in 0..self.dims[0] {
                    let idx = (k * self.dims[1] + j) * self.dims[0] + i;
                    if self.classification[idx] == Classification::Inside {
                        out.push(self.voxel_centre(i, j, k));
                    }
                }
            }
        }
        out
    }

    /// Edge length of one voxel cell in this grid, used to size the
    /// within-voxel jitter a caller applies to [`Self::inside_voxel_centres`].
    pub fn spacing(&self) -> f64 {
        self.spacing
    }

    /// Point-in-mesh test. `surface` must be the same
    /// surface this `PointCheck` was built from.
    pub fn is_inside(&self, surface: &Surface, p: WorldPoint) -> bool {
        let rel = (p - self.origin) / self.spacing;
        let ijk = [rel.x.floor() as isize, rel.y.floor() as isize, rel.z.floor() as isize];
        match self.index_of(ijk).map(|idx| self.classification[idx]) {
            Some(Classification::Inside) => true,
            Some(Classification::Outside) => false,
            Some(Classification::Boundary) | None => {
                if let Some((d2, _, _)) = self.tree.nearest(surface, p) {
                    if d2.sqrt() <= THICKNESS_EPS {
                        return true;
                    }
                }
                self.tree.fast_winding_number(surface, p) > 0.5
            }
        }
    }

    fn classify_at(
        &self,
        surface: &Surface,
        a: [isize; 3],
        seg: &Segment,
        faces_done: &mut FxHashSet<u32>,
        beg_end: &mut Option<(bool, bool)>,
    ) -> SegmentIntersection {
        let Some(idx) = self.index_of(a) else {
            return SegmentIntersection::outside();
        };
        match self.classification[idx] {
            Classification::Outside => SegmentIntersection::outside(),
            Classification::Inside => SegmentIntersection::fully_inside(),
            Classification::Boundary => {
                let &(beg_inside, end_inside) =
                    beg_end.get_or_insert_with(|| (self.is_inside(surface, seg.origin), self.is_inside(surface, seg.end())));

                let mut min_dist = f64::INFINITY;
                let mut hit_face = None;
                let mut towards_outside = false;
                for &fi in self.boundary_faces[idx].iter() {
                    if !faces_done.insert(fi) {
                        continue;
                    }
                    let face = surface.faces[fi as usize];
                    let v0 = surface.vertices[face[0]];
                    let v1 = surface.vertices[face[1]];
                    let v2 = surface.vertices[face[2]];
                    let cross = (v1 - v0).cross(v2 - v0);
                    let normal = if cross.length_squared() > 1e-24 { cross.normalize() } else { WorldPoint::ZERO };
                    if let Some(hit) = segment_triangle_intersect(seg.origin, seg.dir, seg.length, v0, v1, v2, normal, 0.0) {
                        if hit.t < min_dist {
                            min_dist = hit.t;
                            hit_face = Some(fi as usize);
                            towards_outside = seg.dir.dot(normal) > 0.0;
                        }
                    }
                }
                SegmentIntersection {
                    beg_inside,
                    end_inside,
                    dist: hit_face.map(|_| min_dist),
                    face_index: hit_face,
                    towards_outside,
                }
            }
        }
    }

    /// Walks `seg` voxel-by-voxel from its origin to its endpoint,
    /// testing any boundary voxel's recorded faces for a crossing.
    /// `surface` must be the same surface this `PointCheck` was built
    /// from.
    pub fn intersect(&self, surface: &Surface, seg: &Segment) -> SegmentIntersection {
        if self.dims.iter().any(|&d| d == 0) {
            return SegmentIntersection::outside();
        }

        let g0 = self.world_to_grid(seg.origin);
        let g1 = self.world_to_grid(seg.end());
        let mut a = [g0.x.round() as isize, g0.y.round() as isize, g0.z.round() as isize];
        let b = [g1.x.round() as isize, g1.y.round() as isize, g1.z.round() as isize];

        let mut faces_done: FxHashSet<u32> = FxHashSet::default();
        let mut beg_end: Option<(bool, bool)> = None;

        if a == b {
            return self.classify_at(surface, a, seg, &mut faces_done, &mut beg_end);
        }

        let mut p0 = g0;
        let delta = g1 - g0;
        let mut remaining = delta.length();
        if remaining < 1e-15 {
            return self.classify_at(surface, a, seg, &mut faces_done, &mut beg_end);
        }
        let dir = delta / remaining;

        loop {
            let candidate = self.classify_at(surface, a, seg, &mut faces_done, &mut beg_end);
            if candidate.dist.is_some() {
                return candidate;
            }

            let mut t = ray_trace_voxel(a, p0, dir).unwrap_or(0.0);
            if t > remaining {
                return candidate;
            }
            t += STEP_EPS;
            p0 += dir * t;
            a = [p0.x.round() as isize, p0.y.round() as isize, p0.z.round() as isize];
            remaining -= t;
            if remaining <= 0.0 {
                return candidate;
            }
        }
    }
}

/// Port of `rayTraceVoxel.cpp`: returns the parametric distance along
/// `(p0, dir)` (both in the voxel-index space of [`PointCheck::intersect`])
/// at which the ray exits voxel `a`, or `None` if it never enters it.
fn ray_trace_voxel(a: [isize; 3], p0: WorldPoint, dir: WorldPoint) -> Option<f64> {
    let t_rel = [p0.x - a[0] as f64, p0.y - a[1] as f64, p0.z - a[2] as f64];
    let d = [dir.x, dir.y, dir.z];

    let is_inside_voxel = |index: isize, value: f64| -> bool {
        if index == 0 {
            value > -0.5 && value < 0.5
        } else {
            value >= -0.5 && value < 0.5
        }
    };

    for axis in 0..3 {
        if d[axis] == 0.0 {
            continue;
        }
        let axis1 = (axis + 1) % 3;
        let axis2 = (axis + 2) % 3;
        let t = if d[axis] < 0.0 { (-0.5 - t_rel[axis]) / d[axis] } else { (0.5 - t_rel[axis]) / d[axis] };
        let valid_t = if d[axis] < 0.0 { if a[axis] > 0 { t >= 0.0 } else { t > 0.0 } } else { t > 0.0 };
        if valid_t {
            let u = t_rel[axis1] + t * d[axis1];
            let v = t_rel[axis2] + t * d[axis2];
            if is_inside_voxel(a[axis1], u) && is_inside_voxel(a[axis2], v) {
                return Some(t);
            }
        }
    }
    None
}
