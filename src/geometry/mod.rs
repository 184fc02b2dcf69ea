//! Segment/triangle and voxel/triangle intersection kernels: the
//! Möller-Trumbore and Akenine-Moller tests used throughout the surface
//! and rasterizer modules.

use crate::numeric::WorldPoint;

#[cfg(test)]
mod tests;

/// A point-and-direction record: origin, unit direction,
/// length along that direction, and an opaque attachment index for
/// caller use (the source's `void*` becomes a plain integer handle —
/// there is no use for type-erased payloads in a Rust rendering).
#[derive(Debug, Clone, Copy)]
pub struct Segment {
    pub origin: WorldPoint,
    pub dir: WorldPoint,
    pub length: f64,
    pub attachment: Option<u64>,
}

impl Segment {
    pub fn new(origin: WorldPoint, dir: WorldPoint, length: f64) -> Self {
        Self {
            origin,
            dir: dir.normalize(),
            length,
            attachment: None,
        }
    }

    pub fn end(&self) -> WorldPoint {
        self.origin + self.dir * self.length
    }
}

/// Result of a successful segment/triangle intersection test: parametric distance along the segment and the
/// incidence angle the source reports in degrees.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct SegmentTriangleHit {
    pub t: f64,
    pub u: f64,
    pub v: f64,
    pub incidence_deg: f64,
}

const MT_EPS: f64 = 1e-6;

/// Möller-Trumbore segment/triangle intersection.
/// `extend` lengthens the effective segment by `extend` at both ends,
/// matching the source's "extended" variant used to catch intersections
/// exactly at a streamline endpoint.
pub fn segment_triangle_intersect(
    seg_origin: WorldPoint,
    seg_dir: WorldPoint,
    seg_length: f64,
    v0: WorldPoint,
    v1: WorldPoint,
    v2: WorldPoint,
    face_normal: WorldPoint,
    extend: f64,
) -> Option<SegmentTriangleHit> {
    let e1 = v1 - v0;
    let e2 = v2 - v0;
    let p = seg_dir.cross(e2);
    let det = p.dot(e1);
    if det.abs() < MT_EPS {
        return None;
    }
    let inv_det = 1.0 / det;
    let t_vec = seg_origin - v0;
    let u = t_vec.dot(p) * inv_det;
    if u < 0.0 || u > 1.0 {
        return None;
    }
    let q = t_vec.cross(e1);
    let v = seg_dir.dot(q) * inv_det;
    if v < 0.0 || u + v > 1.0 {
        return None;
    }
    let t = e2.dot(q) * inv_det;
    if t < -extend || t > seg_length + extend {
        return None;
    }
    let cos_incidence = seg_dir.dot(face_normal).abs().min(1.0);
    let incidence_deg = 90.0 - cos_incidence.acos().to_degrees();
    Some(SegmentTriangleHit {
        t,
        u,
        v,
        incidence_deg,
    })
}

/// Separating-axis test between an axis-aligned voxel (centred at the
/// origin in voxel-local coordinates, half-size `half_size + eps`) and a
/// triangle given in the same voxel-local coordinate system.
pub fn voxel_triangle_overlap(v0: WorldPoint, v1: WorldPoint, v2: WorldPoint, half_size: f64, eps: f64) -> bool {
    let extent = half_size + eps;
    let verts = [v0, v1, v2];

    // 1. Triangle AABB vs voxel AABB (the 3 coordinate-axis tests).
    for axis in 0..3 {
        let (mut lo, mut hi) = (f64::INFINITY, f64::NEG_INFINITY);
        for vert in &verts {
            let c = component(*vert, axis);
            lo = lo.min(c);
            hi = hi.max(c);
        }
        if lo > extent || hi < -extent {
            return false;
        }
    }

    // 2. Triangle plane vs voxel (project the voxel half-extents onto
    // the face normal).
    let e0 = v1 - v0;
    let e1 = v2 - v1;
    let normal = e0.cross(e1);
    let r = extent * (normal.x.abs() + normal.y.abs() + normal.z.abs());
    let s = normal.dot(v0);
    if s.abs() > r {
        return false;
    }

    // 3. The 9 edge-cross axes (triangle edge x voxel face normal).
    let edges = [v1 - v0, v2 - v1, v0 - v2];
    let face_normals = [WorldPoint::X, WorldPoint::Y, WorldPoint::Z];
    for edge in &edges {
        for face_normal in &face_normals {
            let axis = edge.cross(*face_normal);
            if axis.length_squared() < 1e-18 {
                continue;
            }
            let mut lo = f64::INFINITY;
            let mut hi = f64::NEG_INFINITY;
            for vert in &verts {
                let p = vert.dot(axis);
                lo = lo.min(p);
                hi = hi.max(p);
            }
            let r = extent * (axis.x.abs() + axis.y.abs() + axis.z.abs());
            if lo > r || hi < -r {
                return false;
            }
        }
    }

    true
}

fn component(p: WorldPoint, axis: usize) -> f64 {
    match axis {
        0 => p.x,
        1 => p.y,
        _ => p.z,
    }
}
