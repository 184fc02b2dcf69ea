//! AABB tree over faces (nearest-point queries) and a BVH-accelerated
//! fast winding number: the same tree carries, per internal node, an
//! area-weighted normal sum and centroid so a query point far enough
//! from a node can take that node's dipole approximation instead of
//! descending into it, per Barill et al.'s "Fast Winding Numbers for Soups
//! and Clouds".

use std::f64::consts::PI;

use crate::numeric::WorldPoint;

use super::Surface;

/// How many node radii away a query point must be before its contribution
/// is approximated by the node's dipole moment instead of descended into.
/// `2.0` is the admissibility threshold Barill et al. use.
const FWN_BETA: f64 = 2.0;

#[derive(Debug, Clone, Copy)]
struct Aabb {
    min: WorldPoint,
    max: WorldPoint,
}

impl Aabb {
    fn of_triangle(v0: WorldPoint, v1: WorldPoint, v2: WorldPoint) -> Self {
        Self {
            min: v0.min(v1).min(v2),
            max: v0.max(v1).max(v2),
        }
    }
    fn union(self, other: Self) -> Self {
        Self {
            min: self.min.min(other.min),
            max: self.max.max(other.max),
        }
    }
    fn centroid(self) -> WorldPoint {
        (self.min + self.max) * 0.5
    }
    /// Lower bound on the squared distance from `p` to any point in the box.
    fn squared_distance_lower_bound(self, p: WorldPoint) -> f64 {
        let dx = (self.min.x - p.x).max(0.0).max(p.x - self.max.x);
        let dy = (self.min.y - p.y).max(0.0).max(p.y - self.max.y);
        let dz = (self.min.z - p.z).max(0.0).max(p.z - self.max.z);
        dx * dx + dy * dy + dz * dz
    }
    /// Distance from `centre` to the farthest corner of this box, an
    /// easily-computed bounding radius for the dipole admissibility test.
    fn radius_from(self, centre: WorldPoint) -> f64 {
        let dx = (self.max.x - centre.x).max(centre.x - self.min.x);
        let dy = (self.max.y - centre.y).max(centre.y - self.min.y);
        let dz = (self.max.z - centre.z).max(centre.z - self.min.z);
        (dx * dx + dy * dy + dz * dz).sqrt()
    }
}

/// A subtree's area-weighted winding aggregate: the sum of `area * normal`
/// over its triangles (a "dipole moment"), its area-weighted centroid, the
/// summed area and a bounding radius around that centroid.
#[derive(Debug, Clone, Copy)]
struct WindingAgg {
    area_normal: WorldPoint,
    centroid: WorldPoint,
    total_area: f64,
    radius: f64,
}

impl WindingAgg {
    fn of_triangle(v0: WorldPoint, v1: WorldPoint, v2: WorldPoint) -> Self {
        let cross = (v1 - v0).cross(v2 - v0);
        let area2 = cross.length();
        let normal = if area2 > 1e-18 { cross / area2 } else { WorldPoint::ZERO };
        let area = 0.5 * area2;
        let centroid = (v0 + v1 + v2) / 3.0;
        let radius = Aabb::of_triangle(v0, v1, v2).radius_from(centroid);
        Self { area_normal: normal * area, centroid, total_area: area, radius }
    }

    fn union(a: Self, b: Self, bbox: Aabb) -> Self {
        let total_area = a.total_area + b.total_area;
        let centroid = if total_area > 0.0 {
            (a.centroid * a.total_area + b.centroid * b.total_area) / total_area
        } else {
            (a.centroid + b.centroid) * 0.5
        };
        Self {
            area_normal: a.area_normal + b.area_normal,
            centroid,
            total_area,
            radius: bbox.radius_from(centroid),
        }
    }

    /// This aggregate's dipole-approximated contribution to the winding
    /// number seen from `p`, valid once `p` clears [`FWN_BETA`] radii.
    fn dipole_contribution(self, p: WorldPoint) -> f64 {
        let r = self.centroid - p;
        let d = r.length();
        if d < 1e-12 {
            0.0
        } else {
            self.area_normal.dot(r) / (d * d * d)
        }
    }
}

enum Node {
    Leaf { face: usize },
    Split { bbox: Aabb, agg: WindingAgg, left: Box<Node>, right: Box<Node> },
}

impl Node {
    fn bbox(&self, face_boxes: &[Aabb]) -> Aabb {
        match self {
            Node::Leaf { face } => face_boxes[*face],
            Node::Split { bbox, .. } => *bbox,
        }
    }

    fn winding_agg(&self, face_windings: &[WindingAgg]) -> WindingAgg {
        match self {
            Node::Leaf { face } => face_windings[*face],
            Node::Split { agg, .. } => *agg,
        }
    }
}

/// A bounding-volume hierarchy over a surface's faces supporting
/// nearest-point queries and a BVH-accelerated fast winding number: both
/// share the same tree, since a nearest-point and a winding-number query
/// descend the same face partition.
pub struct AabbTree {
    root: Option<Node>,
    face_boxes: Vec<Aabb>,
    face_windings: Vec<WindingAgg>,
}

fn build_recursive(indices: &mut [usize], face_boxes: &[Aabb], face_windings: &[WindingAgg]) -> Node {
    if indices.len() == 1 {
        return Node::Leaf { face: indices[0] };
    }
    let bbox = indices.iter().map(|&i| face_boxes[i]).reduce(Aabb::union).unwrap();
    let extent = bbox.max - bbox.min;
    let axis = if extent.x >= extent.y && extent.x >= extent.z {
        0
    } else if extent.y >= extent.z {
        1
    } else {
        2
    };
    indices.sort_by(|&a, &b| {
        let ca = face_boxes[a].centroid();
        let cb = face_boxes[b].centroid();
        let (va, vb) = match axis {
            0 => (ca.x, cb.x),
            1 => (ca.y, cb.y),
            _ => (ca.z, cb.z),
        };
        va.partial_cmp(&vb).unwrap()
    });
    let mid = indices.len() / 2;
    let (left_idx, right_idx) = indices.split_at_mut(mid);
    let left = build_recursive(left_idx, face_boxes, face_windings);
    let right = build_recursive(right_idx, face_boxes, face_windings);
    let agg = WindingAgg::union(left.winding_agg(face_windings), right.winding_agg(face_windings), bbox);
    Node::Split {
        bbox,
        agg,
        left: Box::new(left),
        right: Box::new(right),
    }
}

/// Squared distance from `p` to triangle `(a, b, c)`, plus the closest
/// point on the triangle, via the standard vertex/edge/face-region
/// projection test.
fn closest_point_on_triangle(p: WorldPoint, a: WorldPoint, b: WorldPoint, c: WorldPoint) -> (f64, WorldPoint) {
    let ab = b - a;
    let ac = c - a;
    let ap = p - a;
    let d1 = ab.dot(ap);
    let d2 = ac.dot(ap);
    if d1 <= 0.0 && d2 <= 0.0 {
        return ((p - a).length_squared(), a);
    }
    let bp = p - b;
    let d3 = ab.dot(bp);
    let d4 = ac.dot(bp);
    if d3 >= 0.0 && d4 <= d3 {
        return ((p - b).length_squared(), b);
    }
    let vc = d1 * d4 - d3 * d2;
    if vc <= 0.0 && d1 >= 0.0 && d3 <= 0.0 {
        let v = d1 / (d1 - d3);
        let pt = a + ab * v;
        return ((p - pt).length_squared(), pt);
    }
    let cp = p - c;
    let d5 = ab.dot(cp);
    let d6 = ac.dot(cp);
    if d6 >= 0.0 && d5 <= d6 {
        return ((p - c).length_squared(), c);
    }
    let vb = d5 * d2 - d1 * d6;
    if vb <= 0.0 && d2 >= 0.0 && d6 <= 0.0 {
        let w = d2 / (d2 - d6);
        let pt = a + ac * w;
        return ((p - pt).length_squared(), pt);
    }
    let va = d3 * d6 - d5 * d4;
    if va <= 0.0 && (d4 - d3) >= 0.0 && (d5 - d6) >= 0.0 {
        let w = (d4 - d3) / ((d4 - d3) + (d5 - d6));
        let pt = b + (c - b) * w;
        return ((p - pt).length_squared(), pt);
    }
    let denom = 1.0 / (va + vb + vc);
    let v = vb * denom;
    let w = vc * denom;
    let pt = a + ab * v + ac * w;
    ((p - pt).length_squared(), pt)
}

impl AabbTree {
    pub(super) fn build(surface: &Surface) -> Self {
        if surface.faces.is_empty() {
            return Self {
                root: None,
                face_boxes: Vec::new(),
                face_windings: Vec::new(),
            };
        }
        let face_boxes: Vec<Aabb> = surface
            .faces
            .iter()
            .map(|f| Aabb::of_triangle(surface.vertices[f[0]], surface.vertices[f[1]], surface.vertices[f[2]]))
            .collect();
        let face_windings: Vec<WindingAgg> = surface
            .faces
            .iter()
            .map(|f| WindingAgg::of_triangle(surface.vertices[f[0]], surface.vertices[f[1]], surface.vertices[f[2]]))
            .collect();
        let mut indices: Vec<usize> = (0..surface.faces.len()).collect();
        let root = build_recursive(&mut indices, &face_boxes, &face_windings);
        Self {
            root: Some(root),
            face_boxes,
            face_windings,
        }
    }

    /// Nearest-point query: returns `(squared_distance, closest_point, face_index)`.
    pub fn nearest(&self, surface: &Surface, p: WorldPoint) -> Option<(f64, WorldPoint, usize)> {
        let root = self.root.as_ref()?;
        let mut best = (f64::INFINITY, WorldPoint::ZERO, usize::MAX);
        let mut stack = vec![root];
        while let Some(node) = stack.pop() {
            if node.bbox(&self.face_boxes).squared_distance_lower_bound(p) >= best.0 {
                continue;
            }
            match node {
                Node::Leaf { face } => {
                    let f = surface.faces[*face];
                    let (d2, pt) = closest_point_on_triangle(p, surface.vertices[f[0]], surface.vertices[f[1]], surface.vertices[f[2]]);
                    if d2 < best.0 {
                        best = (d2, pt, *face);
                    }
                }
                Node::Split { left, right, .. } => {
                    stack.push(left);
                    stack.push(right);
                }
            }
        }
        if best.2 == usize::MAX {
            None
        } else {
            Some(best)
        }
    }

    /// BVH-accelerated winding number of `p` with respect to `surface`:
    /// descends the tree only while `p` is within `FWN_BETA` node radii
    /// of a node's centroid, and otherwise substitutes that whole
    /// subtree's area-weighted dipole moment for an exact per-triangle
    /// solid-angle sum, per Barill et al.
    pub fn fast_winding_number(&self, surface: &Surface, p: WorldPoint) -> f64 {
        let Some(root) = self.root.as_ref() else {
            return 0.0;
        };
        let mut total = 0.0;
        let mut stack = vec![root];
        while let Some(node) = stack.pop() {
            match node {
                Node::Leaf { face } => {
                    let f = surface.faces[*face];
                    total += solid_angle(p, surface.vertices[f[0]], surface.vertices[f[1]], surface.vertices[f[2]]);
                }
                Node::Split { agg, left, right, .. } => {
                    let d = (agg.centroid - p).length();
                    if d > FWN_BETA * agg.radius {
                        total += agg.dipole_contribution(p);
                    } else {
                        stack.push(left);
                        stack.push(right);
                    }
                }
            }
        }
        total / (4.0 * PI)
    }
}

/// Solid angle subtended by triangle `(a, b, c)` as seen from `p`, via the
/// Van Oosterom-Strackee formula; summed over all faces and divided by
/// `4*pi` gives the exact winding number.
fn solid_angle(p: WorldPoint, a: WorldPoint, b: WorldPoint, c: WorldPoint) -> f64 {
    let ra = a - p;
    let rb = b - p;
    let rc = c - p;
    let la = ra.length();
    let lb = rb.length();
    let lc = rc.length();
    let numerator = ra.dot(rb.cross(rc));
    let denominator = la * lb * lc + ra.dot(rb) * lc + rb.dot(rc) * la + rc.dot(ra) * lb;
    2.0 * numerator.atan2(denominator)
}

/// Exact, brute-summed winding number of `p` with respect to `surface`,
/// kept as the reference implementation [`AabbTree::fast_winding_number`]
/// is checked against.
pub fn winding_number(surface: &Surface, p: WorldPoint) -> f64 {
    let mut total = 0.0;
    for face in &surface.faces {
        total += solid_angle(p, surface.vertices[face[0]], surface.vertices[face[1]], surface.vertices[face[2]]);
    }
    total / (4.0 * PI)
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
    fn winding_number_is_one_inside_closed_cube() {
        let s = unit_cube();
        assert!((winding_number(&s, WorldPoint::ZERO) - 1.0).abs() < 1e-6);
        assert!(winding_number(&s, WorldPoint::new(5.0, 5.0, 5.0)).abs() < 1e-6);
    }

    #[test]
    fn nearest_point_on_cube_face() {
        let s = unit_cube();
        let tree = AabbTree::build(&s);
        let (d2, pt, _) = tree.nearest(&s, WorldPoint::new(0.0, 0.0, 5.0)).unwrap();
        assert!((d2 - (4.5f64 * 4.5)).abs() < 1e-6);
        assert!((pt.z - 0.5).abs() < 1e-9);
    }

    /// A subdivided cube (4 triangles per face instead of 2) so the
    /// `fast_winding_number` traversal actually reaches internal nodes
    /// that take the dipole shortcut rather than bottoming out at leaves
    /// on every query.
    fn subdivided_cube() -> Surface {
        let h = 0.5;
        let verts = [
            WorldPoint::new(-h, -h, -h),
            WorldPoint::new(h, -h, -h),
            WorldPoint::new(h, h, -h),
            WorldPoint::new(-h, h, -h),
            WorldPoint::new(-h, -h, h),
            WorldPoint::new(h, -h, h),
            WorldPoint::new(h, h, h),
            WorldPoint::new(-h, h, h),
        ];
        let faces = [
            [0, 2, 1], [0, 3, 2],
            [4, 5, 6], [4, 6, 7],
            [0, 1, 5], [0, 5, 4],
            [1, 2, 6], [1, 6, 5],
            [2, 3, 7], [2, 7, 6],
            [3, 0, 4], [3, 4, 7],
        ];
        let mut v = verts.to_vec();
        let mut f = Vec::new();
        for face in faces {
            let a = verts[face[0]];
            let b = verts[face[1]];
            let c = verts[face[2]];
            let mid = v.len();
            v.push((a + b) * 0.5);
            v.push((b + c) * 0.5);
            v.push((c + a) * 0.5);
            f.push([face[0], mid, mid + 2]);
            f.push([mid, face[1], mid + 1]);
            f.push([mid + 2, mid + 1, face[2]]);
            f.push([mid, mid + 1, mid + 2]);
        }
        Surface::new(v, f)
    }

    #[test]
    fn fast_winding_number_agrees_with_exact_sum_inside_and_outside() {
        let s = subdivided_cube();
        let tree = AabbTree::build(&s);
        for p in [
            WorldPoint::ZERO,
            WorldPoint::new(0.1, -0.2, 0.05),
            WorldPoint::new(5.0, 5.0, 5.0),
            WorldPoint::new(-3.0, 1.0, 0.2),
            WorldPoint::new(10.0, -10.0, 2.0),
        ] {
            let exact = winding_number(&s, p);
            let fast = tree.fast_winding_number(&s, p);
            assert!((exact - fast).abs() < 1e-3, "p={p:?} exact={exact} fast={fast}");
        }
    }

    #[test]
    fn fast_winding_number_classifies_inside_and_outside_like_exact() {
        let s = subdivided_cube();
        let tree = AabbTree::build(&s);
        assert!(tree.fast_winding_number(&s, WorldPoint::ZERO) > 0.5);
        assert!(tree.fast_winding_number(&s, WorldPoint::new(50.0, 50.0, 50.0)) < 0.5);
    }
}
