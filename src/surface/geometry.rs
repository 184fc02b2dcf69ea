//! Derived geometric quantities: face/vertex normals, face areas, total
//! area and per-component volume.

use crate::numeric::WorldPoint;

use super::Surface;

#[derive(Debug, Clone)]
pub struct Geometry {
    pub face_normals: Vec<WorldPoint>,
    pub vertex_normals: Vec<WorldPoint>,
    pub face_areas: Vec<f64>,
    pub total_area: f64,
}

impl Geometry {
    pub(super) fn build(surface: &Surface) -> Self {
        let mut face_normals = Vec::with_capacity(surface.nf());
        let mut face_areas = Vec::with_capacity(surface.nf());
        let mut vertex_accum = vec![WorldPoint::ZERO; surface.nv()];

        for face in &surface.faces {
            let v0 = surface.vertices[face[0]];
            let v1 = surface.vertices[face[1]];
            let v2 = surface.vertices[face[2]];
            let cross = (v1 - v0).cross(v2 - v0);
            let len = cross.length();
            let area = 0.5 * len;
            let normal = if len > 1e-15 { cross / len } else { WorldPoint::ZERO };
            face_normals.push(normal);
            face_areas.push(area);
            // Area-weighted accumulation for vertex normals (the cross
            // product's magnitude already carries twice the face area).
            for &v in face {
                vertex_accum[v] += cross;
            }
        }
        let vertex_normals = vertex_accum
            .into_iter()
            .map(|acc| if acc.length_squared() > 1e-30 { acc.normalize() } else { WorldPoint::ZERO })
            .collect();

        let total_area = face_areas.iter().sum();

        Self {
            face_normals,
            vertex_normals,
            face_areas,
            total_area,
        }
    }
}

/// Signed volume enclosed by a single connected, closed component,
/// computed as the sum of signed tetrahedron volumes from the origin to
/// each face.
pub fn signed_volume(surface: &Surface) -> f64 {
    let mut vol = 0.0;
    for face in &surface.faces {
        let v0 = surface.vertices[face[0]];
        let v1 = surface.vertices[face[1]];
        let v2 = surface.vertices[face[2]];
        vol += v0.dot(v1.cross(v2)) / 6.0;
    }
    vol
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;

    fn unit_cube() -> Surface {
        // 8 vertices, 12 faces, outward-oriented, centred at origin.
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
            [0, 2, 1], [0, 3, 2], // bottom (z=-h), normal -z
            [4, 5, 6], [4, 6, 7], // top (z=+h), normal +z
            [0, 1, 5], [0, 5, 4], // front (y=-h)
            [1, 2, 6], [1, 6, 5], // right (x=+h)
            [2, 3, 7], [2, 7, 6], // back (y=+h)
            [3, 0, 4], [3, 4, 7], // left (x=-h)
        ];
        Surface::new(v, f)
    }

    #[test]
    fn cube_total_area_and_volume() {
        let s = unit_cube();
        let geom = Geometry::build(&s);
        assert_relative_eq!(geom.total_area, 6.0, epsilon = 1e-9);
        assert_relative_eq!(signed_volume(&s).abs(), 1.0, epsilon = 1e-9);
    }

    #[test]
    fn face_normals_are_unit_length() {
        let s = unit_cube();
        let geom = Geometry::build(&s);
        for n in &geom.face_normals {
            assert_relative_eq!(n.length(), 1.0, epsilon = 1e-9);
        }
    }
}
