//! Triangle mesh container: vertices, faces, lazily cached derived
//! structure (topology, geometry, connected components, spatial index)
//! and point/segment queries against the mesh.
//!
//! Any edit to `vertices`/`faces` must go through
//! [`Surface::set_faces`]/[`Surface::set_vertices`] (or a fresh
//! [`Surface::new`]) so the caches are invalidated together.

mod components;
mod fields;
pub mod geometry;
mod pointcheck;
pub mod reader;
mod spatial;
pub mod topology;
pub mod writer;

use crate::geometry::Segment;
use crate::numeric::WorldPoint;

pub use fields::{FieldKind, SurfaceFields};
pub use geometry::Geometry;
pub use pointcheck::{GridResolution, PointCheck, SegmentIntersection};
pub use reader::{read_stream, MeshFormat, MeshHeader, MeshReader};
pub use spatial::{winding_number, AabbTree};
pub use topology::{ClosedStatus, Edge, ManifoldStatus, Topology, VertexClass};
pub use writer::{write_stream, MeshWriter};

/// A triangle mesh in world coordinates. Faces are
/// stored as vertex-index triples in a consistent winding order; normals
/// and all derived structure are computed on demand and cached.
#[derive(Debug, Clone)]
pub struct Surface {
    pub vertices: Vec<WorldPoint>,
    pub faces: Vec<[usize; 3]>,
    pub fields: SurfaceFields,

    topology: Option<Topology>,
    geometry: Option<Geometry>,
    components: Option<Vec<Surface>>,
    spatial: Option<AabbTree>,
    point_check: Option<PointCheck>,
}

impl Surface {
    pub fn new(vertices: Vec<WorldPoint>, faces: Vec<[usize; 3]>) -> Self {
        Self {
            vertices,
            faces,
            fields: SurfaceFields::default(),
            topology: None,
            geometry: None,
            components: None,
            spatial: None,
            point_check: None,
        }
    }

    pub fn nv(&self) -> usize {
        self.vertices.len()
    }

    pub fn nf(&self) -> usize {
        self.faces.len()
    }

    fn invalidate(&mut self) {
        self.topology = None;
        self.geometry = None;
        self.components = None;
        self.spatial = None;
        self.point_check = None;
    }

    pub fn set_vertices(&mut self, vertices: Vec<WorldPoint>) {
        self.vertices = vertices;
        self.invalidate();
    }

    pub fn set_faces(&mut self, faces: Vec<[usize; 3]>) {
        self.faces = faces;
        self.invalidate();
    }

    /// Lazily computed edge/vertex classification.
    pub fn topology(&mut self) -> &Topology {
        if self.topology.is_none() {
            self.topology = Some(Topology::build(self));
        }
        self.topology.as_ref().unwrap()
    }

    /// Lazily computed face/vertex normals and areas.
    pub fn geometry(&mut self) -> &Geometry {
        if self.geometry.is_none() {
            self.geometry = Some(Geometry::build(self));
        }
        self.geometry.as_ref().unwrap()
    }

    /// Connected components, each materialised as a standalone `Surface`
    /// with remapped vertex indices.
    pub fn components(&mut self) -> &[Surface] {
        if self.components.is_none() {
            let comps = components::build(self);
            self.components = Some(comps);
        }
        self.components.as_ref().unwrap()
    }

    /// Lazily built AABB tree over faces.
    pub fn spatial_index(&mut self) -> &AabbTree {
        if self.spatial.is_none() {
            self.spatial = Some(AabbTree::build(self));
        }
        self.spatial.as_ref().unwrap()
    }

    /// Squared distance, closest point and face index nearest to `p`
    ///.
    pub fn nearest_point(&mut self, p: WorldPoint) -> Option<(f64, WorldPoint, usize)> {
        self.spatial_index();
        let tree = self.spatial.as_ref().unwrap();
        tree.nearest(self, p)
    }

    /// Winding number of `p` with respect to this surface.
    pub fn winding_number(&self, p: WorldPoint) -> f64 {
        winding_number(self, p)
    }

    /// Signed volume enclosed by this surface, meaningful only when the
    /// surface is closed.
    pub fn signed_volume(&self) -> f64 {
        geometry::signed_volume(self)
    }

    /// Manifold status: manifold iff no vertex is singular or
    /// overconnected.
    pub fn is_manifold(&mut self) -> ManifoldStatus {
        let topo = self.topology();
        if topo.vertex_class.iter().any(|c| matches!(c, VertexClass::Singular | VertexClass::Overconnected)) {
            ManifoldStatus::NotManifold
        } else {
            ManifoldStatus::Manifold
        }
    }

    /// Closedness: CLOSED iff every connected component is manifold with
    /// no boundary edges; OPEN iff none is; mixed components (some closed,
    /// some not) give OPENANDCLOSED. Per-component, not per-edge -- a
    /// single open component with an interior edge must still read OPEN,
    /// not OPENANDCLOSED.
    pub fn is_closed(&mut self) -> ClosedStatus {
        let comps = self.components();
        if comps.is_empty() {
            return ClosedStatus::Unknown;
        }
        let (mut any_closed, mut any_open) = (false, false);
        for comp in comps {
            let topo = Topology::build(comp);
            let closed = topo.boundary_edges.is_empty()
                && !topo.vertex_class.iter().any(|c| matches!(c, VertexClass::Singular | VertexClass::Overconnected));
            if closed {
                any_closed = true;
            } else {
                any_open = true;
            }
        }
        match (any_closed, any_open) {
            (true, false) => ClosedStatus::Closed,
            (false, true) => ClosedStatus::Open,
            _ => ClosedStatus::OpenAndClosed,
        }
    }

    /// Enables point-containment queries by voxelising the surface at the
    /// given grid resolution.
    pub fn enable_point_check(&mut self, resolution: GridResolution) {
        self.point_check = Some(PointCheck::build(self, resolution));
    }

    /// The voxelised classification grid built by
    /// [`Surface::enable_point_check`], if any -- used by
    /// [`crate::seeder`]'s "Surface interior" strategy to precompute a
    /// seedable index set.
    pub fn point_check(&self) -> Option<&PointCheck> {
        self.point_check.as_ref()
    }

    /// Point-in-mesh test; requires [`Surface::enable_point_check`] to
    /// have been called first.
    pub fn is_point_inside(&self, p: WorldPoint) -> Option<bool> {
        self.point_check.as_ref().map(|pc| pc.is_inside(self, p))
    }

    /// Segment/mesh intersection; requires [`Surface::enable_point_check`]
    /// to have been called first, since the walk reuses that grid's
    /// classification and per-voxel face lists.
    pub fn intersect(&self, seg: &Segment) -> Option<SegmentIntersection> {
        self.point_check.as_ref().map(|pc| pc.intersect(self, seg))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn tetrahedron() -> Surface {
        let v = vec![
            WorldPoint::new(0.0, 0.0, 0.0),
            WorldPoint::new(1.0, 0.0, 0.0),
            WorldPoint::new(0.0, 1.0, 0.0),
            WorldPoint::new(0.0, 0.0, 1.0),
        ];
        let f = vec![[0, 1, 2], [0, 3, 1], [0, 2, 3], [1, 3, 2]];
        Surface::new(v, f)
    }

    /// Two triangles sharing one interior diagonal: 4 boundary edges, 1
    /// interior edge. A single open component with an interior edge must
    /// read OPEN, not OPENANDCLOSED.
    fn triangulated_square() -> Surface {
        let v = vec![
            WorldPoint::new(0.0, 0.0, 0.0),
            WorldPoint::new(1.0, 0.0, 0.0),
            WorldPoint::new(1.0, 1.0, 0.0),
            WorldPoint::new(0.0, 1.0, 0.0),
        ];
        let f = vec![[0, 1, 2], [0, 2, 3]];
        Surface::new(v, f)
    }

    #[test]
    fn closed_tetrahedron_is_closed() {
        let mut s = tetrahedron();
        assert_eq!(s.is_closed(), ClosedStatus::Closed);
    }

    #[test]
    fn single_triangle_is_open() {
        let v = vec![WorldPoint::new(0.0, 0.0, 0.0), WorldPoint::new(1.0, 0.0, 0.0), WorldPoint::new(0.0, 1.0, 0.0)];
        let f = vec![[0, 1, 2]];
        let mut s = Surface::new(v, f);
        assert_eq!(s.is_closed(), ClosedStatus::Open);
    }

    #[test]
    fn open_disk_with_interior_edge_is_open_not_mixed() {
        let mut s = triangulated_square();
        assert_eq!(s.is_closed(), ClosedStatus::Open);
    }

    #[test]
    fn one_closed_and_one_open_component_is_open_and_closed() {
        let mut tetra = tetrahedron();
        let mut square = triangulated_square();
        let mut vertices = std::mem::take(&mut tetra.vertices);
        let offset = vertices.len();
        vertices.extend(square.vertices.drain(..));
        let mut faces = std::mem::take(&mut tetra.faces);
        faces.extend(square.faces.drain(..).map(|f| [f[0] + offset, f[1] + offset, f[2] + offset]));
        let mut combined = Surface::new(vertices, faces);
        assert_eq!(combined.is_closed(), ClosedStatus::OpenAndClosed);
    }
}

