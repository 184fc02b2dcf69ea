//! Edge enumeration and vertex/face classification, using an
//! ordered-pair edge key and a cached derivation struct.

use rustc_hash::FxHashMap;
use smallvec::SmallVec;

use super::Surface;

/// An undirected edge, stored with `v0 < v1` so it hashes identically
/// regardless of which face enumerated it first.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct Edge {
    pub v0: usize,
    pub v1: usize,
}

impl Edge {
    pub fn new(a: usize, b: usize) -> Self {
        if a < b {
            Self { v0: a, v1: b }
        } else {
            Self { v0: b, v1: a }
        }
    }
}

/// Manifold/closedness classification.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ManifoldStatus {
    Manifold,
    NotManifold,
    Unknown,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ClosedStatus {
    Open,
    Closed,
    OpenAndClosed,
    Unknown,
}

/// Per-vertex incident-face classification.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum VertexClass {
    Regular,
    Boundary,
    Singular,
    Overconnected,
}

/// Lazily computed topology, invalidated as a whole on any mesh edit.
#[derive(Debug, Clone)]
pub struct Topology {
    pub edge_faces: FxHashMap<Edge, SmallVec<[usize; 4]>>,
    pub boundary_edges: Vec<Edge>,
    pub vertex_adjacency: Vec<SmallVec<[usize; 8]>>,
    pub vertex_faces: Vec<SmallVec<[usize; 8]>>,
    pub vertex_class: Vec<VertexClass>,
}

fn face_edges(face: [usize; 3]) -> [Edge; 3] {
    [Edge::new(face[0], face[1]), Edge::new(face[1], face[2]), Edge::new(face[2], face[0])]
}

impl Topology {
    pub(super) fn build(surface: &Surface) -> Self {
        let nv = surface.nv();
        let mut edge_faces: FxHashMap<Edge, SmallVec<[usize; 4]>> = FxHashMap::default();
        let mut vertex_faces: Vec<SmallVec<[usize; 8]>> = vec![SmallVec::new(); nv];
        let mut vertex_adjacency: Vec<SmallVec<[usize; 8]>> = vec![SmallVec::new(); nv];

        for (fi, face) in surface.faces.iter().enumerate() {
            for &v in face {
                vertex_faces[v].push(fi);
            }
            for edge in face_edges(*face) {
                edge_faces.entry(edge).or_default().push(fi);
            }
        }
        for (edge, _) in edge_faces.iter() {
            vertex_adjacency[edge.v0].push(edge.v1);
            vertex_adjacency[edge.v1].push(edge.v0);
        }

        let boundary_edges: Vec<Edge> = edge_faces
            .iter()
            .filter(|(_, faces)| faces.len() == 1)
            .map(|(e, _)| *e)
            .collect();

        let vertex_class = classify_vertices(surface, &edge_faces, &vertex_faces);

        Self {
            edge_faces,
            boundary_edges,
            vertex_adjacency,
            vertex_faces,
            vertex_class,
        }
    }

    pub fn is_boundary_edge(&self, e: Edge) -> bool {
        self.edge_faces.get(&e).map(|f| f.len() == 1).unwrap_or(false)
    }

    pub fn num_edges(&self) -> usize {
        self.edge_faces.len()
    }
}

/// Walks the fan of faces around each vertex via its incident edges; a
/// vertex is **regular** if its incident faces form one closed fan,
/// **boundary** if one open fan terminated by two boundary edges,
/// **singular** if the incident faces split into more than one fan, and
/// **overconnected** if it touches 3+ boundary edges.
fn classify_vertices(
    surface: &Surface,
    edge_faces: &FxHashMap<Edge, SmallVec<[usize; 4]>>,
    vertex_faces: &[SmallVec<[usize; 8]>],
) -> Vec<VertexClass> {
    let nv = surface.nv();
    let mut classes = Vec::with_capacity(nv);
    for v in 0..nv {
        let incident = &vertex_faces[v];
        if incident.is_empty() {
            classes.push(VertexClass::Regular);
            continue;
        }
        // Count boundary edges touching this vertex.
        let boundary_count = incident
            .iter()
            .flat_map(|&fi| face_edges(surface.faces[fi]))
            .filter(|e| (e.v0 == v || e.v1 == v) && edge_faces.get(e).map(|f| f.len() == 1).unwrap_or(false))
            .collect::<ahash::AHashSet<_>>()
            .len();

        if boundary_count >= 3 {
            classes.push(VertexClass::Overconnected);
            continue;
        }

        // Fan-walk: starting from one incident face, hop across shared
        // non-boundary edges touching `v` until we can't continue; count
        // how many distinct faces that reaches.
        let mut visited = vec![false; incident.len()];
        let index_of = |fi: usize| incident.iter().position(|&f| f == fi);
        let mut fans = 0usize;
        for start in 0..incident.len() {
            if visited[start] {
                continue;
            }
            fans += 1;
            let mut stack = vec![start];
            visited[start] = true;
            while let Some(cur) = stack.pop() {
                let face = surface.faces[incident[cur]];
                for edge in face_edges(face) {
                    if edge.v0 != v && edge.v1 != v {
                        continue;
                    }
                    if let Some(neighbours) = edge_faces.get(&edge) {
                        if neighbours.len() != 2 {
                            continue;
                        }
                        for &nf in neighbours.iter() {
                            if let Some(ni) = index_of(nf) {
                                if !visited[ni] {
                                    visited[ni] = true;
                                    stack.push(ni);
                                }
                            }
                        }
                    }
                }
            }
        }

        classes.push(if fans > 1 {
            VertexClass::Singular
        } else if boundary_count > 0 {
            VertexClass::Boundary
        } else {
            VertexClass::Regular
        });
    }
    classes
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::numeric::WorldPoint;

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

    #[test]
    fn closed_tetrahedron_has_no_boundary_edges() {
        let mut s = tetrahedron();
        let topo = s.topology();
        assert!(topo.boundary_edges.is_empty());
        assert_eq!(topo.num_edges(), 6);
    }

    #[test]
    fn single_triangle_has_three_boundary_vertices() {
        let v = vec![WorldPoint::new(0.0, 0.0, 0.0), WorldPoint::new(1.0, 0.0, 0.0), WorldPoint::new(0.0, 1.0, 0.0)];
        let f = vec![[0, 1, 2]];
        let mut s = Surface::new(v, f);
        let topo = s.topology();
        assert_eq!(topo.boundary_edges.len(), 3);
        assert!(topo.vertex_class.iter().all(|c| *c == VertexClass::Boundary));
    }

    #[test]
    fn tetrahedron_vertices_are_regular() {
        let mut s = tetrahedron();
        let topo = s.topology();
        assert!(topo.vertex_class.iter().all(|c| *c == VertexClass::Regular));
    }
}
