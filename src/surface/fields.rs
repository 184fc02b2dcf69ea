//! Named per-vertex/per-face scalar or vector attributes attached to a
//! surface (`location`, `name`, `type`, `dimension`, `data`). The VTK
//! `POINT_DATA`/`CELL_DATA` text format such fields are typically read
//! from is a reader/writer concern and stays out of scope here; this
//! module only holds the decoded values in memory.

use std::collections::HashMap;

/// Where a field's values are indexed: one entry per vertex, or one per
/// face (VTK's `POINT_DATA` vs `CELL_DATA`).
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FieldKind {
    Vertex,
    Face,
}

#[derive(Debug, Clone)]
pub enum FieldValues {
    Scalar(Vec<f64>),
    Vector(Vec<[f64; 3]>),
}

#[derive(Debug, Clone)]
pub struct Field {
    pub kind: FieldKind,
    pub values: FieldValues,
}

/// All named fields attached to a surface, keyed by name; vertex and
/// face fields share one namespace since the original format tags each
/// `SCALARS` block with its own `POINT_DATA`/`CELL_DATA` section.
#[derive(Debug, Clone, Default)]
pub struct SurfaceFields {
    fields: HashMap<String, Field>,
}

impl SurfaceFields {
    pub fn insert_scalar(&mut self, name: impl Into<String>, kind: FieldKind, values: Vec<f64>) {
        self.fields.insert(name.into(), Field { kind, values: FieldValues::Scalar(values) });
    }

    pub fn insert_vector(&mut self, name: impl Into<String>, kind: FieldKind, values: Vec<[f64; 3]>) {
        self.fields.insert(name.into(), Field { kind, values: FieldValues::Vector(values) });
    }

    pub fn get(&self, name: &str) -> Option<&Field> {
        self.fields.get(name)
    }

    pub fn remove(&mut self, name: &str) -> Option<Field> {
        self.fields.remove(name)
    }

    pub fn names(&self) -> impl Iterator<Item = &str> {
        self.fields.keys().map(|s| s.as_str())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn round_trips_a_scalar_vertex_field() {
        let mut fields = SurfaceFields::default();
        fields.insert_scalar("curvature", FieldKind::Vertex, vec![0.1, 0.2, 0.3]);
        let field = fields.get("curvature").unwrap();
        assert_eq!(field.kind, FieldKind::Vertex);
        match &field.values {
            FieldValues::Scalar(v) => assert_eq!(v.len(), 3),
            _ => panic!("expected scalar field"),
        }
    }

    #[test]
    fn missing_field_is_none() {
        let fields = SurfaceFields::default();
        assert!(fields.get("nope").is_none());
    }
}
