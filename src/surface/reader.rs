//! Generic typed-stream mesh reader. As with [`crate::image::reader`],
//! file-format compatibility guarantees are out of scope;
//! this module owns the *interface* every concrete mesh format feeds
//! into -- vertex/face counts, coordinate byte order -- applied exactly
//! once per record.

use std::io::Read;

use crate::error::{NibrError, Result};
use crate::image::reader::ByteOrder;
use crate::numeric::WorldPoint;
use crate::surface::Surface;

/// Which on-disk mesh container produced this stream. Carried purely as a
/// label; every format decodes through the same vertex/face record shape.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MeshFormat {
    VtkLegacy,
    Gifti,
    FreesurferMesh,
}

/// Geometry decoded from a format-specific header, handed to
/// [`read_stream`] to actually materialise the mesh.
#[derive(Debug, Clone)]
pub struct MeshHeader {
    pub format: MeshFormat,
    pub nv: usize,
    pub nf: usize,
    pub byte_order: ByteOrder,
}

/// A source that can produce a [`MeshHeader`] and then stream its vertex
/// and face payloads independently.
pub trait MeshReader {
    fn read_header(&mut self) -> Result<MeshHeader>;
    /// `nv` consecutive `(x, y, z)` `f32` triples, in `byte_order`.
    fn vertices(&mut self) -> &mut dyn Read;
    /// `nf` consecutive vertex-index `i32` triples, in `byte_order`.
    fn faces(&mut self) -> &mut dyn Read;
}

fn read_f32(order: ByteOrder, stream: &mut dyn Read) -> Result<f32> {
    let mut bytes = [0u8; 4];
    stream
        .read_exact(&mut bytes)
        .map_err(|e| NibrError::FileError(format!("truncated mesh vertex stream: {e}")))?;
    Ok(match order {
        ByteOrder::Little => f32::from_le_bytes(bytes),
        ByteOrder::Big => f32::from_be_bytes(bytes),
    })
}

fn read_i32(order: ByteOrder, stream: &mut dyn Read) -> Result<i32> {
    let mut bytes = [0u8; 4];
    stream
        .read_exact(&mut bytes)
        .map_err(|e| NibrError::FileError(format!("truncated mesh face stream: {e}")))?;
    Ok(match order {
        ByteOrder::Little => i32::from_le_bytes(bytes),
        ByteOrder::Big => i32::from_be_bytes(bytes),
    })
}

/// Reads `reader`'s vertex and face streams into a [`Surface`].
pub fn read_stream(reader: &mut dyn MeshReader) -> Result<Surface> {
    let header = reader.read_header()?;

    let mut vertices = Vec::with_capacity(header.nv);
    {
        let stream = reader.vertices();
        for _ in 0..header.nv {
            let x = read_f32(header.byte_order, stream)? as f64;
            let y = read_f32(header.byte_order, stream)? as f64;
            let z = read_f32(header.byte_order, stream)? as f64;
            vertices.push(WorldPoint::new(x, y, z));
        }
    }

    let mut faces = Vec::with_capacity(header.nf);
    {
        let stream = reader.faces();
        for _ in 0..header.nf {
            let a = read_i32(header.byte_order, stream)?;
            let b = read_i32(header.byte_order, stream)?;
            let c = read_i32(header.byte_order, stream)?;
            if a < 0 || b < 0 || c < 0 {
                return Err(NibrError::FileError("negative vertex index in mesh face stream".to_string()));
            }
            let face = [a as usize, b as usize, c as usize];
            if face.iter().any(|&i| i >= header.nv) {
                return Err(NibrError::FileError("face references a vertex index out of range".to_string()));
            }
            faces.push(face);
        }
    }

    Ok(Surface::new(vertices, faces))
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Cursor;

    struct FixedReader {
        header: MeshHeader,
        vertices: Cursor<Vec<u8>>,
        faces: Cursor<Vec<u8>>,
    }

    impl MeshReader for FixedReader {
        fn read_header(&mut self) -> Result<MeshHeader> {
            Ok(self.header.clone())
        }
        fn vertices(&mut self) -> &mut dyn Read {
            &mut self.vertices
        }
        fn faces(&mut self) -> &mut dyn Read {
            &mut self.faces
        }
    }

    fn triangle_bytes() -> (Vec<u8>, Vec<u8>) {
        let mut v = Vec::new();
        for p in [[0.0f32, 0.0, 0.0], [1.0, 0.0, 0.0], [0.0, 1.0, 0.0]] {
            for c in p {
                v.extend_from_slice(&c.to_le_bytes());
            }
        }
        let mut f = Vec::new();
        for i in [0i32, 1, 2] {
            f.extend_from_slice(&i.to_le_bytes());
        }
        (v, f)
    }

    #[test]
    fn reads_a_single_triangle() {
        let (v, f) = triangle_bytes();
        let mut reader = FixedReader {
            header: MeshHeader { format: MeshFormat::VtkLegacy, nv: 3, nf: 1, byte_order: ByteOrder::Little },
            vertices: Cursor::new(v),
            faces: Cursor::new(f),
        };
        let surf = read_stream(&mut reader).unwrap();
        assert_eq!(surf.nv(), 3);
        assert_eq!(surf.nf(), 1);
        assert_eq!(surf.faces[0], [0, 1, 2]);
    }

    #[test]
    fn out_of_range_face_index_is_a_file_error() {
        let (v, _) = triangle_bytes();
        let mut bad_faces = Vec::new();
        for i in [0i32, 1, 5] {
            bad_faces.extend_from_slice(&i.to_le_bytes());
        }
        let mut reader = FixedReader {
            header: MeshHeader { format: MeshFormat::Gifti, nv: 3, nf: 1, byte_order: ByteOrder::Little },
            vertices: Cursor::new(v),
            faces: Cursor::new(bad_faces),
        };
        assert!(matches!(read_stream(&mut reader), Err(NibrError::FileError(_))));
    }
}
