//! Generic typed-stream mesh writer: the inverse of
//! [`super::reader`].

use std::io::Write;

use crate::error::{NibrError, Result};
use crate::image::reader::ByteOrder;
use crate::surface::reader::MeshFormat;
use crate::surface::Surface;

/// Sink that accepts a header description followed by the vertex and face
/// payloads independently.
pub trait MeshWriter {
    fn write_header(&mut self, format: MeshFormat, byte_order: ByteOrder, nv: usize, nf: usize) -> Result<()>;
    fn vertices(&mut self) -> &mut dyn Write;
    fn faces(&mut self) -> &mut dyn Write;
}

fn write_f32(order: ByteOrder, value: f32, out: &mut dyn Write) -> Result<()> {
    let bytes = match order {
        ByteOrder::Little => value.to_le_bytes(),
        ByteOrder::Big => value.to_be_bytes(),
    };
    out.write_all(&bytes)
        .map_err(|e| NibrError::FileError(format!("failed to write mesh vertex: {e}")))
}

fn write_i32(order: ByteOrder, value: i32, out: &mut dyn Write) -> Result<()> {
    let bytes = match order {
        ByteOrder::Little => value.to_le_bytes(),
        ByteOrder::Big => value.to_be_bytes(),
    };
    out.write_all(&bytes)
        .map_err(|e| NibrError::FileError(format!("failed to write mesh face: {e}")))
}

/// Writes `surface` through `writer` as `format`.
pub fn write_stream(writer: &mut dyn MeshWriter, surface: &Surface, format: MeshFormat, byte_order: ByteOrder) -> Result<()> {
    writer.write_header(format, byte_order, surface.nv(), surface.nf())?;

    {
        let stream = writer.vertices();
        for v in &surface.vertices {
            write_f32(byte_order, v.x as f32, stream)?;
            write_f32(byte_order, v.y as f32, stream)?;
            write_f32(byte_order, v.z as f32, stream)?;
        }
    }
    {
        let stream = writer.faces();
        for f in &surface.faces {
            write_i32(byte_order, f[0] as i32, stream)?;
            write_i32(byte_order, f[1] as i32, stream)?;
            write_i32(byte_order, f[2] as i32, stream)?;
        }
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::numeric::WorldPoint;

    struct VecWriter {
        vertices: Vec<u8>,
        faces: Vec<u8>,
    }

    impl MeshWriter for VecWriter {
        fn write_header(&mut self, _format: MeshFormat, _byte_order: ByteOrder, _nv: usize, _nf: usize) -> Result<()> {
            Ok(())
        }
        fn vertices(&mut self) -> &mut dyn Write {
            &mut self.vertices
        }
        fn faces(&mut self) -> &mut dyn Write {
            &mut self.faces
        }
    }

    #[test]
    fn round_trips_through_little_endian_records() {
        let surf = Surface::new(
            vec![WorldPoint::new(0.0, 0.0, 0.0), WorldPoint::new(1.0, 0.0, 0.0), WorldPoint::new(0.0, 1.0, 0.0)],
            vec![[0, 1, 2]],
        );
        let mut writer = VecWriter { vertices: Vec::new(), faces: Vec::new() };
        write_stream(&mut writer, &surf, MeshFormat::FreesurferMesh, ByteOrder::Little).unwrap();
        assert_eq!(writer.vertices.len(), 3 * 3 * 4);
        assert_eq!(writer.faces.len(), 3 * 4);
        assert_eq!(f32::from_le_bytes(writer.vertices[4..8].try_into().unwrap()), 0.0);
        assert_eq!(i32::from_le_bytes(writer.faces[8..12].try_into().unwrap()), 2);
    }
}
