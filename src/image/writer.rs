//! Generic typed-stream writer: the inverse of
//! [`super::reader`] — if storage order differs from canonical, a scratch
//! buffer re-permutes before writing.

use std::io::Write;

use crate::error::{NibrError, Result};
use crate::image::reader::{ByteOrder, OnDiskDataType};
use crate::image::storage::IndexOrder;
use crate::image::{Image, VoxelElement};

/// Sink that accepts a header description followed by the raw payload
/// bytes.
pub trait ImageWriter {
    fn write_header(&mut self, data_type: OnDiskDataType, byte_order: ByteOrder, img_dims: [usize; 7]) -> Result<()>;
    fn payload(&mut self) -> &mut dyn Write;
}

fn encode_one(dt: OnDiskDataType, order: ByteOrder, value: f64, out: &mut Vec<u8>) {
    use ByteOrder::*;
    use OnDiskDataType::*;
    match (dt, order) {
        (Bool, _) => out.push((value != 0.0) as u8),
        (I8, _) => out.push(value as i8 as u8),
        (U8, _) => out.push(value as u8),
        (I16, Little) => out.extend_from_slice(&(value as i16).to_le_bytes()),
        (I16, Big) => out.extend_from_slice(&(value as i16).to_be_bytes()),
        (U16, Little) => out.extend_from_slice(&(value as u16).to_le_bytes()),
        (U16, Big) => out.extend_from_slice(&(value as u16).to_be_bytes()),
        (I32, Little) => out.extend_from_slice(&(value as i32).to_le_bytes()),
        (I32, Big) => out.extend_from_slice(&(value as i32).to_be_bytes()),
        (U32, Little) => out.extend_from_slice(&(value as u32).to_le_bytes()),
        (U32, Big) => out.extend_from_slice(&(value as u32).to_be_bytes()),
        (I64, Little) => out.extend_from_slice(&(value as i64).to_le_bytes()),
        (I64, Big) => out.extend_from_slice(&(value as i64).to_be_bytes()),
        (U64, Little) => out.extend_from_slice(&(value as u64).to_le_bytes()),
        (U64, Big) => out.extend_from_slice(&(value as u64).to_be_bytes()),
        (F32, Little) => out.extend_from_slice(&(value as f32).to_le_bytes()),
        (F32, Big) => out.extend_from_slice(&(value as f32).to_be_bytes()),
        (F64, Little) => out.extend_from_slice(&value.to_le_bytes()),
        (F64, Big) => out.extend_from_slice(&value.to_be_bytes()),
    }
}

/// Writes `img` through `writer`, re-permuting to canonical storage order
/// first when needed.
pub fn write_stream<T: VoxelElement>(
    writer: &mut dyn ImageWriter,
    img: &Image<T>,
    data_type: OnDiskDataType,
    byte_order: ByteOrder,
) -> Result<()> {
    tracing::trace!(dims = ?img.img_dims(), data_type = ?data_type, "writing image stream");
    writer.write_header(data_type, byte_order, img.img_dims())?;

    let canonical = if *img.index_order() == IndexOrder::canonical() {
        img.data().to_vec()
    } else {
        // Scratch buffer re-permutes into canonical order before encoding,
        // leaving `img` itself untouched.
        let mut reordered = vec![T::ZERO; img.data().len()];
        let dims = img.img_dims();
        let canonical_order = IndexOrder::canonical();
        let canonical_strides = canonical_order.strides(dims);
        for flat in 0..img.data().len() {
            let idx = img.index_order().ind2sub(flat, dims);
            let new_flat = canonical_order.sub2ind(idx, canonical_strides);
            reordered[new_flat] = img.data()[flat];
        }
        reordered
    };

    let (scaler, offset) = img.data_scaler_offset();
    let mut bytes = Vec::with_capacity(canonical.len() * 8);
    for v in &canonical {
        let raw = if scaler != 0.0 { (v.to_f64() - offset) / scaler } else { v.to_f64() };
        encode_one(data_type, byte_order, raw, &mut bytes);
    }
    writer.payload().write_all(&bytes).map_err(|e| {
        tracing::warn!(error = %e, "failed to write image payload");
        NibrError::FileError(format!("failed to write image payload: {e}"))
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::numeric::Affine3x4;

    struct VecWriter {
        dims: [usize; 7],
        dt: OnDiskDataType,
        order: ByteOrder,
        out: Vec<u8>,
    }

    impl ImageWriter for VecWriter {
        fn write_header(&mut self, data_type: OnDiskDataType, byte_order: ByteOrder, img_dims: [usize; 7]) -> Result<()> {
            self.dt = data_type;
            self.order = byte_order;
            self.dims = img_dims;
            Ok(())
        }
        fn payload(&mut self) -> &mut dyn Write {
            &mut self.out
        }
    }

    #[test]
    fn round_trips_through_little_endian_i32() {
        let mut img = Image::<i32>::create(3, [2, 1, 1, 1, 1, 1, 1], [1.0; 7], Affine3x4::identity(), true).unwrap();
        img.data_mut()[0] = 5;
        img.data_mut()[1] = -3;
        let mut writer = VecWriter {
            dims: [0; 7],
            dt: OnDiskDataType::I32,
            order: ByteOrder::Little,
            out: Vec::new(),
        };
        write_stream(&mut writer, &img, OnDiskDataType::I32, ByteOrder::Little).unwrap();
        assert_eq!(writer.out.len(), 8);
        assert_eq!(i32::from_le_bytes(writer.out[0..4].try_into().unwrap()), 5);
        assert_eq!(i32::from_le_bytes(writer.out[4..8].try_into().unwrap()), -3);
    }
}
