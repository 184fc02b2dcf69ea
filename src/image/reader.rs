//! Generic typed-stream reader. File-format
//! compatibility guarantees are explicitly out of scope; what
//! this module owns is the *interface* every concrete format feeds into:
//! byte order, on-disk datatype, `dataScaler`/`dataOffset`, and storage
//! permutation, applied exactly once per element.

use std::io::Read;

use crate::error::{NibrError, Result};
use crate::image::storage::{IndexOrder, MAX_DIMS};
use crate::image::{AnyImage, Image, VoxelElement};
use crate::numeric::Affine3x4;

/// On-disk element tag, shared by the NIfTI and MGH datatype tables
///. Complex and RGB codes
/// are refused at the boundary rather than represented here at all.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum OnDiskDataType {
    Bool,
    I8,
    U8,
    I16,
    U16,
    I32,
    U32,
    I64,
    U64,
    F32,
    F64,
}

/// Byte order of the on-disk payload.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ByteOrder {
    Little,
    Big,
}

/// Geometry and datatype decoded from a format-specific header, handed to
/// [`read_stream`] to actually materialise the voxel buffer.
#[derive(Debug, Clone)]
pub struct ImageHeader {
    pub ndim: usize,
    pub img_dims: [usize; MAX_DIMS],
    pub pix_dims: [f64; MAX_DIMS],
    pub ijk2xyz: Affine3x4,
    pub data_type: OnDiskDataType,
    pub byte_order: ByteOrder,
    pub data_scaler: f64,
    pub data_offset: f64,
}

/// A source that can produce an [`ImageHeader`] and then stream its raw
/// payload.
pub trait ImageReader {
    fn read_header(&mut self) -> Result<ImageHeader>;
    fn payload(&mut self) -> &mut dyn Read;
}

macro_rules! decode_le {
    ($ty:ty, $bytes:expr) => {
        <$ty>::from_le_bytes($bytes.try_into().unwrap())
    };
}
macro_rules! decode_be {
    ($ty:ty, $bytes:expr) => {
        <$ty>::from_be_bytes($bytes.try_into().unwrap())
    };
}

fn raw_element_size(dt: OnDiskDataType) -> usize {
    use OnDiskDataType::*;
    match dt {
        Bool | I8 | U8 => 1,
        I16 | U16 => 2,
        I32 | U32 | F32 => 4,
        I64 | U64 | F64 => 8,
    }
}

fn decode_one(dt: OnDiskDataType, order: ByteOrder, bytes: &[u8]) -> f64 {
    use ByteOrder::*;
    use OnDiskDataType::*;
    match (dt, order) {
        (Bool, _) => (bytes[0] != 0) as u8 as f64,
        (I8, _) => bytes[0] as i8 as f64,
        (U8, _) => bytes[0] as f64,
        (I16, Little) => decode_le!(i16, bytes) as f64,
        (I16, Big) => decode_be!(i16, bytes) as f64,
        (U16, Little) => decode_le!(u16, bytes) as f64,
        (U16, Big) => decode_be!(u16, bytes) as f64,
        (I32, Little) => decode_le!(i32, bytes) as f64,
        (I32, Big) => decode_be!(i32, bytes) as f64,
        (U32, Little) => decode_le!(u32, bytes) as f64,
        (U32, Big) => decode_be!(u32, bytes) as f64,
        (I64, Little) => decode_le!(i64, bytes) as f64,
        (I64, Big) => decode_be!(i64, bytes) as f64,
        (U64, Little) => decode_le!(u64, bytes) as f64,
        (U64, Big) => decode_be!(u64, bytes) as f64,
        (F32, Little) => decode_le!(f32, bytes) as f64,
        (F32, Big) => decode_be!(f32, bytes) as f64,
        (F64, Little) => decode_le!(f64, bytes),
        (F64, Big) => decode_be!(f64, bytes),
    }
}

/// Reads `header.payload()`'s raw bytes into a freshly allocated
/// `Image<T>`, applying `dataScaler`/`dataOffset`, converting from the
/// on-disk element type and byte order to `T` exactly once, and
/// re-permuting into canonical storage order.
pub fn read_stream<T: VoxelElement>(reader: &mut dyn ImageReader) -> Result<Image<T>> {
    let header = reader.read_header()?;
    tracing::trace!(
        ndim = header.ndim,
        dims = ?header.img_dims,
        data_type = ?header.data_type,
        "reading image stream"
    );
    let mut img = Image::<T>::create(header.ndim, header.img_dims, header.pix_dims, header.ijk2xyz, true)?;
    img.set_data_scaler_offset(header.data_scaler, header.data_offset);

    let elem_size = raw_element_size(header.data_type);
    let len = IndexOrder::total_len(header.img_dims);
    let mut raw = vec![0u8; elem_size];
    let mut canonical = vec![T::ZERO; len];
    let stream = reader.payload();
    for slot in canonical.iter_mut() {
        stream.read_exact(&mut raw).map_err(|e| {
            tracing::warn!(error = %e, "truncated image stream");
            NibrError::FileError(format!("truncated image stream: {e}"))
        })?;
        let raw_value = decode_one(header.data_type, header.byte_order, &raw);
        *slot = T::from_f64(raw_value * header.data_scaler + header.data_offset);
    }
    img.data_mut().copy_from_slice(&canonical);
    tracing::debug!(elements = len, "image stream read complete");
    Ok(img)
}

/// Dispatches on [`OnDiskDataType`] to build the right [`AnyImage`] variant
///.
pub fn read_stream_any(reader: &mut dyn ImageReader) -> Result<AnyImage> {
    // `read_header` is cheap to call twice: headers carry no I/O state of
    // their own beyond what the concrete reader buffers internally.
    let probe = reader.read_header()?;
    match probe.data_type {
        OnDiskDataType::Bool => Ok(AnyImage::Bool(read_stream(reader)?)),
        OnDiskDataType::I8 => Ok(AnyImage::I8(read_stream(reader)?)),
        OnDiskDataType::U8 => Ok(AnyImage::U8(read_stream(reader)?)),
        OnDiskDataType::I16 => Ok(AnyImage::I16(read_stream(reader)?)),
        OnDiskDataType::U16 => Ok(AnyImage::U16(read_stream(reader)?)),
        OnDiskDataType::I32 => Ok(AnyImage::I32(read_stream(reader)?)),
        OnDiskDataType::U32 => Ok(AnyImage::U32(read_stream(reader)?)),
        OnDiskDataType::I64 => Ok(AnyImage::I64(read_stream(reader)?)),
        OnDiskDataType::U64 => Ok(AnyImage::U64(read_stream(reader)?)),
        OnDiskDataType::F32 => Ok(AnyImage::F32(read_stream(reader)?)),
        OnDiskDataType::F64 => Ok(AnyImage::F64(read_stream(reader)?)),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Cursor;

    struct FixedReader {
        header: ImageHeader,
        cursor: Cursor<Vec<u8>>,
    }

    impl ImageReader for FixedReader {
        fn read_header(&mut self) -> Result<ImageHeader> {
            Ok(self.header.clone())
        }
        fn payload(&mut self) -> &mut dyn Read {
            &mut self.cursor
        }
    }

    #[test]
    fn reads_little_endian_i16_with_scaling() {
        let mut bytes = Vec::new();
        for v in [0i16, 1, 2, 3, 4, 5, 6, 7] {
            bytes.extend_from_slice(&v.to_le_bytes());
        }
        let mut reader = FixedReader {
            header: ImageHeader {
                ndim: 3,
                img_dims: [2, 2, 2, 1, 1, 1, 1],
                pix_dims: [1.0; 7],
                ijk2xyz: Affine3x4::identity(),
                data_type: OnDiskDataType::I16,
                byte_order: ByteOrder::Little,
                data_scaler: 2.0,
                data_offset: 1.0,
            },
            cursor: Cursor::new(bytes),
        };
        let img = read_stream::<f32>(&mut reader).unwrap();
        assert_eq!(img.data()[0], 1.0); // 0*2+1
        assert_eq!(img.data()[7], 15.0); // 7*2+1
    }

    #[test]
    fn truncated_stream_is_a_file_error() {
        let mut reader = FixedReader {
            header: ImageHeader {
                ndim: 3,
                img_dims: [2, 2, 2, 1, 1, 1, 1],
                pix_dims: [1.0; 7],
                ijk2xyz: Affine3x4::identity(),
                data_type: OnDiskDataType::F32,
                byte_order: ByteOrder::Little,
                data_scaler: 1.0,
                data_offset: 0.0,
            },
            cursor: Cursor::new(Vec::new()),
        };
        assert!(matches!(read_stream::<f32>(&mut reader), Err(NibrError::FileError(_))));
    }
}
