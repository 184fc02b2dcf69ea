//! NIfTI-1/-2 header interface: datatype code mapping and
//! the sform/qform selection logic. Byte-level file parsing is out of
//! scope; this module owns the decoded-header -> [`ImageHeader`]
//! translation every concrete NIfTI reader feeds through.

use crate::error::{NibrError, Result};
use crate::image::reader::{ByteOrder, ImageHeader, OnDiskDataType};
use crate::numeric::Affine3x4;

/// Raw NIfTI-1 `datatype` codes this crate accepts.
pub const DT_UINT8: i16 = 2;
pub const DT_INT16: i16 = 4;
pub const DT_INT32: i16 = 8;
pub const DT_FLOAT32: i16 = 16;
pub const DT_COMPLEX64: i16 = 32;
pub const DT_FLOAT64: i16 = 64;
pub const DT_RGB24: i16 = 128;
pub const DT_INT8: i16 = 256;
pub const DT_UINT16: i16 = 512;
pub const DT_UINT32: i16 = 768;
pub const DT_INT64: i16 = 1024;
pub const DT_UINT64: i16 = 1280;
pub const DT_FLOAT128: i16 = 1536;
pub const DT_COMPLEX128: i16 = 1792;
pub const DT_COMPLEX256: i16 = 2048;
pub const DT_RGBA32: i16 = 2304;

/// Maps a raw NIfTI `datatype` code to an [`OnDiskDataType`], refusing
/// complex, RGB and quad-precision codes.
pub fn datatype_from_code(code: i16) -> Result<OnDiskDataType> {
    match code {
        DT_UINT8 => Ok(OnDiskDataType::U8),
        DT_INT8 => Ok(OnDiskDataType::I8),
        DT_INT16 => Ok(OnDiskDataType::I16),
        DT_UINT16 => Ok(OnDiskDataType::U16),
        DT_INT32 => Ok(OnDiskDataType::I32),
        DT_UINT32 => Ok(OnDiskDataType::U32),
        DT_INT64 => Ok(OnDiskDataType::I64),
        DT_UINT64 => Ok(OnDiskDataType::U64),
        DT_FLOAT32 => Ok(OnDiskDataType::F32),
        DT_FLOAT64 => Ok(OnDiskDataType::F64),
        DT_COMPLEX64 | DT_COMPLEX128 | DT_COMPLEX256 => {
            Err(NibrError::FileError("nifti complex datatypes are not accepted".to_string()))
        }
        DT_RGB24 | DT_RGBA32 => Err(NibrError::FileError("nifti rgb datatypes are not accepted".to_string())),
        DT_FLOAT128 => Err(NibrError::FileError("nifti float128 datatype is not accepted".to_string())),
        other => Err(NibrError::FileError(format!("unknown nifti datatype code {other}"))),
    }
}

/// The decoded fields of a NIfTI-1 header this crate needs; a concrete
/// reader is responsible for parsing the 348-byte struct itself and
/// filling this in.
#[derive(Debug, Clone, Copy)]
pub struct NiftiHeaderFields {
    pub dim: [i16; 8],
    pub pixdim: [f32; 8],
    pub datatype: i16,
    pub scl_slope: f32,
    pub scl_inter: f32,
    pub sform_code: i16,
    pub srow: [[f32; 4]; 3],
    pub qform_code: i16,
    pub qto_xyz: [[f32; 4]; 3],
    pub little_endian: bool,
}

/// Translates a decoded NIfTI-1 header into an [`ImageHeader`], choosing
/// `sform` over `qform` whenever `sform_code>0`.
pub fn header_from_fields(f: &NiftiHeaderFields) -> Result<ImageHeader> {
    let data_type = datatype_from_code(f.datatype)?;

    let ndim = f.dim[0].max(0) as usize;
    if ndim == 0 || ndim > 7 {
        return Err(NibrError::FileError(format!("nifti dim[0]={ndim} out of range")));
    }

    let mut img_dims = [1usize; 7];
    let mut pix_dims = [1.0f64; 7];
    for i in 0..7 {
        let d = f.dim[i + 1].max(0) as usize;
        img_dims[i] = if d == 0 { 1 } else { d };
        pix_dims[i] = if d == 0 { 1.0 } else { f.pixdim[i + 1] as f64 };
    }

    let rows = if f.sform_code > 0 {
        f.srow
    } else {
        f.qto_xyz
    };
    let ijk2xyz = Affine3x4::from_rows([
        [rows[0][0] as f64, rows[0][1] as f64, rows[0][2] as f64, rows[0][3] as f64],
        [rows[1][0] as f64, rows[1][1] as f64, rows[1][2] as f64, rows[1][3] as f64],
        [rows[2][0] as f64, rows[2][1] as f64, rows[2][2] as f64, rows[2][3] as f64],
    ]);

    Ok(ImageHeader {
        ndim,
        img_dims,
        pix_dims,
        ijk2xyz,
        data_type,
        byte_order: if f.little_endian { ByteOrder::Little } else { ByteOrder::Big },
        data_scaler: if f.scl_slope == 0.0 { 1.0 } else { f.scl_slope as f64 },
        data_offset: f.scl_inter as f64,
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    fn base_fields() -> NiftiHeaderFields {
        NiftiHeaderFields {
            dim: [3, 4, 5, 6, 1, 1, 1, 1],
            pixdim: [1.0, 2.0, 2.0, 2.0, 1.0, 1.0, 1.0, 1.0],
            datatype: DT_FLOAT32,
            scl_slope: 1.0,
            scl_inter: 0.0,
            sform_code: 1,
            srow: [[2.0, 0.0, 0.0, -4.0], [0.0, 2.0, 0.0, -5.0], [0.0, 0.0, 2.0, -6.0]],
            qform_code: 0,
            qto_xyz: [[0.0; 4]; 3],
            little_endian: true,
        }
    }

    #[test]
    fn prefers_sform_when_present() {
        let h = header_from_fields(&base_fields()).unwrap();
        let origin = h.ijk2xyz.transform_point(crate::numeric::WorldPoint::ZERO);
        assert_eq!((origin.x, origin.y, origin.z), (-4.0, -5.0, -6.0));
    }

    #[test]
    fn falls_back_to_qform_when_sform_absent() {
        let mut f = base_fields();
        f.sform_code = 0;
        f.qto_xyz = [[1.0, 0.0, 0.0, 1.0], [0.0, 1.0, 0.0, 2.0], [0.0, 0.0, 1.0, 3.0]];
        let h = header_from_fields(&f).unwrap();
        let origin = h.ijk2xyz.transform_point(crate::numeric::WorldPoint::ZERO);
        assert_eq!((origin.x, origin.y, origin.z), (1.0, 2.0, 3.0));
    }

    #[test]
    fn refuses_complex_datatype() {
        let mut f = base_fields();
        f.datatype = DT_COMPLEX64;
        assert!(matches!(header_from_fields(&f), Err(NibrError::FileError(_))));
    }
}
