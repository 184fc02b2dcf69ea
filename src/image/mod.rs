//! Typed voxel image container with an affine voxel<->world mapping,
//! interpolation and bulk algebra.

mod element;
mod interp;


pub mod edt;
pub mod mgh;
pub mod nifti;
pub mod ops;
pub mod reader;
pub mod writer;

pub use element::VoxelElement;
pub use interp::InterpMethod;
pub use ops::Connectivity;
pub use reader::{read_stream, read_stream_any, ImageHeader, ImageReader};
pub use writer::{write_stream, ImageWriter};

use crate::error::{NibrError, Result};
use crate::numeric::{Affine3x4, WorldPoint};

pub mod storage;
use storage::{IndexOrder, MAX_DIMS};

/// A rectilinear sampled field of up to seven dimensions, the first three
/// spatial.
#[derive(Debug, Clone)]
pub struct Image<T: VoxelElement> {
    img_dims: [usize; MAX_DIMS],
    pix_dims: [f64; MAX_DIMS],
    ijk2xyz: Affine3x4,
    xyz2ijk: Affine3x4,
    index_order: IndexOrder,
    strides: [usize; MAX_DIMS],
    data: Vec<T>,
    data_scaler: f64,
    data_offset: f64,
    interp_method: InterpMethod,
    outside_val: T,
}

impl<T: VoxelElement> Image<T> {
    /// Builds dimensions, derives `xyz2ijk` from `ijk2xyz`, computes
    /// strides from `index_order`, then optionally allocates
    ///.
    pub fn create(
        ndim: usize,
        img_dims: [usize; MAX_DIMS],
        pix_dims: [f64; MAX_DIMS],
        ijk2xyz: Affine3x4,
        allocate: bool,
    ) -> Result<Self> {
        if ndim == 0 || ndim > MAX_DIMS {
            return Err(NibrError::Fatal(format!(
                "ndim must be in 1..={MAX_DIMS}, got {ndim}"
            )));
        }
        if pix_dims.iter().take(ndim).any(|&p| !(p > 0.0)) {
            return Err(NibrError::InvalidArgument(
                "pixDims must be strictly positive".to_string(),
            ));
        }
        let xyz2ijk = ijk2xyz.inverse()?;
        let index_order = IndexOrder::canonical();
        let strides = index_order.strides(img_dims);
        let len = IndexOrder::total_len(img_dims);
        let data = if allocate { vec![T::ZERO; len] } else { Vec::new() };
        Ok(Self {
            img_dims,
            pix_dims,
            ijk2xyz,
            xyz2ijk,
            index_order,
            strides,
            data,
            data_scaler: 1.0,
            data_offset: 0.0,
            interp_method: InterpMethod::Linear,
            outside_val: T::ZERO,
        })
    }

    /// Clones another image's geometry (dims, spacing, affine, index
    /// order), optionally copying its sample buffer too.
    pub fn create_from_template(other: &Image<T>, copy_data: bool) -> Self {
        let len = IndexOrder::total_len(other.img_dims);
        let data = if copy_data {
            other.data.clone()
        } else {
            vec![T::ZERO; len]
        };
        Self {
            data,
            ..other.clone()
        }
    }

    /// Fits a grid to a world-space axis-aligned box, centring the
    /// digitised box on the input box, either at a requested spacing or a
    /// requested voxel-count extent.
    pub fn create_from_bounding_box(
        bb_min: WorldPoint,
        bb_max: WorldPoint,
        spacing: [f64; 3],
        allocate: bool,
    ) -> Result<Self> {
        if spacing.iter().any(|&s| !(s > 0.0)) {
            return Err(NibrError::InvalidArgument(
                "spacing must be strictly positive".to_string(),
            ));
        }
        let extent = bb_max - bb_min;
        if extent.x < 0.0 || extent.y < 0.0 || extent.z < 0.0 {
            return Err(NibrError::InvalidArgument(
                "bounding box max must be >= min on every axis".to_string(),
            ));
        }
        let counts = [
            ((extent.x / spacing[0]).ceil().max(1.0)) as usize,
            ((extent.y / spacing[1]).ceil().max(1.0)) as usize,
            ((extent.z / spacing[2]).ceil().max(1.0)) as usize,
        ];
        // Centre the digitised box on the requested box: the digitised
        // extent is `counts[k]*spacing[k]`, so shift the origin back by
        // half of the slack on each axis.
        let digitised_extent = [
            counts[0] as f64 * spacing[0],
            counts[1] as f64 * spacing[1],
            counts[2] as f64 * spacing[2],
        ];
        let centre = (bb_min + bb_max) * 0.5;
        let origin = WorldPoint::new(
            centre.x - digitised_extent[0] * 0.5 + spacing[0] * 0.5,
            centre.y - digitised_extent[1] * 0.5 + spacing[1] * 0.5,
            centre.z - digitised_extent[2] * 0.5 + spacing[2] * 0.5,
        );
        let ijk2xyz = Affine3x4::from_rows([
            [spacing[0], 0.0, 0.0, origin.x],
            [0.0, spacing[1], 0.0, origin.y],
            [0.0, 0.0, spacing[2], origin.z],
        ]);
        let mut img_dims = [1usize; MAX_DIMS];
        img_dims[0] = counts[0];
        img_dims[1] = counts[1];
        img_dims[2] = counts[2];
        let mut pix_dims = [1.0f64; MAX_DIMS];
        pix_dims[0] = spacing[0];
        pix_dims[1] = spacing[1];
        pix_dims[2] = spacing[2];
        Self::create(3, img_dims, pix_dims, ijk2xyz, allocate)
    }

    pub fn img_dims(&self) -> [usize; MAX_DIMS] {
        self.img_dims
    }

    pub fn pix_dims(&self) -> [f64; MAX_DIMS] {
        self.pix_dims
    }

    pub fn ijk2xyz(&self) -> &Affine3x4 {
        &self.ijk2xyz
    }

    pub fn xyz2ijk(&self) -> &Affine3x4 {
        &self.xyz2ijk
    }

    pub fn index_order(&self) -> &IndexOrder {
        &self.index_order
    }

    pub fn interp_method(&self) -> InterpMethod {
        self.interp_method
    }

    pub fn set_interp_method(&mut self, m: InterpMethod) {
        self.interp_method = m;
    }

    pub fn outside_val(&self) -> T {
        self.outside_val
    }

    pub fn set_outside_val(&mut self, v: T) {
        self.outside_val = v;
    }

    pub fn data(&self) -> &[T] {
        &self.data
    }

    pub fn data_mut(&mut self) -> &mut [T] {
        &mut self.data
    }

    pub fn data_scaler_offset(&self) -> (f64, f64) {
        (self.data_scaler, self.data_offset)
    }

    pub(crate) fn set_data_scaler_offset(&mut self, scaler: f64, offset: f64) {
        self.data_scaler = scaler;
        self.data_offset = offset;
    }

    /// Re-permutes storage to a new `index_order`, leaving samples
    /// logically unchanged.
    pub fn set_index_order(&mut self, order: IndexOrder) {
        if order == self.index_order {
            return;
        }
        let new_strides = order.strides(self.img_dims);
        let mut new_data = vec![T::ZERO; self.data.len()];
        for flat in 0..self.data.len() {
            let idx = self.index_order.ind2sub(flat, self.img_dims);
            let new_flat = order.sub2ind(idx, new_strides);
            new_data[new_flat] = self.data[flat];
        }
        self.data = new_data;
        self.strides = new_strides;
        self.index_order = order;
    }

    fn flat_index(&self, idx: [usize; MAX_DIMS]) -> usize {
        self.index_order.sub2ind(idx, self.strides)
    }

    /// Direct element access by full 7-axis logical index.
    pub fn at(&self, idx: [usize; MAX_DIMS]) -> Option<&T> {
        if idx.iter().zip(self.img_dims.iter()).any(|(&i, &d)| i >= d.max(1)) {
            return None;
        }
        self.data.get(self.flat_index(idx))
    }

    pub fn at_mut(&mut self, idx: [usize; MAX_DIMS]) -> Option<&mut T> {
        if idx.iter().zip(self.img_dims.iter()).any(|(&i, &d)| i >= d.max(1)) {
            return None;
        }
        let flat = self.flat_index(idx);
        self.data.get_mut(flat)
    }

    /// Convenience 3-D accessor (volumes 4..6 fixed at 0).
    pub fn at3(&self, i: usize, j: usize, k: usize) -> Option<&T> {
        self.at([i, j, k, 0, 0, 0, 0])
    }

    pub fn at3_mut(&mut self, i: usize, j: usize, k: usize) -> Option<&mut T> {
        self.at_mut([i, j, k, 0, 0, 0, 0])
    }

    /// Converts a world point to continuous voxel coordinates.
    pub fn world_to_voxel(&self, p: WorldPoint) -> WorldPoint {
        self.xyz2ijk.transform_point(p)
    }

    /// Converts a voxel-centre coordinate to a world point.
    pub fn voxel_to_world(&self, ijk: WorldPoint) -> WorldPoint {
        self.ijk2xyz.transform_point(ijk)
    }

    /// Interpolates a world-space query using [`Self::interp_method`],
    /// returning [`Self::outside_val`] when outside the sampling support
    ///.
    pub fn sample_world(&self, p: WorldPoint) -> T {
        let ijk = self.world_to_voxel(p);
        interp::sample(self, ijk)
    }

    /// Same as [`Self::sample_world`] but always returns `f64`, useful for
    /// SH/PDE/EDT code that treats samples as scalars regardless of `T`.
    pub fn sample_world_f64(&self, p: WorldPoint) -> f64 {
        self.sample_world(p).to_f64()
    }
}

/// A reader- or writer-facing handle over one of the concrete element
/// types: the on-disk datatype is only
/// known at runtime, so readers hand back this tagged enum rather than a
/// generic `Image<T>`.
#[derive(Debug, Clone)]
pub enum AnyImage {
    Bool(Image<bool>),
    I8(Image<i8>),
    U8(Image<u8>),
    I16(Image<i16>),
    U16(Image<u16>),
    I32(Image<i32>),
    U32(Image<u32>),
    I64(Image<i64>),
    U64(Image<u64>),
    F32(Image<f32>),
    F64(Image<f64>),
}

impl AnyImage {
    pub fn img_dims(&self) -> [usize; MAX_DIMS] {
        match self {
            AnyImage::Bool(i) => i.img_dims(),
            AnyImage::I8(i) => i.img_dims(),
            AnyImage::U8(i) => i.img_dims(),
            AnyImage::I16(i) => i.img_dims(),
            AnyImage::U16(i) => i.img_dims(),
            AnyImage::I32(i) => i.img_dims(),
            AnyImage::U32(i) => i.img_dims(),
            AnyImage::I64(i) => i.img_dims(),
            AnyImage::U64(i) => i.img_dims(),
            AnyImage::F32(i) => i.img_dims(),
            AnyImage::F64(i) => i.img_dims(),
        }
    }

    /// Samples the image at a world point, upcast to `f64` regardless of
    /// the underlying element type.
    pub fn sample_world_f64(&self, p: WorldPoint) -> f64 {
        match self {
            AnyImage::Bool(i) => i.sample_world_f64(p),
            AnyImage::I8(i) => i.sample_world_f64(p),
            AnyImage::U8(i) => i.sample_world_f64(p),
            AnyImage::I16(i) => i.sample_world_f64(p),
            AnyImage::U16(i) => i.sample_world_f64(p),
            AnyImage::I32(i) => i.sample_world_f64(p),
            AnyImage::U32(i) => i.sample_world_f64(p),
            AnyImage::I64(i) => i.sample_world_f64(p),
            AnyImage::U64(i) => i.sample_world_f64(p),
            AnyImage::F32(i) => i.sample_world_f64(p),
            AnyImage::F64(i) => i.sample_world_f64(p),
        }
    }
}
