/// A concrete per-voxel element type.
pub trait VoxelElement: Copy + Send + Sync + PartialEq + std::fmt::Debug + 'static {
    /// Additive/multiplicative identity used by bulk algebra defaults.
    const ZERO: Self;

    fn to_f64(self) -> f64;
    fn from_f64(v: f64) -> Self;

    fn is_nonzero(self) -> bool {
        self.to_f64() != 0.0
    }
}

macro_rules! impl_voxel_element_int {
    ($t:ty) => {
        impl VoxelElement for $t {
            const ZERO: Self = 0;
            fn to_f64(self) -> f64 {
                self as f64
            }
            fn from_f64(v: f64) -> Self {
                v.round().clamp(<$t>::MIN as f64, <$t>::MAX as f64) as $t
            }
        }
    };
}

macro_rules! impl_voxel_element_float {
    ($t:ty) => {
        impl VoxelElement for $t {
            const ZERO: Self = 0.0;
            fn to_f64(self) -> f64 {
                self as f64
            }
            fn from_f64(v: f64) -> Self {
                v as $t
            }
        }
    };
}

impl_voxel_element_int!(i8);
impl_voxel_element_int!(u8);
impl_voxel_element_int!(i16);
impl_voxel_element_int!(u16);
impl_voxel_element_int!(i32);
impl_voxel_element_int!(u32);
impl_voxel_element_int!(i64);
impl_voxel_element_int!(u64);
impl_voxel_element_float!(f32);
impl_voxel_element_float!(f64);

impl VoxelElement for bool {
    const ZERO: Self = false;
    fn to_f64(self) -> f64 {
        if self {
            1.0
        } else {
            0.0
        }
    }
    fn from_f64(v: f64) -> Self {
        v != 0.0
    }
}
