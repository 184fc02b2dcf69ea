use crate::image::{Image, VoxelElement};
use crate::numeric::WorldPoint;

/// Interpolation policy used by [`Image::sample_world`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum InterpMethod {
    /// Returns the nearest voxel's value.
    Nearest,
    /// Trilinear interpolation over the eight enclosing centres.
    Linear,
    /// Separable uniform B-spline interpolation over the enclosing 4x4x4
    /// neighbourhood.
    Cubic,
}

/// Fetches the raw sample at integer voxel coordinates `(i, j, k)`,
/// falling back to `outside` when any coordinate is out of range — the
/// common border policy for all three interpolation modes.
fn fetch<T: VoxelElement>(img: &Image<T>, i: isize, j: isize, k: isize) -> f64 {
    let dims = img.img_dims();
    if i < 0 || j < 0 || k < 0 || i as usize >= dims[0].max(1) || j as usize >= dims[1].max(1) || k as usize >= dims[2].max(1) {
        return img.outside_val().to_f64();
    }
    img.at3(i as usize, j as usize, k as usize)
        .map(|v| v.to_f64())
        .unwrap_or_else(|| img.outside_val().to_f64())
}

fn cubic_bspline_weights(t: f64) -> [f64; 4] {
    // Uniform cubic B-spline basis, offsets -1, 0, 1, 2 relative to the
    // sample's floor.
    let t2 = t * t;
    let t3 = t2 * t;
    [
        (-t3 + 3.0 * t2 - 3.0 * t + 1.0) / 6.0,
        (3.0 * t3 - 6.0 * t2 + 4.0) / 6.0,
        (-3.0 * t3 + 3.0 * t2 + 3.0 * t + 1.0) / 6.0,
        t3 / 6.0,
    ]
}

/// Samples `img` at continuous voxel coordinates `ijk` using its configured
/// [`InterpMethod`], clamped to `outside_val` beyond the sampling support.
pub(super) fn sample<T: VoxelElement>(img: &Image<T>, ijk: WorldPoint) -> T {
    let dims = img.img_dims();
    // A query is "outside the sampling support" if it falls (after
    // rounding for NEAREST, or unconditionally for LINEAR/CUBIC) further
    // than half a voxel beyond the extreme voxel centres on any spatial
    // axis.
    let out_of_support = (0..3).any(|axis| {
        let v = match axis {
            0 => ijk.x,
            1 => ijk.y,
            _ => ijk.z,
        };
        v < -0.5 || v > dims[axis].max(1) as f64 - 0.5
    });
    if out_of_support {
        return img.outside_val();
    }

    match img.interp_method() {
        InterpMethod::Nearest => {
            let i = ijk.x.round() as isize;
            let j = ijk.y.round() as isize;
            let k = ijk.z.round() as isize;
            T::from_f64(fetch(img, i, j, k))
        }
        InterpMethod::Linear => {
            let i0 = ijk.x.floor();
            let j0 = ijk.y.floor();
            let k0 = ijk.z.floor();
            let fx = ijk.x - i0;
            let fy = ijk.y - j0;
            let fz = ijk.z - k0;
            let (i0, j0, k0) = (i0 as isize, j0 as isize, k0 as isize);

            let mut acc = 0.0;
            for di in 0..2isize {
                let wx = if di == 0 { 1.0 - fx } else { fx };
                for dj in 0..2isize {
                    let wy = if dj == 0 { 1.0 - fy } else { fy };
                    for dk in 0..2isize {
                        let wz = if dk == 0 { 1.0 - fz } else { fz };
                        acc += wx * wy * wz * fetch(img, i0 + di, j0 + dj, k0 + dk);
                    }
                }
            }
            T::from_f64(acc)
        }
        InterpMethod::Cubic => {
            let i0 = ijk.x.floor();
            let j0 = ijk.y.floor();
            let k0 = ijk.z.floor();
            let fx = ijk.x - i0;
            let fy = ijk.y - j0;
            let fz = ijk.z - k0;
            let (i0, j0, k0) = (i0 as isize, j0 as isize, k0 as isize);

            let wx = cubic_bspline_weights(fx);
            let wy = cubic_bspline_weights(fy);
            let wz = cubic_bspline_weights(fz);

            let mut acc = 0.0;
            for (di, &wxi) in wx.iter().enumerate() {
                for (dj, &wyj) in wy.iter().enumerate() {
                    for (dk, &wzk) in wz.iter().enumerate() {
                        let sample = fetch(
                            img,
                            i0 + di as isize - 1,
                            j0 + dj as isize - 1,
                            k0 + dk as isize - 1,
                        );
                        acc += wxi * wyj * wzk * sample;
                    }
                }
            }
            T::from_f64(acc)
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::numeric::Affine3x4;

    fn ramp_image() -> Image<f32> {
        let mut img = Image::<f32>::create(
            3,
            [4, 4, 4, 1, 1, 1, 1],
            [1.0; 7],
            Affine3x4::identity(),
            true,
        )
        .unwrap();
        for i in 0..4 {
            for j in 0..4 {
                for k in 0..4 {
                    *img.at3_mut(i, j, k).unwrap() = i as f32;
                }
            }
        }
        img
    }

    #[test]
    fn nearest_matches_voxel_centre() {
        let mut img = ramp_image();
        img.set_interp_method(InterpMethod::Nearest);
        assert_eq!(img.sample_world(WorldPoint::new(2.0, 1.0, 1.0)), 2.0);
    }

    #[test]
    fn linear_interpolates_ramp_exactly() {
        let mut img = ramp_image();
        img.set_interp_method(InterpMethod::Linear);
        let v = img.sample_world(WorldPoint::new(1.5, 1.0, 1.0));
        assert!((v - 1.5).abs() < 1e-5);
    }

    #[test]
    fn cubic_interpolates_ramp_exactly() {
        // A uniform cubic B-spline reproduces any linear ramp exactly
        // because its basis functions partition unity and are centred.
        let mut img = ramp_image();
        img.set_interp_method(InterpMethod::Cubic);
        let v = img.sample_world(WorldPoint::new(2.25, 2.0, 2.0));
        assert!((v - 2.25).abs() < 1e-4, "got {v}");
    }

    #[test]
    fn outside_support_returns_outside_val() {
        let mut img = ramp_image();
        img.set_outside_val(-1.0);
        assert_eq!(img.sample_world(WorldPoint::new(100.0, 0.0, 0.0)), -1.0);
    }
}
