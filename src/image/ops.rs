//! Bulk voxel algebra, all parallelised over the worker pool
//!.

use crate::image::{Image, VoxelElement};
use crate::parallel_slice::ParallelSliceMut;
use crate::worker::WorkerPool;
use std::sync::Mutex;

/// Voxel neighbourhood used by [`dilate`]/[`erode`]
///.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Connectivity {
    Six,
    Eighteen,
    TwentySix,
}

impl Connectivity {
    fn offsets(self) -> Vec<(isize, isize, isize)> {
        itertools::iproduct!(-1..=1isize, -1..=1isize, -1..=1isize)
            .filter(|&(di, dj, dk)| {
                if di == 0 && dj == 0 && dk == 0 {
                    return false;
                }
                let manhattan = di.abs() + dj.abs() + dk.abs();
                match self {
                    Connectivity::Six => manhattan == 1,
                    Connectivity::Eighteen => manhattan <= 2,
                    Connectivity::TwentySix => true,
                }
            })
            .collect()
    }
}

/// In-place `dst[v] = dst[v] + src[v]` over every voxel. Images must share dimensions.
pub fn add<T: VoxelElement>(pool: &WorkerPool, dst: &mut Image<T>, src: &Image<T>) {
    debug_assert_eq!(dst.img_dims(), src.img_dims());
    let n = dst.data().len();
    let src_data = src.data().to_vec();
    let old_data = dst.data().to_vec();
    let dst_slice = ParallelSliceMut::new(dst.data_mut());
    pool.run(n, None, |task| {
        let v = T::from_f64(old_data[task.no].to_f64() + src_data[task.no].to_f64());
        dst_slice.set(task.no, v);
    });
}

/// Thresholds every voxel to `high` if `value >= threshold`, else `low`
///.
pub fn thresh<T: VoxelElement>(pool: &WorkerPool, img: &mut Image<T>, threshold: f64, low: T, high: T) {
    let n = img.data().len();
    let old_data = img.data().to_vec();
    let data = ParallelSliceMut::new(img.data_mut());
    pool.run(n, None, |task| {
        let v = if old_data[task.no].to_f64() >= threshold {
            high
        } else {
            low
        };
        data.set(task.no, v);
    });
}

/// Returns `(min, max)` sample value across the whole image. Each worker accumulates a local min/max and the results
/// are combined once all tasks finish, avoiding any per-voxel contention on
/// shared state.
pub fn min_max<T: VoxelElement>(pool: &WorkerPool, img: &Image<T>) -> (f64, f64) {
    let n = img.data().len();
    if n == 0 {
        return (f64::NAN, f64::NAN);
    }
    let num_workers = pool.worker_count_for(n);
    let partials: Vec<Mutex<(f64, f64)>> = (0..num_workers)
        .map(|_| Mutex::new((f64::INFINITY, f64::NEG_INFINITY)))
        .collect();
    pool.run(n, None, |task| {
        let v = img.data()[task.no].to_f64();
        let mut slot = partials[task.thread_id as usize % partials.len()].lock().unwrap();
        if v < slot.0 {
            slot.0 = v;
        }
        if v > slot.1 {
            slot.1 = v;
        }
    });
    partials.into_iter().map(|m| m.into_inner().unwrap()).fold(
        (f64::INFINITY, f64::NEG_INFINITY),
        |(lo, hi), (a, b)| (lo.min(a), hi.max(b)),
    )
}

/// Indices (flat, into [`Image::data`]) of every voxel whose value is
/// non-zero.
pub fn nonzero_indices<T: VoxelElement>(pool: &WorkerPool, img: &Image<T>) -> Vec<usize> {
    indices_matching(pool, img, |v| v.is_nonzero())
}

/// Indices of every voxel equal to `label`.
pub fn indices_with_label<T: VoxelElement>(pool: &WorkerPool, img: &Image<T>, label: T) -> Vec<usize> {
    indices_matching(pool, img, |v| v == label)
}

fn indices_matching<T: VoxelElement>(pool: &WorkerPool, img: &Image<T>, pred: impl Fn(T) -> bool + Sync) -> Vec<usize> {
    let n = img.data().len();
    let num_workers = pool.worker_count_for(n.max(1));
    let partials: Vec<Mutex<Vec<usize>>> = (0..num_workers).map(|_| Mutex::new(Vec::new())).collect();
    pool.run(n, None, |task| {
        if pred(img.data()[task.no]) {
            partials[task.thread_id as usize % partials.len()]
                .lock()
                .unwrap()
                .push(task.no);
        }
    });
    let mut out: Vec<usize> = partials.into_iter().flat_map(|m| m.into_inner().unwrap()).collect();
    out.sort_unstable();
    out
}

/// Pads an image with `pad` voxels of `fill` on every side of the first
/// three axes.
pub fn pad<T: VoxelElement>(img: &Image<T>, pad: [usize; 3], fill: T) -> crate::error::Result<Image<T>> {
    let dims = img.img_dims();
    let mut new_dims = dims;
    new_dims[0] = dims[0] + 2 * pad[0];
    new_dims[1] = dims[1] + 2 * pad[1];
    new_dims[2] = dims[2] + 2 * pad[2];

    let pix_dims = img.pix_dims();
    let origin_shift = img.voxel_to_world(crate::numeric::WorldPoint::new(
        -(pad[0] as f64),
        -(pad[1] as f64),
        -(pad[2] as f64),
    )) - img.voxel_to_world(crate::numeric::WorldPoint::ZERO);
    let rows = img.ijk2xyz().to_rows();
    let mut shifted_rows = rows;
    for r in 0..3 {
        shifted_rows[r][3] += match r {
            0 => origin_shift.x,
            1 => origin_shift.y,
            _ => origin_shift.z,
        };
    }
    let ijk2xyz = crate::numeric::Affine3x4::from_rows(shifted_rows);

    let mut out = Image::<T>::create(3, new_dims, pix_dims, ijk2xyz, true)?;
    for v in out.data_mut().iter_mut() {
        *v = fill;
    }
    for (i, j, k) in itertools::iproduct!(0..dims[0], 0..dims[1], 0..dims[2]) {
        if let Some(&val) = img.at3(i, j, k) {
            *out.at3_mut(i + pad[0], j + pad[1], k + pad[2]).unwrap() = val;
        }
    }
    Ok(out)
}

fn morphology_pass<T: VoxelElement>(
    pool: &WorkerPool,
    img: &Image<T>,
    connectivity: Connectivity,
    grow: bool,
) -> Image<T> {
    let dims = img.img_dims();
    let offsets = connectivity.offsets();
    let mut out = Image::<T>::create_from_template(img, true);
    let n = dims[0].max(1) * dims[1].max(1) * dims[2].max(1);
    let out_data = ParallelSliceMut::new(out.data_mut());
    pool.run(n, None, |task| {
        let i = task.no % dims[0].max(1);
        let j = (task.no / dims[0].max(1)) % dims[1].max(1);
        let k = task.no / (dims[0].max(1) * dims[1].max(1));
        let centre = img.at3(i, j, k).copied().unwrap_or(T::ZERO);
        let mut any_on = centre.is_nonzero();
        let mut all_on = centre.is_nonzero();
        for &(di, dj, dk) in &offsets {
            let ni = i as isize + di;
            let nj = j as isize + dj;
            let nk = k as isize + dk;
            let neighbour_on = if ni < 0 || nj < 0 || nk < 0 {
                false
            } else {
                img.at3(ni as usize, nj as usize, nk as usize)
                    .map(|v| v.is_nonzero())
                    .unwrap_or(false)
            };
            any_on |= neighbour_on;
            all_on &= neighbour_on;
        }
        let result_on = if grow { any_on } else { all_on };
        out_data.set(task.no, T::from_f64(if result_on { 1.0 } else { 0.0 }));
    });
    out
}

/// Binary dilation: a voxel becomes set if it or any neighbour (per
/// `connectivity`) was set.
pub fn dilate<T: VoxelElement>(pool: &WorkerPool, img: &Image<T>, connectivity: Connectivity) -> Image<T> {
    morphology_pass(pool, img, connectivity, true)
}

/// Binary erosion: a voxel stays set only if it and every neighbour (per
/// `connectivity`) were set.
pub fn erode<T: VoxelElement>(pool: &WorkerPool, img: &Image<T>, connectivity: Connectivity) -> Image<T> {
    morphology_pass(pool, img, connectivity, false)
}

/// Extracts a single 2-D slice along axis `axis` at index `v`
///. `axis` must be 0, 1 or 2.
pub fn slice<T: VoxelElement>(img: &Image<T>, axis: usize, v: usize) -> crate::error::Result<Vec<T>> {
    let dims = img.img_dims();
    if axis > 2 || v >= dims[axis].max(1) {
        return Err(crate::error::NibrError::OutOfRange(format!(
            "slice axis {axis} index {v} out of range for dims {dims:?}"
        )));
    }
    let (d0, d1) = match axis {
        0 => (dims[1], dims[2]),
        1 => (dims[0], dims[2]),
        _ => (dims[0], dims[1]),
    };
    let mut out = Vec::with_capacity(d0.max(1) * d1.max(1));
    for b in 0..d1.max(1) {
        for a in 0..d0.max(1) {
            let (i, j, k) = match axis {
                0 => (v, a, b),
                1 => (a, v, b),
                _ => (a, b, v),
            };
            out.push(img.at3(i, j, k).copied().unwrap_or(T::ZERO));
        }
    }
    Ok(out)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::numeric::Affine3x4;

    fn cube_mask(on: impl Fn(usize, usize, usize) -> bool) -> Image<u8> {
        let mut img = Image::<u8>::create(3, [5, 5, 5, 1, 1, 1, 1], [1.0; 7], Affine3x4::identity(), true).unwrap();
        for i in 0..5 {
            for j in 0..5 {
                for k in 0..5 {
                    *img.at3_mut(i, j, k).unwrap() = on(i, j, k) as u8;
                }
            }
        }
        img
    }

    #[test]
    fn min_max_finds_extremes() {
        let pool = WorkerPool::with_threads(2);
        let img = cube_mask(|i, _, _| i == 4);
        let (lo, hi) = min_max(&pool, &img);
        assert_eq!(lo, 0.0);
        assert_eq!(hi, 1.0);
    }

    #[test]
    fn nonzero_indices_matches_brute_force() {
        let pool = WorkerPool::with_threads(4);
        let img = cube_mask(|i, j, k| (i + j + k) % 2 == 0);
        let expected: Vec<usize> = img
            .data()
            .iter()
            .enumerate()
            .filter(|(_, v)| v.is_nonzero())
            .map(|(i, _)| i)
            .collect();
        assert_eq!(nonzero_indices(&pool, &img), expected);
    }

    #[test]
    fn dilate_then_erode_keeps_single_voxel_within_bounds() {
        let pool = WorkerPool::with_threads(2);
        let img = cube_mask(|i, j, k| i == 2 && j == 2 && k == 2);
        let dilated = dilate(&pool, &img, Connectivity::Six);
        // 1 centre + 6 face neighbours = 7 on voxels.
        assert_eq!(nonzero_indices(&pool, &dilated).len(), 7);
        let back = erode(&pool, &dilated, Connectivity::Six);
        assert_eq!(nonzero_indices(&pool, &back), nonzero_indices(&pool, &img));
    }

    #[test]
    fn add_is_pointwise() {
        let pool = WorkerPool::with_threads(2);
        let mut a = cube_mask(|i, _, _| i == 0);
        let b = cube_mask(|i, _, _| i == 0);
        add(&pool, &mut a, &b);
        assert_eq!(a.data().iter().filter(|&&v| v == 2).count(), 25);
    }

    #[test]
    fn slice_extracts_expected_plane() {
        let img = cube_mask(|i, _, _| i == 3);
        let s = slice(&img, 0, 3).unwrap();
        assert!(s.iter().all(|&v| v == 1));
        let s2 = slice(&img, 0, 0).unwrap();
        assert!(s2.iter().all(|&v| v == 0));
    }
}
