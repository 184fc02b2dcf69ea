//! Signed Euclidean distance transform via 3D fast marching. Uniform unit
//! speed in voxel space; the seeding scan over all voxels parallelises
//! over the worker pool, but the marching loop itself is an inherently
//! sequential min-heap sweep, the same shape as Dijkstra's algorithm.

use std::cmp::Ordering;
use std::collections::BinaryHeap;

use vob::Vob;

use crate::image::{Image, VoxelElement};
use crate::parallel_slice::ParallelSliceMut;
use crate::worker::WorkerPool;

/// Builds an all-`false` bitset of `len` bits.
fn false_vob(len: usize) -> Vob<u32> {
    let mut v: Vob<u32> = Vob::new_with_storage_type(0);
    v.resize(len, false);
    v
}

#[derive(Debug, Clone, Copy, PartialEq)]
struct HeapEntry {
    dist: f64,
    idx: usize,
}

impl Eq for HeapEntry {}
impl Ord for HeapEntry {
    fn cmp(&self, other: &Self) -> Ordering {
        // Reverse so `BinaryHeap` (a max-heap) pops the smallest distance.
        other.dist.partial_cmp(&self.dist).unwrap_or(Ordering::Equal)
    }
}
impl PartialOrd for HeapEntry {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

const NEIGHBOURS: [(isize, isize, isize); 6] = [
    (1, 0, 0),
    (-1, 0, 0),
    (0, 1, 0),
    (0, -1, 0),
    (0, 0, 1),
    (0, 0, -1),
];

fn linear_index(dims: [usize; 3], i: usize, j: usize, k: usize) -> usize {
    i + j * dims[0].max(1) + k * dims[0].max(1) * dims[1].max(1)
}

fn to_ijk(flat: usize, dims: [usize; 3]) -> (usize, usize, usize) {
    let d0 = dims[0].max(1);
    let d1 = dims[1].max(1);
    let i = flat % d0;
    let j = (flat / d0) % d1;
    let k = flat / (d0 * d1);
    (i, j, k)
}

/// Solves the one-sided upwind Eikonal update at a voxel from its already
/// "frozen" axis-neighbour minima, with unit speed.
fn eikonal_update(frozen_neighbours: &[f64]) -> f64 {
    // Collect the minimum frozen value along each of the (up to 3) axes
    // that have at least one frozen neighbour, then solve the quadratic
    // `sum (T - a_k)^2 = 1` over the active axes, falling back to fewer
    // axes if the discriminant goes negative (standard FMM practice).
    let mut axis_mins: Vec<f64> = frozen_neighbours.to_vec();
    axis_mins.sort_by(|a, b| a.partial_cmp(b).unwrap());
    for take in (1..=axis_mins.len()).rev() {
        let a = &axis_mins[..take];
        let sum_a: f64 = a.iter().sum();
        let sum_a2: f64 = a.iter().map(|v| v * v).sum();
        let n = take as f64;
        let disc = sum_a * sum_a - n * (sum_a2 - 1.0);
        if disc < 0.0 {
            continue;
        }
        let t = (sum_a + disc.sqrt()) / n;
        // A valid update must exceed every contributing neighbour's value
        // (otherwise its upwind assumption is violated and a smaller
        // active set should be used instead).
        if a.iter().all(|&v| t >= v) {
            return t;
        }
    }
    axis_mins.first().copied().unwrap_or(f64::INFINITY) + 1.0
}

/// Runs a one-sided fast-marching sweep filling `dist` (initialised with
/// `0.0` at every seed index and `f64::INFINITY` elsewhere) up to the
/// whole grid, using only the voxels reachable under `active`.
fn march(dims: [usize; 3], active: &dyn Fn(usize, usize, usize) -> bool, seeds: &[usize], dist: &mut [f64]) {
    let mut frozen = false_vob(dist.len());
    let mut heap = BinaryHeap::new();
    for &s in seeds {
        frozen.set(s, true);
        heap.push(HeapEntry { dist: dist[s], idx: s });
    }
    while let Some(HeapEntry { dist: d, idx }) = heap.pop() {
        // Stale heap entry: this index was re-pushed with a smaller
        // distance after this entry was queued.
        if d > dist[idx] {
            continue;
        }
        if frozen.get(idx).unwrap_or(false) {
            continue;
        }
        frozen.set(idx, true);
        let (i, j, k) = to_ijk(idx, dims);
        for &(di, dj, dk) in &NEIGHBOURS {
            let ni = i as isize + di;
            let nj = j as isize + dj;
            let nk = k as isize + dk;
            if ni < 0 || nj < 0 || nk < 0 {
                continue;
            }
            let (ni, nj, nk) = (ni as usize, nj as usize, nk as usize);
            if ni >= dims[0].max(1) || nj >= dims[1].max(1) || nk >= dims[2].max(1) {
                continue;
            }
            if !active(ni, nj, nk) {
                continue;
            }
            let nidx = linear_index(dims, ni, nj, nk);
            if frozen.get(nidx).unwrap_or(false) {
                continue;
            }
            // Gather frozen axis-neighbour minima around `nidx`.
            let mut axis_vals = Vec::with_capacity(3);
            for axis_pair in [(1isize, 0isize, 0isize), (0, 1, 0), (0, 0, 1)] {
                let (ai, aj, ak) = axis_pair;
                let mut best = f64::INFINITY;
                for sign in [1isize, -1isize] {
                    let pi = ni as isize + ai * sign;
                    let pj = nj as isize + aj * sign;
                    let pk = nk as isize + ak * sign;
                    if pi < 0 || pj < 0 || pk < 0 {
                        continue;
                    }
                    let (pi, pj, pk) = (pi as usize, pj as usize, pk as usize);
                    if pi >= dims[0].max(1) || pj >= dims[1].max(1) || pk >= dims[2].max(1) {
                        continue;
                    }
                    let pidx = linear_index(dims, pi, pj, pk);
                    if frozen.get(pidx).unwrap_or(false) {
                        best = best.min(dist[pidx]);
                    }
                }
                if best.is_finite() {
                    axis_vals.push(best);
                }
            }
            if axis_vals.is_empty() {
                continue;
            }
            let candidate = eikonal_update(&axis_vals);
            if candidate < dist[nidx] {
                dist[nidx] = candidate;
                heap.push(HeapEntry { dist: candidate, idx: nidx });
            }
        }
    }
}

/// Computes the signed EDT of `img`'s nonzero mask: negative inside the
/// mask, positive outside, zero at the boundary, in world units scaled by
/// `pixDims[0]`. Assumes isotropic spacing across the first three axes
/// (uniform marching speed).
pub fn signed_edt<T: VoxelElement>(pool: &WorkerPool, img: &Image<T>) -> Image<f64> {
    let dims3 = [img.img_dims()[0], img.img_dims()[1], img.img_dims()[2]];
    let n = dims3[0].max(1) * dims3[1].max(1) * dims3[2].max(1);

    let mut inside = vec![false; n];
    let inside_slice = ParallelSliceMut::new(&mut inside);
    pool.run(n, None, |task| {
        let (i, j, k) = to_ijk(task.no, dims3);
        let on = img.at3(i, j, k).map(|v| v.is_nonzero()).unwrap_or(false);
        inside_slice.set(task.no, on);
    });

    // Boundary seeds: voxels adjacent to a voxel of the opposite mask
    // value are frozen at distance 0 in both sweeps.
    let mut seeds = Vec::new();
    for idx in 0..n {
        let (i, j, k) = to_ijk(idx, dims3);
        let here = inside[idx];
        let mut on_boundary = false;
        for &(di, dj, dk) in &NEIGHBOURS {
            let ni = i as isize + di;
            let nj = j as isize + dj;
            let nk = k as isize + dk;
            if ni < 0 || nj < 0 || nk < 0 {
                continue;
            }
            let (ni, nj, nk) = (ni as usize, nj as usize, nk as usize);
            if ni >= dims3[0].max(1) || nj >= dims3[1].max(1) || nk >= dims3[2].max(1) {
                continue;
            }
            if inside[linear_index(dims3, ni, nj, nk)] != here {
                on_boundary = true;
                break;
            }
        }
        if on_boundary {
            seeds.push(idx);
        }
    }

    let mut inside_dist = vec![f64::INFINITY; n];
    let mut outside_dist = vec![f64::INFINITY; n];
    for &s in &seeds {
        inside_dist[s] = 0.0;
        outside_dist[s] = 0.0;
    }
    march(dims3, &|i, j, k| inside[linear_index(dims3, i, j, k)], &seeds, &mut inside_dist);
    march(dims3, &|i, j, k| !inside[linear_index(dims3, i, j, k)], &seeds, &mut outside_dist);

    let scale = img.pix_dims()[0];
    let mut out = Image::<f64>::create(3, img.img_dims(), img.pix_dims(), *img.ijk2xyz(), true).unwrap();
    let out_slice = ParallelSliceMut::new(out.data_mut());
    pool.run(n, None, |task| {
        let value = if inside[task.no] {
            -inside_dist[task.no] * scale
        } else {
            outside_dist[task.no] * scale
        };
        out_slice.set(task.no, value);
    });
    out
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::numeric::Affine3x4;

    #[test]
    fn sign_matches_mask_membership() {
        let pool = WorkerPool::with_threads(2);
        let mut img = Image::<u8>::create(3, [6, 6, 6, 1, 1, 1, 1], [1.0; 7], Affine3x4::identity(), true).unwrap();
        for i in 0..6 {
            for j in 0..6 {
                for k in 0..6 {
                    *img.at3_mut(i, j, k).unwrap() = (i >= 2 && i <= 3 && j >= 2 && j <= 3 && k >= 2 && k <= 3) as u8;
                }
            }
        }
        let dist = signed_edt(&pool, &img);
        for i in 0..6 {
            for j in 0..6 {
                for k in 0..6 {
                    let inside = i >= 2 && i <= 3 && j >= 2 && j <= 3 && k >= 2 && k <= 3;
                    let v = *dist.at3(i, j, k).unwrap();
                    if inside {
                        assert!(v <= 0.0, "expected non-positive at ({i},{j},{k}), got {v}");
                    } else {
                        assert!(v >= 0.0, "expected non-negative at ({i},{j},{k}), got {v}");
                    }
                }
            }
        }
    }

    #[test]
    fn flat_region_has_bounded_distance() {
        let pool = WorkerPool::with_threads(2);
        let mut img = Image::<u8>::create(3, [10, 10, 10, 1, 1, 1, 1], [1.0; 7], Affine3x4::identity(), true).unwrap();
        for i in 0..10 {
            for j in 0..10 {
                for k in 0..10 {
                    *img.at3_mut(i, j, k).unwrap() = (i < 5) as u8;
                }
            }
        }
        let dist = signed_edt(&pool, &img);
        // A voxel far inside the "on" half should be strongly negative,
        // and far inside the "off" half strongly positive.
        assert!(*dist.at3(0, 5, 5).unwrap() < -2.0);
        assert!(*dist.at3(9, 5, 5).unwrap() > 2.0);
    }
}
