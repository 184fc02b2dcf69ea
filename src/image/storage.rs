use crate::error::{NibrError, Result};

/// Number of axes an [`super::Image`] may have.
pub const MAX_DIMS: usize = 7;

/// Describes the logical-to-physical mapping from a 7-axis index to a flat
/// buffer offset.
///
/// `order[k]` names which logical axis is the `k`-th fastest-varying axis
/// in storage (`order[0]` is fastest). Strides are derived so that
/// `flat = sum_k index[order[k]] * stride[order[k]]`, with
/// `stride[order[0]] = 1` and each subsequent stride the product of the
/// extents of the axes that precede it in `order`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct IndexOrder {
    order: [u8; MAX_DIMS],
}

impl IndexOrder {
    /// Canonical order: axis 0 fastest, axis 6 slowest (row-major on the
    /// reversed axis list, i.e. Fortran-style on `(i0..i6)`).
    pub fn canonical() -> Self {
        let mut order = [0u8; MAX_DIMS];
        for (k, slot) in order.iter_mut().enumerate() {
            *slot = k as u8;
        }
        Self { order }
    }

    /// Builds an index order from an explicit permutation of `0..7`.
    pub fn from_permutation(order: [u8; MAX_DIMS]) -> Result<Self> {
        let mut seen = [false; MAX_DIMS];
        for &axis in &order {
            let axis = axis as usize;
            if axis >= MAX_DIMS || seen[axis] {
                return Err(NibrError::InvalidArgument(format!(
                    "indexOrder must be a permutation of 0..{MAX_DIMS}, got {order:?}"
                )));
            }
            seen[axis] = true;
        }
        Ok(Self { order })
    }

    pub fn as_slice(&self) -> &[u8; MAX_DIMS] {
        &self.order
    }

    /// Computes the per-axis strides implied by this order over `dims`
    /// (extents along each of the 7 logical axes).
    pub fn strides(&self, dims: [usize; MAX_DIMS]) -> [usize; MAX_DIMS] {
        let mut strides = [0usize; MAX_DIMS];
        let mut acc = 1usize;
        for &axis in self.order.iter() {
            let axis = axis as usize;
            strides[axis] = acc;
            acc *= dims[axis].max(1);
        }
        strides
    }

    /// Total number of elements implied by `dims`.
    pub fn total_len(dims: [usize; MAX_DIMS]) -> usize {
        dims.iter().map(|&d| d.max(1)).product()
    }

    /// Maps a logical index `(i0..i6)` to a flat buffer offset.
    pub fn sub2ind(&self, index: [usize; MAX_DIMS], strides: [usize; MAX_DIMS]) -> usize {
        index.iter().zip(strides.iter()).map(|(&i, &s)| i * s).sum()
    }

    /// Inverse of [`Self::sub2ind`]: recovers the logical index from a
    /// flat offset, given the extents.
    pub fn ind2sub(&self, mut flat: usize, dims: [usize; MAX_DIMS]) -> [usize; MAX_DIMS] {
        let mut index = [0usize; MAX_DIMS];
        // Walk axes from slowest to fastest so the remainder divides down
        // correctly regardless of the chosen order.
        for &axis in self.order.iter().rev() {
            let axis = axis as usize;
            let extent = dims[axis].max(1);
            index[axis] = flat % extent;
            flat /= extent;
        }
        index
    }
}

impl Default for IndexOrder {
    fn default() -> Self {
        Self::canonical()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn canonical_round_trips() {
        let order = IndexOrder::canonical();
        let dims = [4, 3, 2, 1, 1, 1, 1];
        let strides = order.strides(dims);
        for i0 in 0..4 {
            for i1 in 0..3 {
                for i2 in 0..2 {
                    let idx = [i0, i1, i2, 0, 0, 0, 0];
                    let flat = order.sub2ind(idx, strides);
                    assert_eq!(order.ind2sub(flat, dims), idx);
                }
            }
        }
    }

    #[test]
    fn permuted_order_round_trips_and_differs_from_canonical() {
        // axis 2 fastest, then axis 0, then axis 1, rest unused.
        let order = IndexOrder::from_permutation([2, 0, 1, 3, 4, 5, 6]).unwrap();
        let dims = [4, 3, 2, 1, 1, 1, 1];
        let strides = order.strides(dims);
        let idx = [2, 1, 1, 0, 0, 0, 0];
        let flat = order.sub2ind(idx, strides);
        assert_eq!(order.ind2sub(flat, dims), idx);

        let canon = IndexOrder::canonical();
        let canon_flat = canon.sub2ind(idx, canon.strides(dims));
        assert_ne!(flat, canon_flat, "a non-trivial permutation must change the flat offset");
    }

    #[test]
    fn rejects_non_permutation() {
        assert!(IndexOrder::from_permutation([0, 0, 1, 2, 3, 4, 5]).is_err());
        assert!(IndexOrder::from_permutation([0, 1, 2, 3, 4, 5, 7]).is_err());
    }

    #[test]
    fn total_len_clamps_unused_axes_to_one() {
        assert_eq!(IndexOrder::total_len([4, 3, 2, 0, 0, 0, 0]), 24);
    }
}
