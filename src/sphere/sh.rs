//! Real spherical-harmonics basis: order<->coefficient-count mapping,
//! the associated-Legendre recurrence, per-direction basis evaluation,
//! sample<->coefficient conversion, reorientation and rotation.

use std::f64::consts::{PI, SQRT_2};

use crate::error::Result;
use crate::numeric::WorldPoint;

use super::reorient::OrderOfDirections;
use super::invalid_order;

const MAX_ORDER: i32 = 33;

/// Number of SH coefficients for `order`: `(L+1)^2` for the full basis,
/// `(L+3)L/2+1` when only even bands are kept. An odd `order` is rounded
/// down by one when `even_only` is set, since an odd order has no meaning
/// when only even bands are kept.
pub fn coeff_count(order: i32, even_only: bool) -> i32 {
    let order = if even_only && order % 2 == 1 { order - 1 } else { order };
    if even_only {
        (order + 3) * order / 2 + 1
    } else {
        (order + 1) * (order + 1)
    }
}

/// Inverse of [`coeff_count`]: recovers `(order, even_only)` from a
/// coefficient count.
pub fn order_from_coeff_count(n: i32) -> (i32, bool) {
    let sq = (n as f64).sqrt().round() as i32;
    if sq * sq == n {
        (sq - 1, false)
    } else {
        let order = (((8 * n + 1) as f64).sqrt() - 3.0) / 2.0;
        (order.round() as i32, true)
    }
}

fn legendre_index(triangular: bool, l: i32, m: i32) -> usize {
    if triangular {
        ((l * (l + 1)) / 2 + m) as usize
    } else {
        (l * l + l + m) as usize
    }
}

/// Associated Legendre polynomials `P_l^m(x)` for `0 <= m <= l <= order`,
/// via the stable three-term recurrence. `x` is `cos(theta)`.
fn legendre_polynomials(x: f64, order: i32, triangular: bool) -> Vec<f64> {
    let size = ((order + 1) * (order + 1)).max(1) as usize;
    let mut plm = vec![0.0f64; size];
    let idx = |l: i32, m: i32| legendre_index(triangular, l, m);

    plm[idx(0, 0)] = 1.0 / (4.0 * PI).sqrt();

    for m in 1..=order {
        let mf = m as f64;
        let arg = ((2.0 * mf + 1.0) * (1.0 - x * x) / (2.0 * mf)).max(0.0);
        plm[idx(m, m)] = -arg.sqrt() * plm[idx(m - 1, m - 1)];
    }
    for m in 0..order {
        let mf = m as f64;
        plm[idx(m + 1, m)] = (2.0 * mf + 3.0).sqrt() * x * plm[idx(m, m)];
    }
    for m in 0..=order {
        let mut l = m + 2;
        while l <= order {
            let (lf, mf) = (l as f64, m as f64);
            let a = (((2.0 * lf + 1.0) * (2.0 * lf - 1.0)) / ((lf + mf) * (lf - mf))).sqrt();
            let b = ((2.0 * lf + 1.0) * (lf - mf - 1.0) * (lf + mf - 1.0) / ((2.0 * lf - 3.0) * (lf - mf) * (lf + mf))).sqrt();
            plm[idx(l, m)] = a * x * plm[idx(l - 1, m)] - b * plm[idx(l - 2, m)];
            l += 1;
        }
    }
    plm
}

fn assemble_basis(phi: f64, plm: &[f64], order: i32, even_only: bool) -> Vec<f64> {
    let idx = |l: i32, m: i32| legendre_index(even_only, l, m);
    let mut basis = Vec::with_capacity(coeff_count(order, even_only) as usize);
    basis.push(plm[idx(0, 0)]);

    let mut push_band = |l: i32, basis: &mut Vec<f64>| {
        for m in -l..=l {
            let ang = (m.unsigned_abs()) as f64 * phi;
            if m < 0 {
                basis.push(SQRT_2 * ang.sin() * plm[idx(l, -m)]);
            } else if m == 0 {
                basis.push(plm[idx(l, 0)]);
            } else {
                basis.push(SQRT_2 * ang.cos() * plm[idx(l, m)]);
            }
        }
    };

    if even_only {
        let mut l = 2;
        while l <= order {
            push_band(l, &mut basis);
            l += 2;
        }
    } else {
        for l in 1..=order {
            push_band(l, &mut basis);
        }
    }
    basis
}

/// A real spherical-harmonics basis of a fixed order. Evaluates the basis
/// directly at each query direction rather than precomputing a
/// `(phi, theta)` lookup table, trading a table-based micro-optimisation
/// for simplicity.
#[derive(Debug, Clone, Copy)]
pub struct Sh {
    order: i32,
    even_only: bool,
}

impl Sh {
    pub fn new(order: i32, even_only: bool) -> Result<Self> {
        if !(0..=MAX_ORDER).contains(&order) {
            return Err(invalid_order(order));
        }
        Ok(Self { order, even_only })
    }

    pub fn order(&self) -> i32 {
        self.order
    }

    pub fn even_only(&self) -> bool {
        self.even_only
    }

    pub fn coeff_count(&self) -> usize {
        coeff_count(self.order, self.even_only) as usize
    }

    /// The basis vector `Y(dir)` such that `toSF(coeffs, dir) = dot(coeffs, Y(dir))`.
    pub fn basis_at(&self, dir: WorldPoint) -> Vec<f64> {
        let d = dir.normalize();
        let phi = d.y.atan2(d.x);
        let plm = legendre_polynomials(d.z.clamp(-1.0, 1.0), self.order, self.even_only);
        assemble_basis(phi, &plm, self.order, self.even_only)
    }

    /// Evaluates the spherical function represented by `coeffs` at `dir`,
    /// clamped to non-negative.
    pub fn to_sf(&self, coeffs: &[f64], dir: WorldPoint) -> f64 {
        let basis = self.basis_at(dir);
        let amp: f64 = coeffs.iter().zip(basis.iter()).map(|(c, b)| c * b).sum();
        amp.max(0.0)
    }

    /// Basis matrix, one row per direction.
    pub fn basis_matrix(&self, directions: &[WorldPoint]) -> Vec<Vec<f64>> {
        directions.iter().map(|&d| self.basis_at(d)).collect()
    }

    /// Projects per-direction samples into SH coefficients, using the
    /// `4*pi/N` quadrature weight that approximates the spherical
    /// integral `integral(f * Y) dOmega` by a sum over `directions`
    /// (grounded on the energy-preservation comment in
    /// `sphericalHarmonics_aux.cpp`; applied here on the forward
    /// transform rather than the inverse one, so that
    /// `sh2sf(sf2sh(x))` round-trips -- see `DESIGN.md`).
    pub fn sf2sh(&self, samples: &[f64], directions: &[WorldPoint]) -> Vec<f64> {
        let n = directions.len().max(1) as f64;
        let weight = 4.0 * PI / n;
        let basis = self.basis_matrix(directions);
        let m = self.coeff_count();
        let mut coeffs = vec![0.0f64; m];
        for (sample, b) in samples.iter().zip(basis.iter()) {
            for (c, bk) in coeffs.iter_mut().zip(b.iter()) {
                *c += weight * sample * bk;
            }
        }
        coeffs
    }

    /// Evaluates coefficients at every direction,
    /// non-negativity clamped per direction like [`Self::to_sf`].
    pub fn sh2sf(&self, coeffs: &[f64], directions: &[WorldPoint]) -> Vec<f64> {
        directions.iter().map(|&d| self.to_sf(coeffs, d)).collect()
    }

    fn reexpand(&self, coeffs: &[f64], directions: &[WorldPoint], transform: impl Fn(WorldPoint) -> WorldPoint) -> Vec<f64> {
        let samples: Vec<f64> = directions.iter().map(|&d| self.to_sf(coeffs, transform(d))).collect();
        self.sf2sh(&samples, directions)
    }

    /// Reorients `coeffs` by one of the 48 signed axis permutations
    ///: re-expands at the permuted
    /// samples, then re-projects into the original basis.
    pub fn reorient(&self, coeffs: &[f64], directions: &[WorldPoint], ood: OrderOfDirections) -> Vec<f64> {
        self.reexpand(coeffs, directions, |d| ood.apply(d))
    }

    /// Rotates `coeffs` by a 4x4 affine's linear part: re-expands at rotated samples, then
    /// re-projects into the original basis.
    pub fn rotate(&self, coeffs: &[f64], directions: &[WorldPoint], rotation: glam::DMat4) -> Vec<f64> {
        self.reexpand(coeffs, directions, |d| rotation.transform_vector3(d))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::sphere::SphereSet;
    use approx::assert_relative_eq;

    #[test]
    fn coeff_count_matches_full_and_even_formulas() {
        assert_eq!(coeff_count(0, false), 1);
        assert_eq!(coeff_count(2, false), 9);
        assert_eq!(coeff_count(2, true), 6);
        assert_eq!(coeff_count(8, true), 45);
    }

    #[test]
    fn order_from_coeff_count_round_trips() {
        for order in 0..8 {
            let n = coeff_count(order, false);
            assert_eq!(order_from_coeff_count(n), (order, false));
        }
        for order in (0..8).step_by(2) {
            let n = coeff_count(order, true);
            assert_eq!(order_from_coeff_count(n), (order, true));
        }
    }

    #[test]
    fn order_zero_is_constant_and_positive() {
        let sh = Sh::new(0, false).unwrap();
        let coeffs = vec![2.0];
        let v1 = sh.to_sf(&coeffs, WorldPoint::new(1.0, 0.0, 0.0));
        let v2 = sh.to_sf(&coeffs, WorldPoint::new(0.0, 0.0, 1.0));
        assert_relative_eq!(v1, v2, epsilon = 1e-9);
        assert!(v1 > 0.0);
    }

    #[test]
    fn sh_to_sf_round_trip_on_band_limited_function() {
        let sh = Sh::new(4, false).unwrap();
        let set = SphereSet::lattice(false, None).unwrap();
        let dirs = set.directions().to_vec();

        // A genuinely band-limited, non-negative input: a constant plus a
        // small order-2 component evaluated directly from coefficients.
        let mut coeffs = vec![0.0; sh.coeff_count()];
        coeffs[0] = 3.0;
        coeffs[4] = 0.4;

        let samples = sh.sh2sf(&coeffs, &dirs);
        let recovered = sh.sf2sh(&samples, &dirs);
        let resynth = sh.sh2sf(&recovered, &dirs);

        let rms: f64 = samples.iter().zip(resynth.iter()).map(|(a, b)| (a - b).powi(2)).sum::<f64>() / samples.len() as f64;
        assert!(rms.sqrt() < 1e-2, "round trip RMS too large: {rms}");
    }

    #[test]
    fn rejects_order_above_33() {
        assert!(Sh::new(34, false).is_err());
    }
}
