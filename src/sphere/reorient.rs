//! The 48 signed axis permutations used to reorient a direction before
//! indexing into a sphere discretization or an SH basis. A single
//! permutation-plus-sign struct covers all of them, built from a
//! three-letter code (`"XYZ"`, `"xZy"`, ...).

use crate::error::{NibrError, Result};
use crate::numeric::WorldPoint;

/// One of the 48 signed permutations of `(x, y, z)`. `axis[k]` is the source axis feeding
/// output axis `k`; `sign[k]` is `+1`/`-1` applied after the permutation.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct OrderOfDirections {
    axis: [u8; 3],
    sign: [i8; 3],
}

impl OrderOfDirections {
    /// The identity ordering (`"XYZ"`): no permutation, no sign flip.
    pub const XYZ: Self = Self {
        axis: [0, 1, 2],
        sign: [1, 1, 1],
    };

    /// Parses a three-letter code such as `"Xyz"` or `"zXY"`:
    /// the letter at position `k` (case-insensitive `X`/`Y`/`Z`) names
    /// which source axis feeds output axis `k`; uppercase keeps the
    /// sign, lowercase negates it.
    pub fn from_code(code: &str) -> Result<Self> {
        let chars: Vec<char> = code.chars().collect();
        if chars.len() != 3 {
            return Err(NibrError::InvalidArgument(format!(
                "order-of-directions code must have exactly 3 letters, got {code:?}"
            )));
        }
        let mut axis = [0u8; 3];
        let mut sign = [1i8; 3];
        let mut seen = [false; 3];
        for (k, ch) in chars.iter().enumerate() {
            let (a, s) = match ch {
                'X' => (0u8, 1i8),
                'x' => (0u8, -1i8),
                'Y' => (1u8, 1i8),
                'y' => (1u8, -1i8),
                'Z' => (2u8, 1i8),
                'z' => (2u8, -1i8),
                _ => {
                    return Err(NibrError::InvalidArgument(format!(
                        "unknown order-of-directions code {code:?}: acceptable letters are X/Y/Z (any case)"
                    )))
                }
            };
            if seen[a as usize] {
                return Err(NibrError::InvalidArgument(format!(
                    "order-of-directions code {code:?} repeats an axis"
                )));
            }
            seen[a as usize] = true;
            axis[k] = a;
            sign[k] = s;
        }
        Ok(Self { axis, sign })
    }

    /// Applies the permutation and sign flips to a direction.
    pub fn apply(&self, d: WorldPoint) -> WorldPoint {
        let comps = [d.x, d.y, d.z];
        WorldPoint::new(
            comps[self.axis[0] as usize] * self.sign[0] as f64,
            comps[self.axis[1] as usize] * self.sign[1] as f64,
            comps[self.axis[2] as usize] * self.sign[2] as f64,
        )
    }

    /// The inverse ordering: applying `self` then `self.inverse()` (or
    /// vice versa) is the identity.
    pub fn inverse(&self) -> Self {
        let mut axis = [0u8; 3];
        let mut sign = [1i8; 3];
        for k in 0..3 {
            axis[self.axis[k] as usize] = k as u8;
            sign[self.axis[k] as usize] = self.sign[k];
        }
        Self { axis, sign }
    }
}

impl Default for OrderOfDirections {
    fn default() -> Self {
        Self::XYZ
    }
}
