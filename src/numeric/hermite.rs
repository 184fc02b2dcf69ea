/// Cubic Hermite interpolation of a scalar between `p0` (at `t=0`) and `p1`
/// (at `t=1`) given tangents `m0`, `m1` at those endpoints. Used by curve-resampling clients built on top
/// of this core; the image module's own cubic interpolation uses a
/// separable uniform B-spline instead.
pub fn hermite_interpolate(p0: f64, m0: f64, p1: f64, m1: f64, t: f64) -> f64 {
    let t2 = t * t;
    let t3 = t2 * t;
    let h00 = 2.0 * t3 - 3.0 * t2 + 1.0;
    let h10 = t3 - 2.0 * t2 + t;
    let h01 = -2.0 * t3 + 3.0 * t2;
    let h11 = t3 - t2;
    h00 * p0 + h10 * m0 + h01 * p1 + h11 * m1
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;

    #[test]
    fn endpoints_are_exact() {
        assert_relative_eq!(hermite_interpolate(1.0, 0.0, 5.0, 0.0, 0.0), 1.0);
        assert_relative_eq!(hermite_interpolate(1.0, 0.0, 5.0, 0.0, 1.0), 5.0);
    }

    #[test]
    fn matches_linear_when_tangents_match_slope() {
        // p0=0, p1=1, slope=1 everywhere -> straight line.
        for t in [0.0, 0.25, 0.5, 0.75, 1.0] {
            assert_relative_eq!(hermite_interpolate(0.0, 1.0, 1.0, 1.0, t), t, epsilon = 1e-12);
        }
    }
}
