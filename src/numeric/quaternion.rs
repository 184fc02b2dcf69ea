use glam::{DMat3, DQuat, DVec3};

/// Converts a rotation quaternion to its 3x3 matrix form.
pub fn quat_to_mat3(q: DQuat) -> DMat3 {
    DMat3::from_quat(q)
}

/// Converts a (proper, orthonormal) 3x3 rotation matrix to a quaternion.
pub fn mat3_to_quat(m: DMat3) -> DQuat {
    DQuat::from_mat3(&m)
}

/// Builds a quaternion from an axis-angle pair. `axis` need not be
/// pre-normalised.
pub fn axis_angle_to_quat(axis: DVec3, angle_radians: f64) -> DQuat {
    DQuat::from_axis_angle(axis.normalize(), angle_radians)
}

/// Recovers the axis-angle pair from a quaternion.
pub fn quat_to_axis_angle(q: DQuat) -> (DVec3, f64) {
    q.to_axis_angle()
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;
    use std::f64::consts::PI;

    #[test]
    fn axis_angle_round_trip() {
        let axis = DVec3::new(1.0, 2.0, 3.0).normalize();
        let angle = PI / 3.0;
        let q = axis_angle_to_quat(axis, angle);
        let (axis2, angle2) = quat_to_axis_angle(q);
        assert_relative_eq!(axis2, axis, epsilon = 1e-8);
        assert_relative_eq!(angle2, angle, epsilon = 1e-8);
    }

    #[test]
    fn matrix_round_trip_is_orthonormal() {
        let q = axis_angle_to_quat(DVec3::new(0.0, 0.0, 1.0), PI / 4.0);
        let m = quat_to_mat3(q);
        let q2 = mat3_to_quat(m);
        let v = DVec3::new(1.0, 0.0, 0.0);
        assert_relative_eq!(q * v, q2 * v, epsilon = 1e-8);
    }
}
