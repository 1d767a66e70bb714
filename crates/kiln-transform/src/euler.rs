use glam::{EulerRot, Quat, Vec3};

/// Order in which the three Euler rotations of a source transform are applied.
/// `Xyz` rotates around X first, then Y, then Z.
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq, Hash)]
pub enum RotationOrder {
    #[default]
    Xyz,
    Xzy,
    Yzx,
    Yxz,
    Zxy,
    Zyx,
    SphericXyz,
}

impl RotationOrder {
    /// Axis indices in application order, `None` for orders that are not plain Euler sequences.
    pub fn axes(self) -> Option<[usize; 3]> {
        match self {
            RotationOrder::Xyz => Some([0, 1, 2]),
            RotationOrder::Xzy => Some([0, 2, 1]),
            RotationOrder::Yzx => Some([1, 2, 0]),
            RotationOrder::Yxz => Some([1, 0, 2]),
            RotationOrder::Zxy => Some([2, 0, 1]),
            RotationOrder::Zyx => Some([2, 1, 0]),
            RotationOrder::SphericXyz => None,
        }
    }

    // The glam sequence whose angles come out as (third, second, first).
    fn glam_rot(self) -> Option<EulerRot> {
        match self {
            RotationOrder::Xyz => Some(EulerRot::ZYX),
            RotationOrder::Xzy => Some(EulerRot::YZX),
            RotationOrder::Yzx => Some(EulerRot::XZY),
            RotationOrder::Yxz => Some(EulerRot::ZXY),
            RotationOrder::Zxy => Some(EulerRot::YXZ),
            RotationOrder::Zyx => Some(EulerRot::XYZ),
            RotationOrder::SphericXyz => None,
        }
    }
}

/// Builds a quaternion from Euler angles in degrees. Returns `None` when `order` has no Euler composition.
pub fn quat_from_euler_degrees(order: RotationOrder, degrees: Vec3) -> Option<Quat> {
    let [first, second, third] = order.axes()?;
    let axis_rotation =
        |axis: usize| Quat::from_axis_angle(Vec3::AXES[axis], degrees[axis].to_radians());

    Some(axis_rotation(third) * axis_rotation(second) * axis_rotation(first))
}

/// Inverse of [`quat_from_euler_degrees`].
pub fn euler_degrees_from_quat(order: RotationOrder, rotation: Quat) -> Option<Vec3> {
    let [first, second, third] = order.axes()?;
    let (a, b, c) = rotation.to_euler(order.glam_rot()?);

    let mut degrees = Vec3::ZERO;
    degrees[third] = a.to_degrees();
    degrees[second] = b.to_degrees();
    degrees[first] = c.to_degrees();
    Some(degrees)
}

#[cfg(test)]
mod tests {
    use super::*;

    const ORDERS: [RotationOrder; 6] = [
        RotationOrder::Xyz,
        RotationOrder::Xzy,
        RotationOrder::Yzx,
        RotationOrder::Yxz,
        RotationOrder::Zxy,
        RotationOrder::Zyx,
    ];

    fn same_rotation(a: Quat, b: Quat) -> bool {
        (a.dot(b).abs() - 1.0).abs() < 1e-5
    }

    #[test]
    fn single_axis_matches_glam() {
        let q = quat_from_euler_degrees(RotationOrder::Xyz, Vec3::new(30.0, 0.0, 0.0)).unwrap();
        assert!(same_rotation(q, Quat::from_rotation_x(30f32.to_radians())));

        let q = quat_from_euler_degrees(RotationOrder::Zyx, Vec3::new(0.0, 0.0, 90.0)).unwrap();
        assert!(same_rotation(q, Quat::from_rotation_z(90f32.to_radians())));
    }

    #[test]
    fn xyz_applies_x_first() {
        let q = quat_from_euler_degrees(RotationOrder::Xyz, Vec3::new(90.0, 0.0, 90.0)).unwrap();
        let expected =
            Quat::from_rotation_z(90f32.to_radians()) * Quat::from_rotation_x(90f32.to_radians());
        assert!(same_rotation(q, expected));
    }

    #[test]
    fn every_order_round_trips() {
        let degrees = Vec3::new(25.0, -40.0, 70.0);
        for order in ORDERS {
            let q = quat_from_euler_degrees(order, degrees).unwrap();
            let back = euler_degrees_from_quat(order, q).unwrap();
            let again = quat_from_euler_degrees(order, back).unwrap();
            assert!(same_rotation(q, again), "{order:?}");
        }
    }

    #[test]
    fn spheric_order_is_rejected() {
        assert!(quat_from_euler_degrees(RotationOrder::SphericXyz, Vec3::ONE).is_none());
        assert!(euler_degrees_from_quat(RotationOrder::SphericXyz, Quat::IDENTITY).is_none());
    }
}
