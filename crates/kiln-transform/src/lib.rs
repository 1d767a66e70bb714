use std::ops::Mul;

use glam::{Mat4, Quat, Vec3};

mod euler;
pub use euler::*;

/// Scale, rotation and translation of a node, composed as `T * R * S`.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Transform {
    pub translation: Vec3,
    pub rotation: Quat,
    pub scale: Vec3,
}

impl Default for Transform {
    fn default() -> Self {
        Self::IDENTITY
    }
}

impl From<Mat4> for Transform {
    fn from(value: Mat4) -> Self {
        let (scale, rotation, translation) = value.to_scale_rotation_translation();
        Self {
            translation,
            rotation,
            scale,
        }
    }
}

impl Mul for Transform {
    type Output = Transform;

    fn mul(self, rhs: Self) -> Self::Output {
        Transform::from(self.get_matrix() * rhs.get_matrix())
    }
}

impl Transform {
    pub const IDENTITY: Self = Self {
        translation: Vec3::ZERO,
        rotation: Quat::IDENTITY,
        scale: Vec3::ONE,
    };

    pub fn new(translation: Vec3, rotation: Quat, scale: Vec3) -> Self {
        Self {
            translation,
            rotation,
            scale,
        }
    }

    pub fn from_translation(translation: Vec3) -> Self {
        Self {
            translation,
            ..Self::IDENTITY
        }
    }

    pub fn from_rotation(rotation: Quat) -> Self {
        Self {
            rotation,
            ..Self::IDENTITY
        }
    }

    pub fn from_scale(scale: Vec3) -> Self {
        Self {
            scale,
            ..Self::IDENTITY
        }
    }

    pub fn get_matrix(&self) -> Mat4 {
        Mat4::from_scale_rotation_translation(self.scale, self.rotation, self.translation)
    }

    /// Inverse of the composed matrix, decomposed again. Exact for uniform scale only.
    pub fn inverse(&self) -> Self {
        Transform::from(self.get_matrix().inverse())
    }

    pub fn transform_point(&self, point: Vec3) -> Vec3 {
        self.get_matrix().transform_point3(point)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn matrix_round_trip() {
        let transform = Transform::new(
            Vec3::new(1.0, -2.0, 3.0),
            Quat::from_rotation_y(0.7),
            Vec3::new(2.0, 2.0, 2.0),
        );
        let decomposed = Transform::from(transform.get_matrix());

        assert!(decomposed.translation.abs_diff_eq(transform.translation, 1e-5));
        assert!(decomposed.rotation.abs_diff_eq(transform.rotation, 1e-5));
        assert!(decomposed.scale.abs_diff_eq(transform.scale, 1e-5));
    }

    #[test]
    fn composition_applies_right_hand_side_first() {
        let parent = Transform::from_translation(Vec3::new(0.0, 5.0, 0.0));
        let child = Transform::from_scale(Vec3::splat(3.0));

        let point = (parent * child).transform_point(Vec3::X);
        assert!(point.abs_diff_eq(Vec3::new(3.0, 5.0, 0.0), 1e-5));
    }

    #[test]
    fn inverse_cancels() {
        let transform = Transform::new(
            Vec3::new(4.0, 0.5, -1.0),
            Quat::from_rotation_z(1.2),
            Vec3::ONE,
        );
        let identity = transform * transform.inverse();

        assert!(identity.translation.abs_diff_eq(Vec3::ZERO, 1e-5));
        assert!(identity.rotation.abs_diff_eq(Quat::IDENTITY, 1e-5));
    }
}
