use glam::{Quat, Vec3};
use sphere_layout::Tile;

/// Scale, rotation and translation of one tile entity in world space.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Transform {
    pub translation: Vec3,
    pub rotation: Quat,
    pub scale: Vec3,
}

impl Transform {
    pub const IDENTITY: Self = Self {
        translation: Vec3::ZERO,
        rotation: Quat::IDENTITY,
        scale: Vec3::ONE,
    };

    /// Builds a transform with a uniform scale.
    pub fn new(translation: Vec3, rotation: Quat, scale: f32) -> Self {
        Self {
            translation,
            rotation,
            scale: Vec3::splat(scale),
        }
    }

    /// The tile's slot on the sphere, at scale 1.0.
    pub fn rest(tile: &Tile) -> Self {
        Self::new(tile.position, tile.rest_rotation, 1.0)
    }

    #[must_use]
    pub fn with_scale(mut self, scale: f32) -> Self {
        self.scale = Vec3::splat(scale);
        self
    }

    /// Interpolates toward `to`; rotation is slerped along the shortest arc.
    #[must_use]
    pub fn lerp(&self, to: &Self, t: f32) -> Self {
        Self {
            translation: self.translation.lerp(to.translation, t),
            rotation: self.rotation.slerp(to.rotation, t),
            scale: self.scale.lerp(to.scale, t),
        }
    }

    /// Component-wise comparison; `q` and `-q` count as the same rotation.
    pub fn approx_eq(&self, other: &Self, eps: f32) -> bool {
        self.translation.abs_diff_eq(other.translation, eps)
            && self.scale.abs_diff_eq(other.scale, eps)
            && self.rotation.dot(other.rotation).abs() >= 1.0 - eps
    }
}

impl Default for Transform {
    fn default() -> Self {
        Self::IDENTITY
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::f32::consts::PI;

    #[test]
    fn lerp_hits_both_ends() {
        let a = Transform::new(Vec3::ZERO, Quat::IDENTITY, 1.0);
        let b = Transform::new(Vec3::new(2.0, 4.0, -6.0), Quat::from_rotation_y(PI / 2.0), 3.0);
        assert!(a.lerp(&b, 0.0).approx_eq(&a, 1e-6));
        assert!(a.lerp(&b, 1.0).approx_eq(&b, 1e-6));

        let mid = a.lerp(&b, 0.5);
        assert!(mid.translation.abs_diff_eq(Vec3::new(1.0, 2.0, -3.0), 1e-6));
        assert!(mid.scale.abs_diff_eq(Vec3::splat(2.0), 1e-6));
    }

    #[test]
    fn negated_quaternion_is_equal() {
        let q = Quat::from_rotation_x(0.7);
        let a = Transform::new(Vec3::X, q, 1.0);
        let b = Transform::new(Vec3::X, -q, 1.0);
        assert!(a.approx_eq(&b, 1e-6));
    }

    #[test]
    fn rest_uses_tile_pose() {
        let tile = &sphere_layout::generate(10, 2.0)[3];
        let rest = Transform::rest(tile);
        assert_eq!(rest.translation, tile.position);
        assert_eq!(rest.rotation, tile.rest_rotation);
        assert_eq!(rest.scale, Vec3::ONE);
    }
}
