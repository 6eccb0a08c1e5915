//! 3D Ray for scene queries

use crate::transform::Transform;
use crate::vector::Vec3;

/// 3D ray
#[derive(Clone, Copy, Debug, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct Ray {
    /// Ray origin point
    pub origin: Vec3,
    /// Ray direction (normalized)
    pub direction: Vec3,
}

impl Ray {
    /// Create a new ray with normalized direction
    #[inline]
    pub fn new(origin: Vec3, direction: Vec3) -> Self {
        Self {
            origin,
            direction: direction.normalize(),
        }
    }

    /// Create a ray from two points
    #[inline]
    pub fn from_points(start: Vec3, end: Vec3) -> Self {
        Self::new(start, end - start)
    }

    /// Get a point at distance t along the ray
    #[inline]
    pub fn at(&self, t: f32) -> Vec3 {
        self.origin + self.direction * t
    }

    /// Get the closest point on the ray to a given point
    pub fn closest_point(&self, point: Vec3) -> Vec3 {
        let t = (point - self.origin).dot(self.direction);
        if t <= 0.0 { self.origin } else { self.at(t) }
    }

    /// Express the ray in the local space of `transform`
    pub fn to_local(&self, transform: &Transform) -> Self {
        Self {
            origin: transform.inverse_transform_point(self.origin),
            direction: transform.rotation.conjugate() * self.direction,
        }
    }

    /// Get the inverse direction (1.0 / direction component)
    #[inline]
    pub fn inverse_direction(&self) -> Vec3 {
        Vec3::new(
            1.0 / self.direction.x,
            1.0 / self.direction.y,
            1.0 / self.direction.z,
        )
    }

    /// Check if the ray direction is valid (non-zero length)
    #[inline]
    pub fn is_valid(&self) -> bool {
        self.direction.length_squared() > 1e-10
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::quaternion::Quat;

    #[test]
    fn test_ray_from_points() {
        let ray = Ray::from_points(Vec3::ZERO, Vec3::new(0.0, 0.0, 5.0));
        assert!((ray.direction.z - 1.0).abs() < 0.001);
        assert!((ray.at(5.0).z - 5.0).abs() < 0.001);
    }

    #[test]
    fn test_ray_closest_point_behind_origin() {
        let ray = Ray::new(Vec3::ZERO, Vec3::Z);
        assert_eq!(ray.closest_point(Vec3::new(1.0, 0.0, -3.0)), Vec3::ZERO);
    }

    #[test]
    fn test_ray_to_local() {
        let t = Transform::new(Vec3::new(0.0, 2.0, 0.0), Quat::from_rotation_y(core::f32::consts::FRAC_PI_2));
        let ray = Ray::new(Vec3::new(0.0, 2.0, 5.0), Vec3::NEG_Z);
        let local = ray.to_local(&t);
        assert!((local.origin - Vec3::new(-5.0, 0.0, 0.0)).length() < 1e-5);
        assert!((local.direction - Vec3::X).length() < 1e-5);
    }
}
