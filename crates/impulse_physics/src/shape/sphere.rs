//! Sphere shape

use impulse_math::{Vec3, AABB};

use crate::error::{PhysicsError, Result};

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct SphereShape {
    pub radius: f32,
}

impl SphereShape {
    pub fn new(radius: f32) -> Result<Self> {
        if !(radius.is_finite() && radius > 0.0) {
            return Err(PhysicsError::ShapeCreationFailed(format!(
                "sphere radius must be positive, got {}",
                radius
            )));
        }
        Ok(Self { radius })
    }

    /// Principal moments of a solid sphere of the given mass
    pub fn principal_moments(&self, mass: f32) -> Vec3 {
        Vec3::splat(0.4 * mass * self.radius * self.radius)
    }

    pub fn volume(&self) -> f32 {
        4.0 / 3.0 * core::f32::consts::PI * self.radius.powi(3)
    }

    pub fn local_aabb(&self) -> AABB {
        AABB::from_center_half_extents(Vec3::ZERO, Vec3::splat(self.radius))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_sphere_rejects_bad_radius() {
        assert!(SphereShape::new(0.0).is_err());
        assert!(SphereShape::new(f32::NAN).is_err());
        assert!(SphereShape::new(0.5).is_ok());
    }

    #[test]
    fn test_sphere_moments() {
        let sphere = SphereShape::new(1.0).unwrap();
        assert_eq!(sphere.principal_moments(5.0), Vec3::splat(2.0));
    }
}
