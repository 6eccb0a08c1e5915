//! Capsule aligned with the local Y axis

use impulse_math::{Vec3, AABB};

use crate::error::{PhysicsError, Result};

/// Segment from `-half_height` to `+half_height` on Y, swept by `radius`
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct CapsuleShape {
    pub half_height: f32,
    pub radius: f32,
}

impl CapsuleShape {
    pub fn new(half_height: f32, radius: f32) -> Result<Self> {
        if !(radius.is_finite() && radius > 0.0 && half_height.is_finite() && half_height >= 0.0) {
            return Err(PhysicsError::ShapeCreationFailed(format!(
                "capsule needs radius > 0 and half height >= 0, got {} and {}",
                radius, half_height
            )));
        }
        Ok(Self { half_height, radius })
    }

    /// Segment endpoints in shape space
    pub fn local_segment(&self) -> (Vec3, Vec3) {
        (Vec3::new(0.0, -self.half_height, 0.0), Vec3::new(0.0, self.half_height, 0.0))
    }

    /// Cylinder plus two hemispheres, mass split by volume
    pub fn principal_moments(&self, mass: f32) -> Vec3 {
        let r = self.radius;
        let h = self.half_height;
        let cylinder_volume = core::f32::consts::PI * r * r * 2.0 * h;
        let sphere_volume = 4.0 / 3.0 * core::f32::consts::PI * r * r * r;
        let total = cylinder_volume + sphere_volume;
        let mc = mass * cylinder_volume / total;
        let ms = mass * sphere_volume / total;

        let axial = mc * r * r / 2.0 + ms * 0.4 * r * r;
        let side = mc * (r * r / 4.0 + h * h / 3.0) + ms * (0.4 * r * r + h * h + 0.75 * h * r);
        Vec3::new(side, axial, side)
    }

    pub fn volume(&self) -> f32 {
        let r = self.radius;
        core::f32::consts::PI * r * r * (2.0 * self.half_height + 4.0 / 3.0 * r)
    }

    pub fn local_aabb(&self) -> AABB {
        AABB::from_center_half_extents(
            Vec3::ZERO,
            Vec3::new(self.radius, self.half_height + self.radius, self.radius),
        )
    }
}
