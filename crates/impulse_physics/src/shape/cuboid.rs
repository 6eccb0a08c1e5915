//! Box shape backed by an eight-vertex hull

use std::sync::Arc;

use impulse_math::{Vec3, AABB};

use super::hull::Hull;
use crate::error::Result;

#[derive(Debug, Clone)]
pub struct CuboidShape {
    pub half_extents: Vec3,
    hull: Arc<Hull>,
}

impl CuboidShape {
    pub fn new(half_extents: Vec3) -> Result<Self> {
        Ok(Self {
            half_extents,
            hull: Arc::new(Hull::cuboid(half_extents)?),
        })
    }

    pub fn hull(&self) -> &Hull {
        &self.hull
    }

    /// Principal moments of a solid box of the given mass
    pub fn principal_moments(&self, mass: f32) -> Vec3 {
        let h = self.half_extents;
        let (x2, y2, z2) = (h.x * h.x, h.y * h.y, h.z * h.z);
        Vec3::new(y2 + z2, x2 + z2, x2 + y2) * (mass / 3.0)
    }

    pub fn volume(&self) -> f32 {
        8.0 * self.half_extents.x * self.half_extents.y * self.half_extents.z
    }

    pub fn local_aabb(&self) -> AABB {
        AABB::from_center_half_extents(Vec3::ZERO, self.half_extents)
    }
}
