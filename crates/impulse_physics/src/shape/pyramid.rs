//! Square-based pyramid, apex up

use std::sync::Arc;

use impulse_math::{Vec3, AABB};

use super::hull::Hull;
use crate::error::Result;

/// Base spans `±half_extents.x` by `±half_extents.z` at `y = -half_extents.y`;
/// the apex sits at `y = +half_extents.y`.
#[derive(Debug, Clone)]
pub struct PyramidShape {
    pub half_extents: Vec3,
    hull: Arc<Hull>,
}

impl PyramidShape {
    pub fn new(half_extents: Vec3) -> Result<Self> {
        Ok(Self {
            half_extents,
            hull: Arc::new(Hull::pyramid(half_extents)?),
        })
    }

    pub fn hull(&self) -> &Hull {
        &self.hull
    }

    /// Principal moments about the pyramid's own centroid
    pub fn principal_moments(&self, mass: f32) -> Vec3 {
        let a = 2.0 * self.half_extents.x;
        let b = 2.0 * self.half_extents.z;
        let h = 2.0 * self.half_extents.y;
        Vec3::new(
            mass * (b * b / 20.0 + 3.0 * h * h / 80.0),
            mass * (a * a + b * b) / 20.0,
            mass * (a * a / 20.0 + 3.0 * h * h / 80.0),
        )
    }

    pub fn volume(&self) -> f32 {
        let base = 4.0 * self.half_extents.x * self.half_extents.z;
        base * 2.0 * self.half_extents.y / 3.0
    }

    pub fn local_aabb(&self) -> AABB {
        AABB::from_center_half_extents(Vec3::ZERO, self.half_extents)
    }
}
