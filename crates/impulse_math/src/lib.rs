//! # impulse_math - Math primitives for rigid-body simulation
//!
//! Vectors, rotations, matrices, bounding boxes, rays and the
//! closest-point/intersection helpers used by collision detection.

pub mod vector;
pub mod matrix;
pub mod quaternion;
pub mod transform;
pub mod bounds;
pub mod geometry;
pub mod ray;
pub mod intersect;

pub use vector::*;
pub use matrix::*;
pub use quaternion::*;
pub use transform::*;
pub use bounds::*;
pub use geometry::*;
pub use ray::*;
pub use intersect::*;

/// Common math constants
pub mod consts {
    pub const PI: f32 = core::f32::consts::PI;
    pub const TAU: f32 = PI * 2.0;
    pub const FRAC_PI_2: f32 = PI / 2.0;
    pub const EPSILON: f32 = 1e-6;
}

/// Linear interpolation
#[inline]
pub fn lerp(a: f32, b: f32, t: f32) -> f32 {
    a + (b - a) * t
}

pub mod prelude {
    pub use crate::vector::{Vec3, Vec4};
    pub use crate::matrix::{Mat3, Mat4};
    pub use crate::quaternion::Quat;
    pub use crate::transform::Transform;
    pub use crate::bounds::AABB;
    pub use crate::geometry::{
        Plane, Segment, closest_point_on_segment, closest_points_between_segments,
    };
    pub use crate::ray::Ray;
    pub use crate::intersect::{ray_aabb, ray_capsule, ray_convex_planes, ray_sphere_at};
    pub use crate::lerp;
}
