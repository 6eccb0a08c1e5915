//! Ray intersection tests
//!
//! Provides ray intersection tests against the primitives the physics
//! queries need:
//! - AABB (slab method)
//! - Sphere
//! - Capsule
//! - Convex polyhedron given as a set of outward planes

use crate::bounds::AABB;
use crate::geometry::{closest_point_on_segment, Plane};
use crate::ray::Ray;
use crate::vector::Vec3;

/// Ray-AABB intersection using the slab method
///
/// Returns the distance along the ray to the intersection point,
/// or None if the ray doesn't intersect the AABB.
pub fn ray_aabb(ray: &Ray, aabb: &AABB) -> Option<f32> {
    let inv_dir = ray.inverse_direction();

    let t1 = (aabb.min.x - ray.origin.x) * inv_dir.x;
    let t2 = (aabb.max.x - ray.origin.x) * inv_dir.x;
    let t3 = (aabb.min.y - ray.origin.y) * inv_dir.y;
    let t4 = (aabb.max.y - ray.origin.y) * inv_dir.y;
    let t5 = (aabb.min.z - ray.origin.z) * inv_dir.z;
    let t6 = (aabb.max.z - ray.origin.z) * inv_dir.z;

    let tmin = t1.min(t2).max(t3.min(t4)).max(t5.min(t6));
    let tmax = t1.max(t2).min(t3.max(t4)).min(t5.max(t6));

    if tmax < 0.0 || tmin > tmax {
        None
    } else {
        Some(if tmin < 0.0 { tmax } else { tmin })
    }
}

/// Ray-Sphere intersection with center and radius
///
/// Returns the nearest non-negative hit distance.
pub fn ray_sphere_at(ray: &Ray, center: Vec3, radius: f32) -> Option<f32> {
    let oc = ray.origin - center;
    let a = ray.direction.dot(ray.direction);
    let b = 2.0 * oc.dot(ray.direction);
    let c = oc.dot(oc) - radius * radius;
    let discriminant = b * b - 4.0 * a * c;

    if discriminant < 0.0 {
        return None;
    }
    let sqrt_d = discriminant.sqrt();
    let t1 = (-b - sqrt_d) / (2.0 * a);
    let t2 = (-b + sqrt_d) / (2.0 * a);

    if t1 >= 0.0 {
        Some(t1)
    } else if t2 >= 0.0 {
        Some(t2)
    } else {
        None
    }
}

/// Ray-Capsule intersection
///
/// Capsule is defined by the segment `a`-`b` and a radius. Returns the
/// nearest hit distance and the outward surface normal there.
pub fn ray_capsule(ray: &Ray, a: Vec3, b: Vec3, radius: f32) -> Option<(f32, Vec3)> {
    let ab = b - a;
    let ab_len_sq = ab.length_squared();

    let mut best: Option<f32> = None;
    let mut consider = |t: Option<f32>| {
        if let Some(t) = t {
            if best.map_or(true, |current| t < current) {
                best = Some(t);
            }
        }
    };

    consider(ray_sphere_at(ray, a, radius));
    consider(ray_sphere_at(ray, b, radius));

    if ab_len_sq > 1e-12 {
        // Infinite cylinder around ab, then bound by the segment.
        let ao = ray.origin - a;
        let m = ab.dot(ray.direction) / ab_len_sq;
        let n = ab.dot(ao) / ab_len_sq;
        let q = ray.direction - ab * m;
        let r = ao - ab * n;

        let qa = q.dot(q);
        let qb = 2.0 * q.dot(r);
        let qc = r.dot(r) - radius * radius;
        let discriminant = qb * qb - 4.0 * qa * qc;

        if qa > 1e-12 && discriminant >= 0.0 {
            let sqrt_d = discriminant.sqrt();
            for t in [(-qb - sqrt_d) / (2.0 * qa), (-qb + sqrt_d) / (2.0 * qa)] {
                let along = m * t + n;
                if t >= 0.0 && (0.0..=1.0).contains(&along) {
                    consider(Some(t));
                    break;
                }
            }
        }
    }

    let t = best?;
    let point = ray.at(t);
    let normal = (point - closest_point_on_segment(point, a, b)).normalize_or_zero();
    Some((t, normal))
}

/// Ray against a convex region bounded by outward-facing planes
///
/// Returns the entry distance and the normal of the entry plane. A ray
/// starting inside reports distance 0 and the negated ray direction.
pub fn ray_convex_planes(ray: &Ray, planes: &[Plane]) -> Option<(f32, Vec3)> {
    let mut t_enter = 0.0f32;
    let mut t_exit = f32::MAX;
    let mut enter_normal = -ray.direction;

    for plane in planes {
        let denom = plane.normal.dot(ray.direction);
        let dist = plane.signed_distance(ray.origin);

        if denom.abs() < 1e-9 {
            // Parallel: outside this plane means no hit at all.
            if dist > 0.0 {
                return None;
            }
            continue;
        }

        let t = -dist / denom;
        if denom < 0.0 {
            if t > t_enter {
                t_enter = t;
                enter_normal = plane.normal;
            }
        } else if t < t_exit {
            t_exit = t;
        }

        if t_enter > t_exit {
            return None;
        }
    }

    Some((t_enter, enter_normal))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn unit_cube_planes() -> Vec<Plane> {
        Vec3::AXES
            .iter()
            .flat_map(|&axis| [Plane::new(axis, 1.0), Plane::new(-axis, 1.0)])
            .collect()
    }

    #[test]
    fn test_ray_aabb_hit() {
        let ray = Ray::new(Vec3::ZERO, Vec3::Z);
        let aabb = AABB::new(Vec3::new(-1.0, -1.0, 5.0), Vec3::new(1.0, 1.0, 7.0));
        assert!((ray_aabb(&ray, &aabb).unwrap() - 5.0).abs() < 0.01);
    }

    #[test]
    fn test_ray_aabb_miss() {
        let ray = Ray::new(Vec3::ZERO, Vec3::X);
        let aabb = AABB::new(Vec3::new(-1.0, -1.0, 5.0), Vec3::new(1.0, 1.0, 7.0));
        assert!(ray_aabb(&ray, &aabb).is_none());
    }

    #[test]
    fn test_ray_sphere() {
        let ray = Ray::new(Vec3::new(0.0, 0.0, -5.0), Vec3::Z);
        assert!((ray_sphere_at(&ray, Vec3::ZERO, 1.0).unwrap() - 4.0).abs() < 1e-5);
        assert!(ray_sphere_at(&ray, Vec3::new(3.0, 0.0, 0.0), 1.0).is_none());
    }

    #[test]
    fn test_ray_capsule_side_and_cap() {
        let a = Vec3::new(0.0, -1.0, 0.0);
        let b = Vec3::new(0.0, 1.0, 0.0);

        let side = Ray::new(Vec3::new(-5.0, 0.5, 0.0), Vec3::X);
        let (t, n) = ray_capsule(&side, a, b, 0.5).unwrap();
        assert!((t - 4.5).abs() < 1e-4);
        assert!((n - Vec3::NEG_X).length() < 1e-4);

        let top = Ray::new(Vec3::new(0.0, 5.0, 0.0), Vec3::NEG_Y);
        let (t, n) = ray_capsule(&top, a, b, 0.5).unwrap();
        assert!((t - 3.5).abs() < 1e-4);
        assert!((n - Vec3::Y).length() < 1e-4);
    }

    #[test]
    fn test_ray_convex_planes() {
        let planes = unit_cube_planes();
        let ray = Ray::new(Vec3::new(0.0, 0.0, -4.0), Vec3::Z);
        let (t, n) = ray_convex_planes(&ray, &planes).unwrap();
        assert!((t - 3.0).abs() < 1e-5);
        assert_eq!(n, Vec3::NEG_Z);

        let miss = Ray::new(Vec3::new(2.0, 0.0, -4.0), Vec3::Z);
        assert!(ray_convex_planes(&miss, &planes).is_none());

        let away = Ray::new(Vec3::new(0.0, 0.0, -4.0), Vec3::NEG_Z);
        assert!(ray_convex_planes(&away, &planes).is_none());
    }
}
