//! Physics queries (raycasting, bounds and point queries)

use impulse_math::{ray_aabb, ray_capsule, ray_convex_planes, ray_sphere_at, Ray, Vec3, AABB};
use impulse_structures::SlotArena;

use crate::body::{BodyHandle, RigidBody};
use crate::layers::CollisionGroups;
use crate::shape::WorldShape;

/// Result of a raycast query
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct RaycastHit {
    /// The body that was hit
    pub body: BodyHandle,
    /// Hit point in world space
    pub point: Vec3,
    /// Surface normal at hit point
    pub normal: Vec3,
    /// Distance from ray origin
    pub distance: f32,
}

/// Options for raycast queries
#[derive(Debug, Clone)]
pub struct RaycastOptions {
    /// Maximum distance for the ray
    pub max_distance: f32,
    /// Report hits on static bodies
    pub include_static: bool,
    /// Collision groups filter
    pub filter: CollisionGroups,
    /// Bodies to exclude
    pub exclude: Vec<BodyHandle>,
}

impl Default for RaycastOptions {
    fn default() -> Self {
        Self {
            max_distance: f32::MAX,
            include_static: true,
            filter: CollisionGroups::ALL,
            exclude: Vec::new(),
        }
    }
}

impl RaycastOptions {
    /// Set maximum distance
    pub fn with_max_distance(mut self, distance: f32) -> Self {
        self.max_distance = distance;
        self
    }

    /// Set whether static bodies are hit
    pub fn with_static(mut self, include_static: bool) -> Self {
        self.include_static = include_static;
        self
    }

    /// Set collision filter
    pub fn with_filter(mut self, filter: CollisionGroups) -> Self {
        self.filter = filter;
        self
    }

    /// Add a body to exclude
    pub fn exclude(mut self, body: BodyHandle) -> Self {
        self.exclude.push(body);
        self
    }

    fn accepts(&self, handle: BodyHandle, body: &RigidBody) -> bool {
        (self.include_static || !body.is_static())
            && self.filter.can_collide(&body.groups())
            && !self.exclude.contains(&handle)
    }
}

/// Exact ray test against one placed shape: distance and outward normal
pub fn ray_shape(ray: &Ray, shape: &WorldShape<'_>) -> Option<(f32, Vec3)> {
    if let Some((center, radius)) = shape.as_sphere() {
        let t = ray_sphere_at(ray, center, radius)?;
        let normal = (ray.at(t) - center).try_normalize(1e-6).unwrap_or(-ray.direction);
        return Some((t, normal));
    }
    if let Some((segment, radius)) = shape.as_capsule() {
        return ray_capsule(ray, segment.start, segment.end, radius);
    }
    ray_convex_planes(ray, &shape.face_planes())
}

/// Read-only query interface over the body store
pub struct PhysicsQuery<'a> {
    pub(crate) bodies: &'a SlotArena<RigidBody>,
}

impl<'a> PhysicsQuery<'a> {
    /// Every hit along the ray, unordered
    fn hits<'o>(
        &'o self,
        ray: &'o Ray,
        options: &'o RaycastOptions,
    ) -> impl Iterator<Item = RaycastHit> + 'o {
        self.bodies.iter().filter_map(move |(key, body)| {
            let handle = BodyHandle(key);
            if !options.accepts(handle, body) {
                return None;
            }
            // Bounds first; the exact test only runs on candidates.
            let entry = ray_aabb(ray, &body.aabb())?;
            if entry > options.max_distance {
                return None;
            }
            let (distance, normal) = ray_shape(ray, &body.world_shape())?;
            (distance <= options.max_distance).then(|| RaycastHit {
                body: handle,
                point: ray.at(distance),
                normal,
                distance,
            })
        })
    }

    /// Cast a ray and get the first hit
    pub fn raycast(&self, ray: &Ray, options: &RaycastOptions) -> Option<RaycastHit> {
        if !ray.is_valid() {
            return None;
        }
        self.hits(ray, options)
            .min_by(|a, b| a.distance.total_cmp(&b.distance))
    }

    /// Cast a ray and get all hits, nearest first
    pub fn raycast_all(&self, ray: &Ray, options: &RaycastOptions) -> Vec<RaycastHit> {
        if !ray.is_valid() {
            return Vec::new();
        }
        let mut hits: Vec<_> = self.hits(ray, options).collect();
        hits.sort_by(|a, b| a.distance.total_cmp(&b.distance));
        hits
    }

    /// Bodies whose bounds overlap `aabb`
    pub fn intersect_aabb(&self, aabb: &AABB) -> Vec<BodyHandle> {
        self.bodies
            .iter()
            .filter(|(_, body)| body.aabb().intersects(aabb))
            .map(|(key, _)| BodyHandle(key))
            .collect()
    }

    /// Bodies whose shape contains `point`
    pub fn intersect_point(&self, point: Vec3) -> Vec<BodyHandle> {
        self.bodies
            .iter()
            .filter(|(_, body)| body.aabb().contains_point(point) && contains_point(&body.world_shape(), point))
            .map(|(key, _)| BodyHandle(key))
            .collect()
    }
}

fn contains_point(shape: &WorldShape<'_>, point: Vec3) -> bool {
    if let Some((center, radius)) = shape.as_sphere() {
        return (point - center).length_squared() <= radius * radius;
    }
    if let Some((segment, radius)) = shape.as_capsule() {
        return (point - segment.closest_point(point)).length_squared() <= radius * radius;
    }
    shape
        .face_planes()
        .iter()
        .all(|plane| plane.signed_distance(point) <= 0.0)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::body::RigidBodyDesc;
    use crate::shape::CollisionShape;
    use approx::assert_relative_eq;
    use std::sync::Arc;

    fn store() -> (SlotArena<RigidBody>, BodyHandle, BodyHandle) {
        let mut bodies = SlotArena::with_capacity(4);
        let ball = RigidBody::from_desc(
            RigidBodyDesc::dynamic(Arc::new(CollisionShape::sphere(1.0).unwrap()))
                .with_position(0.0, 0.0, 5.0),
            0.05,
            1,
        );
        let wall = RigidBody::from_desc(
            RigidBodyDesc::fixed(Arc::new(CollisionShape::cuboid(Vec3::ONE).unwrap()))
                .with_position(0.0, 0.0, 10.0),
            0.05,
            2,
        );
        let ball = BodyHandle(bodies.try_insert(ball).unwrap());
        let wall = BodyHandle(bodies.try_insert(wall).unwrap());
        (bodies, ball, wall)
    }

    #[test]
    fn test_raycast_nearest_hit() {
        let (bodies, ball, wall) = store();
        let query = PhysicsQuery { bodies: &bodies };
        let ray = Ray::new(Vec3::ZERO, Vec3::Z);

        let hit = query.raycast(&ray, &RaycastOptions::default()).unwrap();
        assert_eq!(hit.body, ball);
        assert_relative_eq!(hit.distance, 4.0, epsilon = 1e-4);
        assert_relative_eq!(hit.normal.z, -1.0, epsilon = 1e-4);

        let hit = query
            .raycast(&ray, &RaycastOptions::default().exclude(ball))
            .unwrap();
        assert_eq!(hit.body, wall);
        assert_relative_eq!(hit.distance, 9.0, epsilon = 1e-4);
        assert_eq!(hit.normal, Vec3::NEG_Z);
    }

    #[test]
    fn test_raycast_all_sorted_and_limited() {
        let (bodies, _, _) = store();
        let query = PhysicsQuery { bodies: &bodies };
        let ray = Ray::new(Vec3::ZERO, Vec3::Z);
        let hits = query.raycast_all(&ray, &RaycastOptions::default());
        assert_eq!(hits.len(), 2);
        assert!(hits[0].distance < hits[1].distance);

        let short = RaycastOptions::default().with_max_distance(3.0);
        assert!(query.raycast(&ray, &short).is_none());
        let dynamic_only = RaycastOptions::default().with_static(false).with_max_distance(20.0);
        assert_eq!(query.raycast_all(&ray, &dynamic_only).len(), 1);
    }

    #[test]
    fn test_point_queries() {
        let (bodies, ball, wall) = store();
        let query = PhysicsQuery { bodies: &bodies };
        assert_eq!(query.intersect_point(Vec3::new(0.0, 0.5, 5.0)), vec![ball]);
        assert_eq!(query.intersect_point(Vec3::new(0.9, 0.9, 10.9)), vec![wall]);
        assert!(query.intersect_point(Vec3::new(0.9, 0.9, 5.9)).is_empty());

        let region = AABB::new(Vec3::new(-2.0, -2.0, 3.0), Vec3::new(2.0, 2.0, 9.5));
        assert_eq!(query.intersect_aabb(&region).len(), 2);
    }
}
