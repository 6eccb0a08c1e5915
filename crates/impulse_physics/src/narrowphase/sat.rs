//! Separating-axis collision routines
//!
//! Every routine takes shape A then shape B and reports the contact normal
//! pointing from A towards B. Penetration is negative while the shapes
//! overlap and zero when they just touch; any positive gap is no collision.

use impulse_math::{closest_point_on_segment, closest_points_between_segments, Segment, Vec3};

use crate::shape::{push_unique_direction, ShapeKind, WorldShape, PARALLEL_TOLERANCE};

/// Edge-edge cross products shorter than this are too unstable to test
const MIN_CROSS_LENGTH_SQ: f32 = 1e-6;

/// Center distances below this give no usable direction
const DEGENERATE_DISTANCE: f32 = 1e-6;

/// Result of one narrowphase test
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct CollisionData {
    /// Unit normal from A to B
    pub normal: Vec3,
    /// Signed depth, `<= 0` when colliding
    pub penetration: f32,
    /// Representative point between the two surfaces
    pub point: Vec3,
}

impl CollisionData {
    /// Same contact seen from the other body
    #[inline]
    pub fn flipped(self) -> Self {
        Self {
            normal: -self.normal,
            ..self
        }
    }
}

/// Signature shared by every dispatch-table entry
pub type CollisionFn = fn(&WorldShape<'_>, &WorldShape<'_>) -> Option<CollisionData>;

/// Row = kind of A, column = kind of B.
///
/// Entries below the diagonal reuse the routine above it and flip the
/// result.
pub type DispatchTable = [[Option<CollisionFn>; ShapeKind::COUNT]; ShapeKind::COUNT];

pub const DEFAULT_DISPATCH: DispatchTable = {
    let sphere: [Option<CollisionFn>; ShapeKind::COUNT] = [
        Some(sphere_sphere as CollisionFn),
        Some(sphere_polyhedron as CollisionFn),
        Some(sphere_polyhedron as CollisionFn),
        Some(sphere_capsule as CollisionFn),
        Some(sphere_polyhedron as CollisionFn),
    ];
    let polyhedron: [Option<CollisionFn>; ShapeKind::COUNT] = [
        Some(polyhedron_sphere as CollisionFn),
        Some(polyhedron_polyhedron as CollisionFn),
        Some(polyhedron_polyhedron as CollisionFn),
        Some(polyhedron_capsule as CollisionFn),
        Some(polyhedron_polyhedron as CollisionFn),
    ];
    let capsule: [Option<CollisionFn>; ShapeKind::COUNT] = [
        Some(capsule_sphere as CollisionFn),
        Some(capsule_polyhedron as CollisionFn),
        Some(capsule_polyhedron as CollisionFn),
        Some(capsule_capsule as CollisionFn),
        Some(capsule_polyhedron as CollisionFn),
    ];
    [sphere, polyhedron, polyhedron, capsule, polyhedron]
};

/// Running minimum-overlap search across candidate axes
struct AxisSearch {
    normal: Vec3,
    penetration: f32,
    found: bool,
}

impl AxisSearch {
    fn new() -> Self {
        Self {
            normal: Vec3::Y,
            penetration: f32::NEG_INFINITY,
            found: false,
        }
    }

    /// Project both shapes on `axis`; `false` means the axis separates them
    fn test(&mut self, a: &WorldShape<'_>, b: &WorldShape<'_>, axis: Vec3) -> bool {
        let (min_a, max_a) = a.project(axis);
        let (min_b, max_b) = b.project(axis);
        let forward = max_a - min_b;
        let backward = max_b - min_a;
        if forward < 0.0 || backward < 0.0 {
            return false;
        }

        let (penetration, normal) = if forward <= backward {
            (-forward, axis)
        } else {
            (-backward, -axis)
        };
        if penetration > self.penetration {
            self.penetration = penetration;
            self.normal = normal;
            self.found = true;
        }
        true
    }

    fn run(a: &WorldShape<'_>, b: &WorldShape<'_>, axes: &[Vec3]) -> Option<CollisionData> {
        let mut search = Self::new();
        for &axis in axes {
            if !search.test(a, b, axis) {
                return None;
            }
        }
        search.finish(a, b)
    }

    /// Contact point halfway between A's deepest point along the normal
    /// and B's deepest point against it
    fn finish(self, a: &WorldShape<'_>, b: &WorldShape<'_>) -> Option<CollisionData> {
        if !self.found {
            return None;
        }
        let (_, deepest_a) = a.min_max_vertex_on_axis(self.normal);
        let (deepest_b, _) = b.min_max_vertex_on_axis(self.normal);
        Some(CollisionData {
            normal: self.normal,
            penetration: self.penetration,
            point: (deepest_a + deepest_b) * 0.5,
        })
    }
}

/// Contact between two round features: points `pa`/`pb` inflated by radii
fn round_contact(pa: Vec3, ra: f32, pb: Vec3, rb: f32, fallback: Vec3) -> Option<CollisionData> {
    let delta = pb - pa;
    let distance = delta.length();
    if distance > ra + rb {
        return None;
    }
    let normal = if distance > DEGENERATE_DISTANCE {
        delta / distance
    } else {
        fallback
    };
    let penetration = distance - (ra + rb);
    Some(CollisionData {
        normal,
        penetration,
        point: pa + normal * (ra + penetration * 0.5),
    })
}

/// Some direction perpendicular to a capsule axis
fn side_direction(segment: &Segment) -> Vec3 {
    match segment.direction().try_normalize(DEGENERATE_DISTANCE) {
        Some(dir) => dir.any_orthonormal(),
        None => Vec3::Y,
    }
}

// ==================== Round Shapes ====================

pub fn sphere_sphere(a: &WorldShape<'_>, b: &WorldShape<'_>) -> Option<CollisionData> {
    let (ca, ra) = a.as_sphere()?;
    let (cb, rb) = b.as_sphere()?;
    round_contact(ca, ra, cb, rb, Vec3::Y)
}

pub fn capsule_sphere(a: &WorldShape<'_>, b: &WorldShape<'_>) -> Option<CollisionData> {
    let (segment, ra) = a.as_capsule()?;
    let (center, rb) = b.as_sphere()?;
    let closest = segment.closest_point(center);
    round_contact(closest, ra, center, rb, side_direction(&segment))
}

pub fn sphere_capsule(a: &WorldShape<'_>, b: &WorldShape<'_>) -> Option<CollisionData> {
    capsule_sphere(b, a).map(CollisionData::flipped)
}

pub fn capsule_capsule(a: &WorldShape<'_>, b: &WorldShape<'_>) -> Option<CollisionData> {
    let (p, ra) = a.as_capsule()?;
    let (q, rb) = b.as_capsule()?;

    // Parallel axes have a whole interval of closest points; use the middle
    // of the overlap so the contact sits under both capsules.
    if let (Some(dir_p), Some(dir_q)) = (
        p.direction().try_normalize(DEGENERATE_DISTANCE),
        q.direction().try_normalize(DEGENERATE_DISTANCE),
    ) {
        if dir_p.dot(dir_q).abs() > 1.0 - PARALLEL_TOLERANCE {
            let t0 = (q.start - p.start).dot(dir_p);
            let t1 = (q.end - p.start).dot(dir_p);
            let lo = t0.min(t1).max(0.0);
            let hi = t0.max(t1).min(p.length());
            if lo <= hi {
                let pa = p.start + dir_p * ((lo + hi) * 0.5);
                let pb = q.closest_point(pa);
                return round_contact(pa, ra, pb, rb, dir_p.any_orthonormal());
            }
        }
    }

    let (pa, pb) = closest_points_between_segments(&p, &q);
    round_contact(pa, ra, pb, rb, side_direction(&p))
}

// ==================== Polyhedra ====================

pub fn polyhedron_polyhedron(a: &WorldShape<'_>, b: &WorldShape<'_>) -> Option<CollisionData> {
    let mut axes = Vec::with_capacity(16);
    for axis in a.collision_axes().into_iter().chain(b.collision_axes()) {
        push_unique_direction(&mut axes, axis);
    }

    let edges_a = a.edge_directions();
    let edges_b = b.edge_directions();
    for da in &edges_a {
        for db in &edges_b {
            let cross = da.cross(*db);
            if cross.length_squared() > MIN_CROSS_LENGTH_SQ {
                push_unique_direction(&mut axes, cross);
            }
        }
    }

    AxisSearch::run(a, b, &axes)
}

pub fn polyhedron_sphere(a: &WorldShape<'_>, b: &WorldShape<'_>) -> Option<CollisionData> {
    let (center, _) = b.as_sphere()?;
    let mut axes = Vec::with_capacity(8);
    for axis in a.collision_axes() {
        push_unique_direction(&mut axes, axis);
    }

    // Direction to the closest point on any edge covers the edge and
    // vertex regions.
    let closest = a
        .edges()
        .iter()
        .map(|edge| edge.closest_point(center))
        .min_by(|x, y| {
            (*x - center)
                .length_squared()
                .total_cmp(&(*y - center).length_squared())
        });
    if let Some(closest) = closest {
        push_unique_direction(&mut axes, center - closest);
    }

    AxisSearch::run(a, b, &axes)
}

pub fn sphere_polyhedron(a: &WorldShape<'_>, b: &WorldShape<'_>) -> Option<CollisionData> {
    polyhedron_sphere(b, a).map(CollisionData::flipped)
}

pub fn polyhedron_capsule(a: &WorldShape<'_>, b: &WorldShape<'_>) -> Option<CollisionData> {
    let (segment, _) = b.as_capsule()?;
    let mut axes = Vec::with_capacity(16);
    for axis in a.collision_axes() {
        push_unique_direction(&mut axes, axis);
    }

    if let Some(dir) = segment.direction().try_normalize(DEGENERATE_DISTANCE) {
        for edge_dir in a.edge_directions() {
            let cross = dir.cross(edge_dir);
            if cross.length_squared() > MIN_CROSS_LENGTH_SQ {
                push_unique_direction(&mut axes, cross);
            }
        }
    }

    let closest = a
        .edges()
        .iter()
        .map(|edge| {
            let (on_capsule, on_edge) = closest_points_between_segments(&segment, edge);
            (on_capsule, on_edge)
        })
        .min_by(|(c0, e0), (c1, e1)| {
            (*c0 - *e0)
                .length_squared()
                .total_cmp(&(*c1 - *e1).length_squared())
        });
    if let Some((on_capsule, on_edge)) = closest {
        push_unique_direction(&mut axes, on_capsule - on_edge);
    }

    // Capsule end caps against vertices
    for end in [segment.start, segment.end] {
        let nearest = a
            .edges()
            .iter()
            .map(|edge| closest_point_on_segment(end, edge.start, edge.end))
            .min_by(|x, y| (*x - end).length_squared().total_cmp(&(*y - end).length_squared()));
        if let Some(nearest) = nearest {
            push_unique_direction(&mut axes, end - nearest);
        }
    }

    AxisSearch::run(a, b, &axes)
}

pub fn capsule_polyhedron(a: &WorldShape<'_>, b: &WorldShape<'_>) -> Option<CollisionData> {
    polyhedron_capsule(b, a).map(CollisionData::flipped)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::shape::CollisionShape;
    use approx::assert_relative_eq;
    use impulse_math::{Quat, Transform};

    fn at(shape: &CollisionShape, x: f32, y: f32, z: f32) -> WorldShape<'_> {
        WorldShape::new(shape, &Transform::new(Vec3::new(x, y, z), Quat::IDENTITY))
    }

    #[test]
    fn test_sphere_sphere_overlap() {
        let s = CollisionShape::sphere(1.0).unwrap();
        let hit = sphere_sphere(&at(&s, 0.0, 0.0, 0.0), &at(&s, 1.5, 0.0, 0.0)).unwrap();
        assert_relative_eq!(hit.penetration, -0.5, epsilon = 1e-5);
        assert_relative_eq!(hit.normal.x, 1.0, epsilon = 1e-5);
        assert_relative_eq!(hit.point.x, 0.75, epsilon = 1e-5);
    }

    #[test]
    fn test_sphere_sphere_separated_and_touching() {
        let s = CollisionShape::sphere(1.0).unwrap();
        assert!(sphere_sphere(&at(&s, 0.0, 0.0, 0.0), &at(&s, 2.5, 0.0, 0.0)).is_none());
        let touch = sphere_sphere(&at(&s, 0.0, 0.0, 0.0), &at(&s, 0.0, 2.0, 0.0)).unwrap();
        assert_relative_eq!(touch.penetration, 0.0, epsilon = 1e-6);
    }

    #[test]
    fn test_concentric_spheres_use_fallback_normal() {
        let s = CollisionShape::sphere(1.0).unwrap();
        let hit = sphere_sphere(&at(&s, 0.0, 0.0, 0.0), &at(&s, 0.0, 0.0, 0.0)).unwrap();
        assert_eq!(hit.normal, Vec3::Y);
        assert_relative_eq!(hit.penetration, -2.0, epsilon = 1e-6);
    }

    #[test]
    fn test_box_box_face_contact() {
        let c = CollisionShape::cuboid(Vec3::ONE).unwrap();
        let hit = polyhedron_polyhedron(&at(&c, 0.0, 0.0, 0.0), &at(&c, 0.0, 1.9, 0.0)).unwrap();
        assert_relative_eq!(hit.penetration, -0.1, epsilon = 1e-5);
        assert_relative_eq!(hit.normal.y, 1.0, epsilon = 1e-5);
        assert!(polyhedron_polyhedron(&at(&c, 0.0, 0.0, 0.0), &at(&c, 0.0, 2.1, 0.0)).is_none());
    }

    #[test]
    fn test_box_sphere_corner_region() {
        let c = CollisionShape::cuboid(Vec3::ONE).unwrap();
        let s = CollisionShape::sphere(0.5).unwrap();
        // Near the (1,1,1) corner but outside the sphere's reach along the diagonal
        assert!(polyhedron_sphere(&at(&c, 0.0, 0.0, 0.0), &at(&s, 1.4, 1.4, 1.4)).is_none());
        let hit = polyhedron_sphere(&at(&c, 0.0, 0.0, 0.0), &at(&s, 1.2, 1.2, 1.2)).unwrap();
        assert!(hit.penetration <= 0.0);
        assert!(hit.normal.dot(Vec3::ONE) > 0.0);
    }

    #[test]
    fn test_capsule_capsule_parallel_uses_overlap_midpoint() {
        let cap = CollisionShape::capsule(1.0, 0.5).unwrap();
        let hit = capsule_capsule(&at(&cap, 0.0, 0.0, 0.0), &at(&cap, 0.9, 1.0, 0.0)).unwrap();
        assert_relative_eq!(hit.normal.x, 1.0, epsilon = 1e-5);
        assert_relative_eq!(hit.penetration, -0.1, epsilon = 1e-5);
        assert_relative_eq!(hit.point.y, 0.5, epsilon = 1e-5);
    }

    #[test]
    fn test_swapped_routine_negates_normal() {
        let c = CollisionShape::cuboid(Vec3::ONE).unwrap();
        let s = CollisionShape::sphere(0.5).unwrap();
        let box_shape = at(&c, 0.0, 0.0, 0.0);
        let ball = at(&s, 0.0, 1.3, 0.0);
        let ab = polyhedron_sphere(&box_shape, &ball).unwrap();
        let ba = sphere_polyhedron(&ball, &box_shape).unwrap();
        assert_eq!(ab.normal, -ba.normal);
        assert_eq!(ab.penetration, ba.penetration);
    }
}
