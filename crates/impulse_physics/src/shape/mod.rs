//! Collision shapes
//!
//! The shape set is closed, so shapes are an enum rather than trait objects:
//!
//! | Kind    | Geometry                               | SAT features          |
//! |---------|----------------------------------------|-----------------------|
//! | Sphere  | radius                                 | none (round)          |
//! | Cuboid  | half extents + eight-vertex hull       | faces, edges          |
//! | Pyramid | half extents + five-vertex hull        | faces, edges          |
//! | Capsule | Y-aligned segment swept by a radius    | none (round)          |
//! | Hull    | shared convex [`Hull`]                 | faces, edges          |
//!
//! A [`CollisionShape`] carries its geometry plus a transform relative to the
//! owning body. Collision queries run on a [`WorldShape`], which pairs the
//! shape with its resolved world pose for one query.

mod capsule;
mod cuboid;
mod hull;
mod polygon;
mod pyramid;
mod sphere;

pub use capsule::CapsuleShape;
pub use cuboid::CuboidShape;
pub use hull::{Hull, HullEdge, HullFace, HullVertex};
pub use polygon::{PlaneSet, Polygon, ReferencePolygon, MAX_POLYGON_POINTS};
pub use pyramid::PyramidShape;
pub use sphere::SphereShape;

use std::sync::Arc;

use impulse_math::{Mat3, Plane, Segment, Transform, Vec3, AABB};

use crate::error::Result;

/// Directions closer than this (in `1 - |cos|`) count as parallel
pub(crate) const PARALLEL_TOLERANCE: f32 = 1e-4;

/// A capsule this close to perpendicular to a contact normal lies on its side
const CAPSULE_SIDE_TOLERANCE: f32 = 1e-2;

/// Normalize `direction` and append it unless a parallel one is present
pub(crate) fn push_unique_direction(list: &mut Vec<Vec3>, direction: Vec3) -> bool {
    let Some(direction) = direction.try_normalize(1e-6) else {
        return false;
    };
    if list
        .iter()
        .any(|d| d.dot(direction).abs() > 1.0 - PARALLEL_TOLERANCE)
    {
        return false;
    }
    list.push(direction);
    true
}

/// Discriminant used to index the narrowphase dispatch table
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum ShapeKind {
    Sphere = 0,
    Cuboid = 1,
    Pyramid = 2,
    Capsule = 3,
    Hull = 4,
}

impl ShapeKind {
    pub const COUNT: usize = 5;

    pub const ALL: [ShapeKind; Self::COUNT] = [
        ShapeKind::Sphere,
        ShapeKind::Cuboid,
        ShapeKind::Pyramid,
        ShapeKind::Capsule,
        ShapeKind::Hull,
    ];

    #[inline]
    pub fn index(self) -> usize {
        self as usize
    }

    /// Shapes with a face/edge structure
    pub fn is_polyhedral(self) -> bool {
        matches!(self, Self::Cuboid | Self::Pyramid | Self::Hull)
    }
}

#[derive(Debug, Clone)]
pub enum ShapeGeometry {
    Sphere(SphereShape),
    Cuboid(CuboidShape),
    Pyramid(PyramidShape),
    Capsule(CapsuleShape),
    Hull(Arc<Hull>),
}

/// Shape geometry plus its pose relative to the owning body
#[derive(Debug, Clone)]
pub struct CollisionShape {
    geometry: ShapeGeometry,
    local_transform: Transform,
}

impl CollisionShape {
    pub fn new(geometry: ShapeGeometry) -> Self {
        Self {
            geometry,
            local_transform: Transform::IDENTITY,
        }
    }

    pub fn sphere(radius: f32) -> Result<Self> {
        Ok(Self::new(ShapeGeometry::Sphere(SphereShape::new(radius)?)))
    }

    pub fn cuboid(half_extents: Vec3) -> Result<Self> {
        Ok(Self::new(ShapeGeometry::Cuboid(CuboidShape::new(half_extents)?)))
    }

    pub fn pyramid(half_extents: Vec3) -> Result<Self> {
        Ok(Self::new(ShapeGeometry::Pyramid(PyramidShape::new(half_extents)?)))
    }

    pub fn capsule(half_height: f32, radius: f32) -> Result<Self> {
        Ok(Self::new(ShapeGeometry::Capsule(CapsuleShape::new(half_height, radius)?)))
    }

    /// Wrap a hull that may be shared with other shapes
    pub fn hull(hull: Arc<Hull>) -> Self {
        Self::new(ShapeGeometry::Hull(hull))
    }

    /// Build a hull shape from closed convex mesh data
    pub fn convex_mesh<F: AsRef<[usize]>>(vertices: &[Vec3], faces: &[F]) -> Result<Self> {
        Ok(Self::hull(Arc::new(Hull::from_mesh(vertices, faces)?)))
    }

    /// Offset the shape from the body origin
    pub fn with_local_transform(mut self, transform: Transform) -> Self {
        self.local_transform = transform;
        self
    }

    pub fn kind(&self) -> ShapeKind {
        match self.geometry {
            ShapeGeometry::Sphere(_) => ShapeKind::Sphere,
            ShapeGeometry::Cuboid(_) => ShapeKind::Cuboid,
            ShapeGeometry::Pyramid(_) => ShapeKind::Pyramid,
            ShapeGeometry::Capsule(_) => ShapeKind::Capsule,
            ShapeGeometry::Hull(_) => ShapeKind::Hull,
        }
    }

    pub fn geometry(&self) -> &ShapeGeometry {
        &self.geometry
    }

    pub fn local_transform(&self) -> &Transform {
        &self.local_transform
    }

    /// Face/edge graph of polyhedral shapes
    pub fn polyhedron(&self) -> Option<&Hull> {
        match &self.geometry {
            ShapeGeometry::Cuboid(c) => Some(c.hull()),
            ShapeGeometry::Pyramid(p) => Some(p.hull()),
            ShapeGeometry::Hull(h) => Some(h),
            ShapeGeometry::Sphere(_) | ShapeGeometry::Capsule(_) => None,
        }
    }

    pub fn volume(&self) -> f32 {
        match &self.geometry {
            ShapeGeometry::Sphere(s) => s.volume(),
            ShapeGeometry::Cuboid(c) => c.volume(),
            ShapeGeometry::Pyramid(p) => p.volume(),
            ShapeGeometry::Capsule(c) => c.volume(),
            ShapeGeometry::Hull(h) => h.volume(),
        }
    }

    /// Bounds in shape space, before the local transform
    pub fn local_aabb(&self) -> AABB {
        match &self.geometry {
            ShapeGeometry::Sphere(s) => s.local_aabb(),
            ShapeGeometry::Cuboid(c) => c.local_aabb(),
            ShapeGeometry::Pyramid(p) => p.local_aabb(),
            ShapeGeometry::Capsule(c) => c.local_aabb(),
            ShapeGeometry::Hull(h) => h.local_aabb(),
        }
    }

    /// Body-space inverse inertia tensor for a given inverse mass.
    ///
    /// Infinite mass (`inv_mass == 0`) yields the zero tensor. Hulls use
    /// their bounding box as an approximation.
    pub fn build_inverse_inertia(&self, inv_mass: f32) -> Mat3 {
        if inv_mass <= 0.0 {
            return Mat3::ZERO;
        }
        let mass = 1.0 / inv_mass;
        let moments = match &self.geometry {
            ShapeGeometry::Sphere(s) => s.principal_moments(mass),
            ShapeGeometry::Cuboid(c) => c.principal_moments(mass),
            ShapeGeometry::Pyramid(p) => p.principal_moments(mass),
            ShapeGeometry::Capsule(c) => c.principal_moments(mass),
            ShapeGeometry::Hull(h) => {
                let e = h.local_aabb().half_extents();
                let (x2, y2, z2) = (e.x * e.x, e.y * e.y, e.z * e.z);
                Vec3::new(y2 + z2, x2 + z2, x2 + y2) * (mass / 3.0)
            }
        };

        let recip = |m: f32| if m > f32::EPSILON { 1.0 / m } else { 0.0 };
        let inverse = Mat3::from_diagonal(Vec3::new(recip(moments.x), recip(moments.y), recip(moments.z)));
        inverse.rotated(&self.local_transform.rotation.to_mat3())
    }
}

/// A shape resolved to world space for one query
#[derive(Debug, Clone, Copy)]
pub struct WorldShape<'a> {
    pub shape: &'a CollisionShape,
    pub transform: Transform,
}

impl<'a> WorldShape<'a> {
    /// Place `shape` on a body with the given world transform
    pub fn new(shape: &'a CollisionShape, body_transform: &Transform) -> Self {
        Self {
            shape,
            transform: body_transform.combine(&shape.local_transform),
        }
    }

    #[inline]
    pub fn kind(&self) -> ShapeKind {
        self.shape.kind()
    }

    /// World position of the shape origin
    #[inline]
    pub fn center(&self) -> Vec3 {
        self.transform.position
    }

    /// Center and radius of a sphere
    pub fn as_sphere(&self) -> Option<(Vec3, f32)> {
        match &self.shape.geometry {
            ShapeGeometry::Sphere(s) => Some((self.transform.position, s.radius)),
            _ => None,
        }
    }

    /// World segment and radius of a capsule
    pub fn as_capsule(&self) -> Option<(Segment, f32)> {
        match &self.shape.geometry {
            ShapeGeometry::Capsule(c) => {
                let (a, b) = c.local_segment();
                let segment = Segment::new(
                    self.transform.transform_point(a),
                    self.transform.transform_point(b),
                );
                Some((segment, c.radius))
            }
            _ => None,
        }
    }

    pub fn polyhedron(&self) -> Option<&'a Hull> {
        self.shape.polyhedron()
    }

    /// Candidate separating axes: unique world face normals.
    ///
    /// Round shapes have none.
    pub fn collision_axes(&self) -> Vec<Vec3> {
        match self.polyhedron() {
            Some(hull) => hull
                .face_axes()
                .iter()
                .map(|&axis| self.transform.rotation.rotate(axis))
                .collect(),
            None => Vec::new(),
        }
    }

    /// Unique world edge directions, for edge-edge axes
    pub fn edge_directions(&self) -> Vec<Vec3> {
        match self.polyhedron() {
            Some(hull) => hull
                .edge_directions()
                .iter()
                .map(|&dir| self.transform.rotation.rotate(dir))
                .collect(),
            None => Vec::new(),
        }
    }

    /// World-space edges; empty for round shapes
    pub fn edges(&self) -> Vec<Segment> {
        match self.polyhedron() {
            Some(hull) => hull
                .edges()
                .iter()
                .map(|e| {
                    let [a, b] = e.vertices;
                    Segment::new(
                        self.transform.transform_point(hull.vertices()[a].position),
                        self.transform.transform_point(hull.vertices()[b].position),
                    )
                })
                .collect(),
            None => Vec::new(),
        }
    }

    /// Support mapping: extreme points along a unit axis as `(min, max)`
    pub fn min_max_vertex_on_axis(&self, axis: Vec3) -> (Vec3, Vec3) {
        match &self.shape.geometry {
            ShapeGeometry::Sphere(s) => {
                let c = self.transform.position;
                (c - axis * s.radius, c + axis * s.radius)
            }
            ShapeGeometry::Capsule(c) => {
                let (a, b) = c.local_segment();
                let a = self.transform.transform_point(a);
                let b = self.transform.transform_point(b);
                let (lo, hi) = if a.dot(axis) <= b.dot(axis) { (a, b) } else { (b, a) };
                (lo - axis * c.radius, hi + axis * c.radius)
            }
            ShapeGeometry::Cuboid(c) => c.hull().support(&self.transform, axis),
            ShapeGeometry::Pyramid(p) => p.hull().support(&self.transform, axis),
            ShapeGeometry::Hull(h) => h.support(&self.transform, axis),
        }
    }

    /// Projection interval on a unit axis
    #[inline]
    pub fn project(&self, axis: Vec3) -> (f32, f32) {
        let (min, max) = self.min_max_vertex_on_axis(axis);
        (min.dot(axis), max.dot(axis))
    }

    /// Feature of this shape facing along `axis`
    pub fn incident_reference_polygon(&self, axis: Vec3) -> ReferencePolygon {
        match &self.shape.geometry {
            ShapeGeometry::Sphere(s) => {
                ReferencePolygon::single_point(self.transform.position + axis * s.radius, axis)
            }
            ShapeGeometry::Capsule(c) => {
                let (a, b) = c.local_segment();
                let a = self.transform.transform_point(a);
                let b = self.transform.transform_point(b);
                let dir = (b - a).normalize_or_zero();

                if c.half_height > 0.0 && dir.dot(axis).abs() < CAPSULE_SIDE_TOLERANCE {
                    let offset = axis * c.radius;
                    let mut polygon = ReferencePolygon {
                        normal: axis,
                        ..Default::default()
                    };
                    polygon.points.extend([a + offset, b + offset]);
                    polygon
                        .adjacent_planes
                        .extend([Plane::from_point_normal(a, -dir), Plane::from_point_normal(b, dir)]);
                    polygon
                } else {
                    let tip = if a.dot(axis) >= b.dot(axis) { a } else { b };
                    ReferencePolygon::single_point(tip + axis * c.radius, axis)
                }
            }
            ShapeGeometry::Cuboid(c) => c.hull().reference_polygon(&self.transform, axis),
            ShapeGeometry::Pyramid(p) => p.hull().reference_polygon(&self.transform, axis),
            ShapeGeometry::Hull(h) => h.reference_polygon(&self.transform, axis),
        }
    }

    /// Tight world bounds
    pub fn aabb(&self) -> AABB {
        match &self.shape.geometry {
            ShapeGeometry::Sphere(s) => {
                AABB::from_center_half_extents(self.transform.position, Vec3::splat(s.radius))
            }
            ShapeGeometry::Capsule(_) => match self.as_capsule() {
                Some((segment, radius)) => {
                    AABB::from_points(&[segment.start, segment.end]).expand(radius)
                }
                None => AABB::EMPTY,
            },
            ShapeGeometry::Cuboid(_) | ShapeGeometry::Pyramid(_) | ShapeGeometry::Hull(_) => {
                match self.polyhedron() {
                    Some(hull) => hull.vertices().iter().fold(AABB::EMPTY, |acc, v| {
                        acc.expand_to_include(self.transform.transform_point(v.position))
                    }),
                    None => AABB::EMPTY,
                }
            }
        }
    }

    /// Outward world face planes; empty for round shapes
    pub fn face_planes(&self) -> Vec<Plane> {
        self.polyhedron()
            .map(|hull| hull.face_planes(&self.transform))
            .unwrap_or_default()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use impulse_math::Quat;

    #[test]
    fn test_shape_kinds() {
        assert_eq!(CollisionShape::sphere(1.0).unwrap().kind(), ShapeKind::Sphere);
        assert_eq!(CollisionShape::cuboid(Vec3::ONE).unwrap().kind(), ShapeKind::Cuboid);
        assert_eq!(CollisionShape::pyramid(Vec3::ONE).unwrap().kind(), ShapeKind::Pyramid);
        assert_eq!(CollisionShape::capsule(1.0, 0.5).unwrap().kind(), ShapeKind::Capsule);
        for (i, kind) in ShapeKind::ALL.iter().enumerate() {
            assert_eq!(kind.index(), i);
        }
    }

    #[test]
    fn test_round_shapes_have_no_axes() {
        let sphere = CollisionShape::sphere(1.0).unwrap();
        let world = WorldShape::new(&sphere, &Transform::IDENTITY);
        assert!(world.collision_axes().is_empty());
        assert!(world.edges().is_empty());
    }

    #[test]
    fn test_rotated_cuboid_axes() {
        let cuboid = CollisionShape::cuboid(Vec3::ONE).unwrap();
        let transform = Transform::from_rotation(Quat::from_rotation_y(core::f32::consts::FRAC_PI_4));
        let world = WorldShape::new(&cuboid, &transform);

        let axes = world.collision_axes();
        assert_eq!(axes.len(), 3);
        assert!(axes.iter().any(|a| a.y.abs() > 0.999));
        assert_eq!(world.edges().len(), 12);
    }

    #[test]
    fn test_local_transform_offsets_shape() {
        let sphere = CollisionShape::sphere(0.5)
            .unwrap()
            .with_local_transform(Transform::from_position(Vec3::new(0.0, 2.0, 0.0)));
        let world = WorldShape::new(&sphere, &Transform::from_position(Vec3::X));
        assert_eq!(world.center(), Vec3::new(1.0, 2.0, 0.0));
        let aabb = world.aabb();
        assert_eq!(aabb.min, Vec3::new(0.5, 1.5, -0.5));
    }

    #[test]
    fn test_capsule_side_polygon() {
        let capsule = CollisionShape::capsule(1.0, 0.5).unwrap();
        let lying = Transform::from_rotation(Quat::from_rotation_z(core::f32::consts::FRAC_PI_2));
        let world = WorldShape::new(&capsule, &lying);

        let side = world.incident_reference_polygon(Vec3::NEG_Y);
        assert_eq!(side.points.len(), 2);
        assert_eq!(side.adjacent_planes.len(), 2);
        for p in &side.points {
            assert!((p.y + 0.5).abs() < 1e-5);
        }

        let standing = WorldShape::new(&capsule, &Transform::IDENTITY);
        let tip = standing.incident_reference_polygon(Vec3::NEG_Y);
        assert!(tip.is_single_point());
        assert!((tip.points[0].y + 1.5).abs() < 1e-5);
    }

    #[test]
    fn test_inverse_inertia_of_static_shape_is_zero() {
        let cuboid = CollisionShape::cuboid(Vec3::ONE).unwrap();
        assert_eq!(cuboid.build_inverse_inertia(0.0), Mat3::ZERO);
        let inv = cuboid.build_inverse_inertia(1.0);
        // m/3 * (1 + 1) = 2/3
        assert!((inv * Vec3::X - Vec3::X * 1.5).length() < 1e-5);
    }

    #[test]
    fn test_support_of_sphere_and_capsule() {
        let sphere = CollisionShape::sphere(2.0).unwrap();
        let world = WorldShape::new(&sphere, &Transform::from_position(Vec3::Y));
        assert_eq!(world.project(Vec3::Y), (-1.0, 3.0));

        let capsule = CollisionShape::capsule(1.0, 0.5).unwrap();
        let world = WorldShape::new(&capsule, &Transform::IDENTITY);
        assert_eq!(world.project(Vec3::Y), (-1.5, 1.5));
        assert_eq!(world.project(Vec3::X), (-0.5, 0.5));
    }
}
