//! Fixed-capacity buffers used while building contact manifolds
//!
//! Faces and clipped polygons live in `heapless::Vec`s so contact generation
//! never touches the heap. Points past capacity are dropped.

use impulse_math::{Plane, Vec3};

/// Most points a clipped polygon or a face may hold
pub const MAX_POLYGON_POINTS: usize = 8;

/// Up to eight world-space points
pub type Polygon = heapless::Vec<Vec3, MAX_POLYGON_POINTS>;

/// Clip planes bounding a reference face
pub type PlaneSet = heapless::Vec<Plane, MAX_POLYGON_POINTS>;

/// The feature of a shape facing a given direction.
///
/// For polyhedra this is the best-aligned face with one plane per bounding
/// edge taken from the neighbouring face. Round shapes report a single point
/// and no planes; a capsule lying across the direction reports its side as a
/// two-point segment bounded by its end planes.
#[derive(Clone, Debug, Default)]
pub struct ReferencePolygon {
    pub points: Polygon,
    pub normal: Vec3,
    pub adjacent_planes: PlaneSet,
}

impl ReferencePolygon {
    pub fn single_point(point: Vec3, normal: Vec3) -> Self {
        let mut points = Polygon::new();
        let _ = points.push(point);
        Self {
            points,
            normal,
            adjacent_planes: PlaneSet::new(),
        }
    }

    #[inline]
    pub fn is_single_point(&self) -> bool {
        self.points.len() == 1
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_polygon_rejects_points_past_capacity() {
        let mut polygon = Polygon::new();
        for i in 0..MAX_POLYGON_POINTS {
            assert!(polygon.push(Vec3::new(i as f32, 0.0, 0.0)).is_ok());
        }
        assert!(polygon.is_full());
        assert_eq!(polygon.push(Vec3::Y), Err(Vec3::Y));
        assert_eq!(polygon.len(), MAX_POLYGON_POINTS);
        assert_eq!(polygon.last().copied(), Some(Vec3::new(7.0, 0.0, 0.0)));
    }

    #[test]
    fn test_single_point_polygon() {
        let polygon = ReferencePolygon::single_point(Vec3::Y, Vec3::Y);
        assert!(polygon.is_single_point());
        assert_eq!(polygon.points[0], Vec3::Y);
        assert!(polygon.adjacent_planes.is_empty());
    }
}
