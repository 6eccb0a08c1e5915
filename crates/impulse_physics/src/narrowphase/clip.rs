//! Contact generation by reference-face clipping

use impulse_math::{Plane, Vec3};

use crate::shape::{Polygon, WorldShape, MAX_POLYGON_POINTS};

use super::sat::CollisionData;

/// Points this far in front of the reference face still count as touching
pub const CONTACT_TOLERANCE: f32 = 1e-4;

/// One clipped contact: world point and signed depth
#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct ClippedContact {
    pub point: Vec3,
    pub penetration: f32,
}

pub type ClippedContacts = heapless::Vec<ClippedContact, MAX_POLYGON_POINTS>;

/// Clip a polygon against a plane, keeping the part behind it.
///
/// Two-point polygons are treated as a segment. A convex polygon at capacity
/// can gain one point per clip; the overflow is dropped.
pub fn clip_polygon(polygon: &Polygon, plane: &Plane) -> Polygon {
    let points = polygon.as_slice();
    match points.len() {
        0 => Polygon::new(),
        1 => {
            if plane.signed_distance(points[0]) <= 0.0 {
                polygon.clone()
            } else {
                Polygon::new()
            }
        }
        2 => clip_segment(points[0], points[1], plane),
        n => {
            let mut out = Polygon::new();
            for i in 0..n {
                let current = points[i];
                let next = points[(i + 1) % n];
                let dc = plane.signed_distance(current);
                let dn = plane.signed_distance(next);
                if dc <= 0.0 {
                    let _ = out.push(current);
                }
                if (dc < 0.0 && dn > 0.0) || (dc > 0.0 && dn < 0.0) {
                    let _ = out.push(current.lerp(next, dc / (dc - dn)));
                }
            }
            out
        }
    }
}

fn clip_segment(a: Vec3, b: Vec3, plane: &Plane) -> Polygon {
    let da = plane.signed_distance(a);
    let db = plane.signed_distance(b);
    let kept = match (da <= 0.0, db <= 0.0) {
        (true, true) => [a, b],
        (false, false) => return Polygon::new(),
        (true, false) => [a, a.lerp(b, da / (da - db))],
        (false, true) => [a.lerp(b, da / (da - db)), b],
    };
    kept.into_iter().collect()
}

/// Build the contact set for a colliding pair.
///
/// Picks the feature of each shape facing the other. A single-point feature
/// produces one contact offset by half the depth; otherwise the feature whose
/// face is more nearly aligned with the normal becomes the reference, the
/// other is clipped against its side planes, and every surviving point that
/// reaches the reference shape along the collision normal becomes a contact.
/// Depths are measured along `data.normal` from the reference shape's
/// extreme point, so they agree with the separating-axis depth even when the
/// reference face is tilted. If clipping removes everything the
/// representative point from `data` is used.
pub fn generate_contacts(
    a: &WorldShape<'_>,
    b: &WorldShape<'_>,
    data: &CollisionData,
) -> ClippedContacts {
    let n = data.normal;
    let mut contacts = ClippedContacts::new();

    let poly_a = a.incident_reference_polygon(n);
    let poly_b = b.incident_reference_polygon(-n);

    let single = if poly_a.is_single_point() {
        Some(poly_a.points[0] + n * (data.penetration * 0.5))
    } else if poly_b.is_single_point() {
        Some(poly_b.points[0] - n * (data.penetration * 0.5))
    } else {
        None
    };
    if let Some(point) = single {
        let _ = contacts.push(ClippedContact {
            point,
            penetration: data.penetration,
        });
        return contacts;
    }

    // Outward axis of the reference shape and its extent along it
    let (reference, incident, axis, extent) = if poly_a.normal.dot(n) >= poly_b.normal.dot(-n) {
        (&poly_a, &poly_b, n, a.project(n).1)
    } else {
        (&poly_b, &poly_a, -n, b.project(-n).1)
    };

    let mut clipped = incident.points.clone();
    for plane in &reference.adjacent_planes {
        clipped = clip_polygon(&clipped, plane);
        if clipped.is_empty() {
            break;
        }
    }

    for &point in &clipped {
        let distance = point.dot(axis) - extent;
        if distance <= CONTACT_TOLERANCE {
            let penetration = distance.min(0.0);
            let _ = contacts.push(ClippedContact {
                point: point - axis * (penetration * 0.5),
                penetration,
            });
        }
    }

    if contacts.is_empty() {
        let _ = contacts.push(ClippedContact {
            point: data.point,
            penetration: data.penetration,
        });
    }
    contacts
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::narrowphase::sat::{polyhedron_polyhedron, sphere_polyhedron};
    use crate::shape::CollisionShape;
    use approx::assert_relative_eq;
    use impulse_math::{Quat, Transform};

    fn at(shape: &CollisionShape, x: f32, y: f32, z: f32) -> WorldShape<'_> {
        WorldShape::new(shape, &Transform::new(Vec3::new(x, y, z), Quat::IDENTITY))
    }

    #[test]
    fn test_clip_square_against_plane() {
        let square = Polygon::from_slice(&[
            Vec3::new(-1.0, 0.0, -1.0),
            Vec3::new(1.0, 0.0, -1.0),
            Vec3::new(1.0, 0.0, 1.0),
            Vec3::new(-1.0, 0.0, 1.0),
        ])
        .unwrap();
        let plane = Plane::new(Vec3::X, 0.0);
        let clipped = clip_polygon(&square, &plane);
        assert_eq!(clipped.len(), 4);
        assert!(clipped.iter().all(|p| p.x <= 1e-6));
    }

    #[test]
    fn test_clip_segment_partially() {
        let segment = Polygon::from_slice(&[Vec3::new(-1.0, 0.0, 0.0), Vec3::new(3.0, 0.0, 0.0)]).unwrap();
        let clipped = clip_polygon(&segment, &Plane::new(Vec3::X, 1.0));
        assert_eq!(clipped.len(), 2);
        assert_relative_eq!(clipped[1].x, 1.0, epsilon = 1e-6);
    }

    #[test]
    fn test_stacked_boxes_give_four_contacts() {
        let c = CollisionShape::cuboid(Vec3::ONE).unwrap();
        let lower = at(&c, 0.0, 0.0, 0.0);
        let upper = at(&c, 0.0, 1.95, 0.0);
        let data = polyhedron_polyhedron(&lower, &upper).unwrap();
        let contacts = generate_contacts(&lower, &upper, &data);
        assert_eq!(contacts.len(), 4);
        for c in &contacts {
            assert_relative_eq!(c.penetration, -0.05, epsilon = 1e-4);
        }
    }

    #[test]
    fn test_smaller_box_clipped_to_its_footprint() {
        let big = CollisionShape::cuboid(Vec3::new(5.0, 1.0, 5.0)).unwrap();
        let small = CollisionShape::cuboid(Vec3::splat(0.5)).unwrap();
        let floor = at(&big, 0.0, 0.0, 0.0);
        let crate_shape = at(&small, 1.0, 1.49, 1.0);
        let data = polyhedron_polyhedron(&floor, &crate_shape).unwrap();
        let contacts = generate_contacts(&floor, &crate_shape, &data);
        assert_eq!(contacts.len(), 4);
        for c in &contacts {
            assert!((c.point.x - 1.0).abs() <= 0.5 + 1e-4);
            assert!((c.point.z - 1.0).abs() <= 0.5 + 1e-4);
        }
    }

    #[test]
    fn test_sphere_yields_single_contact() {
        let c = CollisionShape::cuboid(Vec3::ONE).unwrap();
        let s = CollisionShape::sphere(1.0).unwrap();
        let ball = at(&s, 0.0, 1.9, 0.0);
        let floor = at(&c, 0.0, 0.0, 0.0);
        let data = sphere_polyhedron(&ball, &floor).unwrap();
        let contacts = generate_contacts(&ball, &floor, &data);
        assert_eq!(contacts.len(), 1);
        assert_relative_eq!(contacts[0].point.y, 0.95, epsilon = 1e-4);
    }

    #[test]
    fn test_crossed_edges_report_separating_axis_depth() {
        let c = CollisionShape::cuboid(Vec3::ONE).unwrap();
        let sqrt2 = std::f32::consts::SQRT_2;
        let quarter = std::f32::consts::FRAC_PI_4;
        let lower = WorldShape::new(&c, &Transform::new(Vec3::ZERO, Quat::from_rotation_z(quarter)));
        let upper = WorldShape::new(
            &c,
            &Transform::new(Vec3::new(0.0, 2.0 * sqrt2 - 0.1, 0.0), Quat::from_rotation_x(quarter)),
        );

        let data = polyhedron_polyhedron(&lower, &upper).unwrap();
        assert!(data.normal.y.abs() > 0.999, "normal {:?}", data.normal);
        assert_relative_eq!(data.penetration, -0.1, epsilon = 1e-3);

        let contacts = generate_contacts(&lower, &upper, &data);
        assert!(!contacts.is_empty());
        for contact in &contacts {
            assert_relative_eq!(contact.penetration, data.penetration, epsilon = 1e-3);
        }
    }
}
