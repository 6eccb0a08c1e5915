//! Convex hull with vertex/edge/face adjacency
//!
//! The hull is built incrementally: vertices first, then faces as index
//! loops. Adding a face links it to the edges it is bounded by, creating
//! edges on first sight and attaching the second face when a neighbour
//! reuses them. The incident-polygon query walks this graph: best-aligned
//! face, then across each bounding edge to the neighbour face that supplies
//! the clip plane.

use impulse_math::{Plane, Transform, Vec3, AABB};

use super::polygon::{PlaneSet, Polygon, ReferencePolygon, MAX_POLYGON_POINTS};
use super::push_unique_direction;
use crate::error::{PhysicsError, Result};

#[derive(Debug, Clone)]
pub struct HullVertex {
    pub position: Vec3,
    pub edges: Vec<usize>,
    pub faces: Vec<usize>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct HullEdge {
    pub vertices: [usize; 2],
    /// Faces on either side; the second is `None` until a neighbour is added
    pub faces: [Option<usize>; 2],
}

impl HullEdge {
    /// The face across this edge from `face`
    pub fn other_face(&self, face: usize) -> Option<usize> {
        match self.faces {
            [Some(a), other] if a == face => other,
            [other, Some(b)] if b == face => other,
            _ => None,
        }
    }
}

#[derive(Debug, Clone)]
pub struct HullFace {
    /// Outward unit normal in hull space
    pub normal: Vec3,
    /// Vertex loop, counter-clockwise seen from outside
    pub vertices: Vec<usize>,
    /// `edges[i]` joins `vertices[i]` and `vertices[i + 1]`
    pub edges: Vec<usize>,
}

#[derive(Debug, Clone, Default)]
pub struct Hull {
    vertices: Vec<HullVertex>,
    edges: Vec<HullEdge>,
    faces: Vec<HullFace>,
    face_axes: Vec<Vec3>,
    edge_directions: Vec<Vec3>,
}

impl Hull {
    pub fn new() -> Self {
        Self::default()
    }

    /// Box centered on the origin
    pub fn cuboid(half_extents: Vec3) -> Result<Self> {
        if !(half_extents.x > 0.0 && half_extents.y > 0.0 && half_extents.z > 0.0) {
            return Err(PhysicsError::ShapeCreationFailed(format!(
                "cuboid half extents must be positive, got {:?}",
                half_extents
            )));
        }

        // Bit 0 selects +X, bit 1 +Y, bit 2 +Z.
        let corners: Vec<Vec3> = (0..8)
            .map(|i| {
                let pick = |bit: usize, h: f32| if i & bit != 0 { h } else { -h };
                Vec3::new(
                    pick(1, half_extents.x),
                    pick(2, half_extents.y),
                    pick(4, half_extents.z),
                )
            })
            .collect();

        let faces: [&[usize]; 6] = [
            &[0, 2, 6, 4],
            &[1, 3, 7, 5],
            &[0, 1, 5, 4],
            &[2, 3, 7, 6],
            &[0, 1, 3, 2],
            &[4, 5, 7, 6],
        ];
        Self::from_mesh(&corners, &faces)
    }

    /// Square-based pyramid: base at `-half_extents.y`, apex at `+half_extents.y`
    pub fn pyramid(half_extents: Vec3) -> Result<Self> {
        if !(half_extents.x > 0.0 && half_extents.y > 0.0 && half_extents.z > 0.0) {
            return Err(PhysicsError::ShapeCreationFailed(format!(
                "pyramid half extents must be positive, got {:?}",
                half_extents
            )));
        }

        let (x, y, z) = (half_extents.x, half_extents.y, half_extents.z);
        let points = [
            Vec3::new(-x, -y, -z),
            Vec3::new(x, -y, -z),
            Vec3::new(x, -y, z),
            Vec3::new(-x, -y, z),
            Vec3::new(0.0, y, 0.0),
        ];
        let faces: [&[usize]; 5] = [&[0, 1, 2, 3], &[0, 1, 4], &[1, 2, 4], &[2, 3, 4], &[3, 0, 4]];
        Self::from_mesh(&points, &faces)
    }

    /// Build a hull from a closed convex mesh.
    ///
    /// Face winding is corrected so every normal points away from the
    /// vertex centroid.
    pub fn from_mesh<F: AsRef<[usize]>>(vertices: &[Vec3], faces: &[F]) -> Result<Self> {
        if vertices.len() < 4 || faces.len() < 4 {
            return Err(PhysicsError::ShapeCreationFailed(format!(
                "a closed hull needs at least 4 vertices and 4 faces, got {} and {}",
                vertices.len(),
                faces.len()
            )));
        }

        let mut hull = Self::new();
        for &v in vertices {
            hull.add_vertex(v);
        }
        let centroid = hull.centroid();

        let mut loop_buf: Vec<usize> = Vec::with_capacity(MAX_POLYGON_POINTS);
        for face in faces {
            let face = face.as_ref();
            loop_buf.clear();
            loop_buf.extend_from_slice(face);

            let positions = hull.loop_positions(face)?;
            let normal = newell_normal(&positions);
            let center = positions.iter().fold(Vec3::ZERO, |acc, &p| acc + p) / positions.len() as f32;
            if normal.dot(center - centroid) < 0.0 {
                loop_buf.reverse();
            }
            hull.add_face(&loop_buf)?;
        }

        Ok(hull)
    }

    /// Append a vertex, returning its index
    pub fn add_vertex(&mut self, position: Vec3) -> usize {
        self.vertices.push(HullVertex {
            position,
            edges: Vec::new(),
            faces: Vec::new(),
        });
        self.vertices.len() - 1
    }

    /// Append a face given as a counter-clockwise vertex loop.
    ///
    /// The hull is left untouched when the face is rejected.
    pub fn add_face(&mut self, indices: &[usize]) -> Result<usize> {
        if !(3..=MAX_POLYGON_POINTS).contains(&indices.len()) {
            return Err(PhysicsError::ShapeCreationFailed(format!(
                "hull faces need 3 to {} vertices, got {}",
                MAX_POLYGON_POINTS,
                indices.len()
            )));
        }
        for (i, a) in indices.iter().enumerate() {
            if indices[i + 1..].contains(a) {
                return Err(PhysicsError::ShapeCreationFailed(format!(
                    "hull face repeats vertex {}",
                    a
                )));
            }
        }

        let positions = self.loop_positions(indices)?;
        let normal = newell_normal(&positions).try_normalize(1e-12).ok_or_else(|| {
            PhysicsError::ShapeCreationFailed("hull face is degenerate".to_string())
        })?;

        // Resolve every edge before touching the graph.
        let mut links: Vec<Option<usize>> = Vec::with_capacity(indices.len());
        for i in 0..indices.len() {
            let (a, b) = (indices[i], indices[(i + 1) % indices.len()]);
            match self.find_edge(a, b) {
                Some(edge) if self.edges[edge].faces[1].is_some() => {
                    return Err(PhysicsError::ShapeCreationFailed(format!(
                        "hull edge {}-{} is shared by more than two faces",
                        a, b
                    )));
                }
                found => links.push(found),
            }
        }

        let face_index = self.faces.len();
        let mut face_edges = Vec::with_capacity(indices.len());
        for (i, link) in links.into_iter().enumerate() {
            let (a, b) = (indices[i], indices[(i + 1) % indices.len()]);
            let edge_index = match link {
                Some(edge) => {
                    self.edges[edge].faces[1] = Some(face_index);
                    edge
                }
                None => {
                    let edge = self.edges.len();
                    self.edges.push(HullEdge {
                        vertices: [a, b],
                        faces: [Some(face_index), None],
                    });
                    self.vertices[a].edges.push(edge);
                    self.vertices[b].edges.push(edge);
                    let direction = self.vertices[b].position - self.vertices[a].position;
                    push_unique_direction(&mut self.edge_directions, direction);
                    edge
                }
            };
            face_edges.push(edge_index);
        }

        for &v in indices {
            self.vertices[v].faces.push(face_index);
        }
        push_unique_direction(&mut self.face_axes, normal);
        self.faces.push(HullFace {
            normal,
            vertices: indices.to_vec(),
            edges: face_edges,
        });

        Ok(face_index)
    }

    fn find_edge(&self, a: usize, b: usize) -> Option<usize> {
        self.vertices[a]
            .edges
            .iter()
            .copied()
            .find(|&e| {
                let [x, y] = self.edges[e].vertices;
                (x == a && y == b) || (x == b && y == a)
            })
    }

    fn loop_positions(&self, indices: &[usize]) -> Result<Vec<Vec3>> {
        indices
            .iter()
            .map(|&i| {
                self.vertices.get(i).map(|v| v.position).ok_or_else(|| {
                    PhysicsError::ShapeCreationFailed(format!(
                        "hull face references missing vertex {}",
                        i
                    ))
                })
            })
            .collect()
    }

    pub fn vertices(&self) -> &[HullVertex] {
        &self.vertices
    }

    pub fn edges(&self) -> &[HullEdge] {
        &self.edges
    }

    pub fn faces(&self) -> &[HullFace] {
        &self.faces
    }

    /// Face normals with parallel duplicates removed
    pub fn face_axes(&self) -> &[Vec3] {
        &self.face_axes
    }

    /// Edge directions with parallel duplicates removed
    pub fn edge_directions(&self) -> &[Vec3] {
        &self.edge_directions
    }

    /// Every edge has a face on both sides
    pub fn is_closed(&self) -> bool {
        !self.edges.is_empty() && self.edges.iter().all(|e| e.faces[1].is_some())
    }

    /// Average of the vertex positions
    pub fn centroid(&self) -> Vec3 {
        if self.vertices.is_empty() {
            return Vec3::ZERO;
        }
        let sum = self.vertices.iter().fold(Vec3::ZERO, |acc, v| acc + v.position);
        sum / self.vertices.len() as f32
    }

    pub fn local_aabb(&self) -> AABB {
        self.vertices
            .iter()
            .fold(AABB::EMPTY, |acc, v| acc.expand_to_include(v.position))
    }

    /// Volume by fanning every face to the centroid
    pub fn volume(&self) -> f32 {
        let c = self.centroid();
        let mut volume = 0.0;
        for face in &self.faces {
            let p0 = self.vertices[face.vertices[0]].position - c;
            for pair in face.vertices[1..].windows(2) {
                let p1 = self.vertices[pair[0]].position - c;
                let p2 = self.vertices[pair[1]].position - c;
                volume += p0.dot(p1.cross(p2)).abs() / 6.0;
            }
        }
        volume
    }

    /// Vertices with the smallest and largest projection on a world axis
    pub fn support(&self, transform: &Transform, axis: Vec3) -> (Vec3, Vec3) {
        // Projection order is preserved by a rigid transform, so compare in
        // hull space and transform only the winners.
        let local_axis = transform.rotation.conjugate().rotate(axis);
        let mut min = (f32::MAX, Vec3::ZERO);
        let mut max = (f32::MIN, Vec3::ZERO);
        for v in &self.vertices {
            let d = v.position.dot(local_axis);
            if d < min.0 {
                min = (d, v.position);
            }
            if d > max.0 {
                max = (d, v.position);
            }
        }
        (transform.transform_point(min.1), transform.transform_point(max.1))
    }

    /// Index of the face whose normal best matches a hull-space direction
    pub fn best_face(&self, local_direction: Vec3) -> Option<usize> {
        self.faces
            .iter()
            .enumerate()
            .map(|(i, f)| (i, f.normal.dot(local_direction)))
            .fold(None, |best: Option<(usize, f32)>, (i, d)| match best {
                Some((_, bd)) if bd >= d => best,
                _ => Some((i, d)),
            })
            .map(|(i, _)| i)
    }

    /// Face facing `axis` in world space, with a clip plane per bounding edge
    pub fn reference_polygon(&self, transform: &Transform, axis: Vec3) -> ReferencePolygon {
        let local_axis = transform.rotation.conjugate().rotate(axis);
        let Some(face_index) = self.best_face(local_axis) else {
            return ReferencePolygon::default();
        };
        let face = &self.faces[face_index];
        let normal = transform.rotation.rotate(face.normal);

        // Faces are capped at MAX_POLYGON_POINTS when the hull is built
        let points: Polygon = face
            .vertices
            .iter()
            .take(MAX_POLYGON_POINTS)
            .map(|&v| transform.transform_point(self.vertices[v].position))
            .collect();

        let mut adjacent_planes = PlaneSet::new();
        for (i, &e) in face.edges.iter().enumerate().take(points.len()) {
            let start = points[i];
            let plane_normal = match self.edges[e].other_face(face_index) {
                Some(other) => transform.rotation.rotate(self.faces[other].normal),
                None => {
                    // Open edge: use the plane through the edge perpendicular to the face.
                    let end = points[(i + 1) % points.len()];
                    (end - start).cross(normal).normalize_or_zero()
                }
            };
            let _ = adjacent_planes.push(Plane::from_point_normal(start, plane_normal));
        }

        ReferencePolygon {
            points,
            normal,
            adjacent_planes,
        }
    }

    /// Outward world-space planes of every face
    pub fn face_planes(&self, transform: &Transform) -> Vec<Plane> {
        self.faces
            .iter()
            .map(|f| {
                let normal = transform.rotation.rotate(f.normal);
                let point = transform.transform_point(self.vertices[f.vertices[0]].position);
                Plane::from_point_normal(point, normal)
            })
            .collect()
    }
}

/// Newell's method: robust normal of a possibly non-planar loop
fn newell_normal(points: &[Vec3]) -> Vec3 {
    let mut n = Vec3::ZERO;
    for (i, &cur) in points.iter().enumerate() {
        let next = points[(i + 1) % points.len()];
        n.x += (cur.y - next.y) * (cur.z + next.z);
        n.y += (cur.z - next.z) * (cur.x + next.x);
        n.z += (cur.x - next.x) * (cur.y + next.y);
    }
    n
}
