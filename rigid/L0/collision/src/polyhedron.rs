//! Convex polyhedra.
//!
//! A [`CompiledPolyhedron`] is built once from a vertex list and a list of
//! counter-clockwise faces. Construction derives everything the narrow phase
//! needs to walk the hull without scanning it: vertex adjacency, the unique
//! edge list, face normals, and the set of distinct edge directions used as
//! separating-axis candidates.
//!
//! A [`PolyhedronPart`] shares a compiled hull through an [`Arc`] and caches
//! its world-space vertices, normals and edge directions.

use std::sync::Arc;

use nalgebra::{Point3, Vector3};
use smallvec::SmallVec;

use rigid_types::math::{float_equals, is_triangle_ccw, EPSILON};
use rigid_types::{
    AlignedBox, Feature, FeatureKind, MassProperties, PhysicsError, Plane, Result, Segment,
    Transform,
};

/// A convex hull in body space with precomputed adjacency.
#[derive(Debug, Clone)]
pub struct CompiledPolyhedron {
    vertices: Vec<Point3<f64>>,
    faces: Vec<Vec<usize>>,
    neighbors: Vec<Vec<usize>>,
    edges: Vec<[usize; 2]>,
    edge_vectors: Vec<Vector3<f64>>,
    face_normals: Vec<Vector3<f64>>,
}

impl CompiledPolyhedron {
    /// Compile a hull from its vertices and faces.
    ///
    /// Every face lists at least three vertex indices in counter-clockwise
    /// order seen from outside.
    pub fn new(vertices: Vec<Point3<f64>>, faces: Vec<Vec<usize>>) -> Result<Self> {
        if vertices.len() < 4 {
            return Err(PhysicsError::invalid_geometry(format!(
                "a polyhedron needs at least 4 vertices, got {}",
                vertices.len()
            )));
        }
        for (i, face) in faces.iter().enumerate() {
            if face.len() < 3 {
                return Err(PhysicsError::invalid_geometry(format!(
                    "face {i} has {} vertices, at least 3 are required",
                    face.len()
                )));
            }
            if let Some(&bad) = face.iter().find(|&&v| v >= vertices.len()) {
                return Err(PhysicsError::invalid_geometry(format!(
                    "face {i} references vertex {bad} of {}",
                    vertices.len()
                )));
            }
        }

        let mut neighbors = vec![Vec::new(); vertices.len()];
        let mut edges = Vec::new();
        let mut edge_vectors: Vec<Vector3<f64>> = Vec::new();
        let mut face_normals = Vec::with_capacity(faces.len());

        for face in &faces {
            let v1 = vertices[face[0]];
            let normal = (vertices[face[1]] - v1).cross(&(vertices[face[2]] - v1));
            face_normals.push(rigid_types::math::normalize_or_zero(&normal));

            for (j, &a) in face.iter().enumerate() {
                let b = face[(j + 1) % face.len()];
                if let Some(dir) = (vertices[b] - vertices[a]).try_normalize(EPSILON) {
                    let is_unique = edge_vectors
                        .iter()
                        .all(|ev| (ev.dot(&dir).abs() - 1.0).abs() >= EPSILON);
                    if is_unique {
                        edge_vectors.push(dir);
                    }
                }
                if !neighbors[a].contains(&b) {
                    edges.push([a, b]);
                    neighbors[a].push(b);
                    neighbors[b].push(a);
                }
            }
        }

        Ok(Self {
            vertices,
            faces,
            neighbors,
            edges,
            edge_vectors,
            face_normals,
        })
    }

    /// An axis-aligned box centered on the origin.
    pub fn cuboid(dimensions: Vector3<f64>) -> Result<Self> {
        if dimensions.iter().any(|d| !d.is_finite() || *d <= 0.0) {
            return Err(PhysicsError::invalid_geometry(
                "box dimensions must be positive and finite",
            ));
        }
        let h = dimensions * 0.5;
        let vertices = (0..8)
            .map(|i| {
                Point3::new(
                    if i & 1 == 0 { -h.x } else { h.x },
                    if i & 2 == 0 { -h.y } else { h.y },
                    if i & 4 == 0 { -h.z } else { h.z },
                )
            })
            .collect();
        let faces = vec![
            vec![0, 4, 6, 2], // -x
            vec![1, 3, 7, 5], // +x
            vec![0, 1, 5, 4], // -y
            vec![2, 6, 7, 3], // +y
            vec![0, 2, 3, 1], // -z
            vec![4, 5, 7, 6], // +z
        ];
        Self::new(vertices, faces)
    }

    /// Body-space vertices.
    #[must_use]
    pub fn vertices(&self) -> &[Point3<f64>] {
        &self.vertices
    }

    /// Faces as vertex index lists.
    #[must_use]
    pub fn faces(&self) -> &[Vec<usize>] {
        &self.faces
    }

    /// Vertices sharing an edge with vertex `index`.
    #[must_use]
    pub fn neighbors(&self, index: usize) -> &[usize] {
        &self.neighbors[index]
    }

    /// Unique edges as vertex index pairs.
    #[must_use]
    pub fn edges(&self) -> &[[usize; 2]] {
        &self.edges
    }

    /// Distinct unit edge directions (a direction and its opposite count
    /// once).
    #[must_use]
    pub fn edge_vectors(&self) -> &[Vector3<f64>] {
        &self.edge_vectors
    }

    /// Body-space unit face normals.
    #[must_use]
    pub fn face_normals(&self) -> &[Vector3<f64>] {
        &self.face_normals
    }

    /// Mass properties of the solid hull about the body origin, with its
    /// center of mass.
    pub fn mass_properties(&self, density: f64) -> Result<(MassProperties, Point3<f64>)> {
        let mut indices = Vec::new();
        for face in &self.faces {
            for j in 1..face.len() - 1 {
                indices.extend_from_slice(&[face[0], face[j], face[j + 1]]);
            }
        }
        MassProperties::from_tri_mesh(density, &self.vertices, &indices)
    }

    /// Bake `transform` into the body-space vertices.
    pub fn transform(&mut self, transform: &Transform) -> Result<()> {
        let vertices = self
            .vertices
            .iter()
            .map(|v| transform.transform_point(v))
            .collect();
        *self = Self::new(vertices, std::mem::take(&mut self.faces))?;
        Ok(())
    }

    fn find_edge(&self, a: usize, b: usize) -> Option<usize> {
        self.edges
            .iter()
            .position(|e| (e[0] == a && e[1] == b) || (e[0] == b && e[1] == a))
    }

    fn find_face(&self, edge: usize, vertex: usize) -> Option<usize> {
        let [e0, e1] = self.edges[edge];
        self.faces.iter().position(|face| {
            face.iter()
                .filter(|&&v| v == e0 || v == e1 || v == vertex)
                .count()
                > 2
        })
    }
}

/// A convex polyhedron placed in the world.
#[derive(Debug, Clone)]
pub struct PolyhedronPart {
    compiled: Arc<CompiledPolyhedron>,
    world: Vec<Point3<f64>>,
    face_normals: Vec<Vector3<f64>>,
    edge_vectors: Vec<Vector3<f64>>,
    center: Point3<f64>,
}

impl PolyhedronPart {
    /// Create a part at the identity transform.
    #[must_use]
    pub fn new(compiled: Arc<CompiledPolyhedron>) -> Self {
        let mut part = Self {
            world: compiled.vertices.clone(),
            face_normals: compiled.face_normals.clone(),
            edge_vectors: compiled.edge_vectors.clone(),
            center: Point3::origin(),
            compiled,
        };
        part.apply_transform(&Transform::identity());
        part
    }

    /// The shared hull.
    #[must_use]
    pub fn compiled(&self) -> &Arc<CompiledPolyhedron> {
        &self.compiled
    }

    /// Number of vertices.
    #[must_use]
    pub fn vertex_count(&self) -> usize {
        self.world.len()
    }

    /// Number of faces.
    #[must_use]
    pub fn face_count(&self) -> usize {
        self.face_normals.len()
    }

    /// Number of edges.
    #[must_use]
    pub fn edge_count(&self) -> usize {
        self.compiled.edges.len()
    }

    /// Number of distinct edge directions.
    #[must_use]
    pub fn edge_vector_count(&self) -> usize {
        self.edge_vectors.len()
    }

    /// Origin of the body in world space.
    #[must_use]
    pub fn center(&self) -> Point3<f64> {
        self.center
    }

    /// World position of vertex `index`.
    #[must_use]
    pub fn world(&self, index: usize) -> Point3<f64> {
        self.world[index]
    }

    /// All world-space vertices.
    #[must_use]
    pub fn world_vertices(&self) -> &[Point3<f64>] {
        &self.world
    }

    /// Vertex indices of face `index`.
    #[must_use]
    pub fn face(&self, index: usize) -> &[usize] {
        &self.compiled.faces[index]
    }

    /// World-space normal of face `index`.
    #[must_use]
    pub fn face_normal(&self, index: usize) -> Vector3<f64> {
        self.face_normals[index]
    }

    /// Plane of face `index` in world space.
    #[must_use]
    pub fn face_plane(&self, index: usize) -> Plane {
        Plane::new(self.world[self.face(index)[0]], self.face_normals[index])
    }

    /// Vertex indices of edge `index`.
    #[must_use]
    pub fn edge(&self, index: usize) -> [usize; 2] {
        self.compiled.edges[index]
    }

    /// World segment of edge `index`.
    #[must_use]
    pub fn edge_segment(&self, index: usize) -> Segment {
        let [a, b] = self.edge(index);
        Segment::new(self.world[a], self.world[b])
    }

    /// World-space edge direction `index`.
    #[must_use]
    pub fn edge_vector(&self, index: usize) -> Vector3<f64> {
        self.edge_vectors[index]
    }

    /// Boundary edges of face `index`, each running from the previous vertex
    /// to the current one (the first edge closes the loop).
    pub fn face_edges(&self, index: usize) -> impl Iterator<Item = Segment> + '_ {
        let face = self.face(index);
        (0..face.len()).map(move |i| {
            let prev = if i == 0 { face.len() - 1 } else { i - 1 };
            Segment::new(self.world[face[prev]], self.world[face[i]])
        })
    }

    /// Vertex with the greatest projection on `d`, found by hill-climbing
    /// the adjacency graph from vertex 0.
    #[must_use]
    pub fn extreme_vertex(&self, d: &Vector3<f64>) -> Feature {
        let mut e = Feature::vertex(0, d.dot(&self.world[0].coords));
        loop {
            let start = e.index;
            let mut improved = false;
            for &n in self.compiled.neighbors(start) {
                let x = d.dot(&self.world[n].coords);
                if x - e.x >= EPSILON {
                    e.index = n;
                    e.x = x;
                    improved = true;
                }
            }
            if !improved {
                return e;
            }
        }
    }

    /// Extreme feature along `d`: the extreme vertex, promoted to an edge or
    /// face when neighbors project equally far.
    #[must_use]
    pub fn extreme_feature(&self, d: &Vector3<f64>) -> Feature {
        let mut e = self.extreme_vertex(d);
        let start = e.index;
        for &n in self.compiled.neighbors(start) {
            let x = d.dot(&self.world[n].coords);
            if float_equals(x, e.x) && !self.promote(&mut e, start, n) {
                break;
            }
        }
        e
    }

    /// Feature formed by the vertices whose projection along `d` reaches
    /// `depth`. Kind is [`FeatureKind::None`] when even the extreme vertex
    /// falls short.
    #[must_use]
    pub fn extreme_feature_at_depth(&self, d: &Vector3<f64>, depth: f64) -> Feature {
        let mut e = self.extreme_vertex(d);
        if depth - e.x >= EPSILON {
            e.kind = FeatureKind::None;
            return e;
        }
        let start = e.index;
        for &n in self.compiled.neighbors(start) {
            let x = d.dot(&self.world[n].coords);
            if x >= depth && !self.promote(&mut e, start, n) {
                break;
            }
        }
        e
    }

    // Grow `e` by one vertex. Returns false once it is already a face.
    fn promote(&self, e: &mut Feature, start: usize, vertex: usize) -> bool {
        match e.kind {
            FeatureKind::Vertex => {
                if let Some(edge) = self.compiled.find_edge(start, vertex) {
                    e.kind = FeatureKind::Edge;
                    e.index = edge;
                }
                true
            }
            FeatureKind::Edge => {
                if let Some(face) = self.compiled.find_face(e.index, vertex) {
                    e.kind = FeatureKind::Face;
                    e.index = face;
                }
                true
            }
            FeatureKind::Face | FeatureKind::None => false,
        }
    }

    /// Whether `p`, assumed to lie in the plane of face `face_index`, is
    /// inside the face. Points on the boundary count when `inclusive`.
    #[must_use]
    pub fn is_point_on_face(&self, face_index: usize, p: &Point3<f64>, inclusive: bool) -> bool {
        let face = self.face(face_index);
        let normal = self.face_normals[face_index];
        let p0 = self.world[face[0]];
        let (mut low, mut high) = (0, face.len());

        // Binary search over the triangle fan around the first vertex.
        loop {
            let mid = (low + high) / 2;
            let s = Segment::new(p0, self.world[face[mid]]);
            if (mid == face.len() - 1 || mid == 1) && s.distance_squared_to(p) < EPSILON {
                return inclusive;
            }
            if is_triangle_ccw(&normal, &s.p1, &s.p2, p) {
                low = mid;
            } else {
                high = mid;
            }
            if low + 1 >= high {
                break;
            }
        }
        if low == 0 || high == face.len() {
            return false;
        }
        let s = Segment::new(self.world[face[low]], self.world[face[high]]);
        is_triangle_ccw(&normal, &s.p1, &s.p2, p) || (inclusive && s.distance_squared_to(p) < EPSILON)
    }

    /// Update the world cache from the body transform.
    pub fn apply_transform(&mut self, transform: &Transform) {
        for (w, v) in self.world.iter_mut().zip(&self.compiled.vertices) {
            *w = transform.transform_point(v);
        }
        for (w, n) in self.face_normals.iter_mut().zip(&self.compiled.face_normals) {
            *w = transform.rotate(n);
        }
        for (w, e) in self.edge_vectors.iter_mut().zip(&self.compiled.edge_vectors) {
            *w = transform.rotate(e);
        }
        self.center = transform.position();
    }

    /// World bounding box.
    #[must_use]
    pub fn bounding_box(&self) -> AlignedBox {
        AlignedBox::fit(&self.world)
    }

    /// Nearest crossing of `segment` with the hull surface.
    #[must_use]
    pub fn intersect(&self, segment: &Segment) -> Option<(f64, Point3<f64>)> {
        let mut best: Option<(f64, Point3<f64>)> = None;
        for i in 0..self.face_count() {
            if let Some((scalar, point)) = self.face_plane(i).intersect_segment(segment) {
                if best.map_or(true, |(s, _)| scalar < s) && self.is_point_on_face(i, &point, true)
                {
                    best = Some((scalar, point));
                }
            }
        }
        best
    }

    /// Distinct vertex indices of every face that contains `vertex`.
    pub(crate) fn faces_around(&self, vertex: usize) -> SmallVec<[usize; 16]> {
        let mut out: SmallVec<[usize; 16]> = SmallVec::new();
        for face in &self.compiled.faces {
            if face.contains(&vertex) {
                for &v in face {
                    if !out.contains(&v) {
                        out.push(v);
                    }
                }
            }
        }
        out
    }
}
