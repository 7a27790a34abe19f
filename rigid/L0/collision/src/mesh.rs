//! Octree-indexed triangle meshes.
//!
//! A [`CompiledMesh`] stores its triangles once and indexes them with an
//! octree built from the triangle bounding boxes. Each triangle lives in the
//! deepest node whose box fully contains it; a triangle that straddles every
//! child octant stays in the parent.
//!
//! Queries walk the tree depth-first with a query box in mesh body space and
//! hand overlapping triangles to a callback in batches of up to
//! [`TRIANGLE_BATCH`]. The walk needs a stack and a batch buffer; callers own
//! them through [`TriangleScratch`], so concurrent queries on one mesh never
//! share mutable state.

use std::sync::Arc;

use nalgebra::{Point3, Vector3};

use rigid_types::math::normalize_or_zero;
use rigid_types::{AlignedBox, BoxIntersection, PhysicsError, Result, Segment, Transform, Triangle};

/// Triangles handed to a query callback at once.
pub const TRIANGLE_BATCH: usize = 1024;

const MAX_OCTREE_DEPTH: usize = 24;

#[derive(Debug, Clone)]
struct OctreeNode {
    children: Vec<u32>,
    triangles: Vec<u32>,
    bounds: AlignedBox,
}

/// Reusable buffers for octree queries.
#[derive(Debug, Clone)]
pub struct TriangleScratch {
    stack: Vec<u32>,
    buffer: Vec<Triangle>,
}

impl Default for TriangleScratch {
    fn default() -> Self {
        Self {
            stack: Vec::with_capacity(64),
            buffer: Vec::with_capacity(TRIANGLE_BATCH),
        }
    }
}

/// A triangle mesh in body space with an octree index.
#[derive(Debug, Clone)]
pub struct CompiledMesh {
    vertices: Vec<Point3<f64>>,
    triangles: Vec<[usize; 3]>,
    normals: Vec<Vector3<f64>>,
    triangle_boxes: Vec<AlignedBox>,
    nodes: Vec<OctreeNode>,
}

impl CompiledMesh {
    /// Compile a mesh from vertices and a flat triangle index list.
    /// Triangles wind counter-clockwise seen from their front side.
    pub fn new(vertices: Vec<Point3<f64>>, indices: &[usize]) -> Result<Self> {
        if indices.len() % 3 != 0 {
            return Err(PhysicsError::invalid_geometry(
                "mesh index count is not a multiple of three",
            ));
        }
        if u32::try_from(indices.len() / 3).is_err() {
            return Err(PhysicsError::invalid_geometry("too many triangles in mesh"));
        }
        if let Some(&bad) = indices.iter().find(|&&i| i >= vertices.len()) {
            return Err(PhysicsError::invalid_geometry(format!(
                "mesh index {bad} out of range for {} vertices",
                vertices.len()
            )));
        }

        let triangles: Vec<[usize; 3]> = indices
            .chunks_exact(3)
            .map(|t| [t[0], t[1], t[2]])
            .collect();
        let normals = triangles
            .iter()
            .map(|&[a, b, c]| {
                normalize_or_zero(&(vertices[b] - vertices[a]).cross(&(vertices[c] - vertices[a])))
            })
            .collect();

        let mut mesh = Self {
            vertices,
            triangles,
            normals,
            triangle_boxes: Vec::new(),
            nodes: Vec::new(),
        };
        mesh.build_octree();
        Ok(mesh)
    }

    /// Body-space vertices.
    #[must_use]
    pub fn vertices(&self) -> &[Point3<f64>] {
        &self.vertices
    }

    /// Number of triangles.
    #[must_use]
    pub fn triangle_count(&self) -> usize {
        self.triangles.len()
    }

    /// Triangle `index` in body space.
    #[must_use]
    pub fn triangle(&self, index: usize) -> Triangle {
        let [a, b, c] = self.triangles[index];
        Triangle::with_normal(
            self.vertices[a],
            self.vertices[b],
            self.vertices[c],
            self.normals[index],
        )
    }

    /// Box around the whole mesh in body space.
    #[must_use]
    pub fn bounds(&self) -> AlignedBox {
        self.nodes.first().map_or(AlignedBox::NULL, |n| n.bounds)
    }

    /// Number of octree nodes.
    #[must_use]
    pub fn node_count(&self) -> usize {
        self.nodes.len()
    }

    /// Bake `transform` into the body-space vertices and rebuild the index.
    pub fn transform(&mut self, transform: &Transform) {
        for v in &mut self.vertices {
            *v = transform.transform_point(v);
        }
        for n in &mut self.normals {
            *n = transform.rotate(n);
        }
        self.build_octree();
    }

    /// Call `process` with every triangle whose box overlaps `query`.
    pub fn process_triangles<F>(&self, query: &AlignedBox, scratch: &mut TriangleScratch, mut process: F)
    where
        F: FnMut(&[Triangle]),
    {
        scratch.stack.clear();
        scratch.buffer.clear();
        if self.nodes.is_empty() {
            return;
        }
        scratch.stack.push(0);

        while let Some(node_index) = scratch.stack.pop() {
            let node = &self.nodes[node_index as usize];
            if AlignedBox::intersect(query, &node.bounds) == BoxIntersection::None {
                continue;
            }
            for &t in &node.triangles {
                let t = t as usize;
                if AlignedBox::intersect(query, &self.triangle_boxes[t]) != BoxIntersection::None {
                    scratch.buffer.push(self.triangle(t));
                    if scratch.buffer.len() == TRIANGLE_BATCH {
                        process(&scratch.buffer);
                        scratch.buffer.clear();
                    }
                }
            }
            scratch.stack.extend(node.children.iter().rev());
        }

        if !scratch.buffer.is_empty() {
            process(&scratch.buffer);
            scratch.buffer.clear();
        }
    }

    fn build_octree(&mut self) {
        struct BuildNode {
            children: [u32; 8],
            triangles: Vec<u32>,
            bounds: AlignedBox,
        }

        self.triangle_boxes = self
            .triangles
            .iter()
            .map(|&[a, b, c]| AlignedBox::fit3(&self.vertices[a], &self.vertices[b], &self.vertices[c]))
            .collect();
        let root_bounds = self
            .triangle_boxes
            .iter()
            .fold(AlignedBox::NULL, |acc, b| acc.merge(b));

        let mut nodes = vec![BuildNode {
            children: [0; 8],
            triangles: Vec::new(),
            bounds: root_bounds,
        }];

        for (t, tri_box) in self.triangle_boxes.iter().enumerate() {
            let mut idx = 0;
            let mut depth = 0;
            loop {
                let sector = (depth < MAX_OCTREE_DEPTH)
                    .then(|| {
                        (0..8).find_map(|s| {
                            let child = child_box(&nodes[idx].bounds, s);
                            (AlignedBox::intersect(&child, tri_box) == BoxIntersection::AContainsB)
                                .then_some((s, child))
                        })
                    })
                    .flatten();
                let Some((sector, child)) = sector else {
                    nodes[idx].triangles.push(t as u32);
                    break;
                };
                if nodes[idx].children[sector] > 0 {
                    idx = nodes[idx].children[sector] as usize;
                } else {
                    nodes.push(BuildNode {
                        children: [0; 8],
                        triangles: Vec::new(),
                        bounds: child,
                    });
                    let new_index = nodes.len() - 1;
                    nodes[idx].children[sector] = new_index as u32;
                    idx = new_index;
                }
                depth += 1;
            }
        }

        self.nodes = nodes
            .into_iter()
            .map(|n| OctreeNode {
                children: n.children.into_iter().filter(|&c| c > 0).collect(),
                triangles: n.triangles,
                bounds: n.bounds,
            })
            .collect();
    }
}

// Octant `sector` of `parent`: sectors 0..4 cover the low-z half going round
// (0,0), (0,1), (1,1), (1,0) in x/y; sectors 4..8 repeat that at high z.
fn child_box(parent: &AlignedBox, sector: usize) -> AlignedBox {
    let size = (parent.max - parent.min) * 0.5;
    let (x, y) = match sector % 4 {
        0 => (0.0, 0.0),
        1 => (0.0, 1.0),
        2 => (1.0, 1.0),
        _ => (1.0, 0.0),
    };
    let z = if sector > 3 { 1.0 } else { 0.0 };
    let min = parent.min + Vector3::new(x * size.x, y * size.y, z * size.z);
    AlignedBox::new(min, min + size)
}

/// A triangle mesh placed in the world.
///
/// Geometry stays in body space; queries are transformed into it.
#[derive(Debug, Clone)]
pub struct MeshPart {
    compiled: Arc<CompiledMesh>,
    transform: Transform,
    transform_inverse: Transform,
    bounds: AlignedBox,
}

impl MeshPart {
    /// Create a part at the identity transform.
    #[must_use]
    pub fn new(compiled: Arc<CompiledMesh>) -> Self {
        let bounds = compiled.bounds();
        Self {
            compiled,
            transform: Transform::identity(),
            transform_inverse: Transform::identity(),
            bounds,
        }
    }

    /// The shared mesh.
    #[must_use]
    pub fn compiled(&self) -> &Arc<CompiledMesh> {
        &self.compiled
    }

    /// Body-to-world transform.
    #[must_use]
    pub fn transform(&self) -> &Transform {
        &self.transform
    }

    /// World-to-body transform.
    #[must_use]
    pub fn transform_inverse(&self) -> &Transform {
        &self.transform_inverse
    }

    /// Update the transform and world bounding box.
    pub fn apply_transform(&mut self, transform: &Transform) {
        self.transform = *transform;
        self.transform_inverse = transform.inverse();
        self.bounds = if transform.is_identity() {
            self.compiled.bounds()
        } else {
            let mut bounds = AlignedBox::NULL;
            for v in self.compiled.vertices() {
                bounds.add_point(&transform.transform_point(v));
            }
            bounds
        };
    }

    /// World bounding box.
    #[must_use]
    pub fn bounding_box(&self) -> AlignedBox {
        self.bounds
    }

    /// Walk the triangles near `query`, a box in mesh body space.
    pub fn process_triangles<F>(&self, query: &AlignedBox, scratch: &mut TriangleScratch, process: F)
    where
        F: FnMut(&[Triangle]),
    {
        self.compiled.process_triangles(query, scratch, process);
    }

    /// Nearest crossing of the world segment with the mesh surface.
    #[must_use]
    pub fn intersect(&self, segment: &Segment) -> Option<(f64, Point3<f64>)> {
        let body = segment.transform(&self.transform_inverse);
        let query = AlignedBox::fit2(&body.p1, &body.p2);
        let mut best: Option<(f64, Point3<f64>)> = None;
        let mut scratch = TriangleScratch::default();
        self.compiled.process_triangles(&query, &mut scratch, |triangles| {
            for tri in triangles {
                if let Some((s, p)) = tri.intersect_segment(&body) {
                    if best.map_or(true, |(b, _)| s < b) {
                        best = Some((s, p));
                    }
                }
            }
        });
        best.filter(|(s, _)| (0.0..=1.0).contains(s))
            .map(|(s, p)| (s, self.transform.transform_point(&p)))
    }
}
