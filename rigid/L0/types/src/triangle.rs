//! Triangles and extreme-feature classification.

use nalgebra::{Point3, Vector3};

#[cfg(feature = "serde")]
use serde::{Deserialize, Serialize};

use crate::math::{self, EPSILON};
use crate::{Segment, Transform};

/// Kind of a convex feature that is extreme along some direction.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum FeatureKind {
    /// No feature reaches the requested depth.
    #[default]
    None,
    /// A single vertex.
    Vertex,
    /// An edge (two vertices).
    Edge,
    /// A face (three or more vertices).
    Face,
}

/// A vertex, edge or face index together with its projection along the
/// query direction.
#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub struct Feature {
    /// Kind of feature.
    pub kind: FeatureKind,
    /// Index of the vertex, edge or face within its shape.
    pub index: usize,
    /// Projection of the feature onto the query direction.
    pub x: f64,
}

impl Feature {
    /// A vertex feature.
    #[must_use]
    pub const fn vertex(index: usize, x: f64) -> Self {
        Self {
            kind: FeatureKind::Vertex,
            index,
            x,
        }
    }

    /// A feature of the given kind.
    #[must_use]
    pub const fn new(kind: FeatureKind, index: usize, x: f64) -> Self {
        Self { kind, index, x }
    }

    /// No feature.
    #[must_use]
    pub const fn none(x: f64) -> Self {
        Self {
            kind: FeatureKind::None,
            index: 0,
            x,
        }
    }
}

/// Result of a closest-point query between a segment and a triangle.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct SegmentTriangleClosest {
    /// Parameter along the segment.
    pub scalar: f64,
    /// Closest point on the segment.
    pub segment_point: Point3<f64>,
    /// Closest point on the triangle.
    pub triangle_point: Point3<f64>,
    /// Whether the segment pierces or lies over the triangle's face rather
    /// than being nearest to one of its edges.
    pub is_interior: bool,
}

/// A triangle with a cached unit normal. Vertices wind counter-clockwise
/// when viewed from the side the normal points to.
#[derive(Debug, Clone, Copy, PartialEq)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub struct Triangle {
    /// First vertex.
    pub v1: Point3<f64>,
    /// Second vertex.
    pub v2: Point3<f64>,
    /// Third vertex.
    pub v3: Point3<f64>,
    /// Unit face normal.
    pub normal: Vector3<f64>,
}

impl Triangle {
    /// Create a triangle, computing its normal from the winding.
    #[must_use]
    pub fn new(v1: Point3<f64>, v2: Point3<f64>, v3: Point3<f64>) -> Self {
        let normal = math::normalize_or_zero(&(v2 - v1).cross(&(v3 - v1)));
        Self { v1, v2, v3, normal }
    }

    /// Create a triangle with a precomputed normal.
    #[must_use]
    pub const fn with_normal(
        v1: Point3<f64>,
        v2: Point3<f64>,
        v3: Point3<f64>,
        normal: Vector3<f64>,
    ) -> Self {
        Self { v1, v2, v3, normal }
    }

    /// Vertex `index` in `0..3`; larger indices wrap.
    #[must_use]
    pub fn vertex(&self, index: usize) -> Point3<f64> {
        match index % 3 {
            0 => self.v1,
            1 => self.v2,
            _ => self.v3,
        }
    }

    /// Edge `index` in `0..3`: `v1v2`, `v2v3`, `v3v1`.
    #[must_use]
    pub fn edge(&self, index: usize) -> Segment {
        Segment::new(self.vertex(index), self.vertex(index + 1))
    }

    /// Direction of edge `index`.
    #[must_use]
    pub fn edge_vector(&self, index: usize) -> Vector3<f64> {
        self.vertex(index + 1) - self.vertex(index)
    }

    /// Centroid.
    #[must_use]
    pub fn center(&self) -> Point3<f64> {
        Point3::from((self.v1.coords + self.v2.coords + self.v3.coords) / 3.0)
    }

    /// Whether a point in the triangle's plane lies within the triangle.
    #[must_use]
    pub fn contains(&self, p: &Point3<f64>) -> bool {
        let a = self.v1 - p;
        let b = self.v2 - p;
        let c = self.v3 - p;
        let ab = a.dot(&b);
        let ac = a.dot(&c);
        let bc = b.dot(&c);
        let cc = c.dot(&c);
        if bc * ac - cc * ab < 0.0 {
            return false;
        }
        let bb = b.dot(&b);
        ab * bc - ac * bb >= 0.0
    }

    fn projections(&self, d: &Vector3<f64>) -> [f64; 3] {
        [
            d.dot(&self.v1.coords),
            d.dot(&self.v2.coords),
            d.dot(&self.v3.coords),
        ]
    }

    /// Vertex furthest along `d`.
    #[must_use]
    pub fn extreme_vertex(&self, d: &Vector3<f64>) -> Feature {
        let [d1, d2, d3] = self.projections(d);
        if d1 >= d2 && d1 >= d3 {
            Feature::vertex(0, d1)
        } else if d2 >= d1 && d2 >= d3 {
            Feature::vertex(1, d2)
        } else {
            Feature::vertex(2, d3)
        }
    }

    /// Extreme feature along `d`, treating projections within [`EPSILON`] as
    /// equal.
    #[must_use]
    pub fn extreme_feature(&self, d: &Vector3<f64>) -> Feature {
        let [d1, d2, d3] = self.projections(d);
        let eq = |a: f64, b: f64| (a - b).abs() < EPSILON;
        if eq(d1, d2) && eq(d2, d3) {
            Feature::new(FeatureKind::Face, 0, d1)
        } else if eq(d1, d2) && d1 > d3 && d2 > d3 {
            Feature::new(FeatureKind::Edge, 0, d1)
        } else if eq(d2, d3) && d2 > d1 && d3 > d1 {
            Feature::new(FeatureKind::Edge, 1, d2)
        } else if eq(d3, d1) && d3 > d2 && d1 > d2 {
            Feature::new(FeatureKind::Edge, 2, d3)
        } else {
            self.extreme_vertex(d)
        }
    }

    /// Feature formed by every vertex whose projection along `d` reaches
    /// `depth`.
    #[must_use]
    pub fn extreme_feature_at_depth(&self, d: &Vector3<f64>, depth: f64) -> Feature {
        let [d1, d2, d3] = self.projections(d);
        let (a, b, c) = (d1 >= depth, d2 >= depth, d3 >= depth);
        let (kind, index) = match (a, b, c) {
            (true, true, true) => (FeatureKind::Face, 0),
            (true, true, false) => (FeatureKind::Edge, 0),
            (false, true, true) => (FeatureKind::Edge, 1),
            (true, false, true) => (FeatureKind::Edge, 2),
            (true, false, false) => (FeatureKind::Vertex, 0),
            (false, true, false) => (FeatureKind::Vertex, 1),
            (false, false, true) => (FeatureKind::Vertex, 2),
            (false, false, false) => (FeatureKind::None, 0),
        };
        Feature::new(kind, index, depth)
    }

    /// Where `segment` crosses the triangle, as `(scalar, point)`.
    #[must_use]
    pub fn intersect_segment(&self, segment: &Segment) -> Option<(f64, Point3<f64>)> {
        let v12 = self.v2 - self.v1;
        let v13 = self.v3 - self.v1;
        let n = v12.cross(&v13);

        let mut seg = *segment;
        let mut p21 = seg.p1 - seg.p2;
        let mut d = n.dot(&p21);
        if d.abs() < EPSILON {
            return None;
        }
        let switched = d < 0.0;
        if switched {
            seg = Segment::new(segment.p2, segment.p1);
            p21 = seg.p1 - seg.p2;
            d = -d;
        }

        let v1p1 = seg.p1 - self.v1;
        let t = n.dot(&v1p1);
        let e = p21.cross(&v1p1);
        let v = v13.dot(&e);
        if v < 0.0 || v > d {
            return None;
        }
        let w = -v12.dot(&e);
        if w < 0.0 || v + w > d {
            return None;
        }

        let inv = 1.0 / d;
        let p = self.v1 + v12 * (v * inv) + v13 * (w * inv);
        let mut scalar = t * inv;
        if switched {
            scalar = 1.0 - scalar;
        }
        (0.0..=1.0).contains(&scalar).then_some((scalar, p))
    }

    /// Closest point on the triangle to `p`, and whether it lies strictly
    /// inside the face (rather than on an edge or vertex).
    #[must_use]
    pub fn closest_point_to(&self, p: &Point3<f64>) -> (Point3<f64>, bool) {
        let v12 = self.v2 - self.v1;
        let v13 = self.v3 - self.v1;

        let v1p = p - self.v1;
        let d1 = v12.dot(&v1p);
        let d2 = v13.dot(&v1p);
        if d1 <= 0.0 && d2 <= 0.0 {
            return (self.v1, false);
        }

        let v2p = p - self.v2;
        let d3 = v12.dot(&v2p);
        let d4 = v13.dot(&v2p);
        if d3 >= 0.0 && d4 <= d3 {
            return (self.v2, false);
        }

        let vc = d1 * d4 - d3 * d2;
        if vc <= 0.0 && d1 >= 0.0 && d3 <= 0.0 {
            let v = d1 / (d1 - d3);
            return (self.v1 + v12 * v, false);
        }

        let v3p = p - self.v3;
        let d5 = v12.dot(&v3p);
        let d6 = v13.dot(&v3p);
        if d6 >= 0.0 && d5 <= d6 {
            return (self.v3, false);
        }

        let vb = d5 * d2 - d1 * d6;
        if vb <= 0.0 && d2 >= 0.0 && d6 <= 0.0 {
            let w = d2 / (d2 - d6);
            return (self.v1 + v13 * w, false);
        }

        let va = d3 * d6 - d5 * d4;
        if va <= 0.0 && (d4 - d3) >= 0.0 && (d5 - d6) >= 0.0 {
            let w = (d4 - d3) / ((d4 - d3) + (d5 - d6));
            return (self.v2 + (self.v3 - self.v2) * w, false);
        }

        let denom = 1.0 / (va + vb + vc);
        let v = vb * denom;
        let w = vc * denom;
        (self.v1 + v12 * v + v13 * w, true)
    }

    /// Closest points between a segment and the triangle.
    #[must_use]
    pub fn closest_point_to_segment(&self, segment: &Segment) -> SegmentTriangleClosest {
        if let Some((scalar, p)) = self.intersect_segment(segment) {
            return SegmentTriangleClosest {
                scalar,
                segment_point: p,
                triangle_point: p,
                is_interior: true,
            };
        }

        let plane_d = self.normal.dot(&self.v1.coords);
        let height = |p: &Point3<f64>| self.normal.dot(&p.coords) - plane_d;
        let p1_inside = self.contains(&(segment.p1 - self.normal * height(&segment.p1)));
        let p2_inside = self.contains(&(segment.p2 - self.normal * height(&segment.p2)));

        if p1_inside && p2_inside {
            let d1 = height(&segment.p1);
            let d2 = height(&segment.p2);
            let (scalar, segment_point, dist) = if (d2 - d1).abs() < EPSILON {
                (0.5, nalgebra::center(&segment.p1, &segment.p2), d1)
            } else if d1.abs() < d2.abs() {
                (0.0, segment.p1, d1)
            } else {
                (1.0, segment.p2, d2)
            };
            return SegmentTriangleClosest {
                scalar,
                segment_point,
                triangle_point: segment_point - self.normal * dist,
                is_interior: true,
            };
        }

        let mut best = SegmentTriangleClosest {
            scalar: 0.0,
            segment_point: segment.p1,
            triangle_point: self.v1,
            is_interior: false,
        };
        let mut min_dist = f64::MAX;

        if p1_inside || p2_inside {
            let segment_point = if p1_inside { segment.p1 } else { segment.p2 };
            let h = height(&segment_point);
            best.scalar = if p1_inside { 0.0 } else { 1.0 };
            best.segment_point = segment_point;
            best.triangle_point = segment_point - self.normal * h;
            min_dist = h * h;
        }

        for i in 0..3 {
            let c = Segment::closest_points(segment, &self.edge(i));
            let dist = c.distance_squared();
            if dist < min_dist {
                min_dist = dist;
                best.scalar = c.scalar_a;
                best.segment_point = c.point_a;
                best.triangle_point = c.point_b;
            }
        }
        best
    }

    /// The triangle mapped through `transform`.
    #[must_use]
    pub fn transform(&self, transform: &Transform) -> Self {
        Self {
            v1: transform.transform_point(&self.v1),
            v2: transform.transform_point(&self.v2),
            v3: transform.transform_point(&self.v3),
            normal: transform.rotate(&self.normal),
        }
    }
}
