//! Axis-aligned bounding boxes.

use nalgebra::{Point3, Vector3};

#[cfg(feature = "serde")]
use serde::{Deserialize, Serialize};

use crate::{Segment, Transform};

/// How two boxes relate to each other.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BoxIntersection {
    /// The boxes are disjoint.
    None,
    /// The boxes overlap without either containing the other.
    Overlap,
    /// The first box fully contains the second.
    AContainsB,
    /// The second box fully contains the first.
    BContainsA,
}

impl BoxIntersection {
    /// Whether the boxes touch at all.
    #[must_use]
    pub fn is_intersecting(self) -> bool {
        self != Self::None
    }
}

/// An axis-aligned bounding box.
#[derive(Debug, Clone, Copy, PartialEq)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub struct AlignedBox {
    /// Minimum corner.
    pub min: Point3<f64>,
    /// Maximum corner.
    pub max: Point3<f64>,
}

impl Default for AlignedBox {
    fn default() -> Self {
        Self::NULL
    }
}

impl AlignedBox {
    /// The empty box; merging anything into it yields that thing.
    pub const NULL: Self = Self {
        min: Point3::new(f64::INFINITY, f64::INFINITY, f64::INFINITY),
        max: Point3::new(f64::NEG_INFINITY, f64::NEG_INFINITY, f64::NEG_INFINITY),
    };

    /// The box covering all of space.
    pub const INFINITE: Self = Self {
        min: Point3::new(f64::NEG_INFINITY, f64::NEG_INFINITY, f64::NEG_INFINITY),
        max: Point3::new(f64::INFINITY, f64::INFINITY, f64::INFINITY),
    };

    /// Create a box from its corners.
    #[must_use]
    pub const fn new(min: Point3<f64>, max: Point3<f64>) -> Self {
        Self { min, max }
    }

    /// Create a box centered at a point with the given half-extents.
    #[must_use]
    pub fn from_center(center: Point3<f64>, half_extents: Vector3<f64>) -> Self {
        Self {
            min: center - half_extents,
            max: center + half_extents,
        }
    }

    /// Smallest box containing all points. Empty input gives [`Self::NULL`].
    #[must_use]
    pub fn fit(points: &[Point3<f64>]) -> Self {
        let mut b = Self::NULL;
        for p in points {
            b.add_point(p);
        }
        b
    }

    /// Smallest box containing two points.
    #[must_use]
    pub fn fit2(p1: &Point3<f64>, p2: &Point3<f64>) -> Self {
        Self::new(p1.inf(p2), p1.sup(p2))
    }

    /// Smallest box containing three points.
    #[must_use]
    pub fn fit3(p1: &Point3<f64>, p2: &Point3<f64>, p3: &Point3<f64>) -> Self {
        Self::new(p1.inf(p2).inf(p3), p1.sup(p2).sup(p3))
    }

    /// Grow the box to include `p`.
    pub fn add_point(&mut self, p: &Point3<f64>) {
        self.min = self.min.inf(p);
        self.max = self.max.sup(p);
    }

    /// Extend the box along the direction of motion `delta`.
    pub fn sweep(&mut self, delta: &Vector3<f64>) {
        for i in 0..3 {
            if delta[i] >= 0.0 {
                self.max[i] += delta[i];
            } else {
                self.min[i] += delta[i];
            }
        }
    }

    /// Union of two boxes.
    #[must_use]
    pub fn merge(&self, other: &Self) -> Self {
        Self::new(self.min.inf(&other.min), self.max.sup(&other.max))
    }

    /// Classify how `a` and `b` relate.
    #[must_use]
    pub fn intersect(a: &Self, b: &Self) -> BoxIntersection {
        let overlaps = (0..3).all(|i| b.min[i] <= a.max[i] && b.max[i] >= a.min[i]);
        if !overlaps {
            return BoxIntersection::None;
        }
        if (0..3).all(|i| b.min[i] >= a.min[i] && b.max[i] <= a.max[i]) {
            BoxIntersection::AContainsB
        } else if (0..3).all(|i| a.min[i] >= b.min[i] && a.max[i] <= b.max[i]) {
            BoxIntersection::BContainsA
        } else {
            BoxIntersection::Overlap
        }
    }

    /// Whether this box overlaps `other`.
    #[must_use]
    pub fn overlaps(&self, other: &Self) -> bool {
        Self::intersect(self, other).is_intersecting()
    }

    /// Whether `p` lies inside or on the box.
    #[must_use]
    pub fn contains_point(&self, p: &Point3<f64>) -> bool {
        (0..3).all(|i| p[i] >= self.min[i] && p[i] <= self.max[i])
    }

    /// Whether any bound is infinite.
    #[must_use]
    pub fn is_unbounded(&self) -> bool {
        (0..3).any(|i| !self.min[i].is_finite() || !self.max[i].is_finite())
    }

    /// Whether the box contains no points.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        (0..3).any(|i| self.min[i] > self.max[i])
    }

    /// Center of the box.
    #[must_use]
    pub fn center(&self) -> Point3<f64> {
        nalgebra::center(&self.min, &self.max)
    }

    /// Box enclosing this box after it has been transformed.
    ///
    /// Unbounded boxes stay [`Self::INFINITE`]; corner arithmetic on
    /// infinities would produce NaN.
    #[must_use]
    pub fn transform(&self, transform: &Transform) -> Self {
        if self.is_empty() {
            return *self;
        }
        if self.is_unbounded() {
            return Self::INFINITE;
        }
        let mut out = Self::NULL;
        for corner in 0..8 {
            let p = Point3::new(
                if corner & 1 == 0 { self.min.x } else { self.max.x },
                if corner & 2 == 0 { self.min.y } else { self.max.y },
                if corner & 4 == 0 { self.min.z } else { self.max.z },
            );
            out.add_point(&transform.transform_point(&p));
        }
        out
    }

    /// Parameter range `[t_enter, t_exit]` within `[0, 1]` over which
    /// `segment` is inside the box, if any.
    #[must_use]
    pub fn intersect_segment(&self, segment: &Segment) -> Option<(f64, f64)> {
        let d = segment.delta();
        let mut t_min = 0.0_f64;
        let mut t_max = 1.0_f64;
        for i in 0..3 {
            if d[i].abs() < f64::MIN_POSITIVE {
                if segment.p1[i] < self.min[i] || segment.p1[i] > self.max[i] {
                    return None;
                }
            } else {
                let inv = 1.0 / d[i];
                let mut t1 = (self.min[i] - segment.p1[i]) * inv;
                let mut t2 = (self.max[i] - segment.p1[i]) * inv;
                if t1 > t2 {
                    std::mem::swap(&mut t1, &mut t2);
                }
                t_min = t_min.max(t1);
                t_max = t_max.min(t2);
                if t_min > t_max {
                    return None;
                }
            }
        }
        Some((t_min, t_max))
    }
}
