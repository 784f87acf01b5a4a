//! Points and axis-aligned bounding boxes.

use std::fmt;
use std::ops::{Add, Mul, Sub};

/// A point (or vector) in 3D space.
#[derive(Clone, Copy, Debug, Default, PartialEq)]
pub struct Point3(pub [f64; 3]);

impl Point3 {
    /// The origin.
    pub const ORIGIN: Point3 = Point3([0.0; 3]);

    /// Construct from components.
    pub const fn new(x: f64, y: f64, z: f64) -> Self {
        Self([x, y, z])
    }

    /// X component.
    pub fn x(&self) -> f64 {
        self.0[0]
    }

    /// Y component.
    pub fn y(&self) -> f64 {
        self.0[1]
    }

    /// Z component.
    pub fn z(&self) -> f64 {
        self.0[2]
    }

    /// Euclidean length when treated as a vector.
    pub fn norm(&self) -> f64 {
        self.0.iter().map(|c| c * c).sum::<f64>().sqrt()
    }

    /// Euclidean distance to `other`.
    pub fn distance(&self, other: &Point3) -> f64 {
        (*self - *other).norm()
    }

    /// Whether every component is finite.
    pub fn is_finite(&self) -> bool {
        self.0.iter().all(|c| c.is_finite())
    }
}

impl Add for Point3 {
    type Output = Point3;

    fn add(self, rhs: Point3) -> Point3 {
        Point3([self.0[0] + rhs.0[0], self.0[1] + rhs.0[1], self.0[2] + rhs.0[2]])
    }
}

impl Sub for Point3 {
    type Output = Point3;

    fn sub(self, rhs: Point3) -> Point3 {
        Point3([self.0[0] - rhs.0[0], self.0[1] - rhs.0[1], self.0[2] - rhs.0[2]])
    }
}

impl Mul<f64> for Point3 {
    type Output = Point3;

    fn mul(self, rhs: f64) -> Point3 {
        Point3([self.0[0] * rhs, self.0[1] * rhs, self.0[2] * rhs])
    }
}

impl fmt::Display for Point3 {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "({}, {}, {})", self.0[0], self.0[1], self.0[2])
    }
}

/// An axis-aligned box, inclusive on all six faces.
///
/// A box only exists for a process that owns data. Processes without
/// data publish an empty box, which is represented on the wire by an
/// inverted range and decodes back to `None`.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct BoundingBox {
    /// Minimum corner.
    pub min: Point3,
    /// Maximum corner.
    pub max: Point3,
}

impl BoundingBox {
    /// Number of `f64` values in the flat encoding.
    pub const FLAT_LEN: usize = 6;

    /// Construct a box from its corners.
    ///
    /// Returns `None` if any component is non-finite or `min > max` on
    /// any axis.
    pub fn new(min: Point3, max: Point3) -> Option<Self> {
        if !min.is_finite() || !max.is_finite() {
            return None;
        }
        if (0..3).any(|a| min.0[a] > max.0[a]) {
            return None;
        }
        Some(Self { min, max })
    }

    /// Smallest box containing every point, or `None` for an empty set.
    pub fn from_points<'a>(points: impl IntoIterator<Item = &'a Point3>) -> Option<Self> {
        let mut min = [f64::INFINITY; 3];
        let mut max = [f64::NEG_INFINITY; 3];
        let mut any = false;
        for p in points {
            any = true;
            for a in 0..3 {
                min[a] = min[a].min(p.0[a]);
                max[a] = max[a].max(p.0[a]);
            }
        }
        if !any {
            return None;
        }
        Self::new(Point3(min), Point3(max))
    }

    /// Inclusive containment test.
    pub fn contains(&self, p: &Point3) -> bool {
        (0..3).all(|a| p.0[a] >= self.min.0[a] && p.0[a] <= self.max.0[a])
    }

    /// Flat `[xmin, xmax, ymin, ymax, zmin, zmax]` encoding of an
    /// optional box. `None` encodes as an inverted infinite range.
    pub fn to_flat(b: Option<&BoundingBox>) -> [f64; 6] {
        match b {
            Some(b) => [
                b.min.0[0], b.max.0[0], b.min.0[1], b.max.0[1], b.min.0[2], b.max.0[2],
            ],
            None => [
                f64::INFINITY,
                f64::NEG_INFINITY,
                f64::INFINITY,
                f64::NEG_INFINITY,
                f64::INFINITY,
                f64::NEG_INFINITY,
            ],
        }
    }

    /// Inverse of [`to_flat`](Self::to_flat).
    pub fn from_flat(v: &[f64; 6]) -> Option<BoundingBox> {
        Self::new(Point3([v[0], v[2], v[4]]), Point3([v[1], v[3], v[5]]))
    }
}

impl fmt::Display for BoundingBox {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "[{}, {}]x[{}, {}]x[{}, {}]",
            self.min.0[0], self.max.0[0], self.min.0[1], self.max.0[1], self.min.0[2], self.max.0[2]
        )
    }
}
