//! Trace points and the tail attribute layout.
//!
//! Every point the integrator emits carries the interpolated attribute
//! values (normals, vorticity, integration time, ...) declared by the
//! run's [`TailLayout`]. The last point of the most recent extension is
//! carried along with a migrating task as its tail, so the next segment
//! can be stitched on without a seam.

use smallvec::SmallVec;

use crate::geometry::Point3;

/// Flat attribute values of one point, laid out per [`TailLayout`].
///
/// Inline capacity covers normals + vorticity + time without spilling.
pub type AttributeValues = SmallVec<[f64; 8]>;

/// One named attribute array carried per trace point.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct AttributeSpec {
    /// Array name (e.g. `"Normals"`).
    pub name: String,
    /// Number of components per point.
    pub components: usize,
}

impl AttributeSpec {
    /// Construct an attribute spec.
    pub fn new(name: impl Into<String>, components: usize) -> Self {
        Self {
            name: name.into(),
            components,
        }
    }
}

/// Ordered set of attribute arrays, fixed for the whole computation.
///
/// All ranks must agree on the layout: it determines the width of every
/// tail buffer and therefore the maximum serialized task size.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct TailLayout {
    arrays: Vec<AttributeSpec>,
}

impl TailLayout {
    /// A layout with no attribute arrays.
    pub fn empty() -> Self {
        Self::default()
    }

    /// A layout from an ordered list of arrays.
    pub fn new(arrays: Vec<AttributeSpec>) -> Self {
        Self { arrays }
    }

    /// The layout used by the reference stream tracer: normals,
    /// vorticity, rotation, angular velocity and integration time.
    pub fn stream_tracer() -> Self {
        Self::new(vec![
            AttributeSpec::new("Normals", 3),
            AttributeSpec::new("Vorticity", 3),
            AttributeSpec::new("Rotation", 1),
            AttributeSpec::new("AngularVelocity", 1),
            AttributeSpec::new("IntegrationTime", 1),
        ])
    }

    /// The arrays, in order.
    pub fn arrays(&self) -> &[AttributeSpec] {
        &self.arrays
    }

    /// Total number of `f64` values per point.
    pub fn width(&self) -> usize {
        self.arrays.iter().map(|a| a.components).sum()
    }

    /// Offset and component count of a named array.
    pub fn locate(&self, name: &str) -> Option<(usize, usize)> {
        let mut offset = 0;
        for a in &self.arrays {
            if a.name == name {
                return Some((offset, a.components));
            }
            offset += a.components;
        }
        None
    }
}

/// A point on a trace with its interpolated attribute values.
#[derive(Clone, Debug, PartialEq)]
pub struct TracePoint {
    /// Position.
    pub position: Point3,
    /// Attribute values, `TailLayout::width()` long.
    pub values: AttributeValues,
}

impl TracePoint {
    /// Construct a point.
    pub fn new(position: Point3, values: AttributeValues) -> Self {
        Self { position, values }
    }

    /// A point carrying no attributes.
    pub fn bare(position: Point3) -> Self {
        Self {
            position,
            values: AttributeValues::new(),
        }
    }

    /// Slice of one named attribute, if the layout has it.
    pub fn attribute<'a>(&'a self, layout: &TailLayout, name: &str) -> Option<&'a [f64]> {
        let (offset, len) = layout.locate(name)?;
        self.values.get(offset..offset + len)
    }
}
