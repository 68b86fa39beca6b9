//! Coordinate axes.

/// A single coordinate axis, used to index `Vector3`/`Point3`/`Normal3` and to
/// select the dominant axis for numerically stable computations.
#[derive(Copy, Clone, Debug, Eq, PartialEq)]
pub enum Axis {
    X,
    Y,
    Z,
}
