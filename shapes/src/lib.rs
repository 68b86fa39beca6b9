//! Finite primitives built on `raytracer-core`'s `Shape` trait: the bicubic
//! Bézier patch, the lathe (piecewise-spline surface of revolution) and the
//! plain cubic-profile surface of revolution.

pub mod bicubic;
pub mod lathe;
pub mod sor;

pub use bicubic::{BicubicPatch, ControlNet, SubdivisionStrategy};
pub use lathe::{Lathe, SplineType};
pub use sor::{Sor, SorSegmentSpec};
