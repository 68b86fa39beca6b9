//! Bounding-volume acceleration structures used by the spline shapes
//! (lathe, surface of revolution) to cheaply reject/accept ray intervals
//! before the expensive polynomial solve (spec §4.D).

mod bcyl;

pub use bcyl::{BCyl, BCylHit};
