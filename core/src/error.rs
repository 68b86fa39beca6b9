//! Error types (spec §7).
//!
//! Construction errors are reported to the parser as a single abortive error
//! with a location (spec §7) — modeled here as a `thiserror`-derived enum
//! propagated with `?`, never a non-local exit, per Design Notes §9
//! ("a single abortive error type propagated via result/exception; the core
//! never uses non-local exits at trace time"). Numerical degeneracies at
//! trace time are *not* errors — they are `None`/silent, per spec §7.

use thiserror::Error;

/// Errors raised while building a primitive/interior/media description.
#[derive(Debug, Error, PartialEq)]
pub enum ConstructionError {
    #[error("spline requires at least {min} control points, got {actual}")]
    BadSplinePointCount { min: usize, actual: usize },

    #[error("degenerate profile at segment {segment}: {reason}")]
    DegenerateProfile { segment: usize, reason: String },

    #[error("media integrator requires at least one sampling interval")]
    InsufficientSamplingIntervals,

    #[error("refraction nesting exceeded {max} levels")]
    TooManyNestedRefractions { max: usize },

    #[error("index {index} out of range (0..{len})")]
    SubscriptOutOfRange { index: usize, len: usize },
}

/// Errors raised mutating a `Ray`'s nested-interior list (spec §4.C).
#[derive(Debug, Error, PartialEq)]
pub enum RayError {
    #[error("ray nested-interior list exceeded MAX_CONTAINING_OBJECTS")]
    TooManyContainingObjects,

    #[error("attempted to exit an interior at an invalid list position")]
    ExitFromEmptyList,
}
