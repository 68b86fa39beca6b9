//! Rays (spec §3/§4.C).

#![allow(dead_code)]
use super::{Point3f, Vector3f};
use crate::error::RayError;
use crate::interior::Interior;
use crate::pbrt::{Float, INFINITY};
use arrayvec::ArrayVec;
use std::sync::Arc;

/// Maximum depth of the nested-interior list carried on a `Ray` (spec §3).
pub const MAX_CONTAINING_OBJECTS: usize = 100;

/// What kind of ray this is, used to gate media interaction, photon mapping,
/// etc. (spec §3).
#[derive(Copy, Clone, Debug, Eq, PartialEq)]
pub enum RayKind {
    Primary,
    Reflection,
    Refraction,
    Subsurface,
    ShadowTest,
}

/// Orthogonal boolean flags a ray may carry (spec §3).
#[derive(Copy, Clone, Debug, Default, PartialEq)]
pub struct RayFlags {
    pub photon: bool,
    pub radiosity: bool,
    pub monochromatic: bool,
    pub pretrace: bool,
}

/// A ray being traced through the scene, carrying the nested-interior stack
/// needed to resolve overlapping transparent/refractive media (spec §3/§4.C).
#[derive(Clone)]
pub struct Ray {
    pub o: Point3f,
    pub d: Vector3f,
    pub t_max: Float,
    pub time: Float,
    pub kind: RayKind,
    pub flags: RayFlags,
    /// Ordered set of `Interior`s the ray's origin is nested inside; the
    /// topmost entry is the innermost enclosing material (spec §3 invariant).
    interiors: ArrayVec<Arc<Interior>, MAX_CONTAINING_OBJECTS>,
    hollow: bool,
    /// Wavelength band when `flags.monochromatic` is set, else `None`.
    pub spectral_band: Option<Float>,
}

impl Ray {
    pub fn new(o: Point3f, d: Vector3f, kind: RayKind) -> Self {
        Self {
            o,
            d,
            t_max: INFINITY,
            time: 0.0,
            kind,
            flags: RayFlags::default(),
            interiors: ArrayVec::new(),
            hollow: true,
            spectral_band: None,
        }
    }

    pub fn at(&self, t: Float) -> Point3f {
        self.o + self.d * t
    }

    /// Push an `Interior` onto the nested list. Fails if the list is already
    /// at `MAX_CONTAINING_OBJECTS` (spec §4.C).
    pub fn enter(&mut self, interior: Arc<Interior>) -> Result<(), RayError> {
        if self.interiors.is_full() {
            return Err(RayError::TooManyContainingObjects);
        }
        self.interiors.push(interior);
        self.recompute_hollow();
        Ok(())
    }

    /// Remove the entry at `position`, shifting higher entries down. Fails
    /// if `position` is out of range.
    pub fn exit(&mut self, position: usize) -> Result<(), RayError> {
        if position >= self.interiors.len() {
            return Err(RayError::ExitFromEmptyList);
        }
        self.interiors.remove(position);
        self.recompute_hollow();
        Ok(())
    }

    /// Returns the index of `interior` in the nested list, comparing by
    /// pointer identity (the same `Interior` may be legitimately entered
    /// twice through different primitives, so this finds the most recent).
    pub fn contains(&self, interior: &Arc<Interior>) -> Option<usize> {
        self.interiors
            .iter()
            .rposition(|i| Arc::ptr_eq(i, interior))
    }

    /// The innermost `Interior` the ray's origin is nested in, if any.
    pub fn innermost_interior(&self) -> Option<&Arc<Interior>> {
        self.interiors.last()
    }

    pub fn nested_depth(&self) -> usize {
        self.interiors.len()
    }

    /// `true` iff every `Interior` the ray is nested in is `hollow` (or the
    /// list is empty) — spec §3: "derived boolean `hollow` = ∧ over list".
    pub fn is_hollow(&self) -> bool {
        self.hollow
    }

    fn recompute_hollow(&mut self) {
        self.hollow = self.interiors.iter().all(|i| i.hollow);
    }

    /// Spawn a secondary ray of the given kind from this ray's current
    /// nested-interior state (refraction/reflection/shadow rays inherit it).
    pub fn spawn(&self, o: Point3f, d: Vector3f, kind: RayKind) -> Self {
        let mut r = Ray::new(o, d, kind);
        r.time = self.time;
        r.flags = self.flags;
        r.interiors = self.interiors.clone();
        r.hollow = self.hollow;
        r
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::geometry::{point3, vector3};
    use crate::interior::Interior;

    fn dummy_interior(hollow: bool) -> Arc<Interior> {
        Arc::new(Interior::new(1.0, 0.0, 0.0, 1.0, hollow))
    }

    #[test]
    fn enter_exit_round_trips() {
        let mut r = Ray::new(point3(0.0, 0.0, 0.0), vector3(0.0, 0.0, 1.0), RayKind::Primary);
        let i1 = dummy_interior(true);
        let i2 = dummy_interior(false);
        r.enter(i1.clone()).unwrap();
        r.enter(i2.clone()).unwrap();
        assert_eq!(r.nested_depth(), 2);
        assert!(!r.is_hollow());
        assert_eq!(r.contains(&i2), Some(1));
        r.exit(0).unwrap();
        assert_eq!(r.nested_depth(), 1);
        assert!(!r.is_hollow());
        assert_eq!(r.contains(&i2), Some(0));
    }

    #[test]
    fn hollow_is_conjunction() {
        let mut r = Ray::new(point3(0.0, 0.0, 0.0), vector3(0.0, 0.0, 1.0), RayKind::Primary);
        assert!(r.is_hollow());
        r.enter(dummy_interior(true)).unwrap();
        assert!(r.is_hollow());
        r.enter(dummy_interior(true)).unwrap();
        assert!(r.is_hollow());
    }

    #[test]
    fn exit_out_of_range_errors() {
        let mut r = Ray::new(point3(0.0, 0.0, 0.0), vector3(0.0, 0.0, 1.0), RayKind::Primary);
        assert!(matches!(r.exit(0), Err(RayError::ExitFromEmptyList)));
    }

    #[test]
    fn enter_beyond_capacity_errors() {
        let mut r = Ray::new(point3(0.0, 0.0, 0.0), vector3(0.0, 0.0, 1.0), RayKind::Primary);
        for _ in 0..MAX_CONTAINING_OBJECTS {
            r.enter(dummy_interior(true)).unwrap();
        }
        assert!(matches!(
            r.enter(dummy_interior(true)),
            Err(RayError::TooManyContainingObjects)
        ));
    }
}
