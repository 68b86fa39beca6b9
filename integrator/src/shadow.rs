//! Shadow/visibility seam (spec §4.I step 1): the media integrator needs to
//! know how far a sample point can see toward a light before the direct
//! lighting contribution it attenuates is itself shadowed. The concrete
//! scene-wide shadow test (intersecting every opaque primitive) lives
//! outside this crate; `ShadowTester` is the boundary the integrator calls
//! through, depending on a `Primitive`/occlusion trait object rather than a
//! concrete scene type.

use raytracer_core::geometry::{Colour3, Point3f, Vector3f};
use raytracer_core::pbrt::Float;

/// Identifies which light a shadow test is being performed against; opaque
/// to this crate beyond equality/ordering for interval bookkeeping.
pub type LightId = u64;

/// Re-entrant scene visibility query. A single `ShadowTester` is shared
/// across every sample the integrator draws along a ray, so implementations
/// must not assume single-use.
pub trait ShadowTester: Send + Sync {
    /// Distance from `origin` to the first opaque occluder along
    /// `direction` (normalized), and the colour filter light passing through
    /// any transparent surfaces along the way. `distance` is `None` when
    /// nothing blocks the light out to its own range.
    fn test_shadow(&self, light: LightId, origin: Point3f, direction: Vector3f) -> (Option<Float>, Colour3);
}

/// Always-unshadowed tester, used to unit-test the media integrator in
/// isolation from scene geometry (spec §8 scenarios 5/6).
pub struct NullShadowTester;

impl ShadowTester for NullShadowTester {
    fn test_shadow(&self, _light: LightId, _origin: Point3f, _direction: Vector3f) -> (Option<Float>, Colour3) {
        (None, Colour3::WHITE)
    }
}
