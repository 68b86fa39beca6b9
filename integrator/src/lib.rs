//! Monte-Carlo participating-media integrator (spec §4.I): phase functions,
//! the shadow/visibility seam the integrator calls through, the
//! illumination-volume geometry used to find lit sub-intervals, and the
//! integrator itself.

pub mod light;
pub mod media_integrator;
pub mod phase;
pub mod shadow;

pub use light::{Light, LightKind};
pub use media_integrator::integrate;
pub use shadow::{LightId, NullShadowTester, ShadowTester};
