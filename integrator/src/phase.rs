//! Scattering phase functions (spec §4.I), one closed-form per `MediaType`.
//!
//! Each takes `cos_alpha`, the cosine of the angle between the incoming and
//! scattered directions, and returns the (unnormalized, same convention the
//! original renderer uses) phase-function value at that angle.

use raytracer_core::media::MediaType;
use raytracer_core::pbrt::Float;

/// Evaluate the phase function for `media_type` at `cos_alpha ∈ [-1, 1]`.
/// `eccentricity` is only consulted for `HenyeyGreenstein` (spec §3: `g`).
pub fn evaluate(media_type: MediaType, cos_alpha: Float, eccentricity: Float) -> Float {
    match media_type {
        MediaType::Isotropic => 1.0,
        MediaType::Rayleigh => rayleigh(cos_alpha),
        MediaType::MieHazy => mie_hazy(cos_alpha),
        MediaType::MieMurky => mie_murky(cos_alpha),
        MediaType::HenyeyGreenstein => henyey_greenstein(cos_alpha, eccentricity),
    }
}

fn rayleigh(cos_alpha: Float) -> Float {
    0.799 * (1.0 + cos_alpha * cos_alpha)
}

fn mie_hazy(cos_alpha: Float) -> Float {
    let h = (1.0 + cos_alpha) / 2.0;
    0.577 * (1.0 + 9.0 * h.powi(8))
}

fn mie_murky(cos_alpha: Float) -> Float {
    let h = (1.0 + cos_alpha) / 2.0;
    0.496 * (1.0 + 50.0 * h.powi(32))
}

fn henyey_greenstein(cos_alpha: Float, g: Float) -> Float {
    let g2 = g * g;
    (1.0 - g2) / (1.0 + g2 - 2.0 * g * cos_alpha).powf(1.5)
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;

    #[test]
    fn isotropic_is_constant() {
        assert_relative_eq!(evaluate(MediaType::Isotropic, -1.0, 0.0), 1.0);
        assert_relative_eq!(evaluate(MediaType::Isotropic, 1.0, 0.0), 1.0);
    }

    #[test]
    fn rayleigh_matches_closed_form_at_poles() {
        assert_relative_eq!(evaluate(MediaType::Rayleigh, 1.0, 0.0), 0.799 * 2.0, epsilon = 1e-12);
        assert_relative_eq!(evaluate(MediaType::Rayleigh, 0.0, 0.0), 0.799, epsilon = 1e-12);
    }

    #[test]
    fn mie_hazy_peaks_forward() {
        let forward = evaluate(MediaType::MieHazy, 1.0, 0.0);
        let backward = evaluate(MediaType::MieHazy, -1.0, 0.0);
        assert!(forward > backward);
        assert_relative_eq!(backward, 0.577, epsilon = 1e-12);
    }

    #[test]
    fn mie_murky_peaks_forward_more_sharply_than_hazy() {
        let murky_forward = evaluate(MediaType::MieMurky, 1.0, 0.0);
        let hazy_forward = evaluate(MediaType::MieHazy, 1.0, 0.0);
        assert!(murky_forward > hazy_forward);
    }

    #[test]
    fn henyey_greenstein_zero_eccentricity_is_isotropic() {
        assert_relative_eq!(henyey_greenstein(0.3, 0.0), 1.0, epsilon = 1e-12);
    }

    #[test]
    fn henyey_greenstein_positive_g_favors_forward_scattering() {
        let forward = henyey_greenstein(1.0, 0.5);
        let backward = henyey_greenstein(-1.0, 0.5);
        assert!(forward > backward);
    }
}
