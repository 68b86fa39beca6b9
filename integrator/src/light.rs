//! Illumination-volume geometry for the media integrator's lit-interval
//! construction (spec §4.I step 2). This crate only needs enough of a light
//! source to know *where along a ray* it illuminates and what phase-function
//! colour it contributes — full photometric sampling (`sample_li`/`sample_le`
//! style APIs) belongs to the surface-shading side of the renderer and is out
//! of scope here.

use raytracer_core::geometry::{Colour3, Point3f, Vector3f};
use raytracer_core::pbrt::Float;
use raytracer_core::poly::solve_quadratic;

use crate::shadow::LightId;

#[derive(Copy, Clone, Debug, PartialEq)]
pub enum LightKind {
    Point,
    /// `falloff` is `cos(halfangle)` of the cone (spec §4.I).
    Spot { falloff: Float },
    /// `falloff` is the illuminated cylinder's radius (spec §4.I).
    Cylinder { falloff: Float },
}

#[derive(Clone, Debug)]
pub struct Light {
    pub id: LightId,
    pub kind: LightKind,
    pub position: Point3f,
    /// Normalized axis for `Spot`/`Cylinder`; ignored for `Point`.
    pub direction: Vector3f,
    pub colour: Colour3,
    /// Whether this light participates in media in-scatter at all (spec
    /// §4.I step 2's "light source with `media_interaction`").
    pub media_interaction: bool,
}

impl Light {
    /// The sub-interval of `ray`'s parameter `t ∈ [0, d_max]` lit by this
    /// light, or `None` if the light never illuminates that segment.
    pub fn illumination_interval(&self, origin: Point3f, dir: Vector3f, d_max: Float) -> Option<(Float, Float)> {
        let interval = match self.kind {
            LightKind::Point => Some((0.0, d_max)),
            LightKind::Spot { falloff } => spot_interval(self.position, self.direction, falloff, origin, dir),
            LightKind::Cylinder { falloff } => cylinder_interval(self.position, self.direction, falloff, origin, dir),
        }?;
        let (lo, hi) = (interval.0.max(0.0), interval.1.min(d_max));
        if hi <= lo {
            None
        } else {
            Some((lo, hi))
        }
    }
}

fn spot_interval(
    apex: Point3f,
    axis: Vector3f,
    falloff: Float,
    origin: Point3f,
    dir: Vector3f,
) -> Option<(Float, Float)> {
    use raytracer_core::pbrt::Dot;

    let oa = origin - apex;
    let ca = falloff * falloff;
    let oa_axis = oa.dot(&axis);
    let d_axis = dir.dot(&axis);
    let oa_d = oa.dot(&dir);
    let oa2 = oa.dot(&oa);
    let d2 = dir.dot(&dir);

    let a = d_axis * d_axis - ca * d2;
    let b = 2.0 * (oa_axis * d_axis - ca * oa_d);
    let c = oa_axis * oa_axis - ca * oa2;

    let origin_inside = oa_axis > 0.0 && oa_axis * oa_axis >= ca * oa2;

    let (t0, t1) = solve_quadratic(a, b, c)?;
    let (lo, hi) = (t0.min(t1), t0.max(t1));

    // Only the nappe on the light's forward side is the actual spotlight;
    // reject roots behind the apex along the cone axis.
    let forward = |t: Float| oa_axis + t * d_axis > 0.0;
    match (forward(lo), forward(hi)) {
        (true, true) => Some((lo, hi)),
        (false, true) => Some((if origin_inside { 0.0 } else { hi }, hi)),
        (true, false) => Some((lo, lo)),
        (false, false) => None,
    }
}

fn cylinder_interval(
    axis_point: Point3f,
    axis: Vector3f,
    radius: Float,
    origin: Point3f,
    dir: Vector3f,
) -> Option<(Float, Float)> {
    use raytracer_core::pbrt::Dot;

    let oa = origin - axis_point;
    let oa_perp = oa - axis * oa.dot(&axis);
    let d_perp = dir - axis * dir.dot(&axis);

    let a = d_perp.dot(&d_perp);
    let b = 2.0 * oa_perp.dot(&d_perp);
    let c = oa_perp.dot(&oa_perp) - radius * radius;

    if a.abs() < 1e-14 {
        return if c <= 0.0 {
            Some((Float::NEG_INFINITY, Float::INFINITY))
        } else {
            None
        };
    }
    let (t0, t1) = solve_quadratic(a, b, c)?;
    Some((t0.min(t1), t0.max(t1)))
}

#[cfg(test)]
mod tests {
    use super::*;
    use raytracer_core::geometry::{point3, vector3};

    #[test]
    fn point_light_illuminates_whole_segment() {
        let light = Light {
            id: 0,
            kind: LightKind::Point,
            position: point3(0.0, 5.0, 0.0),
            direction: vector3(0.0, -1.0, 0.0),
            colour: Colour3::WHITE,
            media_interaction: true,
        };
        let (lo, hi) = light
            .illumination_interval(point3(0.0, 0.0, 0.0), vector3(0.0, 1.0, 0.0), 10.0)
            .unwrap();
        assert_eq!((lo, hi), (0.0, 10.0));
    }

    #[test]
    fn cylinder_light_clips_to_radius() {
        let light = Light {
            id: 0,
            kind: LightKind::Cylinder { falloff: 1.0 },
            position: point3(0.0, 0.0, 0.0),
            direction: vector3(0.0, 1.0, 0.0),
            colour: Colour3::WHITE,
            media_interaction: true,
        };
        // A ray along x=0.5 parallel to the axis stays inside the radius-1
        // tube for its whole length.
        let got = light.illumination_interval(point3(0.5, 0.0, 0.0), vector3(0.0, 1.0, 0.0), 10.0);
        assert_eq!(got, Some((0.0, 10.0)));

        // A ray outside the tube entirely never enters it.
        let miss = light.illumination_interval(point3(5.0, 0.0, 0.0), vector3(0.0, 1.0, 0.0), 10.0);
        assert_eq!(miss, None);
    }

    #[test]
    fn spot_light_restricts_to_forward_cone() {
        let light = Light {
            id: 0,
            kind: LightKind::Spot { falloff: (std::f64::consts::FRAC_PI_4).cos() },
            position: point3(0.0, 0.0, 0.0),
            direction: vector3(0.0, 1.0, 0.0),
            colour: Colour3::WHITE,
            media_interaction: true,
        };
        // Straight down the cone axis is always lit.
        let got = light.illumination_interval(point3(0.0, 0.0, 0.0), vector3(0.0, 1.0, 0.0), 10.0);
        assert!(got.is_some());

        // Straight down the back of the cone axis never is.
        let behind = light.illumination_interval(point3(0.0, 0.0, 0.0), vector3(0.0, -1.0, 0.0), 10.0);
        assert!(behind.is_none());
    }
}
