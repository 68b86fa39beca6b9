//! Lathe: a piecewise profile curve revolved about the local y-axis (spec
//! §4.F), grounded on `original_source/source/core/shape/lathe.cpp`'s
//! ray-substitution/back-substitution structure.
//!
//! Every segment stores its profile as cubic-in-`s` coefficients for both
//! `r(s)` and `y(s)` (spec §3: "each segment stores cubic coefficients
//! (A,B,C,D) per dimension") regardless of the input spline family — linear
//! and quadratic segments just have their higher-order coefficients zero.
//! Substituting the revolved profile into the ray equation and eliminating
//! `t` then always yields a degree-≤6 polynomial in `s`; `solve_poly`
//! already degrades gracefully when the leading coefficients vanish, so one
//! substitution routine serves every segment type — the degree-2/4/6 split
//! by spline family falls out of that degradation rather than needing to be
//! special-cased per family.

use raytracer_core::bounding::BCyl;
use raytracer_core::error::ConstructionError;
use raytracer_core::geometry::{normal3, point2, point3, vector3, Normal3f, Point2f, Point3f, Ray};
use raytracer_core::intersection::Intersection;
use raytracer_core::object::Shape;
use raytracer_core::pbrt::{Float, SHADOW_EPSILON};
use raytracer_core::poly::solve_poly;

/// The spline family a profile was authored in; only affects how control
/// points are converted to cubic coefficients at construction time.
#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub enum SplineType {
    Linear,
    Quadratic,
    CubicSpline,
    Bezier,
}

/// Cubic-in-`s` coefficients for one scalar profile dimension, highest
/// degree first: `a*s^3 + b*s^2 + c*s + d`.
#[derive(Copy, Clone, Debug, Default)]
struct Cubic {
    a: Float,
    b: Float,
    c: Float,
    d: Float,
}

impl Cubic {
    fn eval(&self, s: Float) -> Float {
        ((self.a * s + self.b) * s + self.c) * s + self.d
    }

    fn deriv(&self, s: Float) -> Float {
        (3.0 * self.a * s + 2.0 * self.b) * s + self.c
    }

    /// Coefficients as `[s^3, s^2, s^1, s^0]`, `solve_poly`'s convention.
    fn coeffs(&self) -> [Float; 4] {
        [self.a, self.b, self.c, self.d]
    }
}

struct Segment {
    r: Cubic,
    y: Cubic,
}

pub struct Lathe {
    segments: Vec<Segment>,
    bcyl: BCyl,
    inverted: bool,
    id: u64,
}

impl Lathe {
    /// Build a lathe from per-segment profile control points in `(r, y)`
    /// space. `points_per_segment` is 2 for linear, 3 for quadratic, 4 for
    /// cubic/Bézier (spec §3).
    pub fn new(
        spline_type: SplineType,
        segments_points: &[Vec<Point2f>],
        inverted: bool,
        id: u64,
    ) -> Result<Self, ConstructionError> {
        let min_points = match spline_type {
            SplineType::Linear => 2,
            SplineType::Quadratic => 3,
            SplineType::CubicSpline | SplineType::Bezier => 4,
        };
        if segments_points.is_empty() {
            return Err(ConstructionError::BadSplinePointCount { min: 1, actual: 0 });
        }

        let mut segments = Vec::with_capacity(segments_points.len());
        for pts in segments_points {
            if pts.len() < min_points {
                return Err(ConstructionError::BadSplinePointCount {
                    min: min_points,
                    actual: pts.len(),
                });
            }
            segments.push(build_segment(spline_type, pts));
        }

        let bcyl_segments: Vec<(Float, Float, Float, Float)> = segments
            .iter()
            .map(|seg| {
                let (y_lo, y_hi) = extrema(&seg.y);
                let (r_lo, r_hi) = extrema(&seg.r);
                let (r_lo_abs, r_hi_abs) = (r_lo.abs().min(r_hi.abs()), r_lo.abs().max(r_hi.abs()));
                (r_lo_abs, r_hi_abs, y_lo, y_hi)
            })
            .collect();
        let bcyl = BCyl::build(&bcyl_segments);

        Ok(Self { segments, bcyl, inverted, id })
    }

    fn theta_of(x: Float, z: Float) -> Float {
        z.atan2(x)
    }
}

/// Evaluate `cubic` at `s=0,1` and at any derivative roots inside `(0,1)`,
/// returning `(min, max)` over that set (spec §3: "BCyl built from
/// per-segment extremal r and y").
fn extrema(cubic: &Cubic) -> (Float, Float) {
    let mut lo = cubic.eval(0.0).min(cubic.eval(1.0));
    let mut hi = cubic.eval(0.0).max(cubic.eval(1.0));
    // Derivative is quadratic: 3a s^2 + 2b s + c = 0.
    if let Some((t0, t1)) = raytracer_core::poly::solve_quadratic(3.0 * cubic.a, 2.0 * cubic.b, cubic.c) {
        for t in [t0, t1] {
            if (0.0..=1.0).contains(&t) {
                let v = cubic.eval(t);
                lo = lo.min(v);
                hi = hi.max(v);
            }
        }
    }
    (lo, hi)
}

fn build_segment(spline_type: SplineType, pts: &[Point2f]) -> Segment {
    match spline_type {
        SplineType::Linear => {
            let (p0, p1) = (pts[0], pts[1]);
            Segment {
                r: Cubic { a: 0.0, b: 0.0, c: p1.x - p0.x, d: p0.x },
                y: Cubic { a: 0.0, b: 0.0, c: p1.y - p0.y, d: p0.y },
            }
        }
        SplineType::Quadratic => {
            let (p0, p1, p2) = (pts[0], pts[1], pts[2]);
            Segment {
                r: Cubic {
                    a: 0.0,
                    b: p0.x - 2.0 * p1.x + p2.x,
                    c: 2.0 * (p1.x - p0.x),
                    d: p0.x,
                },
                y: Cubic {
                    a: 0.0,
                    b: p0.y - 2.0 * p1.y + p2.y,
                    c: 2.0 * (p1.y - p0.y),
                    d: p0.y,
                },
            }
        }
        SplineType::CubicSpline => {
            // Catmull-Rom through p1..p2 using p0, p3 as tangent handles.
            let (p0, p1, p2, p3) = (pts[0], pts[1], pts[2], pts[3]);
            Segment {
                r: Cubic {
                    a: 0.5 * (-p0.x + 3.0 * p1.x - 3.0 * p2.x + p3.x),
                    b: 0.5 * (2.0 * p0.x - 5.0 * p1.x + 4.0 * p2.x - p3.x),
                    c: 0.5 * (-p0.x + p2.x),
                    d: p1.x,
                },
                y: Cubic {
                    a: 0.5 * (-p0.y + 3.0 * p1.y - 3.0 * p2.y + p3.y),
                    b: 0.5 * (2.0 * p0.y - 5.0 * p1.y + 4.0 * p2.y - p3.y),
                    c: 0.5 * (-p0.y + p2.y),
                    d: p1.y,
                },
            }
        }
        SplineType::Bezier => {
            let (p0, p1, p2, p3) = (pts[0], pts[1], pts[2], pts[3]);
            Segment {
                r: Cubic {
                    a: -p0.x + 3.0 * p1.x - 3.0 * p2.x + p3.x,
                    b: 3.0 * (p0.x - 2.0 * p1.x + p2.x),
                    c: 3.0 * (p1.x - p0.x),
                    d: p0.x,
                },
                y: Cubic {
                    a: -p0.y + 3.0 * p1.y - 3.0 * p2.y + p3.y,
                    b: 3.0 * (p0.y - 2.0 * p1.y + p2.y),
                    c: 3.0 * (p1.y - p0.y),
                    d: p0.y,
                },
            }
        }
    }
}

fn poly_mul4(a: [Float; 4], b: [Float; 4]) -> [Float; 7] {
    let mut out = [0.0; 7];
    for (i, ai) in a.iter().enumerate() {
        for (j, bj) in b.iter().enumerate() {
            out[i + j] += ai * bj;
        }
    }
    out
}

fn poly_add7(a: [Float; 7], b: [Float; 7]) -> [Float; 7] {
    let mut out = [0.0; 7];
    for i in 0..7 {
        out[i] = a[i] + b[i];
    }
    out
}

fn poly_sub7(a: [Float; 7], b: [Float; 7]) -> [Float; 7] {
    let mut out = [0.0; 7];
    for i in 0..7 {
        out[i] = a[i] - b[i];
    }
    out
}

impl Segment {
    /// Solve for the spline parameters `s` at which the revolved profile
    /// meets `ray` (object space), each paired with the ray parameter `t`.
    fn solve(&self, ray: &Ray, sturm: bool) -> Vec<(Float, Float)> {
        let mut out = Vec::new();
        let p = ray.o;
        let d = ray.d;

        if d.y.abs() > 1e-9 {
            let y_minus_py = [self.y.a, self.y.b, self.y.c, self.y.d - p.y];
            let t_coeffs = [
                y_minus_py[0] / d.y,
                y_minus_py[1] / d.y,
                y_minus_py[2] / d.y,
                y_minus_py[3] / d.y,
            ];
            let x_coeffs = [
                d.x * t_coeffs[0],
                d.x * t_coeffs[1],
                d.x * t_coeffs[2],
                d.x * t_coeffs[3] + p.x,
            ];
            let z_coeffs = [
                d.z * t_coeffs[0],
                d.z * t_coeffs[1],
                d.z * t_coeffs[2],
                d.z * t_coeffs[3] + p.z,
            ];
            let x2 = poly_mul4(x_coeffs, x_coeffs);
            let z2 = poly_mul4(z_coeffs, z_coeffs);
            let r2 = poly_mul4(self.r.coeffs(), self.r.coeffs());
            let final_coeffs = poly_sub7(poly_add7(x2, z2), r2);

            let roots = solve_poly(6, &final_coeffs, sturm, -1.0);
            for s in roots {
                if (0.0..=1.0).contains(&s) {
                    let t = (self.y.eval(s) - p.y) / d.y;
                    if t > SHADOW_EPSILON {
                        out.push((s, t));
                    }
                }
            }
        } else {
            // |Dy| ~ 0: y is fixed along the ray, so solve y(s) = p.y first.
            let y_minus_py = [self.y.a, self.y.b, self.y.c, self.y.d - p.y];
            let roots = solve_poly(3, &y_minus_py, false, -1.0);
            for s in roots {
                if !(0.0..=1.0).contains(&s) {
                    continue;
                }
                let r = self.r.eval(s);
                let a = d.x * d.x + d.z * d.z;
                let b = 2.0 * (p.x * d.x + p.z * d.z);
                let c = p.x * p.x + p.z * p.z - r * r;
                if let Some((t0, t1)) = raytracer_core::poly::solve_quadratic(a, b, c) {
                    for t in [t0, t1] {
                        if t > SHADOW_EPSILON {
                            out.push((s, t));
                        }
                    }
                }
            }
        }
        out
    }
}

impl Shape for Lathe {
    fn all_intersections(&self, ray: &Ray, out: &mut Vec<Intersection>) {
        let candidates = self.bcyl.intersect(ray.o, ray.d);
        for hit in &candidates {
            let seg = &self.segments[hit.element];
            for (s, t) in seg.solve(ray, true) {
                let p = ray.at(t);
                let theta = Lathe::theta_of(p.x, p.z);
                let dr_ds = seg.r.deriv(s);
                let dy_ds = seg.y.deriv(s);
                let n = vector3(-dy_ds * theta.cos(), dr_ds, -dy_ds * theta.sin());
                let normal = if n.length_squared() < 1e-20 {
                    normal3(0.0, 1.0, 0.0)
                } else {
                    normal3(n.x, n.y, n.z).normalize()
                };
                let uv = point2(
                    (theta / raytracer_core::pbrt::TWO_PI + 1.0) % 1.0,
                    (s + hit.element as Float) / self.segments.len() as Float,
                );
                out.push(Intersection {
                    t,
                    point: p,
                    normal,
                    uv,
                    shape_id: self.id,
                    interior: None,
                    entering: true,
                });
            }
        }
    }

    fn inside(&self, p: Point3f) -> bool {
        let radial = (p.x * p.x + p.z * p.z).sqrt();
        let mut crossings = 0;
        for seg in &self.segments {
            let y_minus_py = [seg.y.a, seg.y.b, seg.y.c, seg.y.d - p.y];
            let roots = solve_poly(3, &y_minus_py, false, -1.0);
            for s in roots {
                if (0.0..=1.0).contains(&s) && seg.r.eval(s) >= radial {
                    crossings += 1;
                }
            }
        }
        (crossings % 2 == 1) ^ self.inverted
    }

    fn normal(&self, hit: &Intersection) -> Normal3f {
        hit.normal
    }

    fn uvcoord(&self, hit: &Intersection) -> Point2f {
        hit.uv
    }

    fn transform(&self) -> Option<&raytracer_core::geometry::Matrix4x3> {
        None
    }

    fn compute_bbox(&self) -> raytracer_core::geometry::Bounds3f {
        let mut bbox = raytracer_core::geometry::Bounds3f::EMPTY;
        for seg in &self.segments {
            let (y_lo, y_hi) = extrema(&seg.y);
            let (r_lo, r_hi) = extrema(&seg.r);
            let r_max = r_lo.abs().max(r_hi.abs());
            bbox = bbox.union_point(point3(-r_max, y_lo, -r_max));
            bbox = bbox.union_point(point3(r_max, y_hi, r_max));
        }
        bbox
    }

    fn shape_id(&self) -> u64 {
        self.id
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use raytracer_core::geometry::RayKind;

    fn cylinder(id: u64) -> Lathe {
        // Square profile (1,0)-(1,1)-(0,1)-(0,0) revolved = cylinder with caps.
        let profile = vec![
            vec![point2(1.0, 0.0), point2(1.0, 1.0)],
            vec![point2(1.0, 1.0), point2(0.0, 1.0)],
            vec![point2(0.0, 1.0), point2(0.0, 0.0)],
        ];
        Lathe::new(SplineType::Linear, &profile, false, id).unwrap()
    }

    #[test]
    fn ray_through_axis_hits_top_and_bottom_caps() {
        let lathe = cylinder(1);
        let ray = Ray::new(point3(0.0, -1.0, 0.0), vector3(0.0, 1.0, 0.0), RayKind::Primary);
        let mut hits = Vec::new();
        lathe.all_intersections(&ray, &mut hits);
        assert!(hits.len() >= 2, "expected at least 2 hits, got {}", hits.len());
    }

    #[test]
    fn inside_center_of_cylinder_is_true() {
        let lathe = cylinder(1);
        assert!(lathe.inside(point3(0.0, 0.5, 0.0)));
        assert!(!lathe.inside(point3(2.0, 0.5, 0.0)));
    }

    #[test]
    fn ray_missing_cylinder_has_no_hits() {
        let lathe = cylinder(1);
        let ray = Ray::new(point3(5.0, -1.0, 0.0), vector3(0.0, 1.0, 0.0), RayKind::Primary);
        let mut hits = Vec::new();
        lathe.all_intersections(&ray, &mut hits);
        assert!(hits.is_empty());
    }
}
