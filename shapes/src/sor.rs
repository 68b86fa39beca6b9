//! Surface of Revolution (spec §4.G), grounded on
//! `original_source/source/core/shape/sor.cpp`: a stack of segments each
//! storing `r²(y) = A·y³ + B·y² + C·y + D` directly (one degree lower than
//! lathe's profile, since SOR's profile is monotone-in-y by construction per
//! segment), plus optional base/cap disc planes when the surface is closed.
//!
//! Segment coefficients are supplied pre-fitted by the caller (spec §6:
//! constructors "accept arrays of control points and finalise internal
//! data" — the natural-cubic-spline fit itself is scene-construction
//! tooling, out of scope here per spec §1's parser exclusion).
//!
//! Hit classification (curve vs. base-plane vs. cap-plane) is carried in
//! the `v` coordinate rather than a separate tag, the same convention
//! `Lathe` uses: `v` is the curve's segment-fraction in `(0, 1)`, biased to
//! `-1` for a base-plane hit and `+1` for a cap-plane hit.

use raytracer_core::bounding::BCyl;
use raytracer_core::error::ConstructionError;
use raytracer_core::geometry::{normal3, point2, point3, vector3, Normal3f, Point2f, Point3f, Ray};
use raytracer_core::intersection::Intersection;
use raytracer_core::object::Shape;
use raytracer_core::pbrt::{Float, SHADOW_EPSILON};
use raytracer_core::poly::solve_poly;

#[derive(Copy, Clone, Debug)]
pub struct SorSegmentSpec {
    pub a: Float,
    pub b: Float,
    pub c: Float,
    pub d: Float,
    pub y1: Float,
    pub y2: Float,
}

struct Segment {
    a: Float,
    b: Float,
    c: Float,
    d: Float,
    y1: Float,
    y2: Float,
}

impl Segment {
    fn r2(&self, y: Float) -> Float {
        ((self.a * y + self.b) * y + self.c) * y + self.d
    }

    /// `d(r²)/dy`, used by the curve-hit normal.
    fn dr2_dy(&self, y: Float) -> Float {
        (3.0 * self.a * y + 2.0 * self.b) * y + self.c
    }
}

pub struct Sor {
    segments: Vec<Segment>,
    bcyl: BCyl,
    closed: bool,
    base_radius2: Float,
    cap_radius2: Float,
    inverted: bool,
    id: u64,
}

impl Sor {
    pub fn new(
        specs: &[SorSegmentSpec],
        closed: bool,
        base_radius2: Float,
        cap_radius2: Float,
        inverted: bool,
        id: u64,
    ) -> Result<Self, ConstructionError> {
        if specs.is_empty() {
            return Err(ConstructionError::BadSplinePointCount { min: 1, actual: 0 });
        }
        let segments: Vec<Segment> = specs
            .iter()
            .map(|s| Segment { a: s.a, b: s.b, c: s.c, d: s.d, y1: s.y1, y2: s.y2 })
            .collect();

        let bcyl_segments: Vec<(Float, Float, Float, Float)> = segments
            .iter()
            .map(|seg| {
                let r2_lo = seg.r2(seg.y1).min(seg.r2(seg.y2)).max(0.0);
                let r2_hi = seg.r2(seg.y1).max(seg.r2(seg.y2)).max(r2_lo);
                (r2_lo.sqrt(), r2_hi.sqrt(), seg.y1, seg.y2)
            })
            .collect();
        let bcyl = BCyl::build(&bcyl_segments);

        Ok(Self { segments, bcyl, closed, base_radius2, cap_radius2, inverted, id })
    }

    fn y_range(&self) -> (Float, Float) {
        (
            self.segments.iter().map(|s| s.y1).fold(Float::INFINITY, Float::min),
            self.segments.iter().map(|s| s.y2).fold(Float::NEG_INFINITY, Float::max),
        )
    }
}

impl Shape for Sor {
    fn all_intersections(&self, ray: &Ray, out: &mut Vec<Intersection>) {
        let p = ray.o;
        let d = ray.d;

        let candidates = self.bcyl.intersect(p, d);
        for hit in &candidates {
            let seg = &self.segments[hit.element];
            // (Px+tDx)^2 + (Pz+tDz)^2 = A*(Py+tDy)^3 + B*(...)^2 + C*(...) + D
            // is a cubic in t (the left side is quadratic, the right cubic).
            let a = d.x * d.x + d.z * d.z;
            let b = 2.0 * (p.x * d.x + p.z * d.z);
            let c = p.x * p.x + p.z * p.z;

            // Expand the right-hand side as a cubic in t via (Py + t*Dy)^k.
            let y0 = p.y;
            let dy = d.y;
            let y1c = [dy * dy * dy, 3.0 * y0 * dy * dy, 3.0 * y0 * y0 * dy, y0 * y0 * y0];
            let y2c = [dy * dy, 2.0 * y0 * dy, y0 * y0, 0.0];
            let rhs = [
                seg.a * y1c[0],
                seg.a * y1c[1] + seg.b * y2c[0],
                seg.a * y1c[2] + seg.b * y2c[1] + seg.c * dy,
                seg.a * y1c[3] + seg.b * y2c[2] + seg.c * y0 + seg.d,
            ];

            // lhs: a*t^2 + b*t + c  (degree 2, pad to degree 3 leading 0)
            let poly = [-rhs[0], a - rhs[1], b - rhs[2], c - rhs[3]];
            let roots = solve_poly(3, &poly, false, SHADOW_EPSILON);
            for t in roots {
                let y = y0 + t * dy;
                if y < seg.y1 || y > seg.y2 {
                    continue;
                }
                let pt = ray.at(t);
                let dr2dy = seg.dr2_dy(y);
                let n = vector3(pt.x, -0.5 * dr2dy, pt.z);
                let normal = if n.length_squared() < 1e-20 {
                    normal3(0.0, 1.0, 0.0)
                } else {
                    normal3(n.x, n.y, n.z).normalize()
                };
                let theta = pt.z.atan2(pt.x);
                let v = {
                    let idx = self.segments.iter().position(|s| std::ptr::eq(s, seg)).unwrap_or(0);
                    let local = (y - seg.y1) / (seg.y2 - seg.y1).max(1e-12);
                    (local + idx as Float) / self.segments.len() as Float
                };
                out.push(Intersection {
                    t,
                    point: pt,
                    normal,
                    uv: point2((theta / raytracer_core::pbrt::TWO_PI + 1.0) % 1.0, v),
                    shape_id: self.id,
                    interior: None,
                    entering: true,
                });
            }
        }

        if self.closed {
            let (y_lo, y_hi) = self.y_range();
            for (plane_y, radius2, is_base) in [(y_lo, self.base_radius2, true), (y_hi, self.cap_radius2, false)] {
                if d.y.abs() < 1e-12 {
                    continue;
                }
                let t = (plane_y - p.y) / d.y;
                if t <= SHADOW_EPSILON {
                    continue;
                }
                let pt = ray.at(t);
                if pt.x * pt.x + pt.z * pt.z > radius2 {
                    continue;
                }
                let ny = if is_base { -1.0 } else { 1.0 };
                out.push(Intersection {
                    t,
                    point: pt,
                    normal: normal3(0.0, ny, 0.0),
                    uv: point2(0.0, if is_base { -1.0 } else { 1.0 }),
                    shape_id: self.id,
                    interior: None,
                    entering: true,
                });
            }
        }
    }

    fn inside(&self, p: Point3f) -> bool {
        let radial2 = p.x * p.x + p.z * p.z;
        for seg in &self.segments {
            if p.y >= seg.y1 && p.y <= seg.y2 {
                return (radial2 <= seg.r2(p.y)) ^ self.inverted;
            }
        }
        self.inverted
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
            let r2_max = seg.r2(seg.y1).max(seg.r2(seg.y2)).max(0.0);
            let r = r2_max.sqrt();
            bbox = bbox.union_point(point3(-r, seg.y1, -r));
            bbox = bbox.union_point(point3(r, seg.y2, r));
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

    fn hemisphere(id: u64) -> Sor {
        // r^2 = 1 - y^2 on [0, 1], closed with a unit base disc at y=0.
        let spec = SorSegmentSpec { a: 0.0, b: -1.0, c: 0.0, d: 1.0, y1: 0.0, y2: 1.0 };
        Sor::new(&[spec], true, 1.0, 0.0, false, id).unwrap()
    }

    #[test]
    fn inside_matches_hemisphere_equation() {
        let sor = hemisphere(1);
        assert!(sor.inside(point3(0.0, 0.5, 0.0)));
        assert!(!sor.inside(point3(2.0, 0.5, 0.0)));
    }

    #[test]
    fn ray_down_axis_hits_curve_once_near_apex() {
        let sor = hemisphere(1);
        let ray = Ray::new(point3(0.0, -1.0, 0.0), vector3(0.0, 1.0, 0.0), RayKind::Primary);
        let mut hits = Vec::new();
        sor.all_intersections(&ray, &mut hits);
        let curve_hits: Vec<_> = hits.iter().filter(|h| (h.point.y - 1.0).abs() < 1e-4).collect();
        assert_eq!(curve_hits.len(), 1);
    }

    #[test]
    fn ray_missing_hemisphere_has_no_hits() {
        let sor = hemisphere(1);
        let ray = Ray::new(point3(5.0, -1.0, 0.0), vector3(0.0, 1.0, 0.0), RayKind::Primary);
        let mut hits = Vec::new();
        sor.all_intersections(&ray, &mut hits);
        assert!(hits.is_empty());
    }
}
