//! Object dispatch (spec §4.J).
//!
//! `Shape` is a sealed capability set every primitive (bicubic patch, lathe,
//! SOR, and the composite wrappers below) implements identically, mirroring
//! `hackmad-pbrt-rust`'s `Primitive` trait + `GeometricPrimitive` dispatch
//! (`primitives/geometric_primitive.rs`) adapted from "primitive + material +
//! area light" to "shape + optional clip list + cached bound". Composite
//! `Transformed`/`Clip`/`Bound` are thin wrappers holding child
//! `Arc<dyn Shape>` handles rather than separate enum variants (Design Notes
//! §9: "composite operations become wrappers holding child handles").

use crate::geometry::{Bounds3f, Matrix4x3, Normal3f, Point2f, Ray};
use crate::intersection::Intersection;
use log::debug;
use std::sync::Arc;

/// Every traceable object in the scene implements this. `all_intersections`
/// appends every surface crossing along `ray` (not just the nearest) into
/// `out`, since CSG/clip resolution and media integration both need the
/// full crossing list (spec §4.B/§4.J).
pub trait Shape: Send + Sync {
    fn all_intersections(&self, ray: &Ray, out: &mut Vec<Intersection>);

    /// Point-containment test in the shape's own (untransformed) space,
    /// used by CSG and by the lathe/SOR `inside()` parity check.
    fn inside(&self, p: crate::geometry::Point3f) -> bool;

    fn normal(&self, hit: &Intersection) -> Normal3f;

    fn uvcoord(&self, hit: &Intersection) -> Point2f;

    /// The transform carried by this object, if any (spec §4.J: "every
    /// primitive may carry one").
    fn transform(&self) -> Option<&Matrix4x3>;

    fn compute_bbox(&self) -> Bounds3f;

    /// Stable identity used to label `Intersection::shape_id`.
    fn shape_id(&self) -> u64;
}

/// Applies a transform around an inner shape, mapping rays into the child's
/// local space and hits back out (spec §4.J: "every primitive may carry
/// one" transform).
pub struct Transformed {
    inner: Arc<dyn Shape>,
    xf: Matrix4x3,
    id: u64,
}

impl Transformed {
    pub fn new(inner: Arc<dyn Shape>, xf: Matrix4x3, id: u64) -> Self {
        Self { inner, xf, id }
    }
}

impl Shape for Transformed {
    fn all_intersections(&self, ray: &Ray, out: &mut Vec<Intersection>) {
        debug!("Transformed::all_intersections(): id={}", self.id);
        let local_o = self.xf.inv_transform_point(ray.o);
        let local_d = self.xf.inv_transform_vector(ray.d);
        let local_ray = Ray::new(local_o, local_d, ray.kind);
        let start = out.len();
        self.inner.all_intersections(&local_ray, out);
        for hit in &mut out[start..] {
            hit.point = self.xf.transform_point(hit.point);
            hit.normal = self.xf.transform_normal(hit.normal);
        }
    }

    fn inside(&self, p: crate::geometry::Point3f) -> bool {
        self.inner.inside(self.xf.inv_transform_point(p))
    }

    fn normal(&self, hit: &Intersection) -> Normal3f {
        self.xf.transform_normal(self.inner.normal(hit))
    }

    fn uvcoord(&self, hit: &Intersection) -> Point2f {
        self.inner.uvcoord(hit)
    }

    fn transform(&self) -> Option<&Matrix4x3> {
        Some(&self.xf)
    }

    fn compute_bbox(&self) -> Bounds3f {
        let b = self.inner.compute_bbox();
        let corners = [
            (b.min.x, b.min.y, b.min.z),
            (b.min.x, b.min.y, b.max.z),
            (b.min.x, b.max.y, b.min.z),
            (b.min.x, b.max.y, b.max.z),
            (b.max.x, b.min.y, b.min.z),
            (b.max.x, b.min.y, b.max.z),
            (b.max.x, b.max.y, b.min.z),
            (b.max.x, b.max.y, b.max.z),
        ];
        let mut out = Bounds3f::EMPTY;
        for (x, y, z) in corners {
            out = out.union_point(self.xf.transform_point(crate::geometry::point3(x, y, z)));
        }
        out
    }

    fn shape_id(&self) -> u64 {
        self.id
    }
}

/// Tests whether `ray` can possibly reach `bound`'s surface: either the ray
/// actually hits the bound, or the ray's origin already lies inside it (spec
/// §4.J: "bounding by requiring `ray_in_bound` — either the ray hits the
/// bound or its origin is inside").
fn ray_in_bound(bound: &dyn Shape, ray: &Ray) -> bool {
    if bound.inside(ray.o) {
        return true;
    }
    let mut probe = Vec::new();
    bound.all_intersections(ray, &mut probe);
    !probe.is_empty()
}

/// Wraps an inner shape with a cheap bounding shape: `all_intersections`
/// only runs the (possibly expensive) inner intersector when
/// [`ray_in_bound`] passes, the POV-Ray `bounded_by` early-reject (spec
/// §4.J). Containment (`inside`) is unaffected by the bound — it answers
/// for the inner shape only, since `bounded_by` is a trace-time
/// optimization, not a CSG operation.
pub struct Bound {
    inner: Arc<dyn Shape>,
    bound: Arc<dyn Shape>,
    id: u64,
}

impl Bound {
    pub fn new(inner: Arc<dyn Shape>, bound: Arc<dyn Shape>, id: u64) -> Self {
        Self { inner, bound, id }
    }
}

impl Shape for Bound {
    fn all_intersections(&self, ray: &Ray, out: &mut Vec<Intersection>) {
        debug!("Bound::all_intersections(): id={}", self.id);
        if ray_in_bound(&*self.bound, ray) {
            self.inner.all_intersections(ray, out);
        }
    }

    fn inside(&self, p: crate::geometry::Point3f) -> bool {
        self.inner.inside(p)
    }

    fn normal(&self, hit: &Intersection) -> Normal3f {
        self.inner.normal(hit)
    }

    fn uvcoord(&self, hit: &Intersection) -> Point2f {
        self.inner.uvcoord(hit)
    }

    fn transform(&self) -> Option<&Matrix4x3> {
        self.inner.transform()
    }

    fn compute_bbox(&self) -> Bounds3f {
        let inner = self.inner.compute_bbox();
        let bound = self.bound.compute_bbox();
        Bounds3f::new(
            crate::geometry::point3(
                inner.min.x.max(bound.min.x),
                inner.min.y.max(bound.min.y),
                inner.min.z.max(bound.min.z),
            ),
            crate::geometry::point3(
                inner.max.x.min(bound.max.x),
                inner.max.y.min(bound.max.y),
                inner.max.z.min(bound.max.z),
            ),
        )
    }

    fn shape_id(&self) -> u64 {
        self.id
    }
}

/// Intersects an inner shape only within the intersection of a list of
/// clipping shapes (all children must report `inside` at a hit for it to
/// survive) — POV-Ray's `clipped_by` applied to any object.
pub struct Clip {
    inner: Arc<dyn Shape>,
    clips: Vec<Arc<dyn Shape>>,
    id: u64,
}

impl Clip {
    pub fn new(inner: Arc<dyn Shape>, clips: Vec<Arc<dyn Shape>>, id: u64) -> Self {
        Self { inner, clips, id }
    }
}

impl Shape for Clip {
    fn all_intersections(&self, ray: &Ray, out: &mut Vec<Intersection>) {
        debug!("Clip::all_intersections(): id={}, clips={}", self.id, self.clips.len());
        let start = out.len();
        self.inner.all_intersections(ray, out);
        out.retain(|hit| {
            // Retain only hits that survive every clip shape.
            let at = ray.at(hit.t);
            self.clips.iter().all(|c| c.inside(at))
        });
        let _ = start;
    }

    fn inside(&self, p: crate::geometry::Point3f) -> bool {
        self.inner.inside(p) && self.clips.iter().all(|c| c.inside(p))
    }

    fn normal(&self, hit: &Intersection) -> Normal3f {
        self.inner.normal(hit)
    }

    fn uvcoord(&self, hit: &Intersection) -> Point2f {
        self.inner.uvcoord(hit)
    }

    fn transform(&self) -> Option<&Matrix4x3> {
        self.inner.transform()
    }

    fn compute_bbox(&self) -> Bounds3f {
        let mut bbox = self.inner.compute_bbox();
        for c in &self.clips {
            let cb = c.compute_bbox();
            bbox = Bounds3f::new(
                crate::geometry::point3(
                    bbox.min.x.max(cb.min.x),
                    bbox.min.y.max(cb.min.y),
                    bbox.min.z.max(cb.min.z),
                ),
                crate::geometry::point3(
                    bbox.max.x.min(cb.max.x),
                    bbox.max.y.min(cb.max.y),
                    bbox.max.z.min(cb.max.z),
                ),
            );
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
    use crate::geometry::{normal3, point2, point3, vector3, RayKind};
    use crate::pbrt::Float;

    struct UnitSphere;

    impl Shape for UnitSphere {
        fn all_intersections(&self, ray: &Ray, out: &mut Vec<Intersection>) {
            let oc = ray.o;
            let a = ray.d.length_squared();
            let b = 2.0 * (oc.x * ray.d.x + oc.y * ray.d.y + oc.z * ray.d.z);
            let c = oc.x * oc.x + oc.y * oc.y + oc.z * oc.z - 1.0;
            let disc = b * b - 4.0 * a * c;
            if disc < 0.0 {
                return;
            }
            let sqrt_disc = disc.sqrt();
            for t in [(-b - sqrt_disc) / (2.0 * a), (-b + sqrt_disc) / (2.0 * a)] {
                let p = ray.at(t);
                out.push(Intersection {
                    t,
                    point: p,
                    normal: normal3(p.x, p.y, p.z),
                    uv: point2(0.0, 0.0),
                    shape_id: 1,
                    interior: None,
                    entering: t > 0.0,
                });
            }
        }

        fn inside(&self, p: crate::geometry::Point3f) -> bool {
            p.x * p.x + p.y * p.y + p.z * p.z < 1.0
        }

        fn normal(&self, hit: &Intersection) -> Normal3f {
            hit.normal
        }

        fn uvcoord(&self, hit: &Intersection) -> Point2f {
            hit.uv
        }

        fn transform(&self) -> Option<&Matrix4x3> {
            None
        }

        fn compute_bbox(&self) -> Bounds3f {
            Bounds3f::new(point3(-1.0, -1.0, -1.0), point3(1.0, 1.0, 1.0))
        }

        fn shape_id(&self) -> u64 {
            1
        }
    }

    #[test]
    fn transformed_scales_hit_positions() {
        let sphere: Arc<dyn Shape> = Arc::new(UnitSphere);
        let transformed = Transformed::new(sphere, Matrix4x3::uniform_scale(2.0), 2);
        let ray = Ray::new(point3(0.0, 0.0, -5.0), vector3(0.0, 0.0, 1.0), RayKind::Primary);
        let mut hits = Vec::new();
        transformed.all_intersections(&ray, &mut hits);
        assert_eq!(hits.len(), 2);
        let zs: Vec<Float> = hits.iter().map(|h| h.point.z).collect();
        assert!(zs.iter().any(|z| (*z - -2.0).abs() < 1e-6));
        assert!(zs.iter().any(|z| (*z - 2.0).abs() < 1e-6));
    }

    #[test]
    fn clip_drops_hits_outside_clip_shape() {
        let sphere: Arc<dyn Shape> = Arc::new(UnitSphere);
        let clip_sphere: Arc<dyn Shape> = Arc::new(UnitSphere);
        // Clip by a sphere translated far away: nothing survives.
        let translated_clip = Transformed::new(clip_sphere, Matrix4x3::translation(vector3(10.0, 0.0, 0.0)), 3);
        let clipped = Clip::new(sphere, vec![Arc::new(translated_clip)], 4);
        let ray = Ray::new(point3(0.0, 0.0, -5.0), vector3(0.0, 0.0, 1.0), RayKind::Primary);
        let mut hits = Vec::new();
        clipped.all_intersections(&ray, &mut hits);
        assert!(hits.is_empty());
    }

    #[test]
    fn bound_skips_inner_intersection_when_ray_misses_bound() {
        let sphere: Arc<dyn Shape> = Arc::new(UnitSphere);
        let far_bound: Arc<dyn Shape> = Arc::new(Transformed::new(
            Arc::new(UnitSphere),
            Matrix4x3::translation(vector3(100.0, 0.0, 0.0)),
            5,
        ));
        let bounded = Bound::new(sphere, far_bound, 6);
        let ray = Ray::new(point3(0.0, 0.0, -5.0), vector3(0.0, 0.0, 1.0), RayKind::Primary);
        let mut hits = Vec::new();
        bounded.all_intersections(&ray, &mut hits);
        assert!(hits.is_empty());
    }

    #[test]
    fn bound_runs_inner_intersection_when_ray_hits_bound() {
        let sphere: Arc<dyn Shape> = Arc::new(UnitSphere);
        let enclosing_bound: Arc<dyn Shape> =
            Arc::new(Transformed::new(Arc::new(UnitSphere), Matrix4x3::uniform_scale(2.0), 7));
        let bounded = Bound::new(sphere, enclosing_bound, 8);
        let ray = Ray::new(point3(0.0, 0.0, -5.0), vector3(0.0, 0.0, 1.0), RayKind::Primary);
        let mut hits = Vec::new();
        bounded.all_intersections(&ray, &mut hits);
        assert_eq!(hits.len(), 2);
    }

    #[test]
    fn bound_runs_inner_intersection_when_ray_origin_is_inside_bound() {
        let sphere: Arc<dyn Shape> = Arc::new(UnitSphere);
        let enclosing_bound: Arc<dyn Shape> = Arc::new(UnitSphere);
        let bounded = Bound::new(sphere, enclosing_bound, 9);
        // Ray origin at the sphere's center: inside the bound, so the inner
        // shape is still tested even though the bound's surface is crossed
        // behind the origin as well as ahead of it.
        let ray = Ray::new(point3(0.0, 0.0, 0.0), vector3(0.0, 0.0, 1.0), RayKind::Primary);
        let mut hits = Vec::new();
        bounded.all_intersections(&ray, &mut hits);
        assert_eq!(hits.len(), 2);
    }
}
