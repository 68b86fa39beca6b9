//! Bicubic Bézier patch (spec §4.E).
//!
//! Ray intersection walks an adaptive subdivision tree: interior nodes hold
//! a bounding sphere over their 16-control-point hull and up to 4 children;
//! leaves are subpatches flat enough (per `Flatness_Value`) to triangulate
//! and test directly. `SubdivisionStrategy::Recursive` rebuilds that tree
//! fresh for every ray (spec's strategy 0); `Precomputed` builds it once at
//! construction and reuses it (strategy 1) — both share the same builder,
//! since the only difference is *when* `build_node` runs.
//!
//! The intersection point comes from the (approximate, piecewise-linear)
//! triangulated leaf, but the reported normal and final uv are evaluated
//! analytically from the Bernstein surface at the located `(u, v)`, the same
//! way a quadric shape computes its normal from the closed-form surface
//! equation rather than from the discretized hit.

use raytracer_core::error::ConstructionError;
use raytracer_core::geometry::{point2, point3, vector3, Normal3f, Point2f, Point3f, Ray};
use raytracer_core::intersection::Intersection;
use raytracer_core::object::Shape;
use raytracer_core::pbrt::{Dot, Float};

pub type ControlNet = [[Point3f; 4]; 4];

#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub enum SubdivisionStrategy {
    Recursive,
    Precomputed,
}

enum PatchNode {
    Interior {
        children: Vec<PatchNode>,
        center: Point3f,
        radius2: Float,
    },
    Leaf {
        v00: Point3f,
        v03: Point3f,
        v33: Point3f,
        v30: Point3f,
        u0: Float,
        u1: Float,
        v0: Float,
        v1: Float,
        center: Point3f,
        radius2: Float,
    },
}

pub struct BicubicPatch {
    control: ControlNet,
    uv_corners: [Point2f; 4],
    u_steps: u32,
    v_steps: u32,
    flatness: Float,
    tree: Option<PatchNode>,
    id: u64,
}

const BERNSTEIN_T_MIN: Float = 1.0e-5;

impl BicubicPatch {
    pub fn new(
        control: ControlNet,
        uv_corners: [Point2f; 4],
        u_steps: u32,
        v_steps: u32,
        flatness: Float,
        strategy: SubdivisionStrategy,
        id: u64,
    ) -> Result<Self, ConstructionError> {
        if u_steps == 0 && v_steps == 0 {
            return Err(ConstructionError::DegenerateProfile {
                segment: 0,
                reason: "bicubic patch needs at least one subdivision step".into(),
            });
        }
        let tree = match strategy {
            SubdivisionStrategy::Precomputed => {
                Some(build_node(control, 0.0, 1.0, 0.0, 1.0, u_steps, v_steps, flatness))
            }
            SubdivisionStrategy::Recursive => None,
        };
        Ok(Self {
            control,
            uv_corners,
            u_steps,
            v_steps,
            flatness,
            tree,
            id,
        })
    }

    fn walk<'a>(&'a self, ray: &Ray, node: &'a PatchNode, out: &mut Vec<Intersection>) {
        match node {
            PatchNode::Interior { children, center, radius2 } => {
                if !ray_hits_sphere(ray, *center, *radius2) {
                    return;
                }
                for child in children {
                    self.walk(ray, child, out);
                }
            }
            PatchNode::Leaf { v00, v03, v33, v30, u0, u1, v0, v1, center, radius2 } => {
                if !ray_hits_sphere(ray, *center, *radius2) {
                    return;
                }
                for (a, b, c, uva, uvb, uvc) in [
                    (*v00, *v03, *v33, (*u0, *v0), (*u0, *v1), (*u1, *v1)),
                    (*v00, *v33, *v30, (*u0, *v0), (*u1, *v1), (*u1, *v0)),
                ] {
                    if let Some((t, alpha, beta)) = intersect_triangle(ray, a, b, c) {
                        let u = (1.0 - alpha - beta) * uva.0 + alpha * uvb.0 + beta * uvc.0;
                        let v = (1.0 - alpha - beta) * uva.1 + alpha * uvb.1 + beta * uvc.1;
                        let p = ray.at(t);
                        let normal = self.analytic_normal(u, v);
                        let uv = Point2f::bilerp(self.uv_corners, u, v);
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
        }
    }

    fn analytic_normal(&self, u: Float, v: Float) -> Normal3f {
        let du = bernstein_surface_deriv_u(&self.control, u, v);
        let dv = bernstein_surface_deriv_v(&self.control, u, v);
        let n = du.cross(&dv);
        if n.length_squared() < 1e-20 {
            raytracer_core::geometry::normal3(1.0, 0.0, 0.0)
        } else {
            raytracer_core::geometry::normal3(n.x, n.y, n.z).normalize()
        }
    }
}

impl Shape for BicubicPatch {
    fn all_intersections(&self, ray: &Ray, out: &mut Vec<Intersection>) {
        match &self.tree {
            Some(tree) => self.walk(ray, tree, out),
            None => {
                let tree = build_node(self.control, 0.0, 1.0, 0.0, 1.0, self.u_steps, self.v_steps, self.flatness);
                self.walk(ray, &tree, out);
            }
        }
    }

    fn inside(&self, _p: Point3f) -> bool {
        // An infinitely thin surface encloses no volume (spec §4.E).
        false
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
        for row in &self.control {
            for p in row {
                bbox = bbox.union_point(*p);
            }
        }
        bbox
    }

    fn shape_id(&self) -> u64 {
        self.id
    }
}

fn bounding_sphere(net: &ControlNet) -> (Point3f, Float) {
    let mut sum = vector3(0.0, 0.0, 0.0);
    let mut count = 0.0;
    for row in net {
        for p in row {
            sum = sum + vector3(p.x, p.y, p.z);
            count += 1.0;
        }
    }
    let center = point3(sum.x / count, sum.y / count, sum.z / count);
    let radius2 = net
        .iter()
        .flatten()
        .map(|p| center.distance_squared(p))
        .fold(0.0_f64, Float::max);
    (center, radius2)
}

fn is_flat(net: &ControlNet, flatness: Float) -> bool {
    let c0 = net[0][0];
    let c1 = net[3][0];
    let c2 = net[0][3];
    let e1 = vector3(c1.x - c0.x, c1.y - c0.y, c1.z - c0.z);
    let e2 = vector3(c2.x - c0.x, c2.y - c0.y, c2.z - c0.z);
    let n = e1.cross(&e2);
    let len2 = n.length_squared();
    if len2 < 1e-20 {
        // Degenerate plane: force another subdivision instead of
        // mis-triangulating a sliver.
        return false;
    }
    let n = n * (1.0 / len2.sqrt());
    net.iter().flatten().all(|p| {
        let d = vector3(p.x - c0.x, p.y - c0.y, p.z - c0.z);
        n.dot(&d).abs() < flatness
    })
}

fn build_node(
    net: ControlNet,
    u0: Float,
    u1: Float,
    v0: Float,
    v1: Float,
    remaining_u: u32,
    remaining_v: u32,
    flatness: Float,
) -> PatchNode {
    let (center, radius2) = bounding_sphere(&net);
    let can_split = remaining_u > 0 || remaining_v > 0;
    if !can_split || is_flat(&net, flatness) {
        return PatchNode::Leaf {
            v00: net[0][0],
            v03: net[0][3],
            v33: net[3][3],
            v30: net[3][0],
            u0,
            u1,
            v0,
            v1,
            center,
            radius2,
        };
    }

    let split_u = remaining_u > 0;
    let split_v = remaining_v > 0;
    let mid_u = 0.5 * (u0 + u1);
    let mid_v = 0.5 * (v0 + v1);

    let children = if split_u && split_v {
        let (left, right) = subdivide_u(&net);
        let (ll, lr) = subdivide_v(&left);
        let (rl, rr) = subdivide_v(&right);
        vec![
            build_node(ll, u0, mid_u, v0, mid_v, remaining_u - 1, remaining_v - 1, flatness),
            build_node(lr, u0, mid_u, mid_v, v1, remaining_u - 1, remaining_v - 1, flatness),
            build_node(rl, mid_u, u1, v0, mid_v, remaining_u - 1, remaining_v - 1, flatness),
            build_node(rr, mid_u, u1, mid_v, v1, remaining_u - 1, remaining_v - 1, flatness),
        ]
    } else if split_u {
        let (left, right) = subdivide_u(&net);
        vec![
            build_node(left, u0, mid_u, v0, v1, remaining_u - 1, remaining_v, flatness),
            build_node(right, mid_u, u1, v0, v1, remaining_u - 1, remaining_v, flatness),
        ]
    } else {
        let (left, right) = subdivide_v(&net);
        vec![
            build_node(left, u0, u1, v0, mid_v, remaining_u, remaining_v - 1, flatness),
            build_node(right, u0, u1, mid_v, v1, remaining_u, remaining_v - 1, flatness),
        ]
    };

    PatchNode::Interior { children, center, radius2 }
}

fn decasteljau4(p: [Point3f; 4]) -> ([Point3f; 4], [Point3f; 4]) {
    let mid = |a: Point3f, b: Point3f| point3((a.x + b.x) * 0.5, (a.y + b.y) * 0.5, (a.z + b.z) * 0.5);
    let p01 = mid(p[0], p[1]);
    let p12 = mid(p[1], p[2]);
    let p23 = mid(p[2], p[3]);
    let p012 = mid(p01, p12);
    let p123 = mid(p12, p23);
    let p0123 = mid(p012, p123);
    ([p[0], p01, p012, p0123], [p0123, p123, p23, p[3]])
}

/// Split the control net into two halves along `u` (the first index).
fn subdivide_u(net: &ControlNet) -> (ControlNet, ControlNet) {
    let mut left = [[Point3f::default(); 4]; 4];
    let mut right = [[Point3f::default(); 4]; 4];
    for j in 0..4 {
        let column = [net[0][j], net[1][j], net[2][j], net[3][j]];
        let (l, r) = decasteljau4(column);
        for i in 0..4 {
            left[i][j] = l[i];
            right[i][j] = r[i];
        }
    }
    (left, right)
}

/// Split the control net into two halves along `v` (the second index).
fn subdivide_v(net: &ControlNet) -> (ControlNet, ControlNet) {
    let mut left = [[Point3f::default(); 4]; 4];
    let mut right = [[Point3f::default(); 4]; 4];
    for i in 0..4 {
        let (l, r) = decasteljau4(net[i]);
        left[i] = l;
        right[i] = r;
    }
    (left, right)
}

fn bernstein(t: Float) -> [Float; 4] {
    let mt = 1.0 - t;
    [mt * mt * mt, 3.0 * t * mt * mt, 3.0 * t * t * mt, t * t * t]
}

fn bernstein_deriv(t: Float) -> [Float; 4] {
    let mt = 1.0 - t;
    [
        -3.0 * mt * mt,
        3.0 * mt * mt - 6.0 * t * mt,
        6.0 * t * mt - 3.0 * t * t,
        3.0 * t * t,
    ]
}

fn bernstein_surface_deriv_u(net: &ControlNet, u: Float, v: Float) -> raytracer_core::geometry::Vector3f {
    let bu = bernstein_deriv(u);
    let bv = bernstein(v);
    let mut sum = vector3(0.0, 0.0, 0.0);
    for i in 0..4 {
        for j in 0..4 {
            let w = bu[i] * bv[j];
            let p = net[i][j];
            sum = sum + vector3(p.x, p.y, p.z) * w;
        }
    }
    sum
}

fn bernstein_surface_deriv_v(net: &ControlNet, u: Float, v: Float) -> raytracer_core::geometry::Vector3f {
    let bu = bernstein(u);
    let bv = bernstein_deriv(v);
    let mut sum = vector3(0.0, 0.0, 0.0);
    for i in 0..4 {
        for j in 0..4 {
            let w = bu[i] * bv[j];
            let p = net[i][j];
            sum = sum + vector3(p.x, p.y, p.z) * w;
        }
    }
    sum
}

fn ray_hits_sphere(ray: &Ray, center: Point3f, radius2: Float) -> bool {
    let oc = vector3(ray.o.x - center.x, ray.o.y - center.y, ray.o.z - center.z);
    let a = ray.d.length_squared();
    if a < 1e-20 {
        return oc.length_squared() <= radius2;
    }
    let b = 2.0 * ray.d.dot(&oc);
    let c = oc.length_squared() - radius2;
    b * b - 4.0 * a * c >= 0.0
}

/// Möller-Trumbore ray/triangle intersection, returning `(t, alpha, beta)`
/// with barycentric weights for `b` and `c` respectively (spec §4.E: "reject
/// hits with t ≤ 1e-5 or barycentric (α,β) outside [0,1] or α+β > 1").
fn intersect_triangle(ray: &Ray, a: Point3f, b: Point3f, c: Point3f) -> Option<(Float, Float, Float)> {
    let e1 = vector3(b.x - a.x, b.y - a.y, b.z - a.z);
    let e2 = vector3(c.x - a.x, c.y - a.y, c.z - a.z);

    let area2 = e1.cross(&e2).length_squared();
    if area2 < 1e-12 * e1.length_squared() * e2.length_squared() {
        return None;
    }

    let pvec = ray.d.cross(&e2);
    let det = e1.dot(&pvec);
    if det.abs() < 1e-14 {
        return None;
    }
    let inv_det = 1.0 / det;
    let tvec = vector3(ray.o.x - a.x, ray.o.y - a.y, ray.o.z - a.z);
    let alpha = tvec.dot(&pvec) * inv_det;
    if !(0.0..=1.0).contains(&alpha) {
        return None;
    }
    let qvec = tvec.cross(&e1);
    let beta = ray.d.dot(&qvec) * inv_det;
    if beta < 0.0 || alpha + beta > 1.0 {
        return None;
    }
    let t = e2.dot(&qvec) * inv_det;
    if t <= BERNSTEIN_T_MIN {
        return None;
    }
    Some((t, alpha, beta))
}

#[cfg(test)]
mod tests {
    use super::*;
    use raytracer_core::geometry::{vector3, RayKind};

    fn flat_square() -> ControlNet {
        let mut net = [[Point3f::default(); 4]; 4];
        for (i, row) in net.iter_mut().enumerate() {
            for (j, p) in row.iter_mut().enumerate() {
                *p = point3(i as Float / 3.0, j as Float / 3.0, 0.0);
            }
        }
        net
    }

    fn default_uv_corners() -> [Point2f; 4] {
        [point2(0.0, 0.0), point2(1.0, 0.0), point2(1.0, 1.0), point2(0.0, 1.0)]
    }

    #[test]
    fn flat_patch_hit_at_center_has_expected_t_and_uv() {
        let patch = BicubicPatch::new(
            flat_square(),
            default_uv_corners(),
            4,
            4,
            1e-4,
            SubdivisionStrategy::Recursive,
            1,
        )
        .unwrap();
        let ray = Ray::new(point3(0.5, 0.5, -1.0), vector3(0.0, 0.0, 1.0), RayKind::Primary);
        let mut hits = Vec::new();
        patch.all_intersections(&ray, &mut hits);
        assert_eq!(hits.len(), 1);
        assert!((hits[0].t - 1.0).abs() < 1e-3);
        assert!((hits[0].uv.x - 0.5).abs() < 1e-2);
        assert!((hits[0].uv.y - 0.5).abs() < 1e-2);
    }

    #[test]
    fn flat_patch_normal_points_along_z() {
        let patch = BicubicPatch::new(
            flat_square(),
            default_uv_corners(),
            4,
            4,
            1e-4,
            SubdivisionStrategy::Recursive,
            1,
        )
        .unwrap();
        let ray = Ray::new(point3(0.5, 0.5, -1.0), vector3(0.0, 0.0, 1.0), RayKind::Primary);
        let mut hits = Vec::new();
        patch.all_intersections(&ray, &mut hits);
        assert!(hits[0].normal.z.abs() > 0.99);
    }

    #[test]
    fn ray_missing_patch_entirely_has_no_hits() {
        let patch = BicubicPatch::new(
            flat_square(),
            default_uv_corners(),
            4,
            4,
            1e-4,
            SubdivisionStrategy::Recursive,
            1,
        )
        .unwrap();
        let ray = Ray::new(point3(5.0, 5.0, -1.0), vector3(0.0, 0.0, 1.0), RayKind::Primary);
        let mut hits = Vec::new();
        patch.all_intersections(&ray, &mut hits);
        assert!(hits.is_empty());
    }

    #[test]
    fn precomputed_strategy_matches_recursive() {
        let recursive = BicubicPatch::new(
            flat_square(),
            default_uv_corners(),
            4,
            4,
            1e-4,
            SubdivisionStrategy::Recursive,
            1,
        )
        .unwrap();
        let precomputed = BicubicPatch::new(
            flat_square(),
            default_uv_corners(),
            4,
            4,
            1e-4,
            SubdivisionStrategy::Precomputed,
            1,
        )
        .unwrap();
        let ray = Ray::new(point3(0.5, 0.5, -1.0), vector3(0.0, 0.0, 1.0), RayKind::Primary);
        let mut hits_r = Vec::new();
        let mut hits_p = Vec::new();
        recursive.all_intersections(&ray, &mut hits_r);
        precomputed.all_intersections(&ray, &mut hits_p);
        assert_eq!(hits_r.len(), hits_p.len());
        assert!((hits_r[0].t - hits_p[0].t).abs() < 1e-9);
    }
}
