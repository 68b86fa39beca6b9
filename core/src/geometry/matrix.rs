//! Affine 4×3 transforms (spec §3: "Matrix is affine 4×3 with forward and
//! inverse; every primitive may carry one").

#![allow(dead_code)]
use super::{normal3, point3, vector3, Normal3f, Point3f, Vector3f};
use crate::pbrt::Float;

/// An affine transform stored as a 3×3 linear part plus a translation, along
/// with its inverse so that points/vectors/normals can all be mapped in
/// either direction without re-inverting on every call (spec §4.J: "Every
/// primitive may carry one").
#[derive(Copy, Clone, Debug, PartialEq)]
pub struct Matrix4x3 {
    /// Row-major 3×3 linear part.
    m: [[Float; 3]; 3],
    /// Translation.
    t: Vector3f,
    /// Inverse linear part.
    inv_m: [[Float; 3]; 3],
    /// Inverse translation.
    inv_t: Vector3f,
}

impl Matrix4x3 {
    pub const IDENTITY: Self = Self {
        m: [[1.0, 0.0, 0.0], [0.0, 1.0, 0.0], [0.0, 0.0, 1.0]],
        t: Vector3f { x: 0.0, y: 0.0, z: 0.0 },
        inv_m: [[1.0, 0.0, 0.0], [0.0, 1.0, 0.0], [0.0, 0.0, 1.0]],
        inv_t: Vector3f { x: 0.0, y: 0.0, z: 0.0 },
    };

    /// Build a transform from its linear part and translation, computing the
    /// inverse eagerly (transforms are built once at scene-compose time and
    /// applied many times at trace time, per spec §5).
    pub fn new(m: [[Float; 3]; 3], t: Vector3f) -> Self {
        let inv_m = invert3(&m).expect("non-invertible transform");
        let inv_t = apply(&inv_m, &(t * -1.0));
        Self {
            m,
            t,
            inv_m,
            inv_t,
        }
    }

    pub fn translation(t: Vector3f) -> Self {
        Self::new(Self::IDENTITY.m, t)
    }

    pub fn uniform_scale(s: Float) -> Self {
        Self::scale(s, s, s)
    }

    pub fn scale(sx: Float, sy: Float, sz: Float) -> Self {
        Self::new(
            [[sx, 0.0, 0.0], [0.0, sy, 0.0], [0.0, 0.0, sz]],
            vector3(0.0, 0.0, 0.0),
        )
    }

    pub fn rotate_y(theta_degrees: Float) -> Self {
        let t = theta_degrees.to_radians();
        let (s, c) = t.sin_cos();
        Self::new(
            [[c, 0.0, s], [0.0, 1.0, 0.0], [-s, 0.0, c]],
            vector3(0.0, 0.0, 0.0),
        )
    }

    /// Compose `self` followed by `other` (applied left-to-right per spec
    /// §4.J: "Transforms compose left-to-right").
    pub fn then(&self, other: &Self) -> Self {
        let mut m = [[0.0; 3]; 3];
        for i in 0..3 {
            for j in 0..3 {
                m[i][j] = (0..3).map(|k| self.m[i][k] * other.m[k][j]).sum();
            }
        }
        let t = apply(&other.m, &self.t) + other.t;
        Self::new(m, t)
    }

    pub fn inverse(&self) -> Self {
        Self {
            m: self.inv_m,
            t: self.inv_t,
            inv_m: self.m,
            inv_t: self.t,
        }
    }

    pub fn transform_point(&self, p: Point3f) -> Point3f {
        let r = apply(&self.m, &vector3(p.x, p.y, p.z)) + self.t;
        point3(r.x, r.y, r.z)
    }

    pub fn transform_vector(&self, v: Vector3f) -> Vector3f {
        apply(&self.m, &v)
    }

    /// Normals transform by the inverse-transpose of the linear part.
    pub fn transform_normal(&self, n: Normal3f) -> Normal3f {
        let v = vector3(n.x, n.y, n.z);
        let r = apply_transpose(&self.inv_m, &v);
        normal3(r.x, r.y, r.z)
    }

    pub fn inv_transform_point(&self, p: Point3f) -> Point3f {
        self.inverse().transform_point(p)
    }

    pub fn inv_transform_vector(&self, v: Vector3f) -> Vector3f {
        self.inverse().transform_vector(v)
    }

    /// True if the linear part flips handedness (determinant < 0) — spec
    /// §4.E normal orientation depends on this (`transform_swaps_handedness`).
    pub fn swaps_handedness(&self) -> bool {
        determinant3(&self.m) < 0.0
    }
}

impl Default for Matrix4x3 {
    fn default() -> Self {
        Self::IDENTITY
    }
}

fn apply(m: &[[Float; 3]; 3], v: &Vector3f) -> Vector3f {
    vector3(
        m[0][0] * v.x + m[0][1] * v.y + m[0][2] * v.z,
        m[1][0] * v.x + m[1][1] * v.y + m[1][2] * v.z,
        m[2][0] * v.x + m[2][1] * v.y + m[2][2] * v.z,
    )
}

fn apply_transpose(m: &[[Float; 3]; 3], v: &Vector3f) -> Vector3f {
    vector3(
        m[0][0] * v.x + m[1][0] * v.y + m[2][0] * v.z,
        m[0][1] * v.x + m[1][1] * v.y + m[2][1] * v.z,
        m[0][2] * v.x + m[1][2] * v.y + m[2][2] * v.z,
    )
}

fn determinant3(m: &[[Float; 3]; 3]) -> Float {
    m[0][0] * (m[1][1] * m[2][2] - m[1][2] * m[2][1])
        - m[0][1] * (m[1][0] * m[2][2] - m[1][2] * m[2][0])
        + m[0][2] * (m[1][0] * m[2][1] - m[1][1] * m[2][0])
}

fn invert3(m: &[[Float; 3]; 3]) -> Option<[[Float; 3]; 3]> {
    let det = determinant3(m);
    if det.abs() < 1e-12 {
        return None;
    }
    let inv_det = 1.0 / det;
    let cof = |r0: usize, c0: usize, r1: usize, c1: usize| m[r0][c0] * m[r1][c1] - m[r0][c1] * m[r1][c0];
    Some([
        [
            cof(1, 1, 2, 2) * inv_det,
            -cof(0, 1, 2, 2) * inv_det,
            cof(0, 1, 1, 2) * inv_det,
        ],
        [
            -cof(1, 0, 2, 2) * inv_det,
            cof(0, 0, 2, 2) * inv_det,
            -cof(0, 0, 1, 2) * inv_det,
        ],
        [
            cof(1, 0, 2, 1) * inv_det,
            -cof(0, 0, 2, 1) * inv_det,
            cof(0, 0, 1, 1) * inv_det,
        ],
    ])
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;

    #[test]
    fn inverse_undoes_transform() {
        let xf = Matrix4x3::rotate_y(37.0).then(&Matrix4x3::translation(vector3(1.0, 2.0, 3.0)));
        let p = point3(1.0, 2.0, 3.0);
        let back = xf.inv_transform_point(xf.transform_point(p));
        assert_relative_eq!(back.x, p.x, epsilon = 1e-9);
        assert_relative_eq!(back.y, p.y, epsilon = 1e-9);
        assert_relative_eq!(back.z, p.z, epsilon = 1e-9);
    }

    #[test]
    fn uniform_scale_preserves_angles() {
        let xf = Matrix4x3::uniform_scale(2.0);
        let v1 = vector3(1.0, 0.0, 0.0);
        let v2 = vector3(0.0, 1.0, 0.0);
        let tv1 = xf.transform_vector(v1);
        let tv2 = xf.transform_vector(v2);
        assert_relative_eq!(tv1.length(), 2.0, epsilon = 1e-9);
        assert_relative_eq!(tv2.length(), 2.0, epsilon = 1e-9);
    }
}
