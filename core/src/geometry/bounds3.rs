//! Axis-aligned bounding boxes, used by shape dispatch for bbox culling
//! (spec §4.J `compute_bbox`).

use super::{point3, Point3f};
use crate::pbrt::{Float, INFINITY};

#[derive(Copy, Clone, Debug, PartialEq)]
pub struct Bounds3f {
    pub min: Point3f,
    pub max: Point3f,
}

impl Bounds3f {
    pub const EMPTY: Self = Self {
        min: Point3f { x: INFINITY, y: INFINITY, z: INFINITY },
        max: Point3f { x: -INFINITY, y: -INFINITY, z: -INFINITY },
    };

    pub fn new(a: Point3f, b: Point3f) -> Self {
        Self {
            min: point3(a.x.min(b.x), a.y.min(b.y), a.z.min(b.z)),
            max: point3(a.x.max(b.x), a.y.max(b.y), a.z.max(b.z)),
        }
    }

    pub fn union_point(&self, p: Point3f) -> Self {
        Self::new(
            point3(self.min.x.min(p.x), self.min.y.min(p.y), self.min.z.min(p.z)),
            point3(self.max.x.max(p.x), self.max.y.max(p.y), self.max.z.max(p.z)),
        )
    }

    pub fn union(&self, other: &Self) -> Self {
        self.union_point(other.min).union_point(other.max)
    }

    pub fn contains(&self, p: Point3f) -> bool {
        p.x >= self.min.x
            && p.x <= self.max.x
            && p.y >= self.min.y
            && p.y <= self.max.y
            && p.z >= self.min.z
            && p.z <= self.max.z
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn union_grows_to_contain_both() {
        let a = Bounds3f::new(point3(0.0, 0.0, 0.0), point3(1.0, 1.0, 1.0));
        let b = Bounds3f::new(point3(2.0, -1.0, 0.5), point3(3.0, 0.5, 2.0));
        let u = a.union(&b);
        assert!(u.contains(point3(0.0, 0.0, 0.0)));
        assert!(u.contains(point3(3.0, -1.0, 2.0)));
    }
}
