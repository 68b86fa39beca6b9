//! 3-D points.

#![allow(dead_code)]
use super::{vector3, Vector3, Vector3f};
use crate::pbrt::{Axis, Float};
use num_traits::Num;
use std::ops;

/// A 3-D position.
#[derive(Copy, Clone, Debug, Default, PartialEq)]
pub struct Point3<T> {
    pub x: T,
    pub y: T,
    pub z: T,
}

/// 3-D point of `Float` values.
pub type Point3f = Point3<Float>;

/// Creates a new 3-D point.
pub fn point3<T>(x: T, y: T, z: T) -> Point3<T> {
    Point3 { x, y, z }
}

impl Point3<Float> {
    /// Euclidean distance to another point.
    pub fn distance(&self, other: &Self) -> Float {
        (*self - *other).length()
    }

    /// Squared Euclidean distance to another point.
    pub fn distance_squared(&self, other: &Self) -> Float {
        (*self - *other).length_squared()
    }

    /// Linear interpolation between two points.
    pub fn lerp(&self, other: &Self, t: Float) -> Self {
        *self * (1.0 - t) + *other * t
    }
}

impl<T: Num + Copy> ops::Add<Vector3<T>> for Point3<T> {
    type Output = Point3<T>;
    fn add(self, v: Vector3<T>) -> Self::Output {
        point3(self.x + v.x, self.y + v.y, self.z + v.z)
    }
}

impl<T: Num + Copy> ops::AddAssign<Vector3<T>> for Point3<T> {
    fn add_assign(&mut self, v: Vector3<T>) {
        *self = *self + v;
    }
}

impl<T: Num> ops::Sub for Point3<T> {
    type Output = Vector3<T>;
    fn sub(self, other: Self) -> Self::Output {
        vector3(self.x - other.x, self.y - other.y, self.z - other.z)
    }
}

impl<T: Num + Copy> ops::Sub<Vector3<T>> for Point3<T> {
    type Output = Point3<T>;
    fn sub(self, v: Vector3<T>) -> Self::Output {
        point3(self.x - v.x, self.y - v.y, self.z - v.z)
    }
}

impl<T: Num + Copy> ops::Mul<T> for Point3<T> {
    type Output = Point3<T>;
    fn mul(self, f: T) -> Self::Output {
        point3(self.x * f, self.y * f, self.z * f)
    }
}

impl<T: Num + Copy> ops::MulAssign<T> for Point3<T> {
    fn mul_assign(&mut self, f: T) {
        *self = *self * f;
    }
}

impl<T: Num + Copy> ops::Add for Point3<T> {
    type Output = Point3<T>;
    fn add(self, other: Self) -> Self::Output {
        point3(self.x + other.x, self.y + other.y, self.z + other.z)
    }
}

impl<T> ops::Index<Axis> for Point3<T> {
    type Output = T;
    fn index(&self, axis: Axis) -> &Self::Output {
        match axis {
            Axis::X => &self.x,
            Axis::Y => &self.y,
            Axis::Z => &self.z,
        }
    }
}

impl<T> ops::IndexMut<Axis> for Point3<T> {
    fn index_mut(&mut self, axis: Axis) -> &mut Self::Output {
        match axis {
            Axis::X => &mut self.x,
            Axis::Y => &mut self.y,
            Axis::Z => &mut self.z,
        }
    }
}

impl From<Point3<Float>> for Vector3<Float> {
    fn from(p: Point3<Float>) -> Self {
        vector3(p.x, p.y, p.z)
    }
}

impl From<Vector3f> for Point3<Float> {
    fn from(v: Vector3f) -> Self {
        point3(v.x, v.y, v.z)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;

    #[test]
    fn sub_yields_vector() {
        let a = point3(3.0, 4.0, 0.0);
        let b = point3(0.0, 0.0, 0.0);
        assert_relative_eq!((a - b).length(), 5.0, epsilon = 1e-12);
    }

    #[test]
    fn lerp_midpoint() {
        let a = point3(0.0, 0.0, 0.0);
        let b = point3(2.0, 4.0, 6.0);
        assert_eq!(a.lerp(&b, 0.5), point3(1.0, 2.0, 3.0));
    }
}
