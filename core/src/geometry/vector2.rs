//! 2-D vectors (parameter-space directions: `(u, v)`, `(r, y)` profile tangents).

#![allow(dead_code)]
use crate::pbrt::Float;
use num_traits::Num;
use std::ops;

#[derive(Copy, Clone, Debug, Default, PartialEq)]
pub struct Vector2<T> {
    pub x: T,
    pub y: T,
}

pub type Vector2f = Vector2<Float>;

pub fn vector2<T>(x: T, y: T) -> Vector2<T> {
    Vector2 { x, y }
}

impl Vector2<Float> {
    pub fn length_squared(&self) -> Float {
        self.x * self.x + self.y * self.y
    }

    pub fn length(&self) -> Float {
        self.length_squared().sqrt()
    }
}

impl<T: Num> ops::Add for Vector2<T> {
    type Output = Vector2<T>;
    fn add(self, other: Self) -> Self::Output {
        vector2(self.x + other.x, self.y + other.y)
    }
}

impl<T: Num> ops::Sub for Vector2<T> {
    type Output = Vector2<T>;
    fn sub(self, other: Self) -> Self::Output {
        vector2(self.x - other.x, self.y - other.y)
    }
}

impl<T: Num + Copy> ops::Mul<T> for Vector2<T> {
    type Output = Vector2<T>;
    fn mul(self, f: T) -> Self::Output {
        vector2(self.x * f, self.y * f)
    }
}

impl std::ops::Index<usize> for Vector2<Float> {
    type Output = Float;
    fn index(&self, i: usize) -> &Float {
        match i {
            0 => &self.x,
            1 => &self.y,
            _ => panic!("Vector2 index out of range: {}", i),
        }
    }
}
