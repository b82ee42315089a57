use serde::{Serialize, Deserialize};
use std::ops::{Add, Sub, Mul};

/// A simple 3D vector. `y` is the implant axis.
#[derive(Copy, Clone, Default, Debug, PartialEq, Serialize, Deserialize)]
pub struct Vec3 {
    pub x: f64,
    pub y: f64,
    pub z: f64,
}

impl Vec3 {
    #[inline(always)]
    pub fn new(x: f64, y: f64, z: f64) -> Self { Self { x, y, z } }
    #[inline(always)]
    pub fn zero() -> Self { Self::new(0.0, 0.0, 0.0) }
    #[inline(always)]
    pub fn length_squared(self) -> f64 { self.x * self.x + self.y * self.y + self.z * self.z }
    #[inline(always)]
    pub fn length(self) -> f64 { self.length_squared().sqrt() }
    #[inline(always)]
    pub fn distance(self, other: Self) -> f64 { (self - other).length() }
    #[inline(always)]
    pub fn scale(self, scalar: f64) -> Self { Self::new(self.x * scalar, self.y * scalar, self.z * scalar) }

    /// Projection onto the horizontal plane (drops the axial component).
    #[inline(always)]
    pub fn radial(self) -> Self { Self::new(self.x, 0.0, self.z) }

    /// Distance from the implant axis.
    #[inline(always)]
    pub fn radial_distance(self) -> f64 { self.radial().length() }

    /// Normalizes the vector, returning `None` if the length is zero or very small.
    pub fn try_normalize(self) -> Option<Vec3> {
        let len_sq = self.length_squared();
        if len_sq > 1e-12 {
            Some(self.scale(1.0 / len_sq.sqrt()))
        } else {
            None
        }
    }
}

impl Add for Vec3 {
    type Output = Self;
    fn add(self, other: Self) -> Self {
        Self::new(self.x + other.x, self.y + other.y, self.z + other.z)
    }
}

impl Sub for Vec3 {
    type Output = Self;
    fn sub(self, other: Self) -> Self {
        Self::new(self.x - other.x, self.y - other.y, self.z - other.z)
    }
}

impl Mul<f64> for Vec3 {
    type Output = Self;
    fn mul(self, scalar: f64) -> Self {
        self.scale(scalar)
    }
}

/// Point on a horizontal ring of `radius` at height `y`.
pub fn ring_point(radius: f64, angle_rad: f64, y: f64) -> Vec3 {
    Vec3::new(radius * angle_rad.cos(), y, radius * angle_rad.sin())
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_abs_diff_eq;

    #[test]
    fn test_radial_distance_ignores_axis() {
        let v = Vec3::new(3.0, 100.0, 4.0);
        assert_abs_diff_eq!(v.radial_distance(), 5.0, epsilon = 1e-12);
    }

    #[test]
    fn test_normalize_zero_is_none() {
        assert!(Vec3::zero().try_normalize().is_none());
        let n = Vec3::new(0.0, 0.0, -2.0).try_normalize().unwrap();
        assert_eq!(n, Vec3::new(0.0, 0.0, -1.0));
    }

    #[test]
    fn test_ring_point_lies_on_ring() {
        let p = ring_point(0.75, 1.3, -1.0);
        assert_abs_diff_eq!(p.radial_distance(), 0.75, epsilon = 1e-12);
        assert_abs_diff_eq!(p.y, -1.0);
    }
}
