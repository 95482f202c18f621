//! Minimal 3-vector math used throughout the engine.
//!
//! Positions, forces and gradients are all `Real3`.  The type is a thin
//! wrapper over `[f64; 3]` so it indexes like an array in axis loops and
//! serializes as a plain triple.

use std::ops::{Add, AddAssign, Index, IndexMut, Mul, Neg, Sub, SubAssign};

/// A 3-component double-precision vector.
#[derive(Copy, Clone, PartialEq, Debug, Default)]
#[derive(serde::Serialize, serde::Deserialize)]
pub struct Real3(pub [f64; 3]);

impl Real3 {
    pub const ZERO: Real3 = Real3([0.0; 3]);

    #[inline]
    pub fn new(x: f64, y: f64, z: f64) -> Real3 {
        Real3([x, y, z])
    }

    #[inline]
    pub fn squared_norm(self) -> f64 {
        self.0[0] * self.0[0] + self.0[1] * self.0[1] + self.0[2] * self.0[2]
    }

    #[inline]
    pub fn norm(self) -> f64 {
        self.squared_norm().sqrt()
    }

    /// Unit vector in the same direction, or zero if the norm underflows.
    pub fn normalized(self) -> Real3 {
        let n = self.norm();
        if n > 1e-10 {
            Real3([self.0[0] / n, self.0[1] / n, self.0[2] / n])
        } else {
            Real3::ZERO
        }
    }

    #[inline]
    pub fn dot(self, other: Real3) -> f64 {
        self.0[0] * other.0[0] + self.0[1] * other.0[1] + self.0[2] * other.0[2]
    }

    /// Squared euclidean distance between two points.
    #[inline]
    pub fn squared_distance(self, other: Real3) -> f64 {
        (self - other).squared_norm()
    }
}

impl Add for Real3 {
    type Output = Real3;
    #[inline]
    fn add(self, rhs: Real3) -> Real3 {
        Real3([
            self.0[0] + rhs.0[0],
            self.0[1] + rhs.0[1],
            self.0[2] + rhs.0[2],
        ])
    }
}

impl AddAssign for Real3 {
    #[inline]
    fn add_assign(&mut self, rhs: Real3) {
        *self = *self + rhs;
    }
}

impl Sub for Real3 {
    type Output = Real3;
    #[inline]
    fn sub(self, rhs: Real3) -> Real3 {
        Real3([
            self.0[0] - rhs.0[0],
            self.0[1] - rhs.0[1],
            self.0[2] - rhs.0[2],
        ])
    }
}

impl SubAssign for Real3 {
    #[inline]
    fn sub_assign(&mut self, rhs: Real3) {
        *self = *self - rhs;
    }
}

impl Mul<f64> for Real3 {
    type Output = Real3;
    #[inline]
    fn mul(self, s: f64) -> Real3 {
        Real3([self.0[0] * s, self.0[1] * s, self.0[2] * s])
    }
}

impl Neg for Real3 {
    type Output = Real3;
    #[inline]
    fn neg(self) -> Real3 {
        self * -1.0
    }
}

impl Index<usize> for Real3 {
    type Output = f64;
    #[inline]
    fn index(&self, i: usize) -> &f64 {
        &self.0[i]
    }
}

impl IndexMut<usize> for Real3 {
    #[inline]
    fn index_mut(&mut self, i: usize) -> &mut f64 {
        &mut self.0[i]
    }
}

impl From<[f64; 3]> for Real3 {
    #[inline]
    fn from(a: [f64; 3]) -> Real3 {
        Real3(a)
    }
}
