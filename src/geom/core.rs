use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Vec3 {
    pub x: f64,
    pub y: f64,
    pub z: f64,
}

impl Vec3 {
    pub const ZERO: Self = Self::new(0.0, 0.0, 0.0);
    pub const X: Self = Self::new(1.0, 0.0, 0.0);
    pub const Y: Self = Self::new(0.0, 1.0, 0.0);
    pub const Z: Self = Self::new(0.0, 0.0, 1.0);

    #[must_use]
    pub const fn new(x: f64, y: f64, z: f64) -> Self {
        Self { x, y, z }
    }

    #[must_use]
    pub const fn dot(self, rhs: Self) -> f64 {
        self.x * rhs.x + self.y * rhs.y + self.z * rhs.z
    }

    #[must_use]
    pub const fn cross(self, rhs: Self) -> Self {
        Self::new(
            self.y * rhs.z - self.z * rhs.y,
            self.z * rhs.x - self.x * rhs.z,
            self.x * rhs.y - self.y * rhs.x,
        )
    }

    #[must_use]
    pub const fn length_squared(self) -> f64 {
        self.dot(self)
    }

    #[must_use]
    pub fn length(self) -> f64 {
        self.length_squared().sqrt()
    }

    /// Unit vector in the same direction, `None` for zero or non-finite input.
    #[must_use]
    pub fn normalized(self) -> Option<Self> {
        let len = self.length();
        if len.is_finite() && len > 0.0 {
            Some(self.mul_scalar(1.0 / len))
        } else {
            None
        }
    }

    #[must_use]
    pub const fn mul_scalar(self, s: f64) -> Self {
        Self::new(self.x * s, self.y * s, self.z * s)
    }

    #[must_use]
    pub fn is_finite(self) -> bool {
        self.x.is_finite() && self.y.is_finite() && self.z.is_finite()
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Point3 {
    pub x: f64,
    pub y: f64,
    pub z: f64,
}

impl Point3 {
    pub const ORIGIN: Self = Self::new(0.0, 0.0, 0.0);

    #[must_use]
    pub const fn new(x: f64, y: f64, z: f64) -> Self {
        Self { x, y, z }
    }

    #[must_use]
    pub const fn sub_point(self, rhs: Self) -> Vec3 {
        Vec3::new(self.x - rhs.x, self.y - rhs.y, self.z - rhs.z)
    }

    #[must_use]
    pub const fn add_vec(self, v: Vec3) -> Self {
        Self::new(self.x + v.x, self.y + v.y, self.z + v.z)
    }

    #[must_use]
    pub fn distance_to(self, other: Self) -> f64 {
        self.sub_point(other).length()
    }

    #[must_use]
    pub fn distance_squared_to(self, other: Self) -> f64 {
        self.sub_point(other).length_squared()
    }

    #[must_use]
    pub fn is_finite(self) -> bool {
        self.x.is_finite() && self.y.is_finite() && self.z.is_finite()
    }
}

/// Affine 4x4 matrix, row-major, acting on column vectors (translation in the
/// last column).
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Transform {
    m: [[f64; 4]; 4],
}

impl Transform {
    #[must_use]
    pub const fn identity() -> Self {
        Self {
            m: [
                [1.0, 0.0, 0.0, 0.0],
                [0.0, 1.0, 0.0, 0.0],
                [0.0, 0.0, 1.0, 0.0],
                [0.0, 0.0, 0.0, 1.0],
            ],
        }
    }

    /// Build from 16 values in row-major order. Returns `None` when the slice
    /// has the wrong length or contains non-finite values.
    #[must_use]
    pub fn from_slice(values: &[f64]) -> Option<Self> {
        if values.len() != 16 || values.iter().any(|v| !v.is_finite()) {
            return None;
        }
        let mut m = [[0.0; 4]; 4];
        for (i, row) in m.iter_mut().enumerate() {
            row.copy_from_slice(&values[i * 4..i * 4 + 4]);
        }
        Some(Self { m })
    }

    #[must_use]
    pub fn to_row_major(self) -> [f64; 16] {
        let mut out = [0.0; 16];
        for (i, row) in self.m.iter().enumerate() {
            out[i * 4..i * 4 + 4].copy_from_slice(row);
        }
        out
    }

    #[must_use]
    pub const fn translate(offset: Vec3) -> Self {
        Self {
            m: [
                [1.0, 0.0, 0.0, offset.x],
                [0.0, 1.0, 0.0, offset.y],
                [0.0, 0.0, 1.0, offset.z],
                [0.0, 0.0, 0.0, 1.0],
            ],
        }
    }

    #[must_use]
    pub const fn scale(sx: f64, sy: f64, sz: f64) -> Self {
        Self {
            m: [
                [sx, 0.0, 0.0, 0.0],
                [0.0, sy, 0.0, 0.0],
                [0.0, 0.0, sz, 0.0],
                [0.0, 0.0, 0.0, 1.0],
            ],
        }
    }

    #[must_use]
    pub fn translation(self) -> Vec3 {
        Vec3::new(self.m[0][3], self.m[1][3], self.m[2][3])
    }

    #[must_use]
    pub fn apply_point(self, p: Point3) -> Point3 {
        let m = &self.m;
        Point3::new(
            m[0][0] * p.x + m[0][1] * p.y + m[0][2] * p.z + m[0][3],
            m[1][0] * p.x + m[1][1] * p.y + m[1][2] * p.z + m[1][3],
            m[2][0] * p.x + m[2][1] * p.y + m[2][2] * p.z + m[2][3],
        )
    }
}

/// Tolerance configuration for geometric comparisons.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Tolerance {
    pub eps: f64,
}

impl Tolerance {
    /// Relative step for numerical differentiation (1e-6 of the domain span).
    pub const DERIVATIVE: Self = Self { eps: 1e-6 };
    /// Parametric convergence threshold for projection refinement.
    pub const PARAMETRIC: Self = Self { eps: 1e-12 };

    #[must_use]
    pub const fn new(eps: f64) -> Self {
        Self { eps }
    }

    /// General geometry comparisons (1e-9).
    #[must_use]
    pub const fn default_geom() -> Self {
        Self::new(1e-9)
    }

    #[must_use]
    pub fn relative_to(self, span: f64) -> f64 {
        self.eps * span.abs()
    }

    #[must_use]
    pub fn approx_eq_point3(self, a: Point3, b: Point3) -> bool {
        a.distance_squared_to(b) <= self.eps * self.eps
    }
}
