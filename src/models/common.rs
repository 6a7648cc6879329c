use std::ops::{Add, Mul, Neg, Sub};

use crate::error::SimulationError;

/// 3次元ベクトル（位置・速度・変位で共用）
#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub struct Vector3D {
    pub x: f64, // m または m/s
    pub y: f64,
    pub z: f64, // 高度方向
}

/// 3次元位置（m）
pub type Position3D = Vector3D;

/// 3次元速度（m/s）
pub type Velocity3D = Vector3D;

impl Vector3D {
    pub const ZERO: Vector3D = Vector3D { x: 0.0, y: 0.0, z: 0.0 };

    pub const fn new(x: f64, y: f64, z: f64) -> Self {
        Self { x, y, z }
    }

    /// 内積
    pub fn dot(&self, other: &Vector3D) -> f64 {
        self.x * other.x + self.y * other.y + self.z * other.z
    }

    /// ベクトルの長さ
    pub fn magnitude(&self) -> f64 {
        self.dot(self).sqrt()
    }

    /// XY平面での長さ
    pub fn magnitude_xy(&self) -> f64 {
        (self.x.powi(2) + self.y.powi(2)).sqrt()
    }

    /// 3次元距離を計算
    pub fn distance_3d(&self, other: &Vector3D) -> f64 {
        (*self - *other).magnitude()
    }

    /// 単位ベクトル化
    ///
    /// 長さがゼロ（または非有限）の場合はゼロベクトルに丸めず、エラーを返します。
    pub fn normalize(&self) -> Result<Vector3D, SimulationError> {
        let mag = self.magnitude();
        if mag > 0.0 && mag.is_finite() {
            Ok(Self::new(self.x / mag, self.y / mag, self.z / mag))
        } else {
            Err(SimulationError::degenerate(format!(
                "cannot normalize vector ({}, {}, {})",
                self.x, self.y, self.z
            )))
        }
    }

    /// 高度成分を 0 にした水平ベクトル
    pub fn horizontal(&self) -> Vector3D {
        Vector3D::new(self.x, self.y, 0.0)
    }

    /// 全成分が有限値か
    pub fn is_finite(&self) -> bool {
        self.x.is_finite() && self.y.is_finite() && self.z.is_finite()
    }
}

impl Add for Vector3D {
    type Output = Self;

    fn add(self, other: Self) -> Self::Output {
        Self::new(self.x + other.x, self.y + other.y, self.z + other.z)
    }
}

impl Sub for Vector3D {
    type Output = Self;

    fn sub(self, other: Self) -> Self::Output {
        Self::new(self.x - other.x, self.y - other.y, self.z - other.z)
    }
}

impl Mul<f64> for Vector3D {
    type Output = Self;

    fn mul(self, scalar: f64) -> Self::Output {
        Self::new(self.x * scalar, self.y * scalar, self.z * scalar)
    }
}

impl Neg for Vector3D {
    type Output = Self;

    fn neg(self) -> Self::Output {
        Self::new(-self.x, -self.y, -self.z)
    }
}

/// 物理定数
pub mod constants {
    /// 重力加速度（m/s²）
    pub const GRAVITY: f64 = 9.8;
}
