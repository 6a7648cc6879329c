use crate::error::{SimulationError, require_positive};
use crate::models::{
    common::Position3D,
    traits::{ILifetime, ITrajectory},
};

/// 煙幕雲の物理特性（シナリオ定数）
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct SmokeProperties {
    /// 球の半径（m）
    pub radius: f64,
    /// 沈降速度（m/s）
    pub fall_rate: f64,
    /// 起爆から消散までの時間（s）
    pub duration: f64,
}

impl SmokeProperties {
    pub fn new(radius: f64, fall_rate: f64, duration: f64) -> Result<Self, SimulationError> {
        require_positive("cloud_radius", radius)?;
        require_positive("cloud_duration", duration)?;
        if !fall_rate.is_finite() || fall_rate < 0.0 {
            return Err(SimulationError::InvalidParameter { name: "cloud_fall_rate", value: fall_rate });
        }
        Ok(Self { radius, fall_rate, duration })
    }
}

/// 時刻 `t` の雲中心
///
/// 水平位置は起爆位置に固定、高度は一定速度で沈降します。
/// `[t_explode, t_dissipate)` の外で呼び出してはいけません。
pub fn cloud_center(detonation_position: Position3D, t: f64, t_explode: f64, fall_rate: f64) -> Position3D {
    let time_since_explode = t - t_explode;
    Position3D::new(
        detonation_position.x,
        detonation_position.y,
        detonation_position.z - fall_rate * time_since_explode,
    )
}

/// 起爆後の煙幕雲
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct SmokeCloud {
    pub detonation_position: Position3D,
    pub t_explode: f64,
    pub t_dissipate: f64,
    pub properties: SmokeProperties,
}

impl SmokeCloud {
    pub fn detonate(detonation_position: Position3D, t_explode: f64, properties: SmokeProperties) -> Self {
        Self {
            detonation_position,
            t_explode,
            t_dissipate: t_explode + properties.duration,
            properties,
        }
    }

    pub fn radius(&self) -> f64 {
        self.properties.radius
    }
}

impl ITrajectory for SmokeCloud {
    fn position_at(&self, t: f64) -> Position3D {
        debug_assert!(self.is_active_at(t), "cloud sampled outside its lifetime: t = {t}");
        cloud_center(self.detonation_position, t, self.t_explode, self.properties.fall_rate)
    }
}

impl ILifetime for SmokeCloud {
    fn start_time(&self) -> f64 {
        self.t_explode
    }

    fn end_time(&self) -> f64 {
        self.t_dissipate
    }
}
