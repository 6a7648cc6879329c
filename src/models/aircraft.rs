use crate::error::{SimulationError, require_positive};
use crate::models::{
    common::{Position3D, Velocity3D},
    traits::ITrajectory,
};

/// 煙幕弾を投下する航空機
///
/// 初期位置と速度ベクトルで定まる等速直線運動をします。
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Aircraft {
    pub origin: Position3D,
    pub velocity: Velocity3D,
}

impl Aircraft {
    pub fn new(origin: Position3D, velocity: Velocity3D) -> Result<Self, SimulationError> {
        if !origin.is_finite() || !velocity.is_finite() {
            return Err(SimulationError::degenerate("aircraft state is not finite"));
        }
        Ok(Self { origin, velocity })
    }

    /// 高度を保ったまま水平面上の点に向かう速度ベクトルを求めます
    ///
    /// # 引数
    ///
    /// * `origin` - 航空機の初期位置
    /// * `speed` - 速さ（m/s）
    /// * `aim_x`, `aim_y` - 水平面上の目標点
    ///
    /// # 戻り値
    ///
    /// 鉛直成分ゼロの速度ベクトル。初期位置が目標点の真上にある場合は `DegenerateGeometry`
    pub fn level_flight_toward(
        origin: Position3D,
        speed: f64,
        aim_x: f64,
        aim_y: f64,
    ) -> Result<Velocity3D, SimulationError> {
        require_positive("aircraft_speed", speed)?;
        let heading = Position3D::new(aim_x - origin.x, aim_y - origin.y, 0.0)
            .normalize()
            .map_err(|_| SimulationError::degenerate("aircraft is already above its heading point"))?;
        Ok(heading * speed)
    }
}

impl ITrajectory for Aircraft {
    fn position_at(&self, t: f64) -> Position3D {
        self.origin + self.velocity * t
    }
}
