use crate::error::{SimulationError, require_positive};
use crate::models::{
    common::{Position3D, Velocity3D},
    traits::ITrajectory,
};

/// 来襲ミサイル
///
/// 初期位置と照準点から一度だけ方向を決め、以後は等速直線運動します。
/// 飛翔中に方向を更新することはありません（誘導は模擬しない）。
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Missile {
    /// 初期位置（t = 0）
    pub origin: Position3D,
    /// 飛翔方向の単位ベクトル
    pub direction: Velocity3D,
    /// 速さ（m/s）
    pub speed: f64,
}

impl Missile {
    /// 照準点に向けて飛翔するミサイルを作成します
    ///
    /// # 引数
    ///
    /// * `origin` - 初期位置
    /// * `aim_point` - 照準点（方向 = 照準点 − 初期位置）
    /// * `speed` - 速さ（m/s）
    ///
    /// # 戻り値
    ///
    /// 照準点が初期位置と一致する場合は `DegenerateGeometry`
    pub fn toward(origin: Position3D, aim_point: Position3D, speed: f64) -> Result<Self, SimulationError> {
        require_positive("missile_speed", speed)?;
        let direction = (aim_point - origin).normalize().map_err(|_| {
            SimulationError::degenerate("missile origin coincides with its aim point")
        })?;
        Ok(Self { origin, direction, speed })
    }

    /// 速度ベクトル
    pub fn velocity(&self) -> Velocity3D {
        self.direction * self.speed
    }
}

impl ITrajectory for Missile {
    fn position_at(&self, t: f64) -> Position3D {
        self.origin + self.velocity() * t
    }
}
