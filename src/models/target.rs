use crate::error::{SimulationError, require_finite, require_positive};
use crate::models::common::Position3D;

/// 防護対象（円柱）
///
/// 中心は円柱体積の幾何中心です。シミュレーション中は不変です。
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Target {
    /// 円柱の幾何中心
    pub center: Position3D,
    /// 円柱半径（m）
    pub radius: f64,
    /// 円柱の半高（m）
    pub half_height: f64,
}

impl Target {
    pub fn new(center: Position3D, radius: f64, half_height: f64) -> Result<Self, SimulationError> {
        if !center.is_finite() {
            return Err(SimulationError::degenerate("target center is not finite"));
        }
        require_positive("target_radius", radius)?;
        require_finite("target_half_height", half_height)?;
        if half_height < 0.0 {
            return Err(SimulationError::InvalidParameter {
                name: "target_half_height",
                value: half_height,
            });
        }
        Ok(Self { center, radius, half_height })
    }

    /// 底面中心と全高から円柱を作成
    pub fn from_base(base_center: Position3D, radius: f64, height: f64) -> Result<Self, SimulationError> {
        let half_height = height / 2.0;
        let center = Position3D::new(base_center.x, base_center.y, base_center.z + half_height);
        Self::new(center, radius, half_height)
    }

    /// 全高（m）
    pub fn height(&self) -> f64 {
        self.half_height * 2.0
    }
}
