//! 煙幕弾（投下から起爆まで）の運動モデル

use crate::error::{SimulationError, require_finite, require_positive};
use crate::models::{
    aircraft::Aircraft,
    common::{Position3D, Velocity3D},
    traits::ITrajectory,
};

/// 投下・起爆タイミング
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ReleasePlan {
    /// 航空機が煙幕弾を投下する時刻（s）
    pub drop_t: f64,
    /// 投下から起爆までの間隔（s）
    pub explode_t: f64,
}

impl ReleasePlan {
    pub fn new(drop_t: f64, explode_t: f64) -> Result<Self, SimulationError> {
        require_positive("drop_t", drop_t)?;
        require_positive("explode_t", explode_t)?;
        Ok(Self { drop_t, explode_t })
    }

    /// 起爆時刻
    pub fn t_explode(&self) -> f64 {
        self.drop_t + self.explode_t
    }
}

/// 投下位置 = 投下時刻における航空機位置
pub fn canister_release_position(
    aircraft_origin: Position3D,
    aircraft_velocity: Velocity3D,
    drop_t: f64,
) -> Position3D {
    Aircraft { origin: aircraft_origin, velocity: aircraft_velocity }.position_at(drop_t)
}

/// 投下後 `elapsed` 秒の放物運動による変位
///
/// 水平方向は航空機速度を保ち、鉛直方向のみ重力で加速します。
fn ballistic_displacement(aircraft_velocity: Velocity3D, elapsed: f64, gravity: f64) -> Velocity3D {
    Velocity3D::new(
        aircraft_velocity.x * elapsed,
        aircraft_velocity.y * elapsed,
        aircraft_velocity.z * elapsed - 0.5 * gravity * elapsed.powi(2),
    )
}

/// 起爆位置
pub fn detonation_position(
    release_position: Position3D,
    aircraft_velocity: Velocity3D,
    explode_t: f64,
    gravity: f64,
) -> Position3D {
    release_position + ballistic_displacement(aircraft_velocity, explode_t, gravity)
}

/// 投下済みの煙幕弾
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Canister {
    pub release_position: Position3D,
    pub initial_velocity: Velocity3D,
    pub plan: ReleasePlan,
    pub gravity: f64,
}

impl Canister {
    /// 航空機から投下する
    pub fn release(aircraft: &Aircraft, plan: ReleasePlan, gravity: f64) -> Result<Self, SimulationError> {
        require_finite("gravity", gravity)?;
        Ok(Self {
            release_position: canister_release_position(aircraft.origin, aircraft.velocity, plan.drop_t),
            initial_velocity: aircraft.velocity,
            plan,
            gravity,
        })
    }

    pub fn detonation_position(&self) -> Position3D {
        detonation_position(
            self.release_position,
            self.initial_velocity,
            self.plan.explode_t,
            self.gravity,
        )
    }
}

impl ITrajectory for Canister {
    /// 飛翔中（`drop_t ≤ t ≤ t_explode`）の位置。範囲外の時刻は範囲端に丸めます。
    fn position_at(&self, t: f64) -> Position3D {
        let elapsed = (t - self.plan.drop_t).clamp(0.0, self.plan.explode_t);
        self.release_position + ballistic_displacement(self.initial_velocity, elapsed, self.gravity)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::common::constants::GRAVITY;

    #[test]
    fn test_release_plan_validation() {
        assert!(ReleasePlan::new(1.5, 3.6).is_ok());
        assert!(matches!(
            ReleasePlan::new(0.0, 3.6),
            Err(SimulationError::InvalidParameter { name: "drop_t", .. })
        ));
        assert!(matches!(
            ReleasePlan::new(1.5, -2.0),
            Err(SimulationError::InvalidParameter { name: "explode_t", .. })
        ));
        assert!((ReleasePlan::new(1.5, 3.6).unwrap().t_explode() - 5.1).abs() < 1e-12);
    }

    #[test]
    fn test_reference_detonation_position() {
        let origin = Position3D::new(17800.0, 0.0, 1800.0);
        let v = Velocity3D::new(-120.0, 0.0, 0.0);
        let release = canister_release_position(origin, v, 1.5);
        assert_eq!(release, Position3D::new(17620.0, 0.0, 1800.0));

        let det = detonation_position(release, v, 3.6, GRAVITY);
        assert!((det.x - 17188.0).abs() < 1e-9);
        assert_eq!(det.y, 0.0);
        assert!((det.z - 1736.496).abs() < 1e-9);
    }

    #[test]
    fn test_vertical_velocity_component() {
        let det = detonation_position(Position3D::ZERO, Velocity3D::new(0.0, 0.0, 10.0), 2.0, GRAVITY);
        assert!((det.z - (20.0 - 19.6)).abs() < 1e-12);
    }

    #[test]
    fn test_canister_flight() {
        let plan = ReleasePlan::new(1.0, 2.0).unwrap();
        let aircraft = Aircraft::new(Position3D::new(0.0, 0.0, 100.0), Velocity3D::new(10.0, 0.0, 0.0)).unwrap();
        let canister = Canister::release(&aircraft, plan, GRAVITY).unwrap();

        assert_eq!(canister.position_at(1.0), Position3D::new(10.0, 0.0, 100.0));
        let mid = canister.position_at(2.0);
        assert!((mid.x - 20.0).abs() < 1e-12);
        assert!((mid.z - (100.0 - 4.9)).abs() < 1e-12);
        // 起爆時刻で起爆位置と一致する
        assert_eq!(canister.position_at(plan.t_explode()), canister.detonation_position());
    }
}
