use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};
use thiserror::Error;

use crate::error::SimulationError;
use crate::models::{self, Aircraft, ReleasePlan, SmokeProperties, Target, Velocity3D};
use crate::simulation::{DEFAULT_DT, PrecisionConfig, ScenarioParams};

/// シナリオメタデータ
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct ScenarioMeta {
    pub version: String,
    pub name: String,
    pub description: String,
}

/// シミュレーション設定
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct SimulationConfig {
    pub dt_s: f64,
    #[serde(default = "default_workers")]
    pub workers: usize,
}

fn default_workers() -> usize {
    1
}

/// 物理定数
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct PhysicsConfig {
    pub gravity_mps2: f64,
}

#[derive(Debug, Clone, Copy, Deserialize, Serialize, PartialEq)]
pub struct Position2D {
    pub x_m: f64,
    pub y_m: f64,
}

#[derive(Debug, Clone, Copy, Deserialize, Serialize, PartialEq)]
pub struct Position3D {
    pub x_m: f64,
    pub y_m: f64,
    pub z_m: f64,
}

impl From<Position3D> for models::Position3D {
    fn from(p: Position3D) -> Self {
        models::Position3D::new(p.x_m, p.y_m, p.z_m)
    }
}

/// 防護対象（円柱）設定
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct TargetConfig {
    /// 底面中心
    pub base_center: Position3D,
    pub radius_m: f64,
    pub height_m: f64,
}

/// 来襲ミサイル設定
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct MissileConfig {
    pub id: String,
    pub pos: Position3D,
    pub speed_mps: f64,
}

/// 航空機設定
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct AircraftFleetConfig {
    /// 許容速度範囲 [min, max]
    pub speed_range_mps: [f64; 2],
    pub units: Vec<AircraftConfig>,
}

#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct AircraftConfig {
    pub id: String,
    pub pos: Position3D,
}

/// 煙幕設定
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct SmokeConfig {
    pub radius_m: f64,
    pub fall_speed_mps: f64,
    pub duration_s: f64,
}

/// 評価する交戦条件（ミサイル1発・航空機1機・煙幕弾1発）
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct EngagementConfig {
    pub missile_id: String,
    pub aircraft_id: String,
    pub speed_mps: f64,
    /// 航空機は高度を保ったままこの水平点へ向かう
    pub heading_toward_xy: Position2D,
    pub drop_s: f64,
    pub explode_delay_s: f64,
}

/// 完全なシナリオ設定
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct ScenarioConfig {
    pub meta: ScenarioMeta,
    pub sim: SimulationConfig,
    pub physics: PhysicsConfig,
    pub target: TargetConfig,
    /// ミサイルの照準点（全ミサイル共通）
    pub missile_aim_point: Position3D,
    pub missiles: Vec<MissileConfig>,
    pub aircraft: AircraftFleetConfig,
    pub smoke: SmokeConfig,
    pub engagement: EngagementConfig,
}

/// 解決済みの評価条件
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Engagement {
    pub params: ScenarioParams,
    pub precision: PrecisionConfig,
    pub aircraft_velocity: Velocity3D,
    pub plan: ReleasePlan,
}

impl ScenarioConfig {
    /// YAMLファイルからシナリオ設定を読み込み
    pub fn from_file<P: AsRef<Path>>(path: P) -> Result<Self, ScenarioError> {
        let path = path.as_ref();

        if !path.exists() {
            return Err(ScenarioError::FileNotFound(path.to_path_buf()));
        }

        let contents = fs::read_to_string(path)
            .map_err(|e| ScenarioError::Io(path.to_path_buf(), e))?;

        let config: ScenarioConfig = serde_yaml::from_str(&contents)
            .map_err(|e| ScenarioError::Parse(path.to_path_buf(), e))?;

        config.validate()?;

        Ok(config)
    }

    /// YAML文字列から読み込み
    pub fn from_yaml_str(contents: &str) -> Result<Self, ScenarioError> {
        let config: ScenarioConfig = serde_yaml::from_str(contents)
            .map_err(|e| ScenarioError::Parse(PathBuf::from("<inline>"), e))?;
        config.validate()?;
        Ok(config)
    }

    /// 組み込みの基準シナリオ
    ///
    /// ミサイル M1〜M3、航空機 FY1〜FY5 を持ち、M1 / FY1 の交戦を評価します。
    pub fn builtin() -> Self {
        let pos = |x_m, y_m, z_m| Position3D { x_m, y_m, z_m };
        let missile = |id: &str, p| MissileConfig { id: id.to_string(), pos: p, speed_mps: 300.0 };
        let aircraft = |id: &str, p| AircraftConfig { id: id.to_string(), pos: p };

        Self {
            meta: ScenarioMeta {
                version: "1.0".to_string(),
                name: "builtin".to_string(),
                description: "FY1 が M1 に対して煙幕弾を1発投下する基準シナリオ".to_string(),
            },
            sim: SimulationConfig { dt_s: DEFAULT_DT, workers: 1 },
            physics: PhysicsConfig { gravity_mps2: models::constants::GRAVITY },
            target: TargetConfig {
                base_center: pos(0.0, 200.0, 0.0),
                radius_m: 7.0,
                height_m: 10.0,
            },
            missile_aim_point: pos(0.0, 0.0, 0.0),
            missiles: vec![
                missile("M1", pos(20000.0, 0.0, 2000.0)),
                missile("M2", pos(19000.0, 600.0, 2100.0)),
                missile("M3", pos(18000.0, -600.0, 1900.0)),
            ],
            aircraft: AircraftFleetConfig {
                speed_range_mps: [70.0, 140.0],
                units: vec![
                    aircraft("FY1", pos(17800.0, 0.0, 1800.0)),
                    aircraft("FY2", pos(12000.0, 1400.0, 1400.0)),
                    aircraft("FY3", pos(6000.0, -3000.0, 700.0)),
                    aircraft("FY4", pos(11000.0, 2000.0, 1800.0)),
                    aircraft("FY5", pos(13000.0, -2000.0, 1300.0)),
                ],
            },
            smoke: SmokeConfig { radius_m: 10.0, fall_speed_mps: 3.0, duration_s: 20.0 },
            engagement: EngagementConfig {
                missile_id: "M1".to_string(),
                aircraft_id: "FY1".to_string(),
                speed_mps: 120.0,
                heading_toward_xy: Position2D { x_m: 0.0, y_m: 0.0 },
                drop_s: 1.5,
                explode_delay_s: 3.6,
            },
        }
    }

    /// 設定の基本的な検証
    pub fn validate(&self) -> Result<(), ScenarioError> {
        if self.sim.dt_s <= 0.0 || !self.sim.dt_s.is_finite() {
            return Err(ScenarioError::Validation("dt_s must be positive".to_string()));
        }
        if self.sim.workers == 0 {
            return Err(ScenarioError::Validation("workers must be at least 1".to_string()));
        }
        if self.target.radius_m <= 0.0 || self.target.height_m <= 0.0 {
            return Err(ScenarioError::Validation("target radius and height must be positive".to_string()));
        }
        if self.smoke.radius_m <= 0.0 || self.smoke.duration_s <= 0.0 || self.smoke.fall_speed_mps < 0.0 {
            return Err(ScenarioError::Validation("Invalid smoke properties".to_string()));
        }
        if let Some(m) = self.missiles.iter().find(|m| m.speed_mps <= 0.0) {
            return Err(ScenarioError::Validation(format!("Missile {} speed must be positive", m.id)));
        }

        let [v_min, v_max] = self.aircraft.speed_range_mps;
        if v_min <= 0.0 || v_min > v_max {
            return Err(ScenarioError::Validation("Invalid aircraft speed range".to_string()));
        }

        let engagement = &self.engagement;
        self.find_missile(&engagement.missile_id)?;
        self.find_aircraft(&engagement.aircraft_id)?;
        if engagement.speed_mps < v_min || engagement.speed_mps > v_max {
            return Err(ScenarioError::Validation(format!(
                "Aircraft speed {} outside range [{}, {}]",
                engagement.speed_mps, v_min, v_max
            )));
        }
        if engagement.drop_s <= 0.0 || engagement.explode_delay_s <= 0.0 {
            return Err(ScenarioError::Validation("drop_s and explode_delay_s must be positive".to_string()));
        }

        Ok(())
    }

    fn find_missile(&self, id: &str) -> Result<&MissileConfig, ScenarioError> {
        self.missiles
            .iter()
            .find(|m| m.id == id)
            .ok_or_else(|| ScenarioError::UnknownMissile(id.to_string()))
    }

    fn find_aircraft(&self, id: &str) -> Result<&AircraftConfig, ScenarioError> {
        self.aircraft
            .units
            .iter()
            .find(|a| a.id == id)
            .ok_or_else(|| ScenarioError::UnknownAircraft(id.to_string()))
    }

    /// 交戦条件を解決し、シミュレーション入力に変換
    pub fn resolve(&self) -> Result<Engagement, ScenarioError> {
        let engagement = &self.engagement;
        let missile = self.find_missile(&engagement.missile_id)?;
        let aircraft = self.find_aircraft(&engagement.aircraft_id)?;
        let aircraft_origin: models::Position3D = aircraft.pos.into();

        let params = ScenarioParams {
            missile_origin: missile.pos.into(),
            missile_aim_point: self.missile_aim_point.into(),
            missile_speed: missile.speed_mps,
            aircraft_origin,
            target: Target::from_base(self.target.base_center.into(), self.target.radius_m, self.target.height_m)?,
            smoke: SmokeProperties::new(self.smoke.radius_m, self.smoke.fall_speed_mps, self.smoke.duration_s)?,
            gravity: self.physics.gravity_mps2,
        };
        params.validate()?;

        let aircraft_velocity = Aircraft::level_flight_toward(
            aircraft_origin,
            engagement.speed_mps,
            engagement.heading_toward_xy.x_m,
            engagement.heading_toward_xy.y_m,
        )?;

        Ok(Engagement {
            params,
            precision: PrecisionConfig { dt: self.sim.dt_s, workers: self.sim.workers },
            aircraft_velocity,
            plan: ReleasePlan::new(engagement.drop_s, engagement.explode_delay_s)?,
        })
    }

    /// シナリオの概要を表示
    pub fn print_summary(&self) {
        println!("=== シナリオ情報 ===");
        println!("名前: {}", self.meta.name);
        println!("説明: {}", self.meta.description);
        println!("バージョン: {}", self.meta.version);
        println!();

        println!("=== シミュレーション設定 ===");
        println!("時間刻み: {}秒", self.sim.dt_s);
        println!("並列ワーカー数: {}", self.sim.workers);
        println!("重力加速度: {} m/s²", self.physics.gravity_mps2);
        println!();

        println!("=== 防護対象 ===");
        let base = &self.target.base_center;
        println!("底面中心: ({}, {}, {})", base.x_m, base.y_m, base.z_m);
        println!("半径: {} m / 高さ: {} m", self.target.radius_m, self.target.height_m);
        println!();

        println!("=== 来襲ミサイル ===");
        for m in &self.missiles {
            println!("  {}: ({}, {}, {}) {} m/s", m.id, m.pos.x_m, m.pos.y_m, m.pos.z_m, m.speed_mps);
        }
        println!();

        println!("=== 航空機 ===");
        let [v_min, v_max] = self.aircraft.speed_range_mps;
        println!("速度範囲: {} 〜 {} m/s", v_min, v_max);
        for a in &self.aircraft.units {
            println!("  {}: ({}, {}, {})", a.id, a.pos.x_m, a.pos.y_m, a.pos.z_m);
        }
        println!();

        println!("=== 煙幕 ===");
        println!(
            "半径: {} m / 沈降速度: {} m/s / 有効時間: {} s",
            self.smoke.radius_m, self.smoke.fall_speed_mps, self.smoke.duration_s
        );
        println!();

        let e = &self.engagement;
        println!("=== 交戦条件 ===");
        println!("{} → {} ({} m/s)", e.aircraft_id, e.missile_id, e.speed_mps);
        println!("投下時刻: {} s / 起爆間隔: {} s", e.drop_s, e.explode_delay_s);
    }
}

/// シナリオ読み込みエラー
#[derive(Error, Debug)]
pub enum ScenarioError {
    #[error("シナリオファイルが見つかりません: {}", .0.display())]
    FileNotFound(PathBuf),
    #[error("ファイル読み込みエラー {}: {}", .0.display(), .1)]
    Io(PathBuf, #[source] std::io::Error),
    #[error("YAML解析エラー {}: {}", .0.display(), .1)]
    Parse(PathBuf, #[source] serde_yaml::Error),
    #[error("設定検証エラー: {0}")]
    Validation(String),
    #[error("未定義のミサイルID: {0}")]
    UnknownMissile(String),
    #[error("未定義の航空機ID: {0}")]
    UnknownAircraft(String),
    #[error(transparent)]
    Simulation(#[from] SimulationError),
}

#[cfg(test)]
mod tests {
    use super::*;

    const SCENARIO_YAML: &str = r#"
meta:
  version: "1.0"
  name: test
  description: inline scenario
sim:
  dt_s: 0.001
physics:
  gravity_mps2: 9.8
target:
  base_center: { x_m: 0.0, y_m: 200.0, z_m: 0.0 }
  radius_m: 7.0
  height_m: 10.0
missile_aim_point: { x_m: 0.0, y_m: 0.0, z_m: 0.0 }
missiles:
  - id: M1
    pos: { x_m: 20000.0, y_m: 0.0, z_m: 2000.0 }
    speed_mps: 300.0
aircraft:
  speed_range_mps: [70.0, 140.0]
  units:
    - id: FY1
      pos: { x_m: 17800.0, y_m: 0.0, z_m: 1800.0 }
smoke:
  radius_m: 10.0
  fall_speed_mps: 3.0
  duration_s: 20.0
engagement:
  missile_id: M1
  aircraft_id: FY1
  speed_mps: 120.0
  heading_toward_xy: { x_m: 0.0, y_m: 0.0 }
  drop_s: 1.5
  explode_delay_s: 3.6
"#;

    #[test]
    fn test_parse_inline_yaml() {
        let config = ScenarioConfig::from_yaml_str(SCENARIO_YAML).unwrap();
        assert_eq!(config.sim.workers, 1);
        assert_eq!(config.missiles.len(), 1);

        let engagement = config.resolve().unwrap();
        assert_eq!(engagement.params.target.center, models::Position3D::new(0.0, 200.0, 5.0));
        assert_eq!(engagement.params.target.half_height, 5.0);
        assert!((engagement.aircraft_velocity.x + 120.0).abs() < 1e-12);
        assert_eq!(engagement.aircraft_velocity.z, 0.0);
        assert_eq!(engagement.precision.dt, 0.001);
        assert_eq!(engagement.plan, ReleasePlan { drop_t: 1.5, explode_t: 3.6 });
    }

    #[test]
    fn test_builtin_matches_reference_params() {
        let config = ScenarioConfig::builtin();
        config.validate().unwrap();
        let engagement = config.resolve().unwrap();
        assert_eq!(engagement.params, ScenarioParams::reference());
        assert_eq!(config.missiles.len(), 3);
        assert_eq!(config.aircraft.units.len(), 5);
    }

    #[test]
    fn test_builtin_yaml_roundtrip_is_valid() {
        let yaml = serde_yaml::to_string(&ScenarioConfig::builtin()).unwrap();
        let config = ScenarioConfig::from_yaml_str(&yaml).unwrap();
        assert_eq!(config.engagement.aircraft_id, "FY1");
    }

    #[test]
    fn test_unknown_ids() {
        let mut config = ScenarioConfig::builtin();
        config.engagement.missile_id = "M9".to_string();
        assert!(matches!(config.validate(), Err(ScenarioError::UnknownMissile(id)) if id == "M9"));

        let mut config = ScenarioConfig::builtin();
        config.engagement.aircraft_id = "FY9".to_string();
        assert!(matches!(config.resolve(), Err(ScenarioError::UnknownAircraft(_))));
    }

    #[test]
    fn test_speed_out_of_range() {
        let mut config = ScenarioConfig::builtin();
        config.engagement.speed_mps = 150.0;
        assert!(matches!(config.validate(), Err(ScenarioError::Validation(_))));
    }

    #[test]
    fn test_invalid_timing() {
        let mut config = ScenarioConfig::builtin();
        config.engagement.drop_s = 0.0;
        assert!(config.validate().is_err());

        let mut config = ScenarioConfig::builtin();
        config.sim.dt_s = -0.1;
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_degenerate_heading() {
        let mut config = ScenarioConfig::builtin();
        config.engagement.heading_toward_xy = Position2D { x_m: 17800.0, y_m: 0.0 };
        assert!(matches!(
            config.resolve(),
            Err(ScenarioError::Simulation(SimulationError::DegenerateGeometry(_)))
        ));
    }

    #[test]
    fn test_bundled_scenario_file() {
        let path = Path::new(env!("CARGO_MANIFEST_DIR")).join("scenarios/fy1_m1.yaml");
        let config = ScenarioConfig::from_file(path).unwrap();
        assert_eq!(config.sim.workers, 4);
        assert_eq!(config.aircraft.units.len(), 5);

        let engagement = config.resolve().unwrap();
        assert_eq!(engagement.params, ScenarioParams::reference());
    }

    #[test]
    fn test_missing_file() {
        let result = ScenarioConfig::from_file("does/not/exist.yaml");
        assert!(matches!(result, Err(ScenarioError::FileNotFound(_))));
    }

    #[test]
    fn test_parse_error() {
        assert!(matches!(
            ScenarioConfig::from_yaml_str("meta: [unclosed"),
            Err(ScenarioError::Parse(_, _))
        ));
    }
}
