//! # Simulation モジュール
//!
//! 煙幕による遮蔽時間を求める数値積分エンジンを提供します。
//!
//! 起爆時刻から消散時刻まで固定時間刻み（Δt）でサンプリングし、
//! 各時刻でミサイル位置と雲中心を運動モデルから直接求め、遮蔽判定が真なら
//! Δt を加算します（左端点の矩形則）。各ステップは絶対時刻のみに依存し、
//! 前のステップの状態を持ち越しません。
//!
//! ## 並列実行
//!
//! `workers > 1` の場合、サンプル番号の範囲を連続したチャンクに分割し、
//! `workers` 本のワーカースレッドを持つ tokio ランタイム上でタスクとして並列評価します。
//! 集計は整数のステップ数で行い、チャンク順に合流するため、
//! 分割数によらず逐次実行と同一の結果になります。
//!
//! ## 使用例
//!
//! ```rust
//! use smokesim::models::Velocity3D;
//! use smokesim::simulation::{PrecisionConfig, ScenarioParams, calc_interference};
//!
//! let params = ScenarioParams::reference();
//! let precision = PrecisionConfig { dt: 1e-3, workers: 1 };
//! let velocity = Velocity3D::new(-120.0, 0.0, 0.0);
//!
//! let seconds = calc_interference(&params, &precision, velocity, 1.5, 3.6).unwrap();
//! assert!(seconds > 1.3 && seconds < 1.4);
//! ```

use std::ops::Range;

use tracing::{debug, info, trace};

use crate::error::{SimulationError, require_finite, require_positive};
use crate::models::{
    constants::GRAVITY, Aircraft, Canister, ILifetime, ITrajectory, Missile, Position3D, ReleasePlan,
    SmokeCloud, SmokeProperties, Target, Velocity3D,
};
use crate::occlusion::is_fully_occluded;

/// 既定の時間刻み（s）
pub const DEFAULT_DT: f64 = 1e-5;

/// シナリオ定数
///
/// シナリオごとに一度だけ構築し、以後は読み取り専用で使います。
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ScenarioParams {
    /// ミサイル初期位置
    pub missile_origin: Position3D,
    /// ミサイルの照準点（飛翔方向 = 照準点 − 初期位置）
    pub missile_aim_point: Position3D,
    /// ミサイル速さ（m/s）
    pub missile_speed: f64,
    /// 航空機初期位置
    pub aircraft_origin: Position3D,
    /// 防護対象
    pub target: Target,
    /// 煙幕雲の特性
    pub smoke: SmokeProperties,
    /// 重力加速度（m/s²）
    pub gravity: f64,
}

impl ScenarioParams {
    /// 基準シナリオ（M1 / FY1、原点を照準とするミサイル）
    pub fn reference() -> Self {
        Self {
            missile_origin: Position3D::new(20000.0, 0.0, 2000.0),
            missile_aim_point: Position3D::ZERO,
            missile_speed: 300.0,
            aircraft_origin: Position3D::new(17800.0, 0.0, 1800.0),
            target: Target {
                center: Position3D::new(0.0, 200.0, 5.0),
                radius: 7.0,
                half_height: 5.0,
            },
            smoke: SmokeProperties {
                radius: 10.0,
                fall_rate: 3.0,
                duration: 20.0,
            },
            gravity: GRAVITY,
        }
    }

    /// パラメータの検証
    pub fn validate(&self) -> Result<(), SimulationError> {
        if !self.aircraft_origin.is_finite() || !self.missile_origin.is_finite() {
            return Err(SimulationError::degenerate("initial positions must be finite"));
        }
        if self.missile_origin == self.target.center {
            return Err(SimulationError::degenerate("missile origin coincides with target center"));
        }
        Target::new(self.target.center, self.target.radius, self.target.half_height)?;
        SmokeProperties::new(self.smoke.radius, self.smoke.fall_rate, self.smoke.duration)?;
        require_positive("missile_speed", self.missile_speed)?;
        require_finite("gravity", self.gravity)?;
        Ok(())
    }

    /// ミサイルの運動モデル
    pub fn missile(&self) -> Result<Missile, SimulationError> {
        Missile::toward(self.missile_origin, self.missile_aim_point, self.missile_speed)
    }
}

/// 積分精度の設定
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct PrecisionConfig {
    /// 時間刻み（s）。小さいほど正確で計算量が増える
    pub dt: f64,
    /// 並列ワーカー数（1 なら逐次実行）
    pub workers: usize,
}

impl Default for PrecisionConfig {
    fn default() -> Self {
        Self { dt: DEFAULT_DT, workers: 1 }
    }
}

impl PrecisionConfig {
    pub fn validate(&self) -> Result<(), SimulationError> {
        require_positive("dt", self.dt)?;
        if self.workers == 0 {
            return Err(SimulationError::InvalidParameter { name: "workers", value: 0.0 });
        }
        Ok(())
    }
}

/// 1回の評価結果
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct InterferenceResult {
    /// 完全遮蔽の合計時間（s）
    pub duration: f64,
    /// 遮蔽と判定されたサンプル数
    pub occluded_steps: u64,
    /// 評価したサンプル数
    pub total_steps: u64,
    pub dt: f64,
    pub t_explode: f64,
    pub t_dissipate: f64,
    pub detonation_position: Position3D,
    /// 最初に遮蔽と判定されたサンプル時刻
    pub first_occluded_t: Option<f64>,
    /// 最後に遮蔽と判定されたサンプル時刻
    pub last_occluded_t: Option<f64>,
}

/// チャンク単位の集計
#[derive(Debug, Clone, Copy, Default, PartialEq)]
struct StepTally {
    /// 最終サンプルを除く遮蔽サンプル数
    full_steps: u64,
    /// 最終サンプルが遮蔽されていたか
    tail_occluded: bool,
    first: Option<f64>,
    last: Option<f64>,
}

impl StepTally {
    /// チャンク順に合流する
    fn merge(&mut self, next: StepTally) {
        self.full_steps += next.full_steps;
        self.tail_occluded |= next.tail_occluded;
        self.first = self.first.or(next.first);
        self.last = next.last.or(self.last);
    }

    fn occluded_steps(&self) -> u64 {
        self.full_steps + u64::from(self.tail_occluded)
    }
}

/// 1回の評価で固定される幾何条件
///
/// 全フィールドが `Copy` なので、並列チャンクへそのまま渡せます。
#[derive(Debug, Clone, Copy)]
struct EngagementGeometry {
    missile: Missile,
    cloud: SmokeCloud,
    target: Target,
    dt: f64,
    sample_count: u64,
}

impl EngagementGeometry {
    /// 評価区間と時間刻みを検証して構築する
    ///
    /// 区間長がゼロになる起爆時刻や、起爆時刻の分解能を下回る・サンプル数が
    /// `u64` に収まらない時間刻みは `InvalidParameter` として拒否します。
    fn new(missile: Missile, cloud: SmokeCloud, target: Target, dt: f64) -> Result<Self, SimulationError> {
        let span = cloud.t_dissipate - cloud.t_explode;
        if !(span > 0.0) {
            return Err(SimulationError::InvalidParameter { name: "t_explode", value: cloud.t_explode });
        }
        if cloud.t_explode + dt == cloud.t_explode || !((span / dt).ceil() < u64::MAX as f64) {
            return Err(SimulationError::InvalidParameter { name: "dt", value: dt });
        }

        let mut geometry = Self { missile, cloud, target, dt, sample_count: 0 };
        geometry.sample_count = geometry.count_samples()?;
        Ok(geometry)
    }

    /// i 番目のサンプル時刻（累積加算ではなく絶対時刻から求める）
    fn sample_time(&self, index: u64) -> f64 {
        self.cloud.t_explode + index as f64 * self.dt
    }

    /// `sample_time(i) < t_dissipate` を満たすサンプル数
    fn count_samples(&self) -> Result<u64, SimulationError> {
        let span = self.cloud.t_dissipate - self.cloud.t_explode;
        let mut count = (span / self.dt).ceil().max(0.0) as u64;
        while count > 0 && !self.cloud.is_active_at(self.sample_time(count - 1)) {
            count -= 1;
        }
        while self.cloud.is_active_at(self.sample_time(count)) {
            count = count
                .checked_add(1)
                .ok_or(SimulationError::InvalidParameter { name: "dt", value: self.dt })?;
        }
        Ok(count)
    }

    /// 最終サンプルに与える時間幅（消散時刻で打ち切る）
    fn tail_credit(&self) -> f64 {
        match self.sample_count {
            0 => 0.0,
            n => (self.cloud.t_dissipate - self.sample_time(n - 1)).min(self.dt),
        }
    }

    fn is_occluded_at(&self, t: f64) -> Result<bool, SimulationError> {
        let missile_pos = self.missile.position_at(t);
        let cloud_center = self.cloud.position_at(t);
        is_fully_occluded(missile_pos, cloud_center, self.cloud.radius(), &self.target)
    }

    /// サンプル番号の範囲を評価する
    fn tally(&self, range: Range<u64>) -> Result<StepTally, SimulationError> {
        let mut tally = StepTally::default();
        let mut previous = false;

        for index in range {
            let t = self.sample_time(index);
            let occluded = self.is_occluded_at(t)?;

            if occluded != previous {
                trace!(t, occluded, "遮蔽状態が変化");
                previous = occluded;
            }
            if !occluded {
                continue;
            }

            if index + 1 == self.sample_count {
                tally.tail_occluded = true;
            } else {
                tally.full_steps += 1;
            }
            tally.first.get_or_insert(t);
            tally.last = Some(t);
        }

        Ok(tally)
    }
}

/// 遮蔽時間シミュレーション
pub struct InterferenceSimulation {
    params: ScenarioParams,
    precision: PrecisionConfig,
}

impl InterferenceSimulation {
    pub fn new(params: ScenarioParams, precision: PrecisionConfig) -> Result<Self, SimulationError> {
        params.validate()?;
        precision.validate()?;
        Ok(Self { params, precision })
    }

    pub fn params(&self) -> &ScenarioParams {
        &self.params
    }

    pub fn precision(&self) -> &PrecisionConfig {
        &self.precision
    }

    /// 1組の投下パラメータについて遮蔽時間を求める
    pub fn run(
        &self,
        aircraft_velocity: Velocity3D,
        plan: ReleasePlan,
    ) -> Result<InterferenceResult, SimulationError> {
        let plan = ReleasePlan::new(plan.drop_t, plan.explode_t)?;
        let aircraft = Aircraft::new(self.params.aircraft_origin, aircraft_velocity)?;

        let missile = self.params.missile()?;
        let canister = Canister::release(&aircraft, plan, self.params.gravity)?;
        let cloud = SmokeCloud::detonate(canister.detonation_position(), plan.t_explode(), self.params.smoke);
        let geometry = EngagementGeometry::new(missile, cloud, self.params.target, self.precision.dt)?;

        debug!(
            drop_t = plan.drop_t,
            explode_t = plan.explode_t,
            t_explode = cloud.t_explode,
            t_dissipate = cloud.t_dissipate,
            release_x = canister.release_position.x,
            release_y = canister.release_position.y,
            release_z = canister.release_position.z,
            detonation_x = cloud.detonation_position.x,
            detonation_y = cloud.detonation_position.y,
            detonation_z = cloud.detonation_position.z,
            samples = geometry.sample_count,
            "起爆条件を決定"
        );

        let tally = if self.precision.workers > 1 && geometry.sample_count > 1 {
            tally_parallel(geometry, self.precision.workers)?
        } else {
            geometry.tally(0..geometry.sample_count)?
        };

        let tail = if tally.tail_occluded { geometry.tail_credit() } else { 0.0 };
        let duration = tally.full_steps as f64 * self.precision.dt + tail;

        info!(
            duration,
            occluded_steps = tally.occluded_steps(),
            total_steps = geometry.sample_count,
            "遮蔽時間の計算完了"
        );

        Ok(InterferenceResult {
            duration,
            occluded_steps: tally.occluded_steps(),
            total_steps: geometry.sample_count,
            dt: self.precision.dt,
            t_explode: cloud.t_explode,
            t_dissipate: cloud.t_dissipate,
            detonation_position: cloud.detonation_position,
            first_occluded_t: tally.first,
            last_occluded_t: tally.last,
        })
    }
}

/// チャンク分割による並列評価
///
/// 各チャンクは非同期待ちを含まない計算なので、ワーカースレッド上で直接実行します。
fn tally_parallel(geometry: EngagementGeometry, workers: usize) -> Result<StepTally, SimulationError> {
    let total = geometry.sample_count;
    let chunk = total.div_ceil(workers as u64).max(1);

    let runtime = tokio::runtime::Builder::new_multi_thread()
        .worker_threads(workers)
        .build()
        .map_err(|e| SimulationError::Runtime(e.to_string()))?;

    runtime.block_on(async move {
        let handles: Vec<_> = (0..total)
            .step_by(chunk as usize)
            .map(|start| {
                let end = (start + chunk).min(total);
                tokio::spawn(async move { geometry.tally(start..end) })
            })
            .collect();

        let mut tally = StepTally::default();
        for handle in handles {
            let part = handle
                .await
                .map_err(|e| SimulationError::Runtime(e.to_string()))??;
            tally.merge(part);
        }
        Ok::<StepTally, SimulationError>(tally)
    })
}

/// 遮蔽時間（s）を求める
///
/// # 引数
///
/// * `params` - シナリオ定数
/// * `precision` - 時間刻みと並列数
/// * `aircraft_velocity` - 航空機の速度ベクトル（m/s）
/// * `drop_t` - 飛行開始から投下までの時間（s）
/// * `explode_t` - 投下から起爆までの時間（s）
pub fn calc_interference(
    params: &ScenarioParams,
    precision: &PrecisionConfig,
    aircraft_velocity: Velocity3D,
    drop_t: f64,
    explode_t: f64,
) -> Result<f64, SimulationError> {
    let plan = ReleasePlan::new(drop_t, explode_t)?;
    InterferenceSimulation::new(*params, *precision)?
        .run(aircraft_velocity, plan)
        .map(|result| result.duration)
}

#[cfg(test)]
mod tests {
    use super::*;

    const REFERENCE_VELOCITY: Velocity3D = Velocity3D::new(-120.0, 0.0, 0.0);

    fn coarse(dt: f64) -> PrecisionConfig {
        PrecisionConfig { dt, workers: 1 }
    }

    /// 雲が常に視線上にあり、半径が十分大きいシナリオ
    fn always_covered() -> ScenarioParams {
        ScenarioParams {
            missile_origin: Position3D::new(1000.0, 0.0, 0.0),
            missile_aim_point: Position3D::ZERO,
            missile_speed: 10.0,
            // 2 s の自由落下（19.6 m）で高度 0 に起爆する
            aircraft_origin: Position3D::new(400.0, 0.0, 19.6),
            target: Target {
                center: Position3D::ZERO,
                radius: 1.0,
                half_height: 1.0,
            },
            smoke: SmokeProperties {
                radius: 200.0,
                fall_rate: 3.0,
                duration: 20.0,
            },
            gravity: GRAVITY,
        }
    }

    #[test]
    fn test_reference_scenario() {
        let params = ScenarioParams::reference();
        let result = InterferenceSimulation::new(params, coarse(1e-3))
            .unwrap()
            .run(REFERENCE_VELOCITY, ReleasePlan::new(1.5, 3.6).unwrap())
            .unwrap();

        assert!((result.duration - 1.357).abs() < 2e-3, "duration = {}", result.duration);
        assert_eq!(result.total_steps, 20000);
        assert!((result.t_explode - 5.1).abs() < 1e-12);
        assert!((result.t_dissipate - 25.1).abs() < 1e-12);
        assert!((result.detonation_position.x - 17188.0).abs() < 1e-9);
        assert!((result.detonation_position.z - 1736.496).abs() < 1e-9);

        let first = result.first_occluded_t.unwrap();
        let last = result.last_occluded_t.unwrap();
        assert!(first >= result.t_explode && last < result.t_dissipate);
        assert!(last - first <= result.duration);
    }

    #[test]
    fn test_calc_interference_matches_run() {
        let params = ScenarioParams::reference();
        let seconds = calc_interference(&params, &coarse(1e-2), REFERENCE_VELOCITY, 1.5, 3.6).unwrap();
        assert!((seconds - 1.35).abs() < 2e-2, "seconds = {seconds}");
    }

    #[test]
    fn test_precision_convergence() {
        let params = ScenarioParams::reference();
        let coarse_dt = 1e-2;
        let fine_dt = 1e-3;
        let a = calc_interference(&params, &coarse(coarse_dt), REFERENCE_VELOCITY, 1.5, 3.6).unwrap();
        let b = calc_interference(&params, &coarse(fine_dt), REFERENCE_VELOCITY, 1.5, 3.6).unwrap();
        // 矩形則の誤差は区間端ごとに Δt 程度
        assert!((a - b).abs() <= 2.0 * coarse_dt, "a = {a}, b = {b}");
    }

    #[test]
    fn test_result_bounded_by_cloud_lifetime() {
        let params = always_covered();
        let result = InterferenceSimulation::new(params, coarse(0.01))
            .unwrap()
            .run(Velocity3D::ZERO, ReleasePlan::new(1.0, 2.0).unwrap())
            .unwrap();

        assert_eq!(result.total_steps, 2000);
        assert_eq!(result.occluded_steps, 2000);
        assert!((result.duration - 20.0).abs() < 1e-9, "duration = {}", result.duration);
        assert_eq!(result.first_occluded_t, Some(result.t_explode));
    }

    #[test]
    fn test_last_step_clipped_to_dissipation() {
        // 20 s は 0.3 s で割り切れないため、最終サンプルの幅を打ち切る
        let params = always_covered();
        let result = InterferenceSimulation::new(params, coarse(0.3))
            .unwrap()
            .run(Velocity3D::ZERO, ReleasePlan::new(1.0, 2.0).unwrap())
            .unwrap();

        assert_eq!(result.total_steps, 67);
        assert_eq!(result.occluded_steps, 67);
        assert!(result.duration <= params.smoke.duration + 1e-9);
        assert!((result.duration - 20.0).abs() < 1e-9, "duration = {}", result.duration);
        // 最後のサンプルは消散時刻より前
        assert!(result.last_occluded_t.unwrap() < result.t_dissipate);
    }

    #[test]
    fn test_cloud_beyond_target_never_occludes() {
        let mut params = always_covered();
        params.aircraft_origin = Position3D::new(-400.0, 0.0, 19.6);
        let result = InterferenceSimulation::new(params, coarse(0.01))
            .unwrap()
            .run(Velocity3D::ZERO, ReleasePlan::new(1.0, 2.0).unwrap())
            .unwrap();
        assert_eq!(result.duration, 0.0);
        assert_eq!(result.occluded_steps, 0);
        assert_eq!(result.first_occluded_t, None);
    }

    #[test]
    fn test_parallel_matches_sequential() {
        let params = ScenarioParams::reference();
        let plan = ReleasePlan::new(1.5, 3.6).unwrap();
        let sequential = InterferenceSimulation::new(params, coarse(1e-3))
            .unwrap()
            .run(REFERENCE_VELOCITY, plan)
            .unwrap();

        for workers in [2, 3, 8] {
            let parallel = InterferenceSimulation::new(params, PrecisionConfig { dt: 1e-3, workers })
                .unwrap()
                .run(REFERENCE_VELOCITY, plan)
                .unwrap();
            assert_eq!(parallel, sequential, "workers = {workers}");
        }
    }

    #[test]
    fn test_parallel_tail_credit() {
        let params = always_covered();
        let plan = ReleasePlan::new(1.0, 2.0).unwrap();
        let sequential = InterferenceSimulation::new(params, coarse(0.3)).unwrap().run(Velocity3D::ZERO, plan).unwrap();
        let parallel = InterferenceSimulation::new(params, PrecisionConfig { dt: 0.3, workers: 4 })
            .unwrap()
            .run(Velocity3D::ZERO, plan)
            .unwrap();
        assert_eq!(parallel, sequential);
    }

    #[test]
    fn test_invalid_parameters() {
        let params = ScenarioParams::reference();
        assert!(matches!(
            calc_interference(&params, &coarse(1e-3), REFERENCE_VELOCITY, 0.0, 3.6),
            Err(SimulationError::InvalidParameter { name: "drop_t", .. })
        ));
        assert!(matches!(
            calc_interference(&params, &coarse(1e-3), REFERENCE_VELOCITY, 1.5, -1.0),
            Err(SimulationError::InvalidParameter { name: "explode_t", .. })
        ));
        assert!(matches!(
            calc_interference(&params, &coarse(0.0), REFERENCE_VELOCITY, 1.5, 3.6),
            Err(SimulationError::InvalidParameter { name: "dt", .. })
        ));
        assert!(matches!(
            calc_interference(&params, &PrecisionConfig { dt: 1e-3, workers: 0 }, REFERENCE_VELOCITY, 1.5, 3.6),
            Err(SimulationError::InvalidParameter { name: "workers", .. })
        ));
    }

    #[test]
    fn test_dt_below_time_resolution_rejected() {
        // 起爆時刻 5.1 s に加えても時刻が進まない刻み
        let params = ScenarioParams::reference();
        assert!(matches!(
            calc_interference(&params, &coarse(1e-300), REFERENCE_VELOCITY, 1.5, 3.6),
            Err(SimulationError::InvalidParameter { name: "dt", .. })
        ));
        assert!(matches!(
            calc_interference(&params, &PrecisionConfig { dt: 1e-17, workers: 4 }, REFERENCE_VELOCITY, 1.5, 3.6),
            Err(SimulationError::InvalidParameter { name: "dt", .. })
        ));
    }

    #[test]
    fn test_zero_length_window_rejected() {
        // 起爆時刻が大きすぎて t_explode + duration が t_explode に丸められる
        let params = ScenarioParams::reference();
        assert!(matches!(
            calc_interference(&params, &coarse(1e-2), REFERENCE_VELOCITY, 1e300, 3.6),
            Err(SimulationError::InvalidParameter { name: "t_explode", .. })
        ));
        assert!(matches!(
            calc_interference(&params, &coarse(1e-2), REFERENCE_VELOCITY, 1.5, 1e300),
            Err(SimulationError::InvalidParameter { name: "t_explode", .. })
        ));
    }

    #[test]
    fn test_degenerate_missile_at_target() {
        let mut params = ScenarioParams::reference();
        params.missile_origin = params.target.center;
        assert!(matches!(
            calc_interference(&params, &coarse(1e-2), REFERENCE_VELOCITY, 1.5, 3.6),
            Err(SimulationError::DegenerateGeometry(_))
        ));

        let mut params = ScenarioParams::reference();
        params.missile_aim_point = params.missile_origin;
        assert!(matches!(
            calc_interference(&params, &coarse(1e-2), REFERENCE_VELOCITY, 1.5, 3.6),
            Err(SimulationError::DegenerateGeometry(_))
        ));
    }

    #[test]
    fn test_step_tally_merge_order() {
        let mut a = StepTally { full_steps: 3, tail_occluded: false, first: Some(1.0), last: Some(2.0) };
        a.merge(StepTally::default());
        a.merge(StepTally { full_steps: 2, tail_occluded: true, first: Some(5.0), last: Some(6.0) });
        assert_eq!(a.occluded_steps(), 6);
        assert_eq!(a.first, Some(1.0));
        assert_eq!(a.last, Some(6.0));
    }
}
