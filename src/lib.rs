//! # smokesim
//!
//! 航空機から投下した煙幕弾の雲が、来襲ミサイルから防護対象への視線を
//! 完全に遮る時間を、運動学シミュレーションにより求めます。
//!
//! - [`models`]: ミサイル・航空機・煙幕弾・煙幕雲・防護対象の運動モデル
//! - [`occlusion`]: 完全遮蔽の判定
//! - [`simulation`]: 固定時間刻みの積分エンジン
//! - [`scenario`]: YAML シナリオ設定
//! - [`logging`]: ログ出力の初期化

pub mod error;
pub mod logging;
pub mod models;
pub mod occlusion;
pub mod scenario;
pub mod simulation;

pub use error::SimulationError;
pub use simulation::{InterferenceResult, InterferenceSimulation, PrecisionConfig, ScenarioParams, calc_interference};
