use crate::models::common::Position3D;

/// 時刻から位置を求められる運動モデルのインターフェース
///
/// 全ての実装は純粋関数であり、絶対時刻（エポックからの経過秒）のみに依存します。
pub trait ITrajectory {
    /// 時刻 `t` における位置
    fn position_at(&self, t: f64) -> Position3D;
}

/// 有効期間を持つ物体のインターフェース
pub trait ILifetime {
    /// 出現時刻（この時刻を含む）
    fn start_time(&self) -> f64;

    /// 消滅時刻（この時刻を含まない）
    fn end_time(&self) -> f64;

    /// 時刻 `t` に存在しているか
    fn is_active_at(&self, t: f64) -> bool {
        self.start_time() <= t && t < self.end_time()
    }
}
