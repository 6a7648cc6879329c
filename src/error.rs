//! # Error モジュール
//!
//! シミュレーション中核で発生するエラーを定義します。
//! すべてのエラーは呼び出し元へそのまま返され、部分的な結果は返しません。

use thiserror::Error;

/// シミュレーション計算のエラー
#[derive(Error, Debug, Clone, PartialEq)]
pub enum SimulationError {
    /// 方向ベクトルの長さがゼロになり、単位ベクトルが定義できない
    #[error("幾何条件が退化しています: {0}")]
    DegenerateGeometry(String),

    /// 非正値・非有限値などの不正な入力
    #[error("不正なパラメータ {name} = {value}")]
    InvalidParameter { name: &'static str, value: f64 },

    /// 並列実行ランタイムの構築・合流に失敗
    #[error("並列実行エラー: {0}")]
    Runtime(String),
}

impl SimulationError {
    pub(crate) fn degenerate(what: impl Into<String>) -> Self {
        SimulationError::DegenerateGeometry(what.into())
    }
}

/// 正の有限値であることを検証する
pub(crate) fn require_positive(name: &'static str, value: f64) -> Result<f64, SimulationError> {
    if value.is_finite() && value > 0.0 {
        Ok(value)
    } else {
        Err(SimulationError::InvalidParameter { name, value })
    }
}

/// 有限値であることを検証する（ゼロ・負値は許容）
pub(crate) fn require_finite(name: &'static str, value: f64) -> Result<f64, SimulationError> {
    if value.is_finite() {
        Ok(value)
    } else {
        Err(SimulationError::InvalidParameter { name, value })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_require_positive() {
        assert_eq!(require_positive("dt", 0.5), Ok(0.5));
        assert_eq!(
            require_positive("dt", 0.0),
            Err(SimulationError::InvalidParameter { name: "dt", value: 0.0 })
        );
        assert!(require_positive("dt", -1.0).is_err());
        assert!(require_positive("dt", f64::NAN).is_err());
        assert!(require_positive("dt", f64::INFINITY).is_err());
    }

    #[test]
    fn test_require_finite() {
        assert!(require_finite("vz", 0.0).is_ok());
        assert!(require_finite("vz", -3.0).is_ok());
        assert!(require_finite("vz", f64::NEG_INFINITY).is_err());
    }

    #[test]
    fn test_error_display() {
        let err = SimulationError::InvalidParameter { name: "drop_t", value: -1.0 };
        assert!(err.to_string().contains("drop_t"));
        let err = SimulationError::degenerate("missile origin equals aim point");
        assert!(err.to_string().contains("missile origin equals aim point"));
    }
}
