//! # Logging モジュール
//!
//! tracing によるログ出力の初期化を行います。
//!
//! コンソール出力は compact 形式、ファイル出力は tracing-appender による
//! 日次ローテーションの非同期書き込み（JSON 形式）です。
//! `RUST_LOG` 環境変数が設定されていれば、設定ファイルのレベルより優先されます。
//!
//! ## 設定可能な出力先
//!
//! - `Console`: コンソールのみ
//! - `File`: ファイルのみ（logs/smokesim.YYYY-MM-DD）
//! - `Both`: コンソールとファイルの両方

use std::str::FromStr;

use thiserror::Error;
use tracing::Level;
use tracing_appender::{non_blocking, non_blocking::WorkerGuard, rolling};
use tracing_subscriber::{EnvFilter, Registry, fmt, layer::SubscriberExt, util::SubscriberInitExt};

/// ログ初期化のエラー
#[derive(Error, Debug)]
pub enum LoggingError {
    #[error("無効な出力先: {0}. 利用可能: console, file, both")]
    InvalidOutput(String),
    #[error("無効なログレベル: {0}. 利用可能: trace, debug, info, warn, error")]
    InvalidLevel(String),
    #[error("ログディレクトリを作成できません: {0}")]
    Directory(#[from] std::io::Error),
    #[error("ログシステムの初期化に失敗: {0}")]
    Init(#[from] tracing_subscriber::util::TryInitError),
}

/// ログ出力先の設定
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum LogOutput {
    /// コンソールのみ
    Console,
    /// ファイルのみ
    File,
    /// コンソールとファイルの両方
    Both,
}

impl LogOutput {
    fn writes_console(self) -> bool {
        matches!(self, LogOutput::Console | LogOutput::Both)
    }

    fn writes_file(self) -> bool {
        matches!(self, LogOutput::File | LogOutput::Both)
    }
}

impl FromStr for LogOutput {
    type Err = LoggingError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "console" | "stdout" => Ok(LogOutput::Console),
            "file" => Ok(LogOutput::File),
            "both" | "all" => Ok(LogOutput::Both),
            _ => Err(LoggingError::InvalidOutput(s.to_string())),
        }
    }
}

/// ログ設定構造体
#[derive(Debug, Clone)]
pub struct LogConfig {
    /// ログレベル
    pub level: Level,
    /// 出力先
    pub output: LogOutput,
    /// ログファイルのディレクトリ（File または Both の場合）
    pub log_dir: String,
    /// ログファイル名のプレフィックス
    pub file_prefix: String,
}

impl Default for LogConfig {
    fn default() -> Self {
        Self {
            level: Level::WARN,
            output: LogOutput::Console,
            log_dir: "logs".to_string(),
            file_prefix: "smokesim".to_string(),
        }
    }
}

/// ログシステムを初期化
///
/// ファイル出力を行う場合は非同期書き込みのガードを返します。
/// ガードを破棄すると未書き込みのログが失われるため、呼び出し元で
/// プログラム終了まで保持してください。
///
/// # 例
///
/// ```rust,no_run
/// use smokesim::logging::{LogConfig, LogOutput, init_logging};
/// use tracing::Level;
///
/// let config = LogConfig {
///     level: Level::DEBUG,
///     output: LogOutput::Both,
///     ..LogConfig::default()
/// };
///
/// let _guard = init_logging(&config).expect("ログ初期化に失敗");
/// ```
pub fn init_logging(config: &LogConfig) -> Result<Option<WorkerGuard>, LoggingError> {
    let env_filter = EnvFilter::try_from_default_env()
        .or_else(|_| EnvFilter::try_new(config.level.to_string()))
        .unwrap_or_else(|_| EnvFilter::new("warn"));

    let console_layer = config.output.writes_console().then(|| {
        fmt::layer()
            .with_writer(std::io::stderr)
            .with_target(true)
            .with_thread_ids(false)
            .compact()
    });

    let (file_layer, guard) = if config.output.writes_file() {
        ensure_log_directory(&config.log_dir)?;
        let file_appender = rolling::daily(&config.log_dir, &config.file_prefix);
        let (writer, guard) = non_blocking(file_appender);
        let layer = fmt::layer()
            .with_writer(writer)
            .with_target(true)
            .with_thread_ids(true)
            .json();
        (Some(layer), Some(guard))
    } else {
        (None, None)
    };

    Registry::default()
        .with(env_filter)
        .with(console_layer)
        .with(file_layer)
        .try_init()?;

    Ok(guard)
}

/// ログレベルを文字列から解析
pub fn parse_log_level(level_str: &str) -> Result<Level, LoggingError> {
    match level_str.to_lowercase().as_str() {
        "trace" => Ok(Level::TRACE),
        "debug" => Ok(Level::DEBUG),
        "info" => Ok(Level::INFO),
        "warn" => Ok(Level::WARN),
        "error" => Ok(Level::ERROR),
        _ => Err(LoggingError::InvalidLevel(level_str.to_string())),
    }
}

/// 詳細出力レベル（-v の回数）からログレベルを決める
pub fn level_from_verbosity(verbose: u8) -> Level {
    match verbose {
        0 => Level::WARN,
        1 => Level::INFO,
        2 => Level::DEBUG,
        _ => Level::TRACE,
    }
}

/// ログディレクトリを作成
pub fn ensure_log_directory(log_dir: &str) -> Result<(), std::io::Error> {
    std::fs::create_dir_all(log_dir)
}
