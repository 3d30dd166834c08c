//! ログ初期化モジュール
//!
//! `tracing` + `tracing-subscriber` を使用して、ログを外部ファイルに出力する。
//! 端末は会話専用のため、ログは一切端末に出さない。
//! ログファイルはデータディレクトリの `logs/` に日次ローテーション（ローカル日付）で保存される。

use std::fs::{File, OpenOptions};
use std::io::Write;
use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use chrono::{Local, NaiveDate};
use directories::ProjectDirs;
use tracing::level_filters::LevelFilter;
use tracing_subscriber::fmt::time::FormatTime;
use tracing_subscriber::{fmt, EnvFilter};

/// ログレベルを上書きする環境変数
const LOG_ENV: &str = "KUBECTL_AI_LOG";

/// ログファイル名のプレフィックス
const LOG_PREFIX: &str = "kubectl-ai.log";

// ---------------------------------------------------------------------------
// ローカル時刻タイマー
// ---------------------------------------------------------------------------

/// ログ行のタイムスタンプをローカル時刻（オフセット付き）で出力するタイマー
struct LocalTimer;

impl FormatTime for LocalTimer {
    fn format_time(&self, w: &mut tracing_subscriber::fmt::format::Writer<'_>) -> std::fmt::Result {
        write!(w, "{}", Local::now().format("%Y-%m-%dT%H:%M:%S%.3f%:z"))
    }
}

// ---------------------------------------------------------------------------
// 日次ローリングファイルアペンダー
// ---------------------------------------------------------------------------

/// ローカル日付で日次ローテーションするファイルアペンダー。
///
/// 書き込み時に現在の日付を確認し、日付が変わっていれば新しいファイルを開く。
/// `tracing_appender::non_blocking` と組み合わせて使用する。
struct DailyAppender {
    dir: PathBuf,
    current_date: NaiveDate,
    file: File,
}

impl DailyAppender {
    fn new(dir: PathBuf) -> std::io::Result<Self> {
        let today = Local::now().date_naive();
        let file = Self::open_log_file(&dir, today)?;
        Ok(Self {
            dir,
            current_date: today,
            file,
        })
    }

    /// 指定した日付のログファイルを開く（なければ作成）。
    fn open_log_file(dir: &Path, date: NaiveDate) -> std::io::Result<File> {
        OpenOptions::new()
            .create(true)
            .append(true)
            .open(dir.join(log_file_name(date)))
    }
}

impl Write for DailyAppender {
    fn write(&mut self, buf: &[u8]) -> std::io::Result<usize> {
        let today = Local::now().date_naive();
        if today != self.current_date {
            self.file = Self::open_log_file(&self.dir, today)?;
            self.current_date = today;
        }
        self.file.write(buf)
    }

    fn flush(&mut self) -> std::io::Result<()> {
        self.file.flush()
    }
}

fn log_file_name(date: NaiveDate) -> String {
    format!("{LOG_PREFIX}.{}", date.format("%Y-%m-%d"))
}

// ---------------------------------------------------------------------------
// ログ初期化
// ---------------------------------------------------------------------------

/// ログの出力先ディレクトリを決定する。
/// プラットフォームのデータディレクトリが取れなければ `./var/logs` を使用する。
fn log_dir() -> PathBuf {
    match ProjectDirs::from("", "", "kubectl-ai") {
        Some(dirs) => dirs.data_dir().join("logs"),
        None => std::env::current_dir()
            .unwrap_or_else(|_| PathBuf::from("."))
            .join("var")
            .join("logs"),
    }
}

/// 設定値のログレベルを検証する。不正な値は `info` にフォールバックする。
fn level_or_default(level: &str) -> LevelFilter {
    let level = level.trim();
    if level.is_empty() {
        return LevelFilter::INFO;
    }
    level.parse::<LevelFilter>().unwrap_or(LevelFilter::INFO)
}

/// ログシステムを初期化する。
///
/// - ログレベルは `KUBECTL_AI_LOG` 環境変数（EnvFilter 構文）で制御し、未設定なら `level`
/// - フォーマット: タイムスタンプ + レベル + ターゲット + メッセージ
///
/// 返したガードは `main()` で保持し続ける必要がある（ドロップするとログ出力が停止する）。
pub fn init_logging(level: &str) -> Result<tracing_appender::non_blocking::WorkerGuard> {
    let log_dir = log_dir();

    std::fs::create_dir_all(&log_dir)
        .with_context(|| format!("failed to create log directory {}", log_dir.display()))?;

    let file_appender = DailyAppender::new(log_dir.clone())
        .with_context(|| format!("failed to create log file in {}", log_dir.display()))?;

    let (non_blocking, guard) = tracing_appender::non_blocking(file_appender);

    let env_filter = EnvFilter::try_from_env(LOG_ENV)
        .unwrap_or_else(|_| EnvFilter::default().add_directive(level_or_default(level).into()));

    fmt()
        .with_env_filter(env_filter)
        .with_writer(non_blocking)
        .with_timer(LocalTimer)
        .with_ansi(false)
        .with_target(true)
        .with_thread_ids(false)
        .with_line_number(true)
        .with_file(true)
        .try_init()
        .map_err(|e| anyhow::anyhow!("failed to install tracing subscriber: {e}"))?;

    Ok(guard)
}
