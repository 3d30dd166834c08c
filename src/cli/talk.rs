//! 端末への表示ヘルパー
//!
//! 実行するコマンドのアナウンス、危険コマンドの警告、収集した出力の表示などを
//! 一か所にまとめる。ログとは別に、ユーザーに見せるものだけをここから出す。

use std::io::{self, Write};
use std::time::Duration;

use indicatif::{ProgressBar, ProgressStyle};

use super::color::{blue, bold_red, bold_yellow, green, red, white, yellow};
use crate::error::KubeAiError;

/// ツールとして発話するときの共通関数。
pub fn kube_talk(message: &str) {
    println!("\u{2388} {}", white(message));
}

/// 実行直前のコマンドを表示する。
pub fn announce_exec(command: &str) {
    println!("\n{} {command}", blue("[EXEC]"));
}

/// 確認が必要なコマンドの警告バナーを表示する。
pub fn warn_risky(command: &str) {
    println!(
        "\n{} {} {}",
        bold_yellow("[WARNING]"),
        yellow("the following command may modify the cluster:"),
        command
    );
}

/// 情報収集コマンドの出力を表示する。
pub fn print_info(output: &str) {
    println!("{} {}", green("[INFO]"), green("collected:"));
    print_output(output);
}

/// コマンドの出力をそのまま表示する。
pub fn print_output(output: &str) {
    let trimmed = output.trim_end();
    if !trimmed.is_empty() {
        println!("{trimmed}");
    }
}

/// エラーを表示する。実行エラーはキャプチャ済みの出力も併せて出す。
pub fn print_error(err: &KubeAiError) {
    if err.is_cancellation() {
        println!("\n{}", yellow("Cancelled."));
        return;
    }
    eprintln!("\n{} {err}", bold_red("error:"));
    if let Some(output) = err.captured_output() {
        let trimmed = output.trim_end();
        if !trimmed.is_empty() {
            eprintln!("{}", red(trimmed));
        }
    }
}

/// LLM 応答待ちのスピナーを生成・開始する。
pub fn kube_spinner() -> ProgressBar {
    let spinner = ProgressBar::new_spinner();
    if let Ok(style) = ProgressStyle::default_spinner().template("\u{2388} {spinner} {msg}") {
        spinner.set_style(style);
    }
    spinner.enable_steady_tick(Duration::from_millis(80));
    spinner
}

/// ストリーミング開始時のプレフィックスを表示する（改行なし）。
pub fn print_stream_prefix() {
    print!("\u{2388} ");
}

/// ストリーミング中のテキスト片を表示する（改行なし）。
pub fn print_stream_chunk(chunk: &str) {
    print!("{}", white(chunk));
    let _ = io::stdout().flush();
}

/// ストリーミング終了時の改行を出力する。
pub fn print_stream_end() {
    println!();
}
