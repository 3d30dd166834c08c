//! コマンド抽出: LLM の生出力から候補コマンド行を取り出す
//!
//! 説明文（CJK の文章や「〜：」で終わる導入行）を捨て、残った行を順序どおり返す。

use tracing::{debug, warn};

use crate::error::KubeAiError;

/// 導入文とみなす行末の記号（全角コロン、半角コロン）
const INTRO_SUFFIXES: &[char] = &['：', ':'];

/// CJK 統合漢字の範囲に含まれる文字があるかどうか
pub fn contains_cjk(line: &str) -> bool {
    line.chars().any(|c| ('\u{4e00}'..='\u{9fff}').contains(&c))
}

/// 1 行がコマンドではなく説明文かどうか
fn is_commentary(line: &str) -> bool {
    line.ends_with(INTRO_SUFFIXES) || contains_cjk(line)
}

/// LLM の出力を候補コマンド行の列に変換する。
///
/// 候補が 1 つも残らなければ `KubeAiError::Extraction` を返し、そのターンは中断される。
pub fn extract_commands(output: &str) -> Result<Vec<String>, KubeAiError> {
    let mut commands = Vec::new();

    for line in output.lines() {
        let line = line.trim();
        if line.is_empty() {
            continue;
        }
        if is_commentary(line) {
            debug!(line = %line, "Discarding commentary line");
            continue;
        }
        commands.push(line.to_string());
    }

    if commands.is_empty() {
        warn!(output_length = output.len(), "No command found in model output");
        return Err(KubeAiError::Extraction);
    }

    debug!(count = commands.len(), "Extracted candidate commands");
    Ok(commands)
}
