//! リスク分類器: kubectl の動詞から影響範囲を静的に判定する
//!
//! ホワイトリストにない動詞は決して安全とみなさない。

use tracing::debug;

/// コマンドのリスク段階
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RiskTier {
    /// 参照系（クラスタの状態を変更しない）
    Query,
    /// 書き込み系
    Write,
    /// 空コマンドまたは未知の動詞
    Unknown,
}

/// 参照系の動詞
const QUERY_VERBS: &[&str] = &[
    "get",
    "describe",
    "explain",
    "logs",
    "top",
    "cluster-info",
    "attach",
    "exec",
    "proxy",
    "cp",
    "auth",
    "debug",
    "events",
];

/// 書き込み系の動詞
const WRITE_VERBS: &[&str] = &[
    "apply", "create", "delete", "patch", "replace", "scale", "rollout", "taint", "label",
    "annotate", "edit", "set",
];

/// 先頭の `kubectl` を取り除いた残りの文字列を返す。
pub fn strip_program_name(command: &str) -> &str {
    let trimmed = command.trim();
    match trimmed.strip_prefix("kubectl") {
        Some(rest) if rest.is_empty() || rest.starts_with(char::is_whitespace) => rest.trim_start(),
        _ => trimmed,
    }
}

/// 素のコマンド文字列を分類する。
pub fn classify(command: &str) -> RiskTier {
    let verb = match strip_program_name(command).split_whitespace().next() {
        Some(verb) => verb,
        None => {
            debug!(command = %command, tier = "Unknown", reason = "empty", "Command classified");
            return RiskTier::Unknown;
        }
    };

    let tier = if QUERY_VERBS.contains(&verb) {
        RiskTier::Query
    } else if WRITE_VERBS.contains(&verb) {
        RiskTier::Write
    } else {
        RiskTier::Unknown
    };

    debug!(command = %command, verb = %verb, tier = ?tier, "Command classified");
    tier
}
