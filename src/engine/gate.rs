//! 実行ゲート: 確認が必要かどうかの唯一の判定表
//!
//! | auto_execute | tier  | tag       | 判定                  |
//! |--------------|-------|-----------|-----------------------|
//! | true         | *     | *         | ExecuteSilent         |
//! | false        | Query | None/Info | ExecuteSilent         |
//! | false        | Query | Dangerous | BlockPendingConfirm   |
//! | false        | Write/Unknown | * | BlockPendingConfirm   |
//!
//! BlockPendingConfirm は端末で確認し、`y` なら ExecuteWithWarning に解決される。

use tracing::{debug, info};

use super::risk::RiskTier;
use super::tag::{CandidateCommand, CommandTag};
use crate::cli::console::Console;
use crate::error::KubeAiError;

/// ゲートの判定結果
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum GateDecision {
    /// そのまま実行
    ExecuteSilent,
    /// 警告バナーを出してから実行（確認済みの危険コマンド）
    ExecuteWithWarning,
    /// 対話的な確認待ち
    BlockPendingConfirm,
}

/// 判定表を引く（副作用なし）。
pub fn decide(tag: CommandTag, tier: RiskTier, auto_execute: bool) -> GateDecision {
    if auto_execute {
        return GateDecision::ExecuteSilent;
    }
    if tier == RiskTier::Query && tag != CommandTag::Dangerous {
        GateDecision::ExecuteSilent
    } else {
        GateDecision::BlockPendingConfirm
    }
}

/// 警告バナーを出すかどうか。
///
/// `[DANGEROUS]` タグは auto_execute でも必ず警告する。
pub fn warns(tag: CommandTag, tier: RiskTier, auto_execute: bool) -> bool {
    tag == CommandTag::Dangerous
        || decide(tag, tier, auto_execute) == GateDecision::BlockPendingConfirm
}

/// 確認の回答が承認かどうか。小文字の `y` 1 文字のみ受け付ける。
pub fn is_confirmation(answer: &str) -> bool {
    answer == "y"
}

/// 候補コマンドをゲートに通す。
///
/// 戻り値は `ExecuteSilent` か `ExecuteWithWarning` のどちらか。
/// 確認を拒否された場合（空行や入力終了を含む）は `KubeAiError::UserCancelled`。
pub fn admit<C: Console>(
    candidate: &CandidateCommand,
    tier: RiskTier,
    auto_execute: bool,
    console: &mut C,
) -> Result<GateDecision, KubeAiError> {
    let decision = decide(candidate.tag, tier, auto_execute);
    debug!(
        command = %candidate.text,
        tag = ?candidate.tag,
        tier = ?tier,
        auto_execute = auto_execute,
        decision = ?decision,
        "Gate decision"
    );

    if decision != GateDecision::BlockPendingConfirm {
        return Ok(decision);
    }

    let answer = console.ask("Execute this command? (y/n): ");
    match answer {
        Some(ref a) if is_confirmation(a) => {
            info!(command = %candidate.text, "Command confirmed by user");
            Ok(GateDecision::ExecuteWithWarning)
        }
        _ => {
            info!(command = %candidate.text, answer = ?answer, "Command rejected by user");
            Err(KubeAiError::UserCancelled)
        }
    }
}
