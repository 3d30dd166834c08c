//! コマンド安全性と実行のコア
//!
//! LLM 出力 → 候補行の抽出 → タグ解析 → リスク分類 → ゲート → kubectl 実行、の各段を提供する。

pub mod exec;
pub mod extract;
pub mod gate;
pub mod risk;
pub mod tag;

pub use exec::{split_args, CommandRunner, KubectlRunner};
pub use extract::extract_commands;
pub use gate::GateDecision;
pub use risk::{classify, RiskTier};
pub use tag::{parse_tagged, CandidateCommand, CommandTag};
