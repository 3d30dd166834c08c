//! タグ付きコマンドのパーサー
//!
//! LLM は行頭に `[INFO] ` / `[DANGEROUS] ` を付けてコマンドの性質を伝えてくる。
//! パース直後に enum へ変換し、以降は文字列からタグを再判定しない。

use std::fmt;

/// コマンド行に付与されたタグ
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CommandTag {
    /// タグなし
    None,
    /// 情報収集用のコマンド
    Info,
    /// モデル自身が危険と判断したコマンド
    Dangerous,
}

const INFO_PREFIX: &str = "[INFO] ";
const DANGEROUS_PREFIX: &str = "[DANGEROUS] ";

impl CommandTag {
    /// 端末表示用のラベル
    pub fn label(self) -> &'static str {
        match self {
            Self::None => "",
            Self::Info => "[INFO]",
            Self::Dangerous => "[DANGEROUS]",
        }
    }
}

/// 1 回の翻訳→実行サイクルの中だけで使われる候補コマンド
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CandidateCommand {
    pub tag: CommandTag,
    /// タグを取り除いたコマンド文字列
    pub text: String,
}

impl CandidateCommand {
    pub fn new(tag: CommandTag, text: impl Into<String>) -> Self {
        Self {
            tag,
            text: text.into(),
        }
    }
}

impl fmt::Display for CandidateCommand {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.tag {
            CommandTag::None => write!(f, "{}", self.text),
            tag => write!(f, "{} {}", tag.label(), self.text),
        }
    }
}

/// 候補行を `(タグ, 素のコマンド)` に分解する。
///
/// プレフィックスは大文字小文字を区別した完全一致のみ認識する。
pub fn parse_tagged(line: &str) -> CandidateCommand {
    let line = line.trim();
    if let Some(rest) = line.strip_prefix(INFO_PREFIX) {
        return CandidateCommand::new(CommandTag::Info, rest.trim());
    }
    if let Some(rest) = line.strip_prefix(DANGEROUS_PREFIX) {
        return CandidateCommand::new(CommandTag::Dangerous, rest.trim());
    }
    CandidateCommand::new(CommandTag::None, line)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn strips_dangerous_prefix() {
        let cmd = parse_tagged("[DANGEROUS] delete pod x");
        assert_eq!(cmd, CandidateCommand::new(CommandTag::Dangerous, "delete pod x"));
    }

    #[test]
    fn strips_info_prefix() {
        let cmd = parse_tagged("[INFO] kubectl get nodes");
        assert_eq!(cmd.tag, CommandTag::Info);
        assert_eq!(cmd.text, "kubectl get nodes");
    }

    #[test]
    fn untagged_line_is_kept_whole() {
        let cmd = parse_tagged("  get pods  ");
        assert_eq!(cmd, CandidateCommand::new(CommandTag::None, "get pods"));
    }

    #[test]
    fn prefix_match_is_case_sensitive() {
        let cmd = parse_tagged("[info] get pods");
        assert_eq!(cmd.tag, CommandTag::None);
        assert_eq!(cmd.text, "[info] get pods");
    }

    #[test]
    fn prefix_requires_trailing_space() {
        // "[INFO]get" はタグとして扱わない
        let cmd = parse_tagged("[INFO]get pods");
        assert_eq!(cmd.tag, CommandTag::None);
    }

    #[test]
    fn display_round_trips_tag() {
        let cmd = CandidateCommand::new(CommandTag::Dangerous, "delete pod x");
        assert_eq!(parse_tagged(&cmd.to_string()), cmd);
        assert_eq!(CandidateCommand::new(CommandTag::None, "get pods").to_string(), "get pods");
    }
}
