//! エラー分類
//!
//! 設定・翻訳・抽出・ユーザー中断・実行の 5 種類に分けて扱う。
//! バッチ内のエラーはそのバッチだけを中断し、対話セッションは継続する。

use thiserror::Error;

/// kubectl-ai 全体で使うエラー型
#[derive(Debug, Error)]
pub enum KubeAiError {
    /// 設定エラー（起動時に致命的）
    #[error("configuration error: {0}")]
    Config(String),

    /// LLM による翻訳の失敗
    #[error("translation failed: {0}")]
    Translation(String),

    /// モデル出力から実行可能なコマンドを取り出せなかった
    #[error("no executable command found in model output")]
    Extraction,

    /// ユーザーが確認を拒否した、または Ctrl-C で中断した
    #[error("cancelled by user")]
    UserCancelled,

    /// kubectl の実行失敗。診断用にキャプチャした出力を保持する。
    #[error("command failed: {message}")]
    Execution { message: String, output: String },
}

impl KubeAiError {
    /// 実行エラーを組み立てるヘルパー
    pub fn execution(message: impl Into<String>, output: impl Into<String>) -> Self {
        Self::Execution {
            message: message.into(),
            output: output.into(),
        }
    }

    /// ユーザー起因の中断（障害ではない）かどうか
    pub fn is_cancellation(&self) -> bool {
        matches!(self, Self::UserCancelled)
    }

    /// トップレベルに伝播したときの終了コード
    pub fn exit_code(&self) -> u8 {
        if self.is_cancellation() {
            0
        } else {
            1
        }
    }

    /// 実行エラーが保持している出力（それ以外は `None`）
    pub fn captured_output(&self) -> Option<&str> {
        match self {
            Self::Execution { output, .. } => Some(output),
            _ => None,
        }
    }
}
