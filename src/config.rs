//! 設定ファイル管理
//!
//! `~/.config/kubectl-ai/config.toml` から TOML 形式の設定を読み込み、
//! 環境変数（`DEEPSEEK_API_KEY` など）で上書きする。
//! ファイルが存在しない場合はテンプレートを生成してデフォルト値を使用する。
//!
//! # 設定ファイル例
//!
//! ```toml
//! auto_execute = false
//! enable_chat = true
//! log_level = "debug"
//! kubeconfig = "~/.kube/staging"
//! max_history = 10
//!
//! [llm]
//! api_key = "sk-..."
//! model = "deepseek-chat"
//! ```

use std::path::{Path, PathBuf};

use serde::Deserialize;

use crate::error::KubeAiError;

/// 設定ファイル内のプレースホルダー（未設定扱い）
const PLACEHOLDER_API_KEY: &str = "your_deepseek_api_key";

/// kubectl-ai の設定全体
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct KubeAiConfig {
    /// LLM API 関連設定
    pub llm: LlmConfig,
    /// true なら確認なしで全コマンドを実行する
    pub auto_execute: bool,
    /// 多ターン会話を有効にする
    pub enable_chat: bool,
    /// ログレベル（`KUBECTL_AI_LOG` が未設定のときに使用）
    pub log_level: String,
    /// kubectl に渡す認証情報ファイル
    pub kubeconfig: Option<PathBuf>,
    /// 会話履歴として保持する最大メッセージ数
    pub max_history: usize,
}

/// LLM API の設定
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct LlmConfig {
    pub api_key: String,
    /// OpenAI 互換 API のベース URL
    pub api_base: String,
    pub model: String,
}

impl Default for LlmConfig {
    fn default() -> Self {
        Self {
            api_key: String::new(),
            api_base: "https://api.deepseek.com".to_string(),
            model: "deepseek-chat".to_string(),
        }
    }
}

impl Default for KubeAiConfig {
    fn default() -> Self {
        Self {
            llm: LlmConfig::default(),
            auto_execute: false,
            enable_chat: false,
            log_level: "info".to_string(),
            kubeconfig: None,
            max_history: 10,
        }
    }
}

impl KubeAiConfig {
    /// 設定ファイルと環境変数から設定を組み立てる。
    ///
    /// `explicit` が指定された場合はそのファイルを必須として読む。
    /// API キーが最終的に空なら `KubeAiError::Config`。
    pub fn load(explicit: Option<&Path>) -> Result<Self, KubeAiError> {
        let mut config = match explicit {
            Some(path) => Self::read_file(path)?,
            None => Self::load_default_file(),
        };
        config.apply_env(|key| std::env::var(key).ok());
        config.validate()?;
        Ok(config)
    }

    /// 指定パスの設定ファイルを読み込む。読めない・パースできない場合はエラー。
    fn read_file(path: &Path) -> Result<Self, KubeAiError> {
        let content = std::fs::read_to_string(path).map_err(|e| {
            KubeAiError::Config(format!("failed to read {}: {e}", path.display()))
        })?;
        toml::from_str(&content).map_err(|e| {
            KubeAiError::Config(format!("failed to parse {}: {e}", path.display()))
        })
    }

    /// 既定パスの設定ファイルを読み込む。
    ///
    /// ファイルがなければテンプレートを生成してデフォルト値を返す。
    /// パースエラーの場合は警告を表示してデフォルト値を返す。
    fn load_default_file() -> Self {
        let path = Self::config_path();

        if !path.exists() {
            Self::create_default_config(&path);
            return Self::default();
        }

        match Self::read_file(&path) {
            Ok(config) => config,
            Err(e) => {
                eprintln!("kubectl-ai: warning: {e}");
                Self::default()
            }
        }
    }

    /// 環境変数で上書きする。空文字の変数は未設定として扱う。
    ///
    /// 真偽値はリテラル `true` のときだけ true になる。
    pub fn apply_env<F>(&mut self, lookup: F)
    where
        F: Fn(&str) -> Option<String>,
    {
        let var = |key: &str| lookup(key).filter(|v| !v.is_empty());

        if let Some(key) = var("DEEPSEEK_API_KEY") {
            self.llm.api_key = key;
        }
        if let Some(v) = var("AUTO_EXECUTE") {
            self.auto_execute = v == "true";
        }
        if let Some(v) = var("ENABLE_CHAT") {
            self.enable_chat = v == "true";
        }
        if let Some(level) = var("LOG_LEVEL") {
            self.log_level = level;
        }
        if let Some(path) = var("KUBECONFIG") {
            self.kubeconfig = Some(PathBuf::from(path));
        }
    }

    fn validate(&self) -> Result<(), KubeAiError> {
        if self.llm.api_key.is_empty() || self.llm.api_key == PLACEHOLDER_API_KEY {
            return Err(KubeAiError::Config(
                "DEEPSEEK_API_KEY not set in environment variables or config file".to_string(),
            ));
        }
        Ok(())
    }

    /// kubectl に渡す KUBECONFIG を返す。未設定なら `$HOME/.kube/config`。
    ///
    /// 先頭の `~` は kubectl が展開しないため、ここで `$HOME` に置き換える。
    pub fn kubeconfig_path(&self) -> PathBuf {
        match self.kubeconfig {
            Some(ref path) => expand_tilde(path),
            None => home_dir().join(".kube").join("config"),
        }
    }

    /// 会話履歴の上限（最低 1）
    pub fn history_cap(&self) -> usize {
        self.max_history.max(1)
    }

    /// 設定ファイルのパスを返す。
    ///
    /// `$HOME` が取得できない場合は `./.config/kubectl-ai/config.toml` にフォールバックする。
    pub fn config_path() -> PathBuf {
        home_dir().join(".config/kubectl-ai/config.toml")
    }

    /// 設定ファイルが存在しない場合にテンプレートから生成する。
    ///
    /// 生成に失敗した場合は警告を表示するが、起動は継続する。
    fn create_default_config(path: &Path) {
        const TEMPLATE: &str = r#"# kubectl-ai configuration
#
# Environment variables (DEEPSEEK_API_KEY, AUTO_EXECUTE, ENABLE_CHAT,
# LOG_LEVEL, KUBECONFIG) take precedence over this file.

# auto_execute = false
# enable_chat = false
# log_level = "info"
# kubeconfig = "/path/to/kubeconfig"
# max_history = 10

[llm]
# api_key = "your_deepseek_api_key"
# api_base = "https://api.deepseek.com"
# model = "deepseek-chat"
"#;

        if let Some(parent) = path.parent() {
            if let Err(e) = std::fs::create_dir_all(parent) {
                eprintln!("kubectl-ai: warning: failed to create config directory: {e}");
                return;
            }
        }

        if let Err(e) = std::fs::write(path, TEMPLATE) {
            eprintln!("kubectl-ai: warning: failed to create config file: {e}");
        }
    }
}

fn home_dir() -> PathBuf {
    std::env::var("HOME")
        .map(PathBuf::from)
        .unwrap_or_else(|_| PathBuf::from("."))
}

/// チルダ展開: `~` / `~/...` を `$HOME` 基準のパスにする
fn expand_tilde(path: &Path) -> PathBuf {
    match path.strip_prefix("~") {
        Ok(rest) => home_dir().join(rest),
        Err(_) => path.to_path_buf(),
    }
}
