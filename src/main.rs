mod ai;
mod cli;
mod config;
mod engine;
mod error;
mod logging;
mod session;

use std::path::PathBuf;
use std::process::ExitCode;

use clap::{Parser, Subcommand};
use tracing::{info, warn};

use ai::DeepSeekClient;
use cli::console::TerminalConsole;
use cli::talk::print_error;
use config::KubeAiConfig;
use engine::KubectlRunner;
use error::KubeAiError;
use session::Session;

/// kubectl-ai: 自然言語を kubectl コマンドに翻訳して実行する。
#[derive(Parser)]
#[command(
    name = "kubectl-ai",
    version,
    about = "Translate natural language into kubectl commands and run them"
)]
struct Cli {
    /// 設定ファイルのパス（省略時は ~/.config/kubectl-ai/config.toml）
    #[arg(long, global = true, value_name = "PATH")]
    config: Option<PathBuf>,

    /// 確認なしで実行する
    #[arg(long, global = true)]
    auto_execute: bool,

    /// 会話履歴を保持する
    #[arg(long, global = true)]
    chat: bool,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    /// 自然言語をコマンドに翻訳して 1 回だけ実行する
    Cmd {
        #[arg(required = true, trailing_var_arg = true)]
        text: Vec<String>,
    },
    /// コマンドやリソースの意味を説明する（実行はしない）
    Explain {
        #[arg(required = true, trailing_var_arg = true)]
        text: Vec<String>,
    },
    /// 対話モードに入る。テキストがあれば最初の質問として扱う
    Exec {
        #[arg(trailing_var_arg = true)]
        text: Vec<String>,
    },
}

#[tokio::main]
async fn main() -> ExitCode {
    // .env ファイルから環境変数を読み込む
    dotenvy::dotenv().ok();

    let cli = Cli::parse();

    let mut config = match KubeAiConfig::load(cli.config.as_deref()) {
        Ok(config) => config,
        Err(e) => {
            print_error(&e);
            return ExitCode::from(e.exit_code());
        }
    };
    if cli.auto_execute {
        config.auto_execute = true;
    }
    if cli.chat {
        config.enable_chat = true;
    }

    // ガードは main 終了まで保持する必要がある
    let _guard = match logging::init_logging(&config.log_level) {
        Ok(guard) => Some(guard),
        Err(e) => {
            eprintln!("kubectl-ai: warning: logging disabled: {e:#}");
            None
        }
    };

    let kubeconfig = config.kubeconfig_path();
    info!(
        kubeconfig = %kubeconfig.display(),
        auto_execute = config.auto_execute,
        enable_chat = config.enable_chat,
        model = %config.llm.model,
        "kubectl-ai started"
    );

    let mut session = Session::new(
        DeepSeekClient::new(&config.llm),
        KubectlRunner::new(kubeconfig.clone()),
        TerminalConsole::new(&kubeconfig),
        &config,
    );

    let outcome: Result<(), KubeAiError> = match cli.command {
        Command::Cmd { text } => session.run_once(&text.join(" ")).await.map(|_| ()),
        Command::Explain { text } => session.explain(&text.join(" ")).await.map(|_| ()),
        Command::Exec { text } => {
            let initial = (!text.is_empty()).then(|| text.join(" "));
            session.run_interactive(initial).await;
            Ok(())
        }
    };

    match outcome {
        Ok(()) => {
            info!("kubectl-ai finished");
            ExitCode::SUCCESS
        }
        Err(e) => {
            warn!(error = %e, "kubectl-ai finished with error");
            print_error(&e);
            ExitCode::from(e.exit_code())
        }
    }
}
