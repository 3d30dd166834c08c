//! セッション: 1 ターン分の処理とその結果
//!
//! 自然言語の質問を翻訳し、応答からコマンドを抽出して、
//! タグ解析 → リスク分類 → 実行ゲート → 実行 を 1 コマンドずつ順番に行う。
//! 対話モードのループは `repl` サブモジュールにある。

mod repl;

use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};

use crate::ai::{ConversationState, Translator};
use crate::cli::console::Console;
use crate::cli::talk::{announce_exec, print_info, print_output, warn_risky};
use crate::config::KubeAiConfig;
use crate::engine::gate;
use crate::engine::{
    classify, extract_commands, parse_tagged, split_args, CandidateCommand, CommandRunner,
    CommandTag, GateDecision, RiskTier,
};
use crate::error::KubeAiError;

/// 実行済みコマンド 1 件の記録
#[derive(Debug, Clone)]
pub struct ExecutedCommand {
    pub candidate: CandidateCommand,
    pub tier: RiskTier,
    pub decision: GateDecision,
    /// 実行前に警告バナーを出したか
    pub warned: bool,
    pub output: String,
}

/// 1 バッチ分の実行結果
#[derive(Debug, Clone, Default)]
pub struct BatchReport {
    pub commands: Vec<ExecutedCommand>,
}

impl BatchReport {
    /// 最後に実行したコマンドの出力（次のターンへの折り返し用）
    pub fn last_output(&self) -> Option<&str> {
        self.commands.last().map(|c| c.output.as_str())
    }

    fn log_summary(&self) {
        for command in &self.commands {
            debug!(
                command = %command.candidate.text,
                tag = ?command.candidate.tag,
                tier = ?command.tier,
                decision = ?command.decision,
                warned = command.warned,
                output_length = command.output.len(),
                "Executed command"
            );
        }
    }
}

/// バッチ実行中の Ctrl-C をキャンセルトークンに橋渡しする。
///
/// ドロップ時に監視タスクを止める。バッチごとに作り直す。
pub struct InterruptGuard {
    token: CancellationToken,
    watcher: JoinHandle<()>,
}

impl InterruptGuard {
    pub fn new(parent: &CancellationToken) -> Self {
        let token = parent.child_token();
        let cancel = token.clone();
        let watcher = tokio::spawn(async move {
            if tokio::signal::ctrl_c().await.is_ok() {
                info!("Ctrl-C received during batch, cancelling");
                cancel.cancel();
            }
        });
        Self { token, watcher }
    }

    pub fn token(&self) -> &CancellationToken {
        &self.token
    }
}

impl Drop for InterruptGuard {
    fn drop(&mut self) {
        self.watcher.abort();
    }
}

/// 1 回の CLI 起動（対話モードなら 1 セッション）の状態をまとめて持つ。
pub struct Session<T, R, C> {
    translator: T,
    runner: R,
    console: C,
    conversation: ConversationState,
    auto_execute: bool,
    enable_chat: bool,
}

impl<T, R, C> Session<T, R, C>
where
    T: Translator,
    R: CommandRunner,
    C: Console,
{
    pub fn new(translator: T, runner: R, console: C, config: &KubeAiConfig) -> Self {
        Self {
            translator,
            runner,
            console,
            conversation: ConversationState::new(config.history_cap()),
            auto_execute: config.auto_execute,
            enable_chat: config.enable_chat,
        }
    }

    /// `cmd` サブコマンド: 1 ターンだけ実行する。Ctrl-C でバッチを中断できる。
    pub async fn run_once(&mut self, question: &str) -> Result<BatchReport, KubeAiError> {
        let root = CancellationToken::new();
        let guard = InterruptGuard::new(&root);
        self.run_turn(question, guard.token()).await
    }

    /// `explain` サブコマンド: 説明をストリーミング表示する（実行はしない）。
    pub async fn explain(&self, subject: &str) -> Result<String, KubeAiError> {
        let cancel = CancellationToken::new();
        self.translator.explain(subject, &cancel).await
    }

    /// TRANSLATING → EXTRACTING → EXECUTING_BATCH
    pub async fn run_turn(
        &mut self,
        question: &str,
        cancel: &CancellationToken,
    ) -> Result<BatchReport, KubeAiError> {
        info!(question = %question, chat = self.enable_chat, "Turn started");

        let raw = if self.enable_chat {
            self.translator
                .translate(&mut self.conversation, question, cancel)
                .await?
        } else {
            // 履歴を残さないモードでは使い捨ての会話で翻訳する
            let mut scratch = ConversationState::new(self.conversation.cap());
            self.translator.translate(&mut scratch, question, cancel).await?
        };

        let lines = extract_commands(&raw)?;
        info!(command_count = lines.len(), "Commands extracted");

        let report = self.run_batch(&lines, cancel).await?;
        report.log_summary();
        info!(executed = report.commands.len(), "Turn completed");
        Ok(report)
    }

    /// 抽出済みのコマンド列を順番に実行する。
    ///
    /// 確認の拒否・実行失敗のどちらでも残りのコマンドは実行せずに中断する。
    /// それまでに実行したコマンドは取り消さない。
    async fn run_batch(
        &mut self,
        lines: &[String],
        cancel: &CancellationToken,
    ) -> Result<BatchReport, KubeAiError> {
        let mut report = BatchReport::default();

        for (index, line) in lines.iter().enumerate() {
            let candidate = parse_tagged(line);
            let tier = classify(&candidate.text);

            let warned = gate::warns(candidate.tag, tier, self.auto_execute);
            if warned {
                warn_risky(&candidate.text);
            }
            let decision = match gate::admit(&candidate, tier, self.auto_execute, &mut self.console)
            {
                Ok(decision) => decision,
                Err(e) => {
                    info!(executed = index, remaining = lines.len() - index, "Batch aborted");
                    return Err(e);
                }
            };

            announce_exec(&candidate.to_string());
            let args = split_args(&candidate.text);
            let output = match self.runner.run(&args, cancel).await?.into_result() {
                Ok(output) => output,
                Err(e) => {
                    warn!(command = %candidate.text, error = %e, "Batch aborted by command failure");
                    return Err(e);
                }
            };

            if candidate.tag == CommandTag::Info {
                print_info(&output);
            } else {
                print_output(&output);
            }

            report.commands.push(ExecutedCommand {
                candidate,
                tier,
                decision,
                warned,
                output,
            });
        }

        Ok(report)
    }

    #[cfg(test)]
    pub(crate) fn runner(&self) -> &R {
        &self.runner
    }

    #[cfg(test)]
    pub(crate) fn console(&self) -> &C {
        &self.console
    }

    #[cfg(test)]
    pub(crate) fn conversation(&self) -> &ConversationState {
        &self.conversation
    }
}


#[cfg(test)]
mod tests {
    use super::fakes::{FakeTranslator, RecordingRunner};
    use super::*;
    use crate::cli::console::ScriptedConsole;
    use crate::engine::exec::ExecutionResult;

    fn config(auto_execute: bool, enable_chat: bool) -> KubeAiConfig {
        KubeAiConfig {
            auto_execute,
            enable_chat,
            ..KubeAiConfig::default()
        }
    }

    fn session(
        replies: &[&str],
        answers: &[&str],
        auto_execute: bool,
    ) -> Session<FakeTranslator, RecordingRunner, ScriptedConsole> {
        Session::new(
            FakeTranslator::new(replies),
            RecordingRunner::default(),
            ScriptedConsole::new(&[], answers),
            &config(auto_execute, false),
        )
    }

    fn args(list: &[&str]) -> Vec<String> {
        list.iter().map(|s| s.to_string()).collect()
    }

    #[tokio::test]
    async fn info_query_runs_without_prompt() {
        let mut s = session(&["[INFO] kubectl get nodes"], &[], false);
        let report = s
            .run_turn("show nodes", &CancellationToken::new())
            .await
            .unwrap();

        assert_eq!(s.runner().calls(), vec![args(&["get", "nodes"])]);
        assert!(s.console().questions.is_empty());
        assert_eq!(report.commands.len(), 1);
        assert_eq!(report.commands[0].candidate.tag, CommandTag::Info);
        assert_eq!(report.commands[0].tier, RiskTier::Query);
        assert_eq!(report.commands[0].decision, GateDecision::ExecuteSilent);
        assert_eq!(report.last_output(), Some("ran get nodes"));
    }

    #[tokio::test]
    async fn confirmed_delete_runs_exactly_once() {
        let mut s = session(&["kubectl delete pod demo"], &["y"], false);
        let report = s
            .run_turn("remove demo pod", &CancellationToken::new())
            .await
            .unwrap();

        assert_eq!(s.runner().calls(), vec![args(&["delete", "pod", "demo"])]);
        assert_eq!(s.console().questions.len(), 1);
        assert_eq!(report.commands[0].decision, GateDecision::ExecuteWithWarning);
    }

    #[tokio::test]
    async fn rejected_write_runs_nothing() {
        let mut s = session(&["kubectl delete pod demo"], &["n"], false);
        let err = s
            .run_turn("remove demo pod", &CancellationToken::new())
            .await
            .unwrap_err();

        assert!(matches!(err, KubeAiError::UserCancelled));
        assert!(s.runner().calls().is_empty());
    }

    #[tokio::test]
    async fn rejection_aborts_rest_of_batch_without_rollback() {
        let reply = "kubectl get pods\nkubectl scale deploy web --replicas=0\nkubectl get deploy";
        let mut s = session(&[reply], &["n"], false);
        let err = s
            .run_turn("scale web down", &CancellationToken::new())
            .await
            .unwrap_err();

        assert!(err.is_cancellation());
        assert_eq!(s.runner().calls(), vec![args(&["get", "pods"])]);
    }

    #[tokio::test]
    async fn dangerous_tag_on_query_still_asks() {
        let mut s = session(&["[DANGEROUS] kubectl get secrets -A"], &["y"], false);
        s.run_turn("show secrets", &CancellationToken::new())
            .await
            .unwrap();
        assert_eq!(s.console().questions.len(), 1);
    }

    #[tokio::test]
    async fn auto_execute_never_prompts() {
        let reply = "[DANGEROUS] kubectl delete ns staging\nkubectl frobnicate";
        let mut s = session(&[reply], &[], true);
        let report = s
            .run_turn("drop staging", &CancellationToken::new())
            .await
            .unwrap();

        assert!(s.console().questions.is_empty());
        assert_eq!(s.runner().calls().len(), 2);
        assert!(report
            .commands
            .iter()
            .all(|c| c.decision == GateDecision::ExecuteSilent));
        assert_eq!(report.commands[1].tier, RiskTier::Unknown);
    }

    #[tokio::test]
    async fn auto_execute_still_warns_on_dangerous_tag() {
        let reply = "[DANGEROUS] kubectl delete ns x\nkubectl get ns";
        let mut s = session(&[reply], &[], true);
        let report = s
            .run_turn("drop namespace x", &CancellationToken::new())
            .await
            .unwrap();

        assert!(s.console().questions.is_empty());
        assert_eq!(s.runner().calls()[0], args(&["delete", "ns", "x"]));
        assert!(report.commands[0].warned);
        assert_eq!(
            report.commands[0].candidate.to_string(),
            "[DANGEROUS] kubectl delete ns x"
        );
        assert!(!report.commands[1].warned);
    }

    #[tokio::test]
    async fn failure_aborts_batch_and_keeps_output() {
        let reply = "kubectl get pods -n missing\nkubectl get nodes";
        let mut s = Session::new(
            FakeTranslator::new(&[reply]),
            RecordingRunner::with_results(vec![ExecutionResult::failure(
                "namespace not found",
                "exit status: 1",
            )]),
            ScriptedConsole::new(&[], &[]),
            &config(false, false),
        );

        let err = s
            .run_turn("pods in missing", &CancellationToken::new())
            .await
            .unwrap_err();

        assert_eq!(err.captured_output(), Some("namespace not found"));
        assert_eq!(s.runner().calls().len(), 1);
    }

    #[tokio::test]
    async fn prose_only_reply_is_extraction_error() {
        let mut s = session(&["以下是命令："], &[], false);
        let err = s
            .run_turn("anything", &CancellationToken::new())
            .await
            .unwrap_err();
        assert!(matches!(err, KubeAiError::Extraction));
        assert!(s.runner().calls().is_empty());
    }

    #[tokio::test]
    async fn translation_error_is_propagated() {
        let mut s = Session::new(
            FakeTranslator::failing(KubeAiError::Translation("no response from API".into())),
            RecordingRunner::default(),
            ScriptedConsole::new(&[], &[]),
            &config(false, false),
        );
        let err = s
            .run_turn("list pods", &CancellationToken::new())
            .await
            .unwrap_err();
        assert_eq!(err.exit_code(), 1);
    }

    #[tokio::test]
    async fn cancelled_token_stops_before_execution() {
        let mut s = session(&["kubectl get pods"], &[], false);
        let cancel = CancellationToken::new();
        cancel.cancel();
        let err = s.run_turn("list pods", &cancel).await.unwrap_err();
        assert!(err.is_cancellation());
        assert!(s.runner().calls().is_empty());
    }

    #[tokio::test]
    async fn history_is_kept_only_with_chat() {
        let mut without = session(&["kubectl get pods"], &[], false);
        without
            .run_turn("list pods", &CancellationToken::new())
            .await
            .unwrap();
        assert!(without.conversation().is_empty());

        let mut with = Session::new(
            FakeTranslator::new(&["kubectl get pods"]),
            RecordingRunner::default(),
            ScriptedConsole::new(&[], &[]),
            &config(false, true),
        );
        with.run_turn("list pods", &CancellationToken::new())
            .await
            .unwrap();
        assert_eq!(with.conversation().len(), 2);
    }

    #[tokio::test]
    async fn explain_delegates_to_translator() {
        let s = session(&[], &[], false);
        assert_eq!(s.explain("kubectl get pods").await.unwrap(), "explained: kubectl get pods");
    }

    #[tokio::test]
    async fn interrupt_guard_token_follows_parent() {
        let root = CancellationToken::new();
        let guard = InterruptGuard::new(&root);
        assert!(!guard.token().is_cancelled());
        root.cancel();
        assert!(guard.token().is_cancelled());
    }
}
