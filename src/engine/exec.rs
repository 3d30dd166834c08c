//! kubectl プロセス実行
//!
//! stdout と stderr を 1 本の OS パイプに向け、書き込み順を保ったまま結合出力として回収する。
//! 呼び出し元の `CancellationToken` がキャンセルされたら子プロセスを kill して回収する。

use std::future::Future;
use std::io::{self, Read};
use std::path::PathBuf;
use std::process::Stdio;
use std::time::Instant;

use tokio::process::Command;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};

use super::risk::strip_program_name;
use crate::error::KubeAiError;

/// 実行するプログラム名
pub const KUBECTL: &str = "kubectl";

/// 1 コマンド分の実行結果
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ExecutionResult {
    /// stdout と stderr の結合出力
    pub output: String,
    pub succeeded: bool,
    /// 失敗時の理由（終了ステータスなど）
    pub error: Option<String>,
}

impl ExecutionResult {
    pub fn success(output: impl Into<String>) -> Self {
        Self {
            output: output.into(),
            succeeded: true,
            error: None,
        }
    }

    pub fn failure(output: impl Into<String>, error: impl Into<String>) -> Self {
        Self {
            output: output.into(),
            succeeded: false,
            error: Some(error.into()),
        }
    }

    /// 失敗していれば出力付きの `KubeAiError::Execution` に変換する。
    pub fn into_result(self) -> Result<String, KubeAiError> {
        if self.succeeded {
            Ok(self.output)
        } else {
            let message = self.error.unwrap_or_else(|| "command failed".to_string());
            Err(KubeAiError::execution(message, self.output))
        }
    }
}

/// 素のコマンド文字列を kubectl の引数列に分割する。先頭の `kubectl` は取り除く。
pub fn split_args(command: &str) -> Vec<String> {
    strip_program_name(command)
        .split_whitespace()
        .map(str::to_string)
        .collect()
}

/// 外部プロセス境界。テストでは記録用の実装に差し替える。
pub trait CommandRunner {
    fn run(
        &self,
        args: &[String],
        cancel: &CancellationToken,
    ) -> impl Future<Output = Result<ExecutionResult, KubeAiError>>;
}

/// 実際に kubectl を起動するランナー
pub struct KubectlRunner {
    /// 明示指定された実行ファイル（`None` なら PATH から解決）
    program: Option<PathBuf>,
    /// 子プロセスに渡す KUBECONFIG
    kubeconfig: PathBuf,
}

impl KubectlRunner {
    pub fn new(kubeconfig: PathBuf) -> Self {
        Self {
            program: None,
            kubeconfig,
        }
    }

    /// 実行ファイルのパスを固定して作成する。
    #[cfg(test)]
    pub fn with_program(program: PathBuf, kubeconfig: PathBuf) -> Self {
        Self {
            program: Some(program),
            kubeconfig,
        }
    }

    fn resolve_program(&self) -> Result<PathBuf, KubeAiError> {
        match self.program {
            Some(ref path) => Ok(path.clone()),
            None => which::which(KUBECTL).map_err(|e| {
                KubeAiError::execution(format!("{KUBECTL} not found in PATH: {e}"), "")
            }),
        }
    }
}

fn spawn_error(program: &std::path::Path, e: io::Error) -> KubeAiError {
    let reason = match e.kind() {
        io::ErrorKind::NotFound => "command not found".to_string(),
        io::ErrorKind::PermissionDenied => "permission denied".to_string(),
        _ => format!("{e}"),
    };
    KubeAiError::execution(format!("{}: {reason}", program.display()), "")
}

impl CommandRunner for KubectlRunner {
    async fn run(
        &self,
        args: &[String],
        cancel: &CancellationToken,
    ) -> Result<ExecutionResult, KubeAiError> {
        if args.is_empty() {
            return Err(KubeAiError::execution("empty command", ""));
        }

        let program = self.resolve_program()?;
        debug!(
            program = %program.display(),
            args = ?args,
            kubeconfig = %self.kubeconfig.display(),
            "Spawning kubectl"
        );

        let (mut reader, writer) =
            os_pipe::pipe().map_err(|e| KubeAiError::execution(format!("pipe error: {e}"), ""))?;
        let writer_err = writer
            .try_clone()
            .map_err(|e| KubeAiError::execution(format!("pipe error: {e}"), ""))?;

        let started = Instant::now();

        // spawn 後に command をドロップして親プロセス側の書き込み端を閉じる
        let mut child = {
            let mut command = Command::new(&program);
            command
                .args(args)
                .env("KUBECONFIG", &self.kubeconfig)
                .stdin(Stdio::null())
                .stdout(writer)
                .stderr(writer_err)
                .kill_on_drop(true);
            command.spawn().map_err(|e| spawn_error(&program, e))?
        };

        let collector = tokio::task::spawn_blocking(move || {
            let mut buf = Vec::new();
            let _ = reader.read_to_end(&mut buf);
            buf
        });

        let status = tokio::select! {
            status = child.wait() => status
                .map_err(|e| KubeAiError::execution(format!("wait error: {e}"), ""))?,
            _ = cancel.cancelled() => {
                warn!(args = ?args, "Cancellation requested, killing kubectl");
                if let Err(e) = child.kill().await {
                    warn!(error = %e, "Failed to kill kubectl");
                }
                return Err(KubeAiError::UserCancelled);
            }
        };

        let bytes = collector.await.unwrap_or_default();
        let output = String::from_utf8_lossy(&bytes).into_owned();

        info!(
            args = ?args,
            exit_code = ?status.code(),
            output_size = output.len(),
            elapsed_ms = started.elapsed().as_millis() as u64,
            "kubectl completed"
        );

        if status.success() {
            Ok(ExecutionResult::success(output))
        } else {
            Ok(ExecutionResult::failure(output, status.to_string()))
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn split_args_drops_program_name() {
        assert_eq!(split_args("kubectl delete pod demo"), vec!["delete", "pod", "demo"]);
        assert_eq!(split_args("get  pods   -A"), vec!["get", "pods", "-A"]);
        assert!(split_args("kubectl").is_empty());
    }

    #[test]
    fn failed_result_converts_to_execution_error() {
        let err = ExecutionResult::failure("NotFound", "exit status: 1")
            .into_result()
            .unwrap_err();
        assert_eq!(err.captured_output(), Some("NotFound"));
        assert_eq!(ExecutionResult::success("ok").into_result().unwrap(), "ok");
    }

    #[tokio::test]
    async fn empty_args_are_rejected_without_spawning() {
        let runner = KubectlRunner::with_program("/nonexistent/kubectl".into(), "/tmp/kc".into());
        let err = runner.run(&[], &CancellationToken::new()).await.unwrap_err();
        assert!(err.to_string().contains("empty command"));
    }

    #[tokio::test]
    async fn missing_binary_is_execution_error() {
        let runner = KubectlRunner::with_program(
            "/nonexistent/__kubectl_ai_missing__".into(),
            "/tmp/kc".into(),
        );
        let args = vec!["get".to_string(), "pods".to_string()];
        let err = runner.run(&args, &CancellationToken::new()).await.unwrap_err();
        assert!(matches!(err, KubeAiError::Execution { .. }));
        assert!(err.to_string().contains("command not found"));
    }

    #[cfg(unix)]
    mod process {
        use super::*;
        use serial_test::serial;
        use std::os::unix::fs::PermissionsExt;
        use std::time::Duration;

        /// テスト用の偽 kubectl スクリプトを作成する
        fn stub(dir: &tempfile::TempDir, body: &str) -> PathBuf {
            let path = dir.path().join("kubectl");
            std::fs::write(&path, format!("#!/bin/sh\n{body}\n")).unwrap();
            std::fs::set_permissions(&path, std::fs::Permissions::from_mode(0o755)).unwrap();
            path
        }

        #[tokio::test]
        #[serial]
        async fn captures_combined_output_and_env() {
            let dir = tempfile::tempdir().unwrap();
            let program = stub(
                &dir,
                "echo \"args: $*\"\necho \"config: $KUBECONFIG\"\necho warn >&2",
            );
            let runner = KubectlRunner::with_program(program, "/tmp/test-kubeconfig".into());
            let args = split_args("kubectl get pods -A");

            let result = runner.run(&args, &CancellationToken::new()).await.unwrap();
            assert!(result.succeeded);
            assert!(result.error.is_none());
            assert!(result.output.contains("args: get pods -A"));
            assert!(result.output.contains("config: /tmp/test-kubeconfig"));
            assert!(result.output.contains("warn"));
        }

        #[tokio::test]
        #[serial]
        async fn non_zero_exit_keeps_output() {
            let dir = tempfile::tempdir().unwrap();
            let program = stub(&dir, "echo 'Error from server (NotFound)' >&2\nexit 3");
            let runner = KubectlRunner::with_program(program, "/tmp/kc".into());
            let args = split_args("delete pod ghost");

            let result = runner.run(&args, &CancellationToken::new()).await.unwrap();
            assert!(!result.succeeded);
            assert!(result.output.contains("NotFound"));
            assert!(result.error.unwrap().contains('3'));
        }

        #[tokio::test]
        #[serial]
        async fn cancellation_kills_child() {
            let dir = tempfile::tempdir().unwrap();
            let program = stub(&dir, "exec sleep 30");
            let runner = KubectlRunner::with_program(program, "/tmp/kc".into());
            let args = split_args("get pods -w");

            let cancel = CancellationToken::new();
            let trigger = cancel.clone();
            tokio::spawn(async move {
                tokio::time::sleep(Duration::from_millis(100)).await;
                trigger.cancel();
            });

            let result = tokio::time::timeout(Duration::from_secs(10), runner.run(&args, &cancel))
                .await
                .expect("runner did not honor cancellation");
            assert!(matches!(result, Err(KubeAiError::UserCancelled)));
        }
    }
}
