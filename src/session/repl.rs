//! 対話モード (`exec`) のループ
//!
//! AWAITING_INPUT → TRANSLATING (→ EXTRACTING → EXECUTING_BATCH) → AWAITING_CONTINUE | DONE
//! の状態遷移を `TurnState` で明示的に回す。ターン内のエラーは表示するだけで、
//! セッションは続行する。

use tokio_util::sync::CancellationToken;
use tracing::{debug, info};

use super::{InterruptGuard, Session};
use crate::ai::prompts::follow_up_request;
use crate::ai::Translator;
use crate::cli::color::yellow;
use crate::cli::console::Console;
use crate::cli::talk::{kube_talk, print_error};
use crate::engine::CommandRunner;

/// 対話を終了する入力
const EXIT_WORD: &str = "exit";

const CONTINUE_QUESTION: &str = "Continue the conversation based on this result? (y/n): ";
const FOLLOW_UP_QUESTION: &str = "New question: ";

#[derive(Debug, Clone, PartialEq, Eq)]
enum TurnState {
    AwaitingInput,
    /// `question` はユーザーの質問そのもの、`prompt` はモデルに送る文面
    Translating { question: String, prompt: String },
    AwaitingContinue { question: String, output: String },
    Done,
}

impl TurnState {
    fn ask(question: String) -> Self {
        Self::Translating {
            prompt: question.clone(),
            question,
        }
    }
}

/// 継続確認の回答
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum ContinueAnswer {
    Yes,
    No,
    Invalid,
}

fn parse_continue(answer: &str) -> ContinueAnswer {
    match answer.trim().to_lowercase().as_str() {
        "y" => ContinueAnswer::Yes,
        "n" => ContinueAnswer::No,
        _ => ContinueAnswer::Invalid,
    }
}

impl<T, R, C> Session<T, R, C>
where
    T: Translator,
    R: CommandRunner,
    C: Console,
{
    /// 対話モードを実行する。`initial` があれば最初の質問として扱う。
    pub async fn run_interactive(&mut self, initial: Option<String>) {
        kube_talk("Interactive mode. Type 'exit' to quit.");

        let root = CancellationToken::new();
        let mut state = match initial {
            Some(q) if !q.trim().is_empty() => TurnState::ask(q.trim().to_string()),
            _ => TurnState::AwaitingInput,
        };

        loop {
            debug!(state = ?state, "Interactive state");
            state = match state {
                TurnState::AwaitingInput => self.await_input(),
                TurnState::Translating { question, prompt } => {
                    self.translate_and_execute(question, &prompt, &root).await
                }
                TurnState::AwaitingContinue { question, output } => {
                    self.await_continue(&question, &output)
                }
                TurnState::Done => break,
            };
        }

        info!("Interactive session ended");
        kube_talk("Leaving interactive mode.");
    }

    fn await_input(&mut self) -> TurnState {
        let Some(line) = self.console.read_request() else {
            return TurnState::Done;
        };
        let line = line.trim();
        if line.is_empty() {
            return TurnState::AwaitingInput;
        }
        if line == EXIT_WORD {
            return TurnState::Done;
        }
        TurnState::ask(line.to_string())
    }

    async fn translate_and_execute(
        &mut self,
        question: String,
        prompt: &str,
        root: &CancellationToken,
    ) -> TurnState {
        let guard = InterruptGuard::new(root);
        match self.run_turn(prompt, guard.token()).await {
            Ok(report) => match report.last_output() {
                Some(output) => TurnState::AwaitingContinue {
                    question,
                    output: output.to_string(),
                },
                None => TurnState::AwaitingInput,
            },
            Err(e) => {
                info!(error = %e, "Turn abandoned");
                print_error(&e);
                TurnState::AwaitingInput
            }
        }
    }

    fn await_continue(&mut self, question: &str, output: &str) -> TurnState {
        loop {
            // 入力終了は "n" 扱い
            let Some(answer) = self.console.ask(CONTINUE_QUESTION) else {
                return TurnState::AwaitingInput;
            };
            match parse_continue(&answer) {
                ContinueAnswer::Yes => break,
                ContinueAnswer::No => return TurnState::AwaitingInput,
                ContinueAnswer::Invalid => println!("{}", yellow("Please answer y or n.")),
            }
        }

        let follow_up = self.console.ask(FOLLOW_UP_QUESTION).unwrap_or_default();
        let follow_up = follow_up.trim();
        let next_question = if follow_up.is_empty() {
            question.to_string()
        } else {
            follow_up.to_string()
        };

        TurnState::Translating {
            prompt: follow_up_request(question, output, follow_up),
            question: next_question,
        }
    }
}
