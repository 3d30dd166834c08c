//! 対話入力
//!
//! 自然言語リクエストは reedline で、y/n などの短い回答は stdin から 1 行ずつ読む。
//! オーケストレーターは `Console` トレイト越しにだけ入力を受け取る。

use std::io::{self, BufRead, Write};
use std::path::Path;

use reedline::{Reedline, Signal};
use tracing::{info, warn};

use super::color::white;
use super::prompt::KubePrompt;

/// オーケストレーターが使う入力源
pub trait Console {
    /// 次の自然言語リクエストを読む。`None` は入力終了（Ctrl-D など）。
    fn read_request(&mut self) -> Option<String>;

    /// 質問を表示して回答を 1 行読む。`None` は入力終了。
    fn ask(&mut self, question: &str) -> Option<String>;
}

/// 実端末の `Console`
pub struct TerminalConsole {
    editor: Reedline,
    prompt: KubePrompt,
}

impl TerminalConsole {
    pub fn new(kubeconfig: &Path) -> Self {
        Self {
            editor: Reedline::create(),
            prompt: KubePrompt::new(kubeconfig),
        }
    }
}

impl Console for TerminalConsole {
    fn read_request(&mut self) -> Option<String> {
        loop {
            match self.editor.read_line(&self.prompt) {
                Ok(Signal::Success(line)) => return Some(line),
                Ok(Signal::CtrlC) => {
                    // 入力中の行を破棄して再入力
                    println!();
                }
                Ok(Signal::CtrlD) => {
                    info!("Ctrl-D received, ending session");
                    return None;
                }
                Err(e) => {
                    warn!(error = %e, "Line editor error, ending session");
                    eprintln!("kubectl-ai: error: {e}");
                    return None;
                }
            }
        }
    }

    fn ask(&mut self, question: &str) -> Option<String> {
        print!("{}", white(question));
        let _ = io::stdout().flush();

        let mut input = String::new();
        match io::stdin().lock().read_line(&mut input) {
            Ok(0) => None,
            Ok(_) => Some(input.trim_end_matches(['\r', '\n']).to_string()),
            Err(e) => {
                warn!(error = %e, "Failed to read answer from stdin");
                None
            }
        }
    }
}

/// テスト用: あらかじめ用意した入力を順に返す `Console`
#[cfg(test)]
pub struct ScriptedConsole {
    requests: std::collections::VecDeque<String>,
    answers: std::collections::VecDeque<String>,
    /// `ask` に渡された質問の記録
    pub questions: Vec<String>,
}

#[cfg(test)]
impl ScriptedConsole {
    pub fn new(requests: &[&str], answers: &[&str]) -> Self {
        Self {
            requests: requests.iter().map(|s| s.to_string()).collect(),
            answers: answers.iter().map(|s| s.to_string()).collect(),
            questions: Vec::new(),
        }
    }
}

#[cfg(test)]
impl Console for ScriptedConsole {
    fn read_request(&mut self) -> Option<String> {
        self.requests.pop_front()
    }

    fn ask(&mut self, question: &str) -> Option<String> {
        self.questions.push(question.to_string());
        self.answers.pop_front()
    }
}
