//! 会話状態
//!
//! 翻訳呼び出しのたびに参照渡しされる、上限付きのメッセージ履歴。
//! グローバルな履歴は持たず、セッションが唯一の所有者になる。

use std::collections::VecDeque;

use tracing::debug;

/// メッセージの話者
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Role {
    System,
    User,
    Assistant,
}

impl Role {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::System => "system",
            Self::User => "user",
            Self::Assistant => "assistant",
        }
    }
}

/// 会話中の 1 メッセージ（作成後は変更しない）
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Message {
    pub role: Role,
    pub content: String,
}

impl Message {
    pub fn system(content: impl Into<String>) -> Self {
        Self {
            role: Role::System,
            content: content.into(),
        }
    }

    pub fn user(content: impl Into<String>) -> Self {
        Self {
            role: Role::User,
            content: content.into(),
        }
    }

    pub fn assistant(content: impl Into<String>) -> Self {
        Self {
            role: Role::Assistant,
            content: content.into(),
        }
    }
}

/// 上限付きの会話履歴（user / assistant のみを保持する）。
///
/// - 長さは常に `cap` 以下（超えたら古いものから捨てる）
/// - system メッセージは保持せず、送信時に `request_with` が 1 件だけ先頭に付ける
/// - 直前の user メッセージと同じ内容の user メッセージは追加しない
#[derive(Debug, Clone)]
pub struct ConversationState {
    messages: VecDeque<Message>,
    cap: usize,
}

impl ConversationState {
    pub fn new(cap: usize) -> Self {
        Self {
            messages: VecDeque::new(),
            cap: cap.max(1),
        }
    }

    pub fn cap(&self) -> usize {
        self.cap
    }

    pub fn len(&self) -> usize {
        self.messages.len()
    }

    pub fn is_empty(&self) -> bool {
        self.messages.is_empty()
    }

    pub fn messages(&self) -> impl Iterator<Item = &Message> {
        self.messages.iter()
    }

    /// user メッセージを追加する。直前の user メッセージと同じ内容なら追加せず `false`。
    pub fn push_user(&mut self, content: impl Into<String>) -> bool {
        let content = content.into();
        let duplicate = self
            .messages
            .iter()
            .rev()
            .find(|m| m.role == Role::User)
            .is_some_and(|m| m.content == content);

        if duplicate {
            debug!(content_length = content.len(), "Suppressed duplicate user message");
            return false;
        }

        self.messages.push_back(Message::user(content));
        self.enforce_cap();
        true
    }

    pub fn push_assistant(&mut self, content: impl Into<String>) {
        self.messages.push_back(Message::assistant(content));
        self.enforce_cap();
    }

    /// 送信用のメッセージ列を作る: system + 保持中の履歴 + 新しい user メッセージ。
    /// 結果に含まれる system メッセージは常に 1 件。履歴自体は変更しない。
    pub fn request_with(&self, system: &str, user: &str) -> Vec<Message> {
        std::iter::once(Message::system(system))
            .chain(self.messages().cloned())
            .chain(std::iter::once(Message::user(user)))
            .collect()
    }

    fn enforce_cap(&mut self) {
        while self.messages.len() > self.cap {
            self.messages.pop_front();
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn never_exceeds_cap() {
        let mut state = ConversationState::new(10);
        for i in 0..50 {
            state.push_user(format!("question {i}"));
            assert!(state.len() <= 10);
            state.push_assistant(format!("kubectl get pods -l run={i}"));
            assert!(state.len() <= 10);
        }
        assert_eq!(state.len(), 10);
        assert!(state.messages().all(|m| m.role != Role::System));
    }

    #[test]
    fn evicts_oldest_first() {
        let mut state = ConversationState::new(3);
        state.push_user("a");
        state.push_assistant("A");
        state.push_user("b");
        state.push_assistant("B");

        let contents: Vec<&str> = state.messages().map(|m| m.content.as_str()).collect();
        assert_eq!(contents, vec!["A", "b", "B"]);
    }

    #[test]
    fn consecutive_duplicate_user_is_suppressed() {
        let mut state = ConversationState::new(10);
        assert!(state.push_user("list pods"));
        state.push_assistant("kubectl get pods");
        assert!(!state.push_user("list pods"));
        assert_eq!(state.len(), 2);
    }

    #[test]
    fn duplicate_further_back_is_not_detected() {
        let mut state = ConversationState::new(10);
        state.push_user("list pods");
        state.push_user("list nodes");
        assert!(state.push_user("list pods"));
        assert_eq!(state.len(), 3);
    }

    #[test]
    fn request_has_single_system_and_appends_user() {
        let mut state = ConversationState::new(10);
        state.push_user("a");
        state.push_assistant("A");

        let request = state.request_with("persona", "b");
        assert_eq!(request.len(), 4);
        assert_eq!(request[0], Message::system("persona"));
        assert_eq!(request[1], Message::user("a"));
        assert_eq!(request[3], Message::user("b"));
        assert_eq!(request.iter().filter(|m| m.role == Role::System).count(), 1);
        assert_eq!(state.len(), 2);
    }

    #[test]
    fn zero_cap_is_clamped() {
        let mut state = ConversationState::new(0);
        state.push_user("a");
        state.push_user("b");
        assert_eq!(state.cap(), 1);
        assert_eq!(state.len(), 1);
        assert_eq!(Role::User.as_str(), "user");
    }
}
