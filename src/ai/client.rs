//! DeepSeek API クライアント
//!
//! OpenAI 互換の Chat Completions API を `async-openai` 経由で呼び出す。
//! 翻訳は非ストリーミング、説明はストリーミングで行う。

use std::future::Future;

use async_openai::{
    config::OpenAIConfig,
    types::{
        ChatCompletionRequestAssistantMessage, ChatCompletionRequestAssistantMessageContent,
        ChatCompletionRequestMessage, ChatCompletionRequestSystemMessage,
        ChatCompletionRequestSystemMessageContent, ChatCompletionRequestUserMessage,
        ChatCompletionRequestUserMessageContent, CreateChatCompletionRequest,
    },
    Client,
};
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};

use super::conversation::{ConversationState, Message, Role};
use super::prompts::{
    explain_request, translate_request, EXPLAIN_SYSTEM_PROMPT, TRANSLATE_SYSTEM_PROMPT,
};
use super::stream::process_stream;
use crate::cli::talk::kube_spinner;
use crate::config::LlmConfig;
use crate::error::KubeAiError;

const NO_RESPONSE: &str = "no response from API";

/// 自然言語を kubectl コマンドへ翻訳する LLM の抽象。
///
/// セッションはこのトレイトにのみ依存し、テストでは台本通りに応答する偽物を使う。
pub trait Translator {
    /// 自然言語の依頼をモデルに送り、生の応答テキストを返す。
    ///
    /// 成功時は送信した user メッセージと応答を `conversation` に記録する。
    fn translate(
        &self,
        conversation: &mut ConversationState,
        request: &str,
        cancel: &CancellationToken,
    ) -> impl Future<Output = Result<String, KubeAiError>>;

    /// コマンドやリソースの説明をストリーミングで表示し、全文を返す。
    fn explain(
        &self,
        subject: &str,
        cancel: &CancellationToken,
    ) -> impl Future<Output = Result<String, KubeAiError>>;
}

/// DeepSeek クライアント
pub struct DeepSeekClient {
    client: Client<OpenAIConfig>,
    model: String,
}

impl DeepSeekClient {
    pub fn new(config: &LlmConfig) -> Self {
        let openai = OpenAIConfig::new()
            .with_api_key(&config.api_key)
            .with_api_base(&config.api_base);
        Self {
            client: Client::with_config(openai),
            model: config.model.clone(),
        }
    }

    fn build_request(&self, messages: &[Message], stream: bool) -> CreateChatCompletionRequest {
        let request = CreateChatCompletionRequest {
            model: self.model.clone(),
            messages: messages.iter().map(to_request_message).collect(),
            stream: Some(stream),
            ..Default::default()
        };

        debug!(
            roles = ?messages.iter().map(|m| m.role.as_str()).collect::<Vec<_>>(),
            "Request messages"
        );
        match serde_json::to_string(&request) {
            Ok(body) => debug!(request_body = %body, stream, "Sending request to DeepSeek API"),
            Err(e) => debug!(error = %e, "Failed to serialize request for logging"),
        }

        request
    }
}

impl Translator for DeepSeekClient {
    async fn translate(
        &self,
        conversation: &mut ConversationState,
        request: &str,
        cancel: &CancellationToken,
    ) -> Result<String, KubeAiError> {
        let user = translate_request(request);
        let messages = conversation.request_with(TRANSLATE_SYSTEM_PROMPT, &user);
        debug!(
            message_count = messages.len(),
            history_len = conversation.len(),
            history_empty = conversation.is_empty(),
            "translate() called"
        );
        let body = self.build_request(&messages, false);

        let spinner = kube_spinner();
        spinner.set_message("Translating...");

        let chat = self.client.chat();
        let response = tokio::select! {
            biased;
            _ = cancel.cancelled() => {
                spinner.finish_and_clear();
                info!("Translation cancelled by user");
                return Err(KubeAiError::UserCancelled);
            }
            result = chat.create(body) => result,
        };
        spinner.finish_and_clear();

        let response = response.map_err(|e| {
            warn!(error = %e, "DeepSeek API request failed");
            KubeAiError::Translation(e.to_string())
        })?;

        let content = response
            .choices
            .into_iter()
            .next()
            .and_then(|choice| choice.message.content)
            .filter(|content| !content.trim().is_empty())
            .ok_or_else(|| KubeAiError::Translation(NO_RESPONSE.to_string()))?;

        info!(response_length = content.len(), "Translation received");

        conversation.push_user(user);
        conversation.push_assistant(content.clone());

        Ok(content)
    }

    async fn explain(&self, subject: &str, cancel: &CancellationToken) -> Result<String, KubeAiError> {
        let messages = [
            Message::system(EXPLAIN_SYSTEM_PROMPT),
            Message::user(explain_request(subject)),
        ];
        let body = self.build_request(&messages, true);

        let result = process_stream(&self.client, body, cancel).await?;

        if result.full_text.is_empty() {
            if result.interrupted {
                return Err(KubeAiError::UserCancelled);
            }
            return Err(KubeAiError::Translation(NO_RESPONSE.to_string()));
        }

        info!(
            response_length = result.full_text.len(),
            interrupted = result.interrupted,
            "Explanation received"
        );
        Ok(result.full_text)
    }
}

/// 会話メッセージを API のリクエスト型に変換する。
fn to_request_message(message: &Message) -> ChatCompletionRequestMessage {
    let content = message.content.clone();
    match message.role {
        Role::System => ChatCompletionRequestMessage::System(ChatCompletionRequestSystemMessage {
            content: ChatCompletionRequestSystemMessageContent::Text(content),
            name: None,
        }),
        Role::User => ChatCompletionRequestMessage::User(ChatCompletionRequestUserMessage {
            content: ChatCompletionRequestUserMessageContent::Text(content),
            name: None,
        }),
        Role::Assistant => {
            ChatCompletionRequestMessage::Assistant(ChatCompletionRequestAssistantMessage {
                content: Some(ChatCompletionRequestAssistantMessageContent::Text(content)),
                ..Default::default()
            })
        }
    }
}
