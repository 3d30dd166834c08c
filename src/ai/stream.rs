//! AI ストリーミングレスポンス処理
//!
//! 説明モードのストリーミングレスポンスを受信しながら端末へ表示する。
//! Ctrl-C (SIGINT) による中断と、呼び出し側のキャンセルトークンにも対応する。

use async_openai::{config::OpenAIConfig, types::CreateChatCompletionRequest, Client};
use futures_util::StreamExt;
use tokio::signal::unix::{signal, SignalKind};
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};

use crate::cli::color::red;
use crate::cli::talk::{kube_spinner, print_stream_chunk, print_stream_end, print_stream_prefix};
use crate::error::KubeAiError;

/// ストリーム処理の結果
pub struct StreamResult {
    /// ストリーミングで受信したテキスト全文（中断時は途中まで）
    pub full_text: String,
    /// Ctrl-C (SIGINT) でストリームが中断されたかどうか
    pub interrupted: bool,
}

/// ストリーミングレスポンスを処理し、受信したテキストを表示しつつ蓄積して返す。
///
/// キャンセルトークンが発火した場合は `UserCancelled` を返す。
pub async fn process_stream(
    client: &Client<OpenAIConfig>,
    request: CreateChatCompletionRequest,
    cancel: &CancellationToken,
) -> Result<StreamResult, KubeAiError> {
    // 作成時点以降の SIGINT のみ受け取る
    let mut sigint = signal(SignalKind::interrupt()).map_err(|e| {
        KubeAiError::Translation(format!("failed to register SIGINT handler: {e}"))
    })?;

    let spinner = kube_spinner();
    spinner.set_message("Thinking...");

    let chat = client.chat();
    let mut stream = tokio::select! {
        result = chat.create_stream(request) => {
            match result {
                Ok(s) => s,
                Err(e) => {
                    spinner.finish_and_clear();
                    warn!(error = %e, "Failed to create chat stream");
                    return Err(KubeAiError::Translation(e.to_string()));
                }
            }
        }
        _ = sigint.recv() => {
            info!("Ctrl-C received while waiting for API connection, interrupting");
            spinner.finish_and_clear();
            return Ok(StreamResult {
                full_text: String::new(),
                interrupted: true,
            });
        }
        _ = cancel.cancelled() => {
            spinner.finish_and_clear();
            return Err(KubeAiError::UserCancelled);
        }
    };

    debug!("Stream created successfully, starting to process chunks");

    let mut full_text = String::new();
    let mut started_text = false;
    let mut spinner_cleared = false;
    let mut chunk_count: u32 = 0;
    let mut interrupted = false;

    loop {
        tokio::select! {
            chunk = stream.next() => {
                let Some(result) = chunk else {
                    break;
                };

                chunk_count += 1;
                let response = match result {
                    Ok(r) => r,
                    Err(e) => {
                        warn!(
                            error = %e,
                            chunks_received = chunk_count,
                            text_so_far_len = full_text.len(),
                            "Stream error occurred"
                        );
                        if !spinner_cleared {
                            spinner.finish_and_clear();
                        }
                        if started_text {
                            print_stream_end();
                        }
                        return Err(KubeAiError::Translation(format!("stream error: {e}")));
                    }
                };

                for choice in &response.choices {
                    let Some(ref content) = choice.delta.content else {
                        continue;
                    };
                    debug!(
                        chunk = chunk_count,
                        content_length = content.len(),
                        "Received text chunk"
                    );
                    if !started_text {
                        if !spinner_cleared {
                            spinner.finish_and_clear();
                            spinner_cleared = true;
                        }
                        print_stream_prefix();
                        started_text = true;
                    }
                    print_stream_chunk(content);
                    full_text.push_str(content);
                }
            }
            _ = sigint.recv() => {
                info!(
                    chunks_received = chunk_count,
                    text_so_far_len = full_text.len(),
                    "Ctrl-C received during streaming, interrupting"
                );
                interrupted = true;
                break;
            }
            _ = cancel.cancelled() => {
                if !spinner_cleared {
                    spinner.finish_and_clear();
                }
                if started_text {
                    print_stream_end();
                }
                return Err(KubeAiError::UserCancelled);
            }
        }
    }

    if !spinner_cleared {
        spinner.finish_and_clear();
    }

    if started_text {
        if interrupted {
            print_stream_chunk(&red(" [interrupted]"));
        }
        print_stream_end();
    }

    debug!(
        total_chunks = chunk_count,
        full_text_length = full_text.len(),
        interrupted = interrupted,
        "Stream processing completed"
    );

    Ok(StreamResult {
        full_text,
        interrupted,
    })
}
