//! システムプロンプトとテンプレート

/// 翻訳（自然言語 → kubectl）用のシステムプロンプト
pub const TRANSLATE_SYSTEM_PROMPT: &str = "You are a Kubernetes expert who turns natural-language requests into kubectl commands. \
Collect the information you need first, then produce the exact command to run.";

/// 翻訳用のユーザーメッセージテンプレート。`{request}` を自然言語の依頼で置き換える。
const TRANSLATE_TEMPLATE: &str = r#"You are a Kubernetes expert. Produce the kubectl command(s) for the request below.
Answer strictly in this format:
1. If cluster information has to be gathered first, return: [INFO] kubectl <command>
2. If the operation is dangerous, return: [DANGEROUS] kubectl <command>
3. For an ordinary operation, return the kubectl command as-is.

Put one command per line. Do not return any descriptive text, only commands that can actually be executed.
Never use placeholder variables for values you do not know; the results will be passed back to you in the conversation.

Request: {request}"#;

/// 説明用のシステムプロンプト
pub const EXPLAIN_SYSTEM_PROMPT: &str =
    "You are a Kubernetes expert who explains what commands, manifests and API resources mean.";

/// 翻訳用のユーザーメッセージを組み立てる。
pub fn translate_request(request: &str) -> String {
    TRANSLATE_TEMPLATE.replace("{request}", request)
}

/// 説明用のユーザーメッセージを組み立てる。
pub fn explain_request(subject: &str) -> String {
    format!("You are a Kubernetes expert. Explain what the following means.\n\nCommand: {subject}")
}

/// 継続対話用のプロンプト。直前の質問と出力を新しい質問に折り込む。
pub fn follow_up_request(previous_question: &str, previous_output: &str, follow_up: &str) -> String {
    let follow_up = follow_up.trim();
    let question = if follow_up.is_empty() {
        previous_question
    } else {
        follow_up
    };
    format!(
        "Previous question: {previous_question}\nPrevious result:\n{}\nNew question: {question}",
        previous_output.trim_end()
    )
}
