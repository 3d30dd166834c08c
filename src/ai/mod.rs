pub mod client;
pub mod conversation;
pub mod prompts;
mod stream;

pub use client::{DeepSeekClient, Translator};
pub use conversation::ConversationState;
