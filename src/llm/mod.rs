mod client;
mod prompt;
mod response;

pub use client::{ChatMessage, ChatModel, ChatRole, LlmClient, LlmError};
pub use prompt::{translation_prompt, vulnerability_prompt};
pub use response::extract_translation;
