mod base;
pub mod openai;

// Re-export public types and traits
pub use base::{ChatCompletionStream, ChatMessage, LlmError, LlmResult, TokenStream};
pub use openai::OpenAiChat;
