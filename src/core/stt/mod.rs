mod base;
pub mod openai;

// Re-export public types and traits
pub use base::{SpeechToText, SttError, SttResult};
pub use openai::OpenAiWhisper;
