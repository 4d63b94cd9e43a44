mod base;
pub mod openai;

// Re-export public types and traits
pub use base::{TextToSpeech, TtsError, TtsResult};
pub use openai::OpenAiSpeech;
