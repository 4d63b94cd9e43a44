pub mod audio;
pub mod handoff;
pub mod intent;
#[allow(clippy::module_inception)]
pub mod session;
pub mod token_relay;
pub mod transcript;

// Re-export public types
pub use intent::IntentDetector;
pub use session::{SessionHandle, SessionSnapshot};
pub use transcript::{Role, Transcript, Turn};
