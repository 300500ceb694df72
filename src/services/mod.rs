pub mod conversation;
pub mod llm;
pub mod prompt;
pub mod speech;

pub use conversation::ConversationClient;
pub use speech::{SpeechClient, SpeechOutcome};
