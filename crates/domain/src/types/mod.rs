//! Domain types and models

pub mod chat;
pub mod completion;

pub use chat::{ChatMessage, Role};
pub use completion::{CompletionOptions, GenerationParams};
