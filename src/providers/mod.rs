//! Completion client implementations.

pub mod openai;

// Re-export commonly used provider types
pub use openai::{OpenAIClient, SYSTEM_PREAMBLE};
