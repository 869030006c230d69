//! A small HTTP service that relays prompts to a chat-completion API.
//!
//! Each request to `POST /api/gpt/` is answered by loading the static context
//! file, sending it with the prompt to the upstream API, and returning the
//! trimmed reply as a JSON string.

pub mod context;
pub mod error;
pub mod handler;
pub mod provider;
pub mod providers;
pub mod response;
pub mod server;
pub mod types;

// Re-export core types for easy usage
pub use context::{load_context, CachePolicy, ContextStore, ContextText};
pub use error::{CompletionError, ContextError, Error};
pub use handler::AppState;
pub use provider::CompletionClient;
pub use providers::*;
pub use response::{ApiError, ErrorBody};
pub use server::{router, serve};
pub use types::*;
