use crate::{CompletionError, ContextText};

/// A chat-completion backend that answers a prompt given static context.
///
/// Implementations hold only immutable configuration, so one instance is
/// shared by every request.
#[async_trait::async_trait]
pub trait CompletionClient: Send + Sync + 'static {
    /// Generate a reply to `prompt`, steered by `context`. The reply is trimmed.
    async fn complete(&self, context: &ContextText, prompt: &str)
        -> Result<String, CompletionError>;
}
