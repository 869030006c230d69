use serde::Deserialize;

/// Body of an inbound completion request.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct PromptRequest {
    #[serde(default)]
    pub prompt: Option<String>,
}

impl PromptRequest {
    /// The prompt, if one was supplied and is not blank.
    ///
    /// The returned text is untrimmed; trimming only decides emptiness.
    pub fn prompt(&self) -> Option<&str> {
        self.prompt
            .as_deref()
            .filter(|prompt| !prompt.trim().is_empty())
    }
}
