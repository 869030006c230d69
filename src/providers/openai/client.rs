use reqwest::{Client, StatusCode};
use tracing::{debug, warn};

use super::types::{ChatCompletionRequest, ChatCompletionResponse, ChatMessage, OpenAIError};
use crate::provider::CompletionClient;
use crate::{ClientConfig, CompletionError, ContextText, Error, Prompt};

/// Instructions placed ahead of the context text in the system message.
pub const SYSTEM_PREAMBLE: &str = "You are a helpful assistant. Answer the user's question \
using the following background information where it is relevant:\n\n";

/// OpenAI chat-completions client.
pub struct OpenAIClient {
    client: Client,
    config: ClientConfig,
}

impl OpenAIClient {
    /// Create a new client from explicit configuration.
    pub fn new(config: ClientConfig) -> Result<Self, Error> {
        config.validate()?;
        let client = Client::builder().timeout(config.retry.timeout).build()?;

        Ok(Self { client, config })
    }

    pub fn config(&self) -> &ClientConfig {
        &self.config
    }

    /// Build the two-message conversation: preamble plus context, then the prompt.
    pub fn build_prompt(context: &ContextText, prompt: &str) -> Prompt {
        Prompt::system(format!("{SYSTEM_PREAMBLE}{context}")).with_user(prompt)
    }

    /// Convert a conversation to the chat-completions wire format.
    fn convert_request(&self, prompt: Prompt) -> ChatCompletionRequest {
        let settings = &self.config.settings;
        let messages = prompt
            .into_messages()
            .into_iter()
            .map(|message| ChatMessage {
                role: message.role.as_str().to_string(),
                content: Some(message.content),
            })
            .collect();

        ChatCompletionRequest {
            model: settings.model.clone(),
            messages,
            temperature: settings.temperature,
            max_tokens: settings.max_tokens,
            n: settings.n,
        }
    }

    fn endpoint(&self) -> String {
        format!(
            "{}/chat/completions",
            self.config.base_url.trim_end_matches('/')
        )
    }

    /// Issue one request and classify the outcome.
    async fn send_once(&self, request: &ChatCompletionRequest) -> Result<String, CompletionError> {
        let response = self
            .client
            .post(self.endpoint())
            .bearer_auth(&self.config.api_key)
            .json(request)
            .send()
            .await?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(Self::classify_failure(status, &body));
        }

        let completion: ChatCompletionResponse = response.json().await?;
        if let Some(usage) = &completion.usage {
            debug!(
                prompt_tokens = usage.prompt_tokens,
                completion_tokens = usage.completion_tokens,
                "Completion usage"
            );
        }

        completion
            .choices
            .into_iter()
            .next()
            .map(|choice| choice.message.content.unwrap_or_default().trim().to_string())
            .ok_or_else(|| CompletionError::unknown("completion API returned no choices"))
    }

    fn classify_failure(status: StatusCode, body: &str) -> CompletionError {
        let message = serde_json::from_str::<OpenAIError>(body)
            .map(|err| err.error.message)
            .unwrap_or_else(|_| body.to_string());

        if status == StatusCode::TOO_MANY_REQUESTS {
            CompletionError::RateLimited(message)
        } else {
            CompletionError::upstream(status.as_u16(), message)
        }
    }
}

#[async_trait::async_trait]
impl CompletionClient for OpenAIClient {
    async fn complete(
        &self,
        context: &ContextText,
        prompt: &str,
    ) -> Result<String, CompletionError> {
        let request = self.convert_request(Self::build_prompt(context, prompt));
        let retry = &self.config.retry;

        let mut attempt = 1;
        loop {
            match self.send_once(&request).await {
                Err(err) if err.is_retryable() && attempt < retry.max_attempts => {
                    let delay = retry.backoff_for(attempt);
                    warn!(
                        attempt,
                        max_attempts = retry.max_attempts,
                        delay_ms = delay.as_millis() as u64,
                        error = %err,
                        "Completion attempt failed, retrying"
                    );
                    tokio::time::sleep(delay).await;
                    attempt += 1;
                }
                result => return result,
            }
        }
    }
}
