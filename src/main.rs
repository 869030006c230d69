use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;

use clap::Parser;
use tracing::info;
use tracing_subscriber::EnvFilter;

use gpt_relay::{
    serve, AppState, CachePolicy, ClientConfig, CompletionSettings, ContextStore, Error,
    OpenAIClient, RetryPolicy, DEFAULT_BASE_URL, DEFAULT_MODEL,
};

#[derive(Parser)]
#[command(name = "gpt-relay")]
#[command(author, version, about, long_about = None)]
struct Cli {
    /// Bearer credential for the completion API.
    #[arg(long, env = "OPENAI_API_KEY", hide_env_values = true)]
    api_key: String,

    #[arg(long, env = "OPENAI_BASE_URL", default_value = DEFAULT_BASE_URL)]
    base_url: String,

    #[arg(long, env = "OPENAI_MODEL", default_value = DEFAULT_MODEL)]
    model: String,

    /// Newline-delimited JSON file prepended to every prompt.
    #[arg(long, env = "GPT_CONTEXT_PATH", default_value = "static/context.jsonl")]
    context_path: PathBuf,

    /// Keep parsed context until the file changes.
    #[arg(long, env = "GPT_CACHE_CONTEXT")]
    cache_context: bool,

    #[arg(long, env = "OPENAI_MAX_ATTEMPTS", default_value_t = 1)]
    max_attempts: u32,

    #[arg(long, env = "OPENAI_BACKOFF_MS", default_value_t = 500)]
    backoff_ms: u64,

    #[arg(long, env = "OPENAI_TIMEOUT_SECS", default_value_t = 60)]
    timeout_secs: u64,

    #[arg(long, env = "HOST", default_value = "0.0.0.0")]
    host: String,

    #[arg(short, long, env = "PORT", default_value_t = 8000)]
    port: u16,
}

impl Cli {
    fn client_config(&self) -> ClientConfig {
        let retry = RetryPolicy {
            max_attempts: self.max_attempts,
            initial_backoff: Duration::from_millis(self.backoff_ms),
            timeout: Duration::from_secs(self.timeout_secs),
            ..RetryPolicy::default()
        };

        ClientConfig::openai(self.api_key.clone())
            .with_base_url(self.base_url.clone())
            .with_settings(CompletionSettings::default().with_model(self.model.clone()))
            .with_retry(retry)
    }

    fn context_store(&self) -> ContextStore {
        let policy = if self.cache_context {
            CachePolicy::ModifiedTime
        } else {
            CachePolicy::Disabled
        };
        ContextStore::with_policy(self.context_path.clone(), policy)
    }
}

#[tokio::main]
async fn main() -> Result<(), Error> {
    // Load .env file if it exists
    dotenvy::dotenv().ok();

    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .init();

    let cli = Cli::parse();

    let client = OpenAIClient::new(cli.client_config())?;
    let context = cli.context_store();
    info!(
        model = %client.config().settings.model,
        base_url = %client.config().base_url,
        context = %context.path().display(),
        cache = ?context.policy(),
        "Starting gpt-relay"
    );

    let state = AppState::new(Arc::new(client), context);
    let listener = tokio::net::TcpListener::bind((cli.host.as_str(), cli.port)).await?;
    serve(listener, state).await
}
