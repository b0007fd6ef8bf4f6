//! Storyteller console entry point.

use std::error::Error;
use std::sync::Arc;

use storyteller_app::config::{AppConfig, Mode};
use storyteller_app::console::TracingAudioBackend;
use storyteller_app::shell;
use storyteller_backend::HttpStoryBackend;
use tokio::io::BufReader;
use tracing_subscriber::EnvFilter;

#[tokio::main]
async fn main() -> Result<(), Box<dyn Error>> {
    // Logs go to stderr; stdout carries the conversation.
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .json()
        .with_writer(std::io::stderr)
        .init();

    let config = AppConfig::from_env()?;
    tracing::info!(
        mode = ?config.mode,
        story_api = %config.story_api_url,
        chat_api = %config.chat_api_url,
        "Starting Storyteller"
    );

    let backend = Arc::new(HttpStoryBackend::new(
        config.story_api_url.as_str(),
        config.chat_api_url.as_str(),
    ));
    let audio = Arc::new(TracingAudioBackend);
    let input = BufReader::new(tokio::io::stdin());

    match config.mode {
        Mode::Story => shell::run_story(&config, backend, audio, input).await?,
        Mode::Chatbot => {
            shell::run_chatbot(&config, backend, audio, input, tokio::io::stdout()).await?;
        }
    }

    tracing::info!("Storyteller finished");
    Ok(())
}
