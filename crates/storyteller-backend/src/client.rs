//! Backend client trait and its reqwest implementation.

use async_trait::async_trait;
use reqwest::Client;
use serde::Serialize;
use serde::de::DeserializeOwned;
use tracing::{debug, instrument};

use crate::dto::{
    ChatReply, ChatRequest, ExplainWordRequest, ImageRequest, ImageResponse, ProcessStoryRequest,
    TtsRequest, TtsResponse, WordExplanation,
};
use crate::error::BackendError;

/// The story and chat services as seen by the pages.
#[async_trait]
pub trait StoryBackend: Send + Sync {
    /// POST /story/process. The response body is not interpreted.
    async fn process_story(
        &self,
        request: &ProcessStoryRequest,
    ) -> Result<serde_json::Value, BackendError>;

    /// POST /start, used until the storyteller confirms the user's details.
    async fn start(&self, text: &str) -> Result<ChatReply, BackendError>;

    /// POST /chat, used once the story has started.
    async fn chat(&self, text: &str) -> Result<ChatReply, BackendError>;

    /// POST /generate-image.
    async fn generate_image(&self, keywords: &str) -> Result<ImageResponse, BackendError>;

    /// POST /tts.
    async fn tts(&self, text: &str, voice: &str) -> Result<TtsResponse, BackendError>;

    /// POST /explain-word.
    async fn explain_word(&self, word: &str) -> Result<WordExplanation, BackendError>;
}

/// `StoryBackend` over JSON HTTP POST.
#[derive(Debug, Clone)]
pub struct HttpStoryBackend {
    http: Client,
    story_url: String,
    chat_url: String,
}

impl HttpStoryBackend {
    /// Creates a client with a default `reqwest::Client`.
    #[must_use]
    pub fn new(story_url: impl Into<String>, chat_url: impl Into<String>) -> Self {
        Self::with_client(Client::new(), story_url, chat_url)
    }

    /// Creates a client around an existing `reqwest::Client`.
    #[must_use]
    pub fn with_client(
        http: Client,
        story_url: impl Into<String>,
        chat_url: impl Into<String>,
    ) -> Self {
        Self {
            http,
            story_url: story_url.into().trim_end_matches('/').to_owned(),
            chat_url: chat_url.into().trim_end_matches('/').to_owned(),
        }
    }

    async fn post<B, R>(&self, base: &str, endpoint: &'static str, body: &B) -> Result<R, BackendError>
    where
        B: Serialize + Sync + ?Sized,
        R: DeserializeOwned,
    {
        let response = self
            .http
            .post(format!("{base}{endpoint}"))
            .json(body)
            .send()
            .await?;

        let status = response.status();
        if !status.is_success() {
            return Err(BackendError::Status {
                endpoint,
                status: status.as_u16(),
            });
        }

        let parsed = response.json().await?;
        debug!(endpoint, "backend call succeeded");
        Ok(parsed)
    }
}

#[async_trait]
impl StoryBackend for HttpStoryBackend {
    #[instrument(skip(self, request), fields(user_id = %request.user_id))]
    async fn process_story(
        &self,
        request: &ProcessStoryRequest,
    ) -> Result<serde_json::Value, BackendError> {
        self.post(&self.story_url, "/story/process", request).await
    }

    #[instrument(skip(self, text))]
    async fn start(&self, text: &str) -> Result<ChatReply, BackendError> {
        let body = ChatRequest {
            text: text.to_owned(),
        };
        self.post(&self.chat_url, "/start", &body).await
    }

    #[instrument(skip(self, text))]
    async fn chat(&self, text: &str) -> Result<ChatReply, BackendError> {
        let body = ChatRequest {
            text: text.to_owned(),
        };
        self.post(&self.chat_url, "/chat", &body).await
    }

    #[instrument(skip(self))]
    async fn generate_image(&self, keywords: &str) -> Result<ImageResponse, BackendError> {
        let body = ImageRequest {
            keywords: keywords.to_owned(),
        };
        self.post(&self.chat_url, "/generate-image", &body).await
    }

    #[instrument(skip(self, text))]
    async fn tts(&self, text: &str, voice: &str) -> Result<TtsResponse, BackendError> {
        let body = TtsRequest {
            text: text.to_owned(),
            voice: voice.to_owned(),
        };
        self.post(&self.chat_url, "/tts", &body).await
    }

    #[instrument(skip(self))]
    async fn explain_word(&self, word: &str) -> Result<WordExplanation, BackendError> {
        let body = ExplainWordRequest {
            word: word.to_owned(),
        };
        self.post(&self.chat_url, "/explain-word", &body).await
    }
}
