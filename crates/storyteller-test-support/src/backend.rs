//! Test backends: scripted and failing `StoryBackend` implementations.

use std::collections::VecDeque;
use std::sync::Mutex;

use async_trait::async_trait;
use storyteller_backend::dto::{
    ChatReply, ImageResponse, ProcessStoryRequest, TtsResponse, WordExplanation,
};
use storyteller_backend::{BackendError, StoryBackend};

/// A call received by `ScriptedBackend`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum BackendCall {
    /// POST /story/process.
    ProcessStory(ProcessStoryRequest),
    /// POST /start.
    Start(String),
    /// POST /chat.
    Chat(String),
    /// POST /generate-image.
    GenerateImage(String),
    /// POST /tts with text and voice.
    Tts(String, String),
    /// POST /explain-word.
    ExplainWord(String),
}

/// A backend that records calls and answers from a script. Chat replies are
/// consumed in order from a shared queue for `/start` and `/chat`; once the
/// queue is empty an empty reply is returned.
#[derive(Debug, Default)]
pub struct ScriptedBackend {
    calls: Mutex<Vec<BackendCall>>,
    replies: Mutex<VecDeque<ChatReply>>,
    image_url: Option<String>,
    audio_url: Option<String>,
    explanation: WordExplanation,
}

impl ScriptedBackend {
    /// Creates a backend with no scripted answers.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Queues replies for `/start` and `/chat`.
    #[must_use]
    pub fn with_replies(self, replies: Vec<ChatReply>) -> Self {
        Self {
            replies: Mutex::new(replies.into()),
            ..self
        }
    }

    /// Sets the image URL returned by `/generate-image`.
    #[must_use]
    pub fn with_image_url(self, url: &str) -> Self {
        Self {
            image_url: Some(url.to_owned()),
            ..self
        }
    }

    /// Sets the audio URL returned by `/tts`.
    #[must_use]
    pub fn with_audio_url(self, url: &str) -> Self {
        Self {
            audio_url: Some(url.to_owned()),
            ..self
        }
    }

    /// Sets the explanation returned by `/explain-word`.
    #[must_use]
    pub fn with_explanation(self, definition: &str, pronunciation: &str) -> Self {
        Self {
            explanation: WordExplanation {
                definition: Some(definition.to_owned()),
                pronunciation: Some(pronunciation.to_owned()),
            },
            ..self
        }
    }

    /// Snapshot of all received calls.
    ///
    /// # Panics
    ///
    /// Panics if the internal mutex is poisoned.
    pub fn calls(&self) -> Vec<BackendCall> {
        self.calls.lock().unwrap().clone()
    }

    fn record(&self, call: BackendCall) {
        self.calls.lock().unwrap().push(call);
    }

    fn next_reply(&self) -> ChatReply {
        self.replies.lock().unwrap().pop_front().unwrap_or_default()
    }
}

#[async_trait]
impl StoryBackend for ScriptedBackend {
    async fn process_story(
        &self,
        request: &ProcessStoryRequest,
    ) -> Result<serde_json::Value, BackendError> {
        self.record(BackendCall::ProcessStory(request.clone()));
        Ok(serde_json::json!({ "status": "ok" }))
    }

    async fn start(&self, text: &str) -> Result<ChatReply, BackendError> {
        self.record(BackendCall::Start(text.to_owned()));
        Ok(self.next_reply())
    }

    async fn chat(&self, text: &str) -> Result<ChatReply, BackendError> {
        self.record(BackendCall::Chat(text.to_owned()));
        Ok(self.next_reply())
    }

    async fn generate_image(&self, keywords: &str) -> Result<ImageResponse, BackendError> {
        self.record(BackendCall::GenerateImage(keywords.to_owned()));
        Ok(ImageResponse {
            image_url: self.image_url.clone(),
        })
    }

    async fn tts(&self, text: &str, voice: &str) -> Result<TtsResponse, BackendError> {
        self.record(BackendCall::Tts(text.to_owned(), voice.to_owned()));
        Ok(TtsResponse {
            audio_url: self.audio_url.clone(),
        })
    }

    async fn explain_word(&self, word: &str) -> Result<WordExplanation, BackendError> {
        self.record(BackendCall::ExplainWord(word.to_owned()));
        Ok(self.explanation.clone())
    }
}

/// A backend whose every call fails with a 503 status. Useful for testing
/// that backend failures never escape the page.
#[derive(Debug)]
pub struct FailingBackend;

fn unavailable(endpoint: &'static str) -> BackendError {
    BackendError::Status {
        endpoint,
        status: 503,
    }
}

#[async_trait]
impl StoryBackend for FailingBackend {
    async fn process_story(
        &self,
        _request: &ProcessStoryRequest,
    ) -> Result<serde_json::Value, BackendError> {
        Err(unavailable("/story/process"))
    }

    async fn start(&self, _text: &str) -> Result<ChatReply, BackendError> {
        Err(unavailable("/start"))
    }

    async fn chat(&self, _text: &str) -> Result<ChatReply, BackendError> {
        Err(unavailable("/chat"))
    }

    async fn generate_image(&self, _keywords: &str) -> Result<ImageResponse, BackendError> {
        Err(unavailable("/generate-image"))
    }

    async fn tts(&self, _text: &str, _voice: &str) -> Result<TtsResponse, BackendError> {
        Err(unavailable("/tts"))
    }

    async fn explain_word(&self, _word: &str) -> Result<WordExplanation, BackendError> {
        Err(unavailable("/explain-word"))
    }
}
