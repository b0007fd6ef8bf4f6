//! Request and response bodies for the backend endpoints.

use serde::{Deserialize, Serialize};

/// Request body for POST /story/process.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ProcessStoryRequest {
    /// Caller identity.
    pub user_id: String,
    /// Selected story style or recognized speech.
    pub user_input: String,
}

/// Request body for POST /start and POST /chat.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ChatRequest {
    /// The user's message.
    pub text: String,
}

/// Response body for POST /start and POST /chat.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ChatReply {
    /// Storyteller reply.
    #[serde(default)]
    pub reply: Option<String>,
    /// Keywords for an illustration of the reply.
    #[serde(default)]
    pub keywords: Option<String>,
    /// Application-level error message.
    #[serde(default)]
    pub error: Option<String>,
}

/// Request body for POST /generate-image.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ImageRequest {
    /// Comma-separated illustration keywords.
    pub keywords: String,
}

/// Response body for POST /generate-image.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ImageResponse {
    /// URL of the generated image.
    #[serde(default)]
    pub image_url: Option<String>,
}

/// Request body for POST /tts.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TtsRequest {
    /// Text to narrate.
    pub text: String,
    /// Voice identifier.
    pub voice: String,
}

/// Response body for POST /tts.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct TtsResponse {
    /// URL of the synthesized audio.
    #[serde(default)]
    pub audio_url: Option<String>,
}

/// Request body for POST /explain-word.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ExplainWordRequest {
    /// The word to explain.
    pub word: String,
}

/// Response body for POST /explain-word.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct WordExplanation {
    /// Child-friendly definition.
    #[serde(default)]
    pub definition: Option<String>,
    /// Pronunciation hint.
    #[serde(default)]
    pub pronunciation: Option<String>,
}
