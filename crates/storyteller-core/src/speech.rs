//! Speech recognition capability and user alerts.
//!
//! Recognition is event-driven: `start` returns immediately and results arrive
//! later on the supplied channel.

use thiserror::Error;
use tokio::sync::mpsc::UnboundedSender;

/// Recognition session settings.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RecognitionConfig {
    /// Keep listening after the first result.
    pub continuous: bool,
    /// Deliver non-final transcripts as they are produced.
    pub interim_results: bool,
    /// BCP-47 language tag.
    pub lang: String,
}

impl Default for RecognitionConfig {
    fn default() -> Self {
        Self {
            continuous: false,
            interim_results: false,
            lang: "en-US".to_owned(),
        }
    }
}

/// Events emitted by a recognition session.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RecognitionEvent {
    /// The recognizer started listening.
    Started,
    /// A transcript was produced.
    Result {
        /// Recognized text.
        transcript: String,
        /// Whether the recognizer will not revise this transcript.
        is_final: bool,
    },
    /// Recognition failed.
    Error(String),
    /// The recognizer stopped listening.
    Ended,
}

/// Errors raised when a recognition session cannot be started.
#[derive(Debug, Error)]
pub enum RecognitionError {
    /// A session is already running.
    #[error("recognition already in progress")]
    AlreadyStarted,

    /// The underlying engine failed to start.
    #[error("recognition engine failed: {0}")]
    Engine(String),
}

/// A speech recognition engine.
pub trait SpeechRecognizer: Send + Sync {
    /// Starts a recognition session, delivering events to `events`.
    ///
    /// # Errors
    ///
    /// Returns `RecognitionError` if the session cannot be started.
    fn start(
        &self,
        config: &RecognitionConfig,
        events: UnboundedSender<RecognitionEvent>,
    ) -> Result<(), RecognitionError>;

    /// Stops the current session, if any.
    fn stop(&self);
}

/// Blocking user-facing alerts (unsupported capabilities).
pub trait Notifier: Send + Sync {
    /// Shows `message` to the user.
    fn alert(&self, message: &str);
}
