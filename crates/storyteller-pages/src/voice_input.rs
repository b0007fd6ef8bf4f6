//! Microphone input for the chatbot.
//!
//! The microphone button toggles a recognition session. Partial transcripts
//! fill the draft as they arrive; the final one is trimmed. The child still
//! sends the draft like typed text.

use std::sync::Arc;

use storyteller_core::error::SequencerError;
use storyteller_core::speech::{Notifier, RecognitionConfig, RecognitionEvent, SpeechRecognizer};
use storyteller_sequencer::application::scope::TaskScope;
use tokio::sync::mpsc::{self, UnboundedReceiver, UnboundedSender};
use tokio::sync::watch;
use tracing::{debug, info, warn};

/// Alert shown when the platform has no speech recognition.
pub const UNSUPPORTED_MESSAGE: &str =
    "Your device does not support speech recognition. Please type your message instead.";

/// Observable microphone state.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct VoiceDraft {
    /// Whether the microphone button shows as recording.
    pub recording: bool,
    /// Text recognized so far, as it would appear in the input box.
    pub text: String,
}

/// Settings for chatbot recognition sessions: partial transcripts on, a
/// single utterance per session.
#[must_use]
pub fn recognition_config() -> RecognitionConfig {
    RecognitionConfig {
        interim_results: true,
        ..RecognitionConfig::default()
    }
}

fn apply(draft: &watch::Sender<VoiceDraft>, event: RecognitionEvent) {
    match event {
        RecognitionEvent::Started => debug!("microphone open"),
        RecognitionEvent::Result {
            transcript,
            is_final,
        } => draft.send_modify(|d| {
            d.text = if is_final {
                transcript.trim().to_owned()
            } else {
                transcript
            };
        }),
        RecognitionEvent::Error(reason) => {
            warn!(reason = %reason, "speech recognition failed");
            draft.send_modify(|d| d.recording = false);
        }
        RecognitionEvent::Ended => draft.send_modify(|d| d.recording = false),
    }
}

async fn forward_events(
    draft: watch::Sender<VoiceDraft>,
    mut events: UnboundedReceiver<RecognitionEvent>,
) {
    while let Some(event) = events.recv().await {
        apply(&draft, event);
    }
}

/// The chatbot's microphone button.
pub struct VoiceInput {
    recognizer: Option<Arc<dyn SpeechRecognizer>>,
    notifier: Arc<dyn Notifier>,
    draft: watch::Sender<VoiceDraft>,
    events: UnboundedSender<RecognitionEvent>,
    scope: TaskScope,
}

impl VoiceInput {
    /// Creates an idle microphone. `recognizer` is `None` when the platform
    /// cannot recognize speech.
    ///
    /// # Panics
    ///
    /// Panics if called outside a tokio runtime.
    #[must_use]
    pub fn new(recognizer: Option<Arc<dyn SpeechRecognizer>>, notifier: Arc<dyn Notifier>) -> Self {
        let draft = watch::Sender::new(VoiceDraft::default());
        let (events, receiver) = mpsc::unbounded_channel();
        let scope = TaskScope::new();
        scope.spawn(forward_events(draft.clone(), receiver));
        Self {
            recognizer,
            notifier,
            draft,
            events,
            scope,
        }
    }

    /// Starts recording, or stops the running session. Returns whether the
    /// microphone is recording afterwards.
    ///
    /// # Errors
    ///
    /// Returns `SequencerError::UnsupportedCapability` without a recognizer,
    /// after alerting the user.
    pub fn toggle(&self) -> Result<bool, SequencerError> {
        let Some(recognizer) = &self.recognizer else {
            self.notifier.alert(UNSUPPORTED_MESSAGE);
            return Err(SequencerError::UnsupportedCapability(
                "speech recognition".to_owned(),
            ));
        };
        if self.is_recording() {
            self.draft.send_modify(|d| d.recording = false);
            recognizer.stop();
            info!("recording stopped");
            return Ok(false);
        }

        self.draft.send_modify(|d| d.recording = true);
        let config = recognition_config();
        if let Err(e) = recognizer.start(&config, self.events.clone()) {
            warn!(error = %e, "recognition session refused");
            self.draft.send_modify(|d| d.recording = false);
            return Ok(false);
        }
        info!(lang = %config.lang, "recording");
        Ok(true)
    }

    #[must_use]
    pub fn is_recording(&self) -> bool {
        self.draft.borrow().recording
    }

    /// Current draft text.
    #[must_use]
    pub fn draft(&self) -> String {
        self.draft.borrow().text.clone()
    }

    /// Empties the draft and returns what it held.
    pub fn take_draft(&self) -> String {
        let mut taken = String::new();
        self.draft
            .send_modify(|d| taken = std::mem::take(&mut d.text));
        taken
    }

    /// Watches recording state and draft text.
    #[must_use]
    pub fn subscribe(&self) -> watch::Receiver<VoiceDraft> {
        self.draft.subscribe()
    }
}

impl Drop for VoiceInput {
    fn drop(&mut self) {
        if self.is_recording()
            && let Some(recognizer) = &self.recognizer
        {
            recognizer.stop();
        }
        self.scope.close();
    }
}

impl std::fmt::Debug for VoiceInput {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("VoiceInput")
            .field("recognizer", &self.recognizer.is_some())
            .field("draft", &*self.draft.borrow())
            .finish_non_exhaustive()
    }
}
