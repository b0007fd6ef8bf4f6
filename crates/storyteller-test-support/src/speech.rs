//! Test speech: scripted recognizer and recording notifier.

use std::sync::Mutex;

use storyteller_core::speech::{
    Notifier, RecognitionConfig, RecognitionError, RecognitionEvent, SpeechRecognizer,
};
use tokio::sync::mpsc::UnboundedSender;

/// A recognizer that accepts every `start` and lets the test emit events on
/// the most recent session's channel.
#[derive(Debug, Default)]
pub struct ScriptedRecognizer {
    configs: Mutex<Vec<RecognitionConfig>>,
    session: Mutex<Option<UnboundedSender<RecognitionEvent>>>,
    stops: Mutex<usize>,
}

impl ScriptedRecognizer {
    /// Creates an idle recognizer.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Configs passed to every `start` call.
    ///
    /// # Panics
    ///
    /// Panics if the internal mutex is poisoned.
    pub fn started_with(&self) -> Vec<RecognitionConfig> {
        self.configs.lock().unwrap().clone()
    }

    /// Number of `stop` calls.
    ///
    /// # Panics
    ///
    /// Panics if the internal mutex is poisoned.
    pub fn stop_count(&self) -> usize {
        *self.stops.lock().unwrap()
    }

    /// Emits `event` on the current session. Returns `false` if no session
    /// was started or its receiver is gone.
    ///
    /// # Panics
    ///
    /// Panics if the internal mutex is poisoned.
    pub fn emit(&self, event: RecognitionEvent) -> bool {
        self.session
            .lock()
            .unwrap()
            .as_ref()
            .is_some_and(|tx| tx.send(event).is_ok())
    }
}

impl SpeechRecognizer for ScriptedRecognizer {
    fn start(
        &self,
        config: &RecognitionConfig,
        events: UnboundedSender<RecognitionEvent>,
    ) -> Result<(), RecognitionError> {
        self.configs.lock().unwrap().push(config.clone());
        *self.session.lock().unwrap() = Some(events);
        Ok(())
    }

    fn stop(&self) {
        *self.stops.lock().unwrap() += 1;
    }
}

/// A notifier that records every alert.
#[derive(Debug, Default)]
pub struct RecordingNotifier {
    alerts: Mutex<Vec<String>>,
}

impl RecordingNotifier {
    /// Creates an empty recorder.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Snapshot of all alerts shown.
    ///
    /// # Panics
    ///
    /// Panics if the internal mutex is poisoned.
    pub fn alerts(&self) -> Vec<String> {
        self.alerts.lock().unwrap().clone()
    }
}

impl Notifier for RecordingNotifier {
    fn alert(&self, message: &str) {
        self.alerts.lock().unwrap().push(message.to_owned());
    }
}
