//! Chat page (`/chat`).
//!
//! The chosen style is handed to the story backend once on mount. After a
//! short pause the speak button unlocks; pressing it starts a speech
//! recognition session whose final transcript is sent to the backend too.

use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};

use storyteller_backend::StoryBackend;
use storyteller_backend::dto::ProcessStoryRequest;
use storyteller_core::error::SequencerError;
use storyteller_core::navigation::Route;
use storyteller_core::speech::{Notifier, RecognitionConfig, RecognitionEvent, SpeechRecognizer};
use storyteller_sequencer::application::scope::TaskScope;
use storyteller_sequencer::domain::page_state::PageState;
use storyteller_sequencer::domain::timeline::Timeline;
use tokio::sync::mpsc::{self, UnboundedReceiver, UnboundedSender};
use tokio::sync::watch;
use tracing::{debug, error, info, instrument, warn};

use crate::context::{PageContext, Stage};

/// Visual key of the speak button.
pub const SPEAK_BUTTON: &str = "speak-button";
/// Opens when the speak button may be pressed.
pub const SPEAK_BUTTON_GATE: &str = "speak-button";
/// Speak button waiting to be pressed.
pub const IDLE: &str = "idle";
/// Speak button while a session is listening.
pub const LISTENING: &str = "listening";

/// Input sent when the page is reached without a chosen style.
pub const UNKNOWN_INPUT: &str = "Unknown";
/// Alert shown when the platform has no speech recognition.
pub const UNSUPPORTED_MESSAGE: &str = "Speech recognition is not supported on this device.";

/// Reveals the speak button.
///
/// # Errors
///
/// Returns `SequencerError` if the cue list is malformed.
pub fn timeline() -> Result<Timeline, SequencerError> {
    Timeline::builder()
        .set_visual(2000, SPEAK_BUTTON, IDLE)
        .unlock(2000, SPEAK_BUTTON_GATE)
        .build()
}

/// Per-user chat settings.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ChatSettings {
    /// Identity sent with every story request.
    pub user_id: String,
    /// Recognition session settings.
    pub recognition: RecognitionConfig,
}

impl Default for ChatSettings {
    fn default() -> Self {
        Self {
            user_id: "user123".to_owned(),
            recognition: RecognitionConfig::default(),
        }
    }
}

/// Platform services used by the chat page.
#[derive(Clone)]
pub struct ChatServices {
    /// Receives the chosen style and every transcript.
    pub backend: Arc<dyn StoryBackend>,
    /// `None` when the platform cannot recognize speech.
    pub recognizer: Option<Arc<dyn SpeechRecognizer>>,
    /// Shows alerts to the user.
    pub notifier: Arc<dyn Notifier>,
}

struct Shared {
    state: PageState,
    backend: Arc<dyn StoryBackend>,
    user_id: String,
    deliveries: watch::Sender<usize>,
    /// Set once a session is requested, cleared when it ends or fails.
    session_open: AtomicBool,
}

impl Shared {
    #[instrument(skip_all, fields(user_id = %self.user_id))]
    async fn process(&self, user_input: String) {
        let request = ProcessStoryRequest {
            user_id: self.user_id.clone(),
            user_input,
        };
        match self.backend.process_story(&request).await {
            Ok(body) => debug!(response = %body, "story input accepted"),
            Err(e) => error!(error = %e, "story input was not delivered"),
        }
        self.deliveries.send_modify(|n| *n += 1);
    }

    async fn handle(&self, event: RecognitionEvent) {
        match event {
            RecognitionEvent::Started => self.state.set_visual(SPEAK_BUTTON, LISTENING),
            RecognitionEvent::Result {
                transcript,
                is_final,
            } => {
                let transcript = transcript.trim();
                if !is_final || transcript.is_empty() {
                    debug!(transcript, "interim transcript ignored");
                    return;
                }
                info!(transcript, "speech recognized");
                self.process(transcript.to_owned()).await;
            }
            RecognitionEvent::Error(reason) => {
                warn!(reason = %reason, "speech recognition failed");
                self.session_open.store(false, Ordering::Release);
                self.state.set_visual(SPEAK_BUTTON, IDLE);
            }
            RecognitionEvent::Ended => {
                self.session_open.store(false, Ordering::Release);
                self.state.set_visual(SPEAK_BUTTON, IDLE);
            }
        }
    }
}

async fn forward_events(shared: Arc<Shared>, mut events: UnboundedReceiver<RecognitionEvent>) {
    while let Some(event) = events.recv().await {
        shared.handle(event).await;
    }
}

/// The mounted chat page.
pub struct ChatPage {
    stage: Stage,
    shared: Arc<Shared>,
    recognizer: Option<Arc<dyn SpeechRecognizer>>,
    notifier: Arc<dyn Notifier>,
    recognition: RecognitionConfig,
    events: UnboundedSender<RecognitionEvent>,
    input: String,
    input_sent: AtomicBool,
    scope: TaskScope,
}

impl ChatPage {
    /// Mounts the page and sends `payload` (the chosen style) to the backend.
    ///
    /// # Errors
    ///
    /// Returns `SequencerError` if the page timeline is malformed.
    ///
    /// # Panics
    ///
    /// Panics if called outside a tokio runtime.
    pub fn mount(
        ctx: &PageContext,
        services: ChatServices,
        settings: ChatSettings,
        payload: Option<String>,
    ) -> Result<Self, SequencerError> {
        let stage = Stage::new(ctx);
        let shared = Arc::new(Shared {
            state: stage.state.clone(),
            backend: services.backend,
            user_id: settings.user_id,
            deliveries: watch::Sender::new(0),
            session_open: AtomicBool::new(false),
        });
        let (events, receiver) = mpsc::unbounded_channel();
        let scope = TaskScope::new();
        scope.spawn(forward_events(Arc::clone(&shared), receiver));

        stage.runner.start(timeline()?);
        let page = Self {
            stage,
            shared,
            recognizer: services.recognizer,
            notifier: services.notifier,
            recognition: settings.recognition,
            events,
            input: payload.unwrap_or_else(|| UNKNOWN_INPUT.to_owned()),
            input_sent: AtomicBool::new(false),
            scope,
        };
        page.send_initial_input();
        info!(route = %Route::Chat, input = %page.input, "page mounted");
        Ok(page)
    }

    /// Sends the page input to the backend. Returns `false` if it was
    /// already sent.
    pub fn send_initial_input(&self) -> bool {
        if self.input_sent.swap(true, Ordering::AcqRel) {
            return false;
        }
        let shared = Arc::clone(&self.shared);
        let input = self.input.clone();
        self.scope.spawn(async move { shared.process(input).await });
        true
    }

    /// Starts listening. Returns `Ok(false)` if the recognizer refused to
    /// start (already listening or engine failure).
    ///
    /// # Errors
    ///
    /// Returns `SequencerError::GateLocked` before the speak button unlocks
    /// and `SequencerError::UnsupportedCapability` without a recognizer.
    pub fn start_listening(&self) -> Result<bool, SequencerError> {
        if !self.stage.state.is_open(SPEAK_BUTTON_GATE) {
            return Err(SequencerError::GateLocked(SPEAK_BUTTON_GATE.to_owned()));
        }
        let Some(recognizer) = &self.recognizer else {
            self.notifier.alert(UNSUPPORTED_MESSAGE);
            return Err(SequencerError::UnsupportedCapability(
                "speech recognition".to_owned(),
            ));
        };
        match recognizer.start(&self.recognition, self.events.clone()) {
            Ok(()) => {
                self.shared.session_open.store(true, Ordering::Release);
                debug!(lang = %self.recognition.lang, "recognition session requested");
                Ok(true)
            }
            Err(e) => {
                warn!(error = %e, "recognition session refused");
                Ok(false)
            }
        }
    }

    /// Number of inputs handed to the backend so far, whether or not the
    /// call succeeded.
    #[must_use]
    pub fn deliveries(&self) -> watch::Receiver<usize> {
        self.shared.deliveries.subscribe()
    }

    /// The input sent on mount.
    #[must_use]
    pub fn input(&self) -> &str {
        &self.input
    }

    #[must_use]
    pub fn state(&self) -> &PageState {
        &self.stage.state
    }
}

impl Drop for ChatPage {
    fn drop(&mut self) {
        if self.shared.session_open.swap(false, Ordering::AcqRel)
            && let Some(recognizer) = &self.recognizer
        {
            recognizer.stop();
        }
        self.scope.close();
    }
}

impl std::fmt::Debug for ChatPage {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ChatPage")
            .field("input", &self.input)
            .field("recognizer", &self.recognizer.is_some())
            .field("recognition", &self.recognition)
            .finish_non_exhaustive()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::time::Duration;
    use storyteller_core::audio::ClipId;
    use storyteller_sequencer::application::music::MusicProvider;
    use storyteller_sequencer::application::settings::TransitionSettings;
    use storyteller_test_support::{
        BackendCall, FailingBackend, FakeAudioBackend, RecordingNavigator, RecordingNotifier,
        ScriptedBackend, ScriptedRecognizer, settle,
    };

    fn context() -> PageContext {
        let audio = Arc::new(FakeAudioBackend::new());
        let music = MusicProvider::new(audio.as_ref(), &ClipId::new("background-music"));
        PageContext {
            audio,
            music,
            navigator: Arc::new(RecordingNavigator::new()),
            transitions: TransitionSettings::default(),
        }
    }

    struct Fixture {
        backend: Arc<ScriptedBackend>,
        recognizer: Arc<ScriptedRecognizer>,
        notifier: Arc<RecordingNotifier>,
    }

    impl Fixture {
        fn new() -> Self {
            Self {
                backend: Arc::new(ScriptedBackend::new()),
                recognizer: Arc::new(ScriptedRecognizer::new()),
                notifier: Arc::new(RecordingNotifier::new()),
            }
        }

        fn services(&self, with_recognizer: bool) -> ChatServices {
            let recognizer: Option<Arc<dyn SpeechRecognizer>> = if with_recognizer {
                Some(self.recognizer.clone())
            } else {
                None
            };
            ChatServices {
                backend: self.backend.clone(),
                recognizer,
                notifier: self.notifier.clone(),
            }
        }

        fn story_inputs(&self) -> Vec<String> {
            self.backend
                .calls()
                .into_iter()
                .filter_map(|call| match call {
                    BackendCall::ProcessStory(request) => Some(request.user_input),
                    _ => None,
                })
                .collect()
        }
    }

    #[tokio::test(start_paused = true)]
    async fn test_mount_sends_chosen_style_exactly_once() {
        // Arrange
        let f = Fixture::new();

        // Act
        let page = ChatPage::mount(
            &context(),
            f.services(true),
            ChatSettings::default(),
            Some("Thomas".to_owned()),
        )
        .unwrap();
        let resent = page.send_initial_input();
        settle().await;

        // Assert
        assert!(!resent);
        assert_eq!(
            f.backend.calls(),
            vec![BackendCall::ProcessStory(ProcessStoryRequest {
                user_id: "user123".to_owned(),
                user_input: "Thomas".to_owned(),
            })]
        );
    }

    #[tokio::test(start_paused = true)]
    async fn test_deliveries_count_initial_input_and_transcripts() {
        let f = Fixture::new();
        let page =
            ChatPage::mount(&context(), f.services(true), ChatSettings::default(), None).unwrap();
        let mut deliveries = page.deliveries();
        deliveries.wait_for(|n| *n == 1).await.unwrap();
        tokio::time::sleep(Duration::from_secs(3)).await;

        page.start_listening().unwrap();
        f.recognizer.emit(RecognitionEvent::Result {
            transcript: "a dragon".to_owned(),
            is_final: true,
        });
        deliveries.wait_for(|n| *n == 2).await.unwrap();

        assert_eq!(f.story_inputs().len(), 2);
    }

    #[tokio::test(start_paused = true)]
    async fn test_missing_payload_sends_unknown() {
        let f = Fixture::new();

        let page =
            ChatPage::mount(&context(), f.services(true), ChatSettings::default(), None).unwrap();
        settle().await;

        assert_eq!(page.input(), UNKNOWN_INPUT);
        assert_eq!(f.story_inputs(), vec![UNKNOWN_INPUT.to_owned()]);
    }

    #[tokio::test(start_paused = true)]
    async fn test_backend_failure_is_logged_not_raised() {
        let services = ChatServices {
            backend: Arc::new(FailingBackend),
            recognizer: None,
            notifier: Arc::new(RecordingNotifier::new()),
        };

        let page =
            ChatPage::mount(&context(), services, ChatSettings::default(), None).unwrap();
        tokio::time::sleep(Duration::from_secs(3)).await;

        assert!(page.state().is_open(SPEAK_BUTTON_GATE));
    }

    #[tokio::test(start_paused = true)]
    async fn test_speak_button_unlocks_at_2000() {
        let f = Fixture::new();
        let page =
            ChatPage::mount(&context(), f.services(true), ChatSettings::default(), None).unwrap();

        tokio::time::sleep(Duration::from_millis(1999)).await;
        settle().await;
        let early = page.start_listening();
        tokio::time::sleep(Duration::from_millis(1)).await;
        settle().await;

        assert!(matches!(early, Err(SequencerError::GateLocked(_))));
        assert_eq!(page.state().snapshot().visual(SPEAK_BUTTON), Some(IDLE));
        assert!(page.start_listening().unwrap());
    }

    #[tokio::test(start_paused = true)]
    async fn test_missing_recognizer_alerts_each_attempt() {
        // Arrange
        let f = Fixture::new();
        let page =
            ChatPage::mount(&context(), f.services(false), ChatSettings::default(), None).unwrap();
        tokio::time::sleep(Duration::from_secs(3)).await;

        // Act
        let first = page.start_listening();
        let second = page.start_listening();

        // Assert
        assert!(matches!(first, Err(SequencerError::UnsupportedCapability(_))));
        assert!(matches!(second, Err(SequencerError::UnsupportedCapability(_))));
        assert_eq!(
            f.notifier.alerts(),
            vec![UNSUPPORTED_MESSAGE.to_owned(), UNSUPPORTED_MESSAGE.to_owned()]
        );
    }

    #[tokio::test(start_paused = true)]
    async fn test_recognition_session_drives_button_and_sends_transcript() {
        // Arrange
        let f = Fixture::new();
        let settings = ChatSettings {
            user_id: "kid-7".to_owned(),
            recognition: RecognitionConfig::default(),
        };
        let page = ChatPage::mount(
            &context(),
            f.services(true),
            settings,
            Some("Cinderella".to_owned()),
        )
        .unwrap();
        tokio::time::sleep(Duration::from_secs(3)).await;

        // Act
        page.start_listening().unwrap();
        f.recognizer.emit(RecognitionEvent::Started);
        settle().await;
        let while_listening = page.state().snapshot().visual(SPEAK_BUTTON).map(str::to_owned);
        f.recognizer.emit(RecognitionEvent::Result {
            transcript: "a pumpkin".to_owned(),
            is_final: false,
        });
        f.recognizer.emit(RecognitionEvent::Result {
            transcript: " a pumpkin carriage ".to_owned(),
            is_final: true,
        });
        f.recognizer.emit(RecognitionEvent::Ended);
        settle().await;

        // Assert
        assert_eq!(while_listening.as_deref(), Some(LISTENING));
        assert_eq!(page.state().snapshot().visual(SPEAK_BUTTON), Some(IDLE));
        assert_eq!(
            f.story_inputs(),
            vec!["Cinderella".to_owned(), "a pumpkin carriage".to_owned()]
        );
        assert_eq!(f.recognizer.started_with(), vec![RecognitionConfig::default()]);
        assert!(f.backend.calls().iter().all(|call| matches!(
            call,
            BackendCall::ProcessStory(request) if request.user_id == "kid-7"
        )));
    }

    #[tokio::test(start_paused = true)]
    async fn test_recognition_error_returns_button_to_idle() {
        let f = Fixture::new();
        let page =
            ChatPage::mount(&context(), f.services(true), ChatSettings::default(), None).unwrap();
        tokio::time::sleep(Duration::from_secs(3)).await;
        page.start_listening().unwrap();

        f.recognizer.emit(RecognitionEvent::Started);
        f.recognizer.emit(RecognitionEvent::Error("no-speech".to_owned()));
        settle().await;

        assert_eq!(page.state().snapshot().visual(SPEAK_BUTTON), Some(IDLE));
        assert_eq!(f.story_inputs().len(), 1);
    }

    #[tokio::test(start_paused = true)]
    async fn test_unmount_while_listening_stops_recognizer() {
        let f = Fixture::new();
        let page =
            ChatPage::mount(&context(), f.services(true), ChatSettings::default(), None).unwrap();
        tokio::time::sleep(Duration::from_secs(3)).await;
        page.start_listening().unwrap();
        f.recognizer.emit(RecognitionEvent::Started);
        settle().await;

        drop(page);

        assert_eq!(f.recognizer.stop_count(), 1);
    }

    #[tokio::test(start_paused = true)]
    async fn test_unmount_before_session_starts_stops_recognizer() {
        // Arrange
        let f = Fixture::new();
        let page =
            ChatPage::mount(&context(), f.services(true), ChatSettings::default(), None).unwrap();
        tokio::time::sleep(Duration::from_secs(3)).await;
        assert!(page.start_listening().unwrap());

        // Act
        drop(page);

        // Assert
        assert_eq!(f.recognizer.stop_count(), 1);
    }

    #[tokio::test(start_paused = true)]
    async fn test_unmount_after_session_ended_leaves_recognizer_alone() {
        let f = Fixture::new();
        let page =
            ChatPage::mount(&context(), f.services(true), ChatSettings::default(), None).unwrap();
        tokio::time::sleep(Duration::from_secs(3)).await;
        page.start_listening().unwrap();
        f.recognizer.emit(RecognitionEvent::Started);
        f.recognizer.emit(RecognitionEvent::Ended);
        settle().await;

        drop(page);

        assert_eq!(f.recognizer.stop_count(), 0);
    }
}
