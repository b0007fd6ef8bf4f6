//! Terminal adapters for the platform capabilities the pages need.

use std::sync::{Arc, Mutex, MutexGuard, PoisonError};
use std::time::Duration;

use storyteller_core::audio::{AudioBackend, AudioHandle, ClipId, PlaybackError};
use storyteller_core::navigation::{Navigation, Navigator};
use storyteller_core::speech::{
    Notifier, RecognitionConfig, RecognitionError, RecognitionEvent, SpeechRecognizer,
};
use tokio::sync::mpsc::UnboundedSender;
use tokio::time::Instant;
use tracing::{debug, info, warn};

#[derive(Debug)]
struct ClipState {
    volume: f32,
    looping: bool,
    played: Duration,
    playing_since: Option<Instant>,
}

impl ClipState {
    fn position(&self) -> Duration {
        self.played + self.playing_since.map_or(Duration::ZERO, |since| since.elapsed())
    }
}

/// A clip that only logs what it would play.
#[derive(Debug)]
pub struct LoggedClip {
    clip: ClipId,
    state: Mutex<ClipState>,
}

impl LoggedClip {
    fn new(clip: ClipId) -> Self {
        Self {
            clip,
            state: Mutex::new(ClipState {
                volume: 1.0,
                looping: false,
                played: Duration::ZERO,
                playing_since: None,
            }),
        }
    }

    fn state(&self) -> MutexGuard<'_, ClipState> {
        self.state.lock().unwrap_or_else(PoisonError::into_inner)
    }
}

impl AudioHandle for LoggedClip {
    fn clip(&self) -> &ClipId {
        &self.clip
    }

    fn play(&self) -> Result<(), PlaybackError> {
        let mut state = self.state();
        if state.playing_since.is_none() {
            state.playing_since = Some(Instant::now());
        }
        info!(clip = %self.clip, volume = state.volume, looping = state.looping, "playing");
        Ok(())
    }

    fn pause(&self) {
        let mut state = self.state();
        if let Some(since) = state.playing_since.take() {
            state.played += since.elapsed();
            debug!(clip = %self.clip, "paused");
        }
    }

    fn volume(&self) -> f32 {
        self.state().volume
    }

    fn set_volume(&self, volume: f32) {
        self.state().volume = volume.clamp(0.0, 1.0);
    }

    fn set_looping(&self, looping: bool) {
        self.state().looping = looping;
    }

    fn rewind(&self) {
        let mut state = self.state();
        state.played = Duration::ZERO;
        if state.playing_since.is_some() {
            state.playing_since = Some(Instant::now());
        }
    }

    fn is_paused(&self) -> bool {
        self.state().playing_since.is_none()
    }

    fn position(&self) -> Duration {
        self.state().position()
    }
}

/// Audio backend whose clips write to the log instead of a speaker.
#[derive(Debug, Clone, Copy, Default)]
pub struct TracingAudioBackend;

impl AudioBackend for TracingAudioBackend {
    fn open(&self, clip: &ClipId) -> Arc<dyn AudioHandle> {
        Arc::new(LoggedClip::new(clip.clone()))
    }
}

/// Forwards navigations to the shell's page loop.
#[derive(Debug, Clone)]
pub struct ChannelNavigator {
    tx: UnboundedSender<Navigation>,
}

impl ChannelNavigator {
    #[must_use]
    pub fn new(tx: UnboundedSender<Navigation>) -> Self {
        Self { tx }
    }
}

impl Navigator for ChannelNavigator {
    fn navigate(&self, navigation: Navigation) {
        let route = navigation.route;
        if self.tx.send(navigation).is_err() {
            warn!(route = %route, "navigation dropped; page loop has stopped");
        }
    }
}

/// Recognizer fed by typed lines: each heard line is one final transcript.
#[derive(Debug, Default)]
pub struct ConsoleRecognizer {
    session: Mutex<Option<UnboundedSender<RecognitionEvent>>>,
}

impl ConsoleRecognizer {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    fn session(&self) -> MutexGuard<'_, Option<UnboundedSender<RecognitionEvent>>> {
        self.session.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Delivers `line` to the listening session and ends it. Returns `false`
    /// if nobody is listening.
    pub fn hear(&self, line: &str) -> bool {
        let Some(events) = self.session().take() else {
            return false;
        };
        let delivered = events
            .send(RecognitionEvent::Result {
                transcript: line.to_owned(),
                is_final: true,
            })
            .is_ok();
        let _ = events.send(RecognitionEvent::Ended);
        delivered
    }

    /// Whether a session is waiting for a line.
    #[must_use]
    pub fn is_listening(&self) -> bool {
        self.session().is_some()
    }
}

impl SpeechRecognizer for ConsoleRecognizer {
    fn start(
        &self,
        config: &RecognitionConfig,
        events: UnboundedSender<RecognitionEvent>,
    ) -> Result<(), RecognitionError> {
        let mut session = self.session();
        if session.is_some() {
            return Err(RecognitionError::AlreadyStarted);
        }
        events
            .send(RecognitionEvent::Started)
            .map_err(|_| RecognitionError::Engine("event channel closed".to_owned()))?;
        debug!(lang = %config.lang, "listening for a typed line");
        *session = Some(events);
        Ok(())
    }

    fn stop(&self) {
        if let Some(events) = self.session().take() {
            let _ = events.send(RecognitionEvent::Ended);
        }
    }
}

/// Shows alerts as warnings in the log.
#[derive(Debug, Clone, Copy, Default)]
pub struct ConsoleNotifier;

impl Notifier for ConsoleNotifier {
    fn alert(&self, message: &str) {
        warn!(alert = message, "user alert");
    }
}
