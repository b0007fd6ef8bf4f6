//! Landing page (`/welcome`).
//!
//! A single start trigger kicks off the intro: click sound and start-button
//! fade, then the scene animation with its entrance sounds, title narration,
//! background music and finally the next button.

use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};
use std::time::Duration;

use storyteller_core::error::SequencerError;
use storyteller_core::navigation::Route;
use storyteller_sequencer::application::music::MusicLease;
use storyteller_sequencer::application::runner::SequenceRun;
use storyteller_sequencer::domain::page_state::PageState;
use storyteller_sequencer::domain::timeline::Timeline;
use tracing::{debug, info, warn};

use crate::context::{PageContext, Stage};

/// Visual key of the start button.
pub const START_BUTTON: &str = "start-button";
/// Visual key of the animated scene.
pub const SCENE: &str = "scene";
/// Visual key of the next button.
pub const NEXT_BUTTON: &str = "next-button";

/// Opens when the background music should start.
pub const MUSIC_GATE: &str = "music";
/// Opens when the next button may be pressed.
pub const NEXT_BUTTON_GATE: &str = "next-button";

/// Played when the start trigger fires.
pub const CLICK_SOUND: &str = "click-sound";
/// Played as each character enters the scene.
pub const ENTRANCE_SOUND: &str = "entrance";
/// Narration of the title.
pub const READ_TITLE: &str = "read-title";

/// Delay between the start trigger and the scene animation.
pub const SCENE_DELAY: Duration = Duration::from_millis(1000);

/// Cues of the scene animation, measured from the scene start.
///
/// # Errors
///
/// Returns `SequencerError` if the cue list is malformed.
pub fn scene_timeline() -> Result<Timeline, SequencerError> {
    Timeline::builder()
        .play_audio(2000, ENTRANCE_SOUND, 1.0)
        .play_audio(3000, ENTRANCE_SOUND, 1.0)
        .play_audio(3500, ENTRANCE_SOUND, 1.0)
        .play_audio(4000, ENTRANCE_SOUND, 1.0)
        .play_audio(5500, READ_TITLE, 1.0)
        .unlock(6500, MUSIC_GATE)
        .unlock(8000, NEXT_BUTTON_GATE)
        .build()
}

/// The whole intro, measured from the start trigger.
///
/// # Errors
///
/// Returns `SequencerError` if the cue list is malformed.
pub fn start_timeline() -> Result<Timeline, SequencerError> {
    Timeline::builder()
        .play_audio(0, CLICK_SOUND, 1.0)
        .set_visual(0, START_BUTTON, "fade-out")
        .set_visual(1000, SCENE, "animating")
        .build()?
        .followed_by(scene_timeline()?, SCENE_DELAY)
}

/// The mounted landing page.
#[derive(Debug)]
pub struct LandingPage {
    stage: Stage,
    started: AtomicBool,
    lease: Arc<MusicLease>,
}

impl LandingPage {
    /// Mounts the page and takes over the background music.
    #[must_use]
    pub fn mount(ctx: &PageContext) -> Self {
        let stage = Stage::new(ctx);
        let lease = Arc::new(ctx.music.claim(Route::Welcome));
        stage.state.set_visual(START_BUTTON, "visible");

        let hook_lease = Arc::clone(&lease);
        stage.dispatcher.on_unlock(MUSIC_GATE, move || {
            if let Err(e) = hook_lease.play() {
                warn!(error = %e, "landing music did not start");
            }
        });

        info!(route = %Route::Welcome, "page mounted");
        Self {
            stage,
            started: AtomicBool::new(false),
            lease,
        }
    }

    /// Starts the intro. Returns `false` if it was already started.
    ///
    /// # Errors
    ///
    /// Returns `SequencerError` if the intro timeline is malformed.
    pub fn trigger_start(&self) -> Result<bool, SequencerError> {
        if self.started.swap(true, Ordering::AcqRel) {
            debug!("start already triggered");
            return Ok(false);
        }
        let timeline = start_timeline()?;
        self.stage.runner.start(timeline);
        Ok(true)
    }

    /// Presses the next button, leading to the style-choose page.
    ///
    /// # Errors
    ///
    /// Returns `SequencerError::GateLocked` until the next button is unlocked.
    pub fn press_next(&self) -> Result<bool, SequencerError> {
        if !self.stage.state.is_open(NEXT_BUTTON_GATE) {
            return Err(SequencerError::GateLocked(NEXT_BUTTON_GATE.to_owned()));
        }
        Ok(self
            .stage
            .transition
            .navigate(NEXT_BUTTON, Route::StyleChoose, None))
    }

    #[must_use]
    pub fn state(&self) -> &PageState {
        &self.stage.state
    }

    /// The intro run, once started.
    #[must_use]
    pub fn run(&self) -> Option<SequenceRun> {
        self.stage.runner.current()
    }

    /// Whether this page still owns the background music.
    #[must_use]
    pub fn owns_music(&self) -> bool {
        self.lease.is_current()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use storyteller_core::audio::ClipId;
    use storyteller_sequencer::application::music::MusicProvider;
    use storyteller_sequencer::application::settings::TransitionSettings;
    use storyteller_test_support::{FakeAudioBackend, RecordingNavigator, settle};
    use tokio::time::Instant;

    struct Fixture {
        audio: Arc<FakeAudioBackend>,
        music: Arc<MusicProvider>,
        navigator: Arc<RecordingNavigator>,
        ctx: PageContext,
    }

    fn fixture() -> Fixture {
        let audio = Arc::new(FakeAudioBackend::new());
        let music = MusicProvider::new(audio.as_ref(), &ClipId::new("background-music"));
        let navigator = Arc::new(RecordingNavigator::new());
        let ctx = PageContext {
            audio: audio.clone(),
            music: Arc::clone(&music),
            navigator: navigator.clone(),
            transitions: TransitionSettings::default(),
        };
        Fixture {
            audio,
            music,
            navigator,
            ctx,
        }
    }

    async fn advance_to(origin: Instant, ms: u64) {
        tokio::time::sleep_until(origin + Duration::from_millis(ms)).await;
        settle().await;
    }

    #[test]
    fn test_start_timeline_shifts_scene_cues_by_scene_delay() {
        let timeline = start_timeline().unwrap();

        let offsets: Vec<u128> = timeline.cues().iter().map(|c| c.offset.as_millis()).collect();

        assert_eq!(
            offsets,
            vec![0, 0, 1000, 3000, 4000, 4500, 5000, 6500, 7500, 9000]
        );
    }

    #[tokio::test(start_paused = true)]
    async fn test_mount_shows_start_button_and_claims_music() {
        let f = fixture();

        let page = LandingPage::mount(&f.ctx);

        assert_eq!(page.state().snapshot().visual(START_BUTTON), Some("visible"));
        assert_eq!(f.music.owner(), Some(Route::Welcome));
        assert!(page.owns_music());
        assert!(page.run().is_none());
    }

    #[tokio::test(start_paused = true)]
    async fn test_start_trigger_is_one_shot() {
        let f = fixture();
        let page = LandingPage::mount(&f.ctx);

        let first = page.trigger_start().unwrap();
        let second = page.trigger_start().unwrap();
        settle().await;

        assert!(first);
        assert!(!second);
        assert_eq!(f.audio.handle(CLICK_SOUND).unwrap().play_count(), 1);
        assert_eq!(
            page.state().snapshot().visual(START_BUTTON),
            Some("fade-out")
        );
    }

    #[tokio::test(start_paused = true)]
    async fn test_intro_plays_music_then_unlocks_next_button() {
        // Arrange
        let origin = Instant::now();
        let f = fixture();
        let page = LandingPage::mount(&f.ctx);

        // Act
        page.trigger_start().unwrap();
        advance_to(origin, 7499).await;
        let music_before = f.music.is_playing();
        advance_to(origin, 7500).await;
        let music_after = f.music.is_playing();
        advance_to(origin, 8999).await;
        let next_before = page.state().is_open(NEXT_BUTTON_GATE);
        advance_to(origin, 9000).await;

        // Assert
        assert!(!music_before);
        assert!(music_after);
        assert!(!next_before);
        assert!(page.state().is_open(NEXT_BUTTON_GATE));
        assert_eq!(page.state().snapshot().visual(SCENE), Some("animating"));
        assert_eq!(f.audio.handle(ENTRANCE_SOUND).unwrap().play_count(), 4);
        assert_eq!(f.audio.handle(READ_TITLE).unwrap().play_count(), 1);
        assert!(page.run().unwrap().is_complete());
    }

    #[tokio::test(start_paused = true)]
    async fn test_press_next_requires_unlocked_gate() {
        let f = fixture();
        let page = LandingPage::mount(&f.ctx);
        page.trigger_start().unwrap();

        let result = page.press_next();

        assert!(matches!(result, Err(SequencerError::GateLocked(gate)) if gate == NEXT_BUTTON_GATE));
        assert_eq!(f.navigator.count(), 0);
    }

    #[tokio::test(start_paused = true)]
    async fn test_press_next_navigates_to_style_choose_once() {
        // Arrange
        let f = fixture();
        let page = LandingPage::mount(&f.ctx);
        page.trigger_start().unwrap();
        tokio::time::sleep(Duration::from_secs(10)).await;

        // Act
        let first = page.press_next().unwrap();
        let second = page.press_next().unwrap();
        tokio::time::sleep(Duration::from_secs(1)).await;

        // Assert
        assert!(first);
        assert!(!second);
        let navigations = f.navigator.navigations();
        assert_eq!(navigations.len(), 1);
        assert_eq!(navigations[0].route, Route::StyleChoose);
        assert_eq!(navigations[0].payload, None);
    }

    #[tokio::test(start_paused = true)]
    async fn test_unmount_cancels_intro() {
        let origin = Instant::now();
        let f = fixture();
        let page = LandingPage::mount(&f.ctx);
        page.trigger_start().unwrap();
        advance_to(origin, 3500).await;
        let run = page.run().unwrap();

        drop(page);
        tokio::time::sleep(Duration::from_secs(10)).await;

        assert!(run.is_cancelled());
        assert!(!f.music.is_playing());
        assert_eq!(f.audio.handle(ENTRANCE_SOUND).unwrap().play_count(), 1);
        assert!(f.audio.handle(READ_TITLE).is_none());
    }
}
