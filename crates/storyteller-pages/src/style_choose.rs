//! Style-choose page (`/style-choose`).
//!
//! The four story styles appear one by one while a voice hint plays. Picking
//! one fades the page music out and moves on to the chat page carrying the
//! style label.

use std::fmt;
use std::sync::Arc;

use storyteller_core::audio::{AudioHandle, ClipId};
use storyteller_core::error::SequencerError;
use storyteller_core::navigation::Route;
use storyteller_sequencer::application::music::MusicLease;
use storyteller_sequencer::application::runner::SequenceRun;
use storyteller_sequencer::domain::page_state::PageState;
use storyteller_sequencer::domain::timeline::Timeline;
use tracing::info;

use crate::context::{PageContext, Stage};

/// Looping music of the style-choose page.
pub const STYLE_MUSIC: &str = "style-music";
/// Spoken hint asking the child to pick a style.
pub const VOICE_HINT: &str = "voice-hint";

/// A story style offered on the page.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum StoryStyle {
    PawPatrol,
    SnowWhite,
    Thomas,
    Cinderella,
}

impl StoryStyle {
    /// Every style, in display order.
    pub const ALL: [Self; 4] = [
        Self::PawPatrol,
        Self::SnowWhite,
        Self::Thomas,
        Self::Cinderella,
    ];

    /// Label sent to the story backend.
    #[must_use]
    pub fn label(self) -> &'static str {
        match self {
            Self::PawPatrol => "Paw Patrol",
            Self::SnowWhite => "Snow White",
            Self::Thomas => "Thomas",
            Self::Cinderella => "Cinderella",
        }
    }

    /// Gate guarding this style's option button.
    #[must_use]
    pub fn gate(self) -> &'static str {
        match self {
            Self::PawPatrol => "option-1",
            Self::SnowWhite => "option-2",
            Self::Thomas => "option-3",
            Self::Cinderella => "option-4",
        }
    }

    /// Parses a label, ignoring case.
    #[must_use]
    pub fn from_label(label: &str) -> Option<Self> {
        Self::ALL
            .into_iter()
            .find(|style| style.label().eq_ignore_ascii_case(label.trim()))
    }
}

impl fmt::Display for StoryStyle {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.label())
    }
}

/// Music, voice hint and the staggered option reveal.
///
/// # Errors
///
/// Returns `SequencerError` if the cue list is malformed.
pub fn timeline() -> Result<Timeline, SequencerError> {
    Timeline::builder()
        .play_audio(1000, STYLE_MUSIC, 0.3)
        .play_audio(2000, VOICE_HINT, 0.6)
        .unlock(8000, StoryStyle::PawPatrol.gate())
        .unlock(10600, StoryStyle::SnowWhite.gate())
        .unlock(13000, StoryStyle::Thomas.gate())
        .unlock(15800, StoryStyle::Cinderella.gate())
        .build()
}

/// The mounted style-choose page.
#[derive(Debug)]
pub struct StyleChoosePage {
    stage: Stage,
    music: Arc<dyn AudioHandle>,
    _lease: MusicLease,
}

impl StyleChoosePage {
    /// Mounts the page: silences the landing music and starts the reveal.
    ///
    /// # Errors
    ///
    /// Returns `SequencerError` if the page timeline is malformed.
    pub fn mount(ctx: &PageContext) -> Result<Self, SequencerError> {
        let lease = ctx.music.claim(Route::StyleChoose);
        let stage = Stage::new(ctx);
        let music = stage.audio.acquire(&ClipId::new(STYLE_MUSIC));
        music.set_looping(true);
        stage.runner.start(timeline()?);
        info!(route = %Route::StyleChoose, "page mounted");
        Ok(Self {
            stage,
            music,
            _lease: lease,
        })
    }

    /// Styles whose option button has been revealed.
    #[must_use]
    pub fn available(&self) -> Vec<StoryStyle> {
        let snapshot = self.stage.state.snapshot();
        StoryStyle::ALL
            .into_iter()
            .filter(|style| snapshot.gate(style.gate()))
            .collect()
    }

    /// Picks `style`. Returns `false` if a style was already picked.
    ///
    /// # Errors
    ///
    /// Returns `SequencerError::GateLocked` if the style is not revealed yet.
    pub fn choose(&self, style: StoryStyle) -> Result<bool, SequencerError> {
        if !self.stage.state.is_open(style.gate()) {
            return Err(SequencerError::GateLocked(style.gate().to_owned()));
        }
        info!(style = %style, "story style chosen");
        Ok(self.stage.transition.fade_out_and_navigate(
            style.gate(),
            Arc::clone(&self.music),
            Route::Chat,
            Some(style.label().to_owned()),
        ))
    }

    #[must_use]
    pub fn state(&self) -> &PageState {
        &self.stage.state
    }

    #[must_use]
    pub fn run(&self) -> Option<SequenceRun> {
        self.stage.runner.current()
    }
}
