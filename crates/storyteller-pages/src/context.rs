//! Shared page collaborators and the per-page sequencer stage.

use std::sync::Arc;

use storyteller_core::audio::AudioBackend;
use storyteller_core::navigation::Navigator;
use storyteller_sequencer::application::audio_bank::AudioBank;
use storyteller_sequencer::application::dispatcher::PageDispatcher;
use storyteller_sequencer::application::music::MusicProvider;
use storyteller_sequencer::application::runner::TimelineRunner;
use storyteller_sequencer::application::settings::TransitionSettings;
use storyteller_sequencer::application::transition::TransitionController;
use storyteller_sequencer::domain::page_state::PageState;

/// Collaborators handed down the page tree.
#[derive(Clone)]
pub struct PageContext {
    /// Opens audio clips.
    pub audio: Arc<dyn AudioBackend>,
    /// Shared background track.
    pub music: Arc<MusicProvider>,
    /// Leaves the current page.
    pub navigator: Arc<dyn Navigator>,
    /// Press and fade timings.
    pub transitions: TransitionSettings,
}

impl std::fmt::Debug for PageContext {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("PageContext")
            .field("music", &self.music)
            .field("transitions", &self.transitions)
            .finish_non_exhaustive()
    }
}

/// Sequencer components owned by one mounted page.
#[derive(Debug)]
pub(crate) struct Stage {
    pub(crate) state: PageState,
    pub(crate) audio: Arc<AudioBank>,
    pub(crate) dispatcher: Arc<PageDispatcher>,
    pub(crate) runner: TimelineRunner,
    pub(crate) transition: TransitionController,
}

impl Stage {
    pub(crate) fn new(ctx: &PageContext) -> Self {
        let state = PageState::new();
        let audio = Arc::new(AudioBank::new(Arc::clone(&ctx.audio)));
        let dispatcher = Arc::new(PageDispatcher::new(state.clone(), Arc::clone(&audio)));
        let runner = TimelineRunner::new(dispatcher.clone());
        let transition =
            TransitionController::new(state.clone(), Arc::clone(&ctx.navigator), ctx.transitions);
        Self {
            state,
            audio,
            dispatcher,
            runner,
            transition,
        }
    }
}

impl Drop for Stage {
    fn drop(&mut self) {
        self.runner.cancel();
        self.transition.cancel();
        self.audio.stop_all();
    }
}
