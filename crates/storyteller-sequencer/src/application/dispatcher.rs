//! Cue dispatcher applying cues to page state and audio.

use std::collections::HashMap;
use std::sync::{Arc, Mutex, PoisonError};

use storyteller_core::cue::{Cue, CueDispatcher};
use tracing::{debug, warn};

use crate::application::audio_bank::AudioBank;
use crate::domain::page_state::PageState;

type UnlockHook = Box<dyn Fn() + Send + Sync>;

/// Dispatches cues for one page.
///
/// Playback failures are logged and swallowed so a blocked clip never stops
/// the rest of the timeline.
pub struct PageDispatcher {
    state: PageState,
    audio: Arc<AudioBank>,
    hooks: Mutex<HashMap<String, Vec<UnlockHook>>>,
}

impl PageDispatcher {
    /// Creates a dispatcher publishing into `state` and playing through `audio`.
    #[must_use]
    pub fn new(state: PageState, audio: Arc<AudioBank>) -> Self {
        Self {
            state,
            audio,
            hooks: Mutex::new(HashMap::new()),
        }
    }

    /// Registers `hook` to run when `gate` flips from closed to open.
    pub fn on_unlock<F>(&self, gate: &str, hook: F)
    where
        F: Fn() + Send + Sync + 'static,
    {
        self.hooks
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .entry(gate.to_owned())
            .or_default()
            .push(Box::new(hook));
    }

    /// The page state this dispatcher publishes into.
    #[must_use]
    pub fn state(&self) -> &PageState {
        &self.state
    }
}

impl CueDispatcher for PageDispatcher {
    fn dispatch(&self, cue: &Cue) {
        match cue {
            Cue::PlayAudio { clip, volume } => {
                let handle = self.audio.acquire(clip);
                handle.set_volume(*volume);
                match handle.play() {
                    Ok(()) => debug!(%clip, volume, "audio cue started"),
                    Err(e) => warn!(%clip, error = %e, "audio cue failed; continuing timeline"),
                }
            }
            Cue::SetVisualState { key, value } => {
                self.state.set_visual(key, value);
            }
            Cue::Unlock { gate } => {
                if !self.state.unlock(gate) {
                    return;
                }
                debug!(gate = %gate, "gate unlocked");
                let hooks = self.hooks.lock().unwrap_or_else(PoisonError::into_inner);
                if let Some(hooks) = hooks.get(gate) {
                    for hook in hooks {
                        hook();
                    }
                }
            }
        }
    }
}

impl std::fmt::Debug for PageDispatcher {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("PageDispatcher")
            .field("state", &self.state)
            .field("audio", &self.audio)
            .finish_non_exhaustive()
    }
}
