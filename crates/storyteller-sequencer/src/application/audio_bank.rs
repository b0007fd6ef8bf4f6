//! Per-page audio handles, reused per clip.

use std::collections::HashMap;
use std::sync::{Arc, Mutex, PoisonError};

use storyteller_core::audio::{self, AudioBackend, AudioHandle, ClipId};
use tracing::debug;

/// Handles opened by one page. A clip is opened once and the same handle is
/// reused for every later cue naming it.
pub struct AudioBank {
    backend: Arc<dyn AudioBackend>,
    handles: Mutex<HashMap<ClipId, Arc<dyn AudioHandle>>>,
}

impl AudioBank {
    /// Creates an empty bank over `backend`.
    #[must_use]
    pub fn new(backend: Arc<dyn AudioBackend>) -> Self {
        Self {
            backend,
            handles: Mutex::new(HashMap::new()),
        }
    }

    /// Returns the handle for `clip`, opening it on first use.
    pub fn acquire(&self, clip: &ClipId) -> Arc<dyn AudioHandle> {
        let mut handles = self.handles.lock().unwrap_or_else(PoisonError::into_inner);
        Arc::clone(handles.entry(clip.clone()).or_insert_with(|| {
            debug!(%clip, "opening audio clip");
            self.backend.open(clip)
        }))
    }

    /// Pauses and rewinds every handle the page opened.
    pub fn stop_all(&self) {
        let handles = self.handles.lock().unwrap_or_else(PoisonError::into_inner);
        for handle in handles.values() {
            audio::stop(handle.as_ref());
        }
    }
}

impl std::fmt::Debug for AudioBank {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let handles = self.handles.lock().unwrap_or_else(PoisonError::into_inner);
        f.debug_struct("AudioBank")
            .field("clips", &handles.keys().collect::<Vec<_>>())
            .finish_non_exhaustive()
    }
}
