//! Recording dispatcher: captures fired cues with their simulated offsets.

use std::sync::Mutex;

use storyteller_core::cue::{Cue, CueDispatcher};
use tokio::time::Instant;

/// A cue observed by `RecordingDispatcher`.
#[derive(Debug, Clone, PartialEq)]
pub struct FiredCue {
    /// Milliseconds since the dispatcher was created.
    pub at_ms: u128,
    /// The dispatched cue.
    pub cue: Cue,
}

/// A dispatcher that records every cue together with the elapsed time since
/// it was created. Create it right before starting a run.
#[derive(Debug)]
pub struct RecordingDispatcher {
    origin: Instant,
    fired: Mutex<Vec<FiredCue>>,
}

impl RecordingDispatcher {
    /// Creates a dispatcher whose origin is the current (tokio) instant.
    #[must_use]
    pub fn new() -> Self {
        Self {
            origin: Instant::now(),
            fired: Mutex::new(Vec::new()),
        }
    }

    /// Snapshot of the cues fired so far.
    ///
    /// # Panics
    ///
    /// Panics if the internal mutex is poisoned.
    pub fn fired(&self) -> Vec<FiredCue> {
        self.fired.lock().unwrap().clone()
    }

    /// Gate names unlocked so far, in order.
    pub fn unlocked_gates(&self) -> Vec<String> {
        self.fired()
            .into_iter()
            .filter_map(|f| match f.cue {
                Cue::Unlock { gate } => Some(gate),
                _ => None,
            })
            .collect()
    }
}

impl Default for RecordingDispatcher {
    fn default() -> Self {
        Self::new()
    }
}

impl CueDispatcher for RecordingDispatcher {
    fn dispatch(&self, cue: &Cue) {
        let at_ms = self.origin.elapsed().as_millis();
        self.fired.lock().unwrap().push(FiredCue {
            at_ms,
            cue: cue.clone(),
        });
    }
}
