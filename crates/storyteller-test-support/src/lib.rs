//! Shared test fakes and utilities for the Storyteller application.

mod audio;
mod backend;
mod clock;
mod dispatcher;
mod navigator;
mod speech;

pub use audio::{FakeAudioBackend, FakeAudioHandle};
pub use backend::{BackendCall, FailingBackend, ScriptedBackend};
pub use clock::FixedClock;
pub use dispatcher::{FiredCue, RecordingDispatcher};
pub use navigator::RecordingNavigator;
pub use speech::{RecordingNotifier, ScriptedRecognizer};

/// Lets every task woken at the current (paused) instant run to its next
/// suspension point without advancing time.
pub async fn settle() {
    for _ in 0..16 {
        tokio::task::yield_now().await;
    }
}
