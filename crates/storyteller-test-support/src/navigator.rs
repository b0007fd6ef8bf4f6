//! Recording navigator: captures navigation requests.

use std::sync::Mutex;

use storyteller_core::navigation::{Navigation, Navigator};

/// A navigator that records every request without leaving the page.
#[derive(Debug, Default)]
pub struct RecordingNavigator {
    navigations: Mutex<Vec<Navigation>>,
}

impl RecordingNavigator {
    /// Creates an empty recorder.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Snapshot of all navigation requests.
    ///
    /// # Panics
    ///
    /// Panics if the internal mutex is poisoned.
    pub fn navigations(&self) -> Vec<Navigation> {
        self.navigations.lock().unwrap().clone()
    }

    /// Number of navigation requests.
    pub fn count(&self) -> usize {
        self.navigations().len()
    }
}

impl Navigator for RecordingNavigator {
    fn navigate(&self, navigation: Navigation) {
        self.navigations.lock().unwrap().push(navigation);
    }
}
