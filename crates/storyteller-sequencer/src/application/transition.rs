//! One-shot page transitions with press feedback, optionally fading out an
//! audio handle first.

use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};

use storyteller_core::audio::{self, AudioHandle};
use storyteller_core::navigation::{Navigation, Navigator, Route};
use tokio::time::{Instant, MissedTickBehavior};
use tracing::{debug, info, instrument};

use crate::application::scope::TaskScope;
use crate::application::settings::TransitionSettings;
use crate::domain::page_state::PageState;

/// Visual value shown while a control is pressed.
pub const PRESSED: &str = "pressed";

/// Navigates away from a page at most once.
pub struct TransitionController {
    state: PageState,
    navigator: Arc<dyn Navigator>,
    settings: TransitionSettings,
    navigated: AtomicBool,
    scope: TaskScope,
}

impl TransitionController {
    /// Creates a controller for the page publishing into `state`.
    #[must_use]
    pub fn new(
        state: PageState,
        navigator: Arc<dyn Navigator>,
        settings: TransitionSettings,
    ) -> Self {
        Self {
            state,
            navigator,
            settings,
            navigated: AtomicBool::new(false),
            scope: TaskScope::new(),
        }
    }

    /// Whether a transition has been triggered.
    #[must_use]
    pub fn has_navigated(&self) -> bool {
        self.navigated.load(Ordering::Acquire)
    }

    fn claim(&self) -> bool {
        !self.navigated.swap(true, Ordering::AcqRel)
    }

    fn press(&self, key: &str) {
        self.state.set_visual(key, PRESSED);
        let state = self.state.clone();
        let key = key.to_owned();
        self.scope.spawn_after(self.settings.pressed, move || {
            state.clear_visual(&key);
        });
    }

    /// Shows press feedback on `key` and navigates to `route` after the
    /// configured delay. Returns `false` if a transition already happened.
    ///
    /// # Panics
    ///
    /// Panics if called outside a tokio runtime.
    #[instrument(skip_all, fields(route = %route, key = %key))]
    pub fn navigate(&self, key: &str, route: Route, payload: Option<String>) -> bool {
        if !self.claim() {
            debug!("transition already triggered");
            return false;
        }
        self.press(key);
        let navigator = Arc::clone(&self.navigator);
        self.scope.spawn_after(self.settings.navigate_after, move || {
            info!(route = %route, "navigating");
            navigator.navigate(Navigation { route, payload });
        });
        true
    }

    /// Shows press feedback on `key`, fades `audio` out, stops it and only
    /// then navigates. Returns `false` if a transition already happened.
    ///
    /// # Panics
    ///
    /// Panics if called outside a tokio runtime.
    #[instrument(skip_all, fields(route = %route, key = %key, clip = %audio.clip()))]
    pub fn fade_out_and_navigate(
        &self,
        key: &str,
        audio: Arc<dyn AudioHandle>,
        route: Route,
        payload: Option<String>,
    ) -> bool {
        if !self.claim() {
            debug!("transition already triggered");
            return false;
        }
        self.press(key);

        let fade = self.settings.fade;
        let navigator = Arc::clone(&self.navigator);
        let live = self.scope.liveness();
        self.scope.spawn(async move {
            let mut ticks = tokio::time::interval_at(Instant::now() + fade.period, fade.period);
            ticks.set_missed_tick_behavior(MissedTickBehavior::Delay);
            let mut volume = audio.volume();
            loop {
                ticks.tick().await;
                if !live.is_live() {
                    return;
                }
                if volume > fade.floor {
                    volume -= fade.step;
                    audio.set_volume(volume.max(0.0));
                    continue;
                }
                audio::stop(audio.as_ref());
                info!(route = %route, "fade complete; navigating");
                navigator.navigate(Navigation { route, payload });
                return;
            }
        });
        true
    }

    /// Cancels pending feedback, fades and navigation.
    pub fn cancel(&self) {
        self.scope.close();
    }
}

impl std::fmt::Debug for TransitionController {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("TransitionController")
            .field("settings", &self.settings)
            .field("navigated", &self.has_navigated())
            .finish_non_exhaustive()
    }
}
