//! Shared background music with a single owning page.
//!
//! Pages never touch the background track directly. They `claim` the
//! provider, which stops whatever is playing, and drive playback through the
//! returned lease. A lease that has been superseded by a newer claim can no
//! longer play or stop the track.

use std::sync::{Arc, Mutex, PoisonError};

use storyteller_core::audio::{self, AudioBackend, AudioHandle, ClipId};
use storyteller_core::error::SequencerError;
use storyteller_core::navigation::Route;
use tracing::{info, warn};

/// Volume of the shared background track.
pub const MUSIC_VOLUME: f32 = 0.5;

#[derive(Debug, Default)]
struct MusicState {
    owner: Option<(Route, u64)>,
    next_token: u64,
    playing: bool,
}

/// Provider of the shared background track.
#[derive(Debug)]
pub struct MusicProvider {
    track: Arc<dyn AudioHandle>,
    state: Mutex<MusicState>,
}

impl MusicProvider {
    /// Opens `clip` as a looping track at [`MUSIC_VOLUME`].
    #[must_use]
    pub fn new(backend: &dyn AudioBackend, clip: &ClipId) -> Arc<Self> {
        let track = backend.open(clip);
        track.set_looping(true);
        track.set_volume(MUSIC_VOLUME);
        Arc::new(Self {
            track,
            state: Mutex::new(MusicState::default()),
        })
    }

    fn state(&self) -> std::sync::MutexGuard<'_, MusicState> {
        self.state.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Makes `owner` the only page allowed to drive the track. Any current
    /// playback is stopped first.
    pub fn claim(self: &Arc<Self>, owner: Route) -> MusicLease {
        let mut state = self.state();
        if state.playing {
            audio::stop(self.track.as_ref());
            state.playing = false;
            info!(owner = %owner, "background music stopped for new owner");
        }
        state.next_token += 1;
        let token = state.next_token;
        state.owner = Some((owner, token));
        MusicLease {
            provider: Arc::clone(self),
            owner,
            token,
        }
    }

    /// The page currently owning the track.
    #[must_use]
    pub fn owner(&self) -> Option<Route> {
        self.state().owner.map(|(route, _)| route)
    }

    /// Whether the track is playing.
    #[must_use]
    pub fn is_playing(&self) -> bool {
        self.state().playing
    }
}

/// Proof that a page currently owns the background track.
#[derive(Debug)]
pub struct MusicLease {
    provider: Arc<MusicProvider>,
    owner: Route,
    token: u64,
}

impl MusicLease {
    /// The page holding this lease.
    #[must_use]
    pub fn owner(&self) -> Route {
        self.owner
    }

    /// Whether no newer claim has superseded this lease.
    #[must_use]
    pub fn is_current(&self) -> bool {
        self.provider
            .state()
            .owner
            .is_some_and(|(_, token)| token == self.token)
    }

    /// Starts the track unless it is already playing.
    ///
    /// # Errors
    ///
    /// Returns `SequencerError::NotAudioOwner` if the lease was superseded and
    /// `SequencerError::Playback` if playback is refused.
    pub fn play(&self) -> Result<(), SequencerError> {
        let mut state = self.provider.state();
        if state.owner.map(|(_, token)| token) != Some(self.token) {
            return Err(SequencerError::NotAudioOwner);
        }
        if state.playing {
            return Ok(());
        }
        self.provider.track.play().map_err(|e| {
            warn!(owner = %self.owner, error = %e, "background music failed to start");
            SequencerError::from(e)
        })?;
        state.playing = true;
        info!(owner = %self.owner, "background music started");
        Ok(())
    }

    /// Pauses and rewinds the track.
    ///
    /// # Errors
    ///
    /// Returns `SequencerError::NotAudioOwner` if the lease was superseded.
    pub fn stop(&self) -> Result<(), SequencerError> {
        let mut state = self.provider.state();
        if state.owner.map(|(_, token)| token) != Some(self.token) {
            return Err(SequencerError::NotAudioOwner);
        }
        audio::stop(self.provider.track.as_ref());
        state.playing = false;
        Ok(())
    }
}

impl Drop for MusicLease {
    fn drop(&mut self) {
        let mut state = self.provider.state();
        if state.owner.map(|(_, token)| token) == Some(self.token) {
            state.owner = None;
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::time::Duration;
    use storyteller_test_support::FakeAudioBackend;

    fn provider() -> (Arc<FakeAudioBackend>, Arc<MusicProvider>) {
        let backend = Arc::new(FakeAudioBackend::new());
        let provider = MusicProvider::new(backend.as_ref(), &ClipId::new("background-music"));
        (backend, provider)
    }

    #[test]
    fn test_track_is_looping_at_half_volume() {
        let (backend, _provider) = provider();

        let track = backend.handle("background-music").unwrap();

        assert!(track.is_looping());
        assert_eq!(track.volume_history(), vec![MUSIC_VOLUME]);
    }

    #[test]
    fn test_play_is_noop_while_already_playing() {
        let (backend, provider) = provider();
        let lease = provider.claim(Route::Welcome);

        lease.play().unwrap();
        lease.play().unwrap();

        assert_eq!(backend.handle("background-music").unwrap().play_count(), 1);
        assert!(provider.is_playing());
    }

    #[test]
    fn test_claim_stops_previous_owner_playback() {
        // Arrange
        let (backend, provider) = provider();
        let landing = provider.claim(Route::Welcome);
        landing.play().unwrap();
        let track = backend.handle("background-music").unwrap();
        track.advance(Duration::from_secs(9));

        // Act
        let style = provider.claim(Route::StyleChoose);

        // Assert
        assert!(track.is_paused());
        assert_eq!(track.position(), Duration::ZERO);
        assert!(!provider.is_playing());
        assert_eq!(provider.owner(), Some(Route::StyleChoose));
        assert!(style.is_current());
        assert!(!landing.is_current());
    }

    #[test]
    fn test_superseded_lease_cannot_play() {
        let (_backend, provider) = provider();
        let landing = provider.claim(Route::Welcome);
        let _style = provider.claim(Route::StyleChoose);

        let result = landing.play();

        assert!(matches!(result, Err(SequencerError::NotAudioOwner)));
        assert!(!provider.is_playing());
    }

    #[test]
    fn test_dropping_superseded_lease_keeps_new_owner() {
        let (_backend, provider) = provider();
        let landing = provider.claim(Route::Welcome);
        let _style = provider.claim(Route::StyleChoose);

        drop(landing);

        assert_eq!(provider.owner(), Some(Route::StyleChoose));
    }

    #[test]
    fn test_dropping_lease_keeps_music_playing() {
        let (_backend, provider) = provider();
        let landing = provider.claim(Route::Welcome);
        landing.play().unwrap();

        drop(landing);

        assert!(provider.is_playing());
        assert_eq!(provider.owner(), None);
    }

    #[test]
    fn test_blocked_playback_is_reported() {
        let backend = FakeAudioBackend::blocking();
        let provider = MusicProvider::new(&backend, &ClipId::new("background-music"));
        let lease = provider.claim(Route::Welcome);

        let result = lease.play();

        assert!(matches!(result, Err(SequencerError::Playback(_))));
        assert!(!provider.is_playing());
    }
}
