//! Timeline runner.
//!
//! Each run is a single task that walks its timeline in order, sleeping until
//! `start + offset` for every cue. The run's liveness flag is checked right
//! before each dispatch, so a cancelled run never applies another cue even if
//! its timer has already expired.

use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::{Arc, Mutex, PoisonError};

use storyteller_core::cue::CueDispatcher;
use tokio::task::JoinHandle;
use tokio::time::Instant;
use tracing::{debug, info, instrument};
use uuid::Uuid;

use crate::domain::timeline::Timeline;

#[derive(Debug)]
struct RunInner {
    id: Uuid,
    cancelled: AtomicBool,
    pending: AtomicUsize,
    task: Mutex<Option<JoinHandle<()>>>,
}

/// Handle to one live execution of a timeline. Clones share the run.
#[derive(Debug, Clone)]
pub struct SequenceRun {
    inner: Arc<RunInner>,
}

impl SequenceRun {
    /// Identifier of this run (appears in logs).
    #[must_use]
    pub fn id(&self) -> Uuid {
        self.inner.id
    }

    /// Invalidates every cue that has not fired yet. Already fired cues are
    /// unaffected. Cancelling twice is a no-op.
    pub fn cancel(&self) {
        if self.inner.cancelled.swap(true, Ordering::AcqRel) {
            return;
        }
        if let Some(task) = self
            .inner
            .task
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .take()
        {
            task.abort();
        }
        debug!(run_id = %self.inner.id, pending = self.pending(), "run cancelled");
    }

    /// Whether the run was cancelled.
    #[must_use]
    pub fn is_cancelled(&self) -> bool {
        self.inner.cancelled.load(Ordering::Acquire)
    }

    /// Number of cues that have not fired yet.
    #[must_use]
    pub fn pending(&self) -> usize {
        self.inner.pending.load(Ordering::Acquire)
    }

    /// Whether every cue fired.
    #[must_use]
    pub fn is_complete(&self) -> bool {
        self.pending() == 0
    }

    /// Whether cues may still fire.
    #[must_use]
    pub fn is_active(&self) -> bool {
        !self.is_cancelled() && !self.is_complete()
    }
}

/// Starts timelines for one page, keeping at most one run active.
pub struct TimelineRunner {
    dispatcher: Arc<dyn CueDispatcher>,
    active: Mutex<Option<SequenceRun>>,
}

impl TimelineRunner {
    /// Creates a runner dispatching through `dispatcher`.
    #[must_use]
    pub fn new(dispatcher: Arc<dyn CueDispatcher>) -> Self {
        Self {
            dispatcher,
            active: Mutex::new(None),
        }
    }

    /// Starts `timeline`, cancelling the previous run first. Offsets are
    /// measured from the instant of this call.
    ///
    /// # Panics
    ///
    /// Panics if called outside a tokio runtime.
    #[instrument(skip_all, fields(cues = timeline.len()))]
    pub fn start(&self, timeline: Timeline) -> SequenceRun {
        let mut active = self.active.lock().unwrap_or_else(PoisonError::into_inner);
        if let Some(previous) = active.take() {
            previous.cancel();
        }

        let start = Instant::now();
        let run = SequenceRun {
            inner: Arc::new(RunInner {
                id: Uuid::new_v4(),
                cancelled: AtomicBool::new(false),
                pending: AtomicUsize::new(timeline.len()),
                task: Mutex::new(None),
            }),
        };

        let inner = Arc::clone(&run.inner);
        let dispatcher = Arc::clone(&self.dispatcher);
        let task = tokio::spawn(async move {
            for timed in timeline.cues() {
                tokio::time::sleep_until(start + timed.offset).await;
                if inner.cancelled.load(Ordering::Acquire) {
                    return;
                }
                debug!(
                    run_id = %inner.id,
                    cue = timed.cue.cue_type(),
                    offset_ms = timed.offset.as_millis(),
                    "firing cue"
                );
                dispatcher.dispatch(&timed.cue);
                inner.pending.fetch_sub(1, Ordering::AcqRel);
            }
            debug!(run_id = %inner.id, "run complete");
        });
        *run.inner.task.lock().unwrap_or_else(PoisonError::into_inner) = Some(task);

        info!(run_id = %run.id(), "run started");
        *active = Some(run.clone());
        run
    }

    /// Cancels the active run, if any.
    pub fn cancel(&self) {
        if let Some(run) = self
            .active
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .take()
        {
            run.cancel();
        }
    }

    /// The most recently started run, unless cancelled through the runner.
    #[must_use]
    pub fn current(&self) -> Option<SequenceRun> {
        self.active
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .clone()
    }
}

impl Drop for TimelineRunner {
    fn drop(&mut self) {
        self.cancel();
    }
}

impl std::fmt::Debug for TimelineRunner {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("TimelineRunner")
            .field("active", &self.current().map(|r| r.id()))
            .finish_non_exhaustive()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::time::Duration;
    use storyteller_core::cue::Cue;
    use storyteller_test_support::{RecordingDispatcher, settle};

    async fn advance_to(origin: Instant, ms: u64) {
        tokio::time::sleep_until(origin + Duration::from_millis(ms)).await;
        settle().await;
    }

    #[tokio::test(start_paused = true)]
    async fn test_cues_fire_at_their_offsets_in_order() {
        // Arrange
        let dispatcher = Arc::new(RecordingDispatcher::new());
        let runner = TimelineRunner::new(dispatcher.clone());
        let timeline = Timeline::builder()
            .unlock(0, "a")
            .unlock(500, "b")
            .unlock(500, "c")
            .unlock(1200, "d")
            .build()
            .unwrap();

        // Act
        let run = runner.start(timeline);
        tokio::time::sleep(Duration::from_secs(2)).await;

        // Assert
        let fired: Vec<(u128, Cue)> = dispatcher
            .fired()
            .into_iter()
            .map(|f| (f.at_ms, f.cue))
            .collect();
        assert_eq!(
            fired,
            vec![
                (0, Cue::unlock("a")),
                (500, Cue::unlock("b")),
                (500, Cue::unlock("c")),
                (1200, Cue::unlock("d")),
            ]
        );
        assert!(run.is_complete());
        assert!(!run.is_active());
    }

    #[tokio::test(start_paused = true)]
    async fn test_cancel_before_offset_suppresses_later_cues() {
        // Arrange
        let origin = Instant::now();
        let dispatcher = Arc::new(RecordingDispatcher::new());
        let runner = TimelineRunner::new(dispatcher.clone());
        let timeline = Timeline::builder()
            .unlock(1000, "first")
            .unlock(2000, "second")
            .unlock(3000, "third")
            .build()
            .unwrap();
        let run = runner.start(timeline);

        // Act
        advance_to(origin, 1500).await;
        run.cancel();
        tokio::time::sleep(Duration::from_secs(10)).await;

        // Assert
        assert_eq!(dispatcher.unlocked_gates(), vec!["first"]);
        assert!(run.is_cancelled());
        assert_eq!(run.pending(), 2);
    }

    #[tokio::test(start_paused = true)]
    async fn test_restart_cancels_previous_run() {
        // Arrange
        let origin = Instant::now();
        let dispatcher = Arc::new(RecordingDispatcher::new());
        let runner = TimelineRunner::new(dispatcher.clone());
        let first = runner.start(
            Timeline::builder()
                .unlock(1000, "run1-early")
                .unlock(5000, "run1-late")
                .build()
                .unwrap(),
        );

        // Act
        advance_to(origin, 2000).await;
        let second = runner.start(Timeline::builder().unlock(1000, "run2").build().unwrap());
        tokio::time::sleep(Duration::from_secs(10)).await;

        // Assert
        assert_eq!(dispatcher.unlocked_gates(), vec!["run1-early", "run2"]);
        assert!(first.is_cancelled());
        assert!(second.is_complete());
        assert_eq!(runner.current().map(|r| r.id()), Some(second.id()));
    }

    #[tokio::test(start_paused = true)]
    async fn test_landing_scenario_unlocks_next_button_at_8000() {
        // Arrange
        let origin = Instant::now();
        let dispatcher = Arc::new(RecordingDispatcher::new());
        let runner = TimelineRunner::new(dispatcher.clone());
        let timeline = Timeline::builder()
            .play_audio(2000, "A", 1.0)
            .play_audio(3000, "A", 1.0)
            .play_audio(5500, "B", 1.0)
            .unlock(6500, "music")
            .unlock(8000, "next-button")
            .build()
            .unwrap();

        // Act
        let run = runner.start(timeline);
        advance_to(origin, 7999).await;
        let before = dispatcher.unlocked_gates();
        advance_to(origin, 8000).await;

        // Assert
        assert_eq!(before, vec!["music"]);
        assert_eq!(dispatcher.unlocked_gates(), vec!["music", "next-button"]);
        assert_eq!(Instant::now() - origin, Duration::from_millis(8000));
        assert_eq!(run.pending(), 0);
    }

    #[tokio::test(start_paused = true)]
    async fn test_dropping_runner_cancels_active_run() {
        let dispatcher = Arc::new(RecordingDispatcher::new());
        let runner = TimelineRunner::new(dispatcher.clone());
        let run = runner.start(Timeline::builder().unlock(1000, "late").build().unwrap());

        drop(runner);
        tokio::time::sleep(Duration::from_secs(5)).await;

        assert!(run.is_cancelled());
        assert!(dispatcher.fired().is_empty());
    }
}
