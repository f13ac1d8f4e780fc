//! Pair detection and pipeline spawning for normalized signals.

use std::sync::Arc;

use tokio_util::task::TaskTracker;

use crate::notifications::{EngineEvent, EventBroadcaster};
use crate::pairing::{
    ClaimedPair, ExtensionPair, PairState, PairStatus, PathFilter, RawEvent, Signal, normalize,
};
use crate::pipeline::PipelineRunner;

/// Shared by the scanner and the live event loop. Detection runs inline on
/// the caller; each completed pair gets its own tracked task.
#[derive(Clone)]
pub struct Dispatcher {
    extensions: ExtensionPair,
    filter: Arc<PathFilter>,
    state: Arc<PairState>,
    runner: PipelineRunner,
    tasks: TaskTracker,
    broadcaster: EventBroadcaster,
}

impl Dispatcher {
    pub fn new(
        extensions: ExtensionPair,
        filter: PathFilter,
        state: Arc<PairState>,
        runner: PipelineRunner,
        tasks: TaskTracker,
        broadcaster: EventBroadcaster,
    ) -> Self {
        Self {
            extensions,
            filter: Arc::new(filter),
            state,
            runner,
            tasks,
            broadcaster,
        }
    }

    pub fn extensions(&self) -> &ExtensionPair {
        &self.extensions
    }

    /// Normalize a raw event, dropping it if it is not a pair file or lies
    /// in an excluded location.
    pub fn signal_for(&self, event: &RawEvent) -> Option<Signal> {
        let signal = normalize(event, &self.extensions)?;
        if self.filter.is_excluded(&signal.path) {
            crate::debug_event!("pair", "excluded", "{}", signal.path.display());
            return None;
        }
        Some(signal)
    }

    /// Normalize and observe a raw event. `None` if it was filtered out.
    pub fn dispatch(&self, event: &RawEvent) -> Option<PairStatus> {
        let signal = self.signal_for(event)?;
        Some(self.observe(signal))
    }

    /// Observe a signal, spawning the pipeline if it completes a pair.
    ///
    /// Must be called from within a Tokio runtime.
    pub fn observe(&self, signal: Signal) -> PairStatus {
        let status = self.state.observe(&signal);

        match &status {
            PairStatus::Completed(pair) => {
                crate::log_event!(
                    "pair",
                    "completed",
                    "{} ({} + {})",
                    pair.stem,
                    self.extensions.drawing,
                    self.extensions.document
                );
                self.broadcaster.send(EngineEvent::PairDetected {
                    stem: pair.stem.clone(),
                });
                self.spawn_pipeline(pair.clone());
            }
            other => {
                crate::debug_event!(
                    "pair",
                    other.label(),
                    "{} {} {}",
                    signal.stem,
                    signal.kind,
                    signal.path.display()
                );
            }
        }

        status
    }

    fn spawn_pipeline(&self, pair: ClaimedPair) {
        let runner = self.runner.clone();
        let state = Arc::clone(&self.state);
        let broadcaster = self.broadcaster.clone();

        self.tasks.spawn(async move {
            let stem = pair.stem.clone();
            let outcome = runner.run_claimed(pair, &state).await;
            broadcaster.send(EngineEvent::PipelineFinished { stem, outcome });
        });
    }
}
