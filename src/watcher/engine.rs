//! Engine lifecycle: start (validate, subscribe, backfill, watch) and stop.

use std::path::{Path, PathBuf};
use std::sync::Arc;

use notify::{Event, RecursiveMode, Watcher};
use tokio::sync::{broadcast, mpsc};
use tokio::task::JoinHandle;
use tokio::time::{Duration, MissedTickBehavior, interval};
use tokio_util::sync::CancellationToken;
use tokio_util::task::TaskTracker;

use crate::collaborators::Collaborators;
use crate::notifications::{EngineEvent, EventBroadcaster};
use crate::pairing::{Exclusion, ExtensionPair, PairState, PathFilter};
use crate::pipeline::{PipelineOptions, PipelineRunner};

use super::dispatch::Dispatcher;
use super::error::WatchError;
use super::events::{Routed, route};
use super::scanner::{ScanReport, backfill};
use super::settle::SettleQueue;

/// A running pairing engine.
///
/// Owns the pair state, the filesystem subscription (through its event
/// loop task), and the set of in-flight pipeline tasks. Dropping the
/// handle without calling [`Engine::stop`] cancels watching but does not
/// wait for pipelines.
pub struct Engine {
    root: PathBuf,
    state: Arc<PairState>,
    broadcaster: EventBroadcaster,
    cancel: CancellationToken,
    tasks: TaskTracker,
    event_loop: Option<JoinHandle<()>>,
    scan: ScanReport,
}

impl Engine {
    /// Create a builder for configuring the engine.
    pub fn builder() -> EngineBuilder {
        EngineBuilder::new()
    }

    /// Canonical watched root.
    pub fn root(&self) -> &Path {
        &self.root
    }

    /// Pair cache and claim set of this run.
    pub fn state(&self) -> &Arc<PairState> {
        &self.state
    }

    /// Result of the startup backfill (zeroes when it was skipped).
    pub fn scan_report(&self) -> ScanReport {
        self.scan
    }

    pub fn subscribe(&self) -> broadcast::Receiver<EngineEvent> {
        self.broadcaster.subscribe()
    }

    /// Number of pipelines currently running.
    pub fn in_flight(&self) -> usize {
        self.tasks.len()
    }

    /// Token that stops the engine when cancelled.
    pub fn shutdown_token(&self) -> CancellationToken {
        self.cancel.clone()
    }

    /// Stop watching and release the subscription.
    ///
    /// Pipelines already running are never interrupted; with `wait` this
    /// returns only after all of them have finished.
    pub async fn stop(mut self, wait: bool) {
        crate::log_event!("watcher", "stopping", "{}", self.root.display());
        self.cancel.cancel();

        if let Some(handle) = self.event_loop.take() {
            if let Err(e) = handle.await {
                tracing::error!("[watcher] event loop ended abnormally: {e}");
            }
        }

        self.tasks.close();
        if wait {
            let pending = self.tasks.len();
            if pending > 0 {
                crate::log_event!("watcher", "waiting", "{pending} pipelines in flight");
            }
            self.tasks.wait().await;
        }

        self.broadcaster.send(EngineEvent::Stopped);
        crate::log_event!("watcher", "stopped");
    }
}

impl Drop for Engine {
    fn drop(&mut self) {
        self.cancel.cancel();
    }
}

/// Builder for starting an [`Engine`].
pub struct EngineBuilder {
    root: Option<PathBuf>,
    extensions: ExtensionPair,
    exclusions: Vec<Exclusion>,
    collaborators: Option<Collaborators>,
    pipeline: PipelineOptions,
    broadcaster: Option<EventBroadcaster>,
    cancel: Option<CancellationToken>,
    scan_on_start: bool,
    settle_ms: u64,
    channel_size: usize,
}

impl EngineBuilder {
    pub fn new() -> Self {
        Self {
            root: None,
            extensions: ExtensionPair::default(),
            exclusions: Vec::new(),
            collaborators: None,
            pipeline: PipelineOptions::default(),
            broadcaster: None,
            cancel: None,
            scan_on_start: true,
            settle_ms: 500,
            channel_size: 256,
        }
    }

    /// Set the directory tree to watch.
    pub fn root(mut self, root: impl Into<PathBuf>) -> Self {
        self.root = Some(root.into());
        self
    }

    pub fn extensions(mut self, extensions: ExtensionPair) -> Self {
        self.extensions = extensions;
        self
    }

    /// Never pair files beneath `path`. Output locations declared by the
    /// collaborators are excluded automatically.
    pub fn exclude(mut self, path: impl Into<PathBuf>) -> Self {
        self.exclusions.push(Exclusion::Under(path.into()));
        self
    }

    pub fn collaborators(mut self, collaborators: Collaborators) -> Self {
        self.collaborators = Some(collaborators);
        self
    }

    pub fn pipeline_options(mut self, options: PipelineOptions) -> Self {
        self.pipeline = options;
        self
    }

    /// Use an existing broadcaster, e.g. to subscribe before starting.
    pub fn broadcaster(mut self, broadcaster: EventBroadcaster) -> Self {
        self.broadcaster = Some(broadcaster);
        self
    }

    /// Use an external shutdown token. Cancelling it also aborts a
    /// backfill that is still running.
    pub fn shutdown_token(mut self, token: CancellationToken) -> Self {
        self.cancel = Some(token);
        self
    }

    pub fn scan_on_start(mut self, scan: bool) -> Self {
        self.scan_on_start = scan;
        self
    }

    /// How long a new file must go without writes before it is observed.
    pub fn settle_ms(mut self, ms: u64) -> Self {
        self.settle_ms = ms;
        self
    }

    pub fn channel_size(mut self, size: usize) -> Self {
        self.channel_size = size.max(1);
        self
    }

    /// Validate the root, subscribe to it, backfill, and start watching.
    pub async fn start(self) -> Result<Engine, WatchError> {
        let root = self.root.ok_or_else(|| WatchError::InvalidConfig {
            reason: "watch root is required".to_string(),
        })?;
        let collaborators = self.collaborators.ok_or_else(|| WatchError::InvalidConfig {
            reason: "collaborators are required".to_string(),
        })?;
        let root = validate_root(&root)?;
        let filter = PathFilter::new(&root)
            .with(collaborators.exclusions())
            .with(self.exclusions);

        let broadcaster = self.broadcaster.unwrap_or_default();
        let cancel = self.cancel.unwrap_or_default();
        let state = Arc::new(PairState::new());
        let tasks = TaskTracker::new();
        let runner = PipelineRunner::new(collaborators, self.pipeline);
        let dispatcher = Dispatcher::new(
            self.extensions,
            filter,
            Arc::clone(&state),
            runner,
            tasks.clone(),
            broadcaster.clone(),
        );

        // Subscribe before the backfill so files landing mid-scan queue up.
        let (tx, rx) = mpsc::channel(self.channel_size);
        let mut watcher = notify::recommended_watcher(move |res: notify::Result<Event>| {
            let _ = tx.blocking_send(res);
        })?;
        watcher
            .watch(&root, RecursiveMode::Recursive)
            .map_err(|e| WatchError::PathWatchFailed {
                path: root.clone(),
                reason: e.to_string(),
            })?;
        crate::log_event!(
            "watcher",
            "subscribed",
            "{} (.{} + .{})",
            root.display(),
            dispatcher.extensions().drawing,
            dispatcher.extensions().document
        );

        let scan = if self.scan_on_start {
            let scan_root = root.clone();
            let scan_dispatcher = dispatcher.clone();
            let scan_cancel = cancel.clone();
            let report = tokio::task::spawn_blocking(move || {
                backfill(&scan_root, &scan_dispatcher, &scan_cancel)
            })
            .await
            .map_err(|e| WatchError::ScanFailed {
                reason: e.to_string(),
            })?;
            broadcaster.send(EngineEvent::ScanCompleted {
                files: report.files,
                pairs: report.pairs,
            });
            report
        } else {
            ScanReport::default()
        };

        let event_loop = tokio::spawn(run_event_loop(
            watcher,
            rx,
            dispatcher,
            SettleQueue::new(self.settle_ms),
            cancel.clone(),
        ));
        crate::log_event!("watcher", "started");

        Ok(Engine {
            root,
            state,
            broadcaster,
            cancel,
            tasks,
            event_loop: Some(event_loop),
            scan,
        })
    }
}

impl Default for EngineBuilder {
    fn default() -> Self {
        Self::new()
    }
}

fn validate_root(root: &Path) -> Result<PathBuf, WatchError> {
    if !root.exists() {
        return Err(WatchError::RootMissing {
            path: root.to_path_buf(),
        });
    }
    if !root.is_dir() {
        return Err(WatchError::RootNotDirectory {
            path: root.to_path_buf(),
        });
    }
    root.canonicalize().map_err(|e| WatchError::PathWatchFailed {
        path: root.to_path_buf(),
        reason: e.to_string(),
    })
}

/// Live loop: receives notifications, settles new files, and hands them to
/// the dispatcher. Owns the watcher so the subscription ends with the loop.
async fn run_event_loop(
    watcher: notify::RecommendedWatcher,
    mut rx: mpsc::Receiver<notify::Result<Event>>,
    dispatcher: Dispatcher,
    mut settle: SettleQueue,
    cancel: CancellationToken,
) {
    let mut tick = interval(Duration::from_millis(100));
    tick.set_missed_tick_behavior(MissedTickBehavior::Skip);

    loop {
        tokio::select! {
            biased;

            _ = cancel.cancelled() => break,

            received = rx.recv() => match received {
                Some(Ok(event)) => handle_event(&event, &dispatcher, &mut settle),
                Some(Err(e)) => tracing::error!("[watcher] file watch error: {e}"),
                None => {
                    tracing::warn!("[watcher] event channel closed");
                    break;
                }
            },

            _ = tick.tick(), if settle.has_pending() => {
                for signal in settle.take_ready() {
                    dispatcher.observe(signal);
                }
            }
        }
    }

    drop(watcher);
    crate::debug_event!("watcher", "subscription released");
}

fn handle_event(event: &Event, dispatcher: &Dispatcher, settle: &mut SettleQueue) {
    match route(event) {
        Routed::Appeared(raw_events) => {
            for raw in raw_events {
                if let Some(signal) = dispatcher.signal_for(&raw) {
                    crate::debug_event!("watcher", "appeared", "{}", signal.path.display());
                    settle.record(signal);
                }
            }
            for signal in settle.take_ready() {
                dispatcher.observe(signal);
            }
        }
        Routed::Written(paths) => {
            for path in paths {
                settle.touch(&path);
            }
        }
        Routed::Removed(paths) => {
            for path in paths {
                settle.remove(&path);
            }
        }
        Routed::Ignored => {}
    }
}
