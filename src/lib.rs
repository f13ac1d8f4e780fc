//! Drawing/document pair detection and intake orchestration.
//!
//! Watches a directory tree for files that share a base name ("stem") and
//! carry the two configured extensions, and runs each complete pair through
//! the intake pipeline exactly once at a time.

pub mod cli;
pub mod collaborators;
pub mod config;
pub mod logging;
pub mod notifications;
pub mod pairing;
pub mod pipeline;
pub mod utils;
pub mod watcher;

pub use collaborators::{Collaborators, CollaboratorError};
pub use config::Settings;
pub use notifications::{EngineEvent, EventBroadcaster};
pub use pairing::{ClaimedPair, ExtensionPair, PairState, PairStatus, Stem};
pub use pipeline::{PipelineOptions, PipelineOutcome, PipelineRunner, RetryPolicy, Stage};
pub use watcher::{Engine, EngineBuilder, WatchError};
