//! Directory watcher and initial scanner.
//!
//! # Architecture
//!
//! ```text
//! Engine::start
//!   - validate root
//!   - notify::RecommendedWatcher (recursive) ──▶ mpsc channel
//!   - backfill: walkdir ──▶ Dispatcher          (blocking pool)
//!   - event loop: channel ──▶ SettleQueue ──▶ Dispatcher
//!                                               │
//!                          PairState::observe ◀─┘
//!                                │ Completed
//!                                ▼
//!                    TaskTracker::spawn(PipelineRunner)
//! ```

mod dispatch;
mod engine;
mod error;
mod events;
mod scanner;
mod settle;

pub use dispatch::Dispatcher;
pub use engine::{Engine, EngineBuilder};
pub use error::WatchError;
pub use events::{Routed, route};
pub use scanner::{ScanReport, backfill, find_pairs, walk_files};
pub use settle::SettleQueue;
