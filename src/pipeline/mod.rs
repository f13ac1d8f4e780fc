//! Intake pipeline for a detected pair.
//!
//! ## Stages
//!
//! ```text
//! BACKUP → EXTRACT → CREATE RECORD → CREATE FOLDERS → TRANSFER → NOTIFY
//! (best    (required) (retried)       (retried)        (required) (best
//!  effort)                                                          effort)
//! ```
//!
//! Each run owns its [`PipelineContext`]; runs for different stems share
//! nothing but the collaborators.

mod context;
mod notice;
mod retry;
mod runner;

pub use context::{FolderHandle, PipelineContext, ProjectMetadata, RecordId, keys};
pub use notice::{Notice, RecipientDirectory};
pub use retry::RetryPolicy;
pub use runner::{PipelineOptions, PipelineOutcome, PipelineRunner, Stage, StageFailure};
