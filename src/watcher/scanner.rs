//! One-time recursive backfill of files that existed before watching began.

use std::path::{Path, PathBuf};

use tokio_util::sync::CancellationToken;
use walkdir::WalkDir;

use crate::pairing::{
    ClaimedPair, ExtensionPair, PairState, PairStatus, PathFilter, RawEvent, normalize,
};
use crate::utils::resolve_path;

use super::dispatch::Dispatcher;

/// Totals from one backfill pass.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct ScanReport {
    pub files: usize,
    pub pairs: usize,
    pub cancelled: bool,
}

/// Every regular file under `root`, recursively. Unreadable entries are
/// logged and skipped.
pub fn walk_files(root: &Path) -> impl Iterator<Item = PathBuf> {
    WalkDir::new(root)
        .follow_links(false)
        .into_iter()
        .filter_map(|entry| match entry {
            Ok(entry) => Some(entry),
            Err(e) => {
                tracing::warn!("[scan] skipping unreadable entry: {e}");
                None
            }
        })
        .filter(|entry| entry.file_type().is_file())
        .map(walkdir::DirEntry::into_path)
}

/// Feed every existing file through the dispatcher as if it had just been
/// created. Stops early when `cancel` fires.
pub fn backfill(root: &Path, dispatcher: &Dispatcher, cancel: &CancellationToken) -> ScanReport {
    crate::log_event!("scan", "started", "{}", root.display());
    let mut report = ScanReport::default();

    for path in walk_files(root) {
        if cancel.is_cancelled() {
            report.cancelled = true;
            crate::log_event!("scan", "cancelled", "after {} files", report.files);
            return report;
        }

        report.files += 1;
        if let Some(PairStatus::Completed(_)) = dispatcher.dispatch(&RawEvent::created(path)) {
            report.pairs += 1;
        }
    }

    crate::log_event!(
        "scan",
        "completed",
        "{} files, {} pairs",
        report.files,
        report.pairs
    );
    report
}

/// Complete pairs currently present under `root`, without running anything.
///
/// Paths are reported beneath the resolved (absolute, canonical) root.
pub fn find_pairs(
    root: &Path,
    extensions: &ExtensionPair,
    filter: &PathFilter,
) -> Vec<ClaimedPair> {
    let root = resolve_path(root);
    let state = PairState::new();
    let mut pairs: Vec<ClaimedPair> = walk_files(&root)
        .filter_map(|path| normalize(&RawEvent::created(path), extensions))
        .filter(|signal| !filter.is_excluded(&signal.path))
        .filter_map(|signal| match state.observe(&signal) {
            PairStatus::Completed(pair) => Some(pair),
            _ => None,
        })
        .collect();

    pairs.sort_by(|a, b| a.stem.cmp(&b.stem));
    pairs
}
