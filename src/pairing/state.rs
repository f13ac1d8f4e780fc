//! Pair cache and claim set.
//!
//! Both live behind a single mutex so that completion detection and claim
//! insertion (and, on the way out, entry removal and claim release) are one
//! atomic step. One `PairState` belongs to one engine run; nothing here is
//! global.

use std::collections::{BTreeMap, HashMap, HashSet};
use std::path::{Path, PathBuf};

use parking_lot::Mutex;

use super::normalizer::{FileKind, Signal};
use super::stem::Stem;

/// Known files for one stem, keyed by kind.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct PairEntry {
    paths: BTreeMap<FileKind, PathBuf>,
}

impl PairEntry {
    pub fn path(&self, kind: FileKind) -> Option<&Path> {
        self.paths.get(&kind).map(PathBuf::as_path)
    }

    pub fn kinds(&self) -> impl Iterator<Item = FileKind> + '_ {
        self.paths.keys().copied()
    }

    pub fn len(&self) -> usize {
        self.paths.len()
    }

    pub fn is_empty(&self) -> bool {
        self.paths.is_empty()
    }
}

/// A pair that has been claimed for processing.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ClaimedPair {
    pub stem: Stem,
    pub drawing: PathBuf,
    pub document: PathBuf,
}

/// Result of observing one signal.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PairStatus {
    /// Recorded; the pair is not complete yet.
    Partial,
    /// Both files present on disk; the stem is now claimed.
    Completed(ClaimedPair),
    /// A pipeline already holds this stem; the signal was dropped.
    AlreadyClaimed,
    /// The signaled file was gone before it could be recorded. Nothing is
    /// recorded and callers treat it like `Partial`: the stem waits for a
    /// later event.
    Stale,
}

impl PairStatus {
    pub fn label(&self) -> &'static str {
        match self {
            PairStatus::Partial => "partial",
            PairStatus::Completed(_) => "completed",
            PairStatus::AlreadyClaimed => "already-claimed",
            PairStatus::Stale => "stale",
        }
    }
}

#[derive(Debug, Default)]
struct Inner {
    cache: HashMap<Stem, PairEntry>,
    claims: HashSet<Stem>,
}

/// Jointly locked pair cache and claim set.
#[derive(Debug, Default)]
pub struct PairState {
    inner: Mutex<Inner>,
}

impl PairState {
    pub fn new() -> Self {
        Self::default()
    }

    /// Record a signal and decide whether its pair is now complete.
    ///
    /// Completion requires both kinds recorded and both paths existing at
    /// the instant of the check. Recorded paths that no longer exist are
    /// pruned from the entry so it only holds live files.
    pub fn observe(&self, signal: &Signal) -> PairStatus {
        let mut inner = self.inner.lock();

        if inner.claims.contains(&signal.stem) {
            return PairStatus::AlreadyClaimed;
        }

        if !signal.path.exists() {
            return PairStatus::Stale;
        }

        let entry = inner.cache.entry(signal.stem.clone()).or_default();
        entry.paths.insert(signal.kind, signal.path.clone());

        if entry.paths.len() < FileKind::ALL.len() {
            return PairStatus::Partial;
        }

        entry.paths.retain(|_, path| path.exists());

        let (Some(drawing), Some(document)) = (
            entry.paths.get(&FileKind::Drawing).cloned(),
            entry.paths.get(&FileKind::Document).cloned(),
        ) else {
            return PairStatus::Partial;
        };

        inner.claims.insert(signal.stem.clone());

        PairStatus::Completed(ClaimedPair {
            stem: signal.stem.clone(),
            drawing,
            document,
        })
    }

    /// Drop the entry and then the claim for a stem whose pipeline ended.
    ///
    /// Returns `true` if the stem was claimed.
    pub fn release(&self, stem: &Stem) -> bool {
        let mut inner = self.inner.lock();
        inner.cache.remove(stem);
        inner.claims.remove(stem)
    }

    /// Snapshot of the cache entry for a stem.
    pub fn entry(&self, stem: &Stem) -> Option<PairEntry> {
        self.inner.lock().cache.get(stem).cloned()
    }

    pub fn is_claimed(&self, stem: &Stem) -> bool {
        self.inner.lock().claims.contains(stem)
    }

    pub fn entry_count(&self) -> usize {
        self.inner.lock().cache.len()
    }

    pub fn claim_count(&self) -> usize {
        self.inner.lock().claims.len()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;
    use tempfile::TempDir;

    fn signal(dir: &TempDir, name: &str, kind: FileKind) -> Signal {
        let path = dir.path().join(name);
        Signal {
            stem: Stem::from_path(&path).unwrap(),
            kind,
            path,
        }
    }

    fn touch(dir: &TempDir, name: &str) {
        fs::write(dir.path().join(name), b"x").unwrap();
    }

    #[test]
    fn test_partial_then_completed() {
        let dir = TempDir::new().unwrap();
        touch(&dir, "job17.pdf");
        touch(&dir, "job17.dwg");
        let state = PairState::new();

        let pdf = signal(&dir, "job17.pdf", FileKind::Document);
        assert_eq!(state.observe(&pdf), PairStatus::Partial);

        let dwg = signal(&dir, "job17.dwg", FileKind::Drawing);
        match state.observe(&dwg) {
            PairStatus::Completed(pair) => {
                assert_eq!(pair.stem.as_str(), "job17");
                assert_eq!(pair.drawing, dir.path().join("job17.dwg"));
                assert_eq!(pair.document, dir.path().join("job17.pdf"));
            }
            other => panic!("expected completion, got {other:?}"),
        }

        assert!(state.is_claimed(&pdf.stem));
        assert!(state.entry(&pdf.stem).is_some());
    }

    #[test]
    fn test_claimed_stem_drops_signals() {
        let dir = TempDir::new().unwrap();
        touch(&dir, "a.pdf");
        touch(&dir, "a.dwg");
        let state = PairState::new();

        state.observe(&signal(&dir, "a.pdf", FileKind::Document));
        assert!(matches!(
            state.observe(&signal(&dir, "a.dwg", FileKind::Drawing)),
            PairStatus::Completed(_)
        ));
        assert_eq!(
            state.observe(&signal(&dir, "a.dwg", FileKind::Drawing)),
            PairStatus::AlreadyClaimed
        );
    }

    #[test]
    fn test_deleted_partner_prunes_entry() {
        let dir = TempDir::new().unwrap();
        touch(&dir, "job17.pdf");
        let state = PairState::new();

        let pdf = signal(&dir, "job17.pdf", FileKind::Document);
        assert_eq!(state.observe(&pdf), PairStatus::Partial);

        fs::remove_file(dir.path().join("job17.pdf")).unwrap();
        touch(&dir, "job17.dwg");

        let dwg = signal(&dir, "job17.dwg", FileKind::Drawing);
        assert_eq!(state.observe(&dwg), PairStatus::Partial);

        let entry = state.entry(&dwg.stem).unwrap();
        assert_eq!(entry.kinds().collect::<Vec<_>>(), vec![FileKind::Drawing]);
        assert!(!state.is_claimed(&dwg.stem));
    }

    #[test]
    fn test_missing_signal_path_is_stale() {
        let dir = TempDir::new().unwrap();
        let state = PairState::new();

        let ghost = signal(&dir, "ghost.pdf", FileKind::Document);
        assert_eq!(state.observe(&ghost), PairStatus::Stale);
        assert_eq!(state.entry_count(), 0);
    }

    #[test]
    fn test_stale_signal_leaves_partial_entry_alone() {
        let dir = TempDir::new().unwrap();
        touch(&dir, "job17.dwg");
        let state = PairState::new();

        let dwg = signal(&dir, "job17.dwg", FileKind::Drawing);
        assert_eq!(state.observe(&dwg), PairStatus::Partial);

        let ghost = signal(&dir, "job17.pdf", FileKind::Document);
        assert_eq!(state.observe(&ghost), PairStatus::Stale);

        let entry = state.entry(&dwg.stem).unwrap();
        assert_eq!(entry.kinds().collect::<Vec<_>>(), vec![FileKind::Drawing]);
        assert!(!state.is_claimed(&dwg.stem));
    }

    #[test]
    fn test_release_clears_entry_and_claim() {
        let dir = TempDir::new().unwrap();
        touch(&dir, "b.pdf");
        touch(&dir, "b.dwg");
        let state = PairState::new();

        state.observe(&signal(&dir, "b.pdf", FileKind::Document));
        state.observe(&signal(&dir, "b.dwg", FileKind::Drawing));

        let stem = Stem::from("b");
        assert!(state.release(&stem));
        assert_eq!(state.entry_count(), 0);
        assert_eq!(state.claim_count(), 0);
        assert!(!state.release(&stem));
    }

    #[test]
    fn test_later_path_replaces_earlier_one() {
        let dir = TempDir::new().unwrap();
        fs::create_dir(dir.path().join("sub")).unwrap();
        touch(&dir, "c.pdf");
        touch(&dir, "sub/c.pdf");
        let state = PairState::new();

        state.observe(&signal(&dir, "c.pdf", FileKind::Document));
        state.observe(&signal(&dir, "sub/c.pdf", FileKind::Document));

        let entry = state.entry(&Stem::from("c")).unwrap();
        assert_eq!(entry.len(), 1);
        assert_eq!(
            entry.path(FileKind::Document),
            Some(dir.path().join("sub/c.pdf").as_path())
        );
    }
}
