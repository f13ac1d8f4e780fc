//! Raw filesystem notification filtering.
//!
//! Turns "file created" and "file moved here" notifications into a single
//! [`Signal`] for the two configured extensions. Everything else is dropped.

use std::fmt;
use std::path::PathBuf;

use serde::{Deserialize, Serialize};

use super::stem::{Stem, extension_of};

/// Which half of a pair a file is.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum FileKind {
    Drawing,
    Document,
}

impl FileKind {
    pub const ALL: [FileKind; 2] = [FileKind::Drawing, FileKind::Document];
}

impl fmt::Display for FileKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            FileKind::Drawing => f.write_str("drawing"),
            FileKind::Document => f.write_str("document"),
        }
    }
}

/// The two designated extensions, stored lowercase without a dot.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ExtensionPair {
    pub drawing: String,
    pub document: String,
}

impl ExtensionPair {
    pub fn new(drawing: impl Into<String>, document: impl Into<String>) -> Self {
        Self {
            drawing: normalize_extension(&drawing.into()),
            document: normalize_extension(&document.into()),
        }
    }

    /// Map a lowercased extension to the file kind it designates.
    pub fn kind_of(&self, extension: &str) -> Option<FileKind> {
        if extension == self.drawing {
            Some(FileKind::Drawing)
        } else if extension == self.document {
            Some(FileKind::Document)
        } else {
            None
        }
    }

    pub fn extension(&self, kind: FileKind) -> &str {
        match kind {
            FileKind::Drawing => &self.drawing,
            FileKind::Document => &self.document,
        }
    }
}

impl Default for ExtensionPair {
    fn default() -> Self {
        Self::new("dwg", "pdf")
    }
}

fn normalize_extension(ext: &str) -> String {
    ext.trim().trim_start_matches('.').to_lowercase()
}

/// Kind of raw notification the normalizer accepts.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RawEventKind {
    Created,
    MovedTo,
}

/// A raw filesystem notification, already reduced to one path.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RawEvent {
    pub kind: RawEventKind,
    pub path: PathBuf,
    pub is_dir: bool,
}

impl RawEvent {
    pub fn created(path: impl Into<PathBuf>) -> Self {
        Self {
            kind: RawEventKind::Created,
            path: path.into(),
            is_dir: false,
        }
    }

    pub fn moved_to(path: impl Into<PathBuf>) -> Self {
        Self {
            kind: RawEventKind::MovedTo,
            path: path.into(),
            is_dir: false,
        }
    }
}

/// Normalized "file appeared at path" signal.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Signal {
    pub stem: Stem,
    pub kind: FileKind,
    pub path: PathBuf,
}

/// Filter a raw event down to a [`Signal`].
///
/// Directory events, paths without a stem, and paths whose extension is
/// not one of the pair are ignored.
pub fn normalize(event: &RawEvent, extensions: &ExtensionPair) -> Option<Signal> {
    if event.is_dir {
        return None;
    }

    let extension = extension_of(&event.path)?;
    let kind = extensions.kind_of(&extension)?;
    let stem = Stem::from_path(&event.path)?;

    Some(Signal {
        stem,
        kind,
        path: event.path.clone(),
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_normalize_accepts_both_extensions() {
        let pair = ExtensionPair::default();

        let sig = normalize(&RawEvent::created("/w/a/Job17.PDF"), &pair).unwrap();
        assert_eq!(sig.stem.as_str(), "job17");
        assert_eq!(sig.kind, FileKind::Document);

        let sig = normalize(&RawEvent::moved_to("/w/b/job17.dwg"), &pair).unwrap();
        assert_eq!(sig.kind, FileKind::Drawing);
        assert_eq!(sig.path, PathBuf::from("/w/b/job17.dwg"));
    }

    #[test]
    fn test_normalize_rejects_other_extensions() {
        let pair = ExtensionPair::default();
        assert!(normalize(&RawEvent::created("/w/job17.txt"), &pair).is_none());
        assert!(normalize(&RawEvent::created("/w/job17"), &pair).is_none());
    }

    #[test]
    fn test_normalize_rejects_directories() {
        let pair = ExtensionPair::default();
        let event = RawEvent {
            kind: RawEventKind::Created,
            path: PathBuf::from("/w/folder.pdf"),
            is_dir: true,
        };
        assert!(normalize(&event, &pair).is_none());
    }

    #[test]
    fn test_extension_pair_normalizes_input() {
        let pair = ExtensionPair::new(".DXF", " Pdf ");
        assert_eq!(pair.drawing, "dxf");
        assert_eq!(pair.document, "pdf");
        assert_eq!(pair.kind_of("dxf"), Some(FileKind::Drawing));
        assert_eq!(pair.extension(FileKind::Document), "pdf");
    }
}
