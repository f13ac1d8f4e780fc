//! Conversion from `notify` events to raw pairing events.

use std::path::{Path, PathBuf};

use notify::event::{CreateKind, ModifyKind, RenameMode};
use notify::{Event, EventKind};

use crate::pairing::{RawEvent, RawEventKind};

/// What the event loop should do with one `notify` event.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Routed {
    /// Files that appeared (created or moved into place).
    Appeared(Vec<RawEvent>),
    /// Content writes to existing paths.
    Written(Vec<PathBuf>),
    /// Paths that went away.
    Removed(Vec<PathBuf>),
    Ignored,
}

/// Classify a `notify` event.
///
/// Renames are reported differently per platform: inotify pairs them
/// (`Both` with `[from, to]`) or splits them (`From`/`To`), FSEvents
/// reports `Any` for both ends. For `Any`, only paths that exist are
/// treated as destinations.
pub fn route(event: &Event) -> Routed {
    match event.kind {
        EventKind::Create(kind) => Routed::Appeared(
            event
                .paths
                .iter()
                .map(|p| raw(RawEventKind::Created, p, kind == CreateKind::Folder))
                .collect(),
        ),
        EventKind::Modify(ModifyKind::Name(RenameMode::To)) => Routed::Appeared(
            event
                .paths
                .iter()
                .map(|p| raw(RawEventKind::MovedTo, p, false))
                .collect(),
        ),
        EventKind::Modify(ModifyKind::Name(RenameMode::Both)) => {
            let mut routed = Vec::new();
            if let Some(to) = event.paths.get(1) {
                routed.push(raw(RawEventKind::MovedTo, to, false));
            }
            Routed::Appeared(routed)
        }
        EventKind::Modify(ModifyKind::Name(RenameMode::From)) => {
            Routed::Removed(event.paths.clone())
        }
        EventKind::Modify(ModifyKind::Name(_)) => Routed::Appeared(
            event
                .paths
                .iter()
                .filter(|p| p.exists())
                .map(|p| raw(RawEventKind::MovedTo, p, false))
                .collect(),
        ),
        EventKind::Modify(_) => Routed::Written(event.paths.clone()),
        EventKind::Remove(_) => Routed::Removed(event.paths.clone()),
        _ => Routed::Ignored,
    }
}

fn raw(kind: RawEventKind, path: &Path, folder: bool) -> RawEvent {
    RawEvent {
        kind,
        path: path.to_path_buf(),
        is_dir: folder || path.is_dir(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use notify::event::{DataChange, RemoveKind};

    fn event(kind: EventKind, paths: &[&str]) -> Event {
        let mut event = Event::new(kind);
        for p in paths {
            event = event.add_path(PathBuf::from(p));
        }
        event
    }

    #[test]
    fn test_create_is_appeared() {
        let routed = route(&event(
            EventKind::Create(CreateKind::File),
            &["/nonexistent/job17.pdf"],
        ));
        assert_eq!(
            routed,
            Routed::Appeared(vec![RawEvent::created("/nonexistent/job17.pdf")])
        );
    }

    #[test]
    fn test_folder_create_is_marked_dir() {
        let routed = route(&event(
            EventKind::Create(CreateKind::Folder),
            &["/nonexistent/folder.pdf"],
        ));
        let Routed::Appeared(events) = routed else {
            panic!("expected appeared");
        };
        assert!(events[0].is_dir);
    }

    #[test]
    fn test_rename_both_uses_destination() {
        let routed = route(&event(
            EventKind::Modify(ModifyKind::Name(RenameMode::Both)),
            &["/nonexistent/tmp123", "/nonexistent/job17.dwg"],
        ));
        assert_eq!(
            routed,
            Routed::Appeared(vec![RawEvent::moved_to("/nonexistent/job17.dwg")])
        );
    }

    #[test]
    fn test_rename_to() {
        let routed = route(&event(
            EventKind::Modify(ModifyKind::Name(RenameMode::To)),
            &["/nonexistent/job17.dwg"],
        ));
        assert_eq!(
            routed,
            Routed::Appeared(vec![RawEvent::moved_to("/nonexistent/job17.dwg")])
        );
    }

    #[test]
    fn test_writes_and_removes() {
        assert_eq!(
            route(&event(
                EventKind::Modify(ModifyKind::Data(DataChange::Content)),
                &["/w/a.pdf"],
            )),
            Routed::Written(vec![PathBuf::from("/w/a.pdf")])
        );
        assert_eq!(
            route(&event(EventKind::Remove(RemoveKind::File), &["/w/a.pdf"])),
            Routed::Removed(vec![PathBuf::from("/w/a.pdf")])
        );
        assert_eq!(
            route(&event(EventKind::Access(notify::event::AccessKind::Any), &["/w/a.pdf"])),
            Routed::Ignored
        );
    }
}
