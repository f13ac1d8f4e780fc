//! Pair detection across the normalizer and the shared pair state.

use std::fs;
use std::sync::Arc;
use std::sync::atomic::{AtomicUsize, Ordering};

use pairwatch::pairing::{RawEvent, normalize};
use pairwatch::{ExtensionPair, PairState, PairStatus, Stem};
use tempfile::TempDir;

fn observe(state: &PairState, event: RawEvent) -> Option<PairStatus> {
    let signal = normalize(&event, &ExtensionPair::default())?;
    Some(state.observe(&signal))
}

#[test]
fn test_pair_across_directories_completes_once() {
    let temp = TempDir::new().unwrap();
    let drawings = temp.path().join("drawings");
    let documents = temp.path().join("documents");
    fs::create_dir_all(&drawings).unwrap();
    fs::create_dir_all(&documents).unwrap();

    let drawing = drawings.join("Job17.DWG");
    let document = documents.join("job17.pdf");
    fs::write(&drawing, b"d").unwrap();
    fs::write(&document, b"p").unwrap();

    let state = PairState::new();
    assert_eq!(
        observe(&state, RawEvent::created(&document)),
        Some(PairStatus::Partial)
    );

    let Some(PairStatus::Completed(pair)) = observe(&state, RawEvent::moved_to(&drawing)) else {
        panic!("expected completion");
    };
    assert_eq!(pair.stem, Stem::from("job17"));
    assert_eq!(pair.drawing, drawing);
    assert_eq!(pair.document, document);

    // Further signals while claimed are dropped
    assert_eq!(
        observe(&state, RawEvent::created(&document)),
        Some(PairStatus::AlreadyClaimed)
    );
    assert_eq!(state.claim_count(), 1);
}

#[test]
fn test_unrelated_files_are_ignored() {
    let temp = TempDir::new().unwrap();
    let notes = temp.path().join("job17.txt");
    fs::write(&notes, b"n").unwrap();

    let state = PairState::new();
    assert_eq!(observe(&state, RawEvent::created(&notes)), None);

    let mut dir_event = RawEvent::created(temp.path().join("job17.pdf"));
    dir_event.is_dir = true;
    assert_eq!(observe(&state, dir_event), None);
    assert_eq!(state.entry_count(), 0);
}

#[test]
fn test_deleted_partner_never_completes() {
    let temp = TempDir::new().unwrap();
    let document = temp.path().join("job17.pdf");
    let drawing = temp.path().join("job17.dwg");
    fs::write(&document, b"p").unwrap();

    let state = PairState::new();
    assert_eq!(
        observe(&state, RawEvent::created(&document)),
        Some(PairStatus::Partial)
    );

    fs::remove_file(&document).unwrap();
    fs::write(&drawing, b"d").unwrap();

    assert_eq!(
        observe(&state, RawEvent::created(&drawing)),
        Some(PairStatus::Partial)
    );
    assert_eq!(state.claim_count(), 0);

    // The document coming back completes the pair
    fs::write(&document, b"p").unwrap();
    assert!(matches!(
        observe(&state, RawEvent::created(&document)),
        Some(PairStatus::Completed(_))
    ));
}

#[test]
fn test_pair_can_be_processed_again_after_release() {
    let temp = TempDir::new().unwrap();
    let drawing = temp.path().join("job17.dwg");
    let document = temp.path().join("job17.pdf");
    fs::write(&drawing, b"d").unwrap();
    fs::write(&document, b"p").unwrap();

    let state = PairState::new();
    let stem = Stem::from("job17");

    for _ in 0..2 {
        observe(&state, RawEvent::created(&drawing));
        assert!(matches!(
            observe(&state, RawEvent::created(&document)),
            Some(PairStatus::Completed(_))
        ));
        assert!(state.release(&stem));
        assert!(state.entry(&stem).is_none());
        assert!(!state.is_claimed(&stem));
    }
}

#[test]
fn test_concurrent_signals_claim_at_most_once() {
    let temp = TempDir::new().unwrap();
    let drawing = temp.path().join("job17.dwg");
    let document = temp.path().join("job17.pdf");
    fs::write(&drawing, b"d").unwrap();
    fs::write(&document, b"p").unwrap();

    let state = Arc::new(PairState::new());
    let completions = AtomicUsize::new(0);

    std::thread::scope(|scope| {
        for i in 0..16 {
            let state = &state;
            let completions = &completions;
            let path = if i % 2 == 0 { &drawing } else { &document };
            scope.spawn(move || {
                for _ in 0..50 {
                    if let Some(PairStatus::Completed(_)) =
                        observe(state, RawEvent::created(path))
                    {
                        completions.fetch_add(1, Ordering::SeqCst);
                    }
                }
            });
        }
    });

    assert_eq!(completions.load(Ordering::SeqCst), 1);
    assert_eq!(state.claim_count(), 1);
}
