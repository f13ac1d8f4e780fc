//! File pairing: stem derivation, event normalization, and pair detection.
//!
//! ```text
//! RawEvent ──normalize──▶ Signal ──PairState::observe──▶ PairStatus
//!                                        │
//!                                  Completed(ClaimedPair) ──▶ pipeline
//! ```

mod filter;
mod normalizer;
mod state;
mod stem;

pub use filter::{Exclusion, PathFilter};
pub use normalizer::{ExtensionPair, FileKind, RawEvent, RawEventKind, Signal, normalize};
pub use state::{ClaimedPair, PairEntry, PairState, PairStatus};
pub use stem::{Stem, extension_of};
