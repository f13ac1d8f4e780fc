//! Engine event broadcasting.
//!
//! Lets the CLI, tests, and any embedding application follow what the
//! engine does without reaching into its state.

use tokio::sync::broadcast;

use crate::pairing::Stem;
use crate::pipeline::PipelineOutcome;

#[derive(Debug, Clone)]
pub enum EngineEvent {
    /// Initial backfill finished.
    ScanCompleted { files: usize, pairs: usize },
    /// A pair completed and its pipeline was spawned.
    PairDetected { stem: Stem },
    /// A pipeline ended and its stem was released.
    PipelineFinished { stem: Stem, outcome: PipelineOutcome },
    /// The engine stopped watching.
    Stopped,
}

/// Fans engine events out to any number of subscribers.
#[derive(Clone)]
pub struct EventBroadcaster {
    sender: broadcast::Sender<EngineEvent>,
}

impl EventBroadcaster {
    /// Create a new broadcaster with specified channel capacity
    pub fn new(capacity: usize) -> Self {
        let (sender, _) = broadcast::channel(capacity);
        Self { sender }
    }

    /// Send an event to all subscribers
    pub fn send(&self, event: EngineEvent) {
        match self.sender.send(event) {
            Ok(count) => {
                crate::debug_event!("broadcast", "sent", "to {count} subscribers");
            }
            Err(broadcast::error::SendError(event)) => {
                // No receivers, this is fine
                crate::debug_event!("broadcast", "dropped", "no subscribers for {event:?}");
            }
        }
    }

    pub fn subscribe(&self) -> broadcast::Receiver<EngineEvent> {
        self.sender.subscribe()
    }
}

impl Default for EventBroadcaster {
    fn default() -> Self {
        Self::new(256)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_subscribers_receive_events() {
        let broadcaster = EventBroadcaster::new(8);
        let mut rx = broadcaster.subscribe();

        broadcaster.send(EngineEvent::PairDetected {
            stem: Stem::from("job17"),
        });

        match rx.recv().await.unwrap() {
            EngineEvent::PairDetected { stem } => assert_eq!(stem.as_str(), "job17"),
            other => panic!("unexpected event {other:?}"),
        }
    }

    #[test]
    fn test_send_without_subscribers_is_silent() {
        EventBroadcaster::new(1).send(EngineEvent::Stopped);
    }
}
