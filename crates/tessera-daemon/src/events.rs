//! Event bus.
//!
//! The ledger's notification sink inside the daemon. Each notification is
//! stamped, handed to the journal feed, then broadcast. The journal feed is
//! unbounded and never drops an event. Broadcast subscribers each get a
//! buffer of `capacity` events and may lag.

use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;

use serde::{Deserialize, Serialize};
use tessera_ledger::{Clock, EventSink, SystemClock};
use tessera_types::{Event, LedgerEvent, SaleId};
use tokio::sync::{broadcast, mpsc};

/// Filter for event subscriptions and journal queries.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct EventFilter {
    /// Category filter: "sale", "royalty", "content".
    pub categories: Option<Vec<String>>,
    /// Only events about these sales.
    pub sale_ids: Option<Vec<SaleId>>,
}

/// Event bus for broadcasting ledger events to subscribers.
#[derive(Clone)]
pub struct EventBus {
    sender: broadcast::Sender<Event>,
    journal: Option<mpsc::UnboundedSender<Event>>,
    sequence: Arc<AtomicU64>,
    clock: Arc<dyn Clock>,
}

impl EventBus {
    /// Create a new event bus with the given buffer capacity.
    pub fn new(capacity: usize) -> Self {
        Self::with_clock(capacity, Arc::new(SystemClock))
    }

    pub fn with_clock(capacity: usize, clock: Arc<dyn Clock>) -> Self {
        let (sender, _) = broadcast::channel(capacity);
        Self {
            sender,
            journal: None,
            sequence: Arc::new(AtomicU64::new(0)),
            clock,
        }
    }

    /// Open the lossless feed for the journal writer.
    ///
    /// Attach before cloning the bus: clones made earlier do not feed the
    /// journal. Attaching again replaces the previous feed.
    pub fn attach_journal(&mut self) -> mpsc::UnboundedReceiver<Event> {
        let (tx, rx) = mpsc::unbounded_channel();
        self.journal = Some(tx);
        rx
    }

    /// Send an event to the journal feed and to all subscribers.
    pub fn publish(&self, event: Event) {
        self.sequence.fetch_add(1, Ordering::SeqCst);
        if let Some(journal) = &self.journal {
            if journal.send(event.clone()).is_err() {
                tracing::error!(
                    event_type = event.event_type.as_str(),
                    "journal feed closed, event not persisted"
                );
            }
        }
        // Ignore send errors (no subscribers)
        let _ = self.sender.send(event);
    }

    /// Subscribe to events. Returns a receiver.
    pub fn subscribe(&self) -> broadcast::Receiver<Event> {
        self.sender.subscribe()
    }

    /// Number of events emitted so far.
    pub fn sequence(&self) -> u64 {
        self.sequence.load(Ordering::SeqCst)
    }
}

impl EventSink for EventBus {
    fn emit(&self, event: LedgerEvent) {
        self.publish(Event::new(event, self.clock.now()));
    }
}

impl EventFilter {
    /// Check if an event matches this filter.
    pub fn matches(&self, event: &Event) -> bool {
        if let Some(ref categories) = self.categories {
            let category = event.event_type.category();
            if !categories.iter().any(|c| c == category) {
                return false;
            }
        }

        if let Some(ref sale_ids) = self.sale_ids {
            match event.payload.sale_id() {
                Some(id) if sale_ids.contains(&id) => {}
                _ => return false,
            }
        }

        true
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tessera_ledger::ManualClock;

    fn recorded(sale_id: SaleId) -> LedgerEvent {
        LedgerEvent::SaleRecorded {
            sale_id,
            timestamp: 1000,
        }
    }

    #[test]
    fn test_sink_stamps_and_broadcasts() {
        let bus = EventBus::with_clock(16, Arc::new(ManualClock::new(1234)));
        let mut rx = bus.subscribe();

        bus.emit(recorded(1));

        let event = rx.try_recv().expect("receive event");
        assert_eq!(event.event_type.as_str(), "sale_recorded");
        assert_eq!(event.timestamp, 1234);
        assert_eq!(bus.sequence(), 1);
    }

    #[test]
    fn test_emit_without_subscribers() {
        let bus = EventBus::new(4);
        bus.emit(recorded(1));
        assert_eq!(bus.sequence(), 1);
    }

    #[test]
    fn test_journal_feed_outlasts_broadcast_buffer() {
        let mut bus = EventBus::new(4);
        let mut feed = bus.attach_journal();
        let mut lagging = bus.subscribe();

        for sale_id in 1..=20 {
            bus.emit(recorded(sale_id));
        }

        assert!(matches!(
            lagging.try_recv(),
            Err(broadcast::error::TryRecvError::Lagged(16))
        ));
        let mut journaled = Vec::new();
        while let Ok(event) = feed.try_recv() {
            journaled.push(event.payload.sale_id());
        }
        assert_eq!(journaled, (1..=20).map(Some).collect::<Vec<_>>());
    }

    #[test]
    fn test_event_filter_categories() {
        let filter = EventFilter {
            categories: Some(vec!["content".to_string()]),
            sale_ids: None,
        };

        let content_event = Event::new(
            LedgerEvent::ContentTotalDecrypted {
                content_id: "movie-1".into(),
                total: 5,
            },
            1000,
        );
        assert!(filter.matches(&content_event));
        assert!(!filter.matches(&Event::new(recorded(1), 1000)));
    }

    #[test]
    fn test_event_filter_sale_ids() {
        let filter = EventFilter {
            categories: None,
            sale_ids: Some(vec![2]),
        };
        assert!(filter.matches(&Event::new(recorded(2), 1000)));
        assert!(!filter.matches(&Event::new(recorded(3), 1000)));
        let content_event = Event::new(
            LedgerEvent::ContentTotalRequested {
                content_id: "movie-1".into(),
                request_id: 1,
            },
            1000,
        );
        assert!(!filter.matches(&content_event));
    }
}
