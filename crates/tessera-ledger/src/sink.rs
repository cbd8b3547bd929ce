//! Notification sink.
//!
//! The ledger hands every [`LedgerEvent`] to an [`EventSink`] after the
//! operation that produced it has succeeded. Delivery is fire-and-forget.

use std::sync::Mutex;

use tessera_types::LedgerEvent;

pub trait EventSink: Send + Sync {
    fn emit(&self, event: LedgerEvent);
}

/// Append-only in-memory log. Sequence numbers start at 1.
#[derive(Debug, Default)]
pub struct EventLog {
    entries: Mutex<Vec<LedgerEvent>>,
}

impl EventLog {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn len(&self) -> usize {
        self.entries.lock().map(|e| e.len()).unwrap_or(0)
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// All events, oldest first.
    pub fn events(&self) -> Vec<LedgerEvent> {
        self.entries.lock().map(|e| e.clone()).unwrap_or_default()
    }

    /// Events with sequence number greater than `seq`, paired with their number.
    pub fn since(&self, seq: u64) -> Vec<(u64, LedgerEvent)> {
        let Ok(entries) = self.entries.lock() else {
            return Vec::new();
        };
        entries
            .iter()
            .enumerate()
            .map(|(i, e)| (i as u64 + 1, e.clone()))
            .filter(|(n, _)| *n > seq)
            .collect()
    }
}

impl EventSink for EventLog {
    fn emit(&self, event: LedgerEvent) {
        if let Ok(mut entries) = self.entries.lock() {
            entries.push(event);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_log_sequence() {
        let log = EventLog::new();
        assert!(log.is_empty());
        log.emit(LedgerEvent::SaleRecorded {
            sale_id: 1,
            timestamp: 10,
        });
        log.emit(LedgerEvent::DecryptionRequested {
            sale_id: 1,
            request_id: 1,
        });
        assert_eq!(log.len(), 2);
        let tail = log.since(1);
        assert_eq!(tail.len(), 1);
        assert_eq!(tail[0].0, 2);
        assert!(matches!(tail[0].1, LedgerEvent::DecryptionRequested { .. }));
    }
}
