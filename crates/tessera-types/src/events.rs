//! Ledger notifications.
//!
//! Notifications are fire-and-forget. They are ordered by emission within a
//! single ledger operation; there is no ordering guarantee across operations.

use serde::{Deserialize, Serialize};

use crate::{RequestId, SaleId};

/// A notification emitted after a successful ledger operation.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum LedgerEvent {
    SaleRecorded {
        sale_id: SaleId,
        timestamp: u64,
    },
    DecryptionRequested {
        sale_id: SaleId,
        request_id: RequestId,
    },
    RoyaltyDecrypted {
        sale_id: SaleId,
        content_id: String,
        amount: u32,
    },
    ContentTotalRequested {
        content_id: String,
        request_id: RequestId,
    },
    ContentTotalDecrypted {
        content_id: String,
        total: u64,
    },
}

/// Event type names, as they appear in journals and subscriptions.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum EventType {
    SaleRecorded,
    DecryptionRequested,
    RoyaltyDecrypted,
    ContentTotalRequested,
    ContentTotalDecrypted,
}

impl EventType {
    pub fn as_str(&self) -> &'static str {
        match self {
            EventType::SaleRecorded => "sale_recorded",
            EventType::DecryptionRequested => "decryption_requested",
            EventType::RoyaltyDecrypted => "royalty_decrypted",
            EventType::ContentTotalRequested => "content_total_requested",
            EventType::ContentTotalDecrypted => "content_total_decrypted",
        }
    }

    /// Subscription category: "sale", "royalty" or "content".
    pub fn category(&self) -> &'static str {
        match self {
            EventType::SaleRecorded => "sale",
            EventType::DecryptionRequested | EventType::RoyaltyDecrypted => "royalty",
            EventType::ContentTotalRequested | EventType::ContentTotalDecrypted => "content",
        }
    }
}

impl LedgerEvent {
    pub fn event_type(&self) -> EventType {
        match self {
            LedgerEvent::SaleRecorded { .. } => EventType::SaleRecorded,
            LedgerEvent::DecryptionRequested { .. } => EventType::DecryptionRequested,
            LedgerEvent::RoyaltyDecrypted { .. } => EventType::RoyaltyDecrypted,
            LedgerEvent::ContentTotalRequested { .. } => EventType::ContentTotalRequested,
            LedgerEvent::ContentTotalDecrypted { .. } => EventType::ContentTotalDecrypted,
        }
    }

    /// The sale this event concerns, if any.
    pub fn sale_id(&self) -> Option<SaleId> {
        match self {
            LedgerEvent::SaleRecorded { sale_id, .. }
            | LedgerEvent::DecryptionRequested { sale_id, .. }
            | LedgerEvent::RoyaltyDecrypted { sale_id, .. } => Some(*sale_id),
            _ => None,
        }
    }
}

/// Envelope for journaling and broadcasting a [`LedgerEvent`].
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct Event {
    pub event_type: EventType,
    /// Unix seconds at emission.
    pub timestamp: u64,
    pub payload: LedgerEvent,
}

impl Event {
    pub fn new(payload: LedgerEvent, timestamp: u64) -> Self {
        Self {
            event_type: payload.event_type(),
            timestamp,
            payload,
        }
    }
}
