//! # Vault Notifications
//!
//! One [`VaultEvent`] per successful operation, nothing per failure. The
//! vault appends events to an internal log; the embedding application
//! drains them and hands them to whatever delivery mechanism it has
//! (webhooks, a message bus, a log shipper — not our business).
//!
//! Events are serializable and carry their own id and timestamp, so a
//! delivery collaborator can deduplicate and order them without trusting
//! its own clock.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::identity::{AccountId, Address};

/// A single notification emitted by the vault.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct VaultEvent {
    /// Unique id for deduplication downstream.
    pub id: Uuid,

    /// The operation clock's timestamp for the emitting operation.
    pub at: DateTime<Utc>,

    /// What happened.
    pub kind: EventKind,
}

impl VaultEvent {
    /// Wraps a kind with a fresh id and the operation timestamp.
    pub fn new(at: DateTime<Utc>, kind: EventKind) -> Self {
        Self {
            id: Uuid::new_v4(),
            at,
            kind,
        }
    }
}

/// The payload of a [`VaultEvent`] — one variant per successful operation.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub enum EventKind {
    /// Value entered custody.
    Deposited {
        account: AccountId,
        amount: u64,
        new_balance: u64,
    },

    /// Value left custody to the owner.
    Withdrawn {
        account: AccountId,
        amount: u64,
        remaining: u64,
    },

    /// Explicit proof of life with no balance effect.
    Pinged { account: AccountId },

    /// A fallback recipient was configured.
    FallbackRecipientSet {
        account: AccountId,
        recipient: Address,
    },

    /// The fallback recipient was cleared (resolution reverts to owner).
    FallbackRecipientCleared { account: AccountId },

    /// The fallback period was configured.
    FallbackPeriodSet {
        account: AccountId,
        period_secs: i64,
    },

    /// A sub-balance was parked at the yield venue.
    Invested {
        account: AccountId,
        amount: u64,
        receipts: u64,
    },

    /// Receipts were redeemed at the yield venue.
    Divested {
        account: AccountId,
        receipts: u64,
        value: u64,
    },

    /// An inactivity claim paid out.
    Claimed {
        account: AccountId,
        recipient: Address,
        amount: u64,
    },

    /// The circuit-breaker engaged.
    Paused,

    /// The circuit-breaker disengaged.
    Unpaused,
}

impl EventKind {
    /// Stable name for log lines and routing keys.
    pub fn name(&self) -> &'static str {
        match self {
            EventKind::Deposited { .. } => "deposited",
            EventKind::Withdrawn { .. } => "withdrawn",
            EventKind::Pinged { .. } => "pinged",
            EventKind::FallbackRecipientSet { .. } => "fallback_recipient_set",
            EventKind::FallbackRecipientCleared { .. } => "fallback_recipient_cleared",
            EventKind::FallbackPeriodSet { .. } => "fallback_period_set",
            EventKind::Invested { .. } => "invested",
            EventKind::Divested { .. } => "divested",
            EventKind::Claimed { .. } => "claimed",
            EventKind::Paused => "paused",
            EventKind::Unpaused => "unpaused",
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    #[test]
    fn events_get_distinct_ids() {
        let at = Utc.with_ymd_and_hms(2026, 1, 1, 0, 0, 0).unwrap();
        let a = VaultEvent::new(at, EventKind::Paused);
        let b = VaultEvent::new(at, EventKind::Paused);
        assert_ne!(a.id, b.id);
    }

    #[test]
    fn event_serialization_roundtrip() {
        let at = Utc.with_ymd_and_hms(2026, 1, 1, 0, 0, 0).unwrap();
        let account = AccountId::owned(Address::new("alice").unwrap());
        let event = VaultEvent::new(
            at,
            EventKind::Deposited {
                account,
                amount: 1000,
                new_balance: 1000,
            },
        );

        let json = serde_json::to_string(&event).expect("serialize");
        let recovered: VaultEvent = serde_json::from_str(&json).expect("deserialize");

        assert_eq!(recovered.id, event.id);
        assert_eq!(recovered.kind.name(), "deposited");
    }
}
