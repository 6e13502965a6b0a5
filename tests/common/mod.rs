#![allow(dead_code)]

use chrono::{DateTime, Duration, TimeZone, Utc};
use group_settlement::models::{EntryKind, GroupId, LedgerEntry, NewEntry};
use rust_decimal::Decimal;
use rust_decimal_macros::dec;
use uuid::Uuid;

pub const GROUP: &str = "friday-game";
pub const ISSUER: &str = "system";

/// Builds a history with sequential ids and timestamps one second apart.
pub struct History {
    start: DateTime<Utc>,
    entries: Vec<LedgerEntry>,
}

impl History {
    pub fn new() -> Self {
        Self {
            start: Utc.timestamp_opt(1_700_000_000, 0).unwrap(),
            entries: Vec::new(),
        }
    }

    pub fn push(&mut self, draft: NewEntry) -> Uuid {
        let seq = self.entries.len();
        let id = Uuid::from_u128(seq as u128 + 1);
        let created_at = self.start + Duration::seconds(seq as i64);
        self.entries.push(draft.into_entry(id, created_at));
        id
    }

    pub fn issue(&mut self, to: &str, amount: Decimal) -> Uuid {
        self.push(NewEntry::issuance(GROUP, ISSUER, to, amount))
    }

    pub fn record(&mut self, kind: EntryKind, from: &str, to: &str, amount: Decimal) -> Uuid {
        self.push(NewEntry::new(GROUP, kind, from, to, amount))
    }

    pub fn entries(&self) -> &[LedgerEntry] {
        &self.entries
    }

    pub fn into_entries(self) -> Vec<LedgerEntry> {
        self.entries
    }
}

pub fn group() -> GroupId {
    GroupId::from(GROUP)
}

/// Three players with 1000 each; A loses 300 to B, B loses 500 to C, C loses 100 to A.
pub fn abc_history() -> History {
    let mut history = History::new();
    for player in ["A", "B", "C"] {
        history.issue(player, dec!(1000));
    }
    history.record(EntryKind::Win, "A", "B", dec!(300));
    history.record(EntryKind::Win, "B", "C", dec!(500));
    history.record(EntryKind::Win, "C", "A", dec!(100));
    history
}
