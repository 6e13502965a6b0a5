use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use std::cmp::Ordering;
use std::fmt;
use std::str::FromStr;
use uuid::Uuid;

use super::{AccountId, GroupId};

/// Declared kind of a point movement.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum EntryKind {
    /// Currency entering the group from the issuer.
    Issuance,
    /// Plain movement of custody.
    Transfer,
    /// Points lent from source to destination.
    Loan,
    /// Points won by the destination from the source.
    Win,
    /// Points paid into a game.
    BuyIn,
    /// Points paid out of a game.
    CashOut,
    /// Repayment of an earlier loan (see `related_entry_id`).
    Return,
    /// Payment from a debtor to a creditor that closes a net obligation.
    /// Moves custody like a transfer and reverses the net result.
    Settlement,
}

impl EntryKind {
    pub const ALL: [EntryKind; 8] = [
        EntryKind::Issuance,
        EntryKind::Transfer,
        EntryKind::Loan,
        EntryKind::Win,
        EntryKind::BuyIn,
        EntryKind::CashOut,
        EntryKind::Return,
        EntryKind::Settlement,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            EntryKind::Issuance => "ISSUANCE",
            EntryKind::Transfer => "TRANSFER",
            EntryKind::Loan => "LOAN",
            EntryKind::Win => "WIN",
            EntryKind::BuyIn => "BUY_IN",
            EntryKind::CashOut => "CASH_OUT",
            EntryKind::Return => "RETURN",
            EntryKind::Settlement => "SETTLEMENT",
        }
    }
}

impl fmt::Display for EntryKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for EntryKind {
    type Err = EntryKindParseError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let normalized = s.trim().to_uppercase().replace('-', "_");
        EntryKind::ALL
            .into_iter()
            .find(|kind| kind.as_str() == normalized || kind.as_str().replace('_', "") == normalized)
            .ok_or_else(|| EntryKindParseError(s.to_string()))
    }
}

#[derive(Debug, Clone)]
pub struct EntryKindParseError(String);

impl fmt::Display for EntryKindParseError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Unknown entry kind: {}", self.0)
    }
}

impl std::error::Error for EntryKindParseError {}

/// An immutable, recorded movement of points between two accounts.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LedgerEntry {
    pub entry_id: Uuid,
    pub group_id: GroupId,
    pub source_account_id: AccountId,
    pub dest_account_id: AccountId,
    /// Always positive; direction comes from source and destination.
    pub amount: Decimal,
    pub kind: EntryKind,
    pub created_at: DateTime<Utc>,
    /// For `Return`, the loan this entry pays back.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub related_entry_id: Option<Uuid>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub memo: Option<String>,
}

impl LedgerEntry {
    /// Total order used by every fold over a group's history.
    pub fn ordering(&self, other: &Self) -> Ordering {
        self.created_at
            .cmp(&other.created_at)
            .then_with(|| self.entry_id.cmp(&other.entry_id))
    }
}

/// Draft submitted to the append path. The store assigns id and timestamp.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct NewEntry {
    pub group_id: GroupId,
    pub source_account_id: AccountId,
    pub dest_account_id: AccountId,
    pub amount: Decimal,
    pub kind: EntryKind,
    #[serde(default)]
    pub related_entry_id: Option<Uuid>,
    #[serde(default)]
    pub memo: Option<String>,
}

impl NewEntry {
    pub fn new(
        group_id: impl Into<GroupId>,
        kind: EntryKind,
        source: impl Into<AccountId>,
        dest: impl Into<AccountId>,
        amount: Decimal,
    ) -> Self {
        Self {
            group_id: group_id.into(),
            source_account_id: source.into(),
            dest_account_id: dest.into(),
            amount,
            kind,
            related_entry_id: None,
            memo: None,
        }
    }

    pub fn issuance(
        group_id: impl Into<GroupId>,
        issuer: impl Into<AccountId>,
        dest: impl Into<AccountId>,
        amount: Decimal,
    ) -> Self {
        Self::new(group_id, EntryKind::Issuance, issuer, dest, amount)
    }

    /// Repayment from `borrower` back to `lender` of the loan `loan_id`.
    pub fn repayment(
        group_id: impl Into<GroupId>,
        borrower: impl Into<AccountId>,
        lender: impl Into<AccountId>,
        amount: Decimal,
        loan_id: Uuid,
    ) -> Self {
        Self::new(group_id, EntryKind::Return, borrower, lender, amount).related_to(loan_id)
    }

    pub fn related_to(mut self, entry_id: Uuid) -> Self {
        self.related_entry_id = Some(entry_id);
        self
    }

    pub fn with_memo(mut self, memo: impl Into<String>) -> Self {
        self.memo = Some(memo.into());
        self
    }

    /// Materializes the draft once the append path has assigned identity.
    pub fn into_entry(self, entry_id: Uuid, created_at: DateTime<Utc>) -> LedgerEntry {
        LedgerEntry {
            entry_id,
            group_id: self.group_id,
            source_account_id: self.source_account_id,
            dest_account_id: self.dest_account_id,
            amount: self.amount,
            kind: self.kind,
            created_at,
            related_entry_id: self.related_entry_id,
            memo: self.memo,
        }
    }
}

/// Sorts a history into the canonical `(created_at, entry_id)` order.
pub fn sort_entries(entries: &mut [LedgerEntry]) {
    entries.sort_by(|a, b| a.ordering(b));
}
