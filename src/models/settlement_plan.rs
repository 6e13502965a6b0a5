use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};

use super::{AccountId, EntryKind, GroupId, NetPosition, NewEntry};

pub const NET_SETTLEMENT_REASON: &str = "net settlement";

/// One payment proposed by the netting planner.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SettlementTransfer {
    pub from_account_id: AccountId,
    pub to_account_id: AccountId,
    pub amount: Decimal,
    pub reason: String,
}

impl SettlementTransfer {
    pub fn new(from: AccountId, to: AccountId, amount: Decimal) -> Self {
        Self {
            from_account_id: from,
            to_account_id: to,
            amount,
            reason: NET_SETTLEMENT_REASON.to_string(),
        }
    }

    /// The ledger draft that records this payment once it has happened.
    pub fn to_entry(&self, group_id: &GroupId) -> NewEntry {
        NewEntry::new(
            group_id.clone(),
            EntryKind::Settlement,
            self.from_account_id.clone(),
            self.to_account_id.clone(),
            self.amount,
        )
        .with_memo(self.reason.clone())
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PlanSummary {
    pub transfer_count: i32,
    pub total_amount: Decimal,
    /// Net-result-affecting entries behind the positions.
    pub raw_transaction_count: i32,
    /// `1 - transfer_count / raw_transaction_count`, zero when nothing was netted.
    pub reduction_rate: Decimal,
}

impl PlanSummary {
    pub fn new(transfers: &[SettlementTransfer], raw_transaction_count: i32) -> Self {
        let transfer_count = transfers.len() as i32;
        let total_amount: Decimal = transfers.iter().map(|t| t.amount).sum();

        let reduction_rate = if raw_transaction_count <= 0 {
            Decimal::ZERO
        } else {
            Decimal::ONE - Decimal::from(transfer_count) / Decimal::from(raw_transaction_count)
        };

        Self {
            transfer_count,
            total_amount,
            raw_transaction_count,
            reduction_rate,
        }
    }

    /// Reduction rate as a percentage, rounded to two places.
    pub fn reduction_percentage(&self) -> Decimal {
        (self.reduction_rate * Decimal::from(100)).round_dp(2)
    }
}

/// Output of the netting planner: ordered transfers plus what they were computed from.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SettlementPlan {
    pub transfers: Vec<SettlementTransfer>,
    pub positions: Vec<NetPosition>,
    pub summary: PlanSummary,
}

impl SettlementPlan {
    pub fn empty(positions: Vec<NetPosition>) -> Self {
        let raw = raw_transaction_count(&positions);
        Self {
            transfers: Vec::new(),
            positions,
            summary: PlanSummary::new(&[], raw),
        }
    }

    pub fn is_empty(&self) -> bool {
        self.transfers.is_empty()
    }

    /// Ledger drafts for committing every transfer, in plan order.
    pub fn to_entries(&self, group_id: &GroupId) -> Vec<NewEntry> {
        self.transfers.iter().map(|t| t.to_entry(group_id)).collect()
    }

    /// Hex SHA-256 over the canonical JSON form. Two plans with the same
    /// fingerprint propose the same payments from the same positions.
    pub fn fingerprint(&self) -> String {
        let mut hasher = Sha256::new();
        // Plain data with string keys; serialization cannot fail.
        hasher.update(serde_json::to_vec(self).unwrap_or_default());
        hex::encode(hasher.finalize())
    }
}

/// Every net-result-affecting entry touches exactly two accounts.
pub fn raw_transaction_count(positions: &[NetPosition]) -> i32 {
    positions.iter().map(|p| p.transaction_count).sum::<i32>() / 2
}
