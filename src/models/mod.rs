pub mod account;
pub mod ledger_entry;
pub mod net_position;
pub mod settlement_plan;

pub use account::{Account, AccountId, GroupId, Issuer};
pub use ledger_entry::{sort_entries, EntryKind, EntryKindParseError, LedgerEntry, NewEntry};
pub use net_position::NetPosition;
pub use settlement_plan::{
    raw_transaction_count, PlanSummary, SettlementPlan, SettlementTransfer, NET_SETTLEMENT_REASON,
};
