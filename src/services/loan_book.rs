use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use uuid::Uuid;

use crate::models::{AccountId, EntryKind, LedgerEntry};

/// A loan together with what has been paid back against it.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct OutstandingLoan {
    pub loan_id: Uuid,
    pub lender: AccountId,
    pub borrower: AccountId,
    pub principal: Decimal,
    pub returned: Decimal,
    pub outstanding: Decimal,
    pub created_at: DateTime<Utc>,
}

impl OutstandingLoan {
    fn open(loan: &LedgerEntry) -> Self {
        Self {
            loan_id: loan.entry_id,
            lender: loan.source_account_id.clone(),
            borrower: loan.dest_account_id.clone(),
            principal: loan.amount,
            returned: Decimal::ZERO,
            outstanding: loan.amount,
            created_at: loan.created_at,
        }
    }

    fn apply_return(&mut self, amount: Decimal) {
        self.returned += amount;
        self.outstanding = self.principal - self.returned;
    }

    pub fn is_closed(&self) -> bool {
        self.outstanding <= Decimal::ZERO
    }
}

/// Every loan in the history with its repayments applied, in history order.
pub fn loan_ledger(entries: &[LedgerEntry]) -> Vec<OutstandingLoan> {
    let mut ordered: Vec<&LedgerEntry> = entries.iter().collect();
    ordered.sort_by(|a, b| a.ordering(b));

    let mut loans: Vec<OutstandingLoan> = Vec::new();
    let mut index: HashMap<Uuid, usize> = HashMap::new();

    for entry in ordered {
        match entry.kind {
            EntryKind::Loan => {
                index.insert(entry.entry_id, loans.len());
                loans.push(OutstandingLoan::open(entry));
            }
            EntryKind::Return => {
                let slot = entry.related_entry_id.and_then(|id| index.get(&id).copied());
                match slot {
                    Some(slot) => loans[slot].apply_return(entry.amount),
                    None => tracing::warn!(
                        entry_id = %entry.entry_id,
                        related_entry_id = ?entry.related_entry_id,
                        "Return does not reference a known loan"
                    ),
                }
            }
            _ => {}
        }
    }

    loans
}

/// Loans that still have something left to pay back.
pub fn outstanding_loans(entries: &[LedgerEntry]) -> Vec<OutstandingLoan> {
    loan_ledger(entries)
        .into_iter()
        .filter(|loan| !loan.is_closed())
        .collect()
}

/// State of a single loan, if `loan_id` names one.
pub fn find_loan(entries: &[LedgerEntry], loan_id: Uuid) -> Option<OutstandingLoan> {
    loan_ledger(entries).into_iter().find(|loan| loan.loan_id == loan_id)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::NewEntry;
    use chrono::Duration;
    use rust_decimal_macros::dec;

    fn at(draft: NewEntry, seq: i64) -> LedgerEntry {
        draft.into_entry(Uuid::new_v4(), Utc::now() + Duration::seconds(seq))
    }

    #[test]
    fn test_partial_and_full_returns() {
        let loan = at(NewEntry::new("g", EntryKind::Loan, "alice", "bob", dec!(100)), 0);
        let other = at(NewEntry::new("g", EntryKind::Loan, "carol", "bob", dec!(40)), 1);
        let entries = vec![
            loan.clone(),
            other.clone(),
            at(NewEntry::repayment("g", "bob", "alice", dec!(30), loan.entry_id), 2),
            at(NewEntry::repayment("g", "bob", "carol", dec!(40), other.entry_id), 3),
        ];

        let outstanding = outstanding_loans(&entries);
        assert_eq!(outstanding.len(), 1);
        assert_eq!(outstanding[0].loan_id, loan.entry_id);
        assert_eq!(outstanding[0].returned, dec!(30));
        assert_eq!(outstanding[0].outstanding, dec!(70));

        let closed = find_loan(&entries, other.entry_id).unwrap();
        assert!(closed.is_closed());
    }

    #[test]
    fn test_dangling_return_is_ignored() {
        let entries = vec![at(
            NewEntry::repayment("g", "bob", "alice", dec!(30), Uuid::new_v4()),
            0,
        )];

        assert!(loan_ledger(&entries).is_empty());
    }

    #[test]
    fn test_find_unknown_loan() {
        assert!(find_loan(&[], Uuid::new_v4()).is_none());
    }
}
