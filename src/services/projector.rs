use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, HashSet};

use crate::error::{AppError, Result};
use crate::models::{Account, AccountId, EntryKind, GroupId, Issuer, LedgerEntry, NetPosition};
use crate::observability::{get_metrics, LatencyTimer};
use crate::services::classifier::classify;

/// Balances of every account of a group, derived from one exact entry sequence.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Projection {
    pub group_id: GroupId,
    pub positions: BTreeMap<AccountId, NetPosition>,
    pub entry_count: usize,
}

impl Projection {
    pub fn get(&self, account_id: &AccountId) -> Option<&NetPosition> {
        self.positions.get(account_id)
    }

    pub fn custodial_balance(&self, account_id: &AccountId) -> Decimal {
        self.get(account_id)
            .map(|p| p.custodial_balance)
            .unwrap_or(Decimal::ZERO)
    }

    pub fn net_result(&self, account_id: &AccountId) -> Decimal {
        self.get(account_id)
            .map(|p| p.net_result)
            .unwrap_or(Decimal::ZERO)
    }

    /// Whether the account currently holds at least `amount`.
    pub fn can_afford(&self, account_id: &AccountId, amount: Decimal) -> bool {
        self.get(account_id)
            .map(|p| p.can_afford(amount))
            .unwrap_or(amount <= Decimal::ZERO)
    }

    pub fn custodial_total(&self) -> Decimal {
        self.positions.values().map(|p| p.custodial_balance).sum()
    }

    pub fn net_result_total(&self) -> Decimal {
        self.positions.values().map(|p| p.net_result).sum()
    }

    /// Every account that appears in the projected history, issuer excluded.
    pub fn accounts(&self) -> Vec<Account> {
        self.positions
            .keys()
            .map(|id| Account::new(id.clone(), self.group_id.clone()))
            .collect()
    }

    /// Positions in account id order.
    pub fn to_positions(&self) -> Vec<NetPosition> {
        self.positions.values().cloned().collect()
    }
}

/// Folds a group's history into per-account balances.
///
/// Stateless: every call recomputes from the entries it is given, so two calls
/// over the same sequence produce identical projections. The input is expected
/// to have passed the append-path validator; anything structurally invalid is
/// reported as `MalformedEntry` instead of being skipped.
#[derive(Debug, Clone, Default)]
pub struct BalanceProjector {
    issuer: Issuer,
}

impl BalanceProjector {
    pub fn new(issuer: Issuer) -> Self {
        Self { issuer }
    }

    pub fn issuer(&self) -> &Issuer {
        &self.issuer
    }

    pub fn project(&self, group_id: &GroupId, entries: &[LedgerEntry]) -> Result<Projection> {
        let timer = LatencyTimer::new();

        let mut ordered: Vec<&LedgerEntry> = entries.iter().collect();
        ordered.sort_by(|a, b| a.ordering(b));

        let mut seen: HashSet<uuid::Uuid> = HashSet::with_capacity(entries.len());
        let mut positions: BTreeMap<AccountId, NetPosition> = BTreeMap::new();

        for entry in ordered {
            if let Err(e) = self.check_entry(group_id, entry) {
                get_metrics().record_malformed_entry();
                tracing::error!(
                    group_id = %group_id,
                    entry_id = %entry.entry_id,
                    error = %e,
                    "Projector refused malformed entry"
                );
                return Err(e);
            }
            if !seen.insert(entry.entry_id) {
                get_metrics().record_malformed_entry();
                return Err(AppError::malformed(entry.entry_id, "duplicate entry id"));
            }

            let effects = classify(entry);

            let (source_custody, dest_custody) = effects.custodial.deltas(entry.amount);
            let (source_net, dest_net) = effects.net_result.deltas(entry.amount);

            if effects.custodial.touches_source() || effects.net_result.touches_source() {
                let source = positions
                    .entry(entry.source_account_id.clone())
                    .or_insert_with(|| NetPosition::new(entry.source_account_id.clone()));
                source.apply_custodial(source_custody);
                if !effects.net_result.is_none() {
                    source.apply_net_result(source_net);
                }
            }

            let dest = positions
                .entry(entry.dest_account_id.clone())
                .or_insert_with(|| NetPosition::new(entry.dest_account_id.clone()));
            dest.apply_custodial(dest_custody);
            if !effects.net_result.is_none() {
                dest.apply_net_result(dest_net);
            }
        }

        let duration_ms = timer.elapsed_ms();
        get_metrics().record_projection(entries.len() as u64, positions.len() as u64, duration_ms);
        tracing::debug!(
            group_id = %group_id,
            entry_count = entries.len(),
            account_count = positions.len(),
            duration_ms,
            "Projected group balances"
        );

        Ok(Projection {
            group_id: group_id.clone(),
            positions,
            entry_count: entries.len(),
        })
    }

    fn check_entry(&self, group_id: &GroupId, entry: &LedgerEntry) -> Result<()> {
        if &entry.group_id != group_id {
            return Err(AppError::malformed(
                entry.entry_id,
                format!("belongs to group '{}', not '{}'", entry.group_id, group_id),
            ));
        }
        if entry.amount <= Decimal::ZERO {
            return Err(AppError::malformed(
                entry.entry_id,
                format!("non-positive amount {}", entry.amount),
            ));
        }
        if entry.source_account_id == entry.dest_account_id {
            return Err(AppError::malformed(entry.entry_id, "source equals destination"));
        }

        let from_issuer = self.issuer.is(&entry.source_account_id);
        let to_issuer = self.issuer.is(&entry.dest_account_id);
        match entry.kind {
            EntryKind::Issuance if !from_issuer => Err(AppError::malformed(
                entry.entry_id,
                "issuance does not originate from the issuer",
            )),
            EntryKind::Issuance if to_issuer => Err(AppError::malformed(
                entry.entry_id,
                "issuance credits the issuer",
            )),
            EntryKind::Issuance => Ok(()),
            _ if from_issuer || to_issuer => Err(AppError::malformed(
                entry.entry_id,
                format!("{} entry touches the issuer account", entry.kind),
            )),
            _ => Ok(()),
        }
    }
}
