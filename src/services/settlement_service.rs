use rust_decimal::Decimal;
use std::sync::Arc;

use crate::cache::ProjectionCache;
use crate::config::{CacheSettings, LedgerSettings};
use crate::error::{AppError, Result};
use crate::models::{AccountId, GroupId, LedgerEntry, NewEntry, SettlementPlan};
use crate::observability::get_metrics;
use crate::repositories::{EntryStore, LedgerHead};
use crate::services::auditor::ConservationAuditor;
use crate::services::loan_book::{self, OutstandingLoan};
use crate::services::netting_service::NettingPlanner;
use crate::services::projector::{BalanceProjector, Projection};

/// Entry point for a group's ledger: records entries, serves audited balances
/// and plans and commits settlements.
pub struct SettlementService<S: EntryStore> {
    store: Arc<S>,
    cache: Arc<ProjectionCache>,
    projector: BalanceProjector,
    auditor: ConservationAuditor,
    planner: NettingPlanner,
}

impl<S: EntryStore> SettlementService<S> {
    pub fn new(store: Arc<S>, ledger: &LedgerSettings, cache: CacheSettings) -> Self {
        Self::with_cache(store, ledger, Arc::new(ProjectionCache::new(cache)))
    }

    /// Creates a new service with an existing cache instance.
    pub fn with_cache(store: Arc<S>, ledger: &LedgerSettings, cache: Arc<ProjectionCache>) -> Self {
        Self {
            store,
            cache,
            projector: BalanceProjector::new(ledger.issuer()),
            auditor: ConservationAuditor::new(ledger.epsilon),
            planner: NettingPlanner::new(ledger.epsilon),
        }
    }

    /// Returns the cache instance for stats access.
    pub fn cache(&self) -> Arc<ProjectionCache> {
        Arc::clone(&self.cache)
    }

    pub fn store(&self) -> Arc<S> {
        Arc::clone(&self.store)
    }

    /// Appends an entry through the validating store.
    pub async fn record(&self, draft: NewEntry) -> Result<LedgerEntry> {
        let group_id = draft.group_id.clone();
        let entry = self.store.append(draft).await?;
        self.cache.invalidate(&group_id).await;
        Ok(entry)
    }

    /// Current audited balances of every account in the group.
    pub async fn balances(&self, group_id: &GroupId) -> Result<Projection> {
        let head = self.store.head(group_id).await?;
        if let Some(cached) = self.cache.get(group_id, &head).await {
            return Ok(cached);
        }

        let entries = self.store.snapshot(group_id).await?;
        let projection = self.project_and_audit(group_id, &entries)?;
        self.cache.put(LedgerHead::of(&entries), projection.clone()).await;
        Ok(projection)
    }

    pub async fn plan_settlement(&self, group_id: &GroupId) -> Result<SettlementPlan> {
        let projection = self.balances(group_id).await?;
        self.planner.plan(&projection)
    }

    /// Appends one settlement entry per transfer of `plan`, all or nothing.
    ///
    /// The plan must still be the one the current ledger produces; a plan
    /// computed before later entries were recorded is rejected as stale.
    ///
    /// The staleness check runs before `append_all` and outside the store's
    /// write lock. An entry recorded concurrently between the two is not
    /// detected; the batch is still validated draft by draft on append.
    pub async fn commit_plan(
        &self,
        group_id: &GroupId,
        plan: &SettlementPlan,
    ) -> Result<Vec<LedgerEntry>> {
        let current = self.plan_settlement(group_id).await?;
        if current.fingerprint() != plan.fingerprint() {
            tracing::warn!(group_id = %group_id, "Refusing to commit a stale settlement plan");
            return Err(AppError::StalePlan {
                group_id: group_id.clone(),
            });
        }
        if plan.is_empty() {
            return Ok(Vec::new());
        }

        let entries = self.store.append_all(plan.to_entries(group_id)).await?;
        self.cache.invalidate(group_id).await;

        get_metrics().record_plan_committed(entries.len() as u64);
        tracing::info!(
            group_id = %group_id,
            transfer_count = entries.len(),
            total_amount = %plan.summary.total_amount,
            "Settlement plan committed"
        );
        Ok(entries)
    }

    pub async fn outstanding_loans(&self, group_id: &GroupId) -> Result<Vec<OutstandingLoan>> {
        let entries = self.store.snapshot(group_id).await?;
        Ok(loan_book::outstanding_loans(&entries))
    }

    pub async fn can_afford(
        &self,
        group_id: &GroupId,
        account_id: &AccountId,
        amount: Decimal,
    ) -> Result<bool> {
        Ok(self.balances(group_id).await?.can_afford(account_id, amount))
    }

    fn project_and_audit(&self, group_id: &GroupId, entries: &[LedgerEntry]) -> Result<Projection> {
        let projection = self.projector.project(group_id, entries)?;
        self.auditor.audit(entries, &projection)?;
        Ok(projection)
    }
}
