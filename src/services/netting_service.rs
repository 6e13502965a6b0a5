use rust_decimal::Decimal;

use crate::config::DEFAULT_EPSILON;
use crate::error::{AppError, ConservationCheck, ConservationViolation, Result};
use crate::models::{
    raw_transaction_count, AccountId, NetPosition, PlanSummary, SettlementPlan, SettlementTransfer,
};
use crate::observability::{get_metrics, LatencyTimer};
use crate::services::projector::Projection;

/// Remaining amount still to be matched for one side of the sweep.
#[derive(Debug, Clone)]
struct Open {
    account_id: AccountId,
    remaining: Decimal,
}

/// Turns net results into a short list of payments.
///
/// Greedy by magnitude: the largest creditor is matched against the largest
/// debtor until one of them is exhausted. Ties are broken by account id so the
/// same positions always give the same transfers in the same order. This is not
/// a global minimum, but it never emits more than `N - 1` transfers for `N`
/// unsettled accounts.
#[derive(Debug, Clone)]
pub struct NettingPlanner {
    epsilon: Decimal,
}

impl Default for NettingPlanner {
    fn default() -> Self {
        Self::new(DEFAULT_EPSILON)
    }
}

impl NettingPlanner {
    pub fn new(epsilon: Decimal) -> Self {
        Self { epsilon }
    }

    pub fn plan(&self, projection: &Projection) -> Result<SettlementPlan> {
        let timer = LatencyTimer::new();
        let positions = projection.to_positions();

        let (mut creditors, mut debtors) = self.partition(&positions);

        if creditors.len() + debtors.len() == 1 {
            let net = creditors
                .first()
                .or(debtors.first())
                .map(|o| projection.net_result(&o.account_id))
                .unwrap_or_default();
            return Err(self.violation(projection, Decimal::ZERO, net));
        }

        if creditors.is_empty() && debtors.is_empty() {
            tracing::debug!(group_id = %projection.group_id, "All accounts settled; nothing to plan");
            return Ok(SettlementPlan::empty(positions));
        }

        let credit_total: Decimal = creditors.iter().map(|o| o.remaining).sum();
        let debit_total: Decimal = debtors.iter().map(|o| o.remaining).sum();
        if (credit_total - debit_total).abs() > self.epsilon {
            return Err(self.violation(projection, credit_total, debit_total));
        }

        creditors.sort_by(|a, b| {
            b.remaining
                .cmp(&a.remaining)
                .then_with(|| a.account_id.cmp(&b.account_id))
        });
        debtors.sort_by(|a, b| {
            b.remaining
                .cmp(&a.remaining)
                .then_with(|| a.account_id.cmp(&b.account_id))
        });

        let transfers = self.sweep(projection, &mut creditors, &mut debtors)?;

        let raw = raw_transaction_count(&positions);
        let summary = PlanSummary::new(&transfers, raw);
        let duration_ms = timer.elapsed_ms();
        get_metrics().record_plan(transfers.len() as u64, raw.max(0) as u64, duration_ms);
        tracing::info!(
            group_id = %projection.group_id,
            transfer_count = summary.transfer_count,
            raw_transaction_count = raw,
            total_amount = %summary.total_amount,
            reduction_rate = %summary.reduction_rate.round_dp(4),
            "Settlement plan computed"
        );

        Ok(SettlementPlan {
            transfers,
            positions,
            summary,
        })
    }

    /// Unsettled accounts split into creditors and debtors, as positive magnitudes.
    fn partition(&self, positions: &[NetPosition]) -> (Vec<Open>, Vec<Open>) {
        let mut creditors = Vec::new();
        let mut debtors = Vec::new();

        for position in positions {
            if position.is_creditor(self.epsilon) {
                creditors.push(Open {
                    account_id: position.account_id.clone(),
                    remaining: position.net_result,
                });
            } else if position.is_debtor(self.epsilon) {
                debtors.push(Open {
                    account_id: position.account_id.clone(),
                    remaining: position.net_result.abs(),
                });
            }
        }

        (creditors, debtors)
    }

    /// Two-pointer match over pre-sorted creditors and debtors.
    ///
    /// A side is only passed over once its remainder is exactly zero, so
    /// sub-epsilon amounts are still paid out instead of piling up on the
    /// last account. Whatever the sweep cannot match must stay within epsilon.
    fn sweep(
        &self,
        projection: &Projection,
        creditors: &mut [Open],
        debtors: &mut [Open],
    ) -> Result<Vec<SettlementTransfer>> {
        let mut transfers = Vec::new();
        let (mut i, mut j) = (0, 0);

        while i < creditors.len() && j < debtors.len() {
            let amount = creditors[i].remaining.min(debtors[j].remaining);

            transfers.push(SettlementTransfer::new(
                debtors[j].account_id.clone(),
                creditors[i].account_id.clone(),
                amount,
            ));

            creditors[i].remaining -= amount;
            debtors[j].remaining -= amount;

            if creditors[i].remaining.is_zero() {
                i += 1;
            }
            if debtors[j].remaining.is_zero() {
                j += 1;
            }
        }

        let leftover: Decimal = creditors[i..]
            .iter()
            .chain(debtors[j..].iter())
            .map(|o| o.remaining)
            .sum();
        if leftover > self.epsilon {
            return Err(self.violation(projection, Decimal::ZERO, leftover));
        }
        if !leftover.is_zero() {
            tracing::debug!(leftover = %leftover, "Unmatched remainder within tolerance");
        }

        Ok(transfers)
    }

    fn violation(&self, projection: &Projection, expected: Decimal, actual: Decimal) -> AppError {
        get_metrics().record_conservation_violation("net_result");
        tracing::error!(
            group_id = %projection.group_id,
            expected = %expected,
            actual = %actual,
            "Net results are not zero-sum; refusing to plan settlement"
        );
        ConservationViolation::new(
            projection.group_id.clone(),
            ConservationCheck::NetResult,
            expected,
            actual,
        )
        .into()
    }
}
