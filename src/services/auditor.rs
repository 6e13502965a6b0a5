use rust_decimal::Decimal;

use crate::config::DEFAULT_EPSILON;
use crate::error::{ConservationCheck, ConservationViolation};
use crate::models::{EntryKind, GroupId, LedgerEntry};
use crate::observability::get_metrics;
use crate::services::projector::Projection;

/// Checks the system-wide invariants of a projection against the raw history
/// it was computed from. Totals are computed independently on each side.
#[derive(Debug, Clone)]
pub struct ConservationAuditor {
    epsilon: Decimal,
}

impl Default for ConservationAuditor {
    fn default() -> Self {
        Self::new(DEFAULT_EPSILON)
    }
}

impl ConservationAuditor {
    pub fn new(epsilon: Decimal) -> Self {
        Self { epsilon }
    }

    pub fn epsilon(&self) -> Decimal {
        self.epsilon
    }

    /// Fails when held currency differs from issued currency, or when net
    /// results do not sum to zero, by more than epsilon.
    pub fn audit(
        &self,
        entries: &[LedgerEntry],
        projection: &Projection,
    ) -> Result<(), ConservationViolation> {
        let issued = issued_total(entries);
        let held = projection.custodial_total();
        self.compare(&projection.group_id, ConservationCheck::Custody, issued, held)?;

        let net = projection.net_result_total();
        self.compare(&projection.group_id, ConservationCheck::NetResult, Decimal::ZERO, net)?;

        tracing::debug!(
            group_id = %projection.group_id,
            issued = %issued,
            held = %held,
            "Conservation audit passed"
        );
        Ok(())
    }

    fn compare(
        &self,
        group_id: &GroupId,
        check: ConservationCheck,
        expected: Decimal,
        actual: Decimal,
    ) -> Result<(), ConservationViolation> {
        if (actual - expected).abs() <= self.epsilon {
            return Ok(());
        }

        let violation = ConservationViolation::new(group_id.clone(), check, expected, actual);
        get_metrics().record_conservation_violation(&check.to_string());
        tracing::error!(
            group_id = %group_id,
            check = %check,
            expected = %expected,
            actual = %actual,
            delta = %violation.delta,
            "Conservation violated; settlement must halt for this group"
        );
        Err(violation)
    }
}

/// Sum of every issuance amount in the history.
pub fn issued_total(entries: &[LedgerEntry]) -> Decimal {
    entries
        .iter()
        .filter(|e| e.kind == EntryKind::Issuance)
        .map(|e| e.amount)
        .sum()
}
