use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use std::fmt;
use thiserror::Error;
use uuid::Uuid;

use crate::models::{AccountId, GroupId};

pub type Result<T> = std::result::Result<T, AppError>;

/// Which system-wide invariant an audit found broken.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ConservationCheck {
    /// Sum of custodial balances against sum of issuances.
    Custody,
    /// Sum of net results against zero.
    NetResult,
}

impl fmt::Display for ConservationCheck {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ConservationCheck::Custody => write!(f, "custody"),
            ConservationCheck::NetResult => write!(f, "net_result"),
        }
    }
}

/// Audit mismatch beyond tolerance. Always fatal for the affected group.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ConservationViolation {
    pub group_id: GroupId,
    pub check: ConservationCheck,
    pub expected: Decimal,
    pub actual: Decimal,
    pub delta: Decimal,
}

impl ConservationViolation {
    pub fn new(group_id: GroupId, check: ConservationCheck, expected: Decimal, actual: Decimal) -> Self {
        Self {
            group_id,
            check,
            expected,
            actual,
            delta: actual - expected,
        }
    }
}

impl fmt::Display for ConservationViolation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{} conservation violated in group '{}': expected {}, actual {} (delta {})",
            self.check, self.group_id, self.expected, self.actual, self.delta
        )
    }
}

impl std::error::Error for ConservationViolation {}

#[derive(Debug, Error)]
pub enum AppError {
    #[error("Invalid amount {amount}: amounts must be positive")]
    InvalidAmount { amount: Decimal },

    #[error("Self transfer rejected for account '{account_id}'")]
    SelfTransfer { account_id: AccountId },

    #[error("Reserved account misuse: {0}")]
    ReservedAccount(String),

    #[error("Related entry '{0}' not found")]
    UnknownRelatedEntry(Uuid),

    #[error("Invalid return: {0}")]
    InvalidReturn(String),

    #[error("Insufficient funds in '{account_id}': requested {requested}, available {available}")]
    InsufficientFunds {
        account_id: AccountId,
        requested: Decimal,
        available: Decimal,
    },

    #[error("Malformed entry '{entry_id}': {reason}")]
    MalformedEntry { entry_id: Uuid, reason: String },

    #[error("{0}")]
    ConservationViolation(ConservationViolation),

    #[error("Settlement plan for group '{group_id}' is stale; recompute before committing")]
    StalePlan { group_id: GroupId },

    #[error("Not found: {0}")]
    NotFound(String),

    #[error("Configuration error: {0}")]
    Config(#[from] config::ConfigError),

    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Internal error: {0}")]
    Internal(#[from] anyhow::Error),
}

impl AppError {
    pub fn malformed(entry_id: Uuid, reason: impl Into<String>) -> Self {
        AppError::MalformedEntry {
            entry_id,
            reason: reason.into(),
        }
    }

    /// Validation-time rejections. The same input will be rejected again.
    pub fn is_validation(&self) -> bool {
        matches!(
            self,
            AppError::InvalidAmount { .. }
                | AppError::SelfTransfer { .. }
                | AppError::ReservedAccount(_)
                | AppError::UnknownRelatedEntry(_)
                | AppError::InvalidReturn(_)
                | AppError::InsufficientFunds { .. }
        )
    }

    /// Defects that must halt settlement and be surfaced to an operator.
    pub fn is_fatal(&self) -> bool {
        matches!(
            self,
            AppError::MalformedEntry { .. } | AppError::ConservationViolation(_)
        )
    }

    /// Short label used for metrics.
    pub fn kind(&self) -> &'static str {
        match self {
            AppError::InvalidAmount { .. } => "invalid_amount",
            AppError::SelfTransfer { .. } => "self_transfer",
            AppError::ReservedAccount(_) => "reserved_account",
            AppError::UnknownRelatedEntry(_) => "unknown_related_entry",
            AppError::InvalidReturn(_) => "invalid_return",
            AppError::InsufficientFunds { .. } => "insufficient_funds",
            AppError::MalformedEntry { .. } => "malformed_entry",
            AppError::ConservationViolation(_) => "conservation_violation",
            AppError::StalePlan { .. } => "stale_plan",
            AppError::NotFound(_) => "not_found",
            AppError::Config(_) => "config",
            AppError::Serialization(_) => "serialization",
            AppError::Io(_) => "io",
            AppError::Internal(_) => "internal",
        }
    }
}

impl From<ConservationViolation> for AppError {
    fn from(violation: ConservationViolation) -> Self {
        AppError::ConservationViolation(violation)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rust_decimal_macros::dec;

    #[test]
    fn test_violation_delta() {
        let violation = ConservationViolation::new(
            GroupId::from("poker-night"),
            ConservationCheck::Custody,
            dec!(3000),
            dec!(2990),
        );

        assert_eq!(violation.delta, dec!(-10));
        assert!(violation.to_string().contains("poker-night"));
    }

    #[test]
    fn test_error_classification() {
        let err = AppError::InvalidAmount { amount: dec!(0) };
        assert!(err.is_validation());
        assert!(!err.is_fatal());
        assert_eq!(err.kind(), "invalid_amount");

        let err = AppError::malformed(Uuid::nil(), "amount must be positive");
        assert!(err.is_fatal());
        assert!(!err.is_validation());
    }
}
