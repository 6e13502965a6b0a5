use rust_decimal::Decimal;

use crate::config::LedgerSettings;
use crate::error::{AppError, Result};
use crate::models::{EntryKind, Issuer, LedgerEntry, NewEntry};
use crate::services::loan_book::find_loan;
use crate::services::projector::BalanceProjector;

/// Caller-time checks run on the append path before an entry joins the ledger.
/// Rejections are final: resubmitting the same draft fails the same way.
#[derive(Debug, Clone, Default)]
pub struct EntryValidator {
    issuer: Issuer,
    require_funds: bool,
}

impl EntryValidator {
    pub fn new(issuer: Issuer, require_funds: bool) -> Self {
        Self {
            issuer,
            require_funds,
        }
    }

    pub fn from_settings(settings: &LedgerSettings) -> Self {
        Self::new(settings.issuer(), settings.require_funds)
    }

    /// Validates `draft` against the group's history so far.
    pub fn validate(&self, draft: &NewEntry, history: &[LedgerEntry]) -> Result<()> {
        self.validate_shape(draft)?;
        self.validate_issuer(draft)?;
        self.validate_link(draft, history)?;
        if self.require_funds {
            self.validate_funds(draft, history)?;
        }
        Ok(())
    }

    /// Checks that need nothing but the draft itself.
    pub fn validate_shape(&self, draft: &NewEntry) -> Result<()> {
        if draft.amount <= Decimal::ZERO {
            return Err(AppError::InvalidAmount {
                amount: draft.amount,
            });
        }
        if draft.source_account_id == draft.dest_account_id {
            return Err(AppError::SelfTransfer {
                account_id: draft.source_account_id.clone(),
            });
        }
        Ok(())
    }

    fn validate_issuer(&self, draft: &NewEntry) -> Result<()> {
        let from_issuer = self.issuer.is(&draft.source_account_id);
        let to_issuer = self.issuer.is(&draft.dest_account_id);

        match draft.kind {
            EntryKind::Issuance if !from_issuer => Err(AppError::ReservedAccount(format!(
                "issuance must originate from '{}'",
                self.issuer.account_id()
            ))),
            EntryKind::Issuance => Ok(()),
            kind if from_issuer || to_issuer => Err(AppError::ReservedAccount(format!(
                "'{}' may only issue, not take part in {} entries",
                self.issuer.account_id(),
                kind
            ))),
            _ => Ok(()),
        }
    }

    fn validate_link(&self, draft: &NewEntry, history: &[LedgerEntry]) -> Result<()> {
        let related = match (draft.kind, draft.related_entry_id) {
            (EntryKind::Return, Some(id)) => id,
            (EntryKind::Return, None) => {
                return Err(AppError::InvalidReturn(
                    "a return must reference the loan it pays back".to_string(),
                ))
            }
            (kind, Some(_)) => {
                return Err(AppError::InvalidReturn(format!(
                    "{} entries cannot reference another entry",
                    kind
                )))
            }
            (_, None) => return Ok(()),
        };

        let lent = history
            .iter()
            .find(|e| e.entry_id == related)
            .ok_or(AppError::UnknownRelatedEntry(related))?;

        if lent.kind != EntryKind::Loan {
            return Err(AppError::InvalidReturn(format!(
                "entry '{}' is a {}, not a loan",
                related, lent.kind
            )));
        }
        if draft.source_account_id != lent.dest_account_id
            || draft.dest_account_id != lent.source_account_id
        {
            return Err(AppError::InvalidReturn(format!(
                "return must flow from '{}' back to '{}'",
                lent.dest_account_id, lent.source_account_id
            )));
        }

        let loan = find_loan(history, related).ok_or(AppError::UnknownRelatedEntry(related))?;
        if draft.amount > loan.outstanding {
            return Err(AppError::InvalidReturn(format!(
                "amount {} exceeds outstanding {} on loan '{}'",
                draft.amount, loan.outstanding, related
            )));
        }
        Ok(())
    }

    fn validate_funds(&self, draft: &NewEntry, history: &[LedgerEntry]) -> Result<()> {
        // Issuances do not draw on the source's custody.
        if draft.kind == EntryKind::Issuance {
            return Ok(());
        }

        let projection = BalanceProjector::new(self.issuer.clone()).project(&draft.group_id, history)?;
        let available = projection.custodial_balance(&draft.source_account_id);
        if available < draft.amount {
            return Err(AppError::InsufficientFunds {
                account_id: draft.source_account_id.clone(),
                requested: draft.amount,
                available,
            });
        }
        Ok(())
    }
}
