use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

use crate::models::{EntryKind, LedgerEntry};

/// How an entry moves one of the two balances of its accounts.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum Effect {
    None,
    /// Destination +amount only; the source is outside the balance set.
    DestOnly,
    /// Source −amount, destination +amount.
    Forward,
    /// Source +amount, destination −amount.
    Reverse,
}

impl Effect {
    /// Signed deltas for `(source, destination)`.
    pub fn deltas(&self, amount: Decimal) -> (Decimal, Decimal) {
        match self {
            Effect::None => (Decimal::ZERO, Decimal::ZERO),
            Effect::DestOnly => (Decimal::ZERO, amount),
            Effect::Forward => (-amount, amount),
            Effect::Reverse => (amount, -amount),
        }
    }

    pub fn is_none(&self) -> bool {
        matches!(self, Effect::None)
    }

    pub fn touches_source(&self) -> bool {
        matches!(self, Effect::Forward | Effect::Reverse)
    }
}

/// Balance effects produced by one entry.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct EffectSet {
    pub custodial: Effect,
    pub net_result: Effect,
}

impl EffectSet {
    const fn new(custodial: Effect, net_result: Effect) -> Self {
        Self {
            custodial,
            net_result,
        }
    }
}

/// Policy table. `Return` and the custody-only kinds never count as profit or loss.
pub fn effects_of(kind: EntryKind) -> EffectSet {
    match kind {
        EntryKind::Issuance => EffectSet::new(Effect::DestOnly, Effect::None),
        EntryKind::Transfer => EffectSet::new(Effect::Forward, Effect::None),
        EntryKind::Loan => EffectSet::new(Effect::Forward, Effect::Forward),
        EntryKind::Win => EffectSet::new(Effect::Forward, Effect::Forward),
        EntryKind::BuyIn => EffectSet::new(Effect::Forward, Effect::None),
        EntryKind::CashOut => EffectSet::new(Effect::Forward, Effect::None),
        EntryKind::Return => EffectSet::new(Effect::Forward, Effect::None),
        EntryKind::Settlement => EffectSet::new(Effect::Forward, Effect::Reverse),
    }
}

pub fn classify(entry: &LedgerEntry) -> EffectSet {
    effects_of(entry.kind)
}
