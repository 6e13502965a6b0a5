use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

use super::AccountId;

/// Derived balances of one account for one exact entry sequence.
/// Never stored and never patched; recompute from the history instead.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct NetPosition {
    pub account_id: AccountId,
    /// How much currency the account holds, borrowed and issued points included.
    pub custodial_balance: Decimal,
    /// Cumulative profit or loss from competitive activity.
    pub net_result: Decimal,
    /// Number of net-result-affecting entries this account took part in.
    pub transaction_count: i32,
}

impl NetPosition {
    pub fn new(account_id: AccountId) -> Self {
        Self {
            account_id,
            custodial_balance: Decimal::ZERO,
            net_result: Decimal::ZERO,
            transaction_count: 0,
        }
    }

    pub fn apply_custodial(&mut self, delta: Decimal) {
        self.custodial_balance += delta;
    }

    pub fn apply_net_result(&mut self, delta: Decimal) {
        self.net_result += delta;
        self.transaction_count += 1;
    }

    /// True when the net result is within `epsilon` of zero.
    pub fn is_settled(&self, epsilon: Decimal) -> bool {
        self.net_result.abs() <= epsilon
    }

    pub fn is_creditor(&self, epsilon: Decimal) -> bool {
        !self.is_settled(epsilon) && self.net_result > Decimal::ZERO
    }

    pub fn is_debtor(&self, epsilon: Decimal) -> bool {
        !self.is_settled(epsilon) && self.net_result < Decimal::ZERO
    }

    pub fn can_afford(&self, amount: Decimal) -> bool {
        self.custodial_balance >= amount
    }
}
