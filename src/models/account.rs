use serde::{Deserialize, Serialize};
use std::fmt;

/// Identifier of a participant within a group. Ordered so that tie-breaks
/// between equal balances are reproducible.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct AccountId(String);

impl AccountId {
    pub fn new(id: impl Into<String>) -> Self {
        Self(id.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for AccountId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<&str> for AccountId {
    fn from(s: &str) -> Self {
        Self::new(s)
    }
}

impl From<String> for AccountId {
    fn from(s: String) -> Self {
        Self(s)
    }
}

/// Identifier of the group that scopes a ledger.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct GroupId(String);

impl GroupId {
    pub fn new(id: impl Into<String>) -> Self {
        Self(id.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for GroupId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<&str> for GroupId {
    fn from(s: &str) -> Self {
        Self::new(s)
    }
}

impl From<String> for GroupId {
    fn from(s: String) -> Self {
        Self(s)
    }
}

/// A participant as seen within one group.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Account {
    pub account_id: AccountId,
    pub group_id: GroupId,
}

impl Account {
    pub fn new(account_id: impl Into<AccountId>, group_id: impl Into<GroupId>) -> Self {
        Self {
            account_id: account_id.into(),
            group_id: group_id.into(),
        }
    }
}

/// The reserved account currency is issued from. It is excluded from
/// projected balances and from the holder side of conservation.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Issuer(AccountId);

impl Issuer {
    pub const DEFAULT_ID: &'static str = "system";

    pub fn new(account_id: impl Into<AccountId>) -> Self {
        Self(account_id.into())
    }

    pub fn account_id(&self) -> &AccountId {
        &self.0
    }

    pub fn is(&self, account_id: &AccountId) -> bool {
        &self.0 == account_id
    }
}

impl Default for Issuer {
    fn default() -> Self {
        Self::new(Self::DEFAULT_ID)
    }
}
