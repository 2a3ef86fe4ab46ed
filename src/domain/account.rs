use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use super::{Cents, UserId};

pub type AccountId = Uuid;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum AccountStatus {
    /// Open for balance operations
    Active,
    /// Closed account; kept for its transaction history but frozen
    Unregistered,
}

impl AccountStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            AccountStatus::Active => "active",
            AccountStatus::Unregistered => "unregistered",
        }
    }

    pub fn from_str(s: &str) -> Option<Self> {
        match s.to_lowercase().as_str() {
            "active" => Some(AccountStatus::Active),
            "unregistered" => Some(AccountStatus::Unregistered),
            _ => None,
        }
    }
}

impl std::fmt::Display for AccountStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// A balance-bearing resource owned by one user.
///
/// The balance is only ever changed through the policy engine's decisions;
/// after any committed operation it stays >= 0. `version` is bumped by the
/// store on every balance write so that concurrent read-modify-write cycles
/// on the same account are detected at the store boundary.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Account {
    pub id: AccountId,
    /// Externally-visible key, unique across accounts
    pub account_number: String,
    pub owner_id: UserId,
    pub status: AccountStatus,
    pub balance_cents: Cents,
    pub version: i64,
    pub created_at: DateTime<Utc>,
}

impl Account {
    pub fn new(account_number: String, owner_id: UserId, balance_cents: Cents) -> Self {
        assert!(balance_cents >= 0, "Account balance cannot be negative");
        Self {
            id: Uuid::new_v4(),
            account_number,
            owner_id,
            status: AccountStatus::Active,
            balance_cents,
            version: 0,
            created_at: Utc::now(),
        }
    }

    pub fn with_status(mut self, status: AccountStatus) -> Self {
        self.status = status;
        self
    }

    pub fn is_active(&self) -> bool {
        self.status == AccountStatus::Active
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_status_roundtrip() {
        for status in [AccountStatus::Active, AccountStatus::Unregistered] {
            let s = status.as_str();
            assert_eq!(AccountStatus::from_str(s), Some(status));
        }
    }

    #[test]
    fn test_new_account_is_active() {
        let account = Account::new("1000000012".into(), 12, 10_000);
        assert!(account.is_active());
        assert_eq!(account.balance_cents, 10_000);
        assert_eq!(account.version, 0);
    }

    #[test]
    fn test_unregistered_account_is_not_active() {
        let account = Account::new("1000000012".into(), 12, 0)
            .with_status(AccountStatus::Unregistered);
        assert!(!account.is_active());
    }

    #[test]
    #[should_panic(expected = "Account balance cannot be negative")]
    fn test_account_requires_non_negative_balance() {
        Account::new("1000000012".into(), 12, -1);
    }
}
