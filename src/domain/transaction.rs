use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use super::{AccountId, Cents};

pub type TransactionId = Uuid;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TransactionKind {
    /// A debit attempt against an account's balance
    Use,
    /// A full compensating credit reversing one prior use
    Cancel,
}

impl TransactionKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            TransactionKind::Use => "use",
            TransactionKind::Cancel => "cancel",
        }
    }

    pub fn from_str(s: &str) -> Option<Self> {
        match s.to_lowercase().as_str() {
            "use" => Some(TransactionKind::Use),
            "cancel" => Some(TransactionKind::Cancel),
            _ => None,
        }
    }
}

impl std::fmt::Display for TransactionKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TransactionOutcome {
    Success,
    Failure,
}

impl TransactionOutcome {
    pub fn as_str(&self) -> &'static str {
        match self {
            TransactionOutcome::Success => "success",
            TransactionOutcome::Failure => "failure",
        }
    }

    pub fn from_str(s: &str) -> Option<Self> {
        match s.to_lowercase().as_str() {
            "success" => Some(TransactionOutcome::Success),
            "failure" => Some(TransactionOutcome::Failure),
            _ => None,
        }
    }
}

impl std::fmt::Display for TransactionOutcome {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// An immutable audit record of one attempted balance operation.
///
/// Every attempt that reached a resolved account produces exactly one of
/// these, success or failure. Records are append-only - corrections are
/// represented by new compensating records, never edits. The id is the
/// cancellation key a later cancel operation refers back to.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Transaction {
    pub id: TransactionId,
    pub account_id: AccountId,
    pub kind: TransactionKind,
    pub outcome: TransactionOutcome,
    /// Amount in cents (always positive)
    pub amount_cents: Cents,
    /// Account balance after this operation was applied, or the unchanged
    /// balance if the operation was denied
    pub balance_snapshot: Cents,
    pub transacted_at: DateTime<Utc>,
}

impl Transaction {
    pub fn new(
        account_id: AccountId,
        kind: TransactionKind,
        outcome: TransactionOutcome,
        amount_cents: Cents,
        balance_snapshot: Cents,
    ) -> Self {
        assert!(amount_cents > 0, "Transaction amount must be positive");
        Self {
            id: Uuid::new_v4(),
            account_id,
            kind,
            outcome,
            amount_cents,
            balance_snapshot,
            transacted_at: Utc::now(),
        }
    }

    pub fn with_transacted_at(mut self, transacted_at: DateTime<Utc>) -> Self {
        self.transacted_at = transacted_at;
        self
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_create_transaction() {
        let account_id = Uuid::new_v4();
        let tx = Transaction::new(
            account_id,
            TransactionKind::Use,
            TransactionOutcome::Success,
            1000,
            9000,
        );

        assert_eq!(tx.account_id, account_id);
        assert_eq!(tx.amount_cents, 1000);
        assert_eq!(tx.balance_snapshot, 9000);
        assert_eq!(tx.outcome, TransactionOutcome::Success);
    }

    #[test]
    #[should_panic(expected = "Transaction amount must be positive")]
    fn test_transaction_requires_positive_amount() {
        Transaction::new(
            Uuid::new_v4(),
            TransactionKind::Use,
            TransactionOutcome::Success,
            0,
            0,
        );
    }

    #[test]
    fn test_kind_and_outcome_roundtrip() {
        for kind in [TransactionKind::Use, TransactionKind::Cancel] {
            assert_eq!(TransactionKind::from_str(kind.as_str()), Some(kind));
        }
        for outcome in [TransactionOutcome::Success, TransactionOutcome::Failure] {
            assert_eq!(TransactionOutcome::from_str(outcome.as_str()), Some(outcome));
        }
    }
}
