use chrono::{DateTime, Utc};
use thiserror::Error;

use crate::domain::{Cents, TransactionId, UserId};

/// Closed error taxonomy for the three service operations. Every reason is
/// surfaced to the caller verbatim; none are retried or downgraded
/// internally.
#[derive(Error, Debug)]
pub enum AppError {
    #[error("User not found: {0}")]
    UserNotFound(UserId),

    #[error("Account not found: {0}")]
    AccountNotFound(String),

    #[error("Account already exists: {0}")]
    AccountAlreadyExists(String),

    #[error("Account {account_number} is owned by user {owner_id}, not user {requested_by}")]
    UserAccountMismatch {
        account_number: String,
        owner_id: UserId,
        requested_by: UserId,
    },

    #[error("Account is already unregistered: {0}")]
    AccountAlreadyUnregistered(String),

    #[error("Amount exceeds balance of account {account_number}: balance {balance}, requested {requested}")]
    AmountExceedsBalance {
        account_number: String,
        balance: Cents,
        requested: Cents,
    },

    #[error("Transaction not found: {0}")]
    TransactionNotFound(String),

    #[error("Transaction {transaction_id} does not belong to account {account_number}")]
    TransactionAccountMismatch {
        transaction_id: TransactionId,
        account_number: String,
    },

    #[error("Cancellation must match the original amount: transaction {transaction_id} was for {original_amount}, requested {requested}")]
    CancelMustBeFull {
        transaction_id: TransactionId,
        original_amount: Cents,
        requested: Cents,
    },

    #[error("Transaction {transaction_id} from {transacted_at} is too old to cancel")]
    TooOldToCancel {
        transaction_id: TransactionId,
        transacted_at: DateTime<Utc>,
    },

    #[error("Invalid amount: {0}")]
    InvalidAmount(String),

    #[error("Database error: {0}")]
    Database(#[from] anyhow::Error),
}
