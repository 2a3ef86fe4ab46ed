use chrono::Utc;
use serde::Serialize;

use crate::domain::{
    evaluate_cancel, evaluate_use, Account, AccountId, AccountUser, CancelViolation, Cents, Transaction,
    TransactionId, TransactionKind, TransactionOutcome, UseViolation, UserId,
};
use crate::storage::Repository;

use super::AppError;

/// Application service orchestrating the balance operations.
/// This is the primary interface for any client (CLI, API, etc.): it
/// resolves entities from the repository, asks the policy engine for a
/// decision, records the attempt, and returns a result view.
pub struct TransactionService {
    repo: Repository,
}

/// Result of a use or cancel operation.
///
/// `balance_snapshot` mirrors the persisted audit record: the account
/// balance after the operation was applied (post-debit for use,
/// post-credit for cancel).
#[derive(Debug, Clone, Serialize)]
pub struct TransactionReceipt {
    pub account_number: String,
    pub transaction_id: TransactionId,
    pub kind: TransactionKind,
    pub outcome: TransactionOutcome,
    pub amount_cents: Cents,
    pub balance_snapshot: Cents,
}

/// Read-only view of a recorded transaction.
#[derive(Debug, Clone, Serialize)]
pub struct TransactionView {
    pub transaction_id: TransactionId,
    pub kind: TransactionKind,
    pub outcome: TransactionOutcome,
    pub amount_cents: Cents,
}

impl TransactionService {
    /// Create a new service with the given repository.
    pub fn new(repo: Repository) -> Self {
        Self { repo }
    }

    /// Initialize a new database at the given path.
    pub async fn init(database_path: &str) -> Result<Self, AppError> {
        let db_url = format!("sqlite:{}?mode=rwc", database_path);
        let repo = Repository::init(&db_url).await?;
        Ok(Self::new(repo))
    }

    /// Connect to an existing database.
    pub async fn connect(database_path: &str) -> Result<Self, AppError> {
        let db_url = format!("sqlite:{}", database_path);
        let repo = Repository::connect(&db_url).await?;
        Ok(Self::new(repo))
    }

    // ========================
    // Balance operations
    // ========================

    /// Debit an account's balance on behalf of its owner.
    ///
    /// Resolution failures (unknown user or account) leave no trace; once
    /// the account is resolved, every attempt persists exactly one audit
    /// record, denied ones included.
    pub async fn use_balance(
        &self,
        user_id: UserId,
        account_number: &str,
        amount_cents: Cents,
    ) -> Result<TransactionReceipt, AppError> {
        if amount_cents <= 0 {
            return Err(AppError::InvalidAmount(
                "Amount must be positive".to_string(),
            ));
        }

        let user = self
            .repo
            .get_user(user_id)
            .await?
            .ok_or(AppError::UserNotFound(user_id))?;

        let account = self
            .repo
            .get_account_by_number(account_number)
            .await?
            .ok_or_else(|| AppError::AccountNotFound(account_number.to_string()))?;

        match evaluate_use(&account, user.id, amount_cents) {
            Ok(new_balance) => {
                self.repo
                    .update_account_balance(account.id, account.version, new_balance)
                    .await?;

                let tx = self
                    .record(
                        &account,
                        TransactionKind::Use,
                        TransactionOutcome::Success,
                        amount_cents,
                        new_balance,
                    )
                    .await?;

                log::info!(
                    "use of {} cents on account {} succeeded (transaction {})",
                    amount_cents,
                    account.account_number,
                    tx.id
                );
                Ok(Self::receipt(&account, &tx))
            }
            Err(violation) => {
                // Denied after resolution: the attempt still gets an audit
                // record, with the balance unchanged.
                self.record(
                    &account,
                    TransactionKind::Use,
                    TransactionOutcome::Failure,
                    amount_cents,
                    account.balance_cents,
                )
                .await?;

                log::warn!(
                    "use of {} cents on account {} denied: {}",
                    amount_cents,
                    account.account_number,
                    violation
                );
                Err(Self::use_denial(&account, violation))
            }
        }
    }

    /// Reverse a prior use transaction in full.
    ///
    /// Denied cancellations mutate nothing and leave no audit record; only
    /// use-denials are recorded as failures.
    pub async fn cancel_balance(
        &self,
        transaction_id: TransactionId,
        account_number: &str,
        amount_cents: Cents,
    ) -> Result<TransactionReceipt, AppError> {
        if amount_cents <= 0 {
            return Err(AppError::InvalidAmount(
                "Amount must be positive".to_string(),
            ));
        }

        let original = self
            .repo
            .get_transaction(transaction_id)
            .await?
            .ok_or_else(|| AppError::TransactionNotFound(transaction_id.to_string()))?;

        let account = self
            .repo
            .get_account_by_number(account_number)
            .await?
            .ok_or_else(|| AppError::AccountNotFound(account_number.to_string()))?;

        match evaluate_cancel(&account, &original, amount_cents, Utc::now()) {
            Ok(new_balance) => {
                self.repo
                    .update_account_balance(account.id, account.version, new_balance)
                    .await?;

                let tx = self
                    .record(
                        &account,
                        TransactionKind::Cancel,
                        TransactionOutcome::Success,
                        amount_cents,
                        new_balance,
                    )
                    .await?;

                log::info!(
                    "cancel of transaction {} on account {} succeeded (transaction {})",
                    original.id,
                    account.account_number,
                    tx.id
                );
                Ok(Self::receipt(&account, &tx))
            }
            Err(violation) => {
                log::warn!(
                    "cancel of transaction {} on account {} denied: {}",
                    original.id,
                    account.account_number,
                    violation
                );
                Err(Self::cancel_denial(&account, &original, violation))
            }
        }
    }

    /// Look up a recorded transaction by id. Repeated calls on the same id
    /// return the same view.
    pub async fn query_transaction(
        &self,
        transaction_id: TransactionId,
    ) -> Result<TransactionView, AppError> {
        let tx = self
            .repo
            .get_transaction(transaction_id)
            .await?
            .ok_or_else(|| AppError::TransactionNotFound(transaction_id.to_string()))?;

        Ok(TransactionView {
            transaction_id: tx.id,
            kind: tx.kind,
            outcome: tx.outcome,
            amount_cents: tx.amount_cents,
        })
    }

    // ========================
    // Thin store wrappers
    // ========================

    /// Register a new user. The store assigns the id.
    pub async fn create_user(&self, name: &str) -> Result<AccountUser, AppError> {
        Ok(self.repo.insert_user(name).await?)
    }

    /// Open an account for an existing user. No lifecycle policy beyond
    /// owner existence and account-number uniqueness.
    pub async fn create_account(
        &self,
        account_number: &str,
        owner_id: UserId,
        initial_balance: Cents,
    ) -> Result<Account, AppError> {
        if initial_balance < 0 {
            return Err(AppError::InvalidAmount(
                "Initial balance cannot be negative".to_string(),
            ));
        }

        self.repo
            .get_user(owner_id)
            .await?
            .ok_or(AppError::UserNotFound(owner_id))?;

        if self
            .repo
            .get_account_by_number(account_number)
            .await?
            .is_some()
        {
            return Err(AppError::AccountAlreadyExists(account_number.to_string()));
        }

        let account = Account::new(account_number.to_string(), owner_id, initial_balance);
        self.repo.save_account(&account).await?;
        Ok(account)
    }

    /// Get an account by number.
    pub async fn get_account(&self, account_number: &str) -> Result<Account, AppError> {
        self.repo
            .get_account_by_number(account_number)
            .await?
            .ok_or_else(|| AppError::AccountNotFound(account_number.to_string()))
    }

    /// List recorded transactions, optionally scoped to one account.
    pub async fn list_transactions(
        &self,
        account_number: Option<&str>,
    ) -> Result<Vec<Transaction>, AppError> {
        match account_number {
            Some(number) => {
                let account = self.get_account(number).await?;
                Ok(self.repo.list_transactions_for_account(account.id).await?)
            }
            None => Ok(self.repo.list_transactions().await?),
        }
    }

    /// Resolve an account number for display purposes.
    pub async fn get_account_number(&self, account_id: AccountId) -> Result<String, AppError> {
        let account = self
            .repo
            .get_account(account_id)
            .await?
            .ok_or_else(|| AppError::AccountNotFound(account_id.to_string()))?;
        Ok(account.account_number)
    }

    // ========================
    // Recording
    // ========================

    /// Build and persist one audit record for an attempted operation.
    async fn record(
        &self,
        account: &Account,
        kind: TransactionKind,
        outcome: TransactionOutcome,
        amount_cents: Cents,
        balance_snapshot: Cents,
    ) -> Result<Transaction, AppError> {
        let tx = Transaction::new(account.id, kind, outcome, amount_cents, balance_snapshot);
        self.repo.save_transaction(&tx).await?;
        Ok(tx)
    }

    fn receipt(account: &Account, tx: &Transaction) -> TransactionReceipt {
        TransactionReceipt {
            account_number: account.account_number.clone(),
            transaction_id: tx.id,
            kind: tx.kind,
            outcome: tx.outcome,
            amount_cents: tx.amount_cents,
            balance_snapshot: tx.balance_snapshot,
        }
    }

    fn use_denial(account: &Account, violation: UseViolation) -> AppError {
        match violation {
            UseViolation::UserAccountMismatch {
                owner_id,
                requested_by,
            } => AppError::UserAccountMismatch {
                account_number: account.account_number.clone(),
                owner_id,
                requested_by,
            },
            UseViolation::AccountAlreadyUnregistered => {
                AppError::AccountAlreadyUnregistered(account.account_number.clone())
            }
            UseViolation::AmountExceedsBalance { balance, requested } => {
                AppError::AmountExceedsBalance {
                    account_number: account.account_number.clone(),
                    balance,
                    requested,
                }
            }
        }
    }

    fn cancel_denial(
        account: &Account,
        original: &Transaction,
        violation: CancelViolation,
    ) -> AppError {
        match violation {
            CancelViolation::TransactionAccountMismatch => AppError::TransactionAccountMismatch {
                transaction_id: original.id,
                account_number: account.account_number.clone(),
            },
            CancelViolation::CancelMustBeFull {
                original_amount,
                requested,
            } => AppError::CancelMustBeFull {
                transaction_id: original.id,
                original_amount,
                requested,
            },
            CancelViolation::TooOldToCancel { transacted_at } => AppError::TooOldToCancel {
                transaction_id: original.id,
                transacted_at,
            },
        }
    }
}
