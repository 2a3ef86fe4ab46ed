use chrono::{DateTime, Months, Utc};

use super::{Account, Cents, Transaction, UserId};

/// How far back a use transaction remains cancellable. The boundary is
/// inclusive: a transaction exactly this old can still be cancelled.
pub const CANCEL_WINDOW_MONTHS: u32 = 12;

/// Decide whether a use (debit) operation is permitted.
///
/// Checks run in a fixed order and short-circuit on the first violation,
/// so each malformed input maps to one deterministic reason. The caller is
/// expected to have already resolved the requesting user and the account.
/// Ok carries the new balance; on Err the balance is untouched.
pub fn evaluate_use(
    account: &Account,
    requesting_user: UserId,
    amount_cents: Cents,
) -> Result<Cents, UseViolation> {
    if account.owner_id != requesting_user {
        return Err(UseViolation::UserAccountMismatch {
            owner_id: account.owner_id,
            requested_by: requesting_user,
        });
    }

    if !account.is_active() {
        return Err(UseViolation::AccountAlreadyUnregistered);
    }

    if amount_cents > account.balance_cents {
        return Err(UseViolation::AmountExceedsBalance {
            balance: account.balance_cents,
            requested: amount_cents,
        });
    }

    Ok(account.balance_cents - amount_cents)
}

/// Decide whether a cancel (compensating credit) operation is permitted.
///
/// The original transaction must belong to the account (matched by id, not
/// by value), the amount must match exactly (partial cancellation is not
/// supported), and the original must fall within the cancel window. The
/// clock is passed in so the window check stays pure.
pub fn evaluate_cancel(
    account: &Account,
    original: &Transaction,
    amount_cents: Cents,
    now: DateTime<Utc>,
) -> Result<Cents, CancelViolation> {
    if original.account_id != account.id {
        return Err(CancelViolation::TransactionAccountMismatch);
    }

    if original.amount_cents != amount_cents {
        return Err(CancelViolation::CancelMustBeFull {
            original_amount: original.amount_cents,
            requested: amount_cents,
        });
    }

    let cutoff = now - Months::new(CANCEL_WINDOW_MONTHS);
    if original.transacted_at < cutoff {
        return Err(CancelViolation::TooOldToCancel {
            transacted_at: original.transacted_at,
        });
    }

    Ok(account.balance_cents + amount_cents)
}

/// A denied use decision. The account balance is unchanged in every case.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum UseViolation {
    UserAccountMismatch { owner_id: UserId, requested_by: UserId },
    AccountAlreadyUnregistered,
    AmountExceedsBalance { balance: Cents, requested: Cents },
}

impl std::fmt::Display for UseViolation {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            UseViolation::UserAccountMismatch {
                owner_id,
                requested_by,
            } => write!(
                f,
                "account is owned by user {}, not user {}",
                owner_id, requested_by
            ),
            UseViolation::AccountAlreadyUnregistered => {
                write!(f, "account is unregistered")
            }
            UseViolation::AmountExceedsBalance { balance, requested } => write!(
                f,
                "requested {} cents exceeds balance of {} cents",
                requested, balance
            ),
        }
    }
}

impl std::error::Error for UseViolation {}

/// A denied cancel decision. The account balance is unchanged in every case.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum CancelViolation {
    TransactionAccountMismatch,
    CancelMustBeFull { original_amount: Cents, requested: Cents },
    TooOldToCancel { transacted_at: DateTime<Utc> },
}

impl std::fmt::Display for CancelViolation {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            CancelViolation::TransactionAccountMismatch => {
                write!(f, "transaction belongs to a different account")
            }
            CancelViolation::CancelMustBeFull {
                original_amount,
                requested,
            } => write!(
                f,
                "cancellation must match the original amount exactly ({} cents, requested {})",
                original_amount, requested
            ),
            CancelViolation::TooOldToCancel { transacted_at } => {
                write!(f, "transaction from {} is too old to cancel", transacted_at)
            }
        }
    }
}

impl std::error::Error for CancelViolation {}

#[cfg(test)]
mod tests {
    use chrono::Duration;

    use super::*;
    use crate::domain::{AccountStatus, TransactionKind, TransactionOutcome};

    fn active_account(owner: UserId, balance: Cents) -> Account {
        Account::new("1000000012".into(), owner, balance)
    }

    fn successful_use(account: &Account, amount: Cents) -> Transaction {
        Transaction::new(
            account.id,
            TransactionKind::Use,
            TransactionOutcome::Success,
            amount,
            account.balance_cents - amount,
        )
    }

    #[test]
    fn test_use_allowed_computes_new_balance() {
        let account = active_account(12, 10_000);
        assert_eq!(evaluate_use(&account, 12, 1_000), Ok(9_000));
    }

    #[test]
    fn test_use_allows_exact_balance() {
        let account = active_account(12, 1_000);
        assert_eq!(evaluate_use(&account, 12, 1_000), Ok(0));
    }

    #[test]
    fn test_use_denies_wrong_owner() {
        let account = active_account(12, 10_000);
        assert_eq!(
            evaluate_use(&account, 13, 1_000),
            Err(UseViolation::UserAccountMismatch {
                owner_id: 12,
                requested_by: 13,
            })
        );
    }

    #[test]
    fn test_use_denies_unregistered_account() {
        let account = active_account(12, 10_000).with_status(AccountStatus::Unregistered);
        assert_eq!(
            evaluate_use(&account, 12, 1_000),
            Err(UseViolation::AccountAlreadyUnregistered)
        );
    }

    #[test]
    fn test_use_denies_amount_over_balance() {
        let account = active_account(12, 500);
        assert_eq!(
            evaluate_use(&account, 12, 1_000),
            Err(UseViolation::AmountExceedsBalance {
                balance: 500,
                requested: 1_000,
            })
        );
    }

    #[test]
    fn test_owner_check_runs_before_status_check() {
        // Fixed validation order: a wrong owner on an unregistered account
        // reports the ownership violation, not the status one.
        let account = active_account(12, 0).with_status(AccountStatus::Unregistered);
        assert!(matches!(
            evaluate_use(&account, 13, 1_000),
            Err(UseViolation::UserAccountMismatch { .. })
        ));
    }

    #[test]
    fn test_cancel_allowed_credits_balance() {
        let account = active_account(12, 9_000);
        let original = successful_use(&account, 1_000);
        let result = evaluate_cancel(&account, &original, 1_000, Utc::now());
        assert_eq!(result, Ok(10_000));
    }

    #[test]
    fn test_cancel_denies_foreign_transaction() {
        let account = active_account(12, 9_000);
        let other = active_account(13, 5_000);
        let original = successful_use(&other, 1_000);
        assert_eq!(
            evaluate_cancel(&account, &original, 1_000, Utc::now()),
            Err(CancelViolation::TransactionAccountMismatch)
        );
    }

    #[test]
    fn test_cancel_denies_partial_amount() {
        let account = active_account(12, 9_000);
        let original = successful_use(&account, 1_000);
        assert_eq!(
            evaluate_cancel(&account, &original, 500, Utc::now()),
            Err(CancelViolation::CancelMustBeFull {
                original_amount: 1_000,
                requested: 500,
            })
        );
    }

    #[test]
    fn test_cancel_denies_amount_above_original() {
        let account = active_account(12, 9_000);
        let original = successful_use(&account, 1_000);
        assert!(matches!(
            evaluate_cancel(&account, &original, 2_000, Utc::now()),
            Err(CancelViolation::CancelMustBeFull { .. })
        ));
    }

    #[test]
    fn test_cancel_window_boundary_is_inclusive() {
        let now = Utc::now();
        let account = active_account(12, 9_000);
        let original = successful_use(&account, 1_000)
            .with_transacted_at(now - Months::new(CANCEL_WINDOW_MONTHS));

        assert_eq!(evaluate_cancel(&account, &original, 1_000, now), Ok(10_000));
    }

    #[test]
    fn test_cancel_denies_past_the_window() {
        let now = Utc::now();
        let account = active_account(12, 9_000);
        let original = successful_use(&account, 1_000).with_transacted_at(
            now - Months::new(CANCEL_WINDOW_MONTHS) - Duration::seconds(1),
        );

        assert!(matches!(
            evaluate_cancel(&account, &original, 1_000, now),
            Err(CancelViolation::TooOldToCancel { .. })
        ));
    }

    #[test]
    fn test_account_check_runs_before_amount_check() {
        let account = active_account(12, 9_000);
        let other = active_account(13, 5_000);
        let original = successful_use(&other, 1_000);
        // Wrong account and wrong amount: the account mismatch wins.
        assert_eq!(
            evaluate_cancel(&account, &original, 500, Utc::now()),
            Err(CancelViolation::TransactionAccountMismatch)
        );
    }
}
