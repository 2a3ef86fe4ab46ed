use anyhow::{bail, Context, Result};
use chrono::{DateTime, Utc};
use sqlx::{Row, SqlitePool};
use uuid::Uuid;

use crate::domain::{
    Account, AccountId, AccountStatus, AccountUser, Cents, Transaction, TransactionId,
    TransactionKind, TransactionOutcome, UserId,
};

use super::MIGRATION_001_INITIAL;

/// The ledger store: keyed lookup and save for users, accounts, and
/// transaction records, backed by SQLite.
///
/// Balance writes go through a compare-and-swap on the account's version
/// column, so concurrent read-modify-write cycles on the same account fail
/// loudly instead of losing an update. That serialization lives here, at
/// the store boundary; the policy engine stays stateless.
pub struct Repository {
    pool: SqlitePool,
}

impl Repository {
    /// Create a new repository with the given SQLite connection pool.
    pub fn new(pool: SqlitePool) -> Self {
        Self { pool }
    }

    /// Connect to a SQLite database at the given path.
    pub async fn connect(database_url: &str) -> Result<Self> {
        let pool = SqlitePool::connect(database_url)
            .await
            .context("Failed to connect to database")?;
        Ok(Self::new(pool))
    }

    /// Run database migrations.
    pub async fn migrate(&self) -> Result<()> {
        sqlx::query(MIGRATION_001_INITIAL)
            .execute(&self.pool)
            .await
            .context("Failed to run migration 001")?;
        Ok(())
    }

    /// Initialize a new database (connect + migrate).
    pub async fn init(database_url: &str) -> Result<Self> {
        let repo = Self::connect(database_url).await?;
        repo.migrate().await?;
        Ok(repo)
    }

    // ========================
    // User operations
    // ========================

    /// Insert a new user; the store assigns the id.
    pub async fn insert_user(&self, name: &str) -> Result<AccountUser> {
        let created_at = Utc::now();
        let row = sqlx::query(
            r#"
            INSERT INTO users (name, created_at)
            VALUES (?, ?)
            RETURNING id
            "#,
        )
        .bind(name)
        .bind(created_at.to_rfc3339())
        .fetch_one(&self.pool)
        .await
        .context("Failed to insert user")?;

        Ok(AccountUser {
            id: row.get("id"),
            name: name.to_string(),
            created_at,
        })
    }

    /// Get a user by id.
    pub async fn get_user(&self, id: UserId) -> Result<Option<AccountUser>> {
        let row = sqlx::query(
            r#"
            SELECT id, name, created_at
            FROM users
            WHERE id = ?
            "#,
        )
        .bind(id)
        .fetch_optional(&self.pool)
        .await
        .context("Failed to fetch user")?;

        match row {
            Some(row) => Ok(Some(Self::row_to_user(&row)?)),
            None => Ok(None),
        }
    }

    // ========================
    // Account operations
    // ========================

    /// Save a new account to the database.
    pub async fn save_account(&self, account: &Account) -> Result<()> {
        sqlx::query(
            r#"
            INSERT INTO accounts (id, account_number, user_id, status, balance_cents, version, created_at)
            VALUES (?, ?, ?, ?, ?, ?, ?)
            "#,
        )
        .bind(account.id.to_string())
        .bind(&account.account_number)
        .bind(account.owner_id)
        .bind(account.status.as_str())
        .bind(account.balance_cents)
        .bind(account.version)
        .bind(account.created_at.to_rfc3339())
        .execute(&self.pool)
        .await
        .context("Failed to save account")?;
        Ok(())
    }

    /// Get an account by id.
    pub async fn get_account(&self, id: AccountId) -> Result<Option<Account>> {
        let row = sqlx::query(
            r#"
            SELECT id, account_number, user_id, status, balance_cents, version, created_at
            FROM accounts
            WHERE id = ?
            "#,
        )
        .bind(id.to_string())
        .fetch_optional(&self.pool)
        .await
        .context("Failed to fetch account")?;

        match row {
            Some(row) => Ok(Some(Self::row_to_account(&row)?)),
            None => Ok(None),
        }
    }

    /// Get an account by its externally-visible number.
    pub async fn get_account_by_number(&self, account_number: &str) -> Result<Option<Account>> {
        let row = sqlx::query(
            r#"
            SELECT id, account_number, user_id, status, balance_cents, version, created_at
            FROM accounts
            WHERE account_number = ?
            "#,
        )
        .bind(account_number)
        .fetch_optional(&self.pool)
        .await
        .context("Failed to fetch account by number")?;

        match row {
            Some(row) => Ok(Some(Self::row_to_account(&row)?)),
            None => Ok(None),
        }
    }

    /// Write a new balance for an account, guarded by the version the
    /// caller read. Fails when another writer got there first.
    pub async fn update_account_balance(
        &self,
        id: AccountId,
        expected_version: i64,
        new_balance: Cents,
    ) -> Result<()> {
        let result = sqlx::query(
            r#"
            UPDATE accounts
            SET balance_cents = ?, version = version + 1
            WHERE id = ? AND version = ?
            "#,
        )
        .bind(new_balance)
        .bind(id.to_string())
        .bind(expected_version)
        .execute(&self.pool)
        .await
        .context("Failed to update account balance")?;

        if result.rows_affected() == 0 {
            bail!("Account {} was modified concurrently; balance not updated", id);
        }
        Ok(())
    }

    // ========================
    // Transaction operations
    // ========================

    /// Append a transaction record. Records are never updated or deleted.
    pub async fn save_transaction(&self, transaction: &Transaction) -> Result<()> {
        sqlx::query(
            r#"
            INSERT INTO transactions (id, account_id, kind, outcome, amount_cents, balance_snapshot, transacted_at)
            VALUES (?, ?, ?, ?, ?, ?, ?)
            "#,
        )
        .bind(transaction.id.to_string())
        .bind(transaction.account_id.to_string())
        .bind(transaction.kind.as_str())
        .bind(transaction.outcome.as_str())
        .bind(transaction.amount_cents)
        .bind(transaction.balance_snapshot)
        .bind(transaction.transacted_at.to_rfc3339())
        .execute(&self.pool)
        .await
        .context("Failed to save transaction")?;
        Ok(())
    }

    /// Get a transaction by id.
    pub async fn get_transaction(&self, id: TransactionId) -> Result<Option<Transaction>> {
        let row = sqlx::query(
            r#"
            SELECT id, account_id, kind, outcome, amount_cents, balance_snapshot, transacted_at
            FROM transactions
            WHERE id = ?
            "#,
        )
        .bind(id.to_string())
        .fetch_optional(&self.pool)
        .await
        .context("Failed to fetch transaction")?;

        match row {
            Some(row) => Ok(Some(Self::row_to_transaction(&row)?)),
            None => Ok(None),
        }
    }

    /// List all transactions, oldest first.
    pub async fn list_transactions(&self) -> Result<Vec<Transaction>> {
        let rows = sqlx::query(
            r#"
            SELECT id, account_id, kind, outcome, amount_cents, balance_snapshot, transacted_at
            FROM transactions
            ORDER BY transacted_at
            "#,
        )
        .fetch_all(&self.pool)
        .await
        .context("Failed to list transactions")?;

        rows.iter().map(Self::row_to_transaction).collect()
    }

    /// List transactions for one account, oldest first.
    pub async fn list_transactions_for_account(
        &self,
        account_id: AccountId,
    ) -> Result<Vec<Transaction>> {
        let rows = sqlx::query(
            r#"
            SELECT id, account_id, kind, outcome, amount_cents, balance_snapshot, transacted_at
            FROM transactions
            WHERE account_id = ?
            ORDER BY transacted_at
            "#,
        )
        .bind(account_id.to_string())
        .fetch_all(&self.pool)
        .await
        .context("Failed to list transactions for account")?;

        rows.iter().map(Self::row_to_transaction).collect()
    }

    // ========================
    // Row mapping
    // ========================

    fn row_to_user(row: &sqlx::sqlite::SqliteRow) -> Result<AccountUser> {
        let created_at_str: String = row.get("created_at");
        Ok(AccountUser {
            id: row.get("id"),
            name: row.get("name"),
            created_at: Self::parse_timestamp(&created_at_str, "created_at")?,
        })
    }

    fn row_to_account(row: &sqlx::sqlite::SqliteRow) -> Result<Account> {
        let id_str: String = row.get("id");
        let status_str: String = row.get("status");
        let created_at_str: String = row.get("created_at");

        Ok(Account {
            id: Uuid::parse_str(&id_str).context("Invalid account ID")?,
            account_number: row.get("account_number"),
            owner_id: row.get("user_id"),
            status: AccountStatus::from_str(&status_str)
                .ok_or_else(|| anyhow::anyhow!("Invalid account status: {}", status_str))?,
            balance_cents: row.get("balance_cents"),
            version: row.get("version"),
            created_at: Self::parse_timestamp(&created_at_str, "created_at")?,
        })
    }

    fn row_to_transaction(row: &sqlx::sqlite::SqliteRow) -> Result<Transaction> {
        let id_str: String = row.get("id");
        let account_id_str: String = row.get("account_id");
        let kind_str: String = row.get("kind");
        let outcome_str: String = row.get("outcome");
        let transacted_at_str: String = row.get("transacted_at");

        Ok(Transaction {
            id: Uuid::parse_str(&id_str).context("Invalid transaction ID")?,
            account_id: Uuid::parse_str(&account_id_str).context("Invalid account ID")?,
            kind: TransactionKind::from_str(&kind_str)
                .ok_or_else(|| anyhow::anyhow!("Invalid transaction kind: {}", kind_str))?,
            outcome: TransactionOutcome::from_str(&outcome_str)
                .ok_or_else(|| anyhow::anyhow!("Invalid transaction outcome: {}", outcome_str))?,
            amount_cents: row.get("amount_cents"),
            balance_snapshot: row.get("balance_snapshot"),
            transacted_at: Self::parse_timestamp(&transacted_at_str, "transacted_at")?,
        })
    }

    fn parse_timestamp(value: &str, column: &str) -> Result<DateTime<Utc>> {
        Ok(DateTime::parse_from_rfc3339(value)
            .with_context(|| format!("Invalid {} timestamp", column))?
            .with_timezone(&Utc))
    }
}
