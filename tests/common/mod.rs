// Each test file compiles this module separately, so helpers unused by one
// file would otherwise warn
#![allow(dead_code)]

use anyhow::Result;
use tally::application::TransactionService;
use tally::domain::{Account, AccountUser, Cents};
use tally::Repository;
use tempfile::TempDir;

/// Helper to create a test service with a temporary database
pub async fn test_service() -> Result<(TransactionService, TempDir)> {
    let temp_dir = TempDir::new()?;
    let db_path = temp_dir.path().join("test.db");
    let service = TransactionService::init(db_path.to_str().unwrap()).await?;
    Ok((service, temp_dir))
}

/// Like `test_service`, but also hands back a raw repository on the same
/// database for tests that need to plant rows the service would not write
/// (backdated transactions, unregistered accounts).
pub async fn test_env() -> Result<(TransactionService, Repository, TempDir)> {
    let temp_dir = TempDir::new()?;
    let db_path = temp_dir.path().join("test.db");
    let db_url = format!("sqlite:{}?mode=rwc", db_path.to_str().unwrap());
    let repo = Repository::init(&db_url).await?;
    let service = TransactionService::new(Repository::connect(&db_url).await?);
    Ok((service, repo, temp_dir))
}

/// A seeded owner and account ready for balance operations
pub struct Seeded {
    pub user: AccountUser,
    pub account: Account,
}

pub const ACCOUNT_NUMBER: &str = "1000000012";

/// Register a user named Pobi owning one active account with the given balance
pub async fn seed_account(service: &TransactionService, balance: Cents) -> Result<Seeded> {
    let user = service.create_user("Pobi").await?;
    let account = service
        .create_account(ACCOUNT_NUMBER, user.id, balance)
        .await?;
    Ok(Seeded { user, account })
}
