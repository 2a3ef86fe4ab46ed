mod common;

use anyhow::Result;
use common::{seed_account, test_service, ACCOUNT_NUMBER};
use tally::application::AppError;
use tally::domain::{TransactionKind, TransactionOutcome};
use tally::io::Exporter;
use uuid::Uuid;

#[tokio::test]
async fn test_query_is_idempotent() -> Result<()> {
    let (service, _temp) = test_service().await?;
    let seeded = seed_account(&service, 10_000).await?;

    let receipt = service
        .use_balance(seeded.user.id, ACCOUNT_NUMBER, 1_000)
        .await?;

    let first = service.query_transaction(receipt.transaction_id).await?;
    let second = service.query_transaction(receipt.transaction_id).await?;

    assert_eq!(first.transaction_id, receipt.transaction_id);
    assert_eq!(first.kind, TransactionKind::Use);
    assert_eq!(first.outcome, TransactionOutcome::Success);
    assert_eq!(first.amount_cents, 1_000);

    assert_eq!(second.transaction_id, first.transaction_id);
    assert_eq!(second.kind, first.kind);
    assert_eq!(second.outcome, first.outcome);
    assert_eq!(second.amount_cents, first.amount_cents);

    Ok(())
}

#[tokio::test]
async fn test_query_unknown_transaction_always_fails() -> Result<()> {
    let (service, _temp) = test_service().await?;
    let unknown = Uuid::new_v4();

    for _ in 0..2 {
        let err = service.query_transaction(unknown).await.unwrap_err();
        assert!(matches!(err, AppError::TransactionNotFound(_)));
    }

    Ok(())
}

#[tokio::test]
async fn test_failed_attempts_are_queryable() -> Result<()> {
    let (service, _temp) = test_service().await?;
    let seeded = seed_account(&service, 500).await?;

    let _ = service
        .use_balance(seeded.user.id, ACCOUNT_NUMBER, 1_000)
        .await
        .unwrap_err();

    let transactions = service.list_transactions(Some(ACCOUNT_NUMBER)).await?;
    assert_eq!(transactions.len(), 1);

    let view = service.query_transaction(transactions[0].id).await?;
    assert_eq!(view.outcome, TransactionOutcome::Failure);
    assert_eq!(view.amount_cents, 1_000);

    Ok(())
}

#[tokio::test]
async fn test_export_audit_trail_csv() -> Result<()> {
    let (service, _temp) = test_service().await?;
    let seeded = seed_account(&service, 10_000).await?;

    let receipt = service
        .use_balance(seeded.user.id, ACCOUNT_NUMBER, 1_000)
        .await?;
    service
        .cancel_balance(receipt.transaction_id, ACCOUNT_NUMBER, 1_000)
        .await?;

    let mut buffer = Vec::new();
    let exporter = Exporter::new(&service);
    let count = exporter
        .export_transactions_csv(&mut buffer, Some(ACCOUNT_NUMBER))
        .await?;
    assert_eq!(count, 2);

    let output = String::from_utf8(buffer)?;
    let lines: Vec<&str> = output.lines().collect();
    assert_eq!(lines.len(), 3); // header + 2 records
    assert!(lines[0].starts_with("id,account_number,kind,outcome"));
    assert!(lines[1].contains(ACCOUNT_NUMBER));
    assert!(lines[1].contains("use,success"));
    assert!(lines[2].contains("cancel,success"));

    Ok(())
}
