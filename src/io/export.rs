use std::collections::HashMap;
use std::io::Write;

use anyhow::Result;

use crate::application::TransactionService;
use crate::domain::AccountId;

/// Exporter for the transaction audit trail.
pub struct Exporter<'a> {
    service: &'a TransactionService,
}

impl<'a> Exporter<'a> {
    pub fn new(service: &'a TransactionService) -> Self {
        Self { service }
    }

    /// Export audit records to CSV, one row per attempted operation.
    /// Returns the number of rows written.
    pub async fn export_transactions_csv<W: Write>(
        &self,
        writer: W,
        account_number: Option<&str>,
    ) -> Result<usize> {
        let transactions = self.service.list_transactions(account_number).await?;
        let mut csv_writer = csv::Writer::from_writer(writer);

        csv_writer.write_record([
            "id",
            "account_number",
            "kind",
            "outcome",
            "amount_cents",
            "balance_snapshot",
            "transacted_at",
        ])?;

        // Account numbers are resolved once per account, not per row
        let mut numbers: HashMap<AccountId, String> = HashMap::new();

        let mut count = 0;
        for tx in &transactions {
            let number = match numbers.get(&tx.account_id) {
                Some(number) => number.clone(),
                None => {
                    let number = self.service.get_account_number(tx.account_id).await?;
                    numbers.insert(tx.account_id, number.clone());
                    number
                }
            };

            csv_writer.write_record([
                tx.id.to_string(),
                number,
                tx.kind.to_string(),
                tx.outcome.to_string(),
                tx.amount_cents.to_string(),
                tx.balance_snapshot.to_string(),
                tx.transacted_at.to_rfc3339(),
            ])?;
            count += 1;
        }

        csv_writer.flush()?;
        Ok(count)
    }
}
