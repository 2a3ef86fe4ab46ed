use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use uuid::Uuid;

use crate::application::TransactionService;
use crate::domain::{format_cents, parse_cents, Transaction, TransactionId};
use crate::io::Exporter;

/// Tally - account transaction ledger
#[derive(Parser)]
#[command(name = "tally")]
#[command(about = "Validates and records balance transactions against user accounts")]
#[command(version)]
pub struct Cli {
    /// Database file path
    #[arg(short, long, default_value = "tally.db")]
    pub database: String,

    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand)]
pub enum Commands {
    /// Initialize a new database
    Init,

    /// User management commands
    #[command(subcommand)]
    User(UserCommands),

    /// Account management commands
    #[command(subcommand)]
    Account(AccountCommands),

    /// Use (debit) balance from an account
    Use {
        /// Amount to use (e.g., "50.00" or "50")
        amount: String,

        /// Account number to debit
        #[arg(long)]
        account: String,

        /// Id of the requesting user (must own the account)
        #[arg(long)]
        user: i64,
    },

    /// Cancel a prior use transaction in full
    Cancel {
        /// Transaction ID of the use to cancel
        id: String,

        /// Amount of the original transaction (must match exactly)
        amount: String,

        /// Account number the transaction belongs to
        #[arg(long)]
        account: String,
    },

    /// Show a recorded transaction
    Show {
        /// Transaction ID
        id: String,

        /// Print the view as JSON
        #[arg(long)]
        json: bool,
    },

    /// Show an account's balance and status
    Balance {
        /// Account number
        account: String,
    },

    /// List recorded transactions
    Transactions {
        /// Filter by account number
        #[arg(long)]
        account: Option<String>,
    },

    /// Export the audit trail as CSV to stdout
    Export {
        /// Filter by account number
        #[arg(long)]
        account: Option<String>,
    },
}

#[derive(Subcommand)]
pub enum UserCommands {
    /// Register a new user
    Add {
        /// Display name
        name: String,
    },
}

#[derive(Subcommand)]
pub enum AccountCommands {
    /// Open a new account for an existing user
    Add {
        /// Account number (unique)
        number: String,

        /// Owning user id
        #[arg(long)]
        owner: i64,

        /// Initial balance (e.g., "100.00"), defaults to zero
        #[arg(long, default_value = "0")]
        balance: String,
    },
}

impl Cli {
    pub async fn run(self) -> Result<()> {
        match self.command {
            Commands::Init => {
                TransactionService::init(&self.database).await?;
                println!("Database initialized: {}", self.database);
            }

            Commands::User(user_cmd) => {
                let service = TransactionService::connect(&self.database).await?;
                run_user_command(&service, user_cmd).await?;
            }

            Commands::Account(account_cmd) => {
                let service = TransactionService::connect(&self.database).await?;
                run_account_command(&service, account_cmd).await?;
            }

            Commands::Use {
                amount,
                account,
                user,
            } => {
                let service = TransactionService::connect(&self.database).await?;
                let amount_cents =
                    parse_cents(&amount).context("Invalid amount format. Use '50.00' or '50'")?;

                let receipt = service.use_balance(user, &account, amount_cents).await?;
                println!(
                    "Used {} from account {} (transaction {}, balance {})",
                    format_cents(receipt.amount_cents),
                    receipt.account_number,
                    receipt.transaction_id,
                    format_cents(receipt.balance_snapshot)
                );
            }

            Commands::Cancel {
                id,
                amount,
                account,
            } => {
                let service = TransactionService::connect(&self.database).await?;
                let transaction_id = parse_transaction_id(&id)?;
                let amount_cents =
                    parse_cents(&amount).context("Invalid amount format. Use '50.00' or '50'")?;

                let receipt = service
                    .cancel_balance(transaction_id, &account, amount_cents)
                    .await?;
                println!(
                    "Cancelled {} back to account {} (transaction {}, balance {})",
                    format_cents(receipt.amount_cents),
                    receipt.account_number,
                    receipt.transaction_id,
                    format_cents(receipt.balance_snapshot)
                );
            }

            Commands::Show { id, json } => {
                let service = TransactionService::connect(&self.database).await?;
                let transaction_id = parse_transaction_id(&id)?;
                let view = service.query_transaction(transaction_id).await?;

                if json {
                    println!("{}", serde_json::to_string_pretty(&view)?);
                } else {
                    println!(
                        "{} {} {} {}",
                        view.transaction_id,
                        view.kind,
                        view.outcome,
                        format_cents(view.amount_cents)
                    );
                }
            }

            Commands::Balance { account } => {
                let service = TransactionService::connect(&self.database).await?;
                let account = service.get_account(&account).await?;
                println!(
                    "{}: {} ({})",
                    account.account_number,
                    format_cents(account.balance_cents),
                    account.status
                );
            }

            Commands::Transactions { account } => {
                let service = TransactionService::connect(&self.database).await?;
                let transactions = service.list_transactions(account.as_deref()).await?;
                print_transactions(&transactions);
            }

            Commands::Export { account } => {
                let service = TransactionService::connect(&self.database).await?;
                let exporter = Exporter::new(&service);
                let count = exporter
                    .export_transactions_csv(std::io::stdout(), account.as_deref())
                    .await?;
                eprintln!("Exported {} transaction(s)", count);
            }
        }

        Ok(())
    }
}

async fn run_user_command(service: &TransactionService, command: UserCommands) -> Result<()> {
    match command {
        UserCommands::Add { name } => {
            let user = service.create_user(&name).await?;
            println!("Registered user {} (id {})", user.name, user.id);
        }
    }
    Ok(())
}

async fn run_account_command(service: &TransactionService, command: AccountCommands) -> Result<()> {
    match command {
        AccountCommands::Add {
            number,
            owner,
            balance,
        } => {
            let balance_cents = parse_cents(&balance)
                .context("Invalid balance format. Use '100.00' or '100'")?;
            let account = service.create_account(&number, owner, balance_cents).await?;
            println!(
                "Opened account {} for user {} with balance {}",
                account.account_number,
                account.owner_id,
                format_cents(account.balance_cents)
            );
        }
    }
    Ok(())
}

fn parse_transaction_id(id: &str) -> Result<TransactionId> {
    Uuid::parse_str(id).with_context(|| format!("Invalid transaction ID '{}'", id))
}

fn print_transactions(transactions: &[Transaction]) {
    if transactions.is_empty() {
        println!("No transactions recorded");
        return;
    }

    for tx in transactions {
        println!(
            "{}  {}  {:7}  {:7}  {:>12}  balance {}",
            tx.transacted_at.format("%Y-%m-%d %H:%M:%S"),
            tx.id,
            tx.kind.to_string(),
            tx.outcome.to_string(),
            format_cents(tx.amount_cents),
            format_cents(tx.balance_snapshot)
        );
    }
}
