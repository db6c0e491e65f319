//! # erp-admin
//!
//! Database maintenance for a Ledgerline ERP deployment.
//!
//! ## Usage
//! ```bash
//! # Apply pending migrations
//! cargo run -p erp-db --bin erp-admin -- migrate
//!
//! # Show migration and row counts
//! cargo run -p erp-db --bin erp-admin -- status
//!
//! # Verify document numbers and every invoice's paid amount
//! cargo run -p erp-db --bin erp-admin -- check --db ./data/erp.db
//! ```
//!
//! Configuration comes from the `ERP_*` environment variables (see
//! `erp_db::config`); `--db` overrides `ERP_DATABASE_PATH`.

use std::env;
use std::path::PathBuf;
use std::process::ExitCode;

use erp_core::numbering::parse_document_number;
use erp_core::{DocumentKind, Money};
use erp_db::repository::{DocumentRecord, DocumentRepository};
use erp_db::{Database, ErpConfig, PaymentRepository, ProductRepository, SequenceRepository};
use sqlx::SqliteConnection;
use tracing::{error, info, warn};

/// Documents are checked in pages of this size.
const CHECK_BATCH: u32 = 200;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Command {
    Migrate,
    Status,
    Check,
}

fn print_help() {
    println!("Ledgerline ERP admin");
    println!();
    println!("Usage: erp-admin <COMMAND> [OPTIONS]");
    println!();
    println!("Commands:");
    println!("  migrate            Apply pending migrations");
    println!("  status             Show migration state and row counts");
    println!("  check              Verify document numbers and invoice balances");
    println!();
    println!("Options:");
    println!("  -d, --db <PATH>    Database file (overrides ERP_DATABASE_PATH)");
    println!("  -h, --help         Show this help message");
}

/// `Ok(None)` means help was requested.
fn parse_args(args: &[String], config: &mut ErpConfig) -> Result<Option<Command>, String> {
    let mut command = None;
    let mut args = args.iter();

    while let Some(arg) = args.next() {
        match arg.as_str() {
            "migrate" => command = Some(Command::Migrate),
            "status" => command = Some(Command::Status),
            "check" => command = Some(Command::Check),
            "--db" | "-d" => {
                let path = args
                    .next()
                    .ok_or_else(|| format!("Missing value for {}", arg))?;
                config.database_path = PathBuf::from(path);
            }
            "--help" | "-h" => return Ok(None),
            other => return Err(format!("Unknown argument: {}", other)),
        }
    }

    command.map(Some).ok_or_else(|| "No command given".to_string())
}

#[tokio::main]
async fn main() -> ExitCode {
    let mut config = match ErpConfig::load() {
        Ok(config) => config,
        Err(e) => {
            eprintln!("Invalid configuration: {}", e);
            return ExitCode::FAILURE;
        }
    };

    let args: Vec<String> = env::args().skip(1).collect();
    let command = match parse_args(&args, &mut config) {
        Ok(Some(command)) => command,
        Ok(None) => {
            print_help();
            return ExitCode::SUCCESS;
        }
        Err(message) => {
            eprintln!("{}", message);
            print_help();
            return ExitCode::FAILURE;
        }
    };

    erp_db::telemetry::init_tracing(config.log_format);

    // `migrate` must not depend on ERP_RUN_MIGRATIONS
    let db_config = config
        .db_config()
        .run_migrations(command == Command::Migrate);

    let db = match Database::new(db_config).await {
        Ok(db) => db,
        Err(e) => {
            error!(error = %e, path = %config.database_path.display(), "Cannot open database");
            return ExitCode::FAILURE;
        }
    };

    let result = match command {
        Command::Migrate | Command::Status => status(&db).await,
        Command::Check => check(&db).await,
    };

    db.close().await;

    match result {
        Ok(true) => ExitCode::SUCCESS,
        Ok(false) => ExitCode::FAILURE,
        Err(e) => {
            error!(error = %e, "Command failed");
            ExitCode::FAILURE
        }
    }
}

async fn status(db: &Database) -> erp_db::DbResult<bool> {
    let (embedded, applied) = db.migration_status().await?;
    println!("Migrations: {}/{} applied", applied, embedded);

    if applied < embedded {
        warn!(pending = embedded - applied, "Migrations pending, run `erp-admin migrate`");
        return Ok(false);
    }

    let mut conn = db.pool().acquire().await?;
    let products = ProductRepository::new(&mut conn).count().await?;
    println!("Active products: {}", products);

    for kind in DocumentKind::ALL {
        let count = DocumentRepository::new(&mut conn).count(kind).await?;
        let issued = SequenceRepository::new(&mut conn).current_value(kind).await?;
        println!("{}s: {} (last number issued: {})", kind, count, issued);
    }

    Ok(true)
}

/// Checks every document number against its kind and counter, and
/// recomputes invoice paid amounts from their payments.
async fn check(db: &Database) -> erp_db::DbResult<bool> {
    let mut conn = db.pool().acquire().await?;

    let mut checked = 0;
    let mut problems = 0;

    for kind in DocumentKind::ALL {
        let issued = SequenceRepository::new(&mut conn).current_value(kind).await?;
        let mut offset = 0;

        loop {
            let records = DocumentRepository::new(&mut conn)
                .list(kind, CHECK_BATCH, offset)
                .await?;
            if records.is_empty() {
                break;
            }

            for record in &records {
                checked += 1;
                if !number_is_valid(kind, &record.number, issued) {
                    problems += 1;
                    warn!(kind = %kind, number = %record.number, issued = issued, "Invalid document number");
                }
                if kind == DocumentKind::Invoice && !invoice_is_balanced(&mut conn, record).await? {
                    problems += 1;
                }
            }

            offset += CHECK_BATCH;
        }
    }

    info!(checked = checked, problems = problems, "Document check complete");
    println!("Checked {} documents, {} problems", checked, problems);
    Ok(problems == 0)
}

/// The number parses, carries the prefix of `kind` and was handed out by
/// its counter.
fn number_is_valid(kind: DocumentKind, number: &str, issued: i64) -> bool {
    match parse_document_number(number) {
        Ok((parsed, seq)) => parsed == kind && seq <= issued,
        Err(_) => false,
    }
}

async fn invoice_is_balanced(
    conn: &mut SqliteConnection,
    record: &DocumentRecord,
) -> erp_db::DbResult<bool> {
    let stored = record.invoice_balance()?;
    let paid = PaymentRepository::new(conn)
        .sum_active_for_invoice(&record.id)
        .await?;

    if stored.paid != Money::from_cents(paid) || !stored.is_consistent() {
        warn!(
            invoice = %record.number,
            stored_paid = stored.paid.cents(),
            payments = paid,
            balance = stored.balance.cents(),
            total = stored.total.cents(),
            "Invoice out of balance"
        );
        return Ok(false);
    }
    Ok(true)
}
