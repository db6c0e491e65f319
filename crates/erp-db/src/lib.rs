//! # erp-db: Persistence and Services for Ledgerline ERP
//!
//! SQLite storage for the financial-state engine, plus the transactional
//! services that run erp-core's rules against it.
//!
//! ## Architecture Position
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                      Ledgerline ERP Data Flow                           │
//! │                                                                         │
//! │  REST controller (POST /invoices/:id/payments)                         │
//! │       │                                                                 │
//! │       ▼                                                                 │
//! │  ┌─────────────────────────────────────────────────────────────────┐   │
//! │  │                     erp-db (THIS CRATE)                         │   │
//! │  │                                                                 │   │
//! │  │   ┌───────────────┐    ┌───────────────┐    ┌──────────────┐  │   │
//! │  │   │   Services    │    │ Repositories  │    │  Migrations  │  │   │
//! │  │   │ (service/)    │    │ (repository/) │    │  (embedded)  │  │   │
//! │  │   │               │    │               │    │              │  │   │
//! │  │   │ Erp facade    │───►│ DocumentRepo  │    │ 001_initial  │  │   │
//! │  │   │ one tx / call │    │ PaymentRepo   │    │              │  │   │
//! │  │   │ erp-core math │    │ ProductRepo   │    │              │  │   │
//! │  │   └───────────────┘    └───────────────┘    └──────────────┘  │   │
//! │  │          │                                                      │   │
//! │  │   ┌──────┴────────┐    ┌───────────────┐    ┌──────────────┐  │   │
//! │  │   │   Database    │    │   ErpConfig   │    │  telemetry   │  │   │
//! │  │   │   (pool.rs)   │    │  (config.rs)  │    │  (tracing)   │  │   │
//! │  │   └───────────────┘    └───────────────┘    └──────────────┘  │   │
//! │  └─────────────────────────────────────────────────────────────────┘   │
//! │       │                                                                 │
//! │       ▼                                                                 │
//! │  ┌─────────────────────────────────────────────────────────────────┐   │
//! │  │                     SQLite Database (erp.db)                    │   │
//! │  └─────────────────────────────────────────────────────────────────┘   │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! ## Module Organization
//!
//! - [`pool`] - Connection pool creation and configuration
//! - [`migrations`] - Embedded database migrations
//! - [`error`] - Database error types
//! - [`repository`] - Table-level SQL
//! - [`service`] - Transactional operations and the [`Erp`] facade
//! - [`config`] - Environment configuration
//! - [`telemetry`] - Tracing subscriber setup
//!
//! ## Usage
//!
//! ```rust,ignore
//! use erp_db::{Erp, ErpConfig};
//!
//! let config = ErpConfig::load()?;
//! erp_db::telemetry::init_tracing(config.log_format);
//!
//! let erp = Erp::connect(&config).await?;
//! let invoice = erp.invoices().create(new_invoice).await?;
//! let payment = erp.payments().create(new_payment).await?;
//! ```

// =============================================================================
// Module Declarations
// =============================================================================

pub mod config;
pub mod error;
pub mod migrations;
pub mod pool;
pub mod repository;
pub mod service;
pub mod telemetry;

// =============================================================================
// Re-exports
// =============================================================================

pub use config::{ConfigError, ErpConfig, LogFormat};
pub use error::{DbError, DbResult};
pub use pool::{Database, DbConfig};
pub use service::api_error::{ApiError, ErrorCode};
pub use service::{EngineSettings, Erp, ServiceError, ServiceResult};

// Repository re-exports for convenience
pub use repository::{
    CustomerRepository, DocumentRepository, PaymentRepository, ProductRepository,
    SequenceRepository,
};

// =============================================================================
// Test Fixtures
// =============================================================================

#[cfg(test)]
pub(crate) mod testing {
    use chrono::Utc;

    use crate::pool::{Database, DbConfig};
    use crate::repository::generate_id;
    use erp_core::{Customer, Payment, PaymentMethod, PaymentStatus, Product};

    /// Fresh in-memory database with migrations applied.
    pub async fn memory_db() -> Database {
        Database::new(DbConfig::in_memory())
            .await
            .expect("in-memory database")
    }

    pub fn product_fixture(sku: &str, price_cents: i64, quantity: i64) -> Product {
        let now = Utc::now();
        Product {
            id: generate_id(),
            sku: sku.to_string(),
            name: format!("Product {}", sku),
            description: None,
            price_cents,
            cost_cents: None,
            quantity,
            min_stock: 0,
            is_active: true,
            created_at: now,
            updated_at: now,
            version: 0,
        }
    }

    pub fn customer_fixture(email: &str) -> Customer {
        let now = Utc::now();
        Customer {
            id: generate_id(),
            name: format!("Customer {}", email),
            email: email.to_string(),
            phone: None,
            address: None,
            company_id: None,
            created_at: now,
            updated_at: now,
        }
    }

    pub fn payment_fixture(invoice_id: &str, amount_cents: i64, status: PaymentStatus) -> Payment {
        let now = Utc::now();
        Payment {
            id: generate_id(),
            invoice_id: invoice_id.to_string(),
            amount_cents,
            payment_date: now,
            method: PaymentMethod::BankTransfer,
            reference: None,
            status,
            notes: None,
            created_at: now,
            updated_at: now,
        }
    }
}
