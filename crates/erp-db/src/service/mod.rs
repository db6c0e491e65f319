//! # Services
//!
//! The operations a controller layer calls. Each one runs in a single
//! transaction: line-item replacement together with the new totals, a
//! payment write together with its invoice, sale lines together with the
//! stock they move, a sequence increment together with the document insert.
//! Any error drops the transaction and nothing is written.
//!
//! ## Request Flow
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │  erp.payments().create(NewPayment { invoice_id, amount_cents: 10500 })  │
//! │       │                                                                 │
//! │       ▼                                                                 │
//! │  validate input (erp-core validation)                                  │
//! │       │                                                                 │
//! │       ▼                                                                 │
//! │  BEGIN                                                                  │
//! │  ├── DocumentRepository::get_by_id(Invoice, id)                        │
//! │  ├── InvoiceBalance::apply(amount)      ← erp-core, pure               │
//! │  ├── PaymentRepository::insert(payment)                                │
//! │  └── DocumentRepository::update_invoice_balance(id, version, balance)  │
//! │  COMMIT                                                                 │
//! │       │                                                                 │
//! │       ▼                                                                 │
//! │  Ok(PaymentReceipt)  /  Err(ServiceError) → ApiError                   │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```

pub mod api_error;
pub mod customer;
mod documents;
pub mod invoice;
pub mod order;
pub mod payment;
pub mod product;
pub mod sale;

use serde::Serialize;
use thiserror::Error;

use crate::config::ErpConfig;
use crate::error::DbError;
use crate::pool::Database;
use erp_core::{CoreError, ErrorKind, StockPolicy, MAX_LINE_ITEMS};

pub use customer::CustomerService;
pub use invoice::InvoiceService;
pub use order::OrderService;
pub use payment::{InvoiceSettlement, PaymentReceipt, PaymentService};
pub use product::ProductService;
pub use sale::SaleService;

// =============================================================================
// Settings
// =============================================================================

/// Business settings that are not part of the stored data.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct EngineSettings {
    /// Lines allowed per document.
    pub max_line_items: usize,
    pub stock_policy: StockPolicy,
}

impl Default for EngineSettings {
    fn default() -> Self {
        EngineSettings {
            max_line_items: MAX_LINE_ITEMS,
            stock_policy: StockPolicy::default(),
        }
    }
}

// =============================================================================
// Errors
// =============================================================================

/// Failure of a service operation.
#[derive(Debug, Error)]
pub enum ServiceError {
    #[error(transparent)]
    Core(#[from] CoreError),

    #[error(transparent)]
    Db(#[from] DbError),
}

impl ServiceError {
    /// Classification for the caller. `None` means an internal failure the
    /// caller cannot fix by changing the request.
    pub fn kind(&self) -> Option<ErrorKind> {
        match self {
            ServiceError::Core(e) => Some(e.kind()),
            ServiceError::Db(e) => match e {
                DbError::NotFound { .. } => Some(ErrorKind::NotFound),
                DbError::UniqueViolation { .. } | DbError::Conflict { .. } => {
                    Some(ErrorKind::Conflict)
                }
                DbError::ForeignKeyViolation { .. } => Some(ErrorKind::InvalidOperation),
                _ => None,
            },
        }
    }
}

impl From<erp_core::ValidationError> for ServiceError {
    fn from(err: erp_core::ValidationError) -> Self {
        ServiceError::Core(CoreError::Validation(err))
    }
}

impl From<sqlx::Error> for ServiceError {
    fn from(err: sqlx::Error) -> Self {
        ServiceError::Db(err.into())
    }
}

pub type ServiceResult<T> = Result<T, ServiceError>;

// =============================================================================
// Paging
// =============================================================================

/// One page of a list operation.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Page<T> {
    pub items: Vec<T>,
    /// Rows matching the query, across all pages.
    pub total: i64,
    pub limit: u32,
    pub offset: u32,
}

// =============================================================================
// Facade
// =============================================================================

/// Entry point for the controller layer.
///
/// ## Usage
/// ```rust,ignore
/// let erp = Erp::connect(&ErpConfig::load()?).await?;
/// let order = erp.orders().create(new_order).await?;
/// ```
#[derive(Debug, Clone)]
pub struct Erp {
    db: Database,
    settings: EngineSettings,
}

impl Erp {
    pub fn new(db: Database, settings: EngineSettings) -> Self {
        Erp { db, settings }
    }

    /// Opens the database described by `config` (running migrations if
    /// enabled) and applies its engine settings.
    pub async fn connect(config: &ErpConfig) -> ServiceResult<Self> {
        let db = Database::new(config.db_config()).await?;
        Ok(Erp::new(db, config.engine_settings()))
    }

    pub fn database(&self) -> &Database {
        &self.db
    }

    pub fn settings(&self) -> EngineSettings {
        self.settings
    }

    pub fn orders(&self) -> OrderService<'_> {
        OrderService::new(&self.db, self.settings)
    }

    pub fn invoices(&self) -> InvoiceService<'_> {
        InvoiceService::new(&self.db, self.settings)
    }

    pub fn sales(&self) -> SaleService<'_> {
        SaleService::new(&self.db, self.settings)
    }

    pub fn payments(&self) -> PaymentService<'_> {
        PaymentService::new(&self.db)
    }

    pub fn products(&self) -> ProductService<'_> {
        ProductService::new(&self.db)
    }

    pub fn customers(&self) -> CustomerService<'_> {
        CustomerService::new(&self.db)
    }
}

#[cfg(test)]
pub(crate) mod tests_support {
    use super::{EngineSettings, Erp};
    use crate::repository::{CustomerRepository, ProductRepository};
    use crate::testing::{customer_fixture, memory_db, product_fixture};
    use erp_core::{LineItemInput, StockPolicy};

    /// Ids seeded by [`erp_with_catalog`].
    pub struct Catalog {
        pub customer_id: String,
        /// 10 on hand, price 50.00
        pub widget: String,
        /// 5 on hand, price 1.99
        pub gadget: String,
    }

    pub async fn erp_with_catalog() -> (Erp, Catalog) {
        erp_with_policy(StockPolicy::AllowNegative).await
    }

    pub async fn erp_with_policy(stock_policy: StockPolicy) -> (Erp, Catalog) {
        let db = memory_db().await;

        let customer = customer_fixture("buyer@acme.io");
        let widget = product_fixture("WIDGET", 5000, 10);
        let gadget = product_fixture("GADGET", 199, 5);
        {
            let mut conn = db.pool().acquire().await.unwrap();
            CustomerRepository::new(&mut conn).insert(&customer).await.unwrap();
            let mut products = ProductRepository::new(&mut conn);
            products.insert(&widget).await.unwrap();
            products.insert(&gadget).await.unwrap();
        }

        let settings = EngineSettings {
            stock_policy,
            ..EngineSettings::default()
        };
        let catalog = Catalog {
            customer_id: customer.id,
            widget: widget.id,
            gadget: gadget.id,
        };
        (Erp::new(db, settings), catalog)
    }

    pub fn line(product_id: &str, quantity: i64, unit_price_cents: i64) -> LineItemInput {
        LineItemInput::new(product_id, quantity, unit_price_cents)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use erp_core::{Money, ValidationError};

    #[test]
    fn test_error_kinds() {
        let err: ServiceError = CoreError::Overpayment {
            requested: Money::from_cents(100),
            balance: Money::zero(),
        }
        .into();
        assert_eq!(err.kind(), Some(ErrorKind::InvalidOperation));

        let err: ServiceError = DbError::conflict("Invoice", "i1").into();
        assert_eq!(err.kind(), Some(ErrorKind::Conflict));

        let err: ServiceError = DbError::duplicate("customers.email", "a@b.co").into();
        assert_eq!(err.kind(), Some(ErrorKind::Conflict));

        let err: ServiceError = ValidationError::required("items").into();
        assert_eq!(err.kind(), Some(ErrorKind::Validation));

        let err: ServiceError = DbError::PoolExhausted.into();
        assert_eq!(err.kind(), None);
    }

    #[test]
    fn test_default_settings() {
        let settings = EngineSettings::default();
        assert_eq!(settings.max_line_items, MAX_LINE_ITEMS);
        assert_eq!(settings.stock_policy, StockPolicy::AllowNegative);
    }
}
