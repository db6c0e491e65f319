//! # Repository Module
//!
//! SQL for each table, behind a typed API.
//!
//! ## Repository Pattern
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                    Repositories Borrow a Connection                     │
//! │                                                                         │
//! │  Service operation                                                     │
//! │       │                                                                 │
//! │       │  let mut tx = db.begin().await?;                               │
//! │       ▼                                                                 │
//! │  ProductRepository::new(&mut tx).get_by_id(id)                         │
//! │  DocumentRepository::new(&mut tx).insert_header(&record)               │
//! │  PaymentRepository::new(&mut tx).insert(&payment)                      │
//! │       │                                                                 │
//! │       │  tx.commit().await?;                                           │
//! │       ▼                                                                 │
//! │  SQLite Database                                                       │
//! │                                                                         │
//! │  Every repository takes `&mut SqliteConnection`, so the same code      │
//! │  runs on a pooled connection or inside a transaction. Dropping the     │
//! │  transaction without commit rolls every write back.                    │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! ## Available Repositories
//!
//! - [`ProductRepository`] - Product CRUD and stock adjustments
//! - [`CustomerRepository`] - Customer lookup and creation
//! - [`DocumentRepository`] - Order/invoice/sale headers and line items
//! - [`PaymentRepository`] - Invoice payments
//! - [`SequenceRepository`] - Per-kind document counters

pub mod customer;
pub mod document;
pub mod payment;
pub mod product;
pub mod sequence;

pub use customer::CustomerRepository;
pub use document::{DocumentRecord, DocumentRepository};
pub use payment::PaymentRepository;
pub use product::ProductRepository;
pub use sequence::SequenceRepository;

/// Generates a new entity ID (UUID v4).
pub fn generate_id() -> String {
    uuid::Uuid::new_v4().to_string()
}
