//! Steps shared by the order, invoice and sale services.

use sqlx::SqliteConnection;

use super::{EngineSettings, Page, ServiceResult};
use crate::repository::document::{DocumentRecord, NewDocument};
use crate::repository::{CustomerRepository, DocumentRepository, ProductRepository, SequenceRepository};
use erp_core::line_items::{price_lines, PricedLines};
use erp_core::numbering::document_number;
use erp_core::validation::{validate_line_items, validate_reference};
use erp_core::{
    CoreError, DocumentChanges, DocumentDraft, DocumentKind, DocumentTotals, LineItem,
    LineItemInput, Product,
};

/// Priced lines plus the products they were priced against.
pub(crate) struct Pricing {
    pub priced: PricedLines,
    pub products: Vec<Product>,
}

impl Pricing {
    pub fn product(&self, id: &str) -> Option<&Product> {
        self.products.iter().find(|p| p.id == id)
    }
}

/// A document row and its lines, not yet written.
pub(crate) struct PreparedDocument {
    pub record: DocumentRecord,
    pub pricing: Pricing,
}

/// Request-level checks that need no database.
pub(crate) fn validate_draft(draft: &DocumentDraft, settings: &EngineSettings) -> ServiceResult<()> {
    validate_reference("customerId", &draft.customer_id)?;
    validate_reference("userId", &draft.user_id)?;
    validate_line_items(&draft.items, settings.max_line_items)?;
    Ok(())
}

pub(crate) async fn ensure_customer(conn: &mut SqliteConnection, id: &str) -> ServiceResult<()> {
    if !CustomerRepository::new(conn).exists(id).await? {
        return Err(CoreError::CustomerNotFound(id.to_string()).into());
    }
    Ok(())
}

/// Loads the products referenced by `items` and prices the lines.
pub(crate) async fn price_items(
    conn: &mut SqliteConnection,
    items: &[LineItemInput],
) -> ServiceResult<Pricing> {
    let ids: Vec<String> = items.iter().map(|i| i.product_id.clone()).collect();
    let products = ProductRepository::new(conn).get_many(&ids).await?;

    let priced = price_lines(items, |id| products.iter().find(|p| p.id == id))?;

    Ok(Pricing { priced, products })
}

/// Checks the customer, prices the lines, computes totals and allocates the
/// next number for `kind`. The caller sets kind-specific fields and then
/// calls [`insert_document`].
pub(crate) async fn prepare_document(
    conn: &mut SqliteConnection,
    kind: DocumentKind,
    draft: &DocumentDraft,
    status: &'static str,
) -> ServiceResult<PreparedDocument> {
    ensure_customer(&mut *conn, &draft.customer_id).await?;

    let pricing = price_items(&mut *conn, &draft.items).await?;
    let totals =
        DocumentTotals::compute(pricing.priced.subtotal, draft.tax_cents, draft.discount_cents)?;

    let seq = SequenceRepository::new(&mut *conn).next_value(kind).await?;

    let record = DocumentRecord::create(NewDocument {
        kind,
        number: document_number(kind, seq),
        customer_id: &draft.customer_id,
        company_id: draft.company_id.as_deref(),
        user_id: &draft.user_id,
        date: draft.date.unwrap_or_else(chrono::Utc::now),
        status,
        totals,
        notes: draft.notes.as_deref(),
    });

    Ok(PreparedDocument { record, pricing })
}

pub(crate) async fn insert_document(
    conn: &mut SqliteConnection,
    prepared: &PreparedDocument,
) -> ServiceResult<Vec<LineItem>> {
    let mut repo = DocumentRepository::new(conn);
    repo.insert_header(&prepared.record).await?;
    let items = repo
        .insert_items(&prepared.record.id, &prepared.pricing.priced.lines)
        .await?;
    Ok(items)
}

/// Loads a document of `kind` or fails with `DocumentNotFound`.
pub(crate) async fn load_document(
    conn: &mut SqliteConnection,
    kind: DocumentKind,
    id: &str,
) -> ServiceResult<DocumentRecord> {
    DocumentRepository::new(conn)
        .get_by_id(kind, id)
        .await?
        .ok_or_else(|| CoreError::document_not_found(kind, id).into())
}

/// Result of applying [`DocumentChanges`] to a record.
pub(crate) struct AppliedChanges {
    /// Present when the request replaced the lines.
    pub replaced: Option<(Vec<LineItem>, Pricing)>,
}

/// Applies the shared header edits to `record`. Replaces the lines when
/// `items` is present and recomputes totals whenever items, tax or discount
/// changed. The header itself is not written.
pub(crate) async fn apply_changes(
    conn: &mut SqliteConnection,
    record: &mut DocumentRecord,
    changes: &DocumentChanges,
    settings: &EngineSettings,
) -> ServiceResult<AppliedChanges> {
    if let Some(customer_id) = &changes.customer_id {
        validate_reference("customerId", customer_id)?;
        if customer_id != &record.customer_id {
            ensure_customer(&mut *conn, customer_id).await?;
            record.customer_id = customer_id.clone();
        }
    }
    if let Some(company_id) = &changes.company_id {
        record.company_id = Some(company_id.clone());
    }
    if let Some(date) = changes.date {
        record.date = date;
    }
    if let Some(notes) = &changes.notes {
        record.notes = Some(notes.clone());
    }

    let mut replaced = None;
    let mut new_subtotal = None;

    if let Some(items) = &changes.items {
        validate_line_items(items, settings.max_line_items)?;
        let pricing = price_items(&mut *conn, items).await?;
        let stored = DocumentRepository::new(&mut *conn)
            .replace_items(&record.id, &pricing.priced.lines)
            .await?;
        new_subtotal = Some(pricing.priced.subtotal);
        replaced = Some((stored, pricing));
    }

    if changes.touches_totals() {
        let totals =
            record
                .totals()
                .recompute(new_subtotal, changes.tax_cents, changes.discount_cents)?;
        record.set_totals(&totals);
    }

    Ok(AppliedChanges { replaced })
}

/// Pages through documents of `kind`, turning each record into a DTO with
/// `build`.
pub(crate) async fn list_documents<T, F>(
    conn: &mut SqliteConnection,
    kind: DocumentKind,
    limit: u32,
    offset: u32,
    mut build: F,
) -> ServiceResult<Page<T>>
where
    F: FnMut(DocumentRecord, Vec<LineItem>) -> ServiceResult<T>,
{
    let mut repo = DocumentRepository::new(conn);
    let total = repo.count(kind).await?;
    let records = repo.list(kind, limit, offset).await?;

    let mut items = Vec::with_capacity(records.len());
    for record in records {
        let lines = repo.get_items(&record.id).await?;
        items.push(build(record, lines)?);
    }

    Ok(Page {
        items,
        total,
        limit,
        offset,
    })
}
