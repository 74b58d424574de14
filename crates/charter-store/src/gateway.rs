//! The record persistence boundary.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use charter_core::{
    DocumentId, DocumentRecord, InvoiceId, InvoiceRecord, ObjectRef, PaymentId, PaymentRecord,
};

use crate::StoreError;

/// Derived index entry for a stored rendering, kept alongside documents so
/// stored objects can be traced back to their document.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FileEntry {
    pub object_ref: ObjectRef,
    pub document_id: DocumentId,
    pub content_type: String,
    pub size_bytes: u64,
    pub created_at: DateTime<Utc>,
}

/// Typed access to the four record collections.
///
/// Inserts reject duplicate ids (and duplicate share tokens or invoice
/// numbers) with [`StoreError::Constraint`]. Updates and deletes of missing
/// records return [`StoreError::NotFound`]. Lookups return `Ok(None)` for
/// missing records.
#[async_trait]
pub trait RecordStore: Send + Sync {
    // ── Documents ──

    async fn insert_document(&self, record: DocumentRecord) -> Result<(), StoreError>;
    async fn update_document(&self, record: DocumentRecord) -> Result<(), StoreError>;
    async fn delete_document(&self, id: DocumentId) -> Result<(), StoreError>;
    async fn get_document(&self, id: DocumentId) -> Result<Option<DocumentRecord>, StoreError>;
    async fn find_document_by_token(
        &self,
        token: &str,
    ) -> Result<Option<DocumentRecord>, StoreError>;
    /// All documents, newest first.
    async fn list_documents(&self) -> Result<Vec<DocumentRecord>, StoreError>;

    // ── Invoices ──

    async fn insert_invoice(&self, record: InvoiceRecord) -> Result<(), StoreError>;
    async fn update_invoice(&self, record: InvoiceRecord) -> Result<(), StoreError>;
    async fn get_invoice(&self, id: InvoiceId) -> Result<Option<InvoiceRecord>, StoreError>;
    /// All invoices, newest first.
    async fn list_invoices(&self) -> Result<Vec<InvoiceRecord>, StoreError>;

    // ── Payments ──

    /// Fails with `Constraint` when the invoice does not exist.
    async fn insert_payment(&self, record: PaymentRecord) -> Result<(), StoreError>;
    /// Removes and returns the payment.
    async fn delete_payment(&self, id: PaymentId) -> Result<PaymentRecord, StoreError>;
    async fn get_payment(&self, id: PaymentId) -> Result<Option<PaymentRecord>, StoreError>;
    /// Payments of one invoice, oldest payment date first.
    async fn payments_for_invoice(
        &self,
        invoice_id: InvoiceId,
    ) -> Result<Vec<PaymentRecord>, StoreError>;

    // ── File index ──

    async fn insert_file(&self, entry: FileEntry) -> Result<(), StoreError>;
    /// Removes every entry pointing at `object_ref`; returns how many went.
    async fn delete_files(&self, object_ref: &ObjectRef) -> Result<usize, StoreError>;
    async fn files_for_document(&self, id: DocumentId) -> Result<Vec<FileEntry>, StoreError>;
}
