//! In-process record store with optional JSON snapshot persistence.

use std::collections::BTreeMap;
use std::io::Write;
use std::path::{Path, PathBuf};

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use tempfile::NamedTempFile;
use tokio::sync::RwLock;
use tracing::{debug, info};

use charter_core::{
    DocumentId, DocumentRecord, InvoiceId, InvoiceRecord, ObjectRef, PaymentId, PaymentRecord,
};

use crate::gateway::{FileEntry, RecordStore};
use crate::{Collection, StoreError};

#[derive(Debug, Clone, Default)]
struct Tables {
    documents: BTreeMap<DocumentId, DocumentRecord>,
    invoices: BTreeMap<InvoiceId, InvoiceRecord>,
    payments: BTreeMap<PaymentId, PaymentRecord>,
    files: Vec<FileEntry>,
}

/// On-disk layout: one JSON object with a list per collection.
#[derive(Debug, Default, Serialize, Deserialize)]
struct Snapshot {
    #[serde(default)]
    documents: Vec<DocumentRecord>,
    #[serde(default)]
    invoices: Vec<InvoiceRecord>,
    #[serde(default)]
    payments: Vec<PaymentRecord>,
    #[serde(default)]
    files: Vec<FileEntry>,
}

#[derive(Serialize)]
struct SnapshotRef<'a> {
    documents: Vec<&'a DocumentRecord>,
    invoices: Vec<&'a InvoiceRecord>,
    payments: Vec<&'a PaymentRecord>,
    files: &'a [FileEntry],
}

impl Tables {
    fn from_snapshot(snapshot: Snapshot) -> Self {
        Self {
            documents: snapshot.documents.into_iter().map(|d| (d.id, d)).collect(),
            invoices: snapshot.invoices.into_iter().map(|i| (i.id, i)).collect(),
            payments: snapshot.payments.into_iter().map(|p| (p.id, p)).collect(),
            files: snapshot.files,
        }
    }

    fn snapshot(&self) -> SnapshotRef<'_> {
        SnapshotRef {
            documents: self.documents.values().collect(),
            invoices: self.invoices.values().collect(),
            payments: self.payments.values().collect(),
            files: &self.files,
        }
    }
}

/// Record store held in memory.
///
/// Use [`open`](Self::open) for an ephemeral store and
/// [`open_persistent`](Self::open_persistent) for one backed by a JSON file
/// that survives process restarts. A persistent store applies each mutation to
/// a copy of its tables, writes the copy atomically (temp file + rename) and
/// only then makes it visible, so a failed write leaves both memory and disk
/// at the previous state. The file write runs on the blocking pool while the
/// write lock is held, which keeps snapshots in mutation order.
pub struct MemoryStore {
    tables: RwLock<Tables>,
    path: Option<PathBuf>,
}

impl MemoryStore {
    /// Open an empty, ephemeral store.
    pub fn open() -> Self {
        Self {
            tables: RwLock::new(Tables::default()),
            path: None,
        }
    }

    /// Open or create a store persisted at `path`.
    pub fn open_persistent(path: &Path) -> Result<Self, StoreError> {
        let tables = if path.exists() {
            let bytes = std::fs::read(path)?;
            let snapshot: Snapshot = serde_json::from_slice(&bytes)?;
            let tables = Tables::from_snapshot(snapshot);
            info!(
                path = %path.display(),
                documents = tables.documents.len(),
                invoices = tables.invoices.len(),
                payments = tables.payments.len(),
                "loaded record snapshot"
            );
            tables
        } else {
            if let Some(parent) = path.parent()
                && !parent.as_os_str().is_empty()
            {
                std::fs::create_dir_all(parent)?;
            }
            Tables::default()
        };
        Ok(Self {
            tables: RwLock::new(tables),
            path: Some(path.to_path_buf()),
        })
    }

    async fn read<T>(&self, f: impl FnOnce(&Tables) -> T) -> T {
        let tables = self.tables.read().await;
        f(&tables)
    }

    async fn mutate<T>(
        &self,
        f: impl FnOnce(&mut Tables) -> Result<T, StoreError>,
    ) -> Result<T, StoreError> {
        let mut tables = self.tables.write().await;
        match &self.path {
            None => f(&mut tables),
            Some(path) => {
                let mut next = tables.clone();
                let out = f(&mut next)?;
                let mut bytes = serde_json::to_vec_pretty(&next.snapshot())?;
                bytes.push(b'\n');
                let path = path.clone();
                tokio::task::spawn_blocking(move || write_snapshot(&path, &bytes))
                    .await
                    .map_err(|e| StoreError::Other(format!("snapshot writer: {e}")))??;
                *tables = next;
                Ok(out)
            }
        }
    }
}

fn write_snapshot(path: &Path, bytes: &[u8]) -> Result<(), StoreError> {
    let dir = match path.parent() {
        Some(parent) if !parent.as_os_str().is_empty() => parent,
        _ => Path::new("."),
    };
    let mut tmp = NamedTempFile::new_in(dir)?;
    tmp.write_all(bytes)?;
    tmp.as_file().sync_all()?;
    tmp.persist(path).map_err(|e| StoreError::Io(e.error))?;
    debug!(path = %path.display(), "wrote record snapshot");
    Ok(())
}

#[async_trait]
impl RecordStore for MemoryStore {
    async fn insert_document(&self, record: DocumentRecord) -> Result<(), StoreError> {
        self.mutate(|t| {
            if t.documents.contains_key(&record.id) {
                return Err(StoreError::Constraint(format!(
                    "document {} already exists",
                    record.id
                )));
            }
            if t.documents.values().any(|d| d.share_token == record.share_token) {
                return Err(StoreError::Constraint("share token already in use".into()));
            }
            t.documents.insert(record.id, record);
            Ok(())
        })
        .await
    }

    async fn update_document(&self, record: DocumentRecord) -> Result<(), StoreError> {
        self.mutate(|t| {
            let existing = t
                .documents
                .get_mut(&record.id)
                .ok_or_else(|| StoreError::not_found(Collection::Documents, record.id))?;
            if existing.share_token != record.share_token || existing.doc_type != record.doc_type {
                return Err(StoreError::Constraint(format!(
                    "document {}: share token and type are immutable",
                    record.id
                )));
            }
            *existing = record;
            Ok(())
        })
        .await
    }

    async fn delete_document(&self, id: DocumentId) -> Result<(), StoreError> {
        self.mutate(|t| {
            t.documents
                .remove(&id)
                .map(|_| ())
                .ok_or_else(|| StoreError::not_found(Collection::Documents, id))
        })
        .await
    }

    async fn get_document(&self, id: DocumentId) -> Result<Option<DocumentRecord>, StoreError> {
        Ok(self.read(|t| t.documents.get(&id).cloned()).await)
    }

    async fn find_document_by_token(
        &self,
        token: &str,
    ) -> Result<Option<DocumentRecord>, StoreError> {
        Ok(self
            .read(|t| t.documents.values().find(|d| d.share_token == token).cloned())
            .await)
    }

    async fn list_documents(&self) -> Result<Vec<DocumentRecord>, StoreError> {
        let mut docs = self.read(|t| t.documents.values().cloned().collect::<Vec<_>>()).await;
        docs.sort_by(|a, b| b.created_at.cmp(&a.created_at).then(a.id.cmp(&b.id)));
        Ok(docs)
    }

    async fn insert_invoice(&self, record: InvoiceRecord) -> Result<(), StoreError> {
        self.mutate(|t| {
            if t.invoices.contains_key(&record.id) {
                return Err(StoreError::Constraint(format!(
                    "invoice {} already exists",
                    record.id
                )));
            }
            if t.invoices.values().any(|i| i.number == record.number) {
                return Err(StoreError::Constraint(format!(
                    "invoice number {} already in use",
                    record.number
                )));
            }
            t.invoices.insert(record.id, record);
            Ok(())
        })
        .await
    }

    async fn update_invoice(&self, record: InvoiceRecord) -> Result<(), StoreError> {
        self.mutate(|t| {
            let existing = t
                .invoices
                .get_mut(&record.id)
                .ok_or_else(|| StoreError::not_found(Collection::Invoices, record.id))?;
            *existing = record;
            Ok(())
        })
        .await
    }

    async fn get_invoice(&self, id: InvoiceId) -> Result<Option<InvoiceRecord>, StoreError> {
        Ok(self.read(|t| t.invoices.get(&id).cloned()).await)
    }

    async fn list_invoices(&self) -> Result<Vec<InvoiceRecord>, StoreError> {
        let mut invoices = self.read(|t| t.invoices.values().cloned().collect::<Vec<_>>()).await;
        invoices.sort_by(|a, b| b.created_at.cmp(&a.created_at).then(a.id.cmp(&b.id)));
        Ok(invoices)
    }

    async fn insert_payment(&self, record: PaymentRecord) -> Result<(), StoreError> {
        self.mutate(|t| {
            if !t.invoices.contains_key(&record.invoice_id) {
                return Err(StoreError::Constraint(format!(
                    "payment references unknown invoice {}",
                    record.invoice_id
                )));
            }
            if t.payments.contains_key(&record.id) {
                return Err(StoreError::Constraint(format!(
                    "payment {} already exists",
                    record.id
                )));
            }
            t.payments.insert(record.id, record);
            Ok(())
        })
        .await
    }

    async fn delete_payment(&self, id: PaymentId) -> Result<PaymentRecord, StoreError> {
        self.mutate(|t| {
            t.payments
                .remove(&id)
                .ok_or_else(|| StoreError::not_found(Collection::Payments, id))
        })
        .await
    }

    async fn get_payment(&self, id: PaymentId) -> Result<Option<PaymentRecord>, StoreError> {
        Ok(self.read(|t| t.payments.get(&id).cloned()).await)
    }

    async fn payments_for_invoice(
        &self,
        invoice_id: InvoiceId,
    ) -> Result<Vec<PaymentRecord>, StoreError> {
        let mut payments = self
            .read(|t| {
                t.payments
                    .values()
                    .filter(|p| p.invoice_id == invoice_id)
                    .cloned()
                    .collect::<Vec<_>>()
            })
            .await;
        payments.sort_by(|a, b| {
            a.payment_date
                .cmp(&b.payment_date)
                .then(a.created_at.cmp(&b.created_at))
        });
        Ok(payments)
    }

    async fn insert_file(&self, entry: FileEntry) -> Result<(), StoreError> {
        self.mutate(|t| {
            t.files.push(entry);
            Ok(())
        })
        .await
    }

    async fn delete_files(&self, object_ref: &ObjectRef) -> Result<usize, StoreError> {
        self.mutate(|t| {
            let before = t.files.len();
            t.files.retain(|f| &f.object_ref != object_ref);
            Ok(before - t.files.len())
        })
        .await
    }

    async fn files_for_document(&self, id: DocumentId) -> Result<Vec<FileEntry>, StoreError> {
        Ok(self
            .read(|t| {
                t.files
                    .iter()
                    .filter(|f| f.document_id == id)
                    .cloned()
                    .collect()
            })
            .await)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use charter_core::document::generate_share_token;
    use charter_core::{ActorId, DocumentStatus, DocumentType, InvoiceStatus, ValueMap};
    use chrono::{Duration, NaiveDate, Utc};
    use rust_decimal::Decimal;

    fn document() -> DocumentRecord {
        let now = Utc::now();
        DocumentRecord {
            id: DocumentId::new(),
            doc_type: DocumentType::Msa,
            title: "Master Services Agreement - Initech".into(),
            counterparty_name: "Initech".into(),
            counterparty_email: "ops@initech.test".into(),
            values: ValueMap::new(),
            rendered_file_ref: None,
            share_token: generate_share_token(),
            status: DocumentStatus::Draft,
            created_by: ActorId::new("tester"),
            created_at: now,
            updated_at: now,
            expires_at: None,
        }
    }

    fn invoice(number: &str) -> InvoiceRecord {
        let now = Utc::now();
        InvoiceRecord {
            id: InvoiceId::new(),
            number: number.into(),
            client_name: "Initech".into(),
            amount: Decimal::from(1000),
            status: InvoiceStatus::Pending,
            issued_status: InvoiceStatus::Pending,
            due_date: None,
            created_at: now,
            updated_at: now,
        }
    }

    fn payment(invoice_id: InvoiceId, day: u32) -> PaymentRecord {
        PaymentRecord {
            id: PaymentId::new(),
            invoice_id,
            amount: Decimal::from(100),
            payment_date: NaiveDate::from_ymd_opt(2026, 6, day).unwrap(),
            method: Some("wire".into()),
            created_at: Utc::now(),
        }
    }

    #[tokio::test]
    async fn document_crud_and_token_lookup() {
        let store = MemoryStore::open();
        let mut doc = document();
        store.insert_document(doc.clone()).await.unwrap();

        let found = store.find_document_by_token(&doc.share_token).await.unwrap();
        assert_eq!(found.as_ref().map(|d| d.id), Some(doc.id));

        doc.status = DocumentStatus::Sent;
        store.update_document(doc.clone()).await.unwrap();
        assert_eq!(
            store.get_document(doc.id).await.unwrap().unwrap().status,
            DocumentStatus::Sent
        );

        store.delete_document(doc.id).await.unwrap();
        assert!(store.get_document(doc.id).await.unwrap().is_none());
        assert!(store.delete_document(doc.id).await.unwrap_err().is_not_found());
    }

    #[tokio::test]
    async fn duplicate_ids_and_tokens_are_constraint_errors() {
        let store = MemoryStore::open();
        let doc = document();
        store.insert_document(doc.clone()).await.unwrap();
        assert!(matches!(
            store.insert_document(doc.clone()).await,
            Err(StoreError::Constraint(_))
        ));

        let mut other = document();
        other.share_token = doc.share_token.clone();
        assert!(matches!(
            store.insert_document(other).await,
            Err(StoreError::Constraint(_))
        ));
    }

    #[tokio::test]
    async fn share_token_cannot_change_on_update() {
        let store = MemoryStore::open();
        let mut doc = document();
        store.insert_document(doc.clone()).await.unwrap();
        doc.share_token = generate_share_token();
        assert!(matches!(
            store.update_document(doc).await,
            Err(StoreError::Constraint(_))
        ));
    }

    #[tokio::test]
    async fn documents_listed_newest_first() {
        let store = MemoryStore::open();
        let mut old = document();
        old.created_at -= Duration::days(2);
        let new = document();
        store.insert_document(old.clone()).await.unwrap();
        store.insert_document(new.clone()).await.unwrap();
        let ids: Vec<_> = store
            .list_documents()
            .await
            .unwrap()
            .into_iter()
            .map(|d| d.id)
            .collect();
        assert_eq!(ids, vec![new.id, old.id]);
    }

    #[tokio::test]
    async fn payments_need_an_invoice_and_sort_by_date() {
        let store = MemoryStore::open();
        let orphan = payment(InvoiceId::new(), 1);
        assert!(matches!(
            store.insert_payment(orphan).await,
            Err(StoreError::Constraint(_))
        ));

        let inv = invoice("INV-100");
        store.insert_invoice(inv.clone()).await.unwrap();
        let late = payment(inv.id, 20);
        let early = payment(inv.id, 3);
        store.insert_payment(late.clone()).await.unwrap();
        store.insert_payment(early.clone()).await.unwrap();

        let listed = store.payments_for_invoice(inv.id).await.unwrap();
        assert_eq!(listed.iter().map(|p| p.id).collect::<Vec<_>>(), vec![early.id, late.id]);

        let removed = store.delete_payment(early.id).await.unwrap();
        assert_eq!(removed, early);
        assert_eq!(store.payments_for_invoice(inv.id).await.unwrap().len(), 1);
    }

    #[tokio::test]
    async fn invoice_numbers_are_unique() {
        let store = MemoryStore::open();
        store.insert_invoice(invoice("INV-7")).await.unwrap();
        assert!(matches!(
            store.insert_invoice(invoice("INV-7")).await,
            Err(StoreError::Constraint(_))
        ));
    }

    #[tokio::test]
    async fn file_index_entries_follow_their_object() {
        let store = MemoryStore::open();
        let doc = document();
        let object = ObjectRef::new("documents/a.txt");
        for object_ref in [object.clone(), object.clone(), ObjectRef::new("documents/b.txt")] {
            store
                .insert_file(FileEntry {
                    object_ref,
                    document_id: doc.id,
                    content_type: "text/plain; charset=utf-8".into(),
                    size_bytes: 12,
                    created_at: Utc::now(),
                })
                .await
                .unwrap();
        }
        assert_eq!(store.delete_files(&object).await.unwrap(), 2);
        assert_eq!(store.files_for_document(doc.id).await.unwrap().len(), 1);
    }

    #[tokio::test]
    async fn persistent_store_survives_reopen() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("data").join("records.json");

        let doc = document();
        let inv = invoice("INV-1");
        {
            let store = MemoryStore::open_persistent(&path).unwrap();
            store.insert_document(doc.clone()).await.unwrap();
            store.insert_invoice(inv.clone()).await.unwrap();
            store.insert_payment(payment(inv.id, 2)).await.unwrap();
        }
        assert!(path.exists());

        let reopened = MemoryStore::open_persistent(&path).unwrap();
        assert_eq!(reopened.get_document(doc.id).await.unwrap(), Some(doc));
        assert_eq!(reopened.get_invoice(inv.id).await.unwrap(), Some(inv.clone()));
        assert_eq!(reopened.payments_for_invoice(inv.id).await.unwrap().len(), 1);
    }

    #[tokio::test]
    async fn failed_mutation_leaves_snapshot_untouched() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("records.json");
        let store = MemoryStore::open_persistent(&path).unwrap();
        let doc = document();
        store.insert_document(doc.clone()).await.unwrap();
        let before = std::fs::read(&path).unwrap();

        assert!(store.insert_document(doc).await.is_err());
        assert_eq!(std::fs::read(&path).unwrap(), before);
    }

    #[tokio::test]
    async fn failed_snapshot_write_leaves_memory_untouched() {
        let dir = tempfile::tempdir().unwrap();
        let data = dir.path().join("data");
        let path = data.join("records.json");
        let store = MemoryStore::open_persistent(&path).unwrap();
        std::fs::remove_dir_all(&data).unwrap();

        let doc = document();
        assert!(matches!(
            store.insert_document(doc.clone()).await,
            Err(StoreError::Io(_))
        ));
        assert_eq!(store.get_document(doc.id).await.unwrap(), None);
    }

    #[tokio::test]
    async fn interleaved_writes_all_reach_the_snapshot() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("records.json");
        let store = std::sync::Arc::new(MemoryStore::open_persistent(&path).unwrap());
        let docs: Vec<_> = (0..8).map(|_| document()).collect();

        let mut tasks = tokio::task::JoinSet::new();
        for doc in docs.clone() {
            let store = store.clone();
            tasks.spawn(async move { store.insert_document(doc).await });
        }
        while let Some(result) = tasks.join_next().await {
            result.unwrap().unwrap();
        }

        let reopened = MemoryStore::open_persistent(&path).unwrap();
        assert_eq!(reopened.list_documents().await.unwrap().len(), docs.len());
    }
}
