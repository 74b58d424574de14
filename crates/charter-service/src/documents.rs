//! Document pipeline: validate, render, store, persist, send, share.

use std::collections::HashMap;
use std::sync::Arc;

use chrono::Utc;
use tokio::sync::{Mutex, OwnedMutexGuard};
use tracing::{debug, error, info, warn};

use charter_core::document::{check_public_access, check_token_shape, generate_share_token};
use charter_core::render::{CONTENT_TYPE, FILE_EXTENSION, render};
use charter_core::validate::{ViolationReason, is_valid_email};
use charter_core::value::{counterparty, synthesize_title};
use charter_core::{
    ActorId, DocumentId, DocumentRecord, DocumentStatus, DocumentType, EngineConfig, ObjectRef,
    PublicDocumentView, ValueMap, Violation, validate,
};
use charter_mail::{Attachment, Mailer, MessageReceipt, OutboundMessage};
use charter_store::{FileEntry, ObjectStorage, RecordStore};

use crate::audit::{AuditEvent, AuditSink};
use crate::error::ServiceError;

pub struct DocumentService {
    records: Arc<dyn RecordStore>,
    objects: Arc<dyn ObjectStorage>,
    audit: Arc<dyn AuditSink>,
    config: EngineConfig,
    locks: Mutex<HashMap<DocumentId, Arc<Mutex<()>>>>,
}

impl DocumentService {
    pub fn new(
        records: Arc<dyn RecordStore>,
        objects: Arc<dyn ObjectStorage>,
        audit: Arc<dyn AuditSink>,
        config: EngineConfig,
    ) -> Self {
        Self {
            records,
            objects,
            audit,
            config,
            locks: Mutex::new(HashMap::new()),
        }
    }

    pub fn config(&self) -> &EngineConfig {
        &self.config
    }

    /// Serialises record writes for one document. Never held across a mailer
    /// call or an upload; writers re-read the record once they hold it.
    async fn lock_document(&self, id: DocumentId) -> OwnedMutexGuard<()> {
        let lock = self.locks.lock().await.entry(id).or_default().clone();
        lock.lock_owned().await
    }

    /// Create a document from a value map.
    ///
    /// Finished documents are validated, rendered and uploaded before the
    /// record is written; drafts skip all three and carry no file. A failed
    /// upload leaves nothing behind. A failed record write after a successful
    /// upload is returned as an error and the orphaned object is logged.
    pub async fn create_document(
        &self,
        actor: &ActorId,
        doc_type: DocumentType,
        values: ValueMap,
        save_as_draft: bool,
    ) -> Result<DocumentRecord, ServiceError> {
        let schema = doc_type.schema();
        if !save_as_draft {
            let violations = validate(schema, &values);
            if !violations.is_empty() {
                debug!(doc_type = %doc_type, count = violations.len(), "validation failed");
                return Err(ServiceError::Validation(violations));
            }
        }

        let now = Utc::now();
        let id = DocumentId::new();
        let stored = if save_as_draft {
            None
        } else {
            Some(self.render_and_store(doc_type, &values, now).await?)
        };

        let (counterparty_name, counterparty_email) = counterparty(schema, &values);
        let record = DocumentRecord {
            id,
            doc_type,
            title: synthesize_title(schema, &values),
            counterparty_name,
            counterparty_email,
            values,
            rendered_file_ref: stored.as_ref().map(|(object, _)| object.clone()),
            share_token: generate_share_token(),
            status: DocumentStatus::Draft,
            created_by: actor.clone(),
            created_at: now,
            updated_at: now,
            expires_at: self.config.expiry_from(now),
        };

        if let Err(e) = self.records.insert_document(record.clone()).await {
            if let Some((object, _)) = &stored {
                error!(
                    document_id = %id,
                    object = %object,
                    error = %e,
                    "record insert failed after upload; rendered object is orphaned"
                );
            }
            return Err(e.into());
        }

        if let Some((object, size)) = stored {
            self.index_file(id, object, size).await;
        }

        info!(
            document_id = %id,
            doc_type = %doc_type,
            draft = save_as_draft,
            "document created"
        );
        self.audit.record(AuditEvent::new(
            "document.created",
            actor,
            id,
            format!("{} ({})", record.title, doc_type),
        ));
        Ok(record)
    }

    /// Render the stored values again and swap in the new file.
    ///
    /// Only the file reference changes; status changes made while the upload
    /// was in flight are kept. If the document was archived or deleted in the
    /// meantime the new upload is discarded.
    pub async fn regenerate(
        &self,
        actor: &ActorId,
        id: DocumentId,
    ) -> Result<DocumentRecord, ServiceError> {
        let record = self.regenerable(id).await?;
        let violations = validate(record.doc_type.schema(), &record.values);
        if !violations.is_empty() {
            return Err(ServiceError::Validation(violations));
        }

        let now = Utc::now();
        let (object, size) = self.render_and_store(record.doc_type, &record.values, now).await?;

        let _guard = self.lock_document(id).await;
        let mut record = match self.regenerable(id).await {
            Ok(current) => current,
            Err(e) => {
                self.discard_object(id, &object).await;
                return Err(e);
            }
        };
        let previous = record.rendered_file_ref.replace(object.clone());
        record.updated_at = now;

        if let Err(e) = self.records.update_document(record.clone()).await {
            error!(
                document_id = %id,
                object = %object,
                error = %e,
                "record update failed after upload; rendered object is orphaned"
            );
            return Err(e.into());
        }
        self.index_file(id, object, size).await;

        if let Some(old) = previous {
            self.discard_object(id, &old).await;
        }

        info!(document_id = %id, "document regenerated");
        self.audit
            .record(AuditEvent::new("document.regenerated", actor, id, ""));
        Ok(record)
    }

    async fn regenerable(&self, id: DocumentId) -> Result<DocumentRecord, ServiceError> {
        let record = self.get_document(id).await?;
        if record.status.is_archived() {
            return Err(ServiceError::InvalidTransition(
                "archived documents cannot be regenerated".into(),
            ));
        }
        Ok(record)
    }

    /// Documents newest first; archived ones only when asked for.
    pub async fn list_documents(
        &self,
        include_archived: bool,
    ) -> Result<Vec<DocumentRecord>, ServiceError> {
        let mut docs = self.records.list_documents().await?;
        if !include_archived {
            docs.retain(|d| !d.status.is_archived());
        }
        Ok(docs)
    }

    pub async fn get_document(&self, id: DocumentId) -> Result<DocumentRecord, ServiceError> {
        self.records
            .get_document(id)
            .await?
            .ok_or_else(|| ServiceError::not_found("document", id))
    }

    /// Raw bytes of the current rendering.
    pub async fn rendered_bytes(&self, id: DocumentId) -> Result<Vec<u8>, ServiceError> {
        let record = self.get_document(id).await?;
        let object = record
            .rendered_file_ref
            .ok_or_else(|| ServiceError::not_found("rendered file", id))?;
        Ok(self.objects.fetch(&object).await?)
    }

    pub async fn update_status(
        &self,
        actor: &ActorId,
        id: DocumentId,
        new_status: DocumentStatus,
    ) -> Result<DocumentRecord, ServiceError> {
        let _guard = self.lock_document(id).await;
        let mut record = self.get_document(id).await?;
        let from = record.status;
        record.status = from.transition(new_status)?;
        record.updated_at = Utc::now();
        self.records.update_document(record.clone()).await?;

        info!(document_id = %id, from = %from, status = %record.status, "document status changed");
        self.audit.record(AuditEvent::new(
            "document.status_changed",
            actor,
            id,
            format!("{from} -> {}", record.status),
        ));
        Ok(record)
    }

    /// Mail the rendered document to its counterparty.
    ///
    /// A draft becomes `Sent` once the mailer accepts the message; sent and
    /// signed documents can be re-sent without changing status. The status is
    /// re-read after dispatch, so a document archived or signed while the
    /// message was in flight keeps that status.
    pub async fn send_document(
        &self,
        actor: &ActorId,
        id: DocumentId,
        mailer: &dyn Mailer,
    ) -> Result<(DocumentRecord, MessageReceipt), ServiceError> {
        let record = self.get_document(id).await?;
        record.status.after_dispatch()?;
        let object = record.rendered_file_ref.clone().ok_or_else(|| {
            ServiceError::InvalidTransition(
                "document has no rendered file; regenerate it before sending".into(),
            )
        })?;
        if !is_valid_email(&record.counterparty_email) {
            let schema = record.doc_type.schema();
            let violations = schema
                .field(schema.counterparty_email_key)
                .map(|field| Violation {
                    key: field.key,
                    label: field.label,
                    reason: ViolationReason::InvalidEmail,
                })
                .into_iter()
                .collect();
            return Err(ServiceError::Validation(violations));
        }

        let bytes = self.objects.fetch(&object).await?;
        let message = self.compose(&record, String::from_utf8_lossy(&bytes).into_owned());
        let receipt = mailer.send(message).await?;

        let _guard = self.lock_document(id).await;
        let mut record = self.get_document(id).await?;
        match record.status.after_dispatch() {
            Ok(next) if next != record.status => {
                record.status = next;
                record.updated_at = Utc::now();
                self.records.update_document(record.clone()).await?;
            }
            Ok(_) => {}
            Err(e) => {
                warn!(document_id = %id, message_id = %receipt.id, error = %e, "status left unchanged after dispatch");
            }
        }

        info!(
            document_id = %id,
            message_id = %receipt.id,
            status = %record.status,
            "document sent"
        );
        self.audit.record(AuditEvent::new(
            "document.sent",
            actor,
            id,
            format!("to {} ({})", record.counterparty_email, receipt.id),
        ));
        Ok((record, receipt))
    }

    /// Delete a document and its rendering.
    ///
    /// The stored object goes first; if that fails the record is kept so the
    /// delete can be retried. Once the object is gone the record drops its
    /// reference to it before anything else is removed, so a later failure
    /// never leaves a record pointing at a missing file.
    pub async fn delete_document(&self, actor: &ActorId, id: DocumentId) -> Result<(), ServiceError> {
        let _guard = self.lock_document(id).await;
        let mut record = self.get_document(id).await?;
        if let Some(object) = record.rendered_file_ref.take() {
            if let Err(e) = self.objects.delete(&object).await {
                warn!(document_id = %id, object = %object, error = %e, "object delete failed; keeping record");
                return Err(e.into());
            }
            record.updated_at = Utc::now();
            if let Err(e) = self.records.update_document(record.clone()).await {
                error!(
                    document_id = %id,
                    object = %object,
                    error = %e,
                    "object deleted but record still references it"
                );
                return Err(e.into());
            }
            self.records.delete_files(&object).await?;
        }
        for entry in self.records.files_for_document(id).await? {
            self.records.delete_files(&entry.object_ref).await?;
        }
        self.records.delete_document(id).await?;

        info!(document_id = %id, "document deleted");
        self.audit.record(AuditEvent::new(
            "document.deleted",
            actor,
            id,
            record.title,
        ));
        Ok(())
    }

    /// Public lookup by share token.
    ///
    /// Malformed tokens are rejected before touching the store. Unknown and
    /// archived documents look the same to the caller.
    pub async fn resolve_share(&self, token: &str) -> Result<PublicDocumentView, ServiceError> {
        check_token_shape(token, self.config.min_share_token_len)?;
        let record = self
            .records
            .find_document_by_token(token)
            .await?
            .ok_or_else(|| ServiceError::not_found("document", "share token"))?;
        match check_public_access(&record, Utc::now()) {
            Ok(view) => Ok(view),
            Err(denial) => {
                debug!(document_id = %record.id, ?denial, "share access denied");
                Err(denial.into())
            }
        }
    }

    /// Public link for a document, as configured.
    pub fn share_link(&self, record: &DocumentRecord) -> String {
        self.config.share_link(&record.share_token)
    }

    async fn render_and_store(
        &self,
        doc_type: DocumentType,
        values: &ValueMap,
        generated_at: chrono::DateTime<Utc>,
    ) -> Result<(ObjectRef, u64), ServiceError> {
        let rendered = render(doc_type, values, generated_at);
        let bytes = rendered.to_bytes();
        let size = bytes.len() as u64;
        let object = self.objects.store(bytes, CONTENT_TYPE).await?;
        debug!(object = %object, pages = rendered.page_count(), size, "rendering stored");
        Ok((object, size))
    }

    async fn index_file(&self, id: DocumentId, object: ObjectRef, size_bytes: u64) {
        let entry = FileEntry {
            object_ref: object,
            document_id: id,
            content_type: CONTENT_TYPE.to_string(),
            size_bytes,
            created_at: Utc::now(),
        };
        if let Err(e) = self.records.insert_file(entry).await {
            warn!(document_id = %id, error = %e, "file index entry not written");
        }
    }

    async fn discard_object(&self, id: DocumentId, object: &ObjectRef) {
        if let Err(e) = self.objects.delete(object).await {
            warn!(document_id = %id, object = %object, error = %e, "previous rendering left in storage");
            return;
        }
        if let Err(e) = self.records.delete_files(object).await {
            warn!(document_id = %id, object = %object, error = %e, "stale file index entry left behind");
        }
    }

    fn compose(&self, record: &DocumentRecord, rendered: String) -> OutboundMessage {
        let mut body = format!(
            "Hello {},\n\nPlease find attached the {} \"{}\".\n",
            if record.counterparty_name.is_empty() {
                "there"
            } else {
                record.counterparty_name.as_str()
            },
            record.doc_type.schema().display_name,
            record.title,
        );
        if self.config.share_base_url.is_some() {
            body.push_str(&format!(
                "\nYou can also view it online: {}\n",
                self.share_link(record)
            ));
        }
        if let Some(expires) = record.expires_at {
            body.push_str(&format!(
                "This link expires on {}.\n",
                expires.format("%B %-d, %Y")
            ));
        }

        OutboundMessage::new(&record.counterparty_email, &record.title, body)
            .to_name(&record.counterparty_name)
            .attach(Attachment {
                filename: format!(
                    "{}-{}.{FILE_EXTENSION}",
                    record.doc_type.slug(),
                    &record.id.to_string()[..8]
                ),
                content_type: CONTENT_TYPE.to_string(),
                content: rendered,
            })
    }
}
