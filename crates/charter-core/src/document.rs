//! Persisted document records, their public projection, and the share-access rules.

use base64::Engine;
use base64::engine::general_purpose::URL_SAFE_NO_PAD;
use chrono::{DateTime, Utc};
use rand::RngCore;
use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::ids::{ActorId, DocumentId};
use crate::lifecycle::DocumentStatus;
use crate::registry::DocumentType;
use crate::value::ValueMap;

/// Random bytes behind a share token (43 URL-safe characters once encoded).
const SHARE_TOKEN_BYTES: usize = 32;

/// Opaque reference to a stored object, as handed back by object storage.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ObjectRef(String);

impl ObjectRef {
    pub fn new(r: impl Into<String>) -> Self {
        Self(r.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl std::fmt::Display for ObjectRef {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.0)
    }
}

/// A generated (or draft) contract document.
///
/// `doc_type` and `share_token` are fixed at creation.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DocumentRecord {
    pub id: DocumentId,
    pub doc_type: DocumentType,
    pub title: String,
    pub counterparty_name: String,
    pub counterparty_email: String,
    pub values: ValueMap,
    pub rendered_file_ref: Option<ObjectRef>,
    pub share_token: String,
    pub status: DocumentStatus,
    pub created_by: ActorId,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
    pub expires_at: Option<DateTime<Utc>>,
}

impl DocumentRecord {
    pub fn is_expired(&self, now: DateTime<Utc>) -> bool {
        self.expires_at.is_some_and(|at| at <= now)
    }
}

/// What the public share channel may see of a document. Nothing else leaves.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PublicDocumentView {
    pub id: DocumentId,
    pub doc_type: DocumentType,
    pub title: String,
    pub counterparty_name: String,
    pub rendered_file_ref: Option<ObjectRef>,
    pub status: DocumentStatus,
    pub created_at: DateTime<Utc>,
    pub expires_at: Option<DateTime<Utc>>,
}

impl From<&DocumentRecord> for PublicDocumentView {
    fn from(record: &DocumentRecord) -> Self {
        Self {
            id: record.id,
            doc_type: record.doc_type,
            title: record.title.clone(),
            counterparty_name: record.counterparty_name.clone(),
            rendered_file_ref: record.rendered_file_ref.clone(),
            status: record.status,
            created_at: record.created_at,
            expires_at: record.expires_at,
        }
    }
}

/// Why a share lookup does not yield a document.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Error)]
pub enum AccessDenial {
    #[error("share token is malformed")]
    Malformed,

    /// Unknown token, or a document that is archived.
    #[error("document not found")]
    NotFound,

    #[error("share link has expired")]
    Expired,
}

/// Fresh unguessable share token.
pub fn generate_share_token() -> String {
    let mut bytes = [0u8; SHARE_TOKEN_BYTES];
    rand::thread_rng().fill_bytes(&mut bytes);
    URL_SAFE_NO_PAD.encode(bytes)
}

/// Cheap pre-lookup check: long enough and only URL-safe base64 characters.
pub fn check_token_shape(token: &str, min_len: usize) -> Result<(), AccessDenial> {
    let well_formed = token.len() >= min_len
        && token
            .bytes()
            .all(|b| b.is_ascii_alphanumeric() || b == b'-' || b == b'_');
    if well_formed {
        Ok(())
    } else {
        Err(AccessDenial::Malformed)
    }
}

/// Decide whether a looked-up record may be shown publicly at `now`.
///
/// Archived documents are reported as not found so the public channel never
/// reveals that they exist.
pub fn check_public_access(
    record: &DocumentRecord,
    now: DateTime<Utc>,
) -> Result<PublicDocumentView, AccessDenial> {
    if record.status.is_archived() {
        return Err(AccessDenial::NotFound);
    }
    if record.is_expired(now) {
        return Err(AccessDenial::Expired);
    }
    Ok(PublicDocumentView::from(record))
}
