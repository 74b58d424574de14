use std::fmt;

use thiserror::Error;

/// Which record collection an error refers to.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Collection {
    Documents,
    Invoices,
    Payments,
    Objects,
}

impl fmt::Display for Collection {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Collection::Documents => "document",
            Collection::Invoices => "invoice",
            Collection::Payments => "payment",
            Collection::Objects => "object",
        })
    }
}

#[derive(Debug, Error)]
pub enum StoreError {
    #[error("{collection} not found: {id}")]
    NotFound { collection: Collection, id: String },

    #[error("constraint violated: {0}")]
    Constraint(String),

    #[error("io error: {0}")]
    Io(#[from] std::io::Error),

    #[error("json error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("{0}")]
    Other(String),
}

impl StoreError {
    pub fn not_found(collection: Collection, id: impl fmt::Display) -> Self {
        StoreError::NotFound {
            collection,
            id: id.to_string(),
        }
    }

    pub fn is_not_found(&self) -> bool {
        matches!(self, StoreError::NotFound { .. })
    }
}
