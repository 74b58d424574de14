use charter_core::{AccessDenial, LifecycleError, Violation};
use charter_mail::MailError;
use charter_store::StoreError;
use thiserror::Error;

/// Failure of a collaborator the service depends on.
#[derive(Debug, Error)]
pub enum DependencyError {
    #[error("store: {0}")]
    Store(#[from] StoreError),
    #[error("mail: {0}")]
    Mail(#[from] MailError),
}

#[derive(Debug, Error)]
pub enum ServiceError {
    #[error("validation failed: {}", summarize(.0))]
    Validation(Vec<Violation>),

    #[error("{what} not found: {id}")]
    NotFound { what: &'static str, id: String },

    #[error("share link has expired")]
    Expired,

    #[error("share token is malformed")]
    Malformed,

    #[error("{0}")]
    InvalidTransition(String),

    #[error("invalid payment: {0}")]
    InvalidPayment(String),

    #[error("invalid input: {0}")]
    InvalidInput(String),

    #[error("conflict: {0}")]
    Conflict(String),

    #[error(transparent)]
    Dependency(#[from] DependencyError),
}

fn summarize(violations: &[Violation]) -> String {
    violations
        .iter()
        .map(ToString::to_string)
        .collect::<Vec<_>>()
        .join("; ")
}

impl ServiceError {
    pub(crate) fn not_found(what: &'static str, id: impl ToString) -> Self {
        ServiceError::NotFound {
            what,
            id: id.to_string(),
        }
    }

    /// Text safe to show an end user. Dependency failures never leak detail.
    pub fn user_message(&self) -> String {
        match self {
            ServiceError::Validation(violations) => {
                let mut msg = String::from("Please correct the following:");
                for v in violations {
                    msg.push_str("\n  - ");
                    msg.push_str(&v.to_string());
                }
                msg
            }
            ServiceError::NotFound { what, .. } => format!("The {what} could not be found."),
            ServiceError::Expired => "This share link has expired.".into(),
            ServiceError::Malformed => "This share link is not valid.".into(),
            ServiceError::InvalidTransition(msg)
            | ServiceError::InvalidPayment(msg)
            | ServiceError::InvalidInput(msg)
            | ServiceError::Conflict(msg) => msg.clone(),
            ServiceError::Dependency(_) => {
                "Something went wrong while saving or sending. Please try again.".into()
            }
        }
    }
}

impl From<StoreError> for ServiceError {
    fn from(e: StoreError) -> Self {
        match e {
            StoreError::NotFound { collection, id } => ServiceError::NotFound {
                what: match collection {
                    charter_store::Collection::Documents => "document",
                    charter_store::Collection::Invoices => "invoice",
                    charter_store::Collection::Payments => "payment",
                    charter_store::Collection::Objects => "stored file",
                },
                id,
            },
            StoreError::Constraint(msg) => ServiceError::Conflict(msg),
            other => ServiceError::Dependency(DependencyError::Store(other)),
        }
    }
}

impl From<MailError> for ServiceError {
    fn from(e: MailError) -> Self {
        ServiceError::Dependency(DependencyError::Mail(e))
    }
}

impl From<LifecycleError> for ServiceError {
    fn from(e: LifecycleError) -> Self {
        ServiceError::InvalidTransition(e.to_string())
    }
}

impl From<AccessDenial> for ServiceError {
    fn from(denial: AccessDenial) -> Self {
        match denial {
            AccessDenial::Malformed => ServiceError::Malformed,
            AccessDenial::NotFound => ServiceError::not_found("document", "share token"),
            AccessDenial::Expired => ServiceError::Expired,
        }
    }
}
