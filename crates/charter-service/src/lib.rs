//! Services composing the Charter core rules with storage, mail and audit.

pub mod audit;
pub mod billing;
pub mod documents;
mod error;

pub use audit::{AuditEvent, AuditSink, MemoryAuditSink, TracingAuditSink};
pub use billing::{BillingService, NewInvoice};
pub use documents::DocumentService;
pub use error::{DependencyError, ServiceError};
