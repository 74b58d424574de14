//! Charter domain rules: document schemas, validation, the fill-in wizard,
//! plain-text rendering, the document lifecycle and invoice reconciliation.
//! Nothing here touches storage, mail or the clock on its own.

pub mod billing;
pub mod config;
pub mod document;
pub mod ids;
pub mod lifecycle;
pub mod registry;
pub mod render;
pub mod schema;
pub mod validate;
pub mod value;
pub mod wizard;

pub use billing::{InvoiceRecord, InvoiceStatus, PaymentRecord, reconcile};
pub use config::EngineConfig;
pub use document::{AccessDenial, DocumentRecord, ObjectRef, PublicDocumentView};
pub use ids::{ActorId, DocumentId, InvoiceId, PaymentId};
pub use lifecycle::{DocumentStatus, LifecycleError};
pub use registry::{DocumentType, get_schema};
pub use render::{RenderedDocument, render};
pub use schema::{DocumentTypeSchema, FieldKind, FieldSpec, SectionSpec};
pub use validate::{Violation, validate};
pub use value::{FieldValue, Row, ValueMap, synthesize_defaults};
pub use wizard::{Phase, Wizard, WizardError, WizardEvent};
