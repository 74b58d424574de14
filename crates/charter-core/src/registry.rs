//! Compiled-in schema registry.
//!
//! One static [`DocumentTypeSchema`] per [`DocumentType`]. Schemas are not
//! editable at runtime; [`get_schema`] is total and side-effect free.

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::schema::{DocumentTypeSchema, FieldSpec, SectionSpec};

/// Document types the engine can author and render.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum DocumentType {
    Nda,
    Msa,
    Sow,
    Retainer,
}

impl DocumentType {
    /// Every registered type, in menu order.
    pub fn all() -> &'static [DocumentType] {
        &[
            DocumentType::Nda,
            DocumentType::Msa,
            DocumentType::Sow,
            DocumentType::Retainer,
        ]
    }

    /// Stable slug used in stored records and on the command line.
    pub fn slug(self) -> &'static str {
        match self {
            DocumentType::Nda => "nda",
            DocumentType::Msa => "msa",
            DocumentType::Sow => "sow",
            DocumentType::Retainer => "retainer",
        }
    }

    pub fn schema(self) -> &'static DocumentTypeSchema {
        get_schema(self)
    }
}

impl fmt::Display for DocumentType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.slug())
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("unknown document type {0:?} (expected one of: nda, msa, sow, retainer)")]
pub struct UnknownDocumentType(pub String);

impl FromStr for DocumentType {
    type Err = UnknownDocumentType;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let wanted = s.trim().to_ascii_lowercase();
        DocumentType::all()
            .iter()
            .copied()
            .find(|t| t.slug() == wanted)
            .ok_or_else(|| UnknownDocumentType(s.to_string()))
    }
}

/// Schema for a document type.
pub fn get_schema(doc_type: DocumentType) -> &'static DocumentTypeSchema {
    match doc_type {
        DocumentType::Nda => &NDA,
        DocumentType::Msa => &MSA,
        DocumentType::Sow => &SOW,
        DocumentType::Retainer => &RETAINER,
    }
}

// ── Shared option lists ──

const GOVERNING_LAW: &[&str] = &["Delaware", "New York", "California", "England and Wales"];
const NDA_KIND: &[&str] = &["Mutual", "One-way"];
const BILLING_SCHEDULE: &[&str] = &["Upfront", "Milestones", "Monthly"];

// ── NDA ──

static NDA: DocumentTypeSchema = DocumentTypeSchema {
    doc_type: DocumentType::Nda,
    display_name: "Non-Disclosure Agreement",
    summary: "Protects confidential information exchanged with a prospective partner.",
    sections: &[
        SectionSpec {
            title: "Parties",
            description: Some("Who is disclosing and who is receiving information."),
            fields: &[
                FieldSpec::text("disclosing_party", "Disclosing party").required(),
                FieldSpec::textarea("disclosing_address", "Disclosing party address"),
                FieldSpec::text("recipient_name", "Recipient").required(),
                FieldSpec::email("recipient_email", "Recipient email").required(),
            ],
        },
        SectionSpec {
            title: "Terms",
            description: None,
            fields: &[
                FieldSpec::date("effective_date", "Effective date").required(),
                FieldSpec::select("nda_kind", "Agreement type", NDA_KIND)
                    .required()
                    .default_value("Mutual"),
                FieldSpec::number("term_months", "Term (months)")
                    .required()
                    .minimum(1.0)
                    .default_value("24"),
                FieldSpec::select("governing_law", "Governing law", GOVERNING_LAW)
                    .required()
                    .default_value("Delaware"),
                FieldSpec::textarea("purpose", "Purpose of disclosure").required(),
            ],
        },
        SectionSpec {
            title: "Confidential information",
            description: Some("Optional carve-outs and return obligations."),
            fields: &[
                FieldSpec::textarea("exclusions", "Additional exclusions"),
                FieldSpec::number("return_days", "Days to return materials")
                    .minimum(0.0)
                    .help("Leave blank to use \"promptly upon request\"."),
            ],
        },
    ],
    title_key: "recipient_name",
    counterparty_name_key: "recipient_name",
    counterparty_email_key: "recipient_email",
};

// ── MSA ──

static MSA: DocumentTypeSchema = DocumentTypeSchema {
    doc_type: DocumentType::Msa,
    display_name: "Master Services Agreement",
    summary: "Umbrella terms governing all future statements of work with a client.",
    sections: &[
        SectionSpec {
            title: "Parties",
            description: None,
            fields: &[
                FieldSpec::text("provider_name", "Service provider").required(),
                FieldSpec::text("client_name", "Client").required(),
                FieldSpec::email("client_email", "Client email").required(),
                FieldSpec::textarea("client_address", "Client address"),
            ],
        },
        SectionSpec {
            title: "Commercial terms",
            description: None,
            fields: &[
                FieldSpec::date("effective_date", "Effective date").required(),
                FieldSpec::number("payment_terms_days", "Payment terms (days)")
                    .required()
                    .minimum(0.0)
                    .default_value("30"),
                FieldSpec::currency("liability_cap", "Liability cap").minimum(0.0),
                FieldSpec::number("late_fee_percent", "Late fee (% per month)").minimum(0.0),
            ],
        },
        SectionSpec {
            title: "Legal",
            description: None,
            fields: &[
                FieldSpec::select("governing_law", "Governing law", GOVERNING_LAW)
                    .required()
                    .default_value("Delaware"),
                FieldSpec::number("termination_notice_days", "Termination notice (days)")
                    .required()
                    .minimum(0.0)
                    .default_value("30"),
                FieldSpec::textarea("special_terms", "Special terms"),
            ],
        },
    ],
    title_key: "client_name",
    counterparty_name_key: "client_name",
    counterparty_email_key: "client_email",
};

// ── SOW ──

const DELIVERABLE_ROW: &[FieldSpec] = &[
    FieldSpec::text("title", "Deliverable").required(),
    FieldSpec::textarea("description", "Description"),
    FieldSpec::date("due_date", "Due date"),
];

static SOW: DocumentTypeSchema = DocumentTypeSchema {
    doc_type: DocumentType::Sow,
    display_name: "Statement of Work",
    summary: "Scope, deliverables and fees for one project under an MSA.",
    sections: &[
        SectionSpec {
            title: "Project",
            description: None,
            fields: &[
                FieldSpec::text("project_name", "Project name").required(),
                FieldSpec::text("client_name", "Client").required(),
                FieldSpec::email("client_email", "Client email").required(),
                FieldSpec::text("msa_reference", "MSA reference"),
            ],
        },
        SectionSpec {
            title: "Scope",
            description: Some("Describe the work and list each deliverable."),
            fields: &[
                FieldSpec::textarea("scope_summary", "Scope summary").required(),
                FieldSpec::repeatable("deliverables", "Deliverables", DELIVERABLE_ROW).required(),
            ],
        },
        SectionSpec {
            title: "Timeline & fees",
            description: None,
            fields: &[
                FieldSpec::date("start_date", "Start date").required(),
                FieldSpec::date("end_date", "Target completion"),
                FieldSpec::currency("total_fee", "Total fee")
                    .required()
                    .minimum(0.0),
                FieldSpec::select("billing_schedule", "Billing schedule", BILLING_SCHEDULE)
                    .required()
                    .default_value("Milestones"),
            ],
        },
    ],
    title_key: "project_name",
    counterparty_name_key: "client_name",
    counterparty_email_key: "client_email",
};

// ── Retainer ──

const SERVICE_ROW: &[FieldSpec] = &[
    FieldSpec::text("service", "Service").required(),
    FieldSpec::textarea("notes", "Notes"),
];

static RETAINER: DocumentTypeSchema = DocumentTypeSchema {
    doc_type: DocumentType::Retainer,
    display_name: "Retainer Agreement",
    summary: "Recurring monthly engagement with a block of included hours.",
    sections: &[
        SectionSpec {
            title: "Client",
            description: None,
            fields: &[
                FieldSpec::text("client_name", "Client").required(),
                FieldSpec::email("client_email", "Client email").required(),
                FieldSpec::text("contact_person", "Contact person"),
            ],
        },
        SectionSpec {
            title: "Engagement",
            description: None,
            fields: &[
                FieldSpec::date("start_date", "Start date").required(),
                FieldSpec::currency("monthly_fee", "Monthly fee")
                    .required()
                    .minimum(0.0),
                FieldSpec::number("included_hours", "Included hours per month")
                    .required()
                    .minimum(0.0),
                FieldSpec::currency("overage_rate", "Overage hourly rate").minimum(0.0),
                FieldSpec::number("billing_day", "Billing day of month")
                    .required()
                    .minimum(1.0)
                    .default_value("1"),
                FieldSpec::repeatable("services", "Covered services", SERVICE_ROW),
            ],
        },
        SectionSpec {
            title: "Terms",
            description: None,
            fields: &[
                FieldSpec::number("notice_days", "Cancellation notice (days)")
                    .required()
                    .minimum(0.0)
                    .default_value("30"),
                FieldSpec::select("governing_law", "Governing law", GOVERNING_LAW)
                    .required()
                    .default_value("Delaware"),
            ],
        },
    ],
    title_key: "client_name",
    counterparty_name_key: "client_name",
    counterparty_email_key: "client_email",
};

#[cfg(test)]
mod tests {
    use super::*;
    use crate::schema::FieldKind;

    #[test]
    fn every_registered_schema_is_well_formed() {
        for &doc_type in DocumentType::all() {
            let schema = get_schema(doc_type);
            assert_eq!(schema.doc_type, doc_type);
            schema
                .check()
                .unwrap_or_else(|e| panic!("{doc_type} schema invalid: {e}"));
        }
    }

    #[test]
    fn slugs_round_trip_through_from_str() {
        for &doc_type in DocumentType::all() {
            assert_eq!(doc_type.slug().parse::<DocumentType>().unwrap(), doc_type);
        }
        assert_eq!("  NDA ".parse::<DocumentType>().unwrap(), DocumentType::Nda);
        assert!("lease".parse::<DocumentType>().is_err());
    }

    #[test]
    fn sow_requires_deliverables() {
        let field = get_schema(DocumentType::Sow).field("deliverables").unwrap();
        assert_eq!(field.kind, FieldKind::Repeatable);
        assert!(field.required);
        assert!(field.subfield("title").is_some());
    }

    #[test]
    fn serde_uses_slugs() {
        assert_eq!(serde_json::to_string(&DocumentType::Retainer).unwrap(), "\"retainer\"");
        let parsed: DocumentType = serde_json::from_str("\"sow\"").unwrap();
        assert_eq!(parsed, DocumentType::Sow);
    }
}
