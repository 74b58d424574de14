//! Per-field validation of a value map against its schema.
//!
//! Validation never short-circuits: every violated field is reported so the
//! author sees the whole list at once.

use std::fmt;
use std::sync::LazyLock;

use regex::Regex;
use serde::Serialize;

use crate::schema::{DocumentTypeSchema, FieldKind, FieldSpec};
use crate::value::{FieldValue, ValueMap};

static EMAIL_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"^[^\s@]+@[^\s@]+\.[^\s@]+$").expect("email pattern compiles")
});

/// Why a field failed validation.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "reason", rename_all = "snake_case")]
pub enum ViolationReason {
    Required,
    InvalidEmail,
    NotANumber,
    BelowMinimum { minimum: f64 },
    NoRows,
}

/// One failed field, keyed by the field so callers can show it inline.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Violation {
    pub key: &'static str,
    pub label: &'static str,
    #[serde(flatten)]
    pub reason: ViolationReason,
}

impl Violation {
    fn new(field: &FieldSpec, reason: ViolationReason) -> Self {
        Self {
            key: field.key,
            label: field.label,
            reason,
        }
    }
}

impl fmt::Display for Violation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let label = self.label;
        match &self.reason {
            ViolationReason::Required => write!(f, "{label} is required"),
            ViolationReason::InvalidEmail => write!(f, "{label} must be a valid email address"),
            ViolationReason::NotANumber => write!(f, "{label} must be a number"),
            ViolationReason::BelowMinimum { minimum } => {
                write!(f, "{label} must be at least {minimum}")
            }
            ViolationReason::NoRows => write!(f, "{label} needs at least one entry"),
        }
    }
}

pub fn is_valid_email(s: &str) -> bool {
    EMAIL_RE.is_match(s.trim())
}

/// Validate every field of `schema` against `values`.
///
/// Optional fields whose value is absent are skipped. Returns an empty list
/// when the map is acceptable.
pub fn validate(schema: &DocumentTypeSchema, values: &ValueMap) -> Vec<Violation> {
    schema
        .fields()
        .filter_map(|field| check_field(field, values.get(field.key)))
        .collect()
}

fn check_field(field: &FieldSpec, value: Option<&FieldValue>) -> Option<Violation> {
    let present = value.filter(|v| !v.is_blank());
    if !field.required && present.is_none() {
        return None;
    }

    let reason = match field.kind {
        FieldKind::Repeatable => match present.and_then(FieldValue::rows) {
            Some(_) => return None,
            None => ViolationReason::NoRows,
        },
        FieldKind::Email => match present {
            None => ViolationReason::Required,
            Some(FieldValue::Text(s)) if is_valid_email(s) => return None,
            Some(_) => ViolationReason::InvalidEmail,
        },
        FieldKind::Number | FieldKind::Currency => match present.map(FieldValue::as_number) {
            None => ViolationReason::Required,
            Some(None) => ViolationReason::NotANumber,
            Some(Some(n)) => match field.minimum {
                Some(minimum) if n < minimum => ViolationReason::BelowMinimum { minimum },
                _ => return None,
            },
        },
        FieldKind::Text | FieldKind::Textarea | FieldKind::Date | FieldKind::Select => {
            match present {
                None => ViolationReason::Required,
                Some(_) => return None,
            }
        }
    };

    Some(Violation::new(field, reason))
}
