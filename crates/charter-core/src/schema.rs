//! Declarative document schemas: typed fields grouped into ordered sections.
//!
//! Schemas are plain `'static` data. The synthesizer, validator, wizard and
//! renderer all walk the same description, so a new document type only needs a
//! schema and a template.

use std::collections::HashSet;
use std::fmt;

use serde::Serialize;
use thiserror::Error;

use crate::registry::DocumentType;

/// Input kind of a single field. Consumers match on this exhaustively.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum FieldKind {
    Text,
    Textarea,
    Email,
    Date,
    Number,
    Currency,
    Select,
    Repeatable,
}

impl FieldKind {
    pub fn is_numeric(self) -> bool {
        matches!(self, FieldKind::Number | FieldKind::Currency)
    }

    pub fn as_str(self) -> &'static str {
        match self {
            FieldKind::Text => "text",
            FieldKind::Textarea => "textarea",
            FieldKind::Email => "email",
            FieldKind::Date => "date",
            FieldKind::Number => "number",
            FieldKind::Currency => "currency",
            FieldKind::Select => "select",
            FieldKind::Repeatable => "repeatable",
        }
    }
}

impl fmt::Display for FieldKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// One form field.
///
/// Built with the `const` constructors so schemas can live in statics:
///
/// ```
/// use charter_core::schema::FieldSpec;
///
/// const FEE: FieldSpec = FieldSpec::currency("fee", "Fee").required().minimum(0.0);
/// assert!(FEE.required);
/// ```
#[derive(Debug, Clone, Copy, Serialize)]
pub struct FieldSpec {
    pub key: &'static str,
    pub label: &'static str,
    pub kind: FieldKind,
    pub required: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub default: Option<&'static str>,
    #[serde(skip_serializing_if = "<[_]>::is_empty")]
    pub options: &'static [&'static str],
    #[serde(skip_serializing_if = "Option::is_none")]
    pub minimum: Option<f64>,
    /// Shape of one row; only meaningful for [`FieldKind::Repeatable`].
    #[serde(skip_serializing_if = "<[_]>::is_empty")]
    pub subfields: &'static [FieldSpec],
    #[serde(skip_serializing_if = "Option::is_none")]
    pub help: Option<&'static str>,
}

impl FieldSpec {
    const fn base(key: &'static str, label: &'static str, kind: FieldKind) -> Self {
        Self {
            key,
            label,
            kind,
            required: false,
            default: None,
            options: &[],
            minimum: None,
            subfields: &[],
            help: None,
        }
    }

    pub const fn text(key: &'static str, label: &'static str) -> Self {
        Self::base(key, label, FieldKind::Text)
    }

    pub const fn textarea(key: &'static str, label: &'static str) -> Self {
        Self::base(key, label, FieldKind::Textarea)
    }

    pub const fn email(key: &'static str, label: &'static str) -> Self {
        Self::base(key, label, FieldKind::Email)
    }

    pub const fn date(key: &'static str, label: &'static str) -> Self {
        Self::base(key, label, FieldKind::Date)
    }

    pub const fn number(key: &'static str, label: &'static str) -> Self {
        Self::base(key, label, FieldKind::Number)
    }

    pub const fn currency(key: &'static str, label: &'static str) -> Self {
        Self::base(key, label, FieldKind::Currency)
    }

    pub const fn select(
        key: &'static str,
        label: &'static str,
        options: &'static [&'static str],
    ) -> Self {
        let mut field = Self::base(key, label, FieldKind::Select);
        field.options = options;
        field
    }

    pub const fn repeatable(
        key: &'static str,
        label: &'static str,
        subfields: &'static [FieldSpec],
    ) -> Self {
        let mut field = Self::base(key, label, FieldKind::Repeatable);
        field.subfields = subfields;
        field
    }

    pub const fn required(mut self) -> Self {
        self.required = true;
        self
    }

    pub const fn default_value(mut self, value: &'static str) -> Self {
        self.default = Some(value);
        self
    }

    pub const fn minimum(mut self, minimum: f64) -> Self {
        self.minimum = Some(minimum);
        self
    }

    pub const fn help(mut self, help: &'static str) -> Self {
        self.help = Some(help);
        self
    }

    pub fn subfield(&self, key: &str) -> Option<&'static FieldSpec> {
        self.subfields.iter().find(|f| f.key == key)
    }
}

/// Ordered group of fields shown together as one wizard step.
#[derive(Debug, Clone, Copy, Serialize)]
pub struct SectionSpec {
    pub title: &'static str,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub description: Option<&'static str>,
    pub fields: &'static [FieldSpec],
}

/// Complete description of one document type.
#[derive(Debug, Clone, Copy, Serialize)]
pub struct DocumentTypeSchema {
    pub doc_type: DocumentType,
    pub display_name: &'static str,
    pub summary: &'static str,
    pub sections: &'static [SectionSpec],
    /// Field whose value names the document in its title.
    pub title_key: &'static str,
    pub counterparty_name_key: &'static str,
    pub counterparty_email_key: &'static str,
}

/// Structural defect in a schema definition.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum SchemaError {
    #[error("schema has no sections")]
    NoSections,

    #[error("section {0:?} has no fields")]
    EmptySection(&'static str),

    #[error("field key {0:?} is declared more than once")]
    DuplicateKey(&'static str),

    #[error("repeatable field {0:?} declares no subfields")]
    EmptyRepeatable(&'static str),

    #[error("repeatable field {0:?} nests another repeatable")]
    NestedRepeatable(&'static str),

    #[error("select field {0:?} declares no options")]
    SelectWithoutOptions(&'static str),

    #[error("{role} key {key:?} does not name a field")]
    UnknownKey { role: &'static str, key: &'static str },
}

impl DocumentTypeSchema {
    /// Top-level fields of every section, in declaration order.
    pub fn fields(&self) -> impl Iterator<Item = &'static FieldSpec> + '_ {
        self.sections.iter().flat_map(|s| s.fields.iter())
    }

    pub fn field(&self, key: &str) -> Option<&'static FieldSpec> {
        self.fields().find(|f| f.key == key)
    }

    pub fn section(&self, index: usize) -> Option<&'static SectionSpec> {
        self.sections.get(index)
    }

    pub fn section_count(&self) -> usize {
        self.sections.len()
    }

    pub fn last_section_index(&self) -> usize {
        self.sections.len().saturating_sub(1)
    }

    /// Verify the structural invariants every schema must hold.
    pub fn check(&self) -> Result<(), SchemaError> {
        if self.sections.is_empty() {
            return Err(SchemaError::NoSections);
        }

        let mut seen = HashSet::new();
        for section in self.sections {
            if section.fields.is_empty() {
                return Err(SchemaError::EmptySection(section.title));
            }
            for field in section.fields {
                if !seen.insert(field.key) {
                    return Err(SchemaError::DuplicateKey(field.key));
                }
                check_field(field)?;
            }
        }

        for (role, key) in [
            ("title", self.title_key),
            ("counterparty name", self.counterparty_name_key),
            ("counterparty email", self.counterparty_email_key),
        ] {
            match self.field(key) {
                Some(field) if field.kind != FieldKind::Repeatable => {}
                _ => return Err(SchemaError::UnknownKey { role, key }),
            }
        }

        Ok(())
    }
}

fn check_field(field: &FieldSpec) -> Result<(), SchemaError> {
    match field.kind {
        FieldKind::Repeatable => {
            if field.subfields.is_empty() {
                return Err(SchemaError::EmptyRepeatable(field.key));
            }
            let mut seen = HashSet::new();
            for sub in field.subfields {
                if sub.kind == FieldKind::Repeatable {
                    return Err(SchemaError::NestedRepeatable(field.key));
                }
                if !seen.insert(sub.key) {
                    return Err(SchemaError::DuplicateKey(sub.key));
                }
                check_field(sub)?;
            }
        }
        FieldKind::Select if field.options.is_empty() => {
            return Err(SchemaError::SelectWithoutOptions(field.key));
        }
        _ => {}
    }
    Ok(())
}
