//! Value maps captured by the wizard, plus the synthesizers that walk a schema
//! to build them (defaults, titles, counterparty).

use std::collections::BTreeMap;
use std::fmt;

use serde::{Deserialize, Serialize};

use crate::schema::{DocumentTypeSchema, FieldKind, FieldSpec};

/// One row of a repeatable group: subfield key → text.
pub type Row = BTreeMap<String, String>;

/// Flat `key → value` data for one document instance.
pub type ValueMap = BTreeMap<String, FieldValue>;

/// A single captured value. Serialised untagged, so a stored value map is a
/// plain JSON object of strings, numbers and arrays of row objects.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum FieldValue {
    Number(f64),
    Text(String),
    Rows(Vec<Row>),
}

impl FieldValue {
    pub fn text(s: impl Into<String>) -> Self {
        FieldValue::Text(s.into())
    }

    pub fn as_text(&self) -> Option<&str> {
        match self {
            FieldValue::Text(s) => Some(s),
            _ => None,
        }
    }

    pub fn rows(&self) -> Option<&[Row]> {
        match self {
            FieldValue::Rows(rows) => Some(rows),
            _ => None,
        }
    }

    /// Blank text or an empty row list. Numbers are never blank.
    pub fn is_blank(&self) -> bool {
        match self {
            FieldValue::Text(s) => s.trim().is_empty(),
            FieldValue::Rows(rows) => rows.is_empty(),
            FieldValue::Number(_) => false,
        }
    }

    /// The value as a finite number, parsing text if needed.
    pub fn as_number(&self) -> Option<f64> {
        let n = match self {
            FieldValue::Number(n) => *n,
            FieldValue::Text(s) => s.trim().parse::<f64>().ok()?,
            FieldValue::Rows(_) => return None,
        };
        n.is_finite().then_some(n)
    }
}

impl fmt::Display for FieldValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            FieldValue::Number(n) => write!(f, "{n}"),
            FieldValue::Text(s) => f.write_str(s),
            FieldValue::Rows(rows) => match rows.len() {
                1 => f.write_str("1 entry"),
                n => write!(f, "{n} entries"),
            },
        }
    }
}

/// `None` for a missing key, blank text or an empty row list.
pub fn present<'a>(values: &'a ValueMap, key: &str) -> Option<&'a FieldValue> {
    values.get(key).filter(|v| !v.is_blank())
}

/// Trimmed text of a present scalar value.
pub fn text_of(values: &ValueMap, key: &str) -> Option<String> {
    match present(values, key)? {
        FieldValue::Text(s) => Some(s.trim().to_string()),
        FieldValue::Number(n) => Some(n.to_string()),
        FieldValue::Rows(_) => None,
    }
}

// ── Synthesizers ──

/// Initial value map for a schema: empty rows for repeatable groups, the
/// declared default where there is one, empty text otherwise.
pub fn synthesize_defaults(schema: &DocumentTypeSchema) -> ValueMap {
    schema
        .fields()
        .map(|field| (field.key.to_string(), default_for(field)))
        .collect()
}

fn default_for(field: &FieldSpec) -> FieldValue {
    match field.kind {
        FieldKind::Repeatable => FieldValue::Rows(Vec::new()),
        FieldKind::Text
        | FieldKind::Textarea
        | FieldKind::Email
        | FieldKind::Date
        | FieldKind::Number
        | FieldKind::Currency
        | FieldKind::Select => FieldValue::text(field.default.unwrap_or_default()),
    }
}

/// A blank row for a repeatable field, honouring subfield defaults.
pub fn empty_row(field: &FieldSpec) -> Row {
    field
        .subfields
        .iter()
        .map(|sub| (sub.key.to_string(), sub.default.unwrap_or_default().to_string()))
        .collect()
}

/// Human title for a document: display name plus the schema's title field.
pub fn synthesize_title(schema: &DocumentTypeSchema, values: &ValueMap) -> String {
    match text_of(values, schema.title_key) {
        Some(subject) => format!("{} - {}", schema.display_name, subject),
        None => format!("{} (untitled)", schema.display_name),
    }
}

/// Counterparty name and email as declared by the schema, blank when absent.
pub fn counterparty(schema: &DocumentTypeSchema, values: &ValueMap) -> (String, String) {
    (
        text_of(values, schema.counterparty_name_key).unwrap_or_default(),
        text_of(values, schema.counterparty_email_key).unwrap_or_default(),
    )
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::registry::DocumentType;
    use std::collections::BTreeSet;

    #[test]
    fn defaults_cover_exactly_the_schema_keys() {
        for &doc_type in DocumentType::all() {
            let schema = doc_type.schema();
            let values = synthesize_defaults(schema);
            let declared: BTreeSet<&str> = schema.fields().map(|f| f.key).collect();
            let produced: BTreeSet<&str> = values.keys().map(String::as_str).collect();
            assert_eq!(declared, produced, "{doc_type}");
        }
    }

    #[test]
    fn defaults_follow_field_kind() {
        let values = synthesize_defaults(DocumentType::Sow.schema());
        assert_eq!(values["deliverables"], FieldValue::Rows(vec![]));
        assert_eq!(values["billing_schedule"], FieldValue::text("Milestones"));
        assert_eq!(values["project_name"], FieldValue::text(""));
    }

    #[test]
    fn defaults_are_deterministic() {
        let schema = DocumentType::Retainer.schema();
        assert_eq!(synthesize_defaults(schema), synthesize_defaults(schema));
    }

    #[test]
    fn empty_row_has_every_subfield() {
        let field = DocumentType::Sow.schema().field("deliverables").unwrap();
        let row = empty_row(field);
        assert_eq!(
            row.keys().map(String::as_str).collect::<Vec<_>>(),
            vec!["description", "due_date", "title"]
        );
    }

    #[test]
    fn title_uses_title_key_or_falls_back() {
        let schema = DocumentType::Nda.schema();
        let mut values = synthesize_defaults(schema);
        assert_eq!(synthesize_title(schema, &values), "Non-Disclosure Agreement (untitled)");

        values.insert("recipient_name".into(), FieldValue::text("  Acme Corp "));
        assert_eq!(synthesize_title(schema, &values), "Non-Disclosure Agreement - Acme Corp");
    }

    #[test]
    fn counterparty_reads_declared_keys() {
        let schema = DocumentType::Msa.schema();
        let mut values = synthesize_defaults(schema);
        values.insert("client_name".into(), FieldValue::text("Globex"));
        values.insert("client_email".into(), FieldValue::text("legal@globex.test"));
        assert_eq!(
            counterparty(schema, &values),
            ("Globex".to_string(), "legal@globex.test".to_string())
        );
    }

    #[test]
    fn number_parsing_rejects_non_finite() {
        assert_eq!(FieldValue::text(" 12.5 ").as_number(), Some(12.5));
        assert_eq!(FieldValue::Number(3.0).as_number(), Some(3.0));
        assert_eq!(FieldValue::text("NaN").as_number(), None);
        assert_eq!(FieldValue::text("inf").as_number(), None);
        assert_eq!(FieldValue::text("ten").as_number(), None);
        assert_eq!(FieldValue::Number(f64::INFINITY).as_number(), None);
    }

    #[test]
    fn untagged_json_shape() {
        let json = r#"{"name": "Acme", "hours": 10, "rows": [{"title": "Logo"}]}"#;
        let values: ValueMap = serde_json::from_str(json).unwrap();
        assert_eq!(values["name"], FieldValue::text("Acme"));
        assert_eq!(values["hours"], FieldValue::Number(10.0));
        assert_eq!(values["rows"].rows().unwrap()[0]["title"], "Logo");
    }
}
