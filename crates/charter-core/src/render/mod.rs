//! Document rendering: value map → paginated plain-text artifact.
//!
//! Rendering is a pure function of the document type, the value map and the
//! generation timestamp. The `Generated:` header line is the only part that
//! depends on the timestamp.

mod format;
mod layout;
mod templates;

use chrono::{DateTime, Utc};

use crate::registry::DocumentType;
use crate::value::{ValueMap, synthesize_title};

pub use format::{NOT_SPECIFIED, format_currency, format_long_date};
pub use layout::{LINES_PER_PAGE, PAGE_WIDTH, Page};

use format::Fields;
use layout::Layout;

/// MIME type of [`RenderedDocument::to_bytes`].
pub const CONTENT_TYPE: &str = "text/plain; charset=utf-8";
/// File extension used when storing rendered artifacts.
pub const FILE_EXTENSION: &str = "txt";

/// Separates pages in the serialized artifact.
const PAGE_SEPARATOR: char = '\u{000C}';

type Template = fn(&Fields<'_>, &mut Layout);

/// A rendered, paginated document.
#[derive(Debug, Clone, PartialEq)]
pub struct RenderedDocument {
    pub doc_type: DocumentType,
    pub title: String,
    pub generated_at: DateTime<Utc>,
    pub pages: Vec<Page>,
}

impl RenderedDocument {
    pub fn page_count(&self) -> usize {
        self.pages.len()
    }

    /// Full text: a header per page, pages separated by form feeds.
    pub fn to_text(&self) -> String {
        let total = self.pages.len();
        let mut out = String::new();
        for page in &self.pages {
            if page.number > 1 {
                out.push(PAGE_SEPARATOR);
                out.push('\n');
            }
            out.push_str(&page_header(&self.title, page.number, total));
            if page.number == 1 {
                out.push_str(&format!(
                    "Generated: {}\n",
                    self.generated_at.format("%Y-%m-%d %H:%M:%S UTC")
                ));
            }
            out.push('\n');
            for line in &page.lines {
                out.push_str(line);
                out.push('\n');
            }
        }
        out
    }

    pub fn to_bytes(&self) -> Vec<u8> {
        self.to_text().into_bytes()
    }
}

fn page_header(title: &str, number: usize, total: usize) -> String {
    let marker = format!("Page {number} of {total}");
    let room = PAGE_WIDTH.saturating_sub(marker.len() + 1);
    let title: String = title.chars().take(room).collect();
    let gap = PAGE_WIDTH.saturating_sub(title.chars().count() + marker.len()).max(1);
    format!("{title}{}{marker}\n{}\n", " ".repeat(gap), "=".repeat(PAGE_WIDTH))
}

fn template_for(doc_type: DocumentType) -> Template {
    match doc_type {
        DocumentType::Nda => templates::nda,
        DocumentType::Msa => templates::msa,
        DocumentType::Sow => templates::sow,
        DocumentType::Retainer => templates::retainer,
    }
}

/// Render `values` with the template registered for `doc_type`.
///
/// Never fails: absent values render as placeholders. Callers validate first
/// when they need a complete document.
pub fn render(
    doc_type: DocumentType,
    values: &ValueMap,
    generated_at: DateTime<Utc>,
) -> RenderedDocument {
    let schema = doc_type.schema();
    let mut layout = Layout::new();
    template_for(doc_type)(&Fields::new(values), &mut layout);
    let pages = layout.paginate(LINES_PER_PAGE);
    tracing::debug!(doc_type = %doc_type, pages = pages.len(), "rendered document");
    RenderedDocument {
        doc_type,
        title: synthesize_title(schema, values),
        generated_at,
        pages,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::value::{FieldValue, Row, synthesize_defaults};
    use chrono::{Duration, TimeZone};

    fn at(hour: u32) -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2026, 1, 5, hour, 30, 0).unwrap()
    }

    fn sow_values() -> ValueMap {
        let mut values = synthesize_defaults(DocumentType::Sow.schema());
        for (key, value) in [
            ("project_name", "Website rebuild"),
            ("client_name", "Globex"),
            ("client_email", "pm@globex.test"),
            ("scope_summary", "Rebuild the marketing site on the new design system."),
            ("start_date", "2026-04-01"),
            ("total_fee", "18000"),
        ] {
            values.insert(key.into(), FieldValue::text(value));
        }
        let row: Row = [
            ("title".to_string(), "Homepage".to_string()),
            ("description".to_string(), String::new()),
            ("due_date".to_string(), "2026-05-15".to_string()),
        ]
        .into();
        values.insert("deliverables".into(), FieldValue::Rows(vec![row]));
        values
    }

    fn without_generated(text: &str) -> String {
        text.lines()
            .filter(|l| !l.starts_with("Generated:"))
            .collect::<Vec<_>>()
            .join("\n")
    }

    #[test]
    fn output_is_deterministic_apart_from_generated_line() {
        let values = sow_values();
        let a = render(DocumentType::Sow, &values, at(9)).to_text();
        let b = render(DocumentType::Sow, &values, at(9) + Duration::days(3)).to_text();
        assert_ne!(a, b);
        assert_eq!(without_generated(&a), without_generated(&b));
        assert_eq!(a, render(DocumentType::Sow, &values, at(9)).to_text());
    }

    #[test]
    fn formats_currency_dates_and_rows() {
        let text = render(DocumentType::Sow, &sow_values(), at(9)).to_text();
        assert!(text.contains("$18,000.00"));
        assert!(text.contains("April 1, 2026"));
        assert!(text.contains("1. Homepage (due May 15, 2026)"));
        assert!(text.contains("Generated: 2026-01-05 09:30:00 UTC"));
    }

    #[test]
    fn absent_optionals_render_placeholder() {
        let text = render(DocumentType::Sow, &sow_values(), at(9)).to_text();
        assert!(text.contains(&format!("Master agreement:         {NOT_SPECIFIED}")));
        assert!(text.contains(&format!("Target completion:        {NOT_SPECIFIED}")));
    }

    #[test]
    fn every_type_renders_from_defaults_alone() {
        for &doc_type in DocumentType::all() {
            let values = synthesize_defaults(doc_type.schema());
            let doc = render(doc_type, &values, at(12));
            assert!(doc.page_count() >= 2, "{doc_type} should end on a signature page");
            assert!(doc.title.ends_with("(untitled)"));
            let text = doc.to_text();
            assert!(text.lines().all(|l| l.chars().count() <= PAGE_WIDTH));
            assert_eq!(text.matches(PAGE_SEPARATOR).count(), doc.page_count() - 1);
        }
    }

    #[test]
    fn unbroken_values_stay_within_page_width() {
        let url = format!("https://contracts.example.test/{}", "x".repeat(120));
        let mut values = synthesize_defaults(DocumentType::Msa.schema());
        values.insert("special_terms".into(), FieldValue::text(&url));
        values.insert("client_name".into(), FieldValue::text(&"Acme".repeat(30)));
        let text = render(DocumentType::Msa, &values, at(8)).to_text();
        assert!(text.lines().all(|l| l.chars().count() <= PAGE_WIDTH));
        assert!(text.contains("https://contracts.example.test/"));
    }

    #[test]
    fn pages_are_numbered_in_headers() {
        let doc = render(DocumentType::Nda, &ValueMap::new(), at(8));
        let text = doc.to_text();
        let total = doc.page_count();
        for n in 1..=total {
            assert!(text.contains(&format!("Page {n} of {total}")));
        }
        assert_eq!(text.matches("Generated:").count(), 1);
    }

    #[test]
    fn one_way_nda_names_the_recipient_as_bound() {
        let mut values = synthesize_defaults(DocumentType::Nda.schema());
        values.insert("nda_kind".into(), FieldValue::text("One-way"));
        values.insert("recipient_name".into(), FieldValue::text("Acme Corp"));
        values.insert("return_days".into(), FieldValue::Number(10.0));
        let text = render(DocumentType::Nda, &values, at(8)).to_text();
        assert!(text.contains("NON-DISCLOSURE AGREEMENT"));
        assert!(!text.contains("MUTUAL"));
        assert!(text.contains("10 days of a written request"));
        assert!(text.contains("24 months"));
    }

    #[test]
    fn bytes_are_the_text() {
        let doc = render(DocumentType::Retainer, &ValueMap::new(), at(8));
        assert_eq!(doc.to_bytes(), doc.to_text().into_bytes());
    }
}
