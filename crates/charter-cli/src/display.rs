//! Vertical cards and compact tables for documents, schemas and invoices.

use charter_core::render::format_currency;
use charter_core::{
    DocumentRecord, DocumentType, DocumentTypeSchema, FieldKind, FieldValue, InvoiceRecord,
    PaymentRecord, PublicDocumentView, Row, Violation,
};

const MAX_LIST_ITEMS: usize = 10;

// ── Public API ──

pub fn print_types() {
    for &doc_type in DocumentType::all() {
        let schema = doc_type.schema();
        println!("  {:<10} {}", doc_type.slug(), schema.display_name);
        println!("  {:<10} {}", "", schema.summary);
    }
}

/// Sections and fields of a schema, one field per line.
pub fn print_schema(schema: &DocumentTypeSchema) {
    println!("=== {} ({}) ===", schema.display_name, schema.doc_type.slug());
    println!("{}", schema.summary);
    println!();
    for (i, section) in schema.sections.iter().enumerate() {
        println!("{}. {}", i + 1, section.title);
        if let Some(description) = section.description {
            println!("   {description}");
        }
        for field in section.fields {
            println!("  {:<26} {}", field.key, describe_field(field));
            for sub in field.subfields {
                println!("    - {:<22} {}", sub.key, describe_field(sub));
            }
        }
        println!();
    }
}

fn describe_field(field: &charter_core::FieldSpec) -> String {
    let mut parts = vec![format!("{} ({})", field.label, field.kind)];
    if field.required {
        parts.push("required".into());
    }
    if let Some(default) = field.default {
        parts.push(format!("default {default}"));
    }
    if let Some(minimum) = field.minimum {
        parts.push(format!("min {minimum}"));
    }
    if field.kind == FieldKind::Select {
        parts.push(format!("one of: {}", field.options.join(", ")));
    }
    parts.join(", ")
}

pub fn print_document_table(docs: &[DocumentRecord]) {
    if docs.is_empty() {
        println!("No documents.");
        return;
    }
    println!("{:<36}  {:<8}  {:<8}  {:<10}  TITLE", "ID", "TYPE", "STATUS", "CREATED");
    for doc in docs {
        println!(
            "{:<36}  {:<8}  {:<8}  {:<10}  {}",
            doc.id,
            doc.doc_type.slug(),
            doc.status.as_str(),
            doc.created_at.format("%Y-%m-%d"),
            doc.title
        );
    }
}

/// Full document card grouped into record, values and timestamps.
pub fn print_document_card(doc: &DocumentRecord, share_link: Option<&str>) {
    let schema = doc.doc_type.schema();
    println!("=== {} ===", doc.title);
    println!();

    println!("Document");
    println!("  {:<26} {}", "id", doc.id);
    println!("  {:<26} {} ({})", "type", schema.display_name, doc.doc_type.slug());
    println!("  {:<26} {}", "status", doc.status);
    if !doc.counterparty_name.is_empty() || !doc.counterparty_email.is_empty() {
        println!(
            "  {:<26} {} <{}>",
            "counterparty", doc.counterparty_name, doc.counterparty_email
        );
    }
    match &doc.rendered_file_ref {
        Some(object) => println!("  {:<26} {}", "rendered file", object),
        None => println!("  {:<26} (none, draft)", "rendered file"),
    }
    println!("  {:<26} {}", "share token", doc.share_token);
    if let Some(link) = share_link {
        println!("  {:<26} {}", "share link", link);
    }
    if let Some(expires) = doc.expires_at {
        println!("  {:<26} {}", "expires", expires.format("%Y-%m-%d %H:%M UTC"));
    }
    println!();

    println!("Values");
    for field in schema.fields() {
        match doc.values.get(field.key) {
            Some(FieldValue::Rows(rows)) => print_rows(field.label, rows),
            Some(value) if !value.is_blank() => println!("  {:<26} {}", field.label, value),
            _ => {}
        }
    }
    println!();

    println!("Timestamps");
    println!("  {:<26} {}", "created_by", doc.created_by);
    println!("  {:<26} {}", "created_at", doc.created_at.to_rfc3339());
    println!("  {:<26} {}", "updated_at", doc.updated_at.to_rfc3339());
}

fn print_rows(label: &str, rows: &[Row]) {
    if rows.is_empty() {
        return;
    }
    println!("  {} ({}):", label, rows.len());
    for (i, row) in rows.iter().take(MAX_LIST_ITEMS).enumerate() {
        let cells: Vec<String> = row
            .iter()
            .filter(|(_, v)| !v.trim().is_empty())
            .map(|(k, v)| format!("{k}={v}"))
            .collect();
        println!("    {}. {}", i + 1, cells.join(", "));
    }
    if rows.len() > MAX_LIST_ITEMS {
        println!("    ... and {} more", rows.len() - MAX_LIST_ITEMS);
    }
}

pub fn print_public_view(view: &PublicDocumentView) {
    println!("=== {} ===", view.title);
    println!("  {:<26} {}", "id", view.id);
    println!("  {:<26} {}", "type", view.doc_type.slug());
    println!("  {:<26} {}", "counterparty", view.counterparty_name);
    println!("  {:<26} {}", "status", view.status);
    if let Some(object) = &view.rendered_file_ref {
        println!("  {:<26} {}", "rendered file", object);
    }
    println!("  {:<26} {}", "created_at", view.created_at.to_rfc3339());
    if let Some(expires) = view.expires_at {
        println!("  {:<26} {}", "expires", expires.to_rfc3339());
    }
}

pub fn print_violations(violations: &[Violation]) {
    for v in violations {
        eprintln!("  - {v}");
    }
}

pub fn print_invoice_table(invoices: &[InvoiceRecord]) {
    if invoices.is_empty() {
        println!("No invoices.");
        return;
    }
    println!(
        "{:<36}  {:<12}  {:<8}  {:>14}  {:<10}  CLIENT",
        "ID", "NUMBER", "STATUS", "AMOUNT", "DUE"
    );
    for inv in invoices {
        println!(
            "{:<36}  {:<12}  {:<8}  {:>14}  {:<10}  {}",
            inv.id,
            inv.number,
            inv.status.as_str(),
            format_currency(inv.amount),
            inv.due_date
                .map(|d| d.to_string())
                .unwrap_or_else(|| "-".into()),
            inv.client_name
        );
    }
}

pub fn print_invoice_card(inv: &InvoiceRecord) {
    println!("=== Invoice {} ===", inv.number);
    println!("  {:<26} {}", "id", inv.id);
    println!("  {:<26} {}", "client", inv.client_name);
    println!("  {:<26} {}", "amount", format_currency(inv.amount));
    println!("  {:<26} {}", "status", inv.status);
    if inv.status != inv.issued_status {
        println!("  {:<26} {}", "issued status", inv.issued_status);
    }
    if let Some(due) = inv.due_date {
        println!("  {:<26} {}", "due", due);
    }
    println!("  {:<26} {}", "updated_at", inv.updated_at.to_rfc3339());
}

pub fn print_payments(payments: &[PaymentRecord]) {
    if payments.is_empty() {
        println!("No payments.");
        return;
    }
    for p in payments {
        println!(
            "  {:<36}  {}  {:>14}  {}",
            p.id,
            p.payment_date,
            format_currency(p.amount),
            p.method.as_deref().unwrap_or("-")
        );
    }
    let total = charter_core::billing::paid_total(payments);
    println!("  {:<36}  {:<10}  {:>14}", "", "total", format_currency(total));
}
