//! One layout function per document type.
//!
//! Templates read values through [`Fields`], which never fails: missing
//! optional values print as `[not specified]` and missing required ones as a
//! "to be confirmed" marker, so drafts and partial inputs still render.

use super::format::{AMOUNT_TBD, DATE_TBD, Fields, NOT_SPECIFIED, cell, format_long_date};
use super::layout::Layout;

pub(super) fn nda(f: &Fields<'_>, out: &mut Layout) {
    let kind = f.text_or("nda_kind", "Mutual");
    let discloser = f.name("disclosing_party");
    let recipient = f.name("recipient_name");
    let mutual = kind.eq_ignore_ascii_case("mutual");

    out.title(if mutual {
        "Mutual Non-Disclosure Agreement"
    } else {
        "Non-Disclosure Agreement"
    });
    out.paragraph(&format!(
        "This Non-Disclosure Agreement (the \"Agreement\") is made effective as of {} \
         between {discloser} (the \"Disclosing Party\") and {recipient} (the \"Recipient\").",
        f.date_or("effective_date", DATE_TBD),
    ));

    out.heading("Parties");
    out.field("Disclosing party", &discloser);
    out.field("Address", &f.optional("disclosing_address"));
    out.field("Recipient", &recipient);
    out.field("Recipient email", &f.optional("recipient_email"));
    out.field("Agreement type", &kind);

    out.heading("1. Purpose");
    out.paragraph(&f.optional("purpose"));

    out.heading("2. Confidential Information");
    if mutual {
        out.paragraph(
            "Each party may disclose confidential information to the other. Each party \
             shall hold the other's confidential information in strict confidence and use \
             it solely for the purpose stated above.",
        );
    } else {
        out.paragraph(&format!(
            "{recipient} shall hold all confidential information received from {discloser} \
             in strict confidence and use it solely for the purpose stated above."
        ));
    }
    out.paragraph(
        "Confidential information does not include information that is or becomes \
         public through no fault of the receiving party, or that the receiving party \
         already lawfully possessed.",
    );
    out.field("Additional exclusions", &f.optional("exclusions"));

    out.heading("3. Term");
    out.paragraph(&format!(
        "The obligations of this Agreement continue for {} months from the effective date.",
        f.number("term_months").unwrap_or_else(|| NOT_SPECIFIED.to_string()),
    ));

    out.heading("4. Return of Materials");
    out.paragraph(&match f.number("return_days") {
        Some(days) => format!(
            "The Recipient shall return or destroy all confidential materials within {days} \
             days of a written request."
        ),
        None => "The Recipient shall return or destroy all confidential materials promptly \
                 upon written request."
            .to_string(),
    });

    out.heading("5. Governing Law");
    out.paragraph(&format!(
        "This Agreement is governed by the laws of {}.",
        f.optional("governing_law")
    ));

    out.page_break();
    out.heading("Signatures");
    out.signature("Disclosing party", &discloser);
    out.signature("Recipient", &recipient);
}

pub(super) fn msa(f: &Fields<'_>, out: &mut Layout) {
    let provider = f.name("provider_name");
    let client = f.name("client_name");

    out.title("Master Services Agreement");
    out.paragraph(&format!(
        "This Master Services Agreement (the \"Agreement\") is entered into as of {} by \
         {provider} (the \"Provider\") and {client} (the \"Client\"). It governs every \
         statement of work the parties sign under it.",
        f.date_or("effective_date", DATE_TBD),
    ));

    out.heading("Parties");
    out.field("Provider", &provider);
    out.field("Client", &client);
    out.field("Client email", &f.optional("client_email"));
    out.field("Client address", &f.optional("client_address"));

    out.heading("1. Services");
    out.paragraph(
        "The Provider will perform the services described in each statement of work. \
         Where a statement of work conflicts with this Agreement, this Agreement prevails \
         unless the statement of work expressly says otherwise.",
    );

    out.heading("2. Payment");
    out.paragraph(&format!(
        "Invoices are payable within {} days of issue.",
        f.number("payment_terms_days")
            .unwrap_or_else(|| NOT_SPECIFIED.to_string()),
    ));
    out.field(
        "Late fee",
        &f.number("late_fee_percent")
            .map(|pct| format!("{pct}% per month on overdue amounts"))
            .unwrap_or_else(|| NOT_SPECIFIED.to_string()),
    );

    out.heading("3. Limitation of Liability");
    out.paragraph(&match f.currency("liability_cap") {
        Some(cap) => format!(
            "Each party's aggregate liability under this Agreement is limited to {cap}."
        ),
        None => "Each party's aggregate liability under this Agreement is limited to the \
                 fees paid in the twelve months preceding the claim."
            .to_string(),
    });

    out.heading("4. Term and Termination");
    out.paragraph(&format!(
        "Either party may terminate this Agreement with {} days' written notice. \
         Statements of work in progress survive termination until completed or cancelled.",
        f.number("termination_notice_days")
            .unwrap_or_else(|| NOT_SPECIFIED.to_string()),
    ));

    out.heading("5. Governing Law");
    out.paragraph(&format!(
        "This Agreement is governed by the laws of {}.",
        f.optional("governing_law")
    ));

    out.heading("6. Special Terms");
    out.paragraph(&f.optional("special_terms"));

    out.page_break();
    out.heading("Signatures");
    out.signature("Provider", &provider);
    out.signature("Client", &client);
}

pub(super) fn sow(f: &Fields<'_>, out: &mut Layout) {
    let project = f.name("project_name");
    let client = f.name("client_name");

    out.title("Statement of Work");
    out.field("Project", &project);
    out.field("Client", &client);
    out.field("Client email", &f.optional("client_email"));
    out.field("Master agreement", &f.optional("msa_reference"));
    out.blank();

    out.heading("1. Scope");
    out.paragraph(&f.optional("scope_summary"));

    out.heading("2. Deliverables");
    let deliverables = f.rows("deliverables");
    if deliverables.is_empty() {
        out.paragraph(NOT_SPECIFIED);
    }
    for (i, row) in deliverables.iter().enumerate() {
        let title = cell(row, "title").unwrap_or(NOT_SPECIFIED);
        let due = cell(row, "due_date")
            .map(|d| format_long_date(d).unwrap_or_else(|| d.to_string()));
        let line = match due {
            Some(due) => format!("{title} (due {due})"),
            None => title.to_string(),
        };
        out.item(&format!("{}.", i + 1), &line);
        if let Some(description) = cell(row, "description") {
            out.item("   ", description);
        }
    }

    out.heading("3. Timeline");
    out.field("Start date", &f.date_or("start_date", DATE_TBD));
    out.field("Target completion", &f.date_or("end_date", NOT_SPECIFIED));

    out.heading("4. Fees");
    out.field("Total fee", &f.currency_or("total_fee", AMOUNT_TBD));
    out.field("Billing schedule", &f.optional("billing_schedule"));

    out.page_break();
    out.heading("Acceptance");
    out.paragraph(&format!(
        "Signed by the parties to confirm the scope and fees of {project}."
    ));
    out.signature("Client", &client);
    out.signature("Provider", "");
}

pub(super) fn retainer(f: &Fields<'_>, out: &mut Layout) {
    let client = f.name("client_name");

    out.title("Retainer Agreement");
    out.paragraph(&format!(
        "This Retainer Agreement begins on {} and continues month to month until \
         cancelled as set out below.",
        f.date_or("start_date", DATE_TBD),
    ));

    out.heading("Client");
    out.field("Client", &client);
    out.field("Client email", &f.optional("client_email"));
    out.field("Contact person", &f.optional("contact_person"));

    out.heading("1. Fees");
    out.field("Monthly fee", &f.currency_or("monthly_fee", AMOUNT_TBD));
    out.field(
        "Included hours",
        &f.number("included_hours")
            .map(|h| format!("{h} hours per month"))
            .unwrap_or_else(|| NOT_SPECIFIED.to_string()),
    );
    out.field(
        "Overage rate",
        &f.currency("overage_rate")
            .map(|r| format!("{r} per hour"))
            .unwrap_or_else(|| NOT_SPECIFIED.to_string()),
    );
    out.field(
        "Billing day",
        &f.number("billing_day")
            .map(|d| format!("Day {d} of each month"))
            .unwrap_or_else(|| NOT_SPECIFIED.to_string()),
    );

    out.heading("2. Covered Services");
    let services = f.rows("services");
    if services.is_empty() {
        out.paragraph(NOT_SPECIFIED);
    }
    for row in services {
        let service = cell(row, "service").unwrap_or(NOT_SPECIFIED);
        match cell(row, "notes") {
            Some(notes) => out.item("-", &format!("{service}: {notes}")),
            None => out.item("-", service),
        }
    }

    out.heading("3. Cancellation");
    out.paragraph(&format!(
        "Either party may cancel this retainer with {} days' written notice. Unused \
         hours do not carry over between months.",
        f.number("notice_days").unwrap_or_else(|| NOT_SPECIFIED.to_string()),
    ));

    out.heading("4. Governing Law");
    out.paragraph(&format!(
        "This Agreement is governed by the laws of {}.",
        f.optional("governing_law")
    ));

    out.page_break();
    out.heading("Signatures");
    out.signature("Client", &client);
    out.signature("Provider", "");
}
