mod display;
mod prompt;

use std::path::{Path, PathBuf};
use std::process::ExitCode;
use std::sync::Arc;

use anyhow::{Context, bail};
use chrono::{NaiveDate, Utc};
use clap::{ArgAction, Parser, Subcommand};
use rust_decimal::Decimal;
use tracing::level_filters::LevelFilter;

use charter_core::{
    ActorId, DocumentId, DocumentStatus, DocumentType, EngineConfig, InvoiceId, InvoiceStatus,
    PaymentId, ValueMap, WizardEvent,
};
use charter_mail::RelayClient;
use charter_service::{
    BillingService, DocumentService, NewInvoice, ServiceError, TracingAuditSink,
};
use charter_store::{FsObjectStore, MemoryStore};

#[derive(Parser)]
#[command(name = "charter", version, about = "Contract documents, share links and invoice tracking")]
struct Cli {
    /// Directory holding the record snapshot and rendered files
    #[arg(long, env = "CHARTER_DATA_DIR", default_value = ".charter", global = true)]
    data_dir: PathBuf,

    /// Actor recorded on every change
    #[arg(long, env = "CHARTER_ACTOR", default_value = "cli", global = true)]
    actor: String,

    /// Public base URL for share links
    #[arg(long, env = "CHARTER_SHARE_BASE_URL", global = true)]
    share_base_url: Option<String>,

    /// Days until a new document's share link expires
    #[arg(long, env = "CHARTER_SHARE_EXPIRY_DAYS", global = true)]
    share_expiry_days: Option<i64>,

    /// Base URL of the HTTP mail relay used by `send`
    #[arg(long, env = "CHARTER_MAIL_RELAY", global = true)]
    mail_relay: Option<String>,

    /// Print JSON instead of cards and tables
    #[arg(long, global = true)]
    json: bool,

    /// More log output on stderr (-v info, -vv debug, -vvv trace)
    #[arg(short, long, action = ArgAction::Count, global = true)]
    verbose: u8,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    /// List the registered document types
    Types,

    /// Show the sections and fields of a document type
    Schema { doc_type: DocumentType },

    /// Fill in a document interactively
    Wizard { doc_type: Option<DocumentType> },

    /// Create a document from a JSON value map
    Create {
        doc_type: DocumentType,

        /// JSON object of field values, or @path to a file containing one
        #[arg(long)]
        values: String,

        /// Save without validating or rendering
        #[arg(long)]
        draft: bool,
    },

    /// List documents, newest first
    List {
        /// Include archived documents
        #[arg(long)]
        all: bool,
    },

    /// Show one document
    Show {
        id: DocumentId,

        /// Print the rendered text instead of the record
        #[arg(long)]
        text: bool,
    },

    /// Move a document to a new status
    Status { id: DocumentId, status: DocumentStatus },

    /// Mail a document to its counterparty
    Send { id: DocumentId },

    /// Render a document again from its stored values
    Regenerate { id: DocumentId },

    /// Delete a document and its rendering
    Delete { id: DocumentId },

    /// Resolve a share token the way the public link does
    Share { token: String },

    /// Manage invoices
    Invoice {
        #[command(subcommand)]
        command: InvoiceCommand,
    },

    /// Record a payment against an invoice
    Pay {
        invoice_id: InvoiceId,
        amount: Decimal,

        /// Payment date (YYYY-MM-DD, default today)
        #[arg(long)]
        date: Option<NaiveDate>,

        #[arg(long)]
        method: Option<String>,
    },

    /// Delete a recorded payment
    Unpay { payment_id: PaymentId },

    /// List the payments of an invoice
    Payments { invoice_id: InvoiceId },
}

#[derive(Subcommand)]
enum InvoiceCommand {
    /// Create an invoice
    Create {
        number: String,

        #[arg(long)]
        client: String,

        #[arg(long)]
        amount: Decimal,

        /// draft, pending or overdue
        #[arg(long, default_value = "draft")]
        status: InvoiceStatus,

        /// Due date (YYYY-MM-DD)
        #[arg(long)]
        due: Option<NaiveDate>,
    },

    /// List invoices, newest first
    List,

    /// Set an invoice's status (draft, pending or overdue)
    Status { id: InvoiceId, status: InvoiceStatus },
}

struct App {
    documents: DocumentService,
    billing: BillingService,
    actor: ActorId,
    mail_relay: Option<String>,
    json: bool,
}

impl App {
    fn open(cli: &Cli) -> anyhow::Result<Self> {
        std::fs::create_dir_all(&cli.data_dir)
            .with_context(|| format!("creating {}", cli.data_dir.display()))?;
        let snapshot = cli.data_dir.join("records.json");
        let records = Arc::new(
            MemoryStore::open_persistent(&snapshot)
                .with_context(|| format!("opening {}", snapshot.display()))?,
        );
        let objects = Arc::new(FsObjectStore::new(cli.data_dir.join("objects")));
        let audit = Arc::new(TracingAuditSink);
        let config = EngineConfig {
            share_base_url: cli.share_base_url.clone(),
            share_expiry_days: cli.share_expiry_days,
            ..EngineConfig::default()
        };

        Ok(Self {
            documents: DocumentService::new(records.clone(), objects, audit.clone(), config),
            billing: BillingService::new(records, audit),
            actor: ActorId::new(cli.actor.clone()),
            mail_relay: cli.mail_relay.clone(),
            json: cli.json,
        })
    }

    fn print_json<T: serde::Serialize>(&self, value: &T) -> anyhow::Result<()> {
        println!("{}", serde_json::to_string_pretty(value)?);
        Ok(())
    }
}

#[tokio::main]
async fn main() -> ExitCode {
    let cli = Cli::parse();

    let level = match cli.verbose {
        0 => LevelFilter::WARN,
        1 => LevelFilter::INFO,
        2 => LevelFilter::DEBUG,
        _ => LevelFilter::TRACE,
    };
    tracing_subscriber::fmt()
        .with_max_level(level)
        .with_writer(std::io::stderr)
        .init();
    tracing::debug!("charter v{}", env!("CARGO_PKG_VERSION"));

    match run(cli).await {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            match e.downcast_ref::<ServiceError>() {
                Some(ServiceError::Validation(violations)) => {
                    eprintln!("error: the document is incomplete");
                    display::print_violations(violations);
                }
                Some(service_error) => {
                    tracing::error!(error = %service_error, "command failed");
                    eprintln!("error: {}", service_error.user_message());
                }
                None => eprintln!("error: {e:#}"),
            }
            ExitCode::FAILURE
        }
    }
}

async fn run(cli: Cli) -> anyhow::Result<()> {
    match &cli.command {
        Command::Types => {
            display::print_types();
            return Ok(());
        }
        Command::Schema { doc_type } => {
            display::print_schema(doc_type.schema());
            return Ok(());
        }
        _ => {}
    }

    let app = App::open(&cli)?;
    match cli.command {
        Command::Types | Command::Schema { .. } => {}
        Command::Wizard { doc_type } => cmd_wizard(&app, doc_type).await?,
        Command::Create {
            doc_type,
            values,
            draft,
        } => {
            let values = read_values(&values)?;
            let record = app
                .documents
                .create_document(&app.actor, doc_type, values, draft)
                .await?;
            report_created(&app, &record)?;
        }
        Command::List { all } => {
            let docs = app.documents.list_documents(all).await?;
            if app.json {
                app.print_json(&docs)?;
            } else {
                display::print_document_table(&docs);
            }
        }
        Command::Show { id, text } => {
            if text {
                let bytes = app.documents.rendered_bytes(id).await?;
                print!("{}", String::from_utf8_lossy(&bytes));
            } else {
                let doc = app.documents.get_document(id).await?;
                if app.json {
                    app.print_json(&doc)?;
                } else {
                    let link = app.documents.config().share_base_url.as_ref().map(|_| {
                        app.documents.share_link(&doc)
                    });
                    display::print_document_card(&doc, link.as_deref());
                }
            }
        }
        Command::Status { id, status } => {
            let doc = app.documents.update_status(&app.actor, id, status).await?;
            eprintln!("{} is now {}", doc.title, doc.status);
        }
        Command::Send { id } => {
            let Some(relay) = &app.mail_relay else {
                bail!("no mail relay configured (set --mail-relay or CHARTER_MAIL_RELAY)");
            };
            let mailer = RelayClient::new(relay.clone());
            let (doc, receipt) = app.documents.send_document(&app.actor, id, &mailer).await?;
            eprintln!(
                "Sent {} to {} (message {}), status {}",
                doc.title, doc.counterparty_email, receipt.id, doc.status
            );
        }
        Command::Regenerate { id } => {
            let doc = app.documents.regenerate(&app.actor, id).await?;
            if let Some(object) = &doc.rendered_file_ref {
                eprintln!("Rendered {} to {}", doc.title, object);
            }
        }
        Command::Delete { id } => {
            app.documents.delete_document(&app.actor, id).await?;
            eprintln!("Deleted {id}");
        }
        Command::Share { token } => {
            let view = app.documents.resolve_share(&token).await?;
            if app.json {
                app.print_json(&view)?;
            } else {
                display::print_public_view(&view);
            }
        }
        Command::Invoice { command } => cmd_invoice(&app, command).await?,
        Command::Pay {
            invoice_id,
            amount,
            date,
            method,
        } => {
            let date = date.unwrap_or_else(|| Utc::now().date_naive());
            let (payment, invoice) = app
                .billing
                .record_payment(&app.actor, invoice_id, amount, date, method)
                .await?;
            eprintln!("Recorded payment {}", payment.id);
            display::print_invoice_card(&invoice);
        }
        Command::Unpay { payment_id } => {
            let invoice = app.billing.delete_payment(&app.actor, payment_id).await?;
            eprintln!("Deleted payment {payment_id}");
            display::print_invoice_card(&invoice);
        }
        Command::Payments { invoice_id } => {
            let payments = app.billing.payments_for_invoice(invoice_id).await?;
            if app.json {
                app.print_json(&payments)?;
            } else {
                display::print_payments(&payments);
            }
        }
    }
    Ok(())
}

async fn cmd_wizard(app: &App, doc_type: Option<DocumentType>) -> anyhow::Result<()> {
    let stdin = std::io::stdin();
    let outcome = prompt::Prompter::new(stdin.lock(), std::io::stderr()).run(doc_type)?;
    let prompt::Outcome::Submit { wizard, draft } = outcome else {
        eprintln!("Wizard cancelled; nothing saved.");
        return Ok(());
    };
    let Some(doc_type) = wizard.doc_type() else {
        bail!("wizard finished without a document type");
    };

    let record = app
        .documents
        .create_document(&app.actor, doc_type, wizard.values().clone(), draft)
        .await?;
    let finished = wizard.apply(WizardEvent::Finish(record.id))?;
    tracing::debug!(phase = %finished.phase(), document_id = %record.id, "wizard finished");
    report_created(app, &record)
}

async fn cmd_invoice(app: &App, command: InvoiceCommand) -> anyhow::Result<()> {
    match command {
        InvoiceCommand::Create {
            number,
            client,
            amount,
            status,
            due,
        } => {
            let invoice = app
                .billing
                .create_invoice(
                    &app.actor,
                    NewInvoice {
                        number,
                        client_name: client,
                        amount,
                        status,
                        due_date: due,
                    },
                )
                .await?;
            if app.json {
                app.print_json(&invoice)?;
            } else {
                display::print_invoice_card(&invoice);
            }
        }
        InvoiceCommand::List => {
            let invoices = app.billing.list_invoices().await?;
            if app.json {
                app.print_json(&invoices)?;
            } else {
                display::print_invoice_table(&invoices);
            }
        }
        InvoiceCommand::Status { id, status } => {
            let invoice = app.billing.set_invoice_status(&app.actor, id, status).await?;
            display::print_invoice_card(&invoice);
        }
    }
    Ok(())
}

fn report_created(app: &App, record: &charter_core::DocumentRecord) -> anyhow::Result<()> {
    if app.json {
        return app.print_json(record);
    }
    let kind = if record.rendered_file_ref.is_some() {
        "Created"
    } else {
        "Saved draft"
    };
    eprintln!("{kind} {} ({})", record.title, record.id);
    println!("{}", record.id);
    if app.documents.config().share_base_url.is_some() {
        eprintln!("Share link: {}", app.documents.share_link(record));
    }
    Ok(())
}

/// Parse `--values`: inline JSON, or `@path` to a JSON file.
fn read_values(arg: &str) -> anyhow::Result<ValueMap> {
    let text = match arg.strip_prefix('@') {
        Some(path) => std::fs::read_to_string(Path::new(path))
            .with_context(|| format!("reading values from {path}"))?,
        None => arg.to_string(),
    };
    serde_json::from_str(&text).context("values must be a JSON object of field values")
}

#[cfg(test)]
mod tests {
    use super::*;
    use charter_core::FieldValue;
    use clap::CommandFactory;

    #[test]
    fn cli_definition_is_consistent() {
        Cli::command().debug_assert();
    }

    #[test]
    fn subcommands_parse_typed_arguments() {
        let cli = Cli::try_parse_from([
            "charter", "pay", "3f2504e0-4f89-11d3-9a0c-0305e82c3301", "250.50", "--date",
            "2026-07-01",
        ])
        .unwrap();
        let Command::Pay { amount, date, .. } = cli.command else {
            panic!("expected pay");
        };
        assert_eq!(amount, Decimal::new(25050, 2));
        assert_eq!(date, NaiveDate::from_ymd_opt(2026, 7, 1));

        assert!(Cli::try_parse_from(["charter", "schema", "lease"]).is_err());
        assert!(Cli::try_parse_from(["charter", "status", "not-an-id", "sent"]).is_err());
    }

    #[test]
    fn values_accept_inline_json_and_files() {
        let inline = read_values(r#"{"term_months": 12, "recipient_name": "Acme"}"#).unwrap();
        assert_eq!(inline["term_months"], FieldValue::Number(12.0));

        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("values.json");
        std::fs::write(&path, r#"{"deliverables": [{"title": "Homepage"}]}"#).unwrap();
        let from_file = read_values(&format!("@{}", path.display())).unwrap();
        assert_eq!(from_file["deliverables"].rows().map(<[_]>::len), Some(1));

        assert!(read_values("[1, 2]").is_err());
    }
}
