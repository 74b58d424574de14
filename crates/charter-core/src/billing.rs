//! Invoice and payment records, and the rule that derives invoice status from
//! the payments recorded against it.

use std::fmt;
use std::str::FromStr;

use chrono::{DateTime, NaiveDate, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::ids::{InvoiceId, PaymentId};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum InvoiceStatus {
    Draft,
    Pending,
    Paid,
    Overdue,
    Partial,
}

impl InvoiceStatus {
    pub fn as_str(self) -> &'static str {
        match self {
            InvoiceStatus::Draft => "draft",
            InvoiceStatus::Pending => "pending",
            InvoiceStatus::Paid => "paid",
            InvoiceStatus::Overdue => "overdue",
            InvoiceStatus::Partial => "partial",
        }
    }

    /// `Paid` and `Partial` only ever come from reconciliation.
    pub fn is_payment_derived(self) -> bool {
        matches!(self, InvoiceStatus::Paid | InvoiceStatus::Partial)
    }
}

impl fmt::Display for InvoiceStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("unknown invoice status {0:?} (expected draft, pending, paid, overdue or partial)")]
pub struct UnknownInvoiceStatus(pub String);

impl FromStr for InvoiceStatus {
    type Err = UnknownInvoiceStatus;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "draft" => Ok(InvoiceStatus::Draft),
            "pending" => Ok(InvoiceStatus::Pending),
            "paid" => Ok(InvoiceStatus::Paid),
            "overdue" => Ok(InvoiceStatus::Overdue),
            "partial" => Ok(InvoiceStatus::Partial),
            _ => Err(UnknownInvoiceStatus(s.to_string())),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct InvoiceRecord {
    pub id: InvoiceId,
    pub number: String,
    pub client_name: String,
    pub amount: Decimal,
    pub status: InvoiceStatus,
    /// Last status set by the invoicing flow itself; restored once no
    /// payments remain.
    pub issued_status: InvoiceStatus,
    pub due_date: Option<NaiveDate>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PaymentRecord {
    pub id: PaymentId,
    pub invoice_id: InvoiceId,
    pub amount: Decimal,
    pub payment_date: NaiveDate,
    pub method: Option<String>,
    pub created_at: DateTime<Utc>,
}

pub fn paid_total(payments: &[PaymentRecord]) -> Decimal {
    payments.iter().map(|p| p.amount).sum()
}

/// Status an invoice should carry given the full sum of its payments.
///
/// Covered in full → `Paid`; anything paid → `Partial`; nothing paid → the
/// status the invoicing flow last set. Always derived from the whole sum, so
/// re-running it after a payment is deleted heals the status.
pub fn reconcile(invoice: &InvoiceRecord, paid_total: Decimal) -> InvoiceStatus {
    if paid_total > Decimal::ZERO {
        if paid_total >= invoice.amount {
            InvoiceStatus::Paid
        } else {
            InvoiceStatus::Partial
        }
    } else {
        invoice.issued_status
    }
}
