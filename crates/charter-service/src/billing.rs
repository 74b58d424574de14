//! Invoices and payments, with invoice status kept in step with payments.

use std::collections::HashMap;
use std::sync::Arc;

use chrono::{NaiveDate, Utc};
use rust_decimal::Decimal;
use tokio::sync::{Mutex, OwnedMutexGuard};
use tracing::info;

use charter_core::billing::paid_total;
use charter_core::{
    ActorId, InvoiceId, InvoiceRecord, InvoiceStatus, PaymentId, PaymentRecord, reconcile,
};
use charter_store::RecordStore;

use crate::audit::{AuditEvent, AuditSink};
use crate::error::ServiceError;

/// Input for [`BillingService::create_invoice`].
#[derive(Debug, Clone)]
pub struct NewInvoice {
    pub number: String,
    pub client_name: String,
    pub amount: Decimal,
    pub status: InvoiceStatus,
    pub due_date: Option<NaiveDate>,
}

pub struct BillingService {
    records: Arc<dyn RecordStore>,
    audit: Arc<dyn AuditSink>,
    locks: Mutex<HashMap<InvoiceId, Arc<Mutex<()>>>>,
}

impl BillingService {
    pub fn new(records: Arc<dyn RecordStore>, audit: Arc<dyn AuditSink>) -> Self {
        Self {
            records,
            audit,
            locks: Mutex::new(HashMap::new()),
        }
    }

    /// Serialises every status-affecting write for one invoice.
    async fn lock_invoice(&self, id: InvoiceId) -> OwnedMutexGuard<()> {
        let lock = self.locks.lock().await.entry(id).or_default().clone();
        lock.lock_owned().await
    }

    pub async fn create_invoice(
        &self,
        actor: &ActorId,
        new: NewInvoice,
    ) -> Result<InvoiceRecord, ServiceError> {
        let number = new.number.trim();
        if number.is_empty() {
            return Err(ServiceError::InvalidInput("invoice number is required".into()));
        }
        if new.amount < Decimal::ZERO {
            return Err(ServiceError::InvalidInput(
                "invoice amount cannot be negative".into(),
            ));
        }
        reject_derived(new.status)?;

        let now = Utc::now();
        let invoice = InvoiceRecord {
            id: InvoiceId::new(),
            number: number.to_string(),
            client_name: new.client_name.trim().to_string(),
            amount: new.amount,
            status: new.status,
            issued_status: new.status,
            due_date: new.due_date,
            created_at: now,
            updated_at: now,
        };
        self.records.insert_invoice(invoice.clone()).await?;

        info!(invoice_id = %invoice.id, number = %invoice.number, amount = %invoice.amount, "invoice created");
        self.audit.record(AuditEvent::new(
            "invoice.created",
            actor,
            invoice.id,
            format!("{} {}", invoice.number, invoice.amount),
        ));
        Ok(invoice)
    }

    /// Set an invoice-flow status (`draft`, `pending`, `overdue`).
    ///
    /// The status becomes the invoice's issued status. While payments exist
    /// the visible status stays derived from them.
    pub async fn set_invoice_status(
        &self,
        actor: &ActorId,
        id: InvoiceId,
        status: InvoiceStatus,
    ) -> Result<InvoiceRecord, ServiceError> {
        reject_derived(status)?;
        let _guard = self.lock_invoice(id).await;

        let mut invoice = self.get_invoice(id).await?;
        let payments = self.records.payments_for_invoice(id).await?;
        invoice.issued_status = status;
        invoice.status = reconcile(&invoice, paid_total(&payments));
        invoice.updated_at = Utc::now();
        self.records.update_invoice(invoice.clone()).await?;

        info!(invoice_id = %id, issued = %status, status = %invoice.status, "invoice status set");
        self.audit.record(AuditEvent::new(
            "invoice.status_changed",
            actor,
            id,
            status.to_string(),
        ));
        Ok(invoice)
    }

    pub async fn list_invoices(&self) -> Result<Vec<InvoiceRecord>, ServiceError> {
        Ok(self.records.list_invoices().await?)
    }

    pub async fn get_invoice(&self, id: InvoiceId) -> Result<InvoiceRecord, ServiceError> {
        self.records
            .get_invoice(id)
            .await?
            .ok_or_else(|| ServiceError::not_found("invoice", id))
    }

    /// Record a payment and return it with the reconciled invoice.
    pub async fn record_payment(
        &self,
        actor: &ActorId,
        invoice_id: InvoiceId,
        amount: Decimal,
        payment_date: NaiveDate,
        method: Option<String>,
    ) -> Result<(PaymentRecord, InvoiceRecord), ServiceError> {
        if amount <= Decimal::ZERO {
            return Err(ServiceError::InvalidPayment(
                "payment amount must be greater than zero".into(),
            ));
        }
        let _guard = self.lock_invoice(invoice_id).await;
        self.get_invoice(invoice_id).await?;

        let payment = PaymentRecord {
            id: PaymentId::new(),
            invoice_id,
            amount,
            payment_date,
            method: method
                .map(|m| m.trim().to_string())
                .filter(|m| !m.is_empty()),
            created_at: Utc::now(),
        };
        self.records.insert_payment(payment.clone()).await?;
        let invoice = self.reconcile_invoice(invoice_id).await?;

        info!(
            invoice_id = %invoice_id,
            payment_id = %payment.id,
            amount = %amount,
            status = %invoice.status,
            "payment recorded"
        );
        self.audit.record(AuditEvent::new(
            "payment.recorded",
            actor,
            payment.id,
            format!("{amount} on invoice {}", invoice.number),
        ));
        Ok((payment, invoice))
    }

    /// Delete a payment and return the reconciled invoice.
    pub async fn delete_payment(
        &self,
        actor: &ActorId,
        payment_id: PaymentId,
    ) -> Result<InvoiceRecord, ServiceError> {
        let payment = self
            .records
            .get_payment(payment_id)
            .await?
            .ok_or_else(|| ServiceError::not_found("payment", payment_id))?;
        let _guard = self.lock_invoice(payment.invoice_id).await;

        self.records.delete_payment(payment_id).await?;
        let invoice = self.reconcile_invoice(payment.invoice_id).await?;

        info!(
            invoice_id = %invoice.id,
            payment_id = %payment_id,
            status = %invoice.status,
            "payment deleted"
        );
        self.audit.record(AuditEvent::new(
            "payment.deleted",
            actor,
            payment_id,
            format!("{} on invoice {}", payment.amount, invoice.number),
        ));
        Ok(invoice)
    }

    pub async fn payments_for_invoice(
        &self,
        invoice_id: InvoiceId,
    ) -> Result<Vec<PaymentRecord>, ServiceError> {
        self.get_invoice(invoice_id).await?;
        Ok(self.records.payments_for_invoice(invoice_id).await?)
    }

    /// Recompute status from a fresh read of every payment. Caller holds the
    /// invoice lock.
    async fn reconcile_invoice(&self, id: InvoiceId) -> Result<InvoiceRecord, ServiceError> {
        let mut invoice = self.get_invoice(id).await?;
        let payments = self.records.payments_for_invoice(id).await?;
        let status = reconcile(&invoice, paid_total(&payments));
        if status != invoice.status {
            invoice.status = status;
            invoice.updated_at = Utc::now();
            self.records.update_invoice(invoice.clone()).await?;
        }
        Ok(invoice)
    }
}

fn reject_derived(status: InvoiceStatus) -> Result<(), ServiceError> {
    if status.is_payment_derived() {
        Err(ServiceError::InvalidTransition(format!(
            "{status} is set by recorded payments, not directly"
        )))
    } else {
        Ok(())
    }
}
