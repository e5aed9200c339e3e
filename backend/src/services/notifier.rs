//! # Notifier
//!
//! Queues customer and affiliate emails in `email_queue` for the mailer
//! to pick up. Called only after the business transaction has committed:
//! a failure here is logged and never undoes the action that triggered it.

use rust_decimal::Decimal;
use serde_json::json;
use tracing::{debug, warn};

use crate::db::queries;
use crate::db::{Database, DatabaseError, OrderRecord, WithdrawalRecord, WithdrawalStatus};
use crate::utils::format_currency;

/// Email templates understood by the mailer.
pub mod templates {
    pub const ORDER_PAID: &str = "order_paid";
    pub const ORDER_CANCELLED: &str = "order_cancelled";
    pub const WITHDRAWAL_PROCESSED: &str = "withdrawal_processed";
}

/// Best-effort outbox writer.
#[derive(Clone)]
pub struct Notifier {
    db: Database,
    currency_symbol: String,
}

impl Notifier {
    pub fn new(db: Database, currency_symbol: impl Into<String>) -> Self {
        Self {
            db,
            currency_symbol: currency_symbol.into(),
        }
    }

    /// Payment confirmation for the customer.
    pub async fn order_paid(&self, order: &OrderRecord, amount_paid: Decimal) {
        let payload = json!({
            "orderId": order.id,
            "customerName": order.customer_name,
            "amount": format_currency(amount_paid, &self.currency_symbol),
        });
        let subject = format!("Payment confirmed for order #{}", order.id);

        self.send(&order.customer_email, &subject, templates::ORDER_PAID, payload)
            .await;
    }

    /// Cancellation notice for the customer.
    pub async fn order_cancelled(&self, order: &OrderRecord, reason: &str) {
        let payload = json!({
            "orderId": order.id,
            "customerName": order.customer_name,
            "reason": reason,
        });
        let subject = format!("Your order #{} has been cancelled", order.id);

        self.send(&order.customer_email, &subject, templates::ORDER_CANCELLED, payload)
            .await;
    }

    /// Tells an affiliate what happened to their withdrawal request.
    pub async fn withdrawal_processed(
        &self,
        recipient: &str,
        affiliate_name: &str,
        withdrawal: &WithdrawalRecord,
        status: WithdrawalStatus,
        notes: Option<&str>,
    ) {
        let payload = json!({
            "withdrawalId": withdrawal.id,
            "affiliateName": affiliate_name,
            "amount": format_currency(withdrawal.amount, &self.currency_symbol),
            "status": status.as_str(),
            "notes": notes,
        });
        let subject = format!("Withdrawal request #{} {}", withdrawal.id, status);

        self.send(recipient, &subject, templates::WITHDRAWAL_PROCESSED, payload)
            .await;
    }

    async fn send(&self, recipient: &str, subject: &str, template: &str, payload: serde_json::Value) {
        match self.enqueue(recipient, subject, template, &payload).await {
            Ok(id) => debug!("Queued {} email #{} for {}", template, id, recipient),
            Err(e) => warn!("Could not queue {} email for {}: {}", template, recipient, e),
        }
    }

    async fn enqueue(
        &self,
        recipient: &str,
        subject: &str,
        template: &str,
        payload: &serde_json::Value,
    ) -> Result<i64, DatabaseError> {
        let client = self.db.client().await?;
        queries::enqueue_email(&client, recipient, subject, template, payload).await
    }
}
