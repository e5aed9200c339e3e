//! # Order Finalizer
//!
//! Moves pending orders to their terminal states.
//!
//! ## Finalize flow
//!
//! ```text
//! validate request (amount, notes, assignment ids)
//!               ↓
//! BEGIN
//!   lock order ──── missing ──> NotFound      not pending ──> InvalidState
//!               ↓
//!   resolve amount (explicit amount, else computed total; 0 ──> InvalidInput)
//!               ↓
//!   claim each requested domain ──── any failure ──> ROLLBACK
//!               ↓
//!   commission (active affiliate matching the code)
//!               ↓
//!   order -> paid, sale row, affiliate ledger, activity log
//! COMMIT
//!               ↓
//! queue confirmation email (best effort)
//! ```
//!
//! Everything between BEGIN and COMMIT is one transaction: the order,
//! its sale, the affiliate's balances and the domain claims change
//! together or not at all.

use rust_decimal::Decimal;
use std::collections::HashSet;
use tracing::{info, warn};
use uuid::Uuid;

use crate::config::AppConfig;
use crate::db::queries;
use crate::db::{Database, NewSale};
use crate::models::{DomainAssignment, FinalizeOrderRequest, FinalizeOrderResponse, MessageResponse};
use crate::utils::{format_currency, round_money, sanitize_input, sanitize_optional, truncate_string};

use super::domain_allocator::{assign_item_domain_in, assign_order_domain_in, AssignOutcome};
use super::order_repository::{load_pricing, resolve_final_amount};
use super::{Notifier, ServiceError};

/// Longest payment note kept.
const MAX_NOTES_CHARS: usize = 1000;

/// Longest cancellation reason kept.
const MAX_REASON_CHARS: usize = 500;

/// Reason recorded when an admin gives none.
pub const DEFAULT_CANCEL_REASON: &str = "Cancelled by administrator";

/// Reject assignment lists that could not possibly succeed.
fn validate_assignments(assignments: &[DomainAssignment]) -> Result<(), ServiceError> {
    let mut seen = HashSet::with_capacity(assignments.len());

    for assignment in assignments {
        if assignment.domain_id <= 0 {
            return Err(ServiceError::InvalidInput(format!(
                "Invalid domain id {}",
                assignment.domain_id
            )));
        }
        if assignment.order_item_id.is_some_and(|id| id <= 0) {
            return Err(ServiceError::InvalidInput("Invalid order item id".to_string()));
        }
        if !seen.insert(assignment.domain_id) {
            return Err(ServiceError::InvalidInput(format!(
                "Domain {} is listed more than once",
                assignment.domain_id
            )));
        }
    }

    Ok(())
}

/// Check an admin-entered amount.
fn validate_amount(amount: Option<Decimal>) -> Result<Option<Decimal>, ServiceError> {
    match amount {
        Some(a) if a <= Decimal::ZERO => Err(ServiceError::InvalidInput(
            "Amount paid must be greater than zero".to_string(),
        )),
        Some(a) => Ok(Some(round_money(a))),
        None => Ok(None),
    }
}

/// Service for marking orders paid or cancelled.
#[derive(Clone)]
pub struct OrderFinalizer {
    db: Database,
    config: AppConfig,
    notifier: Notifier,
}

impl OrderFinalizer {
    pub fn new(db: Database, config: AppConfig, notifier: Notifier) -> Self {
        Self { db, config, notifier }
    }

    /// Mark an order paid for an explicit amount, without domain changes.
    pub async fn mark_order_paid(
        &self,
        order_id: i64,
        admin_id: i64,
        amount_paid: Decimal,
        payment_notes: Option<String>,
    ) -> Result<FinalizeOrderResponse, ServiceError> {
        let request = FinalizeOrderRequest {
            amount_paid: Some(amount_paid),
            notes: payment_notes,
            domain_assignments: Vec::new(),
        };
        self.finalize_order(order_id, admin_id, request).await
    }

    /// Mark an order paid, assigning any requested domains atomically.
    ///
    /// Without `amount_paid` the order's computed total is charged.
    pub async fn finalize_order(
        &self,
        order_id: i64,
        admin_id: i64,
        request: FinalizeOrderRequest,
    ) -> Result<FinalizeOrderResponse, ServiceError> {
        let explicit_amount = validate_amount(request.amount_paid)?;
        validate_assignments(&request.domain_assignments)?;
        let notes = sanitize_optional(request.notes.as_deref(), MAX_NOTES_CHARS);

        let mut client = self.db.client().await?;
        let tx = client.transaction().await?;

        // STEP 1: Lock the order; concurrent finalize/cancel wait here
        let order = queries::lock_order(&tx, order_id)
            .await?
            .ok_or_else(|| ServiceError::NotFound(format!("Order #{}", order_id)))?;

        if order.status.is_terminal() {
            return Err(ServiceError::InvalidState(format!(
                "Order #{} is already {}",
                order_id, order.status
            )));
        }

        // STEP 2: Resolve the amount to charge
        let items = queries::get_order_items(&tx, order_id).await?;
        let engine = load_pricing(&tx, &self.config).await?;
        let computed = resolve_final_amount(&tx, &engine, &order, &items).await?;

        let amount_paid = explicit_amount.unwrap_or(computed);
        if amount_paid <= Decimal::ZERO {
            return Err(ServiceError::InvalidInput(format!(
                "Could not determine the amount for order #{}; enter the amount paid",
                order_id
            )));
        }

        // STEP 3: Claim the requested domains
        let mut domains_assigned = 0;
        for assignment in &request.domain_assignments {
            let outcome = match assignment.order_item_id {
                Some(item_id) => {
                    assign_item_domain_in(&tx, item_id, assignment.domain_id, order_id).await?
                }
                None => assign_order_domain_in(&tx, assignment.domain_id, order_id).await?,
            };
            if outcome == AssignOutcome::Assigned {
                domains_assigned += 1;
            }
        }

        // STEP 4: Commission for an active referrer
        let affiliate = match order.affiliate_code() {
            Some(code) => {
                let found = queries::get_active_affiliate_by_code(&tx, code).await?;
                if found.is_none() {
                    warn!("Order #{}: no active affiliate for code {}", order_id, code);
                }
                found
            }
            None => None,
        };
        let commission = match &affiliate {
            Some(_) => engine.commission_for(amount_paid),
            None => Decimal::ZERO,
        };

        // STEP 5: Persist order, sale and ledger together
        let persisted_total = if computed > Decimal::ZERO { computed } else { amount_paid };
        if queries::mark_order_paid(&tx, order_id, persisted_total, notes.as_deref()).await? == 0 {
            return Err(ServiceError::InvalidState(format!(
                "Order #{} is no longer pending",
                order_id
            )));
        }

        let sale = NewSale {
            reference: Uuid::new_v4(),
            order_id,
            affiliate_id: affiliate.as_ref().map(|a| a.id),
            customer_name: order.customer_name.clone(),
            customer_email: order.customer_email.clone(),
            amount_paid,
            commission_amount: commission,
            payment_confirmed_by: admin_id,
            payment_notes: notes.clone(),
        };
        let sale_id = queries::insert_sale(&tx, &sale).await?;

        if let Some(affiliate) = &affiliate {
            queries::accrue_commission(&tx, affiliate.id, commission).await?;
        }

        let formatted_amount = format_currency(amount_paid, &self.config.currency_symbol);
        queries::log_activity(
            &tx,
            "order_paid",
            &format!(
                "Order #{} marked paid: {} (sale {}, ref {})",
                order_id, formatted_amount, sale_id, sale.reference
            ),
            Some(admin_id),
        ).await?;

        tx.commit().await?;

        info!(
            "✅ Order #{} paid: {} (commission {}, {} domains)",
            order_id, formatted_amount, commission, domains_assigned
        );

        self.notifier.order_paid(&order, amount_paid).await;

        Ok(FinalizeOrderResponse {
            order_id,
            amount_charged: amount_paid,
            message: format!("Order #{} marked as paid: {}", order_id, formatted_amount),
            formatted_amount,
            commission,
            affiliate_id: affiliate.map(|a| a.id),
            domains_assigned,
        })
    }

    /// Cancel a pending order and return its domains to the pool.
    pub async fn cancel_order(
        &self,
        order_id: i64,
        reason: &str,
        admin_id: i64,
    ) -> Result<MessageResponse, ServiceError> {
        let reason = match sanitize_input(reason, MAX_REASON_CHARS) {
            r if r.is_empty() => DEFAULT_CANCEL_REASON.to_string(),
            r => r,
        };

        let mut client = self.db.client().await?;
        let tx = client.transaction().await?;

        let order = queries::lock_order(&tx, order_id)
            .await?
            .ok_or_else(|| ServiceError::NotFound(format!("Order #{}", order_id)))?;

        if order.status.is_terminal() {
            return Err(ServiceError::InvalidState(format!(
                "Order #{} is already {}",
                order_id, order.status
            )));
        }

        if queries::mark_order_cancelled(&tx, order_id, &reason).await? == 0 {
            return Err(ServiceError::InvalidState(format!(
                "Order #{} is no longer pending",
                order_id
            )));
        }

        let released = queries::release_order_domains(&tx, order_id).await?;

        queries::log_activity(
            &tx,
            "order_cancelled",
            &format!(
                "Order #{} cancelled: {} ({} domains released)",
                order_id,
                truncate_string(&reason, 120),
                released
            ),
            Some(admin_id),
        ).await?;

        tx.commit().await?;

        info!("🛑 Order #{} cancelled ({} domains released)", order_id, released);

        self.notifier.order_cancelled(&order, &reason).await;

        Ok(MessageResponse::new(format!("Order #{} cancelled", order_id)))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn assignment(domain_id: i64, order_item_id: Option<i64>) -> DomainAssignment {
        DomainAssignment { domain_id, order_item_id }
    }

    #[test]
    fn test_rejects_zero_and_negative_amounts() {
        assert!(matches!(
            validate_amount(Some(Decimal::ZERO)),
            Err(ServiceError::InvalidInput(_))
        ));
        assert!(matches!(
            validate_amount(Some(Decimal::new(-100, 2))),
            Err(ServiceError::InvalidInput(_))
        ));
    }

    #[test]
    fn test_amount_is_rounded_to_cents() {
        assert_eq!(
            validate_amount(Some(Decimal::new(100_005, 3))).unwrap(),
            Some(Decimal::new(10001, 2))
        );
        assert_eq!(validate_amount(None).unwrap(), None);
    }

    #[test]
    fn test_duplicate_domain_in_request_is_rejected() {
        let list = vec![assignment(7, Some(1)), assignment(7, Some(2))];
        assert!(matches!(
            validate_assignments(&list),
            Err(ServiceError::InvalidInput(_))
        ));
    }

    #[test]
    fn test_valid_assignments_pass() {
        let list = vec![assignment(7, Some(1)), assignment(8, None)];
        assert!(validate_assignments(&list).is_ok());
        assert!(validate_assignments(&[]).is_ok());
    }

    #[test]
    fn test_bad_ids_rejected() {
        assert!(validate_assignments(&[assignment(0, None)]).is_err());
        assert!(validate_assignments(&[assignment(3, Some(-1))]).is_err());
    }
}
