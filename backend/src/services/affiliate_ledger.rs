//! # Affiliate Ledger
//!
//! Affiliate accounts and the money side of their commission.
//!
//! ## Ledger
//!
//! ```text
//! commission_earned = commission_pending + commission_paid
//!
//! sale with referral code   earned += c   pending += c
//! withdrawal -> paid        pending -= w  paid += w      (only if pending >= w)
//! withdrawal -> rejected    no balance change
//! ```
//!
//! Accrual happens in the order finalizer's transaction; settlement
//! happens here, in the same transaction as the withdrawal's status change.

use tracing::{info, warn};

use crate::db::queries;
use crate::db::{AffiliateRecord, AffiliateStatus, Database, WithdrawalStatus};
use crate::models::{CreateAffiliateRequest, MessageResponse};
use crate::utils::{sanitize_input, sanitize_optional, validate_email};

use super::{Notifier, ServiceError};

/// Normalize and check a referral code: 4-20 letters or digits, stored uppercase.
pub fn validate_affiliate_code(raw: &str) -> Result<String, ServiceError> {
    let code = raw.trim().to_ascii_uppercase();

    let valid = (4..=20).contains(&code.len())
        && code.chars().all(|c| c.is_ascii_uppercase() || c.is_ascii_digit());

    if valid {
        Ok(code)
    } else {
        Err(ServiceError::InvalidInput(
            "Affiliate code must be 4-20 letters or digits".to_string(),
        ))
    }
}

/// Parse the status an admin wants to move a withdrawal to.
pub fn parse_withdrawal_target(raw: &str) -> Result<WithdrawalStatus, ServiceError> {
    match raw.parse::<WithdrawalStatus>() {
        Ok(WithdrawalStatus::Pending) | Err(_) => Err(ServiceError::InvalidInput(format!(
            "Withdrawal status must be approved, paid or rejected, got '{}'",
            raw.trim()
        ))),
        Ok(status) => Ok(status),
    }
}

/// Affiliate administration and withdrawal processing.
#[derive(Clone)]
pub struct AffiliateLedger {
    db: Database,
    notifier: Notifier,
}

impl AffiliateLedger {
    pub fn new(db: Database, notifier: Notifier) -> Self {
        Self { db, notifier }
    }

    /// Create a user account and its affiliate with an empty ledger.
    pub async fn create_affiliate(
        &self,
        request: CreateAffiliateRequest,
        admin_id: i64,
    ) -> Result<AffiliateRecord, ServiceError> {
        let name = sanitize_input(&request.name, 100);
        if name.is_empty() {
            return Err(ServiceError::InvalidInput("Name is required".to_string()));
        }
        let email = request.email.trim().to_lowercase();
        validate_email(&email).map_err(ServiceError::InvalidInput)?;
        let code = validate_affiliate_code(&request.code)?;

        let mut client = self.db.client().await?;
        let tx = client.transaction().await?;

        let user_id = match queries::insert_user(&tx, &name, &email).await {
            Ok(id) => id,
            Err(e) if e.is_unique_violation() => {
                return Err(ServiceError::InvalidInput(format!("Email {} is already registered", email)));
            }
            Err(e) => return Err(e.into()),
        };

        let affiliate = match queries::insert_affiliate(&tx, user_id, &code).await {
            Ok(affiliate) => affiliate,
            Err(e) if e.is_unique_violation() => {
                return Err(ServiceError::InvalidInput(format!("Affiliate code {} is taken", code)));
            }
            Err(e) => return Err(e.into()),
        };

        queries::log_activity(
            &tx,
            "affiliate_created",
            &format!("Affiliate {} created for {}", code, email),
            Some(admin_id),
        ).await?;

        tx.commit().await?;

        info!("🤝 Affiliate {} created (id {})", affiliate.code, affiliate.id);
        Ok(affiliate)
    }

    /// Activate, deactivate or suspend an affiliate.
    ///
    /// Only active affiliates accrue commission on new sales.
    pub async fn set_affiliate_status(
        &self,
        affiliate_id: i64,
        status: &str,
        admin_id: i64,
    ) -> Result<MessageResponse, ServiceError> {
        let status: AffiliateStatus = status.parse().map_err(ServiceError::InvalidInput)?;

        let client = self.db.client().await?;
        if queries::set_affiliate_status(&client, affiliate_id, status).await? == 0 {
            return Err(ServiceError::NotFound(format!("Affiliate {}", affiliate_id)));
        }

        queries::log_activity(
            &client,
            "affiliate_status_changed",
            &format!("Affiliate {} is now {}", affiliate_id, status),
            Some(admin_id),
        ).await?;

        Ok(MessageResponse::new(format!("Affiliate {} is now {}", affiliate_id, status)))
    }

    /// Approve, pay or reject a pending withdrawal.
    ///
    /// Paying moves the amount from pending to paid commission in the same
    /// transaction; it fails if the affiliate's pending balance is too low.
    pub async fn process_withdrawal(
        &self,
        withdrawal_id: i64,
        status: &str,
        notes: Option<&str>,
        admin_id: i64,
    ) -> Result<MessageResponse, ServiceError> {
        let target = parse_withdrawal_target(status)?;
        let notes = sanitize_optional(notes, 1000);

        let mut client = self.db.client().await?;
        let tx = client.transaction().await?;

        let withdrawal = queries::lock_withdrawal(&tx, withdrawal_id)
            .await?
            .ok_or_else(|| ServiceError::NotFound(format!("Withdrawal request {}", withdrawal_id)))?;

        if withdrawal.status != WithdrawalStatus::Pending {
            return Err(ServiceError::InvalidState(format!(
                "Withdrawal request {} is already {}",
                withdrawal_id, withdrawal.status
            )));
        }

        if target == WithdrawalStatus::Paid
            && queries::settle_commission(&tx, withdrawal.affiliate_id, withdrawal.amount).await? == 0
        {
            return Err(ServiceError::InvalidState(format!(
                "Affiliate {} has less pending commission than {}",
                withdrawal.affiliate_id, withdrawal.amount
            )));
        }

        if queries::process_withdrawal(&tx, withdrawal_id, target, notes.as_deref(), admin_id).await? == 0 {
            return Err(ServiceError::InvalidState(format!(
                "Withdrawal request {} is no longer pending",
                withdrawal_id
            )));
        }

        queries::log_activity(
            &tx,
            "withdrawal_processed",
            &format!(
                "Withdrawal {} of {} for affiliate {} -> {}",
                withdrawal_id, withdrawal.amount, withdrawal.affiliate_id, target
            ),
            Some(admin_id),
        ).await?;

        tx.commit().await?;

        info!("💸 Withdrawal {} -> {}", withdrawal_id, target);

        match self.affiliate_contact(withdrawal.affiliate_id).await {
            Some((name, email)) => {
                self.notifier
                    .withdrawal_processed(&email, &name, &withdrawal, target, notes.as_deref())
                    .await
            }
            None => warn!("No contact for affiliate {}; withdrawal email skipped", withdrawal.affiliate_id),
        }

        Ok(MessageResponse::new(format!(
            "Withdrawal request {} marked {}",
            withdrawal_id, target
        )))
    }

    async fn affiliate_contact(&self, affiliate_id: i64) -> Option<(String, String)> {
        let client = match self.db.client().await {
            Ok(client) => client,
            Err(e) => {
                warn!("Could not look up affiliate {}: {}", affiliate_id, e);
                return None;
            }
        };

        match queries::get_affiliate_contact(&client, affiliate_id).await {
            Ok(contact) => contact,
            Err(e) => {
                warn!("Could not look up affiliate {}: {}", affiliate_id, e);
                None
            }
        }
    }
}
