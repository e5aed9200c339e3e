//! # Ledger Auditor
//!
//! Periodically checks that every affiliate's ledger balances:
//!
//! ```text
//! |earned - (pending + paid)| <= 0.01
//! ```
//!
//! The database CHECK constraint should make a discrepancy impossible.
//! The auditor exists to catch rows edited by hand or imported from
//! older data; it reports and never rewrites balances.

use std::time::Duration;

use chrono::Utc;
use rust_decimal::Decimal;
use tokio::time::interval;
use tracing::{error, info, warn};

use crate::config::AppConfig;
use crate::db::queries;
use crate::db::{AffiliateRecord, Database};
use crate::models::{LedgerAuditResponse, LedgerDiscrepancy};

use super::ServiceError;

/// Largest gap treated as rounding noise.
pub fn ledger_tolerance() -> Decimal {
    Decimal::new(1, 2)
}

impl From<&AffiliateRecord> for LedgerDiscrepancy {
    fn from(affiliate: &AffiliateRecord) -> Self {
        Self {
            affiliate_id: affiliate.id,
            code: affiliate.code.clone(),
            commission_earned: affiliate.commission_earned,
            commission_pending: affiliate.commission_pending,
            commission_paid: affiliate.commission_paid,
            difference: affiliate.ledger_gap(),
        }
    }
}

/// Background ledger checker.
#[derive(Clone)]
pub struct LedgerAuditor {
    db: Database,
    config: AppConfig,
}

impl LedgerAuditor {
    pub fn new(db: Database, config: AppConfig) -> Self {
        Self { db, config }
    }

    /// Run [`audit`](Self::audit) every `LEDGER_AUDIT_INTERVAL` seconds.
    ///
    /// Spawn it as a background task:
    ///
    /// ```rust,ignore
    /// let auditor = state.ledger_auditor.clone();
    /// tokio::spawn(async move { auditor.start_audit_loop().await });
    /// ```
    pub async fn start_audit_loop(&self) {
        info!(
            "Starting affiliate ledger audit loop (interval: {}s)",
            self.config.ledger_audit_interval
        );

        let mut ticker = interval(Duration::from_secs(self.config.ledger_audit_interval.max(1)));

        loop {
            ticker.tick().await;

            if let Err(e) = self.audit().await {
                error!("Ledger audit failed: {}", e);
            }
        }
    }

    /// Check every affiliate once.
    pub async fn audit(&self) -> Result<LedgerAuditResponse, ServiceError> {
        let client = self.db.client().await?;

        let affiliates_checked = queries::count_affiliates(&client).await?;
        let unbalanced = queries::get_unbalanced_affiliates(&client, ledger_tolerance()).await?;

        let discrepancies: Vec<LedgerDiscrepancy> = unbalanced.iter().map(LedgerDiscrepancy::from).collect();

        for d in &discrepancies {
            warn!(
                "⚠️ Ledger mismatch for affiliate {} ({}): earned {} != pending {} + paid {} (diff {})",
                d.affiliate_id, d.code, d.commission_earned, d.commission_pending, d.commission_paid, d.difference
            );
        }

        info!(
            "Ledger audit: {} affiliates checked, {} discrepancies",
            affiliates_checked,
            discrepancies.len()
        );

        Ok(LedgerAuditResponse {
            affiliates_checked,
            discrepancies,
            timestamp: Utc::now(),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::db::AffiliateStatus;

    #[test]
    fn test_discrepancy_reports_gap() {
        let now = Utc::now();
        let affiliate = AffiliateRecord {
            id: 5,
            user_id: 9,
            code: "PARTNER1".to_string(),
            status: AffiliateStatus::Active,
            commission_earned: Decimal::from(100),
            commission_pending: Decimal::from(60),
            commission_paid: Decimal::from(30),
            total_clicks: 0,
            total_sales: 2,
            created_at: now,
            updated_at: now,
        };

        let d = LedgerDiscrepancy::from(&affiliate);
        assert_eq!(d.difference, Decimal::from(10));
        assert!(d.difference.abs() > ledger_tolerance());
    }
}
