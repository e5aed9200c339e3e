//! # Bulk Operations
//!
//! Applies the finalizer to many orders. Each order is its own
//! transaction: one failure is counted and the batch moves on.

use std::collections::HashSet;
use std::future::Future;

use tracing::{info, warn};

use crate::db::queries;
use crate::db::Database;
use crate::models::{BulkResultResponse, FinalizeOrderRequest};

use super::{OrderFinalizer, ServiceError};

/// Run `op` for every id and tally the outcomes.
pub async fn run_each<F, Fut>(ids: &[i64], action: &str, mut op: F) -> BulkResultResponse
where
    F: FnMut(i64) -> Fut,
    Fut: Future<Output = Result<(), ServiceError>>,
{
    let mut result = BulkResultResponse::default();

    for &id in ids {
        match op(id).await {
            Ok(()) => result.success_count += 1,
            Err(e) => {
                warn!("Bulk {} failed for order #{}: {}", action, id, e);
                result.fail_count += 1;
            }
        }
    }

    result
}

/// Positive ids, first occurrence kept.
pub fn normalize_ids(ids: &[i64]) -> Vec<i64> {
    let mut seen = HashSet::with_capacity(ids.len());
    ids.iter()
        .copied()
        .filter(|id| {
            if *id <= 0 {
                warn!("Skipping invalid order id {}", id);
                return false;
            }
            seen.insert(*id)
        })
        .collect()
}

/// Bulk mark-paid and bulk cancel.
#[derive(Clone)]
pub struct BulkOperations {
    db: Database,
    finalizer: OrderFinalizer,
}

impl BulkOperations {
    pub fn new(db: Database, finalizer: OrderFinalizer) -> Self {
        Self { db, finalizer }
    }

    /// Ids worth attempting: positive, unique, and existing.
    async fn existing_ids(&self, ids: &[i64]) -> Result<Vec<i64>, ServiceError> {
        let candidates = normalize_ids(ids);
        if candidates.is_empty() {
            return Ok(candidates);
        }

        let client = self.db.client().await?;
        let existing: HashSet<i64> = queries::existing_order_ids(&client, &candidates)
            .await?
            .into_iter()
            .collect();

        Ok(candidates
            .into_iter()
            .filter(|id| {
                let found = existing.contains(id);
                if !found {
                    warn!("Skipping order #{}: not found", id);
                }
                found
            })
            .collect())
    }

    /// Mark every listed order paid at its computed total.
    pub async fn bulk_mark_paid(
        &self,
        ids: &[i64],
        admin_id: i64,
    ) -> Result<BulkResultResponse, ServiceError> {
        let ids = self.existing_ids(ids).await?;

        let result = run_each(&ids, "mark-paid", |order_id| async move {
            self.finalizer
                .finalize_order(order_id, admin_id, FinalizeOrderRequest::default())
                .await
                .map(|_| ())
        })
        .await;

        info!(
            "📦 Bulk mark-paid: {} succeeded, {} failed",
            result.success_count, result.fail_count
        );
        Ok(result)
    }

    /// Cancel every listed order with one shared reason.
    pub async fn bulk_cancel(
        &self,
        ids: &[i64],
        reason: &str,
        admin_id: i64,
    ) -> Result<BulkResultResponse, ServiceError> {
        let ids = self.existing_ids(ids).await?;

        let result = run_each(&ids, "cancel", |order_id| async move {
            self.finalizer
                .cancel_order(order_id, reason, admin_id)
                .await
                .map(|_| ())
        })
        .await;

        info!(
            "📦 Bulk cancel: {} succeeded, {} failed",
            result.success_count, result.fail_count
        );
        Ok(result)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_normalize_ids_drops_invalid_and_duplicates() {
        assert_eq!(normalize_ids(&[3, 0, -2, 5, 3, 7]), vec![3, 5, 7]);
        assert!(normalize_ids(&[]).is_empty());
    }

    #[actix_rt::test]
    async fn test_partial_failure_is_tallied() {
        let ids = [1, 2, 3, 4, 5];
        let result = run_each(&ids, "test", |id| async move {
            if id % 2 == 0 {
                Err(ServiceError::InvalidState(format!("Order #{} is already paid", id)))
            } else {
                Ok(())
            }
        })
        .await;

        assert_eq!(result, BulkResultResponse { success_count: 3, fail_count: 2 });
    }

    #[actix_rt::test]
    async fn test_empty_batch() {
        let result = run_each(&[], "test", |_| async { Ok(()) }).await;
        assert_eq!(result, BulkResultResponse::default());
    }
}
