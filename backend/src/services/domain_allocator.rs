//! # Domain Allocator
//!
//! Hands out hosting domains to orders and keeps the inventory honest.
//!
//! ## Domain lifecycle
//!
//! ```text
//!                 claim (guarded UPDATE)
//!   ┌───────────┐ ─────────────────────────> ┌──────────┐
//!   │ available │                            │  in_use  │ assigned_order_id = order
//!   └───────────┘ <───────────────────────── └──────────┘
//!     │      ▲     release (reassign / cancel)
//!     ▼      │
//!   ┌───────────┐
//!   │ suspended │  (admin only, never assignable)
//!   └───────────┘
//! ```
//!
//! ## Claiming
//!
//! A claim is one `UPDATE ... WHERE status = 'available'`. Two admins
//! racing for the same domain serialize on the row lock; the loser's
//! UPDATE sees `in_use` after the winner commits, touches zero rows and
//! gets [`ServiceError::ConflictingAssignment`]. No read-then-write gap.
//!
//! The `*_in` functions run inside a caller's transaction so the order
//! finalizer can make assignment and payment one atomic unit.

use deadpool_postgres::GenericClient;
use tracing::{debug, info, warn};

use crate::db::queries;
use crate::db::{
    Database, DomainRecord, DomainStatus, OrderRecord, OrderStatus, ProductType,
};
use crate::models::{BulkAddDomainsResponse, MessageResponse};
use crate::utils::normalize_domain_name;

use super::order_repository::assigned_domain_ids;
use super::ServiceError;

/// What a successful assignment did.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AssignOutcome {
    /// The domain was claimed for the order.
    Assigned,
    /// The target already held this domain; nothing changed.
    AlreadyAssigned,
}

/// Lock an order that is allowed to receive a domain.
async fn lock_assignable_order<C: GenericClient + Sync>(
    client: &C,
    order_id: i64,
) -> Result<OrderRecord, ServiceError> {
    let order = queries::lock_order(client, order_id)
        .await?
        .ok_or_else(|| ServiceError::NotFound(format!("Order #{}", order_id)))?;

    if order.status == OrderStatus::Cancelled {
        return Err(ServiceError::InvalidState(format!(
            "Order #{} is cancelled and cannot receive a domain",
            order_id
        )));
    }

    Ok(order)
}

/// Explain why a claim touched no rows.
async fn claim_failure<C: GenericClient + Sync>(
    client: &C,
    domain_id: i64,
    order_id: i64,
    template_id: i64,
) -> Result<ServiceError, ServiceError> {
    let Some(domain) = queries::get_domain_by_id(client, domain_id).await? else {
        return Ok(ServiceError::NotFound(format!("Domain {}", domain_id)));
    };

    if domain.template_id != template_id {
        return Ok(ServiceError::InvalidInput(format!(
            "Domain {} does not serve template {}",
            domain.domain_name, template_id
        )));
    }

    Ok(match domain.status {
        DomainStatus::Suspended => ServiceError::InvalidInput(format!(
            "Domain {} is suspended",
            domain.domain_name
        )),
        DomainStatus::InUse if domain.assigned_order_id == Some(order_id) => {
            ServiceError::ConflictingAssignment(format!(
                "Domain {} is already assigned to another item of order #{}",
                domain.domain_name, order_id
            ))
        }
        DomainStatus::InUse => ServiceError::ConflictingAssignment(format!(
            "Domain {} was just assigned to another order",
            domain.domain_name
        )),
        // Freed between our UPDATE and this read; the admin can retry.
        DomainStatus::Available => ServiceError::ConflictingAssignment(format!(
            "Domain {} changed while assigning, please retry",
            domain.domain_name
        )),
    })
}

/// Whether `domain_id` is already held by `order_id`.
async fn held_by<C: GenericClient + Sync>(
    client: &C,
    domain_id: i64,
    order_id: i64,
) -> Result<bool, ServiceError> {
    Ok(queries::get_domain_by_id(client, domain_id)
        .await?
        .map(|d| d.status == DomainStatus::InUse && d.assigned_order_id == Some(order_id))
        .unwrap_or(false))
}

/// Assign a domain to one template item of an order, inside `client`'s
/// transaction. The item's previous domain, if different, is released.
pub async fn assign_item_domain_in<C: GenericClient + Sync>(
    client: &C,
    item_id: i64,
    domain_id: i64,
    order_id: i64,
) -> Result<AssignOutcome, ServiceError> {
    lock_assignable_order(client, order_id).await?;

    let item = queries::lock_order_item(client, item_id)
        .await?
        .ok_or_else(|| ServiceError::NotFound(format!("Order item {}", item_id)))?;

    if item.order_id != order_id {
        return Err(ServiceError::InvalidInput(format!(
            "Item {} does not belong to order #{}",
            item_id, order_id
        )));
    }
    if item.product_type != ProductType::Template {
        return Err(ServiceError::InvalidInput(format!(
            "Item {} is a tool and cannot hold a domain",
            item_id
        )));
    }

    let previous = item.metadata.domain_id;
    if previous == Some(domain_id) && held_by(client, domain_id, order_id).await? {
        debug!("Item {} already holds domain {}", item_id, domain_id);
        return Ok(AssignOutcome::AlreadyAssigned);
    }

    let claimed = queries::claim_domain(client, domain_id, order_id, item.product_id).await?;
    if claimed == 0 {
        return Err(claim_failure(client, domain_id, order_id, item.product_id).await?);
    }

    if let Some(previous_id) = previous.filter(|id| *id != domain_id) {
        let released = queries::release_domain(client, previous_id, order_id).await?;
        debug!("Released previous domain {} of item {} ({} rows)", previous_id, item_id, released);
    }

    queries::set_item_domain(client, item_id, order_id, domain_id).await?;

    Ok(AssignOutcome::Assigned)
}

/// Assign a domain to a legacy single-template order, inside `client`'s
/// transaction. The order's previous choice, if different, is released.
pub async fn assign_order_domain_in<C: GenericClient + Sync>(
    client: &C,
    domain_id: i64,
    order_id: i64,
) -> Result<AssignOutcome, ServiceError> {
    let order = lock_assignable_order(client, order_id).await?;

    // Itemized and tool-only orders carry no template of their own.
    let Some(template_id) = order.template_id else {
        return Err(ServiceError::InvalidInput(format!(
            "Order #{} has no template; assign the domain to one of its template items",
            order_id
        )));
    };

    let previous = order.chosen_domain_id;
    if previous == Some(domain_id) && held_by(client, domain_id, order_id).await? {
        debug!("Order #{} already holds domain {}", order_id, domain_id);
        return Ok(AssignOutcome::AlreadyAssigned);
    }

    let claimed = queries::claim_domain(client, domain_id, order_id, template_id).await?;
    if claimed == 0 {
        return Err(claim_failure(client, domain_id, order_id, template_id).await?);
    }

    if let Some(previous_id) = previous.filter(|id| *id != domain_id) {
        queries::release_domain(client, previous_id, order_id).await?;
    }

    queries::set_order_chosen_domain(client, order_id, domain_id).await?;

    Ok(AssignOutcome::Assigned)
}

/// Split bulk-import text into candidate names (newlines and commas).
pub fn split_domain_list(raw: &str) -> Vec<&str> {
    raw.split(|c| c == '\n' || c == ',' || c == '\r')
        .map(str::trim)
        .filter(|name| !name.is_empty())
        .collect()
}

/// Domain inventory and assignment service.
#[derive(Clone)]
pub struct DomainAllocator {
    db: Database,
}

impl DomainAllocator {
    pub fn new(db: Database) -> Self {
        Self { db }
    }

    /// Domains of a template family an admin may pick from.
    ///
    /// With `current_order_id`, the domains that order already holds are
    /// included (and listed first) so re-displaying an order keeps them.
    pub async fn get_available_domains(
        &self,
        template_id: i64,
        current_order_id: Option<i64>,
    ) -> Result<Vec<DomainRecord>, ServiceError> {
        if template_id <= 0 {
            return Err(ServiceError::InvalidInput("A valid template id is required".to_string()));
        }

        let client = self.db.client().await?;

        let include_ids = match current_order_id {
            Some(order_id) => match queries::get_order_by_id(&client, order_id).await? {
                Some(order) => {
                    let items = queries::get_order_items(&client, order_id).await?;
                    assigned_domain_ids(&order, &items)
                }
                None => Vec::new(),
            },
            None => Vec::new(),
        };

        let domains = queries::get_available_domains(&client, template_id, &include_ids).await?;

        // A stale item reference to a domain now held elsewhere stays hidden.
        Ok(domains
            .into_iter()
            .filter(|d| {
                d.status == DomainStatus::Available
                    || (d.assigned_order_id.is_some() && d.assigned_order_id == current_order_id)
            })
            .collect())
    }

    /// Assign a domain to one item of an order, as its own transaction.
    pub async fn set_order_item_domain(
        &self,
        item_id: i64,
        domain_id: i64,
        order_id: i64,
        admin_id: i64,
    ) -> Result<AssignOutcome, ServiceError> {
        let mut client = self.db.client().await?;
        let tx = client.transaction().await?;

        let outcome = assign_item_domain_in(&tx, item_id, domain_id, order_id).await?;

        if outcome == AssignOutcome::Assigned {
            queries::log_activity(
                &tx,
                "domain_assigned",
                &format!("Domain {} assigned to item {} of order #{}", domain_id, item_id, order_id),
                Some(admin_id),
            ).await?;
        }

        tx.commit().await?;

        info!("🌐 Domain {} -> order #{} item {} ({:?})", domain_id, order_id, item_id, outcome);
        Ok(outcome)
    }

    /// Assign a domain to an order (legacy path), as its own transaction.
    pub async fn assign_domain_to_customer(
        &self,
        domain_id: i64,
        order_id: i64,
        admin_id: i64,
    ) -> Result<AssignOutcome, ServiceError> {
        let mut client = self.db.client().await?;
        let tx = client.transaction().await?;

        let outcome = assign_order_domain_in(&tx, domain_id, order_id).await?;

        if outcome == AssignOutcome::Assigned {
            queries::log_activity(
                &tx,
                "domain_assigned",
                &format!("Domain {} assigned to order #{}", domain_id, order_id),
                Some(admin_id),
            ).await?;
        }

        tx.commit().await?;

        info!("🌐 Domain {} -> order #{} ({:?})", domain_id, order_id, outcome);
        Ok(outcome)
    }

    /// Add one domain to a template family.
    pub async fn add_domain(
        &self,
        template_id: i64,
        domain_name: &str,
        admin_id: i64,
    ) -> Result<DomainRecord, ServiceError> {
        let name = normalize_domain_name(domain_name).map_err(ServiceError::InvalidInput)?;

        let client = self.db.client().await?;
        if queries::get_template_by_id(&client, template_id).await?.is_none() {
            return Err(ServiceError::NotFound(format!("Template {}", template_id)));
        }

        let domain = queries::insert_domain(&client, template_id, &name)
            .await?
            .ok_or_else(|| ServiceError::InvalidInput(format!("Domain {} already exists", name)))?;

        queries::log_activity(
            &client,
            "domain_added",
            &format!("Domain {} added to template {}", name, template_id),
            Some(admin_id),
        ).await?;

        info!("Domain {} added to template {}", name, template_id);
        Ok(domain)
    }

    /// Add many domains at once. Duplicates and malformed names are skipped.
    pub async fn bulk_add_domains(
        &self,
        template_id: i64,
        raw: &str,
        admin_id: i64,
    ) -> Result<BulkAddDomainsResponse, ServiceError> {
        let client = self.db.client().await?;
        if queries::get_template_by_id(&client, template_id).await?.is_none() {
            return Err(ServiceError::NotFound(format!("Template {}", template_id)));
        }

        let mut result = BulkAddDomainsResponse::default();
        for candidate in split_domain_list(raw) {
            let name = match normalize_domain_name(candidate) {
                Ok(name) => name,
                Err(e) => {
                    warn!("Skipping domain: {}", e);
                    result.skipped += 1;
                    continue;
                }
            };

            match queries::insert_domain(&client, template_id, &name).await? {
                Some(_) => result.added += 1,
                None => {
                    debug!("Skipping duplicate domain {}", name);
                    result.skipped += 1;
                }
            }
        }

        queries::log_activity(
            &client,
            "domains_bulk_added",
            &format!(
                "{} domains added to template {} ({} skipped)",
                result.added, template_id, result.skipped
            ),
            Some(admin_id),
        ).await?;

        info!(
            "Bulk import for template {}: {} added, {} skipped",
            template_id, result.added, result.skipped
        );
        Ok(result)
    }

    /// Delete a domain. Only available domains can be deleted.
    pub async fn delete_domain(&self, domain_id: i64, admin_id: i64) -> Result<MessageResponse, ServiceError> {
        let client = self.db.client().await?;

        let domain = queries::get_domain_by_id(&client, domain_id)
            .await?
            .ok_or_else(|| ServiceError::NotFound(format!("Domain {}", domain_id)))?;

        if queries::delete_available_domain(&client, domain_id).await? == 0 {
            return Err(ServiceError::InvalidState(format!(
                "Domain {} is {} and cannot be deleted",
                domain.domain_name, domain.status
            )));
        }

        queries::log_activity(
            &client,
            "domain_deleted",
            &format!("Domain {} deleted", domain.domain_name),
            Some(admin_id),
        ).await?;

        Ok(MessageResponse::new(format!("Domain {} deleted", domain.domain_name)))
    }

    /// Suspend an available domain, or reinstate a suspended one.
    ///
    /// In-use domains are left alone: suspending would orphan a live site.
    pub async fn set_domain_suspended(
        &self,
        domain_id: i64,
        suspended: bool,
        admin_id: i64,
    ) -> Result<MessageResponse, ServiceError> {
        let client = self.db.client().await?;

        let domain = queries::get_domain_by_id(&client, domain_id)
            .await?
            .ok_or_else(|| ServiceError::NotFound(format!("Domain {}", domain_id)))?;

        let (from, to) = if suspended {
            (DomainStatus::Available, DomainStatus::Suspended)
        } else {
            (DomainStatus::Suspended, DomainStatus::Available)
        };

        if domain.status == to {
            return Ok(MessageResponse::new(format!("Domain {} is already {}", domain.domain_name, to)));
        }

        if queries::transition_domain_status(&client, domain_id, from, to).await? == 0 {
            return Err(ServiceError::InvalidState(format!(
                "Domain {} is {} and cannot become {}",
                domain.domain_name, domain.status, to
            )));
        }

        queries::log_activity(
            &client,
            "domain_status_changed",
            &format!("Domain {} {} -> {}", domain.domain_name, from, to),
            Some(admin_id),
        ).await?;

        Ok(MessageResponse::new(format!("Domain {} is now {}", domain.domain_name, to)))
    }
}
