//! # Order Repository
//!
//! Read side of orders: loading an order with its items, resolving the
//! amount it should be charged, and the current pricing rates.
//!
//! The catalog lookup for legacy orders lives here so the pure
//! [`PricingEngine`] never touches the database.

use deadpool_postgres::GenericClient;
use rust_decimal::Decimal;
use tracing::{debug, warn};

use crate::config::{AppConfig, PricingConfig};
use crate::db::queries;
use crate::db::{Database, DatabaseError, OrderItemRecord, OrderRecord};
use crate::models::OrderDetailResponse;
use crate::utils::format_currency;

use super::{PricingEngine, ServiceError};

/// Load the pricing rates in effect right now.
///
/// Admin-edited settings win over the environment defaults.
pub async fn load_pricing<C: GenericClient + Sync>(
    client: &C,
    config: &AppConfig,
) -> Result<PricingEngine, DatabaseError> {
    let settings = queries::get_settings(client).await?;
    Ok(PricingEngine::new(PricingConfig::from_settings(&settings, config)))
}

/// Resolve the payable total of an order, consulting the catalog only
/// when the order and its items carry no usable amount.
///
/// Returns zero when nothing resolves.
pub async fn resolve_final_amount<C: GenericClient + Sync>(
    client: &C,
    engine: &PricingEngine,
    order: &OrderRecord,
    items: &[OrderItemRecord],
) -> Result<Decimal, DatabaseError> {
    if let Some(amount) = engine.amount_from_order(order, items) {
        return Ok(amount);
    }

    let base_price = legacy_base_price(client, order).await?;
    if base_price.is_none() {
        warn!("Order #{} has no price, no items and no catalog product", order.id);
    }

    Ok(engine.compute_final_amount(order, items, base_price))
}

/// Catalog price of a legacy order's product: template first, then tool.
async fn legacy_base_price<C: GenericClient + Sync>(
    client: &C,
    order: &OrderRecord,
) -> Result<Option<Decimal>, DatabaseError> {
    if let Some(template_id) = order.template_id {
        if let Some(template) = queries::get_template_by_id(client, template_id).await? {
            debug!("Order #{} priced from template {}", order.id, template.name);
            return Ok(Some(template.price));
        }
    }

    if let Some(tool_id) = order.tool_id {
        if let Some(tool) = queries::get_tool_by_id(client, tool_id).await? {
            debug!("Order #{} priced from tool {}", order.id, tool.name);
            return Ok(Some(tool.price));
        }
    }

    Ok(None)
}

/// Domain ids held by an order: per-item assignments, then the legacy choice.
pub fn assigned_domain_ids(order: &OrderRecord, items: &[OrderItemRecord]) -> Vec<i64> {
    let mut ids: Vec<i64> = items.iter().filter_map(|item| item.metadata.domain_id).collect();

    if let Some(chosen) = order.chosen_domain_id {
        ids.push(chosen);
    }

    ids.sort_unstable();
    ids.dedup();
    ids
}

/// Read access to orders.
#[derive(Clone)]
pub struct OrderRepository {
    db: Database,
    config: AppConfig,
}

impl OrderRepository {
    pub fn new(db: Database, config: AppConfig) -> Self {
        Self { db, config }
    }

    /// Get an order, or `None` if it does not exist.
    pub async fn get_order_by_id(&self, order_id: i64) -> Result<Option<OrderRecord>, ServiceError> {
        let client = self.db.client().await?;
        Ok(queries::get_order_by_id(&client, order_id).await?)
    }

    /// Items of an order in insertion order. Empty for legacy orders.
    pub async fn get_order_items(&self, order_id: i64) -> Result<Vec<OrderItemRecord>, ServiceError> {
        let client = self.db.client().await?;
        Ok(queries::get_order_items(&client, order_id).await?)
    }

    /// Canonical payable total for an order.
    pub async fn compute_final_amount(
        &self,
        order: &OrderRecord,
        items: &[OrderItemRecord],
    ) -> Result<Decimal, ServiceError> {
        let client = self.db.client().await?;
        let engine = load_pricing(&client, &self.config).await?;
        Ok(resolve_final_amount(&client, &engine, order, items).await?)
    }

    /// Order, items and computed total for the admin order page.
    pub async fn get_order_detail(&self, order_id: i64) -> Result<OrderDetailResponse, ServiceError> {
        let client = self.db.client().await?;

        let order = queries::get_order_by_id(&client, order_id)
            .await?
            .ok_or_else(|| ServiceError::NotFound(format!("Order #{}", order_id)))?;
        let items = queries::get_order_items(&client, order_id).await?;

        let engine = load_pricing(&client, &self.config).await?;
        let computed_amount = resolve_final_amount(&client, &engine, &order, &items).await?;
        let assigned_domain_ids = assigned_domain_ids(&order, &items);

        Ok(OrderDetailResponse {
            formatted_amount: format_currency(computed_amount, &self.config.currency_symbol),
            computed_amount,
            assigned_domain_ids,
            order,
            items,
        })
    }
}
