//! # Database Queries
//!
//! This module contains all the SQL queries for interacting with the database.
//! Each function performs a specific database operation.
//!
//! ## Query Organization
//!
//! Queries are grouped by the table they operate on:
//! - orders and order items
//! - catalog (templates, tools)
//! - domains
//! - affiliates, sales and withdrawals
//! - settings, activity log and email queue
//!
//! ## Guarded writes
//!
//! Every state change that races with other admins is a single conditional
//! `UPDATE ... WHERE <expected state>` and returns the affected-row count.
//! Callers treat `0` as "someone else got there first" and re-read.

use std::collections::HashMap;

use deadpool_postgres::GenericClient;
use rust_decimal::Decimal;
use tokio_postgres::Row;
use tracing::debug;

use super::models::*;
use super::DatabaseError;

// ============================================
// HELPER FUNCTIONS
// ============================================

const ORDER_COLUMNS: &str = r#"
    id, customer_name, customer_email, customer_phone, status, order_type,
    template_id, tool_id, original_price, discount_amount, final_amount,
    affiliate_code, chosen_domain_id, payment_notes, cancellation_reason,
    paid_at, cancelled_at, created_at, updated_at
"#;

const ITEM_COLUMNS: &str = r#"
    id, pending_order_id, product_type, product_id, quantity,
    unit_price, discount_amount, final_amount, metadata, created_at
"#;

const DOMAIN_COLUMNS: &str = r#"
    id, template_id, domain_name, status, assigned_order_id, assigned_at, created_at
"#;

const AFFILIATE_COLUMNS: &str = r#"
    id, user_id, code, status, commission_earned, commission_pending,
    commission_paid, total_clicks, total_sales, created_at, updated_at
"#;

const WITHDRAWAL_COLUMNS: &str = r#"
    id, affiliate_id, amount, status, bank_details, admin_notes,
    requested_at, processed_at, processed_by
"#;

/// Parse a status column into its enum.
fn parse_text<T>(row: &Row, column: &str, table: &'static str) -> Result<T, DatabaseError>
where
    T: std::str::FromStr<Err = String>,
{
    let raw: String = row.try_get(column)?;
    raw.parse()
        .map_err(|reason| DatabaseError::InvalidRow { table, reason })
}

/// Helper to convert a database row to OrderRecord
fn row_to_order(row: &Row) -> Result<OrderRecord, DatabaseError> {
    Ok(OrderRecord {
        id: row.try_get("id")?,
        customer_name: row.try_get("customer_name")?,
        customer_email: row.try_get("customer_email")?,
        customer_phone: row.try_get("customer_phone")?,
        status: parse_text(row, "status", "pending_orders")?,
        order_type: parse_text(row, "order_type", "pending_orders")?,
        template_id: row.try_get("template_id")?,
        tool_id: row.try_get("tool_id")?,
        original_price: row.try_get("original_price")?,
        discount_amount: row.try_get("discount_amount")?,
        final_amount: row.try_get("final_amount")?,
        affiliate_code: row.try_get("affiliate_code")?,
        chosen_domain_id: row.try_get("chosen_domain_id")?,
        payment_notes: row.try_get("payment_notes")?,
        cancellation_reason: row.try_get("cancellation_reason")?,
        paid_at: row.try_get("paid_at")?,
        cancelled_at: row.try_get("cancelled_at")?,
        created_at: row.try_get("created_at")?,
        updated_at: row.try_get("updated_at")?,
    })
}

/// Helper to convert a database row to OrderItemRecord
fn row_to_item(row: &Row) -> Result<OrderItemRecord, DatabaseError> {
    Ok(OrderItemRecord {
        id: row.try_get("id")?,
        order_id: row.try_get("pending_order_id")?,
        product_type: parse_text(row, "product_type", "order_items")?,
        product_id: row.try_get("product_id")?,
        quantity: row.try_get("quantity")?,
        unit_price: row.try_get("unit_price")?,
        discount_amount: row.try_get("discount_amount")?,
        final_amount: row.try_get("final_amount")?,
        metadata: ItemMetadata::from_json(row.try_get("metadata")?),
        created_at: row.try_get("created_at")?,
    })
}

/// Helper to convert a database row to DomainRecord
fn row_to_domain(row: &Row) -> Result<DomainRecord, DatabaseError> {
    Ok(DomainRecord {
        id: row.try_get("id")?,
        template_id: row.try_get("template_id")?,
        domain_name: row.try_get("domain_name")?,
        status: parse_text(row, "status", "domains")?,
        assigned_order_id: row.try_get("assigned_order_id")?,
        assigned_at: row.try_get("assigned_at")?,
        created_at: row.try_get("created_at")?,
    })
}

/// Helper to convert a database row to AffiliateRecord
fn row_to_affiliate(row: &Row) -> Result<AffiliateRecord, DatabaseError> {
    Ok(AffiliateRecord {
        id: row.try_get("id")?,
        user_id: row.try_get("user_id")?,
        code: row.try_get("code")?,
        status: parse_text(row, "status", "affiliates")?,
        commission_earned: row.try_get("commission_earned")?,
        commission_pending: row.try_get("commission_pending")?,
        commission_paid: row.try_get("commission_paid")?,
        total_clicks: row.try_get("total_clicks")?,
        total_sales: row.try_get("total_sales")?,
        created_at: row.try_get("created_at")?,
        updated_at: row.try_get("updated_at")?,
    })
}

/// Helper to convert a database row to WithdrawalRecord
fn row_to_withdrawal(row: &Row) -> Result<WithdrawalRecord, DatabaseError> {
    let bank_details: serde_json::Value = row.try_get("bank_details")?;
    Ok(WithdrawalRecord {
        id: row.try_get("id")?,
        affiliate_id: row.try_get("affiliate_id")?,
        amount: row.try_get("amount")?,
        status: parse_text(row, "status", "withdrawal_requests")?,
        bank_details: serde_json::from_value(bank_details).unwrap_or_default(),
        admin_notes: row.try_get("admin_notes")?,
        requested_at: row.try_get("requested_at")?,
        processed_at: row.try_get("processed_at")?,
        processed_by: row.try_get("processed_by")?,
    })
}

// ============================================
// ORDER QUERIES
// ============================================

/// Get an order by id.
pub async fn get_order_by_id<C: GenericClient + Sync>(
    client: &C,
    id: i64,
) -> Result<Option<OrderRecord>, DatabaseError> {
    debug!("Fetching order: {}", id);

    let sql = format!("SELECT {} FROM pending_orders WHERE id = $1", ORDER_COLUMNS);
    let row = client.query_opt(sql.as_str(), &[&id]).await?;

    row.as_ref().map(row_to_order).transpose()
}

/// Get an order and lock its row until the surrounding transaction ends.
pub async fn lock_order<C: GenericClient + Sync>(
    client: &C,
    id: i64,
) -> Result<Option<OrderRecord>, DatabaseError> {
    debug!("Locking order: {}", id);

    let sql = format!(
        "SELECT {} FROM pending_orders WHERE id = $1 FOR UPDATE",
        ORDER_COLUMNS
    );
    let row = client.query_opt(sql.as_str(), &[&id]).await?;

    row.as_ref().map(row_to_order).transpose()
}

/// Which of the given ids exist.
pub async fn existing_order_ids<C: GenericClient + Sync>(
    client: &C,
    ids: &[i64],
) -> Result<Vec<i64>, DatabaseError> {
    let rows = client.query(
        "SELECT id FROM pending_orders WHERE id = ANY($1)",
        &[&ids],
    ).await?;

    rows.iter()
        .map(|row| row.try_get("id").map_err(DatabaseError::from))
        .collect()
}

/// Get all line items of an order, oldest first.
pub async fn get_order_items<C: GenericClient + Sync>(
    client: &C,
    order_id: i64,
) -> Result<Vec<OrderItemRecord>, DatabaseError> {
    debug!("Fetching items for order: {}", order_id);

    let sql = format!(
        "SELECT {} FROM order_items WHERE pending_order_id = $1 ORDER BY id ASC",
        ITEM_COLUMNS
    );
    let rows = client.query(sql.as_str(), &[&order_id]).await?;

    rows.iter().map(row_to_item).collect()
}

/// Get one order item and lock it.
pub async fn lock_order_item<C: GenericClient + Sync>(
    client: &C,
    item_id: i64,
) -> Result<Option<OrderItemRecord>, DatabaseError> {
    let sql = format!("SELECT {} FROM order_items WHERE id = $1 FOR UPDATE", ITEM_COLUMNS);
    let row = client.query_opt(sql.as_str(), &[&item_id]).await?;

    row.as_ref().map(row_to_item).transpose()
}

/// Store the assigned domain in an item's metadata, keeping other keys.
pub async fn set_item_domain<C: GenericClient + Sync>(
    client: &C,
    item_id: i64,
    order_id: i64,
    domain_id: i64,
) -> Result<u64, DatabaseError> {
    let rows = client.execute(
        r#"
        UPDATE order_items
        SET metadata = jsonb_set(
            CASE WHEN jsonb_typeof(metadata) = 'object' THEN metadata ELSE '{}'::jsonb END,
            '{domain_id}',
            to_jsonb($3::BIGINT),
            true
        )
        WHERE id = $1 AND pending_order_id = $2
        "#,
        &[&item_id, &order_id, &domain_id],
    ).await?;

    Ok(rows)
}

/// Point a legacy order at its chosen domain.
pub async fn set_order_chosen_domain<C: GenericClient + Sync>(
    client: &C,
    order_id: i64,
    domain_id: i64,
) -> Result<u64, DatabaseError> {
    let rows = client.execute(
        r#"
        UPDATE pending_orders
        SET chosen_domain_id = $2, updated_at = NOW()
        WHERE id = $1 AND status <> 'cancelled'
        "#,
        &[&order_id, &domain_id],
    ).await?;

    Ok(rows)
}

/// Transition a pending order to paid.
///
/// Returns 0 if the order is no longer pending.
pub async fn mark_order_paid<C: GenericClient + Sync>(
    client: &C,
    order_id: i64,
    final_amount: Decimal,
    payment_notes: Option<&str>,
) -> Result<u64, DatabaseError> {
    let rows = client.execute(
        r#"
        UPDATE pending_orders
        SET status = 'paid',
            final_amount = $2,
            payment_notes = $3,
            paid_at = NOW(),
            updated_at = NOW()
        WHERE id = $1 AND status = 'pending'
        "#,
        &[&order_id, &final_amount, &payment_notes],
    ).await?;

    Ok(rows)
}

/// Transition a pending order to cancelled.
///
/// Returns 0 if the order is no longer pending.
pub async fn mark_order_cancelled<C: GenericClient + Sync>(
    client: &C,
    order_id: i64,
    reason: &str,
) -> Result<u64, DatabaseError> {
    let rows = client.execute(
        r#"
        UPDATE pending_orders
        SET status = 'cancelled',
            cancellation_reason = $2,
            cancelled_at = NOW(),
            updated_at = NOW()
        WHERE id = $1 AND status = 'pending'
        "#,
        &[&order_id, &reason],
    ).await?;

    Ok(rows)
}

// ============================================
// CATALOG QUERIES
// ============================================

async fn get_catalog_entry<C: GenericClient + Sync>(
    client: &C,
    table: &str,
    id: i64,
) -> Result<Option<CatalogEntry>, DatabaseError> {
    let sql = format!("SELECT id, name, price FROM {} WHERE id = $1", table);
    let row = client.query_opt(sql.as_str(), &[&id]).await?;

    match row {
        Some(row) => Ok(Some(CatalogEntry {
            id: row.try_get("id")?,
            name: row.try_get("name")?,
            price: row.try_get("price")?,
        })),
        None => Ok(None),
    }
}

/// Get a template from the catalog.
pub async fn get_template_by_id<C: GenericClient + Sync>(
    client: &C,
    id: i64,
) -> Result<Option<CatalogEntry>, DatabaseError> {
    get_catalog_entry(client, "templates", id).await
}

/// Get a tool from the catalog.
pub async fn get_tool_by_id<C: GenericClient + Sync>(
    client: &C,
    id: i64,
) -> Result<Option<CatalogEntry>, DatabaseError> {
    get_catalog_entry(client, "tools", id).await
}

// ============================================
// DOMAIN QUERIES
// ============================================

/// Get a domain by id.
pub async fn get_domain_by_id<C: GenericClient + Sync>(
    client: &C,
    id: i64,
) -> Result<Option<DomainRecord>, DatabaseError> {
    let sql = format!("SELECT {} FROM domains WHERE id = $1", DOMAIN_COLUMNS);
    let row = client.query_opt(sql.as_str(), &[&id]).await?;

    row.as_ref().map(row_to_domain).transpose()
}

/// Domains of a template family that are available, plus the listed ids
/// whatever their status.
pub async fn get_available_domains<C: GenericClient + Sync>(
    client: &C,
    template_id: i64,
    include_ids: &[i64],
) -> Result<Vec<DomainRecord>, DatabaseError> {
    debug!("Fetching available domains for template: {}", template_id);

    let sql = format!(
        r#"
        SELECT {} FROM domains
        WHERE template_id = $1
          AND (status = 'available' OR id = ANY($2))
        ORDER BY (status = 'available') ASC, domain_name ASC
        "#,
        DOMAIN_COLUMNS
    );
    let rows = client.query(sql.as_str(), &[&template_id, &include_ids]).await?;

    rows.iter().map(row_to_domain).collect()
}

/// Claim an available domain for an order in one statement.
///
/// The domain must belong to the `template_id` family. Returns 0 when it
/// was not available or belongs to another family.
pub async fn claim_domain<C: GenericClient + Sync>(
    client: &C,
    domain_id: i64,
    order_id: i64,
    template_id: i64,
) -> Result<u64, DatabaseError> {
    let rows = client.execute(
        r#"
        UPDATE domains
        SET status = 'in_use', assigned_order_id = $2, assigned_at = NOW()
        WHERE id = $1
          AND status = 'available'
          AND template_id = $3
        "#,
        &[&domain_id, &order_id, &template_id],
    ).await?;

    Ok(rows)
}

/// Return a domain held by `order_id` to the pool.
pub async fn release_domain<C: GenericClient + Sync>(
    client: &C,
    domain_id: i64,
    order_id: i64,
) -> Result<u64, DatabaseError> {
    let rows = client.execute(
        r#"
        UPDATE domains
        SET status = 'available', assigned_order_id = NULL, assigned_at = NULL
        WHERE id = $1 AND assigned_order_id = $2 AND status = 'in_use'
        "#,
        &[&domain_id, &order_id],
    ).await?;

    Ok(rows)
}

/// Return every domain held by `order_id` to the pool.
pub async fn release_order_domains<C: GenericClient + Sync>(
    client: &C,
    order_id: i64,
) -> Result<u64, DatabaseError> {
    let rows = client.execute(
        r#"
        UPDATE domains
        SET status = 'available', assigned_order_id = NULL, assigned_at = NULL
        WHERE assigned_order_id = $1 AND status = 'in_use'
        "#,
        &[&order_id],
    ).await?;

    Ok(rows)
}

/// Insert a domain unless the name is taken.
///
/// Returns `None` on a duplicate name.
pub async fn insert_domain<C: GenericClient + Sync>(
    client: &C,
    template_id: i64,
    domain_name: &str,
) -> Result<Option<DomainRecord>, DatabaseError> {
    let sql = format!(
        r#"
        INSERT INTO domains (template_id, domain_name, status)
        VALUES ($1, $2, 'available')
        ON CONFLICT (domain_name) DO NOTHING
        RETURNING {}
        "#,
        DOMAIN_COLUMNS
    );
    let row = client.query_opt(sql.as_str(), &[&template_id, &domain_name]).await?;

    row.as_ref().map(row_to_domain).transpose()
}

/// Delete a domain only while it is available.
pub async fn delete_available_domain<C: GenericClient + Sync>(
    client: &C,
    domain_id: i64,
) -> Result<u64, DatabaseError> {
    let rows = client.execute(
        "DELETE FROM domains WHERE id = $1 AND status = 'available'",
        &[&domain_id],
    ).await?;

    Ok(rows)
}

/// Move a domain from `from` to `to` status, if it is still in `from`.
pub async fn transition_domain_status<C: GenericClient + Sync>(
    client: &C,
    domain_id: i64,
    from: DomainStatus,
    to: DomainStatus,
) -> Result<u64, DatabaseError> {
    let rows = client.execute(
        "UPDATE domains SET status = $3 WHERE id = $1 AND status = $2",
        &[&domain_id, &from.as_str(), &to.as_str()],
    ).await?;

    Ok(rows)
}

// ============================================
// AFFILIATE QUERIES
// ============================================

/// Get the active affiliate owning a referral code (case-insensitive).
pub async fn get_active_affiliate_by_code<C: GenericClient + Sync>(
    client: &C,
    code: &str,
) -> Result<Option<AffiliateRecord>, DatabaseError> {
    let sql = format!(
        "SELECT {} FROM affiliates WHERE code = UPPER($1) AND status = 'active'",
        AFFILIATE_COLUMNS
    );
    let row = client.query_opt(sql.as_str(), &[&code]).await?;

    row.as_ref().map(row_to_affiliate).transpose()
}

/// Credit commission from a sale to an affiliate.
pub async fn accrue_commission<C: GenericClient + Sync>(
    client: &C,
    affiliate_id: i64,
    amount: Decimal,
) -> Result<u64, DatabaseError> {
    let rows = client.execute(
        r#"
        UPDATE affiliates
        SET commission_earned = commission_earned + $2,
            commission_pending = commission_pending + $2,
            total_sales = total_sales + 1,
            updated_at = NOW()
        WHERE id = $1
        "#,
        &[&affiliate_id, &amount],
    ).await?;

    Ok(rows)
}

/// Move `amount` from pending to paid commission.
///
/// Returns 0 if the affiliate's pending balance is smaller than `amount`.
pub async fn settle_commission<C: GenericClient + Sync>(
    client: &C,
    affiliate_id: i64,
    amount: Decimal,
) -> Result<u64, DatabaseError> {
    let rows = client.execute(
        r#"
        UPDATE affiliates
        SET commission_pending = commission_pending - $2,
            commission_paid = commission_paid + $2,
            updated_at = NOW()
        WHERE id = $1 AND commission_pending >= $2
        "#,
        &[&affiliate_id, &amount],
    ).await?;

    Ok(rows)
}

/// Create the user account backing an affiliate.
pub async fn insert_user<C: GenericClient + Sync>(
    client: &C,
    name: &str,
    email: &str,
) -> Result<i64, DatabaseError> {
    let row = client.query_one(
        "INSERT INTO users (name, email, role) VALUES ($1, $2, 'affiliate') RETURNING id",
        &[&name, &email],
    ).await?;

    Ok(row.try_get("id")?)
}

/// Create an affiliate with an empty ledger.
pub async fn insert_affiliate<C: GenericClient + Sync>(
    client: &C,
    user_id: i64,
    code: &str,
) -> Result<AffiliateRecord, DatabaseError> {
    let sql = format!(
        "INSERT INTO affiliates (user_id, code, status) VALUES ($1, $2, 'active') RETURNING {}",
        AFFILIATE_COLUMNS
    );
    let row = client.query_one(sql.as_str(), &[&user_id, &code]).await?;

    row_to_affiliate(&row)
}

/// Change an affiliate's status.
pub async fn set_affiliate_status<C: GenericClient + Sync>(
    client: &C,
    affiliate_id: i64,
    status: AffiliateStatus,
) -> Result<u64, DatabaseError> {
    let rows = client.execute(
        "UPDATE affiliates SET status = $2, updated_at = NOW() WHERE id = $1",
        &[&affiliate_id, &status.as_str()],
    ).await?;

    Ok(rows)
}

/// Affiliates whose ledger is off by more than `tolerance`.
pub async fn get_unbalanced_affiliates<C: GenericClient + Sync>(
    client: &C,
    tolerance: Decimal,
) -> Result<Vec<AffiliateRecord>, DatabaseError> {
    let sql = format!(
        r#"
        SELECT {} FROM affiliates
        WHERE ABS(commission_earned - commission_pending - commission_paid) > $1
        ORDER BY id ASC
        "#,
        AFFILIATE_COLUMNS
    );
    let rows = client.query(sql.as_str(), &[&tolerance]).await?;

    rows.iter().map(row_to_affiliate).collect()
}

/// Name and email of the user behind an affiliate.
pub async fn get_affiliate_contact<C: GenericClient + Sync>(
    client: &C,
    affiliate_id: i64,
) -> Result<Option<(String, String)>, DatabaseError> {
    let row = client.query_opt(
        r#"
        SELECT u.name, u.email
        FROM affiliates a
        JOIN users u ON u.id = a.user_id
        WHERE a.id = $1
        "#,
        &[&affiliate_id],
    ).await?;

    match row {
        Some(row) => Ok(Some((row.try_get("name")?, row.try_get("email")?))),
        None => Ok(None),
    }
}

/// Count affiliates (for audit summaries).
pub async fn count_affiliates<C: GenericClient + Sync>(client: &C) -> Result<i64, DatabaseError> {
    let row = client.query_one("SELECT COUNT(*) AS count FROM affiliates", &[]).await?;
    Ok(row.try_get("count")?)
}

// ============================================
// SALE QUERIES
// ============================================

/// Record the sale produced by a paid order.
pub async fn insert_sale<C: GenericClient + Sync>(
    client: &C,
    sale: &NewSale,
) -> Result<i64, DatabaseError> {
    let row = client.query_one(
        r#"
        INSERT INTO sales (
            reference, pending_order_id, affiliate_id, customer_name, customer_email,
            amount_paid, commission_amount, payment_confirmed_by, payment_notes
        )
        VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9)
        RETURNING id
        "#,
        &[
            &sale.reference,
            &sale.order_id,
            &sale.affiliate_id,
            &sale.customer_name,
            &sale.customer_email,
            &sale.amount_paid,
            &sale.commission_amount,
            &sale.payment_confirmed_by,
            &sale.payment_notes,
        ],
    ).await?;

    Ok(row.try_get("id")?)
}

// ============================================
// WITHDRAWAL QUERIES
// ============================================

/// Get a withdrawal request and lock it.
pub async fn lock_withdrawal<C: GenericClient + Sync>(
    client: &C,
    id: i64,
) -> Result<Option<WithdrawalRecord>, DatabaseError> {
    let sql = format!(
        "SELECT {} FROM withdrawal_requests WHERE id = $1 FOR UPDATE",
        WITHDRAWAL_COLUMNS
    );
    let row = client.query_opt(sql.as_str(), &[&id]).await?;

    row.as_ref().map(row_to_withdrawal).transpose()
}

/// Move a pending withdrawal to its processed status.
///
/// Returns 0 if the request is no longer pending.
pub async fn process_withdrawal<C: GenericClient + Sync>(
    client: &C,
    id: i64,
    status: WithdrawalStatus,
    admin_notes: Option<&str>,
    processed_by: i64,
) -> Result<u64, DatabaseError> {
    let rows = client.execute(
        r#"
        UPDATE withdrawal_requests
        SET status = $2,
            admin_notes = $3,
            processed_at = NOW(),
            processed_by = $4
        WHERE id = $1 AND status = 'pending'
        "#,
        &[&id, &status.as_str(), &admin_notes, &processed_by],
    ).await?;

    Ok(rows)
}

// ============================================
// SETTINGS, ACTIVITY, EMAIL
// ============================================

/// Load all site settings.
pub async fn get_settings<C: GenericClient + Sync>(
    client: &C,
) -> Result<HashMap<String, String>, DatabaseError> {
    let rows = client.query("SELECT setting_key, setting_value FROM settings", &[]).await?;

    let mut settings = HashMap::with_capacity(rows.len());
    for row in rows {
        settings.insert(row.try_get("setting_key")?, row.try_get("setting_value")?);
    }

    Ok(settings)
}

/// Append to the admin activity log.
pub async fn log_activity<C: GenericClient + Sync>(
    client: &C,
    action: &str,
    details: &str,
    user_id: Option<i64>,
) -> Result<(), DatabaseError> {
    client.execute(
        "INSERT INTO activity_logs (action, details, user_id) VALUES ($1, $2, $3)",
        &[&action, &details, &user_id],
    ).await?;

    Ok(())
}

/// Queue an outgoing email.
pub async fn enqueue_email<C: GenericClient + Sync>(
    client: &C,
    recipient: &str,
    subject: &str,
    template: &str,
    payload: &serde_json::Value,
) -> Result<i64, DatabaseError> {
    let row = client.query_one(
        r#"
        INSERT INTO email_queue (recipient, subject, template, payload)
        VALUES ($1, $2, $3, $4)
        RETURNING id
        "#,
        &[&recipient, &subject, &template, payload],
    ).await?;

    Ok(row.try_get("id")?)
}
