#![allow(dead_code)]

use std::env;
use std::sync::{Arc, OnceLock};

use rust_decimal::Decimal;
use serde_json::json;
use tokio::sync::{Mutex, MutexGuard};

use storefront_admin::config::AppConfig;
use storefront_admin::db::Database;
use storefront_admin::AppState;

static TEST_DB_LOCK: OnceLock<Mutex<()>> = OnceLock::new();

const RESET_SQL: &str = r#"
    TRUNCATE email_queue, activity_logs, settings, withdrawal_requests, sales,
             order_items, pending_orders, domains, affiliates, users, templates, tools
    RESTART IDENTITY CASCADE
"#;

pub struct TestDb {
    pub db: Database,
    pub state: Arc<AppState>,
    _guard: MutexGuard<'static, ()>,
}

pub fn test_config(database_url: &str) -> AppConfig {
    AppConfig {
        database_url: database_url.to_string(),
        db_pool_size: 8,
        server_host: "127.0.0.1".to_string(),
        server_port: 0,
        admin_ui_origin: None,
        customer_discount_rate: Decimal::new(20, 2),
        affiliate_commission_rate: Decimal::new(30, 2),
        currency_symbol: "₦".to_string(),
        ledger_audit_interval: 300,
    }
}

/// A freshly emptied schema, or `None` when `TEST_DATABASE_URL` is unset.
pub async fn init_test_db() -> Option<TestDb> {
    dotenvy::dotenv().ok();
    let Ok(url) = env::var("TEST_DATABASE_URL") else {
        eprintln!("TEST_DATABASE_URL not set; skipping database test");
        return None;
    };

    let lock = TEST_DB_LOCK.get_or_init(|| Mutex::new(()));
    let guard = lock.lock().await;

    let db = Database::connect(&url, 8).await.expect("connect test db");
    db.run_migrations().await.expect("migrations");
    db.client()
        .await
        .expect("client")
        .batch_execute(RESET_SQL)
        .await
        .expect("reset tables");

    let state = Arc::new(AppState::new(db.clone(), test_config(&url)));
    Some(TestDb { db, state, _guard: guard })
}

impl TestDb {
    async fn insert_id(&self, sql: &str, params: &[&(dyn tokio_postgres::types::ToSql + Sync)]) -> i64 {
        let client = self.db.client().await.expect("client");
        client
            .query_one(sql, params)
            .await
            .expect("seed insert")
            .get("id")
    }

    pub async fn template(&self, name: &str, price: i64) -> i64 {
        self.insert_id(
            "INSERT INTO templates (name, price) VALUES ($1, $2) RETURNING id",
            &[&name, &Decimal::from(price)],
        ).await
    }

    pub async fn tool(&self, name: &str, price: i64) -> i64 {
        self.insert_id(
            "INSERT INTO tools (name, price) VALUES ($1, $2) RETURNING id",
            &[&name, &Decimal::from(price)],
        ).await
    }

    pub async fn domain(&self, template_id: i64, name: &str) -> i64 {
        self.insert_id(
            "INSERT INTO domains (template_id, domain_name) VALUES ($1, $2) RETURNING id",
            &[&template_id, &name],
        ).await
    }

    /// Pending order with no stored prices.
    pub async fn order(&self, affiliate_code: Option<&str>) -> i64 {
        self.insert_id(
            r#"
            INSERT INTO pending_orders (customer_name, customer_email, order_type, affiliate_code)
            VALUES ('Ada Obi', 'ada@example.com', 'mixed', $1)
            RETURNING id
            "#,
            &[&affiliate_code],
        ).await
    }

    /// Legacy single-template order priced only by the catalog.
    pub async fn legacy_order(&self, template_id: i64, affiliate_code: Option<&str>) -> i64 {
        self.insert_id(
            r#"
            INSERT INTO pending_orders (customer_name, customer_email, order_type, template_id, affiliate_code)
            VALUES ('Bola Ade', 'bola@example.com', 'template', $1, $2)
            RETURNING id
            "#,
            &[&template_id, &affiliate_code],
        ).await
    }

    pub async fn item(&self, order_id: i64, product_type: &str, product_id: i64, quantity: i32, unit_price: i64) -> i64 {
        self.insert_id(
            r#"
            INSERT INTO order_items (pending_order_id, product_type, product_id, quantity, unit_price, metadata)
            VALUES ($1, $2, $3, $4, $5, $6)
            RETURNING id
            "#,
            &[&order_id, &product_type, &product_id, &quantity, &Decimal::from(unit_price), &json!({"category": "web"})],
        ).await
    }

    pub async fn affiliate(&self, code: &str, status: &str) -> i64 {
        let user_id = self.insert_id(
            "INSERT INTO users (name, email) VALUES ($1, $2) RETURNING id",
            &[&code, &format!("{}@partners.example.com", code.to_lowercase())],
        ).await;
        self.insert_id(
            "INSERT INTO affiliates (user_id, code, status) VALUES ($1, $2, $3) RETURNING id",
            &[&user_id, &code, &status],
        ).await
    }

    pub async fn withdrawal(&self, affiliate_id: i64, amount: i64) -> i64 {
        self.insert_id(
            "INSERT INTO withdrawal_requests (affiliate_id, amount) VALUES ($1, $2) RETURNING id",
            &[&affiliate_id, &Decimal::from(amount)],
        ).await
    }

    pub async fn scalar_i64(&self, sql: &str, id: i64) -> i64 {
        let client = self.db.client().await.expect("client");
        client.query_one(sql, &[&id]).await.expect("query").get(0)
    }

    pub async fn scalar_text(&self, sql: &str, id: i64) -> String {
        let client = self.db.client().await.expect("client");
        client.query_one(sql, &[&id]).await.expect("query").get(0)
    }

    pub async fn scalar_decimal(&self, sql: &str, id: i64) -> Decimal {
        let client = self.db.client().await.expect("client");
        client.query_one(sql, &[&id]).await.expect("query").get(0)
    }

    pub async fn order_status(&self, order_id: i64) -> String {
        self.scalar_text("SELECT status FROM pending_orders WHERE id = $1", order_id).await
    }

    pub async fn domain_status(&self, domain_id: i64) -> String {
        self.scalar_text("SELECT status FROM domains WHERE id = $1", domain_id).await
    }

    pub async fn sales_for(&self, order_id: i64) -> i64 {
        self.scalar_i64("SELECT COUNT(*) FROM sales WHERE pending_order_id = $1", order_id).await
    }
}
