//! # Storefront Admin Backend
//!
//! Binary entry point. Serves the admin REST API for order finalization,
//! domain allocation and the affiliate ledger, and runs the periodic ledger
//! audit next to it.
//!
//! ```text
//!   admin UI ──HTTP──▶ api ──▶ services ──▶ PostgreSQL
//!                                 ▲
//!        ledger audit loop ───────┘
//! ```
//!
//! Running locally: create the database, put `DATABASE_URL` (and any of the
//! optional settings listed in `.env.example`) in `.env`, then start the
//! binary. The schema is applied on startup.

use std::io;
use std::sync::Arc;

use actix_cors::Cors;
use actix_web::{middleware, web, App, HttpServer};
use tracing::info;
use tracing_subscriber::EnvFilter;

use storefront_admin::api;
use storefront_admin::config::AppConfig;
use storefront_admin::db::Database;
use storefront_admin::AppState;

#[actix_web::main]
async fn main() -> io::Result<()> {
    // =========================================
    // STEP 1: Load .env and initialize logging
    // =========================================
    dotenvy::dotenv().ok(); // It's okay if .env doesn't exist

    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| EnvFilter::new("info,storefront_admin=debug")),
        )
        .with_target(true)
        .with_line_number(true)
        .init();

    info!("🚀 Starting Storefront Admin Backend");

    // =========================================
    // STEP 2: Load Configuration
    // =========================================
    let config = AppConfig::from_env()
        .map_err(|e| io::Error::new(io::ErrorKind::InvalidInput, e.to_string()))?;

    info!("📋 Configuration loaded");
    info!("   Discount rate: {}", config.customer_discount_rate);
    info!("   Commission rate: {}", config.affiliate_commission_rate);

    // =========================================
    // STEP 3: Initialize Database
    // =========================================
    let db = Database::connect(&config.database_url, config.db_pool_size)
        .await
        .map_err(|e| io::Error::new(io::ErrorKind::ConnectionRefused, e.to_string()))?;

    info!("🗄️  Database connected");

    db.run_migrations()
        .await
        .map_err(|e| io::Error::new(io::ErrorKind::Other, e.to_string()))?;

    info!("📦 Database schema ready");

    // =========================================
    // STEP 4: Create Application State
    // =========================================
    let app_state = Arc::new(AppState::new(db, config.clone()));

    info!("🔧 Services initialized");

    // =========================================
    // STEP 5: Start Background Services
    // =========================================
    let auditor = app_state.ledger_auditor.clone();
    tokio::spawn(async move {
        auditor.start_audit_loop().await;
    });

    info!("📊 Ledger auditor started");

    // =========================================
    // STEP 6: Start HTTP Server
    // =========================================
    let server_host = config.server_host.clone();
    let server_port = config.server_port;
    let admin_ui_origin = config.admin_ui_origin.clone();

    info!("🌐 Starting HTTP server on {}:{}", server_host, server_port);

    HttpServer::new(move || {
        let cors = match &admin_ui_origin {
            Some(origin) => Cors::default()
                .allowed_origin(origin)
                .allow_any_method()
                .allow_any_header()
                .max_age(3600),
            None => Cors::default(),
        };

        App::new()
            .app_data(web::Data::new(app_state.clone()))
            .wrap(middleware::Logger::default())
            .wrap(cors)
            .configure(api::configure_routes)
    })
    .bind(format!("{}:{}", server_host, server_port))?
    .run()
    .await
}
