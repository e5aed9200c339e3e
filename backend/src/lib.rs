//! # Storefront Admin Backend
//!
//! Back-office service for a storefront selling website templates and
//! digital tools. Admins use it to:
//!
//! - finalize (mark paid) or cancel customer orders, singly or in bulk
//! - allocate hosting domains to the templates customers bought
//! - credit referring affiliates and settle their withdrawals
//!
//! The binary in `main.rs` wires these services into an HTTP server;
//! integration tests build the same [`AppState`] against a test database.

pub mod api;
pub mod config;
pub mod db;
pub mod models;
pub mod services;
pub mod utils;

use config::AppConfig;
use db::Database;
use services::{
    AffiliateLedger, BulkOperations, DomainAllocator, LedgerAuditor, Notifier, OrderFinalizer,
    OrderRepository,
};

/// Application state shared across all handlers.
///
/// Wrapped in an `Arc` and handed to every worker; each service holds
/// its own clone of the pool handle and configuration.
pub struct AppState {
    /// Database connection pool for PostgreSQL
    pub db: Database,

    /// Application configuration
    pub config: AppConfig,

    /// Order reads and computed totals
    pub order_repository: OrderRepository,

    /// Domain inventory and assignment
    pub domain_allocator: DomainAllocator,

    /// Mark paid / cancel
    pub order_finalizer: OrderFinalizer,

    /// Bulk mark paid / cancel
    pub bulk_operations: BulkOperations,

    /// Affiliates and withdrawals
    pub affiliate_ledger: AffiliateLedger,

    /// Ledger consistency checks
    pub ledger_auditor: LedgerAuditor,
}

impl AppState {
    /// Build every service on top of one pool and configuration.
    pub fn new(db: Database, config: AppConfig) -> Self {
        let notifier = Notifier::new(db.clone(), config.currency_symbol.clone());
        let order_finalizer = OrderFinalizer::new(db.clone(), config.clone(), notifier.clone());

        Self {
            order_repository: OrderRepository::new(db.clone(), config.clone()),
            domain_allocator: DomainAllocator::new(db.clone()),
            bulk_operations: BulkOperations::new(db.clone(), order_finalizer.clone()),
            affiliate_ledger: AffiliateLedger::new(db.clone(), notifier),
            ledger_auditor: LedgerAuditor::new(db.clone(), config.clone()),
            order_finalizer,
            db,
            config,
        }
    }
}
