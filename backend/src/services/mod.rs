//! # Services Module
//!
//! This module contains the business logic of the admin back-office.
//! Each service handles one concern and talks to PostgreSQL through
//! [`crate::db::queries`].
//!
//! ## Services Overview
//!
//! | Service | Responsibility |
//! |---------|---------------|
//! | `OrderRepository` | Reading orders, computing what they cost |
//! | `PricingEngine` | Pure money arithmetic (totals, discounts, commission) |
//! | `DomainAllocator` | Domain inventory, race-free assignment |
//! | `OrderFinalizer` | Mark paid / cancel, atomically |
//! | `BulkOperations` | Finalizer applied to many orders |
//! | `AffiliateLedger` | Affiliates and withdrawal settlement |
//! | `LedgerAuditor` | Background ledger consistency check |
//! | `Notifier` | Best-effort email outbox |
//!
//! ## Service Architecture
//!
//! ```text
//! ┌─────────────────────────────────────────────────────────────────┐
//! │                        SERVICES LAYER                            │
//! │                                                                  │
//! │  ┌────────────────┐     ┌──────────────────────────────────┐    │
//! │  │ BulkOperations │────>│          OrderFinalizer           │    │
//! │  └────────────────┘     │  finalize_order()  cancel_order() │    │
//! │                         └──────────────────────────────────┘    │
//! │                                   │                              │
//! │         ┌─────────────────────────┼──────────────────┐          │
//! │         ▼                         ▼                  ▼          │
//! │  ┌──────────────┐        ┌────────────────┐   ┌────────────┐   │
//! │  │   Order      │        │    Domain      │   │  Notifier  │   │
//! │  │  Repository  │        │   Allocator    │   │  (outbox)  │   │
//! │  │ + Pricing    │        │                │   └────────────┘   │
//! │  └──────────────┘        └────────────────┘          ▲          │
//! │                                                       │          │
//! │  ┌──────────────┐        ┌────────────────┐          │          │
//! │  │    Ledger    │        │   Affiliate    │──────────┘          │
//! │  │   Auditor    │        │    Ledger      │                     │
//! │  └──────────────┘        └────────────────┘                     │
//! └─────────────────────────────────────────────────────────────────┘
//! ```

pub mod error;
pub mod pricing;
pub mod order_repository;
pub mod domain_allocator;
pub mod order_finalizer;
pub mod bulk_operations;
pub mod affiliate_ledger;
pub mod ledger_auditor;
pub mod notifier;

pub use error::ServiceError;
pub use pricing::PricingEngine;
pub use order_repository::OrderRepository;
pub use domain_allocator::{AssignOutcome, DomainAllocator};
pub use order_finalizer::OrderFinalizer;
pub use bulk_operations::BulkOperations;
pub use affiliate_ledger::AffiliateLedger;
pub use ledger_auditor::LedgerAuditor;
pub use notifier::Notifier;
