//! # REST API Module
//!
//! HTTP endpoints for the admin back-office.
//!
//! | Method | Path | Description |
//! |--------|------|-------------|
//! | GET | `/orders/{id}` | Order detail with computed total |
//! | POST | `/orders/{id}/finalize` | Mark paid, optionally assigning domains |
//! | POST | `/orders/{id}/cancel` | Cancel and release domains |
//! | POST | `/orders/bulk-finalize` | Bulk mark paid |
//! | POST | `/orders/bulk-cancel` | Bulk cancel |
//! | GET | `/domains/available` | Domain picker |
//! | POST | `/domains/{id}/assign` | Assign a domain |
//! | POST | `/withdrawals/{id}/process` | Settle a withdrawal |
//! | GET | `/health` | Health check |
//!
//! See [`routes::configure_routes`] for the full table.
//!
//! ## Authentication
//!
//! Session handling lives in front of this service. Mutating endpoints
//! read the acting admin's id from the `X-Admin-Id` header and answer
//! `401` without it.
//!
//! ## Envelope
//!
//! Bodies are camelCase JSON. Handlers wrap results in
//! [`ApiResponse`](crate::models::ApiResponse): `data` on success,
//! `error.code` plus `error.message` on failure. Codes come from
//! [`ServiceError::code`](crate::services::ServiceError::code), with
//! `UNAUTHORIZED` added at this layer.

pub mod routes;
pub mod handlers;

pub use routes::configure_routes;
