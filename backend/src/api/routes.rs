//! # API Route Configuration
//!
//! This module sets up all the HTTP routes for the API.

use actix_web::web;

use super::handlers;

/// Configure all API routes.
///
/// ## Route Structure
///
/// ```text
/// /
/// ├── /health                      GET    - Health check
/// ├── /orders
/// │   ├── /bulk-finalize           POST   - Mark many orders paid
/// │   ├── /bulk-cancel             POST   - Cancel many orders
/// │   ├── /{id}                    GET    - Order detail + computed total
/// │   ├── /{id}/finalize           POST   - Mark paid (+ domain assignments)
/// │   └── /{id}/cancel             POST   - Cancel, releasing domains
/// ├── /domains
/// │   ├── /available               GET    - Picker (?templateId=&orderId=)
/// │   ├── /                        POST   - Add domain
/// │   ├── /bulk                    POST   - Add many domains
/// │   ├── /{id}/assign             POST   - Assign to order / item
/// │   ├── /{id}/suspend            POST   - Suspend or reinstate
/// │   └── /{id}                    DELETE - Delete available domain
/// ├── /affiliates
/// │   ├── /                        POST   - Create affiliate
/// │   ├── /ledger-audit            GET    - Run ledger audit now
/// │   └── /{id}/status             POST   - Change status
/// └── /withdrawals
///     └── /{id}/process            POST   - Approve / pay / reject
/// ```
pub fn configure_routes(cfg: &mut web::ServiceConfig) {
    cfg
        // Root endpoint - API information
        .route("/", web::get().to(handlers::api_info))

        // Health check endpoint
        .route("/health", web::get().to(handlers::health_check))

        // Order endpoints
        .service(
            web::scope("/orders")
                // Literal paths before `{id}` patterns
                .route("/bulk-finalize", web::post().to(handlers::bulk_finalize))
                .route("/bulk-cancel", web::post().to(handlers::bulk_cancel))
                .route("/{id}", web::get().to(handlers::get_order))
                .route("/{id}/finalize", web::post().to(handlers::finalize_order))
                .route("/{id}/cancel", web::post().to(handlers::cancel_order))
        )

        // Domain inventory endpoints
        .service(
            web::scope("/domains")
                .route("/available", web::get().to(handlers::get_available_domains))
                .route("", web::post().to(handlers::add_domain))
                .route("/bulk", web::post().to(handlers::bulk_add_domains))
                .route("/{id}/assign", web::post().to(handlers::assign_domain))
                .route("/{id}/suspend", web::post().to(handlers::suspend_domain))
                .route("/{id}", web::delete().to(handlers::delete_domain))
        )

        // Affiliate endpoints
        .service(
            web::scope("/affiliates")
                .route("", web::post().to(handlers::create_affiliate))
                .route("/ledger-audit", web::get().to(handlers::ledger_audit))
                .route("/{id}/status", web::post().to(handlers::set_affiliate_status))
        )

        // Withdrawal endpoints
        .service(
            web::scope("/withdrawals")
                .route("/{id}/process", web::post().to(handlers::process_withdrawal))
        );
}
