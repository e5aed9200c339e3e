//! # API Request Handlers
//!
//! This module contains the handler functions for each API endpoint.
//! Each handler:
//! 1. Extracts request data (and the acting admin for mutations)
//! 2. Calls the appropriate service
//! 3. Returns a formatted response
//!
//! ## Error Handling
//!
//! Service errors map onto HTTP statuses:
//!
//! | Error | Status |
//! |-------|--------|
//! | `NotFound` | 404 |
//! | `InvalidInput` | 400 |
//! | `InvalidState`, `ConflictingAssignment` | 409 |
//! | `Persistence` | 500, generic message, details only in the log |
//!
//! ```json
//! {
//!     "success": false,
//!     "error": {
//!         "code": "CONFLICTING_ASSIGNMENT",
//!         "message": "Domain shop-one.com was just assigned to another order"
//!     }
//! }
//! ```

use std::sync::Arc;

use actix_web::http::StatusCode;
use actix_web::{web, HttpRequest, HttpResponse};
use chrono::Utc;
use serde_json::json;
use tracing::{error, info, warn};

use crate::models::{
    AddDomainRequest, AffiliateStatusRequest, ApiResponse, AssignDomainRequest,
    AvailableDomainsQuery, BulkAddDomainsRequest, BulkOrdersRequest, CancelOrderRequest,
    CreateAffiliateRequest, DomainListResponse, FinalizeOrderRequest, HealthResponse,
    MessageResponse, ProcessWithdrawalRequest, SuspendDomainRequest,
};
use crate::services::order_finalizer::DEFAULT_CANCEL_REASON;
use crate::services::{AssignOutcome, ServiceError};
use crate::AppState;

/// Header carrying the id of the admin performing a mutation.
pub const ADMIN_ID_HEADER: &str = "X-Admin-Id";

/// Identify the acting admin, or build the 401 to return.
fn admin_id(req: &HttpRequest) -> Result<i64, HttpResponse> {
    req.headers()
        .get(ADMIN_ID_HEADER)
        .and_then(|value| value.to_str().ok())
        .and_then(|value| value.trim().parse::<i64>().ok())
        .filter(|id| *id > 0)
        .ok_or_else(|| {
            warn!("Rejected {} {}: no admin identity", req.method(), req.path());
            HttpResponse::Unauthorized().json(ApiResponse::<()>::error(
                "UNAUTHORIZED",
                "An authenticated admin is required",
            ))
        })
}

/// HTTP status for a service error.
pub fn status_for(e: &ServiceError) -> StatusCode {
    match e {
        ServiceError::NotFound(_) => StatusCode::NOT_FOUND,
        ServiceError::InvalidInput(_) => StatusCode::BAD_REQUEST,
        ServiceError::InvalidState(_) | ServiceError::ConflictingAssignment(_) => StatusCode::CONFLICT,
        ServiceError::Persistence(_) => StatusCode::INTERNAL_SERVER_ERROR,
    }
}

/// Log a failed action and render its error envelope.
fn error_response(action: &str, e: &ServiceError) -> HttpResponse {
    match e {
        ServiceError::Persistence(_) => error!("{} failed: {}", action, e),
        _ => warn!("{} rejected: {}", action, e),
    }

    HttpResponse::build(status_for(e))
        .json(ApiResponse::<()>::error(e.code(), &e.public_message()))
}

/// API information endpoint (root).
///
/// `GET /`
pub async fn api_info() -> HttpResponse {
    let info = json!({
        "name": "Storefront Admin API",
        "version": env!("CARGO_PKG_VERSION"),
        "description": "Back-office API for order finalization, domains and affiliates",
        "endpoints": {
            "orders": {
                "detail": { "method": "GET", "path": "/orders/{id}" },
                "finalize": { "method": "POST", "path": "/orders/{id}/finalize" },
                "cancel": { "method": "POST", "path": "/orders/{id}/cancel" },
                "bulkFinalize": { "method": "POST", "path": "/orders/bulk-finalize" },
                "bulkCancel": { "method": "POST", "path": "/orders/bulk-cancel" }
            },
            "domains": {
                "available": { "method": "GET", "path": "/domains/available?templateId=&orderId=" },
                "add": { "method": "POST", "path": "/domains" },
                "bulkAdd": { "method": "POST", "path": "/domains/bulk" },
                "assign": { "method": "POST", "path": "/domains/{id}/assign" },
                "suspend": { "method": "POST", "path": "/domains/{id}/suspend" },
                "delete": { "method": "DELETE", "path": "/domains/{id}" }
            },
            "affiliates": {
                "create": { "method": "POST", "path": "/affiliates" },
                "status": { "method": "POST", "path": "/affiliates/{id}/status" },
                "ledgerAudit": { "method": "GET", "path": "/affiliates/ledger-audit" }
            },
            "withdrawals": {
                "process": { "method": "POST", "path": "/withdrawals/{id}/process" }
            },
            "auth": format!("Mutations require the {} header", ADMIN_ID_HEADER)
        }
    });

    HttpResponse::Ok().json(ApiResponse::success(info))
}

/// Health check endpoint.
///
/// `GET /health`
///
/// ```bash
/// curl http://127.0.0.1:8080/health
/// ```
pub async fn health_check(state: web::Data<Arc<AppState>>) -> HttpResponse {
    let db_healthy = match state.db.client().await {
        Ok(client) => client.query_one("SELECT 1", &[]).await.is_ok(),
        Err(_) => false,
    };

    let response = HealthResponse {
        status: if db_healthy { "healthy" } else { "unhealthy" }.to_string(),
        database: db_healthy,
        version: env!("CARGO_PKG_VERSION").to_string(),
        timestamp: Utc::now(),
    };

    let status_code = if db_healthy {
        StatusCode::OK
    } else {
        StatusCode::SERVICE_UNAVAILABLE
    };

    HttpResponse::build(status_code).json(ApiResponse::success(response))
}

// ============================================
// ORDERS
// ============================================

/// Order with items and computed total.
///
/// `GET /orders/{id}`
pub async fn get_order(state: web::Data<Arc<AppState>>, path: web::Path<i64>) -> HttpResponse {
    let order_id = path.into_inner();

    match state.order_repository.get_order_detail(order_id).await {
        Ok(detail) => HttpResponse::Ok().json(ApiResponse::success(detail)),
        Err(e) => error_response("Get order", &e),
    }
}

/// Decode a finalize body. Only an empty body means "all defaults".
fn parse_finalize_body(body: &[u8]) -> Result<FinalizeOrderRequest, ServiceError> {
    if body.iter().all(u8::is_ascii_whitespace) {
        return Ok(FinalizeOrderRequest::default());
    }

    serde_json::from_slice(body)
        .map_err(|e| ServiceError::InvalidInput(format!("Malformed finalize request: {}", e)))
}

/// Mark an order paid.
///
/// `POST /orders/{id}/finalize`
///
/// ```bash
/// curl -X POST http://127.0.0.1:8080/orders/42/finalize \
///   -H "Content-Type: application/json" -H "X-Admin-Id: 1" \
///   -d '{"amountPaid": "23000", "domainAssignments": [{"domainId": 7, "orderItemId": 91}]}'
/// ```
pub async fn finalize_order(
    req: HttpRequest,
    state: web::Data<Arc<AppState>>,
    path: web::Path<i64>,
    body: web::Bytes,
) -> HttpResponse {
    let admin = match admin_id(&req) {
        Ok(id) => id,
        Err(resp) => return resp,
    };
    let order_id = path.into_inner();
    let request = match parse_finalize_body(&body) {
        Ok(request) => request,
        Err(e) => return error_response("Finalize order", &e),
    };

    info!("Finalize request for order #{} by admin {}", order_id, admin);

    match state.order_finalizer.finalize_order(order_id, admin, request).await {
        Ok(result) => HttpResponse::Ok().json(ApiResponse::success(result)),
        Err(e) => error_response("Finalize order", &e),
    }
}

/// Cancel an order.
///
/// `POST /orders/{id}/cancel`
pub async fn cancel_order(
    req: HttpRequest,
    state: web::Data<Arc<AppState>>,
    path: web::Path<i64>,
    body: web::Json<CancelOrderRequest>,
) -> HttpResponse {
    let admin = match admin_id(&req) {
        Ok(id) => id,
        Err(resp) => return resp,
    };
    let order_id = path.into_inner();

    match state.order_finalizer.cancel_order(order_id, &body.reason, admin).await {
        Ok(result) => HttpResponse::Ok().json(ApiResponse::success(result)),
        Err(e) => error_response("Cancel order", &e),
    }
}

/// Mark many orders paid at their computed totals.
///
/// `POST /orders/bulk-finalize`
pub async fn bulk_finalize(
    req: HttpRequest,
    state: web::Data<Arc<AppState>>,
    body: web::Json<BulkOrdersRequest>,
) -> HttpResponse {
    let admin = match admin_id(&req) {
        Ok(id) => id,
        Err(resp) => return resp,
    };

    info!("Bulk finalize of {} orders by admin {}", body.ids.len(), admin);

    match state.bulk_operations.bulk_mark_paid(&body.ids, admin).await {
        Ok(result) => HttpResponse::Ok().json(ApiResponse::success(result)),
        Err(e) => error_response("Bulk finalize", &e),
    }
}

/// Cancel many orders.
///
/// `POST /orders/bulk-cancel`
pub async fn bulk_cancel(
    req: HttpRequest,
    state: web::Data<Arc<AppState>>,
    body: web::Json<BulkOrdersRequest>,
) -> HttpResponse {
    let admin = match admin_id(&req) {
        Ok(id) => id,
        Err(resp) => return resp,
    };
    let reason = body.reason.as_deref().unwrap_or(DEFAULT_CANCEL_REASON);

    info!("Bulk cancel of {} orders by admin {}", body.ids.len(), admin);

    match state.bulk_operations.bulk_cancel(&body.ids, reason, admin).await {
        Ok(result) => HttpResponse::Ok().json(ApiResponse::success(result)),
        Err(e) => error_response("Bulk cancel", &e),
    }
}

// ============================================
// DOMAINS
// ============================================

/// Domains an admin may pick for a template.
///
/// `GET /domains/available?templateId=3&orderId=42`
pub async fn get_available_domains(
    state: web::Data<Arc<AppState>>,
    query: web::Query<AvailableDomainsQuery>,
) -> HttpResponse {
    let AvailableDomainsQuery { template_id, order_id } = query.into_inner();

    match state.domain_allocator.get_available_domains(template_id, order_id).await {
        Ok(domains) => HttpResponse::Ok().json(ApiResponse::success(DomainListResponse {
            template_id,
            domains,
        })),
        Err(e) => error_response("List domains", &e),
    }
}

/// Add one domain.
///
/// `POST /domains`
pub async fn add_domain(
    req: HttpRequest,
    state: web::Data<Arc<AppState>>,
    body: web::Json<AddDomainRequest>,
) -> HttpResponse {
    let admin = match admin_id(&req) {
        Ok(id) => id,
        Err(resp) => return resp,
    };

    match state.domain_allocator.add_domain(body.template_id, &body.domain_name, admin).await {
        Ok(domain) => HttpResponse::Created().json(ApiResponse::success(domain)),
        Err(e) => error_response("Add domain", &e),
    }
}

/// Add many domains from free text.
///
/// `POST /domains/bulk`
pub async fn bulk_add_domains(
    req: HttpRequest,
    state: web::Data<Arc<AppState>>,
    body: web::Json<BulkAddDomainsRequest>,
) -> HttpResponse {
    let admin = match admin_id(&req) {
        Ok(id) => id,
        Err(resp) => return resp,
    };

    match state.domain_allocator.bulk_add_domains(body.template_id, &body.domains, admin).await {
        Ok(result) => HttpResponse::Ok().json(ApiResponse::success(result)),
        Err(e) => error_response("Bulk add domains", &e),
    }
}

/// Assign a domain to an order, or to one item of it.
///
/// `POST /domains/{id}/assign`
pub async fn assign_domain(
    req: HttpRequest,
    state: web::Data<Arc<AppState>>,
    path: web::Path<i64>,
    body: web::Json<AssignDomainRequest>,
) -> HttpResponse {
    let admin = match admin_id(&req) {
        Ok(id) => id,
        Err(resp) => return resp,
    };
    let domain_id = path.into_inner();
    let AssignDomainRequest { order_id, order_item_id } = body.into_inner();

    let result = match order_item_id {
        Some(item_id) => {
            state.domain_allocator
                .set_order_item_domain(item_id, domain_id, order_id, admin)
                .await
        }
        None => {
            state.domain_allocator
                .assign_domain_to_customer(domain_id, order_id, admin)
                .await
        }
    };

    match result {
        Ok(AssignOutcome::Assigned) => HttpResponse::Ok().json(ApiResponse::success(
            MessageResponse::new(format!("Domain {} assigned to order #{}", domain_id, order_id)),
        )),
        Ok(AssignOutcome::AlreadyAssigned) => HttpResponse::Ok().json(ApiResponse::success(
            MessageResponse::new(format!("Domain {} was already assigned to order #{}", domain_id, order_id)),
        )),
        Err(e) => error_response("Assign domain", &e),
    }
}

/// Suspend or reinstate a domain.
///
/// `POST /domains/{id}/suspend`
pub async fn suspend_domain(
    req: HttpRequest,
    state: web::Data<Arc<AppState>>,
    path: web::Path<i64>,
    body: web::Json<SuspendDomainRequest>,
) -> HttpResponse {
    let admin = match admin_id(&req) {
        Ok(id) => id,
        Err(resp) => return resp,
    };

    match state.domain_allocator.set_domain_suspended(path.into_inner(), body.suspended, admin).await {
        Ok(result) => HttpResponse::Ok().json(ApiResponse::success(result)),
        Err(e) => error_response("Suspend domain", &e),
    }
}

/// Delete an available domain.
///
/// `DELETE /domains/{id}`
pub async fn delete_domain(
    req: HttpRequest,
    state: web::Data<Arc<AppState>>,
    path: web::Path<i64>,
) -> HttpResponse {
    let admin = match admin_id(&req) {
        Ok(id) => id,
        Err(resp) => return resp,
    };

    match state.domain_allocator.delete_domain(path.into_inner(), admin).await {
        Ok(result) => HttpResponse::Ok().json(ApiResponse::success(result)),
        Err(e) => error_response("Delete domain", &e),
    }
}

// ============================================
// AFFILIATES & WITHDRAWALS
// ============================================

/// Create an affiliate.
///
/// `POST /affiliates`
pub async fn create_affiliate(
    req: HttpRequest,
    state: web::Data<Arc<AppState>>,
    body: web::Json<CreateAffiliateRequest>,
) -> HttpResponse {
    let admin = match admin_id(&req) {
        Ok(id) => id,
        Err(resp) => return resp,
    };

    match state.affiliate_ledger.create_affiliate(body.into_inner(), admin).await {
        Ok(affiliate) => HttpResponse::Created().json(ApiResponse::success(affiliate)),
        Err(e) => error_response("Create affiliate", &e),
    }
}

/// Change an affiliate's status.
///
/// `POST /affiliates/{id}/status`
pub async fn set_affiliate_status(
    req: HttpRequest,
    state: web::Data<Arc<AppState>>,
    path: web::Path<i64>,
    body: web::Json<AffiliateStatusRequest>,
) -> HttpResponse {
    let admin = match admin_id(&req) {
        Ok(id) => id,
        Err(resp) => return resp,
    };

    match state.affiliate_ledger.set_affiliate_status(path.into_inner(), &body.status, admin).await {
        Ok(result) => HttpResponse::Ok().json(ApiResponse::success(result)),
        Err(e) => error_response("Set affiliate status", &e),
    }
}

/// Run the ledger audit now.
///
/// `GET /affiliates/ledger-audit`
pub async fn ledger_audit(state: web::Data<Arc<AppState>>) -> HttpResponse {
    match state.ledger_auditor.audit().await {
        Ok(report) => HttpResponse::Ok().json(ApiResponse::success(report)),
        Err(e) => error_response("Ledger audit", &e),
    }
}

/// Approve, pay or reject a withdrawal.
///
/// `POST /withdrawals/{id}/process`
///
/// ```bash
/// curl -X POST http://127.0.0.1:8080/withdrawals/3/process \
///   -H "Content-Type: application/json" -H "X-Admin-Id: 1" \
///   -d '{"status": "paid", "notes": "Sent via bank transfer"}'
/// ```
pub async fn process_withdrawal(
    req: HttpRequest,
    state: web::Data<Arc<AppState>>,
    path: web::Path<i64>,
    body: web::Json<ProcessWithdrawalRequest>,
) -> HttpResponse {
    let admin = match admin_id(&req) {
        Ok(id) => id,
        Err(resp) => return resp,
    };

    match state.affiliate_ledger
        .process_withdrawal(path.into_inner(), &body.status, body.notes.as_deref(), admin)
        .await
    {
        Ok(result) => HttpResponse::Ok().json(ApiResponse::success(result)),
        Err(e) => error_response("Process withdrawal", &e),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use actix_web::test::TestRequest;

    use crate::db::DatabaseError;

    #[test]
    fn test_admin_id_from_header() {
        let req = TestRequest::default()
            .insert_header((ADMIN_ID_HEADER, " 12 "))
            .to_http_request();
        assert_eq!(admin_id(&req).ok(), Some(12));
    }

    #[test]
    fn test_missing_or_bad_admin_id_is_unauthorized() {
        let req = TestRequest::default().to_http_request();
        let resp = admin_id(&req).unwrap_err();
        assert_eq!(resp.status(), StatusCode::UNAUTHORIZED);

        let req = TestRequest::default()
            .insert_header((ADMIN_ID_HEADER, "admin"))
            .to_http_request();
        assert!(admin_id(&req).is_err());

        let req = TestRequest::default()
            .insert_header((ADMIN_ID_HEADER, "0"))
            .to_http_request();
        assert!(admin_id(&req).is_err());
    }

    #[test]
    fn test_parse_finalize_body() {
        let empty = parse_finalize_body(b"").unwrap();
        assert!(empty.amount_paid.is_none());
        assert!(empty.domain_assignments.is_empty());

        let full = parse_finalize_body(
            br#"{"amountPaid":"23000","domainAssignments":[{"domainId":7,"orderItemId":91}]}"#,
        )
        .unwrap();
        assert_eq!(full.amount_paid, Some(rust_decimal::Decimal::from(23_000)));
        assert_eq!(full.domain_assignments[0].order_item_id, Some(91));

        for bad in [
            &br#"{"amountPaid":"23,000"}"#[..],
            br#"{"domainAssignments":[{"domainId":"seven"}]}"#,
            br#"{"amount_paid":"23000"}"#,
            b"not json",
        ] {
            assert!(matches!(parse_finalize_body(bad), Err(ServiceError::InvalidInput(_))));
        }
    }

    #[test]
    fn test_status_mapping() {
        assert_eq!(status_for(&ServiceError::NotFound("Order #1".into())), StatusCode::NOT_FOUND);
        assert_eq!(status_for(&ServiceError::InvalidInput("x".into())), StatusCode::BAD_REQUEST);
        assert_eq!(status_for(&ServiceError::InvalidState("x".into())), StatusCode::CONFLICT);
        assert_eq!(
            status_for(&ServiceError::ConflictingAssignment("x".into())),
            StatusCode::CONFLICT
        );
        assert_eq!(
            status_for(&ServiceError::Persistence(DatabaseError::ConnectionError("x".into()))),
            StatusCode::INTERNAL_SERVER_ERROR
        );
    }
}
