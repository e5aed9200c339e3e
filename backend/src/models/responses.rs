//! # API Response Models
//!
//! Structures for outgoing API response bodies.
//! All responses are wrapped in a standard format.

use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

use crate::db::{DomainRecord, OrderItemRecord, OrderRecord};

/// Standard API response wrapper.
///
/// All API responses follow this format:
///
/// ## Success Response
///
/// ```json
/// {
///     "success": true,
///     "data": { ... },
///     "error": null
/// }
/// ```
///
/// ## Error Response
///
/// ```json
/// {
///     "success": false,
///     "data": null,
///     "error": {
///         "code": "INVALID_STATE",
///         "message": "Order 42 is already paid"
///     }
/// }
/// ```
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ApiResponse<T> {
    /// Whether the request was successful.
    pub success: bool,

    /// Response data (null on error).
    pub data: Option<T>,

    /// Error information (null on success).
    pub error: Option<ApiError>,
}

impl<T> ApiResponse<T> {
    /// Create a successful response with data.
    pub fn success(data: T) -> Self {
        Self {
            success: true,
            data: Some(data),
            error: None,
        }
    }

    /// Create an error response.
    pub fn error(code: &str, message: &str) -> Self {
        Self {
            success: false,
            data: None,
            error: Some(ApiError {
                code: code.to_string(),
                message: message.to_string(),
            }),
        }
    }
}

/// API error information.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ApiError {
    /// Error code (e.g., "CONFLICTING_ASSIGNMENT").
    pub code: String,

    /// Human-readable error message.
    pub message: String,
}

/// Plain confirmation for actions with nothing else to report.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct MessageResponse {
    pub message: String,
}

impl MessageResponse {
    pub fn new(message: impl Into<String>) -> Self {
        Self { message: message.into() }
    }
}

/// Order with its items and the amount it would be charged.
///
/// Returned by `GET /orders/{id}`
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct OrderDetailResponse {
    pub order: OrderRecord,
    pub items: Vec<OrderItemRecord>,

    /// Canonical payable total; zero means it could not be resolved.
    pub computed_amount: Decimal,
    pub formatted_amount: String,

    /// Domains the order currently holds (items and legacy choice).
    pub assigned_domain_ids: Vec<i64>,
}

/// Result of finalizing an order.
///
/// ## Example Response
///
/// ```json
/// {
///     "success": true,
///     "data": {
///         "orderId": 42,
///         "amountCharged": "23000.00",
///         "formattedAmount": "₦23,000.00",
///         "commission": "0",
///         "domainsAssigned": 1,
///         "message": "Order #42 marked as paid: ₦23,000.00"
///     }
/// }
/// ```
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct FinalizeOrderResponse {
    pub order_id: i64,
    pub amount_charged: Decimal,
    pub formatted_amount: String,
    pub commission: Decimal,
    pub affiliate_id: Option<i64>,
    pub domains_assigned: usize,
    pub message: String,
}

/// Tally of a bulk action.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct BulkResultResponse {
    pub success_count: usize,
    pub fail_count: usize,
}

/// Available domains for the picker.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DomainListResponse {
    pub template_id: i64,
    pub domains: Vec<DomainRecord>,
}

/// Outcome of a bulk domain import.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct BulkAddDomainsResponse {
    pub added: usize,

    /// Duplicates and malformed names.
    pub skipped: usize,
}

/// One affiliate whose ledger does not balance.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct LedgerDiscrepancy {
    pub affiliate_id: i64,
    pub code: String,
    pub commission_earned: Decimal,
    pub commission_pending: Decimal,
    pub commission_paid: Decimal,

    /// `earned - (pending + paid)`.
    pub difference: Decimal,
}

/// Result of a ledger audit.
///
/// Returned by `GET /affiliates/ledger-audit`
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct LedgerAuditResponse {
    pub affiliates_checked: i64,
    pub discrepancies: Vec<LedgerDiscrepancy>,
    pub timestamp: DateTime<Utc>,
}

/// Health check response.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct HealthResponse {
    /// Service status: "healthy" or "unhealthy".
    pub status: String,

    /// Database connection status.
    pub database: bool,

    /// Service version.
    pub version: String,

    /// Current timestamp.
    pub timestamp: DateTime<Utc>,
}
