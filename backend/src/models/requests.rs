//! # API Request Models
//!
//! Structures for incoming API request bodies.
//! Each struct represents the expected JSON body for an endpoint.

use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

/// One domain to assign while finalizing an order.
///
/// Without `orderItemId` the domain goes to the order itself
/// (legacy single-item orders).
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", deny_unknown_fields)]
pub struct DomainAssignment {
    pub domain_id: i64,
    pub order_item_id: Option<i64>,
}

/// Request to finalize (mark paid) an order.
///
/// ## Example JSON
///
/// ```json
/// {
///     "amountPaid": "23000.00",
///     "notes": "Bank transfer ref 8812",
///     "domainAssignments": [{ "domainId": 7, "orderItemId": 91 }]
/// }
/// ```
///
/// When `amountPaid` is omitted the order's computed total is charged.
/// Unknown keys are rejected so a misspelled field never falls back to
/// the computed total.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", deny_unknown_fields)]
pub struct FinalizeOrderRequest {
    pub amount_paid: Option<Decimal>,

    pub notes: Option<String>,

    #[serde(default)]
    pub domain_assignments: Vec<DomainAssignment>,
}

/// Request to cancel an order.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CancelOrderRequest {
    /// Shown to the customer in the cancellation email.
    pub reason: String,
}

/// Bulk action over many orders.
///
/// ## Example JSON
///
/// ```json
/// { "ids": [41, 42, 43], "reason": "Duplicate checkout" }
/// ```
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct BulkOrdersRequest {
    #[serde(default)]
    pub ids: Vec<i64>,

    /// Only used by bulk cancel.
    pub reason: Option<String>,
}

/// Request to assign a domain to an order (or one of its items).
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AssignDomainRequest {
    pub order_id: i64,
    pub order_item_id: Option<i64>,
}

/// Query parameters for the available-domain picker.
///
/// ## Example URL
///
/// ```text
/// GET /domains/available?templateId=3&orderId=42
/// ```
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AvailableDomainsQuery {
    pub template_id: i64,

    /// Include the domains this order currently holds.
    pub order_id: Option<i64>,
}

/// Request to add one domain.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AddDomainRequest {
    pub template_id: i64,
    pub domain_name: String,
}

/// Request to add many domains at once.
///
/// `domains` is free text: one name per line, commas also separate.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct BulkAddDomainsRequest {
    pub template_id: i64,
    pub domains: String,
}

/// Suspend or reinstate an available domain.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SuspendDomainRequest {
    pub suspended: bool,
}

/// Request to create an affiliate and its user account.
///
/// ## Example JSON
///
/// ```json
/// { "name": "Jane Doe", "email": "jane@example.com", "code": "jane2024" }
/// ```
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CreateAffiliateRequest {
    pub name: String,
    pub email: String,
    pub code: String,
}

/// Request to change an affiliate's status.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AffiliateStatusRequest {
    /// `active`, `inactive` or `suspended`.
    pub status: String,
}

/// Request to process a withdrawal.
///
/// ## Example JSON
///
/// ```json
/// { "status": "paid", "notes": "Sent via bank transfer" }
/// ```
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ProcessWithdrawalRequest {
    /// `approved`, `paid` or `rejected`.
    pub status: String,
    pub notes: Option<String>,
}
