//! # Database Models
//!
//! This module defines the data structures that map to database tables.
//! Each struct represents a row in a table.
//!
//! ## Table Overview
//!
//! | Table | Description |
//! |-------|-------------|
//! | `pending_orders` | Customer orders, pending until an admin finalizes them |
//! | `order_items` | Line items of an order (templates and tools) |
//! | `domains` | Hosting domains, each serving one template family |
//! | `affiliates` | Referral partners and their commission ledger |
//! | `sales` | One row per paid order, with the commission it produced |
//! | `withdrawal_requests` | Affiliate cash-out requests |
//! | `templates`, `tools` | Read-only catalog used for legacy pricing |
//!
//! ## Relationship Diagram
//!
//! ```text
//! ┌────────────────┐       ┌──────────────┐        ┌────────────┐
//! │ pending_orders │──────<│ order_items  │ ─ ─ ─ >│  domains   │
//! │                │       │ metadata.    │        │ assigned_  │
//! │ affiliate_code │       │   domain_id  │        │  order_id  │
//! └────────────────┘       └──────────────┘        └────────────┘
//!        │ 1:1
//!        ▼
//! ┌────────────────┐       ┌──────────────┐        ┌─────────────────────┐
//! │     sales      │>──────│  affiliates  │──────< │ withdrawal_requests │
//! └────────────────┘       └──────────────┘        └─────────────────────┘
//! ```
//!
//! Money is `NUMERIC(12,2)` in PostgreSQL and [`Decimal`] here.

use std::fmt;
use std::str::FromStr;

use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Deserializer, Serialize};
use uuid::Uuid;

/// Declares a status-like enum stored as lowercase text.
macro_rules! text_enum {
    ($(#[$meta:meta])* $name:ident { $($variant:ident => $text:literal),+ $(,)? }) => {
        $(#[$meta])*
        #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
        #[serde(rename_all = "snake_case")]
        pub enum $name {
            $($variant),+
        }

        impl $name {
            /// The text stored in the database.
            pub fn as_str(&self) -> &'static str {
                match self {
                    $($name::$variant => $text),+
                }
            }
        }

        impl fmt::Display for $name {
            fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                f.write_str(self.as_str())
            }
        }

        impl FromStr for $name {
            type Err = String;

            fn from_str(s: &str) -> Result<Self, Self::Err> {
                match s.trim().to_ascii_lowercase().as_str() {
                    $($text => Ok($name::$variant),)+
                    other => Err(format!("unknown {} '{}'", stringify!($name), other)),
                }
            }
        }
    };
}

text_enum!(
    /// Order lifecycle. `Paid` and `Cancelled` are terminal.
    OrderStatus {
        Pending => "pending",
        Paid => "paid",
        Cancelled => "cancelled",
    }
);

impl OrderStatus {
    /// Whether no further transition is allowed.
    pub fn is_terminal(&self) -> bool {
        !matches!(self, OrderStatus::Pending)
    }
}

text_enum!(
    /// What an order contains.
    OrderType {
        Template => "template",
        Tool => "tool",
        Mixed => "mixed",
    }
);

text_enum!(
    /// Kind of product on an order line.
    ProductType {
        Template => "template",
        Tool => "tool",
    }
);

text_enum!(
    /// Domain availability.
    DomainStatus {
        Available => "available",
        InUse => "in_use",
        Suspended => "suspended",
    }
);

text_enum!(
    /// Affiliate account state.
    AffiliateStatus {
        Active => "active",
        Inactive => "inactive",
        Suspended => "suspended",
    }
);

text_enum!(
    /// Withdrawal request state. Only `Pending` may transition.
    WithdrawalStatus {
        Pending => "pending",
        Approved => "approved",
        Paid => "paid",
        Rejected => "rejected",
    }
);

/// A customer order (`pending_orders` row).
///
/// Legacy orders predate `order_items` and reference a single product
/// through `template_id` / `tool_id`, with an optional `chosen_domain_id`.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct OrderRecord {
    pub id: i64,
    pub customer_name: String,
    pub customer_email: String,
    pub customer_phone: Option<String>,
    pub status: OrderStatus,
    pub order_type: OrderType,
    pub template_id: Option<i64>,
    pub tool_id: Option<i64>,
    pub original_price: Option<Decimal>,
    pub discount_amount: Option<Decimal>,
    pub final_amount: Option<Decimal>,
    pub affiliate_code: Option<String>,
    pub chosen_domain_id: Option<i64>,
    pub payment_notes: Option<String>,
    pub cancellation_reason: Option<String>,
    pub paid_at: Option<DateTime<Utc>>,
    pub cancelled_at: Option<DateTime<Utc>>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl OrderRecord {
    /// The referral code, if one is actually present.
    ///
    /// Checkout stored empty strings for "no code" on older rows.
    pub fn affiliate_code(&self) -> Option<&str> {
        self.affiliate_code
            .as_deref()
            .map(str::trim)
            .filter(|code| !code.is_empty())
    }
}

/// Typed view of the `order_items.metadata` JSON bag.
///
/// Only `domain_id` drives behaviour; every other key is kept verbatim
/// in `extra` so writing the struct back never loses data.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ItemMetadata {
    #[serde(
        default,
        deserialize_with = "lenient_id",
        skip_serializing_if = "Option::is_none"
    )]
    pub domain_id: Option<i64>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub category: Option<String>,

    #[serde(flatten)]
    pub extra: serde_json::Map<String, serde_json::Value>,
}

impl ItemMetadata {
    /// Decode the stored JSON, treating anything malformed as empty.
    pub fn from_json(value: serde_json::Value) -> Self {
        match value {
            serde_json::Value::Object(_) => serde_json::from_value(value).unwrap_or_default(),
            _ => Self::default(),
        }
    }
}

/// Accepts `12`, `"12"`, `null` or `""` for an id field.
fn lenient_id<'de, D>(deserializer: D) -> Result<Option<i64>, D::Error>
where
    D: Deserializer<'de>,
{
    let value = Option::<serde_json::Value>::deserialize(deserializer)?;
    Ok(match value {
        Some(serde_json::Value::Number(n)) => n.as_i64().filter(|id| *id > 0),
        Some(serde_json::Value::String(s)) => s.trim().parse::<i64>().ok().filter(|id| *id > 0),
        _ => None,
    })
}

/// One line of an order.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct OrderItemRecord {
    pub id: i64,
    pub order_id: i64,
    pub product_type: ProductType,
    pub product_id: i64,
    pub quantity: i32,
    pub unit_price: Decimal,
    pub discount_amount: Decimal,
    pub final_amount: Decimal,
    pub metadata: ItemMetadata,
    pub created_at: DateTime<Utc>,
}

/// A hosting domain bound to one template family.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DomainRecord {
    pub id: i64,
    pub template_id: i64,
    pub domain_name: String,
    pub status: DomainStatus,
    pub assigned_order_id: Option<i64>,
    pub assigned_at: Option<DateTime<Utc>>,
    pub created_at: DateTime<Utc>,
}

/// A referral partner and its commission ledger.
///
/// `commission_earned == commission_pending + commission_paid` always holds;
/// the database enforces it with a CHECK constraint.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AffiliateRecord {
    pub id: i64,
    pub user_id: i64,
    pub code: String,
    pub status: AffiliateStatus,
    pub commission_earned: Decimal,
    pub commission_pending: Decimal,
    pub commission_paid: Decimal,
    pub total_clicks: i64,
    pub total_sales: i64,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl AffiliateRecord {
    /// `earned - (pending + paid)`; zero for a balanced ledger.
    pub fn ledger_gap(&self) -> Decimal {
        self.commission_earned - (self.commission_pending + self.commission_paid)
    }
}

/// Where an affiliate wants a withdrawal sent.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct BankDetails {
    #[serde(default, alias = "bank_name")]
    pub bank_name: Option<String>,

    #[serde(default, alias = "account_name")]
    pub account_name: Option<String>,

    #[serde(default, alias = "account_number")]
    pub account_number: Option<String>,
}

/// An affiliate's request to cash out pending commission.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct WithdrawalRecord {
    pub id: i64,
    pub affiliate_id: i64,
    pub amount: Decimal,
    pub status: WithdrawalStatus,
    pub bank_details: BankDetails,
    pub admin_notes: Option<String>,
    pub requested_at: DateTime<Utc>,
    pub processed_at: Option<DateTime<Utc>>,
    pub processed_by: Option<i64>,
}

/// Sale row written when an order is marked paid.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct NewSale {
    pub reference: Uuid,
    pub order_id: i64,
    pub affiliate_id: Option<i64>,
    pub customer_name: String,
    pub customer_email: String,
    pub amount_paid: Decimal,
    pub commission_amount: Decimal,
    pub payment_confirmed_by: i64,
    pub payment_notes: Option<String>,
}

/// Catalog entry used for the legacy price fallback.
///
/// Deactivated products still price the orders placed while they were sold.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CatalogEntry {
    pub id: i64,
    pub name: String,
    pub price: Decimal,
}
