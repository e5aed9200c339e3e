//! # Pricing Engine
//!
//! Pure decimal arithmetic for order totals and commissions. No I/O:
//! anything that needs the catalog is resolved by the caller and passed in.
//!
//! ## Final amount resolution
//!
//! ```text
//! (a) order.final_amount              if set and > 0
//! (b) order.original_price - discount if original_price set and > 0
//! (c) Σ item totals                   if items exist and the sum is > 0
//! (d) legacy catalog price            discounted when an affiliate code is set
//!     otherwise 0  (callers treat 0 as "unresolvable", never as free)
//! ```

use rust_decimal::Decimal;

use crate::config::PricingConfig;
use crate::db::{OrderItemRecord, OrderRecord};
use crate::utils::round_money;

/// Computes payable totals and commissions for one request's rates.
#[derive(Debug, Clone, Copy)]
pub struct PricingEngine {
    config: PricingConfig,
}

impl PricingEngine {
    pub fn new(config: PricingConfig) -> Self {
        Self { config }
    }

    /// `unit_price * quantity - discount`, never below zero.
    pub fn line_total(unit_price: Decimal, quantity: i32, discount: Decimal) -> Decimal {
        let gross = unit_price * Decimal::from(quantity.max(1));
        (gross - discount).max(Decimal::ZERO)
    }

    /// What one item contributes: its stored final amount, or the line
    /// total when older checkouts left that column at zero.
    pub fn item_total(item: &OrderItemRecord) -> Decimal {
        if item.final_amount > Decimal::ZERO {
            item.final_amount
        } else {
            Self::line_total(item.unit_price, item.quantity, item.discount_amount)
        }
    }

    /// Steps (a) to (c): the amount derivable from the order and its items.
    ///
    /// `None` means only the catalog can tell (step d).
    pub fn amount_from_order(
        &self,
        order: &OrderRecord,
        items: &[OrderItemRecord],
    ) -> Option<Decimal> {
        if let Some(final_amount) = order.final_amount.filter(|a| *a > Decimal::ZERO) {
            return Some(round_money(final_amount));
        }

        if let Some(original) = order.original_price.filter(|p| *p > Decimal::ZERO) {
            let discount = order.discount_amount.unwrap_or(Decimal::ZERO).max(Decimal::ZERO);
            return Some(round_money((original - discount).max(Decimal::ZERO)));
        }

        if !items.is_empty() {
            let sum: Decimal = items.iter().map(Self::item_total).sum();
            if sum > Decimal::ZERO {
                return Some(round_money(sum));
            }
        }

        None
    }

    /// Step (d): a legacy order priced from the catalog.
    pub fn legacy_amount(&self, base_price: Decimal, has_affiliate_code: bool) -> Decimal {
        let base = base_price.max(Decimal::ZERO);
        let amount = if has_affiliate_code {
            self.discounted_price(base)
        } else {
            base
        };
        round_money(amount)
    }

    /// The full fallback chain. `legacy_base_price` is only consulted when
    /// the order and its items carry no usable amount.
    pub fn compute_final_amount(
        &self,
        order: &OrderRecord,
        items: &[OrderItemRecord],
        legacy_base_price: Option<Decimal>,
    ) -> Decimal {
        self.amount_from_order(order, items)
            .or_else(|| {
                legacy_base_price
                    .map(|base| self.legacy_amount(base, order.affiliate_code().is_some()))
            })
            .unwrap_or(Decimal::ZERO)
    }

    /// Price after the referred-customer discount.
    pub fn discounted_price(&self, base_price: Decimal) -> Decimal {
        base_price * (Decimal::ONE - self.config.customer_discount_rate)
    }

    /// Commission owed on an amount paid, rounded to cents.
    pub fn commission_for(&self, amount_paid: Decimal) -> Decimal {
        round_money(amount_paid.max(Decimal::ZERO) * self.config.affiliate_commission_rate)
    }
}
