//! Order totals and the pricing policy applied at checkout.
//!
//! All amounts are in the store currency's standard unit (dollars, not cents)
//! and are rounded to cents half away from zero.

use rust_decimal::{Decimal, RoundingStrategy};
use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Largest amount a money column (`NUMERIC(12,2)`) can hold.
pub const MAX_AMOUNT: Decimal = Decimal::from_parts(3_567_587_327, 232, 0, false, 2);

/// Error returned when an amount leaves the storable range.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Error)]
#[error("{field} exceeds the maximum of {max}", max = MAX_AMOUNT)]
pub struct AmountError {
    /// Which amount overflowed (e.g. "subtotal").
    pub field: &'static str,
}

/// `a + b`, or an [`AmountError`] if the sum overflows or exceeds [`MAX_AMOUNT`].
///
/// # Errors
///
/// Returns [`AmountError`] naming `field` when the result is out of range.
pub fn checked_amount_add(a: Decimal, b: Decimal, field: &'static str) -> Result<Decimal, AmountError> {
    a.checked_add(b)
        .filter(|sum| *sum <= MAX_AMOUNT)
        .ok_or(AmountError { field })
}

/// `a * b` rounded to cents, or an [`AmountError`] if it overflows or exceeds [`MAX_AMOUNT`].
///
/// # Errors
///
/// Returns [`AmountError`] naming `field` when the result is out of range.
pub fn checked_amount_mul(a: Decimal, b: Decimal, field: &'static str) -> Result<Decimal, AmountError> {
    a.checked_mul(b)
        .map(round_cents)
        .filter(|product| *product <= MAX_AMOUNT)
        .ok_or(AmountError { field })
}

/// Money breakdown of an order.
///
/// Invariant: `total = subtotal + shipping + tax - discount`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
pub struct OrderTotals {
    pub subtotal: Decimal,
    pub shipping: Decimal,
    pub tax: Decimal,
    pub discount: Decimal,
    pub total: Decimal,
}

impl OrderTotals {
    /// Whether `total` matches its components.
    #[must_use]
    pub fn is_consistent(&self) -> bool {
        self.total == self.subtotal + self.shipping + self.tax - self.discount
    }
}

/// Shipping and tax rules applied when an order is created.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PricingPolicy {
    /// Shipping charged below the free-shipping threshold.
    pub flat_shipping: Decimal,
    /// Subtotal at or above which shipping is free.
    pub free_shipping_threshold: Decimal,
    /// Tax rate applied to the subtotal (0.08 = 8%).
    pub tax_rate: Decimal,
}

impl Default for PricingPolicy {
    fn default() -> Self {
        Self {
            flat_shipping: Decimal::new(599, 2),
            free_shipping_threshold: Decimal::new(5000, 2),
            tax_rate: Decimal::new(8, 2),
        }
    }
}

impl PricingPolicy {
    /// Compute totals for a subtotal and a requested discount.
    ///
    /// The discount is clamped to `[0, subtotal]` so the total never goes negative.
    ///
    /// # Errors
    ///
    /// Returns [`AmountError`] if the subtotal, tax, or total exceeds [`MAX_AMOUNT`].
    pub fn quote(&self, subtotal: Decimal, discount: Decimal) -> Result<OrderTotals, AmountError> {
        let subtotal = round_cents(subtotal);
        if subtotal > MAX_AMOUNT {
            return Err(AmountError { field: "subtotal" });
        }
        let shipping = if subtotal >= self.free_shipping_threshold || subtotal.is_zero() {
            Decimal::ZERO
        } else {
            round_cents(self.flat_shipping)
        };
        let tax = checked_amount_mul(subtotal, self.tax_rate, "tax")?;
        let discount = round_cents(discount.max(Decimal::ZERO).min(subtotal));

        let gross = checked_amount_add(subtotal, shipping, "total")?;
        let gross = checked_amount_add(gross, tax, "total")?;

        Ok(OrderTotals {
            subtotal,
            shipping,
            tax,
            discount,
            total: gross - discount,
        })
    }
}

/// Round an amount to cents, half away from zero.
#[must_use]
pub fn round_cents(amount: Decimal) -> Decimal {
    amount.round_dp_with_strategy(2, RoundingStrategy::MidpointAwayFromZero)
}
