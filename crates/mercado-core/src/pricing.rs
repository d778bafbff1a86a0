//! # Pricing Calculator
//!
//! Pure line-total and order-total math.
//!
//! ## Where Pricing Happens
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                      Pricing Data Flow                                  │
//! │                                                                         │
//! │  order_items.quantity ──┐                                              │
//! │                         ├──► line_total ──► order_total                │
//! │  products.sale_value ───┘         │              │                      │
//! │     (CURRENT price,               │              ▼                      │
//! │      not price-at-sale)           │    orders.total_price_cents        │
//! │                                   │    (persisted by the repository    │
//! │                                   ▼     on every item write)           │
//! │                         OrderItemView.total_price_cents                │
//! │                         (computed fresh on every read)                 │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! Line totals always use the product's *current* price. An order priced
//! last month changes value if the product price changes today. That drift
//! is a deliberate property of the system, not a bug.
//!
//! Resolving a line's product is the caller's job; a line whose product is
//! gone surfaces as a not-found error in the persistence layer before these
//! functions ever run.

use crate::money::Money;

/// A priced order line: quantity paired with the unit price in effect.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PricedLine {
    pub quantity: i64,
    pub unit_price: Money,
}

impl PricedLine {
    /// Creates a priced line.
    #[inline]
    pub const fn new(quantity: i64, unit_price: Money) -> Self {
        PricedLine {
            quantity,
            unit_price,
        }
    }
}

/// Computes one line's total: `quantity × unit_price`.
///
/// ## Example
/// ```rust
/// use mercado_core::money::Money;
/// use mercado_core::pricing::line_total;
///
/// let total = line_total(3, Money::from_cents(499));
/// assert_eq!(total.cents(), 1497);
/// ```
#[inline]
pub fn line_total(quantity: i64, unit_price: Money) -> Money {
    unit_price.multiply_quantity(quantity)
}

/// Computes an order's total: the sum of its line totals.
///
/// Pure, no side effects. The empty item set sums to `R$ 0.00`; callers are
/// responsible for persisting the result into the order's stored total.
///
/// ## Example
/// ```rust
/// use mercado_core::money::Money;
/// use mercado_core::pricing::{order_total, PricedLine};
///
/// let lines = [
///     PricedLine::new(2, Money::from_cents(500)),
///     PricedLine::new(1, Money::from_cents(199)),
/// ];
/// assert_eq!(order_total(lines).cents(), 1199);
/// ```
pub fn order_total<I>(lines: I) -> Money
where
    I: IntoIterator<Item = PricedLine>,
{
    lines
        .into_iter()
        .map(|line| line_total(line.quantity, line.unit_price))
        .sum()
}

// =============================================================================
// Unit Tests
// =============================================================================
