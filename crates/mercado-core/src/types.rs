//! # Domain Types
//!
//! Core domain types used throughout Mercado.
//!
//! ## Type Hierarchy
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                         Domain Types                                    │
//! │                                                                         │
//! │  ┌─────────────────┐   ┌─────────────────┐   ┌─────────────────┐       │
//! │  │     Client      │   │     Product     │   │      Order      │       │
//! │  │  ─────────────  │   │  ─────────────  │   │  ─────────────  │       │
//! │  │  id (UUID)      │   │  id (UUID)      │   │  id (UUID)      │       │
//! │  │  name           │   │  description    │   │  client_id (FK) │       │
//! │  │  email (UNIQUE) │   │  sale_value     │   │  status         │       │
//! │  │  cpf (UNIQUE)   │   │  available      │   │  total (cached) │       │
//! │  └─────────────────┘   └─────────────────┘   └────────┬────────┘       │
//! │                                                       │                 │
//! │                                              ┌────────▼────────┐       │
//! │                                              │    OrderItem    │       │
//! │                                              │  ─────────────  │       │
//! │                                              │  order_id (FK)  │       │
//! │                                              │  product_id(FK) │       │
//! │                                              │  quantity       │       │
//! │                                              └─────────────────┘       │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! ## Record vs Request vs View
//! - Record types (`Client`, `Product`, `Order`, `OrderItem`) mirror stored
//!   rows one-to-one.
//! - Request types (`NewClient`, `OrderPatch`, ...) carry caller intent;
//!   patch types use `Option` fields for partial-update semantics.
//! - View types (`OrderView`, `OrderItemView`) are the read model: an order
//!   with its items, line totals computed from the *current* product price.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::money::Money;

// =============================================================================
// Client
// =============================================================================

/// A registered client.
///
/// `email` and `cpf` are unique across all clients; the registrar surfaces
/// storage-level collisions as a domain "already registered" error.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[cfg_attr(feature = "sqlx", derive(sqlx::FromRow))]
pub struct Client {
    /// Unique identifier (UUID v4).
    pub id: String,
    pub name: String,
    pub email: String,
    /// Brazilian taxpayer registry number.
    pub cpf: String,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

/// Input for registering a new client.
///
/// Field *format* validation (email shape, string lengths) is the request
/// layer's responsibility; this core only enforces uniqueness via storage.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct NewClient {
    pub name: String,
    pub email: String,
    pub cpf: String,
}

/// Partial update for a client. Absent fields leave the stored value untouched.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ClientPatch {
    pub name: Option<String>,
    pub email: Option<String>,
    pub cpf: Option<String>,
}

// =============================================================================
// Product
// =============================================================================

/// A product available for sale.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[cfg_attr(feature = "sqlx", derive(sqlx::FromRow))]
pub struct Product {
    /// Unique identifier (UUID v4).
    pub id: String,

    /// Display description shown in listings.
    pub description: String,

    /// Unit sale price in cents (smallest currency unit).
    pub sale_value_cents: i64,

    /// Barcode (EAN-13, UPC-A, etc.).
    pub barcode: String,

    /// Section/category the product is shelved under.
    pub section: String,

    /// Stock level recorded at creation time.
    pub initial_stock: i64,

    /// Optional expiry date for perishables.
    pub expiry_date: Option<DateTime<Utc>>,

    /// Snapshot of `initial_stock > 0` taken at creation.
    /// Never recomputed afterwards - a static flag, not a live invariant.
    pub available: bool,

    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl Product {
    /// Returns the unit sale price as a Money type.
    #[inline]
    pub fn sale_value(&self) -> Money {
        Money::from_cents(self.sale_value_cents)
    }
}

/// Input for creating a product.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct NewProduct {
    pub description: String,
    pub sale_value_cents: i64,
    pub barcode: String,
    pub section: String,
    pub initial_stock: i64,
    pub expiry_date: Option<DateTime<Utc>>,
}

/// Partial update for a product. Absent fields leave the stored value
/// untouched; `available` is deliberately not patchable and is never
/// recomputed from stock changes.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ProductPatch {
    pub description: Option<String>,
    pub sale_value_cents: Option<i64>,
    pub barcode: Option<String>,
    pub section: Option<String>,
    pub initial_stock: Option<i64>,
    pub expiry_date: Option<DateTime<Utc>>,
}

// =============================================================================
// Order
// =============================================================================

/// An order row as stored.
///
/// `total_price_cents` is a **derived** aggregate: it is kept equal to the
/// sum of the order's line totals at the moment of the last item write.
/// Only the repositories' recompute-and-persist path may write it.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[cfg_attr(feature = "sqlx", derive(sqlx::FromRow))]
pub struct Order {
    pub id: String,
    pub client_id: String,
    /// Free-form status string; no state machine is enforced.
    pub status: String,
    /// Cached order total in cents (see invariant above).
    pub total_price_cents: i64,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl Order {
    /// Returns the cached order total as Money.
    #[inline]
    pub fn total_price(&self) -> Money {
        Money::from_cents(self.total_price_cents)
    }
}

/// An order line item as stored.
///
/// The line total is **not** stored: it is computed on read as
/// `quantity × product.sale_value`, using the product's *current* price.
/// Historical order totals therefore drift when a price changes later;
/// this is a deliberate property of the system.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[cfg_attr(feature = "sqlx", derive(sqlx::FromRow))]
pub struct OrderItem {
    pub id: String,
    pub order_id: String,
    pub product_id: String,
    /// Positive unit count; validated before any write.
    pub quantity: i64,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

// =============================================================================
// Requests
// =============================================================================

/// One requested order line: the desired quantity for a product.
///
/// The pair `(order_id, product_id)` identifies a line; an order never holds
/// two lines for the same product.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ItemRequest {
    pub product_id: String,
    pub quantity: i64,
}

/// Input for creating an order with its initial item list.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct NewOrder {
    pub client_id: String,
    pub status: String,
    pub items: Vec<ItemRequest>,
}

/// Partial update for an order (PATCH, not PUT).
///
/// - `client_id` / `status`: absent fields leave the current value untouched.
/// - `items`: when present, the **desired final item set** for the order;
///   the reconciler converges stored lines to it (an empty list removes
///   every line). When absent, the item set is left alone but the cached
///   total is still refreshed.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct OrderPatch {
    pub client_id: Option<String>,
    pub status: Option<String>,
    pub items: Option<Vec<ItemRequest>>,
}

// =============================================================================
// Read Model
// =============================================================================

/// A line item enriched with its read-time total.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct OrderItemView {
    pub id: String,
    pub order_id: String,
    pub product_id: String,
    pub quantity: i64,
    /// `quantity × product.sale_value` at read time (current price).
    pub total_price_cents: i64,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl OrderItemView {
    /// Returns the read-time line total as Money.
    #[inline]
    pub fn total_price(&self) -> Money {
        Money::from_cents(self.total_price_cents)
    }
}

/// An order together with its item collection.
///
/// `total_price_cents` is the cached aggregate as stored - the fast read the
/// cache exists for. Line totals on the items are priced live.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct OrderView {
    pub id: String,
    pub client_id: String,
    pub status: String,
    pub total_price_cents: i64,
    pub items: Vec<OrderItemView>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl OrderView {
    /// Returns the cached order total as Money.
    #[inline]
    pub fn total_price(&self) -> Money {
        Money::from_cents(self.total_price_cents)
    }
}

// =============================================================================
// Unit Tests
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_product_sale_value_as_money() {
        let product = Product {
            id: "p1".to_string(),
            description: "Café 500g".to_string(),
            sale_value_cents: 1850,
            barcode: "7891234567890".to_string(),
            section: "Mercearia".to_string(),
            initial_stock: 12,
            expiry_date: None,
            available: true,
            created_at: Utc::now(),
            updated_at: Utc::now(),
        };
        assert_eq!(product.sale_value(), Money::from_cents(1850));
    }

    #[test]
    fn test_order_patch_default_is_empty() {
        let patch = OrderPatch::default();
        assert!(patch.client_id.is_none());
        assert!(patch.status.is_none());
        assert!(patch.items.is_none());
    }

    #[test]
    fn test_item_request_json_round_trip() {
        let req = ItemRequest {
            product_id: "p1".to_string(),
            quantity: 3,
        };
        let json = serde_json::to_string(&req).unwrap();
        let back: ItemRequest = serde_json::from_str(&json).unwrap();
        assert_eq!(back, req);
    }

    #[test]
    fn test_order_patch_items_absent_vs_empty() {
        // Absent items: leave the item set alone.
        let patch: OrderPatch = serde_json::from_str(r#"{"status":"shipped"}"#).unwrap();
        assert!(patch.items.is_none());

        // Empty items: converge to the empty set (remove everything).
        let patch: OrderPatch = serde_json::from_str(r#"{"items":[]}"#).unwrap();
        assert_eq!(patch.items, Some(vec![]));
    }
}
