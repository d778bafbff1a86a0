//! # mercado-core: Pure Business Logic for Mercado
//!
//! This crate is the **heart** of the Mercado back office. It contains all
//! business logic as pure functions with zero I/O dependencies.
//!
//! ## Architecture Position
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                        Mercado Architecture                             │
//! │                                                                         │
//! │  ┌─────────────────────────────────────────────────────────────────┐   │
//! │  │              Request Layer (external collaborator)              │   │
//! │  │     validated input in ──► domain object / typed error out     │   │
//! │  └─────────────────────────────┬───────────────────────────────────┘   │
//! │                                │                                        │
//! │  ┌─────────────────────────────▼───────────────────────────────────┐   │
//! │  │               ★ mercado-core (THIS CRATE) ★                     │   │
//! │  │                                                                 │   │
//! │  │   ┌───────────┐  ┌───────────┐  ┌───────────┐  ┌───────────┐  │   │
//! │  │   │   types   │  │   money   │  │  pricing  │  │ reconcile │  │   │
//! │  │   │  Client   │  │   Money   │  │ line/order│  │   plan    │  │   │
//! │  │   │   Order   │  │   cents   │  │   totals  │  │   diff    │  │   │
//! │  │   └───────────┘  └───────────┘  └───────────┘  └───────────┘  │   │
//! │  │                                                                 │   │
//! │  │   NO I/O • NO DATABASE • NO NETWORK • PURE FUNCTIONS           │   │
//! │  └─────────────────────────────────────────────────────────────────┘   │
//! │                                │                                        │
//! │  ┌─────────────────────────────▼───────────────────────────────────┐   │
//! │  │                    mercado-db (Database Layer)                  │   │
//! │  │              SQLite queries, migrations, repositories           │   │
//! │  └─────────────────────────────────────────────────────────────────┘   │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! ## Modules
//!
//! - [`types`] - Domain types (Client, Product, Order, OrderItem)
//! - [`money`] - Money type with integer arithmetic (no floating point!)
//! - [`pricing`] - Line and order total calculation
//! - [`reconcile`] - The order reconciliation planner
//! - [`error`] - Domain error types
//! - [`validation`] - Business rule validation
//!
//! ## Design Principles
//!
//! 1. **Pure Functions**: Every function is deterministic - same input = same output
//! 2. **No I/O**: Database, network, file system access is FORBIDDEN here
//! 3. **Integer Money**: All monetary values are in cents (i64) to avoid float errors
//! 4. **Explicit Errors**: All errors are typed, never strings or panics
//!
//! ## Example Usage
//!
//! ```rust
//! use mercado_core::money::Money;
//! use mercado_core::pricing;
//!
//! // Create money from cents (never from floats!)
//! let unit_price = Money::from_cents(499); // R$ 4.99
//!
//! // Line total: 3 units at R$ 4.99
//! let line = pricing::line_total(3, unit_price);
//! assert_eq!(line.cents(), 1497);
//! ```

// =============================================================================
// Module Declarations
// =============================================================================

pub mod error;
pub mod money;
pub mod pricing;
pub mod reconcile;
pub mod types;
pub mod validation;

// =============================================================================
// Re-exports for Convenience
// =============================================================================
// These allow users to do `use mercado_core::Money` instead of
// `use mercado_core::money::Money`

pub use error::{CoreError, ValidationError};
pub use money::Money;
pub use reconcile::{ReconcilePlan, StampedUpdate};
pub use types::*;

// =============================================================================
// Crate-Level Constants
// =============================================================================

/// Maximum quantity of a single product on one order line
///
/// ## Business Reason
/// Prevents accidental over-ordering (e.g., typing 1000 instead of 10)
pub const MAX_ITEM_QUANTITY: i64 = 999;

/// Default page size for list operations
pub const DEFAULT_PAGE_SIZE: i64 = 10;

/// Maximum page size a caller may request in one list operation
pub const MAX_PAGE_SIZE: i64 = 100;
