//! # Order Reconciliation Planner
//!
//! The pure half of the order reconciler: given an order's current items and
//! a requested final item set, compute the minimal set of updates, additions
//! and removals that converges storage to the request. The database layer
//! applies the plan inside one transaction and then recomputes the order
//! total.
//!
//! ## The Three-Way Partition
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │              Reconciling by product_id                                  │
//! │                                                                         │
//! │   Existing items            Requested items                            │
//! │   ┌──────────────┐          ┌──────────────┐                           │
//! │   │ A qty 2      │◄────────►│ A qty 5      │  MATCH   → update qty,    │
//! │   │              │          │              │            stamp updated_at│
//! │   │ B qty 1      │          │      -       │  ABSENT  → remove line    │
//! │   │              │          │              │                            │
//! │   │      -       │          │ C qty 3      │  NEW     → add line       │
//! │   └──────────────┘          └──────────────┘                           │
//! │                                                                         │
//! │   A matched line is stamped EVEN IF the quantity did not change:       │
//! │   touching a line in this pass always refreshes updated_at. That is    │
//! │   observable, tested behavior - do not optimize it away.               │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! ## Invariants
//! - Every requested quantity is validated **before** any partitioning, so a
//!   bad request plans zero mutations.
//! - Duplicate product ids within one request resolve last-wins (the chosen,
//!   consistent tie-break for what is really a caller error).
//! - An empty request plans the removal of every existing line.

use std::collections::HashMap;

use crate::error::ValidationError;
use crate::types::{ItemRequest, OrderItem};
use crate::validation::{validate_quantity, ValidationResult};

// =============================================================================
// Plan Types
// =============================================================================

/// A matched line: update its quantity and refresh `updated_at`.
///
/// Produced for every existing line whose product appears in the request,
/// including lines whose quantity is unchanged - the stamp is the point.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StampedUpdate {
    /// Id of the existing order item row.
    pub item_id: String,
    pub product_id: String,
    /// The requested (possibly identical) quantity.
    pub quantity: i64,
}

/// The computed convergence plan for one order's item collection.
///
/// Applying `updates`, `additions` and `removals` - in any order - to the
/// stored collection yields exactly the requested item set.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ReconcilePlan {
    /// Existing lines to update and stamp.
    pub updates: Vec<StampedUpdate>,
    /// Requested products with no existing line: create these.
    pub additions: Vec<ItemRequest>,
    /// Item ids of existing lines absent from the request: delete these.
    pub removals: Vec<String>,
}

impl ReconcilePlan {
    /// True when the plan mutates nothing (it still implies a total refresh).
    pub fn is_empty(&self) -> bool {
        self.updates.is_empty() && self.additions.is_empty() && self.removals.is_empty()
    }
}

// =============================================================================
// Planner
// =============================================================================

/// Computes the reconciliation plan for an order.
///
/// ## Arguments
/// * `existing` - the order's currently stored lines, loaded in full
/// * `requested` - the desired final item set (product_id, quantity pairs)
///
/// ## Errors
/// `ValidationError::MustBePositive` / `OutOfRange` if any requested
/// quantity is invalid. Validation runs over the whole request up front, so
/// an invalid entry anywhere rejects the request before a single mutation
/// is planned.
///
/// ## Example
/// ```rust
/// use mercado_core::reconcile::plan;
/// use mercado_core::types::ItemRequest;
///
/// // No existing items, one requested: plan is a single addition.
/// let plan = plan(&[], &[ItemRequest { product_id: "p1".into(), quantity: 2 }]).unwrap();
/// assert_eq!(plan.additions.len(), 1);
/// assert!(plan.updates.is_empty() && plan.removals.is_empty());
/// ```
pub fn plan(existing: &[OrderItem], requested: &[ItemRequest]) -> ValidationResult<ReconcilePlan> {
    for request in requested {
        validate_quantity(request.quantity)?;
    }

    // Collapse duplicate product ids last-wins while preserving the first
    // occurrence's position, so additions come out in request order.
    let mut order: Vec<&str> = Vec::with_capacity(requested.len());
    let mut desired: HashMap<&str, i64> = HashMap::with_capacity(requested.len());
    for request in requested {
        if desired.insert(&request.product_id, request.quantity).is_none() {
            order.push(&request.product_id);
        }
    }

    let mut plan = ReconcilePlan::default();

    // Matches and removals: walk the stored collection once.
    for item in existing {
        match desired.get(item.product_id.as_str()) {
            Some(&quantity) => plan.updates.push(StampedUpdate {
                item_id: item.id.clone(),
                product_id: item.product_id.clone(),
                quantity,
            }),
            None => plan.removals.push(item.id.clone()),
        }
    }

    // Additions: requested products with no stored line.
    let existing_products: HashMap<&str, ()> = existing
        .iter()
        .map(|item| (item.product_id.as_str(), ()))
        .collect();
    for product_id in order {
        if !existing_products.contains_key(product_id) {
            plan.additions.push(ItemRequest {
                product_id: product_id.to_string(),
                quantity: desired[product_id],
            });
        }
    }

    Ok(plan)
}

// =============================================================================
// Unit Tests
// =============================================================================
