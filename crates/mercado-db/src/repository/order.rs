//! # Order Repository
//!
//! Database operations for orders and order items: the transactional order
//! creator, the reconciler, and standalone item operations.
//!
//! ## Reconciliation Lifecycle
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                  reconcile(order_id, patch)                             │
//! │                                                                         │
//! │  BEGIN TRANSACTION                                                     │
//! │   │                                                                     │
//! │   ├── load order ──────────────── missing? → NotFound("Order")         │
//! │   │                                                                     │
//! │   ├── PATCH client_id / status (non-empty fields only)                 │
//! │   │                                                                     │
//! │   ├── items present in patch?                                          │
//! │   │    ├── mercado_core::reconcile::plan(existing, requested)          │
//! │   │    │     (validates quantities BEFORE any write)                   │
//! │   │    ├── apply updates  (UPDATE quantity, stamp updated_at)          │
//! │   │    ├── apply removals (DELETE line)                                │
//! │   │    └── apply additions (INSERT line)                               │
//! │   │                                                                     │
//! │   ├── refresh total ← ALWAYS, even when nothing changed                │
//! │   │    (reprice every line from current product data and persist       │
//! │   │     the sum into orders.total_price_cents)                         │
//! │   │                                                                     │
//! │  COMMIT - any failure above rolls the whole unit back                  │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! ## Who Writes the Cached Total
//! Every mutating path in this repository - create, reconcile, add_item,
//! update_item_quantity, remove_item - recomputes and persists
//! `orders.total_price_cents` inside its own transaction. Nothing else may
//! write that column.
//!
//! ## Concurrency
//! There is no version column: two concurrent reconciliations of the same
//! order race read-modify-write and the last writer wins. The whole write
//! path lives behind this repository, so an optimistic token can be added
//! here without touching the pure planner.

use chrono::{DateTime, Utc};
use sqlx::{SqliteConnection, SqlitePool};
use tracing::debug;
use uuid::Uuid;

use crate::error::{DbError, DbResult};
use mercado_core::pricing::{self, PricedLine};
use mercado_core::validation::{normalize_pagination, validate_quantity};
use mercado_core::{
    reconcile, ItemRequest, Money, NewOrder, Order, OrderItem, OrderItemView, OrderPatch,
    OrderView,
};

/// Repository for order and order-item database operations.
#[derive(Debug, Clone)]
pub struct OrderRepository {
    pool: SqlitePool,
}

impl OrderRepository {
    /// Creates a new OrderRepository.
    pub fn new(pool: SqlitePool) -> Self {
        OrderRepository { pool }
    }

    // =========================================================================
    // Order Operations
    // =========================================================================

    /// Creates an order with its initial item list. All-or-nothing: if any
    /// item insert or pricing lookup fails, no order remains.
    ///
    /// ## Errors
    /// * `DbError::Validation` - a requested quantity is not positive
    /// * `DbError::NotFound("Client")` - unknown client id
    /// * `DbError::NotFound("Product")` - an item references an unknown product
    pub async fn create(&self, new: NewOrder) -> DbResult<OrderView> {
        // Planning against the empty set validates quantities and collapses
        // duplicate product ids last-wins, same as the reconciler.
        let plan = reconcile::plan(&[], &new.items)?;

        let now = Utc::now();
        let order_id = Uuid::new_v4().to_string();

        debug!(id = %order_id, client_id = %new.client_id, "Creating order");

        let mut tx = self.pool.begin().await?;

        ensure_client_exists(&mut tx, &new.client_id).await?;

        sqlx::query(
            r#"
            INSERT INTO orders (id, client_id, status, total_price_cents, created_at, updated_at)
            VALUES (?1, ?2, ?3, 0, ?4, ?5)
            "#,
        )
        .bind(&order_id)
        .bind(&new.client_id)
        .bind(&new.status)
        .bind(now)
        .bind(now)
        .execute(&mut *tx)
        .await?;

        for addition in &plan.additions {
            insert_item(&mut tx, &order_id, addition, now).await?;
        }

        refresh_total(&mut tx, &order_id, now).await?;

        tx.commit().await?;

        self.get(&order_id)
            .await?
            .ok_or_else(|| DbError::Internal("order vanished after create".to_string()))
    }

    /// Gets an order with its items.
    ///
    /// The view carries the cached aggregate total as stored; line totals
    /// are priced from the products' *current* sale values.
    pub async fn get(&self, order_id: &str) -> DbResult<Option<OrderView>> {
        let mut conn = self.pool.acquire().await?;

        let order = fetch_order(&mut conn, order_id).await?;
        let Some(order) = order else {
            return Ok(None);
        };

        let items = fetch_item_views(&mut conn, order_id).await?;
        Ok(Some(into_view(order, items)))
    }

    /// Lists orders with their items, paginated.
    pub async fn list(&self, offset: i64, limit: i64) -> DbResult<Vec<OrderView>> {
        let (offset, limit) = normalize_pagination(offset, limit);
        let mut conn = self.pool.acquire().await?;

        let orders = sqlx::query_as::<_, Order>(
            r#"
            SELECT id, client_id, status, total_price_cents, created_at, updated_at
            FROM orders
            ORDER BY created_at, id
            LIMIT ?1 OFFSET ?2
            "#,
        )
        .bind(limit)
        .bind(offset)
        .fetch_all(&mut *conn)
        .await?;

        let mut views = Vec::with_capacity(orders.len());
        for order in orders {
            let items = fetch_item_views(&mut conn, &order.id).await?;
            views.push(into_view(order, items));
        }

        Ok(views)
    }

    /// Reconciles an order with a partial update (PATCH semantics).
    ///
    /// - `client_id` / `status`: applied only when present and non-empty;
    ///   absent fields leave the current value untouched.
    /// - `items`: when present, the stored item collection is converged to
    ///   the requested set (an empty list removes every line). When absent,
    ///   items are left alone.
    /// - The cached total is recomputed and persisted **always** - a request
    ///   that changes nothing still succeeds and still refreshes the total.
    ///
    /// ## Errors
    /// * `DbError::NotFound("Order")` - order id does not resolve
    /// * `DbError::Validation` - a requested quantity is not positive; the
    ///   request is rejected before any mutation is applied
    pub async fn reconcile(&self, order_id: &str, patch: OrderPatch) -> DbResult<OrderView> {
        let now = Utc::now();

        debug!(id = %order_id, "Reconciling order");

        let mut tx = self.pool.begin().await?;

        let mut order = fetch_order(&mut tx, order_id)
            .await?
            .ok_or_else(|| DbError::not_found("Order", order_id))?;

        // Empty strings count as absent, matching the source semantics of
        // "update only when provided".
        if let Some(client_id) = patch.client_id.filter(|s| !s.is_empty()) {
            order.client_id = client_id;
        }
        if let Some(status) = patch.status.filter(|s| !s.is_empty()) {
            order.status = status;
        }

        sqlx::query("UPDATE orders SET client_id = ?2, status = ?3 WHERE id = ?1")
            .bind(&order.id)
            .bind(&order.client_id)
            .bind(&order.status)
            .execute(&mut *tx)
            .await?;

        if let Some(requested) = &patch.items {
            let existing = fetch_items(&mut tx, order_id).await?;
            let plan = reconcile::plan(&existing, requested)?;

            for update in &plan.updates {
                sqlx::query("UPDATE order_items SET quantity = ?2, updated_at = ?3 WHERE id = ?1")
                    .bind(&update.item_id)
                    .bind(update.quantity)
                    .bind(now)
                    .execute(&mut *tx)
                    .await?;
            }

            for item_id in &plan.removals {
                sqlx::query("DELETE FROM order_items WHERE id = ?1")
                    .bind(item_id)
                    .execute(&mut *tx)
                    .await?;
            }

            for addition in &plan.additions {
                insert_item(&mut tx, order_id, addition, now).await?;
            }
        }

        refresh_total(&mut tx, order_id, now).await?;

        tx.commit().await?;

        self.get(order_id)
            .await?
            .ok_or_else(|| DbError::not_found("Order", order_id))
    }

    /// Deletes an order. Its items are removed by the schema's CASCADE rule.
    pub async fn delete(&self, order_id: &str) -> DbResult<()> {
        debug!(id = %order_id, "Deleting order");

        let result = sqlx::query("DELETE FROM orders WHERE id = ?1")
            .bind(order_id)
            .execute(&self.pool)
            .await?;

        if result.rows_affected() == 0 {
            return Err(DbError::not_found("Order", order_id));
        }

        Ok(())
    }

    // =========================================================================
    // Item Operations
    // =========================================================================

    /// Adds a single line to an existing order and refreshes the cached
    /// total in the same transaction.
    ///
    /// ## Errors
    /// * `DbError::NotFound("Order"/"Product")` - unknown order or product
    /// * `DbError::UniqueViolation` - the order already has a line for this
    ///   product (use `reconcile` or `update_item_quantity` instead)
    pub async fn add_item(&self, order_id: &str, request: ItemRequest) -> DbResult<OrderItemView> {
        validate_quantity(request.quantity)?;

        let now = Utc::now();
        let mut tx = self.pool.begin().await?;

        fetch_order(&mut tx, order_id)
            .await?
            .ok_or_else(|| DbError::not_found("Order", order_id))?;

        let item_id = insert_item(&mut tx, order_id, &request, now).await?;
        refresh_total(&mut tx, order_id, now).await?;

        tx.commit().await?;

        self.get_item(&item_id)
            .await?
            .ok_or_else(|| DbError::Internal("order item vanished after insert".to_string()))
    }

    /// Gets a single order item with its read-time line total.
    pub async fn get_item(&self, item_id: &str) -> DbResult<Option<OrderItemView>> {
        let mut conn = self.pool.acquire().await?;

        let row = sqlx::query_as::<_, PricedItemRow>(
            r#"
            SELECT oi.id, oi.order_id, oi.product_id, oi.quantity,
                   oi.created_at, oi.updated_at, p.sale_value_cents
            FROM order_items oi
            LEFT JOIN products p ON p.id = oi.product_id
            WHERE oi.id = ?1
            "#,
        )
        .bind(item_id)
        .fetch_optional(&mut *conn)
        .await?;

        row.map(PricedItemRow::into_view).transpose()
    }

    /// Gets the first order item referencing a product, if any.
    pub async fn get_item_by_product(&self, product_id: &str) -> DbResult<Option<OrderItemView>> {
        let mut conn = self.pool.acquire().await?;

        let row = sqlx::query_as::<_, PricedItemRow>(
            r#"
            SELECT oi.id, oi.order_id, oi.product_id, oi.quantity,
                   oi.created_at, oi.updated_at, p.sale_value_cents
            FROM order_items oi
            LEFT JOIN products p ON p.id = oi.product_id
            WHERE oi.product_id = ?1
            ORDER BY oi.created_at, oi.id
            LIMIT 1
            "#,
        )
        .bind(product_id)
        .fetch_optional(&mut *conn)
        .await?;

        row.map(PricedItemRow::into_view).transpose()
    }

    /// Updates one line's quantity and refreshes the parent order's cached
    /// total in the same transaction.
    pub async fn update_item_quantity(&self, item_id: &str, quantity: i64) -> DbResult<OrderItemView> {
        validate_quantity(quantity)?;

        let now = Utc::now();
        let mut tx = self.pool.begin().await?;

        let item = fetch_item(&mut tx, item_id)
            .await?
            .ok_or_else(|| DbError::not_found("Order item", item_id))?;

        sqlx::query("UPDATE order_items SET quantity = ?2, updated_at = ?3 WHERE id = ?1")
            .bind(item_id)
            .bind(quantity)
            .bind(now)
            .execute(&mut *tx)
            .await?;

        refresh_total(&mut tx, &item.order_id, now).await?;

        tx.commit().await?;

        self.get_item(item_id)
            .await?
            .ok_or_else(|| DbError::not_found("Order item", item_id))
    }

    /// Removes one line and refreshes the parent order's cached total in the
    /// same transaction.
    pub async fn remove_item(&self, item_id: &str) -> DbResult<()> {
        let now = Utc::now();
        let mut tx = self.pool.begin().await?;

        let item = fetch_item(&mut tx, item_id)
            .await?
            .ok_or_else(|| DbError::not_found("Order item", item_id))?;

        sqlx::query("DELETE FROM order_items WHERE id = ?1")
            .bind(item_id)
            .execute(&mut *tx)
            .await?;

        refresh_total(&mut tx, &item.order_id, now).await?;

        tx.commit().await?;
        Ok(())
    }
}

// =============================================================================
// Transaction Helpers
// =============================================================================
// These take a bare connection so they compose inside a transaction; a `?`
// anywhere drops the transaction and rolls everything back.

/// Row shape for the pricing join: a line plus its product's current price.
/// `sale_value_cents` is NULL when the product cannot be resolved.
#[derive(Debug, sqlx::FromRow)]
struct PricedItemRow {
    id: String,
    order_id: String,
    product_id: String,
    quantity: i64,
    created_at: DateTime<Utc>,
    updated_at: DateTime<Utc>,
    sale_value_cents: Option<i64>,
}

impl PricedItemRow {
    /// Converts to the read model, failing if the product is unresolved
    /// (deleted out-of-band).
    fn into_view(self) -> DbResult<OrderItemView> {
        let price = self
            .sale_value_cents
            .ok_or_else(|| DbError::not_found("Product", &self.product_id))?;

        Ok(OrderItemView {
            total_price_cents: pricing::line_total(self.quantity, Money::from_cents(price)).cents(),
            id: self.id,
            order_id: self.order_id,
            product_id: self.product_id,
            quantity: self.quantity,
            created_at: self.created_at,
            updated_at: self.updated_at,
        })
    }
}

async fn fetch_order(conn: &mut SqliteConnection, order_id: &str) -> DbResult<Option<Order>> {
    let order = sqlx::query_as::<_, Order>(
        r#"
        SELECT id, client_id, status, total_price_cents, created_at, updated_at
        FROM orders
        WHERE id = ?1
        "#,
    )
    .bind(order_id)
    .fetch_optional(&mut *conn)
    .await?;

    Ok(order)
}

async fn fetch_items(conn: &mut SqliteConnection, order_id: &str) -> DbResult<Vec<OrderItem>> {
    let items = sqlx::query_as::<_, OrderItem>(
        r#"
        SELECT id, order_id, product_id, quantity, created_at, updated_at
        FROM order_items
        WHERE order_id = ?1
        ORDER BY created_at, id
        "#,
    )
    .bind(order_id)
    .fetch_all(&mut *conn)
    .await?;

    Ok(items)
}

async fn fetch_item(conn: &mut SqliteConnection, item_id: &str) -> DbResult<Option<OrderItem>> {
    let item = sqlx::query_as::<_, OrderItem>(
        r#"
        SELECT id, order_id, product_id, quantity, created_at, updated_at
        FROM order_items
        WHERE id = ?1
        "#,
    )
    .bind(item_id)
    .fetch_optional(&mut *conn)
    .await?;

    Ok(item)
}

async fn fetch_priced_rows(
    conn: &mut SqliteConnection,
    order_id: &str,
) -> DbResult<Vec<PricedItemRow>> {
    let rows = sqlx::query_as::<_, PricedItemRow>(
        r#"
        SELECT oi.id, oi.order_id, oi.product_id, oi.quantity,
               oi.created_at, oi.updated_at, p.sale_value_cents
        FROM order_items oi
        LEFT JOIN products p ON p.id = oi.product_id
        WHERE oi.order_id = ?1
        ORDER BY oi.created_at, oi.id
        "#,
    )
    .bind(order_id)
    .fetch_all(&mut *conn)
    .await?;

    Ok(rows)
}

async fn fetch_item_views(
    conn: &mut SqliteConnection,
    order_id: &str,
) -> DbResult<Vec<OrderItemView>> {
    fetch_priced_rows(conn, order_id)
        .await?
        .into_iter()
        .map(PricedItemRow::into_view)
        .collect()
}

async fn ensure_client_exists(conn: &mut SqliteConnection, client_id: &str) -> DbResult<()> {
    let found: Option<String> = sqlx::query_scalar("SELECT id FROM clients WHERE id = ?1")
        .bind(client_id)
        .fetch_optional(&mut *conn)
        .await?;

    match found {
        Some(_) => Ok(()),
        None => Err(DbError::not_found("Client", client_id)),
    }
}

async fn ensure_product_exists(conn: &mut SqliteConnection, product_id: &str) -> DbResult<()> {
    let found: Option<String> = sqlx::query_scalar("SELECT id FROM products WHERE id = ?1")
        .bind(product_id)
        .fetch_optional(&mut *conn)
        .await?;

    match found {
        Some(_) => Ok(()),
        None => Err(DbError::not_found("Product", product_id)),
    }
}

/// Inserts one order line. Returns the new item id.
async fn insert_item(
    conn: &mut SqliteConnection,
    order_id: &str,
    request: &ItemRequest,
    now: DateTime<Utc>,
) -> DbResult<String> {
    ensure_product_exists(conn, &request.product_id).await?;

    let item_id = Uuid::new_v4().to_string();

    sqlx::query(
        r#"
        INSERT INTO order_items (id, order_id, product_id, quantity, created_at, updated_at)
        VALUES (?1, ?2, ?3, ?4, ?5, ?6)
        "#,
    )
    .bind(&item_id)
    .bind(order_id)
    .bind(&request.product_id)
    .bind(request.quantity)
    .bind(now)
    .bind(now)
    .execute(&mut *conn)
    .await?;

    Ok(item_id)
}

/// Reprices every line of the order from current product data and persists
/// the sum into `orders.total_price_cents`. The single legal writer of the
/// cached aggregate.
async fn refresh_total(
    conn: &mut SqliteConnection,
    order_id: &str,
    now: DateTime<Utc>,
) -> DbResult<Money> {
    let rows = fetch_priced_rows(conn, order_id).await?;

    let mut lines = Vec::with_capacity(rows.len());
    for row in &rows {
        let price = row
            .sale_value_cents
            .ok_or_else(|| DbError::not_found("Product", &row.product_id))?;
        lines.push(PricedLine::new(row.quantity, Money::from_cents(price)));
    }

    let total = pricing::order_total(lines);

    sqlx::query("UPDATE orders SET total_price_cents = ?2, updated_at = ?3 WHERE id = ?1")
        .bind(order_id)
        .bind(total.cents())
        .bind(now)
        .execute(&mut *conn)
        .await?;

    debug!(order_id = %order_id, total = %total, "Order total refreshed");
    Ok(total)
}

fn into_view(order: Order, items: Vec<OrderItemView>) -> OrderView {
    OrderView {
        id: order.id,
        client_id: order.client_id,
        status: order.status,
        total_price_cents: order.total_price_cents,
        items,
        created_at: order.created_at,
        updated_at: order.updated_at,
    }
}

// =============================================================================
// Unit Tests
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use crate::pool::{Database, DbConfig};
    use mercado_core::{NewClient, NewProduct, ProductPatch};

    async fn test_db() -> Database {
        Database::new(DbConfig::in_memory()).await.unwrap()
    }

    async fn seed_client(db: &Database) -> String {
        db.clients()
            .register(NewClient {
                name: "Ana".to_string(),
                email: format!("{}@x.com", Uuid::new_v4()),
                cpf: Uuid::new_v4().to_string(),
            })
            .await
            .unwrap()
            .id
    }

    async fn seed_product(db: &Database, cents: i64) -> String {
        db.products()
            .create(NewProduct {
                description: "Produto".to_string(),
                sale_value_cents: cents,
                barcode: Uuid::new_v4().to_string(),
                section: "Geral".to_string(),
                initial_stock: 10,
                expiry_date: None,
            })
            .await
            .unwrap()
            .id
    }

    fn req(product_id: &str, quantity: i64) -> ItemRequest {
        ItemRequest {
            product_id: product_id.to_string(),
            quantity,
        }
    }

    async fn item_count(db: &Database, order_id: &str) -> i64 {
        sqlx::query_scalar("SELECT COUNT(*) FROM order_items WHERE order_id = ?1")
            .bind(order_id)
            .fetch_one(db.pool())
            .await
            .unwrap()
    }

    // -------------------------------------------------------------------------
    // Creation
    // -------------------------------------------------------------------------

    #[tokio::test]
    async fn test_create_persists_total_as_sum_of_line_totals() {
        let db = test_db().await;
        let client = seed_client(&db).await;
        let p1 = seed_product(&db, 500).await;
        let p2 = seed_product(&db, 199).await;

        let order = db
            .orders()
            .create(NewOrder {
                client_id: client,
                status: "pending".to_string(),
                items: vec![req(&p1, 2), req(&p2, 3)],
            })
            .await
            .unwrap();

        // 2 × 5.00 + 3 × 1.99 = 15.97
        assert_eq!(order.total_price_cents, 1597);
        assert_eq!(order.items.len(), 2);
        let line_sum: i64 = order.items.iter().map(|i| i.total_price_cents).sum();
        assert_eq!(order.total_price_cents, line_sum);
    }

    #[tokio::test]
    async fn test_create_with_no_items_totals_zero() {
        let db = test_db().await;
        let client = seed_client(&db).await;

        let order = db
            .orders()
            .create(NewOrder {
                client_id: client,
                status: "pending".to_string(),
                items: vec![],
            })
            .await
            .unwrap();

        assert_eq!(order.total_price_cents, 0);
        assert!(order.items.is_empty());
    }

    #[tokio::test]
    async fn test_create_with_unknown_client_fails_clean() {
        let db = test_db().await;

        let err = db
            .orders()
            .create(NewOrder {
                client_id: "ghost".to_string(),
                status: "pending".to_string(),
                items: vec![],
            })
            .await
            .unwrap_err();

        assert!(matches!(err, DbError::NotFound { ref entity, .. } if entity == "Client"));
    }

    #[tokio::test]
    async fn test_create_with_unknown_product_rolls_back_everything() {
        let db = test_db().await;
        let client = seed_client(&db).await;
        let p1 = seed_product(&db, 500).await;

        let err = db
            .orders()
            .create(NewOrder {
                client_id: client,
                status: "pending".to_string(),
                items: vec![req(&p1, 1), req("ghost-product", 2)],
            })
            .await
            .unwrap_err();

        assert!(matches!(err, DbError::NotFound { ref entity, .. } if entity == "Product"));

        // The whole create rolled back: no order row, no item rows.
        let orders: i64 = sqlx::query_scalar("SELECT COUNT(*) FROM orders")
            .fetch_one(db.pool())
            .await
            .unwrap();
        assert_eq!(orders, 0);
        let items: i64 = sqlx::query_scalar("SELECT COUNT(*) FROM order_items")
            .fetch_one(db.pool())
            .await
            .unwrap();
        assert_eq!(items, 0);
    }

    #[tokio::test]
    async fn test_create_rejects_non_positive_quantity() {
        let db = test_db().await;
        let client = seed_client(&db).await;
        let p1 = seed_product(&db, 500).await;

        let err = db
            .orders()
            .create(NewOrder {
                client_id: client,
                status: "pending".to_string(),
                items: vec![req(&p1, 0)],
            })
            .await
            .unwrap_err();

        assert!(matches!(err, DbError::Validation(_)));
    }

    // -------------------------------------------------------------------------
    // Reconciliation
    // -------------------------------------------------------------------------

    #[tokio::test]
    async fn test_reconcile_updates_adds_and_removes_in_one_pass() {
        let db = test_db().await;
        let client = seed_client(&db).await;
        let a = seed_product(&db, 200).await;
        let b = seed_product(&db, 300).await;
        let c = seed_product(&db, 100).await;

        let order = db
            .orders()
            .create(NewOrder {
                client_id: client,
                status: "pending".to_string(),
                items: vec![req(&a, 2), req(&b, 1)],
            })
            .await
            .unwrap();

        // a: 2 → 5 (match), b: removed, c: added with 3
        let updated = db
            .orders()
            .reconcile(
                &order.id,
                OrderPatch {
                    items: Some(vec![req(&a, 5), req(&c, 3)]),
                    ..Default::default()
                },
            )
            .await
            .unwrap();

        assert_eq!(updated.items.len(), 2);
        let qty_of = |pid: &str| {
            updated
                .items
                .iter()
                .find(|i| i.product_id == pid)
                .map(|i| i.quantity)
        };
        assert_eq!(qty_of(&a), Some(5));
        assert_eq!(qty_of(&b), None);
        assert_eq!(qty_of(&c), Some(3));

        // 5 × 2.00 + 3 × 1.00 = 13.00
        assert_eq!(updated.total_price_cents, 1300);
        // Item b is gone from storage, not just from the view.
        assert_eq!(item_count(&db, &order.id).await, 2);
    }

    #[tokio::test]
    async fn test_removal_case_from_two_items_to_one() {
        let db = test_db().await;
        let client = seed_client(&db).await;
        let a = seed_product(&db, 250).await;
        let b = seed_product(&db, 400).await;

        let order = db
            .orders()
            .create(NewOrder {
                client_id: client,
                status: "pending".to_string(),
                items: vec![req(&a, 2), req(&b, 1)],
            })
            .await
            .unwrap();

        let updated = db
            .orders()
            .reconcile(
                &order.id,
                OrderPatch {
                    items: Some(vec![req(&b, 1)]),
                    ..Default::default()
                },
            )
            .await
            .unwrap();

        assert_eq!(updated.items.len(), 1);
        assert_eq!(updated.items[0].product_id, b);
        assert_eq!(updated.items[0].quantity, 1);
        assert_eq!(updated.total_price_cents, 400);
    }

    #[tokio::test]
    async fn test_empty_item_list_removes_everything_and_zeroes_total() {
        let db = test_db().await;
        let client = seed_client(&db).await;
        let a = seed_product(&db, 250).await;

        let order = db
            .orders()
            .create(NewOrder {
                client_id: client,
                status: "pending".to_string(),
                items: vec![req(&a, 4)],
            })
            .await
            .unwrap();
        assert_eq!(order.total_price_cents, 1000);

        let updated = db
            .orders()
            .reconcile(
                &order.id,
                OrderPatch {
                    items: Some(vec![]),
                    ..Default::default()
                },
            )
            .await
            .unwrap();

        assert!(updated.items.is_empty());
        assert_eq!(updated.total_price_cents, 0);
        assert_eq!(item_count(&db, &order.id).await, 0);
    }

    #[tokio::test]
    async fn test_reconcile_is_idempotent_for_quantities_and_total() {
        let db = test_db().await;
        let client = seed_client(&db).await;
        let a = seed_product(&db, 150).await;
        let b = seed_product(&db, 275).await;

        let order = db
            .orders()
            .create(NewOrder {
                client_id: client,
                status: "pending".to_string(),
                items: vec![req(&a, 1)],
            })
            .await
            .unwrap();

        let target = vec![req(&a, 2), req(&b, 1)];
        let first = db
            .orders()
            .reconcile(
                &order.id,
                OrderPatch {
                    items: Some(target.clone()),
                    ..Default::default()
                },
            )
            .await
            .unwrap();
        let second = db
            .orders()
            .reconcile(
                &order.id,
                OrderPatch {
                    items: Some(target),
                    ..Default::default()
                },
            )
            .await
            .unwrap();

        assert_eq!(first.total_price_cents, second.total_price_cents);
        assert_eq!(first.items.len(), second.items.len());
        for (x, y) in first.items.iter().zip(second.items.iter()) {
            assert_eq!(x.id, y.id); // same rows, not recreated
            assert_eq!(x.quantity, y.quantity);
            assert_eq!(x.total_price_cents, y.total_price_cents);
        }
    }

    #[tokio::test]
    async fn test_unchanged_request_still_stamps_matched_lines() {
        let db = test_db().await;
        let client = seed_client(&db).await;
        let a = seed_product(&db, 300).await;

        let order = db
            .orders()
            .create(NewOrder {
                client_id: client,
                status: "pending".to_string(),
                items: vec![req(&a, 3)],
            })
            .await
            .unwrap();
        let before = order.items[0].updated_at;

        tokio::time::sleep(std::time::Duration::from_millis(10)).await;

        // Identical request: quantity unchanged, but the line is touched.
        let updated = db
            .orders()
            .reconcile(
                &order.id,
                OrderPatch {
                    items: Some(vec![req(&a, 3)]),
                    ..Default::default()
                },
            )
            .await
            .unwrap();

        assert_eq!(updated.items[0].quantity, 3);
        assert_eq!(updated.total_price_cents, 900);
        assert!(updated.items[0].updated_at > before);
    }

    #[tokio::test]
    async fn test_zero_quantity_rejects_without_mutating() {
        let db = test_db().await;
        let client = seed_client(&db).await;
        let a = seed_product(&db, 250).await;
        let b = seed_product(&db, 100).await;

        let order = db
            .orders()
            .create(NewOrder {
                client_id: client,
                status: "pending".to_string(),
                items: vec![req(&a, 2)],
            })
            .await
            .unwrap();

        let err = db
            .orders()
            .reconcile(
                &order.id,
                OrderPatch {
                    items: Some(vec![req(&b, 1), req(&a, 0)]),
                    ..Default::default()
                },
            )
            .await
            .unwrap_err();
        assert!(matches!(err, DbError::Validation(_)));

        // No mutation was applied to the order.
        let after = db.orders().get(&order.id).await.unwrap().unwrap();
        assert_eq!(after.items.len(), 1);
        assert_eq!(after.items[0].product_id, a);
        assert_eq!(after.items[0].quantity, 2);
        assert_eq!(after.total_price_cents, 500);
    }

    #[tokio::test]
    async fn test_reconcile_missing_order_is_not_found() {
        let db = test_db().await;
        let err = db
            .orders()
            .reconcile("ghost", OrderPatch::default())
            .await
            .unwrap_err();
        assert!(matches!(err, DbError::NotFound { ref entity, .. } if entity == "Order"));
    }

    #[tokio::test]
    async fn test_patch_status_without_items_leaves_items_alone() {
        let db = test_db().await;
        let client = seed_client(&db).await;
        let a = seed_product(&db, 250).await;

        let order = db
            .orders()
            .create(NewOrder {
                client_id: client,
                status: "pending".to_string(),
                items: vec![req(&a, 2)],
            })
            .await
            .unwrap();

        let updated = db
            .orders()
            .reconcile(
                &order.id,
                OrderPatch {
                    status: Some("shipped".to_string()),
                    ..Default::default()
                },
            )
            .await
            .unwrap();

        assert_eq!(updated.status, "shipped");
        assert_eq!(updated.client_id, order.client_id);
        assert_eq!(updated.items.len(), 1);
        assert_eq!(updated.total_price_cents, 500);
    }

    #[tokio::test]
    async fn test_empty_string_status_counts_as_absent() {
        let db = test_db().await;
        let client = seed_client(&db).await;

        let order = db
            .orders()
            .create(NewOrder {
                client_id: client,
                status: "pending".to_string(),
                items: vec![],
            })
            .await
            .unwrap();

        let updated = db
            .orders()
            .reconcile(
                &order.id,
                OrderPatch {
                    status: Some(String::new()),
                    ..Default::default()
                },
            )
            .await
            .unwrap();

        assert_eq!(updated.status, "pending");
    }

    #[tokio::test]
    async fn test_duplicate_product_ids_in_request_resolve_last_wins() {
        let db = test_db().await;
        let client = seed_client(&db).await;
        let a = seed_product(&db, 100).await;

        let order = db
            .orders()
            .create(NewOrder {
                client_id: client,
                status: "pending".to_string(),
                items: vec![req(&a, 2), req(&a, 7)],
            })
            .await
            .unwrap();

        // One line, with the last-seen quantity.
        assert_eq!(order.items.len(), 1);
        assert_eq!(order.items[0].quantity, 7);
        assert_eq!(order.total_price_cents, 700);
    }

    // -------------------------------------------------------------------------
    // Price Drift (deliberate design property)
    // -------------------------------------------------------------------------

    #[tokio::test]
    async fn test_line_totals_follow_current_price_and_cached_total_lags() {
        let db = test_db().await;
        let client = seed_client(&db).await;
        let a = seed_product(&db, 100).await;

        let order = db
            .orders()
            .create(NewOrder {
                client_id: client,
                status: "pending".to_string(),
                items: vec![req(&a, 3)],
            })
            .await
            .unwrap();
        assert_eq!(order.total_price_cents, 300);

        // The product gets a new price after the order was written.
        db.products()
            .update(
                &a,
                ProductPatch {
                    sale_value_cents: Some(200),
                    ..Default::default()
                },
            )
            .await
            .unwrap();

        // Read: line totals are priced live, the cached aggregate still
        // holds the value from the last write.
        let view = db.orders().get(&order.id).await.unwrap().unwrap();
        assert_eq!(view.items[0].total_price_cents, 600);
        assert_eq!(view.total_price_cents, 300);

        // Any reconciliation - even a no-op one - refreshes the cache.
        let updated = db
            .orders()
            .reconcile(
                &order.id,
                OrderPatch {
                    items: Some(vec![req(&a, 3)]),
                    ..Default::default()
                },
            )
            .await
            .unwrap();
        assert_eq!(updated.total_price_cents, 600);
    }

    // -------------------------------------------------------------------------
    // Standalone Item Operations
    // -------------------------------------------------------------------------

    #[tokio::test]
    async fn test_add_item_refreshes_cached_total() {
        let db = test_db().await;
        let client = seed_client(&db).await;
        let a = seed_product(&db, 250).await;
        let b = seed_product(&db, 100).await;

        let order = db
            .orders()
            .create(NewOrder {
                client_id: client,
                status: "pending".to_string(),
                items: vec![req(&a, 2)],
            })
            .await
            .unwrap();

        let item = db.orders().add_item(&order.id, req(&b, 4)).await.unwrap();
        assert_eq!(item.total_price_cents, 400);

        let view = db.orders().get(&order.id).await.unwrap().unwrap();
        assert_eq!(view.total_price_cents, 900);
    }

    #[tokio::test]
    async fn test_add_item_for_product_already_on_order_is_rejected() {
        let db = test_db().await;
        let client = seed_client(&db).await;
        let a = seed_product(&db, 250).await;

        let order = db
            .orders()
            .create(NewOrder {
                client_id: client,
                status: "pending".to_string(),
                items: vec![req(&a, 1)],
            })
            .await
            .unwrap();

        let err = db.orders().add_item(&order.id, req(&a, 2)).await.unwrap_err();
        assert!(matches!(err, DbError::UniqueViolation { .. }));
    }

    #[tokio::test]
    async fn test_update_item_quantity_refreshes_cached_total() {
        let db = test_db().await;
        let client = seed_client(&db).await;
        let a = seed_product(&db, 300).await;

        let order = db
            .orders()
            .create(NewOrder {
                client_id: client,
                status: "pending".to_string(),
                items: vec![req(&a, 1)],
            })
            .await
            .unwrap();

        let item = db
            .orders()
            .update_item_quantity(&order.items[0].id, 5)
            .await
            .unwrap();
        assert_eq!(item.quantity, 5);
        assert_eq!(item.total_price_cents, 1500);

        let view = db.orders().get(&order.id).await.unwrap().unwrap();
        assert_eq!(view.total_price_cents, 1500);
    }

    #[tokio::test]
    async fn test_remove_item_refreshes_cached_total() {
        let db = test_db().await;
        let client = seed_client(&db).await;
        let a = seed_product(&db, 300).await;
        let b = seed_product(&db, 100).await;

        let order = db
            .orders()
            .create(NewOrder {
                client_id: client,
                status: "pending".to_string(),
                items: vec![req(&a, 1), req(&b, 2)],
            })
            .await
            .unwrap();

        let item_a = order.items.iter().find(|i| i.product_id == a).unwrap();
        db.orders().remove_item(&item_a.id).await.unwrap();

        let view = db.orders().get(&order.id).await.unwrap().unwrap();
        assert_eq!(view.items.len(), 1);
        assert_eq!(view.total_price_cents, 200);
    }

    #[tokio::test]
    async fn test_get_item_by_product() {
        let db = test_db().await;
        let client = seed_client(&db).await;
        let a = seed_product(&db, 300).await;

        let order = db
            .orders()
            .create(NewOrder {
                client_id: client,
                status: "pending".to_string(),
                items: vec![req(&a, 2)],
            })
            .await
            .unwrap();

        let item = db.orders().get_item_by_product(&a).await.unwrap().unwrap();
        assert_eq!(item.order_id, order.id);
        assert_eq!(item.quantity, 2);

        assert!(db
            .orders()
            .get_item_by_product("ghost")
            .await
            .unwrap()
            .is_none());
    }

    // -------------------------------------------------------------------------
    // Deletion and Referential Policy
    // -------------------------------------------------------------------------

    #[tokio::test]
    async fn test_delete_order_cascades_items() {
        let db = test_db().await;
        let client = seed_client(&db).await;
        let a = seed_product(&db, 300).await;

        let order = db
            .orders()
            .create(NewOrder {
                client_id: client,
                status: "pending".to_string(),
                items: vec![req(&a, 2)],
            })
            .await
            .unwrap();

        db.orders().delete(&order.id).await.unwrap();

        assert!(db.orders().get(&order.id).await.unwrap().is_none());
        assert_eq!(item_count(&db, &order.id).await, 0);
    }

    #[tokio::test]
    async fn test_client_with_orders_cannot_be_deleted() {
        let db = test_db().await;
        let client = seed_client(&db).await;

        db.orders()
            .create(NewOrder {
                client_id: client.clone(),
                status: "pending".to_string(),
                items: vec![],
            })
            .await
            .unwrap();

        let err = db.clients().delete(&client).await.unwrap_err();
        assert!(matches!(err, DbError::ForeignKeyViolation { .. }));
    }

    #[tokio::test]
    async fn test_product_on_an_order_cannot_be_deleted() {
        let db = test_db().await;
        let client = seed_client(&db).await;
        let a = seed_product(&db, 300).await;

        db.orders()
            .create(NewOrder {
                client_id: client,
                status: "pending".to_string(),
                items: vec![req(&a, 1)],
            })
            .await
            .unwrap();

        let err = db.products().delete(&a).await.unwrap_err();
        assert!(matches!(err, DbError::ForeignKeyViolation { .. }));
    }

    #[tokio::test]
    async fn test_list_orders() {
        let db = test_db().await;
        let client = seed_client(&db).await;

        for status in ["pending", "shipped"] {
            db.orders()
                .create(NewOrder {
                    client_id: client.clone(),
                    status: status.to_string(),
                    items: vec![],
                })
                .await
                .unwrap();
        }

        let orders = db.orders().list(0, 10).await.unwrap();
        assert_eq!(orders.len(), 2);
    }
}
