//! # Product Repository
//!
//! Database operations for products.
//!
//! ## The `available` Snapshot
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │  available = initial_stock > 0, evaluated ONCE at creation             │
//! │                                                                         │
//! │  create(initial_stock: 5)  → available = true                          │
//! │  create(initial_stock: 0)  → available = false                         │
//! │                                                                         │
//! │  Later patches to initial_stock do NOT recompute the flag.             │
//! │  It is a static snapshot, not a live invariant.                        │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```

use chrono::Utc;
use sqlx::SqlitePool;
use tracing::debug;
use uuid::Uuid;

use crate::error::{DbError, DbResult};
use mercado_core::validation::{normalize_pagination, validate_price_cents};
use mercado_core::{NewProduct, Product, ProductPatch};

/// Repository for product database operations.
#[derive(Debug, Clone)]
pub struct ProductRepository {
    pool: SqlitePool,
}

impl ProductRepository {
    /// Creates a new ProductRepository.
    pub fn new(pool: SqlitePool) -> Self {
        ProductRepository { pool }
    }

    /// Creates a new product.
    ///
    /// `available` is snapshotted from `initial_stock > 0` here and never
    /// recomputed afterwards.
    pub async fn create(&self, new: NewProduct) -> DbResult<Product> {
        validate_price_cents(new.sale_value_cents)?;

        let now = Utc::now();
        let product = Product {
            id: Uuid::new_v4().to_string(),
            description: new.description,
            sale_value_cents: new.sale_value_cents,
            barcode: new.barcode,
            section: new.section,
            initial_stock: new.initial_stock,
            expiry_date: new.expiry_date,
            available: new.initial_stock > 0,
            created_at: now,
            updated_at: now,
        };

        debug!(id = %product.id, description = %product.description, "Creating product");

        sqlx::query(
            r#"
            INSERT INTO products (
                id, description, sale_value_cents, barcode, section,
                initial_stock, expiry_date, available, created_at, updated_at
            ) VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10)
            "#,
        )
        .bind(&product.id)
        .bind(&product.description)
        .bind(product.sale_value_cents)
        .bind(&product.barcode)
        .bind(&product.section)
        .bind(product.initial_stock)
        .bind(product.expiry_date)
        .bind(product.available)
        .bind(product.created_at)
        .bind(product.updated_at)
        .execute(&self.pool)
        .await?;

        Ok(product)
    }

    /// Gets a product by ID.
    pub async fn get_by_id(&self, id: &str) -> DbResult<Option<Product>> {
        let product = sqlx::query_as::<_, Product>(
            r#"
            SELECT id, description, sale_value_cents, barcode, section,
                   initial_stock, expiry_date, available, created_at, updated_at
            FROM products
            WHERE id = ?1
            "#,
        )
        .bind(id)
        .fetch_optional(&self.pool)
        .await?;

        Ok(product)
    }

    /// Lists products with pagination.
    pub async fn list(&self, offset: i64, limit: i64) -> DbResult<Vec<Product>> {
        let (offset, limit) = normalize_pagination(offset, limit);

        let products = sqlx::query_as::<_, Product>(
            r#"
            SELECT id, description, sale_value_cents, barcode, section,
                   initial_stock, expiry_date, available, created_at, updated_at
            FROM products
            ORDER BY created_at, id
            LIMIT ?1 OFFSET ?2
            "#,
        )
        .bind(limit)
        .bind(offset)
        .fetch_all(&self.pool)
        .await?;

        Ok(products)
    }

    /// Partially updates a product. Absent patch fields leave stored values
    /// untouched; `available` is never recomputed.
    pub async fn update(&self, id: &str, patch: ProductPatch) -> DbResult<Product> {
        let mut product = self
            .get_by_id(id)
            .await?
            .ok_or_else(|| DbError::not_found("Product", id))?;

        if let Some(description) = patch.description {
            product.description = description;
        }
        if let Some(sale_value_cents) = patch.sale_value_cents {
            validate_price_cents(sale_value_cents)?;
            product.sale_value_cents = sale_value_cents;
        }
        if let Some(barcode) = patch.barcode {
            product.barcode = barcode;
        }
        if let Some(section) = patch.section {
            product.section = section;
        }
        if let Some(initial_stock) = patch.initial_stock {
            product.initial_stock = initial_stock;
        }
        if let Some(expiry_date) = patch.expiry_date {
            product.expiry_date = Some(expiry_date);
        }
        product.updated_at = Utc::now();

        debug!(id = %product.id, "Updating product");

        let result = sqlx::query(
            r#"
            UPDATE products SET
                description = ?2, sale_value_cents = ?3, barcode = ?4,
                section = ?5, initial_stock = ?6, expiry_date = ?7,
                updated_at = ?8
            WHERE id = ?1
            "#,
        )
        .bind(&product.id)
        .bind(&product.description)
        .bind(product.sale_value_cents)
        .bind(&product.barcode)
        .bind(&product.section)
        .bind(product.initial_stock)
        .bind(product.expiry_date)
        .bind(product.updated_at)
        .execute(&self.pool)
        .await?;

        if result.rows_affected() == 0 {
            return Err(DbError::not_found("Product", id));
        }

        Ok(product)
    }

    /// Deletes a product.
    ///
    /// ## Referential Policy
    /// RESTRICT: a product referenced by any order item cannot be deleted;
    /// the attempt fails with `DbError::ForeignKeyViolation`.
    pub async fn delete(&self, id: &str) -> DbResult<()> {
        debug!(id = %id, "Deleting product");

        let result = sqlx::query("DELETE FROM products WHERE id = ?1")
            .bind(id)
            .execute(&self.pool)
            .await?;

        if result.rows_affected() == 0 {
            return Err(DbError::not_found("Product", id));
        }

        Ok(())
    }
}

// =============================================================================
// Unit Tests
// =============================================================================
