//! # Client Repository
//!
//! Database operations for clients, including the registrar flow.
//!
//! ## Registrar Flow
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                      register(name, email, cpf)                         │
//! │                                                                         │
//! │  INSERT INTO clients ...                                               │
//! │       │                                                                 │
//! │       ├── OK ──────────────► Client (with assigned id)                 │
//! │       │                                                                 │
//! │       ├── UNIQUE failed ───► DbError::UniqueViolation                  │
//! │       │   (email or cpf)     "already registered" - the caller maps    │
//! │       │                      this to 403                               │
//! │       │                                                                 │
//! │       └── other failure ───► generic storage error                     │
//! │                                                                         │
//! │  A single INSERT statement is atomic: a failed attempt leaves no       │
//! │  partial row behind.                                                   │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```

use chrono::Utc;
use sqlx::SqlitePool;
use tracing::debug;
use uuid::Uuid;

use crate::error::{DbError, DbResult};
use mercado_core::validation::normalize_pagination;
use mercado_core::{Client, ClientPatch, NewClient};

/// Repository for client database operations.
#[derive(Debug, Clone)]
pub struct ClientRepository {
    pool: SqlitePool,
}

impl ClientRepository {
    /// Creates a new ClientRepository.
    pub fn new(pool: SqlitePool) -> Self {
        ClientRepository { pool }
    }

    /// Registers a new client.
    ///
    /// ## Preconditions
    /// Field formats (email shape, string lengths) are already validated by
    /// the request layer; this method only enforces uniqueness via storage.
    ///
    /// ## Returns
    /// * `Ok(Client)` - persisted client including its assigned id
    /// * `Err(DbError::UniqueViolation)` - email or cpf already registered
    pub async fn register(&self, new: NewClient) -> DbResult<Client> {
        let now = Utc::now();
        let client = Client {
            id: Uuid::new_v4().to_string(),
            name: new.name,
            email: new.email,
            cpf: new.cpf,
            created_at: now,
            updated_at: now,
        };

        debug!(id = %client.id, email = %client.email, "Registering client");

        sqlx::query(
            r#"
            INSERT INTO clients (id, name, email, cpf, created_at, updated_at)
            VALUES (?1, ?2, ?3, ?4, ?5, ?6)
            "#,
        )
        .bind(&client.id)
        .bind(&client.name)
        .bind(&client.email)
        .bind(&client.cpf)
        .bind(client.created_at)
        .bind(client.updated_at)
        .execute(&self.pool)
        .await?;

        Ok(client)
    }

    /// Gets a client by ID.
    pub async fn get_by_id(&self, id: &str) -> DbResult<Option<Client>> {
        let client = sqlx::query_as::<_, Client>(
            r#"
            SELECT id, name, email, cpf, created_at, updated_at
            FROM clients
            WHERE id = ?1
            "#,
        )
        .bind(id)
        .fetch_optional(&self.pool)
        .await?;

        Ok(client)
    }

    /// Lists clients with pagination.
    pub async fn list(&self, offset: i64, limit: i64) -> DbResult<Vec<Client>> {
        let (offset, limit) = normalize_pagination(offset, limit);

        let clients = sqlx::query_as::<_, Client>(
            r#"
            SELECT id, name, email, cpf, created_at, updated_at
            FROM clients
            ORDER BY created_at, id
            LIMIT ?1 OFFSET ?2
            "#,
        )
        .bind(limit)
        .bind(offset)
        .fetch_all(&self.pool)
        .await?;

        Ok(clients)
    }

    /// Partially updates a client. Absent patch fields leave stored values
    /// untouched (PATCH, not PUT).
    ///
    /// ## Returns
    /// * `Ok(Client)` - the updated client
    /// * `Err(DbError::NotFound)` - client doesn't exist
    /// * `Err(DbError::UniqueViolation)` - new email or cpf already taken
    pub async fn update(&self, id: &str, patch: ClientPatch) -> DbResult<Client> {
        let mut client = self
            .get_by_id(id)
            .await?
            .ok_or_else(|| DbError::not_found("Client", id))?;

        if let Some(name) = patch.name {
            client.name = name;
        }
        if let Some(email) = patch.email {
            client.email = email;
        }
        if let Some(cpf) = patch.cpf {
            client.cpf = cpf;
        }
        client.updated_at = Utc::now();

        debug!(id = %client.id, "Updating client");

        let result = sqlx::query(
            r#"
            UPDATE clients SET name = ?2, email = ?3, cpf = ?4, updated_at = ?5
            WHERE id = ?1
            "#,
        )
        .bind(&client.id)
        .bind(&client.name)
        .bind(&client.email)
        .bind(&client.cpf)
        .bind(client.updated_at)
        .execute(&self.pool)
        .await?;

        if result.rows_affected() == 0 {
            return Err(DbError::not_found("Client", id));
        }

        Ok(client)
    }

    /// Deletes a client.
    ///
    /// ## Referential Policy
    /// RESTRICT: a client with existing orders cannot be deleted; the
    /// attempt fails with `DbError::ForeignKeyViolation` and nothing
    /// changes.
    pub async fn delete(&self, id: &str) -> DbResult<()> {
        debug!(id = %id, "Deleting client");

        let result = sqlx::query("DELETE FROM clients WHERE id = ?1")
            .bind(id)
            .execute(&self.pool)
            .await?;

        if result.rows_affected() == 0 {
            return Err(DbError::not_found("Client", id));
        }

        Ok(())
    }

    /// Counts registered clients (for diagnostics).
    pub async fn count(&self) -> DbResult<i64> {
        let count: i64 = sqlx::query_scalar("SELECT COUNT(*) FROM clients")
            .fetch_one(&self.pool)
            .await?;

        Ok(count)
    }
}

// =============================================================================
// Unit Tests
// =============================================================================
