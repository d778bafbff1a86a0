//! # Repository Module
//!
//! Database repository implementations for Mercado.
//!
//! ## Repository Pattern
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                    Repository Pattern Explained                         │
//! │                                                                         │
//! │  The Repository pattern abstracts database access behind a clean API.  │
//! │                                                                         │
//! │  Caller                                                                 │
//! │       │                                                                 │
//! │       │  db.orders().reconcile(order_id, patch)                        │
//! │       │  ↓                                                              │
//! │       ▼                                                                 │
//! │  OrderRepository                                                       │
//! │  ├── create(&self, new_order)                                          │
//! │  ├── get(&self, order_id)                                              │
//! │  ├── reconcile(&self, order_id, patch)                                 │
//! │  └── delete(&self, order_id)                                           │
//! │       │                                                                 │
//! │       │  SQL Query                                                      │
//! │       ▼                                                                 │
//! │  SQLite Database                                                       │
//! │                                                                         │
//! │  Benefits:                                                              │
//! │  • Clean separation of concerns                                        │
//! │  • SQL is isolated in one place                                        │
//! │  • Transactions stay behind the repository boundary                    │
//! │  • Can swap database implementations                                   │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! ## Available Repositories
//!
//! - [`ClientRepository`] - Client registration and CRUD
//! - [`ProductRepository`] - Product catalog CRUD
//! - [`OrderRepository`] - Order creation, reconciliation, and item operations

pub mod client;
pub mod order;
pub mod product;

pub use client::ClientRepository;
pub use order::OrderRepository;
pub use product::ProductRepository;
