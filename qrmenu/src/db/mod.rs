//! Database layer for data persistence and access.
//!
//! # Architecture
//!
//! ```text
//! ┌─────────────┐
//! │  Services   │  (ownership checks, caching, business rules)
//! └──────┬──────┘
//!        │
//!        ↓
//! ┌─────────────┐
//! │   Storage   │  (db::handlers - trait + Postgres / in-memory backends)
//! └──────┬──────┘
//!        │
//!        ↓
//! ┌─────────────┐
//! │   Models    │  (db::models - database records)
//! └─────────────┘
//! ```
//!
//! # Modules
//!
//! - [`handlers`]: the [`Storage`](handlers::Storage) trait and its backends
//! - [`models`]: Database record structures matching table schemas
//! - [`errors`]: Database-specific error types
//!
//! # Migrations
//!
//! Database migrations are managed by SQLx and located in the `migrations/` directory.
//! The [`crate::migrator`] function provides access to the migrator:
//!
//! ```ignore
//! qrmenu::migrator().run(&pool).await?;
//! ```

pub mod errors;
pub mod handlers;
pub mod models;
