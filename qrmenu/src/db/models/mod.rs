//! Database record structures.
//!
//! Each module pairs a `*CreateDBRequest` / `*UpdateDBRequest` with the `*DBResponse` row it
//! produces. Rows derive [`sqlx::FromRow`] and are shared by every storage backend.

pub mod categories;
pub mod menu_items;
pub mod restaurants;
pub mod scans;
pub mod stats;
pub mod users;
