//! HTTP API.
//!
//! - **[`handlers`]**: Axum route handlers, one module per resource
//! - **[`models`]**: Request/response bodies and the success envelope
//! - **[`extractors`]**: Extractors that turn malformed input into `VALIDATION_ERROR` responses
//!
//! # API Structure
//!
//! Everything is served under `/api/v1`:
//!
//! - **Authentication** (`/auth/*`): registration, login, token refresh, logout
//! - **Restaurants** (`/restaurants/*`): the caller's restaurants and dashboard counters
//! - **Categories** (`/categories/*`) and **Menu items** (`/items/*`): menu editing
//! - **Public menus** (`/public/menu/{slug}`): anonymous QR menu pages
//! - **Admin** (`/admin/*`): platform statistics, user roles, oversight, activity log
//!
//! OpenAPI documentation is served at `/docs` when the server is running.

pub mod extractors;
pub mod handlers;
pub mod models;
