//! HTTP request handlers.
//!
//! Handlers are thin: they extract and validate input, call into [`crate::services`], and wrap
//! the result in [`ApiResponse`](crate::api::models::ApiResponse). Ownership checks happen in the
//! services against the request's [`TenantContext`](crate::auth::tenant::TenantContext).
//!
//! - [`admin`]: platform statistics, user roles, restaurant oversight, activity log
//! - [`auth`]: registration, login, refresh, logout
//! - [`categories`]: category CRUD within an owned restaurant
//! - [`menu_items`]: menu item CRUD within an owned category
//! - [`public`]: anonymous menu pages, recorded as QR scans
//! - [`restaurants`]: the caller's restaurants and dashboard counters

pub mod admin;
pub mod auth;
pub mod categories;
pub mod menu_items;
pub mod public;
pub mod restaurants;
