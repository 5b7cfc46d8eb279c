//! Request and response models for the HTTP API.
//!
//! Bodies are camelCase JSON. Every success is wrapped in [`ApiResponse`]; failures use
//! [`crate::errors::ErrorEnvelope`].

use serde::{Deserialize, Serialize};
use utoipa::ToSchema;

pub mod admin;
pub mod auth;
pub mod categories;
pub mod menu_items;
pub mod pagination;
pub mod public;
pub mod restaurants;
pub mod rules;
pub mod users;

/// Success envelope: `{success: true, data}`
#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct ApiResponse<T> {
    pub success: bool,
    pub data: T,
}

impl<T> ApiResponse<T> {
    pub fn ok(data: T) -> Self {
        Self { success: true, data }
    }
}
