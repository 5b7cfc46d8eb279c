//! Authentication and authorization.
//!
//! # Authentication
//!
//! Clients log in via `/api/v1/auth/login` and receive a short-lived access token plus a
//! longer-lived refresh token, both JWTs signed with separate secrets (see [`tokens`]). The access
//! token is presented as `Authorization: Bearer <token>` and verified by
//! [`middleware::require_auth`], which attaches a [`CurrentUser`](crate::api::models::users::CurrentUser)
//! to the request.
//!
//! # Authorization
//!
//! Two layers:
//!
//! - **Role guard** ([`middleware::require_role`]): coarse check on the role claim, used for the
//!   admin surface.
//! - **Ownership** ([`crate::services::ownership`]): owners may only touch restaurants (and their
//!   categories and items) that they own. Services read the caller from the [`tenant`] context.
//!
//! Missing resources are reported as 404 before any ownership check yields 403.

pub mod current_user;
pub mod middleware;
pub mod password;
pub mod tenant;
pub mod tokens;
