//! Bearer token authentication and the role guard.

use axum::{
    extract::{Request, State},
    http::{HeaderMap, header::AUTHORIZATION},
    middleware::Next,
    response::Response,
};
use tracing::{debug, trace};

use crate::{
    AppState,
    api::models::users::CurrentUser,
    errors::Error,
    types::{Operation, Role},
};

/// Pull the token out of `Authorization: Bearer <token>`
fn bearer_token(headers: &HeaderMap) -> Option<&str> {
    headers
        .get(AUTHORIZATION)?
        .to_str()
        .ok()?
        .strip_prefix("Bearer ")
        .map(str::trim)
        .filter(|token| !token.is_empty())
}

/// Reject requests without a valid access token; otherwise attach the caller's identity.
pub async fn require_auth(State(state): State<AppState>, mut request: Request, next: Next) -> Result<Response, Error> {
    let token = bearer_token(request.headers()).ok_or_else(|| Error::Unauthenticated {
        message: Some("No token provided".to_string()),
    })?;

    let claims = state.tokens.verify_access_token(token)?;
    trace!(user_id = %claims.user_id, role = %claims.role, "Authenticated request");

    request.extensions_mut().insert(CurrentUser::from(claims));
    Ok(next.run(request).await)
}

/// Attach the caller's identity when a valid token is present. Never rejects.
pub async fn optional_auth(State(state): State<AppState>, mut request: Request, next: Next) -> Response {
    if let Some(token) = bearer_token(request.headers()) {
        match state.tokens.verify_access_token(token) {
            Ok(claims) => {
                request.extensions_mut().insert(CurrentUser::from(claims));
            }
            Err(e) => debug!("Ignoring rejected token on optional-auth route: {e}"),
        }
    }

    next.run(request).await
}

/// Roles admitted by a [`require_role`] layer
#[derive(Debug, Clone, Copy)]
pub struct AllowedRoles(pub &'static [Role]);

pub fn check_role(identity: Option<&CurrentUser>, allowed: &[Role]) -> Result<(), Error> {
    let user = identity.ok_or(Error::Unauthenticated { message: None })?;

    if allowed.contains(&user.role) {
        Ok(())
    } else {
        Err(Error::InsufficientPermissions {
            action: Operation::Administer,
            resource: "the platform".to_string(),
        })
    }
}

/// Must be layered inside [`require_auth`].
pub async fn require_role(State(allowed): State<AllowedRoles>, request: Request, next: Next) -> Result<Response, Error> {
    check_role(request.extensions().get::<CurrentUser>(), allowed.0)?;
    Ok(next.run(request).await)
}
