use axum::{extract::FromRequestParts, http::request::Parts};

use crate::{api::models::users::CurrentUser, errors::Error};

/// Extract the identity attached by [`super::middleware::require_auth`].
///
/// Handlers mounted without the auth middleware always get a 401 here.
impl<S> FromRequestParts<S> for CurrentUser
where
    S: Send + Sync,
{
    type Rejection = Error;

    async fn from_request_parts(parts: &mut Parts, _state: &S) -> Result<Self, Self::Rejection> {
        parts
            .extensions
            .get::<CurrentUser>()
            .cloned()
            .ok_or(Error::Unauthenticated { message: None })
    }
}

/// Identity if one was attached, for routes behind [`super::middleware::optional_auth`]
#[derive(Debug, Clone)]
pub struct MaybeUser(pub Option<CurrentUser>);

impl<S> FromRequestParts<S> for MaybeUser
where
    S: Send + Sync,
{
    type Rejection = Error;

    async fn from_request_parts(parts: &mut Parts, _state: &S) -> Result<Self, Self::Rejection> {
        Ok(MaybeUser(parts.extensions.get::<CurrentUser>().cloned()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::Role;
    use axum::{Extension, Json, Router, http::StatusCode, routing::get};
    use axum_test::TestServer;
    use uuid::Uuid;

    async fn me(user: CurrentUser) -> Json<CurrentUser> {
        Json(user)
    }

    #[tokio::test]
    async fn test_extractor_reads_extension() {
        let user = CurrentUser {
            id: Uuid::new_v4(),
            email: "owner@example.com".to_string(),
            role: Role::Owner,
        };
        let app: Router = Router::new().route("/me", get(me)).layer(Extension(user.clone()));
        let server = TestServer::new(app).unwrap();

        let response = server.get("/me").await;
        response.assert_status_ok();
        assert_eq!(response.json::<CurrentUser>().id, user.id);
    }

    #[tokio::test]
    async fn test_extractor_without_identity_is_unauthorized() {
        let app: Router = Router::new().route("/me", get(me));
        let server = TestServer::new(app).unwrap();

        server.get("/me").await.assert_status(StatusCode::UNAUTHORIZED);
    }
}
