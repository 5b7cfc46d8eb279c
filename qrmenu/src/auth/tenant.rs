//! Request-scoped tenant context.
//!
//! After authentication the caller's identity is installed in a task-local for the lifetime of the
//! downstream handler, so services can read "who is asking" without threading it through every
//! call. Each request runs on its own task, so contexts never leak between requests.

use axum::{extract::Request, middleware::Next, response::Response};

use crate::{
    api::models::users::CurrentUser,
    errors::{Error, Result},
    types::{Role, UserId},
};

tokio::task_local! {
    static TENANT: TenantContext;
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TenantContext {
    pub user_id: UserId,
    pub email: String,
    pub role: Role,
}

impl From<&CurrentUser> for TenantContext {
    fn from(user: &CurrentUser) -> Self {
        Self {
            user_id: user.id,
            email: user.email.clone(),
            role: user.role,
        }
    }
}

impl TenantContext {
    /// Run `fut` with `ctx` installed as the current tenant
    pub async fn scope<F>(ctx: TenantContext, fut: F) -> F::Output
    where
        F: Future,
    {
        TENANT.scope(ctx, fut).await
    }

    /// The current tenant, if one is installed
    pub fn get() -> Option<TenantContext> {
        TENANT.try_with(Clone::clone).ok()
    }

    pub fn get_or_fail() -> Result<TenantContext> {
        Self::get().ok_or_else(|| Error::Internal {
            operation: "Tenant context not initialized - this endpoint requires authentication".to_string(),
        })
    }

    pub fn user_id(&self) -> UserId {
        self.user_id
    }

    pub fn is_admin(&self) -> bool {
        self.role == Role::Admin
    }
}

/// Install the authenticated caller as the tenant for the rest of the request.
///
/// Must run after [`super::middleware::require_auth`] or [`super::middleware::optional_auth`];
/// without an identity in the request extensions it passes the request through untouched.
pub async fn install_tenant_context(request: Request, next: Next) -> Response {
    match request.extensions().get::<CurrentUser>().map(TenantContext::from) {
        Some(ctx) => TenantContext::scope(ctx, next.run(request)).await,
        None => next.run(request).await,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::{Extension, Json, Router, middleware::from_fn, routing::get};
    use axum_test::TestServer;
    use uuid::Uuid;

    fn ctx(role: Role) -> TenantContext {
        TenantContext {
            user_id: Uuid::new_v4(),
            email: "tenant@example.com".to_string(),
            role,
        }
    }

    #[tokio::test]
    async fn test_context_visible_inside_scope_only() {
        let owner = ctx(Role::Owner);
        assert!(TenantContext::get().is_none());

        let seen = TenantContext::scope(owner.clone(), async { TenantContext::get() }).await;
        assert_eq!(seen, Some(owner));

        assert!(TenantContext::get().is_none());
    }

    #[tokio::test]
    async fn test_get_or_fail_outside_request() {
        let err = TenantContext::get_or_fail().unwrap_err();
        assert!(matches!(err, Error::Internal { ref operation } if operation.contains("Tenant context not initialized")));
    }

    #[tokio::test]
    async fn test_concurrent_scopes_are_isolated() {
        let a = ctx(Role::Owner);
        let b = ctx(Role::Admin);

        let task_a = tokio::spawn(TenantContext::scope(a.clone(), async {
            tokio::task::yield_now().await;
            TenantContext::get_or_fail().map(|c| c.user_id)
        }));
        let task_b = tokio::spawn(TenantContext::scope(b.clone(), async {
            tokio::task::yield_now().await;
            TenantContext::get_or_fail().map(|c| c.is_admin())
        }));

        assert_eq!(task_a.await.unwrap().unwrap(), a.user_id);
        assert!(task_b.await.unwrap().unwrap());
    }

    async fn whoami() -> Json<Option<String>> {
        Json(TenantContext::get().map(|c| c.email))
    }

    #[tokio::test]
    async fn test_middleware_installs_context_from_extension() {
        let user = CurrentUser {
            id: Uuid::new_v4(),
            email: "owner@example.com".to_string(),
            role: Role::Owner,
        };

        let app: Router = Router::new()
            .route("/whoami", get(whoami))
            .layer(from_fn(install_tenant_context))
            .layer(Extension(user));
        let server = TestServer::new(app).unwrap();

        let email: Option<String> = server.get("/whoami").await.json();
        assert_eq!(email.as_deref(), Some("owner@example.com"));
    }

    #[tokio::test]
    async fn test_middleware_is_noop_without_identity() {
        let app: Router = Router::new().route("/whoami", get(whoami)).layer(from_fn(install_tenant_context));
        let server = TestServer::new(app).unwrap();

        let email: Option<String> = server.get("/whoami").await.json();
        assert!(email.is_none());
    }
}
