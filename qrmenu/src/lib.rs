//! # qrmenu: multi-tenant restaurant menus behind QR codes
//!
//! `qrmenu` is the backend of a restaurant menu platform. Restaurant owners sign up, create one
//! or more restaurants, and organise each menu into categories of dishes. Every restaurant gets a
//! public page at `{public_menu_base_url}/menu/{slug}` which the printed QR code points at; each
//! anonymous visit to that page is recorded as a scan. Administrators see platform-wide
//! statistics, manage user roles and can inspect any restaurant.
//!
//! ## Architecture
//!
//! The HTTP layer is [Axum](https://github.com/tokio-rs/axum). Persistence sits behind the
//! [`db::handlers::Storage`] trait with two backends: PostgreSQL (via `sqlx`, migrated on startup)
//! and an in-process store used by tests and throwaway deployments.
//!
//! ### Request Flow
//!
//! Every request under `/api/v1` passes the global rate limiter. Owner routes then require a
//! bearer access token ([`auth::middleware::require_auth`]); the decoded identity is installed as
//! a task-local [`auth::tenant::TenantContext`] for the rest of the request, and the
//! [`services`] layer checks every restaurant, category and menu item it touches against that
//! tenant. Admin routes additionally pass the role guard. Public menu routes accept anonymous
//! callers and have their own, tighter rate limiter.
//!
//! Reads of owner lists, public menus and admin statistics go through a process-local TTL cache
//! ([`cache`]); every mutation invalidates the keys it affects.
//!
//! ### Core Components
//!
//! - [`api`]: handlers, request/response models and extractors
//! - [`auth`]: JWT access/refresh tokens, Argon2 password hashing, middleware, tenant context
//! - [`services`]: business rules, ownership checks and cache invalidation
//! - [`db`]: the storage trait, its backends and database models
//! - [`limits`]: fixed-window rate limiting per client IP
//! - [`activity`]: the in-memory admin activity log
//!
//! ## Quick Start
//!
//! ```no_run
//! use clap::Parser;
//! use qrmenu::{Application, Config};
//!
//! #[tokio::main]
//! async fn main() -> anyhow::Result<()> {
//!     let args = qrmenu::config::Args::parse();
//!     let config = Config::load(&args)?;
//!
//!     qrmenu::telemetry::init_telemetry(config.log_format)?;
//!
//!     let app = Application::new(config).await?;
//!     app.serve(async {
//!         let _ = tokio::signal::ctrl_c().await;
//!     })
//!     .await
//! }
//! ```
//!
//! ## Configuration
//!
//! See the [`config`] module for configuration options.
pub mod activity;
pub mod api;
pub mod auth;
pub mod cache;
pub mod config;
pub mod db;
pub mod errors;
pub mod limits;
mod openapi;
pub mod services;
pub mod telemetry;
pub mod types;

#[cfg(test)]
pub mod test_utils;

use std::{net::SocketAddr, sync::Arc, time::Duration};

use axum::{
    Json, Router,
    extract::OriginalUri,
    http::{HeaderValue, Method, StatusCode, header},
    middleware::{from_fn, from_fn_with_state},
    response::IntoResponse,
    routing::{get, post},
};
use bon::Builder;
use chrono::Utc;
use serde_json::json;
use sqlx::{PgPool, postgres::PgPoolOptions};
use tokio::net::TcpListener;
use tokio_util::sync::CancellationToken;
use tower_http::{
    cors::{AllowOrigin, CorsLayer},
    trace::{DefaultMakeSpan, DefaultOnRequest, DefaultOnResponse, TraceLayer},
};
use tracing::{Level, debug, info, instrument, warn};
use utoipa::OpenApi;
use utoipa_scalar::{Scalar, Servable};

pub use config::Config;

use crate::{
    activity::ActivityLog,
    api::models::rules::normalize_email,
    auth::{
        middleware::{AllowedRoles, optional_auth, require_auth, require_role},
        password::{self, Argon2Params},
        tenant::install_tenant_context,
        tokens::TokenService,
    },
    config::{CorsOrigin, DatabaseConfig},
    db::{
        handlers::{InMemoryStorage, PostgresStorage, Storage},
        models::users::UserCreateDBRequest,
    },
    errors::{Error, ErrorEnvelope},
    limits::{Limiters, rate_limit},
    openapi::ApiDoc,
    services::AppCache,
    types::{Role, UserId},
};

/// Application state shared across all request handlers.
///
/// Cheap to clone: everything behind it is reference counted.
///
/// # Example
///
/// ```ignore
/// let state = AppState::builder()
///     .config(Arc::new(config))
///     .storage(storage)
///     .tokens(Arc::new(tokens))
///     .cache(cache)
///     .limiters(limiters)
///     .activity(Arc::new(ActivityLog::new(1000)))
///     .build();
/// ```
#[derive(Clone, Builder)]
pub struct AppState {
    pub config: Arc<Config>,
    pub storage: Arc<dyn Storage>,
    pub tokens: Arc<TokenService>,
    pub cache: AppCache,
    #[builder(default)]
    pub limiters: Limiters,
    pub activity: Arc<ActivityLog>,
}

impl AppState {
    /// Derive the token service, cache, limiters and activity log from `config`.
    pub fn from_config(config: Config, storage: Arc<dyn Storage>) -> Result<Self, Error> {
        let tokens = TokenService::from_config(&config.auth)?;

        Ok(Self::builder()
            .cache(AppCache::from_config(&config.cache))
            .limiters(Limiters::new(&config.limits))
            .activity(Arc::new(ActivityLog::new(config.activity_log_capacity)))
            .tokens(Arc::new(tokens))
            .storage(storage)
            .config(Arc::new(config))
            .build())
    }
}

/// Get the qrmenu database migrator
pub fn migrator() -> sqlx::migrate::Migrator {
    sqlx::migrate!("./migrations")
}

/// Create the bootstrap admin user, or bring an existing account up to date.
///
/// Idempotent: an existing user with `email` is promoted to ADMIN and gets `password` as its new
/// password. Returns the user's ID either way.
#[instrument(skip_all)]
pub async fn create_initial_admin_user(
    email: &str,
    password: &str,
    storage: &dyn Storage,
    params: Argon2Params,
) -> Result<UserId, Error> {
    let email = normalize_email(email);
    let password_hash = password::hash_blocking(password.to_string(), params).await?;

    if let Some(existing) = storage.get_user_by_email(&email).await? {
        if existing.role != Role::Admin {
            storage.update_user_role(existing.id, Role::Admin).await?;
        }
        storage.update_user_password(existing.id, &password_hash).await?;
        debug!(user_id = %existing.id, "Bootstrap admin already exists, updated");
        return Ok(existing.id);
    }

    let created = storage
        .create_user(&UserCreateDBRequest {
            email,
            password_hash,
            role: Role::Admin,
        })
        .await?;

    info!(user_id = %created.id, "Created bootstrap admin user");
    Ok(created.id)
}

/// Connect to the configured backend, running migrations for PostgreSQL.
async fn setup_storage(config: &Config) -> anyhow::Result<(Arc<dyn Storage>, Option<PgPool>)> {
    match &config.database {
        DatabaseConfig::Memory => {
            info!("Using in-memory storage; data will be lost on shutdown");
            Ok((Arc::new(InMemoryStorage::new()), None))
        }
        DatabaseConfig::External { url, max_connections } => {
            info!("Using external database");
            let pool = PgPoolOptions::new().max_connections(*max_connections).connect(url).await?;
            migrator().run(&pool).await?;
            Ok((Arc::new(PostgresStorage::new(pool.clone())), Some(pool)))
        }
    }
}

/// Create CORS layer from configuration
fn create_cors_layer(config: &Config) -> anyhow::Result<CorsLayer> {
    let allow_origin = if config.cors.allowed_origins.iter().any(|o| matches!(o, CorsOrigin::Wildcard)) {
        AllowOrigin::any()
    } else {
        let mut origins = Vec::new();
        for origin in &config.cors.allowed_origins {
            if let CorsOrigin::Url(url) = origin {
                origins.push(url.as_str().trim_end_matches('/').parse::<HeaderValue>()?);
            }
        }
        AllowOrigin::list(origins)
    };

    let mut cors = CorsLayer::new()
        .allow_origin(allow_origin)
        .allow_credentials(config.cors.allow_credentials)
        .allow_methods([Method::GET, Method::POST, Method::PATCH, Method::DELETE, Method::OPTIONS])
        .allow_headers([header::AUTHORIZATION, header::CONTENT_TYPE])
        .expose_headers([
            limits::RATELIMIT_LIMIT,
            limits::RATELIMIT_REMAINING,
            limits::RATELIMIT_RESET,
            header::RETRY_AFTER,
        ]);

    if let Some(max_age) = config.cors.max_age {
        cors = cors.max_age(Duration::from_secs(max_age));
    }

    Ok(cors)
}

async fn health() -> Json<serde_json::Value> {
    Json(json!({
        "success": true,
        "timestamp": Utc::now(),
    }))
}

async fn route_not_found(method: Method, OriginalUri(uri): OriginalUri) -> impl IntoResponse {
    let message = format!("Route {method} {} not found", uri.path());
    (StatusCode::NOT_FOUND, Json(ErrorEnvelope::new("NOT_FOUND", message, None)))
}

/// Build the main application router with all endpoints and middleware.
///
/// - `/health` and the OpenAPI docs at the root
/// - `/api/v1/auth/*` behind the auth limiter
/// - owner routes behind [`require_auth`] and the tenant context
/// - `/api/v1/public/*` behind the public limiter and [`optional_auth`]
/// - `/api/v1/admin/*` behind authentication and the ADMIN role guard
///
/// The whole `/api/v1` tree sits behind the api limiter. Any limiter that is disabled in the
/// configuration is simply not installed.
#[instrument(skip_all)]
pub fn build_router(state: AppState) -> anyhow::Result<Router> {
    use api::handlers::{admin, auth, categories, menu_items, public, restaurants};

    let auth_routes = Router::new()
        .route("/auth/register", post(auth::register))
        .route("/auth/login", post(auth::login))
        .route("/auth/refresh", post(auth::refresh))
        .route("/auth/logout", post(auth::logout));
    let auth_routes = match &state.limiters.auth {
        Some(limiter) => auth_routes.route_layer(from_fn_with_state(limiter.clone(), rate_limit)),
        None => auth_routes,
    };

    let owner_routes = Router::new()
        // Restaurants
        .route("/restaurants/stats", get(restaurants::owner_stats))
        .route("/restaurants", get(restaurants::list_restaurants).post(restaurants::create_restaurant))
        .route(
            "/restaurants/{id}",
            get(restaurants::get_restaurant)
                .patch(restaurants::update_restaurant)
                .delete(restaurants::delete_restaurant),
        )
        // Categories
        .route("/categories/restaurant/{restaurantId}", get(categories::list_categories))
        .route("/categories", post(categories::create_category))
        .route(
            "/categories/{id}",
            get(categories::get_category)
                .patch(categories::update_category)
                .delete(categories::delete_category),
        )
        // Menu items
        .route("/items/category/{categoryId}", get(menu_items::list_menu_items))
        .route("/items", post(menu_items::create_menu_item))
        .route(
            "/items/{id}",
            get(menu_items::get_menu_item)
                .patch(menu_items::update_menu_item)
                .delete(menu_items::delete_menu_item),
        )
        .route_layer(from_fn(install_tenant_context))
        .route_layer(from_fn_with_state(state.clone(), require_auth));

    let admin_routes = Router::new()
        .route("/admin/stats", get(admin::system_stats))
        .route("/admin/stats/restaurants", get(admin::restaurant_stats))
        .route("/admin/users", get(admin::list_users))
        .route("/admin/users/{userId}/role", axum::routing::patch(admin::update_user_role))
        .route("/admin/restaurants", get(admin::list_restaurants))
        .route("/admin/restaurants/{restaurantId}", get(admin::get_restaurant))
        .route("/admin/logs", get(admin::logs))
        .route_layer(from_fn(install_tenant_context))
        .route_layer(from_fn_with_state(AllowedRoles(&[Role::Admin]), require_role))
        .route_layer(from_fn_with_state(state.clone(), require_auth));

    let public_routes = Router::new()
        .route("/public/menu/{slug}", get(public::get_public_menu))
        .route_layer(from_fn_with_state(state.clone(), optional_auth));
    let public_routes = match &state.limiters.public {
        Some(limiter) => public_routes.route_layer(from_fn_with_state(limiter.clone(), rate_limit)),
        None => public_routes,
    };

    let api_routes = Router::new()
        .merge(auth_routes)
        .merge(owner_routes)
        .merge(admin_routes)
        .merge(public_routes)
        .with_state(state.clone());
    let api_routes = match &state.limiters.api {
        Some(limiter) => api_routes.layer(from_fn_with_state(limiter.clone(), rate_limit)),
        None => api_routes,
    };

    let mut router = Router::new()
        .route("/health", get(health))
        .route("/api-docs/openapi.json", get(|| async { Json(ApiDoc::openapi()) }))
        .nest("/api/v1", api_routes)
        .merge(Scalar::with_url("/docs", ApiDoc::openapi()))
        .fallback(route_not_found);

    if !state.config.is_production() {
        router = router.layer(from_fn(errors::expose_error_details));
    }

    let router = router.layer(create_cors_layer(&state.config)?).layer(
        TraceLayer::new_for_http()
            .make_span_with(DefaultMakeSpan::new().level(Level::INFO))
            .on_request(DefaultOnRequest::new().level(Level::INFO))
            .on_response(DefaultOnResponse::new().level(Level::INFO)),
    );

    Ok(router)
}

/// Periodically purge expired cache entries and rate-limit windows until `shutdown` fires.
fn spawn_sweeper(state: AppState, shutdown: CancellationToken) -> tokio::task::JoinHandle<()> {
    let period = state.config.cache.check_period;

    tokio::spawn(async move {
        let mut ticker = tokio::time::interval(period);
        ticker.tick().await;

        loop {
            tokio::select! {
                _ = shutdown.cancelled() => break,
                _ = ticker.tick() => {
                    state.cache.sweep().await;
                    let dropped = state.limiters.sweep();
                    tracing::trace!(dropped, "Swept expired rate-limit windows");
                }
            }
        }
    })
}

/// Main application struct that owns all resources and lifecycle.
///
/// 1. **Create**: [`Application::new`] connects storage, runs migrations, bootstraps the admin
///    account and builds the router
/// 2. **Serve**: [`Application::serve`] binds to a TCP port, starts the sweeper and handles
///    requests until the shutdown future resolves
pub struct Application {
    router: Router,
    app_state: AppState,
    pool: Option<PgPool>,
}

impl Application {
    /// Create a new application instance with all resources initialized
    pub async fn new(config: Config) -> anyhow::Result<Self> {
        debug!("Starting qrmenu with configuration: {:#?}", config);

        let (storage, pool) = setup_storage(&config).await?;

        match (config.admin_email.as_deref(), config.admin_password.as_deref()) {
            (Some(email), Some(password)) => {
                create_initial_admin_user(email, password, storage.as_ref(), Argon2Params::from(&config.auth.password))
                    .await
                    .map_err(|e| anyhow::anyhow!("Failed to create initial admin user: {e}"))?;
            }
            (Some(_), None) => warn!("admin_email is set without admin_password; skipping admin bootstrap"),
            _ => {}
        }

        let app_state = AppState::from_config(config, storage)?;
        let router = build_router(app_state.clone())?;

        Ok(Self { router, app_state, pool })
    }

    /// Convert application into a test server (for tests)
    #[cfg(test)]
    pub fn into_test_server(self) -> axum_test::TestServer {
        axum_test::TestServer::new(self.router).expect("Failed to create test server")
    }

    /// Start serving the application
    pub async fn serve<F>(self, shutdown: F) -> anyhow::Result<()>
    where
        F: std::future::Future<Output = ()> + Send + 'static,
    {
        let bind_addr = self.app_state.config.bind_address();
        let listener = TcpListener::bind(&bind_addr).await?;
        info!(
            "qrmenu listening on http://{}, available at http://localhost:{}",
            bind_addr, self.app_state.config.port
        );

        let shutdown_token = CancellationToken::new();
        let sweeper = spawn_sweeper(self.app_state.clone(), shutdown_token.clone());

        axum::serve(listener, self.router.into_make_service_with_connect_info::<SocketAddr>())
            .with_graceful_shutdown(shutdown)
            .await?;

        shutdown_token.cancel();
        let _ = sweeper.await;

        if let Some(pool) = self.pool {
            info!("Closing database connections...");
            pool.close().await;
        }

        Ok(())
    }
}
