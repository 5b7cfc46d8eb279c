//! Test utilities shared by unit and HTTP tests. Everything runs against [`InMemoryStorage`].

use std::sync::Arc;

use axum_test::TestServer;
use uuid::Uuid;

use crate::{
    AppState,
    api::models::users::CurrentUser,
    auth::{
        password::{self, Argon2Params},
        tenant::TenantContext,
    },
    config::{Config, DatabaseConfig, Environment},
    db::{
        handlers::{InMemoryStorage, Storage},
        models::{
            restaurants::{RestaurantCreateDBRequest, RestaurantDBResponse},
            users::{UserCreateDBRequest, UserDBResponse},
        },
    },
    services::restaurants::qr_code_path,
    types::Role,
};

/// Password accepted by the default strength rules
pub const TEST_PASSWORD: &str = "Sup3r$ecret";

pub fn create_test_config() -> Config {
    let mut config = Config {
        environment: Environment::Test,
        database: DatabaseConfig::Memory,
        host: "127.0.0.1".to_string(),
        port: 0,
        ..Default::default()
    };

    config.auth.jwt_secret = Some("test-access-secret-at-least-32-characters".to_string());
    config.auth.jwt_refresh_secret = Some("test-refresh-secret-at-least-32-characters".to_string());

    // Cheap hashing keeps the suite fast
    config.auth.password.argon2_memory_kib = 1024;
    config.auth.password.argon2_iterations = 1;
    config.auth.password.argon2_parallelism = 1;

    // Individual tests opt back in
    config.limits.api.enabled = false;
    config.limits.auth.enabled = false;
    config.limits.public.enabled = false;

    config
}

pub fn create_test_state() -> AppState {
    create_test_state_with(create_test_config())
}

pub fn create_test_state_with(config: Config) -> AppState {
    let storage: Arc<dyn Storage> = Arc::new(InMemoryStorage::new());
    AppState::from_config(config, storage).expect("Failed to build test state")
}

pub fn create_test_server(state: &AppState) -> TestServer {
    let router = crate::build_router(state.clone()).expect("Failed to build router");
    TestServer::new(router).expect("Failed to create test server")
}

/// A user whose password is [`TEST_PASSWORD`]
pub async fn create_test_user(state: &AppState, email: &str, role: Role) -> UserDBResponse {
    let password_hash = password::hash_string_with_params(TEST_PASSWORD, Argon2Params::from(&state.config.auth.password))
        .expect("Failed to hash test password");

    state
        .storage
        .create_user(&UserCreateDBRequest {
            email: email.to_string(),
            password_hash,
            role,
        })
        .await
        .expect("Failed to create test user")
}

pub async fn create_test_restaurant(state: &AppState, owner: &UserDBResponse, slug: &str) -> RestaurantDBResponse {
    let id = Uuid::new_v4();
    state
        .storage
        .create_restaurant(&RestaurantCreateDBRequest {
            id,
            owner_id: owner.id,
            name: format!("Restaurant {slug}"),
            slug: slug.to_string(),
            qr_code_url: Some(qr_code_path(id)),
        })
        .await
        .expect("Failed to create test restaurant")
}

pub fn tenant_of(user: &UserDBResponse) -> TenantContext {
    TenantContext::from(&CurrentUser::from(user))
}

/// `Authorization` header value for `user`
pub fn bearer_for(state: &AppState, user: &UserDBResponse) -> String {
    let token = state
        .tokens
        .issue_access_token(&CurrentUser::from(user))
        .expect("Failed to issue test token");
    format!("Bearer {token}")
}
