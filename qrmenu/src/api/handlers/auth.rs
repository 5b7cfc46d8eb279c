//! Registration, login and token refresh.

use axum::{Json, extract::State, http::StatusCode};

use crate::{
    AppState,
    activity::RequestMeta,
    api::{
        extractors::{JsonBody, ValidatedJson},
        models::{
            ApiResponse,
            auth::{AccessTokenResponse, AuthResponse, LoginRequest, MessageResponse, RefreshRequest, RegisterRequest},
        },
    },
    errors::Result,
    services::auth::AuthService,
};

#[utoipa::path(
    post,
    path = "/auth/register",
    tag = "auth",
    summary = "Register a restaurant owner",
    request_body = RegisterRequest,
    responses(
        (status = 201, description = "Account created and signed in", body = ApiResponse<AuthResponse>),
        (status = 400, description = "Invalid email or weak password"),
        (status = 403, description = "Registration is disabled"),
        (status = 409, description = "Email already registered"),
    )
)]
#[tracing::instrument(skip_all)]
pub async fn register(
    State(state): State<AppState>,
    meta: RequestMeta,
    JsonBody(request): JsonBody<RegisterRequest>,
) -> Result<(StatusCode, Json<ApiResponse<AuthResponse>>)> {
    let response = AuthService::new(&state).register(request, &meta).await?;
    Ok((StatusCode::CREATED, Json(ApiResponse::ok(response))))
}

#[utoipa::path(
    post,
    path = "/auth/login",
    tag = "auth",
    summary = "Sign in with email and password",
    request_body = LoginRequest,
    responses(
        (status = 200, description = "Signed in", body = ApiResponse<AuthResponse>),
        (status = 400, description = "Malformed request"),
        (status = 401, description = "Invalid credentials"),
        (status = 429, description = "Too many failed attempts"),
    )
)]
#[tracing::instrument(skip_all)]
pub async fn login(
    State(state): State<AppState>,
    meta: RequestMeta,
    ValidatedJson(request): ValidatedJson<LoginRequest>,
) -> Result<Json<ApiResponse<AuthResponse>>> {
    let response = AuthService::new(&state).login(request, &meta).await?;
    Ok(Json(ApiResponse::ok(response)))
}

#[utoipa::path(
    post,
    path = "/auth/refresh",
    tag = "auth",
    summary = "Exchange a refresh token for a new access token",
    request_body = RefreshRequest,
    responses(
        (status = 200, description = "New access token", body = ApiResponse<AccessTokenResponse>),
        (status = 401, description = "Refresh token expired or invalid"),
        (status = 404, description = "User no longer exists"),
    )
)]
#[tracing::instrument(skip_all)]
pub async fn refresh(
    State(state): State<AppState>,
    ValidatedJson(request): ValidatedJson<RefreshRequest>,
) -> Result<Json<ApiResponse<AccessTokenResponse>>> {
    let response = AuthService::new(&state).refresh(request).await?;
    Ok(Json(ApiResponse::ok(response)))
}

#[utoipa::path(
    post,
    path = "/auth/logout",
    tag = "auth",
    summary = "Sign out",
    description = "Tokens are stateless, so this only tells the client to discard them.",
    responses(
        (status = 200, description = "Signed out", body = ApiResponse<MessageResponse>),
    )
)]
#[tracing::instrument(skip_all)]
pub async fn logout(State(state): State<AppState>) -> Json<ApiResponse<MessageResponse>> {
    Json(ApiResponse::ok(AuthService::new(&state).logout()))
}
