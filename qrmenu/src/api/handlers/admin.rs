//! Admin endpoints. Mounted behind authentication, the tenant context and the ADMIN role guard.

use axum::{Json, extract::State};

use crate::{
    AppState,
    activity::RequestMeta,
    api::{
        extractors::{ValidPath, ValidQuery},
        models::{
            ApiResponse,
            admin::{AdminRestaurantBody, AdminRestaurantSummary, LogList, LogsQuery, RestaurantStats, SystemStats},
            pagination::{Paginated, Pagination},
            users::{RoleUpdate, UserBody, UserSummaryResponse},
        },
    },
    errors::Result,
    services::admin::AdminService,
    types::{RestaurantId, UserId},
};

#[utoipa::path(
    get,
    path = "/admin/stats",
    tag = "admin",
    summary = "Platform-wide statistics",
    responses(
        (status = 200, description = "Statistics", body = ApiResponse<SystemStats>),
        (status = 401, description = "Unauthorized"),
        (status = 403, description = "Not an admin"),
    ),
    security(("BearerAuth" = []))
)]
#[tracing::instrument(skip_all)]
pub async fn system_stats(State(state): State<AppState>) -> Result<Json<ApiResponse<SystemStats>>> {
    let stats = AdminService::new(&state).system_stats().await?;
    Ok(Json(ApiResponse::ok(stats.as_ref().clone())))
}

#[utoipa::path(
    get,
    path = "/admin/stats/restaurants",
    tag = "admin",
    summary = "Per-restaurant statistics",
    responses(
        (status = 200, description = "One entry per restaurant, newest first", body = ApiResponse<Vec<RestaurantStats>>),
        (status = 403, description = "Not an admin"),
    ),
    security(("BearerAuth" = []))
)]
#[tracing::instrument(skip_all)]
pub async fn restaurant_stats(State(state): State<AppState>) -> Result<Json<ApiResponse<Vec<RestaurantStats>>>> {
    let stats = AdminService::new(&state).restaurant_stats().await?;
    Ok(Json(ApiResponse::ok(stats)))
}

#[utoipa::path(
    get,
    path = "/admin/users",
    tag = "admin",
    summary = "List users",
    params(Pagination),
    responses(
        (status = 200, description = "Page of users, newest first", body = ApiResponse<Paginated<UserSummaryResponse>>),
        (status = 403, description = "Not an admin"),
    ),
    security(("BearerAuth" = []))
)]
#[tracing::instrument(skip_all)]
pub async fn list_users(
    State(state): State<AppState>,
    ValidQuery(pagination): ValidQuery<Pagination>,
) -> Result<Json<ApiResponse<Paginated<UserSummaryResponse>>>> {
    let users = AdminService::new(&state).list_users(&pagination).await?;
    Ok(Json(ApiResponse::ok(users)))
}

#[utoipa::path(
    patch,
    path = "/admin/users/{userId}/role",
    tag = "admin",
    summary = "Change a user's role",
    params(("userId" = uuid::Uuid, Path, description = "User ID")),
    request_body = RoleUpdate,
    responses(
        (status = 200, description = "Role changed", body = ApiResponse<UserBody>),
        (status = 400, description = "Admins cannot demote themselves"),
        (status = 403, description = "Not an admin"),
        (status = 404, description = "User not found"),
    ),
    security(("BearerAuth" = []))
)]
#[tracing::instrument(skip_all, fields(user_id = %user_id))]
pub async fn update_user_role(
    State(state): State<AppState>,
    meta: RequestMeta,
    ValidPath(user_id): ValidPath<UserId>,
    Json(update): Json<RoleUpdate>,
) -> Result<Json<ApiResponse<UserBody>>> {
    let user = AdminService::new(&state).update_user_role(user_id, update.role, &meta).await?;
    Ok(Json(ApiResponse::ok(UserBody { user })))
}

#[utoipa::path(
    get,
    path = "/admin/restaurants",
    tag = "admin",
    summary = "List all restaurants",
    params(Pagination),
    responses(
        (status = 200, description = "Page of restaurants, newest first", body = ApiResponse<Paginated<AdminRestaurantSummary>>),
        (status = 403, description = "Not an admin"),
    ),
    security(("BearerAuth" = []))
)]
#[tracing::instrument(skip_all)]
pub async fn list_restaurants(
    State(state): State<AppState>,
    ValidQuery(pagination): ValidQuery<Pagination>,
) -> Result<Json<ApiResponse<Paginated<AdminRestaurantSummary>>>> {
    let restaurants = AdminService::new(&state).list_restaurants(&pagination).await?;
    Ok(Json(ApiResponse::ok(restaurants)))
}

#[utoipa::path(
    get,
    path = "/admin/restaurants/{restaurantId}",
    tag = "admin",
    summary = "Get any restaurant with its full menu",
    params(("restaurantId" = uuid::Uuid, Path, description = "Restaurant ID")),
    responses(
        (status = 200, description = "Restaurant", body = ApiResponse<AdminRestaurantBody>),
        (status = 403, description = "Not an admin"),
        (status = 404, description = "Restaurant not found"),
    ),
    security(("BearerAuth" = []))
)]
#[tracing::instrument(skip_all, fields(restaurant_id = %restaurant_id))]
pub async fn get_restaurant(
    State(state): State<AppState>,
    ValidPath(restaurant_id): ValidPath<RestaurantId>,
) -> Result<Json<ApiResponse<AdminRestaurantBody>>> {
    let restaurant = AdminService::new(&state).get_restaurant(restaurant_id).await?;
    Ok(Json(ApiResponse::ok(AdminRestaurantBody { restaurant })))
}

#[utoipa::path(
    get,
    path = "/admin/logs",
    tag = "admin",
    summary = "Recent activity",
    params(LogsQuery),
    responses(
        (status = 200, description = "Entries, newest first", body = ApiResponse<LogList>),
        (status = 403, description = "Not an admin"),
    ),
    security(("BearerAuth" = []))
)]
#[tracing::instrument(skip_all)]
pub async fn logs(State(state): State<AppState>, ValidQuery(query): ValidQuery<LogsQuery>) -> Json<ApiResponse<LogList>> {
    let logs = AdminService::new(&state).logs(query.limit());
    Json(ApiResponse::ok(LogList { logs }))
}
