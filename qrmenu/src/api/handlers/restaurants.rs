//! Owner restaurant endpoints. Mounted behind authentication and the tenant context.

use axum::{Json, extract::State, http::StatusCode};

use crate::{
    AppState,
    activity::RequestMeta,
    api::{
        extractors::{ValidPath, ValidatedJson},
        models::{
            ApiResponse,
            restaurants::{OwnerStats, RestaurantBody, RestaurantCreate, RestaurantList, RestaurantUpdate},
        },
    },
    errors::Result,
    services::restaurants::RestaurantService,
    types::RestaurantId,
};

#[utoipa::path(
    get,
    path = "/restaurants/stats",
    tag = "restaurants",
    summary = "Dashboard counters for the caller's restaurants",
    responses(
        (status = 200, description = "Counters; scans cover the current month", body = ApiResponse<OwnerStats>),
        (status = 401, description = "Unauthorized"),
    ),
    security(("BearerAuth" = []))
)]
#[tracing::instrument(skip_all)]
pub async fn owner_stats(State(state): State<AppState>) -> Result<Json<ApiResponse<OwnerStats>>> {
    let stats = RestaurantService::new(&state).owner_stats().await?;
    Ok(Json(ApiResponse::ok(stats)))
}

#[utoipa::path(
    get,
    path = "/restaurants",
    tag = "restaurants",
    summary = "List the caller's restaurants",
    responses(
        (status = 200, description = "Restaurants, newest first", body = ApiResponse<RestaurantList>),
        (status = 401, description = "Unauthorized"),
    ),
    security(("BearerAuth" = []))
)]
#[tracing::instrument(skip_all)]
pub async fn list_restaurants(State(state): State<AppState>) -> Result<Json<ApiResponse<RestaurantList>>> {
    let restaurants = RestaurantService::new(&state).list_mine().await?;
    Ok(Json(ApiResponse::ok(RestaurantList {
        restaurants: restaurants.as_ref().clone(),
    })))
}

#[utoipa::path(
    get,
    path = "/restaurants/{id}",
    tag = "restaurants",
    summary = "Get a restaurant",
    params(("id" = uuid::Uuid, Path, description = "Restaurant ID")),
    responses(
        (status = 200, description = "Restaurant", body = ApiResponse<RestaurantBody>),
        (status = 403, description = "Owned by someone else"),
        (status = 404, description = "Restaurant not found"),
    ),
    security(("BearerAuth" = []))
)]
#[tracing::instrument(skip_all, fields(restaurant_id = %id))]
pub async fn get_restaurant(
    State(state): State<AppState>,
    ValidPath(id): ValidPath<RestaurantId>,
) -> Result<Json<ApiResponse<RestaurantBody>>> {
    let restaurant = RestaurantService::new(&state).get(id).await?;
    Ok(Json(ApiResponse::ok(RestaurantBody { restaurant })))
}

#[utoipa::path(
    post,
    path = "/restaurants",
    tag = "restaurants",
    summary = "Create a restaurant",
    request_body = RestaurantCreate,
    responses(
        (status = 201, description = "Restaurant created", body = ApiResponse<RestaurantBody>),
        (status = 400, description = "Invalid name or slug"),
        (status = 409, description = "Slug already taken"),
    ),
    security(("BearerAuth" = []))
)]
#[tracing::instrument(skip_all)]
pub async fn create_restaurant(
    State(state): State<AppState>,
    meta: RequestMeta,
    ValidatedJson(request): ValidatedJson<RestaurantCreate>,
) -> Result<(StatusCode, Json<ApiResponse<RestaurantBody>>)> {
    let restaurant = RestaurantService::new(&state).create(request, &meta).await?;
    Ok((StatusCode::CREATED, Json(ApiResponse::ok(RestaurantBody { restaurant }))))
}

#[utoipa::path(
    patch,
    path = "/restaurants/{id}",
    tag = "restaurants",
    summary = "Update a restaurant",
    params(("id" = uuid::Uuid, Path, description = "Restaurant ID")),
    request_body = RestaurantUpdate,
    responses(
        (status = 200, description = "Restaurant updated", body = ApiResponse<RestaurantBody>),
        (status = 400, description = "Invalid field values"),
        (status = 403, description = "Owned by someone else"),
        (status = 404, description = "Restaurant not found"),
        (status = 409, description = "Slug already taken"),
    ),
    security(("BearerAuth" = []))
)]
#[tracing::instrument(skip_all, fields(restaurant_id = %id))]
pub async fn update_restaurant(
    State(state): State<AppState>,
    ValidPath(id): ValidPath<RestaurantId>,
    ValidatedJson(update): ValidatedJson<RestaurantUpdate>,
) -> Result<Json<ApiResponse<RestaurantBody>>> {
    let restaurant = RestaurantService::new(&state).update(id, update).await?;
    Ok(Json(ApiResponse::ok(RestaurantBody { restaurant })))
}

#[utoipa::path(
    delete,
    path = "/restaurants/{id}",
    tag = "restaurants",
    summary = "Delete a restaurant with its whole menu",
    params(("id" = uuid::Uuid, Path, description = "Restaurant ID")),
    responses(
        (status = 204, description = "Restaurant deleted"),
        (status = 403, description = "Owned by someone else"),
        (status = 404, description = "Restaurant not found"),
    ),
    security(("BearerAuth" = []))
)]
#[tracing::instrument(skip_all, fields(restaurant_id = %id))]
pub async fn delete_restaurant(
    State(state): State<AppState>,
    meta: RequestMeta,
    ValidPath(id): ValidPath<RestaurantId>,
) -> Result<StatusCode> {
    RestaurantService::new(&state).delete(id, &meta).await?;
    Ok(StatusCode::NO_CONTENT)
}

#[cfg(test)]
mod tests {
    use crate::{
        api::models::{ApiResponse, restaurants::RestaurantBody},
        test_utils::{bearer_for, create_test_server, create_test_state, create_test_user},
        types::Role,
    };
    use axum::http::{StatusCode, header::AUTHORIZATION};
    use serde_json::{Value, json};
    use std::future::IntoFuture;

    #[tokio::test]
    async fn test_requires_token() {
        let state = create_test_state();
        let server = create_test_server(&state);

        let response = server.get("/api/v1/restaurants").await;
        response.assert_status(StatusCode::UNAUTHORIZED);
        let body: Value = response.json();
        assert_eq!(body["error"]["message"], "No token provided");
    }

    #[tokio::test]
    async fn test_crud_round_trip() {
        let state = create_test_state();
        let server = create_test_server(&state);
        let owner = create_test_user(&state, "owner@example.com", Role::Owner).await;
        let auth = bearer_for(&state, &owner);

        let response = server
            .post("/api/v1/restaurants")
            .add_header(AUTHORIZATION, &auth)
            .json(&json!({"name": "Harbour Grill", "slug": "harbour-grill"}))
            .await;
        response.assert_status(StatusCode::CREATED);
        let created: ApiResponse<RestaurantBody> = response.json();
        let id = created.data.restaurant.id;
        assert_eq!(created.data.restaurant.menu_url, "http://localhost:5173/menu/harbour-grill");

        let response = server
            .patch(&format!("/api/v1/restaurants/{id}"))
            .add_header(AUTHORIZATION, &auth)
            .json(&json!({"primaryColor": "#112233", "contactPhone": "+44 20 7946 0000"}))
            .await;
        response.assert_status_ok();
        let body: Value = response.json();
        assert_eq!(body["data"]["restaurant"]["primaryColor"], "#112233");

        let listed: Value = server.get("/api/v1/restaurants").add_header(AUTHORIZATION, &auth).await.json();
        assert_eq!(listed["data"]["restaurants"].as_array().unwrap().len(), 1);

        let stats: Value = server
            .get("/api/v1/restaurants/stats")
            .add_header(AUTHORIZATION, &auth)
            .await
            .json();
        assert_eq!(stats["data"]["restaurants"], 1);

        server
            .delete(&format!("/api/v1/restaurants/{id}"))
            .add_header(AUTHORIZATION, &auth)
            .await
            .assert_status(StatusCode::NO_CONTENT);

        server
            .get(&format!("/api/v1/restaurants/{id}"))
            .add_header(AUTHORIZATION, &auth)
            .await
            .assert_status_not_found();
    }

    #[tokio::test]
    async fn test_invalid_slug_and_color_are_reported() {
        let state = create_test_state();
        let server = create_test_server(&state);
        let owner = create_test_user(&state, "owner@example.com", Role::Owner).await;
        let auth = bearer_for(&state, &owner);

        let response = server
            .post("/api/v1/restaurants")
            .add_header(AUTHORIZATION, &auth)
            .json(&json!({"name": "Bad", "slug": "Bad Slug"}))
            .await;
        response.assert_status(StatusCode::BAD_REQUEST);
        let body: Value = response.json();
        assert_eq!(
            body["error"]["details"][0]["message"],
            "Slug must contain only lowercase letters, numbers, and hyphens"
        );
    }

    #[tokio::test]
    async fn test_foreign_is_403_and_missing_is_404() {
        let state = create_test_state();
        let server = create_test_server(&state);
        let owner = create_test_user(&state, "owner@example.com", Role::Owner).await;
        let intruder = create_test_user(&state, "intruder@example.com", Role::Owner).await;

        let created: ApiResponse<RestaurantBody> = server
            .post("/api/v1/restaurants")
            .add_header(AUTHORIZATION, bearer_for(&state, &owner))
            .json(&json!({"name": "Private", "slug": "private"}))
            .await
            .json();
        let id = created.data.restaurant.id;

        let response = server
            .get(&format!("/api/v1/restaurants/{id}"))
            .add_header(AUTHORIZATION, bearer_for(&state, &intruder))
            .await;
        response.assert_status(StatusCode::FORBIDDEN);
        assert_eq!(response.json::<Value>()["error"]["code"], "FORBIDDEN");

        let response = server
            .get(&format!("/api/v1/restaurants/{}", uuid::Uuid::new_v4()))
            .add_header(AUTHORIZATION, bearer_for(&state, &intruder))
            .await;
        response.assert_status_not_found();
        assert_eq!(response.json::<Value>()["error"]["message"], "Restaurant not found");
    }

    #[tokio::test]
    async fn test_concurrent_duplicate_slug() {
        let state = create_test_state();
        let server = create_test_server(&state);
        let owner = create_test_user(&state, "owner@example.com", Role::Owner).await;
        let auth = bearer_for(&state, &owner);

        let first = server
            .post("/api/v1/restaurants")
            .add_header(AUTHORIZATION, &auth)
            .json(&json!({"name": "Twin", "slug": "twin"}));
        let second = server
            .post("/api/v1/restaurants")
            .add_header(AUTHORIZATION, &auth)
            .json(&json!({"name": "Twin", "slug": "twin"}));
        let (first, second) = tokio::join!(first.into_future(), second.into_future());

        let mut statuses = vec![first.status_code(), second.status_code()];
        statuses.sort();
        assert_eq!(statuses, vec![StatusCode::CREATED, StatusCode::CONFLICT]);
    }
}
