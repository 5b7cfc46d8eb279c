//! Owner category endpoints. Mounted behind authentication and the tenant context.

use axum::{Json, extract::State, http::StatusCode};

use crate::{
    AppState,
    api::{
        extractors::{ValidPath, ValidatedJson},
        models::{
            ApiResponse,
            categories::{CategoryBody, CategoryCreate, CategoryList, CategoryUpdate},
        },
    },
    errors::Result,
    services::categories::CategoryService,
    types::{CategoryId, RestaurantId},
};

#[utoipa::path(
    get,
    path = "/categories/restaurant/{restaurantId}",
    tag = "categories",
    summary = "List a restaurant's categories with their items",
    params(("restaurantId" = uuid::Uuid, Path, description = "Restaurant ID")),
    responses(
        (status = 200, description = "Categories ordered by sortOrder", body = ApiResponse<CategoryList>),
        (status = 403, description = "Owned by someone else"),
        (status = 404, description = "Restaurant not found"),
    ),
    security(("BearerAuth" = []))
)]
#[tracing::instrument(skip_all, fields(restaurant_id = %restaurant_id))]
pub async fn list_categories(
    State(state): State<AppState>,
    ValidPath(restaurant_id): ValidPath<RestaurantId>,
) -> Result<Json<ApiResponse<CategoryList>>> {
    let categories = CategoryService::new(&state).list_by_restaurant(restaurant_id).await?;
    Ok(Json(ApiResponse::ok(CategoryList {
        categories: categories.as_ref().clone(),
    })))
}

#[utoipa::path(
    get,
    path = "/categories/{id}",
    tag = "categories",
    summary = "Get a category with its items",
    params(("id" = uuid::Uuid, Path, description = "Category ID")),
    responses(
        (status = 200, description = "Category", body = ApiResponse<CategoryBody>),
        (status = 403, description = "Owned by someone else"),
        (status = 404, description = "Category not found"),
    ),
    security(("BearerAuth" = []))
)]
#[tracing::instrument(skip_all, fields(category_id = %id))]
pub async fn get_category(
    State(state): State<AppState>,
    ValidPath(id): ValidPath<CategoryId>,
) -> Result<Json<ApiResponse<CategoryBody>>> {
    let category = CategoryService::new(&state).get(id).await?;
    Ok(Json(ApiResponse::ok(CategoryBody { category })))
}

#[utoipa::path(
    post,
    path = "/categories",
    tag = "categories",
    summary = "Create a category",
    request_body = CategoryCreate,
    responses(
        (status = 201, description = "Category created", body = ApiResponse<CategoryBody>),
        (status = 400, description = "Invalid field values"),
        (status = 403, description = "Restaurant owned by someone else"),
        (status = 404, description = "Restaurant not found"),
        (status = 409, description = "Name already used in this restaurant"),
    ),
    security(("BearerAuth" = []))
)]
#[tracing::instrument(skip_all)]
pub async fn create_category(
    State(state): State<AppState>,
    ValidatedJson(request): ValidatedJson<CategoryCreate>,
) -> Result<(StatusCode, Json<ApiResponse<CategoryBody>>)> {
    let category = CategoryService::new(&state).create(request).await?;
    Ok((StatusCode::CREATED, Json(ApiResponse::ok(CategoryBody { category }))))
}

#[utoipa::path(
    patch,
    path = "/categories/{id}",
    tag = "categories",
    summary = "Update a category",
    params(("id" = uuid::Uuid, Path, description = "Category ID")),
    request_body = CategoryUpdate,
    responses(
        (status = 200, description = "Category updated", body = ApiResponse<CategoryBody>),
        (status = 400, description = "Invalid field values"),
        (status = 403, description = "Owned by someone else"),
        (status = 404, description = "Category not found"),
        (status = 409, description = "Name already used in this restaurant"),
    ),
    security(("BearerAuth" = []))
)]
#[tracing::instrument(skip_all, fields(category_id = %id))]
pub async fn update_category(
    State(state): State<AppState>,
    ValidPath(id): ValidPath<CategoryId>,
    ValidatedJson(update): ValidatedJson<CategoryUpdate>,
) -> Result<Json<ApiResponse<CategoryBody>>> {
    let category = CategoryService::new(&state).update(id, update).await?;
    Ok(Json(ApiResponse::ok(CategoryBody { category })))
}

#[utoipa::path(
    delete,
    path = "/categories/{id}",
    tag = "categories",
    summary = "Delete a category and its items",
    params(("id" = uuid::Uuid, Path, description = "Category ID")),
    responses(
        (status = 204, description = "Category deleted"),
        (status = 403, description = "Owned by someone else"),
        (status = 404, description = "Category not found"),
    ),
    security(("BearerAuth" = []))
)]
#[tracing::instrument(skip_all, fields(category_id = %id))]
pub async fn delete_category(State(state): State<AppState>, ValidPath(id): ValidPath<CategoryId>) -> Result<StatusCode> {
    CategoryService::new(&state).delete(id).await?;
    Ok(StatusCode::NO_CONTENT)
}

#[cfg(test)]
mod tests {
    use crate::{
        test_utils::{bearer_for, create_test_restaurant, create_test_server, create_test_state, create_test_user},
        types::Role,
    };
    use axum::http::{StatusCode, header::AUTHORIZATION};
    use serde_json::{Value, json};

    #[tokio::test]
    async fn test_create_list_and_conflict() {
        let state = create_test_state();
        let server = create_test_server(&state);
        let owner = create_test_user(&state, "owner@example.com", Role::Owner).await;
        let restaurant = create_test_restaurant(&state, &owner, "bistro").await;
        let auth = bearer_for(&state, &owner);

        let response = server
            .post("/api/v1/categories")
            .add_header(AUTHORIZATION, &auth)
            .json(&json!({"restaurantId": restaurant.id, "name": "Desserts", "sortOrder": 5}))
            .await;
        response.assert_status(StatusCode::CREATED);
        let body: Value = response.json();
        assert_eq!(body["data"]["category"]["isActive"], true);
        assert_eq!(body["data"]["category"]["items"], json!([]));

        server
            .post("/api/v1/categories")
            .add_header(AUTHORIZATION, &auth)
            .json(&json!({"restaurantId": restaurant.id, "name": "Starters"}))
            .await
            .assert_status(StatusCode::CREATED);

        let response = server
            .post("/api/v1/categories")
            .add_header(AUTHORIZATION, &auth)
            .json(&json!({"restaurantId": restaurant.id, "name": "Desserts"}))
            .await;
        response.assert_status(StatusCode::CONFLICT);
        assert_eq!(
            response.json::<Value>()["error"]["message"],
            "Category with this name already exists in this restaurant"
        );

        let listed: Value = server
            .get(&format!("/api/v1/categories/restaurant/{}", restaurant.id))
            .add_header(AUTHORIZATION, &auth)
            .await
            .json();
        let names: Vec<&str> = listed["data"]["categories"]
            .as_array()
            .unwrap()
            .iter()
            .map(|c| c["name"].as_str().unwrap())
            .collect();
        assert_eq!(names, ["Starters", "Desserts"]);
    }

    #[tokio::test]
    async fn test_negative_sort_order_rejected() {
        let state = create_test_state();
        let server = create_test_server(&state);
        let owner = create_test_user(&state, "owner@example.com", Role::Owner).await;
        let restaurant = create_test_restaurant(&state, &owner, "bistro").await;

        let response = server
            .post("/api/v1/categories")
            .add_header(AUTHORIZATION, bearer_for(&state, &owner))
            .json(&json!({"restaurantId": restaurant.id, "name": "Odd", "sortOrder": -1}))
            .await;
        response.assert_status(StatusCode::BAD_REQUEST);
        let body: Value = response.json();
        assert_eq!(body["error"]["details"][0]["message"], "Sort order must be positive");
    }

    #[tokio::test]
    async fn test_delete_then_get_is_404() {
        let state = create_test_state();
        let server = create_test_server(&state);
        let owner = create_test_user(&state, "owner@example.com", Role::Owner).await;
        let restaurant = create_test_restaurant(&state, &owner, "bistro").await;
        let auth = bearer_for(&state, &owner);

        let created: Value = server
            .post("/api/v1/categories")
            .add_header(AUTHORIZATION, &auth)
            .json(&json!({"restaurantId": restaurant.id, "name": "Mains"}))
            .await
            .json();
        let id = created["data"]["category"]["id"].as_str().unwrap().to_string();

        server
            .delete(&format!("/api/v1/categories/{id}"))
            .add_header(AUTHORIZATION, &auth)
            .await
            .assert_status(StatusCode::NO_CONTENT);
        server
            .get(&format!("/api/v1/categories/{id}"))
            .add_header(AUTHORIZATION, &auth)
            .await
            .assert_status_not_found();
    }
}
