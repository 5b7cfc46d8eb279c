//! Owner menu item endpoints. Mounted behind authentication and the tenant context.

use axum::{Json, extract::State, http::StatusCode};

use crate::{
    AppState,
    api::{
        extractors::{ValidPath, ValidatedJson},
        models::{
            ApiResponse,
            menu_items::{MenuItemBody, MenuItemCreate, MenuItemList, MenuItemUpdate},
        },
    },
    errors::Result,
    services::menu_items::MenuItemService,
    types::{CategoryId, MenuItemId},
};

#[utoipa::path(
    get,
    path = "/items/category/{categoryId}",
    tag = "menu-items",
    summary = "List the items of a category",
    params(("categoryId" = uuid::Uuid, Path, description = "Category ID")),
    responses(
        (status = 200, description = "Items ordered by sortOrder", body = ApiResponse<MenuItemList>),
        (status = 403, description = "Owned by someone else"),
        (status = 404, description = "Category not found"),
    ),
    security(("BearerAuth" = []))
)]
#[tracing::instrument(skip_all, fields(category_id = %category_id))]
pub async fn list_menu_items(
    State(state): State<AppState>,
    ValidPath(category_id): ValidPath<CategoryId>,
) -> Result<Json<ApiResponse<MenuItemList>>> {
    let items = MenuItemService::new(&state).list_by_category(category_id).await?;
    Ok(Json(ApiResponse::ok(MenuItemList {
        menu_items: items.as_ref().clone(),
    })))
}

#[utoipa::path(
    get,
    path = "/items/{id}",
    tag = "menu-items",
    summary = "Get a menu item",
    params(("id" = uuid::Uuid, Path, description = "Menu item ID")),
    responses(
        (status = 200, description = "Menu item", body = ApiResponse<MenuItemBody>),
        (status = 403, description = "Owned by someone else"),
        (status = 404, description = "Menu item not found"),
    ),
    security(("BearerAuth" = []))
)]
#[tracing::instrument(skip_all, fields(item_id = %id))]
pub async fn get_menu_item(
    State(state): State<AppState>,
    ValidPath(id): ValidPath<MenuItemId>,
) -> Result<Json<ApiResponse<MenuItemBody>>> {
    let menu_item = MenuItemService::new(&state).get(id).await?;
    Ok(Json(ApiResponse::ok(MenuItemBody { menu_item })))
}

#[utoipa::path(
    post,
    path = "/items",
    tag = "menu-items",
    summary = "Create a menu item",
    request_body = MenuItemCreate,
    responses(
        (status = 201, description = "Menu item created", body = ApiResponse<MenuItemBody>),
        (status = 400, description = "Invalid field values"),
        (status = 403, description = "Category owned by someone else"),
        (status = 404, description = "Category not found"),
    ),
    security(("BearerAuth" = []))
)]
#[tracing::instrument(skip_all)]
pub async fn create_menu_item(
    State(state): State<AppState>,
    ValidatedJson(request): ValidatedJson<MenuItemCreate>,
) -> Result<(StatusCode, Json<ApiResponse<MenuItemBody>>)> {
    let menu_item = MenuItemService::new(&state).create(request).await?;
    Ok((StatusCode::CREATED, Json(ApiResponse::ok(MenuItemBody { menu_item }))))
}

#[utoipa::path(
    patch,
    path = "/items/{id}",
    tag = "menu-items",
    summary = "Update or move a menu item",
    params(("id" = uuid::Uuid, Path, description = "Menu item ID")),
    request_body = MenuItemUpdate,
    responses(
        (status = 200, description = "Menu item updated", body = ApiResponse<MenuItemBody>),
        (status = 400, description = "Invalid field values"),
        (status = 403, description = "Item or target category owned by someone else"),
        (status = 404, description = "Menu item or target category not found"),
    ),
    security(("BearerAuth" = []))
)]
#[tracing::instrument(skip_all, fields(item_id = %id))]
pub async fn update_menu_item(
    State(state): State<AppState>,
    ValidPath(id): ValidPath<MenuItemId>,
    ValidatedJson(update): ValidatedJson<MenuItemUpdate>,
) -> Result<Json<ApiResponse<MenuItemBody>>> {
    let menu_item = MenuItemService::new(&state).update(id, update).await?;
    Ok(Json(ApiResponse::ok(MenuItemBody { menu_item })))
}

#[utoipa::path(
    delete,
    path = "/items/{id}",
    tag = "menu-items",
    summary = "Delete a menu item",
    params(("id" = uuid::Uuid, Path, description = "Menu item ID")),
    responses(
        (status = 204, description = "Menu item deleted"),
        (status = 403, description = "Owned by someone else"),
        (status = 404, description = "Menu item not found"),
    ),
    security(("BearerAuth" = []))
)]
#[tracing::instrument(skip_all, fields(item_id = %id))]
pub async fn delete_menu_item(State(state): State<AppState>, ValidPath(id): ValidPath<MenuItemId>) -> Result<StatusCode> {
    MenuItemService::new(&state).delete(id).await?;
    Ok(StatusCode::NO_CONTENT)
}
