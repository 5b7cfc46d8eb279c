//! Anonymous menu page, the target of printed QR codes.

use axum::{
    Json,
    extract::{Path, State},
    http::{
        HeaderValue,
        header::{CACHE_CONTROL, VARY},
    },
    response::{IntoResponse, Response},
};

use crate::{
    AppState,
    activity::RequestMeta,
    api::models::{ApiResponse, public::PublicMenuResponse},
    auth::current_user::MaybeUser,
    errors::Result,
    services::public::PublicMenuService,
};

const PUBLIC_CACHE_CONTROL: HeaderValue = HeaderValue::from_static("public, max-age=300");
const PUBLIC_VARY: HeaderValue = HeaderValue::from_static("Accept-Encoding");

#[utoipa::path(
    get,
    path = "/public/menu/{slug}",
    tag = "public",
    summary = "Public menu of a restaurant",
    description = "Only active categories and available items are returned. Each request is recorded as a QR scan.",
    params(("slug" = String, Path, description = "Restaurant slug")),
    responses(
        (status = 200, description = "Menu", body = ApiResponse<PublicMenuResponse>),
        (status = 400, description = "Malformed slug"),
        (status = 404, description = "Restaurant not found"),
        (status = 429, description = "Too many requests"),
    )
)]
#[tracing::instrument(skip_all, fields(slug = %slug))]
pub async fn get_public_menu(
    State(state): State<AppState>,
    MaybeUser(viewer): MaybeUser,
    meta: RequestMeta,
    Path(slug): Path<String>,
) -> Result<Response> {
    tracing::debug!(signed_in = viewer.is_some(), "Serving public menu");
    let menu = PublicMenuService::new(&state).menu_by_slug(&slug, &meta).await?;

    let body = ApiResponse::ok(PublicMenuResponse {
        restaurant: menu.as_ref().clone(),
    });
    let mut response = Json(body).into_response();
    response.headers_mut().insert(CACHE_CONTROL, PUBLIC_CACHE_CONTROL);
    response.headers_mut().insert(VARY, PUBLIC_VARY);

    Ok(response)
}
