//! OpenAPI documentation for the `/api/v1` surface.

use utoipa::{
    Modify, OpenApi,
    openapi::security::{HttpAuthScheme, HttpBuilder, SecurityScheme},
};

use crate::{activity, api, errors, types};

/// Bearer access tokens issued by `/auth/login` and `/auth/register`.
struct SecurityAddon;

impl Modify for SecurityAddon {
    fn modify(&self, openapi: &mut utoipa::openapi::OpenApi) {
        if let Some(components) = openapi.components.as_mut() {
            components.security_schemes.insert(
                "BearerAuth".to_string(),
                SecurityScheme::Http(
                    HttpBuilder::new()
                        .scheme(HttpAuthScheme::Bearer)
                        .bearer_format("JWT")
                        .description(Some(
                            "Access token from `/auth/login` or `/auth/register`:\n\n\
                            ```\nAuthorization: Bearer ACCESS_TOKEN\n```\n\n\
                            Access tokens are short-lived. Exchange the refresh token at `/auth/refresh` for a new one.",
                        ))
                        .build(),
                ),
            );
        }
    }
}

#[derive(OpenApi)]
#[openapi(
    info(
        title = "QR Menu API",
        description = "Multi-tenant restaurant menus with public QR code pages."
    ),
    servers(
        (url = "/api/v1", description = "QR Menu API")
    ),
    modifiers(&SecurityAddon),
    paths(
        api::handlers::auth::register,
        api::handlers::auth::login,
        api::handlers::auth::refresh,
        api::handlers::auth::logout,
        api::handlers::restaurants::owner_stats,
        api::handlers::restaurants::list_restaurants,
        api::handlers::restaurants::get_restaurant,
        api::handlers::restaurants::create_restaurant,
        api::handlers::restaurants::update_restaurant,
        api::handlers::restaurants::delete_restaurant,
        api::handlers::categories::list_categories,
        api::handlers::categories::get_category,
        api::handlers::categories::create_category,
        api::handlers::categories::update_category,
        api::handlers::categories::delete_category,
        api::handlers::menu_items::list_menu_items,
        api::handlers::menu_items::get_menu_item,
        api::handlers::menu_items::create_menu_item,
        api::handlers::menu_items::update_menu_item,
        api::handlers::menu_items::delete_menu_item,
        api::handlers::public::get_public_menu,
        api::handlers::admin::system_stats,
        api::handlers::admin::restaurant_stats,
        api::handlers::admin::list_users,
        api::handlers::admin::update_user_role,
        api::handlers::admin::list_restaurants,
        api::handlers::admin::get_restaurant,
        api::handlers::admin::logs,
    ),
    components(
        schemas(
            types::Role,
            errors::ErrorEnvelope,
            errors::ErrorBody,
            errors::FieldError,
            activity::ActivityLevel,
            activity::ActivityLogEntry,
            api::models::auth::RegisterRequest,
            api::models::auth::LoginRequest,
            api::models::auth::RefreshRequest,
            api::models::auth::AuthResponse,
            api::models::auth::AccessTokenResponse,
            api::models::auth::MessageResponse,
            api::models::users::CurrentUser,
            api::models::users::UserResponse,
            api::models::users::UserSummaryResponse,
            api::models::users::RoleUpdate,
            api::models::users::UserBody,
            api::models::restaurants::RestaurantCreate,
            api::models::restaurants::RestaurantUpdate,
            api::models::restaurants::RestaurantResponse,
            api::models::restaurants::RestaurantBody,
            api::models::restaurants::RestaurantList,
            api::models::restaurants::OwnerStats,
            api::models::categories::CategoryCreate,
            api::models::categories::CategoryUpdate,
            api::models::categories::CategoryResponse,
            api::models::categories::CategoryBody,
            api::models::categories::CategoryList,
            api::models::menu_items::MenuItemCreate,
            api::models::menu_items::MenuItemUpdate,
            api::models::menu_items::MenuItemResponse,
            api::models::menu_items::MenuItemBody,
            api::models::menu_items::MenuItemList,
            api::models::public::PublicRestaurant,
            api::models::public::PublicMenuResponse,
            api::models::admin::SystemStats,
            api::models::admin::RestaurantStats,
            api::models::admin::AdminRestaurantSummary,
            api::models::admin::AdminRestaurantDetail,
            api::models::admin::AdminRestaurantBody,
            api::models::admin::LogList,
        )
    ),
    tags(
        (name = "auth", description = "Registration, login and token refresh"),
        (name = "restaurants", description = "The caller's restaurants"),
        (name = "categories", description = "Menu categories within a restaurant"),
        (name = "menu-items", description = "Dishes within a category"),
        (name = "public", description = "Anonymous menu pages reached by QR code"),
        (name = "admin", description = "Platform administration (ADMIN role)"),
    )
)]
pub struct ApiDoc;
