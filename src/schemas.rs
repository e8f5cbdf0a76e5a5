use common::{CartRecipe, IngredientAmount, ShoppingList, ShoppingListItem};
use sea_orm::DatabaseConnection;
use serde::{Deserialize, Serialize};
use std::path::PathBuf;
use utoipa::{IntoParams, OpenApi, ToSchema};
use validator::Validate;

use crate::handlers::{
    ingredients::{CreateIngredientRequest, IngredientQuery, IngredientResponse},
    recipes::{
        CreateRecipeRequest, RecipeIngredientResponse, RecipeQuery, RecipeResponse,
        RecipeShortResponse, UpdateRecipeRequest,
    },
    tags::{CreateTagRequest, TagResponse},
    users::{CreateUserRequest, SubscriptionResponse, SubscriptionsQuery, UserResponse},
};

/// Application state shared across handlers
#[derive(Clone, Debug)]
pub struct AppState {
    /// Database connection
    pub db: DatabaseConnection,
    /// Directory uploaded recipe images are written to
    pub media_root: PathBuf,
    /// Page size used when a list request does not set `limit`
    pub default_page_size: u64,
}

/// API response wrapper
#[derive(Debug, Serialize, Deserialize, ToSchema)]
pub struct ApiResponse<T> {
    /// Response data
    pub data: T,
    /// Response message
    pub message: String,
    /// Success status
    pub success: bool,
}

impl<T> ApiResponse<T> {
    pub fn ok(data: T, message: impl Into<String>) -> Self {
        Self {
            data,
            message: message.into(),
            success: true,
        }
    }
}

/// Error response
#[derive(Debug, Serialize, Deserialize, ToSchema)]
pub struct ErrorResponse {
    /// Error message
    pub error: String,
    /// Error code
    pub code: String,
    /// Request field the error refers to, if any
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub field: Option<String>,
    /// Success status (always false for errors)
    pub success: bool,
}

/// Health check response
#[derive(Debug, Serialize, Deserialize, ToSchema)]
pub struct HealthResponse {
    /// Service status
    pub status: String,
    /// Service version
    pub version: String,
    /// Database connection status
    pub database: String,
}

/// Query parameters shared by paginated list endpoints
#[derive(Debug, Default, Deserialize, ToSchema, IntoParams, Validate)]
pub struct PageQuery {
    /// Page number (default: 1)
    #[validate(range(min = 1, max = 100000))]
    pub page: Option<u64>,
    /// Page size (default: 6)
    #[validate(range(min = 1, max = 100))]
    pub limit: Option<u64>,
}

/// One page of a paginated list
#[derive(Debug, Serialize, Deserialize, ToSchema)]
pub struct Page<T> {
    /// Total number of items across all pages
    pub count: u64,
    /// Number of the next page, if there is one
    pub next_page: Option<u64>,
    /// Number of the previous page, if there is one
    pub previous_page: Option<u64>,
    pub results: Vec<T>,
}

impl<T> Page<T> {
    pub fn new(results: Vec<T>, count: u64, page: u64, limit: u64) -> Self {
        Self {
            count,
            next_page: (page.saturating_mul(limit) < count).then_some(page + 1),
            previous_page: (page > 1).then(|| page - 1),
            results,
        }
    }

    pub fn empty(page: u64) -> Self {
        Self::new(Vec::new(), 0, page, 1)
    }
}

/// OpenAPI documentation
#[derive(OpenApi)]
#[openapi(
    paths(
        crate::handlers::health::health_check,
        crate::handlers::users::create_user,
        crate::handlers::users::get_users,
        crate::handlers::users::get_user,
        crate::handlers::users::get_me,
        crate::handlers::users::get_subscriptions,
        crate::handlers::users::subscribe,
        crate::handlers::users::unsubscribe,
        crate::handlers::tags::create_tag,
        crate::handlers::tags::get_tags,
        crate::handlers::tags::get_tag,
        crate::handlers::ingredients::create_ingredient,
        crate::handlers::ingredients::get_ingredients,
        crate::handlers::ingredients::get_ingredient,
        crate::handlers::recipes::create_recipe,
        crate::handlers::recipes::get_recipes,
        crate::handlers::recipes::get_recipe,
        crate::handlers::recipes::update_recipe,
        crate::handlers::recipes::delete_recipe,
        crate::handlers::favorites::add_favorite,
        crate::handlers::favorites::remove_favorite,
        crate::handlers::shopping_cart::add_to_cart,
        crate::handlers::shopping_cart::remove_from_cart,
        crate::handlers::shopping_cart::get_shopping_cart,
        crate::handlers::shopping_cart::clear_shopping_cart,
        crate::handlers::shopping_cart::download_shopping_cart,
    ),
    components(
        schemas(
            ErrorResponse,
            HealthResponse,
            PageQuery,
            CreateUserRequest,
            UserResponse,
            SubscriptionResponse,
            SubscriptionsQuery,
            CreateTagRequest,
            TagResponse,
            CreateIngredientRequest,
            IngredientQuery,
            IngredientResponse,
            CreateRecipeRequest,
            UpdateRecipeRequest,
            RecipeQuery,
            RecipeResponse,
            RecipeShortResponse,
            RecipeIngredientResponse,
            IngredientAmount,
            ShoppingList,
            ShoppingListItem,
            CartRecipe,
        )
    ),
    tags(
        (name = "health", description = "Health check endpoints"),
        (name = "users", description = "User profiles and subscriptions"),
        (name = "tags", description = "Recipe tags"),
        (name = "ingredients", description = "Ingredient dictionary"),
        (name = "recipes", description = "Recipe management"),
        (name = "favorites", description = "Favorite recipes"),
        (name = "shopping_cart", description = "Shopping cart and shopping list export"),
    ),
    info(
        title = "Foodgram API",
        description = "Recipe sharing backend: recipes, favorites, subscriptions and an aggregated shopping list",
        version = "0.1.0",
        license(
            name = "MIT",
            url = "https://opensource.org/licenses/MIT"
        )
    )
)]
pub struct ApiDoc;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn page_links() {
        let page: Page<i32> = Page::new(vec![1, 2], 5, 1, 2);
        assert_eq!(page.next_page, Some(2));
        assert_eq!(page.previous_page, None);

        let page: Page<i32> = Page::new(vec![5], 5, 3, 2);
        assert_eq!(page.next_page, None);
        assert_eq!(page.previous_page, Some(2));

        let page: Page<i32> = Page::empty(1);
        assert_eq!(page.count, 0);
        assert_eq!(page.next_page, None);
    }
}
