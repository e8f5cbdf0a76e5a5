use crate::handlers::{
    favorites::{add_favorite, remove_favorite},
    health::health_check,
    ingredients::{create_ingredient, get_ingredient, get_ingredients},
    recipes::{create_recipe, delete_recipe, get_recipe, get_recipes, update_recipe},
    shopping_cart::{
        add_to_cart, clear_shopping_cart, download_shopping_cart, get_shopping_cart,
        remove_from_cart,
    },
    tags::{create_tag, get_tag, get_tags},
    users::{create_user, get_me, get_subscriptions, get_user, get_users, subscribe, unsubscribe},
};
use crate::schemas::{ApiDoc, AppState};
use axum::{
    Router,
    routing::{get, post},
};
use std::time::Duration;
use tower::ServiceBuilder;
use tower_http::{
    compression::CompressionLayer, cors::CorsLayer, services::ServeDir, timeout::TimeoutLayer,
    trace::TraceLayer,
};
use utoipa::OpenApi;
use utoipa_swagger_ui::SwaggerUi;

/// Create application router with all routes and middleware
pub fn create_router(state: AppState) -> Router {
    let media = ServeDir::new(&state.media_root);

    Router::new()
        // Health check
        .route("/health", get(health_check))
        // Users and subscriptions
        .route("/api/v1/users", post(create_user).get(get_users))
        .route("/api/v1/users/me", get(get_me))
        .route("/api/v1/users/subscriptions", get(get_subscriptions))
        .route("/api/v1/users/:user_id", get(get_user))
        .route(
            "/api/v1/users/:user_id/subscribe",
            post(subscribe).delete(unsubscribe),
        )
        // Reference data
        .route("/api/v1/tags", post(create_tag).get(get_tags))
        .route("/api/v1/tags/:tag_id", get(get_tag))
        .route("/api/v1/ingredients", post(create_ingredient).get(get_ingredients))
        .route("/api/v1/ingredients/:ingredient_id", get(get_ingredient))
        // Recipes
        .route("/api/v1/recipes", post(create_recipe).get(get_recipes))
        .route(
            "/api/v1/recipes/shopping_cart",
            get(get_shopping_cart).delete(clear_shopping_cart),
        )
        .route(
            "/api/v1/recipes/download_shopping_cart",
            get(download_shopping_cart),
        )
        .route(
            "/api/v1/recipes/:recipe_id",
            get(get_recipe).put(update_recipe).delete(delete_recipe),
        )
        .route(
            "/api/v1/recipes/:recipe_id/favorite",
            post(add_favorite).delete(remove_favorite),
        )
        .route(
            "/api/v1/recipes/:recipe_id/shopping_cart",
            post(add_to_cart).delete(remove_from_cart),
        )
        // Uploaded images
        .nest_service("/media", media)
        // Swagger UI
        .merge(SwaggerUi::new("/swagger-ui").url("/api-docs/openapi.json", ApiDoc::openapi()))
        // Add middleware
        .layer(
            ServiceBuilder::new()
                .layer(TraceLayer::new_for_http())
                .layer(CompressionLayer::new())
                .layer(TimeoutLayer::new(Duration::from_secs(30)))
                .layer(CorsLayer::permissive()),
        )
        .with_state(state)
}
