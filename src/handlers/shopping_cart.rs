use crate::auth::CurrentUser;
use crate::error::{ApiError, ApiResult};
use crate::extract::{Json, Path};
use crate::handlers::recipes::RecipeShortResponse;
use crate::schemas::{ApiResponse, AppState, ErrorResponse};
use axum::{
    extract::State,
    http::{StatusCode, header},
    response::IntoResponse,
};
use common::ShoppingList;
use compute::{ShoppingCartComputer, ShoppingListDocument};
use model::entities::{cart, cart_item, recipe};
use sea_orm::{
    ActiveModelTrait, ColumnTrait, ConnectionTrait, DbErr, EntityTrait, QueryFilter, Set, SqlErr,
};
use tracing::{debug, info, instrument};

/// Returns the user's cart, creating it on first use.
async fn get_or_create_cart<C: ConnectionTrait>(db: &C, user_id: i32) -> Result<cart::Model, DbErr> {
    if let Some(existing) = find_cart(db, user_id).await? {
        return Ok(existing);
    }

    debug!("Creating cart for user {}", user_id);
    let created = cart::ActiveModel {
        user_id: Set(user_id),
        ..Default::default()
    }
    .insert(db)
    .await;

    match created {
        Ok(created) => Ok(created),
        // Another request created it concurrently.
        Err(e) if matches!(e.sql_err(), Some(SqlErr::UniqueConstraintViolation(_))) => {
            find_cart(db, user_id)
                .await?
                .ok_or_else(|| DbErr::RecordNotFound(format!("cart of user {user_id}")))
        }
        Err(e) => Err(e),
    }
}

async fn find_cart<C: ConnectionTrait>(db: &C, user_id: i32) -> Result<Option<cart::Model>, DbErr> {
    cart::Entity::find()
        .filter(cart::Column::UserId.eq(user_id))
        .one(db)
        .await
}

/// Add a recipe to the caller's shopping cart
#[utoipa::path(
    post,
    path = "/api/v1/recipes/{recipe_id}/shopping_cart",
    tag = "shopping_cart",
    params(
        ("recipe_id" = i32, Path, description = "Recipe ID"),
    ),
    responses(
        (status = 201, description = "Recipe added to the shopping cart", body = ApiResponse<RecipeShortResponse>),
        (status = 400, description = "Recipe is already in the cart", body = ErrorResponse),
        (status = 401, description = "Not authenticated", body = ErrorResponse),
        (status = 404, description = "Recipe not found", body = ErrorResponse)
    )
)]
#[instrument(skip(state))]
pub async fn add_to_cart(
    Path(recipe_id): Path<i32>,
    State(state): State<AppState>,
    CurrentUser(me): CurrentUser,
) -> ApiResult<(StatusCode, Json<ApiResponse<RecipeShortResponse>>)> {
    let model = recipe::Entity::find_by_id(recipe_id)
        .one(&state.db)
        .await?
        .ok_or_else(|| ApiError::NotFound(format!("Recipe {recipe_id} not found")))?;

    let user_cart = get_or_create_cart(&state.db, me.id).await?;

    // The (cart, recipe) unique index settles concurrent duplicate adds.
    cart_item::ActiveModel {
        cart_id: Set(user_cart.id),
        recipe_id: Set(model.id),
        ..Default::default()
    }
    .insert(&state.db)
    .await
    .map_err(|e| ApiError::from_unique_violation(e, "Recipe is already in the shopping cart"))?;

    info!("User {} added recipe {} to the shopping cart", me.id, recipe_id);
    Ok((
        StatusCode::CREATED,
        Json(ApiResponse::ok(
            RecipeShortResponse::from(model),
            "Recipe added to the shopping cart",
        )),
    ))
}

/// Remove a recipe from the caller's shopping cart
#[utoipa::path(
    delete,
    path = "/api/v1/recipes/{recipe_id}/shopping_cart",
    tag = "shopping_cart",
    params(
        ("recipe_id" = i32, Path, description = "Recipe ID"),
    ),
    responses(
        (status = 204, description = "Recipe removed from the shopping cart"),
        (status = 400, description = "Recipe is not in the cart", body = ErrorResponse),
        (status = 401, description = "Not authenticated", body = ErrorResponse),
        (status = 404, description = "Recipe not found", body = ErrorResponse)
    )
)]
#[instrument(skip(state))]
pub async fn remove_from_cart(
    Path(recipe_id): Path<i32>,
    State(state): State<AppState>,
    CurrentUser(me): CurrentUser,
) -> ApiResult<StatusCode> {
    recipe::Entity::find_by_id(recipe_id)
        .one(&state.db)
        .await?
        .ok_or_else(|| ApiError::NotFound(format!("Recipe {recipe_id} not found")))?;

    let not_in_cart = || ApiError::LinkNotFound("Recipe is not in the shopping cart".to_string());
    let user_cart = find_cart(&state.db, me.id).await?.ok_or_else(not_in_cart)?;

    let result = cart_item::Entity::delete_many()
        .filter(cart_item::Column::CartId.eq(user_cart.id))
        .filter(cart_item::Column::RecipeId.eq(recipe_id))
        .exec(&state.db)
        .await?;
    if result.rows_affected == 0 {
        return Err(not_in_cart());
    }

    info!("User {} removed recipe {} from the shopping cart", me.id, recipe_id);
    Ok(StatusCode::NO_CONTENT)
}

/// Get the aggregated shopping list of the caller's cart
#[utoipa::path(
    get,
    path = "/api/v1/recipes/shopping_cart",
    tag = "shopping_cart",
    responses(
        (status = 200, description = "Shopping list computed", body = ApiResponse<ShoppingList>),
        (status = 401, description = "Not authenticated", body = ErrorResponse),
        (status = 500, description = "Internal server error", body = ErrorResponse)
    )
)]
#[instrument(skip(state))]
pub async fn get_shopping_cart(
    State(state): State<AppState>,
    CurrentUser(me): CurrentUser,
) -> ApiResult<Json<ApiResponse<ShoppingList>>> {
    let list = ShoppingCartComputer::new()
        .compute_for_user(&state.db, me.id)
        .await?;

    Ok(Json(ApiResponse::ok(list, "Shopping list computed successfully")))
}

/// Remove every recipe from the caller's cart
#[utoipa::path(
    delete,
    path = "/api/v1/recipes/shopping_cart",
    tag = "shopping_cart",
    responses(
        (status = 204, description = "Shopping cart cleared"),
        (status = 401, description = "Not authenticated", body = ErrorResponse),
        (status = 500, description = "Internal server error", body = ErrorResponse)
    )
)]
#[instrument(skip(state))]
pub async fn clear_shopping_cart(
    State(state): State<AppState>,
    CurrentUser(me): CurrentUser,
) -> ApiResult<StatusCode> {
    if let Some(user_cart) = find_cart(&state.db, me.id).await? {
        let result = cart_item::Entity::delete_many()
            .filter(cart_item::Column::CartId.eq(user_cart.id))
            .exec(&state.db)
            .await?;
        info!("Cleared {} items from the cart of user {}", result.rows_affected, me.id);
    }
    Ok(StatusCode::NO_CONTENT)
}

/// Download the shopping list as a text file
#[utoipa::path(
    get,
    path = "/api/v1/recipes/download_shopping_cart",
    tag = "shopping_cart",
    responses(
        (status = 200, description = "Shopping list attachment", content_type = "text/plain", body = String),
        (status = 401, description = "Not authenticated", body = ErrorResponse),
        (status = 500, description = "Internal server error", body = ErrorResponse)
    )
)]
#[instrument(skip(state))]
pub async fn download_shopping_cart(
    State(state): State<AppState>,
    CurrentUser(me): CurrentUser,
) -> ApiResult<impl IntoResponse> {
    let list = ShoppingCartComputer::new()
        .compute_for_user(&state.db, me.id)
        .await?;
    let document = ShoppingListDocument::render(&me.username, &list);
    debug!("Rendered {} lines for user {}", document.lines().len(), me.id);

    Ok((
        [
            (header::CONTENT_TYPE, ShoppingListDocument::CONTENT_TYPE.to_string()),
            (
                header::CONTENT_DISPOSITION,
                format!("attachment; filename=\"{}\"", ShoppingListDocument::FILE_NAME),
            ),
        ],
        document.to_bytes(),
    ))
}
