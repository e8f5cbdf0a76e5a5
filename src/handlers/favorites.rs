use crate::auth::CurrentUser;
use crate::error::{ApiError, ApiResult};
use crate::extract::{Json, Path};
use crate::handlers::recipes::RecipeShortResponse;
use crate::schemas::{ApiResponse, AppState, ErrorResponse};
use axum::{extract::State, http::StatusCode};
use model::entities::{favorite_recipe, recipe};
use sea_orm::{ActiveModelTrait, ColumnTrait, EntityTrait, QueryFilter, Set};
use tracing::{info, instrument};

/// Add a recipe to the caller's favorites
#[utoipa::path(
    post,
    path = "/api/v1/recipes/{recipe_id}/favorite",
    tag = "favorites",
    params(
        ("recipe_id" = i32, Path, description = "Recipe ID"),
    ),
    responses(
        (status = 201, description = "Recipe added to favorites", body = ApiResponse<RecipeShortResponse>),
        (status = 400, description = "Recipe is already a favorite", body = ErrorResponse),
        (status = 401, description = "Not authenticated", body = ErrorResponse),
        (status = 404, description = "Recipe not found", body = ErrorResponse)
    )
)]
#[instrument(skip(state))]
pub async fn add_favorite(
    Path(recipe_id): Path<i32>,
    State(state): State<AppState>,
    CurrentUser(me): CurrentUser,
) -> ApiResult<(StatusCode, Json<ApiResponse<RecipeShortResponse>>)> {
    let model = recipe::Entity::find_by_id(recipe_id)
        .one(&state.db)
        .await?
        .ok_or_else(|| ApiError::NotFound(format!("Recipe {recipe_id} not found")))?;

    favorite_recipe::ActiveModel {
        user_id: Set(me.id),
        recipe_id: Set(model.id),
        ..Default::default()
    }
    .insert(&state.db)
    .await
    .map_err(|e| ApiError::from_unique_violation(e, "Recipe is already in favorites"))?;

    info!("User {} added recipe {} to favorites", me.id, recipe_id);
    Ok((
        StatusCode::CREATED,
        Json(ApiResponse::ok(
            RecipeShortResponse::from(model),
            "Recipe added to favorites",
        )),
    ))
}

/// Remove a recipe from the caller's favorites
#[utoipa::path(
    delete,
    path = "/api/v1/recipes/{recipe_id}/favorite",
    tag = "favorites",
    params(
        ("recipe_id" = i32, Path, description = "Recipe ID"),
    ),
    responses(
        (status = 204, description = "Recipe removed from favorites"),
        (status = 400, description = "Recipe is not a favorite", body = ErrorResponse),
        (status = 401, description = "Not authenticated", body = ErrorResponse),
        (status = 404, description = "Recipe not found", body = ErrorResponse)
    )
)]
#[instrument(skip(state))]
pub async fn remove_favorite(
    Path(recipe_id): Path<i32>,
    State(state): State<AppState>,
    CurrentUser(me): CurrentUser,
) -> ApiResult<StatusCode> {
    recipe::Entity::find_by_id(recipe_id)
        .one(&state.db)
        .await?
        .ok_or_else(|| ApiError::NotFound(format!("Recipe {recipe_id} not found")))?;

    let result = favorite_recipe::Entity::delete_many()
        .filter(favorite_recipe::Column::UserId.eq(me.id))
        .filter(favorite_recipe::Column::RecipeId.eq(recipe_id))
        .exec(&state.db)
        .await?;

    if result.rows_affected == 0 {
        return Err(ApiError::LinkNotFound(
            "Recipe is not in favorites".to_string(),
        ));
    }

    info!("User {} removed recipe {} from favorites", me.id, recipe_id);
    Ok(StatusCode::NO_CONTENT)
}
