use crate::error::{ApiError, ApiResult};
use crate::extract::{Json, Path, Query};
use crate::schemas::{ApiResponse, AppState, ErrorResponse};
use axum::{extract::State, http::StatusCode};
use model::entities::ingredient;
use sea_orm::{ActiveModelTrait, EntityTrait, QueryOrder, Set};
use serde::{Deserialize, Serialize};
use tracing::{debug, info, instrument, trace};
use utoipa::{IntoParams, ToSchema};
use validator::Validate;

/// Request body for creating an ingredient
#[derive(Debug, Deserialize, Serialize, ToSchema, Validate)]
pub struct CreateIngredientRequest {
    #[validate(length(min = 1, max = 200))]
    pub name: String,
    /// Measurement unit, e.g. "g", "ml", "pcs"
    #[validate(length(min = 1, max = 50))]
    pub measurement_unit: String,
}

/// Query parameters for the ingredient search
#[derive(Debug, Deserialize, ToSchema, IntoParams)]
pub struct IngredientQuery {
    /// Case-insensitive part of the name; names starting with it come first
    pub name: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize, ToSchema, PartialEq)]
pub struct IngredientResponse {
    pub id: i32,
    pub name: String,
    pub measurement_unit: String,
}

impl From<ingredient::Model> for IngredientResponse {
    fn from(model: ingredient::Model) -> Self {
        Self {
            id: model.id,
            name: model.name,
            measurement_unit: model.measurement_unit,
        }
    }
}

/// Create a new ingredient
#[utoipa::path(
    post,
    path = "/api/v1/ingredients",
    tag = "ingredients",
    request_body = CreateIngredientRequest,
    responses(
        (status = 201, description = "Ingredient created successfully", body = ApiResponse<IngredientResponse>),
        (status = 400, description = "Invalid request or ingredient already exists", body = ErrorResponse),
        (status = 500, description = "Internal server error", body = ErrorResponse)
    )
)]
#[instrument(skip(state))]
pub async fn create_ingredient(
    State(state): State<AppState>,
    Json(request): Json<CreateIngredientRequest>,
) -> ApiResult<(StatusCode, Json<ApiResponse<IngredientResponse>>)> {
    trace!("Entering create_ingredient function");
    request.validate()?;

    let model = ingredient::ActiveModel {
        name: Set(request.name.trim().to_string()),
        measurement_unit: Set(request.measurement_unit.trim().to_string()),
        ..Default::default()
    }
    .insert(&state.db)
    .await
    .map_err(|e| {
        ApiError::from_unique_violation(
            e,
            format!(
                "Ingredient '{}' measured in '{}' already exists",
                request.name, request.measurement_unit
            ),
        )
    })?;

    info!("Ingredient created successfully with ID: {}", model.id);
    Ok((
        StatusCode::CREATED,
        Json(ApiResponse::ok(
            IngredientResponse::from(model),
            "Ingredient created successfully",
        )),
    ))
}

/// Ingredients whose lower-cased name contains `needle`, prefix matches
/// first. The relative order of `ingredients` is kept within each group.
fn search_by_name(ingredients: Vec<ingredient::Model>, needle: &str) -> Vec<ingredient::Model> {
    let (prefixed, inner): (Vec<_>, Vec<_>) = ingredients
        .into_iter()
        .filter_map(|i| {
            let name = i.name.to_lowercase();
            name.find(needle).map(|at| (at == 0, i))
        })
        .partition(|(is_prefix, _)| *is_prefix);
    prefixed.into_iter().chain(inner).map(|(_, i)| i).collect()
}

/// List ingredients, optionally filtered by part of their name
#[utoipa::path(
    get,
    path = "/api/v1/ingredients",
    tag = "ingredients",
    params(IngredientQuery),
    responses(
        (status = 200, description = "Ingredients retrieved successfully", body = ApiResponse<Vec<IngredientResponse>>),
        (status = 500, description = "Internal server error", body = ErrorResponse)
    )
)]
#[instrument(skip(state))]
pub async fn get_ingredients(
    Query(query): Query<IngredientQuery>,
    State(state): State<AppState>,
) -> ApiResult<Json<ApiResponse<Vec<IngredientResponse>>>> {
    let ingredients = ingredient::Entity::find()
        .order_by_asc(ingredient::Column::Name)
        .order_by_asc(ingredient::Column::MeasurementUnit)
        .all(&state.db)
        .await?;

    // SQL LIKE is ASCII-only case-insensitive in SQLite, so matching runs here.
    let needle = query
        .name
        .as_deref()
        .map(str::trim)
        .filter(|n| !n.is_empty())
        .map(str::to_lowercase);
    let results: Vec<IngredientResponse> = match needle {
        Some(needle) => search_by_name(ingredients, &needle),
        None => ingredients,
    }
    .into_iter()
    .map(IngredientResponse::from)
    .collect();
    debug!("Matched {} ingredients", results.len());

    Ok(Json(ApiResponse::ok(results, "Ingredients retrieved successfully")))
}

/// Get an ingredient by ID
#[utoipa::path(
    get,
    path = "/api/v1/ingredients/{ingredient_id}",
    tag = "ingredients",
    params(
        ("ingredient_id" = i32, Path, description = "Ingredient ID"),
    ),
    responses(
        (status = 200, description = "Ingredient retrieved successfully", body = ApiResponse<IngredientResponse>),
        (status = 404, description = "Ingredient not found", body = ErrorResponse),
        (status = 500, description = "Internal server error", body = ErrorResponse)
    )
)]
#[instrument(skip(state))]
pub async fn get_ingredient(
    Path(ingredient_id): Path<i32>,
    State(state): State<AppState>,
) -> ApiResult<Json<ApiResponse<IngredientResponse>>> {
    let ingredient = ingredient::Entity::find_by_id(ingredient_id)
        .one(&state.db)
        .await?
        .ok_or_else(|| ApiError::NotFound(format!("Ingredient {ingredient_id} not found")))?;

    Ok(Json(ApiResponse::ok(
        IngredientResponse::from(ingredient),
        "Ingredient retrieved successfully",
    )))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn model(id: i32, name: &str) -> ingredient::Model {
        ingredient::Model {
            id,
            name: name.to_string(),
            measurement_unit: "g".to_string(),
        }
    }

    #[test]
    fn search_matches_anywhere_with_prefix_matches_first() {
        let ingredients = vec![
            model(1, "кокосовое молоко"),
            model(2, "Молоко"),
            model(3, "мука"),
            model(4, "сгущённое молоко"),
        ];

        let ids: Vec<i32> = search_by_name(ingredients, "молоко").into_iter().map(|i| i.id).collect();

        assert_eq!(ids, vec![2, 1, 4]);
    }
}
