use crate::auth::{CurrentUser, MaybeUser};
use crate::error::{ApiError, ApiResult};
use crate::extract::{Json, Path, Query, ValidQuery, multi_value};
use crate::handlers::{
    tags::TagResponse,
    users::{UserResponse, is_subscribed},
};
use crate::helpers::images::{decode_image, image_url, remove_image, store_image};
use crate::schemas::{ApiResponse, AppState, ErrorResponse, Page};
use axum::{extract::State, http::StatusCode};
use chrono::{DateTime, Utc};
use common::IngredientAmount;
use compute::validate_composition;
use model::entities::{
    cart, cart_item, favorite_recipe, ingredient, recipe, recipe_ingredient, recipe_tag, tag, user,
};
use sea_orm::{
    ActiveModelTrait, ColumnTrait, ConnectionTrait, DbErr, EntityTrait, ModelTrait,
    PaginatorTrait, QueryFilter, QueryOrder, QuerySelect, Set, TransactionTrait,
};
use serde::{Deserialize, Serialize};
use std::collections::HashSet;
use std::path::Path as FsPath;
use tracing::{debug, error, info, instrument, trace, warn};
use utoipa::{IntoParams, ToSchema};
use validator::Validate;

/// Request body for creating a recipe
#[derive(Debug, Deserialize, Serialize, ToSchema, Validate)]
pub struct CreateRecipeRequest {
    /// Tag IDs; non-empty, no repeats
    pub tags: Vec<i32>,
    /// Ingredient IDs with amounts; non-empty, no repeated ingredient
    pub ingredients: Vec<IngredientAmount>,
    /// Base64 image, optionally as a `data:image/<fmt>;base64,` URI
    pub image: String,
    #[validate(length(min = 1, max = 200))]
    pub name: String,
    #[validate(length(min = 1))]
    pub text: String,
    /// Cooking time in minutes
    #[validate(range(min = 1))]
    pub cooking_time: i32,
}

/// Request body for updating a recipe. Tags and ingredients replace the
/// current ones; the image is kept when absent.
#[derive(Debug, Deserialize, Serialize, ToSchema, Validate)]
pub struct UpdateRecipeRequest {
    pub tags: Vec<i32>,
    pub ingredients: Vec<IngredientAmount>,
    pub image: Option<String>,
    #[validate(length(min = 1, max = 200))]
    pub name: String,
    #[validate(length(min = 1))]
    pub text: String,
    #[validate(range(min = 1))]
    pub cooking_time: i32,
}

/// Query parameters for listing recipes. Tag slugs are read separately,
/// since `tags` may be repeated.
#[derive(Debug, Default, Deserialize, ToSchema, IntoParams, Validate)]
pub struct RecipeQuery {
    /// Page number (default: 1)
    #[validate(range(min = 1, max = 100000))]
    pub page: Option<u64>,
    /// Page size (default: 6)
    #[validate(range(min = 1, max = 100))]
    pub limit: Option<u64>,
    /// Only recipes by this author
    pub author: Option<i32>,
    /// `1` to list only the caller's favorites
    #[validate(range(max = 1))]
    pub is_favorited: Option<u8>,
    /// `1` to list only recipes in the caller's cart
    #[validate(range(max = 1))]
    pub is_in_shopping_cart: Option<u8>,
}

#[derive(Debug, Clone, Serialize, Deserialize, ToSchema, PartialEq)]
pub struct RecipeIngredientResponse {
    /// Ingredient ID
    pub id: i32,
    pub name: String,
    pub measurement_unit: String,
    pub amount: i32,
}

/// Full recipe representation
#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct RecipeResponse {
    pub id: i32,
    pub tags: Vec<TagResponse>,
    pub author: UserResponse,
    pub ingredients: Vec<RecipeIngredientResponse>,
    pub is_favorited: bool,
    pub is_in_shopping_cart: bool,
    pub name: String,
    /// Image URL
    pub image: String,
    pub text: String,
    pub cooking_time: i32,
    pub created_at: DateTime<Utc>,
}

/// Short recipe representation used by favorites, cart and subscriptions
#[derive(Debug, Clone, Serialize, Deserialize, ToSchema, PartialEq)]
pub struct RecipeShortResponse {
    pub id: i32,
    pub name: String,
    /// Image URL
    pub image: String,
    pub cooking_time: i32,
}

impl From<recipe::Model> for RecipeShortResponse {
    fn from(model: recipe::Model) -> Self {
        Self {
            id: model.id,
            name: model.name,
            image: image_url(&model.image),
            cooking_time: model.cooking_time,
        }
    }
}

/// Recipe IDs in the cart of `user_id`.
pub(crate) async fn cart_recipe_ids<C: ConnectionTrait>(
    db: &C,
    user_id: i32,
) -> Result<HashSet<i32>, DbErr> {
    Ok(cart_item::Entity::find()
        .inner_join(cart::Entity)
        .filter(cart::Column::UserId.eq(user_id))
        .all(db)
        .await?
        .into_iter()
        .map(|item| item.recipe_id)
        .collect())
}

/// `(is_favorited, is_in_shopping_cart)` of a recipe for `viewer`.
async fn recipe_flags<C: ConnectionTrait>(
    db: &C,
    viewer: Option<i32>,
    recipe_id: i32,
) -> Result<(bool, bool), DbErr> {
    let Some(user_id) = viewer else {
        return Ok((false, false));
    };

    let favorited = favorite_recipe::Entity::find()
        .filter(favorite_recipe::Column::UserId.eq(user_id))
        .filter(favorite_recipe::Column::RecipeId.eq(recipe_id))
        .count(db)
        .await?
        > 0;
    let in_cart = cart_item::Entity::find()
        .inner_join(cart::Entity)
        .filter(cart::Column::UserId.eq(user_id))
        .filter(cart_item::Column::RecipeId.eq(recipe_id))
        .count(db)
        .await?
        > 0;

    Ok((favorited, in_cart))
}

/// Builds the full representation of `recipe` as seen by `viewer`.
pub(crate) async fn recipe_response<C: ConnectionTrait>(
    db: &C,
    recipe: recipe::Model,
    viewer: Option<i32>,
) -> Result<RecipeResponse, DbErr> {
    let tags = recipe
        .find_related(tag::Entity)
        .order_by_asc(tag::Column::Id)
        .all(db)
        .await?;

    let ingredients = recipe_ingredient::Entity::find()
        .filter(recipe_ingredient::Column::RecipeId.eq(recipe.id))
        .order_by_asc(recipe_ingredient::Column::Id)
        .find_also_related(ingredient::Entity)
        .all(db)
        .await?
        .into_iter()
        .filter_map(|(link, ingredient)| {
            ingredient.map(|ingredient| RecipeIngredientResponse {
                id: ingredient.id,
                name: ingredient.name,
                measurement_unit: ingredient.measurement_unit,
                amount: link.amount,
            })
        })
        .collect();

    let author = user::Entity::find_by_id(recipe.author_id)
        .one(db)
        .await?
        .ok_or_else(|| DbErr::RecordNotFound(format!("author {} of recipe {}", recipe.author_id, recipe.id)))?;
    let author_subscribed = is_subscribed(db, viewer, author.id).await?;
    let (is_favorited, is_in_shopping_cart) = recipe_flags(db, viewer, recipe.id).await?;

    Ok(RecipeResponse {
        id: recipe.id,
        tags: tags.into_iter().map(TagResponse::from).collect(),
        author: UserResponse::new(author, author_subscribed),
        ingredients,
        is_favorited,
        is_in_shopping_cart,
        name: recipe.name,
        image: image_url(&recipe.image),
        text: recipe.text,
        cooking_time: recipe.cooking_time,
        created_at: recipe.created_at,
    })
}

/// Checks that every referenced tag and ingredient exists.
async fn ensure_references_exist<C: ConnectionTrait>(
    db: &C,
    tag_ids: &[i32],
    ingredients: &[IngredientAmount],
) -> ApiResult<()> {
    let found_tags = tag::Entity::find()
        .filter(tag::Column::Id.is_in(tag_ids.iter().copied()))
        .count(db)
        .await?;
    if found_tags != tag_ids.len() as u64 {
        return Err(ApiError::validation("Unknown tag id", Some("tags")));
    }

    let found_ingredients = ingredient::Entity::find()
        .filter(ingredient::Column::Id.is_in(ingredients.iter().map(|i| i.id)))
        .count(db)
        .await?;
    if found_ingredients != ingredients.len() as u64 {
        return Err(ApiError::validation("Unknown ingredient id", Some("ingredients")));
    }
    Ok(())
}

/// Replaces every tag and ingredient link of a recipe.
async fn replace_links<C: ConnectionTrait>(
    db: &C,
    recipe_id: i32,
    tag_ids: &[i32],
    ingredients: &[IngredientAmount],
) -> Result<(), DbErr> {
    recipe_tag::Entity::delete_many()
        .filter(recipe_tag::Column::RecipeId.eq(recipe_id))
        .exec(db)
        .await?;
    recipe_ingredient::Entity::delete_many()
        .filter(recipe_ingredient::Column::RecipeId.eq(recipe_id))
        .exec(db)
        .await?;

    recipe_tag::Entity::insert_many(tag_ids.iter().map(|&tag_id| recipe_tag::ActiveModel {
        recipe_id: Set(recipe_id),
        tag_id: Set(tag_id),
    }))
    .exec_without_returning(db)
    .await?;

    recipe_ingredient::Entity::insert_many(ingredients.iter().map(|entry| {
        recipe_ingredient::ActiveModel {
            recipe_id: Set(recipe_id),
            ingredient_id: Set(entry.id),
            amount: Set(entry.amount),
            ..Default::default()
        }
    }))
    .exec_without_returning(db)
    .await?;

    debug!(
        recipe_id,
        tags = tag_ids.len(),
        ingredients = ingredients.len(),
        "Recipe links replaced"
    );
    Ok(())
}

/// Loads a recipe the caller is allowed to modify.
async fn load_own_recipe(state: &AppState, recipe_id: i32, user_id: i32) -> ApiResult<recipe::Model> {
    let recipe = recipe::Entity::find_by_id(recipe_id)
        .one(&state.db)
        .await?
        .ok_or_else(|| ApiError::NotFound(format!("Recipe {recipe_id} not found")))?;
    if recipe.author_id != user_id {
        warn!("User {} tried to modify recipe {} of user {}", user_id, recipe.id, recipe.author_id);
        return Err(ApiError::Forbidden(
            "Only the author may modify this recipe".to_string(),
        ));
    }
    Ok(recipe)
}

/// Removes an image written during a mutation that did not go through.
async fn discard_image(media_root: &FsPath, stored: Option<&String>) {
    if let Some(path) = stored {
        remove_image(media_root, path).await;
    }
}

const DUPLICATE_RECIPE: &str = "You already have a recipe with this name";

/// Create a new recipe
#[utoipa::path(
    post,
    path = "/api/v1/recipes",
    tag = "recipes",
    request_body = CreateRecipeRequest,
    responses(
        (status = 201, description = "Recipe created successfully", body = ApiResponse<RecipeResponse>),
        (status = 400, description = "Invalid request or duplicate recipe", body = ErrorResponse),
        (status = 401, description = "Not authenticated", body = ErrorResponse),
        (status = 500, description = "Internal server error", body = ErrorResponse)
    )
)]
#[instrument(skip(state, request), fields(user_id = me.id))]
pub async fn create_recipe(
    State(state): State<AppState>,
    CurrentUser(me): CurrentUser,
    Json(request): Json<CreateRecipeRequest>,
) -> ApiResult<(StatusCode, Json<ApiResponse<RecipeResponse>>)> {
    trace!("Entering create_recipe function");
    request.validate()?;
    validate_composition(&request.tags, &request.ingredients)?;
    let image = decode_image(&request.image)?;
    debug!("Creating recipe '{}'", request.name);

    let txn = state.db.begin().await?;
    ensure_references_exist(&txn, &request.tags, &request.ingredients).await?;

    let created = recipe::ActiveModel {
        author_id: Set(me.id),
        name: Set(request.name.clone()),
        text: Set(request.text.clone()),
        cooking_time: Set(request.cooking_time),
        image: Set(String::new()),
        created_at: Set(Utc::now()),
        ..Default::default()
    }
    .insert(&txn)
    .await
    .map_err(|e| ApiError::from_unique_violation(e, DUPLICATE_RECIPE))?;

    replace_links(&txn, created.id, &request.tags, &request.ingredients).await?;

    let recipe_id = created.id;
    let stored = store_image(&state.media_root, recipe_id, &image).await?;
    let mut active: recipe::ActiveModel = created.into();
    active.image = Set(stored.clone());
    let saved = match active.update(&txn).await {
        Ok(saved) => saved,
        Err(e) => {
            discard_image(&state.media_root, Some(&stored)).await;
            return Err(e.into());
        }
    };

    if let Err(e) = txn.commit().await {
        error!("Failed to commit recipe {}: {}", recipe_id, e);
        discard_image(&state.media_root, Some(&stored)).await;
        return Err(e.into());
    }

    info!("Recipe created successfully with ID: {}", saved.id);
    let response = recipe_response(&state.db, saved, Some(me.id)).await?;
    Ok((
        StatusCode::CREATED,
        Json(ApiResponse::ok(response, "Recipe created successfully")),
    ))
}

/// List recipes
#[utoipa::path(
    get,
    path = "/api/v1/recipes",
    tag = "recipes",
    params(
        RecipeQuery,
        ("tags" = Option<Vec<String>>, Query, description = "Tag slugs, repeated (`tags=a&tags=b`) or comma-separated; a recipe matches when it has any of them"),
    ),
    responses(
        (status = 200, description = "Recipes retrieved successfully", body = ApiResponse<Page<RecipeResponse>>),
        (status = 400, description = "Invalid query parameters", body = ErrorResponse),
        (status = 500, description = "Internal server error", body = ErrorResponse)
    )
)]
#[instrument(skip(state, params))]
pub async fn get_recipes(
    ValidQuery(query): ValidQuery<RecipeQuery>,
    Query(params): Query<Vec<(String, String)>>,
    State(state): State<AppState>,
    viewer: MaybeUser,
) -> ApiResult<Json<ApiResponse<Page<RecipeResponse>>>> {
    let page = query.page.unwrap_or(1);
    let limit = query.limit.unwrap_or(state.default_page_size);
    debug!("Fetching recipes - page: {}, limit: {}", page, limit);

    // Filters that need other tables narrow the candidate id set.
    let mut allowed: Option<HashSet<i32>> = None;
    let mut narrow = |ids: HashSet<i32>| {
        allowed = Some(match allowed.take() {
            Some(current) => current.intersection(&ids).copied().collect(),
            None => ids,
        });
    };

    let slugs = multi_value(&params, "tags");
    if !slugs.is_empty() {
        let tag_ids: Vec<i32> = tag::Entity::find()
            .filter(tag::Column::Slug.is_in(slugs))
            .all(&state.db)
            .await?
            .into_iter()
            .map(|t| t.id)
            .collect();
        let ids = if tag_ids.is_empty() {
            HashSet::new()
        } else {
            recipe_tag::Entity::find()
                .filter(recipe_tag::Column::TagId.is_in(tag_ids))
                .all(&state.db)
                .await?
                .into_iter()
                .map(|link| link.recipe_id)
                .collect()
        };
        narrow(ids);
    }

    if query.is_favorited == Some(1) {
        let ids = match viewer.id() {
            Some(user_id) => favorite_recipe::Entity::find()
                .filter(favorite_recipe::Column::UserId.eq(user_id))
                .all(&state.db)
                .await?
                .into_iter()
                .map(|f| f.recipe_id)
                .collect(),
            None => HashSet::new(),
        };
        narrow(ids);
    }

    if query.is_in_shopping_cart == Some(1) {
        let ids = match viewer.id() {
            Some(user_id) => cart_recipe_ids(&state.db, user_id).await?,
            None => HashSet::new(),
        };
        narrow(ids);
    }

    let mut select = recipe::Entity::find();
    if let Some(author_id) = query.author {
        select = select.filter(recipe::Column::AuthorId.eq(author_id));
    }
    match allowed {
        Some(ids) if ids.is_empty() => {
            debug!("Filters matched no recipes");
            return Ok(Json(ApiResponse::ok(
                Page::empty(page),
                "Recipes retrieved successfully",
            )));
        }
        Some(ids) => select = select.filter(recipe::Column::Id.is_in(ids)),
        None => {}
    }

    let paginator = select
        .order_by_desc(recipe::Column::CreatedAt)
        .order_by_desc(recipe::Column::Id)
        .paginate(&state.db, limit);
    let count = paginator.num_items().await?;
    let recipes = paginator.fetch_page(page - 1).await?;

    let mut results = Vec::with_capacity(recipes.len());
    for model in recipes {
        results.push(recipe_response(&state.db, model, viewer.id()).await?);
    }
    info!("Retrieved {} of {} recipes", results.len(), count);

    Ok(Json(ApiResponse::ok(
        Page::new(results, count, page, limit),
        "Recipes retrieved successfully",
    )))
}

/// Get a recipe by ID
#[utoipa::path(
    get,
    path = "/api/v1/recipes/{recipe_id}",
    tag = "recipes",
    params(
        ("recipe_id" = i32, Path, description = "Recipe ID"),
    ),
    responses(
        (status = 200, description = "Recipe retrieved successfully", body = ApiResponse<RecipeResponse>),
        (status = 404, description = "Recipe not found", body = ErrorResponse),
        (status = 500, description = "Internal server error", body = ErrorResponse)
    )
)]
#[instrument(skip(state))]
pub async fn get_recipe(
    Path(recipe_id): Path<i32>,
    State(state): State<AppState>,
    viewer: MaybeUser,
) -> ApiResult<Json<ApiResponse<RecipeResponse>>> {
    let model = recipe::Entity::find_by_id(recipe_id)
        .one(&state.db)
        .await?
        .ok_or_else(|| ApiError::NotFound(format!("Recipe {recipe_id} not found")))?;

    let response = recipe_response(&state.db, model, viewer.id()).await?;
    Ok(Json(ApiResponse::ok(response, "Recipe retrieved successfully")))
}

/// Update a recipe
#[utoipa::path(
    put,
    path = "/api/v1/recipes/{recipe_id}",
    tag = "recipes",
    params(
        ("recipe_id" = i32, Path, description = "Recipe ID"),
    ),
    request_body = UpdateRecipeRequest,
    responses(
        (status = 200, description = "Recipe updated successfully", body = ApiResponse<RecipeResponse>),
        (status = 400, description = "Invalid request", body = ErrorResponse),
        (status = 401, description = "Not authenticated", body = ErrorResponse),
        (status = 403, description = "Not the author", body = ErrorResponse),
        (status = 404, description = "Recipe not found", body = ErrorResponse),
        (status = 500, description = "Internal server error", body = ErrorResponse)
    )
)]
#[instrument(skip(state, request), fields(user_id = me.id))]
pub async fn update_recipe(
    Path(recipe_id): Path<i32>,
    State(state): State<AppState>,
    CurrentUser(me): CurrentUser,
    Json(request): Json<UpdateRecipeRequest>,
) -> ApiResult<Json<ApiResponse<RecipeResponse>>> {
    trace!("Entering update_recipe function for recipe_id: {}", recipe_id);
    let existing = load_own_recipe(&state, recipe_id, me.id).await?;
    request.validate()?;
    validate_composition(&request.tags, &request.ingredients)?;
    let image = request.image.as_deref().map(decode_image).transpose()?;
    let old_image = existing.image.clone();

    let txn = state.db.begin().await?;
    ensure_references_exist(&txn, &request.tags, &request.ingredients).await?;
    replace_links(&txn, existing.id, &request.tags, &request.ingredients).await?;

    let stored = match &image {
        Some(image) => Some(store_image(&state.media_root, recipe_id, image).await?),
        None => None,
    };
    let mut active: recipe::ActiveModel = existing.into();
    active.name = Set(request.name.clone());
    active.text = Set(request.text.clone());
    active.cooking_time = Set(request.cooking_time);
    if let Some(path) = &stored {
        active.image = Set(path.clone());
    }
    let saved = match active.update(&txn).await {
        Ok(saved) => saved,
        Err(e) => {
            discard_image(&state.media_root, stored.as_ref()).await;
            return Err(ApiError::from_unique_violation(e, DUPLICATE_RECIPE));
        }
    };

    if let Err(e) = txn.commit().await {
        error!("Failed to commit update of recipe {}: {}", recipe_id, e);
        discard_image(&state.media_root, stored.as_ref()).await;
        return Err(e.into());
    }
    if stored.is_some() {
        remove_image(&state.media_root, &old_image).await;
    }

    info!("Recipe {} updated successfully", recipe_id);
    let response = recipe_response(&state.db, saved, Some(me.id)).await?;
    Ok(Json(ApiResponse::ok(response, "Recipe updated successfully")))
}

/// Delete a recipe
#[utoipa::path(
    delete,
    path = "/api/v1/recipes/{recipe_id}",
    tag = "recipes",
    params(
        ("recipe_id" = i32, Path, description = "Recipe ID"),
    ),
    responses(
        (status = 204, description = "Recipe deleted successfully"),
        (status = 401, description = "Not authenticated", body = ErrorResponse),
        (status = 403, description = "Not the author", body = ErrorResponse),
        (status = 404, description = "Recipe not found", body = ErrorResponse),
        (status = 500, description = "Internal server error", body = ErrorResponse)
    )
)]
#[instrument(skip(state))]
pub async fn delete_recipe(
    Path(recipe_id): Path<i32>,
    State(state): State<AppState>,
    CurrentUser(me): CurrentUser,
) -> ApiResult<StatusCode> {
    let existing = load_own_recipe(&state, recipe_id, me.id).await?;
    let image = existing.image.clone();

    existing.delete(&state.db).await?;
    remove_image(&state.media_root, &image).await;

    info!("Recipe {} deleted successfully", recipe_id);
    Ok(StatusCode::NO_CONTENT)
}
