use crate::error::{ApiError, ApiResult};
use crate::extract::{Json, Path};
use crate::schemas::{ApiResponse, AppState, ErrorResponse};
use axum::{extract::State, http::StatusCode};
use compute::tags::{is_valid_slug, normalize_color, slugify};
use model::entities::tag;
use sea_orm::{ActiveModelTrait, EntityTrait, QueryOrder, Set};
use serde::{Deserialize, Serialize};
use tracing::{debug, info, instrument, trace, warn};
use utoipa::ToSchema;
use validator::Validate;

/// Request structure for creating a new tag
#[derive(Debug, Deserialize, Serialize, ToSchema, Validate)]
pub struct CreateTagRequest {
    /// The name of the tag (must be unique)
    #[validate(length(min = 1, max = 200))]
    pub name: String,
    /// HEX colour, `#RRGGBB`
    pub color: String,
    /// URL slug; derived from the name when absent or empty
    #[validate(length(max = 200))]
    pub slug: Option<String>,
}

/// Response structure for tag operations
#[derive(Debug, Clone, Serialize, Deserialize, ToSchema, PartialEq)]
pub struct TagResponse {
    pub id: i32,
    pub name: String,
    pub color: String,
    pub slug: String,
}

impl From<tag::Model> for TagResponse {
    fn from(model: tag::Model) -> Self {
        Self {
            id: model.id,
            name: model.name,
            color: model.color,
            slug: model.slug,
        }
    }
}

/// Create a new tag
#[utoipa::path(
    post,
    path = "/api/v1/tags",
    tag = "tags",
    request_body = CreateTagRequest,
    responses(
        (status = 201, description = "Tag created successfully", body = ApiResponse<TagResponse>),
        (status = 400, description = "Invalid request or tag already exists", body = ErrorResponse),
        (status = 500, description = "Internal server error", body = ErrorResponse)
    )
)]
#[instrument(skip(state))]
pub async fn create_tag(
    State(state): State<AppState>,
    Json(request): Json<CreateTagRequest>,
) -> ApiResult<(StatusCode, Json<ApiResponse<TagResponse>>)> {
    trace!("Entering create_tag function");
    request.validate()?;

    let color = normalize_color(&request.color)
        .ok_or_else(|| ApiError::validation("Colour must be a HEX code like #49B64E", Some("color")))?;

    let slug = match request.slug.as_deref().map(str::trim) {
        Some(slug) if !slug.is_empty() => slug.to_string(),
        _ => slugify(&request.name),
    };
    if !is_valid_slug(&slug) {
        warn!("Rejected slug '{}' for tag '{}'", slug, request.name);
        return Err(ApiError::validation(
            "Slug may only contain letters, digits, '-' and '_'",
            Some("slug"),
        ));
    }
    debug!("Creating tag '{}' with colour {} and slug '{}'", request.name, color, slug);

    let model = tag::ActiveModel {
        name: Set(request.name.trim().to_string()),
        color: Set(color),
        slug: Set(slug),
        ..Default::default()
    }
    .insert(&state.db)
    .await
    .map_err(|e| ApiError::from_unique_violation(e, "A tag with this name or slug already exists"))?;

    info!("Tag created successfully with ID: {}", model.id);
    Ok((
        StatusCode::CREATED,
        Json(ApiResponse::ok(TagResponse::from(model), "Tag created successfully")),
    ))
}

/// List all tags
#[utoipa::path(
    get,
    path = "/api/v1/tags",
    tag = "tags",
    responses(
        (status = 200, description = "Tags retrieved successfully", body = ApiResponse<Vec<TagResponse>>),
        (status = 500, description = "Internal server error", body = ErrorResponse)
    )
)]
#[instrument(skip(state))]
pub async fn get_tags(State(state): State<AppState>) -> ApiResult<Json<ApiResponse<Vec<TagResponse>>>> {
    let tags = tag::Entity::find()
        .order_by_asc(tag::Column::Id)
        .all(&state.db)
        .await?;
    debug!("Retrieved {} tags", tags.len());

    Ok(Json(ApiResponse::ok(
        tags.into_iter().map(TagResponse::from).collect(),
        "Tags retrieved successfully",
    )))
}

/// Get a tag by ID
#[utoipa::path(
    get,
    path = "/api/v1/tags/{tag_id}",
    tag = "tags",
    params(
        ("tag_id" = i32, Path, description = "Tag ID"),
    ),
    responses(
        (status = 200, description = "Tag retrieved successfully", body = ApiResponse<TagResponse>),
        (status = 404, description = "Tag not found", body = ErrorResponse),
        (status = 500, description = "Internal server error", body = ErrorResponse)
    )
)]
#[instrument(skip(state))]
pub async fn get_tag(
    Path(tag_id): Path<i32>,
    State(state): State<AppState>,
) -> ApiResult<Json<ApiResponse<TagResponse>>> {
    let tag = tag::Entity::find_by_id(tag_id)
        .one(&state.db)
        .await?
        .ok_or_else(|| ApiError::NotFound(format!("Tag {tag_id} not found")))?;

    Ok(Json(ApiResponse::ok(TagResponse::from(tag), "Tag retrieved successfully")))
}
