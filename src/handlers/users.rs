use crate::auth::{CurrentUser, MaybeUser};
use crate::error::{ApiError, ApiResult};
use crate::extract::{Json, Path, ValidQuery};
use crate::handlers::recipes::RecipeShortResponse;
use crate::schemas::{ApiResponse, AppState, ErrorResponse, Page, PageQuery};
use axum::{extract::State, http::StatusCode};
use model::entities::{recipe, subscription, user};
use sea_orm::{
    ActiveModelTrait, ColumnTrait, ConnectionTrait, EntityTrait, ModelTrait, PaginatorTrait,
    QueryFilter, QueryOrder, QuerySelect, Set,
};
use serde::{Deserialize, Serialize};
use tracing::{debug, info, instrument, trace, warn};
use utoipa::{IntoParams, ToSchema};
use validator::Validate;

/// Usernames that would shadow fixed routes under `/users/`.
const RESERVED_USERNAMES: [&str; 2] = ["me", "subscriptions"];

/// Request body for creating a new user
#[derive(Debug, Deserialize, Serialize, ToSchema, Validate)]
pub struct CreateUserRequest {
    /// Username (must be unique): letters, digits and `@.+-_`
    #[validate(length(min = 1, max = 150))]
    pub username: String,
    /// E-mail address (must be unique)
    #[validate(email, length(max = 254))]
    pub email: String,
    #[validate(length(max = 150))]
    pub first_name: String,
    #[validate(length(max = 150))]
    pub last_name: String,
}

/// User response model
#[derive(Debug, Clone, Serialize, Deserialize, ToSchema, PartialEq)]
pub struct UserResponse {
    pub id: i32,
    pub username: String,
    pub email: String,
    pub first_name: String,
    pub last_name: String,
    /// Whether the caller follows this user (false for anonymous callers)
    pub is_subscribed: bool,
}

impl UserResponse {
    pub fn new(model: user::Model, is_subscribed: bool) -> Self {
        Self {
            id: model.id,
            username: model.username,
            email: model.email,
            first_name: model.first_name,
            last_name: model.last_name,
            is_subscribed,
        }
    }
}

/// An author the caller follows, with a preview of their recipes
#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct SubscriptionResponse {
    #[serde(flatten)]
    pub author: UserResponse,
    pub recipes: Vec<RecipeShortResponse>,
    pub recipes_count: u64,
}

/// Query parameters for the subscriptions list
#[derive(Debug, Deserialize, ToSchema, IntoParams, Validate)]
pub struct SubscriptionsQuery {
    /// Page number (default: 1)
    #[validate(range(min = 1, max = 100000))]
    pub page: Option<u64>,
    /// Page size (default: 6)
    #[validate(range(min = 1, max = 100))]
    pub limit: Option<u64>,
    /// Maximum number of recipes shown per author
    #[validate(range(min = 0, max = 1000))]
    pub recipes_limit: Option<u64>,
}

fn check_username(username: &str) -> Result<(), ApiError> {
    if RESERVED_USERNAMES
        .iter()
        .any(|reserved| username.eq_ignore_ascii_case(reserved))
    {
        return Err(ApiError::validation(
            format!("Username '{username}' is not allowed"),
            Some("username"),
        ));
    }
    if !username
        .chars()
        .all(|c| c.is_alphanumeric() || "@.+-_".contains(c))
    {
        return Err(ApiError::validation(
            "Username may only contain letters, digits and @/./+/-/_",
            Some("username"),
        ));
    }
    Ok(())
}

/// Whether `viewer` follows `author_id`.
pub async fn is_subscribed<C: ConnectionTrait>(
    db: &C,
    viewer: Option<i32>,
    author_id: i32,
) -> Result<bool, sea_orm::DbErr> {
    let Some(viewer) = viewer else {
        return Ok(false);
    };
    let count = subscription::Entity::find()
        .filter(subscription::Column::UserId.eq(viewer))
        .filter(subscription::Column::AuthorId.eq(author_id))
        .count(db)
        .await?;
    Ok(count > 0)
}

async fn subscription_response<C: ConnectionTrait>(
    db: &C,
    author: user::Model,
    recipes_limit: Option<u64>,
) -> Result<SubscriptionResponse, sea_orm::DbErr> {
    let recipes_count = author.find_related(recipe::Entity).count(db).await?;
    let recipes = author
        .find_related(recipe::Entity)
        .order_by_desc(recipe::Column::CreatedAt)
        .order_by_desc(recipe::Column::Id)
        .limit(recipes_limit)
        .all(db)
        .await?
        .into_iter()
        .map(RecipeShortResponse::from)
        .collect();

    Ok(SubscriptionResponse {
        author: UserResponse::new(author, true),
        recipes,
        recipes_count,
    })
}

/// Create a new user
#[utoipa::path(
    post,
    path = "/api/v1/users",
    tag = "users",
    request_body = CreateUserRequest,
    responses(
        (status = 201, description = "User created successfully", body = ApiResponse<UserResponse>),
        (status = 400, description = "Invalid request or user already exists", body = ErrorResponse),
        (status = 500, description = "Internal server error", body = ErrorResponse)
    )
)]
#[instrument(skip(state))]
pub async fn create_user(
    State(state): State<AppState>,
    Json(request): Json<CreateUserRequest>,
) -> ApiResult<(StatusCode, Json<ApiResponse<UserResponse>>)> {
    trace!("Entering create_user function");
    request.validate()?;
    check_username(&request.username)?;
    debug!("Creating user with username: {}", request.username);

    let user_model = user::ActiveModel {
        username: Set(request.username.clone()),
        email: Set(request.email.to_lowercase()),
        first_name: Set(request.first_name.clone()),
        last_name: Set(request.last_name.clone()),
        ..Default::default()
    }
    .insert(&state.db)
    .await
    .map_err(|e| {
        ApiError::from_unique_violation(e, "A user with this username or email already exists")
    })?;

    info!(
        "User created successfully with ID: {}, username: {}",
        user_model.id, user_model.username
    );
    Ok((
        StatusCode::CREATED,
        Json(ApiResponse::ok(
            UserResponse::new(user_model, false),
            "User created successfully",
        )),
    ))
}

/// List users
#[utoipa::path(
    get,
    path = "/api/v1/users",
    tag = "users",
    params(PageQuery),
    responses(
        (status = 200, description = "Users retrieved successfully", body = ApiResponse<Page<UserResponse>>),
        (status = 400, description = "Invalid pagination parameters", body = ErrorResponse),
        (status = 500, description = "Internal server error", body = ErrorResponse)
    )
)]
#[instrument(skip(state))]
pub async fn get_users(
    ValidQuery(query): ValidQuery<PageQuery>,
    State(state): State<AppState>,
    viewer: MaybeUser,
) -> ApiResult<Json<ApiResponse<Page<UserResponse>>>> {
    let page = query.page.unwrap_or(1);
    let limit = query.limit.unwrap_or(state.default_page_size);
    debug!("Fetching users - page: {}, limit: {}", page, limit);

    let paginator = user::Entity::find()
        .order_by_asc(user::Column::Id)
        .paginate(&state.db, limit);
    let count = paginator.num_items().await?;
    let users = paginator.fetch_page(page - 1).await?;

    let mut results = Vec::with_capacity(users.len());
    for user_model in users {
        let subscribed = is_subscribed(&state.db, viewer.id(), user_model.id).await?;
        results.push(UserResponse::new(user_model, subscribed));
    }

    Ok(Json(ApiResponse::ok(
        Page::new(results, count, page, limit),
        "Users retrieved successfully",
    )))
}

/// Get a specific user by ID
#[utoipa::path(
    get,
    path = "/api/v1/users/{user_id}",
    tag = "users",
    params(
        ("user_id" = i32, Path, description = "User ID"),
    ),
    responses(
        (status = 200, description = "User retrieved successfully", body = ApiResponse<UserResponse>),
        (status = 404, description = "User not found", body = ErrorResponse),
        (status = 500, description = "Internal server error", body = ErrorResponse)
    )
)]
#[instrument(skip(state))]
pub async fn get_user(
    Path(user_id): Path<i32>,
    State(state): State<AppState>,
    viewer: MaybeUser,
) -> ApiResult<Json<ApiResponse<UserResponse>>> {
    let user_model = user::Entity::find_by_id(user_id)
        .one(&state.db)
        .await?
        .ok_or_else(|| ApiError::NotFound(format!("User {user_id} not found")))?;
    let subscribed = is_subscribed(&state.db, viewer.id(), user_model.id).await?;

    Ok(Json(ApiResponse::ok(
        UserResponse::new(user_model, subscribed),
        "User retrieved successfully",
    )))
}

/// Get the current user
#[utoipa::path(
    get,
    path = "/api/v1/users/me",
    tag = "users",
    responses(
        (status = 200, description = "Current user", body = ApiResponse<UserResponse>),
        (status = 401, description = "Not authenticated", body = ErrorResponse)
    )
)]
#[instrument]
pub async fn get_me(CurrentUser(me): CurrentUser) -> ApiResult<Json<ApiResponse<UserResponse>>> {
    Ok(Json(ApiResponse::ok(
        UserResponse::new(me, false),
        "User retrieved successfully",
    )))
}

/// List the authors the current user follows
#[utoipa::path(
    get,
    path = "/api/v1/users/subscriptions",
    tag = "users",
    params(SubscriptionsQuery),
    responses(
        (status = 200, description = "Subscriptions retrieved successfully", body = ApiResponse<Page<SubscriptionResponse>>),
        (status = 401, description = "Not authenticated", body = ErrorResponse),
        (status = 500, description = "Internal server error", body = ErrorResponse)
    )
)]
#[instrument(skip(state))]
pub async fn get_subscriptions(
    ValidQuery(query): ValidQuery<SubscriptionsQuery>,
    State(state): State<AppState>,
    CurrentUser(me): CurrentUser,
) -> ApiResult<Json<ApiResponse<Page<SubscriptionResponse>>>> {
    let page = query.page.unwrap_or(1);
    let limit = query.limit.unwrap_or(state.default_page_size);

    let paginator = subscription::Entity::find()
        .filter(subscription::Column::UserId.eq(me.id))
        .order_by_asc(subscription::Column::Id)
        .paginate(&state.db, limit);
    let count = paginator.num_items().await?;
    let subscriptions = paginator.fetch_page(page - 1).await?;

    let mut results = Vec::with_capacity(subscriptions.len());
    for sub in subscriptions {
        if let Some(author) = user::Entity::find_by_id(sub.author_id).one(&state.db).await? {
            results.push(subscription_response(&state.db, author, query.recipes_limit).await?);
        }
    }
    debug!("User {} follows {} authors", me.id, count);

    Ok(Json(ApiResponse::ok(
        Page::new(results, count, page, limit),
        "Subscriptions retrieved successfully",
    )))
}

/// Follow an author
#[utoipa::path(
    post,
    path = "/api/v1/users/{user_id}/subscribe",
    tag = "users",
    params(
        ("user_id" = i32, Path, description = "Author ID"),
        SubscriptionsQuery,
    ),
    responses(
        (status = 201, description = "Subscribed", body = ApiResponse<SubscriptionResponse>),
        (status = 400, description = "Self-subscription or already subscribed", body = ErrorResponse),
        (status = 401, description = "Not authenticated", body = ErrorResponse),
        (status = 404, description = "Author not found", body = ErrorResponse)
    )
)]
#[instrument(skip(state))]
pub async fn subscribe(
    Path(author_id): Path<i32>,
    ValidQuery(query): ValidQuery<SubscriptionsQuery>,
    State(state): State<AppState>,
    CurrentUser(me): CurrentUser,
) -> ApiResult<(StatusCode, Json<ApiResponse<SubscriptionResponse>>)> {
    let author = user::Entity::find_by_id(author_id)
        .one(&state.db)
        .await?
        .ok_or_else(|| ApiError::NotFound(format!("User {author_id} not found")))?;

    if author.id == me.id {
        warn!("User {} tried to subscribe to themselves", me.id);
        return Err(ApiError::validation("You cannot subscribe to yourself", None));
    }

    subscription::ActiveModel {
        user_id: Set(me.id),
        author_id: Set(author.id),
        ..Default::default()
    }
    .insert(&state.db)
    .await
    .map_err(|e| ApiError::from_unique_violation(e, "You are already subscribed to this author"))?;

    info!("User {} subscribed to {}", me.id, author.id);
    let response = subscription_response(&state.db, author, query.recipes_limit).await?;
    Ok((
        StatusCode::CREATED,
        Json(ApiResponse::ok(response, "Subscribed successfully")),
    ))
}

/// Unfollow an author
#[utoipa::path(
    delete,
    path = "/api/v1/users/{user_id}/subscribe",
    tag = "users",
    params(
        ("user_id" = i32, Path, description = "Author ID"),
    ),
    responses(
        (status = 204, description = "Unsubscribed"),
        (status = 400, description = "Not subscribed", body = ErrorResponse),
        (status = 401, description = "Not authenticated", body = ErrorResponse),
        (status = 404, description = "Author not found", body = ErrorResponse)
    )
)]
#[instrument(skip(state))]
pub async fn unsubscribe(
    Path(author_id): Path<i32>,
    State(state): State<AppState>,
    CurrentUser(me): CurrentUser,
) -> ApiResult<StatusCode> {
    user::Entity::find_by_id(author_id)
        .one(&state.db)
        .await?
        .ok_or_else(|| ApiError::NotFound(format!("User {author_id} not found")))?;

    let result = subscription::Entity::delete_many()
        .filter(subscription::Column::UserId.eq(me.id))
        .filter(subscription::Column::AuthorId.eq(author_id))
        .exec(&state.db)
        .await?;

    if result.rows_affected == 0 {
        return Err(ApiError::LinkNotFound(
            "You are not subscribed to this author".to_string(),
        ));
    }

    info!("User {} unsubscribed from {}", me.id, author_id);
    Ok(StatusCode::NO_CONTENT)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn reserved_usernames_are_rejected() {
        assert!(check_username("me").is_err());
        assert!(check_username("Me").is_err());
        assert!(check_username("subscriptions").is_err());
        assert!(check_username("meme").is_ok());
    }

    #[test]
    fn username_charset() {
        assert!(check_username("john.doe+test@mail_1-2").is_ok());
        assert!(check_username("Мария").is_ok());
        assert!(check_username("john doe").is_err());
        assert!(check_username("john/doe").is_err());
    }
}
