//! Caller identity. Tokens are issued and checked by an upstream gateway,
//! which forwards the authenticated user id in the `X-User-Id` header.

use axum::{async_trait, extract::FromRequestParts, http::request::Parts};
use model::entities::user;
use sea_orm::EntityTrait;
use tracing::debug;

use crate::error::ApiError;
use crate::schemas::AppState;

pub const USER_ID_HEADER: &str = "x-user-id";

/// The authenticated caller. Rejects the request with 401 when the header is
/// missing, malformed or names an unknown user.
#[derive(Debug, Clone)]
pub struct CurrentUser(pub user::Model);

/// The caller if one is identified; anonymous requests are let through.
/// A header naming an unknown user is still rejected.
#[derive(Debug, Clone)]
pub struct MaybeUser(pub Option<user::Model>);

impl MaybeUser {
    pub fn id(&self) -> Option<i32> {
        self.0.as_ref().map(|u| u.id)
    }
}

async fn resolve_user(parts: &Parts, state: &AppState) -> Result<Option<user::Model>, ApiError> {
    let Some(value) = parts.headers.get(USER_ID_HEADER) else {
        return Ok(None);
    };

    let user_id: i32 = value
        .to_str()
        .ok()
        .and_then(|v| v.trim().parse().ok())
        .ok_or_else(|| ApiError::Unauthorized("Invalid user id header".to_string()))?;

    match user::Entity::find_by_id(user_id).one(&state.db).await? {
        Some(user) => {
            debug!(user_id, "Resolved caller");
            Ok(Some(user))
        }
        None => Err(ApiError::Unauthorized(format!("Unknown user {user_id}"))),
    }
}

#[async_trait]
impl FromRequestParts<AppState> for CurrentUser {
    type Rejection = ApiError;

    async fn from_request_parts(parts: &mut Parts, state: &AppState) -> Result<Self, Self::Rejection> {
        resolve_user(parts, state)
            .await?
            .map(CurrentUser)
            .ok_or_else(|| ApiError::Unauthorized("Authentication credentials were not provided".to_string()))
    }
}

#[async_trait]
impl FromRequestParts<AppState> for MaybeUser {
    type Rejection = ApiError;

    async fn from_request_parts(parts: &mut Parts, state: &AppState) -> Result<Self, Self::Rejection> {
        Ok(MaybeUser(resolve_user(parts, state).await?))
    }
}
