use axum::{
    extract::{Extension, Path},
    response::Json,
};
use serde_json::Value;

use crate::database::models::user::{User, UserPatch};
use crate::database::{users, DatabaseManager};
use crate::error::ApiError;
use crate::handlers::{parse_body, parse_id};
use crate::middleware::{ApiResponse, ApiResult, AuthUser};

/// Account changes are only allowed on the caller's own account.
fn ensure_self(auth: AuthUser, id: i32) -> Result<(), ApiError> {
    if auth.id != id {
        tracing::warn!("User {} attempted to modify user {}", auth.id, id);
        return Err(ApiError::forbidden("Access denied"));
    }
    Ok(())
}

/// GET /api/users
pub async fn list() -> ApiResult<Vec<User>> {
    let pool = DatabaseManager::pool()?;
    Ok(ApiResponse::success("Users retrieved successfully", users::list(&pool).await?))
}

/// GET /api/users/:id
pub async fn get(Path(raw_id): Path<String>) -> ApiResult<User> {
    let id = parse_id(&raw_id)?;
    let pool = DatabaseManager::pool()?;
    let user = users::find_by_id(&pool, id)
        .await?
        .ok_or_else(|| ApiError::not_found("User not found"))?;
    Ok(ApiResponse::success("User retrieved successfully", user))
}

async fn apply_patch(auth: AuthUser, id: i32, payload: Value) -> Result<User, ApiError> {
    ensure_self(auth, id)?;
    let patch: UserPatch = parse_body(payload)?;

    let pool = DatabaseManager::pool()?;
    users::update(&pool, id, patch.prepare()?)
        .await?
        .ok_or_else(|| ApiError::not_found("User not found"))
}

/// PUT /api/users/:id
pub async fn update(
    Extension(auth): Extension<AuthUser>,
    Path(raw_id): Path<String>,
    Json(payload): Json<Value>,
) -> ApiResult<User> {
    let id = parse_id(&raw_id)?;
    let user = apply_patch(auth, id, payload).await?;
    Ok(ApiResponse::success("User updated successfully", user))
}

/// PUT /api/users/:id/profile
pub async fn update_profile(
    Extension(auth): Extension<AuthUser>,
    Path(raw_id): Path<String>,
    Json(payload): Json<Value>,
) -> ApiResult<User> {
    let id = parse_id(&raw_id)?;
    let user = apply_patch(auth, id, payload).await?;
    Ok(ApiResponse::success("User profile updated successfully", user))
}

/// DELETE /api/users/:id - Cascades to the user's company and its jobs
pub async fn delete(Extension(auth): Extension<AuthUser>, Path(raw_id): Path<String>) -> ApiResult<User> {
    let id = parse_id(&raw_id)?;
    ensure_self(auth, id)?;

    let pool = DatabaseManager::pool()?;
    let user = users::delete(&pool, id)
        .await?
        .ok_or_else(|| ApiError::not_found("User not found"))?;

    tracing::info!("Deleted user {}", user.id);
    Ok(ApiResponse::success("User deleted successfully", user))
}
