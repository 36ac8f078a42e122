use axum::{
    extract::{Extension, Path, Query},
    response::Json,
};
use serde::Deserialize;
use serde_json::Value;
use sqlx::PgPool;

use crate::database::models::job::{Job, JobPatch, JobStatus, NewJob};
use crate::database::{companies, jobs, DatabaseManager};
use crate::error::ApiError;
use crate::handlers::{parse_body, parse_id};
use crate::middleware::{ApiResponse, ApiResult, AuthUser};

/// A job the caller may manage: it must exist and belong to the caller's company.
async fn owned_job(pool: &PgPool, auth: AuthUser, id: i32) -> Result<Job, ApiError> {
    let job = jobs::find_by_id(pool, id)
        .await?
        .ok_or_else(|| ApiError::not_found("Job not found"))?;

    match companies::find_by_owner(pool, auth.id).await? {
        Some(company) if company.id == job.company_id => Ok(job),
        _ => {
            tracing::warn!("User {} denied access to job {}", auth.id, id);
            Err(ApiError::forbidden("Access denied"))
        }
    }
}

/// POST /api/jobs
pub async fn create(Extension(auth): Extension<AuthUser>, Json(payload): Json<Value>) -> ApiResult<Job> {
    let job: NewJob = parse_body(payload)?;

    let field_errors = job.validate();
    if !field_errors.is_empty() {
        return Err(ApiError::validation_error("Validation failed", Some(field_errors)));
    }

    let pool = DatabaseManager::pool()?;
    let company = companies::find_by_owner(&pool, auth.id).await?.ok_or_else(|| {
        ApiError::not_found("Company profile not found. Please complete your company profile first.")
    })?;

    let created = jobs::create(&pool, company.id, job).await?;
    tracing::info!("Company {} posted job {}", company.id, created.id);
    Ok(ApiResponse::created("Job posted successfully", created))
}

#[derive(Debug, Deserialize)]
pub struct ListQuery {
    pub limit: Option<i64>,
}

/// GET /api/jobs?limit= - The caller's company's jobs, newest first
pub async fn list(Extension(auth): Extension<AuthUser>, Query(query): Query<ListQuery>) -> ApiResult<Vec<Job>> {
    let pool = DatabaseManager::pool()?;
    let company = companies::find_by_owner(&pool, auth.id)
        .await?
        .ok_or_else(|| ApiError::not_found("Company profile not found"))?;

    let limit = query.limit.map(|l| l.max(0));
    let listed = jobs::list_by_company(&pool, company.id, limit).await?;
    Ok(ApiResponse::success("Jobs retrieved successfully", listed))
}

/// GET /api/jobs/:id
pub async fn get(Extension(auth): Extension<AuthUser>, Path(raw_id): Path<String>) -> ApiResult<Job> {
    let id = parse_id(&raw_id)?;
    let pool = DatabaseManager::pool()?;
    let job = owned_job(&pool, auth, id).await?;
    Ok(ApiResponse::success("Job retrieved successfully", job))
}

/// PUT /api/jobs/:id
pub async fn update(
    Extension(auth): Extension<AuthUser>,
    Path(raw_id): Path<String>,
    Json(payload): Json<Value>,
) -> ApiResult<Job> {
    let id = parse_id(&raw_id)?;
    let patch: JobPatch = parse_body(payload)?;

    let pool = DatabaseManager::pool()?;
    owned_job(&pool, auth, id).await?;

    let updated = jobs::update(&pool, id, patch)
        .await?
        .ok_or_else(|| ApiError::not_found("Job not found"))?;
    Ok(ApiResponse::success("Job updated successfully", updated))
}

/// DELETE /api/jobs/:id
pub async fn delete(Extension(auth): Extension<AuthUser>, Path(raw_id): Path<String>) -> ApiResult<()> {
    let id = parse_id(&raw_id)?;
    let pool = DatabaseManager::pool()?;
    owned_job(&pool, auth, id).await?;

    jobs::delete(&pool, id).await?;
    tracing::info!("User {} deleted job {}", auth.id, id);
    Ok(ApiResponse::message("Job deleted successfully"))
}

#[derive(Debug, Deserialize)]
pub struct StatusRequest {
    #[serde(default)]
    status: Value,
}

/// PUT /api/jobs/:id/status
pub async fn update_status(
    Extension(auth): Extension<AuthUser>,
    Path(raw_id): Path<String>,
    Json(payload): Json<Value>,
) -> ApiResult<Job> {
    let id = parse_id(&raw_id)?;
    let req: StatusRequest = parse_body(payload)?;
    let status: JobStatus = req
        .status
        .as_str()
        .unwrap_or_default()
        .parse()
        .map_err(ApiError::bad_request)?;

    let pool = DatabaseManager::pool()?;
    owned_job(&pool, auth, id).await?;

    let updated = jobs::update_status(&pool, id, status)
        .await?
        .ok_or_else(|| ApiError::not_found("Job not found"))?;
    Ok(ApiResponse::success("Job status updated successfully", updated))
}
