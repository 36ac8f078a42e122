use axum::extract::Path;

use crate::database::models::job::Job;
use crate::database::{jobs, DatabaseManager};
use crate::error::ApiError;
use crate::handlers::parse_id;
use crate::middleware::{ApiResponse, ApiResult};

/// POST /api/jobs/:id/apply - Count an application (no deduplication)
pub async fn apply(Path(raw_id): Path<String>) -> ApiResult<Job> {
    let id = parse_id(&raw_id)?;
    let pool = DatabaseManager::pool()?;
    let job = jobs::increment_applicants(&pool, id)
        .await?
        .ok_or_else(|| ApiError::not_found("Job not found"))?;

    tracing::info!("Job {} now has {} applicants", job.id, job.applicants_count);
    Ok(ApiResponse::success("Application submitted successfully", job))
}
