use sqlx::PgPool;

use crate::database::manager::{log_query_error, DatabaseError};
use crate::database::models::job::{Job, JobPatch, JobStatus, NewJob};
use crate::database::patch::{self, fetch_by_id, normalize_json_text};

pub async fn create(pool: &PgPool, company_id: i32, job: NewJob) -> Result<Job, DatabaseError> {
    let salary_min = job.salary_min();
    let salary_max = job.salary_max();
    let skills = normalize_json_text(job.skills.unwrap_or_else(|| serde_json::json!([])));

    sqlx::query_as::<_, Job>(
        "INSERT INTO jobs (
            company_id, title, department, location, employment_type, experience_level,
            salary_min, salary_max, description, requirements, responsibilities, skills,
            is_remote, is_urgent
        ) VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10, $11, $12::jsonb, $13, $14)
        RETURNING *",
    )
    .bind(company_id)
    .bind(&job.title)
    .bind(job.department.filter(|s| !s.is_empty()))
    .bind(&job.location)
    .bind(&job.employment_type)
    .bind(job.experience_level.filter(|s| !s.is_empty()))
    .bind(salary_min)
    .bind(salary_max)
    .bind(&job.description)
    .bind(job.requirements.filter(|s| !s.is_empty()))
    .bind(job.responsibilities.filter(|s| !s.is_empty()))
    .bind(skills)
    .bind(job.is_remote.unwrap_or(false))
    .bind(job.is_urgent.unwrap_or(false))
    .fetch_one(pool)
    .await
    .map_err(|e| log_query_error("jobs", e))
}

/// Jobs for a company, newest first; `limit` caps the list for dashboards.
pub async fn list_by_company(pool: &PgPool, company_id: i32, limit: Option<i64>) -> Result<Vec<Job>, DatabaseError> {
    sqlx::query_as::<_, Job>(
        "SELECT * FROM jobs WHERE company_id = $1 ORDER BY created_at DESC, id DESC LIMIT $2",
    )
    .bind(company_id)
    .bind(limit)
    .fetch_all(pool)
    .await
    .map_err(|e| log_query_error("jobs", e))
}

pub async fn find_by_id(pool: &PgPool, id: i32) -> Result<Option<Job>, DatabaseError> {
    fetch_by_id(pool, "jobs", id).await
}

pub async fn update(pool: &PgPool, id: i32, changes: JobPatch) -> Result<Option<Job>, DatabaseError> {
    patch::apply(pool, id, changes).await
}

pub async fn update_status(pool: &PgPool, id: i32, status: JobStatus) -> Result<Option<Job>, DatabaseError> {
    patch::apply(pool, id, JobPatch::status(status)).await
}

/// The only write path for the applicant counter.
pub async fn increment_applicants(pool: &PgPool, id: i32) -> Result<Option<Job>, DatabaseError> {
    sqlx::query_as::<_, Job>(
        "UPDATE jobs SET applicants_count = applicants_count + 1, updated_at = CURRENT_TIMESTAMP
         WHERE id = $1 RETURNING *",
    )
    .bind(id)
    .fetch_optional(pool)
    .await
    .map_err(|e| log_query_error("jobs", e))
}

pub async fn delete(pool: &PgPool, id: i32) -> Result<Option<Job>, DatabaseError> {
    sqlx::query_as::<_, Job>("DELETE FROM jobs WHERE id = $1 RETURNING *")
        .bind(id)
        .fetch_optional(pool)
        .await
        .map_err(|e| log_query_error("jobs", e))
}
