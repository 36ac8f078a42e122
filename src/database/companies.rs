use sqlx::PgPool;

use crate::database::manager::{log_query_error, DatabaseError};
use crate::database::models::company::{Company, CompanyPatch, NewCompany};
use crate::database::patch::{self, fetch_by_id, normalize_json_text};

pub async fn list(pool: &PgPool) -> Result<Vec<Company>, DatabaseError> {
    sqlx::query_as::<_, Company>("SELECT * FROM company_profile ORDER BY id")
        .fetch_all(pool)
        .await
        .map_err(|e| log_query_error("company_profile", e))
}

pub async fn find_by_id(pool: &PgPool, id: i32) -> Result<Option<Company>, DatabaseError> {
    fetch_by_id(pool, "company_profile", id).await
}

pub async fn find_by_owner(pool: &PgPool, owner_id: i32) -> Result<Option<Company>, DatabaseError> {
    sqlx::query_as::<_, Company>("SELECT * FROM company_profile WHERE owner_id = $1")
        .bind(owner_id)
        .fetch_optional(pool)
        .await
        .map_err(|e| log_query_error("company_profile", e))
}

/// Insert a profile owned by `owner_id`.
pub async fn create(pool: &PgPool, owner_id: i32, company: NewCompany) -> Result<Company, DatabaseError> {
    let social_links = company.social_links.and_then(normalize_json_text);

    sqlx::query_as::<_, Company>(
        "INSERT INTO company_profile (
            owner_id, company_name, address, city, state, country, postal_code,
            website, logo_url, banner_url, industry, founded_date, description, social_links
        ) VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10, $11, $12, $13, $14::jsonb) RETURNING *",
    )
    .bind(owner_id)
    .bind(&company.company_name)
    .bind(&company.address)
    .bind(&company.city)
    .bind(&company.state)
    .bind(&company.country)
    .bind(&company.postal_code)
    .bind(company.website.filter(|s| !s.is_empty()))
    .bind(company.logo_url.filter(|s| !s.is_empty()))
    .bind(company.banner_url.filter(|s| !s.is_empty()))
    .bind(&company.industry)
    .bind(company.founded_date.flatten())
    .bind(company.description.filter(|s| !s.is_empty()))
    .bind(social_links)
    .fetch_one(pool)
    .await
    .map_err(|e| log_query_error("company_profile", e))
}

pub async fn update(pool: &PgPool, id: i32, changes: CompanyPatch) -> Result<Option<Company>, DatabaseError> {
    patch::apply(pool, id, changes).await
}

/// Delete the profile; its jobs go with it.
pub async fn delete(pool: &PgPool, id: i32) -> Result<Option<Company>, DatabaseError> {
    sqlx::query_as::<_, Company>("DELETE FROM company_profile WHERE id = $1 RETURNING *")
        .bind(id)
        .fetch_optional(pool)
        .await
        .map_err(|e| log_query_error("company_profile", e))
}
