use axum::{
    extract::{Extension, Path, State},
    response::Json,
};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use sqlx::PgPool;

use crate::database::manager::DatabaseError;
use crate::database::models::company::{Company, CompanyPatch, NewCompany};
use crate::database::{companies, DatabaseManager};
use crate::error::ApiError;
use crate::handlers::{non_blank, parse_body, parse_id};
use crate::middleware::{ApiResponse, ApiResult, AuthUser};
use crate::services::{ImageHost, UploadOptions};
use crate::state::AppState;

async fn own_company(pool: &PgPool, auth: AuthUser) -> Result<Company, ApiError> {
    companies::find_by_owner(pool, auth.id)
        .await?
        .ok_or_else(|| ApiError::not_found("Company profile not found"))
}

async fn owned_by(pool: &PgPool, auth: AuthUser, id: i32) -> Result<Company, ApiError> {
    let company = companies::find_by_id(pool, id)
        .await?
        .ok_or_else(|| ApiError::not_found("Company not found"))?;

    if company.owner_id != auth.id {
        tracing::warn!("User {} denied access to company {}", auth.id, id);
        return Err(ApiError::forbidden("Access denied"));
    }
    Ok(company)
}

/// Remove a replaced or orphaned asset; failures are only logged.
async fn discard_asset(images: &dyn ImageHost, public_id: Option<&str>) {
    if let Some(public_id) = public_id {
        if let Err(e) = images.destroy(public_id).await {
            tracing::warn!("Could not delete image {}: {}", public_id, e);
        }
    }
}

/// POST /api/companies/register - The caller becomes the owner
pub async fn register(Extension(auth): Extension<AuthUser>, Json(payload): Json<Value>) -> ApiResult<Company> {
    let company: NewCompany = parse_body(payload)?;

    let blank = company.blank_fields();
    if !blank.is_empty() {
        let field_errors = blank
            .into_iter()
            .map(|field| (field.to_string(), "This field is required".to_string()))
            .collect();
        return Err(ApiError::validation_error("Missing required fields", Some(field_errors)));
    }

    let pool = DatabaseManager::pool()?;
    if companies::find_by_owner(&pool, auth.id).await?.is_some() {
        return Err(ApiError::bad_request("Company profile already exists for this user"));
    }

    let created = companies::create(&pool, auth.id, company).await?;
    tracing::info!("User {} registered company {}", auth.id, created.id);
    Ok(ApiResponse::created("Company profile created successfully", created))
}

/// GET /api/companies/profile
pub async fn profile(Extension(auth): Extension<AuthUser>) -> ApiResult<Company> {
    let pool = DatabaseManager::pool()?;
    let company = own_company(&pool, auth).await?;
    Ok(ApiResponse::success("Company profile retrieved successfully", company))
}

/// Apply a client patch to company `id`. Both update routes accept the same
/// social links shapes and report unparsable links the same way.
async fn apply_patch(pool: &PgPool, id: i32, mut patch: CompanyPatch) -> Result<Option<Company>, ApiError> {
    patch.normalize_social_links();

    match companies::update(pool, id, patch).await {
        Ok(updated) => Ok(updated),
        Err(DatabaseError::InvalidInput(msg)) => {
            tracing::warn!("Rejected update for company {}: {}", id, msg);
            Err(ApiError::bad_request(
                "Invalid social links format. Please check your social media URLs.",
            ))
        }
        Err(e) => Err(e.into()),
    }
}

/// PUT /api/companies/profile
pub async fn update_profile(Extension(auth): Extension<AuthUser>, Json(payload): Json<Value>) -> ApiResult<Company> {
    let patch: CompanyPatch = parse_body(payload)?;

    let pool = DatabaseManager::pool()?;
    let company = own_company(&pool, auth).await?;

    let updated = apply_patch(&pool, company.id, patch)
        .await?
        .ok_or_else(|| ApiError::not_found("Company profile not found"))?;
    Ok(ApiResponse::success("Company profile updated successfully", updated))
}

#[derive(Debug, Deserialize)]
pub struct UploadRequest {
    image: Option<String>,
}

#[derive(Debug, Serialize)]
pub struct UploadedUrl {
    pub url: String,
}

#[derive(Clone, Copy)]
enum Slot {
    Logo,
    Banner,
}

/// Upload, point the row at the new asset, then drop the old one.
async fn replace_image(state: &AppState, auth: AuthUser, payload: Value, slot: Slot) -> Result<String, ApiError> {
    let req: UploadRequest = parse_body(payload)?;
    let image = non_blank(&req.image).ok_or_else(|| ApiError::bad_request("Image data is required"))?;

    let pool = DatabaseManager::pool()?;
    let company = own_company(&pool, auth).await?;

    let (options, previous) = match slot {
        Slot::Logo => (UploadOptions::COMPANY_LOGO, company.logo_public_id),
        Slot::Banner => (UploadOptions::COMPANY_BANNER, company.banner_public_id),
    };

    let uploaded = state.images.upload(image, options).await?;
    let patch = match slot {
        Slot::Logo => CompanyPatch::logo(uploaded.url.clone(), uploaded.public_id.clone()),
        Slot::Banner => CompanyPatch::banner(uploaded.url.clone(), uploaded.public_id.clone()),
    };

    if let Err(e) = companies::update(&pool, company.id, patch).await {
        // Row never pointed at the new asset
        discard_asset(state.images.as_ref(), Some(&uploaded.public_id)).await;
        return Err(e.into());
    }

    if previous.as_deref() != Some(uploaded.public_id.as_str()) {
        discard_asset(state.images.as_ref(), previous.as_deref()).await;
    }

    Ok(uploaded.url)
}

/// POST /api/companies/upload-logo
pub async fn upload_logo(
    State(state): State<AppState>,
    Extension(auth): Extension<AuthUser>,
    Json(payload): Json<Value>,
) -> ApiResult<UploadedUrl> {
    let url = replace_image(&state, auth, payload, Slot::Logo).await?;
    Ok(ApiResponse::success("Logo uploaded successfully", UploadedUrl { url }))
}

/// POST /api/companies/upload-banner
pub async fn upload_banner(
    State(state): State<AppState>,
    Extension(auth): Extension<AuthUser>,
    Json(payload): Json<Value>,
) -> ApiResult<UploadedUrl> {
    let url = replace_image(&state, auth, payload, Slot::Banner).await?;
    Ok(ApiResponse::success("Banner uploaded successfully", UploadedUrl { url }))
}

/// GET /api/companies
pub async fn list() -> ApiResult<Vec<Company>> {
    let pool = DatabaseManager::pool()?;
    Ok(ApiResponse::success("Companies retrieved successfully", companies::list(&pool).await?))
}

/// GET /api/companies/:id
pub async fn get(Path(raw_id): Path<String>) -> ApiResult<Company> {
    let id = parse_id(&raw_id)?;
    let pool = DatabaseManager::pool()?;
    let company = companies::find_by_id(&pool, id)
        .await?
        .ok_or_else(|| ApiError::not_found("Company not found"))?;
    Ok(ApiResponse::success("Company retrieved successfully", company))
}

/// PUT /api/companies/:id
pub async fn update(
    Extension(auth): Extension<AuthUser>,
    Path(raw_id): Path<String>,
    Json(payload): Json<Value>,
) -> ApiResult<Company> {
    let id = parse_id(&raw_id)?;
    let patch: CompanyPatch = parse_body(payload)?;

    let pool = DatabaseManager::pool()?;
    owned_by(&pool, auth, id).await?;

    let updated = apply_patch(&pool, id, patch)
        .await?
        .ok_or_else(|| ApiError::not_found("Company not found"))?;
    Ok(ApiResponse::success("Company updated successfully", updated))
}

/// DELETE /api/companies/:id - Row first, then image assets
pub async fn delete(
    State(state): State<AppState>,
    Extension(auth): Extension<AuthUser>,
    Path(raw_id): Path<String>,
) -> ApiResult<Company> {
    let id = parse_id(&raw_id)?;
    let pool = DatabaseManager::pool()?;
    owned_by(&pool, auth, id).await?;

    let deleted = companies::delete(&pool, id)
        .await?
        .ok_or_else(|| ApiError::not_found("Company not found"))?;

    discard_asset(state.images.as_ref(), deleted.logo_public_id.as_deref()).await;
    discard_asset(state.images.as_ref(), deleted.banner_public_id.as_deref()).await;

    tracing::info!("User {} deleted company {}", auth.id, deleted.id);
    Ok(ApiResponse::success("Company deleted successfully", deleted))
}
