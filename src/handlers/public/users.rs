use axum::{extract::State, response::Json};
use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::auth::{issue_token, password};
use crate::database::models::user::{Gender, NewUser, User};
use crate::database::{users, DatabaseManager};
use crate::error::ApiError;
use crate::handlers::{non_blank, parse_body};
use crate::middleware::{ApiResponse, ApiResult};
use crate::state::AppState;

use super::auth::{authenticate, LoginRequest};

#[derive(Debug, Deserialize)]
pub struct RegisterUserRequest {
    email: Option<String>,
    password: Option<String>,
    full_name: Option<String>,
    gender: Option<String>,
    mobile_no: Option<String>,
}

/// Full user record (password excluded by serialization) with a token.
#[derive(Debug, Serialize)]
pub struct UserWithToken {
    pub user: User,
    pub token: String,
}

/// POST /api/users/register - Register with the mobile number already trusted
pub async fn register(State(state): State<AppState>, Json(payload): Json<Value>) -> ApiResult<UserWithToken> {
    let req: RegisterUserRequest = parse_body(payload)?;

    let (Some(email), Some(plain), Some(full_name), Some(gender)) = (
        non_blank(&req.email),
        req.password.as_deref().filter(|p| !p.is_empty()),
        non_blank(&req.full_name),
        non_blank(&req.gender),
    ) else {
        return Err(ApiError::bad_request("All fields are required"));
    };
    let gender: Gender = gender.parse().map_err(ApiError::bad_request)?;

    let pool = DatabaseManager::pool()?;
    if users::find_by_email(&pool, email).await?.is_some() {
        return Err(ApiError::bad_request("User already exists with this email"));
    }

    // Mirror the account at the identity provider; local registration proceeds regardless
    if let Err(e) = state.identity.create_account(email, plain).await {
        tracing::warn!("Federated account creation failed for {}: {}", email, e);
    }

    let user = users::create(
        &pool,
        NewUser {
            email: email.to_string(),
            password_hash: password::hash_password(plain)?,
            full_name: full_name.to_string(),
            signup_type: "e".to_string(),
            gender,
            mobile_no: non_blank(&req.mobile_no).map(str::to_string),
            is_mobile_verified: true,
            is_email_verified: false,
        },
    )
    .await?;

    let token = issue_token(user.id)?;
    tracing::info!("Registered user {} ({})", user.id, user.email);
    Ok(ApiResponse::created("User registered successfully", UserWithToken { user, token }))
}

/// POST /api/users/login
pub async fn login(Json(payload): Json<Value>) -> ApiResult<UserWithToken> {
    let req: LoginRequest = parse_body(payload)?;
    let user = authenticate(&req).await?;
    let token = issue_token(user.id)?;
    Ok(ApiResponse::success("User logged in successfully", UserWithToken { user, token }))
}
