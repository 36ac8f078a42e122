use axum::{
    extract::{Query, State},
    response::Json,
};
use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::auth::{issue_token, password};
use crate::database::models::user::{Gender, NewUser, User, UserChanges, UserSummary};
use crate::database::patch::parse_lenient_int;
use crate::database::{users, DatabaseManager};
use crate::error::ApiError;
use crate::handlers::{non_blank, parse_body};
use crate::middleware::{ApiResponse, ApiResult};
use crate::services::otp;
use crate::state::AppState;

/// Issued token plus the user it was issued for.
#[derive(Debug, Serialize)]
pub struct Session<U: Serialize> {
    pub token: String,
    pub user: U,
}

impl Session<UserSummary> {
    fn for_user(user: &User) -> Result<Self, ApiError> {
        Ok(Self {
            token: issue_token(user.id)?,
            user: UserSummary::from(user),
        })
    }
}

#[derive(Debug, Deserialize)]
pub struct RegisterRequest {
    email: Option<String>,
    password: Option<String>,
    full_name: Option<String>,
    gender: Option<String>,
    mobile_no: Option<String>,
    signup_type: Option<String>,
}

#[derive(Debug, Serialize)]
pub struct Registered {
    pub user_id: i32,
}

/// POST /api/auth/register - Create an account pending mobile verification
pub async fn register(Json(payload): Json<Value>) -> ApiResult<Registered> {
    let req: RegisterRequest = parse_body(payload)?;

    let (Some(email), Some(plain), Some(full_name), Some(gender), Some(mobile_no)) = (
        non_blank(&req.email),
        req.password.as_deref().filter(|p| !p.is_empty()),
        non_blank(&req.full_name),
        non_blank(&req.gender),
        non_blank(&req.mobile_no),
    ) else {
        return Err(ApiError::bad_request("All fields are required"));
    };
    let gender: Gender = gender.parse().map_err(ApiError::bad_request)?;

    let pool = DatabaseManager::pool()?;
    if users::find_by_email(&pool, email).await?.is_some() {
        return Err(ApiError::bad_request("User already exists with this email"));
    }

    let user = users::create(
        &pool,
        NewUser {
            email: email.to_string(),
            password_hash: password::hash_password(plain)?,
            full_name: full_name.to_string(),
            signup_type: non_blank(&req.signup_type).unwrap_or("e").to_string(),
            gender,
            mobile_no: Some(mobile_no.to_string()),
            is_mobile_verified: false,
            is_email_verified: false,
        },
    )
    .await?;

    tracing::info!("Registered user {} ({})", user.id, user.email);
    Ok(ApiResponse::created(
        "User registered successfully. Please verify mobile OTP.",
        Registered { user_id: user.id },
    ))
}

#[derive(Debug, Deserialize)]
pub struct LoginRequest {
    #[serde(default)]
    pub email: String,
    #[serde(default)]
    pub password: String,
}

/// Look up and verify credentials. Unknown email and wrong password are
/// indistinguishable to the caller.
pub(crate) async fn authenticate(req: &LoginRequest) -> Result<User, ApiError> {
    let pool = DatabaseManager::pool()?;
    let invalid = || ApiError::unauthorized("Invalid email or password");

    let user = users::find_by_email(&pool, req.email.trim()).await?.ok_or_else(|| {
        tracing::info!("Login attempt for unknown email");
        invalid()
    })?;

    if !password::verify_password(&req.password, &user.password_hash)? {
        tracing::info!("Invalid password for user {}", user.id);
        return Err(invalid());
    }

    Ok(user)
}

/// POST /api/auth/login
pub async fn login(Json(payload): Json<Value>) -> ApiResult<Session<UserSummary>> {
    let req: LoginRequest = parse_body(payload)?;
    let user = authenticate(&req).await?;
    Ok(ApiResponse::success("User logged in successfully", Session::for_user(&user)?))
}

#[derive(Debug, Deserialize)]
pub struct VerifyEmailQuery {
    token: Option<String>,
}

/// GET /api/auth/verify-email?token= - Acknowledgement only; no token store exists
pub async fn verify_email(Query(query): Query<VerifyEmailQuery>) -> ApiResult<()> {
    if non_blank(&query.token).is_none() {
        return Err(ApiError::bad_request("Verification token is required"));
    }
    Ok(ApiResponse::message("Email verified successfully"))
}

#[derive(Debug, Deserialize)]
pub struct VerifyMobileRequest {
    #[serde(default)]
    user_id: Value,
    otp: Option<String>,
}

/// Whether `code` is the demo OTP issued for the stored mobile number.
fn mobile_otp_matches(mobile_no: Option<&str>, code: &str) -> bool {
    mobile_no.and_then(|phone| otp::verify(phone.trim(), code)).is_some()
}

/// POST /api/auth/verify-mobile - Check the OTP for the user's number, mark it verified and sign in
pub async fn verify_mobile(Json(payload): Json<Value>) -> ApiResult<Session<UserSummary>> {
    let req: VerifyMobileRequest = parse_body(payload)?;
    let (Some(user_id), Some(code)) = (parse_lenient_int(&req.user_id), non_blank(&req.otp)) else {
        return Err(ApiError::bad_request("User ID and OTP are required"));
    };

    let pool = DatabaseManager::pool()?;
    let user = users::find_by_id(&pool, user_id)
        .await?
        .ok_or_else(|| ApiError::not_found("User not found"))?;

    if !mobile_otp_matches(user.mobile_no.as_deref(), code) {
        tracing::info!("Rejected mobile OTP for user {}", user.id);
        return Err(ApiError::bad_request("Invalid OTP. Please try again."));
    }

    let changes = UserChanges {
        is_mobile_verified: Some(true),
        ..Default::default()
    };
    let user = users::update(&pool, user_id, changes)
        .await?
        .ok_or_else(|| ApiError::not_found("User not found"))?;

    Ok(ApiResponse::success("Mobile verified successfully", Session::for_user(&user)?))
}

#[derive(Debug, Deserialize)]
pub struct DemoOtpRequest {
    phone: Option<String>,
    otp: Option<String>,
}

#[derive(Debug, Serialize)]
pub struct DemoUser {
    pub id: i64,
    pub full_name: &'static str,
    pub mobile_no: &'static str,
    pub is_mobile_verified: bool,
}

/// POST /api/auth/demo-otp - Check against the fixed demo directory
pub async fn demo_otp(Json(payload): Json<Value>) -> ApiResult<Session<DemoUser>> {
    let req: DemoOtpRequest = parse_body(payload)?;
    let (Some(phone), Some(code)) = (non_blank(&req.phone), non_blank(&req.otp)) else {
        return Err(ApiError::bad_request("Phone number and OTP are required"));
    };

    let contact = otp::verify(phone, code).ok_or_else(|| ApiError::bad_request("Invalid OTP. Please try again."))?;
    let now = chrono::Utc::now().timestamp_millis();

    Ok(ApiResponse::success(
        "OTP verification successful!",
        Session {
            token: format!("demo-token-{}", now),
            user: DemoUser {
                id: now,
                full_name: contact.name,
                mobile_no: contact.phone,
                is_mobile_verified: true,
            },
        },
    ))
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct FirebaseLoginRequest {
    #[serde(default, alias = "id_token")]
    id_token: String,
    user_data: Option<FederatedProfile>,
}

/// Registration details sent by the client on a first federated sign-in.
#[derive(Debug, Deserialize)]
pub struct FederatedProfile {
    password: Option<String>,
    full_name: Option<String>,
    gender: Option<String>,
    mobile_no: Option<String>,
    signup_type: Option<String>,
    #[serde(default)]
    is_mobile_verified: bool,
}

/// POST /api/auth/firebase-login - Exchange a Firebase ID token for a local token
pub async fn firebase_login(
    State(state): State<AppState>,
    Json(payload): Json<Value>,
) -> ApiResult<Session<UserSummary>> {
    let req: FirebaseLoginRequest = parse_body(payload)?;

    let identity = state.identity.verify_id_token(&req.id_token).await?;
    let email = identity
        .email
        .filter(|e| !e.is_empty())
        .ok_or_else(|| ApiError::unauthorized("Invalid authentication token"))?;

    let pool = DatabaseManager::pool()?;
    let user = match (users::find_by_email(&pool, &email).await?, req.user_data) {
        (Some(existing), _) => existing,
        (None, Some(profile)) => {
            let password_hash = match profile.password.as_deref().filter(|p| !p.is_empty()) {
                Some(plain) => password::hash_password(plain)?,
                None => password::unusable_password_hash()?,
            };
            let gender = non_blank(&profile.gender)
                .and_then(|g| g.parse().ok())
                .unwrap_or(Gender::Other);

            let created = users::create(
                &pool,
                NewUser {
                    full_name: non_blank(&profile.full_name).unwrap_or(&email).to_string(),
                    email: email.clone(),
                    password_hash,
                    signup_type: non_blank(&profile.signup_type).unwrap_or("e").to_string(),
                    gender,
                    mobile_no: non_blank(&profile.mobile_no).map(str::to_string),
                    is_mobile_verified: profile.is_mobile_verified,
                    is_email_verified: true,
                },
            )
            .await?;
            tracing::info!("Created user {} from federated identity {}", created.id, identity.uid);
            created
        }
        (None, None) => return Err(ApiError::bad_request("User not found. Please register first.")),
    };

    Ok(ApiResponse::success("User authenticated successfully", Session::for_user(&user)?))
}
