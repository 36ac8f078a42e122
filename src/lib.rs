pub mod auth;
pub mod cli;
pub mod config;
pub mod database;
pub mod error;
pub mod handlers;
pub mod middleware;
pub mod services;
pub mod state;

use axum::{
    extract::DefaultBodyLimit,
    http::{header, HeaderValue, Method, StatusCode},
    response::{IntoResponse, Json},
    routing::{get, post, put},
    Router,
};
use serde_json::json;
use tower_http::{
    compression::CompressionLayer,
    cors::{AllowOrigin, Any, CorsLayer},
    set_header::SetResponseHeaderLayer,
    trace::TraceLayer,
};

use crate::database::DatabaseManager;
use crate::error::ApiError;
use crate::middleware::ApiResponse;
use crate::state::AppState;

/// The full HTTP surface: route groups plus global middleware.
pub fn app(state: AppState) -> Router {
    let config = config::config();

    let mut router = Router::new()
        // Public
        .route("/", get(root))
        .route("/health", get(health))
        .merge(auth_routes())
        .merge(user_routes())
        .merge(company_routes())
        .merge(job_routes())
        .fallback(route_not_found)
        .with_state(state)
        .layer(DefaultBodyLimit::max(config.api.max_request_size_bytes))
        .layer(cors_layer(&config.security.cors_origins))
        .layer(SetResponseHeaderLayer::if_not_present(
            header::X_CONTENT_TYPE_OPTIONS,
            HeaderValue::from_static("nosniff"),
        ))
        .layer(SetResponseHeaderLayer::if_not_present(
            header::X_FRAME_OPTIONS,
            HeaderValue::from_static("DENY"),
        ))
        .layer(SetResponseHeaderLayer::if_not_present(
            header::REFERRER_POLICY,
            HeaderValue::from_static("no-referrer"),
        ));

    if config.api.enable_response_compression {
        router = router.layer(CompressionLayer::new());
    }
    if config.api.enable_request_logging {
        router = router.layer(TraceLayer::new_for_http());
    }
    router
}

fn auth_routes() -> Router<AppState> {
    use handlers::public::auth;

    Router::new()
        .route("/api/auth/register", post(auth::register))
        .route("/api/auth/login", post(auth::login))
        .route("/api/auth/firebase-login", post(auth::firebase_login))
        .route("/api/auth/verify-email", get(auth::verify_email))
        .route("/api/auth/verify-mobile", post(auth::verify_mobile))
        .route("/api/auth/demo-otp", post(auth::demo_otp))
}

fn user_routes() -> Router<AppState> {
    use handlers::{protected, public};

    let open = Router::new()
        .route("/api/users/register", post(public::users::register))
        .route("/api/users/login", post(public::users::login));

    let guarded = Router::new()
        .route("/api/users", get(protected::users::list))
        .route(
            "/api/users/:id",
            get(protected::users::get)
                .put(protected::users::update)
                .delete(protected::users::delete),
        )
        .route("/api/users/:id/profile", put(protected::users::update_profile))
        .route_layer(axum::middleware::from_fn(middleware::jwt_auth_middleware));

    open.merge(guarded)
}

fn company_routes() -> Router<AppState> {
    use handlers::protected::companies;

    Router::new()
        .route("/api/companies/register", post(companies::register))
        .route(
            "/api/companies/profile",
            get(companies::profile).put(companies::update_profile),
        )
        .route("/api/companies/upload-logo", post(companies::upload_logo))
        .route("/api/companies/upload-banner", post(companies::upload_banner))
        .route("/api/companies", get(companies::list))
        .route(
            "/api/companies/:id",
            get(companies::get).put(companies::update).delete(companies::delete),
        )
        .route_layer(axum::middleware::from_fn(middleware::jwt_auth_middleware))
}

fn job_routes() -> Router<AppState> {
    use handlers::{protected, public};

    let open = Router::new().route("/api/jobs/:id/apply", post(public::jobs::apply));

    let guarded = Router::new()
        .route("/api/jobs", post(protected::jobs::create).get(protected::jobs::list))
        .route(
            "/api/jobs/:id",
            get(protected::jobs::get)
                .put(protected::jobs::update)
                .delete(protected::jobs::delete),
        )
        .route("/api/jobs/:id/status", put(protected::jobs::update_status))
        .route_layer(axum::middleware::from_fn(middleware::jwt_auth_middleware));

    open.merge(guarded)
}

/// `*` (or no configured origins) allows any origin.
fn cors_layer(origins: &[String]) -> CorsLayer {
    let base = CorsLayer::new()
        .allow_methods([Method::GET, Method::POST, Method::PUT, Method::DELETE, Method::OPTIONS])
        .allow_headers([header::AUTHORIZATION, header::CONTENT_TYPE, header::ACCEPT]);

    if origins.is_empty() || origins.iter().any(|o| o == "*") {
        return base.allow_origin(Any);
    }

    let allowed: Vec<HeaderValue> = origins
        .iter()
        .filter_map(|origin| match HeaderValue::from_str(origin) {
            Ok(value) => Some(value),
            Err(_) => {
                tracing::warn!("Ignoring invalid CORS origin '{}'", origin);
                None
            }
        })
        .collect();
    base.allow_origin(AllowOrigin::list(allowed))
}

async fn root() -> ApiResponse<serde_json::Value> {
    ApiResponse::success(
        "Company Registration Backend API",
        json!({
            "name": env!("CARGO_PKG_NAME"),
            "version": env!("CARGO_PKG_VERSION"),
            "endpoints": {
                "health": "/health (public)",
                "auth": "/api/auth/* (public - token acquisition and verification)",
                "users": "/api/users[/:id] (register/login public, rest protected)",
                "companies": "/api/companies[/:id|/profile] (protected)",
                "jobs": "/api/jobs[/:id] (protected; POST /api/jobs/:id/apply public)",
            }
        }),
    )
}

async fn health() -> impl IntoResponse {
    let now = chrono::Utc::now();

    match DatabaseManager::health_check().await {
        Ok(_) => (
            StatusCode::OK,
            Json(json!({
                "success": true,
                "message": "OK",
                "data": {
                    "status": "ok",
                    "timestamp": now,
                    "database": "ok"
                }
            })),
        ),
        Err(e) => {
            tracing::warn!("Health check failed: {}", e);
            (
                StatusCode::SERVICE_UNAVAILABLE,
                Json(json!({
                    "success": false,
                    "message": "Database unavailable",
                    "data": {
                        "status": "degraded",
                        "timestamp": now,
                        "database": "unavailable"
                    }
                })),
            )
        }
    }
}

async fn route_not_found() -> ApiError {
    ApiError::not_found("Route not found")
}
