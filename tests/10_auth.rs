mod common;

use anyhow::{Context, Result};
use chrono::Duration;
use company_registration_api::auth::{generate_jwt, Claims};
use reqwest::StatusCode;
use serde_json::{json, Value};

#[tokio::test]
async fn health_endpoint_responds() -> Result<()> {
    let server = common::ensure_server().await?;
    let res = reqwest::get(server.url("/health")).await?;

    // OK or SERVICE_UNAVAILABLE depending on whether a database is reachable
    assert!(
        res.status() == StatusCode::OK || res.status() == StatusCode::SERVICE_UNAVAILABLE,
        "unexpected status: {}",
        res.status()
    );
    let body: Value = res.json().await?;
    assert!(body["data"]["status"].is_string());
    Ok(())
}

#[tokio::test]
async fn root_banner_and_unknown_routes() -> Result<()> {
    let server = common::ensure_server().await?;

    let body: Value = reqwest::get(server.url("/")).await?.json().await?;
    assert_eq!(body["success"], true);
    assert_eq!(body["message"], "Company Registration Backend API");

    let res = reqwest::get(server.url("/api/does-not-exist")).await?;
    assert_eq!(res.status(), StatusCode::NOT_FOUND);
    let body: Value = res.json().await?;
    assert_eq!(body["message"], "Route not found");
    Ok(())
}

#[tokio::test]
async fn protected_routes_reject_missing_or_bad_tokens() -> Result<()> {
    let server = common::ensure_server().await?;
    let client = reqwest::Client::new();

    let res = client.get(server.url("/api/users")).send().await?;
    assert_eq!(res.status(), StatusCode::UNAUTHORIZED);

    let res = client
        .get(server.url("/api/companies/profile"))
        .bearer_auth("definitely-not-a-jwt")
        .send()
        .await?;
    assert_eq!(res.status(), StatusCode::UNAUTHORIZED);

    let expired = generate_jwt(
        &Claims::with_lifetime(1, Duration::seconds(-120)),
        common::TEST_JWT_SECRET,
    )?;
    let res = client.get(server.url("/api/jobs")).bearer_auth(expired).send().await?;
    assert_eq!(res.status(), StatusCode::UNAUTHORIZED);

    let foreign = generate_jwt(&Claims::with_lifetime(1, Duration::hours(1)), "some-other-secret")?;
    let res = client.get(server.url("/api/jobs")).bearer_auth(foreign).send().await?;
    assert_eq!(res.status(), StatusCode::UNAUTHORIZED);
    Ok(())
}

#[tokio::test]
async fn demo_otp_directory() -> Result<()> {
    let server = common::ensure_server().await?;
    let client = reqwest::Client::new();

    let res = client
        .post(server.url("/api/auth/demo-otp"))
        .json(&json!({ "phone": "+919876543210", "otp": "123456" }))
        .send()
        .await?;
    assert_eq!(res.status(), StatusCode::OK);
    let body: Value = res.json().await?;
    assert_eq!(body["data"]["user"]["full_name"], "John Doe");
    assert_eq!(body["data"]["user"]["is_mobile_verified"], true);

    let res = client
        .post(server.url("/api/auth/demo-otp"))
        .json(&json!({ "phone": "+919876543210" }))
        .send()
        .await?;
    assert_eq!(res.status(), StatusCode::BAD_REQUEST);
    Ok(())
}

#[tokio::test]
async fn federated_login_without_provider_is_unauthorized() -> Result<()> {
    let server = common::ensure_server().await?;
    let res = reqwest::Client::new()
        .post(server.url("/api/auth/firebase-login"))
        .json(&json!({ "idToken": "header.payload.signature" }))
        .send()
        .await?;
    assert_eq!(res.status(), StatusCode::UNAUTHORIZED);
    let body: Value = res.json().await?;
    assert_eq!(body["message"], "Invalid authentication token");
    Ok(())
}

#[tokio::test]
async fn register_then_login() -> Result<()> {
    if !common::database_available() {
        return Ok(());
    }
    let server = common::ensure_server().await?;
    let client = reqwest::Client::new();
    let email = common::unique_email("auth");
    let digits: String = email.chars().filter(|c| c.is_ascii_digit()).collect();
    let mobile_no = format!("+1{}", &digits[digits.len() - 10..]);

    let registration = json!({
        "email": email,
        "password": "hunter22",
        "full_name": "Casey Jones",
        "gender": "Other",
        "mobile_no": mobile_no
    });

    let res = client.post(server.url("/api/auth/register")).json(&registration).send().await?;
    assert_eq!(res.status(), StatusCode::CREATED);
    let body: Value = res.json().await?;
    assert!(body["data"]["user_id"].as_i64().is_some());

    // Same email again
    let res = client.post(server.url("/api/auth/register")).json(&registration).send().await?;
    assert_eq!(res.status(), StatusCode::BAD_REQUEST);
    let body: Value = res.json().await?;
    assert_eq!(body["message"], "User already exists with this email");

    let res = client
        .post(server.url("/api/auth/login"))
        .json(&json!({ "email": email, "password": "wrong" }))
        .send()
        .await?;
    assert_eq!(res.status(), StatusCode::UNAUTHORIZED);

    let res = client
        .post(server.url("/api/auth/login"))
        .json(&json!({ "email": email, "password": "hunter22" }))
        .send()
        .await?;
    assert_eq!(res.status(), StatusCode::OK);
    let body: Value = res.json().await?;
    assert_eq!(body["data"]["user"]["gender"], "o");
    assert_eq!(body["data"]["user"]["is_mobile_verified"], false);
    assert!(body["data"]["user"].get("password").is_none());
    assert!(body["data"]["token"].as_str().is_some());
    Ok(())
}

/// Register a fixed account on a demo number, replacing the one a previous run left behind.
async fn register_demo_mobile_account(
    server: &common::TestServer,
    client: &reqwest::Client,
    email: &str,
    mobile_no: &str,
) -> Result<i64> {
    let res = client
        .post(server.url("/api/auth/login"))
        .json(&json!({ "email": email, "password": "hunter22" }))
        .send()
        .await?;
    if res.status() == StatusCode::OK {
        let body: Value = res.json().await?;
        let id = body["data"]["user"]["id"].as_i64().context("missing user id")?;
        let token = body["data"]["token"].as_str().context("missing token")?;
        let res = client
            .delete(server.url(&format!("/api/users/{}", id)))
            .bearer_auth(token)
            .send()
            .await?;
        anyhow::ensure!(res.status() == StatusCode::OK, "cleanup failed: {}", res.status());
    }

    let res = client
        .post(server.url("/api/auth/register"))
        .json(&json!({
            "email": email,
            "password": "hunter22",
            "full_name": "Emily Davis",
            "gender": "f",
            "mobile_no": mobile_no
        }))
        .send()
        .await?;
    anyhow::ensure!(res.status() == StatusCode::CREATED, "register failed: {}", res.status());
    let body: Value = res.json().await?;
    body["data"]["user_id"].as_i64().context("missing user id")
}

#[tokio::test]
async fn verify_mobile_checks_otp_for_stored_number() -> Result<()> {
    if !common::database_available() {
        return Ok(());
    }
    let server = common::ensure_server().await?;
    let client = reqwest::Client::new();
    let verify = server.url("/api/auth/verify-mobile");

    // No mobile number on file, so no code can match
    let account = common::register_account(server, &client, "nomobile").await?;
    let res = client
        .post(&verify)
        .json(&json!({ "user_id": account.id, "otp": "123456" }))
        .send()
        .await?;
    assert_eq!(res.status(), StatusCode::BAD_REQUEST);
    let body: Value = res.json().await?;
    assert_eq!(body["message"], "Invalid OTP. Please try again.");
    assert!(body["data"].is_null());

    let user_id =
        register_demo_mobile_account(server, &client, "verify-mobile@example.test", "+919876543213").await?;

    for wrong in ["000000", "123456"] {
        let res = client
            .post(&verify)
            .json(&json!({ "user_id": user_id, "otp": wrong }))
            .send()
            .await?;
        assert_eq!(res.status(), StatusCode::BAD_REQUEST);
    }

    let res = client
        .post(&verify)
        .json(&json!({ "user_id": user_id.to_string(), "otp": "222222" }))
        .send()
        .await?;
    assert_eq!(res.status(), StatusCode::OK);
    let body: Value = res.json().await?;
    assert_eq!(body["data"]["user"]["is_mobile_verified"], true);
    assert!(body["data"]["token"].as_str().is_some());

    let res = client
        .post(&verify)
        .json(&json!({ "user_id": i32::MAX, "otp": "222222" }))
        .send()
        .await?;
    assert_eq!(res.status(), StatusCode::NOT_FOUND);
    Ok(())
}
