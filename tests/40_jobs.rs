mod common;

use anyhow::{Context, Result};
use reqwest::StatusCode;
use serde_json::{json, Value};

fn sample_job(title: &str) -> Value {
    json!({
        "title": title,
        "department": "Engineering",
        "location": "Remote",
        "employmentType": "full-time",
        "experience": "senior",
        "salaryMin": "90000",
        "salaryMax": 120000,
        "description": "Build and run services",
        "skills": ["rust", "postgres"],
        "remote": true
    })
}

async fn post_job(
    server: &common::TestServer,
    client: &reqwest::Client,
    token: &str,
    title: &str,
) -> Result<Value> {
    let res = client
        .post(server.url("/api/jobs"))
        .bearer_auth(token)
        .json(&sample_job(title))
        .send()
        .await?;
    anyhow::ensure!(res.status() == StatusCode::CREATED, "job create failed: {}", res.status());
    let body: Value = res.json().await?;
    Ok(body["data"].clone())
}

#[tokio::test]
async fn posting_requires_a_company() -> Result<()> {
    if !common::database_available() {
        return Ok(());
    }
    let server = common::ensure_server().await?;
    let client = reqwest::Client::new();
    let account = common::register_account(server, &client, "nocompany").await?;

    let res = client
        .post(server.url("/api/jobs"))
        .bearer_auth(&account.token)
        .json(&sample_job("Orphan"))
        .send()
        .await?;
    assert_eq!(res.status(), StatusCode::NOT_FOUND);

    let res = client.get(server.url("/api/jobs")).bearer_auth(&account.token).send().await?;
    assert_eq!(res.status(), StatusCode::NOT_FOUND);

    // Validation runs before the company lookup
    let res = client
        .post(server.url("/api/jobs"))
        .bearer_auth(&account.token)
        .json(&json!({ "title": "Missing everything" }))
        .send()
        .await?;
    assert_eq!(res.status(), StatusCode::BAD_REQUEST);
    let body: Value = res.json().await?;
    assert_eq!(body["message"], "Validation failed");
    assert!(body["errors"]["description"].is_string());
    Ok(())
}

#[tokio::test]
async fn create_accepts_form_fields() -> Result<()> {
    if !common::database_available() {
        return Ok(());
    }
    let server = common::ensure_server().await?;
    let client = reqwest::Client::new();
    let (account, company_id) = common::register_company_owner(server, &client, "poster").await?;

    let job = post_job(server, &client, &account.token, "Backend Engineer").await?;
    assert_eq!(job["company_id"].as_i64(), Some(company_id));
    assert_eq!(job["employment_type"], "full-time");
    assert_eq!(job["experience_level"], "senior");
    assert_eq!(job["salary_min"], 90000);
    assert_eq!(job["is_remote"], true);
    assert_eq!(job["is_urgent"], false);
    assert_eq!(job["status"], "pending");
    assert_eq!(job["applicants_count"], 0);
    assert_eq!(job["skills"], json!(["rust", "postgres"]));
    Ok(())
}

#[tokio::test]
async fn update_and_status_changes() -> Result<()> {
    if !common::database_available() {
        return Ok(());
    }
    let server = common::ensure_server().await?;
    let client = reqwest::Client::new();
    let (account, _) = common::register_company_owner(server, &client, "editor").await?;
    let job = post_job(server, &client, &account.token, "Data Engineer").await?;
    let id = job["id"].as_i64().context("missing job id")?;
    let path = format!("/api/jobs/{}", id);

    // Empty patch returns the row unchanged
    let res = client.put(server.url(&path)).bearer_auth(&account.token).json(&json!({})).send().await?;
    assert_eq!(res.status(), StatusCode::OK);
    let body: Value = res.json().await?;
    assert_eq!(body["data"]["title"], "Data Engineer");

    let res = client
        .put(server.url(&path))
        .bearer_auth(&account.token)
        .json(&json!({ "title": "Staff Data Engineer", "department": null, "applicants_count": 99 }))
        .send()
        .await?;
    assert_eq!(res.status(), StatusCode::OK);
    let body: Value = res.json().await?;
    assert_eq!(body["data"]["title"], "Staff Data Engineer");
    assert!(body["data"]["department"].is_null());
    assert_eq!(body["data"]["applicants_count"], 0);

    let res = client
        .put(server.url(&path))
        .bearer_auth(&account.token)
        .json(&json!({ "skills": "[rust, sql" }))
        .send()
        .await?;
    assert_eq!(res.status(), StatusCode::BAD_REQUEST);

    let res = client
        .put(server.url(&format!("{}/status", path)))
        .bearer_auth(&account.token)
        .json(&json!({ "status": "archived" }))
        .send()
        .await?;
    assert_eq!(res.status(), StatusCode::BAD_REQUEST);
    let body: Value = res.json().await?;
    assert_eq!(body["message"], "Invalid status. Valid statuses are: pending, active, closed");

    let res = client
        .put(server.url(&format!("{}/status", path)))
        .bearer_auth(&account.token)
        .json(&json!({ "status": "closed" }))
        .send()
        .await?;
    assert_eq!(res.status(), StatusCode::OK);
    let body: Value = res.json().await?;
    assert_eq!(body["data"]["status"], "closed");
    Ok(())
}

#[tokio::test]
async fn list_honours_limit() -> Result<()> {
    if !common::database_available() {
        return Ok(());
    }
    let server = common::ensure_server().await?;
    let client = reqwest::Client::new();
    let (account, _) = common::register_company_owner(server, &client, "lister").await?;
    for title in ["First", "Second", "Third"] {
        post_job(server, &client, &account.token, title).await?;
    }

    let body: Value = client
        .get(server.url("/api/jobs"))
        .bearer_auth(&account.token)
        .send()
        .await?
        .json()
        .await?;
    assert_eq!(body["data"].as_array().map(Vec::len), Some(3));

    let body: Value = client
        .get(server.url("/api/jobs?limit=2"))
        .bearer_auth(&account.token)
        .send()
        .await?
        .json()
        .await?;
    let listed = body["data"].as_array().cloned().unwrap_or_default();
    assert_eq!(listed.len(), 2);
    assert_eq!(listed[0]["title"], "Third");
    Ok(())
}

#[tokio::test]
async fn other_owners_are_denied() -> Result<()> {
    if !common::database_available() {
        return Ok(());
    }
    let server = common::ensure_server().await?;
    let client = reqwest::Client::new();
    let (owner, _) = common::register_company_owner(server, &client, "jobowner").await?;
    let (rival, _) = common::register_company_owner(server, &client, "rival").await?;
    let job = post_job(server, &client, &owner.token, "Guarded").await?;
    let path = format!("/api/jobs/{}", job["id"]);

    let res = client.get(server.url(&path)).bearer_auth(&rival.token).send().await?;
    assert_eq!(res.status(), StatusCode::FORBIDDEN);

    let res = client
        .put(server.url(&path))
        .bearer_auth(&rival.token)
        .json(&json!({ "title": "Taken" }))
        .send()
        .await?;
    assert_eq!(res.status(), StatusCode::FORBIDDEN);

    let res = client.delete(server.url(&path)).bearer_auth(&rival.token).send().await?;
    assert_eq!(res.status(), StatusCode::FORBIDDEN);

    let res = client
        .get(server.url("/api/jobs/2147483647"))
        .bearer_auth(&rival.token)
        .send()
        .await?;
    assert_eq!(res.status(), StatusCode::NOT_FOUND);
    Ok(())
}

#[tokio::test]
async fn apply_counts_and_cascade_removes_jobs() -> Result<()> {
    if !common::database_available() {
        return Ok(());
    }
    let server = common::ensure_server().await?;
    let client = reqwest::Client::new();
    let (account, _) = common::register_company_owner(server, &client, "applied").await?;
    let job = post_job(server, &client, &account.token, "Popular").await?;
    let apply = server.url(&format!("/api/jobs/{}/apply", job["id"]));

    // Applying needs no token
    for expected in 1..=2 {
        let res = client.post(&apply).send().await?;
        assert_eq!(res.status(), StatusCode::OK);
        let body: Value = res.json().await?;
        assert_eq!(body["data"]["applicants_count"], expected);
    }

    let res = client
        .delete(server.url(&format!("/api/users/{}", account.id)))
        .bearer_auth(&account.token)
        .send()
        .await?;
    assert_eq!(res.status(), StatusCode::OK);

    // User -> company -> jobs
    let res = client.post(&apply).send().await?;
    assert_eq!(res.status(), StatusCode::NOT_FOUND);
    Ok(())
}
