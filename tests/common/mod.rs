#![allow(dead_code)]

use std::process::{Child, Command, Stdio};
use std::sync::atomic::{AtomicU32, Ordering};
use std::sync::OnceLock;
use std::time::{Duration, Instant};

use anyhow::{Context, Result};
use reqwest::StatusCode;
use serde_json::{json, Value};

/// Secret the spawned server signs with, so tests can mint their own tokens.
pub const TEST_JWT_SECRET: &str = "integration-test-secret";

static SERVER: OnceLock<TestServer> = OnceLock::new();
static SEQUENCE: AtomicU32 = AtomicU32::new(0);

pub struct TestServer {
    pub port: u16,
    pub base_url: String,
    child: Child,
}

impl TestServer {
    fn spawn() -> Result<Self> {
        // Pick an unused port for isolation
        let port = portpicker::pick_unused_port().context("failed to pick free port")?;
        let base_url = format!("http://127.0.0.1:{}", port);

        let mut cmd = Command::new(env!("CARGO_BIN_EXE_company-registration-api"));
        cmd.arg("serve")
            .env("APP_ENV", "development")
            .env("HOST", "127.0.0.1")
            .env("PORT", port.to_string())
            .env("JWT_SECRET", TEST_JWT_SECRET)
            .env("DATABASE_RUN_MIGRATIONS", database_available().to_string())
            .env("FIREBASE_PROJECT_ID", "")
            .env("CLOUDINARY_CLOUD_NAME", "")
            .stdin(Stdio::null())
            .stdout(Stdio::inherit())
            .stderr(Stdio::inherit());

        // Without a database, fail pool acquisition quickly so /health answers 503 promptly
        if !database_available() {
            cmd.env("DATABASE_CONNECTION_TIMEOUT", "1");
        }

        let child = cmd.spawn().context("failed to spawn server binary")?;
        Ok(Self { port, base_url, child })
    }

    async fn wait_ready(&self, timeout: Duration) -> Result<()> {
        let client = reqwest::Client::new();
        let deadline = Instant::now() + timeout;
        loop {
            if Instant::now() > deadline {
                break;
            }
            let url = format!("{}/health", self.base_url);
            if let Ok(resp) = client.get(&url).send().await {
                if resp.status() == StatusCode::OK || resp.status() == StatusCode::SERVICE_UNAVAILABLE {
                    return Ok(());
                }
            }
            tokio::time::sleep(Duration::from_millis(150)).await;
        }
        anyhow::bail!("server did not become ready on {} within {:?}", self.base_url, timeout)
    }

    pub fn url(&self, path: &str) -> String {
        format!("{}{}", self.base_url, path)
    }
}

pub async fn ensure_server() -> Result<&'static TestServer> {
    let server = SERVER.get_or_init(|| TestServer::spawn().expect("failed to spawn server binary"));
    server.wait_ready(Duration::from_secs(15)).await?;
    Ok(server)
}

/// Flows that touch rows run only when a database is configured.
pub fn database_available() -> bool {
    std::env::var("DATABASE_URL").map(|v| !v.is_empty()).unwrap_or(false)
}

/// An email no other test run has used.
pub fn unique_email(prefix: &str) -> String {
    let nanos = std::time::SystemTime::now()
        .duration_since(std::time::UNIX_EPOCH)
        .map(|d| d.as_nanos())
        .unwrap_or_default();
    let seq = SEQUENCE.fetch_add(1, Ordering::SeqCst);
    format!("{}-{}-{}@example.com", prefix, nanos, seq)
}

/// A registered user: id plus bearer token.
pub struct Account {
    pub id: i64,
    pub email: String,
    pub token: String,
}

/// Register through `/api/users/register`, which returns a token directly.
pub async fn register_account(server: &TestServer, client: &reqwest::Client, prefix: &str) -> Result<Account> {
    let email = unique_email(prefix);
    let res = client
        .post(server.url("/api/users/register"))
        .json(&json!({
            "email": email,
            "password": "s3cret-pass",
            "full_name": "Test Person",
            "gender": "f"
        }))
        .send()
        .await?;
    anyhow::ensure!(res.status() == StatusCode::CREATED, "register failed: {}", res.status());

    let body: Value = res.json().await?;
    Ok(Account {
        id: body["data"]["user"]["id"].as_i64().context("missing user id")?,
        email,
        token: body["data"]["token"].as_str().context("missing token")?.to_string(),
    })
}

pub fn sample_company(name: &str) -> Value {
    json!({
        "company_name": name,
        "address": "1 Main Street",
        "city": "Springfield",
        "state": "IL",
        "country": "USA",
        "postal_code": "62701",
        "industry": "Technology"
    })
}

/// Register an account that owns a company; returns the account and company id.
pub async fn register_company_owner(
    server: &TestServer,
    client: &reqwest::Client,
    prefix: &str,
) -> Result<(Account, i64)> {
    let account = register_account(server, client, prefix).await?;
    let res = client
        .post(server.url("/api/companies/register"))
        .bearer_auth(&account.token)
        .json(&sample_company(&format!("{} Ltd", prefix)))
        .send()
        .await?;
    anyhow::ensure!(res.status() == StatusCode::CREATED, "company register failed: {}", res.status());

    let body: Value = res.json().await?;
    let company_id = body["data"]["id"].as_i64().context("missing company id")?;
    Ok((account, company_id))
}
