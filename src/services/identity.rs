//! Federated identity (Firebase Authentication).
//!
//! ID tokens are RS256 JWTs signed by Google's `securetoken` service
//! account. Verification fetches the published JWK set (cached for the
//! `max-age` Google sends), checks signature, audience (project id),
//! issuer and expiry, and returns the verified identity.

use async_trait::async_trait;
use jsonwebtoken::{decode, decode_header, jwk::JwkSet, Algorithm, DecodingKey, Validation};
use serde::Deserialize;
use serde_json::json;
use std::time::{Duration, Instant};
use tokio::sync::RwLock;

use crate::config::FirebaseConfig;

const JWKS_URL: &str =
    "https://www.googleapis.com/service_accounts/v1/jwk/securetoken@system.gserviceaccount.com";
const SIGN_UP_URL: &str = "https://identitytoolkit.googleapis.com/v1/accounts:signUp";
const DEFAULT_KEY_TTL: Duration = Duration::from_secs(60 * 60);

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct VerifiedIdentity {
    pub uid: String,
    pub email: Option<String>,
    pub email_verified: bool,
}

#[derive(Debug, thiserror::Error)]
pub enum IdentityError {
    #[error("Federated identity provider is not configured")]
    NotConfigured,
    #[error("Invalid identity token: {0}")]
    InvalidToken(String),
    #[error("Could not fetch signing keys: {0}")]
    KeyFetch(String),
    #[error("Identity provider error: {0}")]
    Provider(String),
}

#[async_trait]
pub trait IdentityProvider: Send + Sync {
    /// Verify a client-held ID token.
    async fn verify_id_token(&self, id_token: &str) -> Result<VerifiedIdentity, IdentityError>;

    /// Mirror a locally registered account at the provider; returns the provider uid.
    async fn create_account(&self, email: &str, password: &str) -> Result<String, IdentityError>;
}

#[derive(Debug, Deserialize)]
struct FirebaseClaims {
    sub: String,
    #[serde(default)]
    email: Option<String>,
    #[serde(default)]
    email_verified: bool,
}

struct CachedKeys {
    keys: JwkSet,
    expires_at: Instant,
}

pub struct FirebaseIdentity {
    client: reqwest::Client,
    project_id: Option<String>,
    api_key: Option<String>,
    keys: RwLock<Option<CachedKeys>>,
}

impl FirebaseIdentity {
    pub fn new(config: &FirebaseConfig) -> Self {
        if config.project_id.is_none() {
            tracing::warn!("FIREBASE_PROJECT_ID not set; federated login is disabled");
        }
        Self {
            client: reqwest::Client::new(),
            project_id: config.project_id.clone(),
            api_key: config.api_key.clone(),
            keys: RwLock::new(None),
        }
    }

    async fn decoding_key(&self, kid: &str) -> Result<DecodingKey, IdentityError> {
        // Fast path: cached and fresh
        {
            let cached = self.keys.read().await;
            if let Some(cached) = cached.as_ref().filter(|c| c.expires_at > Instant::now()) {
                if let Some(jwk) = cached.keys.find(kid) {
                    return DecodingKey::from_jwk(jwk).map_err(|e| IdentityError::KeyFetch(e.to_string()));
                }
            }
        }

        // Unknown kid or stale set: refresh once
        let fresh = self.fetch_keys().await?;
        let key = fresh
            .keys
            .find(kid)
            .ok_or_else(|| IdentityError::InvalidToken(format!("unknown signing key '{}'", kid)))
            .and_then(|jwk| DecodingKey::from_jwk(jwk).map_err(|e| IdentityError::KeyFetch(e.to_string())));

        *self.keys.write().await = Some(fresh);
        key
    }

    async fn fetch_keys(&self) -> Result<CachedKeys, IdentityError> {
        let response = self
            .client
            .get(JWKS_URL)
            .send()
            .await
            .and_then(|r| r.error_for_status())
            .map_err(|e| IdentityError::KeyFetch(e.to_string()))?;

        let ttl = response
            .headers()
            .get(reqwest::header::CACHE_CONTROL)
            .and_then(|v| v.to_str().ok())
            .and_then(max_age)
            .unwrap_or(DEFAULT_KEY_TTL);

        let keys = response
            .json::<JwkSet>()
            .await
            .map_err(|e| IdentityError::KeyFetch(e.to_string()))?;

        tracing::debug!("Fetched {} identity signing keys (ttl {:?})", keys.keys.len(), ttl);
        Ok(CachedKeys {
            keys,
            expires_at: Instant::now() + ttl,
        })
    }
}

#[async_trait]
impl IdentityProvider for FirebaseIdentity {
    async fn verify_id_token(&self, id_token: &str) -> Result<VerifiedIdentity, IdentityError> {
        let project_id = self.project_id.as_deref().ok_or(IdentityError::NotConfigured)?;

        let header = decode_header(id_token).map_err(|e| IdentityError::InvalidToken(e.to_string()))?;
        if header.alg != Algorithm::RS256 {
            return Err(IdentityError::InvalidToken(format!("unexpected algorithm {:?}", header.alg)));
        }
        let kid = header
            .kid
            .ok_or_else(|| IdentityError::InvalidToken("missing key id".to_string()))?;

        let key = self.decoding_key(&kid).await?;
        let claims = decode::<FirebaseClaims>(id_token, &key, &firebase_validation(project_id))
            .map_err(|e| IdentityError::InvalidToken(e.to_string()))?
            .claims;

        if claims.sub.is_empty() {
            return Err(IdentityError::InvalidToken("empty subject".to_string()));
        }

        Ok(VerifiedIdentity {
            uid: claims.sub,
            email: claims.email,
            email_verified: claims.email_verified,
        })
    }

    async fn create_account(&self, email: &str, password: &str) -> Result<String, IdentityError> {
        let api_key = self.api_key.as_deref().ok_or(IdentityError::NotConfigured)?;

        let response = self
            .client
            .post(SIGN_UP_URL)
            .query(&[("key", api_key)])
            .json(&json!({ "email": email, "password": password, "returnSecureToken": false }))
            .send()
            .await
            .map_err(|e| IdentityError::Provider(e.to_string()))?;

        let status = response.status();
        let body: serde_json::Value = response
            .json()
            .await
            .map_err(|e| IdentityError::Provider(e.to_string()))?;

        if !status.is_success() {
            let message = body["error"]["message"].as_str().unwrap_or("unknown error");
            return Err(IdentityError::Provider(format!("{} ({})", message, status)));
        }

        body["localId"]
            .as_str()
            .map(str::to_string)
            .ok_or_else(|| IdentityError::Provider("response missing localId".to_string()))
    }
}

fn firebase_validation(project_id: &str) -> Validation {
    let mut validation = Validation::new(Algorithm::RS256);
    validation.set_audience(&[project_id]);
    validation.set_issuer(&[format!("https://securetoken.google.com/{}", project_id)]);
    validation.set_required_spec_claims(&["exp", "iat", "aud", "iss", "sub"]);
    validation
}

/// `max-age` from a Cache-Control header value.
fn max_age(cache_control: &str) -> Option<Duration> {
    cache_control
        .split(',')
        .filter_map(|directive| directive.trim().strip_prefix("max-age="))
        .find_map(|secs| secs.trim().parse::<u64>().ok())
        .map(Duration::from_secs)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn reads_max_age_directive() {
        assert_eq!(
            max_age("public, max-age=19842, must-revalidate, no-transform"),
            Some(Duration::from_secs(19842))
        );
        assert_eq!(max_age("no-cache"), None);
    }

    #[test]
    fn validation_pins_project() {
        let validation = firebase_validation("acme-prod");
        assert_eq!(validation.algorithms, vec![Algorithm::RS256]);
        assert!(validation.aud.as_ref().unwrap().contains("acme-prod"));
        assert!(validation
            .iss
            .as_ref()
            .unwrap()
            .contains("https://securetoken.google.com/acme-prod"));
    }

    #[tokio::test]
    async fn unconfigured_provider_refuses_tokens() {
        let provider = FirebaseIdentity::new(&FirebaseConfig::default());
        assert!(matches!(
            provider.verify_id_token("a.b.c").await,
            Err(IdentityError::NotConfigured)
        ));
        assert!(matches!(
            provider.create_account("a@b.c", "pw").await,
            Err(IdentityError::NotConfigured)
        ));
    }

    #[tokio::test]
    async fn garbage_token_is_invalid() {
        let provider = FirebaseIdentity::new(&FirebaseConfig {
            project_id: Some("acme".into()),
            api_key: None,
        });
        assert!(matches!(
            provider.verify_id_token("not-a-jwt").await,
            Err(IdentityError::InvalidToken(_))
        ));
    }
}
