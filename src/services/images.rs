//! Image hosting (Cloudinary upload API).
//!
//! Requests are signed: every parameter except `file`, `api_key` and the
//! signature fields is sorted by name, joined as `k=v&k=v`, suffixed with
//! the API secret and hashed with SHA-256.

use async_trait::async_trait;
use serde::Deserialize;
use sha2::{Digest, Sha256};
use std::collections::BTreeMap;

use crate::config::CloudinaryConfig;

/// Target folder and fill-crop dimensions for one kind of asset.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct UploadOptions {
    pub folder: &'static str,
    pub width: u32,
    pub height: u32,
}

impl UploadOptions {
    pub const COMPANY_LOGO: UploadOptions = UploadOptions {
        folder: "company_logos",
        width: 200,
        height: 200,
    };

    pub const COMPANY_BANNER: UploadOptions = UploadOptions {
        folder: "company_banners",
        width: 800,
        height: 300,
    };

    fn transformation(&self) -> String {
        format!("c_fill,h_{},w_{}", self.height, self.width)
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct UploadedImage {
    #[serde(rename = "secure_url")]
    pub url: String,
    pub public_id: String,
}

#[derive(Debug, thiserror::Error)]
pub enum ImageHostError {
    #[error("Image hosting is not configured")]
    NotConfigured,
    #[error("Error uploading image: {0}")]
    Upload(String),
    #[error("Error deleting image: {0}")]
    Destroy(String),
}

#[async_trait]
pub trait ImageHost: Send + Sync {
    /// Upload a data URI or remote URL.
    async fn upload(&self, image: &str, options: UploadOptions) -> Result<UploadedImage, ImageHostError>;

    async fn destroy(&self, public_id: &str) -> Result<(), ImageHostError>;
}

struct Credentials {
    cloud_name: String,
    api_key: String,
    api_secret: String,
}

pub struct Cloudinary {
    client: reqwest::Client,
    credentials: Option<Credentials>,
}

impl Cloudinary {
    pub fn new(config: &CloudinaryConfig) -> Self {
        let credentials = match (&config.cloud_name, &config.api_key, &config.api_secret) {
            (Some(cloud_name), Some(api_key), Some(api_secret)) => Some(Credentials {
                cloud_name: cloud_name.clone(),
                api_key: api_key.clone(),
                api_secret: api_secret.clone(),
            }),
            _ => {
                tracing::warn!("Cloudinary credentials not set; image uploads are disabled");
                None
            }
        };

        Self {
            client: reqwest::Client::new(),
            credentials,
        }
    }

    fn credentials(&self) -> Result<&Credentials, ImageHostError> {
        self.credentials.as_ref().ok_or(ImageHostError::NotConfigured)
    }

    fn endpoint(credentials: &Credentials, action: &str) -> String {
        format!(
            "https://api.cloudinary.com/v1_1/{}/image/{}",
            credentials.cloud_name, action
        )
    }

    /// Adds `api_key`, `signature` and `signature_algorithm` to signed params.
    fn signed_form(credentials: &Credentials, params: BTreeMap<&'static str, String>) -> Vec<(&'static str, String)> {
        let signature = sign(&params, &credentials.api_secret);
        let mut form: Vec<(&'static str, String)> = params.into_iter().collect();
        form.push(("api_key", credentials.api_key.clone()));
        form.push(("signature", signature));
        form.push(("signature_algorithm", "sha256".to_string()));
        form
    }
}

#[async_trait]
impl ImageHost for Cloudinary {
    async fn upload(&self, image: &str, options: UploadOptions) -> Result<UploadedImage, ImageHostError> {
        let credentials = self.credentials()?;

        let mut params = BTreeMap::new();
        params.insert("folder", options.folder.to_string());
        params.insert("overwrite", "true".to_string());
        params.insert("timestamp", chrono::Utc::now().timestamp().to_string());
        params.insert("transformation", options.transformation());
        params.insert("unique_filename", "false".to_string());
        params.insert("use_filename", "true".to_string());

        let mut form = Self::signed_form(credentials, params);
        form.push(("file", image.to_string()));

        let response = self
            .client
            .post(Self::endpoint(credentials, "upload"))
            .form(&form)
            .send()
            .await
            .map_err(|e| ImageHostError::Upload(e.to_string()))?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(ImageHostError::Upload(format!("{}: {}", status, body)));
        }

        let uploaded = response
            .json::<UploadedImage>()
            .await
            .map_err(|e| ImageHostError::Upload(e.to_string()))?;

        tracing::info!("Uploaded image {} to {}", uploaded.public_id, options.folder);
        Ok(uploaded)
    }

    async fn destroy(&self, public_id: &str) -> Result<(), ImageHostError> {
        let credentials = self.credentials()?;

        let mut params = BTreeMap::new();
        params.insert("public_id", public_id.to_string());
        params.insert("timestamp", chrono::Utc::now().timestamp().to_string());

        let response = self
            .client
            .post(Self::endpoint(credentials, "destroy"))
            .form(&Self::signed_form(credentials, params))
            .send()
            .await
            .and_then(|r| r.error_for_status())
            .map_err(|e| ImageHostError::Destroy(e.to_string()))?;

        let body: serde_json::Value = response
            .json()
            .await
            .map_err(|e| ImageHostError::Destroy(e.to_string()))?;

        match body["result"].as_str() {
            Some("ok") | Some("not found") => {
                tracing::debug!("Destroyed image {}", public_id);
                Ok(())
            }
            other => Err(ImageHostError::Destroy(format!(
                "unexpected result {:?} for {}",
                other, public_id
            ))),
        }
    }
}

/// Hex SHA-256 of `k1=v1&k2=v2...` (sorted by key) followed by the secret.
fn sign(params: &BTreeMap<&'static str, String>, api_secret: &str) -> String {
    let to_sign = params
        .iter()
        .filter(|(_, v)| !v.is_empty())
        .map(|(k, v)| format!("{}={}", k, v))
        .collect::<Vec<_>>()
        .join("&");

    let mut hasher = Sha256::new();
    hasher.update(to_sign.as_bytes());
    hasher.update(api_secret.as_bytes());
    format!("{:x}", hasher.finalize())
}
