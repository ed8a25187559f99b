//! services/api/src/adapters/cloudinary.rs
//!
//! This module contains the adapter for the Cloudinary image hosting API.
//! It implements the `MediaStorageService` port from the `core` crate.

use async_trait::async_trait;
use bookshare_core::domain::{ImagePayload, UploadedImage};
use bookshare_core::ports::{MediaStorageService, PortError, PortResult};
use chrono::Utc;
use serde::Deserialize;
use sha2::{Digest, Sha256};
use tracing::debug;

use crate::config::CloudinaryConfig;

const API_BASE: &str = "https://api.cloudinary.com/v1_1";
const DELIVERY_HOST: &str = "https://res.cloudinary.com/";

//=========================================================================================
// The Main Adapter Struct
//=========================================================================================

/// An adapter that implements the `MediaStorageService` port using signed
/// Cloudinary upload/destroy calls.
#[derive(Clone)]
pub struct CloudinaryAdapter {
    client: reqwest::Client,
    config: CloudinaryConfig,
}

impl CloudinaryAdapter {
    /// Creates a new `CloudinaryAdapter`.
    pub fn new(client: reqwest::Client, config: CloudinaryConfig) -> Self {
        Self { client, config }
    }

    fn endpoint(&self, action: &str) -> String {
        format!("{}/{}/image/{}", API_BASE, self.config.cloud_name, action)
    }

    /// Adds `api_key`, `signature` and `signature_algorithm` to the
    /// parameters that take part in signing.
    fn signed(&self, mut params: Vec<(&'static str, String)>) -> Vec<(&'static str, String)> {
        let signature = sign(&params, &self.config.api_secret);
        params.push(("api_key", self.config.api_key.clone()));
        params.push(("signature", signature));
        params.push(("signature_algorithm", "sha256".to_string()));
        params
    }
}

/// Cloudinary request signature: the signed parameters sorted by name,
/// joined as `k=v&k=v`, suffixed with the API secret and hashed.
fn sign(params: &[(&str, String)], api_secret: &str) -> String {
    let mut sorted: Vec<&(&str, String)> = params.iter().collect();
    sorted.sort_by(|a, b| a.0.cmp(b.0));
    let to_sign = sorted
        .iter()
        .map(|(k, v)| format!("{}={}", k, v))
        .collect::<Vec<_>>()
        .join("&");

    let mut hasher = Sha256::new();
    hasher.update(to_sign.as_bytes());
    hasher.update(api_secret.as_bytes());
    hex::encode(hasher.finalize())
}

#[derive(Deserialize)]
struct UploadResponse {
    secure_url: String,
    public_id: String,
}

#[derive(Deserialize)]
struct DestroyResponse {
    result: String,
}

#[derive(Deserialize)]
struct ErrorEnvelope {
    error: ErrorDetail,
}

#[derive(Deserialize)]
struct ErrorDetail {
    message: String,
}

async fn error_from(response: reqwest::Response) -> PortError {
    let status = response.status();
    let message = match response.json::<ErrorEnvelope>().await {
        Ok(envelope) => envelope.error.message,
        Err(_) => "no error details".to_string(),
    };
    PortError::Unexpected(format!("Cloudinary returned {}: {}", status, message))
}

//=========================================================================================
// `MediaStorageService` Trait Implementation
//=========================================================================================

#[async_trait]
impl MediaStorageService for CloudinaryAdapter {
    async fn upload_image(&self, image: &ImagePayload) -> PortResult<UploadedImage> {
        let mut params = vec![("timestamp", Utc::now().timestamp().to_string())];
        if let Some(folder) = &self.config.folder {
            params.push(("folder", folder.clone()));
        }
        let mut form = self.signed(params);
        form.push(("file", image.data_uri().to_string()));

        let response = self
            .client
            .post(self.endpoint("upload"))
            .form(&form)
            .send()
            .await
            .map_err(|e| PortError::Unexpected(e.to_string()))?;
        if !response.status().is_success() {
            return Err(error_from(response).await);
        }

        let uploaded: UploadResponse = response
            .json()
            .await
            .map_err(|e| PortError::Unexpected(e.to_string()))?;
        debug!(public_id = %uploaded.public_id, "Image uploaded");
        Ok(UploadedImage {
            url: uploaded.secure_url,
            public_id: uploaded.public_id,
        })
    }

    fn public_id_from_url(&self, url: &str) -> Option<String> {
        let path = url
            .strip_prefix(DELIVERY_HOST)?
            .strip_prefix(self.config.cloud_name.as_str())?
            .strip_prefix("/image/upload/")?;

        // Drop the optional version segment, e.g. `v1712345678/`.
        let path = match path.split_once('/') {
            Some((version, rest))
                if version.len() > 1
                    && version.starts_with('v')
                    && version[1..].chars().all(|c| c.is_ascii_digit()) =>
            {
                rest
            }
            _ => path,
        };

        let public_id = match path.rsplit_once('.') {
            Some((stem, _ext)) if !stem.is_empty() => stem,
            _ => path,
        };
        (!public_id.is_empty()).then(|| public_id.to_string())
    }

    async fn delete_image(&self, public_id: &str) -> PortResult<()> {
        let params = vec![
            ("public_id", public_id.to_string()),
            ("timestamp", Utc::now().timestamp().to_string()),
        ];
        let form = self.signed(params);

        let response = self
            .client
            .post(self.endpoint("destroy"))
            .form(&form)
            .send()
            .await
            .map_err(|e| PortError::Unexpected(e.to_string()))?;
        if !response.status().is_success() {
            return Err(error_from(response).await);
        }

        let destroyed: DestroyResponse = response
            .json()
            .await
            .map_err(|e| PortError::Unexpected(e.to_string()))?;
        match destroyed.result.as_str() {
            "ok" => Ok(()),
            "not found" => Err(PortError::NotFound(format!("Image {} not found", public_id))),
            other => Err(PortError::Unexpected(format!(
                "Cloudinary destroy returned '{}'",
                other
            ))),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn adapter() -> CloudinaryAdapter {
        CloudinaryAdapter::new(
            reqwest::Client::new(),
            CloudinaryConfig {
                cloud_name: "demo".to_string(),
                api_key: "key".to_string(),
                api_secret: "secret".to_string(),
                folder: None,
            },
        )
    }

    #[test]
    fn public_id_strips_version_and_extension() {
        let a = adapter();
        assert_eq!(
            a.public_id_from_url("https://res.cloudinary.com/demo/image/upload/v1712345678/abc123.jpg"),
            Some("abc123".to_string())
        );
        assert_eq!(
            a.public_id_from_url("https://res.cloudinary.com/demo/image/upload/books/xyz.png"),
            Some("books/xyz".to_string())
        );
    }

    #[test]
    fn foreign_urls_have_no_public_id() {
        let a = adapter();
        assert_eq!(a.public_id_from_url("https://example.com/cover.jpg"), None);
        assert_eq!(
            a.public_id_from_url("https://res.cloudinary.com/other/image/upload/v1/abc.jpg"),
            None
        );
    }

    #[test]
    fn signature_is_order_independent() {
        let a = sign(
            &[("timestamp", "1".to_string()), ("folder", "b".to_string())],
            "secret",
        );
        let b = sign(
            &[("folder", "b".to_string()), ("timestamp", "1".to_string())],
            "secret",
        );
        assert_eq!(a, b);
        assert_eq!(a.len(), 64);
        assert_ne!(a, sign(&[("timestamp", "1".to_string())], "secret"));
    }
}
