// src/storage/pinata.rs
//! Pinning-service blob store.
//!
//! Uploads go to a Pinata-compatible `pinFileToIPFS` endpoint as a multipart
//! form (`file` + `pinataMetadata`) authorised with a bearer JWT. Reads and
//! locators go through the public gateway.

use crate::storage::{excerpt, BlobMetadata, BlobStore, BlobStoreError};
use crate::utils::serialization::serialize;
use async_trait::async_trait;
use log::debug;
use reqwest::multipart::{Form, Part};
use reqwest::Client;
use serde::Deserialize;
use std::time::Duration;

/// Default pinning endpoint.
pub const DEFAULT_PIN_URL: &str = "https://api.pinata.cloud/pinning/pinFileToIPFS";

#[derive(Deserialize)]
struct PinResponse {
    #[serde(rename = "IpfsHash")]
    ipfs_hash: Option<String>,
}

/// Blob store backed by a pinning service and its gateway.
#[derive(Clone)]
pub struct PinataStore {
    client: Client,
    pin_url: String,
    jwt: String,
    gateway_url: String,
    timeout: Duration,
}

impl PinataStore {
    /// Creates a store for the given endpoint, credentials and gateway.
    ///
    /// # Errors
    /// `Misconfigured` if the JWT is blank or the HTTP client cannot be built.
    pub fn new(
        pin_url: impl Into<String>,
        jwt: impl Into<String>,
        gateway_url: impl Into<String>,
        timeout: Duration,
    ) -> Result<Self, BlobStoreError> {
        let jwt = jwt.into();
        if jwt.trim().is_empty() {
            return Err(BlobStoreError::Misconfigured("missing pinning service JWT".into()));
        }
        let client = Client::builder()
            .timeout(timeout)
            .build()
            .map_err(|e| BlobStoreError::Misconfigured(e.to_string()))?;
        Ok(Self {
            client,
            pin_url: pin_url.into(),
            jwt,
            gateway_url: gateway_url.into().trim_end_matches('/').to_string(),
            timeout,
        })
    }

    fn http_error(&self, err: reqwest::Error) -> BlobStoreError {
        BlobStoreError::from_http(err, self.timeout)
    }

    async fn rejected(&self, response: reqwest::Response) -> BlobStoreError {
        let status = response.status().as_u16();
        match response.text().await {
            Ok(body) => BlobStoreError::Rejected { status, body },
            Err(e) => self.http_error(e),
        }
    }
}

#[async_trait]
impl BlobStore for PinataStore {
    async fn put(&self, payload: &[u8], metadata: &BlobMetadata) -> Result<String, BlobStoreError> {
        if payload.is_empty() {
            return Err(BlobStoreError::EmptyPayload);
        }
        let metadata_json =
            serialize(metadata).map_err(|e| BlobStoreError::Transport(e.to_string()))?;
        let form = Form::new()
            .part("file", Part::bytes(payload.to_vec()).file_name(metadata.name.clone()))
            .text("pinataMetadata", metadata_json);

        debug!("pinning {} ({} bytes)", metadata.name, payload.len());
        let response = self
            .client
            .post(&self.pin_url)
            .bearer_auth(&self.jwt)
            .multipart(form)
            .send()
            .await
            .map_err(|e| self.http_error(e))?;

        if !response.status().is_success() {
            return Err(self.rejected(response).await);
        }

        let body = response.text().await.map_err(|e| self.http_error(e))?;
        let pinned: PinResponse = serde_json::from_str(&body).map_err(|e| {
            let detail = format!("unreadable response ({}): {}", e, excerpt(&body));
            BlobStoreError::MissingAddress(detail)
        })?;
        match pinned.ipfs_hash {
            Some(hash) if !hash.trim().is_empty() => Ok(hash),
            _ => Err(BlobStoreError::MissingAddress(format!("no IpfsHash in {}", excerpt(&body)))),
        }
    }

    async fn get(&self, content_address: &str) -> Result<Vec<u8>, BlobStoreError> {
        let response = self
            .client
            .get(self.locator(content_address))
            .send()
            .await
            .map_err(|e| self.http_error(e))?;
        let status = response.status();
        if status == reqwest::StatusCode::NOT_FOUND {
            return Err(BlobStoreError::NotFound(content_address.to_string()));
        }
        if !status.is_success() {
            return Err(self.rejected(response).await);
        }
        let bytes = response.bytes().await.map_err(|e| self.http_error(e))?;
        Ok(bytes.to_vec())
    }

    fn locator(&self, content_address: &str) -> String {
        format!("{}/ipfs/{}", self.gateway_url, content_address)
    }
}
