// src/storage/mod.rs
//! Content-addressable blob storage boundary.
//!
//! The anchoring core never talks to a storage backend directly. It goes
//! through [`BlobStore`], which uploads a payload and hands back the content
//! address, retrieves bytes by address, and turns an address into the gateway
//! locator that ends up in QR codes and proofs.

pub mod ipfs_client;
pub mod memory;
pub mod pinata;

pub use ipfs_client::IpfsNodeStore;
pub use memory::MemoryBlobStore;
pub use pinata::PinataStore;

use async_trait::async_trait;
use serde::Serialize;
use std::collections::BTreeMap;
use std::time::Duration;
use thiserror::Error;

/// Failure talking to the blob store.
#[derive(Debug, Error)]
pub enum BlobStoreError {
    #[error("refusing to upload an empty payload")]
    EmptyPayload,

    #[error("blob store rejected the request ({status}): {body}")]
    Rejected { status: u16, body: String },

    #[error("blob store response did not contain a content address: {0}")]
    MissingAddress(String),

    #[error("no blob stored at {0}")]
    NotFound(String),

    #[error("blob store is not configured: {0}")]
    Misconfigured(String),

    #[error("blob store transport error: {0}")]
    Transport(String),

    #[error("blob store call timed out after {0}s")]
    Timeout(u64),
}

impl BlobStoreError {
    /// Maps an HTTP client failure, keeping timeouts distinct from other
    /// transport errors.
    pub fn from_http(err: reqwest::Error, timeout: Duration) -> Self {
        if err.is_timeout() {
            BlobStoreError::Timeout(timeout.as_secs())
        } else {
            BlobStoreError::Transport(err.to_string())
        }
    }
}

/// First part of a response body, for error messages.
pub(crate) fn excerpt(body: &str) -> String {
    const LIMIT: usize = 200;
    match body.char_indices().nth(LIMIT) {
        Some((end, _)) => format!("{}...", &body[..end]),
        None => body.to_string(),
    }
}

/// Companion data sent with an upload.
#[derive(Serialize, Debug, Clone, PartialEq, Eq)]
pub struct BlobMetadata {
    /// Original file name of the payload
    pub name: String,
    /// Free-form key/value annotations
    pub keyvalues: BTreeMap<String, String>,
}

impl BlobMetadata {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            keyvalues: BTreeMap::new(),
        }
    }

    pub fn with(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.keyvalues.insert(key.into(), value.into());
        self
    }
}

/// Content-addressable storage for anchored payloads.
///
/// Implementations own their timeout and retry policy; the core calls each
/// method once and surfaces the error as-is.
#[async_trait]
pub trait BlobStore: Send + Sync {
    /// Uploads `payload` and returns its content address.
    async fn put(&self, payload: &[u8], metadata: &BlobMetadata) -> Result<String, BlobStoreError>;

    /// Retrieves the bytes stored at `content_address`.
    async fn get(&self, content_address: &str) -> Result<Vec<u8>, BlobStoreError>;

    /// Retrievable URI for `content_address`.
    fn locator(&self, content_address: &str) -> String;
}

/// Pulls the content address out of a gateway locator.
///
/// Accepts `<gateway>/ipfs/<address>[/path][?query][#fragment]` and
/// `ipfs://<address>`. Returns `None` when no address segment is present.
pub fn address_from_locator(locator: &str) -> Option<&str> {
    let locator = locator.trim();
    let rest = if let Some(rest) = locator.strip_prefix("ipfs://") {
        rest
    } else {
        let start = locator.find("/ipfs/")? + "/ipfs/".len();
        &locator[start..]
    };
    let end = rest.find(['/', '?', '#']).unwrap_or(rest.len());
    let address = rest[..end].trim();
    if address.is_empty() || address.chars().any(char::is_whitespace) {
        None
    } else {
        Some(address)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn extracts_address_from_gateway_link() {
        assert_eq!(
            address_from_locator("https://gateway.pinata.cloud/ipfs/QmHash123"),
            Some("QmHash123")
        );
        assert_eq!(
            address_from_locator("  https://gw.test/ipfs/bafyabc/file.pdf?download=1 "),
            Some("bafyabc")
        );
        assert_eq!(address_from_locator("https://gw.test/ipfs/bafyabc#x"), Some("bafyabc"));
        assert_eq!(address_from_locator("ipfs://QmHash123"), Some("QmHash123"));
    }

    #[test]
    fn rejects_locators_without_address() {
        assert_eq!(address_from_locator("https://gateway.pinata.cloud/ipfs/"), None);
        assert_eq!(address_from_locator("https://gateway.pinata.cloud/ipfs/?x=1"), None);
        assert_eq!(address_from_locator("QmHash123"), None);
        assert_eq!(address_from_locator("hello world"), None);
        assert_eq!(address_from_locator(""), None);
    }

    #[test]
    fn long_bodies_are_cut_for_messages() {
        assert_eq!(excerpt("short"), "short");
        let long = "x".repeat(500);
        assert_eq!(excerpt(&long).len(), 203);
    }

    #[test]
    fn metadata_builder_collects_keyvalues() {
        let meta = BlobMetadata::new("scan.pdf").with("category", "Credential Document");
        assert_eq!(meta.keyvalues.get("category").map(String::as_str), Some("Credential Document"));
        let json = serde_json::to_value(&meta).unwrap();
        assert_eq!(json["name"], "scan.pdf");
    }
}
