// src/storage/memory.rs
//! In-process blob store.
//!
//! Content-addressed by the payload's SHA-256, so identical bytes always map
//! to the same address. Backs the `memory` configuration and the test suite.

use crate::models::proof::DEFAULT_GATEWAY_URL;
use crate::storage::{BlobMetadata, BlobStore, BlobStoreError};
use crate::utils::crypto::fingerprint;
use async_trait::async_trait;
use std::collections::HashMap;
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::{Mutex, PoisonError};

/// Prefix distinguishing in-memory addresses from real CIDs.
const ADDRESS_PREFIX: &str = "mem";

#[derive(Default)]
pub struct MemoryBlobStore {
    blobs: Mutex<HashMap<String, Vec<u8>>>,
    gateway_url: String,
    uploads: AtomicUsize,
    reject_uploads: AtomicBool,
}

impl MemoryBlobStore {
    pub fn new() -> Self {
        Self::with_gateway(DEFAULT_GATEWAY_URL)
    }

    pub fn with_gateway(gateway_url: impl Into<String>) -> Self {
        Self {
            gateway_url: gateway_url.into().trim_end_matches('/').to_string(),
            ..Default::default()
        }
    }

    /// Makes every subsequent `put` fail with a 503 rejection.
    pub fn reject_uploads(&self, reject: bool) {
        self.reject_uploads.store(reject, Ordering::SeqCst);
    }

    /// Number of `put` calls that reached the store (successful or not).
    pub fn upload_count(&self) -> usize {
        self.uploads.load(Ordering::SeqCst)
    }

    /// Overwrites the bytes behind an address, simulating a tampered blob.
    pub fn tamper(&self, content_address: &str, payload: &[u8]) {
        self.blobs
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .insert(content_address.to_string(), payload.to_vec());
    }
}

#[async_trait]
impl BlobStore for MemoryBlobStore {
    async fn put(
        &self,
        payload: &[u8],
        _metadata: &BlobMetadata,
    ) -> Result<String, BlobStoreError> {
        if payload.is_empty() {
            return Err(BlobStoreError::EmptyPayload);
        }
        self.uploads.fetch_add(1, Ordering::SeqCst);
        if self.reject_uploads.load(Ordering::SeqCst) {
            return Err(BlobStoreError::Rejected {
                status: 503,
                body: "uploads disabled".into(),
            });
        }
        let address = format!("{}{}", ADDRESS_PREFIX, &fingerprint(payload)[..46]);
        self.blobs
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .insert(address.clone(), payload.to_vec());
        Ok(address)
    }

    async fn get(&self, content_address: &str) -> Result<Vec<u8>, BlobStoreError> {
        self.blobs
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .get(content_address)
            .cloned()
            .ok_or_else(|| BlobStoreError::NotFound(content_address.to_string()))
    }

    fn locator(&self, content_address: &str) -> String {
        format!("{}/ipfs/{}", self.gateway_url, content_address)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn identical_bytes_share_an_address() {
        let store = MemoryBlobStore::new();
        let meta = BlobMetadata::new("a");
        let first = store.put(b"same", &meta).await.unwrap();
        let second = store.put(b"same", &meta).await.unwrap();
        let other = store.put(b"different", &meta).await.unwrap();
        assert_eq!(first, second);
        assert_ne!(first, other);
        assert_eq!(store.get(&first).await.unwrap(), b"same".to_vec());
        assert_eq!(store.upload_count(), 3);
    }

    #[tokio::test]
    async fn rejection_switch_fails_uploads() {
        let store = MemoryBlobStore::new();
        store.reject_uploads(true);
        let err = store.put(b"x", &BlobMetadata::new("x")).await.unwrap_err();
        assert!(matches!(err, BlobStoreError::Rejected { status: 503, .. }));
        assert!(matches!(store.get("mem-missing").await, Err(BlobStoreError::NotFound(_))));
    }
}
