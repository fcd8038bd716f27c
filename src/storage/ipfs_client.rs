// src/storage/ipfs_client.rs
//! IPFS node blob store.
//!
//! Talks to a self-hosted IPFS node through its HTTP API for uploads and
//! reads, and builds locators against a configurable gateway.
//!
//! # Security Considerations
//! - All stored data is public by default (IPFS is a public network)
//! - For private data, encrypt before storage
//! - Addresses are content-derived and permanent

use crate::storage::{BlobMetadata, BlobStore, BlobStoreError};
use async_trait::async_trait;
use bytes::BytesMut;
use futures::TryStreamExt;
use ipfs_api_backend_hyper::{IpfsApi, IpfsClient, TryFromUri};
use log::debug;
use std::io::Cursor;
use std::sync::Arc;
use std::time::Duration;
use tokio::task;

/// Thread-safe IPFS client wrapper.
///
/// The hyper backend's futures are not `Send`, so each call runs on a blocking
/// thread with its own single-threaded runtime. The timeout is enforced inside
/// that runtime so a stalled node also releases the blocking thread.
#[derive(Clone)]
pub struct IpfsNodeStore {
    /// Shared IPFS client instance
    client: Arc<IpfsClient>,
    gateway_url: String,
    timeout: Duration,
}

impl IpfsNodeStore {
    /// Connects to the node API at `api_url` (e.g. `http://localhost:5001`).
    ///
    /// # Errors
    /// `Misconfigured` if the URL cannot be parsed.
    pub fn new(
        api_url: &str,
        gateway_url: impl Into<String>,
        timeout: Duration,
    ) -> Result<Self, BlobStoreError> {
        let client = IpfsClient::from_str(api_url).map_err(|e| {
            BlobStoreError::Misconfigured(format!("ipfs api url {}: {}", api_url, e))
        })?;
        Ok(Self {
            client: Arc::new(client),
            gateway_url: gateway_url.into().trim_end_matches('/').to_string(),
            timeout,
        })
    }

    fn runtime() -> Result<tokio::runtime::Runtime, BlobStoreError> {
        tokio::runtime::Builder::new_current_thread()
            .enable_all()
            .build()
            .map_err(|e| BlobStoreError::Transport(e.to_string()))
    }
}

#[async_trait]
impl BlobStore for IpfsNodeStore {
    async fn put(&self, payload: &[u8], metadata: &BlobMetadata) -> Result<String, BlobStoreError> {
        if payload.is_empty() {
            return Err(BlobStoreError::EmptyPayload);
        }
        let client = self.client.clone();
        let data = payload.to_vec();
        let timeout = self.timeout;
        debug!("adding {} ({} bytes) to ipfs node", metadata.name, data.len());

        let added = task::spawn_blocking(move || -> Result<String, BlobStoreError> {
            let rt = Self::runtime()?;
            rt.block_on(async {
                let response = tokio::time::timeout(timeout, client.add(Cursor::new(data)))
                    .await
                    .map_err(|_| BlobStoreError::Timeout(timeout.as_secs()))?
                    .map_err(|e| BlobStoreError::Transport(e.to_string()))?;
                Ok(response.hash)
            })
        })
        .await
        .map_err(|e| BlobStoreError::Transport(e.to_string()))??;

        if added.is_empty() {
            return Err(BlobStoreError::MissingAddress("ipfs node returned an empty hash".into()));
        }
        Ok(added)
    }

    async fn get(&self, content_address: &str) -> Result<Vec<u8>, BlobStoreError> {
        let client = self.client.clone();
        let address = content_address.to_string();
        let timeout = self.timeout;

        task::spawn_blocking(move || -> Result<Vec<u8>, BlobStoreError> {
            let rt = Self::runtime()?;
            rt.block_on(async {
                let read = client
                    .cat(&address)
                    .try_fold(BytesMut::new(), |mut acc, chunk| async move {
                        acc.extend_from_slice(&chunk);
                        Ok(acc)
                    });
                let data = tokio::time::timeout(timeout, read)
                    .await
                    .map_err(|_| BlobStoreError::Timeout(timeout.as_secs()))?
                    .map_err(|e| BlobStoreError::NotFound(format!("{}: {}", address, e)))?;
                Ok(data.to_vec())
            })
        })
        .await
        .map_err(|e| BlobStoreError::Transport(e.to_string()))?
    }

    fn locator(&self, content_address: &str) -> String {
        format!("{}/ipfs/{}", self.gateway_url, content_address)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn invalid_api_url_is_a_configuration_error() {
        let result =
            IpfsNodeStore::new("not a url", "http://127.0.0.1:8080", Duration::from_secs(5));
        assert!(matches!(result, Err(BlobStoreError::Misconfigured(_))));
    }

    #[tokio::test]
    async fn empty_payload_is_rejected_before_contacting_the_node() {
        let store = IpfsNodeStore::new(
            "http://127.0.0.1:5001",
            "http://127.0.0.1:8080/",
            Duration::from_secs(5),
        )
        .unwrap();
        let err = store.put(b"", &BlobMetadata::new("empty")).await.unwrap_err();
        assert!(matches!(err, BlobStoreError::EmptyPayload));
        assert_eq!(store.locator("bafy1"), "http://127.0.0.1:8080/ipfs/bafy1");
    }

    #[tokio::test]
    async fn stalled_node_times_out() {
        // Connections land in the backlog and never get a response.
        let listener = std::net::TcpListener::bind("127.0.0.1:0").unwrap();
        let api_url = format!("http://{}", listener.local_addr().unwrap());
        let gateway = "http://127.0.0.1:8080";
        let store = IpfsNodeStore::new(&api_url, gateway, Duration::from_millis(300)).unwrap();

        let err = store.put(b"payload", &BlobMetadata::new("p")).await.unwrap_err();
        assert!(matches!(err, BlobStoreError::Timeout(_)), "got {:?}", err);
        assert!(matches!(store.get("bafyslow").await, Err(BlobStoreError::Timeout(_))));
        drop(listener);
    }
}
