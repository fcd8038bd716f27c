// src/services/anchoring.rs
//! Anchoring service.
//!
//! Turns "anchor this document for this subject" into one operation over the
//! blob store, the fingerprinter and the ledger, then mirrors the result into
//! the local index. Steps run strictly in order and the first failure aborts
//! the rest; nothing is rolled back, so a ledger failure leaves an orphaned
//! blob behind.

use crate::blockchain::{IssueRequest, Ledger};
use crate::error::{AnchorError, ValidationError};
use crate::index::LocalIndex;
use crate::models::record::{AnchorRecord, LocalIndexEntry};
use crate::services::organization::OrganizationClassifier;
use crate::storage::{BlobMetadata, BlobStore};
use crate::utils::crypto::fingerprint;
use log::{debug, info, warn};
use std::sync::Arc;
use tokio::task;

/// Service binding uploaded payloads to ledger records.
pub struct AnchoringService {
    /// Content-addressable store for the payload bytes
    blob_store: Arc<dyn BlobStore>,

    /// Authoritative record ledger
    ledger: Arc<dyn Ledger>,

    /// Display cache updated after each successful anchor
    index: Arc<LocalIndex>,

    classifier: OrganizationClassifier,
}

impl AnchoringService {
    /// Creates a new AnchoringService.
    ///
    /// # Arguments
    /// * `blob_store` - Store the payload is uploaded to
    /// * `ledger` - Ledger the anchoring record is issued on
    /// * `index` - Local index mirroring issued records
    /// * `classifier` - Organization rules applied to index entries
    pub fn new(
        blob_store: Arc<dyn BlobStore>,
        ledger: Arc<dyn Ledger>,
        index: Arc<LocalIndex>,
        classifier: OrganizationClassifier,
    ) -> Self {
        Self {
            blob_store,
            ledger,
            index,
            classifier,
        }
    }

    /// Anchors `payload` under `subject_id` / `document_name`.
    ///
    /// # Arguments
    /// * `subject_id` - Holder identifier; surrounding whitespace is ignored
    /// * `document_name` - Human label; surrounding whitespace is ignored
    /// * `file_name` - Original file name, forwarded to the blob store as metadata
    /// * `payload` - Document bytes
    ///
    /// # Returns
    /// The issued record. Anchoring the same document twice yields two records.
    ///
    /// # Errors
    /// - `Validation` if an input is empty; no network call has been made
    /// - `Upload` if the blob store failed; the ledger was not touched
    /// - `Ledger` if issuance failed; the uploaded blob is left orphaned
    pub async fn anchor(
        &self,
        subject_id: &str,
        document_name: &str,
        file_name: &str,
        payload: &[u8],
    ) -> Result<AnchorRecord, AnchorError> {
        let subject_id = subject_id.trim();
        let document_name = document_name.trim();
        validate(subject_id, document_name, payload)?;

        let file_name = match file_name.trim() {
            "" => document_name,
            name => name,
        };
        let metadata = BlobMetadata::new(file_name)
            .with("subject_id", subject_id)
            .with("document_name", document_name);
        let content_address = self
            .blob_store
            .put(payload, &metadata)
            .await
            .map_err(AnchorError::Upload)?;
        debug!("uploaded {} bytes as {}", payload.len(), content_address);

        // Same bytes that were uploaded, so address and fingerprint agree.
        let fingerprint = fingerprint(payload);

        let request = IssueRequest {
            subject_id: subject_id.to_string(),
            document_name: document_name.to_string(),
            content_address,
            fingerprint,
        };
        let outcome = self.ledger.issue(&request).await.map_err(|e| {
            warn!("ledger issuance failed, {} is orphaned: {}", request.content_address, e);
            AnchorError::Ledger(e)
        })?;

        let record = AnchorRecord::from_issue(
            request.subject_id,
            request.document_name,
            request.content_address,
            request.fingerprint,
            outcome,
        );
        info!(
            "anchored '{}' for subject in tx {} (block {})",
            record.document_name, record.receipt.transaction_hash, record.receipt.block_number
        );

        let entry = LocalIndexEntry::new(record.clone(), self.organization(&record.document_name));
        // The file-backed store does blocking I/O.
        let index = self.index.clone();
        match task::spawn_blocking(move || index.append(entry)).await {
            Ok(Ok(())) => {}
            Ok(Err(e)) => warn!(
                "anchored {} but could not update the local index: {}",
                record.receipt.transaction_hash, e
            ),
            Err(e) => warn!(
                "anchored {} but the local index update did not finish: {}",
                record.receipt.transaction_hash, e
            ),
        }

        Ok(record)
    }

    /// Organization label the index records for `document_name`.
    pub fn organization(&self, document_name: &str) -> &str {
        self.classifier.classify(document_name)
    }

    /// Gateway URI for an anchored content address, i.e. the QR payload.
    pub fn locator(&self, content_address: &str) -> String {
        self.blob_store.locator(content_address)
    }

    pub fn index(&self) -> &Arc<LocalIndex> {
        &self.index
    }
}

fn validate(subject_id: &str, document_name: &str, payload: &[u8]) -> Result<(), ValidationError> {
    if subject_id.is_empty() {
        return Err(ValidationError::MissingSubjectId);
    }
    if document_name.is_empty() {
        return Err(ValidationError::MissingDocumentName);
    }
    if payload.is_empty() {
        return Err(ValidationError::EmptyPayload);
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::blockchain::{LedgerError, MemoryLedger};
    use crate::index::{IndexError, IndexStore, MemoryIndexStore};
    use crate::models::proof::Locators;
    use crate::storage::{BlobStoreError, MemoryBlobStore};
    use crate::utils::crypto::fingerprint;
    use std::sync::Mutex;
    use std::thread::{self, ThreadId};

    struct Fixture {
        blobs: Arc<MemoryBlobStore>,
        ledger: Arc<MemoryLedger>,
        index: Arc<LocalIndex>,
        service: AnchoringService,
    }

    fn fixture_with(ledger: MemoryLedger, index: LocalIndex) -> Fixture {
        let blobs = Arc::new(MemoryBlobStore::new());
        let ledger = Arc::new(ledger);
        let index = Arc::new(index);
        let service = AnchoringService::new(
            blobs.clone(),
            ledger.clone(),
            index.clone(),
            OrganizationClassifier::default(),
        );
        Fixture {
            blobs,
            ledger,
            index,
            service,
        }
    }

    fn fixture() -> Fixture {
        fixture_with(MemoryLedger::new(), LocalIndex::in_memory())
    }

    struct ReadOnlyStore;

    impl IndexStore for ReadOnlyStore {
        fn load(&self) -> Result<Vec<LocalIndexEntry>, IndexError> {
            Ok(Vec::new())
        }
        fn save(&self, _: &[LocalIndexEntry]) -> Result<(), IndexError> {
            Err(std::io::Error::new(std::io::ErrorKind::PermissionDenied, "read-only").into())
        }
    }

    #[tokio::test]
    async fn anchor_uploads_issues_and_indexes() {
        let f = fixture();
        let payload = b"%PDF-1.4 certificate";
        let record = f
            .service
            .anchor("S1", "10th Certificate", "cert.pdf", payload)
            .await
            .unwrap();

        assert_eq!(record.subject_id, "S1");
        assert_eq!(record.fingerprint, fingerprint(payload));
        assert_eq!(f.blobs.get(&record.content_address).await.unwrap(), payload);

        let on_ledger = f.ledger.query("S1").await.unwrap();
        assert_eq!(on_ledger.len(), 1);
        assert_eq!(on_ledger[0].content_address, record.content_address);
        assert_eq!(on_ledger[0].issued_at, record.issued_at);

        let entries = f.index.list();
        assert_eq!(entries.len(), 1);
        assert_eq!(entries[0].record, record);
        assert_eq!(entries[0].organization, "Unknown Organization");
    }

    #[tokio::test]
    async fn inputs_are_trimmed_and_classified() {
        let f = fixture();
        let record = f.service.anchor("  S1 ", " CBSE Marksheet ", "", b"x").await.unwrap();
        assert_eq!(record.subject_id, "S1");
        assert_eq!(record.document_name, "CBSE Marksheet");
        assert_eq!(f.index.list()[0].organization, "Central Board of Secondary Education");
    }

    #[tokio::test]
    async fn validation_happens_before_any_upload() {
        let f = fixture();
        let cases: [(&str, &str, &[u8], ValidationError); 3] = [
            ("", "Doc", b"x", ValidationError::MissingSubjectId),
            ("S1", "   ", b"x", ValidationError::MissingDocumentName),
            ("S1", "Doc", b"", ValidationError::EmptyPayload),
        ];
        for (subject, name, payload, expected) in cases {
            match f.service.anchor(subject, name, "f.pdf", payload).await {
                Err(AnchorError::Validation(e)) => assert_eq!(e, expected),
                other => panic!("expected validation error, got {:?}", other),
            }
        }
        assert_eq!(f.blobs.upload_count(), 0);
    }

    #[tokio::test]
    async fn upload_failure_skips_the_ledger() {
        let f = fixture();
        f.blobs.reject_uploads(true);
        let err = f.service.anchor("S1", "Doc", "f.pdf", b"x").await.unwrap_err();
        assert!(matches!(err, AnchorError::Upload(BlobStoreError::Rejected { status: 503, .. })));
        assert!(f.ledger.query("S1").await.unwrap().is_empty());
        assert!(f.index.is_empty());
    }

    #[tokio::test]
    async fn ledger_failure_orphans_the_blob() {
        let f = fixture_with(MemoryLedger::read_only(), LocalIndex::in_memory());
        let err = f.service.anchor("S1", "Doc", "f.pdf", b"orphan").await.unwrap_err();
        assert!(matches!(err, AnchorError::Ledger(LedgerError::NoSigner)));
        assert_eq!(f.blobs.upload_count(), 1);
        assert!(f.index.is_empty());
    }

    #[tokio::test]
    async fn index_failure_does_not_fail_the_anchor() {
        let index = LocalIndex::open(Box::new(ReadOnlyStore), Locators::default()).unwrap();
        let f = fixture_with(MemoryLedger::new(), index);
        let record = f.service.anchor("S1", "Doc", "f.pdf", b"x").await.unwrap();
        assert_eq!(f.ledger.query("S1").await.unwrap()[0].document_name, record.document_name);
        assert!(f.index.is_empty());
    }

    /// Records which thread each save ran on.
    struct ThreadRecordingStore {
        threads: Arc<Mutex<Vec<ThreadId>>>,
        inner: MemoryIndexStore,
    }

    impl IndexStore for ThreadRecordingStore {
        fn load(&self) -> Result<Vec<LocalIndexEntry>, IndexError> {
            self.inner.load()
        }
        fn save(&self, entries: &[LocalIndexEntry]) -> Result<(), IndexError> {
            self.threads.lock().unwrap().push(thread::current().id());
            self.inner.save(entries)
        }
    }

    #[tokio::test]
    async fn index_writes_run_off_the_async_thread() {
        let threads = Arc::new(Mutex::new(Vec::new()));
        let store = ThreadRecordingStore {
            threads: threads.clone(),
            inner: MemoryIndexStore::new(),
        };
        let index = LocalIndex::open(Box::new(store), Locators::default()).unwrap();
        let f = fixture_with(MemoryLedger::new(), index);

        f.service.anchor("S1", "Doc", "f.pdf", b"x").await.unwrap();
        let saves = threads.lock().unwrap().clone();
        assert_eq!(saves.len(), 1);
        assert_ne!(saves[0], thread::current().id());
        assert_eq!(f.index.len(), 1);
    }

    #[test]
    fn organization_follows_the_classifier() {
        let f = fixture();
        assert_eq!(f.service.organization("MZU Transcript"), "Mizoram University");
        assert_eq!(f.service.organization("random.pdf"), "Unknown Organization");
    }

    #[tokio::test]
    async fn anchoring_twice_keeps_both_records() {
        let f = fixture();
        let first = f.service.anchor("S1", "Doc", "f.pdf", b"same").await.unwrap();
        let second = f.service.anchor("S1", "Doc", "f.pdf", b"same").await.unwrap();
        assert_eq!(first.content_address, second.content_address);
        assert_ne!(first.receipt.transaction_hash, second.receipt.transaction_hash);
        assert_eq!(f.ledger.query("S1").await.unwrap().len(), 2);
        assert_eq!(f.index.len(), 2);
    }

    #[tokio::test]
    async fn locator_points_at_the_gateway() {
        let f = fixture();
        let record = f.service.anchor("S1", "Doc", "f.pdf", b"x").await.unwrap();
        assert_eq!(
            f.service.locator(&record.content_address),
            format!("https://gateway.pinata.cloud/ipfs/{}", record.content_address)
        );
    }
}
