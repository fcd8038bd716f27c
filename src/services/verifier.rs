// src/services/verifier.rs
//! Document verification service.
//!
//! Resolves a claim about a document against the ledger and answers with a
//! [`Verdict`]. Verification never fails with an error: adapter failures are
//! folded into [`Verdict::VerificationError`] so callers can render every
//! outcome the same way.
//!
//! Entry points:
//! - by subject id and document name
//! - by content address, as carried by a QR code (scans candidate subjects)
//! - by subject id, document name and the payload bytes themselves
//! - by a previously exported proof document

use crate::blockchain::Ledger;
use crate::index::LocalIndex;
use crate::models::proof::ProofDocument;
use crate::models::record::{LedgerRecord, LocalIndexEntry};
use crate::services::subjects::SubjectSource;
use crate::storage::{address_from_locator, BlobStore};
use crate::utils::crypto::{fingerprint, is_fingerprint};
use crate::utils::serialization::as_display;
use chrono::{DateTime, Utc};
use log::{debug, info, warn};
use serde::Serialize;
use std::sync::Arc;
use thiserror::Error;

/// Ledger-backed details of a verified document.
#[derive(Serialize, Debug, Clone, PartialEq, Eq)]
pub struct VerifiedDocument {
    pub subject_id: String,
    pub document_name: String,
    pub issuer: Option<String>,
    pub content_address: String,
    pub fingerprint: Option<String>,
    pub issued_at: DateTime<Utc>,
}

impl VerifiedDocument {
    fn from_record(subject_id: &str, record: LedgerRecord) -> Self {
        Self {
            subject_id: subject_id.to_string(),
            document_name: record.document_name,
            issuer: record.issuer,
            content_address: record.content_address,
            fingerprint: record.fingerprint,
            issued_at: record.issued_at,
        }
    }
}

/// Why a verification could not reach a conclusion.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum VerificationFailure {
    #[error("ledger query failed: {0}")]
    Ledger(String),

    #[error("blob retrieval failed: {0}")]
    BlobStore(String),
}

/// Outcome of a verification request.
#[derive(Serialize, Debug, Clone, PartialEq, Eq)]
#[serde(tag = "verdict", rename_all = "snake_case")]
pub enum Verdict {
    Verified(VerifiedDocument),

    /// The ledger holds nothing for this subject
    NoRecordsForSubject { subject_id: String },

    /// The subject has records, none with this name
    DocumentNameNotFound { subject_id: String, document_name: String },

    /// The reference carried no content address, or a proof hash that is not a fingerprint
    InvalidReference { reference: String },

    /// No scanned subject holds a record with this content address
    NotFound { content_address: String },

    FingerprintMismatch { expected: String, actual: String },

    ContentAddressMismatch { expected: String, actual: String },

    /// The record exists but lacks the fingerprint needed for this check
    Unverifiable { subject_id: String, document_name: String },

    /// The ledger could not be reached; only the local index knows this address
    UnconfirmedLocalMatch {
        entry: LocalIndexEntry,
        #[serde(serialize_with = "as_display")]
        cause: VerificationFailure,
    },

    VerificationError {
        #[serde(serialize_with = "as_display")]
        cause: VerificationFailure,
    },
}

impl Verdict {
    pub fn is_verified(&self) -> bool {
        matches!(self, Verdict::Verified(_))
    }

    /// Stable snake_case name of the variant, as used in the JSON tag.
    pub fn kind(&self) -> &'static str {
        match self {
            Verdict::Verified(_) => "verified",
            Verdict::NoRecordsForSubject { .. } => "no_records_for_subject",
            Verdict::DocumentNameNotFound { .. } => "document_name_not_found",
            Verdict::InvalidReference { .. } => "invalid_reference",
            Verdict::NotFound { .. } => "not_found",
            Verdict::FingerprintMismatch { .. } => "fingerprint_mismatch",
            Verdict::ContentAddressMismatch { .. } => "content_address_mismatch",
            Verdict::Unverifiable { .. } => "unverifiable",
            Verdict::UnconfirmedLocalMatch { .. } => "unconfirmed_local_match",
            Verdict::VerificationError { .. } => "verification_error",
        }
    }
}

/// Verification service over a ledger, a blob store and a subject source.
pub struct Verifier {
    ledger: Arc<dyn Ledger>,
    blob_store: Arc<dyn BlobStore>,
    /// Subjects scanned on the content-address path
    subjects: Arc<dyn SubjectSource>,
    /// Fallback for the content-address path when the ledger is down
    index: Option<Arc<LocalIndex>>,
    check_blob_integrity: bool,
}

impl Verifier {
    /// Constructs a new Verifier.
    ///
    /// # Arguments
    /// * `ledger` - Authoritative record ledger
    /// * `blob_store` - Used only by the opt-in blob integrity check
    /// * `subjects` - Candidate subjects for content-address lookups
    pub fn new(
        ledger: Arc<dyn Ledger>,
        blob_store: Arc<dyn BlobStore>,
        subjects: Arc<dyn SubjectSource>,
    ) -> Self {
        Self {
            ledger,
            blob_store,
            subjects,
            index: None,
            check_blob_integrity: false,
        }
    }

    /// Enables the local-index fallback on the content-address path.
    pub fn with_index(mut self, index: Arc<LocalIndex>) -> Self {
        self.index = Some(index);
        self
    }

    /// When enabled, a content-address match also fetches the blob and
    /// compares its fingerprint with the ledger's.
    pub fn with_blob_integrity(mut self, enabled: bool) -> Self {
        self.check_blob_integrity = enabled;
        self
    }

    /// Verifies that `subject_id` holds a record named `document_name`.
    ///
    /// Names compare case-insensitively; with several matches the first in
    /// ledger order is reported.
    pub async fn verify_by_identifier(&self, subject_id: &str, document_name: &str) -> Verdict {
        let verdict = match self.resolve(subject_id, document_name).await {
            Ok(record) => {
                Verdict::Verified(VerifiedDocument::from_record(subject_id.trim(), record))
            }
            Err(verdict) => verdict,
        };
        info!("identifier verification: {}", verdict.kind());
        verdict
    }

    /// Verifies a gateway locator (the QR payload) by its content address.
    ///
    /// # Returns
    /// - `InvalidReference` if the locator has no address segment; the ledger
    ///   is not queried
    /// - `Verified` for the first scanned subject holding the exact address
    /// - `NotFound` if no candidate subject holds it
    /// - `UnconfirmedLocalMatch` or `VerificationError` if the ledger failed
    ///
    /// # Note
    /// Cost is one ledger query per candidate subject.
    pub async fn verify_by_content_address(&self, locator: &str) -> Verdict {
        let content_address = match address_from_locator(locator) {
            Some(address) => address.to_string(),
            None => {
                debug!("rejecting reference without a content address");
                return Verdict::InvalidReference {
                    reference: locator.to_string(),
                };
            }
        };

        let verdict = self.scan_subjects(&content_address).await;
        info!("content-address verification of {}: {}", content_address, verdict.kind());
        verdict
    }

    /// Verifies `payload` against the fingerprint recorded for
    /// `subject_id` / `document_name`.
    pub async fn verify_by_payload(
        &self,
        subject_id: &str,
        document_name: &str,
        payload: &[u8],
    ) -> Verdict {
        let record = match self.resolve(subject_id, document_name).await {
            Ok(record) => record,
            Err(verdict) => return verdict,
        };
        let verdict = match record.fingerprint.as_deref() {
            None => Verdict::Unverifiable {
                subject_id: subject_id.trim().to_string(),
                document_name: record.document_name,
            },
            Some(expected) => {
                let actual = fingerprint(payload);
                if expected.eq_ignore_ascii_case(&actual) {
                    Verdict::Verified(VerifiedDocument::from_record(subject_id.trim(), record))
                } else {
                    Verdict::FingerprintMismatch {
                        expected: expected.to_string(),
                        actual,
                    }
                }
            }
        };
        info!("payload verification: {}", verdict.kind());
        verdict
    }

    /// Re-verifies an exported proof: the ledger must hold a record for the
    /// proof's subject and name whose content address and fingerprint both
    /// equal the proof's.
    ///
    /// A `File_Hash` that is present but not a SHA-256 hex digest is an
    /// `InvalidReference`; the ledger is not queried for it.
    pub async fn verify_proof(&self, proof: &ProofDocument) -> Verdict {
        let claimed = proof.fingerprint.trim();
        if !claimed.is_empty() && !is_fingerprint(&claimed.to_ascii_lowercase()) {
            debug!("proof {} carries a malformed file hash", proof.transaction_hash);
            return Verdict::InvalidReference {
                reference: proof.fingerprint.clone(),
            };
        }

        let records = match self.named_records(&proof.subject_id, &proof.document_name).await {
            Ok(records) => records,
            Err(verdict) => return verdict,
        };

        // Re-anchoring leaves several records under one name; prefer the one this proof is for.
        let position = records
            .iter()
            .position(|r| r.content_address == proof.content_address)
            .unwrap_or(0);
        let Some(record) = records.into_iter().nth(position) else {
            return Verdict::DocumentNameNotFound {
                subject_id: proof.subject_id.trim().to_string(),
                document_name: proof.document_name.trim().to_string(),
            };
        };

        let verdict = if record.content_address != proof.content_address {
            Verdict::ContentAddressMismatch {
                expected: record.content_address,
                actual: proof.content_address.clone(),
            }
        } else {
            match record.fingerprint.as_deref() {
                None => Verdict::Unverifiable {
                    subject_id: proof.subject_id.trim().to_string(),
                    document_name: record.document_name.clone(),
                },
                Some(expected) if !expected.eq_ignore_ascii_case(&proof.fingerprint) => {
                    Verdict::FingerprintMismatch {
                        expected: expected.to_string(),
                        actual: proof.fingerprint.clone(),
                    }
                }
                Some(_) => Verdict::Verified(VerifiedDocument::from_record(
                    proof.subject_id.trim(),
                    record,
                )),
            }
        };
        info!("proof verification of {}: {}", proof.transaction_hash, verdict.kind());
        verdict
    }

    /// First record for the subject whose name matches, or the verdict explaining its absence.
    async fn resolve(
        &self,
        subject_id: &str,
        document_name: &str,
    ) -> Result<LedgerRecord, Verdict> {
        self.named_records(subject_id, document_name)
            .await?
            .into_iter()
            .next()
            .ok_or_else(|| Verdict::DocumentNameNotFound {
                subject_id: subject_id.trim().to_string(),
                document_name: document_name.trim().to_string(),
            })
    }

    /// All records for the subject whose name matches, in ledger order; never empty.
    async fn named_records(
        &self,
        subject_id: &str,
        document_name: &str,
    ) -> Result<Vec<LedgerRecord>, Verdict> {
        let subject_id = subject_id.trim();
        let document_name = document_name.trim();
        if subject_id.is_empty() {
            return Err(Verdict::NoRecordsForSubject {
                subject_id: String::new(),
            });
        }

        let records = self.ledger.query(subject_id).await.map_err(|e| {
            warn!("ledger query failed during verification: {}", e);
            Verdict::VerificationError {
                cause: VerificationFailure::Ledger(e.to_string()),
            }
        })?;
        if records.is_empty() {
            return Err(Verdict::NoRecordsForSubject {
                subject_id: subject_id.to_string(),
            });
        }

        let wanted = document_name.to_lowercase();
        let matches: Vec<LedgerRecord> = records
            .into_iter()
            .filter(|r| r.document_name.trim().to_lowercase() == wanted)
            .collect();
        if matches.is_empty() {
            return Err(Verdict::DocumentNameNotFound {
                subject_id: subject_id.to_string(),
                document_name: document_name.to_string(),
            });
        }
        Ok(matches)
    }

    async fn scan_subjects(&self, content_address: &str) -> Verdict {
        for subject_id in self.subjects.subjects() {
            let records = match self.ledger.query(&subject_id).await {
                Ok(records) => records,
                Err(e) => {
                    warn!("ledger query for a candidate subject failed: {}", e);
                    let cause = VerificationFailure::Ledger(e.to_string());
                    return self.local_fallback(content_address, cause);
                }
            };
            let found = records.into_iter().find(|r| r.content_address == content_address);
            if let Some(record) = found {
                return self.confirm_blob(&subject_id, record).await;
            }
        }
        Verdict::NotFound {
            content_address: content_address.to_string(),
        }
    }

    async fn confirm_blob(&self, subject_id: &str, record: LedgerRecord) -> Verdict {
        let expected = match (&record.fingerprint, self.check_blob_integrity) {
            (Some(expected), true) => expected.clone(),
            _ => return Verdict::Verified(VerifiedDocument::from_record(subject_id, record)),
        };
        match self.blob_store.get(&record.content_address).await {
            Ok(bytes) => {
                let actual = fingerprint(&bytes);
                if expected.eq_ignore_ascii_case(&actual) {
                    Verdict::Verified(VerifiedDocument::from_record(subject_id, record))
                } else {
                    Verdict::FingerprintMismatch { expected, actual }
                }
            }
            Err(e) => Verdict::VerificationError {
                cause: VerificationFailure::BlobStore(e.to_string()),
            },
        }
    }

    fn local_fallback(&self, content_address: &str, cause: VerificationFailure) -> Verdict {
        match self
            .index
            .as_ref()
            .and_then(|index| index.find_by_content_address(content_address))
        {
            Some(entry) => Verdict::UnconfirmedLocalMatch { entry, cause },
            None => Verdict::VerificationError { cause },
        }
    }
}
