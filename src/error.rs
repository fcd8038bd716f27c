// src/error.rs
//! Errors surfaced by the anchoring protocol.
//!
//! Adapter errors keep their own types ([`BlobStoreError`], [`LedgerError`]);
//! [`AnchorError`] only records which step of the protocol failed.

use crate::blockchain::LedgerError;
use crate::storage::BlobStoreError;
use thiserror::Error;

/// Request rejected before any network call.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum ValidationError {
    #[error("subject id is required")]
    MissingSubjectId,

    #[error("document name is required")]
    MissingDocumentName,

    #[error("payload is empty")]
    EmptyPayload,
}

#[derive(Debug, Error)]
pub enum AnchorError {
    #[error("invalid anchor request: {0}")]
    Validation(#[from] ValidationError),

    /// The blob store refused the payload; nothing was written to the ledger
    #[error("upload failed: {0}")]
    Upload(#[source] BlobStoreError),

    /// The payload is stored but no ledger record exists for it
    #[error("ledger issuance failed: {0}")]
    Ledger(#[source] LedgerError),
}

impl AnchorError {
    /// Short machine-readable kind, used in HTTP error bodies.
    pub fn kind(&self) -> &'static str {
        match self {
            AnchorError::Validation(_) => "validation",
            AnchorError::Upload(_) => "upload",
            AnchorError::Ledger(LedgerError::NoSigner) => "no_signer",
            AnchorError::Ledger(_) => "ledger",
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn kinds_distinguish_missing_signer() {
        assert_eq!(AnchorError::from(ValidationError::EmptyPayload).kind(), "validation");
        let missing = BlobStoreError::MissingAddress("no IpfsHash".into());
        assert_eq!(AnchorError::Upload(missing).kind(), "upload");
        assert_eq!(AnchorError::Ledger(LedgerError::NoSigner).kind(), "no_signer");
        assert_eq!(AnchorError::Ledger(LedgerError::Timeout(30)).kind(), "ledger");
    }

    #[test]
    fn messages_name_the_failed_step() {
        let err = AnchorError::Upload(BlobStoreError::Rejected {
            status: 401,
            body: "invalid token".into(),
        });
        assert_eq!(
            err.to_string(),
            "upload failed: blob store rejected the request (401): invalid token"
        );
    }
}
