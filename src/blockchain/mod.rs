// src/blockchain/mod.rs
//! Record ledger boundary.
//!
//! The ledger is the authoritative, append-only system of record. The core
//! only needs two calls from it: issue a new anchoring record and list the
//! records held for a subject. Both are slow and fallible, and both may need a
//! connected session; a missing signer is reported as its own error instead of
//! hanging or being folded into a generic failure.

pub mod memory;
pub mod registry_client;
pub mod session;

pub use memory::MemoryLedger;
pub use registry_client::RegistryLedger;
pub use session::LedgerSession;

use crate::models::record::{IssueOutcome, LedgerRecord};
use async_trait::async_trait;
use thiserror::Error;

/// Failure talking to the ledger.
#[derive(Debug, Error)]
pub enum LedgerError {
    #[error("no signing account is available for ledger writes")]
    NoSigner,

    #[error("ledger is unreachable: {0}")]
    Unreachable(String),

    #[error("connected to chain {actual}, expected chain {expected}")]
    WrongNetwork { expected: u64, actual: u64 },

    #[error("no registry contract deployed at {0}")]
    ContractMissing(String),

    #[error("ledger transaction failed: {0}")]
    Transaction(String),

    #[error("ledger transaction {0} was dropped before inclusion")]
    Dropped(String),

    #[error("could not decode ledger response: {0}")]
    Decode(String),

    #[error("ledger call timed out after {0}s")]
    Timeout(u64),

    #[error("ledger is misconfigured: {0}")]
    Misconfigured(String),
}

/// Fields written to the ledger by one anchoring.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct IssueRequest {
    pub subject_id: String,
    pub document_name: String,
    pub content_address: String,
    pub fingerprint: String,
}

/// Append-only record ledger.
///
/// Implementations own their timeout policy and surface it as
/// [`LedgerError::Timeout`]. The core never retries.
#[async_trait]
pub trait Ledger: Send + Sync {
    /// Writes a new record and waits for its inclusion receipt.
    async fn issue(&self, request: &IssueRequest) -> Result<IssueOutcome, LedgerError>;

    /// Lists every record held for `subject_id`, in ledger order.
    async fn query(&self, subject_id: &str) -> Result<Vec<LedgerRecord>, LedgerError>;
}
