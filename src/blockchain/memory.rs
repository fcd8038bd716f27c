// src/blockchain/memory.rs
//! In-process ledger.
//!
//! Append-only per-subject record lists with a monotonically increasing block
//! number. Used by the `memory` configuration and throughout the test suite.

use crate::blockchain::{IssueRequest, Ledger, LedgerError};
use crate::models::record::{IssueOutcome, LedgerReceipt, LedgerRecord};
use crate::utils::crypto::fingerprint;
use async_trait::async_trait;
use chrono::{DateTime, Duration, Utc};
use std::collections::HashMap;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Mutex, PoisonError};

/// Account reported as issuer for every record written here.
pub const MEMORY_ISSUER: &str = "0x000000000000000000000000000000000000a11c";

struct Chain {
    records: HashMap<String, Vec<LedgerRecord>>,
    height: u64,
    clock: DateTime<Utc>,
}

pub struct MemoryLedger {
    chain: Mutex<Chain>,
    issuer: Option<String>,
    offline: AtomicBool,
}

impl MemoryLedger {
    /// A writable ledger whose first block is stamped with the current time.
    pub fn new() -> Self {
        Self::starting_at(Utc::now())
    }

    /// A writable ledger with a deterministic clock; each block adds one second.
    pub fn starting_at(genesis: DateTime<Utc>) -> Self {
        Self {
            chain: Mutex::new(Chain {
                records: HashMap::new(),
                height: 0,
                clock: genesis,
            }),
            issuer: Some(MEMORY_ISSUER.to_string()),
            offline: AtomicBool::new(false),
        }
    }

    /// A ledger without a signing account: every `issue` fails with `NoSigner`.
    pub fn read_only() -> Self {
        Self {
            issuer: None,
            ..Self::new()
        }
    }

    /// Simulates losing the connection; all calls fail with `Unreachable`.
    pub fn set_offline(&self, offline: bool) {
        self.offline.store(offline, Ordering::SeqCst);
    }

    /// Writes a record directly, as if another party had anchored it.
    pub fn seed(&self, subject_id: &str, record: LedgerRecord) {
        let mut chain = self.chain.lock().unwrap_or_else(PoisonError::into_inner);
        chain.height += 1;
        chain.records.entry(subject_id.to_string()).or_default().push(record);
    }

    fn ensure_online(&self) -> Result<(), LedgerError> {
        if self.offline.load(Ordering::SeqCst) {
            Err(LedgerError::Unreachable("memory ledger is offline".into()))
        } else {
            Ok(())
        }
    }
}

impl Default for MemoryLedger {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl Ledger for MemoryLedger {
    async fn issue(&self, request: &IssueRequest) -> Result<IssueOutcome, LedgerError> {
        self.ensure_online()?;
        let issuer = self.issuer.clone().ok_or(LedgerError::NoSigner)?;

        let mut chain = self.chain.lock().unwrap_or_else(PoisonError::into_inner);
        chain.height += 1;
        chain.clock = chain.clock + Duration::seconds(1);
        let block_number = chain.height;
        let issued_at = chain.clock;

        let tx_seed = format!(
            "{}|{}|{}|{}|{}",
            block_number,
            request.subject_id,
            request.document_name,
            request.content_address,
            request.fingerprint
        );
        let transaction_hash = format!("0x{}", fingerprint(tx_seed.as_bytes()));

        chain
            .records
            .entry(request.subject_id.clone())
            .or_default()
            .push(LedgerRecord {
                document_name: request.document_name.clone(),
                content_address: request.content_address.clone(),
                fingerprint: Some(request.fingerprint.clone()),
                issuer: Some(issuer.clone()),
                issued_at,
            });

        Ok(IssueOutcome {
            receipt: LedgerReceipt {
                transaction_hash,
                block_number,
            },
            issuer: Some(issuer),
            issued_at,
        })
    }

    async fn query(&self, subject_id: &str) -> Result<Vec<LedgerRecord>, LedgerError> {
        self.ensure_online()?;
        let chain = self.chain.lock().unwrap_or_else(PoisonError::into_inner);
        Ok(chain.records.get(subject_id).cloned().unwrap_or_default())
    }
}
