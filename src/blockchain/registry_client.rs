// src/blockchain/registry_client.rs
//! EVM registry ledger.
//!
//! Implements [`Ledger`] on top of the Document Registry contract: reads go
//! through the session's bare provider, writes through its signer middleware.
//! The issuance time reported back is the timestamp of the block that included
//! the transaction.

use crate::blockchain::session::SignerClient;
use crate::blockchain::{IssueRequest, Ledger, LedgerError, LedgerSession};
use crate::contracts::document_registry::{DocumentRegistry, RawDocument};
use crate::models::record::{IssueOutcome, LedgerReceipt, LedgerRecord};
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use ethers::providers::{Http, Middleware, Provider};
use ethers::types::{Address, BlockId, BlockNumber, U256, U64};
use ethers::utils::to_checksum;
use log::{debug, info};
use std::str::FromStr;

/// Ledger adapter for the Document Registry contract.
pub struct RegistryLedger {
    session: LedgerSession,
    reader: DocumentRegistry<Provider<Http>>,
    /// Present only when the session carries a signing account
    writer: Option<DocumentRegistry<SignerClient>>,
}

impl RegistryLedger {
    /// Binds the registry at `contract_address` to `session` without network calls.
    ///
    /// # Errors
    /// `Misconfigured` if the address is not a valid 20-byte hex address.
    pub fn new(session: LedgerSession, contract_address: &str) -> Result<Self, LedgerError> {
        let address = Address::from_str(contract_address).map_err(|e| {
            LedgerError::Misconfigured(format!("contract address {}: {}", contract_address, e))
        })?;
        let reader = DocumentRegistry::new(address, session.provider())?;
        let writer = match session.signer() {
            Ok(signer) => Some(DocumentRegistry::new(address, signer)?),
            Err(_) => None,
        };
        Ok(Self {
            session,
            reader,
            writer,
        })
    }

    /// Binds the registry and checks that contract code exists at the address.
    pub async fn connect(
        session: LedgerSession,
        contract_address: &str,
    ) -> Result<Self, LedgerError> {
        let ledger = Self::new(session, contract_address)?;
        ledger.ensure_deployed().await?;
        Ok(ledger)
    }

    /// Fails with `ContractMissing` when the address holds no code on this chain.
    pub async fn ensure_deployed(&self) -> Result<(), LedgerError> {
        let provider = self.session.provider();
        let address = self.reader.address();
        let code = self
            .session
            .bounded(async move {
                provider
                    .get_code(address, None)
                    .await
                    .map_err(|e| LedgerError::Unreachable(e.to_string()))
            })
            .await?;
        if code.as_ref().is_empty() {
            return Err(LedgerError::ContractMissing(to_checksum(&address, None)));
        }
        Ok(())
    }

    async fn block_time(&self, block_number: U64) -> Result<DateTime<Utc>, LedgerError> {
        let block = self
            .session
            .provider()
            .get_block(BlockId::Number(BlockNumber::Number(block_number)))
            .await
            .map_err(|e| LedgerError::Unreachable(e.to_string()))?
            .ok_or_else(|| LedgerError::Decode(format!("block {} not found", block_number)))?;
        unix_time(block.timestamp)
    }
}

#[async_trait]
impl Ledger for RegistryLedger {
    async fn issue(&self, request: &IssueRequest) -> Result<IssueOutcome, LedgerError> {
        let writer = self.writer.as_ref().ok_or(LedgerError::NoSigner)?;
        let receipt = self
            .session
            .bounded(writer.issue_document(
                &request.subject_id,
                &request.document_name,
                &request.content_address,
                &request.fingerprint,
            ))
            .await?;

        let transaction_hash = format!("{:?}", receipt.transaction_hash);
        if receipt.status == Some(U64::zero()) {
            return Err(LedgerError::Transaction(format!("{} reverted", transaction_hash)));
        }
        let block_number = receipt
            .block_number
            .ok_or_else(|| LedgerError::Dropped(transaction_hash.clone()))?;
        let issued_at = self.session.bounded(self.block_time(block_number)).await?;

        info!("registry issued {} in block {}", transaction_hash, block_number);
        Ok(IssueOutcome {
            receipt: LedgerReceipt {
                transaction_hash,
                block_number: block_number.as_u64(),
            },
            issuer: self.session.signer_address().map(|a| to_checksum(&a, None)),
            issued_at,
        })
    }

    async fn query(&self, subject_id: &str) -> Result<Vec<LedgerRecord>, LedgerError> {
        let raw = self.session.bounded(self.reader.get_documents(subject_id)).await?;
        debug!("registry returned {} records for subject", raw.len());
        raw.into_iter().map(decode_document).collect()
    }
}

/// Converts a contract `Document` tuple into a ledger record.
fn decode_document(raw: RawDocument) -> Result<LedgerRecord, LedgerError> {
    let (document_name, content_address, file_hash, issuer, issued_on) = raw;
    Ok(LedgerRecord {
        document_name,
        content_address,
        fingerprint: Some(file_hash).filter(|h| !h.is_empty()),
        issuer: Some(issuer)
            .filter(|a| !a.is_zero())
            .map(|a| to_checksum(&a, None)),
        issued_at: unix_time(issued_on)?,
    })
}

fn unix_time(seconds: U256) -> Result<DateTime<Utc>, LedgerError> {
    if seconds > U256::from(i64::MAX as u64) {
        return Err(LedgerError::Decode(format!("timestamp {} out of range", seconds)));
    }
    DateTime::<Utc>::from_timestamp(seconds.as_u64() as i64, 0)
        .ok_or_else(|| LedgerError::Decode(format!("timestamp {} out of range", seconds)))
}
