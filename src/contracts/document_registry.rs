// src/contracts/document_registry.rs
//! Document Registry smart contract interface.
//!
//! The registry keeps, per subject identifier, an append-only list of
//! `Document { docName, ipfsCID, fileHash, issuer, issuedOn }` entries.
//! `issuer` is the transaction sender and `issuedOn` the block timestamp, both
//! set by the contract.

use crate::blockchain::LedgerError;
use ethers::providers::Middleware;
use ethers::types::{Address, TransactionReceipt, U256};
use ethers_contract::{Contract, ContractError};
use ethers_core::abi::Abi;
use std::sync::Arc;

/// Contract ABI, compiled in.
pub const DOCUMENT_REGISTRY_ABI: &[u8] = include_bytes!("abi/DocumentRegistry.json");

/// A `Document` struct exactly as the contract returns it.
pub type RawDocument = (String, String, String, Address, U256);

/// Typed wrapper over the registry contract.
///
/// # Type Parameters
/// * `M` - Middleware: a bare provider for reads, a signer middleware for writes
pub struct DocumentRegistry<M> {
    contract: Contract<M>,
}

impl<M> DocumentRegistry<M>
where
    M: Middleware + 'static,
{
    /// Binds the registry ABI to `address` through `client`.
    pub fn new(address: Address, client: Arc<M>) -> Result<Self, LedgerError> {
        let abi = Abi::load(DOCUMENT_REGISTRY_ABI)
            .map_err(|e| LedgerError::Misconfigured(format!("registry abi: {}", e)))?;
        Ok(Self {
            contract: Contract::new(address, abi, client),
        })
    }

    pub fn address(&self) -> Address {
        self.contract.address()
    }

    /// Sends `issueDocument` and waits for the inclusion receipt.
    pub async fn issue_document(
        &self,
        subject_id: &str,
        document_name: &str,
        content_address: &str,
        fingerprint: &str,
    ) -> Result<TransactionReceipt, LedgerError> {
        let call = self
            .contract
            .method::<_, ()>(
                "issueDocument",
                (
                    subject_id.to_string(),
                    document_name.to_string(),
                    content_address.to_string(),
                    fingerprint.to_string(),
                ),
            )
            .map_err(|e| LedgerError::Misconfigured(e.to_string()))?;

        let pending = call.send().await.map_err(contract_error)?;
        let tx_hash = pending.tx_hash();
        pending
            .await
            .map_err(|e| LedgerError::Transaction(e.to_string()))?
            .ok_or_else(|| LedgerError::Dropped(format!("{:?}", tx_hash)))
    }

    /// Calls the `getDocuments` view for `subject_id`.
    pub async fn get_documents(&self, subject_id: &str) -> Result<Vec<RawDocument>, LedgerError> {
        self.contract
            .method::<_, Vec<RawDocument>>("getDocuments", subject_id.to_string())
            .map_err(|e| LedgerError::Misconfigured(e.to_string()))?
            .call()
            .await
            .map_err(contract_error)
    }
}

/// Sorts contract failures into the ledger error taxonomy.
fn contract_error<M: Middleware>(err: ContractError<M>) -> LedgerError {
    match err {
        ContractError::DecodingError(e) => LedgerError::Decode(e.to_string()),
        ContractError::DetokenizationError(e) => LedgerError::Decode(e.to_string()),
        ContractError::AbiError(e) => LedgerError::Decode(e.to_string()),
        ContractError::Revert(data) => LedgerError::Transaction(format!("reverted: {}", data)),
        other => LedgerError::Unreachable(other.to_string()),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use ethers::providers::{Http, Provider};

    #[test]
    fn abi_exposes_registry_functions() {
        let abi = Abi::load(DOCUMENT_REGISTRY_ABI).unwrap();
        assert_eq!(abi.function("issueDocument").unwrap().inputs.len(), 4);
        assert_eq!(abi.function("getDocuments").unwrap().outputs.len(), 1);
    }

    #[test]
    fn binds_to_the_given_address() {
        let provider = Arc::new(Provider::<Http>::try_from("http://127.0.0.1:8545").unwrap());
        let address: Address = "0x5FbDB2315678afecb367f032d93F642f64180aa3".parse().unwrap();
        let registry = DocumentRegistry::new(address, provider).unwrap();
        assert_eq!(registry.address(), address);
    }
}
