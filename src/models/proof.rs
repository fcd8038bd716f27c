// src/models/proof.rs
//! Exportable anchoring proof.
//!
//! A [`ProofDocument`] is a flat key/value JSON document that carries everything
//! a third party needs to re-verify an anchored document without this
//! software: the identifiers, the content address and fingerprint, the ledger
//! receipt, and direct links to the blob gateway and the ledger explorer.
//!
//! Field names are stable. They are read by humans and re-imported, so the
//! legacy names (`IPFS_CID`, `IPFS_Link`, `Blockchain_Link`, `SubjectId`) are
//! accepted on import as aliases.

use crate::models::record::LocalIndexEntry;
use crate::utils::serialization::{deserialize, serialize_pretty};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Default blob gateway used for content links and QR payloads.
pub const DEFAULT_GATEWAY_URL: &str = "https://gateway.pinata.cloud";

/// Default ledger explorer used for receipt links.
pub const DEFAULT_EXPLORER_URL: &str = "https://sepolia.etherscan.io";

/// Builds the human-facing links for content addresses and receipts.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Locators {
    gateway_url: String,
    explorer_url: String,
}

impl Locators {
    pub fn new(gateway_url: impl Into<String>, explorer_url: impl Into<String>) -> Self {
        Self {
            gateway_url: gateway_url.into().trim_end_matches('/').to_string(),
            explorer_url: explorer_url.into().trim_end_matches('/').to_string(),
        }
    }

    /// Gateway URI for a content address; this is also the QR payload.
    pub fn content_link(&self, content_address: &str) -> String {
        format!("{}/ipfs/{}", self.gateway_url, content_address)
    }

    /// Explorer URI for a ledger transaction.
    pub fn ledger_link(&self, transaction_hash: &str) -> String {
        format!("{}/tx/{}", self.explorer_url, transaction_hash)
    }
}

impl Default for Locators {
    fn default() -> Self {
        Self::new(DEFAULT_GATEWAY_URL, DEFAULT_EXPLORER_URL)
    }
}

/// Self-contained proof for one anchored document.
#[derive(Serialize, Deserialize, Debug, Clone, PartialEq, Eq)]
pub struct ProofDocument {
    #[serde(rename = "Aadhaar", alias = "SubjectId")]
    pub subject_id: String,

    #[serde(rename = "Document_Name")]
    pub document_name: String,

    #[serde(rename = "Organization")]
    pub organization: String,

    #[serde(rename = "Content_Address", alias = "IPFS_CID")]
    pub content_address: String,

    #[serde(rename = "File_Hash")]
    pub fingerprint: String,

    #[serde(rename = "Transaction_Hash")]
    pub transaction_hash: String,

    #[serde(rename = "Block_Number")]
    pub block_number: u64,

    #[serde(rename = "Timestamp")]
    pub timestamp: DateTime<Utc>,

    #[serde(rename = "Content_Link", alias = "IPFS_Link")]
    pub content_link: String,

    #[serde(rename = "Ledger_Link", alias = "Blockchain_Link")]
    pub ledger_link: String,
}

impl ProofDocument {
    /// Builds a proof from an index entry, resolving links with `locators`.
    pub fn from_entry(entry: &LocalIndexEntry, locators: &Locators) -> Self {
        let record = &entry.record;
        Self {
            subject_id: record.subject_id.clone(),
            document_name: record.document_name.clone(),
            organization: entry.organization.clone(),
            content_address: record.content_address.clone(),
            fingerprint: record.fingerprint.clone(),
            transaction_hash: record.receipt.transaction_hash.clone(),
            block_number: record.receipt.block_number,
            timestamp: record.issued_at,
            content_link: locators.content_link(&record.content_address),
            ledger_link: locators.ledger_link(&record.receipt.transaction_hash),
        }
    }

    /// Suggested download name: whitespace runs in the document name become `_`.
    pub fn file_name(&self) -> String {
        let stem = self
            .document_name
            .split_whitespace()
            .collect::<Vec<_>>()
            .join("_");
        format!("{}_proof.json", stem)
    }

    /// Indented JSON rendering of the proof.
    pub fn to_json(&self) -> Result<String, serde_json::Error> {
        serialize_pretty(self)
    }

    /// Parses a previously exported proof.
    pub fn from_json(json: &str) -> Result<Self, serde_json::Error> {
        deserialize(json)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::record::{AnchorRecord, IssueOutcome, LedgerReceipt};
    use chrono::TimeZone;

    fn entry() -> LocalIndexEntry {
        let record = AnchorRecord::from_issue(
            "123456789012",
            "MZU  Final Transcript",
            "QmYwAPJzv5CZsnA625s3Xf2nemtYgPpHdWEz79ojWnPbdG",
            "9f86d081884c7d659a2feaa0c55ad015a3bf4f1b2b0b822cd15d6c15b0f00a08",
            IssueOutcome {
                receipt: LedgerReceipt {
                    transaction_hash: "0xfeed".into(),
                    block_number: 7,
                },
                issuer: None,
                issued_at: Utc.with_ymd_and_hms(2025, 1, 2, 3, 4, 5).unwrap(),
            },
        );
        LocalIndexEntry::new(record, "Mizoram University")
    }

    #[test]
    fn proof_uses_stable_field_names() {
        let proof = ProofDocument::from_entry(&entry(), &Locators::default());
        let value: serde_json::Value = serde_json::from_str(&proof.to_json().unwrap()).unwrap();
        let object = value.as_object().unwrap();
        for key in [
            "Aadhaar",
            "Document_Name",
            "Organization",
            "Content_Address",
            "File_Hash",
            "Transaction_Hash",
            "Block_Number",
            "Timestamp",
            "Content_Link",
            "Ledger_Link",
        ] {
            assert!(object.contains_key(key), "missing {}", key);
        }
        assert_eq!(object.len(), 10);
        assert_eq!(
            value["Content_Link"],
            "https://gateway.pinata.cloud/ipfs/QmYwAPJzv5CZsnA625s3Xf2nemtYgPpHdWEz79ojWnPbdG"
        );
        assert_eq!(value["Ledger_Link"], "https://sepolia.etherscan.io/tx/0xfeed");
    }

    #[test]
    fn exported_proof_imports_back() {
        let proof = ProofDocument::from_entry(&entry(), &Locators::default());
        let parsed = ProofDocument::from_json(&proof.to_json().unwrap()).unwrap();
        assert_eq!(parsed, proof);
    }

    #[test]
    fn legacy_field_names_are_accepted() {
        let legacy = r#"{
            "Aadhaar": "AYUB123",
            "Document_Name": "CBSE Result",
            "Organization": "Central Board of Secondary Education",
            "IPFS_CID": "QmCid",
            "File_Hash": "ab",
            "Transaction_Hash": "0x01",
            "Block_Number": 9,
            "Timestamp": "2025-01-02T03:04:05Z",
            "IPFS_Link": "https://gateway.pinata.cloud/ipfs/QmCid",
            "Blockchain_Link": "https://sepolia.etherscan.io/tx/0x01"
        }"#;
        let proof = ProofDocument::from_json(legacy).unwrap();
        assert_eq!(proof.content_address, "QmCid");
        assert_eq!(proof.ledger_link, "https://sepolia.etherscan.io/tx/0x01");
    }

    #[test]
    fn file_name_collapses_whitespace() {
        let proof = ProofDocument::from_entry(&entry(), &Locators::default());
        assert_eq!(proof.file_name(), "MZU_Final_Transcript_proof.json");
    }

    #[test]
    fn locators_trim_trailing_slashes() {
        let locators = Locators::new("http://localhost:8080/", "https://explorer.test/");
        assert_eq!(locators.content_link("bafy"), "http://localhost:8080/ipfs/bafy");
        assert_eq!(locators.ledger_link("0x1"), "https://explorer.test/tx/0x1");
    }
}
