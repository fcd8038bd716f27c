// src/models/record.rs
//! Anchoring record data model.
//!
//! An [`AnchorRecord`] binds a subject identifier and a document name to the
//! content address of the uploaded payload and its locally computed
//! fingerprint. Records are immutable once issued: there is no update or delete,
//! a correction is a new record.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Ledger-specific proof of inclusion for an issued record.
///
/// Opaque beyond being displayable and linkable to a ledger explorer.
#[derive(Serialize, Deserialize, Debug, Clone, PartialEq, Eq)]
pub struct LedgerReceipt {
    /// Transaction (record) identifier, e.g. `0x5c50…`
    pub transaction_hash: String,
    /// Block / sequence number the record was included in
    pub block_number: u64,
}

/// What the ledger hands back after a successful issuance.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct IssueOutcome {
    pub receipt: LedgerReceipt,
    /// Account that signed the issuance, as reported by the ledger
    pub issuer: Option<String>,
    /// Ledger-assigned issuance time (block time, not the local clock)
    pub issued_at: DateTime<Utc>,
}

/// A record as returned by a ledger query for one subject.
#[derive(Serialize, Deserialize, Debug, Clone, PartialEq, Eq)]
pub struct LedgerRecord {
    pub document_name: String,
    pub content_address: String,
    /// Older registries did not store a fingerprint
    pub fingerprint: Option<String>,
    pub issuer: Option<String>,
    pub issued_at: DateTime<Utc>,
}

/// The durable unit of truth produced by a successful anchor.
#[derive(Serialize, Deserialize, Debug, Clone, PartialEq, Eq)]
pub struct AnchorRecord {
    /// Caller-supplied identifier (e.g. a national ID); never format-checked
    pub subject_id: String,

    /// Human label, e.g. "10th Certificate"
    pub document_name: String,

    /// Address returned by the blob store for the uploaded payload
    pub content_address: String,

    /// Hex SHA-256 of the uploaded payload
    pub fingerprint: String,

    /// Populated by the ledger at issuance time
    pub issuer: Option<String>,

    /// Authoritative issuance time from the ledger
    pub issued_at: DateTime<Utc>,

    pub receipt: LedgerReceipt,
}

impl AnchorRecord {
    /// Assembles a record from the request fields and the ledger's answer.
    pub fn from_issue(
        subject_id: impl Into<String>,
        document_name: impl Into<String>,
        content_address: impl Into<String>,
        fingerprint: impl Into<String>,
        outcome: IssueOutcome,
    ) -> Self {
        Self {
            subject_id: subject_id.into(),
            document_name: document_name.into(),
            content_address: content_address.into(),
            fingerprint: fingerprint.into(),
            issuer: outcome.issuer,
            issued_at: outcome.issued_at,
            receipt: outcome.receipt,
        }
    }
}

/// A record mirrored into the local index, with its computed organization.
#[derive(Serialize, Deserialize, Debug, Clone, PartialEq, Eq)]
pub struct LocalIndexEntry {
    #[serde(flatten)]
    pub record: AnchorRecord,
    pub organization: String,
}

impl LocalIndexEntry {
    pub fn new(record: AnchorRecord, organization: impl Into<String>) -> Self {
        Self {
            record,
            organization: organization.into(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    fn outcome() -> IssueOutcome {
        IssueOutcome {
            receipt: LedgerReceipt {
                transaction_hash: "0xabc".into(),
                block_number: 42,
            },
            issuer: Some("0x00000000000000000000000000000000000000aa".into()),
            issued_at: Utc.with_ymd_and_hms(2025, 3, 1, 10, 0, 0).unwrap(),
        }
    }

    #[test]
    fn record_takes_time_and_issuer_from_ledger() {
        let record = AnchorRecord::from_issue("S1", "10th Certificate", "QmCid", "ff", outcome());
        assert_eq!(record.receipt.block_number, 42);
        assert_eq!(record.issued_at, Utc.with_ymd_and_hms(2025, 3, 1, 10, 0, 0).unwrap());
        assert!(record.issuer.is_some());
    }

    #[test]
    fn index_entry_serializes_flat() {
        let record = AnchorRecord::from_issue("S1", "CBSE Result", "QmCid", "ff", outcome());
        let entry = LocalIndexEntry::new(record, "Central Board of Secondary Education");
        let value = serde_json::to_value(&entry).unwrap();
        assert_eq!(value["subject_id"], "S1");
        assert_eq!(value["organization"], "Central Board of Secondary Education");
        assert_eq!(value["receipt"]["transaction_hash"], "0xabc");

        let back: LocalIndexEntry = serde_json::from_value(value).unwrap();
        assert_eq!(back, entry);
    }
}
