// src/index/mod.rs
//! Local index of anchored records.
//!
//! A process-local, non-authoritative mirror of the records this process has
//! anchored, used for the issued-documents listing, search, sort and proof
//! export. The ledger stays the source of truth: the index may miss records
//! anchored elsewhere and is never required for verification.

pub mod local_index;
pub mod store;

pub use local_index::LocalIndex;
pub use store::{IndexStore, JsonFileStore, MemoryIndexStore};

use serde::{Deserialize, Serialize};
use std::str::FromStr;
use thiserror::Error;

/// Failure reading or writing the index's backing store.
#[derive(Debug, Error)]
pub enum IndexError {
    #[error("index store I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("index store is corrupt: {0}")]
    Corrupt(#[from] serde_json::Error),
}

/// Presentation order by issuance time.
#[derive(Serialize, Deserialize, Debug, Clone, Copy, PartialEq, Eq, Default)]
#[serde(rename_all = "lowercase")]
pub enum SortOrder {
    /// Most recent first
    #[default]
    Newest,
    /// Oldest first
    Oldest,
}

impl FromStr for SortOrder {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "newest" => Ok(SortOrder::Newest),
            "oldest" => Ok(SortOrder::Oldest),
            other => Err(format!("unknown sort order '{}', expected newest or oldest", other)),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_sort_orders() {
        assert_eq!("newest".parse::<SortOrder>(), Ok(SortOrder::Newest));
        assert_eq!(" Oldest ".parse::<SortOrder>(), Ok(SortOrder::Oldest));
        assert!("sideways".parse::<SortOrder>().is_err());
        assert_eq!(SortOrder::default(), SortOrder::Newest);
    }
}
