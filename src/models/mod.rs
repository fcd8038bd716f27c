// src/models/mod.rs
//! Data structures.

pub mod proof;
pub mod record;

pub use proof::{Locators, ProofDocument};
pub use record::{AnchorRecord, IssueOutcome, LedgerReceipt, LedgerRecord, LocalIndexEntry};
