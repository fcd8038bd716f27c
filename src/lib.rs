// src/lib.rs
//! # Credential Anchoring & Verification Engine
//!
//! Anchors a credential document by uploading it to a content-addressable
//! blob store and recording its content address and SHA-256 fingerprint on a
//! ledger under a subject identifier. Anyone holding the subject id and name,
//! the gateway link from a QR code, the document bytes or an exported proof can
//! later check it against the ledger.
//!
//! ## Layout
//! 1. **Storage Layer** (`storage`): blob store adapters (pinning service, IPFS node, memory)
//! 2. **Blockchain Layer** (`blockchain`, `contracts`): ledger adapters over the Document Registry
//! 3. **Services Layer** (`services`): anchoring, verification and the HTTP API
//! 4. **Index** (`index`): local, searchable mirror of issued records

pub mod blockchain;
pub mod config;
pub mod contracts;
pub mod error;
pub mod index;
pub mod models;
pub mod services;
pub mod storage;
pub mod utils;

pub use error::{AnchorError, ValidationError};
pub use services::{AnchoringService, Verdict, Verifier};
