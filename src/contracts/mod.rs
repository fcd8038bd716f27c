// src/contracts/mod.rs
//! Smart contract bindings.

pub mod document_registry;

pub use document_registry::{DocumentRegistry, RawDocument};
