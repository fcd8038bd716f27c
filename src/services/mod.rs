// src/services/mod.rs
//! Anchoring and verification services, plus the HTTP surface over them.

pub mod anchoring;
pub mod api_server;
pub mod organization;
pub mod subjects;
pub mod verifier;

pub use anchoring::AnchoringService;
pub use api_server::ApiServer;
pub use organization::{OrganizationClassifier, OrganizationRule};
pub use subjects::{ChainedSubjects, KnownSubjects, SubjectSource};
pub use verifier::{Verdict, VerificationFailure, VerifiedDocument, Verifier};
