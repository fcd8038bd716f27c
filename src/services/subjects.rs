// src/services/subjects.rs
//! Candidate subjects for content-address verification.
//!
//! The ledger is indexed by subject, so resolving a bare content address means
//! scanning a set of subjects. Where that set comes from is pluggable.

use std::collections::HashSet;
use std::sync::Arc;

/// Supplies the subject ids to scan, in scan order.
pub trait SubjectSource: Send + Sync {
    fn subjects(&self) -> Vec<String>;
}

/// A fixed list, typically from configuration.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct KnownSubjects(Vec<String>);

impl KnownSubjects {
    pub fn new<I, S>(subjects: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self(
            subjects
                .into_iter()
                .map(Into::into)
                .map(|s: String| s.trim().to_string())
                .filter(|s| !s.is_empty())
                .collect(),
        )
    }
}

impl SubjectSource for KnownSubjects {
    fn subjects(&self) -> Vec<String> {
        self.0.clone()
    }
}

impl<T: SubjectSource + ?Sized> SubjectSource for Arc<T> {
    fn subjects(&self) -> Vec<String> {
        (**self).subjects()
    }
}

/// Concatenates several sources, dropping repeats while keeping first-seen order.
#[derive(Default)]
pub struct ChainedSubjects {
    sources: Vec<Arc<dyn SubjectSource>>,
}

impl ChainedSubjects {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with(mut self, source: Arc<dyn SubjectSource>) -> Self {
        self.sources.push(source);
        self
    }
}

impl SubjectSource for ChainedSubjects {
    fn subjects(&self) -> Vec<String> {
        let mut seen = HashSet::new();
        self.sources
            .iter()
            .flat_map(|source| source.subjects())
            .filter(|subject| seen.insert(subject.clone()))
            .collect()
    }
}
