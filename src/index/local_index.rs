// src/index/local_index.rs
//! Ordered, searchable cache of anchored records.
//!
//! Entries are prepended on every successful anchor, never mutated and never
//! removed. Appends write the backing store first and then swap the in-memory
//! list under the write lock, so readers see either the old list or the new
//! one.

use crate::index::{IndexError, IndexStore, MemoryIndexStore, SortOrder};
use crate::models::proof::{Locators, ProofDocument};
use crate::models::record::LocalIndexEntry;
use crate::services::subjects::SubjectSource;
use log::debug;
use std::collections::HashSet;
use std::sync::{PoisonError, RwLock};

pub struct LocalIndex {
    entries: RwLock<Vec<LocalIndexEntry>>,
    store: Box<dyn IndexStore>,
    locators: Locators,
}

impl LocalIndex {
    /// Opens an index over `store`, loading whatever it already holds.
    pub fn open(store: Box<dyn IndexStore>, locators: Locators) -> Result<Self, IndexError> {
        let entries = store.load()?;
        debug!("local index loaded {} entries", entries.len());
        Ok(Self {
            entries: RwLock::new(entries),
            store,
            locators,
        })
    }

    /// A volatile index with default locators.
    pub fn in_memory() -> Self {
        Self {
            entries: RwLock::new(Vec::new()),
            store: Box::new(MemoryIndexStore::new()),
            locators: Locators::default(),
        }
    }

    /// Prepends `entry`; on a store failure the visible list is unchanged.
    pub fn append(&self, entry: LocalIndexEntry) -> Result<(), IndexError> {
        let mut entries = self.entries.write().unwrap_or_else(PoisonError::into_inner);
        let mut next = Vec::with_capacity(entries.len() + 1);
        next.push(entry);
        next.extend(entries.iter().cloned());
        self.store.save(&next)?;
        *entries = next;
        Ok(())
    }

    /// All entries in index order (most recently anchored first).
    pub fn list(&self) -> Vec<LocalIndexEntry> {
        self.entries.read().unwrap_or_else(PoisonError::into_inner).clone()
    }

    pub fn len(&self) -> usize {
        self.entries.read().unwrap_or_else(PoisonError::into_inner).len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Entries whose document name, subject id or organization contains
    /// `query`, ignoring case. An empty query matches everything.
    pub fn search(&self, query: &str) -> Vec<LocalIndexEntry> {
        let needle = query.trim().to_lowercase();
        self.entries
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .iter()
            .filter(|entry| matches_query(entry, &needle))
            .cloned()
            .collect()
    }

    /// All entries ordered by issuance time; ties keep index order.
    pub fn sort(&self, order: SortOrder) -> Vec<LocalIndexEntry> {
        let mut entries = self.list();
        sort_entries(&mut entries, order);
        entries
    }

    /// Search then sort, as the issued-documents listing shows them.
    pub fn query(&self, query: Option<&str>, order: SortOrder) -> Vec<LocalIndexEntry> {
        let mut entries = match query {
            Some(q) => self.search(q),
            None => self.list(),
        };
        sort_entries(&mut entries, order);
        entries
    }

    pub fn find_by_transaction(&self, transaction_hash: &str) -> Option<LocalIndexEntry> {
        self.entries
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .iter()
            .find(|e| e.record.receipt.transaction_hash.eq_ignore_ascii_case(transaction_hash))
            .cloned()
    }

    pub fn find_by_content_address(&self, content_address: &str) -> Option<LocalIndexEntry> {
        self.entries
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .iter()
            .find(|e| e.record.content_address == content_address)
            .cloned()
    }

    /// Self-contained proof for `entry`, with gateway and explorer links.
    pub fn export_proof(&self, entry: &LocalIndexEntry) -> ProofDocument {
        ProofDocument::from_entry(entry, &self.locators)
    }

    pub fn locators(&self) -> &Locators {
        &self.locators
    }
}

impl SubjectSource for LocalIndex {
    /// Distinct subject ids, in order of first appearance.
    fn subjects(&self) -> Vec<String> {
        let entries = self.entries.read().unwrap_or_else(PoisonError::into_inner);
        let mut seen = HashSet::new();
        entries
            .iter()
            .filter(|e| seen.insert(e.record.subject_id.as_str()))
            .map(|e| e.record.subject_id.clone())
            .collect()
    }
}

fn matches_query(entry: &LocalIndexEntry, needle: &str) -> bool {
    needle.is_empty()
        || entry.record.document_name.to_lowercase().contains(needle)
        || entry.record.subject_id.to_lowercase().contains(needle)
        || entry.organization.to_lowercase().contains(needle)
}

fn sort_entries(entries: &mut [LocalIndexEntry], order: SortOrder) {
    match order {
        SortOrder::Newest => entries.sort_by(|a, b| b.record.issued_at.cmp(&a.record.issued_at)),
        SortOrder::Oldest => entries.sort_by(|a, b| a.record.issued_at.cmp(&b.record.issued_at)),
    }
}
