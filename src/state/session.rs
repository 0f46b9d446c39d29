use crate::record::Record;
use std::sync::atomic::{AtomicU32, AtomicUsize, Ordering};
use std::sync::{Mutex, PoisonError};

/// Mutable state of one search invocation
///
/// Shared between the page tasks of a single search through an `Arc`. Record
/// appends are serialized by a mutex; the item counter and page count are
/// atomics. Nothing here is global, so independent searches never observe each
/// other's records.
#[derive(Debug)]
pub struct SearchSession {
    term: String,
    records: Mutex<Vec<Record>>,
    item_counter: AtomicUsize,
    page_count: AtomicU32,
}

impl SearchSession {
    /// Creates an empty session for `term`
    pub fn new(term: impl Into<String>) -> Self {
        Self {
            term: term.into(),
            records: Mutex::new(Vec::new()),
            item_counter: AtomicUsize::new(0),
            page_count: AtomicU32::new(0),
        }
    }

    pub fn term(&self) -> &str {
        &self.term
    }

    /// Claims the next item number (1-based) for progress logging
    pub fn next_item_number(&self) -> usize {
        self.item_counter.fetch_add(1, Ordering::Relaxed) + 1
    }

    /// Number of items claimed so far
    pub fn items_seen(&self) -> usize {
        self.item_counter.load(Ordering::Relaxed)
    }

    /// Appends a finished record
    pub fn append(&self, record: Record) {
        self.records
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .push(record);
    }

    /// Number of records gathered so far
    pub fn record_count(&self) -> usize {
        self.records
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .len()
    }

    /// Takes every gathered record out of the session, leaving it empty
    pub fn take_records(&self) -> Vec<Record> {
        std::mem::take(&mut *self.records.lock().unwrap_or_else(PoisonError::into_inner))
    }

    pub fn set_page_count(&self, count: u32) {
        self.page_count.store(count, Ordering::Relaxed);
    }

    /// Resolved page count, 0 until the first page has been planned
    pub fn page_count(&self) -> u32 {
        self.page_count.load(Ordering::Relaxed)
    }
}
