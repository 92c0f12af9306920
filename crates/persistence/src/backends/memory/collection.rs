//! In-memory document collection.

use serde_json::Value;
use tracing::debug;

use super::{DocumentMatcher, MatchError};

/// A list of JSON documents queried with MongoDB-style filter documents.
#[derive(Debug, Clone, Default)]
pub struct MemoryCollection {
    documents: Vec<Value>,
}

impl MemoryCollection {
    /// Creates an empty collection.
    pub fn new() -> Self {
        Self::default()
    }

    /// Appends a document.
    pub fn insert(&mut self, document: Value) {
        self.documents.push(document);
    }

    /// Number of documents.
    pub fn len(&self) -> usize {
        self.documents.len()
    }

    /// Returns true if the collection holds no documents.
    pub fn is_empty(&self) -> bool {
        self.documents.is_empty()
    }

    /// All documents, in insertion order.
    pub fn documents(&self) -> &[Value] {
        &self.documents
    }

    /// Documents matching the filter, in insertion order.
    pub fn find(&self, filter: &Value) -> Result<Vec<&Value>, MatchError> {
        let matcher = DocumentMatcher::new(filter)?;
        let found: Vec<&Value> = self
            .documents
            .iter()
            .filter(|doc| matcher.matches(doc))
            .collect();
        debug!(matched = found.len(), total = self.documents.len(), "find");
        Ok(found)
    }

    /// Number of documents matching the filter.
    pub fn count(&self, filter: &Value) -> Result<usize, MatchError> {
        let matcher = DocumentMatcher::new(filter)?;
        Ok(self.documents.iter().filter(|doc| matcher.matches(doc)).count())
    }

    /// Removes the documents matching the filter and returns how many were removed.
    pub fn delete_many(&mut self, filter: &Value) -> Result<usize, MatchError> {
        let matcher = DocumentMatcher::new(filter)?;
        let before = self.documents.len();
        self.documents.retain(|doc| !matcher.matches(doc));
        let deleted = before - self.documents.len();
        debug!(deleted, "delete_many");
        Ok(deleted)
    }
}

impl FromIterator<Value> for MemoryCollection {
    fn from_iter<T: IntoIterator<Item = Value>>(iter: T) -> Self {
        Self {
            documents: iter.into_iter().collect(),
        }
    }
}
