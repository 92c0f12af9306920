//! Parsed filter cache.
//!
//! Endpoints receive the same filter strings over and over. [`FilterCache`]
//! keeps parsed trees keyed by their source text so each distinct filter is
//! parsed once and then bound per request.

use std::collections::HashMap;
use std::sync::Arc;

use parking_lot::RwLock;
use tracing::debug;

use crate::ast::FilterAst;
use crate::error::ParseResult;
use crate::parser::{ParseOptions, parse_filter_with};

/// Default number of cached filters.
pub const DEFAULT_CACHE_CAPACITY: usize = 1024;

/// Bounded, thread-safe cache of parsed filters.
///
/// When the cache is full it is cleared before the next insert. Failed
/// parses are not cached.
#[derive(Debug)]
pub struct FilterCache {
    entries: RwLock<HashMap<String, Arc<FilterAst>>>,
    capacity: usize,
    options: ParseOptions,
}

impl Default for FilterCache {
    fn default() -> Self {
        Self::new(DEFAULT_CACHE_CAPACITY)
    }
}

impl FilterCache {
    /// Creates a cache holding up to `capacity` filters.
    pub fn new(capacity: usize) -> Self {
        Self::with_options(capacity, ParseOptions::default())
    }

    /// Creates a cache that parses with explicit limits.
    pub fn with_options(capacity: usize, options: ParseOptions) -> Self {
        Self {
            entries: RwLock::new(HashMap::new()),
            capacity: capacity.max(1),
            options,
        }
    }

    /// Returns the cached tree for `input`, parsing it on a miss.
    pub fn get_or_parse(&self, input: &str) -> ParseResult<Arc<FilterAst>> {
        if let Some(ast) = self.entries.read().get(input) {
            return Ok(Arc::clone(ast));
        }

        let ast = Arc::new(parse_filter_with(input, &self.options)?);

        let mut entries = self.entries.write();
        if entries.len() >= self.capacity && !entries.contains_key(input) {
            debug!(capacity = self.capacity, "filter cache full, clearing");
            entries.clear();
        }
        let cached = entries
            .entry(input.to_string())
            .or_insert_with(|| Arc::clone(&ast));
        Ok(Arc::clone(cached))
    }

    /// Number of cached filters.
    pub fn len(&self) -> usize {
        self.entries.read().len()
    }

    /// Returns true if nothing is cached.
    pub fn is_empty(&self) -> bool {
        self.entries.read().is_empty()
    }

    /// Drops every cached filter.
    pub fn clear(&self) {
        self.entries.write().clear();
    }
}
