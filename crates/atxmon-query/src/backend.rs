//! Backend boundary for log lookups.
//!
//! This module defines **only** the request type and the backend trait.
//! Concrete backends live in `elasticsearch.rs` and `memory.rs`.

use crate::error::QueryError;
use crate::record::{Fields, LogRecord};

/// Sort direction on the `T` field.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SortOrder {
    Ascending,
    Descending,
}

impl SortOrder {
    pub fn as_str(&self) -> &'static str {
        match self {
            SortOrder::Ascending => "asc",
            SortOrder::Descending => "desc",
        }
    }
}

/// A namespace- and field-scoped lookup against one index.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SearchRequest {
    /// Index name (or pattern) resolved by the backend.
    pub index: String,
    pub namespace: String,
    pub fields: Fields,
}

/// Log-indexing backend contract.
///
/// All three operations apply the same matching rule: the record's namespace
/// equals `req.namespace` AND every predicate in `req.fields` holds.
///
/// Object-safe so callers can hold a `Box<dyn LogBackend>`.
#[async_trait::async_trait]
pub trait LogBackend: Send + Sync {
    /// Human-readable backend name (e.g. `"elasticsearch"`).
    fn name(&self) -> &'static str;

    /// At most `limit` matching records, sorted on `T` in `order`.
    async fn search_sorted(
        &self,
        req: &SearchRequest,
        order: SortOrder,
        limit: usize,
    ) -> Result<Vec<LogRecord>, QueryError>;

    /// Every matching record. Paging is the backend's concern; no truncation.
    ///
    /// Order is unspecified.
    async fn scan(&self, req: &SearchRequest) -> Result<Vec<LogRecord>, QueryError>;

    /// Number of matching records.
    async fn count(&self, req: &SearchRequest) -> Result<u64, QueryError>;
}
