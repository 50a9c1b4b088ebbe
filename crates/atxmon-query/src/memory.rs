//! In-memory [`LogBackend`] with the same matching rules as Elasticsearch.
//!
//! Used by tests and for replaying exported log dumps. `scan` deliberately
//! returns records in insertion order so callers cannot rely on backend
//! ordering.

use std::cmp::Ordering;

use crate::backend::{LogBackend, SearchRequest, SortOrder};
use crate::error::QueryError;
use crate::record::LogRecord;

#[derive(Debug, Clone, Default)]
pub struct InMemoryBackend {
    records: Vec<LogRecord>,
}

impl InMemoryBackend {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn from_records(records: Vec<LogRecord>) -> Self {
        Self { records }
    }

    pub fn push(&mut self, record: LogRecord) {
        self.records.push(record);
    }

    pub fn len(&self) -> usize {
        self.records.len()
    }

    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }

    fn matching<'a>(&'a self, req: &'a SearchRequest) -> impl Iterator<Item = &'a LogRecord> + 'a {
        self.records
            .iter()
            .filter(move |r| r.matches(&req.namespace, &req.fields))
    }
}

/// Order two records on `T` the way the backend's date sort would.
///
/// Unparseable timestamps sort first, then by raw string for determinism.
pub(crate) fn cmp_by_timestamp(a: &LogRecord, b: &LogRecord) -> Ordering {
    a.instant()
        .ok()
        .cmp(&b.instant().ok())
        .then_with(|| a.timestamp.cmp(&b.timestamp))
}

#[async_trait::async_trait]
impl LogBackend for InMemoryBackend {
    fn name(&self) -> &'static str {
        "memory"
    }

    async fn search_sorted(
        &self,
        req: &SearchRequest,
        order: SortOrder,
        limit: usize,
    ) -> Result<Vec<LogRecord>, QueryError> {
        let mut hits: Vec<LogRecord> = self.matching(req).cloned().collect();
        hits.sort_by(cmp_by_timestamp);
        if order == SortOrder::Descending {
            hits.reverse();
        }
        hits.truncate(limit);
        Ok(hits)
    }

    async fn scan(&self, req: &SearchRequest) -> Result<Vec<LogRecord>, QueryError> {
        Ok(self.matching(req).cloned().collect())
    }

    async fn count(&self, req: &SearchRequest) -> Result<u64, QueryError> {
        Ok(self.matching(req).count() as u64)
    }
}
