//! atxmon-query
//!
//! Namespace-scoped lookups against a log-indexing backend.
//!
//! This crate owns the log record model, the backend abstraction and the
//! concrete backends (Elasticsearch over HTTP, in-memory for tests/replays).
//! It knows nothing about layers or epochs; callers (atxmon-monitor) express
//! domain questions as field-equality filters.

mod client;
pub mod backend;
pub mod elasticsearch;
pub mod error;
pub mod memory;
pub mod record;
pub mod timestamp;

pub use backend::{LogBackend, SearchRequest, SortOrder};
pub use client::QueryClient;
pub use elasticsearch::{BasicAuth, ElasticsearchBackend, ElasticsearchOptions};
pub use error::{BackendError, QueryError};
pub use memory::InMemoryBackend;
pub use record::{FieldValue, Fields, LogRecord, NAMESPACE_FIELD};
pub use timestamp::{format_log_timestamp, parse_log_timestamp, TimestampError};
