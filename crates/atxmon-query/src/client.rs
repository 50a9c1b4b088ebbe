use tracing::debug;

use crate::backend::{LogBackend, SearchRequest, SortOrder};
use crate::error::QueryError;
use crate::memory::cmp_by_timestamp;
use crate::record::{Fields, LogRecord};

/// Executes namespace- and field-scoped lookups against one index.
///
/// The index name is fixed at construction; the client never derives it from
/// the wall clock.
pub struct QueryClient {
    backend: Box<dyn LogBackend>,
    index: String,
    namespace: String,
}

impl QueryClient {
    pub fn new(backend: Box<dyn LogBackend>, index: String, namespace: String) -> Self {
        Self {
            backend,
            index,
            namespace,
        }
    }

    pub fn index(&self) -> &str {
        &self.index
    }

    pub fn namespace(&self) -> &str {
        &self.namespace
    }

    pub fn backend_name(&self) -> &'static str {
        self.backend.name()
    }

    fn request(&self, fields: &Fields) -> SearchRequest {
        SearchRequest {
            index: self.index.clone(),
            namespace: self.namespace.clone(),
            fields: fields.clone(),
        }
    }

    fn not_found(&self, fields: &Fields) -> QueryError {
        QueryError::NotFound {
            namespace: self.namespace.clone(),
            fields: fields.clone(),
        }
    }

    async fn find_one(&self, fields: &Fields, order: SortOrder) -> Result<Option<LogRecord>, QueryError> {
        let req = self.request(fields);
        let hits = self.backend.search_sorted(&req, order, 1).await?;
        debug!(
            backend = self.backend.name(),
            index = %self.index,
            namespace = %self.namespace,
            filter = %fields,
            order = order.as_str(),
            found = !hits.is_empty(),
            "single-record lookup"
        );
        Ok(hits.into_iter().next())
    }

    /// Matching record with the greatest `T`, if any.
    pub async fn find_latest(&self, fields: &Fields) -> Result<Option<LogRecord>, QueryError> {
        self.find_one(fields, SortOrder::Descending).await
    }

    /// Matching record with the smallest `T`, if any.
    pub async fn find_first(&self, fields: &Fields) -> Result<Option<LogRecord>, QueryError> {
        self.find_one(fields, SortOrder::Ascending).await
    }

    /// Matching record with the greatest `T`; `NotFound` when nothing matches.
    pub async fn get_latest(&self, fields: &Fields) -> Result<LogRecord, QueryError> {
        self.find_latest(fields)
            .await?
            .ok_or_else(|| self.not_found(fields))
    }

    /// Matching record with the smallest `T`; `NotFound` when nothing matches.
    pub async fn get_first(&self, fields: &Fields) -> Result<LogRecord, QueryError> {
        self.find_first(fields)
            .await?
            .ok_or_else(|| self.not_found(fields))
    }

    /// Every matching record, ascending on `T` whatever order the backend used.
    pub async fn get_all(&self, fields: &Fields) -> Result<Vec<LogRecord>, QueryError> {
        let req = self.request(fields);
        let mut hits = self.backend.scan(&req).await?;
        hits.sort_by(cmp_by_timestamp);
        debug!(
            backend = self.backend.name(),
            index = %self.index,
            namespace = %self.namespace,
            filter = %fields,
            hits = hits.len(),
            "scan"
        );
        Ok(hits)
    }

    /// Number of matching records.
    pub async fn count(&self, fields: &Fields) -> Result<u64, QueryError> {
        let req = self.request(fields);
        self.backend.count(&req).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::memory::InMemoryBackend;
    use serde_json::json;

    fn rec(ns: &str, m: &str, t: &str, layer: u64) -> LogRecord {
        LogRecord::from_source(json!({
            "M": m,
            "T": t,
            "kubernetes": { "namespace_name": ns },
            "layer_id": layer
        }))
        .unwrap()
    }

    fn client(records: Vec<LogRecord>, ns: &str) -> QueryClient {
        QueryClient::new(
            Box::new(InMemoryBackend::from_records(records)),
            "kubernetes_cluster-2024.01.01".to_string(),
            ns.to_string(),
        )
    }

    #[tokio::test]
    async fn get_all_sorts_unordered_records_ascending() {
        let c = client(
            vec![
                rec("ns1", "release tick", "2024-01-01T10:00:02.000000Z", 16),
                rec("ns1", "release tick", "2024-01-01T10:00:00.000000Z", 16),
                rec("ns1", "release tick", "2024-01-01T10:00:01.000000Z", 16),
            ],
            "ns1",
        );
        let got = c
            .get_all(&Fields::new().with("M", "release tick").with("layer_id", 16_u64))
            .await
            .unwrap();
        let ts: Vec<&str> = got.iter().map(|r| r.timestamp.as_str()).collect();
        assert_eq!(
            ts,
            vec![
                "2024-01-01T10:00:00.000000Z",
                "2024-01-01T10:00:01.000000Z",
                "2024-01-01T10:00:02.000000Z",
            ]
        );
    }

    #[tokio::test]
    async fn get_all_orders_mixed_precision_by_instant() {
        let c = client(
            vec![
                rec("ns1", "release tick", "2024-01-01T10:00:00.5Z", 1),
                rec("ns1", "release tick", "2024-01-01T10:00:00.25Z", 1),
            ],
            "ns1",
        );
        let got = c.get_all(&Fields::new().with("M", "release tick")).await.unwrap();
        assert_eq!(got[0].timestamp, "2024-01-01T10:00:00.25Z");
    }

    #[tokio::test]
    async fn latest_and_first_pick_extremes() {
        let c = client(
            vec![
                rec("ns1", "release tick", "2024-01-01T10:00:01.000000Z", 21),
                rec("ns1", "release tick", "2024-01-01T10:00:03.000000Z", 23),
                rec("ns1", "release tick", "2024-01-01T10:00:02.000000Z", 22),
                rec("ns2", "release tick", "2024-01-01T11:00:00.000000Z", 99),
            ],
            "ns1",
        );
        let f = Fields::new().with("M", "release tick");
        assert_eq!(c.get_latest(&f).await.unwrap().layer_id, Some(23));
        assert_eq!(c.get_first(&f).await.unwrap().layer_id, Some(21));
        assert_eq!(c.count(&f).await.unwrap(), 3);
    }

    #[tokio::test]
    async fn empty_result_is_not_found() {
        let c = client(
            vec![rec("other", "release tick", "2024-01-01T10:00:00.000000Z", 1)],
            "ns1",
        );
        let f = Fields::new().with("M", "release tick");
        assert!(c.find_latest(&f).await.unwrap().is_none());
        let err = c.get_latest(&f).await.unwrap_err();
        assert!(matches!(err, QueryError::NotFound { ref namespace, .. } if namespace == "ns1"));
        assert!(matches!(c.get_first(&f).await, Err(QueryError::NotFound { .. })));
    }
}
