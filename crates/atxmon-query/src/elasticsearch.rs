//! Elasticsearch-backed [`LogBackend`].
//!
//! Every request carries the same filter: a `bool.filter` of `match_phrase`
//! clauses, one for the namespace and one per field predicate.
//!
//! - single-record lookups: `POST /{index}/_search` with `size` and a sort on `T`
//! - counts: `POST /{index}/_count`
//! - full scans: scroll API, page by page until an empty page, then the scroll
//!   context is cleared

use std::time::Duration;

use serde::de::DeserializeOwned;
use serde::Deserialize;
use serde_json::{json, Value};
use tracing::{debug, warn};

use crate::backend::{LogBackend, SearchRequest, SortOrder};
use crate::error::{BackendError, QueryError};
use crate::record::{LogRecord, NAMESPACE_FIELD, TIMESTAMP_FIELD};

/// Max characters of an error body kept in [`BackendError::Status`].
const ERROR_BODY_LIMIT: usize = 512;

/// HTTP basic credentials. **Password is redacted in `Debug` output.**
#[derive(Clone)]
pub struct BasicAuth {
    pub username: String,
    pub password: String,
}

impl std::fmt::Debug for BasicAuth {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("BasicAuth")
            .field("username", &self.username)
            .field("password", &"<REDACTED>")
            .finish()
    }
}

/// Transport tuning for [`ElasticsearchBackend`].
#[derive(Debug, Clone)]
pub struct ElasticsearchOptions {
    /// Hits per scroll page.
    pub page_size: usize,
    /// Scroll context keepalive, in Elasticsearch duration syntax (e.g. `"1m"`).
    pub scroll_keepalive: String,
    pub request_timeout: Duration,
    pub auth: Option<BasicAuth>,
}

impl Default for ElasticsearchOptions {
    fn default() -> Self {
        Self {
            page_size: 1000,
            scroll_keepalive: "1m".to_string(),
            request_timeout: Duration::from_secs(30),
            auth: None,
        }
    }
}

#[derive(Debug, Clone)]
pub struct ElasticsearchBackend {
    http: reqwest::Client,
    base_url: String,
    opts: ElasticsearchOptions,
}

impl ElasticsearchBackend {
    pub fn new(base_url: String) -> Result<Self, QueryError> {
        Self::with_options(base_url, ElasticsearchOptions::default())
    }

    pub fn with_options(base_url: String, opts: ElasticsearchOptions) -> Result<Self, QueryError> {
        if opts.page_size == 0 {
            return Err(BackendError::Config("page_size must be > 0".to_string()).into());
        }
        let http = reqwest::Client::builder()
            .timeout(opts.request_timeout)
            .build()
            .map_err(|e| BackendError::Config(format!("http client build failed: {e}")))?;
        Ok(Self {
            http,
            base_url: base_url.trim_end_matches('/').to_string(),
            opts,
        })
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    fn url(&self, path: &str) -> String {
        format!("{}/{}", self.base_url, path.trim_start_matches('/'))
    }

    /// Send a JSON request and decode a JSON response, mapping failures to
    /// [`BackendError`].
    async fn send<T: DeserializeOwned + Send>(
        &self,
        builder: reqwest::RequestBuilder,
        what: &str,
    ) -> Result<T, QueryError> {
        let builder = match &self.opts.auth {
            Some(a) => builder.basic_auth(&a.username, Some(&a.password)),
            None => builder,
        };

        let resp = builder
            .send()
            .await
            .map_err(|e| BackendError::Transport(format!("{what} request failed: {e}")))?;

        let status = resp.status();
        if !status.is_success() {
            let body = resp.text().await.unwrap_or_default();
            return Err(BackendError::Status {
                status: status.as_u16(),
                body: truncate(&body, ERROR_BODY_LIMIT),
            }
            .into());
        }

        resp.json::<T>().await.map_err(|e| {
            QueryError::from(BackendError::Decode(format!(
                "{what} response json decode failed: {e}"
            )))
        })
    }

    async fn clear_scroll(&self, scroll_id: &str) {
        let builder = self
            .http
            .delete(self.url("_search/scroll"))
            .json(&json!({ "scroll_id": scroll_id }));
        // Contexts expire on their own after the keepalive; a failed clear is not fatal.
        if let Err(e) = self.send::<Value>(builder, "clear scroll").await {
            warn!(error = %e, "failed to clear scroll context");
        }
    }
}

/// `bool.filter` query for a request.
pub fn filter_query(req: &SearchRequest) -> Value {
    let mut clauses = vec![json!({ "match_phrase": { NAMESPACE_FIELD: req.namespace } })];
    for (k, v) in req.fields.iter() {
        clauses.push(json!({ "match_phrase": { k: v.to_json() } }));
    }
    json!({ "bool": { "filter": clauses } })
}

fn sort_clause(order: SortOrder) -> Value {
    json!([{ TIMESTAMP_FIELD: { "order": order.as_str() } }])
}

fn truncate(s: &str, max: usize) -> String {
    match s.char_indices().nth(max) {
        Some((idx, _)) => format!("{}...", &s[..idx]),
        None => s.to_string(),
    }
}

fn decode_hits(hits: Vec<Hit>) -> Result<Vec<LogRecord>, QueryError> {
    hits.into_iter()
        .map(|h| LogRecord::from_source(h.source))
        .collect()
}

#[async_trait::async_trait]
impl LogBackend for ElasticsearchBackend {
    fn name(&self) -> &'static str {
        "elasticsearch"
    }

    async fn search_sorted(
        &self,
        req: &SearchRequest,
        order: SortOrder,
        limit: usize,
    ) -> Result<Vec<LogRecord>, QueryError> {
        let body = json!({
            "query": filter_query(req),
            "sort": sort_clause(order),
            "size": limit,
        });
        let builder = self
            .http
            .post(self.url(&format!("{}/_search", req.index)))
            .json(&body);
        let resp: SearchResponse = self.send(builder, "search").await?;
        decode_hits(resp.hits.hits)
    }

    async fn scan(&self, req: &SearchRequest) -> Result<Vec<LogRecord>, QueryError> {
        let body = json!({
            "query": filter_query(req),
            "sort": sort_clause(SortOrder::Ascending),
            "size": self.opts.page_size,
        });
        let builder = self
            .http
            .post(self.url(&format!("{}/_search", req.index)))
            .query(&[("scroll", self.opts.scroll_keepalive.as_str())])
            .json(&body);
        let mut page: SearchResponse = self.send(builder, "scroll open").await?;

        let mut out: Vec<LogRecord> = Vec::new();
        let mut pages = 0usize;
        let mut last_scroll_id: Option<String> = None;

        let result = loop {
            pages += 1;
            if let Some(id) = page.scroll_id.take() {
                last_scroll_id = Some(id);
            }
            if page.hits.hits.is_empty() {
                break Ok(());
            }
            match decode_hits(std::mem::take(&mut page.hits.hits)) {
                Ok(mut recs) => out.append(&mut recs),
                Err(e) => break Err(e),
            }

            let Some(scroll_id) = last_scroll_id.clone() else {
                // No scroll id: the backend returned everything in one page.
                break Ok(());
            };
            let builder = self.http.post(self.url("_search/scroll")).json(&json!({
                "scroll": self.opts.scroll_keepalive,
                "scroll_id": scroll_id,
            }));
            page = match self.send(builder, "scroll next").await {
                Ok(p) => p,
                Err(e) => break Err(e),
            };
        };

        if let Some(id) = last_scroll_id {
            self.clear_scroll(&id).await;
        }
        result?;

        debug!(index = %req.index, pages, hits = out.len(), "scroll complete");
        Ok(out)
    }

    async fn count(&self, req: &SearchRequest) -> Result<u64, QueryError> {
        let builder = self
            .http
            .post(self.url(&format!("{}/_count", req.index)))
            .json(&json!({ "query": filter_query(req) }));
        let resp: CountResponse = self.send(builder, "count").await?;
        Ok(resp.count)
    }
}

#[derive(Debug, Deserialize)]
struct SearchResponse {
    #[serde(rename = "_scroll_id", default)]
    scroll_id: Option<String>,
    hits: HitsEnvelope,
}

#[derive(Debug, Deserialize)]
struct HitsEnvelope {
    #[serde(default)]
    hits: Vec<Hit>,
}

#[derive(Debug, Deserialize)]
struct Hit {
    #[serde(rename = "_source")]
    source: Value,
}

#[derive(Debug, Deserialize)]
struct CountResponse {
    count: u64,
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::record::Fields;

    #[test]
    fn filter_query_scopes_namespace_then_fields() {
        let req = SearchRequest {
            index: "idx".to_string(),
            namespace: "ns1".to_string(),
            fields: Fields::new().with("M", "atx published").with("epoch_id", 3_u64),
        };
        assert_eq!(
            filter_query(&req),
            json!({ "bool": { "filter": [
                { "match_phrase": { "kubernetes.namespace_name": "ns1" } },
                { "match_phrase": { "M": "atx published" } },
                { "match_phrase": { "epoch_id": 3 } },
            ]}})
        );
    }

    #[test]
    fn truncate_keeps_short_bodies() {
        assert_eq!(truncate("abc", 5), "abc");
        assert_eq!(truncate("abcdef", 3), "abc...");
    }

    #[test]
    fn zero_page_size_rejected() {
        let opts = ElasticsearchOptions {
            page_size: 0,
            ..ElasticsearchOptions::default()
        };
        let err = ElasticsearchBackend::with_options("http://localhost:9200".into(), opts).unwrap_err();
        assert!(matches!(err, QueryError::Backend(BackendError::Config(_))));
    }

    #[test]
    fn auth_debug_is_redacted() {
        let a = BasicAuth {
            username: "elastic".into(),
            password: "hunter2".into(),
        };
        assert!(!format!("{a:?}").contains("hunter2"));
    }
}
