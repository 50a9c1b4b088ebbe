use atxmon_query::{
    BackendError, ElasticsearchBackend, ElasticsearchOptions, Fields, QueryClient, QueryError,
};
use httpmock::prelude::*;
use serde_json::{json, Value};

/// Elasticsearch backend scenarios against a local mock server.
///
/// Validates:
/// 1) first/latest lookups send a namespace-scoped filter and a sort on T.
/// 2) full scans follow the scroll API across pages and clear the context.
/// 3) counts use `_count` and never fetch hits.
/// 4) HTTP failures surface as backend errors, empty lookups as NotFound.

fn hit(t: &str, layer: u64) -> Value {
    json!({
        "_index": "kubernetes_cluster-2024.01.01",
        "_source": {
            "M": "release tick",
            "T": t,
            "kubernetes": { "namespace_name": "ns1" },
            "layer_id": layer
        }
    })
}

fn client(server: &MockServer, page_size: usize) -> QueryClient {
    let opts = ElasticsearchOptions {
        page_size,
        ..ElasticsearchOptions::default()
    };
    let backend = ElasticsearchBackend::with_options(server.base_url(), opts).expect("backend");
    QueryClient::new(Box::new(backend), "idx".to_string(), "ns1".to_string())
}

#[tokio::test]
async fn latest_lookup_sorts_descending_and_scopes_namespace() {
    let server = MockServer::start_async().await;
    let m = server
        .mock_async(|when, then| {
            when.method(POST)
                .path("/idx/_search")
                .body_contains(r#""order":"desc""#)
                .body_contains(r#"{"match_phrase":{"kubernetes.namespace_name":"ns1"}}"#)
                .body_contains(r#"{"match_phrase":{"M":"release tick"}}"#)
                .body_contains(r#""size":1"#);
            then.status(200)
                .json_body(json!({ "hits": { "hits": [hit("2024-01-01T10:40:00.000000Z", 23)] } }));
        })
        .await;

    let rec = client(&server, 100)
        .get_latest(&Fields::new().with("M", "release tick"))
        .await
        .expect("latest");

    m.assert_async().await;
    assert_eq!(rec.layer_id, Some(23));
    assert_eq!(rec.timestamp, "2024-01-01T10:40:00.000000Z");
}

#[tokio::test]
async fn empty_hits_are_not_found() {
    let server = MockServer::start_async().await;
    server
        .mock_async(|when, then| {
            when.method(POST).path("/idx/_search");
            then.status(200).json_body(json!({ "hits": { "hits": [] } }));
        })
        .await;

    let err = client(&server, 100)
        .get_first(&Fields::new().with("M", "release tick"))
        .await
        .unwrap_err();
    assert!(matches!(err, QueryError::NotFound { .. }), "got {err:?}");
}

#[tokio::test]
async fn scan_follows_scroll_pages_and_clears_context() {
    let server = MockServer::start_async().await;

    let open = server
        .mock_async(|when, then| {
            when.method(POST)
                .path("/idx/_search")
                .query_param("scroll", "1m")
                .body_contains(r#"{"match_phrase":{"layer_id":16}}"#)
                .body_contains(r#""size":2"#);
            then.status(200).json_body(json!({
                "_scroll_id": "scroll-a",
                "hits": { "hits": [
                    hit("2024-01-01T10:00:02.000000Z", 16),
                    hit("2024-01-01T10:00:00.000000Z", 16),
                ]}
            }));
        })
        .await;

    let next_a = server
        .mock_async(|when, then| {
            when.method(POST)
                .path("/_search/scroll")
                .body_contains(r#""scroll_id":"scroll-a""#);
            then.status(200).json_body(json!({
                "_scroll_id": "scroll-b",
                "hits": { "hits": [hit("2024-01-01T10:00:01.000000Z", 16)] }
            }));
        })
        .await;

    let next_b = server
        .mock_async(|when, then| {
            when.method(POST)
                .path("/_search/scroll")
                .body_contains(r#""scroll_id":"scroll-b""#);
            then.status(200).json_body(json!({
                "_scroll_id": "scroll-b",
                "hits": { "hits": [] }
            }));
        })
        .await;

    let clear = server
        .mock_async(|when, then| {
            when.method(DELETE)
                .path("/_search/scroll")
                .body_contains(r#""scroll_id":"scroll-b""#);
            then.status(200).json_body(json!({ "succeeded": true, "num_freed": 1 }));
        })
        .await;

    let got = client(&server, 2)
        .get_all(&Fields::new().with("M", "release tick").with("layer_id", 16_u64))
        .await
        .expect("scan");

    open.assert_async().await;
    next_a.assert_async().await;
    next_b.assert_async().await;
    clear.assert_async().await;

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
async fn count_uses_count_endpoint() {
    let server = MockServer::start_async().await;
    let m = server
        .mock_async(|when, then| {
            when.method(POST)
                .path("/idx/_count")
                .body_contains(r#"{"match_phrase":{"M":"atx published"}}"#)
                .body_contains(r#"{"match_phrase":{"epoch_id":3}}"#);
            then.status(200).json_body(json!({ "count": 7 }));
        })
        .await;

    let n = client(&server, 100)
        .count(&Fields::new().with("M", "atx published").with("epoch_id", 3_u64))
        .await
        .expect("count");

    m.assert_async().await;
    assert_eq!(n, 7);
}

#[tokio::test]
async fn http_failure_is_backend_error() {
    let server = MockServer::start_async().await;
    server
        .mock_async(|when, then| {
            when.method(POST).path("/idx/_count");
            then.status(503).body("cluster unavailable");
        })
        .await;

    let err = client(&server, 100)
        .count(&Fields::new().with("M", "atx published"))
        .await
        .unwrap_err();

    assert_eq!(
        err,
        QueryError::Backend(BackendError::Status {
            status: 503,
            body: "cluster unavailable".to_string(),
        })
    );
}
