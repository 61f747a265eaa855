use axum::body::{Body, Bytes};
use axum::http::{Request, StatusCode};
use axum::Router;
use http_body_util::BodyExt;
use serde_json::Value;
use sitesearch_core::{Document, Highlighter, IndexConfig, SearchIndex};
use tempfile::tempdir;
use tower::ServiceExt;

fn build_tiny_index(dir: &std::path::Path) {
    let index = SearchIndex::open(dir, IndexConfig::default()).unwrap();
    index
        .add_document(Document {
            url: "http://site.test/rust".into(),
            title: "Rust".into(),
            heading: Some("Rust Programming".into()),
            content: "Rust is great. Rust systems programming.".into(),
            keywords: Some("rust, systems".into()),
            description: None,
        })
        .unwrap();
    index
        .add_document(Document {
            url: "http://site.test/learn".into(),
            title: "Learning".into(),
            content: "Learning rust.".into(),
            ..Document::default()
        })
        .unwrap();
    index.close().unwrap();
}

async fn call(app: Router, uri: &str) -> (StatusCode, Bytes) {
    let req = Request::get(uri).body(Body::empty()).unwrap();
    let resp = app.oneshot(req).await.unwrap();
    let status = resp.status();
    let body = resp.into_body().collect().await.unwrap().to_bytes();
    (status, body)
}

fn app_for(dir: &std::path::Path) -> Router {
    server::build_app(&dir.to_string_lossy()).unwrap()
}

#[tokio::test]
async fn search_returns_ranked_results() {
    let dir = tempdir().unwrap();
    build_tiny_index(dir.path());

    let (status, body) = call(app_for(dir.path()), "/search?q=rust&k=2").await;
    assert_eq!(status, StatusCode::OK);
    let json: Value = serde_json::from_slice(&body).unwrap();
    assert_eq!(json["query"], "rust");
    assert_eq!(json["total_hits"], 2);
    let arr = json["results"].as_array().unwrap();
    assert_eq!(arr.len(), 2);
    assert_eq!(arr[0]["doc_id"], 0);
    assert_eq!(arr[1]["doc_id"], 1);
    assert_eq!(arr[0]["title"], "<em>Rust</em> Programming");
    assert_eq!(arr[1]["teaser"], "<em>rust</em>.");
}

#[tokio::test]
async fn highlight_tags_come_from_the_index_handle() {
    let dir = tempdir().unwrap();
    build_tiny_index(dir.path());
    let index = SearchIndex::open_existing(dir.path())
        .unwrap()
        .with_highlighter(Highlighter::new("<b>", "</b>"));

    let (status, body) = call(server::build_app_with_index(index), "/search?q=rust&k=1").await;
    assert_eq!(status, StatusCode::OK);
    let json: Value = serde_json::from_slice(&body).unwrap();
    assert_eq!(json["results"][0]["title"], "<b>Rust</b> Programming");
}

#[tokio::test]
async fn k_is_clamped() {
    let dir = tempdir().unwrap();
    build_tiny_index(dir.path());

    let (_, body) = call(app_for(dir.path()), "/search?q=rust&k=0").await;
    let json: Value = serde_json::from_slice(&body).unwrap();
    assert_eq!(json["results"].as_array().unwrap().len(), 1);
    assert_eq!(json["total_hits"], 2);
}

#[tokio::test]
async fn empty_and_unknown_queries_have_no_hits() {
    let dir = tempdir().unwrap();
    build_tiny_index(dir.path());

    for uri in ["/search?q=", "/search", "/search?q=rust+haskell"] {
        let (status, body) = call(app_for(dir.path()), uri).await;
        assert_eq!(status, StatusCode::OK, "{uri}");
        let json: Value = serde_json::from_slice(&body).unwrap();
        assert_eq!(json["total_hits"], 0, "{uri}");
    }
}

#[tokio::test]
async fn doc_lookup() {
    let dir = tempdir().unwrap();
    build_tiny_index(dir.path());

    let (status, body) = call(app_for(dir.path()), "/doc/1").await;
    assert_eq!(status, StatusCode::OK);
    let json: Value = serde_json::from_slice(&body).unwrap();
    assert_eq!(json["url"], "http://site.test/learn");
    assert_eq!(json["text"], "Learning rust.");

    let (status, _) = call(app_for(dir.path()), "/doc/42").await;
    assert_eq!(status, StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn health_and_missing_index() {
    let dir = tempdir().unwrap();
    assert!(server::build_app(&dir.path().join("nope").to_string_lossy()).is_err());

    let app = server::build_app_with_index(SearchIndex::in_memory(IndexConfig::default()));
    let (status, body) = call(app, "/health").await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(&body[..], b"ok");
}
