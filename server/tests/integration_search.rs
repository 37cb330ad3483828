use axum::body::Body;
use axum::http::{Request, StatusCode};
use axum::Router;
use http_body_util::BodyExt;
use search_core::{
    Collection, Document, Indexer, IndexerConfig, KvStore, RankingConfig, SequentialScan, SledStore, Table, TextPipeline,
};
use server::{build_app, SearchHit, ServerConfig};
use std::path::Path;
use std::time::Duration;
use tempfile::tempdir;
use tower::ServiceExt;

fn build_tiny_index(collection_dir: &Path, index_dir: &Path, bodies: &[(&str, f64)]) {
    let collection = Collection::new(SledStore::open(collection_dir).unwrap());
    for (i, (body, authority)) in bodies.iter().enumerate() {
        let doc_id = i as u32 + 1;
        collection
            .insert(&Document {
                doc_id,
                url: format!("https://example.com/{doc_id}"),
                title: format!("Doc {doc_id}"),
                body: body.to_string(),
                authority: *authority,
            })
            .unwrap();
    }
    let index = SledStore::open(index_dir).unwrap();
    Indexer::new(&index, &TextPipeline::new(), IndexerConfig::default())
        .run(&mut SequentialScan::new(&collection))
        .unwrap();
}

fn config(collection_dir: &Path, index_dir: &Path) -> ServerConfig {
    ServerConfig {
        index_dir: index_dir.to_path_buf(),
        collection_dir: collection_dir.to_path_buf(),
        ranking: RankingConfig::new(1.0, 0.0),
        stopwords: None,
        query_timeout: Duration::from_secs(5),
    }
}

async fn call(app: Router, uri: &str) -> (StatusCode, axum::body::Bytes) {
    let req = Request::get(uri).body(Body::empty()).unwrap();
    let resp = app.oneshot(req).await.unwrap();
    let status = resp.status();
    let body = resp.into_body().collect().await.unwrap().to_bytes();
    (status, body)
}

#[tokio::test]
async fn search_returns_ranked_results() {
    let collection = tempdir().unwrap();
    let index = tempdir().unwrap();
    build_tiny_index(
        collection.path(),
        index.path(),
        &[("cats love fish", 0.0), ("dogs love fish", 0.0), ("cats love cats", 0.0)],
    );
    let app = build_app(&config(collection.path(), index.path())).unwrap();

    let (status, body) = call(app, "/search?q=cats").await;
    assert_eq!(status, StatusCode::OK);
    let hits: Vec<SearchHit> = serde_json::from_slice(&body).unwrap();
    assert_eq!(hits.len(), 2);
    assert_eq!(hits[0].url, "https://example.com/3");
    assert_eq!(hits[1].url, "https://example.com/1");
    assert!(hits[0].score > hits[1].score);
}

#[tokio::test]
async fn empty_query_returns_empty_array() {
    let collection = tempdir().unwrap();
    let index = tempdir().unwrap();
    build_tiny_index(collection.path(), index.path(), &[("rust systems programming", 0.0)]);
    let app = build_app(&config(collection.path(), index.path())).unwrap();

    let (status, body) = call(app.clone(), "/search?q=").await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(&body[..], b"[]");

    let (status, body) = call(app, "/health").await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(&body[..], b"ok");
}

#[tokio::test]
async fn results_never_exceed_ten() {
    let collection = tempdir().unwrap();
    let index = tempdir().unwrap();
    let bodies: Vec<String> = (0..30).map(|i| format!("yam recipe number{i}")).collect();
    let mut docs: Vec<(&str, f64)> = bodies.iter().map(|b| (b.as_str(), 0.0)).collect();
    docs.push(("unrelated page", 0.0));
    build_tiny_index(collection.path(), index.path(), &docs);
    let app = build_app(&config(collection.path(), index.path())).unwrap();

    let (status, body) = call(app, "/search?q=yam").await;
    assert_eq!(status, StatusCode::OK);
    let hits: Vec<SearchHit> = serde_json::from_slice(&body).unwrap();
    assert_eq!(hits.len(), 10);
    assert!(hits.windows(2).all(|w| w[0].score >= w[1].score));
}

#[tokio::test]
async fn storage_errors_are_not_echoed_to_clients() {
    let collection = tempdir().unwrap();
    let index = tempdir().unwrap();
    build_tiny_index(collection.path(), index.path(), &[("cats love fish", 0.0), ("dogs love fish", 0.0)]);
    {
        let store = SledStore::open(index.path()).unwrap();
        store.put(Table::Postings, b"cat", &[0xff]).unwrap();
        store.sync().unwrap();
    }
    let app = build_app(&config(collection.path(), index.path())).unwrap();

    let (status, body) = call(app, "/search?q=cats").await;
    assert_eq!(status, StatusCode::INTERNAL_SERVER_ERROR);
    assert_eq!(&body[..], b"query failed");
}

#[test]
fn refuses_to_serve_an_incomplete_index() {
    let collection = tempdir().unwrap();
    let index = tempdir().unwrap();
    // opened but never built: no totalDocs key
    drop(SledStore::open(index.path()).unwrap());
    assert!(build_app(&config(collection.path(), index.path())).is_err());
}
