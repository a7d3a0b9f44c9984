use axum::http::StatusCode;
use axum::routing::post;
use axum::{Json, Router};
use serde_json::{json, Value};

use turbo_core::config::EmbeddingSettings;
use turbo_core::error::Error;
use turbo_embed::{get_default_embedder, Embedder, HttpEmbedder};

#[test]
fn fake_embedder_shapes_and_determinism() {
    let settings = EmbeddingSettings { fake: true, dimension: 384, ..EmbeddingSettings::default() };
    let embedder = get_default_embedder(&settings).expect("embedder");
    let v1 = embedder.embed_text("hello world").expect("embed");
    let v2 = embedder.embed_text("hello world").expect("embed");

    assert_eq!(v1.len(), 384, "embedding dim is 384");

    let norm: f32 = v1.iter().map(|x| x * x).sum::<f32>().sqrt();
    assert!((norm - 1.0).abs() <= 1e-3, "vector is L2-normalized (norm={norm})");

    for (a, b) in v1.iter().zip(v2.iter()) { assert!((a - b).abs() <= 1e-6); }
}

#[test]
fn fake_embedder_similar_texts_score_higher() {
    let settings = EmbeddingSettings { fake: true, dimension: 384, ..EmbeddingSettings::default() };
    let embedder = get_default_embedder(&settings).expect("embedder");
    let q = embedder.embed_text("cats are mammals").unwrap();
    let near = embedder.embed_text("cats mammals").unwrap();
    let far = embedder.embed_text("volcanic basalt geology").unwrap();
    let dot = |a: &[f32], b: &[f32]| a.iter().zip(b).map(|(x, y)| x * y).sum::<f32>();
    assert!(dot(&q, &near) > dot(&q, &far));
}

async fn spawn_mock(router: Router) -> String {
    let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.expect("bind");
    let addr = listener.local_addr().expect("addr");
    tokio::spawn(async move { axum::serve(listener, router).await.expect("serve") });
    format!("http://{addr}")
}

fn settings_for(url: String, dimension: usize) -> EmbeddingSettings {
    EmbeddingSettings { url, dimension, timeout_secs: 5, ..EmbeddingSettings::default() }
}

#[tokio::test]
async fn http_embedder_normalizes_service_output() {
    let router = Router::new().route(
        "/api/embeddings",
        post(|Json(body): Json<Value>| async move {
            assert_eq!(body["model"], "all-minilm");
            assert_eq!(body["prompt"], "cats are mammals");
            Json(json!({ "embedding": [3.0, 4.0, 0.0] }))
        }),
    );
    let base = spawn_mock(router).await;
    let settings = settings_for(format!("{base}/api/embeddings"), 3);

    let vec = tokio::task::spawn_blocking(move || {
        let embedder = HttpEmbedder::new(&settings).expect("client");
        embedder.embed_text("cats are mammals")
    })
    .await
    .expect("join")
    .expect("embed");

    assert_eq!(vec.len(), 3);
    assert!((vec[0] - 0.6).abs() < 1e-6);
    assert!((vec[1] - 0.8).abs() < 1e-6);
}

#[tokio::test]
async fn http_embedder_failures_are_errors() {
    let router = Router::new()
        .route("/down", post(|| async { (StatusCode::SERVICE_UNAVAILABLE, "model loading") }))
        .route("/empty", post(|| async { Json(json!({ "embedding": [] })) }))
        .route("/short", post(|| async { Json(json!({ "embedding": [1.0, 2.0] })) }));
    let base = spawn_mock(router).await;

    let results = tokio::task::spawn_blocking(move || {
        ["down", "empty", "short"]
            .iter()
            .map(|path| HttpEmbedder::new(&settings_for(format!("{base}/{path}"), 3)).expect("client").embed_text("x"))
            .collect::<Vec<_>>()
    })
    .await
    .expect("join");

    assert!(matches!(results[0], Err(Error::Embedding(_))));
    assert!(matches!(results[1], Err(Error::Embedding(_))));
    assert!(matches!(results[2], Err(Error::DimensionMismatch { expected: 3, got: 2 })));
}
