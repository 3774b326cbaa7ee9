use std::time::Duration;

use careermap::CareerError;
use careermap::clients::{
    ChromaIndex, Embedder, GeminiClient, GenerationParams, TextGenerator, VectorIndex,
};
use httpmock::prelude::*;
use serde_json::json;

fn gemini(server: &MockServer) -> GeminiClient {
    GeminiClient::new(
        "test-key",
        &server.base_url(),
        "text-embedding-004",
        "models/gemini-1.5-flash",
        Duration::from_secs(5),
        0,
    )
    .unwrap()
}

fn gemini_with_retries(server: &MockServer, max_retries: u32, timeout: Duration) -> GeminiClient {
    GeminiClient::new(
        "test-key",
        &server.base_url(),
        "text-embedding-004",
        "gemini-1.5-flash",
        timeout,
        max_retries,
    )
    .unwrap()
}

fn chroma(server: &MockServer) -> ChromaIndex {
    ChromaIndex::new(&server.base_url(), "career_jobs_collection", Duration::from_secs(5), 0)
        .unwrap()
}

const PARAMS: GenerationParams = GenerationParams {
    max_output_tokens: 64,
    temperature: 0.1,
};

#[tokio::test]
async fn test_embed_sends_key_model_and_task_type() {
    let server = MockServer::start_async().await;
    let mock = server
        .mock_async(|when, then| {
            when.method(POST)
                .path("/models/text-embedding-004:embedContent")
                .header("x-goog-api-key", "test-key")
                .body_includes("models/text-embedding-004")
                .body_includes("RETRIEVAL_QUERY")
                .body_includes("Rust, Tokio");
            then.status(200)
                .json_body(json!({"embedding": {"values": [0.5, -0.25, 1.0]}}));
        })
        .await;

    let vector = gemini(&server).embed("Rust, Tokio").await.unwrap();

    mock.assert_async().await;
    assert_eq!(vector, vec![0.5, -0.25, 1.0]);
}

#[tokio::test]
async fn test_embed_http_error_maps_to_embedding_error() {
    let server = MockServer::start_async().await;
    let mock = server
        .mock_async(|when, then| {
            when.method(POST).path("/models/text-embedding-004:embedContent");
            then.status(400)
                .json_body(json!({"error": {"message": "API key not valid"}}));
        })
        .await;

    let err = gemini(&server).embed("rust").await.unwrap_err();

    mock.assert_async().await;
    assert!(matches!(err, CareerError::Embedding(_)));
    assert!(err.to_string().contains("400"));
    assert!(err.to_string().contains("API key not valid"));
}

#[tokio::test]
async fn test_embed_rejects_empty_vector() {
    let server = MockServer::start_async().await;
    server
        .mock_async(|when, then| {
            when.method(POST).path("/models/text-embedding-004:embedContent");
            then.status(200).json_body(json!({"embedding": {"values": []}}));
        })
        .await;

    let err = gemini(&server).embed("rust").await.unwrap_err();
    assert_eq!(err.code(), "embedding");
}

#[tokio::test]
async fn test_generate_returns_first_candidate_text() {
    let server = MockServer::start_async().await;
    let mock = server
        .mock_async(|when, then| {
            when.method(POST)
                .path("/models/gemini-1.5-flash:generateContent")
                .body_includes("maxOutputTokens")
                .body_includes("Phrase: backend");
            then.status(200).json_body(json!({
                "candidates": [
                    {"content": {"parts": [{"text": " Backend, API \n"}]}},
                    {"content": {"parts": [{"text": "ignored"}]}}
                ]
            }));
        })
        .await;

    let text = gemini(&server)
        .generate("Phrase: backend", PARAMS)
        .await
        .unwrap();

    mock.assert_async().await;
    assert_eq!(text.as_deref(), Some("Backend, API"));
}

#[tokio::test]
async fn test_generate_without_candidates_is_none() {
    let server = MockServer::start_async().await;
    server
        .mock_async(|when, then| {
            when.method(POST).path("/models/gemini-1.5-flash:generateContent");
            then.status(200)
                .json_body(json!({"promptFeedback": {"blockReason": "SAFETY"}}));
        })
        .await;

    let text = gemini(&server).generate("hi", PARAMS).await.unwrap();
    assert_eq!(text, None);
}

#[test]
fn test_gemini_requires_api_key() {
    let err = GeminiClient::new(
        "  ",
        "http://localhost:1",
        "text-embedding-004",
        "gemini-1.5-flash",
        Duration::from_secs(1),
        0,
    )
    .err()
    .unwrap();
    assert_eq!(err.code(), "missing_config");
}

#[tokio::test]
async fn test_chroma_resolves_collection_once_and_queries() {
    let server = MockServer::start_async().await;
    let lookup = server
        .mock_async(|when, then| {
            when.method(GET).path("/api/v1/collections/career_jobs_collection");
            then.status(200)
                .json_body(json!({"id": "abc-123", "name": "career_jobs_collection"}));
        })
        .await;
    server
        .mock_async(|when, then| {
            when.method(POST)
                .path("/api/v1/collections/abc-123/query")
                .body_includes("\"n_results\":10")
                .body_includes("distances");
            then.status(200).json_body(json!({
                "ids": [["j1", "j2"]],
                "distances": [[0.2, 0.4]],
                "metadatas": [[{"skills": "Rust"}, null]],
                "documents": null
            }));
        })
        .await;

    let index = chroma(&server);
    let first = index.query(&[0.1, 0.2], 10).await.unwrap();
    let second = index.query(&[0.3, 0.4], 10).await.unwrap();

    lookup.assert_async().await;
    assert_eq!(first, second);
    assert_eq!(first.ids, vec!["j1", "j2"]);
    assert_eq!(first.distances, vec![0.2, 0.4]);
    assert!(first.metadatas[1].is_none());
}

#[tokio::test]
async fn test_chroma_missing_collection_is_index_error() {
    let server = MockServer::start_async().await;
    server
        .mock_async(|when, then| {
            when.method(GET).path("/api/v1/collections/career_jobs_collection");
            then.status(404)
                .json_body(json!({"error": "Collection career_jobs_collection does not exist."}));
        })
        .await;

    let err = chroma(&server).query(&[0.1], 4).await.unwrap_err();
    assert!(matches!(err, CareerError::VectorIndex(_)));
    assert!(err.to_string().contains("404"));
}

#[test]
fn test_chroma_rejects_non_http_endpoint() {
    let err = ChromaIndex::new("localhost:8000", "jobs", Duration::from_secs(1), 0)
        .err()
        .unwrap();
    assert_eq!(err.code(), "config");
}

#[tokio::test]
async fn test_embed_retries_server_errors_then_gives_up() {
    let server = MockServer::start_async().await;
    let mock = server
        .mock_async(|when, then| {
            when.method(POST).path("/models/text-embedding-004:embedContent");
            then.status(503).body("overloaded");
        })
        .await;

    let err = gemini_with_retries(&server, 1, Duration::from_secs(5))
        .embed("rust")
        .await
        .unwrap_err();

    mock.assert_calls_async(2).await;
    assert!(matches!(err, CareerError::Embedding(_)));
    assert!(err.to_string().contains("503"));
}

#[tokio::test]
async fn test_embed_does_not_retry_client_errors() {
    let server = MockServer::start_async().await;
    let mock = server
        .mock_async(|when, then| {
            when.method(POST).path("/models/text-embedding-004:embedContent");
            then.status(400).body("bad request");
        })
        .await;

    let err = gemini_with_retries(&server, 3, Duration::from_secs(5))
        .embed("rust")
        .await
        .unwrap_err();

    mock.assert_calls_async(1).await;
    assert_eq!(err.code(), "embedding");
}

#[tokio::test]
async fn test_generate_makes_a_single_attempt() {
    let server = MockServer::start_async().await;
    let mock = server
        .mock_async(|when, then| {
            when.method(POST).path("/models/gemini-1.5-flash:generateContent");
            then.status(503).body("overloaded");
        })
        .await;

    let err = gemini_with_retries(&server, 3, Duration::from_secs(5))
        .generate("Phrase: rust", PARAMS)
        .await
        .unwrap_err();

    mock.assert_calls_async(1).await;
    assert!(matches!(err, CareerError::Generation(_)));
}

#[tokio::test]
async fn test_embed_timeout_is_reported_as_timeout() {
    let server = MockServer::start_async().await;
    server
        .mock_async(|when, then| {
            when.method(POST).path("/models/text-embedding-004:embedContent");
            then.status(200)
                .delay(Duration::from_secs(3))
                .json_body(json!({"embedding": {"values": [0.1]}}));
        })
        .await;

    let err = gemini_with_retries(&server, 0, Duration::from_secs(1))
        .embed("rust")
        .await
        .unwrap_err();

    match err {
        CareerError::Timeout { operation, seconds } => {
            assert_eq!(operation, "embedContent");
            assert_eq!(seconds, 1);
        }
        other => panic!("expected timeout, got {other:?}"),
    }
}

#[tokio::test]
async fn test_chroma_query_retries_server_errors() {
    let server = MockServer::start_async().await;
    server
        .mock_async(|when, then| {
            when.method(GET).path("/api/v1/collections/career_jobs_collection");
            then.status(200).json_body(json!({"id": "c-9"}));
        })
        .await;
    let query = server
        .mock_async(|when, then| {
            when.method(POST).path("/api/v1/collections/c-9/query");
            then.status(500).body("internal");
        })
        .await;

    let index =
        ChromaIndex::new(&server.base_url(), "career_jobs_collection", Duration::from_secs(5), 2)
            .unwrap();
    let err = index.query(&[0.1], 4).await.unwrap_err();

    query.assert_calls_async(3).await;
    assert_eq!(err.code(), "vector_index");
}
