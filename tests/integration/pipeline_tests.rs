use std::sync::Arc;

use careermap::dataset::JobRecord;
use careermap::search::{ResponseStatus, SearchRequest};
use careermap::test_utils::fixtures::{
    StubEmbedder, StubGenerator, StubIndex, job_record, stub_pipeline,
};
use serde_json::{Value, json};

/// `count` index rows `job-0..`, each tagged with a skill and a salary.
fn ranked_rows(count: usize) -> Vec<(String, f64, Value)> {
    (0..count)
        .map(|i| {
            (
                format!("job-{i}"),
                0.1 + i as f64 * 0.01,
                json!({
                    "skills": format!("Rust, Skill{i}"),
                    "estimated_min": 1000 + i * 100,
                    "estimated_max": 2000 + i * 100,
                }),
            )
        })
        .collect()
}

fn index_from(rows: &[(String, f64, Value)]) -> Arc<StubIndex> {
    Arc::new(StubIndex::with_rows(
        rows.iter()
            .map(|(id, distance, metadata)| (id.as_str(), *distance, metadata.clone()))
            .collect(),
    ))
}

fn records(count: usize) -> Vec<JobRecord> {
    (0..count)
        .map(|i| job_record(&format!("job-{i}"), &format!("Engineer {i}"), "Ha Noi"))
        .collect()
}

#[tokio::test]
async fn test_oversamples_and_truncates_to_top_k() {
    let generator = Arc::new(StubGenerator::replying("Rust, Backend"));
    let embedder = Arc::new(StubEmbedder::new());
    let index = index_from(&ranked_rows(20));
    let pipeline = stub_pipeline(&generator, &embedder, &index, records(20));

    let response = pipeline.search(&SearchRequest::new("backend", Some(5))).await;

    assert_eq!(index.requested(), vec![10]);
    assert_eq!(response.status, ResponseStatus::Success);
    let ids: Vec<&str> = response.data.iter().map(|job| job.job_id.as_str()).collect();
    assert_eq!(ids, vec!["job-0", "job-1", "job-2", "job-3", "job-4"]);

    // Charts cover the whole oversampled batch.
    let skills = response.skills_chart_data.unwrap();
    assert_eq!(skills[0].skill, "Rust");
    assert_eq!(skills[0].count, 10);
}

#[tokio::test]
async fn test_six_of_ten_candidates_survive() {
    let generator = Arc::new(StubGenerator::replying("Rust"));
    let embedder = Arc::new(StubEmbedder::new());
    let index = index_from(&ranked_rows(10));
    let mut dataset = records(10);
    // job-1 and job-3 lose their titles, job-5 and job-7 are missing entirely.
    dataset[1].title = Some("nan".to_string());
    dataset[3].title = None;
    dataset.retain(|record| record.job_id != "job-5" && record.job_id != "job-7");
    let pipeline = stub_pipeline(&generator, &embedder, &index, dataset);

    let response = pipeline.search(&SearchRequest::new("rust", Some(5))).await;

    let ids: Vec<&str> = response.data.iter().map(|job| job.job_id.as_str()).collect();
    assert_eq!(ids, vec!["job-0", "job-2", "job-4", "job-6", "job-8"]);
    let skills = response.skills_chart_data.unwrap();
    assert_eq!(skills[0].count, 6);
    let salaries = response.salary_chart_data.unwrap();
    assert_eq!(salaries.len(), 1);
    assert_eq!(salaries[0].location, "Ha Noi");
}

#[tokio::test]
async fn test_zero_matches_is_not_found() {
    let generator = Arc::new(StubGenerator::replying("Rust"));
    let embedder = Arc::new(StubEmbedder::new());
    let index = Arc::new(StubIndex::default());
    let pipeline = stub_pipeline(&generator, &embedder, &index, records(3));

    let response = pipeline.search(&SearchRequest::new("rust", None)).await;

    let value = serde_json::to_value(&response).unwrap();
    assert_eq!(
        value,
        json!({"status": "success", "message": "not found", "data": []})
    );
}

#[tokio::test]
async fn test_all_candidates_filtered_is_not_found() {
    let generator = Arc::new(StubGenerator::replying("Rust"));
    let embedder = Arc::new(StubEmbedder::new());
    let index = index_from(&ranked_rows(4));
    let pipeline = stub_pipeline(&generator, &embedder, &index, Vec::new());

    let response = pipeline.search(&SearchRequest::new("rust", Some(2))).await;

    assert!(response.is_success());
    assert_eq!(response.message.as_deref(), Some("not found"));
    assert!(response.data.is_empty());
    assert!(response.skills_chart_data.is_none());
}

#[tokio::test]
async fn test_embedding_failure_is_reported_in_band() {
    let generator = Arc::new(StubGenerator::replying("Rust"));
    let embedder = Arc::new(StubEmbedder::failing());
    let index = index_from(&ranked_rows(4));
    let pipeline = stub_pipeline(&generator, &embedder, &index, records(4));

    let response = pipeline.search(&SearchRequest::new("rust", None)).await;

    assert_eq!(response.status, ResponseStatus::Error);
    assert!(response.message.unwrap().contains("embedding failed"));
    assert!(response.data.is_empty());
    assert!(index.requested().is_empty());
}

#[tokio::test]
async fn test_index_failure_is_reported_in_band() {
    let generator = Arc::new(StubGenerator::replying("Rust"));
    let embedder = Arc::new(StubEmbedder::new());
    let index = Arc::new(StubIndex::failing());
    let pipeline = stub_pipeline(&generator, &embedder, &index, records(4));

    let response = pipeline.search(&SearchRequest::new("rust", None)).await;

    assert_eq!(response.status, ResponseStatus::Error);
    assert!(response.message.unwrap().contains("vector index"));
}

#[tokio::test]
async fn test_empty_query_is_rejected_before_any_remote_call() {
    let generator = Arc::new(StubGenerator::replying("Rust"));
    let embedder = Arc::new(StubEmbedder::new());
    let index = index_from(&ranked_rows(4));
    let pipeline = stub_pipeline(&generator, &embedder, &index, records(4));

    let response = pipeline.search(&SearchRequest::new("   ", None)).await;

    assert_eq!(response.status, ResponseStatus::Error);
    assert_eq!(generator.calls(), 0);
    assert!(embedder.inputs().is_empty());
}

#[tokio::test]
async fn test_rewritten_keywords_are_embedded() {
    let generator = Arc::new(StubGenerator::replying("\"Rust, Backend\"\nMicroservices"));
    let embedder = Arc::new(StubEmbedder::new());
    let index = index_from(&ranked_rows(2));
    let pipeline = stub_pipeline(&generator, &embedder, &index, records(2));

    pipeline.search(&SearchRequest::new("làm backend", None)).await;

    assert_eq!(embedder.inputs(), vec!["Rust, Backend, Microservices"]);
    assert!(generator.prompts()[0].ends_with("làm backend"));
}

#[tokio::test]
async fn test_rewrite_failure_falls_back_to_raw_query() {
    for generator in [StubGenerator::failing(), StubGenerator::silent()] {
        let generator = Arc::new(generator);
        let embedder = Arc::new(StubEmbedder::new());
        let index = index_from(&ranked_rows(2));
        let pipeline = stub_pipeline(&generator, &embedder, &index, records(2));

        let response = pipeline.search(&SearchRequest::new("hello there", None)).await;

        assert!(response.is_success());
        assert_eq!(embedder.inputs(), vec!["hello there"]);
        // Failures are not memoized.
        assert!(pipeline.rewriter().unwrap().cache().is_empty());
    }
}

#[tokio::test]
async fn test_repeated_query_rewrites_once() {
    let generator = Arc::new(StubGenerator::replying("Rust"));
    let embedder = Arc::new(StubEmbedder::new());
    let index = index_from(&ranked_rows(2));
    let pipeline = stub_pipeline(&generator, &embedder, &index, records(2));
    let request = SearchRequest::new("rust dev", None);

    let (a, b, c) = tokio::join!(
        pipeline.search(&request),
        pipeline.search(&request),
        pipeline.search(&request)
    );
    pipeline.search(&request).await;

    assert!(a.is_success() && b.is_success() && c.is_success());
    assert_eq!(generator.calls(), 1);
    assert_eq!(embedder.inputs(), vec!["Rust"; 4]);
    let stats = pipeline.rewriter().unwrap().cache().stats();
    assert_eq!(stats.misses, 1);
    assert_eq!(stats.hits, 3);
}

#[tokio::test]
async fn test_top_k_is_clamped() {
    let generator = Arc::new(StubGenerator::replying("Rust"));
    let embedder = Arc::new(StubEmbedder::new());
    let index = index_from(&ranked_rows(3));
    let pipeline = stub_pipeline(&generator, &embedder, &index, records(3));

    let response = pipeline.search(&SearchRequest::new("rust", Some(0))).await;
    assert_eq!(response.data.len(), 1);
    pipeline.search(&SearchRequest::new("rust", Some(10_000))).await;
    pipeline.search(&SearchRequest::new("rust", None)).await;

    assert_eq!(index.requested(), vec![2, 100, 10]);
}

#[tokio::test]
async fn test_result_fields_use_placeholders() {
    let generator = Arc::new(StubGenerator::replying("Rust"));
    let embedder = Arc::new(StubEmbedder::new());
    let index = Arc::new(StubIndex::with_rows(vec![(
        "bare",
        0.5,
        json!({"salary_original": "NaN", "experience_level": ""}),
    )]));
    let mut record = job_record("bare", "Tester", "");
    record.location = None;
    let pipeline = stub_pipeline(&generator, &embedder, &index, vec![record]);

    let response = pipeline.search(&SearchRequest::new("qa", None)).await;

    let job = &response.data[0];
    assert_eq!(job.display_salary, "Negotiable");
    assert_eq!(job.location, "Negotiable");
    assert_eq!(job.experience_level, "Not specified");
    assert_eq!(job.skills, "");
    assert_eq!(response.salary_chart_data, Some(Vec::new()));
}

#[tokio::test]
async fn test_short_batch_is_not_padded() {
    let generator = Arc::new(StubGenerator::replying("Rust"));
    let embedder = Arc::new(StubEmbedder::new());
    let index = index_from(&ranked_rows(10));
    let pipeline = stub_pipeline(&generator, &embedder, &index, records(3));

    let response = pipeline.search(&SearchRequest::new("rust", Some(5))).await;

    assert_eq!(response.data.len(), 3);
    assert_eq!(response.skills_chart_data.unwrap()[0].count, 3);
}
