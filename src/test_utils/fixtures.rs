//! In-process stand-ins for the remote collaborators, plus dataset files.

use std::path::PathBuf;
use std::sync::Arc;
use std::sync::atomic::{AtomicUsize, Ordering};

use parking_lot::Mutex;
use serde_json::Value;
use tempfile::TempDir;

use crate::clients::{Embedder, GenerationParams, IndexQueryResult, TextGenerator, VectorIndex};
use crate::dataset::{JobRecord, RecordStore};
use crate::error::{CareerError, Result};
use crate::search::{
    QueryRewriter, RewriteCache, SearchOptions, SearchPipeline, VectorRetriever,
};

/// Generator that always answers the same way and counts calls.
#[derive(Debug, Default)]
pub struct StubGenerator {
    reply: Option<String>,
    fail: bool,
    calls: AtomicUsize,
    prompts: Mutex<Vec<String>>,
}

impl StubGenerator {
    pub fn replying(text: &str) -> Self {
        Self {
            reply: Some(text.to_string()),
            ..Self::default()
        }
    }

    /// Generator whose output is empty, as with a safety-filtered answer.
    pub fn silent() -> Self {
        Self::default()
    }

    pub fn failing() -> Self {
        Self {
            fail: true,
            ..Self::default()
        }
    }

    pub fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }

    pub fn prompts(&self) -> Vec<String> {
        self.prompts.lock().clone()
    }
}

impl TextGenerator for Arc<StubGenerator> {
    async fn generate(&self, prompt: &str, _params: GenerationParams) -> Result<Option<String>> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        self.prompts.lock().push(prompt.to_string());
        if self.fail {
            return Err(CareerError::Generation("stub generator failure".to_string()));
        }
        Ok(self.reply.clone())
    }
}

/// Embedder returning a fixed vector and remembering its inputs.
#[derive(Debug, Default)]
pub struct StubEmbedder {
    fail: bool,
    inputs: Mutex<Vec<String>>,
}

impl StubEmbedder {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn failing() -> Self {
        Self {
            fail: true,
            ..Self::default()
        }
    }

    pub fn inputs(&self) -> Vec<String> {
        self.inputs.lock().clone()
    }
}

impl Embedder for Arc<StubEmbedder> {
    async fn embed(&self, text: &str) -> Result<Vec<f32>> {
        self.inputs.lock().push(text.to_string());
        if self.fail {
            return Err(CareerError::Embedding("stub embedder failure".to_string()));
        }
        Ok(vec![0.25, 0.5, 0.25])
    }
}

/// Index that serves a canned neighbor list, truncated to `n_results`.
#[derive(Debug, Default)]
pub struct StubIndex {
    rows: Vec<(String, f64, Value)>,
    fail: bool,
    requested: Mutex<Vec<usize>>,
}

impl StubIndex {
    /// Rows are `(id, distance, metadata object)`.
    pub fn with_rows(rows: Vec<(&str, f64, Value)>) -> Self {
        Self {
            rows: rows
                .into_iter()
                .map(|(id, distance, metadata)| (id.to_string(), distance, metadata))
                .collect(),
            ..Self::default()
        }
    }

    pub fn failing() -> Self {
        Self {
            fail: true,
            ..Self::default()
        }
    }

    pub fn requested(&self) -> Vec<usize> {
        self.requested.lock().clone()
    }
}

impl VectorIndex for Arc<StubIndex> {
    async fn query(&self, _embedding: &[f32], n_results: usize) -> Result<IndexQueryResult> {
        self.requested.lock().push(n_results);
        if self.fail {
            return Err(CareerError::VectorIndex("stub index failure".to_string()));
        }
        let rows = self.rows.iter().take(n_results);
        Ok(IndexQueryResult {
            ids: rows.clone().map(|(id, _, _)| id.clone()).collect(),
            distances: rows.clone().map(|(_, distance, _)| *distance).collect(),
            metadatas: rows
                .map(|(_, _, metadata)| Some(metadata.as_object().cloned().unwrap_or_default()))
                .collect(),
        })
    }
}

pub type StubPipeline = SearchPipeline<Arc<StubGenerator>, Arc<StubEmbedder>, Arc<StubIndex>>;

/// Assemble a pipeline over stubs with default options and a rewrite cache.
pub fn stub_pipeline(
    generator: &Arc<StubGenerator>,
    embedder: &Arc<StubEmbedder>,
    index: &Arc<StubIndex>,
    records: Vec<JobRecord>,
) -> StubPipeline {
    let rewriter = QueryRewriter::new(
        Arc::clone(generator),
        RewriteCache::new(16),
        GenerationParams {
            max_output_tokens: 64,
            temperature: 0.0,
        },
        std::time::Duration::from_secs(1),
    );
    SearchPipeline::new(
        Some(rewriter),
        Arc::clone(embedder),
        VectorRetriever::new(Arc::clone(index), 2),
        Arc::new(RecordStore::from_records(records)),
        SearchOptions::default(),
    )
}

/// Shorthand for a dataset record.
pub fn job_record(id: &str, title: &str, location: &str) -> JobRecord {
    JobRecord {
        job_id: id.to_string(),
        title: Some(title.to_string()),
        description: Some(format!("{title} role")),
        url: Some(format!("https://jobs.example/{id}")),
        location: Some(location.to_string()),
    }
}

/// Temporary directory holding a dataset file.
pub struct DatasetFixture {
    pub temp_dir: TempDir,
    pub path: PathBuf,
}

impl DatasetFixture {
    /// Write `records` as JSON lines into a fresh temp directory.
    pub fn jsonl(records: &[JobRecord]) -> Result<Self> {
        let temp_dir = TempDir::new()?;
        let path = temp_dir.path().join("jobs.jsonl");
        let mut body = String::new();
        for record in records {
            body.push_str(&serde_json::to_string(record)?);
            body.push('\n');
        }
        std::fs::write(&path, body)?;
        Ok(Self { temp_dir, path })
    }
}
