//! Chroma vector index over its REST API.

use std::time::Duration;

use reqwest::Client;
use reqwest::header::{CONTENT_TYPE, HeaderMap, HeaderValue};
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use tokio::sync::OnceCell;
use tracing::{debug, info};

use crate::clients::{IndexQueryResult, VectorIndex, send_with_retry};
use crate::config::IndexConfig;
use crate::error::{CareerError, Result};

/// Client for one Chroma collection.
///
/// The collection id is looked up by name on first use and then reused.
pub struct ChromaIndex {
    client: Client,
    endpoint: String,
    collection: String,
    collection_id: OnceCell<String>,
    timeout: Duration,
    max_retries: u32,
}

impl ChromaIndex {
    pub fn new(
        endpoint: &str,
        collection: &str,
        timeout: Duration,
        max_retries: u32,
    ) -> Result<Self> {
        if !(endpoint.starts_with("http://") || endpoint.starts_with("https://")) {
            return Err(CareerError::Config(format!(
                "index.endpoint must be an http(s) URL, got {endpoint}"
            )));
        }
        if collection.trim().is_empty() {
            return Err(CareerError::Config(
                "index.collection is empty".to_string(),
            ));
        }

        let mut headers = HeaderMap::new();
        headers.insert(CONTENT_TYPE, HeaderValue::from_static("application/json"));
        let timeout = timeout.max(Duration::from_secs(1));
        let client = Client::builder()
            .timeout(timeout)
            .default_headers(headers)
            .build()
            .map_err(|err| CareerError::Config(format!("chroma http client: {err}")))?;

        Ok(Self {
            client,
            endpoint: endpoint.trim_end_matches('/').to_string(),
            collection: collection.trim().to_string(),
            collection_id: OnceCell::new(),
            timeout,
            max_retries,
        })
    }

    pub fn from_config(config: &IndexConfig) -> Result<Self> {
        Self::new(
            &config.endpoint,
            &config.collection,
            Duration::from_secs(config.timeout_secs),
            config.max_retries,
        )
    }

    async fn collection_id(&self) -> Result<&str> {
        let id = self
            .collection_id
            .get_or_try_init(|| self.resolve_collection_id())
            .await?;
        Ok(id.as_str())
    }

    async fn resolve_collection_id(&self) -> Result<String> {
        let url = format!(
            "{}/api/v1/collections/{}",
            self.endpoint,
            urlencoding::encode(&self.collection)
        );
        let response = send_with_retry(
            || self.client.get(&url),
            "get collection",
            self.max_retries,
            self.timeout,
            CareerError::VectorIndex,
        )
        .await?;
        let collection: CollectionResponse = response
            .json()
            .await
            .map_err(|err| CareerError::VectorIndex(format!("parse collection response: {err}")))?;
        info!(collection = %self.collection, id = %collection.id, "resolved vector collection");
        Ok(collection.id)
    }
}

impl VectorIndex for ChromaIndex {
    async fn query(&self, embedding: &[f32], n_results: usize) -> Result<IndexQueryResult> {
        let id = self.collection_id().await?;
        let url = format!(
            "{}/api/v1/collections/{}/query",
            self.endpoint,
            urlencoding::encode(id)
        );
        let request = QueryRequest {
            query_embeddings: [embedding],
            n_results,
            include: ["metadatas", "distances"],
        };

        let response = send_with_retry(
            || self.client.post(&url).json(&request),
            "query collection",
            self.max_retries,
            self.timeout,
            CareerError::VectorIndex,
        )
        .await?;
        let payload: QueryResponse = response
            .json()
            .await
            .map_err(|err| CareerError::VectorIndex(format!("parse query response: {err}")))?;

        let result = payload.into_first_row();
        debug!(returned = result.ids.len(), requested = n_results, "vector query done");
        Ok(result)
    }
}

#[derive(Debug, Deserialize)]
struct CollectionResponse {
    id: String,
}

#[derive(Serialize)]
struct QueryRequest<'a> {
    query_embeddings: [&'a [f32]; 1],
    n_results: usize,
    include: [&'static str; 2],
}

/// Chroma answers with one row per query embedding.
#[derive(Debug, Default, Deserialize)]
struct QueryResponse {
    #[serde(default)]
    ids: Vec<Vec<String>>,
    #[serde(default)]
    distances: Option<Vec<Vec<f64>>>,
    #[serde(default)]
    metadatas: Option<Vec<Vec<Option<Map<String, Value>>>>>,
}

impl QueryResponse {
    fn into_first_row(self) -> IndexQueryResult {
        IndexQueryResult {
            ids: self.ids.into_iter().next().unwrap_or_default(),
            distances: self
                .distances
                .and_then(|rows| rows.into_iter().next())
                .unwrap_or_default(),
            metadatas: self
                .metadatas
                .and_then(|rows| rows.into_iter().next())
                .unwrap_or_default(),
        }
    }
}
