//! Request-level search flow.
//!
//! rewrite → embed → retrieve (oversampled) → enrich → aggregate → truncate.
//! Upstream failures are turned into an in-band error response here and
//! never escape as `Err`.

use std::sync::Arc;
use std::time::Instant;

use serde::{Deserialize, Serialize};
use tracing::{Instrument, error, info, info_span};

use crate::clients::{Embedder, TextGenerator, VectorIndex};
use crate::config::SearchConfig;
use crate::dataset::RecordStore;
use crate::error::Result;
use crate::search::aggregate::{LocationSalary, SkillCount, aggregate};
use crate::search::enrich::{EnrichedJob, enrich};
use crate::search::retriever::VectorRetriever;
use crate::search::rewrite::{QueryRewriter, RewriteOutcome};

/// Message used when nothing matched.
pub const NOT_FOUND_MESSAGE: &str = "not found";

/// Inbound search request.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SearchRequest {
    pub query: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub top_k: Option<usize>,
}

impl SearchRequest {
    pub fn new(query: impl Into<String>, top_k: Option<usize>) -> Self {
        Self {
            query: query.into(),
            top_k,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum ResponseStatus {
    Success,
    Error,
}

/// Outbound response; failures are reported in-band.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct SearchResponse {
    pub status: ResponseStatus,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub message: Option<String>,
    pub data: Vec<EnrichedJob>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub skills_chart_data: Option<Vec<SkillCount>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub salary_chart_data: Option<Vec<LocationSalary>>,
}

impl SearchResponse {
    pub fn success(
        data: Vec<EnrichedJob>,
        skills: Vec<SkillCount>,
        salaries: Vec<LocationSalary>,
    ) -> Self {
        Self {
            status: ResponseStatus::Success,
            message: None,
            data,
            skills_chart_data: Some(skills),
            salary_chart_data: Some(salaries),
        }
    }

    pub fn not_found() -> Self {
        Self {
            status: ResponseStatus::Success,
            message: Some(NOT_FOUND_MESSAGE.to_string()),
            data: Vec::new(),
            skills_chart_data: None,
            salary_chart_data: None,
        }
    }

    pub fn error(message: impl Into<String>) -> Self {
        Self {
            status: ResponseStatus::Error,
            message: Some(message.into()),
            data: Vec::new(),
            skills_chart_data: None,
            salary_chart_data: None,
        }
    }

    pub fn is_success(&self) -> bool {
        self.status == ResponseStatus::Success
    }
}

/// Limits applied to every request.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SearchOptions {
    pub default_top_k: usize,
    pub max_top_k: usize,
    pub top_skills: usize,
}

impl From<&SearchConfig> for SearchOptions {
    fn from(config: &SearchConfig) -> Self {
        Self {
            default_top_k: config.default_top_k,
            max_top_k: config.max_top_k,
            top_skills: config.top_skills,
        }
    }
}

impl Default for SearchOptions {
    fn default() -> Self {
        Self::from(&SearchConfig::default())
    }
}

/// The full job search pipeline.
pub struct SearchPipeline<G, E, V> {
    rewriter: Option<QueryRewriter<G>>,
    embedder: E,
    retriever: VectorRetriever<V>,
    store: Arc<RecordStore>,
    options: SearchOptions,
}

impl<G, E, V> SearchPipeline<G, E, V>
where
    G: TextGenerator,
    E: Embedder,
    V: VectorIndex,
{
    pub fn new(
        rewriter: Option<QueryRewriter<G>>,
        embedder: E,
        retriever: VectorRetriever<V>,
        store: Arc<RecordStore>,
        options: SearchOptions,
    ) -> Self {
        Self {
            rewriter,
            embedder,
            retriever,
            store,
            options,
        }
    }

    pub const fn rewriter(&self) -> Option<&QueryRewriter<G>> {
        self.rewriter.as_ref()
    }

    /// Number of results to display for a requested `top_k`.
    pub fn resolve_top_k(&self, requested: Option<usize>) -> usize {
        requested
            .unwrap_or(self.options.default_top_k)
            .clamp(1, self.options.max_top_k.max(1))
    }

    /// Run one search. Never fails; errors become an error response.
    pub async fn search(&self, request: &SearchRequest) -> SearchResponse {
        let span = info_span!("search", query = %request.query);
        async {
            let started = Instant::now();
            match self.try_search(request).await {
                Ok(response) => {
                    info!(
                        results = response.data.len(),
                        elapsed_ms = u64::try_from(started.elapsed().as_millis()).unwrap_or(u64::MAX),
                        "search finished"
                    );
                    response
                }
                Err(err) => {
                    error!(error = %err, code = err.code(), "search failed");
                    SearchResponse::error(err.to_string())
                }
            }
        }
        .instrument(span)
        .await
    }

    async fn try_search(&self, request: &SearchRequest) -> Result<SearchResponse> {
        if request.query.trim().is_empty() {
            return Ok(SearchResponse::error("query must not be empty"));
        }
        let top_k = self.resolve_top_k(request.top_k);

        let rewrite = self.rewrite(&request.query).await;
        info!(outcome = rewrite.label(), rewritten = %rewrite.query(), "query prepared");

        let embedding = self.embedder.embed(rewrite.query()).await?;
        let hits = self.retriever.retrieve(&embedding, top_k).await?;
        if hits.is_empty() {
            return Ok(SearchResponse::not_found());
        }

        let mut jobs = enrich(&hits, &self.store);
        if jobs.is_empty() {
            return Ok(SearchResponse::not_found());
        }

        // Charts see the whole oversampled batch, the list only top_k.
        let charts = aggregate(&jobs, self.options.top_skills);
        jobs.truncate(top_k);
        Ok(SearchResponse::success(jobs, charts.skills, charts.salaries))
    }

    async fn rewrite(&self, raw_query: &str) -> RewriteOutcome {
        match &self.rewriter {
            Some(rewriter) => rewriter.rewrite(raw_query).await,
            None => RewriteOutcome::Disabled(raw_query.to_string()),
        }
    }
}
