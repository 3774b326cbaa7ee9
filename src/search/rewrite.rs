//! Query enhancement: raw user phrase → IT-domain keyword string.

use std::time::Duration;

use tracing::{debug, warn};

use crate::clients::{GenerationParams, TextGenerator};
use crate::config::RewriteConfig;
use crate::error::{CareerError, Result};
use crate::search::cache::{Lookup, RewriteCache};

const PROMPT_TEMPLATE: &str = "You are a search assistant for an IT job board. \
Extract the IT-domain keywords from the user's phrase and expand them with closely \
related technologies, roles and skills. If the phrase is a greeting or contains no \
IT-related content, return the phrase exactly as given. Reply with a single line of \
comma-separated keywords only, with no explanation.\n\nPhrase: ";

/// Build the instruction sent to the generative model.
pub fn build_prompt(raw_query: &str) -> String {
    format!("{PROMPT_TEMPLATE}{raw_query}")
}

/// Result of a rewrite attempt. Every variant carries a usable query.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RewriteOutcome {
    /// Served from the cache.
    Cached(String),
    /// Freshly produced by the model.
    Rewritten(String),
    /// The model failed; the raw query is used as-is.
    Fallback { query: String, reason: String },
    /// Rewriting is turned off.
    Disabled(String),
}

impl RewriteOutcome {
    pub fn query(&self) -> &str {
        match self {
            Self::Cached(query)
            | Self::Rewritten(query)
            | Self::Disabled(query)
            | Self::Fallback { query, .. } => query,
        }
    }

    pub const fn is_fallback(&self) -> bool {
        matches!(self, Self::Fallback { .. })
    }

    pub const fn label(&self) -> &'static str {
        match self {
            Self::Cached(_) => "cached",
            Self::Rewritten(_) => "rewritten",
            Self::Fallback { .. } => "fallback",
            Self::Disabled(_) => "disabled",
        }
    }
}

/// Memoized query rewriter backed by a generative model.
pub struct QueryRewriter<G> {
    generator: G,
    cache: RewriteCache,
    params: GenerationParams,
    timeout: Duration,
}

impl<G: TextGenerator> QueryRewriter<G> {
    pub fn new(generator: G, cache: RewriteCache, params: GenerationParams, timeout: Duration) -> Self {
        Self {
            generator,
            cache,
            params,
            timeout,
        }
    }

    pub fn from_config(generator: G, config: &RewriteConfig) -> Self {
        Self::new(
            generator,
            RewriteCache::new(config.cache_capacity),
            GenerationParams {
                max_output_tokens: config.max_output_tokens,
                temperature: config.temperature,
            },
            Duration::from_secs(config.timeout_secs.max(1)),
        )
    }

    pub const fn cache(&self) -> &RewriteCache {
        &self.cache
    }

    /// Rewrite `raw_query`. Never fails: errors become [`RewriteOutcome::Fallback`].
    pub async fn rewrite(&self, raw_query: &str) -> RewriteOutcome {
        match self
            .cache
            .get_or_compute(raw_query, || self.compute(raw_query))
            .await
        {
            Ok(Lookup::Hit(query)) => {
                debug!(rewritten = %query, "rewrite cache hit");
                RewriteOutcome::Cached(query)
            }
            Ok(Lookup::Computed(query)) => {
                debug!(rewritten = %query, "query rewritten");
                RewriteOutcome::Rewritten(query)
            }
            Err(reason) => {
                warn!(error = %reason, "query rewrite failed, using raw query");
                RewriteOutcome::Fallback {
                    query: raw_query.to_string(),
                    reason,
                }
            }
        }
    }

    async fn compute(&self, raw_query: &str) -> Result<String> {
        let prompt = build_prompt(raw_query);
        let generated = tokio::time::timeout(
            self.timeout,
            self.generator.generate(&prompt, self.params),
        )
        .await
        .map_err(|_| CareerError::Timeout {
            operation: "query rewrite",
            seconds: self.timeout.as_secs(),
        })??;

        let text = generated
            .ok_or_else(|| CareerError::Generation("model returned no candidate".to_string()))?;
        let cleaned = clean_keywords(&text);
        if cleaned.is_empty() {
            return Err(CareerError::Generation(
                "model returned a blank rewrite".to_string(),
            ));
        }
        Ok(cleaned)
    }
}

/// Collapse model output to a single keyword line.
///
/// List bullets and trailing commas are dropped from each line before the
/// lines are joined, so a bulleted or comma-terminated list reads the same
/// as an inline one.
fn clean_keywords(text: &str) -> String {
    let unwrapped = text
        .trim()
        .trim_matches(|c| matches!(c, '"' | '\'' | '`'))
        .trim();
    unwrapped
        .lines()
        .map(|line| {
            line.trim()
                .trim_start_matches(['-', '*', '•'])
                .trim()
                .trim_matches(',')
                .trim()
        })
        .filter(|line| !line.is_empty())
        .collect::<Vec<_>>()
        .join(", ")
}
