//! Job search engine.
//!
//! Query rewriting with an LRU memo, embedding, oversampled vector
//! retrieval, enrichment against the raw dataset, and chart aggregates.

pub mod aggregate;
pub mod cache;
pub mod enrich;
pub mod pipeline;
pub mod retriever;
pub mod rewrite;

pub use aggregate::{ChartData, LocationSalary, SkillCount, aggregate};
pub use cache::{CacheStats, RewriteCache};
pub use enrich::{EnrichedJob, enrich};
pub use pipeline::{ResponseStatus, SearchOptions, SearchPipeline, SearchRequest, SearchResponse};
pub use retriever::{MatchMetadata, VectorMatch, VectorRetriever};
pub use rewrite::{QueryRewriter, RewriteOutcome};
