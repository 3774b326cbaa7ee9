//! careermap batch - Answer JSON-lines search requests
//!
//! Each input line is a `{"query": ..., "top_k": ...}` object. Requests run
//! concurrently against one shared pipeline; responses are written as JSON
//! lines in input order. A malformed line yields an error response for that
//! line only.

use std::path::PathBuf;
use std::sync::Arc;

use clap::Args;
use tokio::sync::Semaphore;
use tracing::{debug, info};

use crate::app::AppContext;
use crate::cli::output::emit_json_line;
use crate::error::{CareerError, Result};
use crate::search::{SearchRequest, SearchResponse};

#[derive(Args, Debug)]
pub struct BatchArgs {
    /// File with one JSON request per line (reads stdin when omitted)
    #[arg(long, short)]
    pub input: Option<PathBuf>,

    /// Maximum number of requests in flight
    #[arg(long, default_value = "4")]
    pub concurrency: usize,
}

/// Parse one input line into a request.
pub fn parse_request(line: &str) -> std::result::Result<SearchRequest, String> {
    serde_json::from_str(line).map_err(|err| format!("invalid request: {err}"))
}

pub async fn run(ctx: &AppContext, args: &BatchArgs) -> Result<()> {
    let raw = read_input(args.input.clone()).await?;
    let search = ctx.build_search()?;
    let permits = Arc::new(Semaphore::new(args.concurrency.max(1)));

    let mut handles = Vec::new();
    for (line_no, line) in raw.lines().enumerate() {
        let line = line.trim();
        if line.is_empty() {
            continue;
        }
        let request = parse_request(line);
        let search = Arc::clone(&search);
        let permits = Arc::clone(&permits);
        handles.push(tokio::spawn(async move {
            let request = match request {
                Ok(request) => request,
                Err(message) => {
                    debug!(line = line_no + 1, %message, "skipping malformed request");
                    return SearchResponse::error(message);
                }
            };
            let Ok(_permit) = permits.acquire_owned().await else {
                return SearchResponse::error("batch runner shut down");
            };
            search.search(&request).await
        }));
    }

    info!(requests = handles.len(), "batch submitted");
    for handle in handles {
        let response = handle
            .await
            .unwrap_or_else(|err| SearchResponse::error(format!("request task failed: {err}")));
        emit_json_line(&response)?;
    }
    Ok(())
}

async fn read_input(path: Option<PathBuf>) -> Result<String> {
    match path {
        Some(path) => tokio::fs::read_to_string(&path).await.map_err(|err| {
            CareerError::Config(format!("read batch input {}: {err}", path.display()))
        }),
        None => tokio::task::spawn_blocking(|| std::io::read_to_string(std::io::stdin()))
            .await
            .map_err(|err| CareerError::Config(format!("stdin reader failed: {err}")))?
            .map_err(CareerError::from),
    }
}
