//! careermap search - Search jobs for a free-text query

use clap::Args;

use crate::app::AppContext;
use crate::cli::output::{emit_json, render_search};
use crate::error::Result;
use crate::search::SearchRequest;

#[derive(Args, Debug)]
pub struct SearchArgs {
    /// Search query
    pub query: String,

    /// Number of jobs to return (defaults to search.default_top_k)
    #[arg(long, short = 'k')]
    pub top_k: Option<usize>,
}

pub async fn run(ctx: &AppContext, args: &SearchArgs) -> Result<()> {
    let search = ctx.build_search()?;
    let request = SearchRequest::new(args.query.clone(), args.top_k);
    let response = search.search(&request).await;

    if ctx.robot_mode {
        emit_json(&response)
    } else {
        print!("{}", render_search(&args.query, &response));
        Ok(())
    }
}
