use std::path::PathBuf;
use std::sync::Arc;

use tracing::info;

use crate::clients::{ChromaIndex, GeminiClient};
use crate::config::Config;
use crate::dataset::RecordStore;
use crate::error::Result;
use crate::search::{QueryRewriter, SearchOptions, SearchPipeline, VectorRetriever};

/// Pipeline wired to the production collaborators.
pub type JobSearch = SearchPipeline<GeminiClient, GeminiClient, ChromaIndex>;

pub struct AppContext {
    pub project_root: PathBuf,
    pub config: Config,
    pub robot_mode: bool,
    pub verbosity: u8,
}

impl AppContext {
    pub fn from_cli(cli: &crate::cli::Cli) -> Result<Self> {
        let project_root = std::env::current_dir()?;
        let config = Config::load(cli.config.as_deref(), &project_root)?;

        Ok(Self {
            project_root,
            config,
            robot_mode: cli.robot,
            verbosity: cli.verbose,
        })
    }

    /// Load the dataset and connect the remote clients.
    pub fn build_search(&self) -> Result<Arc<JobSearch>> {
        let dataset_path = self.resolve(&self.config.dataset.path);
        let store = Arc::new(RecordStore::load(&dataset_path)?);

        let gemini = GeminiClient::from_config(&self.config.gemini)?;
        let index = ChromaIndex::from_config(&self.config.index)?;

        let rewriter = self
            .config
            .rewrite
            .enabled
            .then(|| QueryRewriter::from_config(gemini.clone(), &self.config.rewrite));
        info!(
            rewrite = rewriter.is_some(),
            collection = %self.config.index.collection,
            "search pipeline ready"
        );

        Ok(Arc::new(SearchPipeline::new(
            rewriter,
            gemini,
            VectorRetriever::new(index, self.config.search.oversample_factor),
            store,
            SearchOptions::from(&self.config.search),
        )))
    }

    fn resolve(&self, path: &std::path::Path) -> PathBuf {
        if path.is_absolute() {
            path.to_path_buf()
        } else {
            self.project_root.join(path)
        }
    }
}
