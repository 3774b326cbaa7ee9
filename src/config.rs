use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};

use crate::error::{CareerError, Result};

const REDACTED: &str = "<redacted>";

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Config {
    #[serde(default)]
    pub gemini: GeminiConfig,
    #[serde(default)]
    pub rewrite: RewriteConfig,
    #[serde(default)]
    pub index: IndexConfig,
    #[serde(default)]
    pub dataset: DatasetConfig,
    #[serde(default)]
    pub search: SearchConfig,
}

impl Config {
    pub fn load(explicit_path: Option<&Path>, project_root: &Path) -> Result<Self> {
        let mut config = Self::default();

        let explicit = explicit_path
            .map(PathBuf::from)
            .or_else(|| std::env::var("CAREERMAP_CONFIG").ok().map(PathBuf::from));

        if let Some(path) = explicit {
            let patch = Self::load_patch(&path)?.ok_or_else(|| {
                CareerError::MissingConfig(format!("config file {} not found", path.display()))
            })?;
            config.merge_patch(patch);
        } else {
            if let Some(global) = Self::load_global()? {
                config.merge_patch(global);
            }
            if let Some(project) = Self::load_project(project_root)? {
                config.merge_patch(project);
            }
        }

        config.apply_env_overrides()?;
        config.validate()?;

        Ok(config)
    }

    /// Parse a config file body without touching the environment.
    pub fn from_toml_str(raw: &str) -> Result<Self> {
        let patch: ConfigPatch =
            toml::from_str(raw).map_err(|err| CareerError::Config(format!("parse config: {err}")))?;
        let mut config = Self::default();
        config.merge_patch(patch);
        config.validate()?;
        Ok(config)
    }

    fn load_global() -> Result<Option<ConfigPatch>> {
        let Some(dir) = dirs::config_dir() else {
            return Ok(None);
        };
        Self::load_patch(&dir.join("careermap/config.toml"))
    }

    fn load_project(project_root: &Path) -> Result<Option<ConfigPatch>> {
        Self::load_patch(&project_root.join("careermap.toml"))
    }

    fn load_patch(path: &Path) -> Result<Option<ConfigPatch>> {
        if !path.exists() {
            return Ok(None);
        }

        let raw = std::fs::read_to_string(path)
            .map_err(|err| CareerError::Config(format!("read config {}: {err}", path.display())))?;
        let patch = toml::from_str(&raw)
            .map_err(|err| CareerError::Config(format!("parse config {}: {err}", path.display())))?;
        Ok(Some(patch))
    }

    fn merge_patch(&mut self, patch: ConfigPatch) {
        if let Some(patch) = patch.gemini {
            self.gemini.merge(patch);
        }
        if let Some(patch) = patch.rewrite {
            self.rewrite.merge(patch);
        }
        if let Some(patch) = patch.index {
            self.index.merge(patch);
        }
        if let Some(patch) = patch.dataset {
            self.dataset.merge(patch);
        }
        if let Some(patch) = patch.search {
            self.search.merge(patch);
        }
    }

    fn apply_env_overrides(&mut self) -> Result<()> {
        if let Some(value) = env_string("GOOGLE_API_KEY") {
            self.gemini.api_key = Some(value);
        }
        if let Some(value) = env_string("CAREERMAP_GEMINI_API_KEY") {
            self.gemini.api_key = Some(value);
        }
        if let Some(value) = env_string("CAREERMAP_GEMINI_BASE_URL") {
            self.gemini.base_url = value;
        }
        if let Some(value) = env_string("CAREERMAP_EMBEDDING_MODEL") {
            self.gemini.embedding_model = value;
        }
        if let Some(value) = env_string("CAREERMAP_GENERATION_MODEL") {
            self.gemini.generation_model = value;
        }
        if let Some(value) = env_u64("CAREERMAP_GEMINI_TIMEOUT_SECS")? {
            self.gemini.timeout_secs = value;
        }
        if let Some(value) = env_u32("CAREERMAP_GEMINI_MAX_RETRIES")? {
            self.gemini.max_retries = value;
        }

        if let Some(value) = env_bool("CAREERMAP_REWRITE_ENABLED") {
            self.rewrite.enabled = value;
        }
        if let Some(value) = env_usize("CAREERMAP_REWRITE_CACHE_CAPACITY")? {
            self.rewrite.cache_capacity = value;
        }
        if let Some(value) = env_u32("CAREERMAP_REWRITE_MAX_OUTPUT_TOKENS")? {
            self.rewrite.max_output_tokens = value;
        }
        if let Some(value) = env_f32("CAREERMAP_REWRITE_TEMPERATURE")? {
            self.rewrite.temperature = value;
        }
        if let Some(value) = env_u64("CAREERMAP_REWRITE_TIMEOUT_SECS")? {
            self.rewrite.timeout_secs = value;
        }

        if let Some(value) = env_string("CAREERMAP_INDEX_ENDPOINT") {
            self.index.endpoint = value;
        }
        if let Some(value) = env_string("CAREERMAP_INDEX_COLLECTION") {
            self.index.collection = value;
        }
        if let Some(value) = env_u64("CAREERMAP_INDEX_TIMEOUT_SECS")? {
            self.index.timeout_secs = value;
        }
        if let Some(value) = env_u32("CAREERMAP_INDEX_MAX_RETRIES")? {
            self.index.max_retries = value;
        }

        if let Some(value) = env_string("CAREERMAP_DATASET_PATH") {
            self.dataset.path = PathBuf::from(value);
        }

        if let Some(value) = env_usize("CAREERMAP_SEARCH_DEFAULT_TOP_K")? {
            self.search.default_top_k = value;
        }
        if let Some(value) = env_usize("CAREERMAP_SEARCH_MAX_TOP_K")? {
            self.search.max_top_k = value;
        }
        if let Some(value) = env_usize("CAREERMAP_SEARCH_OVERSAMPLE_FACTOR")? {
            self.search.oversample_factor = value;
        }
        if let Some(value) = env_usize("CAREERMAP_SEARCH_TOP_SKILLS")? {
            self.search.top_skills = value;
        }

        Ok(())
    }

    fn validate(&self) -> Result<()> {
        if self.rewrite.cache_capacity == 0 {
            return Err(CareerError::Config(
                "rewrite.cache_capacity must be at least 1".to_string(),
            ));
        }
        if self.search.oversample_factor == 0 {
            return Err(CareerError::Config(
                "search.oversample_factor must be at least 1".to_string(),
            ));
        }
        if self.search.max_top_k == 0 {
            return Err(CareerError::Config(
                "search.max_top_k must be at least 1".to_string(),
            ));
        }
        if !(0.0..=2.0).contains(&self.rewrite.temperature) {
            return Err(CareerError::Config(format!(
                "rewrite.temperature {} out of range 0.0..=2.0",
                self.rewrite.temperature
            )));
        }
        Ok(())
    }

    /// Copy of the config that is safe to print.
    #[must_use]
    pub fn redacted(&self) -> Self {
        let mut copy = self.clone();
        if copy.gemini.api_key.is_some() {
            copy.gemini.api_key = Some(REDACTED.to_string());
        }
        copy
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct GeminiConfig {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub api_key: Option<String>,
    #[serde(default)]
    pub base_url: String,
    #[serde(default)]
    pub embedding_model: String,
    #[serde(default)]
    pub generation_model: String,
    #[serde(default)]
    pub timeout_secs: u64,
    #[serde(default)]
    pub max_retries: u32,
}

impl Default for GeminiConfig {
    fn default() -> Self {
        Self {
            api_key: None,
            base_url: "https://generativelanguage.googleapis.com/v1beta".to_string(),
            embedding_model: "text-embedding-004".to_string(),
            generation_model: "gemini-1.5-flash".to_string(),
            timeout_secs: 30,
            max_retries: 3,
        }
    }
}

impl GeminiConfig {
    fn merge(&mut self, patch: GeminiPatch) {
        if let Some(value) = patch.api_key {
            self.api_key = Some(value);
        }
        if let Some(value) = patch.base_url {
            self.base_url = value;
        }
        if let Some(value) = patch.embedding_model {
            self.embedding_model = value;
        }
        if let Some(value) = patch.generation_model {
            self.generation_model = value;
        }
        if let Some(value) = patch.timeout_secs {
            self.timeout_secs = value;
        }
        if let Some(value) = patch.max_retries {
            self.max_retries = value;
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RewriteConfig {
    #[serde(default)]
    pub enabled: bool,
    #[serde(default)]
    pub cache_capacity: usize,
    #[serde(default)]
    pub max_output_tokens: u32,
    #[serde(default)]
    pub temperature: f32,
    #[serde(default)]
    pub timeout_secs: u64,
}

impl Default for RewriteConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            cache_capacity: 1000,
            max_output_tokens: 64,
            temperature: 0.1,
            timeout_secs: 10,
        }
    }
}

impl RewriteConfig {
    fn merge(&mut self, patch: RewritePatch) {
        if let Some(value) = patch.enabled {
            self.enabled = value;
        }
        if let Some(value) = patch.cache_capacity {
            self.cache_capacity = value;
        }
        if let Some(value) = patch.max_output_tokens {
            self.max_output_tokens = value;
        }
        if let Some(value) = patch.temperature {
            self.temperature = value;
        }
        if let Some(value) = patch.timeout_secs {
            self.timeout_secs = value;
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct IndexConfig {
    #[serde(default)]
    pub endpoint: String,
    #[serde(default)]
    pub collection: String,
    #[serde(default)]
    pub timeout_secs: u64,
    #[serde(default)]
    pub max_retries: u32,
}

impl Default for IndexConfig {
    fn default() -> Self {
        Self {
            endpoint: "http://localhost:8000".to_string(),
            collection: "career_jobs_collection".to_string(),
            timeout_secs: 15,
            max_retries: 3,
        }
    }
}

impl IndexConfig {
    fn merge(&mut self, patch: IndexPatch) {
        if let Some(value) = patch.endpoint {
            self.endpoint = value;
        }
        if let Some(value) = patch.collection {
            self.collection = value;
        }
        if let Some(value) = patch.timeout_secs {
            self.timeout_secs = value;
        }
        if let Some(value) = patch.max_retries {
            self.max_retries = value;
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DatasetConfig {
    #[serde(default)]
    pub path: PathBuf,
}

impl Default for DatasetConfig {
    fn default() -> Self {
        Self {
            path: PathBuf::from("data/jobs.json"),
        }
    }
}

impl DatasetConfig {
    fn merge(&mut self, patch: DatasetPatch) {
        if let Some(value) = patch.path {
            self.path = value;
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SearchConfig {
    #[serde(default)]
    pub default_top_k: usize,
    #[serde(default)]
    pub max_top_k: usize,
    #[serde(default)]
    pub oversample_factor: usize,
    #[serde(default)]
    pub top_skills: usize,
}

impl Default for SearchConfig {
    fn default() -> Self {
        Self {
            default_top_k: 5,
            max_top_k: 50,
            oversample_factor: 2,
            top_skills: 10,
        }
    }
}

impl SearchConfig {
    fn merge(&mut self, patch: SearchPatch) {
        if let Some(value) = patch.default_top_k {
            self.default_top_k = value;
        }
        if let Some(value) = patch.max_top_k {
            self.max_top_k = value;
        }
        if let Some(value) = patch.oversample_factor {
            self.oversample_factor = value;
        }
        if let Some(value) = patch.top_skills {
            self.top_skills = value;
        }
    }
}

#[derive(Debug, Clone, Default, Deserialize)]
struct ConfigPatch {
    pub gemini: Option<GeminiPatch>,
    pub rewrite: Option<RewritePatch>,
    pub index: Option<IndexPatch>,
    pub dataset: Option<DatasetPatch>,
    pub search: Option<SearchPatch>,
}

#[derive(Debug, Clone, Default, Deserialize)]
struct GeminiPatch {
    pub api_key: Option<String>,
    pub base_url: Option<String>,
    pub embedding_model: Option<String>,
    pub generation_model: Option<String>,
    pub timeout_secs: Option<u64>,
    pub max_retries: Option<u32>,
}

#[derive(Debug, Clone, Default, Deserialize)]
struct RewritePatch {
    pub enabled: Option<bool>,
    pub cache_capacity: Option<usize>,
    pub max_output_tokens: Option<u32>,
    pub temperature: Option<f32>,
    pub timeout_secs: Option<u64>,
}

#[derive(Debug, Clone, Default, Deserialize)]
struct IndexPatch {
    pub endpoint: Option<String>,
    pub collection: Option<String>,
    pub timeout_secs: Option<u64>,
    pub max_retries: Option<u32>,
}

#[derive(Debug, Clone, Default, Deserialize)]
struct DatasetPatch {
    pub path: Option<PathBuf>,
}

#[derive(Debug, Clone, Default, Deserialize)]
struct SearchPatch {
    pub default_top_k: Option<usize>,
    pub max_top_k: Option<usize>,
    pub oversample_factor: Option<usize>,
    pub top_skills: Option<usize>,
}

fn env_string(key: &str) -> Option<String> {
    std::env::var(key).ok().filter(|value| !value.trim().is_empty())
}

fn env_bool(key: &str) -> Option<bool> {
    std::env::var(key)
        .ok()
        .map(|value| matches!(value.to_lowercase().as_str(), "1" | "true" | "yes" | "on"))
}

fn env_u32(key: &str) -> Result<Option<u32>> {
    match std::env::var(key) {
        Ok(value) => value
            .parse::<u32>()
            .map(Some)
            .map_err(|err| CareerError::Config(format!("invalid {key} value {value}: {err}"))),
        Err(_) => Ok(None),
    }
}

fn env_u64(key: &str) -> Result<Option<u64>> {
    match std::env::var(key) {
        Ok(value) => value
            .parse::<u64>()
            .map(Some)
            .map_err(|err| CareerError::Config(format!("invalid {key} value {value}: {err}"))),
        Err(_) => Ok(None),
    }
}

fn env_usize(key: &str) -> Result<Option<usize>> {
    match std::env::var(key) {
        Ok(value) => value
            .parse::<usize>()
            .map(Some)
            .map_err(|err| CareerError::Config(format!("invalid {key} value {value}: {err}"))),
        Err(_) => Ok(None),
    }
}

fn env_f32(key: &str) -> Result<Option<f32>> {
    match std::env::var(key) {
        Ok(value) => value
            .parse::<f32>()
            .map(Some)
            .map_err(|err| CareerError::Config(format!("invalid {key} value {value}: {err}"))),
        Err(_) => Ok(None),
    }
}
