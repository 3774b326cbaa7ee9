//! Raw job record store.
//!
//! The dataset is read once at startup into an immutable map keyed by job
//! id. Both JSON arrays and JSON-lines files are accepted. Older exports
//! name the key `id` instead of `job_id`, and the link `job_url` instead of
//! `url`; both spellings are tolerated.

use std::collections::HashMap;
use std::path::Path;

use serde::{Deserialize, Deserializer, Serialize};
use serde_json::Value;
use tracing::{debug, info, warn};

use crate::error::{CareerError, Result};

/// A full job record from the raw dataset.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct JobRecord {
    #[serde(alias = "id", deserialize_with = "string_like")]
    pub job_id: String,
    #[serde(default, deserialize_with = "optional_text")]
    pub title: Option<String>,
    #[serde(default, deserialize_with = "optional_text")]
    pub description: Option<String>,
    #[serde(default, alias = "job_url", deserialize_with = "optional_text")]
    pub url: Option<String>,
    #[serde(default, deserialize_with = "optional_text")]
    pub location: Option<String>,
}

/// Immutable id → record map, shared by every request.
#[derive(Debug, Default)]
pub struct RecordStore {
    records: HashMap<String, JobRecord>,
}

impl RecordStore {
    /// Load the dataset file at `path`.
    pub fn load(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        let raw = std::fs::read_to_string(path).map_err(|err| {
            CareerError::Dataset(format!("read dataset {}: {err}", path.display()))
        })?;
        let records = parse_records(&raw)
            .map_err(|err| CareerError::Dataset(format!("parse dataset {}: {err}", path.display())))?;
        let store = Self::from_records(records);
        info!(path = %path.display(), records = store.len(), "loaded job dataset");
        Ok(store)
    }

    /// Build a store from already-parsed records. Later duplicates win.
    pub fn from_records(records: impl IntoIterator<Item = JobRecord>) -> Self {
        let mut map = HashMap::new();
        for record in records {
            let key = record.job_id.trim().to_string();
            if key.is_empty() {
                debug!("skipping dataset record with empty job id");
                continue;
            }
            if map.insert(key.clone(), record).is_some() {
                warn!(job_id = %key, "duplicate job id in dataset, keeping last");
            }
        }
        Self { records: map }
    }

    pub fn get(&self, job_id: &str) -> Option<&JobRecord> {
        self.records.get(job_id)
    }

    pub fn len(&self) -> usize {
        self.records.len()
    }

    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }
}

fn parse_records(raw: &str) -> std::result::Result<Vec<JobRecord>, serde_json::Error> {
    let trimmed = raw.trim_start();
    if trimmed.starts_with('[') {
        return serde_json::from_str(trimmed);
    }
    trimmed
        .lines()
        .map(str::trim)
        .filter(|line| !line.is_empty())
        .map(serde_json::from_str)
        .collect()
}

// Ids are sometimes exported as numbers.
fn string_like<'de, D>(deserializer: D) -> std::result::Result<String, D::Error>
where
    D: Deserializer<'de>,
{
    match Value::deserialize(deserializer)? {
        Value::String(text) => Ok(text),
        Value::Number(number) => Ok(number.to_string()),
        other => Err(serde::de::Error::custom(format!(
            "expected string or number id, got {other}"
        ))),
    }
}

fn optional_text<'de, D>(deserializer: D) -> std::result::Result<Option<String>, D::Error>
where
    D: Deserializer<'de>,
{
    Ok(match Value::deserialize(deserializer)? {
        Value::String(text) => Some(text),
        Value::Number(number) => Some(number.to_string()),
        Value::Bool(flag) => Some(flag.to_string()),
        _ => None,
    })
}
