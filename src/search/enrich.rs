//! Join retrieval hits with full job records and shape the public result.
//!
//! Records without a usable title are dropped, never shown with placeholder
//! text. Location and salary are normalized here so the aggregates and the
//! display list agree on the same values.

use serde::Serialize;
use tracing::debug;

use crate::dataset::{JobRecord, RecordStore};
use crate::search::retriever::VectorMatch;

/// Placeholder for unknown location or salary.
pub const NEGOTIABLE: &str = "Negotiable";

/// Placeholder for a missing experience level.
pub const UNSPECIFIED_EXPERIENCE: &str = "Not specified";

/// Values that dataset exports use for "no value".
const MISSING_SENTINELS: [&str; 4] = ["nan", "none", "null", "n/a"];

/// Public result unit.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct EnrichedJob {
    pub job_id: String,
    pub match_score: f64,
    #[serde(rename = "salary")]
    pub display_salary: String,
    pub experience_level: String,
    pub skills: String,
    pub title: String,
    pub description: String,
    pub url: String,
    pub location: String,
    /// Numeric salary used by the location chart; `None` when only free text exists.
    #[serde(skip)]
    pub salary_average: Option<f64>,
}

/// Display text plus the numeric average, when one can be derived.
#[derive(Debug, Clone, PartialEq)]
pub struct SalaryInfo {
    pub display: String,
    pub average: Option<f64>,
}

/// True when `value` carries no information.
pub fn is_missing(value: &str) -> bool {
    let trimmed = value.trim();
    trimmed.is_empty()
        || MISSING_SENTINELS
            .iter()
            .any(|sentinel| trimmed.eq_ignore_ascii_case(sentinel))
}

fn present(value: Option<&str>) -> Option<&str> {
    value.map(str::trim).filter(|text| !is_missing(text))
}

fn positive(value: Option<f64>) -> Option<f64> {
    value.filter(|amount| *amount > 0.0)
}

/// Trimmed title, or `None` when the record must be excluded.
pub fn usable_title(raw: Option<&str>) -> Option<&str> {
    present(raw)
}

pub fn normalize_location(raw: Option<&str>) -> String {
    present(raw).unwrap_or(NEGOTIABLE).to_string()
}

/// Format a salary from the index metadata.
///
/// Both bounds → range with their mean; only a minimum → open range with
/// the minimum; otherwise the original free text with no average.
pub fn format_salary(min: Option<f64>, max: Option<f64>, original: Option<&str>) -> SalaryInfo {
    match (positive(min), positive(max)) {
        (Some(min), Some(max)) => SalaryInfo {
            display: format!("${min} - ${max} / năm"),
            average: Some((min + max) / 2.0),
        },
        (Some(min), None) => SalaryInfo {
            display: format!("Từ ${min} / năm"),
            average: Some(min),
        },
        _ => SalaryInfo {
            display: present(original).unwrap_or(NEGOTIABLE).to_string(),
            average: None,
        },
    }
}

/// Round a distance to four decimals for display.
pub fn match_score(distance: f64) -> f64 {
    (distance * 10_000.0).round() / 10_000.0
}

/// Enrich one hit, or `None` if it has no usable title.
pub fn enrich_match(hit: &VectorMatch, record: Option<&JobRecord>) -> Option<EnrichedJob> {
    let Some(record) = record else {
        debug!(job_id = %hit.id, "no dataset record for hit, skipping");
        return None;
    };
    let Some(title) = usable_title(record.title.as_deref()) else {
        debug!(job_id = %hit.id, "record has no usable title, skipping");
        return None;
    };

    let metadata = &hit.metadata;
    let salary = format_salary(
        metadata.estimated_min(),
        metadata.estimated_max(),
        metadata.salary_original().as_deref(),
    );

    Some(EnrichedJob {
        job_id: hit.id.clone(),
        match_score: match_score(hit.distance),
        display_salary: salary.display,
        experience_level: present(metadata.experience_level().as_deref())
            .unwrap_or(UNSPECIFIED_EXPERIENCE)
            .to_string(),
        skills: present(metadata.skills().as_deref())
            .unwrap_or_default()
            .to_string(),
        title: title.to_string(),
        description: present(record.description.as_deref())
            .unwrap_or_default()
            .to_string(),
        url: present(record.url.as_deref()).unwrap_or_default().to_string(),
        location: normalize_location(record.location.as_deref()),
        salary_average: salary.average,
    })
}

/// Enrich every hit in retrieval order, dropping title-less records.
pub fn enrich(hits: &[VectorMatch], store: &RecordStore) -> Vec<EnrichedJob> {
    let jobs: Vec<EnrichedJob> = hits
        .iter()
        .filter_map(|hit| enrich_match(hit, store.get(&hit.id)))
        .collect();
    debug!(candidates = hits.len(), kept = jobs.len(), "enriched candidates");
    jobs
}
