//! Chart aggregates over an enriched batch.
//!
//! Both accumulators are single-pass and keep first-seen order, which is
//! the tie-break for equal counts and equal averages.

use std::collections::HashMap;

use serde::Serialize;

use crate::search::enrich::{EnrichedJob, NEGOTIABLE};

/// Number of skills shown in the skills chart.
pub const DEFAULT_TOP_SKILLS: usize = 10;

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct SkillCount {
    pub skill: String,
    pub count: usize,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct LocationSalary {
    pub location: String,
    pub average_salary: i64,
}

/// Both chart series for one response.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ChartData {
    pub skills: Vec<SkillCount>,
    pub salaries: Vec<LocationSalary>,
}

/// Counts comma-separated skills, exact-case after trimming.
#[derive(Debug, Default)]
pub struct SkillCounter {
    positions: HashMap<String, usize>,
    counts: Vec<SkillCount>,
}

impl SkillCounter {
    pub fn new() -> Self {
        Self::default()
    }

    /// Add every skill in a comma-separated list.
    pub fn add_list(&mut self, skills: &str) {
        for token in skills.split(',').map(str::trim).filter(|token| !token.is_empty()) {
            self.add(token);
        }
    }

    fn add(&mut self, skill: &str) {
        if let Some(&position) = self.positions.get(skill) {
            self.counts[position].count += 1;
        } else {
            self.positions.insert(skill.to_string(), self.counts.len());
            self.counts.push(SkillCount {
                skill: skill.to_string(),
                count: 1,
            });
        }
    }

    /// The `n` most frequent skills; ties keep first-seen order.
    pub fn top(self, n: usize) -> Vec<SkillCount> {
        let mut counts = self.counts;
        counts.sort_by(|a, b| b.count.cmp(&a.count));
        counts.truncate(n);
        counts
    }
}

/// First segment of a location: up to the first comma, then the first hyphen.
pub fn location_key(location: &str) -> &str {
    let head = location.split(',').next().unwrap_or_default();
    let key = head.split('-').next().unwrap_or_default().trim();
    if key.is_empty() { NEGOTIABLE } else { key }
}

#[derive(Debug, Default)]
struct Bucket {
    sum: f64,
    count: u32,
}

/// Running mean salary per location bucket.
#[derive(Debug, Default)]
pub struct SalaryByLocation {
    positions: HashMap<String, usize>,
    buckets: Vec<(String, Bucket)>,
}

impl SalaryByLocation {
    pub fn new() -> Self {
        Self::default()
    }

    /// Record one job's average salary. Non-positive amounts are ignored.
    pub fn add(&mut self, location: &str, average: f64) {
        if !(average.is_finite() && average > 0.0) {
            return;
        }
        let key = location_key(location);
        let position = if let Some(&position) = self.positions.get(key) {
            position
        } else {
            self.positions.insert(key.to_string(), self.buckets.len());
            self.buckets.push((key.to_string(), Bucket::default()));
            self.buckets.len() - 1
        };
        let bucket = &mut self.buckets[position].1;
        bucket.sum += average;
        bucket.count += 1;
    }

    /// Rounded means, highest first; ties keep first-seen order.
    #[allow(clippy::cast_possible_truncation)]
    pub fn finish(self) -> Vec<LocationSalary> {
        let mut out: Vec<LocationSalary> = self
            .buckets
            .into_iter()
            .map(|(location, bucket)| LocationSalary {
                location,
                average_salary: (bucket.sum / f64::from(bucket.count)).round() as i64,
            })
            .collect();
        out.sort_by(|a, b| b.average_salary.cmp(&a.average_salary));
        out
    }
}

/// Compute both chart series over `jobs`.
pub fn aggregate(jobs: &[EnrichedJob], top_skills: usize) -> ChartData {
    let mut skills = SkillCounter::new();
    let mut salaries = SalaryByLocation::new();
    for job in jobs {
        skills.add_list(&job.skills);
        if let Some(average) = job.salary_average {
            salaries.add(&job.location, average);
        }
    }
    ChartData {
        skills: skills.top(top_skills),
        salaries: salaries.finish(),
    }
}
