//! careermap - semantic job search.
//!
//! A free-text query is rewritten into IT-domain keywords (memoized),
//! embedded, matched against a vector index, joined with the raw job
//! dataset, and summarized into skill and salary charts.

pub mod app;
pub mod cli;
pub mod clients;
pub mod config;
pub mod dataset;
pub mod error;
pub mod search;
pub mod test_utils;

pub use error::{CareerError, Result};
