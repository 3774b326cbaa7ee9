use std::fmt::Write as _;

use console::style;
use serde::Serialize;

use crate::error::Result;
use crate::search::{ResponseStatus, SearchResponse};

const BAR_WIDTH: usize = 24;

pub fn emit_json<T: Serialize>(value: &T) -> Result<()> {
    let payload = serde_json::to_string_pretty(value)?;
    println!("{payload}");
    Ok(())
}

/// One JSON document per line, for batch output.
pub fn emit_json_line<T: Serialize>(value: &T) -> Result<()> {
    let payload = serde_json::to_string(value)?;
    println!("{payload}");
    Ok(())
}

/// Human-readable rendering of a search response.
pub fn render_search(query: &str, response: &SearchResponse) -> String {
    let mut out = String::new();

    if response.status == ResponseStatus::Error {
        let message = response.message.as_deref().unwrap_or("unknown error");
        let _ = writeln!(out, "{} {message}", style("error:").red().bold());
        return out;
    }
    if response.data.is_empty() {
        let _ = writeln!(out, "No jobs found for {}", style(query).bold());
        return out;
    }

    let _ = writeln!(
        out,
        "{} result(s) for {}\n",
        response.data.len(),
        style(query).bold()
    );
    for (rank, job) in response.data.iter().enumerate() {
        let _ = writeln!(
            out,
            "{:>2}. {}  {}",
            rank + 1,
            style(&job.title).cyan().bold(),
            style(format!("(distance {:.4})", job.match_score)).dim()
        );
        let _ = writeln!(out, "    {} · {} · {}", job.location, job.display_salary, job.experience_level);
        if !job.skills.is_empty() {
            let _ = writeln!(out, "    skills: {}", job.skills);
        }
        if !job.url.is_empty() {
            let _ = writeln!(out, "    {}", style(&job.url).underlined());
        }
    }

    if let Some(skills) = response.skills_chart_data.as_deref().filter(|s| !s.is_empty()) {
        let _ = writeln!(out, "\n{}", style("Top skills").bold());
        let max = skills.iter().map(|s| s.count).max().unwrap_or(1);
        let width = skills.iter().map(|s| s.skill.chars().count()).max().unwrap_or(0);
        for entry in skills {
            let _ = writeln!(
                out,
                "  {:<width$}  {} {}",
                entry.skill,
                bar(entry.count, max),
                entry.count
            );
        }
    }

    if let Some(salaries) = response.salary_chart_data.as_deref().filter(|s| !s.is_empty()) {
        let _ = writeln!(out, "\n{}", style("Average salary by location").bold());
        let width = salaries
            .iter()
            .map(|s| s.location.chars().count())
            .max()
            .unwrap_or(0);
        for entry in salaries {
            let _ = writeln!(out, "  {:<width$}  ${}", entry.location, entry.average_salary);
        }
    }

    out
}

fn bar(value: usize, max: usize) -> String {
    let filled = if max == 0 { 0 } else { (value * BAR_WIDTH).div_ceil(max) };
    "█".repeat(filled.min(BAR_WIDTH))
}
