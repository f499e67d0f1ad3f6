//! CLI Output Formatting Module
//! Provides consistent, colorized output for terminal UX

use colored::Colorize;

use crate::engine::scheduling::{AssignmentCandidate, ConflictRecord};

pub struct CliFormatter;

impl CliFormatter {
    /// Print a success message
    pub fn success(message: &str) {
        println!("{} {}", "✓".green().bold(), message);
    }

    /// Print an error message
    pub fn error(message: &str) {
        eprintln!("{} {}", "✗".red().bold(), message);
    }

    /// Print a warning message
    pub fn warning(message: &str) {
        println!("{} {}", "⚠".yellow().bold(), message);
    }

    /// Print an info message
    pub fn info(message: &str) {
        println!("{} {}", "ℹ".blue().bold(), message);
    }

    /// Print a section header
    pub fn header(title: &str) {
        println!("\n{}", title.bright_cyan().bold());
        println!("{}", "─".repeat(title.len()).bright_black());
    }

    /// Print a key-value pair
    pub fn kv(key: &str, value: &str) {
        println!("  {}: {}", key.bright_white().bold(), value);
    }

    /// Print a list item
    pub fn item(text: &str) {
        println!("  {} {}", "•".bright_black(), text);
    }

    /// Print a table header
    pub fn table_header(columns: &[&str]) {
        let header = columns
            .iter()
            .map(|c| c.bright_white().bold().to_string())
            .collect::<Vec<_>>()
            .join(" │ ");
        println!("  {}", header);
        println!("  {}", "─".repeat(columns.iter().map(|c| c.len() + 3).sum::<usize>()).bright_black());
    }

    /// Print a table row
    pub fn table_row(values: &[&str]) {
        println!("  {}", values.join(" │ "));
    }

    /// Print each conflict with its matches
    pub fn conflicts(conflicts: &[ConflictRecord]) {
        for conflict in conflicts {
            println!("  {} {}", "✗".red().bold(), conflict.reason);
            println!("    {}", conflict_matches(conflict).bright_black());
        }
    }

    /// Print stored assignments as a table
    pub fn assignments(assignments: &[AssignmentCandidate], default_duration: u32) {
        Self::table_header(&["Match", "Field", "Date", "Start", "Length"]);
        for a in assignments {
            let date = a.date.to_string();
            let start = a.start_time.format("%H:%M").to_string();
            let length = format_length(a.duration_minutes, default_duration);
            Self::table_row(&[&a.match_id, &a.field_id, &date, &start, &length]);
        }
    }
}

/// "matches: m1, m2"
pub fn conflict_matches(conflict: &ConflictRecord) -> String {
    format!("matches: {}", conflict.match_ids.join(", "))
}

/// Match length with the configured fallback marked
pub fn format_length(duration: Option<u32>, default_duration: u32) -> String {
    match duration {
        Some(minutes) => format!("{}m", minutes),
        None => format!("{}m (default)", default_duration),
    }
}

/// "1 coach" / "3 coaches"
pub fn count_label(count: usize, singular: &str, plural: &str) -> String {
    if count == 1 {
        format!("{} {}", count, singular)
    } else {
        format!("{} {}", count, plural)
    }
}
