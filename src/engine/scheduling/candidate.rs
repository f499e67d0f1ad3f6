//! Assignment candidates and request intake

use chrono::{NaiveDate, NaiveTime, Timelike};
use serde::{Deserialize, Serialize};
use std::collections::HashSet;

use crate::engine::database::{DATE_FORMAT, TIME_FORMAT};
use crate::engine::error::{LeagueError, Result};

/// A proposed placement of a match onto a field at a date and start time
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AssignmentCandidate {
    pub match_id: String,
    pub field_id: String,
    pub date: NaiveDate,
    pub start_time: NaiveTime,
    #[serde(rename = "duration", default, skip_serializing_if = "Option::is_none")]
    pub duration_minutes: Option<u32>,
}

/// Longest match a candidate may declare, in minutes
pub const MAX_DURATION_MINUTES: u32 = 24 * 60;

impl AssignmentCandidate {
    /// Seconds since midnight of the start time
    pub fn start_second(&self) -> u32 {
        self.start_time.num_seconds_from_midnight()
    }

    /// Seconds since midnight at which the match ends; may run past midnight
    pub fn end_second(&self, default_duration: u32) -> u32 {
        let minutes = self.duration_minutes.unwrap_or(default_duration);
        self.start_second().saturating_add(minutes.saturating_mul(60))
    }
}

/// Raw assignment item as submitted by a caller; every field may be missing
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AssignmentRequest {
    #[serde(default)]
    pub match_id: Option<String>,
    #[serde(default)]
    pub field_id: Option<String>,
    #[serde(default)]
    pub date: Option<String>,
    #[serde(default)]
    pub start_time: Option<String>,
    #[serde(default)]
    pub duration: Option<u32>,
}

impl AssignmentRequest {
    fn label(&self, index: usize) -> String {
        match present(&self.match_id) {
            Some(id) => id.to_string(),
            None => format!("#{}", index),
        }
    }

    fn is_complete(&self) -> bool {
        present(&self.match_id).is_some()
            && present(&self.field_id).is_some()
            && present(&self.date).is_some()
            && present(&self.start_time).is_some()
    }
}

fn present(value: &Option<String>) -> Option<&str> {
    value.as_deref().map(str::trim).filter(|v| !v.is_empty())
}

pub fn parse_date(raw: &str) -> Result<NaiveDate> {
    NaiveDate::parse_from_str(raw.trim(), DATE_FORMAT)
        .map_err(|_| LeagueError::invalid(format!("invalid date '{}', expected YYYY-MM-DD", raw)))
}

pub fn parse_time(raw: &str) -> Result<NaiveTime> {
    let raw = raw.trim();
    NaiveTime::parse_from_str(raw, "%H:%M")
        .or_else(|_| NaiveTime::parse_from_str(raw, TIME_FORMAT))
        .map_err(|_| LeagueError::invalid(format!("invalid start time '{}', expected HH:MM", raw)))
}

/// Turn raw request items into checked candidates.
///
/// Incomplete items reject the whole batch, naming every incomplete item by
/// match id (or by position when the id itself is missing).
pub fn parse_candidates(requests: &[AssignmentRequest]) -> Result<Vec<AssignmentCandidate>> {
    let incomplete: Vec<String> = requests
        .iter()
        .enumerate()
        .filter(|(_, r)| !r.is_complete())
        .map(|(i, r)| r.label(i))
        .collect();
    if !incomplete.is_empty() {
        return Err(LeagueError::invalid(format!(
            "incomplete assignments (matchId, fieldId, date and startTime are required): {}",
            incomplete.join(", ")
        )));
    }

    let mut seen = HashSet::new();
    let mut candidates = Vec::with_capacity(requests.len());
    for request in requests {
        // Completeness checked above
        let match_id = present(&request.match_id).unwrap_or_default().to_string();
        let field_id = present(&request.field_id).unwrap_or_default().to_string();
        let date = parse_date(present(&request.date).unwrap_or_default())?;
        let start_time = parse_time(present(&request.start_time).unwrap_or_default())?;

        match request.duration {
            Some(0) => {
                return Err(LeagueError::invalid(format!(
                    "match {} has a zero duration",
                    match_id
                )));
            }
            Some(minutes) if minutes > MAX_DURATION_MINUTES => {
                return Err(LeagueError::invalid(format!(
                    "match {} lasts {} minutes; at most {} are allowed",
                    match_id, minutes, MAX_DURATION_MINUTES
                )));
            }
            _ => {}
        }
        if !seen.insert(match_id.clone()) {
            return Err(LeagueError::invalid(format!(
                "match {} appears more than once",
                match_id
            )));
        }

        candidates.push(AssignmentCandidate {
            match_id,
            field_id,
            date,
            start_time,
            duration_minutes: request.duration,
        });
    }

    Ok(candidates)
}
