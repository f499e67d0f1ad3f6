//! Schedule Service
//!
//! Runs the conflict detector over a batch together with the persisted
//! assignments it could collide with, and writes the batch when it is clean.

use chrono::NaiveDate;
use serde::Serialize;
use std::collections::HashSet;
use tracing::{debug, info, warn};

use super::{AssignmentCandidate, ConflictDetector, ConflictRecord};
use crate::engine::database::Database;
use crate::engine::error::{LeagueError, Result};

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "status", rename_all = "camelCase")]
pub enum ScheduleOutcome {
    Applied { applied: usize },
    Rejected { conflicts: Vec<ConflictRecord> },
}

pub struct ScheduleService<'a> {
    db: &'a Database,
    detector: ConflictDetector,
}

impl<'a> ScheduleService<'a> {
    pub fn new(db: &'a Database, detector: ConflictDetector) -> Self {
        Self { db, detector }
    }

    /// Conflicts within the batch and against other matches already on the
    /// same fields and days. A match in the batch replaces its own stored slot.
    pub fn check(&self, batch: &[AssignmentCandidate]) -> Result<Vec<ConflictRecord>> {
        let in_batch: HashSet<&str> = batch.iter().map(|c| c.match_id.as_str()).collect();
        let mut slots: Vec<(&str, NaiveDate)> = Vec::new();
        for c in batch {
            if !slots.contains(&(c.field_id.as_str(), c.date)) {
                slots.push((c.field_id.as_str(), c.date));
            }
        }

        let mut combined = batch.to_vec();
        for (field_id, date) in slots {
            let stored = self.db.get_assignments_for_slot(field_id, date)?;
            combined.extend(
                stored
                    .into_iter()
                    .filter(|s| !in_batch.contains(s.match_id.as_str())),
            );
        }

        debug!(
            batch = batch.len(),
            stored = combined.len() - batch.len(),
            policy = ?self.detector.policy(),
            "checking schedule"
        );
        Ok(self.detector.detect(&combined))
    }

    /// Persist the batch unless it conflicts; nothing is written on conflict.
    pub fn apply(&self, batch: &[AssignmentCandidate]) -> Result<ScheduleOutcome> {
        let conflicts = self.check(batch)?;
        if !conflicts.is_empty() {
            warn!(conflicts = conflicts.len(), "schedule rejected");
            return Ok(ScheduleOutcome::Rejected { conflicts });
        }

        let applied = self.db.upsert_assignments(batch)?;
        info!(applied, "schedule applied");
        Ok(ScheduleOutcome::Applied { applied })
    }

    pub fn list(&self, date: Option<NaiveDate>, field_id: Option<&str>) -> Result<Vec<AssignmentCandidate>> {
        Ok(self.db.list_assignments(date, field_id)?)
    }

    pub fn unassign(&self, match_id: &str) -> Result<()> {
        if self.db.delete_assignment(match_id)? == 0 {
            return Err(LeagueError::NotFound(format!("no assignment for match {}", match_id)));
        }
        info!(match_id, "match unassigned");
        Ok(())
    }
}
