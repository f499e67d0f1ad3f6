//! Match Scheduling Conflict Detection
//!
//! Pure functions over candidate batches. Output order is deterministic:
//! conflicts follow the first appearance of their slot in the input, and
//! match ids inside a conflict keep their input order.

use chrono::{NaiveDate, NaiveTime, Timelike};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;

use super::AssignmentCandidate;

/// How two candidates on the same field and day are judged to collide
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ConflictPolicy {
    /// Identical (field, date, start time)
    #[default]
    ExactStart,
    /// Overlapping [start, start + duration) on the same field and date
    Interval,
}

/// A set of matches that cannot all be played as proposed
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ConflictRecord {
    pub match_ids: Vec<String>,
    pub reason: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Hash)]
struct SlotKey<'a> {
    field_id: &'a str,
    date: NaiveDate,
    start_time: NaiveTime,
}

/// Flag every (field, date, start time) claimed by more than one match.
pub fn detect_conflicts(candidates: &[AssignmentCandidate]) -> Vec<ConflictRecord> {
    let mut index: HashMap<SlotKey<'_>, usize> = HashMap::new();
    let mut slots: Vec<(SlotKey<'_>, Vec<&str>)> = Vec::new();

    for candidate in candidates {
        let key = SlotKey {
            field_id: &candidate.field_id,
            date: candidate.date,
            start_time: candidate.start_time,
        };
        match index.get(&key) {
            Some(&i) => slots[i].1.push(&candidate.match_id),
            None => {
                index.insert(key.clone(), slots.len());
                slots.push((key, vec![candidate.match_id.as_str()]));
            }
        }
    }

    slots
        .into_iter()
        .filter(|(_, ids)| ids.len() > 1)
        .map(|(key, ids)| ConflictRecord {
            reason: format!(
                "Field {} is double-booked on {} at {}",
                key.field_id,
                key.date,
                format_clock(key.start_time.num_seconds_from_midnight())
            ),
            match_ids: ids.into_iter().map(str::to_string).collect(),
        })
        .collect()
}

/// Flag clusters of matches whose time ranges overlap on the same field and day.
///
/// Candidates without a duration occupy `default_duration` minutes. Touching
/// ranges (one ends exactly when the next starts) do not overlap.
pub fn detect_overlaps(candidates: &[AssignmentCandidate], default_duration: u32) -> Vec<ConflictRecord> {
    let mut index: HashMap<(&str, NaiveDate), usize> = HashMap::new();
    let mut groups: Vec<Vec<usize>> = Vec::new();

    for (position, candidate) in candidates.iter().enumerate() {
        let key = (candidate.field_id.as_str(), candidate.date);
        match index.get(&key) {
            Some(&g) => groups[g].push(position),
            None => {
                index.insert(key, groups.len());
                groups.push(vec![position]);
            }
        }
    }

    let span = |position: usize| {
        let c = &candidates[position];
        (c.start_second(), c.end_second(default_duration))
    };

    // (first input position, record) so clusters can be ordered by first appearance
    let mut found: Vec<(usize, ConflictRecord)> = Vec::new();

    for mut by_start in groups {
        by_start.sort_by_key(|&p| span(p).0);

        let mut cluster: Vec<usize> = Vec::new();
        let mut cluster_end = 0;
        for position in by_start {
            let (start, end) = span(position);
            if !cluster.is_empty() && start >= cluster_end {
                push_cluster(candidates, &mut cluster, cluster_end, &mut found);
            }
            if cluster.is_empty() {
                cluster_end = end;
            } else {
                cluster_end = cluster_end.max(end);
            }
            cluster.push(position);
        }
        push_cluster(candidates, &mut cluster, cluster_end, &mut found);
    }

    found.sort_by_key(|(first, _)| *first);
    found.into_iter().map(|(_, record)| record).collect()
}

fn push_cluster(
    candidates: &[AssignmentCandidate],
    cluster: &mut Vec<usize>,
    cluster_end: u32,
    found: &mut Vec<(usize, ConflictRecord)>,
) {
    if cluster.len() > 1 {
        cluster.sort_unstable();
        let first = &candidates[cluster[0]];
        let start = cluster
            .iter()
            .map(|&p| candidates[p].start_second())
            .min()
            .unwrap_or_default();
        found.push((
            cluster[0],
            ConflictRecord {
                match_ids: cluster.iter().map(|&p| candidates[p].match_id.clone()).collect(),
                reason: format!(
                    "Field {} has overlapping matches on {} between {} and {}",
                    first.field_id,
                    first.date,
                    format_clock(start),
                    format_clock(cluster_end)
                ),
            },
        ));
    }
    cluster.clear();
}

const SECONDS_PER_DAY: u32 = 24 * 60 * 60;

/// "HH:MM", or "HH:MM:SS" when seconds are set; times past midnight are
/// labelled with the following day
fn format_clock(second: u32) -> String {
    let days = second / SECONDS_PER_DAY;
    let of_day = second % SECONDS_PER_DAY;
    let (h, m, s) = (of_day / 3600, of_day / 60 % 60, of_day % 60);

    let mut clock = if s == 0 {
        format!("{:02}:{:02}", h, m)
    } else {
        format!("{:02}:{:02}:{:02}", h, m, s)
    };
    match days {
        0 => {}
        1 => clock.push_str(" next day"),
        n => clock.push_str(&format!(" (+{} days)", n)),
    }
    clock
}

/// Detector configured with a policy and the fallback match length
#[derive(Debug, Clone, Copy)]
pub struct ConflictDetector {
    policy: ConflictPolicy,
    default_duration: u32,
}

impl ConflictDetector {
    pub fn new(policy: ConflictPolicy, default_duration: u32) -> Self {
        Self {
            policy,
            default_duration,
        }
    }

    pub fn policy(&self) -> ConflictPolicy {
        self.policy
    }

    pub fn detect(&self, candidates: &[AssignmentCandidate]) -> Vec<ConflictRecord> {
        match self.policy {
            ConflictPolicy::ExactStart => detect_conflicts(candidates),
            ConflictPolicy::Interval => detect_overlaps(candidates, self.default_duration),
        }
    }
}

impl Default for ConflictDetector {
    fn default() -> Self {
        Self::new(ConflictPolicy::ExactStart, 60)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn candidate(match_id: &str, field: &str, date: &str, time: &str) -> AssignmentCandidate {
        AssignmentCandidate {
            match_id: match_id.to_string(),
            field_id: field.to_string(),
            date: NaiveDate::parse_from_str(date, "%Y-%m-%d").unwrap(),
            start_time: NaiveTime::parse_from_str(time, "%H:%M:%S")
                .or_else(|_| NaiveTime::parse_from_str(time, "%H:%M"))
                .unwrap(),
            duration_minutes: None,
        }
    }

    fn with_duration(mut c: AssignmentCandidate, minutes: u32) -> AssignmentCandidate {
        c.duration_minutes = Some(minutes);
        c
    }

    fn ids(records: &[ConflictRecord]) -> Vec<Vec<&str>> {
        records
            .iter()
            .map(|r| r.match_ids.iter().map(String::as_str).collect())
            .collect()
    }

    #[test]
    fn test_empty_and_single() {
        assert!(detect_conflicts(&[]).is_empty());
        assert!(detect_conflicts(&[candidate("m1", "fieldA", "2024-01-01", "10:00")]).is_empty());
    }

    #[test]
    fn test_same_slot_on_one_field() {
        let batch = vec![
            candidate("m1", "fieldA", "2024-01-01", "10:00"),
            candidate("m2", "fieldA", "2024-01-01", "10:00"),
            candidate("m3", "fieldB", "2024-01-01", "10:00"),
        ];
        let conflicts = detect_conflicts(&batch);
        assert_eq!(ids(&conflicts), vec![vec!["m1", "m2"]]);
        assert_eq!(conflicts[0].reason, "Field fieldA is double-booked on 2024-01-01 at 10:00");
    }

    #[test]
    fn test_distinct_keys_never_conflict() {
        let batch = vec![
            candidate("m1", "fieldA", "2024-01-01", "10:00"),
            candidate("m2", "fieldA", "2024-01-02", "10:00"),
            candidate("m3", "fieldA", "2024-01-01", "11:00"),
            candidate("m4", "fieldB", "2024-01-01", "10:00"),
        ];
        assert!(detect_conflicts(&batch).is_empty());
    }

    #[test]
    fn test_one_record_per_key_with_all_matches() {
        let batch = vec![
            candidate("m1", "fieldA", "2024-01-01", "10:00"),
            candidate("m2", "fieldA", "2024-01-01", "10:00"),
            candidate("m3", "fieldA", "2024-01-01", "10:00"),
            candidate("m4", "fieldA", "2024-01-01", "10:00"),
        ];
        assert_eq!(ids(&detect_conflicts(&batch)), vec![vec!["m1", "m2", "m3", "m4"]]);
    }

    #[test]
    fn test_duration_ignored_by_exact_policy() {
        let batch = vec![
            with_duration(candidate("m1", "fieldA", "2024-01-01", "10:00"), 30),
            with_duration(candidate("m2", "fieldA", "2024-01-01", "10:00"), 90),
            with_duration(candidate("m3", "fieldA", "2024-01-01", "10:15"), 90),
        ];
        assert_eq!(ids(&detect_conflicts(&batch)), vec![vec!["m1", "m2"]]);
    }

    #[test]
    fn test_first_appearance_order() {
        let batch = vec![
            candidate("m1", "fieldB", "2024-01-01", "09:00"),
            candidate("m2", "fieldA", "2024-01-01", "10:00"),
            candidate("m3", "fieldA", "2024-01-01", "10:00"),
            candidate("m4", "fieldB", "2024-01-01", "09:00"),
        ];
        assert_eq!(ids(&detect_conflicts(&batch)), vec![vec!["m1", "m4"], vec!["m2", "m3"]]);

        // Interleaving unrelated entries keeps the same output
        let shuffled = vec![
            candidate("x1", "fieldC", "2024-01-01", "09:00"),
            batch[0].clone(),
            batch[1].clone(),
            candidate("x2", "fieldD", "2024-01-01", "09:00"),
            batch[2].clone(),
            batch[3].clone(),
        ];
        assert_eq!(detect_conflicts(&shuffled), detect_conflicts(&batch));
    }

    #[test]
    fn test_overlap_detection() {
        let batch = vec![
            with_duration(candidate("m1", "fieldA", "2024-01-01", "10:00"), 90),
            candidate("m2", "fieldA", "2024-01-01", "11:00"),
            candidate("m3", "fieldA", "2024-01-01", "12:00"),
            candidate("m4", "fieldB", "2024-01-01", "11:00"),
        ];
        let conflicts = detect_overlaps(&batch, 60);
        // m3 starts exactly when m2 ends
        assert_eq!(ids(&conflicts), vec![vec!["m1", "m2"]]);
        assert_eq!(
            conflicts[0].reason,
            "Field fieldA has overlapping matches on 2024-01-01 between 10:00 and 12:00"
        );
    }

    #[test]
    fn test_overlap_clusters_are_transitive() {
        let batch = vec![
            candidate("m3", "fieldA", "2024-01-01", "11:00"),
            candidate("m1", "fieldA", "2024-01-01", "10:00"),
            candidate("m2", "fieldA", "2024-01-01", "10:30"),
            candidate("m9", "fieldA", "2024-01-01", "15:00"),
        ];
        assert_eq!(ids(&detect_overlaps(&batch, 45)), vec![vec!["m3", "m1", "m2"]]);
    }

    #[test]
    fn test_seconds_keep_slots_apart() {
        let batch = vec![
            candidate("m1", "fieldA", "2024-01-01", "10:00"),
            candidate("m2", "fieldA", "2024-01-01", "10:00:30"),
            candidate("m3", "fieldA", "2024-01-01", "10:00:30"),
        ];
        let conflicts = detect_conflicts(&batch);
        assert_eq!(ids(&conflicts), vec![vec!["m2", "m3"]]);
        assert_eq!(conflicts[0].reason, "Field fieldA is double-booked on 2024-01-01 at 10:00:30");
    }

    #[test]
    fn test_huge_duration_does_not_overflow() {
        let batch = vec![
            with_duration(candidate("m1", "fieldA", "2024-01-01", "10:00"), u32::MAX),
            candidate("m2", "fieldA", "2024-01-01", "11:00"),
        ];
        let conflicts = ConflictDetector::new(ConflictPolicy::Interval, 60).detect(&batch);
        assert_eq!(ids(&conflicts), vec![vec!["m1", "m2"]]);
    }

    #[test]
    fn test_cluster_past_midnight_is_labelled() {
        let batch = vec![
            with_duration(candidate("m1", "fieldA", "2024-01-01", "23:00"), 150),
            candidate("m2", "fieldA", "2024-01-01", "23:30"),
        ];
        let conflicts = detect_overlaps(&batch, 60);
        assert_eq!(
            conflicts[0].reason,
            "Field fieldA has overlapping matches on 2024-01-01 between 23:00 and 01:30 next day"
        );
    }

    #[test]
    fn test_format_clock() {
        assert_eq!(format_clock(10 * 3600), "10:00");
        assert_eq!(format_clock(10 * 3600 + 30), "10:00:30");
        assert_eq!(format_clock(SECONDS_PER_DAY + 90 * 60), "01:30 next day");
        assert_eq!(format_clock(2 * SECONDS_PER_DAY), "00:00 (+2 days)");
    }

    #[test]
    fn test_detector_policy_switch() {
        let batch = vec![
            candidate("m1", "fieldA", "2024-01-01", "10:00"),
            candidate("m2", "fieldA", "2024-01-01", "10:30"),
        ];
        assert!(ConflictDetector::default().detect(&batch).is_empty());
        let interval = ConflictDetector::new(ConflictPolicy::Interval, 60);
        assert_eq!(ids(&interval.detect(&batch)), vec![vec!["m1", "m2"]]);
    }
}
