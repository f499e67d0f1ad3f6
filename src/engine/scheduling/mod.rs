//! Match Scheduling
//!
//! Intake of proposed field/time placements, conflict detection, and the
//! service that persists clean batches.

pub mod candidate;
pub mod conflicts;
pub mod service;

pub use candidate::{parse_candidates, parse_date, AssignmentCandidate, AssignmentRequest};
pub use conflicts::{detect_conflicts, detect_overlaps, ConflictDetector, ConflictPolicy, ConflictRecord};
pub use service::{ScheduleOutcome, ScheduleService};
