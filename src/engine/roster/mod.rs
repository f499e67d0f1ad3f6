//! Roster and Coach Assignment
//!
//! Membership sets keyed by owner (program, session or team) and the
//! reconciler that brings the stored set in line with a desired one.

pub mod reconcile;
pub mod store;

pub use reconcile::{dedupe_members, plan_delta, MembershipDelta, ReconcileReport, Reconciler};
pub use store::MembershipStore;

use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// Entity whose membership is being managed
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum OwnerKind {
    /// Coaches of a program
    Program,
    /// Coaches of a session
    Session,
    /// Players of a team roster
    Team,
}

impl OwnerKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            OwnerKind::Program => "program",
            OwnerKind::Session => "session",
            OwnerKind::Team => "team",
        }
    }

    /// What the members of this owner are called
    pub fn member_label(&self) -> &'static str {
        match self {
            OwnerKind::Program | OwnerKind::Session => "coaches",
            OwnerKind::Team => "players",
        }
    }
}

impl fmt::Display for OwnerKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for OwnerKind {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "program" | "programs" => Ok(OwnerKind::Program),
            "session" | "sessions" => Ok(OwnerKind::Session),
            "team" | "teams" => Ok(OwnerKind::Team),
            other => Err(format!("unknown owner kind: {}", other)),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct OwnerRef {
    pub kind: OwnerKind,
    pub id: String,
}

impl OwnerRef {
    pub fn new(kind: OwnerKind, id: impl Into<String>) -> Self {
        Self { kind, id: id.into() }
    }
}

impl fmt::Display for OwnerRef {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}/{}", self.kind, self.id)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_owner_kind_parse() {
        assert_eq!("teams".parse::<OwnerKind>().unwrap(), OwnerKind::Team);
        assert_eq!("Program".parse::<OwnerKind>().unwrap(), OwnerKind::Program);
        assert!("league".parse::<OwnerKind>().is_err());
        assert_eq!(OwnerKind::Session.member_label(), "coaches");
        assert_eq!(OwnerRef::new(OwnerKind::Team, "t1").to_string(), "team/t1");
    }
}
