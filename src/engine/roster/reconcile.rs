//! Membership Reconciliation
//!
//! Diff a desired member list against the stored one and apply the delta:
//! removals first, then additions. Repeating a call with the same desired
//! list changes nothing.

use serde::Serialize;
use serde_json::Value;
use std::collections::HashSet;
use tracing::{debug, info};

use super::{MembershipStore, OwnerKind, OwnerRef};
use crate::engine::error::{LeagueError, Result};

/// Add/remove sets between a stored and a desired membership
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct MembershipDelta {
    pub to_add: Vec<String>,
    pub to_remove: Vec<String>,
    pub unchanged: usize,
}

impl MembershipDelta {
    pub fn is_empty(&self) -> bool {
        self.to_add.is_empty() && self.to_remove.is_empty()
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ReconcileReport {
    pub owner_kind: OwnerKind,
    pub owner_id: String,
    pub added: Vec<String>,
    pub removed: Vec<String>,
    pub unchanged: usize,
}

/// Drop repeated ids, keeping the first occurrence of each.
pub fn dedupe_members(members: &[String]) -> Vec<String> {
    let mut seen = HashSet::with_capacity(members.len());
    members
        .iter()
        .filter(|m| seen.insert(m.as_str()))
        .cloned()
        .collect()
}

/// Compute the delta from `current` to `desired`. Both must be duplicate-free.
/// Removals keep stored order, additions keep desired order.
pub fn plan_delta(current: &[String], desired: &[String]) -> MembershipDelta {
    let current_set: HashSet<&str> = current.iter().map(String::as_str).collect();
    let desired_set: HashSet<&str> = desired.iter().map(String::as_str).collect();

    let to_remove: Vec<String> = current
        .iter()
        .filter(|m| !desired_set.contains(m.as_str()))
        .cloned()
        .collect();
    let to_add: Vec<String> = desired
        .iter()
        .filter(|m| !current_set.contains(m.as_str()))
        .cloned()
        .collect();

    MembershipDelta {
        unchanged: current.len() - to_remove.len(),
        to_add,
        to_remove,
    }
}

/// Read a desired member list from a JSON value; only arrays of ids are accepted.
pub fn members_from_json(value: &Value) -> Result<Vec<String>> {
    let items = value
        .as_array()
        .ok_or_else(|| LeagueError::invalid("memberIds must be a list"))?;

    items
        .iter()
        .map(|item| match item {
            Value::String(s) => Ok(s.clone()),
            Value::Number(n) if n.is_i64() || n.is_u64() => Ok(n.to_string()),
            other => Err(LeagueError::invalid(format!("invalid member id: {}", other))),
        })
        .collect()
}

pub struct Reconciler<'a, S: MembershipStore + ?Sized> {
    store: &'a S,
}

impl<'a, S: MembershipStore + ?Sized> Reconciler<'a, S> {
    pub fn new(store: &'a S) -> Self {
        Self { store }
    }

    /// Make the stored membership of `owner` equal the deduplicated `desired` list.
    ///
    /// A store failure aborts the remaining steps. A removal batch that already
    /// went through is not rolled back when the following insert fails.
    pub fn reconcile(&self, owner: &OwnerRef, desired: &[String]) -> Result<ReconcileReport> {
        if owner.id.trim().is_empty() {
            return Err(LeagueError::invalid("ownerId is required"));
        }
        if desired.iter().any(|m| m.trim().is_empty()) {
            return Err(LeagueError::invalid("member ids must not be blank"));
        }

        let desired = dedupe_members(desired);
        let current = self.store.fetch_members(owner)?;
        let delta = plan_delta(&current, &desired);
        debug!(
            owner = %owner,
            current = current.len(),
            desired = desired.len(),
            add = delta.to_add.len(),
            remove = delta.to_remove.len(),
            "planned membership delta"
        );

        if !delta.to_remove.is_empty() {
            self.store.delete_members(owner, &delta.to_remove)?;
        }
        if !delta.to_add.is_empty() {
            self.store.upsert_members(owner, &delta.to_add)?;
        }

        if !delta.is_empty() {
            info!(
                owner = %owner,
                added = delta.to_add.len(),
                removed = delta.to_remove.len(),
                "{} reconciled",
                owner.kind.member_label()
            );
        }

        Ok(ReconcileReport {
            owner_kind: owner.kind,
            owner_id: owner.id.clone(),
            added: delta.to_add,
            removed: delta.to_remove,
            unchanged: delta.unchanged,
        })
    }

    pub fn members(&self, owner: &OwnerRef) -> Result<Vec<String>> {
        if owner.id.trim().is_empty() {
            return Err(LeagueError::invalid("ownerId is required"));
        }
        Ok(self.store.fetch_members(owner)?)
    }
}
