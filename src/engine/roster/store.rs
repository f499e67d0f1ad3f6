//! Membership persistence seam

use super::OwnerRef;
use crate::engine::database::{Database, DatabaseError};

/// Storage the reconciler reads from and writes to.
///
/// Rows are unique per (owner, member); each bulk call is applied on its own.
pub trait MembershipStore: Send + Sync {
    /// Current members of an owner
    fn fetch_members(&self, owner: &OwnerRef) -> Result<Vec<String>, DatabaseError>;

    /// Delete (owner, member) rows, returning how many existed
    fn delete_members(&self, owner: &OwnerRef, member_ids: &[String]) -> Result<usize, DatabaseError>;

    /// Insert (owner, member) rows, ignoring ones already present
    fn upsert_members(&self, owner: &OwnerRef, member_ids: &[String]) -> Result<usize, DatabaseError>;
}

impl MembershipStore for Database {
    fn fetch_members(&self, owner: &OwnerRef) -> Result<Vec<String>, DatabaseError> {
        self.get_members(owner)
    }

    fn delete_members(&self, owner: &OwnerRef, member_ids: &[String]) -> Result<usize, DatabaseError> {
        Database::delete_members(self, owner, member_ids)
    }

    fn upsert_members(&self, owner: &OwnerRef, member_ids: &[String]) -> Result<usize, DatabaseError> {
        Database::upsert_members(self, owner, member_ids)
    }
}
