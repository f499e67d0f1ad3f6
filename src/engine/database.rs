//! LeagueDesk Database Module
//! SQLite store with connection pooling for memberships and match assignments

use chrono::{NaiveDate, NaiveTime};
use r2d2::{Pool, PooledConnection};
use r2d2_sqlite::SqliteConnectionManager;
use rusqlite::{params, Row};
use std::path::Path;
use thiserror::Error;

use crate::engine::migrations::MigrationRunner;
use crate::engine::roster::OwnerRef;
use crate::engine::scheduling::AssignmentCandidate;

pub type DbPool = Pool<SqliteConnectionManager>;
pub type DbConnection = PooledConnection<SqliteConnectionManager>;

pub const DATE_FORMAT: &str = "%Y-%m-%d";
pub const TIME_FORMAT: &str = "%H:%M:%S";

#[derive(Error, Debug)]
pub enum DatabaseError {
    #[error("Failed to create database pool: {0}")]
    PoolError(#[from] r2d2::Error),
    #[error("SQLite error: {0}")]
    SqliteError(#[from] rusqlite::Error),
    #[error("Schema migration failed: {0}")]
    Migration(String),
}

#[derive(Clone)]
pub struct Database {
    pool: DbPool,
}

impl Database {
    pub fn new(db_path: &Path) -> Result<Self, DatabaseError> {
        // Ensure parent directory exists
        if let Some(parent) = db_path.parent() {
            std::fs::create_dir_all(parent).ok();
        }

        let manager = SqliteConnectionManager::file(db_path);
        let pool = Pool::builder().max_size(10).build(manager)?;

        let db = Self { pool };
        db.init_schema()?;
        Ok(db)
    }

    pub fn in_memory() -> Result<Self, DatabaseError> {
        let manager = SqliteConnectionManager::memory();
        let pool = Pool::builder().max_size(1).build(manager)?;
        let db = Self { pool };
        db.init_schema()?;
        Ok(db)
    }

    fn init_schema(&self) -> Result<(), DatabaseError> {
        let mut conn = self.pool.get()?;

        // PRAGMA journal_mode returns the resulting mode
        let _: String = conn.query_row("PRAGMA journal_mode=WAL", [], |row| row.get(0))?;
        conn.execute_batch("PRAGMA foreign_keys=ON")?;

        MigrationRunner::embedded()
            .apply_pending(&mut conn)
            .map_err(|e| DatabaseError::Migration(e.to_string()))?;

        Ok(())
    }

    pub fn get_connection(&self) -> Result<DbConnection, DatabaseError> {
        Ok(self.pool.get()?)
    }

    // Memberships

    pub fn get_members(&self, owner: &OwnerRef) -> Result<Vec<String>, DatabaseError> {
        let conn = self.get_connection()?;
        let mut stmt = conn.prepare(
            "SELECT member_id FROM memberships
             WHERE owner_kind = ?1 AND owner_id = ?2
             ORDER BY rowid",
        )?;
        let members = stmt
            .query_map(params![owner.kind.as_str(), owner.id], |row| row.get(0))?
            .collect::<Result<Vec<String>, _>>()?;
        Ok(members)
    }

    pub fn delete_members(&self, owner: &OwnerRef, member_ids: &[String]) -> Result<usize, DatabaseError> {
        let mut conn = self.get_connection()?;
        let tx = conn.transaction()?;
        let mut deleted = 0;
        {
            let mut stmt = tx.prepare(
                "DELETE FROM memberships WHERE owner_kind = ?1 AND owner_id = ?2 AND member_id = ?3",
            )?;
            for member_id in member_ids {
                deleted += stmt.execute(params![owner.kind.as_str(), owner.id, member_id])?;
            }
        }
        tx.commit()?;
        Ok(deleted)
    }

    pub fn upsert_members(&self, owner: &OwnerRef, member_ids: &[String]) -> Result<usize, DatabaseError> {
        let mut conn = self.get_connection()?;
        let tx = conn.transaction()?;
        let mut inserted = 0;
        {
            let mut stmt = tx.prepare(
                "INSERT INTO memberships (owner_kind, owner_id, member_id, created_at)
                 VALUES (?1, ?2, ?3, datetime('now'))
                 ON CONFLICT (owner_kind, owner_id, member_id) DO NOTHING",
            )?;
            for member_id in member_ids {
                inserted += stmt.execute(params![owner.kind.as_str(), owner.id, member_id])?;
            }
        }
        tx.commit()?;
        Ok(inserted)
    }

    // Match assignments

    pub fn upsert_assignments(&self, assignments: &[AssignmentCandidate]) -> Result<usize, DatabaseError> {
        let mut conn = self.get_connection()?;
        let tx = conn.transaction()?;
        let mut written = 0;
        {
            let mut stmt = tx.prepare(
                "INSERT INTO match_assignments
                    (match_id, field_id, match_date, start_time, duration_minutes, updated_at)
                 VALUES (?1, ?2, ?3, ?4, ?5, datetime('now'))
                 ON CONFLICT (match_id) DO UPDATE SET
                    field_id = excluded.field_id,
                    match_date = excluded.match_date,
                    start_time = excluded.start_time,
                    duration_minutes = excluded.duration_minutes,
                    updated_at = excluded.updated_at",
            )?;
            for a in assignments {
                written += stmt.execute(params![
                    a.match_id,
                    a.field_id,
                    a.date.format(DATE_FORMAT).to_string(),
                    a.start_time.format(TIME_FORMAT).to_string(),
                    a.duration_minutes,
                ])?;
            }
        }
        tx.commit()?;
        Ok(written)
    }

    /// Persisted assignments on one field for one day
    pub fn get_assignments_for_slot(
        &self,
        field_id: &str,
        date: NaiveDate,
    ) -> Result<Vec<AssignmentCandidate>, DatabaseError> {
        let conn = self.get_connection()?;
        let mut stmt = conn.prepare(
            "SELECT match_id, field_id, match_date, start_time, duration_minutes
             FROM match_assignments
             WHERE field_id = ?1 AND match_date = ?2
             ORDER BY start_time, match_id",
        )?;
        let rows = stmt
            .query_map(
                params![field_id, date.format(DATE_FORMAT).to_string()],
                row_to_assignment,
            )?
            .collect::<Result<Vec<_>, _>>()?;
        Ok(rows)
    }

    pub fn list_assignments(
        &self,
        date: Option<NaiveDate>,
        field_id: Option<&str>,
    ) -> Result<Vec<AssignmentCandidate>, DatabaseError> {
        let conn = self.get_connection()?;
        let date = date.map(|d| d.format(DATE_FORMAT).to_string());
        let mut stmt = conn.prepare(
            "SELECT match_id, field_id, match_date, start_time, duration_minutes
             FROM match_assignments
             WHERE (?1 IS NULL OR match_date = ?1) AND (?2 IS NULL OR field_id = ?2)
             ORDER BY match_date, field_id, start_time, match_id",
        )?;
        let rows = stmt
            .query_map(params![date, field_id], row_to_assignment)?
            .collect::<Result<Vec<_>, _>>()?;
        Ok(rows)
    }

    pub fn delete_assignment(&self, match_id: &str) -> Result<usize, DatabaseError> {
        let conn = self.get_connection()?;
        let affected = conn.execute(
            "DELETE FROM match_assignments WHERE match_id = ?1",
            params![match_id],
        )?;
        Ok(affected)
    }

    pub fn count_rows(&self, table: &str) -> Result<u64, DatabaseError> {
        let conn = self.get_connection()?;
        let count: i64 = conn.query_row(&format!("SELECT COUNT(*) FROM {}", table), [], |row| row.get(0))?;
        Ok(count as u64)
    }
}

fn row_to_assignment(row: &Row<'_>) -> rusqlite::Result<AssignmentCandidate> {
    let date: String = row.get(2)?;
    let start_time: String = row.get(3)?;
    Ok(AssignmentCandidate {
        match_id: row.get(0)?,
        field_id: row.get(1)?,
        date: NaiveDate::parse_from_str(&date, DATE_FORMAT).map_err(|e| conversion_error(2, e))?,
        start_time: NaiveTime::parse_from_str(&start_time, TIME_FORMAT)
            .map_err(|e| conversion_error(3, e))?,
        duration_minutes: row.get(4)?,
    })
}

fn conversion_error(column: usize, err: chrono::ParseError) -> rusqlite::Error {
    rusqlite::Error::FromSqlConversionFailure(column, rusqlite::types::Type::Text, Box::new(err))
}
