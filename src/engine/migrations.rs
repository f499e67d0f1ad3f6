//! LeagueDesk Migrations Module
//! Embedded league schema plus project migrations under sql/migrations

use crate::engine::database::{Database, DatabaseError};
use chrono::Utc;
use rusqlite::{params, Connection};
use sha2::{Digest, Sha256};
use std::fs;
use std::path::{Path, PathBuf};
use thiserror::Error;
use tracing::info;

/// Schema shipped with the binary. Names sort before timestamped project migrations.
const EMBEDDED_MIGRATIONS: &[(&str, &str)] = &[
    (
        "0001_memberships.sql",
        "CREATE TABLE IF NOT EXISTS memberships (
            owner_kind TEXT NOT NULL,
            owner_id TEXT NOT NULL,
            member_id TEXT NOT NULL,
            created_at TEXT NOT NULL,
            PRIMARY KEY (owner_kind, owner_id, member_id)
        );
        CREATE INDEX IF NOT EXISTS idx_memberships_member ON memberships (member_id);",
    ),
    (
        "0002_match_assignments.sql",
        "CREATE TABLE IF NOT EXISTS match_assignments (
            match_id TEXT PRIMARY KEY,
            field_id TEXT NOT NULL,
            match_date TEXT NOT NULL,
            start_time TEXT NOT NULL,
            duration_minutes INTEGER,
            updated_at TEXT NOT NULL
        );
        CREATE INDEX IF NOT EXISTS idx_match_assignments_slot
            ON match_assignments (field_id, match_date);",
    ),
];

pub const JOURNAL_TABLE: &str = "_leaguedesk_migrations";

#[derive(Error, Debug)]
pub enum MigrationError {
    #[error("Database error: {0}")]
    Database(#[from] DatabaseError),
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
    #[error("No project directory for migration files")]
    NoProjectDir,
    #[error("Schema drift detected: {0}")]
    SchemaDrift(String),
    #[error("SQL execution error: {0}")]
    SqlError(#[from] rusqlite::Error),
}

#[derive(Debug, Clone)]
pub struct Migration {
    pub name: String,
    pub sql: String,
    pub checksum: String,
}

impl Migration {
    fn new(name: &str, sql: &str) -> Self {
        Self {
            name: name.to_string(),
            sql: sql.to_string(),
            checksum: compute_checksum(sql),
        }
    }
}

pub struct MigrationRunner {
    migrations_dir: Option<PathBuf>,
}

impl MigrationRunner {
    /// Runner for the embedded schema only
    pub fn embedded() -> Self {
        Self { migrations_dir: None }
    }

    /// Runner for the embedded schema followed by the project's own migrations
    pub fn new(project_dir: &Path) -> Self {
        Self {
            migrations_dir: Some(project_dir.join("sql").join("migrations")),
        }
    }

    pub fn create(&self, name: &str) -> Result<PathBuf, MigrationError> {
        let dir = self.migrations_dir.as_ref().ok_or(MigrationError::NoProjectDir)?;
        fs::create_dir_all(dir)?;

        let timestamp = Utc::now().format("%Y%m%d_%H%M%S");
        let safe_name = name.replace(' ', "_").to_lowercase();
        let path = dir.join(format!("{}_{}.sql", timestamp, safe_name));

        let template = format!(
            "-- Migration: {}\n-- Created: {}\n\n-- Write your SQL here\n",
            name,
            Utc::now().to_rfc3339()
        );

        fs::write(&path, template)?;
        Ok(path)
    }

    /// Every known migration in application order
    pub fn all_migrations(&self) -> Result<Vec<Migration>, MigrationError> {
        let mut migrations: Vec<Migration> = EMBEDDED_MIGRATIONS
            .iter()
            .map(|(name, sql)| Migration::new(name, sql))
            .collect();

        let Some(dir) = self.migrations_dir.as_ref().filter(|d| d.exists()) else {
            return Ok(migrations);
        };

        let mut entries: Vec<_> = fs::read_dir(dir)?
            .filter_map(|e| e.ok())
            .filter(|e| e.path().extension().map_or(false, |ext| ext == "sql"))
            .collect();
        entries.sort_by_key(|e| e.file_name());

        for entry in entries {
            let name = entry.file_name().to_string_lossy().to_string();
            let sql = fs::read_to_string(entry.path())?;
            migrations.push(Migration::new(&name, &sql));
        }

        Ok(migrations)
    }

    /// Apply pending migrations on a raw connection, returning the applied names
    pub fn apply_pending(&self, conn: &mut Connection) -> Result<Vec<String>, MigrationError> {
        ensure_journal(conn)?;
        let applied = applied_migrations(conn)?;
        let all = self.all_migrations()?;
        verify_checksums(&applied, &all)?;

        let mut names = Vec::new();
        for migration in all {
            if applied.iter().any(|(name, _)| name == &migration.name) {
                continue;
            }
            let tx = conn.transaction()?;
            tx.execute_batch(&migration.sql)?;
            tx.execute(
                &format!(
                    "INSERT INTO {} (name, applied_at, checksum) VALUES (?1, datetime('now'), ?2)",
                    JOURNAL_TABLE
                ),
                params![migration.name, migration.checksum],
            )?;
            tx.commit()?;
            info!(migration = %migration.name, "applied migration");
            names.push(migration.name);
        }

        Ok(names)
    }

    pub fn push(&self, db: &Database) -> Result<Vec<String>, MigrationError> {
        let mut conn = db.get_connection()?;
        self.apply_pending(&mut conn)
    }

    pub fn check(&self, db: &Database) -> Result<MigrationStatus, MigrationError> {
        let conn = db.get_connection()?;
        ensure_journal(&conn)?;
        let applied = applied_migrations(&conn)?;
        let all = self.all_migrations()?;
        verify_checksums(&applied, &all)?;

        let pending: Vec<String> = all
            .into_iter()
            .filter(|m| !applied.iter().any(|(name, _)| name == &m.name))
            .map(|m| m.name)
            .collect();

        Ok(MigrationStatus {
            applied_count: applied.len(),
            pending_count: pending.len(),
            pending_migrations: pending,
        })
    }
}

#[derive(Debug)]
pub struct MigrationStatus {
    pub applied_count: usize,
    pub pending_count: usize,
    pub pending_migrations: Vec<String>,
}

fn ensure_journal(conn: &Connection) -> Result<(), rusqlite::Error> {
    conn.execute(
        &format!(
            "CREATE TABLE IF NOT EXISTS {} (
                id INTEGER PRIMARY KEY AUTOINCREMENT,
                name TEXT NOT NULL UNIQUE,
                applied_at TEXT NOT NULL,
                checksum TEXT NOT NULL
            )",
            JOURNAL_TABLE
        ),
        [],
    )?;
    Ok(())
}

fn applied_migrations(conn: &Connection) -> Result<Vec<(String, String)>, rusqlite::Error> {
    let mut stmt = conn.prepare(&format!(
        "SELECT name, checksum FROM {} ORDER BY id",
        JOURNAL_TABLE
    ))?;
    let rows = stmt
        .query_map([], |row| Ok((row.get(0)?, row.get(1)?)))?
        .collect::<Result<Vec<(String, String)>, _>>()?;
    Ok(rows)
}

fn verify_checksums(applied: &[(String, String)], all: &[Migration]) -> Result<(), MigrationError> {
    for (name, checksum) in applied {
        if let Some(known) = all.iter().find(|m| &m.name == name) {
            if &known.checksum != checksum {
                return Err(MigrationError::SchemaDrift(format!(
                    "{} was modified after it was applied",
                    name
                )));
            }
        }
    }
    Ok(())
}

fn compute_checksum(sql: &str) -> String {
    let mut hasher = Sha256::new();
    hasher.update(sql.as_bytes());
    let result = hasher.finalize();
    base64::Engine::encode(&base64::engine::general_purpose::STANDARD, result)
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::tempdir;

    #[test]
    fn test_embedded_schema_applied_on_open() {
        let db = Database::in_memory().unwrap();
        let status = MigrationRunner::embedded().check(&db).unwrap();
        assert_eq!(status.applied_count, EMBEDDED_MIGRATIONS.len());
        assert_eq!(status.pending_count, 0);
    }

    #[test]
    fn test_project_migration_push() {
        let dir = tempdir().unwrap();
        let db = Database::in_memory().unwrap();
        let runner = MigrationRunner::new(dir.path());

        let path = runner.create("add fields").unwrap();
        fs::write(&path, "CREATE TABLE fields (id TEXT PRIMARY KEY, name TEXT NOT NULL);").unwrap();

        let status = runner.check(&db).unwrap();
        assert_eq!(status.pending_count, 1);

        let applied = runner.push(&db).unwrap();
        assert_eq!(applied.len(), 1);
        assert!(applied[0].ends_with("_add_fields.sql"));

        assert!(runner.push(&db).unwrap().is_empty());
    }

    #[test]
    fn test_schema_drift_detected() {
        let dir = tempdir().unwrap();
        let db = Database::in_memory().unwrap();
        let runner = MigrationRunner::new(dir.path());

        let path = runner.create("venues").unwrap();
        fs::write(&path, "CREATE TABLE venues (id TEXT PRIMARY KEY);").unwrap();
        runner.push(&db).unwrap();

        fs::write(&path, "CREATE TABLE venues (id TEXT PRIMARY KEY, city TEXT);").unwrap();
        assert!(matches!(runner.check(&db), Err(MigrationError::SchemaDrift(_))));
    }

    #[test]
    fn test_create_requires_project_dir() {
        assert!(matches!(
            MigrationRunner::embedded().create("x"),
            Err(MigrationError::NoProjectDir)
        ));
    }
}
