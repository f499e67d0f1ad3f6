//! League Error Types
//!
//! Scheduling conflicts are not errors; they are returned as data by the
//! scheduling service.

use thiserror::Error;

use crate::engine::database::DatabaseError;

#[derive(Error, Debug)]
pub enum LeagueError {
    #[error("Invalid input: {0}")]
    InvalidInput(String),

    #[error("Not found: {0}")]
    NotFound(String),

    #[error("Persistence error: {0}")]
    Persistence(#[from] DatabaseError),
}

impl LeagueError {
    pub fn invalid(message: impl Into<String>) -> Self {
        LeagueError::InvalidInput(message.into())
    }
}

pub type Result<T> = std::result::Result<T, LeagueError>;
