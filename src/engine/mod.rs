// LeagueDesk Engine - Core module structure
pub mod config;
pub mod error;
pub mod database;
pub mod migrations;
pub mod scheduling;
pub mod roster;
pub mod api;
pub mod cli;

pub use config::Config;
pub use database::Database;
pub use error::LeagueError;
