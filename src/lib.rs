//! LeagueDesk - Tournament admin back end
//! Match scheduling with conflict detection, and coach/roster reconciliation

pub mod engine;
