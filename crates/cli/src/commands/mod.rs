//! Subcommand implementations

pub mod config;
pub mod doctor;
pub mod draft;
pub mod run;
pub mod state;
