//! crypto-scout domain crate
//!
//! This crate contains the core domain logic following hexagonal architecture:
//! - `model`: Domain entities and value objects
//! - `ports`: Trait definitions for external dependencies (adapters)
//! - `schedule`: Hour-of-day section selection
//! - `selection`: Cooldown filtering and the staleness-ranked fallback pool
//! - `policy`: Post format constraints
//! - `dedup`: Text fingerprints and the duplicate guard
//! - `usecases`: Drafting and run orchestration

pub mod dedup;
pub mod model;
pub mod policy;
pub mod ports;
pub mod schedule;
pub mod selection;
pub mod usecases;

pub use dedup::{fingerprint, is_duplicate};
pub use model::*;
pub use ports::*;
pub use schedule::SectionSchedule;
