//! crypto-scout adapters crate
//!
//! This crate contains infrastructure adapters implementing the domain ports:
//! - `sources`: CoinGecko and CryptoRank project sources
//! - `url_resolver`: redirect-following canonical URL resolution
//! - `llm`: OpenAI-compatible and stub draft generators
//! - `state`: JSON file and in-memory state stores
//! - `x`: X (Twitter) API publishers
//! - `outbox`: JSONL outbox for require-approval mode

pub mod handle;
pub mod llm;
pub mod outbox;
pub mod run_lock;
pub mod sources;
mod state_file;
mod state_memory;
pub mod url_resolver;
pub mod x_api;

/// Re-exports for state adapters
pub mod state {
    pub use crate::state_file::FileStateStore;
    pub use crate::state_memory::InMemoryStateStore;
}

/// Re-exports for X API adapters
pub mod x {
    pub use crate::x_api::{StubXPublisher, XPublisher};
}
