//! Campaign and settings persistence — collaborator contracts and an
//! in-memory implementation backed by DashMap.
//!
//! Production: replace the in-memory store with PostgreSQL (sqlx) or
//! similar ACID store. The contracts keep the same API surface.

pub mod contract;
pub mod memory;

pub use contract::{CampaignStore, SettingsStore};
pub use memory::MemoryStore;
