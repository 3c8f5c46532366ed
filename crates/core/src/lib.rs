//! zotsync core library.
//!
//! This crate provides the building blocks of a one-way Zotero → reMarkable
//! PDF sync: configuration, the tablet library reader, the Zotero catalog
//! client, name matching, transfer planning, file transfer, and the sync
//! engine that runs them as a single pass.

pub mod config;
pub mod errors;
pub mod matcher;
pub mod models;
pub mod planner;
pub mod remarkable;
pub mod sync_engine;
pub mod transfer;
pub mod zotero;

// Re-exports for convenience.
pub use config::SyncConfig;
pub use errors::CoreError;
pub use models::PassStats;
pub use sync_engine::{build_http_engine, SyncEngine, SyncPass};
