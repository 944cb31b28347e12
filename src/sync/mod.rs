//! Connection lifecycle and platform sync.
//!
//! - `state.rs`: connection status machine (pure)
//! - `connection.rs`: connection identity and persisted shape
//! - `orchestrator.rs`: connect / disconnect / sync / `sync_all`
//! - `scheduler.rs`: periodic `sync_all` over every user

mod connection;
mod locks;
mod orchestrator;
mod scheduler;
mod state;

pub use connection::{ConnectionKey, PlatformConnection, StoredConnection};
pub use orchestrator::{AccountSyncResult, SyncOrchestrator, SyncOutcome};
pub use scheduler::SyncScheduler;
pub use state::{ConnectionEvent, ConnectionStatus, can_sync, transition};
