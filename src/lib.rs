pub mod config;
pub mod db;
pub mod error;
pub mod metrics;
pub mod providers;
pub mod server;
pub mod store;
pub mod sync;

pub(crate) mod utils;

pub use error::{AdapterError, PainelError, StorageError, SyncError};
pub use store::{MemoryStore, MetricsStore, RecordQuery};
pub use sync::SyncOrchestrator;
