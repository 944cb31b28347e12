mod adapter;
mod oauth;
mod painel;
mod storage;
mod sync;

pub use adapter::AdapterError;
pub(crate) use oauth::adapter_error_from_token_error;
pub use painel::{ApiErrorBody, ApiErrorObject, PainelError};
pub use storage::StorageError;
pub use sync::SyncError;

pub trait IsRetryable {
    fn is_retryable(&self) -> bool;
}
