pub mod facebook;
pub mod hotmart;
pub mod manifest;
pub mod mercadopago;
pub mod perfectpay;

mod policy;
mod provider_endpoints;
mod registry;
mod upstream_retry;

pub use manifest::{
    CallOptions, ConnectRequest, ConnectionInfo, FetchRequest, NormalizedMetrics, NormalizedRecord,
    PaymentBreakdown, PaymentMethod, PlatformCredentials, PlatformKind, SyncWindow,
    cents_from_units, units_from_cents,
};
pub use policy::{MappingAction, UPSTREAM_BODY_PREVIEW_CHARS};
pub use registry::{AdapterRegistry, AdapterRegistryBuilder};

use crate::error::AdapterError;
use async_trait::async_trait;

/// One remote platform: credential validation, fetch and mapping to [`NormalizedMetrics`].
///
/// Implementations hold no per-connection state; credentials are passed on every call.
#[async_trait]
pub trait PlatformAdapter: Send + Sync {
    fn kind(&self) -> PlatformKind;

    /// Validates the credentials against the remote API. Nothing is persisted.
    async fn connect(&self, request: ConnectRequest<'_>) -> Result<ConnectionInfo, AdapterError>;

    /// Releases remote or cached session state tied to `credentials`.
    async fn disconnect(
        &self,
        _credentials: &PlatformCredentials,
        _call: CallOptions,
    ) -> Result<(), AdapterError> {
        Ok(())
    }

    /// Fetches and maps the account's activity inside `request.window`.
    ///
    /// Missing remote fields count as zero and set `partial`; a failed remote call is an error.
    async fn fetch_metrics(
        &self,
        request: FetchRequest<'_>,
    ) -> Result<NormalizedMetrics, AdapterError>;
}
