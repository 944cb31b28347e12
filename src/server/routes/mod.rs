pub mod dashboard;
pub mod integrations;

use crate::error::{PainelError, SyncError};
use crate::providers::PlatformKind;

/// Platform path/query segment to a kind. Unknown ids are a 400.
pub(crate) fn parse_platform(id: &str) -> Result<PlatformKind, PainelError> {
    PlatformKind::parse(id).ok_or_else(|| SyncError::UnsupportedPlatform(id.to_string()).into())
}
