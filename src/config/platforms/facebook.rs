use serde::{Deserialize, Serialize};
use std::sync::LazyLock;
use url::Url;

use super::{PlatformConfig, PlatformDefaults, PlatformResolvedConfig};

static FACEBOOK_DEFAULT_API_URL: LazyLock<Url> = LazyLock::new(|| {
    Url::parse("https://graph.facebook.com").expect("invalid fixed Graph API URL")
});

/// Facebook Ads configuration managed by Figment.
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct FacebookConfig {
    #[serde(flatten)]
    pub common: PlatformConfig,

    /// Graph API version path segment.
    /// TOML: `platforms.facebook.api_version`. Default: `v18.0`.
    #[serde(default = "default_api_version")]
    pub api_version: String,
}

#[derive(Debug, Clone)]
pub struct FacebookResolvedConfig {
    pub common: PlatformResolvedConfig,
    pub api_version: String,
}

impl FacebookConfig {
    pub fn resolve(&self, defaults: &PlatformDefaults) -> FacebookResolvedConfig {
        FacebookResolvedConfig {
            common: self.common.resolve(defaults, &FACEBOOK_DEFAULT_API_URL),
            api_version: self.api_version.trim_matches('/').to_string(),
        }
    }
}

impl Default for FacebookConfig {
    fn default() -> Self {
        Self {
            common: PlatformConfig::default(),
            api_version: default_api_version(),
        }
    }
}

fn default_api_version() -> String {
    "v18.0".to_string()
}
