use serde::{Deserialize, Serialize};
use std::sync::LazyLock;
use url::Url;

use super::{PlatformConfig, PlatformDefaults, PlatformResolvedConfig};

static HOTMART_DEFAULT_API_URL: LazyLock<Url> = LazyLock::new(|| {
    Url::parse("https://developers.hotmart.com").expect("invalid fixed Hotmart API URL")
});

static HOTMART_DEFAULT_AUTH_URL: LazyLock<Url> = LazyLock::new(|| {
    Url::parse("https://api-sec-vlc.hotmart.com/security/oauth/token")
        .expect("invalid fixed Hotmart token URL")
});

/// Hotmart configuration managed by Figment.
#[derive(Debug, Clone, Default, Deserialize, Serialize)]
pub struct HotmartConfig {
    #[serde(flatten)]
    pub common: PlatformConfig,

    /// OAuth token endpoint used for the client-credentials grant.
    /// TOML: `platforms.hotmart.auth_url`.
    #[serde(default)]
    pub auth_url: Option<Url>,
}

#[derive(Debug, Clone)]
pub struct HotmartResolvedConfig {
    pub common: PlatformResolvedConfig,
    pub auth_url: Url,
}

impl HotmartConfig {
    pub fn resolve(&self, defaults: &PlatformDefaults) -> HotmartResolvedConfig {
        HotmartResolvedConfig {
            common: self.common.resolve(defaults, &HOTMART_DEFAULT_API_URL),
            auth_url: self
                .auth_url
                .clone()
                .unwrap_or_else(|| HOTMART_DEFAULT_AUTH_URL.clone()),
        }
    }
}
