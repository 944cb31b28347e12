mod facebook;
mod hotmart;

pub use facebook::{FacebookConfig, FacebookResolvedConfig};
pub use hotmart::{HotmartConfig, HotmartResolvedConfig};

use serde::{Deserialize, Serialize};
use std::sync::LazyLock;
use url::Url;

pub(crate) static PERFECTPAY_DEFAULT_API_URL: LazyLock<Url> = LazyLock::new(|| {
    Url::parse("https://app.perfectpay.com.br/api/v1").expect("invalid fixed PerfectPay API URL")
});

pub(crate) static MERCADOPAGO_DEFAULT_API_URL: LazyLock<Url> = LazyLock::new(|| {
    Url::parse("https://api.mercadopago.com").expect("invalid fixed Mercado Pago API URL")
});

/// Global platform defaults (used when platform-level config is unset).
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct PlatformDefaults {
    /// Optional upstream HTTP proxy. If set, used for reqwest clients.
    /// TOML: `platforms.defaults.proxy`. Example: `http://127.0.0.1:1080`.
    #[serde(default)]
    pub proxy: Option<Url>,

    /// Allow HTTP/2 multiplexing for reqwest clients; disabled forces HTTP/1.
    /// TOML: `platforms.defaults.enable_multiplexing`. Default: `false`.
    #[serde(default = "default_enable_multiplexing")]
    pub enable_multiplexing: bool,

    /// Max retry attempts for transient upstream failures.
    /// TOML: `platforms.defaults.retry_max_times`. Default: `3`.
    #[serde(default = "default_retry_max_times")]
    pub retry_max_times: usize,

    /// Outbound requests per second per platform.
    /// TOML: `platforms.defaults.requests_per_second`. Default: `10`.
    #[serde(default = "default_requests_per_second")]
    pub requests_per_second: u32,

    /// Upper bound of result pages followed in one fetch.
    /// TOML: `platforms.defaults.max_pages`. Default: `50`.
    #[serde(default = "default_max_pages")]
    pub max_pages: usize,
}

impl Default for PlatformDefaults {
    fn default() -> Self {
        Self {
            proxy: None,
            enable_multiplexing: default_enable_multiplexing(),
            retry_max_times: default_retry_max_times(),
            requests_per_second: default_requests_per_second(),
            max_pages: default_max_pages(),
        }
    }
}

/// All platform configurations.
#[derive(Debug, Clone, Deserialize, Serialize, Default)]
pub struct PlatformsConfig {
    /// Global defaults for platforms (overridden per platform if set).
    #[serde(default)]
    pub defaults: PlatformDefaults,

    /// Facebook Ads (Graph API) configuration.
    #[serde(default)]
    pub facebook: FacebookConfig,

    /// Hotmart configuration.
    #[serde(default)]
    pub hotmart: HotmartConfig,

    /// PerfectPay configuration.
    #[serde(default)]
    pub perfectpay: PlatformConfig,

    /// Mercado Pago configuration.
    #[serde(default)]
    pub mercadopago: PlatformConfig,
}

/// Settings shared by every platform. Each `None` falls back to `platforms.defaults`.
#[derive(Debug, Clone, Default, Deserialize, Serialize)]
pub struct PlatformConfig {
    /// Register the platform's adapter at start-up.
    /// TOML: `platforms.<name>.enabled`. Default: `true`.
    #[serde(default)]
    pub enabled: Option<bool>,

    /// Base URL of the platform API. Defaults to the platform's public endpoint.
    /// TOML: `platforms.<name>.api_url`.
    #[serde(default)]
    pub api_url: Option<Url>,

    /// TOML: `platforms.<name>.proxy`. Falls back to `platforms.defaults.proxy`.
    #[serde(default)]
    pub proxy: Option<Url>,

    /// TOML: `platforms.<name>.enable_multiplexing`.
    #[serde(default)]
    pub enable_multiplexing: Option<bool>,

    /// TOML: `platforms.<name>.retry_max_times`.
    #[serde(default)]
    pub retry_max_times: Option<usize>,

    /// TOML: `platforms.<name>.requests_per_second`.
    #[serde(default)]
    pub requests_per_second: Option<u32>,

    /// TOML: `platforms.<name>.max_pages`.
    #[serde(default)]
    pub max_pages: Option<usize>,
}

#[derive(Debug, Clone)]
pub struct PlatformResolvedConfig {
    pub enabled: bool,
    pub api_url: Url,
    pub proxy: Option<Url>,
    pub enable_multiplexing: bool,
    pub retry_max_times: usize,
    pub requests_per_second: u32,
    pub max_pages: usize,
}

impl PlatformConfig {
    pub fn resolve(&self, defaults: &PlatformDefaults, default_api_url: &Url) -> PlatformResolvedConfig {
        PlatformResolvedConfig {
            enabled: self.enabled.unwrap_or(true),
            api_url: self
                .api_url
                .clone()
                .unwrap_or_else(|| default_api_url.clone()),
            proxy: self.proxy.clone().or_else(|| defaults.proxy.clone()),
            enable_multiplexing: self
                .enable_multiplexing
                .unwrap_or(defaults.enable_multiplexing),
            retry_max_times: self.retry_max_times.unwrap_or(defaults.retry_max_times),
            requests_per_second: self
                .requests_per_second
                .unwrap_or(defaults.requests_per_second)
                .max(1),
            max_pages: self.max_pages.unwrap_or(defaults.max_pages).max(1),
        }
    }
}

impl PlatformResolvedConfig {
    /// Resolved config pointing at `api_url`, with every other value at its default.
    pub fn for_api_url(api_url: Url) -> Self {
        PlatformConfig::default().resolve(&PlatformDefaults::default(), &api_url)
    }
}

fn default_enable_multiplexing() -> bool {
    false
}

fn default_retry_max_times() -> usize {
    3
}

fn default_requests_per_second() -> u32 {
    10
}

fn default_max_pages() -> usize {
    50
}
