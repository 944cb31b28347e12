mod basic;
mod platforms;
mod sync;

pub use basic::BasicConfig;
pub use platforms::{
    FacebookConfig, FacebookResolvedConfig, HotmartConfig, HotmartResolvedConfig, PlatformConfig,
    PlatformDefaults, PlatformResolvedConfig, PlatformsConfig,
};
pub use sync::{SyncConfig, SyncResolvedConfig};

use figment::{
    Figment,
    providers::{Env, Format, Serialized, Toml},
};
use serde::{Deserialize, Serialize};
use std::{path::PathBuf, sync::LazyLock};

/// Application configuration managed by Figment.
#[derive(Debug, Clone, Deserialize, Serialize, Default)]
pub struct Config {
    /// Core server configuration (see `basic` table in config.toml).
    #[serde(default)]
    pub basic: BasicConfig,

    /// Sync worker pool, timeouts and schedule (see `sync` table in config.toml).
    #[serde(default)]
    pub sync: SyncConfig,

    /// Remote platform settings (see `platforms` table in config.toml).
    #[serde(default)]
    pub platforms: PlatformsConfig,
}

const DEFAULT_CONFIG_FILE: &str = "config.toml";
const ENV_PREFIX: &str = "PAINEL_";

impl Config {
    /// Builds a Figment that merges defaults, a config TOML file and `PAINEL_*` env vars.
    ///
    /// Nested keys use `__` in env vars, e.g. `PAINEL_BASIC__PAINEL_KEY`.
    pub fn figment() -> Figment {
        let mut figment = Figment::new().merge(Serialized::defaults(Config::default()));
        if PathBuf::from(DEFAULT_CONFIG_FILE).is_file() {
            figment = figment.merge(Toml::file(DEFAULT_CONFIG_FILE));
        }
        figment.merge(Env::prefixed(ENV_PREFIX).split("__"))
    }

    /// Loads configuration and validates required fields.
    pub fn from_toml() -> Self {
        let cfg: Self = Self::figment().extract().unwrap_or_else(|err| {
            panic!(
                "failed to extract configuration from {}: {err}",
                DEFAULT_CONFIG_FILE
            )
        });
        if cfg.basic.painel_key.trim().is_empty() {
            panic!("basic.painel_key must be set and non-empty");
        }
        cfg
    }

    pub fn sync(&self) -> SyncResolvedConfig {
        self.sync.resolve()
    }

    pub fn facebook(&self) -> FacebookResolvedConfig {
        self.platforms.facebook.resolve(&self.platforms.defaults)
    }

    pub fn hotmart(&self) -> HotmartResolvedConfig {
        self.platforms.hotmart.resolve(&self.platforms.defaults)
    }

    pub fn perfectpay(&self) -> PlatformResolvedConfig {
        self.platforms.perfectpay.resolve(
            &self.platforms.defaults,
            &platforms::PERFECTPAY_DEFAULT_API_URL,
        )
    }

    pub fn mercadopago(&self) -> PlatformResolvedConfig {
        self.platforms.mercadopago.resolve(
            &self.platforms.defaults,
            &platforms::MERCADOPAGO_DEFAULT_API_URL,
        )
    }
}

/// Global, lazily-initialized configuration instance. Panics on first access when
/// `basic.painel_key` is missing.
pub static CONFIG: LazyLock<Config> = LazyLock::new(Config::from_toml);

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_enable_every_platform_with_upstream_urls() {
        let cfg = Config::default();

        let facebook = cfg.facebook();
        assert!(facebook.common.enabled);
        assert_eq!(facebook.api_version, "v18.0");
        assert_eq!(facebook.common.api_url.as_str(), "https://graph.facebook.com/");

        let hotmart = cfg.hotmart();
        assert_eq!(
            hotmart.auth_url.as_str(),
            "https://api-sec-vlc.hotmart.com/security/oauth/token"
        );

        assert_eq!(
            cfg.mercadopago().api_url.as_str(),
            "https://api.mercadopago.com/"
        );
        assert_eq!(
            cfg.perfectpay().api_url.as_str(),
            "https://app.perfectpay.com.br/api/v1"
        );
    }

    #[test]
    fn platform_values_fall_back_to_defaults() {
        let mut cfg = Config::default();
        cfg.platforms.defaults.retry_max_times = 7;
        cfg.platforms.defaults.requests_per_second = 2;
        cfg.platforms.mercadopago.retry_max_times = Some(1);
        cfg.platforms.perfectpay.enabled = Some(false);

        let mp = cfg.mercadopago();
        assert_eq!(mp.retry_max_times, 1);
        assert_eq!(mp.requests_per_second, 2);

        let pp = cfg.perfectpay();
        assert!(!pp.enabled);
        assert_eq!(pp.retry_max_times, 7);
    }

    #[test]
    fn toml_overrides_merge_over_defaults() {
        let figment = Figment::new()
            .merge(Serialized::defaults(Config::default()))
            .merge(Toml::string(
                r#"
                [basic]
                painel_key = 12345

                listen = "127.0.0.1:9000"

                [sync]
                max_concurrency = 3

                [platforms.facebook]
                api_version = "v19.0"
                enabled = false
                "#,
            ));
        let cfg: Config = figment.extract().expect("extract config");

        assert_eq!(cfg.basic.painel_key, "12345");
        assert_eq!(cfg.basic.listen.port(), 9000);
        assert_eq!(cfg.basic.database_url, "sqlite://painel.db");
        assert_eq!(cfg.sync().max_concurrency, 3);
        assert_eq!(cfg.facebook().api_version, "v19.0");
        assert!(!cfg.facebook().common.enabled);
    }
}
