use ahash::AHashMap;
use std::sync::Arc;
use tracing::info;

use crate::config::{Config, PlatformResolvedConfig};
use crate::error::AdapterError;
use crate::providers::facebook::FacebookAdapter;
use crate::providers::hotmart::HotmartAdapter;
use crate::providers::mercadopago::MercadoPagoAdapter;
use crate::providers::perfectpay::PerfectPayAdapter;
use crate::providers::{PlatformAdapter, PlatformKind};

/// Platform id → adapter. Immutable once built.
#[derive(Clone, Default)]
pub struct AdapterRegistry {
    adapters: AHashMap<PlatformKind, Arc<dyn PlatformAdapter>>,
}

#[derive(Default)]
pub struct AdapterRegistryBuilder {
    adapters: AHashMap<PlatformKind, Arc<dyn PlatformAdapter>>,
}

impl AdapterRegistryBuilder {
    /// Registers `adapter` under its own kind, replacing any previous one.
    #[must_use]
    pub fn register(mut self, adapter: Arc<dyn PlatformAdapter>) -> Self {
        self.adapters.insert(adapter.kind(), adapter);
        self
    }

    pub fn build(self) -> AdapterRegistry {
        AdapterRegistry {
            adapters: self.adapters,
        }
    }
}

impl AdapterRegistry {
    pub fn builder() -> AdapterRegistryBuilder {
        AdapterRegistryBuilder::default()
    }

    /// Builds one adapter per enabled platform.
    pub fn from_config(cfg: &Config) -> Result<Self, reqwest::Error> {
        let defaults = &cfg.platforms.defaults;
        info!(
            platforms_defaults_proxy = %defaults.proxy.as_ref().map_or("<none>", |u| u.as_str()),
            platforms_defaults_enable_multiplexing = defaults.enable_multiplexing,
            platforms_defaults_retry_max_times = defaults.retry_max_times,
            platforms_defaults_requests_per_second = defaults.requests_per_second,
            "Platform defaults loaded"
        );

        let mut builder = Self::builder();

        let facebook = cfg.facebook();
        log_effective(PlatformKind::Facebook, &facebook.common);
        if facebook.common.enabled {
            builder = builder.register(Arc::new(FacebookAdapter::new(&facebook)?));
        }

        let hotmart = cfg.hotmart();
        log_effective(PlatformKind::Hotmart, &hotmart.common);
        if hotmart.common.enabled {
            builder = builder.register(Arc::new(HotmartAdapter::new(&hotmart)?));
        }

        let perfectpay = cfg.perfectpay();
        log_effective(PlatformKind::PerfectPay, &perfectpay);
        if perfectpay.enabled {
            builder = builder.register(Arc::new(PerfectPayAdapter::new(&perfectpay)?));
        }

        let mercadopago = cfg.mercadopago();
        log_effective(PlatformKind::MercadoPago, &mercadopago);
        if mercadopago.enabled {
            builder = builder.register(Arc::new(MercadoPagoAdapter::new(&mercadopago)?));
        }

        Ok(builder.build())
    }

    /// Looks up the adapter for `platform_id`. Unknown and disabled platforms are rejected
    /// the same way, before any network call.
    pub fn resolve(&self, platform_id: &str) -> Result<Arc<dyn PlatformAdapter>, AdapterError> {
        PlatformKind::parse(platform_id)
            .and_then(|kind| self.get(kind))
            .ok_or_else(|| AdapterError::UnsupportedPlatform(platform_id.to_string()))
    }

    pub fn get(&self, kind: PlatformKind) -> Option<Arc<dyn PlatformAdapter>> {
        self.adapters.get(&kind).cloned()
    }

    pub fn platforms(&self) -> Vec<PlatformKind> {
        let mut kinds: Vec<_> = self.adapters.keys().copied().collect();
        kinds.sort_unstable();
        kinds
    }
}

fn log_effective(kind: PlatformKind, cfg: &PlatformResolvedConfig) {
    info!(
        platform = %kind,
        enabled = cfg.enabled,
        api_url = %cfg.api_url,
        proxy = %cfg.proxy.as_ref().map_or("<none>", |u| u.as_str()),
        enable_multiplexing = cfg.enable_multiplexing,
        retry_max_times = cfg.retry_max_times,
        requests_per_second = cfg.requests_per_second,
        max_pages = cfg.max_pages,
        "Platform config (effective)"
    );
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn disabled_platforms_are_unsupported() {
        let mut cfg = Config::default();
        cfg.platforms.perfectpay.enabled = Some(false);
        let registry = AdapterRegistry::from_config(&cfg).expect("build registry");

        assert_eq!(
            registry.platforms(),
            vec![
                PlatformKind::Facebook,
                PlatformKind::Hotmart,
                PlatformKind::MercadoPago
            ]
        );
        assert!(matches!(
            registry.resolve("perfectpay"),
            Err(AdapterError::UnsupportedPlatform(id)) if id == "perfectpay"
        ));
        assert_eq!(
            registry.resolve("Mercado_Pago").map(|a| a.kind()).ok(),
            Some(PlatformKind::MercadoPago)
        );
    }

    #[test]
    fn unknown_platform_is_unsupported() {
        let registry = AdapterRegistry::from_config(&Config::default()).expect("build registry");
        assert!(matches!(
            registry.resolve("unknown-platform"),
            Err(AdapterError::UnsupportedPlatform(id)) if id == "unknown-platform"
        ));
    }
}
