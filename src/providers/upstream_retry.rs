use backon::{ExponentialBuilder, Retryable};
use governor::{DefaultDirectRateLimiter, Quota, RateLimiter};
use reqwest::StatusCode;
use reqwest::header::{CONNECTION, HeaderMap, HeaderValue};
use serde::{Serialize, de::DeserializeOwned};
use std::num::NonZeroU32;
use std::sync::Arc;
use std::time::Duration;

use crate::config::PlatformResolvedConfig;
use crate::error::AdapterError;
use crate::providers::policy::{MappingAction, classify_upstream_error, decode_json};
use crate::providers::{CallOptions, PlatformKind, UPSTREAM_BODY_PREVIEW_CHARS};
use crate::utils::logging::truncate_chars;

enum AttemptError {
    Transport(reqwest::Error),
    Status { status: StatusCode, body: String },
}

impl AttemptError {
    fn should_retry(&self) -> bool {
        match self {
            // The caller's deadline already bounds the whole call.
            AttemptError::Transport(e) => !e.is_timeout(),
            AttemptError::Status { .. } => true,
        }
    }
}

/// Shared HTTP plumbing of one platform: client, rate limit and retry policy.
#[derive(Clone)]
pub(crate) struct PlatformHttp {
    platform: PlatformKind,
    client: reqwest::Client,
    retry_policy: ExponentialBuilder,
    limiter: Arc<DefaultDirectRateLimiter>,
}

impl PlatformHttp {
    pub(crate) fn new(
        platform: PlatformKind,
        cfg: &PlatformResolvedConfig,
    ) -> Result<Self, reqwest::Error> {
        let client = build_http_client(platform, cfg)?;
        Ok(Self::with_client(platform, cfg, client))
    }

    pub(crate) fn with_client(
        platform: PlatformKind,
        cfg: &PlatformResolvedConfig,
        client: reqwest::Client,
    ) -> Self {
        let retry_policy = ExponentialBuilder::default()
            .with_min_delay(Duration::from_millis(100))
            .with_max_delay(Duration::from_millis(300))
            .with_max_times(cfg.retry_max_times)
            .with_jitter();

        let rps = NonZeroU32::new(cfg.requests_per_second).unwrap_or(NonZeroU32::MIN);
        let limiter = Arc::new(RateLimiter::direct(Quota::per_second(rps)));

        Self {
            platform,
            client,
            retry_policy,
            limiter,
        }
    }

    pub(crate) fn client(&self) -> &reqwest::Client {
        &self.client
    }

    /// Sends the request built by `build`, retrying transport errors and 5xx/429.
    ///
    /// The whole call, retries included, is bounded by `call.timeout`. Any non-5xx response
    /// is returned to the caller as is.
    pub(crate) async fn send<F>(
        &self,
        call: CallOptions,
        build: F,
    ) -> Result<reqwest::Response, AdapterError>
    where
        F: Fn(&reqwest::Client) -> reqwest::RequestBuilder,
    {
        let platform = self.platform;
        let client = &self.client;
        let limiter = &self.limiter;
        let build = &build;

        let attempt = move || async move {
            limiter.until_ready().await;
            let resp = build(client)
                .timeout(call.timeout)
                .send()
                .await
                .map_err(AttemptError::Transport)?;

            let status = resp.status();
            if status.is_server_error() || status == StatusCode::TOO_MANY_REQUESTS {
                let body = match resp.bytes().await {
                    Ok(bytes) => {
                        truncate_chars(&String::from_utf8_lossy(&bytes), UPSTREAM_BODY_PREVIEW_CHARS)
                            .into_owned()
                    }
                    Err(e) => format!("<failed to read body: {e}>"),
                };

                tracing::debug!(
                    %platform,
                    %status,
                    body = %body,
                    "[{platform}] Upstream server error (will retry)"
                );

                return Err(AttemptError::Status { status, body });
            }

            Ok(resp)
        };

        let outcome = tokio::time::timeout(
            call.timeout,
            attempt
                .retry(self.retry_policy)
                .when(AttemptError::should_retry),
        )
        .await
        .map_err(|_| AdapterError::Timeout {
            platform,
            after: call.timeout,
        })?;

        outcome.map_err(|e| match e {
            AttemptError::Transport(e) => AdapterError::from_transport(platform, call.timeout, &e),
            AttemptError::Status { status, body } => AdapterError::TransientNetwork {
                platform,
                message: format!("upstream returned {status} after retries: {body}"),
            },
        })
    }

    /// `send` + decode on success, structured classification on failure.
    pub(crate) async fn fetch_json<T, E, F>(
        &self,
        call: CallOptions,
        build: F,
    ) -> Result<T, AdapterError>
    where
        T: DeserializeOwned + Serialize,
        E: MappingAction,
        F: Fn(&reqwest::Client) -> reqwest::RequestBuilder,
    {
        let resp = self.send(call, build).await?;
        if resp.status().is_success() {
            decode_json(self.platform, resp, call.timeout).await
        } else {
            Err(classify_upstream_error::<E>(self.platform, resp).await)
        }
    }
}

fn build_http_client(
    platform: PlatformKind,
    cfg: &PlatformResolvedConfig,
) -> Result<reqwest::Client, reqwest::Error> {
    let mut headers = HeaderMap::new();
    let mut builder = reqwest::Client::builder()
        .user_agent(format!("painel/{} ({platform})", env!("CARGO_PKG_VERSION")))
        .connect_timeout(Duration::from_secs(5));

    if let Some(proxy_url) = cfg.proxy.as_ref() {
        builder = builder.proxy(reqwest::Proxy::all(proxy_url.as_str())?);
    }

    if cfg.enable_multiplexing {
        builder = builder.http2_adaptive_window(true);
    } else {
        headers.insert(CONNECTION, HeaderValue::from_static("close"));
        builder = builder
            .http1_only()
            .pool_max_idle_per_host(0)
            .pool_idle_timeout(Duration::from_secs(0));
    }

    builder.default_headers(headers).build()
}
