use ahash::RandomState;
use moka::Expiry;
use moka::future::Cache;
use oauth2::basic::BasicClient;
use oauth2::{ClientId, ClientSecret, TokenResponse, TokenUrl};
use std::sync::Arc;
use std::time::{Duration, Instant};
use tracing::debug;
use url::Url;

use crate::error::{AdapterError, adapter_error_from_token_error};
use crate::providers::{CallOptions, PlatformCredentials, PlatformKind};

const PLATFORM: PlatformKind = PlatformKind::Hotmart;
const DEFAULT_TOKEN_TTL: Duration = Duration::from_secs(3600);
const EXPIRY_MARGIN: Duration = Duration::from_secs(60);
const MIN_TOKEN_TTL: Duration = Duration::from_secs(30);

#[derive(Clone)]
struct CachedToken {
    access_token: Arc<str>,
    ttl: Duration,
}

/// Client id plus a hash of the secret the token was issued for.
type TokenKey = (String, u64);

struct TokenExpiry;

impl Expiry<TokenKey, CachedToken> for TokenExpiry {
    fn expire_after_create(
        &self,
        _key: &TokenKey,
        value: &CachedToken,
        _created_at: Instant,
    ) -> Option<Duration> {
        Some(value.ttl)
    }
}

/// Client-credentials access tokens, cached per client id and secret until shortly before
/// they expire.
pub(super) struct HotmartTokenCache {
    token_url: TokenUrl,
    client: reqwest::Client,
    cache: Cache<TokenKey, CachedToken>,
    secret_hasher: RandomState,
}

impl HotmartTokenCache {
    pub(super) fn new(auth_url: Url, client: reqwest::Client) -> Self {
        Self {
            token_url: TokenUrl::from_url(auth_url),
            client,
            cache: Cache::builder()
                .max_capacity(10_000)
                .expire_after(TokenExpiry)
                .build(),
            secret_hasher: RandomState::new(),
        }
    }

    fn key(&self, client_id: &str, client_secret: &str) -> TokenKey {
        (
            client_id.to_string(),
            self.secret_hasher.hash_one(client_secret),
        )
    }

    pub(super) async fn access_token(
        &self,
        credentials: &PlatformCredentials,
        call: CallOptions,
    ) -> Result<Arc<str>, AdapterError> {
        let client_id = credentials.require(PLATFORM, "client_id")?;
        let client_secret = credentials.require(PLATFORM, "client_secret")?;
        let key = self.key(client_id, client_secret);
        if let Some(cached) = self.cache.get(&key).await {
            return Ok(cached.access_token);
        }

        let token = self.exchange(client_id, client_secret, call).await?;
        self.cache.insert(key, token.clone()).await;
        Ok(token.access_token)
    }

    pub(super) async fn invalidate(&self, credentials: &PlatformCredentials) {
        if let (Some(client_id), Some(client_secret)) =
            (credentials.get("client_id"), credentials.get("client_secret"))
        {
            self.cache.invalidate(&self.key(client_id, client_secret)).await;
        }
    }

    async fn exchange(
        &self,
        client_id: &str,
        client_secret: &str,
        call: CallOptions,
    ) -> Result<CachedToken, AdapterError> {
        let oauth_client = BasicClient::new(ClientId::new(client_id.to_string()))
            .set_client_secret(ClientSecret::new(client_secret.to_string()))
            .set_token_uri(self.token_url.clone());

        let response = tokio::time::timeout(
            call.timeout,
            oauth_client
                .exchange_client_credentials()
                .request_async(&self.client),
        )
        .await
        .map_err(|_| AdapterError::Timeout {
            platform: PLATFORM,
            after: call.timeout,
        })?
        .map_err(|e| adapter_error_from_token_error(PLATFORM, call.timeout, e))?;

        let ttl = response
            .expires_in()
            .map_or(DEFAULT_TOKEN_TTL, |d| d.saturating_sub(EXPIRY_MARGIN))
            .max(MIN_TOKEN_TTL);
        debug!(platform = %PLATFORM, ttl_secs = ttl.as_secs(), "Access token issued");

        Ok(CachedToken {
            access_token: Arc::from(response.access_token().secret().as_str()),
            ttl,
        })
    }
}
