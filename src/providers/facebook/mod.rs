//! Facebook Ads (Graph API). Reports ad spend only; revenue comes from the sales platforms.

use async_trait::async_trait;
use painel_schema::{FacebookAdAccount, FacebookErrorBody, FacebookInsightsResponse};
use tracing::{debug, warn};
use url::Url;

use crate::config::FacebookResolvedConfig;
use crate::error::AdapterError;
use crate::providers::provider_endpoints::join_endpoint;
use crate::providers::upstream_retry::PlatformHttp;
use crate::providers::{
    ConnectRequest, ConnectionInfo, FetchRequest, NormalizedMetrics, PlatformAdapter, PlatformKind,
};

const PLATFORM: PlatformKind = PlatformKind::Facebook;
const ACCOUNT_FIELDS: &str = "id,account_id,name,currency,account_status";
const INSIGHT_FIELDS: &str = "account_id,spend,impressions,clicks";

pub struct FacebookAdapter {
    http: PlatformHttp,
    api_url: Url,
    api_version: String,
    max_pages: usize,
}

impl FacebookAdapter {
    pub fn new(cfg: &FacebookResolvedConfig) -> Result<Self, reqwest::Error> {
        Ok(Self {
            http: PlatformHttp::new(PLATFORM, &cfg.common)?,
            api_url: cfg.common.api_url.clone(),
            api_version: cfg.api_version.clone(),
            max_pages: cfg.common.max_pages,
        })
    }

    fn account_url(&self, account_id: &str, edge: Option<&str>) -> Url {
        let node = format!(
            "{}/act_{}",
            self.api_version,
            account_id.trim().trim_start_matches("act_")
        );
        let path = match edge {
            Some(edge) => format!("{node}/{edge}"),
            None => node,
        };
        join_endpoint(&self.api_url, &path)
    }
}

#[async_trait]
impl PlatformAdapter for FacebookAdapter {
    fn kind(&self) -> PlatformKind {
        PLATFORM
    }

    async fn connect(&self, request: ConnectRequest<'_>) -> Result<ConnectionInfo, AdapterError> {
        let token = request.credentials.require(PLATFORM, "access_token")?;
        let url = self.account_url(request.account_id, None);

        let account: FacebookAdAccount = self
            .http
            .fetch_json::<_, FacebookErrorBody, _>(request.call, |client| {
                client
                    .get(url.clone())
                    .bearer_auth(token)
                    .query(&[("fields", ACCOUNT_FIELDS)])
            })
            .await?;

        if !account.is_active() {
            warn!(
                platform = %PLATFORM,
                account_id = %request.account_id,
                account_status = ?account.account_status,
                "Ad account is not active; spend may be missing"
            );
        }

        Ok(ConnectionInfo {
            account_id: account
                .account_id
                .unwrap_or_else(|| request.account_id.trim_start_matches("act_").to_string()),
            account_name: account.name,
            currency: account.currency,
        })
    }

    async fn fetch_metrics(
        &self,
        request: FetchRequest<'_>,
    ) -> Result<NormalizedMetrics, AdapterError> {
        let token = request.credentials.require(PLATFORM, "access_token")?;
        let time_range = serde_json::json!({
            "since": request.window.start.format("%Y-%m-%d").to_string(),
            "until": request.window.last_second().format("%Y-%m-%d").to_string(),
        })
        .to_string();

        let mut metrics = NormalizedMetrics::default();
        let mut next_url: Option<Url> = None;

        for page_no in 0..self.max_pages {
            let page: FacebookInsightsResponse = match next_url.take() {
                None => {
                    let url = self.account_url(request.account_id, Some("insights"));
                    self.http
                        .fetch_json::<_, FacebookErrorBody, _>(request.call, |client| {
                            client.get(url.clone()).bearer_auth(token).query(&[
                                ("fields", INSIGHT_FIELDS),
                                ("level", "account"),
                                ("time_range", time_range.as_str()),
                            ])
                        })
                        .await?
                }
                Some(url) => {
                    self.http
                        .fetch_json::<_, FacebookErrorBody, _>(request.call, |client| {
                            client.get(url.clone()).bearer_auth(token)
                        })
                        .await?
                }
            };

            accumulate_insights(&mut metrics, &page);
            debug!(
                platform = %PLATFORM,
                account_id = %request.account_id,
                page = page_no,
                rows = page.data.len(),
                "Insights page mapped"
            );

            match page.paging.as_ref().and_then(|p| p.next.as_deref()) {
                Some(next) => {
                    next_url = Some(Url::parse(next).map_err(|e| AdapterError::Decode {
                        platform: PLATFORM,
                        message: format!("invalid paging.next: {e}"),
                    })?);
                }
                None => return Ok(metrics),
            }
        }

        warn!(
            platform = %PLATFORM,
            account_id = %request.account_id,
            max_pages = self.max_pages,
            "Insights paging truncated"
        );
        metrics.mark_partial();
        Ok(metrics)
    }
}

fn accumulate_insights(metrics: &mut NormalizedMetrics, page: &FacebookInsightsResponse) {
    for row in &page.data {
        metrics.record_ad_spend(row.spend);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn sums_spend_and_flags_missing_rows() {
        let raw = r#"{
            "data": [
                {"account_id": "1", "spend": "120.50", "date_start": "2024-05-01", "date_stop": "2024-05-01"},
                {"account_id": "1", "spend": 79.5},
                {"account_id": "1"}
            ]
        }"#;
        let page: FacebookInsightsResponse = serde_json::from_str(raw).expect("parse");
        let mut metrics = NormalizedMetrics::default();
        accumulate_insights(&mut metrics, &page);

        assert_eq!(metrics.ad_spend_cents, 20_000);
        assert_eq!(metrics.revenue_cents, 0);
        assert_eq!(metrics.transaction_count, 0);
        assert!(metrics.partial);
    }

    #[test]
    fn empty_insights_are_complete_zeroes() {
        let page: FacebookInsightsResponse = serde_json::from_str(r#"{"data":[]}"#).expect("parse");
        let mut metrics = NormalizedMetrics::default();
        accumulate_insights(&mut metrics, &page);
        assert_eq!(metrics, NormalizedMetrics::default());
    }
}
