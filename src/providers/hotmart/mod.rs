mod token;

use async_trait::async_trait;
use painel_schema::hotmart::HotmartSale;
use painel_schema::{HotmartErrorBody, HotmartSalesHistory};
use tracing::{debug, info, warn};
use url::Url;

use crate::config::HotmartResolvedConfig;
use crate::error::AdapterError;
use crate::providers::provider_endpoints::join_endpoint;
use crate::providers::upstream_retry::PlatformHttp;
use crate::providers::{
    CallOptions, ConnectRequest, ConnectionInfo, FetchRequest, NormalizedMetrics, PaymentMethod,
    PlatformAdapter, PlatformCredentials, PlatformKind, SyncWindow,
};

use token::HotmartTokenCache;

const PLATFORM: PlatformKind = PlatformKind::Hotmart;
const SALES_HISTORY_PATH: &str = "payments/api/v1/sales/history";
const PAGE_SIZE: &str = "500";

pub struct HotmartAdapter {
    http: PlatformHttp,
    sales_url: Url,
    tokens: HotmartTokenCache,
    max_pages: usize,
}

impl HotmartAdapter {
    pub fn new(cfg: &HotmartResolvedConfig) -> Result<Self, reqwest::Error> {
        let http = PlatformHttp::new(PLATFORM, &cfg.common)?;
        Ok(Self {
            tokens: HotmartTokenCache::new(cfg.auth_url.clone(), http.client().clone()),
            sales_url: join_endpoint(&cfg.common.api_url, SALES_HISTORY_PATH),
            http,
            max_pages: cfg.common.max_pages,
        })
    }

    async fn sales_page(
        &self,
        credentials: &PlatformCredentials,
        call: CallOptions,
        window: SyncWindow,
        max_results: &str,
        page_token: Option<&str>,
    ) -> Result<HotmartSalesHistory, AdapterError> {
        let start_ms = window.start.timestamp_millis().to_string();
        let end_ms = window.last_millisecond().timestamp_millis().to_string();
        let product_id = credentials.get("product_id");

        let mut refreshed = false;
        loop {
            let access_token = self.tokens.access_token(credentials, call).await?;
            let result = self
                .http
                .fetch_json::<HotmartSalesHistory, HotmartErrorBody, _>(call, |client| {
                    let mut query = vec![
                        ("start_date", start_ms.as_str()),
                        ("end_date", end_ms.as_str()),
                        ("max_results", max_results),
                    ];
                    if let Some(token) = page_token {
                        query.push(("page_token", token));
                    }
                    if let Some(product_id) = product_id {
                        query.push(("product_id", product_id));
                    }
                    client
                        .get(self.sales_url.clone())
                        .bearer_auth(&access_token)
                        .query(&query)
                })
                .await;

            match result {
                // A cached token may have been revoked remotely; retry once with a fresh one.
                Err(AdapterError::AuthFailure { .. }) if !refreshed => {
                    debug!(platform = %PLATFORM, "Access token rejected, refreshing");
                    self.tokens.invalidate(credentials).await;
                    refreshed = true;
                }
                other => return other,
            }
        }
    }
}

#[async_trait]
impl PlatformAdapter for HotmartAdapter {
    fn kind(&self) -> PlatformKind {
        PLATFORM
    }

    async fn connect(&self, request: ConnectRequest<'_>) -> Result<ConnectionInfo, AdapterError> {
        request.credentials.validate_for(PLATFORM)?;
        self.tokens.invalidate(request.credentials).await;

        let window = SyncWindow::day_of(chrono::Utc::now());
        let probe = self
            .sales_page(request.credentials, request.call, window, "1", None)
            .await?;

        let account_name = probe
            .items
            .first()
            .and_then(|sale| sale.product.as_ref())
            .and_then(|product| product.name.clone())
            .filter(|_| request.credentials.get("product_id").is_some());

        info!(platform = %PLATFORM, account_id = %request.account_id, "Credentials accepted");
        Ok(ConnectionInfo {
            account_id: request.account_id.to_string(),
            account_name,
            currency: None,
        })
    }

    async fn disconnect(
        &self,
        credentials: &PlatformCredentials,
        _call: CallOptions,
    ) -> Result<(), AdapterError> {
        self.tokens.invalidate(credentials).await;
        Ok(())
    }

    async fn fetch_metrics(
        &self,
        request: FetchRequest<'_>,
    ) -> Result<NormalizedMetrics, AdapterError> {
        request.credentials.validate_for(PLATFORM)?;

        let mut metrics = NormalizedMetrics::default();
        let mut page_token: Option<String> = None;

        for _ in 0..self.max_pages {
            let page = self
                .sales_page(
                    request.credentials,
                    request.call,
                    request.window,
                    PAGE_SIZE,
                    page_token.as_deref(),
                )
                .await?;

            for sale in &page.items {
                accumulate_sale(&mut metrics, sale);
            }

            match page.next_page_token() {
                Some(next) => page_token = Some(next.to_string()),
                None => return Ok(metrics),
            }
        }

        warn!(
            platform = %PLATFORM,
            account_id = %request.account_id,
            max_pages = self.max_pages,
            "Sales history paging truncated"
        );
        metrics.mark_partial();
        Ok(metrics)
    }
}

fn payment_method(payment_type: Option<&str>) -> PaymentMethod {
    match payment_type {
        Some("PIX") => PaymentMethod::Pix,
        Some("CREDIT_CARD") => PaymentMethod::Card,
        Some("BILLET") => PaymentMethod::Boleto,
        _ => PaymentMethod::Other,
    }
}

fn accumulate_sale(metrics: &mut NormalizedMetrics, sale: &HotmartSale) {
    let Some(purchase) = sale.purchase.as_ref() else {
        metrics.mark_partial();
        return;
    };
    let amount = purchase.price.as_ref().and_then(|p| p.value);
    let method = payment_method(purchase.payment.as_ref().and_then(|p| p.r#type.as_deref()));

    match purchase.status.as_deref() {
        Some("APPROVED" | "COMPLETE") => metrics.record_sale(amount, method),
        Some("REFUNDED") => metrics.record_refund(amount),
        Some("CHARGEBACK") => metrics.record_chargeback(),
        Some("WAITING_PAYMENT" | "BILLET_PRINTED" | "STARTED") => metrics.record_pending(amount),
        Some(_) => {}
        None => metrics.mark_partial(),
    }
}
