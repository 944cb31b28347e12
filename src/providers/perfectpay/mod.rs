use async_trait::async_trait;
use painel_schema::perfectpay::PerfectPaySale;
use painel_schema::{PerfectPayErrorBody, PerfectPaySalesPage, PerfectPaySalesQuery};
use tracing::warn;
use url::Url;

use crate::config::PlatformResolvedConfig;
use crate::error::AdapterError;
use crate::providers::provider_endpoints::join_endpoint;
use crate::providers::upstream_retry::PlatformHttp;
use crate::providers::{
    CallOptions, ConnectRequest, ConnectionInfo, FetchRequest, NormalizedMetrics, PaymentMethod,
    PlatformAdapter, PlatformCredentials, PlatformKind, SyncWindow,
};

const PLATFORM: PlatformKind = PlatformKind::PerfectPay;

pub struct PerfectPayAdapter {
    http: PlatformHttp,
    sales_url: Url,
    max_pages: usize,
}

impl PerfectPayAdapter {
    pub fn new(cfg: &PlatformResolvedConfig) -> Result<Self, reqwest::Error> {
        Ok(Self {
            http: PlatformHttp::new(PLATFORM, cfg)?,
            sales_url: join_endpoint(&cfg.api_url, "sales/get"),
            max_pages: cfg.max_pages,
        })
    }

    async fn sales_page(
        &self,
        credentials: &PlatformCredentials,
        call: CallOptions,
        window: SyncWindow,
        page: u32,
    ) -> Result<PerfectPaySalesPage, AdapterError> {
        let token = credentials.require(PLATFORM, "api_token")?;
        let query = PerfectPaySalesQuery {
            start_date_sale: window.start.format("%Y-%m-%d").to_string(),
            end_date_sale: window.last_second().format("%Y-%m-%d").to_string(),
            page,
            product_code: credentials.get("product_code").map(str::to_string),
        };

        self.http
            .fetch_json::<_, PerfectPayErrorBody, _>(call, |client| {
                client
                    .post(self.sales_url.clone())
                    .bearer_auth(token)
                    .json(&query)
            })
            .await
    }
}

#[async_trait]
impl PlatformAdapter for PerfectPayAdapter {
    fn kind(&self) -> PlatformKind {
        PLATFORM
    }

    async fn connect(&self, request: ConnectRequest<'_>) -> Result<ConnectionInfo, AdapterError> {
        request.credentials.validate_for(PLATFORM)?;
        let window = SyncWindow::day_of(chrono::Utc::now());
        self.sales_page(request.credentials, request.call, window, 1)
            .await?;

        Ok(ConnectionInfo {
            account_id: request.account_id.to_string(),
            account_name: None,
            currency: Some("BRL".to_string()),
        })
    }

    async fn fetch_metrics(
        &self,
        request: FetchRequest<'_>,
    ) -> Result<NormalizedMetrics, AdapterError> {
        request.credentials.validate_for(PLATFORM)?;
        let mut metrics = NormalizedMetrics::default();

        for page_no in 1..=self.max_pages {
            let page_no = u32::try_from(page_no).unwrap_or(u32::MAX);
            let page = self
                .sales_page(request.credentials, request.call, request.window, page_no)
                .await?;

            for sale in &page.data {
                accumulate_sale(&mut metrics, sale);
            }

            match page.has_more() {
                Some(true) => {}
                Some(false) => return Ok(metrics),
                None => {
                    if !page.data.is_empty() {
                        warn!(
                            platform = %PLATFORM,
                            account_id = %request.account_id,
                            page = page_no,
                            "Sales page without paging counters"
                        );
                        metrics.mark_partial();
                    }
                    return Ok(metrics);
                }
            }
        }

        warn!(
            platform = %PLATFORM,
            account_id = %request.account_id,
            max_pages = self.max_pages,
            "Sales paging truncated"
        );
        metrics.mark_partial();
        Ok(metrics)
    }
}

fn payment_method(payment_type: Option<i64>) -> PaymentMethod {
    match payment_type {
        Some(1 | 4) => PaymentMethod::Card,
        Some(2 | 6) => PaymentMethod::Boleto,
        Some(7) => PaymentMethod::Pix,
        _ => PaymentMethod::Other,
    }
}

fn accumulate_sale(metrics: &mut NormalizedMetrics, sale: &PerfectPaySale) {
    let amount = sale.sale_amount;
    match sale.sale_status_enum {
        Some(2 | 10) => metrics.record_sale(amount, payment_method(sale.payment_type_enum)),
        Some(7) => metrics.record_refund(amount),
        Some(9) => metrics.record_chargeback(),
        Some(1 | 3) => metrics.record_pending(amount),
        Some(_) => {}
        None => metrics.mark_partial(),
    }
}
