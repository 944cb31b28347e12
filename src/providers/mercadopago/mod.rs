use async_trait::async_trait;
use painel_schema::mercadopago::{MercadoPagoPayment, NextPage};
use painel_schema::{MercadoPagoErrorBody, MercadoPagoPaymentSearch, MercadoPagoUser};
use tracing::warn;
use url::Url;

use crate::config::PlatformResolvedConfig;
use crate::error::AdapterError;
use crate::providers::provider_endpoints::join_endpoint;
use crate::providers::upstream_retry::PlatformHttp;
use crate::providers::{
    ConnectRequest, ConnectionInfo, FetchRequest, NormalizedMetrics, PaymentMethod,
    PlatformAdapter, PlatformKind,
};

const PLATFORM: PlatformKind = PlatformKind::MercadoPago;
const PAGE_SIZE: u64 = 100;
const DATE_FORMAT: &str = "%Y-%m-%dT%H:%M:%S%.3fZ";

pub struct MercadoPagoAdapter {
    http: PlatformHttp,
    me_url: Url,
    search_url: Url,
    max_pages: usize,
}

impl MercadoPagoAdapter {
    pub fn new(cfg: &PlatformResolvedConfig) -> Result<Self, reqwest::Error> {
        Ok(Self {
            http: PlatformHttp::new(PLATFORM, cfg)?,
            me_url: join_endpoint(&cfg.api_url, "users/me"),
            search_url: join_endpoint(&cfg.api_url, "v1/payments/search"),
            max_pages: cfg.max_pages,
        })
    }
}

#[async_trait]
impl PlatformAdapter for MercadoPagoAdapter {
    fn kind(&self) -> PlatformKind {
        PLATFORM
    }

    async fn connect(&self, request: ConnectRequest<'_>) -> Result<ConnectionInfo, AdapterError> {
        let token = request.credentials.require(PLATFORM, "access_token")?;
        let user: MercadoPagoUser = self
            .http
            .fetch_json::<_, MercadoPagoErrorBody, _>(request.call, |client| {
                client.get(self.me_url.clone()).bearer_auth(token)
            })
            .await?;

        let remote_id = user.id.to_string();
        let requested = request.account_id.trim();
        if requested != "me" && requested != remote_id {
            return Err(AdapterError::AuthFailure {
                platform: PLATFORM,
                message: format!("access token belongs to account {remote_id}"),
            });
        }

        Ok(ConnectionInfo {
            account_id: remote_id,
            account_name: user.nickname,
            currency: None,
        })
    }

    async fn fetch_metrics(
        &self,
        request: FetchRequest<'_>,
    ) -> Result<NormalizedMetrics, AdapterError> {
        let token = request.credentials.require(PLATFORM, "access_token")?;
        let begin = request.window.start.format(DATE_FORMAT).to_string();
        let end = request.window.last_millisecond().format(DATE_FORMAT).to_string();
        let limit = PAGE_SIZE.to_string();

        let mut metrics = NormalizedMetrics::default();
        let mut offset = 0u64;

        for _ in 0..self.max_pages {
            let offset_param = offset.to_string();
            let page: MercadoPagoPaymentSearch = self
                .http
                .fetch_json::<_, MercadoPagoErrorBody, _>(request.call, |client| {
                    client
                        .get(self.search_url.clone())
                        .bearer_auth(token)
                        .query(&[
                            ("range", "date_created"),
                            ("begin_date", begin.as_str()),
                            ("end_date", end.as_str()),
                            ("sort", "date_created"),
                            ("criteria", "asc"),
                            ("limit", limit.as_str()),
                            ("offset", offset_param.as_str()),
                        ])
                })
                .await?;

            for payment in &page.results {
                accumulate_payment(&mut metrics, payment);
            }

            match page.next_page() {
                NextPage::Offset(next) => offset = next,
                NextPage::Done => return Ok(metrics),
                NextPage::Unknown => {
                    if !page.results.is_empty() {
                        warn!(
                            platform = %PLATFORM,
                            account_id = %request.account_id,
                            offset,
                            "Payment search page without paging total"
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
            "Payment search paging truncated"
        );
        metrics.mark_partial();
        Ok(metrics)
    }
}

fn payment_method(payment: &MercadoPagoPayment) -> PaymentMethod {
    match (
        payment.payment_type_id.as_deref(),
        payment.payment_method_id.as_deref(),
    ) {
        (Some("credit_card" | "debit_card" | "prepaid_card"), _) => PaymentMethod::Card,
        (Some("ticket"), _) => PaymentMethod::Boleto,
        (Some("bank_transfer"), Some("pix")) => PaymentMethod::Pix,
        _ => PaymentMethod::Other,
    }
}

fn accumulate_payment(metrics: &mut NormalizedMetrics, payment: &MercadoPagoPayment) {
    let amount = payment.transaction_amount;
    match payment.status.as_deref() {
        Some("approved") => {
            metrics.record_sale(amount, payment_method(payment));
            metrics.record_tax(payment.taxes_amount);
            if let Some(refunded) = payment.transaction_amount_refunded
                && refunded > 0.0
            {
                metrics.record_refund(Some(refunded));
            }
        }
        Some("refunded") => {
            metrics.record_refund(payment.transaction_amount_refunded.or(amount));
        }
        Some("charged_back") => metrics.record_chargeback(),
        Some("pending" | "in_process" | "authorized") => metrics.record_pending(amount),
        Some(_) => {}
        None => metrics.mark_partial(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn maps_statuses_methods_and_taxes() {
        let page: MercadoPagoPaymentSearch = serde_json::from_str(
            r#"{"results":[
                {"id":1,"status":"approved","transaction_amount":100.0,"taxes_amount":4.99,"payment_type_id":"bank_transfer","payment_method_id":"pix"},
                {"id":2,"status":"approved","transaction_amount":250,"payment_type_id":"credit_card","payment_method_id":"visa"},
                {"id":3,"status":"approved","transaction_amount":80,"payment_type_id":"ticket","payment_method_id":"bolbradesco"},
                {"id":4,"status":"approved","transaction_amount":5,"payment_type_id":"account_money"},
                {"id":5,"status":"refunded","transaction_amount":60,"transaction_amount_refunded":60},
                {"id":6,"status":"charged_back","transaction_amount":70},
                {"id":7,"status":"in_process","transaction_amount":33.33},
                {"id":8,"status":"rejected","transaction_amount":1000}
            ],"paging":{"total":8,"limit":100,"offset":0}}"#,
        )
        .expect("parse");

        let mut metrics = NormalizedMetrics::default();
        for payment in &page.results {
            accumulate_payment(&mut metrics, payment);
        }

        assert_eq!(metrics.revenue_cents, 10_000 + 25_000 + 8_000 + 500);
        assert_eq!(metrics.transaction_count, 4);
        assert_eq!(metrics.tax_cents, 499);
        assert_eq!(metrics.payments.pix_cents, 10_000);
        assert_eq!(metrics.payments.card_cents, 25_000);
        assert_eq!(metrics.payments.boleto_cents, 8_000);
        assert_eq!(metrics.payments.other_cents, 500);
        assert_eq!(metrics.refunded_amount_cents, 6_000);
        assert_eq!(metrics.chargeback_count, 1);
        assert_eq!(metrics.pending_amount_cents, 3_333);
        assert!(!metrics.partial);
        assert_eq!(page.next_page(), NextPage::Done);
    }

    #[test]
    fn partial_refund_of_approved_payment_is_counted() {
        let payment: MercadoPagoPayment = serde_json::from_str(
            r#"{"id":9,"status":"approved","transaction_amount":100,"transaction_amount_refunded":"25.50","payment_type_id":"credit_card"}"#,
        )
        .expect("parse");

        let mut metrics = NormalizedMetrics::default();
        accumulate_payment(&mut metrics, &payment);
        assert_eq!(metrics.revenue_cents, 10_000);
        assert_eq!(metrics.transaction_count, 1);
        assert_eq!(metrics.refunded_amount_cents, 2_550);
        assert_eq!(metrics.refunded_count, 1);
        assert!(!metrics.partial);
    }
}
