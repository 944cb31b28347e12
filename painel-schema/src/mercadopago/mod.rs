use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::amount::lenient_f64;

/// `GET /users/me`
#[derive(Debug, Clone, Default, Deserialize, Serialize)]
pub struct MercadoPagoUser {
    #[serde(default)]
    pub id: i64,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub nickname: Option<String>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub site_id: Option<String>,
}

/// `GET /v1/payments/search`
#[derive(Debug, Clone, Default, Deserialize, Serialize)]
pub struct MercadoPagoPaymentSearch {
    #[serde(default)]
    pub results: Vec<MercadoPagoPayment>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub paging: Option<MercadoPagoPaging>,
}

/// Where a payment search continues after the current page.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum NextPage {
    Offset(u64),
    Done,
    /// The response carried no `paging.total`, so the end cannot be told.
    Unknown,
}

impl MercadoPagoPaymentSearch {
    pub fn next_page(&self) -> NextPage {
        let Some(paging) = self.paging.as_ref() else {
            return NextPage::Unknown;
        };
        let Some(total) = paging.total else {
            return NextPage::Unknown;
        };
        let offset = paging.offset.unwrap_or(0);
        let limit = paging.limit.unwrap_or(self.results.len() as u64);
        let next = offset.saturating_add(limit);
        if limit > 0 && next < total {
            NextPage::Offset(next)
        } else {
            NextPage::Done
        }
    }
}

#[derive(Debug, Clone, Default, Deserialize, Serialize)]
pub struct MercadoPagoPaging {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub total: Option<u64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub limit: Option<u64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub offset: Option<u64>,
}

#[derive(Debug, Clone, Default, Deserialize, Serialize)]
pub struct MercadoPagoPayment {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub id: Option<i64>,

    /// `approved`, `pending`, `in_process`, `refunded`, `charged_back`, `rejected`, ...
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub status: Option<String>,

    #[serde(default, deserialize_with = "lenient_f64")]
    pub transaction_amount: Option<f64>,

    #[serde(default, deserialize_with = "lenient_f64")]
    pub transaction_amount_refunded: Option<f64>,

    #[serde(default, deserialize_with = "lenient_f64")]
    pub taxes_amount: Option<f64>,

    /// `credit_card`, `debit_card`, `ticket`, `bank_transfer`, `account_money`, ...
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub payment_type_id: Option<String>,

    /// `pix`, `bolbradesco`, `visa`, `master`, ...
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub payment_method_id: Option<String>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub date_created: Option<String>,
}

#[derive(Debug, Default, Deserialize, Serialize)]
pub struct MercadoPagoErrorBody {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub message: Option<String>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub status: Option<u16>,

    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub cause: Vec<Value>,
}

impl MercadoPagoErrorBody {
    pub fn is_token_error(&self) -> bool {
        matches!(
            self.error.as_deref(),
            Some("unauthorized") | Some("invalid_token") | Some("invalid_access_token")
        ) || self
            .message
            .as_deref()
            .is_some_and(|m| m.to_ascii_lowercase().contains("invalid access token"))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn next_page_stops_at_total() {
        let raw = r#"{"results":[{"id":1,"status":"approved","transaction_amount":10}],"paging":{"total":120,"limit":50,"offset":50}}"#;
        let page: MercadoPagoPaymentSearch = serde_json::from_str(raw).expect("parse");
        assert_eq!(page.next_page(), NextPage::Offset(100));

        let last: MercadoPagoPaymentSearch =
            serde_json::from_str(r#"{"results":[],"paging":{"total":120,"limit":50,"offset":100}}"#)
                .expect("parse");
        assert_eq!(last.next_page(), NextPage::Done);

        let bare: MercadoPagoPaymentSearch =
            serde_json::from_str(r#"{"results":[{"id":1,"status":"approved"}],"paging":{"limit":50}}"#)
                .expect("parse");
        assert_eq!(bare.next_page(), NextPage::Unknown);
    }

    #[test]
    fn invalid_token_message_is_token_error() {
        let raw = r#"{"message":"invalid access token","error":"bad_request","status":400,"cause":[]}"#;
        let body: MercadoPagoErrorBody = serde_json::from_str(raw).expect("parse");
        assert!(body.is_token_error());
    }
}
