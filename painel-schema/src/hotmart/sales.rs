use serde::{Deserialize, Serialize};

use crate::amount::lenient_f64;

/// `GET /payments/api/v1/sales/history` response.
#[derive(Debug, Clone, Default, Deserialize, Serialize)]
pub struct HotmartSalesHistory {
    #[serde(default)]
    pub items: Vec<HotmartSale>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub page_info: Option<HotmartPageInfo>,
}

impl HotmartSalesHistory {
    pub fn next_page_token(&self) -> Option<&str> {
        self.page_info
            .as_ref()
            .and_then(|p| p.next_page_token.as_deref())
            .filter(|t| !t.is_empty())
    }
}

#[derive(Debug, Clone, Default, Deserialize, Serialize)]
pub struct HotmartPageInfo {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub total_results: Option<u64>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub next_page_token: Option<String>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub prev_page_token: Option<String>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub results_per_page: Option<u64>,
}

#[derive(Debug, Clone, Default, Deserialize, Serialize)]
pub struct HotmartSale {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub product: Option<HotmartProduct>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub purchase: Option<HotmartPurchase>,
}

#[derive(Debug, Clone, Default, Deserialize, Serialize)]
pub struct HotmartProduct {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub id: Option<i64>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
}

#[derive(Debug, Clone, Default, Deserialize, Serialize)]
pub struct HotmartPurchase {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub transaction: Option<String>,

    /// `APPROVED`, `COMPLETE`, `REFUNDED`, `CHARGEBACK`, `WAITING_PAYMENT`, ...
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub status: Option<String>,

    /// Milliseconds since the Unix epoch.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub order_date: Option<i64>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub approved_date: Option<i64>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub price: Option<HotmartPrice>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub payment: Option<HotmartPayment>,
}

#[derive(Debug, Clone, Default, Deserialize, Serialize)]
pub struct HotmartPrice {
    #[serde(default, deserialize_with = "lenient_f64")]
    pub value: Option<f64>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub currency_code: Option<String>,
}

#[derive(Debug, Clone, Default, Deserialize, Serialize)]
pub struct HotmartPayment {
    /// `PIX`, `CREDIT_CARD`, `BILLET`, `PAYPAL`, ...
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub r#type: Option<String>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub installments_number: Option<u32>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parse_sales_page_with_next_token() {
        let raw = r#"{
            "items": [
                {
                    "product": {"id": 42, "name": "Curso"},
                    "purchase": {
                        "transaction": "HP1",
                        "status": "APPROVED",
                        "order_date": 1714521600000,
                        "price": {"value": 197.0, "currency_code": "BRL"},
                        "payment": {"type": "PIX", "installments_number": 1}
                    }
                }
            ],
            "page_info": {"total_results": 30, "next_page_token": "tok-2", "results_per_page": 1}
        }"#;

        let parsed: HotmartSalesHistory = serde_json::from_str(raw).expect("parse");
        assert_eq!(parsed.items.len(), 1);
        assert_eq!(parsed.next_page_token(), Some("tok-2"));

        let purchase = parsed.items[0].purchase.as_ref().expect("purchase");
        assert_eq!(purchase.status.as_deref(), Some("APPROVED"));
        assert_eq!(purchase.price.as_ref().and_then(|p| p.value), Some(197.0));
    }

    #[test]
    fn empty_next_token_means_last_page() {
        let raw = r#"{"items": [], "page_info": {"next_page_token": ""}}"#;
        let parsed: HotmartSalesHistory = serde_json::from_str(raw).expect("parse");
        assert_eq!(parsed.next_page_token(), None);
    }
}
