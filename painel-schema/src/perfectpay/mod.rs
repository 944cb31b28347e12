use serde::{Deserialize, Serialize};

use crate::amount::lenient_f64;

/// Body of `POST /sales/get`.
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct PerfectPaySalesQuery {
    /// `YYYY-MM-DD`
    pub start_date_sale: String,
    /// `YYYY-MM-DD`
    pub end_date_sale: String,
    pub page: u32,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub product_code: Option<String>,
}

#[derive(Debug, Clone, Default, Deserialize, Serialize)]
pub struct PerfectPaySalesPage {
    #[serde(default)]
    pub data: Vec<PerfectPaySale>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub total_pages: Option<u32>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub current_page: Option<u32>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub total_items: Option<u64>,
}

impl PerfectPaySalesPage {
    /// Whether pages follow this one; `None` when the page counters are absent.
    pub fn has_more(&self) -> Option<bool> {
        let current = self.current_page?;
        let total = self.total_pages?;
        Some(current < total)
    }
}

#[derive(Debug, Clone, Default, Deserialize, Serialize)]
pub struct PerfectPaySale {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub code: Option<String>,

    #[serde(default, deserialize_with = "lenient_f64")]
    pub sale_amount: Option<f64>,

    /// 1 pending, 2 approved, 3 in process, 4 in mediation, 5 rejected, 6 cancelled,
    /// 7 returned/refunded, 8 authorized, 9 charged back, 10 completed, ...
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub sale_status_enum: Option<i64>,

    /// 0 none, 1 credit card, 2 boleto, 3 paypal, 4 credit card recurrent, 5 free,
    /// 6 boleto installments, 7 pix, ...
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub payment_type_enum: Option<i64>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub product: Option<PerfectPayProduct>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub date_created: Option<String>,
}

#[derive(Debug, Clone, Default, Deserialize, Serialize)]
pub struct PerfectPayProduct {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub code: Option<String>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
}

#[derive(Debug, Default, Deserialize, Serialize)]
pub struct PerfectPayErrorBody {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub message: Option<String>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn has_more_follows_page_counters() {
        let raw = r#"{"data":[{"code":"PPCPMTB1","sale_amount":"97.00","sale_status_enum":2,"payment_type_enum":7}],"total_pages":3,"current_page":1}"#;
        let page: PerfectPaySalesPage = serde_json::from_str(raw).expect("parse");
        assert_eq!(page.has_more(), Some(true));
        assert_eq!(page.data[0].sale_amount, Some(97.0));

        let last: PerfectPaySalesPage =
            serde_json::from_str(r#"{"data":[],"total_pages":3,"current_page":3}"#).expect("parse");
        assert_eq!(last.has_more(), Some(false));

        let bare: PerfectPaySalesPage =
            serde_json::from_str(r#"{"data":[{"sale_amount":10}]}"#).expect("parse");
        assert_eq!(bare.has_more(), None);
    }

    #[test]
    fn query_omits_unset_product_code() {
        let query = PerfectPaySalesQuery {
            start_date_sale: "2024-05-01".to_string(),
            end_date_sale: "2024-05-01".to_string(),
            page: 1,
            product_code: None,
        };
        let out = serde_json::to_value(&query).expect("serialize");
        assert_eq!(
            out,
            serde_json::json!({"start_date_sale":"2024-05-01","end_date_sale":"2024-05-01","page":1})
        );
    }
}
