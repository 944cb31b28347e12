use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::collections::BTreeMap;

use crate::amount::lenient_f64;

/// `GET /{version}/act_{id}/insights` response.
#[derive(Debug, Clone, Default, Deserialize, Serialize)]
pub struct FacebookInsightsResponse {
    #[serde(default)]
    pub data: Vec<FacebookInsightRow>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub paging: Option<FacebookPaging>,
}

#[derive(Debug, Clone, Default, Deserialize, Serialize)]
pub struct FacebookInsightRow {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub account_id: Option<String>,

    /// Spend in the account currency, sent as a decimal string.
    #[serde(default, deserialize_with = "lenient_f64")]
    pub spend: Option<f64>,

    #[serde(default, deserialize_with = "lenient_f64")]
    pub impressions: Option<f64>,

    #[serde(default, deserialize_with = "lenient_f64")]
    pub clicks: Option<f64>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub date_start: Option<String>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub date_stop: Option<String>,

    #[serde(flatten)]
    #[serde(skip_serializing_if = "BTreeMap::is_empty")]
    pub extra: BTreeMap<String, Value>,
}

#[derive(Debug, Clone, Default, Deserialize, Serialize)]
pub struct FacebookPaging {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub cursors: Option<FacebookCursors>,

    /// Absolute URL of the next page; absent on the last page.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub next: Option<String>,
}

#[derive(Debug, Clone, Default, Deserialize, Serialize)]
pub struct FacebookCursors {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub before: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub after: Option<String>,
}
