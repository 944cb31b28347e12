use serde::{Deserialize, Serialize};

/// `GET /{version}/act_{id}?fields=id,account_id,name,currency,account_status`.
#[derive(Debug, Clone, Default, Deserialize, Serialize)]
pub struct FacebookAdAccount {
    /// Graph node id, `act_<account_id>`.
    #[serde(default)]
    pub id: String,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub account_id: Option<String>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub currency: Option<String>,

    /// 1 = active; anything else is disabled, unsettled, in review, closed, ...
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub account_status: Option<i64>,
}

impl FacebookAdAccount {
    pub fn is_active(&self) -> bool {
        self.account_status == Some(1)
    }
}
