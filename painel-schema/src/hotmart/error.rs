use serde::{Deserialize, Serialize};

/// Hotmart error payload, shared by the security (OAuth) and payments APIs.
#[derive(Debug, Default, Deserialize, Serialize)]
pub struct HotmartErrorBody {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error_description: Option<String>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub message: Option<String>,
}

impl HotmartErrorBody {
    pub fn is_token_error(&self) -> bool {
        matches!(
            self.error.as_deref(),
            Some("invalid_token") | Some("invalid_client") | Some("unauthorized")
        )
    }

    pub fn describe(&self) -> String {
        self.error_description
            .as_deref()
            .or(self.message.as_deref())
            .or(self.error.as_deref())
            .unwrap_or("unknown hotmart error")
            .to_string()
    }
}
