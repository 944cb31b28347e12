use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::collections::BTreeMap;

/// Graph API error envelope.
#[derive(Debug, Deserialize, Serialize)]
pub struct FacebookErrorBody {
    #[serde(default)]
    pub error: FacebookErrorObject,
}

#[derive(Debug, Default, Deserialize, Serialize)]
pub struct FacebookErrorObject {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub message: Option<String>,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub r#type: Option<String>,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub code: Option<i64>,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub error_subcode: Option<i64>,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub fbtrace_id: Option<String>,

    #[serde(flatten)]
    #[serde(skip_serializing_if = "BTreeMap::is_empty")]
    pub extra: BTreeMap<String, Value>,
}

impl FacebookErrorBody {
    /// Expired, revoked or malformed access token.
    pub fn is_token_error(&self) -> bool {
        matches!(self.error.code, Some(102) | Some(190))
            || (self.error.r#type.as_deref() == Some("OAuthException")
                && matches!(self.error.code, Some(10) | Some(200)))
    }

    /// Application, user or ad-account level throttling.
    pub fn is_throttled(&self) -> bool {
        matches!(
            self.error.code,
            Some(4) | Some(17) | Some(32) | Some(613) | Some(80000..=80014)
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn expired_token_is_token_error() {
        let raw = r#"{"error":{"message":"Error validating access token","type":"OAuthException","code":190,"error_subcode":463}}"#;
        let body: FacebookErrorBody = serde_json::from_str(raw).expect("parse");
        assert!(body.is_token_error());
        assert!(!body.is_throttled());
    }

    #[test]
    fn ads_insights_throttle_is_throttled() {
        let raw = r#"{"error":{"message":"too many calls","type":"OAuthException","code":80004}}"#;
        let body: FacebookErrorBody = serde_json::from_str(raw).expect("parse");
        assert!(body.is_throttled());
        assert!(!body.is_token_error());
    }
}
