use serde::{Deserialize, Deserializer};
use serde_json::Value;

/// Deserializes a monetary or count field that platforms send either as a JSON number or as
/// a decimal string (Facebook sends `"spend": "12.34"`).
///
/// `null`, a missing field, an empty string or an unparseable string all become `None`.
pub fn lenient_f64<'de, D>(deserializer: D) -> Result<Option<f64>, D::Error>
where
    D: Deserializer<'de>,
{
    let value = Option::<Value>::deserialize(deserializer)?;
    Ok(value.as_ref().and_then(value_as_f64))
}

fn value_as_f64(value: &Value) -> Option<f64> {
    match value {
        Value::Number(n) => n.as_f64(),
        Value::String(s) => {
            let s = s.trim();
            if s.is_empty() {
                return None;
            }
            // Some platforms localize decimals ("1234,56").
            s.parse::<f64>()
                .ok()
                .or_else(|| s.replace(',', ".").parse::<f64>().ok())
        }
        _ => None,
    }
    .filter(|v| v.is_finite())
}
