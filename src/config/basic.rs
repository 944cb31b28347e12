use serde::{Deserialize, Deserializer, Serialize};
use std::net::{Ipv4Addr, SocketAddr};

/// Server, storage and logging settings (`basic` table).
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct BasicConfig {
    /// Socket the HTTP surface binds to.
    /// TOML: `basic.listen`. Default: `0.0.0.0:8190`.
    pub listen: SocketAddr,

    /// TOML: `basic.database_url`. Default: `sqlite://painel.db`.
    pub database_url: String,

    /// Fallback tracing filter when `RUST_LOG` is unset.
    /// TOML: `basic.loglevel`. Default: `info`.
    pub loglevel: String,

    /// Shared service key checked on every `/api` route. Required.
    /// TOML: `basic.painel_key`; numeric TOML values are accepted as text.
    #[serde(deserialize_with = "deserialize_key")]
    pub painel_key: String,
}

impl Default for BasicConfig {
    fn default() -> Self {
        Self {
            listen: SocketAddr::from((Ipv4Addr::UNSPECIFIED, 8190)),
            database_url: "sqlite://painel.db".to_string(),
            loglevel: "info".to_string(),
            painel_key: String::new(),
        }
    }
}

#[derive(Deserialize)]
#[serde(untagged)]
enum LaxKey {
    Text(String),
    Int(i64),
    Float(f64),
}

fn deserialize_key<'de, D>(deserializer: D) -> Result<String, D::Error>
where
    D: Deserializer<'de>,
{
    Ok(match LaxKey::deserialize(deserializer)? {
        LaxKey::Text(s) => s,
        LaxKey::Int(n) => n.to_string(),
        LaxKey::Float(n) => n.to_string(),
    })
}
