use serde::Deserialize;
use tracing::warn;

/// Server settings, taken from `initializationOptions`.
#[derive(Debug, Clone, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase", default)]
pub struct ServerConfig {
    /// Directory under a workspace root holding vendored packages.
    pub vendor_dir: String,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            vendor_dir: "vendor".into(),
        }
    }
}

impl ServerConfig {
    /// Parse settings from the client, falling back to defaults on
    /// missing or malformed input.
    pub fn from_value(value: Option<serde_json::Value>) -> Self {
        match value {
            Some(value) => match serde_json::from_value(value) {
                Ok(config) => config,
                Err(err) => {
                    warn!("Malformed initialization options, using defaults: {err}");
                    Self::default()
                }
            },
            None => Self::default(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn defaults() {
        let config = ServerConfig::from_value(None);
        assert_eq!(config.vendor_dir, "vendor");
    }

    #[test]
    fn parses_vendor_dir() {
        let config = ServerConfig::from_value(Some(json!({ "vendorDir": "third_party" })));
        assert_eq!(config.vendor_dir, "third_party");
    }

    #[test]
    fn malformed_falls_back_to_defaults() {
        let config = ServerConfig::from_value(Some(json!({ "vendorDir": 42 })));
        assert_eq!(config.vendor_dir, "vendor");
    }
}
