//! Listener and authentication settings.

use serde::Serialize;

/// Key accepted when none is configured. Only meant for local development.
pub const DEV_API_KEY: &str = "dev-api-key-change-me";

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ServerConfig {
    pub host: String,
    pub port: u16,
    #[serde(skip_serializing)]
    pub api_key: String,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            host: "127.0.0.1".to_string(),
            port: 8000,
            api_key: DEV_API_KEY.to_string(),
        }
    }
}

impl ServerConfig {
    /// Build a config, falling back to [`DEV_API_KEY`] when no key is given.
    pub fn new(host: impl Into<String>, port: u16, api_key: Option<String>) -> Self {
        let api_key = match api_key.filter(|k| !k.trim().is_empty()) {
            Some(key) => key,
            None => {
                tracing::warn!("No API key configured, using the development default");
                DEV_API_KEY.to_string()
            }
        };
        Self {
            host: host.into(),
            port,
            api_key,
        }
    }

    pub fn addr(&self) -> String {
        format!("{}:{}", self.host, self.port)
    }

    pub fn uses_dev_key(&self) -> bool {
        self.api_key == DEV_API_KEY
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults() {
        let cfg = ServerConfig::default();
        assert_eq!(cfg.addr(), "127.0.0.1:8000");
        assert!(cfg.uses_dev_key());
    }

    #[test]
    fn blank_key_falls_back_to_dev_key() {
        let cfg = ServerConfig::new("0.0.0.0", 9000, Some("  ".into()));
        assert!(cfg.uses_dev_key());
        assert_eq!(cfg.addr(), "0.0.0.0:9000");
    }

    #[test]
    fn explicit_key_is_kept_and_not_serialized() {
        let cfg = ServerConfig::new("127.0.0.1", 8000, Some("s3cret".into()));
        assert!(!cfg.uses_dev_key());
        let json = serde_json::to_string(&cfg).unwrap();
        assert!(!json.contains("s3cret"));
    }
}
