//! Server configuration

use serde::{Deserialize, Serialize};

use hopeline_core::{Error, Result};

/// Listen address of the chat service
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ServerConfig {
    pub host: String,
    pub port: u16,
}

impl ServerConfig {
    pub const DEFAULT_HOST: &'static str = "0.0.0.0";
    pub const DEFAULT_PORT: u16 = 8001;

    pub fn new(host: impl Into<String>, port: u16) -> Self {
        Self {
            host: host.into(),
            port,
        }
    }

    /// Read `HOST` and `PORT`, falling back to `0.0.0.0:8001`
    pub fn from_env() -> Result<Self> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    pub fn from_lookup<F>(lookup: F) -> Result<Self>
    where
        F: Fn(&str) -> Option<String>,
    {
        let host = lookup("HOST")
            .filter(|h| !h.trim().is_empty())
            .unwrap_or_else(|| Self::DEFAULT_HOST.to_string());

        let port = match lookup("PORT").filter(|p| !p.trim().is_empty()) {
            Some(port) => port
                .trim()
                .parse()
                .map_err(|_| Error::Configuration(format!("Invalid PORT: {}", port)))?,
            None => Self::DEFAULT_PORT,
        };

        Ok(Self::new(host, port))
    }

    /// Replace the host or port with values given on the command line
    pub fn with_overrides(mut self, host: Option<String>, port: Option<u16>) -> Self {
        if let Some(host) = host {
            self.host = host;
        }
        if let Some(port) = port {
            self.port = port;
        }
        self
    }

    pub fn address(&self) -> String {
        format!("{}:{}", self.host, self.port)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    #[test]
    fn test_defaults() {
        let config = ServerConfig::from_lookup(|_| None).unwrap();
        assert_eq!(config.address(), "0.0.0.0:8001");
    }

    #[test]
    fn test_overrides_and_invalid_port() {
        let vars = HashMap::from([("HOST", "127.0.0.1"), ("PORT", "9000")]);
        let config = ServerConfig::from_lookup(|k| vars.get(k).map(|v| v.to_string())).unwrap();
        assert_eq!(config, ServerConfig::new("127.0.0.1", 9000));

        let err = ServerConfig::from_lookup(|k| (k == "PORT").then(|| "eighty".to_string()))
            .unwrap_err();
        assert!(matches!(err, Error::Configuration(_)));
    }

    #[test]
    fn test_flags_override_environment() {
        let vars = HashMap::from([("HOST", "10.0.0.5"), ("PORT", "9000")]);
        let env = ServerConfig::from_lookup(|k| vars.get(k).map(|v| v.to_string())).unwrap();

        let config = env.clone().with_overrides(None, Some(8080));
        assert_eq!(config.address(), "10.0.0.5:8080");

        let config = env.with_overrides(Some("127.0.0.1".into()), None);
        assert_eq!(config.address(), "127.0.0.1:9000");
    }
}
