//! Settings structures for geocoder-rs configuration

use crate::ratelimit::RateLimitConfig;
use anyhow::Result;
use serde::{Deserialize, Serialize};
use std::path::Path;

/// Main settings structure, usually read from settings.yml
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct Settings {
    pub outgoing: OutgoingSettings,
    pub ipstack: IpStackSettings,
}

impl Settings {
    /// Load settings from a YAML file
    pub fn from_file<P: AsRef<Path>>(path: P) -> Result<Self> {
        let content = std::fs::read_to_string(path)?;
        Self::from_yaml(&content)
    }

    /// Parse settings from YAML text
    pub fn from_yaml(content: &str) -> Result<Self> {
        let settings: Settings = serde_yaml::from_str(content)?;
        Ok(settings)
    }

    /// Merge with environment variables
    pub fn merge_env(&mut self) {
        self.merge_vars(|name| std::env::var(name).ok());
    }

    fn merge_vars(&mut self, var: impl Fn(&str) -> Option<String>) {
        if let Some(val) = var("IPSTACK_API_KEY") {
            if !val.is_empty() {
                self.ipstack.api_key = Some(val);
            }
        }
        if let Some(val) = var("GEOCODER_TIMEOUT") {
            if let Ok(timeout) = val.parse() {
                self.outgoing.request_timeout = timeout;
            }
        }
        if let Some(val) = var("GEOCODER_PROXY") {
            self.outgoing.proxy = Some(val);
        }
    }
}

/// Outgoing request settings
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct OutgoingSettings {
    /// Request timeout in seconds
    pub request_timeout: f64,
    /// User agent sent with every request
    pub user_agent: String,
    /// Proxy for all outgoing traffic
    pub proxy: Option<String>,
}

impl Default for OutgoingSettings {
    fn default() -> Self {
        Self {
            request_timeout: 5.0,
            user_agent: format!("geocoder-rs/{}", crate::VERSION),
            proxy: None,
        }
    }
}

/// IPStack provider settings
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct IpStackSettings {
    /// Access key (IPSTACK_API_KEY)
    pub api_key: Option<String>,
    /// API base URL
    pub url: String,
    /// Response language, e.g. "de"
    pub language: Option<String>,
    /// Comma-separated field filter
    pub fields: Option<String>,
    /// Ask for hostname lookup
    pub hostname: bool,
    /// Ask for the security module
    pub security: bool,
    /// Documented account quota
    pub rate_limit: RateLimitConfig,
}

impl Default for IpStackSettings {
    fn default() -> Self {
        Self {
            api_key: None,
            url: "http://api.ipstack.com/".to_string(),
            language: None,
            fields: None,
            hostname: false,
            security: false,
            rate_limit: RateLimitConfig::default(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    #[test]
    fn test_default_settings() {
        let settings = Settings::default();
        assert_eq!(settings.ipstack.url, "http://api.ipstack.com/");
        assert_eq!(settings.ipstack.rate_limit.calls, 10_000);
        assert_eq!(settings.ipstack.rate_limit.period_secs, 3600);
        assert!(settings.ipstack.api_key.is_none());
        assert!(settings.outgoing.user_agent.starts_with("geocoder-rs/"));
    }

    #[test]
    fn test_partial_yaml() {
        let yaml = r#"
ipstack:
  api_key: abc123
  language: de
  rate_limit:
    calls: 100
outgoing:
  request_timeout: 2.5
"#;
        let settings = Settings::from_yaml(yaml).unwrap();
        assert_eq!(settings.ipstack.api_key.as_deref(), Some("abc123"));
        assert_eq!(settings.ipstack.language.as_deref(), Some("de"));
        assert_eq!(settings.ipstack.rate_limit.calls, 100);
        assert_eq!(settings.ipstack.rate_limit.period_secs, 3600);
        assert_eq!(settings.ipstack.url, "http://api.ipstack.com/");
        assert_eq!(settings.outgoing.request_timeout, 2.5);
    }

    #[test]
    fn test_env_overrides() {
        let vars: HashMap<&str, &str> = [
            ("IPSTACK_API_KEY", "from-env"),
            ("GEOCODER_TIMEOUT", "not-a-number"),
            ("GEOCODER_PROXY", "http://proxy:3128"),
        ]
        .into_iter()
        .collect();

        let mut settings = Settings::default();
        settings.merge_vars(|name| vars.get(name).map(|v| v.to_string()));

        assert_eq!(settings.ipstack.api_key.as_deref(), Some("from-env"));
        assert_eq!(settings.outgoing.request_timeout, 5.0);
        assert_eq!(settings.outgoing.proxy.as_deref(), Some("http://proxy:3128"));
    }
}
