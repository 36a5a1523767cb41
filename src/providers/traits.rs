//! Provider traits and request/response types

use crate::error::{GeocodeError, Result};
use crate::ratelimit::RateLimitConfig;
use crate::results::{GeoResult, RawRecord};
use serde_json::Value;
use std::collections::HashMap;

/// HTTP request to be made for a lookup
#[derive(Debug, Clone)]
pub struct ProviderRequest {
    /// URL to request
    pub url: String,
    /// Request headers
    pub headers: HashMap<String, String>,
    /// Query parameters
    pub params: HashMap<String, String>,
}

impl ProviderRequest {
    /// Create a GET request
    pub fn get(url: impl Into<String>) -> Self {
        Self {
            url: url.into(),
            headers: HashMap::new(),
            params: HashMap::new(),
        }
    }

    /// Add a header
    pub fn header(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.headers.insert(key.into(), value.into());
        self
    }

    /// Add a query parameter
    pub fn param(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.params.insert(key.into(), value.into());
        self
    }
}

/// HTTP response from a provider
#[derive(Debug)]
pub struct ProviderResponse {
    /// HTTP status code
    pub status: u16,
    /// Response body as text
    pub text: String,
    /// Response URL (after redirects)
    pub url: String,
}

impl ProviderResponse {
    /// Parse response as JSON
    pub fn json(&self) -> Result<Value> {
        Ok(serde_json::from_str(&self.text)?)
    }

    /// Check if response is successful (2xx)
    pub fn is_success(&self) -> bool {
        (200..300).contains(&self.status)
    }

    /// Check if response indicates an exhausted quota or rejected key
    pub fn is_forbidden(&self) -> bool {
        self.status == 403
    }
}

/// A geolocation provider.
///
/// The provider only builds requests and interprets responses; the HTTP call
/// and throttling happen in [`crate::query::Query`].
pub trait Provider: Send + Sync {
    /// Result type wrapping one raw record
    type Output: GeoResult;

    /// Provider name
    fn name(&self) -> &str;

    /// Lookup method, e.g. "geocode"
    fn method(&self) -> &str {
        "geocode"
    }

    /// Documented call quota
    fn rate_limit(&self) -> RateLimitConfig {
        RateLimitConfig::default()
    }

    /// Build the HTTP request for `location`
    fn request(&self, location: &str, key: &str) -> Result<ProviderRequest>;

    /// Reject error statuses before the body is looked at
    fn check_status(&self, response: &ProviderResponse) -> Result<()> {
        if response.is_success() {
            return Ok(());
        }
        let message = if response.is_forbidden() {
            format!("{} quota exhausted or access key rejected", self.name())
        } else {
            format!("{} returned HTTP {}", self.name(), response.status)
        };
        Err(GeocodeError::provider(response.status, message))
    }

    /// Reject provider errors reported inside a successful body
    fn check_body(&self, _json: &Value) -> Result<()> {
        Ok(())
    }

    /// Turn the parsed body into raw records.
    ///
    /// A single object becomes a one-element sequence, an array yields one
    /// record per element.
    fn adapt_results(&self, json: Value) -> Result<Vec<RawRecord>> {
        match json {
            Value::Object(record) => Ok(vec![record]),
            Value::Array(items) => items
                .into_iter()
                .map(|item| match item {
                    Value::Object(record) => Ok(record),
                    other => Err(GeocodeError::Parse(format!(
                        "expected a JSON object in result list, got {}",
                        other
                    ))),
                })
                .collect(),
            other => Err(GeocodeError::Parse(format!(
                "expected a JSON object or array, got {}",
                other
            ))),
        }
    }

    /// Wrap one raw record
    fn wrap(&self, record: RawRecord) -> Result<Self::Output>;
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    struct Echo;

    struct EchoResult(RawRecord);

    impl GeoResult for EchoResult {
        fn raw(&self) -> &RawRecord {
            &self.0
        }
    }

    impl Provider for Echo {
        type Output = EchoResult;

        fn name(&self) -> &str {
            "echo"
        }

        fn request(&self, location: &str, key: &str) -> Result<ProviderRequest> {
            Ok(ProviderRequest::get(format!("http://echo/{}", location)).param("key", key))
        }

        fn wrap(&self, record: RawRecord) -> Result<EchoResult> {
            Ok(EchoResult(record))
        }
    }

    fn response(status: u16) -> ProviderResponse {
        ProviderResponse {
            status,
            text: String::new(),
            url: "http://echo/".to_string(),
        }
    }

    #[test]
    fn test_single_object_is_wrapped() {
        let records = Echo.adapt_results(json!({"ip": "1.2.3.4"})).unwrap();
        assert_eq!(records.len(), 1);
        assert_eq!(records[0]["ip"], "1.2.3.4");
    }

    #[test]
    fn test_array_yields_each_object() {
        let records = Echo
            .adapt_results(json!([{"ip": "1.1.1.1"}, {"ip": "8.8.8.8"}]))
            .unwrap();
        assert_eq!(records.len(), 2);
        assert_eq!(records[1]["ip"], "8.8.8.8");
    }

    #[test]
    fn test_scalar_body_is_parse_error() {
        assert!(matches!(
            Echo.adapt_results(json!("nope")),
            Err(GeocodeError::Parse(_))
        ));
        assert!(matches!(
            Echo.adapt_results(json!([1, 2])),
            Err(GeocodeError::Parse(_))
        ));
    }

    #[test]
    fn test_status_check() {
        assert!(Echo.check_status(&response(200)).is_ok());

        let forbidden = Echo.check_status(&response(403)).unwrap_err();
        assert!(forbidden.is_quota_exceeded());

        let server = Echo.check_status(&response(502)).unwrap_err();
        assert!(matches!(server, GeocodeError::Provider { status: 502, .. }));
    }

    #[test]
    fn test_request_builder() {
        let request = Echo.request("1.2.3.4", "k").unwrap().header("Accept", "application/json");
        assert_eq!(request.url, "http://echo/1.2.3.4");
        assert_eq!(request.params.get("key").map(String::as_str), Some("k"));
        assert!(request.headers.contains_key("Accept"));
    }
}
