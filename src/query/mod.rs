//! Lookup execution
//!
//! A [`Query`] ties a provider to an HTTP client, an access key and a rate
//! limiter. Each call to [`Query::lookup`] builds the provider request,
//! waits for the limiter, performs one GET and wraps every returned record.

mod response;

pub use response::QueryResponse;

use crate::error::{GeocodeError, Result};
use crate::network::HttpClient;
use crate::providers::Provider;
use crate::ratelimit::RateLimiter;
use std::sync::Arc;
use std::time::Instant;
use tracing::{debug, info, warn};

/// Rate-limited lookups against one provider
pub struct Query<P: Provider> {
    provider: P,
    client: HttpClient,
    limiter: Arc<RateLimiter>,
    key: String,
}

impl<P: Provider> Query<P> {
    /// Create a query with a fresh limiter sized to the provider's quota
    pub fn new(provider: P, client: HttpClient, key: impl Into<String>) -> Self {
        let limiter = Arc::new(RateLimiter::from_config(&provider.rate_limit()));
        Self {
            provider,
            client,
            limiter,
            key: key.into(),
        }
    }

    /// Share an existing limiter, e.g. between queries using the same account
    pub fn with_rate_limiter(mut self, limiter: Arc<RateLimiter>) -> Self {
        self.limiter = limiter;
        self
    }

    pub fn provider(&self) -> &P {
        &self.provider
    }

    pub fn rate_limiter(&self) -> &Arc<RateLimiter> {
        &self.limiter
    }

    /// Look up `location` and wrap every record the provider returns
    pub async fn lookup(&self, location: &str) -> Result<QueryResponse<P::Output>> {
        let name = self.provider.name();
        let request = self.provider.request(location, &self.key)?;
        let url = request.url.clone();

        let waited = self.limiter.acquire().await;
        if !waited.is_zero() {
            info!("{}: throttled for {:?} before lookup", name, waited);
        }

        let start = Instant::now();
        let response = self.client.execute(request).await.map_err(|e| {
            warn!("{}: request to {} failed: {}", name, url, e);
            e
        })?;
        debug!(
            "{}: HTTP {} in {}ms",
            name,
            response.status,
            start.elapsed().as_millis()
        );

        self.provider.check_status(&response)?;

        let json = response.json().map_err(|e| {
            warn!("{}: response is not JSON: {}", name, e);
            e
        })?;
        self.provider.check_body(&json)?;

        let results = self
            .provider
            .adapt_results(json)?
            .into_iter()
            .map(|record| self.provider.wrap(record))
            .collect::<Result<Vec<_>>>()?;

        info!("{}: {} result(s) for {:?}", name, results.len(), location);

        Ok(QueryResponse::new(
            name,
            self.provider.method(),
            location,
            response.url,
            response.status,
            results,
        ))
    }
}

impl<P: Provider> std::fmt::Debug for Query<P> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        // The key stays out of logs
        f.debug_struct("Query")
            .field("provider", &self.provider.name())
            .field("quota", &self.limiter.quota())
            .field("window", &self.limiter.window())
            .finish()
    }
}

/// Trimmed access key, or a config error when none is set
pub fn require_key(key: Option<&str>, provider: &str) -> Result<String> {
    match key {
        Some(k) if !k.trim().is_empty() => Ok(k.trim().to_string()),
        _ => Err(GeocodeError::Config(format!(
            "no access key configured for {}",
            provider
        ))),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::providers::IpStack;
    use std::time::Duration;

    #[test]
    fn test_limiter_follows_provider_quota() {
        let query = Query::new(IpStack::new(), HttpClient::new().unwrap(), "k");
        assert_eq!(query.rate_limiter().quota(), 10_000);
        assert_eq!(query.rate_limiter().window(), Duration::from_secs(3600));
    }

    #[test]
    fn test_shared_limiter() {
        let shared = Arc::new(RateLimiter::new(5, Duration::from_secs(1)));
        let a = Query::new(IpStack::new(), HttpClient::new().unwrap(), "k")
            .with_rate_limiter(shared.clone());
        let b = Query::new(IpStack::new(), HttpClient::new().unwrap(), "k")
            .with_rate_limiter(shared.clone());
        assert!(Arc::ptr_eq(a.rate_limiter(), b.rate_limiter()));
    }

    #[test]
    fn test_debug_hides_key() {
        let query = Query::new(IpStack::new(), HttpClient::new().unwrap(), "very-secret");
        let printed = format!("{:?}", query);
        assert!(printed.contains("ipstack"));
        assert!(!printed.contains("very-secret"));
    }

    #[test]
    fn test_require_key() {
        assert_eq!(require_key(Some(" abc "), "ipstack").unwrap(), "abc");
        assert!(matches!(require_key(Some(""), "ipstack"), Err(GeocodeError::Config(_))));
        assert!(require_key(None, "ipstack").is_err());
    }

    #[tokio::test]
    async fn test_missing_key_fails_before_network() {
        let query = Query::new(IpStack::new(), HttpClient::new().unwrap(), "");
        let err = query.lookup("8.8.8.8").await.unwrap_err();
        assert!(matches!(err, GeocodeError::Config(_)));
        assert_eq!(query.rate_limiter().available(), 10_000);
    }
}
