//! HTTP client for making requests to geolocation providers

use crate::config::OutgoingSettings;
use crate::error::{GeocodeError, Result};
use crate::providers::{ProviderRequest, ProviderResponse};
use reqwest::{Client, Response};
use std::time::Duration;
use tracing::debug;

/// HTTP client wrapper with geocoder-specific configuration
#[derive(Clone)]
pub struct HttpClient {
    client: Client,
    default_timeout: Duration,
    user_agent: String,
}

impl HttpClient {
    /// Create a new HTTP client with default settings
    pub fn new() -> Result<Self> {
        Self::with_settings(&OutgoingSettings::default())
    }

    /// Create a new HTTP client with custom settings
    pub fn with_settings(settings: &OutgoingSettings) -> Result<Self> {
        if !settings.request_timeout.is_finite() || settings.request_timeout <= 0.0 {
            return Err(GeocodeError::Config(format!(
                "request timeout must be positive, got {}",
                settings.request_timeout
            )));
        }
        let timeout = Duration::try_from_secs_f64(settings.request_timeout).map_err(|e| {
            GeocodeError::Config(format!(
                "request timeout {} is out of range: {}",
                settings.request_timeout, e
            ))
        })?;

        let mut builder = Client::builder().timeout(timeout).gzip(true);

        if let Some(ref proxy_url) = settings.proxy {
            let proxy = reqwest::Proxy::all(proxy_url)
                .map_err(|e| GeocodeError::Config(format!("invalid proxy {}: {}", proxy_url, e)))?;
            builder = builder.proxy(proxy);
        }

        let client = builder
            .build()
            .map_err(|e| GeocodeError::Config(format!("failed to build HTTP client: {}", e)))?;

        Ok(Self {
            client,
            default_timeout: timeout,
            user_agent: settings.user_agent.clone(),
        })
    }

    /// Execute a provider request
    pub async fn execute(&self, request: ProviderRequest) -> Result<ProviderResponse> {
        self.execute_with_timeout(request, self.default_timeout).await
    }

    /// Execute a provider request with custom timeout
    async fn execute_with_timeout(
        &self,
        request: ProviderRequest,
        timeout: Duration,
    ) -> Result<ProviderResponse> {
        let mut req_builder = self
            .client
            .get(&request.url)
            .timeout(timeout)
            .header("User-Agent", &self.user_agent);

        for (key, value) in &request.headers {
            req_builder = req_builder.header(key, value);
        }

        if !request.params.is_empty() {
            req_builder = req_builder.query(&request.params);
        }

        debug!("GET {}", request.url);
        let response = req_builder.send().await?;

        Self::parse_response(response).await
    }

    /// Read status and body into a ProviderResponse
    async fn parse_response(response: Response) -> Result<ProviderResponse> {
        let status = response.status().as_u16();
        let url = response.url().to_string();
        let text = response.text().await?;

        Ok(ProviderResponse { status, text, url })
    }

    /// Current user agent
    pub fn user_agent(&self) -> &str {
        &self.user_agent
    }

    pub fn timeout(&self) -> Duration {
        self.default_timeout
    }
}
