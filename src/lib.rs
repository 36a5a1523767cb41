//! geocoder-rs: IP geolocation lookups against the IPStack API
//!
//! A provider builds the request and interprets the response, a [`Query`]
//! performs the rate-limited HTTP call, and every returned record is wrapped
//! in a typed result with uniform accessors.

pub mod config;
pub mod error;
pub mod network;
pub mod providers;
pub mod query;
pub mod ratelimit;
pub mod results;

pub use config::Settings;
pub use error::{GeocodeError, Result};
pub use network::HttpClient;
pub use providers::{IpStack, IpStackResult, Provider};
pub use query::{Query, QueryResponse};
pub use ratelimit::{RateLimitConfig, RateLimiter};
pub use results::{GeoResult, LatLng, RawRecord};

/// Application version
pub const VERSION: &str = env!("CARGO_PKG_VERSION");

/// Build an IPStack query from settings, failing when no key is configured
pub fn ipstack(settings: &Settings) -> Result<Query<IpStack>> {
    let key = query::require_key(settings.ipstack.api_key.as_deref(), "ipstack")?;
    let provider = IpStack::with_settings(&settings.ipstack)?;
    let client = HttpClient::with_settings(&settings.outgoing)?;
    Ok(Query::new(provider, client, key))
}
