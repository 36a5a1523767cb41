//! HTTP networking module
//!
//! Provides the HTTP client used to reach geolocation providers.

mod client;

pub use client::HttpClient;
