//! Results of one lookup

use crate::results::GeoResult;
use serde_json::{json, Value};

/// Every result returned for one lookup, plus request context
#[derive(Debug, Clone)]
pub struct QueryResponse<R> {
    provider: String,
    method: String,
    location: String,
    url: String,
    status_code: u16,
    results: Vec<R>,
}

impl<R: GeoResult> QueryResponse<R> {
    pub fn new(
        provider: impl Into<String>,
        method: impl Into<String>,
        location: impl Into<String>,
        url: impl Into<String>,
        status_code: u16,
        results: Vec<R>,
    ) -> Self {
        Self {
            provider: provider.into(),
            method: method.into(),
            location: location.into(),
            url: url.into(),
            status_code,
            results,
        }
    }

    pub fn provider(&self) -> &str {
        &self.provider
    }

    pub fn method(&self) -> &str {
        &self.method
    }

    pub fn location(&self) -> &str {
        &self.location
    }

    /// Final request URL, including the access key
    pub fn url(&self) -> &str {
        &self.url
    }

    pub fn status_code(&self) -> u16 {
        self.status_code
    }

    /// "OK" when at least one result has coordinates
    pub fn status(&self) -> &'static str {
        if self.results.is_empty() {
            "ERROR - No results found"
        } else if self.results.iter().any(|r| r.ok()) {
            "OK"
        } else {
            "ERROR - No Geometry"
        }
    }

    pub fn ok(&self) -> bool {
        self.status() == "OK"
    }

    /// Best (first) result
    pub fn first(&self) -> Option<&R> {
        self.results.first()
    }

    pub fn results(&self) -> &[R] {
        &self.results
    }

    pub fn len(&self) -> usize {
        self.results.len()
    }

    pub fn is_empty(&self) -> bool {
        self.results.is_empty()
    }

    pub fn iter(&self) -> std::slice::Iter<'_, R> {
        self.results.iter()
    }

    pub fn into_results(self) -> Vec<R> {
        self.results
    }

    /// Summary of the lookup with every result's accessor values
    pub fn to_json(&self) -> Value {
        json!({
            "provider": self.provider,
            "method": self.method,
            "location": self.location,
            "status": self.status(),
            "status_code": self.status_code,
            "results": self.results.iter().map(GeoResult::to_json).collect::<Vec<_>>(),
        })
    }
}

impl<R> IntoIterator for QueryResponse<R> {
    type Item = R;
    type IntoIter = std::vec::IntoIter<R>;

    fn into_iter(self) -> Self::IntoIter {
        self.results.into_iter()
    }
}

impl<'a, R> IntoIterator for &'a QueryResponse<R> {
    type Item = &'a R;
    type IntoIter = std::slice::Iter<'a, R>;

    fn into_iter(self) -> Self::IntoIter {
        self.results.iter()
    }
}
