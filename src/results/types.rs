//! Result type definitions

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

/// One JSON object as returned by a provider
pub type RawRecord = Map<String, Value>;

/// A coordinate pair
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct LatLng {
    pub lat: f64,
    pub lng: f64,
}

impl LatLng {
    pub fn new(lat: f64, lng: f64) -> Self {
        Self { lat, lng }
    }
}

impl std::fmt::Display for LatLng {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}, {}", self.lat, self.lng)
    }
}

/// Uniform read-only view over one provider record.
///
/// Accessors a provider does not supply default to `None`. None of them
/// touch the underlying raw record, which stays as received.
pub trait GeoResult: Send + Sync {
    /// The record exactly as the provider returned it
    fn raw(&self) -> &RawRecord;

    fn lat(&self) -> Option<f64> {
        None
    }

    fn lng(&self) -> Option<f64> {
        None
    }

    /// Human-readable address, empty when nothing is known
    fn address(&self) -> String {
        String::new()
    }

    fn postal(&self) -> Option<&str> {
        None
    }

    fn city(&self) -> Option<&str> {
        None
    }

    fn state(&self) -> Option<&str> {
        None
    }

    fn country(&self) -> Option<&str> {
        None
    }

    fn country_code(&self) -> Option<&str> {
        None
    }

    fn latlng(&self) -> Option<LatLng> {
        Some(LatLng::new(self.lat()?, self.lng()?))
    }

    /// A result is usable once it has both coordinates
    fn ok(&self) -> bool {
        self.latlng().is_some()
    }

    /// Flat JSON object of the accessor values; absent values are omitted
    fn to_json(&self) -> Value {
        let mut out = Map::new();
        out.insert("ok".to_string(), Value::Bool(self.ok()));
        out.insert("address".to_string(), Value::String(self.address()));
        insert_opt(&mut out, "lat", self.lat());
        insert_opt(&mut out, "lng", self.lng());
        insert_opt(&mut out, "postal", self.postal());
        insert_opt(&mut out, "city", self.city());
        insert_opt(&mut out, "state", self.state());
        insert_opt(&mut out, "country", self.country());
        insert_opt(&mut out, "country_code", self.country_code());
        Value::Object(out)
    }
}

/// Insert `value` under `key` unless it is `None`
pub fn insert_opt<T: Serialize>(out: &mut Map<String, Value>, key: &str, value: Option<T>) {
    if let Some(v) = value.and_then(|v| serde_json::to_value(v).ok()) {
        out.insert(key.to_string(), v);
    }
}
