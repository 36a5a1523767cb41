//! IPStack provider implementation
//!
//! ipstack.com offers a keyed HTTP API returning the geolocation of an IP
//! address (city, region, country, coordinates and some country metadata).
//! Free accounts get a fixed monthly quota; once it is used up every call
//! answers HTTP 403 or an in-body `usage_limit_reached` error.
//!
//! API reference: <https://ipstack.com/documentation>

use super::traits::*;
use crate::config::IpStackSettings;
use crate::error::{GeocodeError, Result};
use crate::ratelimit::{RateLimitConfig, MAX_WINDOW};
use crate::results::{insert_opt, GeoResult, RawRecord};
use serde::de::DeserializeOwned;
use serde::{Deserialize, Deserializer, Serialize};
use serde_json::{Map, Value};
use tracing::{debug, warn};
use url::Url;

/// Path IPStack uses to look up the caller's own address
const REQUESTER_LOOKUP: &str = "check";

/// IPStack lookup provider
#[derive(Debug, Clone)]
pub struct IpStack {
    base_url: Url,
    language: Option<String>,
    fields: Option<String>,
    hostname: bool,
    security: bool,
    rate_limit: RateLimitConfig,
}

impl IpStack {
    pub fn new() -> Self {
        Self::from_parts(
            Url::parse("http://api.ipstack.com/").expect("static url is valid"),
            &IpStackSettings::default(),
        )
    }

    /// Build from settings; fails on an unusable base URL
    pub fn with_settings(settings: &IpStackSettings) -> Result<Self> {
        if settings.rate_limit.period() > MAX_WINDOW {
            return Err(GeocodeError::Config(format!(
                "ipstack rate_limit.period_secs must be at most {}, got {}",
                MAX_WINDOW.as_secs(),
                settings.rate_limit.period_secs
            )));
        }
        let base_url = Url::parse(&settings.url)?;
        if base_url.cannot_be_a_base() {
            return Err(GeocodeError::Config(format!(
                "ipstack url cannot take a path: {}",
                settings.url
            )));
        }
        Ok(Self::from_parts(base_url, settings))
    }

    /// Default settings against another endpoint
    pub fn with_base_url(url: &str) -> Result<Self> {
        Self::with_settings(&IpStackSettings {
            url: url.to_string(),
            ..Default::default()
        })
    }

    fn from_parts(base_url: Url, settings: &IpStackSettings) -> Self {
        Self {
            base_url,
            language: settings.language.clone(),
            fields: settings.fields.clone(),
            hostname: settings.hostname,
            security: settings.security,
            rate_limit: settings.rate_limit,
        }
    }

    /// URL for `location`, kept as a single path segment
    fn lookup_url(&self, location: &str) -> Result<Url> {
        let mut url = self.base_url.clone();
        url.path_segments_mut()
            .map_err(|_| GeocodeError::Config(format!("ipstack url cannot take a path: {}", self.base_url)))?
            .pop_if_empty()
            .push(location);
        Ok(url)
    }
}

impl Default for IpStack {
    fn default() -> Self {
        Self::new()
    }
}

impl Provider for IpStack {
    type Output = IpStackResult;

    fn name(&self) -> &str {
        "ipstack"
    }

    fn rate_limit(&self) -> RateLimitConfig {
        self.rate_limit
    }

    fn request(&self, location: &str, key: &str) -> Result<ProviderRequest> {
        if key.is_empty() {
            return Err(GeocodeError::Config(
                "ipstack requires an access key (IPSTACK_API_KEY)".to_string(),
            ));
        }

        let location = match location.trim() {
            "" => {
                debug!("Empty location, looking up the requester's own address");
                REQUESTER_LOOKUP
            }
            trimmed => trimmed,
        };

        let mut request = ProviderRequest::get(self.lookup_url(location)?.as_str())
            .param("access_key", key)
            .header("Accept", "application/json");

        if let Some(ref language) = self.language {
            request = request.param("language", language.as_str());
        }
        if let Some(ref fields) = self.fields {
            request = request.param("fields", fields.as_str());
        }
        if self.hostname {
            request = request.param("hostname", "1");
        }
        if self.security {
            request = request.param("security", "1");
        }

        Ok(request)
    }

    fn check_body(&self, json: &Value) -> Result<()> {
        // Errors arrive with HTTP 200 as {"success": false, "error": {...}}
        if json.get("success").and_then(Value::as_bool) != Some(false) {
            return Ok(());
        }

        let error = json.get("error");
        let code = error.and_then(|e| e.get("code")).and_then(Value::as_i64);
        let kind = error
            .and_then(|e| e.get("type"))
            .and_then(Value::as_str)
            .unwrap_or("unknown_error");
        let info = error
            .and_then(|e| e.get("info"))
            .and_then(Value::as_str)
            .unwrap_or_default();

        warn!("ipstack rejected the lookup: {} ({:?})", kind, code);
        Err(GeocodeError::Provider {
            status: 200,
            code,
            message: if info.is_empty() {
                kind.to_string()
            } else {
                format!("{}: {}", kind, info)
            },
        })
    }

    fn wrap(&self, record: RawRecord) -> Result<IpStackResult> {
        IpStackResult::from_raw(record)
    }
}

/// Fields of one IPStack record, read once at construction.
///
/// Nulls and wrongly typed values resolve to `None` rather than failing the
/// record.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
struct IpStackRecord {
    #[serde(deserialize_with = "lenient")]
    ip: Option<String>,
    #[serde(rename = "type", deserialize_with = "lenient")]
    ip_type: Option<String>,
    #[serde(deserialize_with = "lenient")]
    latitude: Option<f64>,
    #[serde(deserialize_with = "lenient")]
    longitude: Option<f64>,
    #[serde(deserialize_with = "lenient")]
    city: Option<String>,
    #[serde(deserialize_with = "lenient")]
    region_code: Option<String>,
    #[serde(deserialize_with = "lenient")]
    region_name: Option<String>,
    #[serde(deserialize_with = "lenient")]
    country_name: Option<String>,
    #[serde(deserialize_with = "lenient")]
    country_code: Option<String>,
    #[serde(deserialize_with = "lenient")]
    continent_code: Option<String>,
    #[serde(deserialize_with = "lenient")]
    continent_name: Option<String>,
    #[serde(deserialize_with = "string_or_number")]
    zip_code: Option<String>,
    #[serde(deserialize_with = "string_or_number")]
    postal_code: Option<String>,
    #[serde(deserialize_with = "string_or_number")]
    zip: Option<String>,
    #[serde(deserialize_with = "lenient")]
    location: Option<LocationData>,
}

/// The nested `location` object
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
struct LocationData {
    #[serde(deserialize_with = "lenient")]
    geoname_id: Option<u64>,
    #[serde(deserialize_with = "lenient")]
    capital: Option<String>,
    #[serde(deserialize_with = "lenient")]
    languages: Option<Vec<Language>>,
    #[serde(deserialize_with = "lenient")]
    country_flag: Option<String>,
    #[serde(deserialize_with = "string_or_number")]
    calling_code: Option<String>,
    #[serde(deserialize_with = "lenient")]
    is_eu: Option<bool>,
}

/// A language spoken in the located country
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct Language {
    pub code: Option<String>,
    pub name: Option<String>,
    pub native: Option<String>,
}

/// Any value that does not fit `T`, null included, reads as absent
fn lenient<'de, D, T>(deserializer: D) -> std::result::Result<Option<T>, D::Error>
where
    D: Deserializer<'de>,
    T: DeserializeOwned,
{
    let value = Value::deserialize(deserializer)?;
    Ok(serde_json::from_value(value).ok())
}

/// Postal and calling codes come back as strings or bare numbers
fn string_or_number<'de, D>(deserializer: D) -> std::result::Result<Option<String>, D::Error>
where
    D: Deserializer<'de>,
{
    Ok(match Option::<Value>::deserialize(deserializer)? {
        Some(Value::String(s)) => Some(s),
        Some(Value::Number(n)) => Some(n.to_string()),
        _ => None,
    })
}

/// Treat empty strings like missing values
fn present(value: Option<&str>) -> Option<&str> {
    value.filter(|v| !v.is_empty())
}

/// Space-join the parts that are set
fn join_present(parts: &[Option<&str>]) -> String {
    parts.iter().flatten().copied().collect::<Vec<_>>().join(" ")
}

/// One IPStack lookup result
#[derive(Debug, Clone)]
pub struct IpStackResult {
    raw: RawRecord,
    record: IpStackRecord,
}

impl IpStackResult {
    /// Parse a raw record; missing, null or wrongly typed fields read as `None`
    pub fn from_raw(raw: RawRecord) -> Result<Self> {
        let record: IpStackRecord = serde_json::from_value(Value::Object(raw.clone()))?;
        Ok(Self { raw, record })
    }

    pub fn ip(&self) -> Option<&str> {
        self.record.ip.as_deref()
    }

    /// Address family, "ipv4" or "ipv6"
    pub fn ip_type(&self) -> Option<&str> {
        self.record.ip_type.as_deref()
    }

    pub fn state_name(&self) -> Option<&str> {
        self.record.region_name.as_deref()
    }

    pub fn region_code(&self) -> Option<&str> {
        self.record.region_code.as_deref()
    }

    pub fn region_name(&self) -> Option<&str> {
        self.record.region_name.as_deref()
    }

    pub fn continent_code(&self) -> Option<&str> {
        self.record.continent_code.as_deref()
    }

    pub fn continent_name(&self) -> Option<&str> {
        self.record.continent_name.as_deref()
    }

    /// The nested `location` object as received
    pub fn location_data(&self) -> Option<&Map<String, Value>> {
        self.raw.get("location").and_then(Value::as_object)
    }

    pub fn geoname_id(&self) -> Option<u64> {
        self.record.location.as_ref()?.geoname_id
    }

    pub fn capital(&self) -> Option<&str> {
        self.record.location.as_ref()?.capital.as_deref()
    }

    pub fn languages(&self) -> &[Language] {
        self.record
            .location
            .as_ref()
            .and_then(|l| l.languages.as_deref())
            .unwrap_or_default()
    }

    pub fn country_flag(&self) -> Option<&str> {
        self.record.location.as_ref()?.country_flag.as_deref()
    }

    pub fn calling_code(&self) -> Option<&str> {
        self.record.location.as_ref()?.calling_code.as_deref()
    }

    pub fn is_eu(&self) -> Option<bool> {
        self.record.location.as_ref()?.is_eu
    }
}

impl GeoResult for IpStackResult {
    fn raw(&self) -> &RawRecord {
        &self.raw
    }

    fn lat(&self) -> Option<f64> {
        self.record.latitude
    }

    fn lng(&self) -> Option<f64> {
        self.record.longitude
    }

    /// "city, region_code country", "region_name country", "country" or ""
    fn address(&self) -> String {
        let country = present(self.country());

        match present(self.city()) {
            Some(city) => {
                let tail = join_present(&[present(self.state()), country]);
                if tail.is_empty() {
                    city.to_string()
                } else {
                    format!("{}, {}", city, tail)
                }
            }
            None => {
                let state = present(self.region_name()).or_else(|| present(self.region_code()));
                join_present(&[state, country])
            }
        }
    }

    fn postal(&self) -> Option<&str> {
        present(self.record.zip_code.as_deref())
            .or_else(|| present(self.record.postal_code.as_deref()))
            .or_else(|| present(self.record.zip.as_deref()))
    }

    fn city(&self) -> Option<&str> {
        self.record.city.as_deref()
    }

    /// Region code, e.g. "CA"
    fn state(&self) -> Option<&str> {
        self.record.region_code.as_deref()
    }

    fn country(&self) -> Option<&str> {
        self.record.country_name.as_deref()
    }

    fn country_code(&self) -> Option<&str> {
        self.record.country_code.as_deref()
    }

    fn to_json(&self) -> Value {
        let mut out = Map::new();
        out.insert("ok".to_string(), Value::Bool(self.ok()));
        out.insert("address".to_string(), Value::String(self.address()));
        insert_opt(&mut out, "ip", self.ip());
        insert_opt(&mut out, "type", self.ip_type());
        insert_opt(&mut out, "lat", self.lat());
        insert_opt(&mut out, "lng", self.lng());
        insert_opt(&mut out, "postal", self.postal());
        insert_opt(&mut out, "city", self.city());
        insert_opt(&mut out, "state", self.state());
        insert_opt(&mut out, "state_name", self.state_name());
        insert_opt(&mut out, "country", self.country());
        insert_opt(&mut out, "country_code", self.country_code());
        insert_opt(&mut out, "continent_code", self.continent_code());
        insert_opt(&mut out, "continent_name", self.continent_name());
        insert_opt(&mut out, "geoname_id", self.geoname_id());
        insert_opt(&mut out, "capital", self.capital());
        insert_opt(&mut out, "calling_code", self.calling_code());
        insert_opt(&mut out, "is_eu", self.is_eu());
        Value::Object(out)
    }
}
