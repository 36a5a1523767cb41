//! Geolocation provider module
//!
//! Defines the Provider trait and the concrete provider adapters.

mod traits;

// Provider implementations
pub mod ipstack;

pub use ipstack::{IpStack, IpStackResult, Language};
pub use traits::*;
