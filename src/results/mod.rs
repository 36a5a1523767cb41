//! Result types shared by all providers
//!
//! A provider hands back raw JSON records; each one is wrapped in a typed
//! result exposing the common accessors defined here.

mod types;

pub use types::*;
