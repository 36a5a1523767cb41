//! geocoder-rs debug tool
//!
//! Looks up one location against IPStack and prints every result.

use anyhow::{Context, Result};
use geocoder_rs::{config, GeoResult, Settings};
use std::path::PathBuf;
use tracing::info;
use tracing_subscriber::EnvFilter;

#[tokio::main]
async fn main() -> Result<()> {
    // Initialize logging
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .with_target(false)
        .init();

    let mut args = std::env::args().skip(1);
    let mut settings_path: Option<PathBuf> = None;
    let mut location: Option<String> = None;

    while let Some(arg) = args.next() {
        match arg.as_str() {
            "-h" | "--help" => {
                print_usage();
                return Ok(());
            }
            "-V" | "--version" => {
                println!("geocoder-rs {}", geocoder_rs::VERSION);
                return Ok(());
            }
            "-c" | "--config" => {
                let path = args.next().context("--config needs a file path")?;
                settings_path = Some(PathBuf::from(path));
            }
            _ => location = Some(arg),
        }
    }

    let settings = match settings_path {
        Some(path) => {
            info!("Loading settings from: {}", path.display());
            let mut settings = Settings::from_file(&path)
                .with_context(|| format!("failed to read {}", path.display()))?;
            settings.merge_env();
            settings
        }
        None => config::load()?,
    };

    let query = geocoder_rs::ipstack(&settings)?;
    let location = location.unwrap_or_default();
    let response = query
        .lookup(&location)
        .await
        .with_context(|| format!("lookup of {:?} failed", location))?;

    info!("{} [{}]: {}", response.provider(), response.method(), response.status());

    for result in &response {
        println!("{}", serde_json::to_string_pretty(&result.to_json())?);
        println!("raw: {}", serde_json::to_string_pretty(result.raw())?);
    }

    Ok(())
}

/// Print usage information
fn print_usage() {
    println!(
        r#"
geocoder-rs v{}
IP geolocation lookups via ipstack.com

USAGE:
    geocoder-rs [OPTIONS] [LOCATION]

    LOCATION is an IP address, a hostname or a comma-separated list of
    addresses. Without it, the caller's own address is looked up.

OPTIONS:
    -c, --config <FILE>    Path to configuration file
    -h, --help             Print help information
    -V, --version          Print version information

ENVIRONMENT VARIABLES:
    IPSTACK_API_KEY        IPStack access key
    GEOCODER_SETTINGS_PATH Path to settings.yml
    GEOCODER_TIMEOUT       Request timeout in seconds
    GEOCODER_PROXY         Proxy URL for outgoing requests
    RUST_LOG               Log filter (default: info)
"#,
        geocoder_rs::VERSION
    );
}
