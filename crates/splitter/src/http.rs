//! Shared `reqwest` client construction.

use std::sync::OnceLock;
use std::time::Duration;

use tracing::{debug, warn};

use crate::error::{Result, SplitterError};

const USER_AGENT: &str = concat!("playlist-splitter/", env!("CARGO_PKG_VERSION"));

pub fn install_rustls_provider() {
    static PROVIDER_INSTALLED: OnceLock<()> = OnceLock::new();
    PROVIDER_INSTALLED.get_or_init(|| {
        if let Err(e) = rustls::crypto::aws_lc_rs::default_provider().install_default() {
            // another crate got there first
            debug!(existing_provider = ?e, "rustls CryptoProvider already installed");
        }
    });
}

/// Builds the HTTP client used for both OAuth and API calls.
///
/// A zero `request_timeout` leaves requests unbounded.
pub fn build_client(request_timeout: Duration, proxy: Option<&str>) -> Result<reqwest::Client> {
    install_rustls_provider();

    let mut builder = reqwest::Client::builder().user_agent(USER_AGENT);
    if request_timeout > Duration::ZERO {
        builder = builder.timeout(request_timeout);
    }

    if let Some(url) = proxy {
        match reqwest::Proxy::all(url) {
            Ok(proxy) => builder = builder.proxy(proxy),
            Err(error) => {
                warn!(proxy_url = %url, error = %error, "Invalid proxy URL; ignoring proxy");
            }
        }
    }

    builder
        .build()
        .map_err(|e| SplitterError::config(format!("cannot build HTTP client: {e}")))
}
