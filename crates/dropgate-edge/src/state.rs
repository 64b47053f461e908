use std::sync::Arc;
use std::time::Duration;

use anyhow::{Context, Result};
use dropgate_core::auth::{ExecutionContext, RequestCookieStore};
use dropgate_core::{ApiClient, Config, Gatekeeper};
use reqwest::redirect::Policy;

/// Timeout for page origin requests.
const PAGES_TIMEOUT_SECS: u64 = 30;

/// Shared state for the edge router.
#[derive(Debug, Clone)]
pub struct EdgeState {
    pub gatekeeper: Gatekeeper,
    pub pages: reqwest::Client,
    pub pages_origin: String,
}

impl EdgeState {
    pub fn new(gatekeeper: Gatekeeper, pages: reqwest::Client, pages_origin: impl Into<String>) -> Self {
        let pages_origin: String = pages_origin.into();
        Self {
            gatekeeper,
            pages,
            pages_origin: pages_origin.trim_end_matches('/').to_string(),
        }
    }

    pub fn from_config(config: &Config) -> Result<Self> {
        // Placeholder store; every evaluation swaps in its own request-scoped one.
        let api = ApiClient::new(
            config.api_base_url.clone(),
            ExecutionContext::Server,
            Arc::new(RequestCookieStore::default()),
        )
        .context("Failed to build API client")?;
        let gatekeeper = Gatekeeper::new(api, config.route_table());

        Ok(Self::new(gatekeeper, pages_client()?, config.pages_origin_url.clone()))
    }
}

/// HTTP client for the page origin. Redirects are passed back to the browser, not followed.
pub fn pages_client() -> Result<reqwest::Client> {
    reqwest::Client::builder()
        .timeout(Duration::from_secs(PAGES_TIMEOUT_SECS))
        .redirect(Policy::none())
        .build()
        .context("Failed to build page origin client")
}
