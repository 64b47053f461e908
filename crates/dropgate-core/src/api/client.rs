//! API client for communicating with the marketplace backend.
//!
//! This module provides the `ApiClient` struct for making authenticated
//! requests. Credentials come from a [`CredentialStore`]; in a browser-like
//! context a 401 is answered with one refresh and one retry.

use std::fmt;
use std::sync::Arc;
use std::time::Duration;

use reqwest::header::{self, HeaderMap, HeaderName, HeaderValue};
use reqwest::{Client, Method, Url};
use serde::{de::DeserializeOwned, Serialize};
use serde_json::Value;
use tracing::{debug, warn};

use crate::auth::{CredentialStore, ExecutionContext, SessionCredentials};
use crate::models::RefreshRequest;

use super::endpoints::REFRESH_TOKENS_PATH;
use super::{ApiError, ResponseBody};

// ============================================================================
// Constants
// ============================================================================

/// HTTP request timeout in seconds.
/// 30s allows for slow API responses while failing fast enough for good UX.
const REQUEST_TIMEOUT_SECS: u64 = 30;

/// Per-call options: extra headers and query parameters.
#[derive(Debug, Clone, Default)]
pub struct RequestOptions {
    pub headers: HeaderMap,
    pub params: Vec<(String, Option<String>)>,
}

impl RequestOptions {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn header(mut self, name: HeaderName, value: HeaderValue) -> Self {
        self.headers.insert(name, value);
        self
    }

    /// Use an explicit bearer credential instead of the store's.
    pub fn bearer(self, token: &str) -> Result<Self, ApiError> {
        Ok(self.header(header::AUTHORIZATION, bearer_value(token)?))
    }

    pub fn param(mut self, key: impl Into<String>, value: impl ToString) -> Self {
        self.params.push((key.into(), Some(value.to_string())));
        self
    }

    /// Add a parameter that is dropped from the query string when `None`.
    pub fn param_opt<V: ToString>(mut self, key: impl Into<String>, value: Option<V>) -> Self {
        self.params.push((key.into(), value.map(|v| v.to_string())));
        self
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Attempt {
    First,
    AfterRefresh,
}

/// API client for the marketplace backend.
/// Clone is cheap - reqwest::Client uses Arc internally for connection pooling.
#[derive(Clone)]
pub struct ApiClient {
    client: Client,
    base_url: String,
    context: ExecutionContext,
    credentials: Arc<dyn CredentialStore>,
}

impl fmt::Debug for ApiClient {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ApiClient")
            .field("base_url", &self.base_url)
            .field("context", &self.context)
            .finish()
    }
}

impl ApiClient {
    /// Create a new API client rooted at `base_url`.
    pub fn new(
        base_url: impl Into<String>,
        context: ExecutionContext,
        credentials: Arc<dyn CredentialStore>,
    ) -> Result<Self, ApiError> {
        let client = Client::builder()
            .timeout(Duration::from_secs(REQUEST_TIMEOUT_SECS))
            .build()?;
        Ok(Self::with_http_client(client, base_url, context, credentials))
    }

    /// Build around an existing `reqwest::Client`.
    pub fn with_http_client(
        client: Client,
        base_url: impl Into<String>,
        context: ExecutionContext,
        credentials: Arc<dyn CredentialStore>,
    ) -> Self {
        let base_url: String = base_url.into();
        Self {
            client,
            base_url: base_url.trim_end_matches('/').to_string(),
            context,
            credentials,
        }
    }

    /// Create a client for another credential store, sharing the connection pool.
    /// The edge uses this to give every incoming request its own cookie store.
    pub fn with_credentials(
        &self,
        context: ExecutionContext,
        credentials: Arc<dyn CredentialStore>,
    ) -> Self {
        Self {
            client: self.client.clone(), // Cheap clone, shares connection pool
            base_url: self.base_url.clone(),
            context,
            credentials,
        }
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    pub fn context(&self) -> ExecutionContext {
        self.context
    }

    pub fn credentials(&self) -> &Arc<dyn CredentialStore> {
        &self.credentials
    }

    // ===== Verbs =====

    pub async fn get<T: DeserializeOwned>(
        &self,
        path: &str,
        options: RequestOptions,
    ) -> Result<T, ApiError> {
        self.request(Method::GET, path, None, &options).await?.into_typed()
    }

    pub async fn post<T: DeserializeOwned, B: Serialize + ?Sized>(
        &self,
        path: &str,
        body: &B,
        options: RequestOptions,
    ) -> Result<T, ApiError> {
        let body = serde_json::to_value(body)?;
        self.request(Method::POST, path, Some(&body), &options)
            .await?
            .into_typed()
    }

    pub async fn put<T: DeserializeOwned, B: Serialize + ?Sized>(
        &self,
        path: &str,
        body: &B,
        options: RequestOptions,
    ) -> Result<T, ApiError> {
        let body = serde_json::to_value(body)?;
        self.request(Method::PUT, path, Some(&body), &options)
            .await?
            .into_typed()
    }

    pub async fn patch<T: DeserializeOwned, B: Serialize + ?Sized>(
        &self,
        path: &str,
        body: &B,
        options: RequestOptions,
    ) -> Result<T, ApiError> {
        let body = serde_json::to_value(body)?;
        self.request(Method::PATCH, path, Some(&body), &options)
            .await?
            .into_typed()
    }

    pub async fn delete<T: DeserializeOwned>(
        &self,
        path: &str,
        options: RequestOptions,
    ) -> Result<T, ApiError> {
        self.request(Method::DELETE, path, None, &options)
            .await?
            .into_typed()
    }

    // ===== Refresh-and-retry =====

    /// Issue a call, refreshing credentials and retrying once on a 401.
    ///
    /// The loop runs at most twice: the retry is tagged `AfterRefresh` and its
    /// outcome is returned whatever it is.
    pub async fn request(
        &self,
        method: Method,
        path: &str,
        body: Option<&Value>,
        options: &RequestOptions,
    ) -> Result<ResponseBody, ApiError> {
        let url = self.resolve_url(path, &options.params)?;
        let mut attempt = Attempt::First;

        loop {
            match self.send(method.clone(), &url, body, options, attempt).await {
                Err(err)
                    if attempt == Attempt::First
                        && err.is_unauthorized()
                        && self.may_refresh(&url) =>
                {
                    if self.credentials.refresh_token().is_none() {
                        debug!(url = %url, "401 with no refresh credential");
                        return Err(err);
                    }
                    if !self.refresh_credentials().await {
                        return Err(err);
                    }
                    debug!(url = %url, "Credentials refreshed, retrying once");
                    attempt = Attempt::AfterRefresh;
                }
                outcome => return outcome,
            }
        }
    }

    /// Rotate the credential pair using the stored refresh credential.
    ///
    /// Failures of any kind collapse to `false`; on success the new pair has
    /// already been written to the credential store.
    pub async fn refresh_credentials(&self) -> bool {
        let Some(refresh_token) = self.credentials.refresh_token() else {
            return false;
        };

        match self.request_refresh(refresh_token).await {
            Ok(credentials) => {
                self.credentials.store(&credentials);
                true
            }
            Err(e) => {
                warn!(error = %e, status = ?e.status(), "Credential refresh failed");
                false
            }
        }
    }

    async fn request_refresh(&self, refresh_token: String) -> Result<SessionCredentials, ApiError> {
        let url = self.resolve_url(REFRESH_TOKENS_PATH, &[])?;
        let body = serde_json::to_value(RefreshRequest { refresh_token })?;
        self.send(Method::POST, &url, Some(&body), &RequestOptions::default(), Attempt::First)
            .await?
            .into_typed()
    }

    fn may_refresh(&self, url: &Url) -> bool {
        self.context.refreshes_on_unauthorized() && !is_refresh_endpoint(url)
    }

    // ===== Transport =====

    async fn send(
        &self,
        method: Method,
        url: &Url,
        body: Option<&Value>,
        options: &RequestOptions,
        attempt: Attempt,
    ) -> Result<ResponseBody, ApiError> {
        let headers = self.request_headers(options, attempt)?;

        let mut builder = self.client.request(method.clone(), url.clone()).headers(headers);
        if let Some(body) = body {
            builder = builder.json(body);
        }

        let response = builder.send().await?;
        let status = response.status();
        let content_type = response
            .headers()
            .get(header::CONTENT_TYPE)
            .and_then(|v| v.to_str().ok())
            .map(str::to_string);
        let text = response.text().await?;
        let body = ResponseBody::parse(content_type.as_deref(), text);

        if status.is_success() {
            debug!(%method, url = %url, status = status.as_u16(), "Request succeeded");
            Ok(body)
        } else {
            let err = ApiError::from_status(status, body);
            debug!(
                %method,
                url = %url,
                status = status.as_u16(),
                body = err.body_excerpt().as_deref().unwrap_or(""),
                "Request failed"
            );
            Err(err)
        }
    }

    /// Caller headers plus `Authorization` from the store. A caller-supplied
    /// `Authorization` is honoured on the first attempt only; the retry always
    /// carries the freshly stored credential.
    fn request_headers(&self, options: &RequestOptions, attempt: Attempt) -> Result<HeaderMap, ApiError> {
        let mut headers = options.headers.clone();
        if attempt == Attempt::AfterRefresh || !headers.contains_key(header::AUTHORIZATION) {
            headers.remove(header::AUTHORIZATION);
            if let Some(token) = self.credentials.access_token() {
                headers.insert(header::AUTHORIZATION, bearer_value(&token)?);
            }
        }
        Ok(headers)
    }

    /// Absolute URLs pass through; anything else is appended to the base URL.
    /// `None`-valued params are left out.
    fn resolve_url(&self, path: &str, params: &[(String, Option<String>)]) -> Result<Url, ApiError> {
        let raw = if path.starts_with("http") {
            path.to_string()
        } else {
            format!("{}{}", self.base_url, path)
        };
        let mut url = Url::parse(&raw).map_err(|e| ApiError::InvalidUrl(format!("{}: {}", raw, e)))?;

        let present: Vec<(&str, &str)> = params
            .iter()
            .filter_map(|(k, v)| v.as_deref().map(|v| (k.as_str(), v)))
            .collect();
        if !present.is_empty() {
            url.query_pairs_mut().extend_pairs(present);
        }
        Ok(url)
    }
}

fn bearer_value(token: &str) -> Result<HeaderValue, ApiError> {
    HeaderValue::from_str(&format!("Bearer {}", token))
        .map_err(|_| ApiError::InvalidHeader("bearer credential contains invalid characters".into()))
}

fn is_refresh_endpoint(url: &Url) -> bool {
    url.path().trim_end_matches('/').ends_with(REFRESH_TOKENS_PATH)
}
