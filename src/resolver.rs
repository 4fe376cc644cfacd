//! Authenticated `$ref` resolution.
//!
//! Registered with the engine ahead of its default HTTP resolver. Web views of
//! repository files are rewritten to the hosting service's content API, and
//! the request carries whatever credentials the auth table holds for the
//! rewritten URL.

use std::sync::{Arc, OnceLock};

use async_trait::async_trait;
use regex::Regex;
use reqwest::header::{AUTHORIZATION, HeaderMap, HeaderName, HeaderValue};
use serde::Deserialize;

use crate::auth::AuthConfigStore;
use crate::config::EnvProvider;
use crate::engine::Resolver;
use crate::error::{GovernanceError, Result};

pub const AUTHENTICATED_RESOLVER_PRIORITY: i32 = 1;

fn blob_regex() -> &'static Regex {
    static REGEX: OnceLock<Regex> = OnceLock::new();
    REGEX.get_or_init(|| {
        Regex::new(r"^https://([^/]+)/([^/]+)/([^/]+)/blob/([^/]+)/(.+)$")
            .expect("Failed to compile blob URL regex")
    })
}

fn content_api_regex() -> &'static Regex {
    static REGEX: OnceLock<Regex> = OnceLock::new();
    REGEX.get_or_init(|| {
        Regex::new(r"^https?://[^/]+/repos/[^/]+/[^/]+/contents/")
            .expect("Failed to compile content API regex")
    })
}

/// Drop the fragment and rewrite `https://<host>/<org>/<repo>/blob/<branch>/<path>`
/// to `https://api.<host>/repos/<org>/<repo>/contents/<path>?ref=<branch>`.
/// A blob URL's own query is dropped. Other URLs come back with only the
/// fragment removed.
pub fn rewrite_blob_url(uri: &str) -> String {
    let without_fragment = uri.split('#').next().unwrap_or(uri);
    let without_query = without_fragment.split('?').next().unwrap_or(without_fragment);
    match blob_regex().captures(without_query) {
        Some(caps) => format!(
            "https://api.{}/repos/{}/{}/contents/{}?ref={}",
            &caps[1], &caps[2], &caps[3], &caps[5], &caps[4]
        ),
        None => without_fragment.to_string(),
    }
}

fn is_content_api(url: &str) -> bool {
    content_api_regex().is_match(url)
}

#[derive(Debug, Deserialize)]
struct ContentEnvelope {
    download_url: Option<String>,
}

pub struct AuthenticatedFetchResolver {
    client: reqwest::Client,
    store: Arc<dyn AuthConfigStore>,
    env: Arc<dyn EnvProvider>,
    allow_insecure: bool,
}

impl AuthenticatedFetchResolver {
    pub fn new(store: Arc<dyn AuthConfigStore>, env: Arc<dyn EnvProvider>) -> Self {
        Self {
            client: reqwest::Client::new(),
            store,
            env,
            allow_insecure: false,
        }
    }

    /// Also handle plain `http` URIs
    pub fn allow_insecure(mut self, allow: bool) -> Self {
        self.allow_insecure = allow;
        self
    }

    pub fn with_client(mut self, client: reqwest::Client) -> Self {
        self.client = client;
        self
    }

    /// Headers for `url` from the first matching auth entry
    fn headers_for(&self, url: &str) -> HeaderMap {
        let mut headers = HeaderMap::new();
        let config = self.store.load();
        let Some(entry) = config.find_match(url) else {
            return headers;
        };
        tracing::debug!(url, pattern = %entry.url_pattern, "auth entry matched");

        let token = entry.resolve_token(self.env.as_ref());
        if !token.is_empty() {
            match HeaderValue::from_str(&format!("{} {}", entry.auth_type, token)) {
                Ok(value) => {
                    headers.insert(AUTHORIZATION, value);
                }
                Err(_) => tracing::warn!(pattern = %entry.url_pattern, "auth token is not a valid header value"),
            }
        }
        for (name, value) in &entry.headers {
            match (
                HeaderName::from_bytes(name.as_bytes()),
                HeaderValue::from_str(value),
            ) {
                (Ok(name), Ok(value)) => {
                    headers.insert(name, value);
                }
                _ => tracing::warn!(header = %name, "skipping invalid auth header"),
            }
        }
        headers
    }

    async fn get(&self, url: &str, headers: &HeaderMap) -> Result<String> {
        let response = self
            .client
            .get(url)
            .headers(headers.clone())
            .send()
            .await
            .map_err(|e| GovernanceError::NetworkFetch {
                url: url.to_string(),
                status: e.to_string(),
            })?;

        let status = response.status();
        if !status.is_success() {
            return Err(GovernanceError::NetworkFetch {
                url: url.to_string(),
                status: status.to_string(),
            });
        }
        Ok(response.text().await?)
    }
}

#[async_trait]
impl Resolver for AuthenticatedFetchResolver {
    fn name(&self) -> &str {
        "authenticated-http"
    }

    fn priority(&self) -> i32 {
        AUTHENTICATED_RESOLVER_PRIORITY
    }

    fn can_read(&self, uri: &str) -> bool {
        uri.starts_with("https://") || (self.allow_insecure && uri.starts_with("http://"))
    }

    async fn read(&self, uri: &str) -> Result<String> {
        let url = rewrite_blob_url(uri);
        let headers = self.headers_for(&url);
        tracing::debug!(uri, url = %url, authenticated = headers.contains_key(AUTHORIZATION), "fetching reference");

        let body = self.get(&url, &headers).await?;
        if !is_content_api(&url) {
            return Ok(body);
        }

        let envelope: ContentEnvelope =
            serde_json::from_str(&body).map_err(|e| GovernanceError::NetworkFetch {
                url: url.clone(),
                status: format!("unexpected content API response: {}", e),
            })?;
        let download_url = envelope
            .download_url
            .ok_or_else(|| GovernanceError::NetworkFetch {
                url: url.clone(),
                status: "content API response has no download_url".to_string(),
            })?;
        self.get(&download_url, &headers).await
    }
}
