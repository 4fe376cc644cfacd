use crate::error::{GovernanceError, Lookup, Result};
use reqwest::{Client, Proxy, Response};
use tokio::net::TcpStream;
use url::Url;

/// Configuration for the HTTP client
#[derive(Debug, Clone)]
pub struct HttpClientConfig {
    /// User agent string
    pub user_agent: String,
}

impl Default for HttpClientConfig {
    fn default() -> Self {
        Self {
            user_agent: format!("govlint/{}", env!("CARGO_PKG_VERSION")),
        }
    }
}

/// Async HTTP client for fetching top-level documents, optionally through a proxy.
///
/// There is no retry and no timeout beyond the transport defaults: a failed
/// fetch is reported once so that "document missing" and "proxy unreachable"
/// stay distinguishable.
pub struct AsyncHttpClient {
    client: Client,
    proxy: Option<String>,
}

impl AsyncHttpClient {
    /// Create a new async HTTP client with the given configuration
    pub fn new(config: &HttpClientConfig) -> Result<Self> {
        Self::build(config, None)
    }

    /// Create a client that routes every request through `proxy_url`
    pub fn with_proxy(config: &HttpClientConfig, proxy_url: &str) -> Result<Self> {
        Url::parse(proxy_url).map_err(|e| GovernanceError::InvalidUrl {
            url: proxy_url.to_string(),
            details: e.to_string(),
        })?;
        Self::build(config, Some(proxy_url))
    }

    fn build(config: &HttpClientConfig, proxy: Option<&str>) -> Result<Self> {
        let mut builder = Client::builder().user_agent(&config.user_agent);
        if let Some(proxy_url) = proxy {
            let proxy = Proxy::all(proxy_url).map_err(|e| GovernanceError::InvalidUrl {
                url: proxy_url.to_string(),
                details: e.to_string(),
            })?;
            builder = builder.proxy(proxy);
        } else {
            builder = builder.no_proxy();
        }

        Ok(Self {
            client: builder.build()?,
            proxy: proxy.map(str::to_string),
        })
    }

    /// Fetch `url` as text.
    ///
    /// Non-2xx responses and transport failures become `DocumentNotFound`;
    /// a connection failure while a proxy is configured becomes `ProxyConnection`.
    pub async fn get_text(&self, url: &str) -> Result<String> {
        let response = self.send(url).await?;
        if !response.status().is_success() {
            tracing::debug!(url, status = %response.status(), "document fetch failed");
            return Err(GovernanceError::not_found(Lookup::Url, url));
        }
        response
            .text()
            .await
            .map_err(|_| GovernanceError::not_found(Lookup::Url, url))
    }

    async fn send(&self, url: &str) -> Result<Response> {
        let error = match self.client.get(url).send().await {
            Ok(response) => return Ok(response),
            Err(e) => e,
        };
        // A refused CONNECT tunnel is also a connect error, so only blame the
        // proxy when its own socket cannot be opened.
        match &self.proxy {
            Some(proxy) if error.is_connect() && !proxy_reachable(proxy).await => {
                Err(GovernanceError::ProxyConnection {
                    url: url.to_string(),
                    proxy: proxy.clone(),
                    source: error,
                })
            }
            _ => {
                tracing::debug!(url, error = %error, "document fetch failed");
                Err(GovernanceError::not_found(Lookup::Url, url))
            }
        }
    }
}

async fn proxy_reachable(proxy: &str) -> bool {
    let Ok(url) = Url::parse(proxy) else {
        return false;
    };
    let (Some(host), Some(port)) = (url.host_str(), url.port_or_known_default()) else {
        return false;
    };
    let host = host.trim_start_matches('[').trim_end_matches(']');
    TcpStream::connect((host, port)).await.is_ok()
}
