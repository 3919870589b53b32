//! HTTP transport for probes
//!
//! Every request goes through [`HttpClient::send`]. The client never keeps a
//! cookie jar of its own; identities travel as an explicit `Cookie` header so
//! an anonymous probe is really anonymous.

use std::time::Duration;

use reqwest::header::{HeaderMap, HeaderName, HeaderValue, CONTENT_TYPE, COOKIE, SET_COOKIE};
use reqwest::Method;
use serde_json::Value;

use crate::common::{Error, Result};

/// One outgoing request, already rendered
#[derive(Debug)]
pub struct RequestSpec<'a> {
    pub method: Method,
    /// Path appended to the base URL, starting with `/`
    pub path: &'a str,
    pub body: Option<&'a Value>,
    pub headers: &'a [(String, String)],
    pub cookie: Option<String>,
    pub timeout: Option<Duration>,
}

/// What came back
#[derive(Debug, Clone)]
pub struct HttpResponse {
    pub status: u16,
    /// Raw `Set-Cookie` header values in arrival order
    pub set_cookies: Vec<String>,
    pub body: String,
}

/// Thin wrapper around a reqwest client bound to one base URL
#[derive(Debug, Clone)]
pub struct HttpClient {
    inner: reqwest::Client,
    base_url: String,
    default_timeout: Duration,
}

impl HttpClient {
    /// Create a client for an already validated base URL
    pub fn new(base_url: &str, default_timeout: Duration) -> Result<Self> {
        let inner = reqwest::Client::builder()
            .user_agent(concat!("apiprobe/", env!("CARGO_PKG_VERSION")))
            .redirect(reqwest::redirect::Policy::none())
            .build()
            .map_err(|e| Error::HttpClient(e.to_string()))?;

        Ok(Self {
            inner,
            base_url: base_url.trim_end_matches('/').to_string(),
            default_timeout,
        })
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    pub fn default_timeout(&self) -> Duration {
        self.default_timeout
    }

    /// Full URL for a probe path
    pub fn url_for(&self, path: &str) -> String {
        if path.is_empty() {
            self.base_url.clone()
        } else if path.starts_with('/') {
            format!("{}{}", self.base_url, path)
        } else {
            format!("{}/{}", self.base_url, path)
        }
    }

    /// Send a single request, with no retry
    ///
    /// The error string is the transport cause (connect, DNS, timeout, or a
    /// header that could not be encoded).
    pub async fn send(&self, spec: RequestSpec<'_>) -> std::result::Result<HttpResponse, String> {
        let url = self.url_for(spec.path);
        let timeout = spec.timeout.unwrap_or(self.default_timeout);

        let mut headers = HeaderMap::new();
        for (name, value) in spec.headers {
            let name = HeaderName::from_bytes(name.as_bytes())
                .map_err(|e| format!("invalid header name '{}': {}", name, e))?;
            let value = HeaderValue::from_str(value)
                .map_err(|e| format!("invalid value for header '{}': {}", name, e))?;
            headers.insert(name, value);
        }
        if let Some(cookie) = &spec.cookie {
            let value = HeaderValue::from_str(cookie)
                .map_err(|e| format!("invalid cookie header: {}", e))?;
            headers.insert(COOKIE, value);
        }

        let mut request = self
            .inner
            .request(spec.method.clone(), &url)
            .headers(headers)
            .timeout(timeout);
        if let Some(body) = spec.body {
            request = request
                .header(CONTENT_TYPE, "application/json")
                .body(body.to_string());
        }

        tracing::debug!("{} {}", spec.method, url);

        let response = request.send().await.map_err(|e| describe(&e, timeout))?;
        let status = response.status().as_u16();
        let set_cookies = response
            .headers()
            .get_all(SET_COOKIE)
            .iter()
            .filter_map(|v| v.to_str().ok())
            .map(str::to_string)
            .collect();
        let body = response.text().await.map_err(|e| describe(&e, timeout))?;

        tracing::debug!("{} {} -> {} ({} bytes)", spec.method, url, status, body.len());

        Ok(HttpResponse {
            status,
            set_cookies,
            body,
        })
    }
}

fn describe(err: &reqwest::Error, timeout: Duration) -> String {
    if err.is_timeout() {
        return format!("timed out after {}s", timeout.as_secs_f64());
    }

    let mut cause = err.to_string();
    let mut source = std::error::Error::source(err);
    while let Some(inner) = source {
        cause.push_str(": ");
        cause.push_str(&inner.to_string());
        source = inner.source();
    }
    cause
}
