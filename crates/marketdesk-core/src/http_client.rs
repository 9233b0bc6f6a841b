use std::collections::BTreeMap;
use std::fmt::{Display, Formatter};
use std::future::Future;
use std::pin::Pin;
use std::sync::{Arc, Mutex, PoisonError};

/// Outgoing GET request issued by a provider adapter.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct HttpRequest {
    pub url: String,
    pub headers: BTreeMap<String, String>,
}

impl HttpRequest {
    pub fn get(url: impl Into<String>) -> Self {
        Self {
            url: url.into(),
            headers: BTreeMap::new(),
        }
    }

    pub fn with_header(mut self, name: impl Into<String>, value: impl Into<String>) -> Self {
        self.headers
            .insert(name.into().to_ascii_lowercase(), value.into());
        self
    }

    /// URL with credential query parameters masked, safe for logs.
    pub fn redacted_url(&self) -> String {
        redact_credentials(&self.url)
    }
}

/// Raw HTTP response before any body decoding.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct HttpResponse {
    pub status: u16,
    pub body: String,
}

impl HttpResponse {
    pub fn new(status: u16, body: impl Into<String>) -> Self {
        Self {
            status,
            body: body.into(),
        }
    }

    pub fn ok_json(body: impl Into<String>) -> Self {
        Self::new(200, body)
    }

    pub const fn is_success(&self) -> bool {
        self.status >= 200 && self.status < 300
    }
}

/// Transport-level failure: the request never produced a usable response.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct HttpError {
    message: String,
}

impl HttpError {
    pub fn new(message: impl Into<String>) -> Self {
        Self {
            message: message.into(),
        }
    }

    pub fn message(&self) -> &str {
        &self.message
    }
}

impl Display for HttpError {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.message)
    }
}

impl std::error::Error for HttpError {}

pub type HttpFuture<'a> = Pin<Box<dyn Future<Output = Result<HttpResponse, HttpError>> + Send + 'a>>;

/// Adapter transport contract.
pub trait HttpClient: Send + Sync {
    fn execute<'a>(&'a self, request: HttpRequest) -> HttpFuture<'a>;
}

/// Production transport backed by reqwest. No per-request timeout is applied.
#[derive(Debug, Clone)]
pub struct ReqwestHttpClient {
    client: Arc<reqwest::Client>,
}

impl ReqwestHttpClient {
    pub fn new() -> Self {
        Self {
            client: Arc::new(
                reqwest::Client::builder()
                    .user_agent(concat!("marketdesk/", env!("CARGO_PKG_VERSION")))
                    .build()
                    .unwrap_or_else(|_| reqwest::Client::new()),
            ),
        }
    }

    pub fn with_client(client: reqwest::Client) -> Self {
        Self {
            client: Arc::new(client),
        }
    }
}

impl Default for ReqwestHttpClient {
    fn default() -> Self {
        Self::new()
    }
}

impl HttpClient for ReqwestHttpClient {
    fn execute<'a>(&'a self, request: HttpRequest) -> HttpFuture<'a> {
        Box::pin(async move {
            let mut builder = self.client.get(&request.url);
            for (name, value) in &request.headers {
                builder = builder.header(name, value);
            }

            // reqwest errors echo the URL, which carries the API key.
            let response = builder.send().await.map_err(|e| {
                let e = e.without_url();
                if e.is_connect() {
                    HttpError::new(format!("connection failed: {e}"))
                } else {
                    HttpError::new(format!("request failed: {e}"))
                }
            })?;

            let status = response.status().as_u16();
            let body = response.text().await.map_err(|e| {
                HttpError::new(format!("failed to read response body: {}", e.without_url()))
            })?;

            Ok(HttpResponse { status, body })
        })
    }
}

/// Offline transport that answers from canned responses keyed by URL fragment.
///
/// The most recently registered matching fragment wins, so a test can swap an upstream
/// answer mid-scenario with [`ScriptedHttpClient::set`].
#[derive(Debug, Default)]
pub struct ScriptedHttpClient {
    routes: Mutex<Vec<(String, Result<HttpResponse, HttpError>)>>,
    requests: Mutex<Vec<HttpRequest>>,
}

impl ScriptedHttpClient {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn respond(self, fragment: impl Into<String>, status: u16, body: impl Into<String>) -> Self {
        self.set(fragment, status, body);
        self
    }

    pub fn fail(self, fragment: impl Into<String>, message: impl Into<String>) -> Self {
        self.set_failure(fragment, message);
        self
    }

    pub fn set(&self, fragment: impl Into<String>, status: u16, body: impl Into<String>) {
        self.push(fragment.into(), Ok(HttpResponse::new(status, body)));
    }

    pub fn set_failure(&self, fragment: impl Into<String>, message: impl Into<String>) {
        self.push(fragment.into(), Err(HttpError::new(message)));
    }

    /// Every request URL seen so far, in order.
    pub fn requested_urls(&self) -> Vec<String> {
        self.requests
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .iter()
            .map(|request| request.url.clone())
            .collect()
    }

    pub fn request_count(&self, fragment: &str) -> usize {
        self.requests
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .iter()
            .filter(|request| request.url.contains(fragment))
            .count()
    }

    fn push(&self, fragment: String, reply: Result<HttpResponse, HttpError>) {
        self.routes
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .push((fragment, reply));
    }
}

impl HttpClient for ScriptedHttpClient {
    fn execute<'a>(&'a self, request: HttpRequest) -> HttpFuture<'a> {
        let reply = self
            .routes
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .iter()
            .rev()
            .find(|(fragment, _)| request.url.contains(fragment.as_str()))
            .map(|(_, reply)| reply.clone())
            .unwrap_or_else(|| {
                Err(HttpError::new(format!(
                    "no scripted response for {}",
                    request.redacted_url()
                )))
            });

        self.requests
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .push(request);

        Box::pin(async move { reply })
    }
}

/// Masks the value of every query parameter whose name mentions a key.
pub fn redact_credentials(url: &str) -> String {
    let Some((base, query)) = url.split_once('?') else {
        return url.to_owned();
    };

    let masked = query
        .split('&')
        .map(|pair| match pair.split_once('=') {
            Some((name, _)) if name.to_ascii_lowercase().contains("key") => {
                format!("{name}=[REDACTED]")
            }
            _ => pair.to_owned(),
        })
        .collect::<Vec<_>>()
        .join("&");

    format!("{base}?{masked}")
}
