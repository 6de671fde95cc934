//! Client construction and the per-request header policy.

use anyhow::{Context, Result};
use log::debug;
use reqwest::header::{
    ACCEPT, ACCEPT_CHARSET, ACCEPT_ENCODING, ACCEPT_LANGUAGE, CACHE_CONTROL, HeaderMap, HeaderName,
    HeaderValue, PRAGMA,
};
use reqwest::{Client, Method, Request, redirect};
use std::time::Duration;

use crate::body::ConsoleResponse;
use crate::classify::classify;
use crate::identity::BrowserIdentity;

const KEEP_ALIVE: HeaderName = HeaderName::from_static("keep-alive");

/// Bounded to keep a misbehaving backend from looping us forever.
const MAX_REDIRECTS: usize = 10;

/// Idle pooled connections kept per host.
const POOL_MAX_IDLE_PER_HOST: usize = 8;

/// Builds a client for talking to the console backend.
///
/// Connect and read timeouts are both set to `timeout_millis`; redirects
/// are followed, the protocol is pinned to HTTP/1.1, and TLS uses
/// standard certificate verification. The connection pool lives as long
/// as the client (and its clones) — dropping the last clone tears it
/// down.
#[tracing::instrument(skip(identity))]
pub fn build_client(timeout_millis: u64, identity: BrowserIdentity) -> Result<ConsoleClient> {
    let timeout = Duration::from_millis(timeout_millis);

    let client = Client::builder()
        .connect_timeout(timeout)
        .read_timeout(timeout)
        .redirect(redirect::Policy::limited(MAX_REDIRECTS))
        .http1_only()
        .pool_max_idle_per_host(POOL_MAX_IDLE_PER_HOST)
        .user_agent(identity.user_agent.clone())
        .build()
        .context("Failed to build HTTP client")?;

    ConsoleClient::new(client, &identity)
}

/// HTTP client that stamps every outbound request with the configured
/// browser identity and collects responses with transparent gzip
/// decompression.
///
/// Cloning is cheap and clones share one connection pool; the client can
/// be used from many tasks concurrently.
#[derive(Clone)]
pub struct ConsoleClient {
    client: Client,
    headers: RequestHeaders,
}

impl ConsoleClient {
    /// Wraps an already-configured reqwest Client with the identity's
    /// header policy. Fails only if an identity string is not a valid
    /// header value.
    pub fn new(client: Client, identity: &BrowserIdentity) -> Result<Self> {
        Ok(Self {
            client,
            headers: RequestHeaders::from_identity(identity)?,
        })
    }

    /// Returns a reference to the underlying reqwest Client.
    pub fn inner(&self) -> &Client {
        &self.client
    }

    /// Starts building a request; finish it with
    /// [`execute`](ConsoleClient::execute) so the header policy applies.
    pub fn request(&self, method: Method, url: &str) -> reqwest::RequestBuilder {
        self.client.request(method, url)
    }

    /// Sends a request and fully reads the response.
    ///
    /// Transport failures (refused connections, timeouts, TLS errors)
    /// propagate unchanged; no retries are attempted.
    #[tracing::instrument(skip(self, request))]
    pub async fn execute(&self, mut request: Request) -> Result<ConsoleResponse> {
        self.headers.apply(request.headers_mut());

        debug!("{} {}", request.method(), request.url());

        let response = self
            .client
            .execute(request)
            .await
            .context("Failed to send request")?;

        ConsoleResponse::collect(response).await
    }

    /// GETs a URL and classifies the response: decoded body text on
    /// `200 OK`, otherwise an error of the kind built by `make_error`.
    #[tracing::instrument(skip(self, make_error))]
    pub async fn get_text<E, F>(&self, url: &str, make_error: F) -> Result<Option<String>>
    where
        E: std::error::Error + Send + Sync + 'static,
        F: FnOnce(String) -> E,
    {
        let request = self
            .request(Method::GET, url)
            .build()
            .context("Failed to build request")?;

        let response = self.execute(request).await?;
        classify(response, make_error)
    }
}

/// The per-request header policy, validated once at construction.
///
/// Accept-Encoding, Cache-Control, and Pragma are injected only when the
/// caller left them unset. Accept, Accept-Language, Accept-Charset, and
/// Keep-Alive are always overwritten with the identity values, even over
/// caller-set ones.
#[derive(Clone)]
struct RequestHeaders {
    if_absent: Vec<(HeaderName, HeaderValue)>,
    always: Vec<(HeaderName, HeaderValue)>,
}

impl RequestHeaders {
    fn from_identity(identity: &BrowserIdentity) -> Result<Self> {
        let if_absent = vec![
            (ACCEPT_ENCODING, HeaderValue::from_static("gzip")),
            (CACHE_CONTROL, HeaderValue::from_static("no-cache")),
            (PRAGMA, HeaderValue::from_static("no-cache")),
        ];

        let always = vec![
            (ACCEPT, header_value("Accept", &identity.accept)?),
            (
                ACCEPT_LANGUAGE,
                header_value("Accept-Language", &identity.accept_language)?,
            ),
            (
                ACCEPT_CHARSET,
                header_value("Accept-Charset", &identity.accept_charset)?,
            ),
            (KEEP_ALIVE, header_value("Keep-Alive", &identity.keep_alive)?),
        ];

        Ok(Self { if_absent, always })
    }

    fn apply(&self, headers: &mut HeaderMap) {
        for (name, value) in &self.if_absent {
            if !headers.contains_key(name) {
                headers.insert(name.clone(), value.clone());
            }
        }

        for (name, value) in &self.always {
            headers.insert(name.clone(), value.clone());
        }
    }
}

fn header_value(name: &str, value: &str) -> Result<HeaderValue> {
    HeaderValue::from_str(value)
        .with_context(|| format!("Invalid {} header value: {:?}", name, value))
}
