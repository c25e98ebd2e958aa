//! fOS Networking
//!
//! Fetch-style request options, form payloads and an HTTP/1.1 resource
//! loader. Consumers depend on the [`Transport`] trait so that the loader
//! can be swapped for another client (or a test double).

mod fetch;
mod form_data;
pub mod loader;

pub use fetch::{FetchOptions, Headers, RequestBody};
pub use form_data::{FileEntry, FormData, FormDataValue, UrlSearchParams};
pub use loader::{Method, Request, ResourceLoader};
pub use url::Url;

use smol::future::BoxedLocal;

/// Fetch a URL with default options
pub async fn fetch(url: &str) -> Result<Response, NetError> {
    fetch_with_options(url, &FetchOptions::default()).await
}

/// Fetch a URL with explicit options
pub async fn fetch_with_options(url: &str, options: &FetchOptions) -> Result<Response, NetError> {
    ResourceLoader::new().fetch(url, options).await
}

/// Something that can perform a fetch.
///
/// The returned future is `!Send`: transports run on the single-threaded
/// executor that owns the document.
pub trait Transport {
    fn fetch(&self, url: &str, options: &FetchOptions) -> BoxedLocal<Result<Response, NetError>>;
}

/// HTTP Response
#[derive(Debug, Clone, Default)]
pub struct Response {
    /// Final URL after redirects
    pub url: String,
    pub status: u16,
    pub status_text: String,
    pub headers: Vec<(String, String)>,
    pub body: Vec<u8>,
}

impl Response {
    /// Build a response from parts (mostly for transports and tests)
    pub fn new(status: u16, status_text: &str, body: impl Into<Vec<u8>>) -> Self {
        Self {
            url: String::new(),
            status,
            status_text: status_text.to_string(),
            headers: Vec::new(),
            body: body.into(),
        }
    }

    /// Check if response is OK (2xx)
    pub fn ok(&self) -> bool {
        (200..300).contains(&self.status)
    }

    /// Get header value (case-insensitive)
    pub fn header(&self, name: &str) -> Option<&str> {
        self.headers
            .iter()
            .find(|(k, _)| k.eq_ignore_ascii_case(name))
            .map(|(_, v)| v.as_str())
    }

    /// Get body as text
    pub fn text(&self) -> Result<String, NetError> {
        String::from_utf8(self.body.clone()).map_err(|e| NetError::Network(e.to_string()))
    }

    /// Get body as JSON
    pub fn json<T: serde::de::DeserializeOwned>(&self) -> Result<T, NetError> {
        serde_json::from_slice(&self.body).map_err(|e| NetError::Network(e.to_string()))
    }

    /// Get raw body bytes
    pub fn bytes(&self) -> &[u8] {
        &self.body
    }
}

/// Network error
#[derive(Debug, thiserror::Error)]
pub enum NetError {
    #[error("HTTP error: {status}")]
    HttpError { status: u16 },

    #[error("Network error: {0}")]
    Network(String),

    #[error("Invalid URL: {0}")]
    InvalidUrl(String),

    #[error("Unsupported URL scheme: {0}")]
    UnsupportedScheme(String),

    #[error("Invalid request: {0}")]
    InvalidRequest(String),

    #[error("Malformed response: {0}")]
    Malformed(String),

    #[error("Too many redirects (limit {0})")]
    TooManyRedirects(u32),

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}
