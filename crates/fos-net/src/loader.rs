//! Resource Loader
//!
//! Minimal HTTP/1.1 client over smol's async TCP. One connection per
//! request (`Connection: close`), chunked and length-delimited bodies,
//! and redirect following. Only `http:` URLs are supported.

use std::fmt;
use std::str::FromStr;
use std::sync::atomic::{AtomicU64, Ordering};
use std::time::{SystemTime, UNIX_EPOCH};

use serde::{Deserialize, Deserializer};
use smol::future::BoxedLocal;
use smol::io::{AsyncReadExt, AsyncWriteExt};
use smol::net::TcpStream;
use url::Url;

use crate::{FetchOptions, Headers, NetError, RequestBody, Response, Transport};

/// HTTP method
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Method {
    #[default]
    Get,
    Post,
    Put,
    Delete,
    Head,
    Options,
    Patch,
}

impl Method {
    pub fn as_str(&self) -> &'static str {
        match self {
            Method::Get => "GET",
            Method::Post => "POST",
            Method::Put => "PUT",
            Method::Delete => "DELETE",
            Method::Head => "HEAD",
            Method::Options => "OPTIONS",
            Method::Patch => "PATCH",
        }
    }
}

impl fmt::Display for Method {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Method {
    type Err = NetError;

    /// Case-insensitive, as HTML form `method` attributes are
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_uppercase().as_str() {
            "GET" => Ok(Method::Get),
            "POST" => Ok(Method::Post),
            "PUT" => Ok(Method::Put),
            "DELETE" => Ok(Method::Delete),
            "HEAD" => Ok(Method::Head),
            "OPTIONS" => Ok(Method::Options),
            "PATCH" => Ok(Method::Patch),
            other => Err(NetError::InvalidRequest(format!("unknown method {other:?}"))),
        }
    }
}

impl<'de> Deserialize<'de> for Method {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let s = String::deserialize(deserializer)?;
        s.parse().map_err(serde::de::Error::custom)
    }
}

/// Request configuration
#[derive(Debug, Default)]
pub struct Request {
    pub method: Method,
    pub url: String,
    pub headers: Headers,
    pub body: Option<Vec<u8>>,
}

impl Request {
    pub fn get(url: &str) -> Self {
        Self {
            method: Method::Get,
            url: url.to_string(),
            ..Default::default()
        }
    }

    pub fn post(url: &str) -> Self {
        Self {
            method: Method::Post,
            url: url.to_string(),
            ..Default::default()
        }
    }

    pub fn with_header(mut self, key: &str, value: &str) -> Self {
        self.headers.set(key, value);
        self
    }

    pub fn with_body(mut self, body: Vec<u8>) -> Self {
        self.body = Some(body);
        self
    }

    pub fn with_json(self, json: &str) -> Self {
        self.with_header("Content-Type", "application/json")
            .with_body(json.as_bytes().to_vec())
    }

    /// Build a wire request from fetch options, encoding the body and
    /// supplying its Content-Type when the caller has not
    pub fn from_fetch(url: &str, options: &FetchOptions) -> Result<Self, NetError> {
        let method = options.request_method();
        let mut headers = options.headers.clone();

        let body = match &options.body {
            None => None,
            Some(_) if matches!(method, Method::Get | Method::Head) => {
                return Err(NetError::InvalidRequest(format!(
                    "{method} request cannot have a body"
                )));
            }
            Some(RequestBody::Text(text)) => {
                if !headers.contains("Content-Type") {
                    headers.set("Content-Type", "text/plain;charset=UTF-8");
                }
                Some(text.clone().into_bytes())
            }
            Some(RequestBody::UrlEncoded(params)) => {
                if !headers.contains("Content-Type") {
                    headers.set("Content-Type", "application/x-www-form-urlencoded;charset=UTF-8");
                }
                Some(params.to_string().into_bytes())
            }
            Some(RequestBody::Multipart(data)) => {
                // The boundary must match the payload, so this always wins
                let boundary = multipart_boundary();
                headers.set("Content-Type", format!("multipart/form-data; boundary={boundary}"));
                Some(data.to_multipart(&boundary))
            }
        };

        Ok(Self {
            method,
            url: url.to_string(),
            headers,
            body,
        })
    }
}

fn multipart_boundary() -> String {
    static COUNTER: AtomicU64 = AtomicU64::new(0);
    let nanos = SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map(|d| d.as_nanos() as u64)
        .unwrap_or_default();
    let n = COUNTER.fetch_add(1, Ordering::Relaxed);
    format!("----fOSFormBoundary{:016x}", nanos.rotate_left(17) ^ n)
}

/// Load resources from network
#[derive(Debug, Clone)]
pub struct ResourceLoader {
    user_agent: String,
    max_redirects: u32,
}

impl ResourceLoader {
    pub fn new() -> Self {
        Self {
            user_agent: "fOS-Engine/0.1".into(),
            max_redirects: 10,
        }
    }

    pub fn with_user_agent(mut self, user_agent: &str) -> Self {
        self.user_agent = user_agent.to_string();
        self
    }

    pub fn with_max_redirects(mut self, max: u32) -> Self {
        self.max_redirects = max;
        self
    }

    /// Fetch a URL with GET
    pub async fn get(&self, url: &str) -> Result<Response, NetError> {
        self.request(Request::get(url)).await
    }

    /// Make an HTTP request, following redirects
    pub async fn request(&self, mut req: Request) -> Result<Response, NetError> {
        tracing::info!("HTTP {} {}", req.method, req.url);

        for _ in 0..=self.max_redirects {
            let mut response = self.send_once(&req).await?;
            response.url = req.url.clone();

            let location = match response.status {
                301 | 302 | 303 | 307 | 308 => response.header("Location").map(str::to_string),
                _ => None,
            };
            let Some(location) = location else {
                tracing::debug!("HTTP {} {} -> {}", req.method, req.url, response.status);
                return Ok(response);
            };

            let next = Url::parse(&req.url)
                .and_then(|base| base.join(&location))
                .map_err(|e| NetError::InvalidUrl(format!("{location}: {e}")))?;
            tracing::debug!("redirect {} -> {}", response.status, next);

            if response.status == 303
                || (matches!(response.status, 301 | 302) && req.method == Method::Post)
            {
                req.method = Method::Get;
                req.body = None;
                req.headers.remove("Content-Type");
            }
            req.url = next.to_string();
        }

        Err(NetError::TooManyRedirects(self.max_redirects))
    }

    async fn send_once(&self, req: &Request) -> Result<Response, NetError> {
        let url = Url::parse(&req.url).map_err(|e| NetError::InvalidUrl(format!("{}: {e}", req.url)))?;
        if url.scheme() != "http" {
            return Err(NetError::UnsupportedScheme(url.scheme().to_string()));
        }
        let host = url
            .host_str()
            .ok_or_else(|| NetError::InvalidUrl(req.url.clone()))?
            .to_string();
        let port = url.port_or_known_default().unwrap_or(80);

        let mut stream = TcpStream::connect((host.trim_matches(|c| c == '[' || c == ']'), port)).await?;
        stream.write_all(self.encode_head(req, &url).as_bytes()).await?;
        if let Some(body) = &req.body {
            stream.write_all(body).await?;
        }
        stream.flush().await?;

        let mut raw = Vec::new();
        stream.read_to_end(&mut raw).await?;
        parse_response(&raw, req.method == Method::Head)
    }

    fn encode_head(&self, req: &Request, url: &Url) -> String {
        let mut target = url.path().to_string();
        if let Some(query) = url.query() {
            target.push('?');
            target.push_str(query);
        }
        let host = match url.port() {
            Some(port) => format!("{}:{}", url.host_str().unwrap_or_default(), port),
            None => url.host_str().unwrap_or_default().to_string(),
        };

        let mut head = format!("{} {} HTTP/1.1\r\nHost: {}\r\n", req.method, target, host);
        if !req.headers.contains("User-Agent") {
            head.push_str(&format!("User-Agent: {}\r\n", self.user_agent));
        }
        for (name, value) in req.headers.iter() {
            if name.eq_ignore_ascii_case("Content-Length") || name.eq_ignore_ascii_case("Connection") {
                continue;
            }
            head.push_str(&format!("{name}: {value}\r\n"));
        }
        if let Some(body) = &req.body {
            head.push_str(&format!("Content-Length: {}\r\n", body.len()));
        }
        head.push_str("Connection: close\r\n\r\n");
        head
    }
}

impl Default for ResourceLoader {
    fn default() -> Self {
        Self::new()
    }
}

impl Transport for ResourceLoader {
    fn fetch(&self, url: &str, options: &FetchOptions) -> BoxedLocal<Result<Response, NetError>> {
        let loader = self.clone();
        let request = Request::from_fetch(url, options);
        Box::pin(async move { loader.request(request?).await })
    }
}

/// Parse a complete HTTP/1.1 response read until connection close
pub fn parse_response(raw: &[u8], head_request: bool) -> Result<Response, NetError> {
    let head_end = raw
        .windows(4)
        .position(|w| w == b"\r\n\r\n")
        .ok_or_else(|| NetError::Malformed("missing header terminator".into()))?;
    let head = String::from_utf8_lossy(&raw[..head_end]);
    let mut lines = head.split("\r\n");

    let status_line = lines.next().unwrap_or_default();
    let mut parts = status_line.splitn(3, ' ');
    let version = parts.next().unwrap_or_default();
    if !version.starts_with("HTTP/") {
        return Err(NetError::Malformed(format!("bad status line {status_line:?}")));
    }
    let status: u16 = parts
        .next()
        .and_then(|s| s.parse().ok())
        .ok_or_else(|| NetError::Malformed(format!("bad status line {status_line:?}")))?;
    let status_text = parts.next().unwrap_or_default().to_string();

    let headers: Vec<(String, String)> = lines
        .filter_map(|line| line.split_once(':'))
        .map(|(k, v)| (k.trim().to_string(), v.trim().to_string()))
        .collect();

    let mut response = Response {
        url: String::new(),
        status,
        status_text,
        headers,
        body: Vec::new(),
    };

    let rest = &raw[head_end + 4..];
    if head_request || (100..200).contains(&status) || status == 204 || status == 304 {
        return Ok(response);
    }

    let chunked = response
        .header("Transfer-Encoding")
        .is_some_and(|te| te.to_ascii_lowercase().contains("chunked"));
    response.body = if chunked {
        decode_chunked(rest)?
    } else if let Some(len) = response.header("Content-Length").and_then(|l| l.parse::<usize>().ok()) {
        rest[..len.min(rest.len())].to_vec()
    } else {
        rest.to_vec()
    };

    Ok(response)
}

/// Decode a `Transfer-Encoding: chunked` body
pub fn decode_chunked(mut data: &[u8]) -> Result<Vec<u8>, NetError> {
    let mut out = Vec::new();
    loop {
        let line_end = data
            .windows(2)
            .position(|w| w == b"\r\n")
            .ok_or_else(|| NetError::Malformed("truncated chunk size".into()))?;
        let size_line = String::from_utf8_lossy(&data[..line_end]);
        let size_hex = size_line.split(';').next().unwrap_or_default().trim();
        let size = usize::from_str_radix(size_hex, 16)
            .map_err(|_| NetError::Malformed(format!("bad chunk size {size_hex:?}")))?;
        data = &data[line_end + 2..];

        if size == 0 {
            return Ok(out);
        }
        if data.len() < size {
            return Err(NetError::Malformed("truncated chunk".into()));
        }
        out.extend_from_slice(&data[..size]);
        data = data.get(size + 2..).unwrap_or_default();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{FormData, UrlSearchParams};

    #[test]
    fn test_request_builder() {
        let req = Request::get("http://example.com").with_header("Accept", "application/json");

        assert_eq!(req.method, Method::Get);
        assert_eq!(req.headers.get("accept"), Some("application/json"));
    }

    #[test]
    fn test_method_parse() {
        assert_eq!("post".parse::<Method>().unwrap(), Method::Post);
        assert_eq!(" Get ".parse::<Method>().unwrap(), Method::Get);
        assert!("dialog".parse::<Method>().is_err());
        assert_eq!(Method::Delete.to_string(), "DELETE");
    }

    #[test]
    fn test_from_fetch_urlencoded() {
        let mut params = UrlSearchParams::new();
        params.append("q", "a b");
        let options = FetchOptions::new()
            .method(Method::Post)
            .body(RequestBody::UrlEncoded(params));

        let req = Request::from_fetch("http://example.com/search", &options).unwrap();
        assert_eq!(req.body.as_deref(), Some(&b"q=a+b"[..]));
        assert_eq!(
            req.headers.get("Content-Type"),
            Some("application/x-www-form-urlencoded;charset=UTF-8")
        );
    }

    #[test]
    fn test_from_fetch_multipart_sets_boundary() {
        let mut data = FormData::new();
        data.append("name", "x");
        let options = FetchOptions::new()
            .method(Method::Post)
            .header("Content-Type", "text/plain")
            .body(RequestBody::Multipart(data));

        let req = Request::from_fetch("http://example.com/", &options).unwrap();
        let content_type = req.headers.get("Content-Type").unwrap();
        let boundary = content_type.strip_prefix("multipart/form-data; boundary=").unwrap();
        let body = String::from_utf8(req.body.unwrap()).unwrap();
        assert!(body.ends_with(&format!("--{boundary}--\r\n")));
    }

    #[test]
    fn test_from_fetch_get_with_body_rejected() {
        let options = FetchOptions::new().body(RequestBody::Text("x".into()));
        assert!(matches!(
            Request::from_fetch("http://example.com/", &options),
            Err(NetError::InvalidRequest(_))
        ));
    }

    #[test]
    fn test_parse_response_content_length() {
        let raw = b"HTTP/1.1 404 Not Found\r\nContent-Length: 5\r\nX-A: b\r\n\r\nhello world";
        let response = parse_response(raw, false).unwrap();
        assert_eq!(response.status, 404);
        assert_eq!(response.status_text, "Not Found");
        assert_eq!(response.body, b"hello");
        assert_eq!(response.header("x-a"), Some("b"));
    }

    #[test]
    fn test_decode_chunked() {
        let body = b"4\r\nWiki\r\n5;ext=1\r\npedia\r\n0\r\n\r\n";
        assert_eq!(decode_chunked(body).unwrap(), b"Wikipedia");
        assert!(decode_chunked(b"zz\r\n").is_err());
        assert!(decode_chunked(b"a\r\nshort").is_err());
    }

    #[test]
    fn test_parse_response_malformed() {
        assert!(matches!(parse_response(b"garbage", false), Err(NetError::Malformed(_))));
        assert!(matches!(
            parse_response(b"SMTP 200 OK\r\n\r\n", false),
            Err(NetError::Malformed(_))
        ));
    }
}
