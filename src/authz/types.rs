//! Protocol-neutral request and decision types.

use std::collections::HashMap;

use http::header::{HeaderMap, HeaderName, HeaderValue};

/// HTTP attributes of the original request, borrowed from a check request.
///
/// Both protocol versions decode into this shape first, so identical
/// attributes always yield identical [`Request`]s.
#[derive(Debug, Clone, Copy)]
pub struct HttpAttributes<'a> {
    /// Envoy request ID (may be empty)
    pub id: &'a str,
    /// HTTP method
    pub method: &'a str,
    /// Lower-cased header map as Envoy delivers it
    pub headers: &'a HashMap<String, String>,
    /// Request target, including the query string
    pub path: &'a str,
    /// Query string, used only when `path` carries none
    pub query: &'a str,
    /// Host (`:authority`)
    pub host: &'a str,
    /// URL scheme
    pub scheme: &'a str,
    /// Whether the downstream connection used TLS
    pub tls: bool,
}

/// The original client request, as seen by the proxy.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Request {
    /// Envoy request ID, for log correlation
    pub id: Option<String>,
    /// HTTP method
    pub method: String,
    /// URL scheme (may be empty)
    pub scheme: String,
    /// Host
    pub host: String,
    /// URL path
    pub path: String,
    /// Raw query string, without the leading `?`
    pub query: Option<String>,
    /// Request headers
    pub headers: HeaderMap,
    /// Whether TLS was in use
    pub tls: bool,
}

impl Request {
    /// Build a request from decoded HTTP attributes.
    pub fn from_attributes(attrs: HttpAttributes<'_>) -> Self {
        let (path, query) = match attrs.path.split_once('?') {
            Some((path, query)) => (path.to_string(), Some(query.to_string())),
            None if !attrs.query.is_empty() => (
                attrs.path.to_string(),
                Some(attrs.query.trim_start_matches('?').to_string()),
            ),
            None => (attrs.path.to_string(), None),
        };

        Self {
            id: (!attrs.id.is_empty()).then(|| attrs.id.to_string()),
            method: attrs.method.to_string(),
            scheme: attrs.scheme.to_string(),
            host: attrs.host.to_string(),
            path,
            query,
            headers: header_map(attrs.headers),
            tls: attrs.tls || attrs.scheme.eq_ignore_ascii_case("https"),
        }
    }

    /// Path plus query, as it appeared on the request line.
    pub fn request_uri(&self) -> String {
        match &self.query {
            Some(query) => format!("{}?{}", self.path, query),
            None => self.path.clone(),
        }
    }

    /// Full URL, for logging.
    pub fn url(&self) -> String {
        let scheme = if self.scheme.is_empty() {
            if self.tls { "https" } else { "http" }
        } else {
            self.scheme.as_str()
        };
        format!("{}://{}{}", scheme, self.host, self.request_uri())
    }
}

/// Convert Envoy's header map into a [`HeaderMap`].
///
/// Pseudo-headers (`:authority`, `:path`, ...) and entries that are not valid
/// HTTP are dropped. Names are inserted in sorted order so the result does not
/// depend on hash map iteration order.
fn header_map(headers: &HashMap<String, String>) -> HeaderMap {
    let mut names: Vec<&String> = headers.keys().collect();
    names.sort();

    let mut map = HeaderMap::with_capacity(names.len());
    for name in names {
        if name.starts_with(':') {
            continue;
        }
        let value = &headers[name];
        match (
            HeaderName::from_bytes(name.as_bytes()),
            HeaderValue::from_str(value),
        ) {
            (Ok(name), Ok(value)) => {
                map.append(name, value);
            }
            _ => tracing::debug!(header = %name, "Skipping invalid request header"),
        }
    }
    map
}

/// The decision returned to the proxy.
#[derive(Debug, Clone, PartialEq)]
pub struct Response {
    /// Whether the request is allowed
    pub allow: bool,
    /// 200 when allowing, the authority's status when denying
    pub status_code: u16,
    /// Headers to attach
    pub headers: HeaderMap,
}

impl Response {
    /// An allow decision carrying `headers`.
    pub fn allow(headers: HeaderMap) -> Self {
        Self {
            allow: true,
            status_code: 200,
            headers,
        }
    }

    /// A deny decision mirroring the authority's `status_code`.
    pub fn deny(status_code: u16, headers: HeaderMap) -> Self {
        Self {
            allow: false,
            status_code,
            headers,
        }
    }
}
