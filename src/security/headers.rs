//! Header manipulation for forward-auth calls.
//!
//! # Responsibilities
//! - Strip hop-by-hop headers in both directions
//! - Filter request headers through the configured allow-list
//! - Set X-Forwarded-Method, -Proto, -Port, -Host and -Uri
//! - Select the headers returned to the proxy on allow and on deny
//!
//! # Design Decisions
//! - Existing X-Forwarded-* values are only trusted when configured to
//! - The X-Forwarded-* headers are written after allow-list filtering
//! - Pure functions over `HeaderMap`; no I/O

use http::header::{HeaderMap, HeaderName, HeaderValue};

use crate::authz::Request;

/// Headers that are meaningful for a single transport leg only.
pub const HOP_HEADERS: [&str; 8] = [
    "connection",
    "keep-alive",
    "proxy-authenticate",
    "proxy-authorization",
    "te",
    "trailers",
    "transfer-encoding",
    "upgrade",
];

/// Headers describing the inbound message itself. The outbound GET has no
/// body and its own target, so these never travel to the authority.
pub const MESSAGE_HEADERS: [&str; 2] = ["content-length", "host"];

pub const X_FORWARDED_METHOD: &str = "x-forwarded-method";
pub const X_FORWARDED_PROTO: &str = "x-forwarded-proto";
pub const X_FORWARDED_PORT: &str = "x-forwarded-port";
pub const X_FORWARDED_HOST: &str = "x-forwarded-host";
pub const X_FORWARDED_URI: &str = "x-forwarded-uri";

/// Remove every hop-by-hop header from `headers`.
pub fn remove_hop_headers(headers: &mut HeaderMap) {
    for name in HOP_HEADERS {
        headers.remove(name);
    }
}

fn is_hop_header(name: &HeaderName) -> bool {
    HOP_HEADERS.contains(&name.as_str())
}

/// Which headers travel to the authority and back.
#[derive(Debug, Clone, Default)]
pub struct HeaderPolicy {
    /// Request headers copied to the authority. Empty copies all of them.
    pub request_headers: Vec<String>,
    /// Authority response headers copied onto an allow decision.
    pub response_headers: Vec<String>,
    /// Trust X-Forwarded-* headers already present on the request.
    pub trust_forward_header: bool,
}

impl HeaderPolicy {
    /// Headers for the outbound forward-auth request.
    pub fn forward_request_headers(&self, req: &Request) -> HeaderMap {
        let mut headers = req.headers.clone();
        remove_hop_headers(&mut headers);
        for name in MESSAGE_HEADERS {
            headers.remove(name);
        }

        let mut headers = filter_headers(headers, &self.request_headers);

        let method = self
            .trusted(req, X_FORWARDED_METHOD)
            .or_else(|| non_empty(&req.method));
        set_or_remove(&mut headers, X_FORWARDED_METHOD, method);

        let proto = self.trusted(req, X_FORWARDED_PROTO).or_else(|| {
            if req.tls {
                Some(HeaderValue::from_static("https"))
            } else {
                non_empty(&req.scheme)
            }
        });
        set_or_remove(
            &mut headers,
            X_FORWARDED_PROTO,
            Some(proto.unwrap_or_else(|| HeaderValue::from_static("http"))),
        );

        // Never derived; only passed through when trusted.
        if let Some(port) = self.trusted(req, X_FORWARDED_PORT) {
            headers.insert(X_FORWARDED_PORT, port);
        }

        let host = self
            .trusted(req, X_FORWARDED_HOST)
            .or_else(|| non_empty(&req.host));
        set_or_remove(&mut headers, X_FORWARDED_HOST, host);

        let uri = self
            .trusted(req, X_FORWARDED_URI)
            .or_else(|| non_empty(&req.request_uri()));
        set_or_remove(&mut headers, X_FORWARDED_URI, uri);

        headers
    }

    /// Headers for an allow decision, taken from the authority's response.
    pub fn allowed_response_headers(&self, authority: &HeaderMap) -> HeaderMap {
        let mut headers = authority.clone();
        remove_hop_headers(&mut headers);

        for name in &self.response_headers {
            let Ok(name) = HeaderName::from_bytes(name.trim().as_bytes()) else {
                continue;
            };
            headers.remove(&name);
            if is_hop_header(&name) {
                continue;
            }
            for value in authority.get_all(&name) {
                headers.append(name.clone(), value.clone());
            }
        }
        headers
    }

    /// Headers for a deny decision. The allow-list does not apply here.
    pub fn denied_response_headers(&self, authority: &HeaderMap) -> HeaderMap {
        let mut headers = authority.clone();
        remove_hop_headers(&mut headers);
        headers
    }

    /// First non-empty value of `name` on the request, if trusted.
    fn trusted(&self, req: &Request, name: &str) -> Option<HeaderValue> {
        if !self.trust_forward_header {
            return None;
        }
        req.headers
            .get(name)
            .filter(|value| !value.is_empty())
            .cloned()
    }
}

/// Keep only the allow-listed headers. An empty allow-list keeps everything.
pub fn filter_headers(headers: HeaderMap, allowed: &[String]) -> HeaderMap {
    if allowed.is_empty() {
        return headers;
    }

    let mut filtered = HeaderMap::new();
    for name in allowed {
        let Ok(name) = HeaderName::from_bytes(name.trim().as_bytes()) else {
            tracing::debug!(header = %name, "Ignoring invalid allow-listed header name");
            continue;
        };
        if filtered.contains_key(&name) {
            continue;
        }
        for value in headers.get_all(&name) {
            filtered.append(name.clone(), value.clone());
        }
    }
    filtered
}

fn non_empty(value: &str) -> Option<HeaderValue> {
    if value.is_empty() {
        return None;
    }
    HeaderValue::from_str(value).ok()
}

fn set_or_remove(headers: &mut HeaderMap, name: &'static str, value: Option<HeaderValue>) {
    match value {
        Some(value) => {
            headers.insert(name, value);
        }
        None => {
            headers.remove(name);
        }
    }
}
