//! Forward-auth checker.
//!
//! Asks an HTTP authentication authority about each request: a `GET` to the
//! configured address carrying the request's headers plus X-Forwarded-*
//! metadata. A 2xx answer allows the request; anything else is a deny that
//! mirrors the authority's status, headers and redirect location.

use std::time::Duration;

use async_trait::async_trait;
use http::header::{HeaderMap, HeaderValue, LOCATION};
use tracing::{debug, info};
use url::Url;

use crate::authz::{AuthzError, AuthzResult, Checker, Request, Response};
use crate::config::ServiceConfig;
use crate::observability::metrics;
use crate::security::headers::HeaderPolicy;

/// Default ceiling for a single forward-auth call.
pub const DEFAULT_TIMEOUT: Duration = Duration::from_secs(15);

/// Immutable configuration for [`ForwardAuthChecker`].
#[derive(Debug, Clone)]
pub struct ForwardAuthConfig {
    /// The authentication server address.
    pub address: Url,
    /// Header selection in both directions.
    pub headers: HeaderPolicy,
    /// Timeout for the outbound call.
    pub timeout: Duration,
}

impl ForwardAuthConfig {
    /// Configuration with the default timeout and a pass-through header policy
    /// that trusts existing X-Forwarded-* headers.
    pub fn new(address: Url) -> Self {
        Self {
            address,
            headers: HeaderPolicy {
                trust_forward_header: true,
                ..Default::default()
            },
            timeout: DEFAULT_TIMEOUT,
        }
    }

    /// Configuration for the service's settings.
    pub fn from_service_config(config: &ServiceConfig) -> Result<Self, url::ParseError> {
        Ok(Self {
            address: Url::parse(&config.forward_auth_address)?,
            headers: HeaderPolicy {
                request_headers: config.auth_request_headers.clone(),
                response_headers: config.auth_response_headers.clone(),
                trust_forward_header: config.trust_forward_header,
            },
            timeout: config.forward_auth_timeout(),
        })
    }
}

/// [`Checker`] backed by a forward-auth HTTP endpoint.
pub struct ForwardAuthChecker {
    config: ForwardAuthConfig,
    client: reqwest::Client,
}

impl ForwardAuthChecker {
    /// Create a checker with its own connection pool.
    ///
    /// Redirects are never followed: a 3xx from the authority is itself the
    /// decision.
    pub fn new(config: ForwardAuthConfig) -> Result<Self, reqwest::Error> {
        let client = reqwest::Client::builder()
            .redirect(reqwest::redirect::Policy::none())
            .build()?;
        Ok(Self { config, client })
    }

    /// Get a reference to the config.
    pub fn config(&self) -> &ForwardAuthConfig {
        &self.config
    }

    fn timeout(&self, deadline: Option<Duration>) -> Duration {
        match deadline {
            Some(deadline) => deadline.min(self.config.timeout),
            None => self.config.timeout,
        }
    }
}

#[async_trait]
impl Checker for ForwardAuthChecker {
    async fn check(&self, request: &Request, deadline: Option<Duration>) -> AuthzResult<Response> {
        info!(
            url = %request.url(),
            request_id = request.id.as_deref().unwrap_or(""),
            "Handling request"
        );

        let headers = self.config.headers.forward_request_headers(request);
        let timeout = self.timeout(deadline);

        debug!(
            url = %self.config.address,
            headers = ?headers,
            timeout = ?timeout,
            "Making forward authN request"
        );

        let res = self
            .client
            .get(self.config.address.clone())
            .headers(headers)
            .timeout(timeout)
            .send()
            .await?;

        let status = res.status();
        metrics::record_authority_status(status.as_u16());

        if !status.is_success() {
            let mut headers = self.config.headers.denied_response_headers(res.headers());
            if let Some(location) = redirect_location(&self.config.address, res.headers())? {
                headers.insert(LOCATION, location);
            }

            debug!(
                status_code = status.as_u16(),
                headers = ?headers,
                "Forward auth disallow"
            );
            return Ok(Response::deny(status.as_u16(), headers));
        }

        let headers = self.config.headers.allowed_response_headers(res.headers());
        debug!(
            status_code = status.as_u16(),
            headers = ?headers,
            "Forward auth allow"
        );

        Ok(Response::allow(headers))
    }
}

/// Resolve the authority's `Location` header against its own address.
///
/// A missing or empty header is not an error; a malformed one is. Absolute
/// locations are returned verbatim.
pub fn redirect_location(base: &Url, headers: &HeaderMap) -> AuthzResult<Option<HeaderValue>> {
    let Some(raw) = headers.get(LOCATION) else {
        return Ok(None);
    };
    let raw = std::str::from_utf8(raw.as_bytes())
        .map_err(|e| AuthzError::upstream(format!("invalid Location header: {}", e)))?;
    if raw.is_empty() {
        return Ok(None);
    }

    let resolved = match Url::parse(raw) {
        Ok(_) => raw.to_string(),
        Err(url::ParseError::RelativeUrlWithoutBase) => base
            .join(raw)
            .map_err(|e| AuthzError::upstream(format!("invalid Location header {:?}: {}", raw, e)))?
            .to_string(),
        Err(e) => {
            return Err(AuthzError::upstream(format!(
                "invalid Location header {:?}: {}",
                raw, e
            )))
        }
    };

    HeaderValue::from_bytes(resolved.as_bytes())
        .map(Some)
        .map_err(|e| AuthzError::upstream(format!("invalid Location header: {}", e)))
}
