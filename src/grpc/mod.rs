//! Envoy external authorization gRPC surface.
//!
//! # Data Flow
//! ```text
//! Envoy / Contour
//!     → AuthzServer (tonic, TraceLayer)
//!         → v2::AuthorizationV2 | v3::AuthorizationV3
//!             → decode → Checker::check → encode
//!     ← CheckResponse
//! ```
//!
//! # Design Decisions
//! - v2 and v3 are registered side by side on one listener
//! - Both versions share one checker; only the codecs differ
//! - Any check error becomes `INTERNAL`; denies are successful responses
//! - The caller's `grpc-timeout` bounds the forward-auth call

pub mod client;
pub mod deadline;
pub mod server;
pub mod v2;
pub mod v3;

use std::time::{Duration, Instant};

use http::HeaderMap;
use tracing::error;

use crate::authz::{AuthzResult, Checker, Request, Response};
use crate::observability::metrics;

pub use client::{ApiVersion, CheckClient};
pub use server::{AuthzServer, ServerError};

/// Run one decoded check through `checker`, recording its outcome.
async fn run_check(
    checker: &dyn Checker,
    api_version: &'static str,
    request: AuthzResult<Request>,
    deadline: Option<Duration>,
) -> Result<Response, tonic::Status> {
    let started = Instant::now();
    let result = match request {
        Ok(request) => checker.check(&request, deadline).await,
        Err(e) => Err(e),
    };

    match result {
        Ok(response) => {
            metrics::record_check(api_version, Some(response.allow), started);
            Ok(response)
        }
        Err(e) => {
            error!(api_version, kind = e.kind(), error = %e, "Check failed");
            metrics::record_check(api_version, None, started);
            Err(e.into())
        }
    }
}

/// Flatten `headers` into header options.
///
/// The first value of each name overwrites whatever the proxy holds; later
/// values of the same name append. `make` receives `(key, value, append)`.
fn header_options<T>(headers: &HeaderMap, make: impl Fn(String, String, bool) -> T) -> Vec<T> {
    let mut options = Vec::with_capacity(headers.len());
    for name in headers.keys() {
        for (i, value) in headers.get_all(name).iter().enumerate() {
            options.push(make(
                name.as_str().to_string(),
                String::from_utf8_lossy(value.as_bytes()).into_owned(),
                i > 0,
            ));
        }
    }
    options
}
