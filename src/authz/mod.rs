//! Authorization decision subsystem.
//!
//! # Data Flow
//! ```text
//! CheckRequest (v2 | v3)
//!     → grpc::{v2,v3}::decode (neutral Request)
//!     → Checker::check
//!         → security::headers (outbound header policy)
//!         → GET forward-auth address
//!         → security::headers (decision header policy)
//!     → neutral Response
//!     → grpc::{v2,v3}::encode (CheckResponse)
//! ```
//!
//! # Design Decisions
//! - Neutral types absorb every protocol version difference
//! - Checks share nothing but the immutable config and the HTTP client pool
//! - Authority 4xx/5xx are decisions, never errors

pub mod error;
pub mod forward;
pub mod types;

use std::time::Duration;

use async_trait::async_trait;

pub use error::{AuthzError, AuthzResult};
pub use forward::{ForwardAuthChecker, ForwardAuthConfig};
pub use types::{HttpAttributes, Request, Response};

/// Makes an allow/deny decision for a neutral request.
#[async_trait]
pub trait Checker: Send + Sync {
    /// Decide on `request`.
    ///
    /// `deadline` is the caller's remaining budget, if it announced one. It can
    /// only shorten the checker's own timeout, never extend it.
    async fn check(&self, request: &Request, deadline: Option<Duration>) -> AuthzResult<Response>;
}
