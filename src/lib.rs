//! Envoy external authorization backed by a forward-auth endpoint.
//!
//! Serves the v2 and v3 `Authorization/Check` gRPC APIs and answers each call
//! by asking an HTTP authentication authority (oauth2-proxy, Pomerium, ...)
//! whether the original request may proceed.

// Decision core
pub mod authz;
pub mod security;

// Protocol surface
pub mod grpc;
pub mod proto;

// Cross-cutting concerns
pub mod config;
pub mod lifecycle;
pub mod observability;

pub use authz::{Checker, ForwardAuthChecker, ForwardAuthConfig};
pub use config::ServiceConfig;
pub use grpc::AuthzServer;
pub use lifecycle::Shutdown;
