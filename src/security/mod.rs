//! Header security policy.
//!
//! # Responsibilities
//! - Decide which headers travel to the forward-auth authority
//! - Decide which authority headers travel back to the proxy
//! - Strip hop-by-hop headers on both paths
//!
//! # Design Decisions
//! - Empty allow-lists mean "everything"
//! - Client-supplied X-Forwarded-* headers are only trusted when configured

pub mod headers;

pub use headers::HeaderPolicy;
