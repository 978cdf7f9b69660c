//! Caller deadline extraction.
//!
//! tonic's server already enforces `grpc-timeout` by dropping the handler
//! future, which cancels the outbound call. Reading it here as well hands the
//! budget to the forward-auth request, so an expiring check fails as a logged
//! upstream timeout with a message instead of a silent cancel.

use std::time::Duration;

use tonic::metadata::MetadataMap;

const GRPC_TIMEOUT: &str = "grpc-timeout";

/// Remaining budget announced by the caller in `grpc-timeout`, if any.
///
/// A malformed header is ignored rather than failing the call.
pub fn grpc_timeout(metadata: &MetadataMap) -> Option<Duration> {
    let raw = metadata.get(GRPC_TIMEOUT)?.to_str().ok()?;
    parse_timeout(raw)
}

/// Parse a `grpc-timeout` value: at most eight ASCII digits and a unit.
fn parse_timeout(raw: &str) -> Option<Duration> {
    if raw.len() < 2 || raw.len() > 9 {
        return None;
    }
    let (digits, unit) = raw.split_at(raw.len() - 1);
    if !digits.bytes().all(|b| b.is_ascii_digit()) {
        return None;
    }
    let value: u64 = digits.parse().ok()?;

    let duration = match unit {
        "H" => Duration::from_secs(value.checked_mul(3600)?),
        "M" => Duration::from_secs(value.checked_mul(60)?),
        "S" => Duration::from_secs(value),
        "m" => Duration::from_millis(value),
        "u" => Duration::from_micros(value),
        "n" => Duration::from_nanos(value),
        _ => return None,
    };
    Some(duration)
}
