//! Fallback classification of opaque error text.
//!
//! Errors raised inside this workspace carry their `ErrorClass` from the
//! point of origin. This heuristic is only for messages coming back from
//! external systems that did not classify them.

use super::entities::ErrorClass;

const TRANSIENT_MARKERS: &[&str] = &["timeout", "timed out", "rate limit", "too many requests"];
const NETWORK_MARKERS: &[&str] = &["network", "connection", "unreachable", "dns"];
const LOGICAL_MARKERS: &[&str] = &["assertion", "invalid", "rejected by program"];

/// Map free-form error text to an [`ErrorClass`].
pub fn classify_error(message: &str) -> ErrorClass {
    let lower = message.to_lowercase();
    let has = |markers: &[&str]| markers.iter().any(|m| lower.contains(m));

    if has(TRANSIENT_MARKERS) {
        ErrorClass::Transient
    } else if has(NETWORK_MARKERS) {
        ErrorClass::Network
    } else if has(LOGICAL_MARKERS) {
        ErrorClass::Logical
    } else {
        ErrorClass::Unknown
    }
}
