//! Time utilities for nonce timestamps.
//!
//! Nonces carry their issuance time as a count of tenths of a second since
//! the Unix epoch. Expiry is always evaluated against a freshly sampled
//! "now", never against a value captured earlier in the request.

use crate::nonce::error::NonceError;
use std::time::{Duration, SystemTime, UNIX_EPOCH};

/// A function that provides the current time as a duration since the Unix epoch.
pub type TimeProviderFn = Box<dyn Fn() -> Result<Duration, NonceError> + Send + Sync>;

/// Resolution of the encoded nonce timestamp, in milliseconds.
const TICK_MILLIS: u128 = 100;

/// Get the current system time as a duration since the Unix epoch.
///
/// In the extremely rare case where system time is before Unix epoch,
/// it returns an error instead of panicking.
pub(crate) fn system_time() -> Result<Duration, NonceError> {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map_err(|_| NonceError::ClockError("System time is before Unix epoch".to_string()))
}

/// Convert a time since the epoch into whole tenths of a second.
pub(crate) fn to_tenths(now: Duration) -> u64 {
    (now.as_millis() / TICK_MILLIS) as u64
}

/// Check whether something issued at `issued_tenths` is past `timeout` at `now`.
///
/// The boundary is inclusive: an age exactly equal to the timeout is expired.
pub(crate) fn has_expired(issued_tenths: u64, timeout: Duration, now: Duration) -> bool {
    expires_at_millis(issued_tenths, timeout) <= now.as_millis()
}

/// Absolute expiry instant in milliseconds since the epoch.
pub(crate) fn expires_at_millis(issued_tenths: u64, timeout: Duration) -> u128 {
    u128::from(issued_tenths) * TICK_MILLIS + timeout.as_millis()
}
