use std::sync::Arc;

use crate::nonce::context::NonceContext;
use crate::nonce::error::NonceError;

/// Lifecycle management for challenge-response authentication nonces.
///
/// The operations split into two groups:
///
/// - issuing and checking nonces: `generate_nonce`, `is_valid_nonce`,
///   `get_next_nonce`;
/// - state linked to a nonce: `get_prandom_bytes` for server-side key
///   material, and `get_nonce_count` / `set_nonce_count` for the client's
///   replay counter.
///
/// Keeping this behind a trait lets the time-versus-memory-versus-security
/// tradeoff be swapped without touching callers, for example an
/// implementation that keeps counts in a store shared by several servers.
///
/// # Thread Safety
///
/// Every method takes `&self` and implementations must be `Send + Sync`.
/// Calls for different nonces must never interfere. Calls racing on the same
/// nonce must not corrupt state, but may lose a counter update.
///
/// # Example
///
/// ```rust
/// use srp_nonce::{NonceManager, SignedNonceManager};
/// use std::collections::HashMap;
///
/// # fn example() -> Result<(), srp_nonce::NonceError> {
/// let manager: Box<dyn NonceManager> = Box::new(SignedNonceManager::new()?);
///
/// let mut request = HashMap::new();
/// request.insert("User-Agent".to_string(), "demo/1.0".to_string());
///
/// let nonce = manager.generate_nonce(&request)?;
/// assert!(manager.is_valid_nonce(&nonce, &request));
/// assert_eq!(manager.get_prandom_bytes(&nonce, 32)?.len(), 32);
///
/// assert_eq!(manager.get_nonce_count(&nonce), None);
/// manager.set_nonce_count(&nonce, 1)?;
/// assert_eq!(manager.get_nonce_count(&nonce), Some(1));
/// # Ok(())
/// # }
/// ```
pub trait NonceManager: Send + Sync {
    /// Creates a new, unforgeable nonce bound to `context`.
    ///
    /// The result only contains characters that are safe to embed in a
    /// quoted HTTP header parameter.
    fn generate_nonce(&self, context: &dyn NonceContext) -> Result<String, NonceError>;

    /// Returns `true` only if `nonce` was issued for a request matching
    /// `context` and has not expired.
    ///
    /// Malformed and forged nonces are simply invalid.
    fn is_valid_nonce(&self, nonce: &str, context: &dyn NonceContext) -> bool;

    /// Returns a fresh nonce the client should switch to, or `None` if the
    /// current one should keep being used.
    fn get_next_nonce(
        &self,
        nonce: &str,
        context: &dyn NonceContext,
    ) -> Result<Option<String>, NonceError>;

    /// Returns `size` pseudo-random bytes tied to `nonce`.
    ///
    /// The same nonce always yields the same bytes; the bytes cannot be
    /// computed without the manager's secret.
    fn get_prandom_bytes(&self, nonce: &str, size: usize) -> Result<Vec<u8>, NonceError>;

    /// Returns the most recently recorded nonce-count, or `None` if no
    /// count has been recorded.
    fn get_nonce_count(&self, nonce: &str) -> Option<u64>;

    /// Records `count` as the current nonce-count for `nonce`.
    ///
    /// No ordering is enforced here; checking that counts increase is the
    /// caller's policy (see [`validate_nonce`](crate::validate_nonce)).
    fn set_nonce_count(&self, nonce: &str, count: u64) -> Result<(), NonceError>;
}

impl<T: NonceManager + ?Sized> NonceManager for Arc<T> {
    fn generate_nonce(&self, context: &dyn NonceContext) -> Result<String, NonceError> {
        (**self).generate_nonce(context)
    }

    fn is_valid_nonce(&self, nonce: &str, context: &dyn NonceContext) -> bool {
        (**self).is_valid_nonce(nonce, context)
    }

    fn get_next_nonce(
        &self,
        nonce: &str,
        context: &dyn NonceContext,
    ) -> Result<Option<String>, NonceError> {
        (**self).get_next_nonce(nonce, context)
    }

    fn get_prandom_bytes(&self, nonce: &str, size: usize) -> Result<Vec<u8>, NonceError> {
        (**self).get_prandom_bytes(nonce, size)
    }

    fn get_nonce_count(&self, nonce: &str) -> Option<u64> {
        (**self).get_nonce_count(nonce)
    }

    fn set_nonce_count(&self, nonce: &str, count: u64) -> Result<(), NonceError> {
        (**self).set_nonce_count(nonce, count)
    }
}
