use std::fmt;
use std::time::Duration;

use base64::Engine;
use base64::engine::general_purpose::STANDARD;
use rand::RngCore;
use rand::rngs::OsRng;

use crate::nonce::config::NonceManagerConfig;
use crate::nonce::context::NonceContext;
use crate::nonce::error::NonceError;
use crate::nonce::manager::NonceManager;
use crate::nonce::manager_builder::SignedNonceManagerBuilder;
use crate::nonce::signature::{DerivedKeys, HashAlgorithm, KeyedHash, MacLike};
use crate::nonce::storage::{NonceCountStore, StorageStats};
use crate::nonce::time_utils::{TimeProviderFn, expires_at_millis, has_expired, to_tenths};
use crate::nonce::token::{self, NonceToken, SALT_LEN};

/// Separator fed into the MAC before each signed context field.
const FIELD_SEPARATOR: &[u8] = b"\x00";

/// [`NonceManager`] based on signed, timestamped nonces.
///
/// A nonce is `hex-timestamp:hex-salt:base64-signature`. The signature is an
/// HMAC over `timestamp:salt` and the configured context fields, so checking
/// a nonce needs no server-side state at all. Memory is only spent on the
/// client nonce-count, and that is reclaimed by a purge sweep once the nonce
/// expires.
///
/// # Example
///
/// ```rust
/// use srp_nonce::{NonceManager, SignedNonceManager};
/// use std::time::Duration;
///
/// # fn example() -> Result<(), srp_nonce::NonceError> {
/// let manager = SignedNonceManager::builder()
///     .with_secret(b"a long and unguessable secret")
///     .with_timeout(Duration::from_secs(300))
///     .with_soft_timeout(Duration::from_secs(240))
///     .build()?;
///
/// let request = [("User-Agent", "demo/1.0")];
/// let nonce = manager.generate_nonce(&request)?;
/// assert!(manager.is_valid_nonce(&nonce, &request));
///
/// // A different user agent cannot use this nonce
/// assert!(!manager.is_valid_nonce(&nonce, &[("User-Agent", "evil/6.6")]));
///
/// // Still fresh, so no replacement is offered
/// assert_eq!(manager.get_next_nonce(&nonce, &request)?, None);
/// # Ok(())
/// # }
/// ```
pub struct SignedNonceManager {
    keys: DerivedKeys,
    timeout: Duration,
    soft_timeout: Option<Duration>,
    sign_headers: Vec<String>,
    purge_limit: usize,
    time_provider: TimeProviderFn,
    counts: NonceCountStore,
}

impl SignedNonceManager {
    /// Creates a manager with the default configuration and a random secret.
    pub fn new() -> Result<Self, NonceError> {
        Self::builder().build()
    }

    /// Creates a manager from an explicit configuration.
    pub fn from_config(config: NonceManagerConfig) -> Result<Self, NonceError> {
        Self::builder().with_config(config).build()
    }

    /// Returns a builder for configuring a manager.
    pub fn builder() -> SignedNonceManagerBuilder {
        SignedNonceManagerBuilder::new()
    }

    pub(crate) fn from_parts(
        keys: DerivedKeys,
        config: &NonceManagerConfig,
        time_provider: TimeProviderFn,
    ) -> Self {
        Self {
            keys,
            timeout: config.timeout,
            soft_timeout: config.resolved_soft_timeout(),
            sign_headers: config.sign_headers.clone(),
            purge_limit: config.purge_limit,
            time_provider,
            counts: NonceCountStore::new(),
        }
    }

    /// Age at which nonces stop being valid.
    pub fn timeout(&self) -> Duration {
        self.timeout
    }

    /// Age at which a replacement nonce is offered, if early renewal is on.
    pub fn soft_timeout(&self) -> Option<Duration> {
        self.soft_timeout
    }

    /// Context fields bound into every signature.
    pub fn sign_headers(&self) -> &[String] {
        &self.sign_headers
    }

    /// Hash function behind every HMAC this manager computes.
    pub fn hash_algorithm(&self) -> HashAlgorithm {
        self.keys.algorithm
    }

    /// Forgets the counts of expired nonces.
    ///
    /// Examines the queue from the nonce that expires first and stops at the
    /// first one still alive, or after `limit` removals. `None` means no
    /// limit. Returns the number of nonces forgotten.
    ///
    /// This also happens automatically, a few entries at a time, whenever
    /// [`set_nonce_count`](NonceManager::set_nonce_count) starts tracking a
    /// new nonce.
    pub fn purge_expired(&self, limit: Option<usize>) -> Result<usize, NonceError> {
        let now = self.now()?;
        Ok(self.counts.purge_expired(now.as_millis(), limit))
    }

    /// Returns statistics about the tracked nonce-counts.
    pub fn stats(&self) -> StorageStats {
        self.counts.stats()
    }

    fn now(&self) -> Result<Duration, NonceError> {
        (self.time_provider)()
    }

    /// MAC over `payload` followed by each signed context field.
    fn signature_mac(
        &self,
        payload: &str,
        context: &dyn NonceContext,
    ) -> Result<KeyedHash, NonceError> {
        let mut mac = self.keys.signer()?;
        mac.update(payload.as_bytes());
        for header in &self.sign_headers {
            mac.update(FIELD_SEPARATOR);
            mac.update(context.field(header).unwrap_or_default().as_bytes());
        }
        Ok(mac)
    }

    /// Expired under `timeout`; anything without a readable timestamp counts.
    fn nonce_has_expired(&self, nonce: &str, timeout: Duration, now: Duration) -> bool {
        match token::issued_tenths(nonce) {
            Some(issued) => has_expired(issued, timeout, now),
            None => true,
        }
    }
}

impl NonceManager for SignedNonceManager {
    fn generate_nonce(&self, context: &dyn NonceContext) -> Result<String, NonceError> {
        let issued = to_tenths(self.now()?);

        let mut salt = [0u8; SALT_LEN];
        OsRng
            .try_fill_bytes(&mut salt)
            .map_err(|e| NonceError::CryptoError(format!("Random source failed: {e}")))?;

        let payload = token::format_payload(issued, &salt);
        let signature = STANDARD.encode(self.signature_mac(&payload, context)?.finalize());

        tracing::debug!(payload = %payload, "issued nonce");
        Ok(token::assemble(&payload, &signature))
    }

    fn is_valid_nonce(&self, nonce: &str, context: &dyn NonceContext) -> bool {
        let now = match self.now() {
            Ok(now) => now,
            Err(e) => {
                tracing::warn!("cannot validate nonce: {e}");
                return false;
            }
        };

        let Some(parsed) = NonceToken::parse(nonce) else {
            tracing::trace!("rejected nonce: malformed");
            return false;
        };
        if has_expired(parsed.issued_tenths(), self.timeout, now) {
            tracing::trace!("rejected nonce: expired");
            return false;
        }

        let Ok(provided) = STANDARD.decode(parsed.signature()) else {
            tracing::trace!("rejected nonce: bad signature encoding");
            return false;
        };
        let valid = match self.signature_mac(parsed.payload(), context) {
            Ok(mac) => mac.verify(&provided),
            Err(_) => false,
        };
        if !valid {
            tracing::trace!("rejected nonce: bad signature");
        }
        valid
    }

    fn get_next_nonce(
        &self,
        nonce: &str,
        context: &dyn NonceContext,
    ) -> Result<Option<String>, NonceError> {
        // With renewal disabled a replacement is only due once the nonce is dead
        let timeout = self.soft_timeout.unwrap_or(self.timeout);
        if !self.nonce_has_expired(nonce, timeout, self.now()?) {
            return Ok(None);
        }
        tracing::debug!("nonce past soft timeout, issuing replacement");
        self.generate_nonce(context).map(Some)
    }

    fn get_prandom_bytes(&self, nonce: &str, size: usize) -> Result<Vec<u8>, NonceError> {
        self.keys.generator.expand(nonce.as_bytes(), size)
    }

    fn get_nonce_count(&self, nonce: &str) -> Option<u64> {
        self.counts.get(nonce)
    }

    fn set_nonce_count(&self, nonce: &str, count: u64) -> Result<(), NonceError> {
        let now = self.now()?;
        // Without a timestamp the entry is born expired and goes on the next sweep
        let expires_at = token::issued_tenths(nonce)
            .map(|issued| expires_at_millis(issued, self.timeout))
            .unwrap_or(0);
        if self
            .counts
            .set(nonce, count, expires_at, now.as_millis(), self.purge_limit)
        {
            tracing::trace!(count, "tracking new nonce");
        }
        Ok(())
    }
}

impl fmt::Debug for SignedNonceManager {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("SignedNonceManager")
            .field("hash_algorithm", &self.keys.algorithm)
            .field("timeout", &self.timeout)
            .field("soft_timeout", &self.soft_timeout)
            .field("sign_headers", &self.sign_headers)
            .field("purge_limit", &self.purge_limit)
            .finish_non_exhaustive()
    }
}
