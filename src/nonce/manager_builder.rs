use std::time::Duration;

use rand::RngCore;
use rand::rngs::OsRng;

use crate::nonce::config::{DEFAULT_SECRET_LEN, NonceManagerConfig};
use crate::nonce::error::NonceError;
use crate::nonce::signature::{DerivedKeys, HashAlgorithm};
use crate::nonce::signed::SignedNonceManager;
use crate::nonce::time_utils::{TimeProviderFn, system_time};

/// A builder for creating a `SignedNonceManager` instance.
///
/// Starts from [`NonceManagerConfig::default`]; every setting can be
/// overridden individually or replaced wholesale with `.with_config()`.
#[must_use = "The builder does nothing unless `.build()` is called."]
pub struct SignedNonceManagerBuilder {
    config: NonceManagerConfig,
    time_provider: Option<TimeProviderFn>,
}

impl SignedNonceManagerBuilder {
    /// Creates a new builder with the default configuration.
    pub(crate) fn new() -> Self {
        Self {
            config: NonceManagerConfig::default(),
            time_provider: None, // Will default to the system clock in build
        }
    }

    /// Replaces every setting with the values in `config`.
    ///
    /// A time provider set earlier is kept.
    pub fn with_config(mut self, config: NonceManagerConfig) -> Self {
        self.config = config;
        self
    }

    /// Sets the master secret all keys are derived from.
    ///
    /// If not set, 16 random bytes are generated. Managers that must accept
    /// each other's nonces need the same secret.
    pub fn with_secret(mut self, secret: &[u8]) -> Self {
        self.config.secret = Some(secret.to_vec());
        self
    }

    /// Sets the age at which nonces stop being valid.
    ///
    /// If not set, defaults to 5 minutes.
    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.config.timeout = timeout;
        self
    }

    /// Sets the age at which a replacement nonce is offered.
    ///
    /// If not set, defaults to 80% of the timeout in whole seconds. A zero
    /// duration disables early renewal.
    pub fn with_soft_timeout(mut self, soft_timeout: Duration) -> Self {
        self.config.soft_timeout = Some(soft_timeout);
        self
    }

    /// Sets the context fields bound into every nonce signature.
    ///
    /// If not set, nonces are bound to `User-Agent`.
    ///
    /// # Example
    ///
    /// ```rust
    /// # use srp_nonce::SignedNonceManager;
    /// # fn example() -> Result<(), srp_nonce::NonceError> {
    /// let manager = SignedNonceManager::builder()
    ///     .with_sign_headers(["User-Agent", "X-Forwarded-For"])
    ///     .build()?;
    /// assert_eq!(manager.sign_headers().len(), 2);
    /// # Ok(())
    /// # }
    /// ```
    pub fn with_sign_headers<I, S>(mut self, headers: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.config.sign_headers = headers.into_iter().map(Into::into).collect();
        self
    }

    /// Sets the hash function by name, e.g. `sha1`, `sha256` or `sha512`.
    ///
    /// Unknown names are reported by `.build()`.
    pub fn with_hash_algorithm(mut self, name: &str) -> Self {
        self.config.hash_algorithm = name.to_string();
        self
    }

    /// Sets how many expired entries are purged when a new nonce is first
    /// given a count.
    ///
    /// If not set, defaults to 10.
    pub fn with_purge_limit(mut self, purge_limit: usize) -> Self {
        self.config.purge_limit = purge_limit;
        self
    }

    /// Replaces the system clock.
    ///
    /// The provider returns the current time as a duration since the Unix
    /// epoch. Mostly useful to drive expiry in tests without sleeping.
    ///
    /// # Example
    ///
    /// ```rust
    /// # use srp_nonce::SignedNonceManager;
    /// # use std::time::Duration;
    /// # fn example() -> Result<(), srp_nonce::NonceError> {
    /// let manager = SignedNonceManager::builder()
    ///     .with_time_provider(|| Ok(Duration::from_secs(1_700_000_000)))
    ///     .build()?;
    /// # Ok(())
    /// # }
    /// ```
    pub fn with_time_provider<F>(mut self, provider: F) -> Self
    where
        F: Fn() -> Result<Duration, NonceError> + Send + Sync + 'static,
    {
        self.time_provider = Some(Box::new(provider));
        self
    }

    /// Builds the `SignedNonceManager`.
    ///
    /// Fails on an unknown hash algorithm, a zero timeout or a zero purge
    /// limit. Questionable but usable settings are logged as warnings.
    pub fn build(self) -> Result<SignedNonceManager, NonceError> {
        let algorithm: HashAlgorithm = self.config.hash_algorithm.parse()?;

        if self.config.timeout.is_zero() {
            return Err(NonceError::InvalidConfig(
                "timeout must be greater than zero".to_string(),
            ));
        }
        if self.config.purge_limit == 0 {
            return Err(NonceError::InvalidConfig(
                "purge limit must be at least 1".to_string(),
            ));
        }
        for warning in self.config.validate() {
            tracing::warn!("{warning}");
        }

        let keys = match &self.config.secret {
            Some(secret) => DerivedKeys::derive(algorithm, secret),
            None => DerivedKeys::derive(algorithm, &random_secret()?),
        };
        let time_provider = self
            .time_provider
            .unwrap_or_else(|| Box::new(system_time));

        tracing::debug!(config = %self.config.summary(), "built nonce manager");
        Ok(SignedNonceManager::from_parts(keys, &self.config, time_provider))
    }
}

fn random_secret() -> Result<[u8; DEFAULT_SECRET_LEN], NonceError> {
    let mut secret = [0u8; DEFAULT_SECRET_LEN];
    OsRng
        .try_fill_bytes(&mut secret)
        .map_err(|e| NonceError::CryptoError(format!("Random source failed: {e}")))?;
    Ok(secret)
}
