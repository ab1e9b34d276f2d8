use serde::{Deserialize, Deserializer, Serialize};
use std::fmt;
use std::time::Duration;

/// Default hard timeout for nonces, in seconds.
pub const DEFAULT_TIMEOUT_SECS: u64 = 300;

/// Default context field bound into nonce signatures.
pub const DEFAULT_SIGN_HEADER: &str = "User-Agent";

/// Default number of queue entries examined by the opportunistic purge.
pub const DEFAULT_PURGE_LIMIT: usize = 10;

/// Length of the random secret generated when none is configured.
pub const DEFAULT_SECRET_LEN: usize = 16;

/// Predefined configuration presets for common use cases.
///
/// These presets provide sensible defaults for different deployment scenarios,
/// balancing security, usability, and memory held for nonce counters.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ConfigPreset {
    /// Production-ready configuration.
    ///
    /// - Timeout: 5 minutes
    /// - Soft timeout: 4 minutes (80% of the timeout)
    /// - Hash: SHA-1
    Production,

    /// Development-friendly configuration.
    ///
    /// - Timeout: 10 minutes, so a paused debugger does not invalidate the session
    /// - Soft timeout: 8 minutes
    Development,

    /// High-security configuration.
    ///
    /// - Timeout: 1 minute
    /// - Soft timeout: 48 seconds
    /// - Hash: SHA-256
    HighSecurity,

    /// Load configuration from environment variables.
    ///
    /// Reads configuration from:
    /// - `SRP_NONCE_TIMEOUT`: Timeout in seconds (default: 300)
    /// - `SRP_NONCE_SOFT_TIMEOUT`: Soft timeout in seconds, `0` disables renewal
    /// - `SRP_NONCE_HASH`: Hash algorithm name (default: `sha1`)
    FromEnv,
}

/// Configuration for a [`SignedNonceManager`](crate::SignedNonceManager).
///
/// All values are fixed when the manager is built.
///
/// # Example
///
/// ```rust
/// use srp_nonce::NonceManagerConfig;
/// use std::time::Duration;
///
/// let config = NonceManagerConfig {
///     timeout: Duration::from_secs(600),
///     sign_headers: vec!["User-Agent".to_string(), "Host".to_string()],
///     ..NonceManagerConfig::default()
/// };
/// assert_eq!(config.resolved_soft_timeout(), Some(Duration::from_secs(480)));
/// ```
#[derive(Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct NonceManagerConfig {
    /// Master secret. A random one is generated when unset.
    #[serde(skip_serializing, deserialize_with = "deserialize_secret")]
    pub secret: Option<Vec<u8>>,
    /// Age at which a nonce stops being valid.
    #[serde(with = "secs")]
    pub timeout: Duration,
    /// Age at which a replacement nonce is offered.
    ///
    /// `None` means 80% of the timeout in whole seconds; zero disables
    /// early renewal.
    #[serde(with = "opt_secs")]
    pub soft_timeout: Option<Duration>,
    /// Context fields mixed into every signature.
    pub sign_headers: Vec<String>,
    /// Name of the hash function behind every HMAC.
    pub hash_algorithm: String,
    /// Queue entries examined per opportunistic purge.
    pub purge_limit: usize,
}

impl Default for NonceManagerConfig {
    fn default() -> Self {
        Self {
            secret: None,
            timeout: Duration::from_secs(DEFAULT_TIMEOUT_SECS),
            soft_timeout: None,
            sign_headers: vec![DEFAULT_SIGN_HEADER.to_string()],
            hash_algorithm: "sha1".to_string(),
            purge_limit: DEFAULT_PURGE_LIMIT,
        }
    }
}

impl fmt::Debug for NonceManagerConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("NonceManagerConfig")
            .field("secret", &self.secret.as_ref().map(|_| "<redacted>"))
            .field("timeout", &self.timeout)
            .field("soft_timeout", &self.soft_timeout)
            .field("sign_headers", &self.sign_headers)
            .field("hash_algorithm", &self.hash_algorithm)
            .field("purge_limit", &self.purge_limit)
            .finish()
    }
}

impl NonceManagerConfig {
    /// Builds a configuration from the defaults overlaid with environment variables.
    ///
    /// Unparsable values are ignored and the default is kept.
    pub fn from_env() -> Self {
        let mut config = Self::default();
        if let Some(timeout) = env_secs("SRP_NONCE_TIMEOUT") {
            config.timeout = timeout;
        }
        if let Some(soft_timeout) = env_secs("SRP_NONCE_SOFT_TIMEOUT") {
            config.soft_timeout = Some(soft_timeout);
        }
        if let Ok(hash) = std::env::var("SRP_NONCE_HASH") {
            config.hash_algorithm = hash;
        }
        config
    }

    /// The soft timeout actually in force, or `None` when renewal is disabled.
    pub fn resolved_soft_timeout(&self) -> Option<Duration> {
        match self.soft_timeout {
            Some(soft_timeout) if soft_timeout.is_zero() => None,
            Some(soft_timeout) => Some(soft_timeout),
            None => {
                let secs = (self.timeout.as_secs_f64() * 0.8) as u64;
                (secs > 0).then(|| Duration::from_secs(secs))
            }
        }
    }

    /// Validates the configuration and returns any warnings.
    ///
    /// # Returns
    ///
    /// A vector of warning messages for potentially problematic settings.
    /// Hard errors (unknown hash, zero timeout) are reported by the builder.
    pub fn validate(&self) -> Vec<String> {
        let mut warnings = Vec::new();

        if self.timeout.as_secs() < 10 {
            warnings.push(
                "Very short timeout (< 10 seconds) may reject legitimate clients".to_string(),
            );
        }
        if self.timeout.as_secs() > 3600 {
            warnings.push(
                "Long timeout (> 1 hour) keeps nonce counters in memory longer".to_string(),
            );
        }

        if let Some(soft_timeout) = self.resolved_soft_timeout() {
            if soft_timeout >= self.timeout {
                warnings.push(
                    "Soft timeout is not shorter than the timeout; nonces will expire before renewal"
                        .to_string(),
                );
            }
        }

        if self.sign_headers.is_empty() {
            warnings.push("No sign headers; nonces are not bound to any client".to_string());
        }

        if let Some(secret) = &self.secret {
            if secret.len() < DEFAULT_SECRET_LEN {
                warnings.push(format!(
                    "Short secret (< {DEFAULT_SECRET_LEN} bytes) weakens nonce signatures"
                ));
            }
        }

        warnings
    }

    /// Returns a summary of the current configuration.
    pub fn summary(&self) -> String {
        let soft_timeout = match self.resolved_soft_timeout() {
            Some(soft_timeout) => format!("{}s", soft_timeout.as_secs_f64()),
            None => "disabled".to_string(),
        };
        format!(
            "NonceManagerConfig {{ Timeout: {}s, Soft Timeout: {}, Sign Headers: [{}], Hash: {} }}",
            self.timeout.as_secs_f64(),
            soft_timeout,
            self.sign_headers.join(", "),
            self.hash_algorithm,
        )
    }
}

impl From<ConfigPreset> for NonceManagerConfig {
    fn from(preset: ConfigPreset) -> Self {
        match preset {
            ConfigPreset::Production => Self::default(),
            ConfigPreset::Development => Self {
                timeout: Duration::from_secs(600),
                ..Self::default()
            },
            ConfigPreset::HighSecurity => Self {
                timeout: Duration::from_secs(60),
                hash_algorithm: "sha256".to_string(),
                ..Self::default()
            },
            ConfigPreset::FromEnv => Self::from_env(),
        }
    }
}

fn env_secs(name: &str) -> Option<Duration> {
    std::env::var(name)
        .ok()
        .and_then(|s| s.trim().parse::<f64>().ok())
        .and_then(|secs| Duration::try_from_secs_f64(secs).ok())
}

fn deserialize_secret<'de, D>(deserializer: D) -> Result<Option<Vec<u8>>, D::Error>
where
    D: Deserializer<'de>,
{
    Ok(Option::<String>::deserialize(deserializer)?.map(String::into_bytes))
}

/// Durations as fractional seconds.
mod secs {
    use serde::{Deserialize, Deserializer, Serializer, de::Error};
    use std::time::Duration;

    pub(super) fn serialize<S: Serializer>(value: &Duration, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_f64(value.as_secs_f64())
    }

    pub(super) fn deserialize<'de, D: Deserializer<'de>>(deserializer: D) -> Result<Duration, D::Error> {
        let secs = f64::deserialize(deserializer)?;
        Duration::try_from_secs_f64(secs).map_err(D::Error::custom)
    }
}

mod opt_secs {
    use serde::{Deserialize, Deserializer, Serializer, de::Error};
    use std::time::Duration;

    pub(super) fn serialize<S: Serializer>(
        value: &Option<Duration>,
        serializer: S,
    ) -> Result<S::Ok, S::Error> {
        match value {
            Some(value) => serializer.serialize_some(&value.as_secs_f64()),
            None => serializer.serialize_none(),
        }
    }

    pub(super) fn deserialize<'de, D: Deserializer<'de>>(
        deserializer: D,
    ) -> Result<Option<Duration>, D::Error> {
        Option::<f64>::deserialize(deserializer)?
            .map(|secs| Duration::try_from_secs_f64(secs).map_err(D::Error::custom))
            .transpose()
    }
}
