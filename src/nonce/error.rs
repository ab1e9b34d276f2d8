use thiserror::Error;

/// Error types that can occur while issuing or deriving material from nonces.
///
/// Note that a malformed, forged or expired nonce is *not* an error: the
/// validation operations simply answer `false` (or `None`). Callers cannot
/// distinguish a corrupted token from one that was never issued or has gone
/// stale, and they should not need to.
///
/// # Error Categories
///
/// - **Configuration Errors**: `UnsupportedHashAlgorithm`, `InvalidConfig`
/// - **Contract Violations**: `OutputTooLong`
/// - **System Errors**: `ClockError`, `CryptoError`
///
/// # Example
///
/// ```rust
/// use srp_nonce::{NonceError, SignedNonceManager};
///
/// match SignedNonceManager::builder().with_hash_algorithm("md5").build() {
///     Ok(_) => unreachable!(),
///     Err(NonceError::UnsupportedHashAlgorithm(name)) => println!("no such hash: {name}"),
///     Err(e) => println!("Other error: {e}"),
/// }
/// ```
#[derive(Error, Debug)]
pub enum NonceError {
    /// The configured hash algorithm name is not recognised.
    ///
    /// Raised when the manager is constructed, never on first use.
    #[error("Unsupported hash algorithm: {0}")]
    UnsupportedHashAlgorithm(String),

    /// The configuration cannot produce a working manager.
    ///
    /// # When This Occurs
    ///
    /// - The hard timeout is zero, so every nonce would be born expired
    /// - The purge limit is zero, so the expiry queue could never shrink
    #[error("Invalid configuration: {0}")]
    InvalidConfig(String),

    /// More pseudo-random bytes were requested than HKDF-Expand can produce.
    ///
    /// RFC 5869 caps the output at 255 blocks of the hash output size. This
    /// is a programming error on the caller's side and is never truncated.
    #[error("Requested {requested} pseudo-random bytes, at most {max} are available")]
    OutputTooLong {
        /// Number of bytes asked for.
        requested: usize,
        /// Largest output the configured hash supports.
        max: usize,
    },

    /// The time source failed.
    ///
    /// # When This Occurs
    ///
    /// - The system clock reports a time before the Unix epoch
    /// - A custom time provider returned an error
    #[error("Clock error: {0}")]
    ClockError(String),

    /// A cryptographic primitive failed.
    ///
    /// # When This Occurs
    ///
    /// - The operating system random source is unavailable
    /// - Key material was rejected by the MAC implementation
    #[error("Crypto error: {0}")]
    CryptoError(String),
}
