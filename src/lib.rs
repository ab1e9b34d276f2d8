//! # SRP Nonce
//!
//! Signed, time-bounded nonces for challenge-response HTTP authentication
//! (SRP and digest-style schemes).
//!
//! This library issues the nonces a server sends in its authentication
//! challenge, checks them when the client answers, offers replacements before
//! they expire, derives per-nonce key material, and keeps the client's
//! nonce-count so that replayed requests can be spotted.
//!
//! ## Features
//!
//! - **Stateless Validation**: Nonces carry their own timestamp and HMAC
//!   signature, so checking one needs no server-side lookup
//! - **Context Binding**: Signatures cover selected request fields (by default
//!   `User-Agent`), so a stolen nonce is useless from another client
//! - **Soft Renewal**: A replacement nonce is offered before the hard timeout
//! - **Key Derivation**: HKDF-based pseudo-random bytes tied to each nonce
//! - **Bounded Memory**: Nonce-counts are forgotten by an incremental purge
//!   once their nonce expires
//! - **Concurrent Access**: Every operation takes `&self` and is safe to call
//!   from many threads or tasks at once
//!
//! ## Quick Start
//!
//! ```rust
//! use srp_nonce::{NonceManager, SignedNonceManager, validate_nonce};
//! use std::collections::HashMap;
//! use std::time::Duration;
//!
//! # fn example() -> Result<(), srp_nonce::NonceError> {
//! let manager = SignedNonceManager::builder()
//!     .with_secret(b"shared by every server in the pool")
//!     .with_timeout(Duration::from_secs(300))
//!     .build()?;
//!
//! let mut headers = HashMap::new();
//! headers.insert("User-Agent".to_string(), "demo/1.0".to_string());
//!
//! // Challenge: hand the client a fresh nonce
//! let nonce = manager.generate_nonce(&headers)?;
//!
//! // Response: check the nonce and its count, then derive session material
//! assert!(validate_nonce(&manager, &nonce, &headers, Some("00000001"))?);
//! let key_material = manager.get_prandom_bytes(&nonce, 32)?;
//! assert_eq!(key_material.len(), 32);
//!
//! // Tell the client to switch nonces once this one gets old
//! if let Some(next) = manager.get_next_nonce(&nonce, &headers)? {
//!     println!("next nonce: {next}");
//! }
//! # Ok(())
//! # }
//! ```
//!
//! ## Configuration
//!
//! Settings can come from the builder, a [`NonceManagerConfig`] (which is
//! serde-deserializable), a [`ConfigPreset`], or environment variables:
//!
//! ```bash
//! export SRP_NONCE_TIMEOUT=600
//! export SRP_NONCE_SOFT_TIMEOUT=480
//! export SRP_NONCE_HASH=sha256
//! ```
//!
//! ```rust
//! use srp_nonce::{ConfigPreset, SignedNonceManager};
//!
//! # fn example() -> Result<(), srp_nonce::NonceError> {
//! let manager = SignedNonceManager::from_config(ConfigPreset::FromEnv.into())?;
//! # Ok(())
//! # }
//! ```
//!
//! ## Architecture
//!
//! - **[`NonceManager`]**: The contract callers program against
//! - **[`SignedNonceManager`]**: In-memory implementation with HMAC-signed nonces
//! - **[`NonceContext`]**: Read access to the request fields a nonce is bound to
//! - **[`NonceCountStore`]**: Concurrent nonce-count map with an expiry queue
//! - **[`NonceError`]**: Failures of the system around the nonce (clock, RNG,
//!   configuration). Bad nonces are never errors, just invalid.
//!
//! ## Logging
//!
//! The crate reports through [`tracing`] and installs no subscriber. Issuance,
//! renewal and purge sweeps log at `debug`, rejected nonces at `trace`, and
//! questionable configuration at `warn`.

pub mod nonce;

// Re-export commonly used types
pub use nonce::{
    ConfigPreset, HashAlgorithm, MacLike, NonceContext, NonceCountStore, NonceError,
    NonceManager, NonceManagerConfig, SignedNonceManager, SignedNonceManagerBuilder,
    StorageStats, TimeProviderFn, validate_nonce,
};

#[cfg(test)]
mod tests {
    use crate::{NonceManager, SignedNonceManager, validate_nonce};
    use std::sync::Arc;
    use std::sync::atomic::{AtomicU64, Ordering};
    use std::time::Duration;

    const TEST_SECRET: &[u8] = b"test_secret_key_123";

    #[test]
    fn test_challenge_response_flow() {
        let clock = Arc::new(AtomicU64::new(1_700_000_000_000));
        let handle = Arc::clone(&clock);
        let manager = SignedNonceManager::builder()
            .with_secret(TEST_SECRET)
            .with_time_provider(move || Ok(Duration::from_millis(handle.load(Ordering::SeqCst))))
            .build()
            .unwrap();
        let headers = [("User-Agent", "client/1.0")];

        let nonce = manager.generate_nonce(&headers).unwrap();
        assert!(validate_nonce(&manager, &nonce, &headers, Some("00000001")).unwrap());
        assert!(validate_nonce(&manager, &nonce, &headers, Some("00000002")).unwrap());

        // Test duplicate nonce-count detection
        assert!(!validate_nonce(&manager, &nonce, &headers, Some("00000002")).unwrap());

        // Renewal after the soft timeout, rejection after the hard one
        clock.fetch_add(250_000, Ordering::SeqCst);
        let next = manager.get_next_nonce(&nonce, &headers).unwrap().unwrap();
        assert!(validate_nonce(&manager, &next, &headers, Some("00000001")).unwrap());

        clock.fetch_add(60_000, Ordering::SeqCst);
        assert!(!validate_nonce(&manager, &nonce, &headers, Some("00000003")).unwrap());
        assert!(validate_nonce(&manager, &next, &headers, Some("00000002")).unwrap());
    }

    #[test]
    fn test_context_isolation() {
        let manager = SignedNonceManager::builder()
            .with_secret(TEST_SECRET)
            .with_sign_headers(["User-Agent", "Host"])
            .build()
            .unwrap();

        let nonce = manager
            .generate_nonce(&[("User-Agent", "client/1.0"), ("Host", "a.example")])
            .unwrap();
        assert!(manager.is_valid_nonce(&nonce, &[("Host", "a.example"), ("User-Agent", "client/1.0")]));
        assert!(!manager.is_valid_nonce(&nonce, &[("User-Agent", "client/1.0"), ("Host", "b.example")]));
        // Fields outside the sign headers do not matter
        assert!(manager.is_valid_nonce(
            &nonce,
            &[("User-Agent", "client/1.0"), ("Host", "a.example"), ("Accept", "*/*")]
        ));
    }
}
