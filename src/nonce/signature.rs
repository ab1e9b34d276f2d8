//! Keyed hashing for nonce signatures and pseudo-random derivation.
//!
//! Everything here is HMAC over a selectable hash function. The selector is
//! resolved once, when the manager is built, so that an unknown algorithm
//! name fails at construction rather than on the first request.
//!
//! Two keys are derived from the master secret with HKDF-Extract, using the
//! fixed salts `SIGN` and `GENERATE`. The signing key authenticates nonces;
//! the generation key feeds HKDF-Expand for [`get_prandom_bytes`]. Keeping
//! them apart means output from one purpose can never be replayed as the
//! other.
//!
//! [`get_prandom_bytes`]: crate::NonceManager::get_prandom_bytes

use crate::NonceError;
use hkdf::Hkdf;
use hmac::{Hmac, Mac};
use serde::{Deserialize, Serialize};
use sha1::Sha1;
use sha2::{Sha256, Sha512};
use std::fmt;
use std::str::FromStr;

/// HKDF-Extract salt for the nonce signing key.
pub(crate) const SIGN_LABEL: &[u8] = b"SIGN";

/// HKDF-Extract salt for the pseudo-random generation key.
pub(crate) const GENERATE_LABEL: &[u8] = b"GENERATE";

/// RFC 5869 limits HKDF-Expand to 255 output blocks.
const MAX_EXPAND_BLOCKS: usize = 255;

/// Hash functions available for the keyed-hash operations.
///
/// The default is SHA-1, a 160-bit hash. HMAC-SHA1 remains sound as a MAC
/// and keeps nonces short on the wire.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum HashAlgorithm {
    /// HMAC-SHA1, 20-byte output.
    #[default]
    Sha1,
    /// HMAC-SHA256, 32-byte output.
    Sha256,
    /// HMAC-SHA512, 64-byte output.
    Sha512,
}

impl HashAlgorithm {
    /// Returns the canonical lowercase name of this algorithm.
    pub fn name(&self) -> &'static str {
        match self {
            Self::Sha1 => "sha1",
            Self::Sha256 => "sha256",
            Self::Sha512 => "sha512",
        }
    }

    /// Size of one hash output block in bytes.
    pub fn output_size(&self) -> usize {
        match self {
            Self::Sha1 => 20,
            Self::Sha256 => 32,
            Self::Sha512 => 64,
        }
    }

    /// Largest number of bytes HKDF-Expand can produce with this hash.
    pub fn max_expand_len(&self) -> usize {
        MAX_EXPAND_BLOCKS * self.output_size()
    }
}

impl fmt::Display for HashAlgorithm {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

impl FromStr for HashAlgorithm {
    type Err = NonceError;

    /// Parses names like `sha1`, `SHA-256` or `sha512`.
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let normalized: String = s
            .chars()
            .filter(|c| *c != '-' && *c != '_')
            .collect::<String>()
            .to_ascii_lowercase();
        match normalized.as_str() {
            "sha1" => Ok(Self::Sha1),
            "sha256" => Ok(Self::Sha256),
            "sha512" => Ok(Self::Sha512),
            _ => Err(NonceError::UnsupportedHashAlgorithm(s.to_string())),
        }
    }
}

/// A trait for MAC-like operations that can be fed incrementally.
pub trait MacLike {
    /// Update the MAC with the given data.
    fn update(&mut self, data: &[u8]);
}

/// An HMAC instance for one of the supported hash functions.
pub(crate) enum KeyedHash {
    Sha1(Hmac<Sha1>),
    Sha256(Hmac<Sha256>),
    Sha512(Hmac<Sha512>),
}

impl KeyedHash {
    pub(crate) fn new(algorithm: HashAlgorithm, key: &[u8]) -> Result<Self, NonceError> {
        let invalid = |e: hmac::digest::InvalidLength| {
            NonceError::CryptoError(format!("Invalid HMAC key: {e}"))
        };
        Ok(match algorithm {
            HashAlgorithm::Sha1 => Self::Sha1(Hmac::new_from_slice(key).map_err(invalid)?),
            HashAlgorithm::Sha256 => Self::Sha256(Hmac::new_from_slice(key).map_err(invalid)?),
            HashAlgorithm::Sha512 => Self::Sha512(Hmac::new_from_slice(key).map_err(invalid)?),
        })
    }

    pub(crate) fn finalize(self) -> Vec<u8> {
        match self {
            Self::Sha1(mac) => mac.finalize().into_bytes().to_vec(),
            Self::Sha256(mac) => mac.finalize().into_bytes().to_vec(),
            Self::Sha512(mac) => mac.finalize().into_bytes().to_vec(),
        }
    }

    /// Constant-time check of `tag` against the accumulated MAC.
    ///
    /// A tag of the wrong length is rejected without comparing any bytes.
    pub(crate) fn verify(self, tag: &[u8]) -> bool {
        match self {
            Self::Sha1(mac) => mac.verify_slice(tag).is_ok(),
            Self::Sha256(mac) => mac.verify_slice(tag).is_ok(),
            Self::Sha512(mac) => mac.verify_slice(tag).is_ok(),
        }
    }
}

impl MacLike for KeyedHash {
    fn update(&mut self, data: &[u8]) {
        match self {
            Self::Sha1(mac) => mac.update(data),
            Self::Sha256(mac) => mac.update(data),
            Self::Sha512(mac) => mac.update(data),
        }
    }
}

/// HKDF state keyed with an already-extracted pseudo-random key.
#[derive(Clone)]
pub(crate) enum Expander {
    Sha1(Hkdf<Sha1>),
    Sha256(Hkdf<Sha256>),
    Sha512(Hkdf<Sha512>),
}

impl Expander {
    fn algorithm(&self) -> HashAlgorithm {
        match self {
            Self::Sha1(_) => HashAlgorithm::Sha1,
            Self::Sha256(_) => HashAlgorithm::Sha256,
            Self::Sha512(_) => HashAlgorithm::Sha512,
        }
    }

    /// HKDF-Expand: `T(i) = HMAC(prk, T(i-1) || info || i)`, truncated to `size`.
    pub(crate) fn expand(&self, info: &[u8], size: usize) -> Result<Vec<u8>, NonceError> {
        let max = self.algorithm().max_expand_len();
        if size > max {
            return Err(NonceError::OutputTooLong {
                requested: size,
                max,
            });
        }

        let mut okm = vec![0u8; size];
        let result = match self {
            Self::Sha1(hk) => hk.expand(info, &mut okm),
            Self::Sha256(hk) => hk.expand(info, &mut okm),
            Self::Sha512(hk) => hk.expand(info, &mut okm),
        };
        result.map_err(|_| NonceError::OutputTooLong {
            requested: size,
            max,
        })?;
        Ok(okm)
    }
}

/// Key material derived from the master secret.
///
/// Owned by a single manager; never stored in global state.
#[derive(Clone)]
pub(crate) struct DerivedKeys {
    pub(crate) algorithm: HashAlgorithm,
    pub(crate) signing_key: Vec<u8>,
    pub(crate) generator: Expander,
}

impl DerivedKeys {
    /// Runs HKDF-Extract twice over `secret` with the `SIGN` and `GENERATE` salts.
    pub(crate) fn derive(algorithm: HashAlgorithm, secret: &[u8]) -> Self {
        let (signing_key, _) = extract(algorithm, SIGN_LABEL, secret);
        let (_, generator) = extract(algorithm, GENERATE_LABEL, secret);
        Self {
            algorithm,
            signing_key,
            generator,
        }
    }

    /// Starts a MAC under the signing key.
    pub(crate) fn signer(&self) -> Result<KeyedHash, NonceError> {
        KeyedHash::new(self.algorithm, &self.signing_key)
    }
}

/// HKDF-Extract, returning both the raw PRK and an expander keyed with it.
pub(crate) fn extract(algorithm: HashAlgorithm, salt: &[u8], ikm: &[u8]) -> (Vec<u8>, Expander) {
    match algorithm {
        HashAlgorithm::Sha1 => {
            let (prk, hk) = Hkdf::<Sha1>::extract(Some(salt), ikm);
            (prk.to_vec(), Expander::Sha1(hk))
        }
        HashAlgorithm::Sha256 => {
            let (prk, hk) = Hkdf::<Sha256>::extract(Some(salt), ikm);
            (prk.to_vec(), Expander::Sha256(hk))
        }
        HashAlgorithm::Sha512 => {
            let (prk, hk) = Hkdf::<Sha512>::extract(Some(salt), ikm);
            (prk.to_vec(), Expander::Sha512(hk))
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_hash_algorithm_parsing() {
        assert_eq!("sha1".parse::<HashAlgorithm>().unwrap(), HashAlgorithm::Sha1);
        assert_eq!("SHA-256".parse::<HashAlgorithm>().unwrap(), HashAlgorithm::Sha256);
        assert_eq!("sha_512".parse::<HashAlgorithm>().unwrap(), HashAlgorithm::Sha512);

        let result = "md5".parse::<HashAlgorithm>();
        assert!(matches!(result, Err(NonceError::UnsupportedHashAlgorithm(name)) if name == "md5"));
    }

    #[test]
    fn test_hash_algorithm_sizes() {
        assert_eq!(HashAlgorithm::default(), HashAlgorithm::Sha1);
        assert_eq!(HashAlgorithm::Sha1.output_size(), 20);
        assert_eq!(HashAlgorithm::Sha1.max_expand_len(), 5100);
        assert_eq!(HashAlgorithm::Sha512.max_expand_len(), 255 * 64);
        assert_eq!(HashAlgorithm::Sha256.to_string(), "sha256");
    }

    #[test]
    fn test_hmac_sha1_known_answer() {
        // RFC 2202, test case 1
        let mut mac = KeyedHash::new(HashAlgorithm::Sha1, &[0x0b; 20]).unwrap();
        mac.update(b"Hi There");
        assert_eq!(
            hex::encode(mac.finalize()),
            "b617318655057264e28bc0b6fb378c8ef146be00"
        );
    }

    #[test]
    fn test_keyed_hash_verify() {
        let mut mac = KeyedHash::new(HashAlgorithm::Sha256, b"key").unwrap();
        mac.update(b"payload");
        let tag = mac.finalize();

        let mut mac = KeyedHash::new(HashAlgorithm::Sha256, b"key").unwrap();
        mac.update(b"payload");
        assert!(mac.verify(&tag));

        let mut mac = KeyedHash::new(HashAlgorithm::Sha256, b"key").unwrap();
        mac.update(b"payload");
        assert!(!mac.verify(&tag[..16]));

        let mut mac = KeyedHash::new(HashAlgorithm::Sha256, b"other key").unwrap();
        mac.update(b"payload");
        assert!(!mac.verify(&tag));
    }

    #[test]
    fn test_hkdf_known_answer() {
        // RFC 5869, test case 1
        let ikm = [0x0b; 22];
        let salt: Vec<u8> = (0x00..=0x0c).collect();
        let info: Vec<u8> = (0xf0..=0xf9).collect();

        let (prk, expander) = extract(HashAlgorithm::Sha256, &salt, &ikm);
        assert_eq!(
            hex::encode(prk),
            "077709362c2e32df0ddc3f0dc47bba6390b6c73bb50f9c3122ec844ad7c2b3e5"
        );
        assert_eq!(
            hex::encode(expander.expand(&info, 42).unwrap()),
            "3cb25f25faacd57a90434f64d0362f2a2d2d0a90cf1a5a4c5db02d56ecc4c5bf34007208d5b887185865"
        );
    }

    #[test]
    fn test_expand_limits() {
        let (_, expander) = extract(HashAlgorithm::Sha1, GENERATE_LABEL, b"secret");
        assert!(expander.expand(b"info", 0).unwrap().is_empty());
        assert_eq!(expander.expand(b"info", 5100).unwrap().len(), 5100);

        let result = expander.expand(b"info", 5101);
        assert!(matches!(
            result,
            Err(NonceError::OutputTooLong {
                requested: 5101,
                max: 5100
            })
        ));
    }

    #[test]
    fn test_derived_keys_are_independent() {
        let keys = DerivedKeys::derive(HashAlgorithm::Sha1, b"master");
        let (generation_key, _) = extract(HashAlgorithm::Sha1, GENERATE_LABEL, b"master");

        assert_eq!(keys.signing_key.len(), 20);
        assert_ne!(keys.signing_key, generation_key);
        assert_ne!(keys.signing_key, b"master".to_vec());

        // Extract with salt "SIGN" is HMAC keyed by the label over the secret
        let mut mac = KeyedHash::new(HashAlgorithm::Sha1, SIGN_LABEL).unwrap();
        mac.update(b"master");
        assert_eq!(keys.signing_key, mac.finalize());
    }
}
