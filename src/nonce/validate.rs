//! Nonce-count replay policy on top of any [`NonceManager`].

use crate::nonce::context::NonceContext;
use crate::nonce::error::NonceError;
use crate::nonce::manager::NonceManager;

/// Digest-style nonce-counts are at most eight hex digits.
const MAX_NONCE_COUNT_DIGITS: usize = 8;

/// Checks a nonce and its client nonce-count, recording the count on success.
///
/// The request is accepted when:
///
/// 1. `nonce` is valid for `context`;
/// 2. `nc`, if given, is one to eight hex digits;
/// 3. once a count has been recorded for this nonce, every later request
///    carries an `nc` strictly greater than it.
///
/// The first request for a nonce may omit `nc`. When an accepted request
/// carries one it becomes the recorded count.
///
/// Check-then-set is not atomic: two requests racing with the same count can
/// both pass. That only weakens replay detection for that one pair.
///
/// # Example
///
/// ```rust
/// use srp_nonce::{NonceManager, SignedNonceManager, validate_nonce};
///
/// # fn example() -> Result<(), srp_nonce::NonceError> {
/// let manager = SignedNonceManager::new()?;
/// let request = [("User-Agent", "demo/1.0")];
/// let nonce = manager.generate_nonce(&request)?;
///
/// assert!(validate_nonce(&manager, &nonce, &request, Some("00000001"))?);
/// assert!(validate_nonce(&manager, &nonce, &request, Some("00000002"))?);
/// // Replayed count
/// assert!(!validate_nonce(&manager, &nonce, &request, Some("00000002"))?);
/// # Ok(())
/// # }
/// ```
pub fn validate_nonce<M>(
    manager: &M,
    nonce: &str,
    context: &dyn NonceContext,
    nc: Option<&str>,
) -> Result<bool, NonceError>
where
    M: NonceManager + ?Sized,
{
    if !manager.is_valid_nonce(nonce, context) {
        return Ok(false);
    }

    let count = match nc {
        Some(raw) => match parse_nonce_count(raw) {
            Some(count) => Some(count),
            None => {
                tracing::trace!("rejected nonce-count: malformed");
                return Ok(false);
            }
        },
        None => None,
    };

    if let Some(previous) = manager.get_nonce_count(nonce) {
        match count {
            Some(count) if count > previous => {}
            _ => {
                tracing::trace!(previous, "rejected nonce-count: not increasing");
                return Ok(false);
            }
        }
    }

    if let Some(count) = count {
        manager.set_nonce_count(nonce, count)?;
    }
    Ok(true)
}

fn parse_nonce_count(raw: &str) -> Option<u64> {
    if raw.is_empty()
        || raw.len() > MAX_NONCE_COUNT_DIGITS
        || !raw.bytes().all(|b| b.is_ascii_hexdigit())
    {
        return None;
    }
    u64::from_str_radix(raw, 16).ok()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::SignedNonceManager;

    fn manager() -> SignedNonceManager {
        SignedNonceManager::builder()
            .with_secret(b"validate-test-secret")
            .build()
            .unwrap()
    }

    #[test]
    fn test_parse_nonce_count() {
        assert_eq!(parse_nonce_count("00000001"), Some(1));
        assert_eq!(parse_nonce_count("ffffffff"), Some(0xffff_ffff));
        assert_eq!(parse_nonce_count("A"), Some(10));
        assert_eq!(parse_nonce_count(""), None);
        assert_eq!(parse_nonce_count("000000001"), None);
        assert_eq!(parse_nonce_count("+1"), None);
        assert_eq!(parse_nonce_count("xyz"), None);
    }

    #[test]
    fn test_counts_must_increase() {
        let manager = manager();
        let context = [("User-Agent", "agent")];
        let nonce = manager.generate_nonce(&context).unwrap();

        assert!(validate_nonce(&manager, &nonce, &context, Some("1")).unwrap());
        assert_eq!(manager.get_nonce_count(&nonce), Some(1));

        assert!(!validate_nonce(&manager, &nonce, &context, Some("1")).unwrap());
        assert!(!validate_nonce(&manager, &nonce, &context, None).unwrap());

        // Gaps are fine
        assert!(validate_nonce(&manager, &nonce, &context, Some("5")).unwrap());
        assert!(!validate_nonce(&manager, &nonce, &context, Some("3")).unwrap());
        assert_eq!(manager.get_nonce_count(&nonce), Some(5));
    }

    #[test]
    fn test_first_request_may_omit_count() {
        let manager = manager();
        let context = [("User-Agent", "agent")];
        let nonce = manager.generate_nonce(&context).unwrap();

        assert!(validate_nonce(&manager, &nonce, &context, None).unwrap());
        assert!(validate_nonce(&manager, &nonce, &context, None).unwrap());
        assert_eq!(manager.get_nonce_count(&nonce), None);
    }

    #[test]
    fn test_rejections_do_not_record() {
        let manager = manager();
        let context = [("User-Agent", "agent")];
        let nonce = manager.generate_nonce(&context).unwrap();

        assert!(!validate_nonce(&manager, &nonce, &context, Some("zz")).unwrap());
        assert!(!validate_nonce(&manager, &nonce, &[("User-Agent", "other")], Some("1")).unwrap());
        assert!(!validate_nonce(&manager, "IHACKYOU", &context, Some("1")).unwrap());
        assert_eq!(manager.get_nonce_count(&nonce), None);
        assert_eq!(manager.stats().tracked_nonces, 0);
    }

    #[test]
    fn test_works_through_trait_object() {
        let manager: Box<dyn NonceManager> = Box::new(manager());
        let nonce = manager.generate_nonce(&()).unwrap();
        assert!(validate_nonce(&*manager, &nonce, &(), Some("00000001")).unwrap());
        assert!(!validate_nonce(&*manager, &nonce, &(), Some("00000001")).unwrap());
    }
}
