//! Request context fields that a nonce signature can be bound to.

use std::collections::{BTreeMap, HashMap};
use std::hash::BuildHasher;

/// Read access to named string fields of an incoming request.
///
/// The manager looks up a fixed list of field names (by default just the
/// user agent) and mixes their values into the nonce signature. Values are
/// treated as opaque bytes; a missing field reads as the empty string.
///
/// Implementations are provided for the common map types, so a header map
/// can be passed directly:
///
/// ```rust
/// use srp_nonce::NonceContext;
/// use std::collections::HashMap;
///
/// let mut headers = HashMap::new();
/// headers.insert("User-Agent".to_string(), "curl/8.0".to_string());
/// assert_eq!(headers.field("User-Agent"), Some("curl/8.0"));
/// assert_eq!(headers.field("Referer"), None);
/// ```
pub trait NonceContext {
    /// Returns the value of the named field, if present.
    fn field(&self, name: &str) -> Option<&str>;
}

impl<S: BuildHasher> NonceContext for HashMap<String, String, S> {
    fn field(&self, name: &str) -> Option<&str> {
        self.get(name).map(String::as_str)
    }
}

impl NonceContext for BTreeMap<String, String> {
    fn field(&self, name: &str) -> Option<&str> {
        self.get(name).map(String::as_str)
    }
}

impl NonceContext for Vec<(String, String)> {
    fn field(&self, name: &str) -> Option<&str> {
        self.iter()
            .find(|(key, _)| key == name)
            .map(|(_, value)| value.as_str())
    }
}

impl<const N: usize> NonceContext for [(&str, &str); N] {
    fn field(&self, name: &str) -> Option<&str> {
        self.iter()
            .find(|(key, _)| *key == name)
            .map(|(_, value)| *value)
    }
}

/// The empty context: every field is absent.
impl NonceContext for () {
    fn field(&self, _name: &str) -> Option<&str> {
        None
    }
}
