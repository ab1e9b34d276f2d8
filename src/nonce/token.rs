//! Wire shape of a signed nonce: `hex-timestamp:hex-salt:base64-signature`.
//!
//! The timestamp is tenths of a second since the epoch in lowercase hex with
//! no prefix or padding. Callers outside this crate treat the whole token as
//! an opaque string.

/// Delimiter between the token's fields.
pub(crate) const DELIMITER: char = ':';

/// Number of random salt bytes mixed into each nonce.
pub(crate) const SALT_LEN: usize = 3;

/// Longest hex timestamp that still fits in a `u64`.
const MAX_TIMESTAMP_DIGITS: usize = 16;

/// Borrowed view over the fields of a nonce token.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) struct NonceToken<'a> {
    issued_tenths: u64,
    payload: &'a str,
    signature: &'a str,
}

impl<'a> NonceToken<'a> {
    /// Splits a token into its signed payload and signature.
    ///
    /// Returns `None` for anything that does not carry a hex timestamp
    /// followed by at least one delimiter.
    pub(crate) fn parse(raw: &'a str) -> Option<Self> {
        let issued_tenths = issued_tenths(raw)?;
        let (payload, signature) = raw.rsplit_once(DELIMITER)?;
        Some(Self {
            issued_tenths,
            payload,
            signature,
        })
    }

    pub(crate) fn issued_tenths(&self) -> u64 {
        self.issued_tenths
    }

    /// Everything before the last delimiter: `timestamp:salt`.
    pub(crate) fn payload(&self) -> &'a str {
        self.payload
    }

    pub(crate) fn signature(&self) -> &'a str {
        self.signature
    }
}

/// Decodes only the leading timestamp field.
pub(crate) fn issued_tenths(raw: &str) -> Option<u64> {
    let (timestamp, _) = raw.split_once(DELIMITER)?;
    if timestamp.is_empty()
        || timestamp.len() > MAX_TIMESTAMP_DIGITS
        || !timestamp.bytes().all(|b| b.is_ascii_hexdigit())
    {
        return None;
    }
    u64::from_str_radix(timestamp, 16).ok()
}

/// Builds the signed part of a token from a timestamp and salt.
pub(crate) fn format_payload(issued_tenths: u64, salt: &[u8]) -> String {
    format!("{:x}{}{}", issued_tenths, DELIMITER, hex::encode(salt))
}

/// Appends the encoded signature to a payload.
pub(crate) fn assemble(payload: &str, signature: &str) -> String {
    let mut token = String::with_capacity(payload.len() + signature.len() + 1);
    token.push_str(payload);
    token.push(DELIMITER);
    token.push_str(signature);
    token
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_format_payload() {
        assert_eq!(format_payload(0x31220ead8, &[0xab, 0x01, 0xff]), "31220ead8:ab01ff");
        assert_eq!(format_payload(0, &[0, 0, 0]), "0:000000");
    }

    #[test]
    fn test_parse_round_trip() {
        let token = assemble(&format_payload(0x1f, &[1, 2, 3]), "c2lnbmF0dXJl");
        assert_eq!(token, "1f:010203:c2lnbmF0dXJl");

        let parsed = NonceToken::parse(&token).unwrap();
        assert_eq!(parsed.issued_tenths(), 0x1f);
        assert_eq!(parsed.payload(), "1f:010203");
        assert_eq!(parsed.signature(), "c2lnbmF0dXJl");
    }

    #[test]
    fn test_parse_rejects_malformed() {
        assert!(NonceToken::parse("").is_none());
        assert!(NonceToken::parse("IHACKYOU").is_none());
        assert!(NonceToken::parse(":abc:sig").is_none());
        assert!(NonceToken::parse("xyz:abc:sig").is_none());
        assert!(NonceToken::parse("+1f:abc:sig").is_none());
        assert!(NonceToken::parse("11111111111111111:abc:sig").is_none());
    }

    #[test]
    fn test_signature_is_last_field() {
        // Extra delimiters end up in the payload and fail signature checks later
        let parsed = NonceToken::parse("a:b:c:d").unwrap();
        assert_eq!(parsed.payload(), "a:b:c");
        assert_eq!(parsed.signature(), "d");
    }
}
