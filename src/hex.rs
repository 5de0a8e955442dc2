//! Fixed-width conversion between raw bytes and lowercase hex strings.
//!
//! Thin wrapper over the `hex` crate: the crate already guarantees the
//! round-trip, this module's job is to turn a malformed string into our own
//! `BadHex` error instead of the crate's.

use crate::error::{GitError, Result};

/// Lowercase hex of `bytes`, length `2 * bytes.len()`.
pub fn encode(bytes: &[u8]) -> String {
    hex::encode(bytes)
}

/// Decode a hex string. Fails with `BadHex` on odd length or non-hex digits.
pub fn decode(s: &str) -> Result<Vec<u8>> {
    hex::decode(s).map_err(|e| GitError::BadHex(format!("{s}: {e}")))
}

/// Decode exactly `N` bytes' worth of hex (a `2*N`-character string).
pub fn decode_fixed<const N: usize>(s: &str) -> Result<[u8; N]> {
    let bytes = decode(s)?;
    bytes
        .try_into()
        .map_err(|v: Vec<u8>| GitError::BadHex(format!("expected {N} bytes, got {}", v.len())))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn round_trip_encode_decode() {
        let raw = b"\x00\x01\xfe\xff hello";
        let s = encode(raw);
        assert_eq!(decode(&s).unwrap(), raw);
    }

    #[test]
    fn decode_is_case_insensitive_but_encode_is_lowercase() {
        let upper = "CE013625030BA8DBA906F756967F9E9CA394464A";
        let lower = "ce013625030ba8dba906f756967f9e9ca394464a";
        assert_eq!(decode(upper).unwrap(), decode(lower).unwrap());
        assert_eq!(encode(&decode(upper).unwrap()), lower);
    }

    #[test]
    fn odd_length_is_bad_hex() {
        assert!(decode("abc").is_err());
    }

    #[test]
    fn non_hex_digit_is_bad_hex() {
        assert!(decode("zz").is_err());
    }

    #[test]
    fn decode_fixed_enforces_width() {
        let s = "00".repeat(20);
        let arr: [u8; 20] = decode_fixed(&s).unwrap();
        assert_eq!(arr, [0u8; 20]);
        assert!(decode_fixed::<20>("00").is_err());
    }
}
