// utils.rs

use lazy_static::lazy_static;
use percent_encoding::percent_decode_str;
use sha1::{Digest, Sha1};
use std::collections::HashSet;
use std::str::Utf8Error;

pub const API_NONCE: &str = "api_nonce";
pub const API_TIMESTAMP: &str = "api_timestamp";
pub const API_KEY: &str = "api_key";
pub const API_FORMAT: &str = "api_format";
pub const API_KIT: &str = "api_kit";
pub const API_SIGNATURE: &str = "api_signature";

// Keys the signer always writes itself; a caller value for these is replaced
lazy_static! {
    pub static ref RESERVED_PARAMS: HashSet<&'static str> = {
        let mut set = HashSet::new();
        set.insert(API_NONCE);
        set.insert(API_TIMESTAMP);
        set.insert(API_KEY);
        set.insert(API_KIT);
        set.insert(API_SIGNATURE);
        set
    };
}

// Utility function to encode a string as per RFC3986.
// Only A-Z a-z 0-9 - _ . ~ survive; space becomes %20.
pub fn encode_rfc3986(input: &str) -> String {
    urlencoding::encode(input)
        .replace("%7E", "~")
        .replace('+', " ")
}

// Utility function to decode URL component, the inverse of encode_rfc3986
pub fn decode_url_component(input: &str) -> Result<String, Utf8Error> {
    percent_decode_str(input)
        .decode_utf8()
        .map(|s| s.to_string())
}

// Utility function to convert a buffer to a hexadecimal string
pub fn buf2hex(buffer: &[u8]) -> String {
    buffer.iter().map(|byte| format!("{:02x}", byte)).collect()
}

// SHA-1 hashing function
pub fn sha1_hash(data: &[u8]) -> Vec<u8> {
    let mut hasher = Sha1::new();
    hasher.update(data);
    hasher.finalize().to_vec()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_encode_rfc3986_reserved_characters() {
        assert_eq!(encode_rfc3986("a/b?c&d=e"), "a%2Fb%3Fc%26d%3De");
        assert_eq!(encode_rfc3986("bar baz"), "bar%20baz");
        assert_eq!(encode_rfc3986("~user"), "~user");
        assert_eq!(encode_rfc3986("1+1"), "1%2B1");
        assert_eq!(encode_rfc3986("safe-_.AZaz09"), "safe-_.AZaz09");
    }

    #[test]
    fn test_encode_rfc3986_utf8() {
        assert_eq!(encode_rfc3986("café"), "caf%C3%A9");
    }

    #[test]
    fn test_decode_reverses_encode() {
        let original = "path/to?x=1&y=two words~ok";
        let encoded = encode_rfc3986(original);
        assert_eq!(decode_url_component(&encoded).unwrap(), original);
    }

    #[test]
    fn test_sha1_known_digest() {
        // FIPS 180 "abc" vector
        assert_eq!(
            buf2hex(&sha1_hash(b"abc")),
            "a9993e364706816aba3e25717850c26c9cd0d89d"
        );
    }

    #[test]
    fn test_reserved_params_excludes_format() {
        assert!(RESERVED_PARAMS.contains(API_NONCE));
        assert!(RESERVED_PARAMS.contains(API_SIGNATURE));
        assert!(!RESERVED_PARAMS.contains(API_FORMAT));
    }
}
