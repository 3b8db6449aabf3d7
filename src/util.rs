use base64ct::{Base64, Encoding};
use std::{
    error::Error,
    fmt::{self, Display, Formatter},
};

/// A trait for entities that can be represented as a canonical string.
pub trait CanonicalStr {
    /// Returns the canonical representation as a static string slice.
    fn canonical_str(&self) -> &'static str;
}

/// Encodes binary data as a Base64 string.
pub fn encode_base64<T: AsRef<[u8]>>(input: T) -> String {
    Base64::encode_string(input.as_ref())
}

/// An error that occurs when decoding a Base64 string.
#[derive(Clone, Copy, Debug, Default, Eq, Hash, PartialEq)]
pub struct Base64Error;

impl Display for Base64Error {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        write!(f, "failed to decode Base64 data")
    }
}

impl Error for Base64Error {}

/// Decodes a Base64 string, ignoring any embedded whitespace.
pub fn decode_base64(input: &str) -> Result<Vec<u8>, Base64Error> {
    let s: String = input.chars().filter(|c| !c.is_ascii_whitespace()).collect();
    Base64::decode_vec(&s).map_err(|_| Base64Error)
}

/// Whether the string contains only characters of the Base64 alphabet and
/// whitespace.
pub fn is_base64_charset(s: &str) -> bool {
    s.chars()
        .all(|c| c.is_ascii_alphanumeric() || matches!(c, '+' | '/' | '=') || c.is_ascii_whitespace())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn decode_base64_folded() {
        assert_eq!(decode_base64("YW\r\n Jj\tZA=="), Ok(b"abcd".to_vec()));
        assert_eq!(decode_base64("YWJj*"), Err(Base64Error));
    }

    #[test]
    fn base64_charset() {
        assert!(is_base64_charset("ab+/\r\n =="));
        assert!(!is_base64_charset("ab;c"));
        assert!(!is_base64_charset("a-b"));
    }
}
