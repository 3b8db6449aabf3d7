// minidkim – implementation of the DKIM specification
// Copyright © 2022–2023 David Bürgin <dbuergin@gluet.ch>
//
// This program is free software: you can redistribute it and/or modify it under
// the terms of the GNU General Public License as published by the Free Software
// Foundation, either version 3 of the License, or (at your option) any later
// version.
//
// This program is distributed in the hope that it will be useful, but WITHOUT
// ANY WARRANTY; without even the implied warranty of MERCHANTABILITY or FITNESS
// FOR A PARTICULAR PURPOSE. See the GNU General Public License for more
// details.
//
// You should have received a copy of the GNU General Public License along with
// this program. If not, see <https://www.gnu.org/licenses/>.

use crate::{
    header::FieldName,
    signature::{Canonicalization, SignatureAlgorithm, DKIM_SIGNATURE_NAME},
    util::{self, CanonicalStr},
};

// Note: Careful with offsets: folding works with *characters*, not bytes!

/// The line width at which the *DKIM-Signature* header is folded.
pub const LINE_WIDTH: usize = 72;

/// DKIM signature data that does not yet have a cryptographic signature.
pub struct UnsignedDkimSignature {
    pub algorithm: SignatureAlgorithm,
    pub body_hash: Box<[u8]>,
    pub canonicalization: Canonicalization,
    pub domain: String,
    pub signed_headers: Box<[FieldName]>,
    pub identity: String,
    pub body_length: Option<usize>,
    pub selector: String,
    pub timestamp: u64,
}

impl UnsignedDkimSignature {
    /// Returns the complete folded header line `DKIM-Signature: ...; b=`,
    /// without the *b=* tag value and without final CRLF.
    pub fn format_without_signature(&self) -> String {
        let mut tags = vec![
            ("v", "1".to_owned()),
            ("a", self.algorithm.canonical_str().to_owned()),
            ("c", self.canonicalization.to_string()),
            ("d", self.domain.clone()),
            ("i", self.identity.clone()),
        ];
        if let Some(len) = self.body_length {
            tags.push(("l", len.to_string()));
        }
        tags.extend([
            ("q", "dns/txt".to_owned()),
            ("s", self.selector.clone()),
            ("t", self.timestamp.to_string()),
            ("h", format_signed_headers(&self.signed_headers)),
            ("bh", util::encode_base64(&self.body_hash)),
            ("b", String::new()),
        ]);

        let tags = tags
            .into_iter()
            .map(|(name, value)| format!("{name}={value}"))
            .collect::<Vec<_>>()
            .join("; ");

        fold(&format!("{DKIM_SIGNATURE_NAME}: {tags}"), LINE_WIDTH)
    }
}

fn format_signed_headers(names: &[FieldName]) -> String {
    names.iter().map(|n| n.as_ref()).collect::<Vec<_>>().join(":")
}

fn char_offset(s: &str, n: usize) -> Option<usize> {
    s.char_indices().nth(n).map(|(i, _)| i)
}

/// Folds a header line so that no line exceeds `width` characters, where
/// possible.
///
/// Text up to and including the last existing `CRLF SP` fold point is kept as
/// is. Breaks replace a space with `CRLF SP`, at the last space within the
/// first `width` characters, or else at the first space after them. Text
/// without spaces is never broken.
pub fn fold(header: &str, width: usize) -> String {
    let (mut out, mut rest) = match header.rfind("\r\n ") {
        Some(i) => (header[..i + 3].to_owned(), &header[i + 3..]),
        None => (String::new(), header),
    };

    while let Some(limit) = char_offset(rest, width) {
        // rest is longer than width
        let i = match rest[..limit].rfind(' ') {
            Some(i) if i > 0 => i,
            _ => match rest[limit..].find(' ') {
                Some(j) => limit + j,
                None => break,
            },
        };

        out.push_str(&rest[..i]);
        out.push_str("\r\n ");
        rest = &rest[i + 1..];
    }

    out.push_str(rest);
    out
}

/// Appends Base64-encoded signature data to a folded header line ending in
/// `b=`, breaking it into continuation lines of at most `width` characters.
pub fn insert_signature_data(formatted_header: &mut String, signature_data: &[u8], width: usize) {
    let s = util::encode_base64(signature_data);

    let last_line = formatted_header
        .rsplit_once("\r\n")
        .map_or(&formatted_header[..], |(_, last)| last);
    let room = width.saturating_sub(last_line.chars().count());

    // Base64 is ASCII, byte offsets are character offsets
    let (first, mut rest) = s.split_at(room.min(s.len()));
    formatted_header.push_str(first);

    let chunk_len = width.saturating_sub(1).max(1);
    while !rest.is_empty() {
        let (chunk, r) = rest.split_at(chunk_len.min(rest.len()));
        formatted_header.push_str("\r\n ");
        formatted_header.push_str(chunk);
        rest = r;
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn fold_ok() {
        assert_eq!(fold("ab cd ef gh", 5), "ab\r\n cd\r\n ef gh");
        assert_eq!(fold("abcdefgh ij", 5), "abcdefgh\r\n ij");
        assert_eq!(fold("abcdefgh", 5), "abcdefgh");
        assert_eq!(fold("a b", 5), "a b");
    }

    #[test]
    fn fold_keeps_existing_fold_point() {
        assert_eq!(fold("abc def ghi\r\n jk lm no", 5), "abc def ghi\r\n jk\r\n lm no");
    }

    #[test]
    fn fold_leading_space() {
        // a space at the very start is not a usable break point
        assert_eq!(fold(" abcdef gh", 5), " abcdef\r\n gh");
    }

    #[test]
    fn fold_counts_characters() {
        assert_eq!(fold("äöü äöü", 4), "äöü\r\n äöü");
    }

    #[test]
    fn insert_signature_data_ok() {
        let mut header = String::from("X: a; b=");
        insert_signature_data(&mut header, b"abcdefghijkl", 12);

        // "YWJjZGVmZ2hpamts"
        assert_eq!(header, "X: a; b=YWJj\r\n ZGVmZ2hpamt\r\n s");
    }

    #[test]
    fn insert_signature_data_full_line() {
        let mut header = String::from("X: a;\r\n b=");
        insert_signature_data(&mut header, b"abc", 4);

        assert_eq!(header, "X: a;\r\n b=Y\r\n WJj");
    }

    #[test]
    fn format_without_signature_ok() {
        let sig = UnsignedDkimSignature {
            algorithm: SignatureAlgorithm::RsaSha256,
            body_hash: Box::from(*b"abc"),
            canonicalization: Default::default(),
            domain: "example.com".into(),
            signed_headers: [FieldName::new("From").unwrap(), FieldName::new("To").unwrap()].into(),
            identity: "@example.com".into(),
            body_length: Some(12),
            selector: "sel".into(),
            timestamp: 1,
        };

        assert_eq!(
            sig.format_without_signature(),
            "DKIM-Signature: v=1; a=rsa-sha256; c=simple/simple; d=example.com;\r\n \
            i=@example.com; l=12; q=dns/txt; s=sel; t=1; h=From:To; bh=YWJj; b="
        );
    }
}
