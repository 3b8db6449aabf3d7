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

//! Computation of the message hashes.

use crate::{
    canonicalize,
    crypto::{self, HashAlgorithm},
    header::{FieldName, HeaderField, HeaderFields},
    signature::{CanonicalizationAlgorithm, DKIM_SIGNATURE_NAME},
};
use std::collections::HashMap;

/// Selects the header fields named in `signed_headers`.
///
/// Where a name occurs several times, instances are taken from the bottom of
/// the header up, so that the n-th occurrence of a name in `signed_headers`
/// selects the n-th instance counting from the last one. Names with no
/// (remaining) instance select nothing.
pub fn select_headers<'a>(
    headers: &'a HeaderFields,
    signed_headers: &[FieldName],
) -> Vec<&'a HeaderField> {
    let mut selected = vec![];

    // per name, the index below which the next instance is searched
    let mut limits: HashMap<&FieldName, usize> = HashMap::new();

    let headers = headers.as_ref();

    for name in signed_headers {
        let limit = limits.entry(name).or_insert(headers.len());

        let found = headers[..*limit]
            .iter()
            .enumerate()
            .rev()
            .find(|(_, (n, _))| n == name);

        if let Some((i, field)) = found {
            selected.push(field);
            *limit = i;
        } else {
            *limit = 0;
        }
    }

    selected
}

/// Computes the data hash over the selected header fields and the
/// *DKIM-Signature* header.
///
/// `dkim_sig_header_value` is the header value following the colon, without
/// its final CRLF and with the *b=* tag value empty.
pub fn compute_data_hash(
    hash_alg: HashAlgorithm,
    canon_alg: CanonicalizationAlgorithm,
    headers: &HeaderFields,
    signed_headers: &[FieldName],
    dkim_sig_header_name: &str,
    dkim_sig_header_value: &str,
) -> Box<[u8]> {
    debug_assert!(dkim_sig_header_name.eq_ignore_ascii_case(DKIM_SIGNATURE_NAME));

    let mut cheaders = String::new();

    // canonicalize selected headers
    for (name, value) in select_headers(headers, signed_headers) {
        let (name, value) = canonicalize::canonicalize_header(canon_alg, name.as_ref(), value);
        cheaders.push_str(&name);
        cheaders.push(':');
        cheaders.push_str(&value);
    }

    // canonicalize DKIM-Signature header, which is not followed by CRLF
    let (name, value) =
        canonicalize::canonicalize_header(canon_alg, dkim_sig_header_name, dkim_sig_header_value);
    let value = match canon_alg {
        CanonicalizationAlgorithm::Simple => &value[..],
        CanonicalizationAlgorithm::Relaxed => value.strip_suffix("\r\n").unwrap_or(&value),
    };
    cheaders.push_str(&name);
    cheaders.push(':');
    cheaders.push_str(value);

    // produce message digest of the canonicalized value
    crypto::digest(hash_alg, cheaders.as_bytes())
}

/// Computes the body hash of an already canonicalized body, limited to the
/// first `body_length` bytes if given.
///
/// A limit exceeding the body length hashes the entire body.
pub fn compute_body_hash(
    hash_alg: HashAlgorithm,
    canonicalized_body: &str,
    body_length: Option<usize>,
) -> Box<[u8]> {
    let body = canonicalized_body.as_bytes();
    let body = match body_length {
        Some(len) if len < body.len() => &body[..len],
        _ => body,
    };
    crypto::digest(hash_alg, body)
}
