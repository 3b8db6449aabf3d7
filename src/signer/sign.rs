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
    canonicalize,
    crypto::{self, RsaPrivateKey, SigningError},
    header::{FieldName, HeaderFields},
    message_hash,
    signature::DKIM_SIGNATURE_NAME,
    signer::{
        format::{self, UnsignedDkimSignature, LINE_WIDTH},
        BodyLength, ParameterError, SignRequest, SignerError,
    },
};
use tracing::trace;

/// Produces the complete *DKIM-Signature* header line, terminated with CRLF,
/// for a message already split into header and body.
pub fn perform_signing(
    request: &SignRequest,
    headers: &HeaderFields,
    body: &str,
    private_key: &RsaPrivateKey,
) -> Result<String, SignerError> {
    let algorithm = request.algorithm;
    let canonicalization = request.canonicalization;
    let hash_alg = algorithm.hash_algorithm();

    // select headers

    let signed_headers = select_signed_headers(request, headers);
    if signed_headers.is_empty() {
        return Err(ParameterError::NoSignedHeaders.into());
    }

    trace!(?signed_headers, "selected headers for signing");

    // calculate body hash

    let cbody = canonicalize::canonicalize_body(canonicalization.body, body);
    let body_hash = message_hash::compute_body_hash(hash_alg, &cbody, None);

    let body_length = match request.body_length {
        BodyLength::All => None,
        BodyLength::OnlyMessageLength => Some(cbody.len()),
    };

    // prepare complete formatted signature header with body hash except with contents of b= tag

    let sig = UnsignedDkimSignature {
        algorithm,
        body_hash,
        canonicalization,
        domain: request.domain.clone(),
        signed_headers: signed_headers.into(),
        identity: request
            .identity
            .clone()
            .unwrap_or_else(|| format!("@{}", request.domain)),
        body_length,
        selector: request.selector.clone(),
        timestamp: request.timestamp.to_unix_secs(),
    };

    let mut formatted_header = sig.format_without_signature();

    let header_value = formatted_header
        .strip_prefix(DKIM_SIGNATURE_NAME)
        .and_then(|s| s.strip_prefix(':'))
        .ok_or(SignerError::Internal("formatted header does not start with header name"))?;

    let data_hash = message_hash::compute_data_hash(
        hash_alg,
        canonicalization.header,
        headers,
        &sig.signed_headers,
        DKIM_SIGNATURE_NAME,
        header_value,
    );

    let signature_data = match crypto::sign_rsa(hash_alg, private_key, &data_hash) {
        Ok(s) => {
            trace!("RSA signing successful");
            s
        }
        Err(e) => {
            trace!("RSA signing failed: {e}");
            return Err(match e {
                SigningError::DigestTooLarge => ParameterError::DigestTooLarge.into(),
                SigningError::InvalidSignatureLength => {
                    SignerError::Internal("signature not of modulus length")
                }
            });
        }
    };

    // insert signature into formatted dkim-sig header

    format::insert_signature_data(&mut formatted_header, &signature_data, LINE_WIDTH);
    formatted_header.push_str("\r\n");

    trace!(domain = %request.domain, selector = %request.selector, "created DKIM signature");

    Ok(formatted_header)
}

// h= names are taken from the canonicalized header, in message order
fn select_signed_headers(request: &SignRequest, headers: &HeaderFields) -> Vec<FieldName> {
    let cheaders = canonicalize::canonicalize_headers(request.canonicalization.header, headers);
    cheaders
        .as_ref()
        .iter()
        .map(|(name, _)| name)
        .filter(|name| request.header_selection.includes(name))
        .cloned()
        .collect()
}
