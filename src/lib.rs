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

//! A compact library implementing signing and verification of *DomainKeys
//! Identified Mail* (DKIM) signatures as described in [RFC 6376].
//!
//! The engine works on complete RFC 822 messages given as strings. Signing
//! produces a folded *DKIM-Signature* header line that the caller prepends to
//! the message; verification evaluates the first *DKIM-Signature* header of a
//! message against the public key record fetched through an injected DNS TXT
//! lookup.
//!
//! Only the RSA signature algorithms *rsa-sha256* and *rsa-sha1* are supported.
//! Key material is handled by a small built-in ASN.1 DER codec (module
//! [`asn1`]), with the big-integer arithmetic provided by the `rsa` crate.
//!
//! # Usage
//!
//! The functions [`sign`] and [`verify`] provide the entry points. The
//! remaining modules expose the building blocks (splitting, canonicalisation,
//! tag parsing, hashing, raw RSA) for low-level use.
//!
//! ```
//! use minidkim::{sign, verify, SignRequest};
//! # let private_key_pem = "";
//! # let public_key_record = String::new();
//! # if private_key_pem.is_empty() { return; }
//!
//! let message = "From: me@example.com\r\nSubject: hello\r\n\r\nHi!\r\n";
//!
//! let request = SignRequest::new("example.com", "sel");
//! let header = sign(message, &request, private_key_pem).unwrap();
//!
//! let signed = format!("{header}{message}");
//!
//! let lookup = |name: &str| {
//!     (name == "sel._domainkey.example.com.").then(|| public_key_record.clone())
//! };
//! assert!(verify(&signed, &lookup));
//! ```
//!
//! # Cargo features
//!
//! The feature **`hickory-resolver`** makes an implementation of
//! [`LookupTxt`][crate::verifier::LookupTxt] available for the synchronous
//! Hickory DNS resolver.
//!
//! [RFC 6376]: https://www.rfc-editor.org/rfc/rfc6376

pub mod asn1;
pub mod canonicalize;
pub mod crypto;
pub mod header;
pub mod message_hash;
pub mod record;
pub mod signature;
pub mod signer;
mod tag_list;
mod util;
pub mod verifier;

pub use crate::{
    crypto::{KeyFormatError, RsaPrivateKey, RsaPublicKey},
    header::{split_message, FieldName, HeaderField, HeaderFields, MessageFormatError},
    signature::{Canonicalization, CanonicalizationAlgorithm, DkimSignature, SignatureAlgorithm},
    signer::{sign, sign_with_key, ParameterError, SignRequest, SignerError},
    util::{decode_base64, encode_base64, Base64Error, CanonicalStr},
    verifier::{
        verify, verify_message, Config, LookupTxt, VerificationResult, VerificationStatus,
        VerifierError,
    },
};
