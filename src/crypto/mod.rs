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

//! Cryptographic utilities.
//!
//! # RSA public keys in DNS
//!
//! In RFC 6376 a mistake was made in the description of the public key
//! creation. Section 3.6.1 states that the p= tag contains an RSA public key in
//! format RSAPublicKey (RFC 3447). However, the example in appendix C shows how
//! to install an RSA public key in format SubjectPublicKeyInfo (RFC 5280) in
//! the DNS.
//!
//! It is the second, slightly larger, format that implementers have taken as
//! authoritative and that has become widespread. Therefore, this library first
//! tries reading the public key in DNS in the SubjectPublicKeyInfo format. If
//! this fails it falls back to reading the public key in the RSAPublicKey
//! format.
//!
//! # Signatures
//!
//! Signing and verification use PKCS #1 v1.5 padding of an ASN.1 `DigestInfo`
//! structure, computed directly with modular exponentiation. Verification
//! recomputes the expected padded block and compares it byte for byte with
//! the block recovered from the signature.

mod hash;
mod rsa;

pub use self::{
    hash::{digest, digest_slices},
    rsa::{sign_rsa, verify_rsa, RsaPrivateKey, RsaPublicKey},
};

use crate::{
    asn1::{self, Node, Tag},
    util::CanonicalStr,
};
use ::digest::const_oid::AssociatedOid;
use sha1::Sha1;
use sha2::Sha256;
use std::{
    error::Error,
    fmt::{self, Display, Formatter},
};

#[derive(Clone, Copy, Debug, Eq, Hash, PartialEq)]
pub enum KeyType {
    Rsa,
}

impl CanonicalStr for KeyType {
    fn canonical_str(&self) -> &'static str {
        match self {
            Self::Rsa => "rsa",
        }
    }
}

#[derive(Clone, Copy, Debug, Eq, Hash, PartialEq)]
pub enum HashAlgorithm {
    Sha1,
    Sha256,
}

impl CanonicalStr for HashAlgorithm {
    fn canonical_str(&self) -> &'static str {
        match self {
            Self::Sha1 => "sha1",
            Self::Sha256 => "sha256",
        }
    }
}

impl HashAlgorithm {
    pub fn all() -> Vec<Self> {
        vec![Self::Sha1, Self::Sha256]
    }

    /// Returns the encoded object identifier of the hash algorithm.
    pub fn oid(self) -> Vec<u8> {
        match self {
            Self::Sha1 => Sha1::OID.as_bytes().to_vec(),
            Self::Sha256 => Sha256::OID.as_bytes().to_vec(),
        }
    }
}

/// Encodes a message digest in the ASN.1 `DigestInfo` structure.
pub fn digest_info(hash_alg: HashAlgorithm, digest: &[u8]) -> Vec<u8> {
    let node = Node::Sequence(vec![
        Node::Sequence(vec![Node::ObjectIdentifier(hash_alg.oid()), Node::Null]),
        Node::OctetString(digest.to_vec()),
    ]);
    asn1::build(&node)
}

/// Produces the PKCS #1 v1.5 signature block `00 01 FF .. FF 00 || data` of
/// the given length.
pub fn pkcs1v15_pad(data: &[u8], len: usize) -> Result<Vec<u8>, SigningError> {
    let padding_len = len
        .checked_sub(data.len() + 3)
        .ok_or(SigningError::DigestTooLarge)?;

    let mut block = Vec::with_capacity(len);
    block.extend([0x00, 0x01]);
    block.resize(padding_len + 2, 0xff);
    block.push(0x00);
    block.extend(data);
    Ok(block)
}

/// An error that occurs when reading key material.
#[derive(Clone, Copy, Debug, Eq, Hash, PartialEq)]
pub enum KeyFormatError {
    MissingPemMarker,
    InvalidBase64,
    UnexpectedTag { expected: Tag, found: u8 },
    Truncated,
    InvalidLength,
    InvalidNull,
    InvalidStructure,
    UnsupportedKeyType,
}

impl Display for KeyFormatError {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        match self {
            Self::MissingPemMarker => write!(f, "missing PEM marker line"),
            Self::InvalidBase64 => write!(f, "invalid Base64 key data"),
            Self::UnexpectedTag { expected, found } => {
                write!(f, "expected ASN.1 tag 0x{:02x}, found 0x{found:02x}", expected.to_u8())
            }
            Self::Truncated => write!(f, "truncated ASN.1 data"),
            Self::InvalidLength => write!(f, "invalid ASN.1 length"),
            Self::InvalidNull => write!(f, "non-empty ASN.1 NULL"),
            Self::InvalidStructure => write!(f, "unexpected ASN.1 structure"),
            Self::UnsupportedKeyType => write!(f, "unsupported key type"),
        }
    }
}

impl Error for KeyFormatError {}

#[derive(Clone, Copy, Debug, Eq, Hash, PartialEq)]
pub enum VerificationError {
    InvalidKey,
    InsufficientKeySize,
    InvalidSignature,
    VerificationFailure,
}

impl Display for VerificationError {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        match self {
            Self::InvalidKey => write!(f, "invalid key data"),
            Self::InsufficientKeySize => write!(f, "key too small"),
            Self::InvalidSignature => write!(f, "invalid signature data"),
            Self::VerificationFailure => write!(f, "signature verification failed"),
        }
    }
}

impl Error for VerificationError {}

#[derive(Clone, Copy, Debug, Eq, Hash, PartialEq)]
pub enum SigningError {
    /// The padded `DigestInfo` does not fit in the modulus.
    DigestTooLarge,
    /// The signature does not have the length of the modulus.
    InvalidSignatureLength,
}

impl Display for SigningError {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        match self {
            Self::DigestTooLarge => write!(f, "digest too large for key modulus"),
            Self::InvalidSignatureLength => write!(f, "signature length does not match modulus"),
        }
    }
}

impl Error for SigningError {}
