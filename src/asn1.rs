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

//! A minimal ASN.1 DER codec.
//!
//! This codec understands just enough DER to read and write the RSA key
//! structures used in DKIM (PKCS #1 `RSAPrivateKey` and `RSAPublicKey`, PKCS #8
//! `PrivateKeyInfo`, X.509 `SubjectPublicKeyInfo`) and the `DigestInfo`
//! structure wrapped by PKCS #1 v1.5 signatures.
//!
//! Parsing is driven by a [`Template`] describing the expected structure.
//! INTEGER contents are read as unsigned big-endian magnitudes; the DER sign
//! bit is not interpreted. RSA key components are always positive, so this is
//! sufficient for the structures above.

use crate::crypto::KeyFormatError;
use rsa::BigUint;
use std::mem;

/// An ASN.1 universal tag understood by this codec.
#[derive(Clone, Copy, Debug, Eq, Hash, PartialEq)]
pub enum Tag {
    Integer,
    BitString,
    OctetString,
    Null,
    ObjectIdentifier,
    Sequence,
}

impl Tag {
    /// Returns the identifier octet of this tag.
    pub fn to_u8(self) -> u8 {
        match self {
            Self::Integer => 0x02,
            Self::BitString => 0x03,
            Self::OctetString => 0x04,
            Self::Null => 0x05,
            Self::ObjectIdentifier => 0x06,
            Self::Sequence => 0x30,
        }
    }

    pub fn from_u8(value: u8) -> Option<Self> {
        match value {
            0x02 => Some(Self::Integer),
            0x03 => Some(Self::BitString),
            0x04 => Some(Self::OctetString),
            0x05 => Some(Self::Null),
            0x06 => Some(Self::ObjectIdentifier),
            0x30 => Some(Self::Sequence),
            _ => None,
        }
    }
}

/// The expected shape of DER input.
#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub enum Template {
    Integer,
    BitString,
    OctetString,
    Null,
    ObjectIdentifier,
    Sequence(&'static [Template]),
}

impl Template {
    pub fn tag(&self) -> Tag {
        match self {
            Self::Integer => Tag::Integer,
            Self::BitString => Tag::BitString,
            Self::OctetString => Tag::OctetString,
            Self::Null => Tag::Null,
            Self::ObjectIdentifier => Tag::ObjectIdentifier,
            Self::Sequence(_) => Tag::Sequence,
        }
    }
}

/// PKCS #1 `RSAPrivateKey`: version, modulus, public exponent, private
/// exponent, two primes, two CRT exponents, and the CRT coefficient.
pub const RSA_PRIVATE_KEY: Template = Template::Sequence(&[Template::Integer; 9]);

/// PKCS #1 `RSAPublicKey`: modulus and public exponent.
pub const RSA_PUBLIC_KEY: Template = Template::Sequence(&[Template::Integer, Template::Integer]);

/// `AlgorithmIdentifier` with NULL parameters.
pub const ALGORITHM_IDENTIFIER: Template =
    Template::Sequence(&[Template::ObjectIdentifier, Template::Null]);

/// X.509 `SubjectPublicKeyInfo`.
pub const SUBJECT_PUBLIC_KEY_INFO: Template =
    Template::Sequence(&[ALGORITHM_IDENTIFIER, Template::BitString]);

/// PKCS #8 `PrivateKeyInfo` (trailing optional attributes are ignored).
pub const PRIVATE_KEY_INFO: Template = Template::Sequence(&[
    Template::Integer,
    ALGORITHM_IDENTIFIER,
    Template::OctetString,
]);

/// A decoded DER element.
#[derive(Clone, Debug, Eq, PartialEq)]
pub enum Node {
    Integer(BigUint),
    /// BIT STRING contents, including the leading unused-bits octet.
    BitString(Vec<u8>),
    OctetString(Vec<u8>),
    Null,
    /// OBJECT IDENTIFIER contents in encoded form.
    ObjectIdentifier(Vec<u8>),
    Sequence(Vec<Node>),
}

impl Node {
    pub fn into_integer(self) -> Option<BigUint> {
        match self {
            Self::Integer(n) => Some(n),
            _ => None,
        }
    }

    pub fn into_sequence(self) -> Option<Vec<Node>> {
        match self {
            Self::Sequence(nodes) => Some(nodes),
            _ => None,
        }
    }

    /// Returns the raw contents of a BIT STRING, OCTET STRING, or OBJECT
    /// IDENTIFIER.
    pub fn into_bytes(self) -> Option<Vec<u8>> {
        match self {
            Self::BitString(b) | Self::OctetString(b) | Self::ObjectIdentifier(b) => Some(b),
            _ => None,
        }
    }
}

/// Parses DER data against a template.
///
/// Bytes following the element described by the template, and following the
/// last expected child of a SEQUENCE, are ignored.
pub fn parse(template: Template, data: &[u8]) -> Result<Node, KeyFormatError> {
    let mut reader = Reader { data, pos: 0 };
    reader.read_node(template)
}

struct Reader<'a> {
    data: &'a [u8],
    pos: usize,
}

impl<'a> Reader<'a> {
    fn read_byte(&mut self) -> Result<u8, KeyFormatError> {
        let b = *self.data.get(self.pos).ok_or(KeyFormatError::Truncated)?;
        self.pos += 1;
        Ok(b)
    }

    fn read_bytes(&mut self, n: usize) -> Result<&'a [u8], KeyFormatError> {
        let end = self.pos.checked_add(n).ok_or(KeyFormatError::InvalidLength)?;
        let bytes = self.data.get(self.pos..end).ok_or(KeyFormatError::Truncated)?;
        self.pos = end;
        Ok(bytes)
    }

    fn read_length(&mut self) -> Result<usize, KeyFormatError> {
        let first = self.read_byte()?;
        if first < 0x80 {
            return Ok(first.into());
        }

        let count = usize::from(first & 0x7f);
        if count == 0 || count > mem::size_of::<usize>() {
            return Err(KeyFormatError::InvalidLength);
        }

        self.read_bytes(count)?
            .iter()
            .try_fold(0usize, |acc, &b| {
                acc.checked_mul(256).map(|acc| acc + usize::from(b))
            })
            .ok_or(KeyFormatError::InvalidLength)
    }

    fn read_node(&mut self, template: Template) -> Result<Node, KeyFormatError> {
        let expected = template.tag();
        let found = self.read_byte()?;
        if found != expected.to_u8() {
            return Err(KeyFormatError::UnexpectedTag { expected, found });
        }

        let len = self.read_length()?;
        let content = self.read_bytes(len)?;

        let node = match template {
            Template::Integer => Node::Integer(bytes_to_int(content)),
            Template::BitString => Node::BitString(content.to_vec()),
            Template::OctetString => Node::OctetString(content.to_vec()),
            Template::Null => {
                if !content.is_empty() {
                    return Err(KeyFormatError::InvalidNull);
                }
                Node::Null
            }
            Template::ObjectIdentifier => Node::ObjectIdentifier(content.to_vec()),
            Template::Sequence(children) => {
                let mut inner = Reader { data: content, pos: 0 };
                let nodes = children
                    .iter()
                    .map(|&child| inner.read_node(child))
                    .collect::<Result<_, _>>()?;
                Node::Sequence(nodes)
            }
        };

        Ok(node)
    }
}

/// Encodes a node as DER.
pub fn build(node: &Node) -> Vec<u8> {
    match node {
        Node::Integer(n) => {
            let mut content = int_to_bytes(n, None);
            // keep the value positive under the DER sign convention
            if content[0] & 0x80 != 0 {
                content.insert(0, 0);
            }
            encode_tlv(Tag::Integer, &content)
        }
        Node::BitString(b) => encode_tlv(Tag::BitString, b),
        Node::OctetString(b) => encode_tlv(Tag::OctetString, b),
        Node::Null => encode_tlv(Tag::Null, &[]),
        Node::ObjectIdentifier(b) => encode_tlv(Tag::ObjectIdentifier, b),
        Node::Sequence(nodes) => {
            let content: Vec<u8> = nodes.iter().flat_map(build).collect();
            encode_tlv(Tag::Sequence, &content)
        }
    }
}

fn encode_tlv(tag: Tag, content: &[u8]) -> Vec<u8> {
    let mut result = vec![tag.to_u8()];
    result.extend(encode_length(content.len()));
    result.extend(content);
    result
}

/// Encodes a DER length in short or long form.
pub fn encode_length(len: usize) -> Vec<u8> {
    if len < 0x80 {
        // cast is lossless, checked just above
        return vec![len as u8];
    }

    let bytes = len.to_be_bytes();
    let skip = bytes.iter().take_while(|&&b| b == 0).count();
    let significant = &bytes[skip..];

    let mut result = Vec::with_capacity(significant.len() + 1);
    // at most size_of::<usize>() bytes, fits in the low seven bits
    result.push(0x80 | significant.len() as u8);
    result.extend(significant);
    result
}

/// Interprets bytes as an unsigned big-endian integer.
pub fn bytes_to_int(bytes: &[u8]) -> BigUint {
    BigUint::from_bytes_be(bytes)
}

/// Encodes an integer as unsigned big-endian bytes, left-padded with zero
/// bytes to at least `min_len` bytes if given.
pub fn int_to_bytes(n: &BigUint, min_len: Option<usize>) -> Vec<u8> {
    let bytes = n.to_bytes_be();
    match min_len {
        Some(min_len) if bytes.len() < min_len => {
            let mut padded = vec![0; min_len - bytes.len()];
            padded.extend(bytes);
            padded
        }
        _ => bytes,
    }
}
