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

//! Signer and supporting types.

mod format;
mod request;
mod sign;

pub use format::{fold, LINE_WIDTH};
pub use request::{BodyLength, HeaderSelection, SignRequest, Timestamp};

use crate::{
    crypto::{KeyFormatError, RsaPrivateKey},
    header::{self, MessageFormatError},
};
use std::{
    error::Error,
    fmt::{self, Display, Formatter},
};
use tracing::trace;

/// An error that indicates invalid parameters in a signing request.
#[derive(Clone, Copy, Debug, Eq, Hash, PartialEq)]
pub enum ParameterError {
    /// The identity is not the signing domain or a subdomain of it.
    IdentityNotInDomain,
    /// The padded digest does not fit in the modulus of the signing key.
    DigestTooLarge,
    /// A domain, selector, identity, or header name cannot appear in a tag.
    InvalidTagValue,
    /// No header field was selected for signing.
    NoSignedHeaders,
}

impl Display for ParameterError {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        match self {
            Self::IdentityNotInDomain => write!(f, "identity not in signing domain"),
            Self::DigestTooLarge => write!(f, "digest too large for signing key"),
            Self::InvalidTagValue => write!(f, "invalid tag value"),
            Self::NoSignedHeaders => write!(f, "no headers selected for signing"),
        }
    }
}

impl Error for ParameterError {}

/// An error that occurs when signing a message.
#[derive(Clone, Debug, Eq, PartialEq)]
pub enum SignerError {
    KeyFormat(KeyFormatError),
    MessageFormat(MessageFormatError),
    Parameter(ParameterError),
    /// An invariant of the implementation was violated.
    Internal(&'static str),
}

impl Display for SignerError {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        match self {
            Self::KeyFormat(e) => write!(f, "key format error: {e}"),
            Self::MessageFormat(e) => write!(f, "message format error: {e}"),
            Self::Parameter(e) => write!(f, "parameter error: {e}"),
            Self::Internal(s) => write!(f, "internal error: {s}"),
        }
    }
}

impl Error for SignerError {
    fn source(&self) -> Option<&(dyn Error + 'static)> {
        match self {
            Self::KeyFormat(e) => Some(e),
            Self::MessageFormat(e) => Some(e),
            Self::Parameter(e) => Some(e),
            Self::Internal(_) => None,
        }
    }
}

impl From<KeyFormatError> for SignerError {
    fn from(error: KeyFormatError) -> Self {
        Self::KeyFormat(error)
    }
}

impl From<MessageFormatError> for SignerError {
    fn from(error: MessageFormatError) -> Self {
        Self::MessageFormat(error)
    }
}

impl From<ParameterError> for SignerError {
    fn from(error: ParameterError) -> Self {
        Self::Parameter(error)
    }
}

/// Signs a message with a private key given in PEM format.
///
/// Returns the *DKIM-Signature* header line, terminated with CRLF, to be
/// prepended to the message.
///
/// # Errors
///
/// Fails with [`SignerError::KeyFormat`] if the key cannot be read, and
/// otherwise as [`sign_with_key`].
pub fn sign(message: &str, request: &SignRequest, private_key_pem: &str) -> Result<String, SignerError> {
    let private_key = RsaPrivateKey::from_pem(private_key_pem)?;
    sign_with_key(message, request, &private_key)
}

/// Signs a message with a private key.
///
/// # Errors
///
/// Fails with [`SignerError::MessageFormat`] if the message cannot be split
/// into header and body, and with [`SignerError::Parameter`] if the request
/// is invalid or the key is too small for the chosen hash algorithm.
///
/// A message is never signed with an empty *h=* tag: if no header field of
/// the message matches the [`HeaderSelection`], for example a
/// [`HeaderSelection::Manual`] list naming only absent fields, signing fails
/// with [`ParameterError::NoSignedHeaders`].
pub fn sign_with_key(
    message: &str,
    request: &SignRequest,
    private_key: &RsaPrivateKey,
) -> Result<String, SignerError> {
    request::validate_request(request)?;

    let (headers, body) = header::split_message(message)?;

    trace!(domain = %request.domain, selector = %request.selector, "signing message");

    sign::perform_signing(request, &headers, &body, private_key)
}
