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

//! Verifier and supporting types.

mod lookup;
mod verify;

pub use lookup::LookupTxt;

use crate::{
    canonicalize,
    crypto::{HashAlgorithm, RsaPublicKey, VerificationError},
    header::{self, MessageFormatError},
    message_hash,
    record::{DkimKeyRecord, DkimKeyRecordParseError},
    signature::{DkimSignature, DkimSignatureError, DKIM_SIGNATURE_NAME},
    util::CanonicalStr,
};
use std::{
    error::Error,
    fmt::{self, Display, Formatter},
    time::SystemTime,
};
use tracing::{debug, trace};

/// Configuration for a verifier process.
#[derive(Clone, Debug, Eq, PartialEq)]
pub struct Config {
    /// When this flag is set, signatures using the SHA-1 hash algorithm are
    /// acceptable. The default is `true`.
    pub allow_sha1: bool,

    /// Minimum acceptable key size in bits. When the key size of an RSA public
    /// key is below this limit, the signature will not validate. The default
    /// is 0, that is, any key that can hold the padded digest is acceptable.
    pub min_key_bits: usize,

    /// When this flag is set, an expired DKIM signature (x=) will not validate.
    pub fail_if_expired: bool,

    /// If a DKIM signature has the l= tag, and the body length given in this
    /// tag is less than the actual message body length, the signature will not
    /// validate. In other words, signatures that cover only part of the message
    /// body are not accepted.
    pub forbid_partially_signed_body: bool,

    /// The `SystemTime` value to use as the instant ‘now’.
    pub fixed_system_time: Option<SystemTime>,
}

impl Config {
    fn current_timestamp(&self) -> u64 {
        self.fixed_system_time
            .unwrap_or_else(SystemTime::now)
            .duration_since(SystemTime::UNIX_EPOCH)
            .unwrap_or_default()
            .as_secs()
    }
}

impl Default for Config {
    fn default() -> Self {
        Self {
            allow_sha1: true,
            min_key_bits: 0,
            fail_if_expired: false,
            forbid_partially_signed_body: false,
            fixed_system_time: None,
        }
    }
}

#[derive(Clone, Copy, Debug, Eq, Hash, PartialEq)]
pub enum PolicyError {
    ForbidPartiallySignedBody,
    SignatureExpired,
    DisallowedSha1Hash,
    KeyTooSmall,
}

impl Display for PolicyError {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        match self {
            Self::ForbidPartiallySignedBody => write!(f, "partial body signing not acceptable"),
            Self::SignatureExpired => write!(f, "signature expired"),
            Self::DisallowedSha1Hash => write!(f, "hash algorithm SHA-1 not acceptable"),
            Self::KeyTooSmall => write!(f, "public key size too small"),
        }
    }
}

impl Error for PolicyError {}

/// A verification result arrived at for the first *DKIM-Signature* header of
/// a message.
#[derive(Clone, Debug, Eq, PartialEq)]
pub struct VerificationResult {
    /// The verification status.
    pub status: VerificationStatus,
    /// The parsed DKIM signature data obtained from the *DKIM-Signature*
    /// header, if available.
    pub signature: Option<DkimSignature>,
    /// The parsed DKIM public key record data used in the verification, if
    /// available.
    pub key_record: Option<DkimKeyRecord>,
}

impl VerificationResult {
    pub fn is_success(&self) -> bool {
        self.status == VerificationStatus::Success
    }
}

/// The verification status of an evaluated DKIM signature.
#[derive(Clone, Debug, Eq, PartialEq)]
pub enum VerificationStatus {
    Success,
    /// Failure, with failure cause attached.
    Failure(VerifierError),
}

/// The reason a verification did not succeed.
#[derive(Clone, Debug, Eq, PartialEq)]
pub enum VerifierError {
    MessageFormat(MessageFormatError),
    NoSignature,
    DkimSignatureFormat(DkimSignatureError),
    BodyHashMismatch,
    InvalidKeyDomain,
    NoKeyFound,
    KeyLookup,
    KeyRecordFormat(DkimKeyRecordParseError),
    DisallowedHashAlgorithm,
    VerificationFailure(VerificationError),
    Policy(PolicyError),
}

impl Display for VerifierError {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        match self {
            Self::MessageFormat(error) => error.fmt(f),
            Self::NoSignature => write!(f, "no DKIM-Signature header"),
            Self::DkimSignatureFormat(error) => error.fmt(f),
            Self::BodyHashMismatch => write!(f, "body hash mismatch"),
            Self::InvalidKeyDomain => write!(f, "invalid key record domain name"),
            Self::NoKeyFound => write!(f, "no key record found"),
            Self::KeyLookup => write!(f, "key record lookup failed"),
            Self::KeyRecordFormat(error) => error.fmt(f),
            Self::DisallowedHashAlgorithm => write!(f, "hash algorithm not allowed"),
            Self::VerificationFailure(error) => error.fmt(f),
            Self::Policy(error) => error.fmt(f),
        }
    }
}

impl Error for VerifierError {}

/// Verifies the first *DKIM-Signature* header of a message with the default
/// configuration.
///
/// Returns `true` only if every check of the signature succeeds; the reason
/// of a failure is logged at debug level. See [`verify_message`].
pub fn verify<T>(message: &str, resolver: &T) -> bool
where
    T: LookupTxt + ?Sized,
{
    verify_message(message, resolver, &Config::default()).is_success()
}

/// Verifies the first *DKIM-Signature* header of a message.
///
/// Verification never fails with an error: any problem with the message, the
/// signature, or the key record yields a result with
/// [`VerificationStatus::Failure`].
pub fn verify_message<T>(message: &str, resolver: &T, config: &Config) -> VerificationResult
where
    T: LookupTxt + ?Sized,
{
    let mut result = VerificationResult {
        status: VerificationStatus::Success,
        signature: None,
        key_record: None,
    };

    match verify_first_signature(&mut result, message, resolver, config) {
        Ok(()) => {
            trace!("DKIM signature verified");
        }
        Err(e) => {
            debug!("DKIM signature verification failed: {e}");
            result.status = VerificationStatus::Failure(e);
        }
    }

    result
}

fn verify_first_signature<T>(
    result: &mut VerificationResult,
    message: &str,
    resolver: &T,
    config: &Config,
) -> Result<(), VerifierError>
where
    T: LookupTxt + ?Sized,
{
    let (headers, body) = header::split_message(message).map_err(VerifierError::MessageFormat)?;

    let (name, value) = headers
        .find(DKIM_SIGNATURE_NAME)
        .ok_or(VerifierError::NoSignature)?;

    let sig: DkimSignature = value.parse().map_err(VerifierError::DkimSignatureFormat)?;

    trace!(domain = %sig.domain, selector = %sig.selector, "parsed DKIM signature");

    result.signature = Some(sig.clone());

    let hash_alg = sig.algorithm.hash_algorithm();

    if hash_alg == HashAlgorithm::Sha1 && !config.allow_sha1 {
        return Err(VerifierError::Policy(PolicyError::DisallowedSha1Hash));
    }

    if config.fail_if_expired {
        if let Some(expiration) = sig.expiration {
            if expiration < config.current_timestamp() {
                return Err(VerifierError::Policy(PolicyError::SignatureExpired));
            }
        }
    }

    // check the body hash

    let cbody = canonicalize::canonicalize_body(sig.canonicalization.body, &body);

    if config.forbid_partially_signed_body {
        if let Some(len) = sig.body_length {
            if len < cbody.len() {
                return Err(VerifierError::Policy(PolicyError::ForbidPartiallySignedBody));
            }
        }
    }

    let body_hash = message_hash::compute_body_hash(hash_alg, &cbody, sig.body_length);

    if body_hash != sig.body_hash {
        return Err(VerifierError::BodyHashMismatch);
    }

    trace!("body hash matched");

    // look up the public key record

    let dname = format!("{}._domainkey.{}", sig.selector, sig.domain);
    let dname = idna::domain_to_ascii(&dname).map_err(|_| VerifierError::InvalidKeyDomain)?;

    // Note the trailing dot: only absolute queries.
    let dname = format!("{dname}.");

    trace!(%dname, "looking up key record");

    let txt = match resolver.lookup_txt(&dname) {
        Ok(Some(txt)) => txt,
        Ok(None) => return Err(VerifierError::NoKeyFound),
        Err(e) => {
            trace!("key record lookup failed: {e}");
            return Err(VerifierError::KeyLookup);
        }
    };

    let record: DkimKeyRecord = txt.parse().map_err(VerifierError::KeyRecordFormat)?;

    result.key_record = Some(record.clone());

    if !record.allows_hash_algorithm(hash_alg) {
        trace!("key record does not allow hash algorithm {}", hash_alg.canonical_str());
        return Err(VerifierError::DisallowedHashAlgorithm);
    }

    let public_key = RsaPublicKey::from_key_data(&record.key_data).map_err(|e| {
        trace!("cannot read public key: {e}");
        VerifierError::VerificationFailure(VerificationError::InvalidKey)
    })?;

    if public_key.bits() < config.min_key_bits {
        return Err(VerifierError::Policy(PolicyError::KeyTooSmall));
    }

    // verify the signature over the header

    verify::perform_verification(&headers, &public_key, &sig, name.as_ref(), value)
}
