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

//! The *DKIM-Signature* header and its tags.

use crate::{
    crypto::HashAlgorithm,
    header::FieldName,
    tag_list::{self, TagList, TagListParseError, TagSpec},
    util::{self, CanonicalStr},
};
use std::{
    error::Error,
    fmt::{self, Display, Formatter},
    str::FromStr,
};

/// The name of the DKIM signature header field.
pub const DKIM_SIGNATURE_NAME: &str = "DKIM-Signature";

/// A signature algorithm.
#[derive(Clone, Copy, Debug, Eq, Hash, PartialEq)]
pub enum SignatureAlgorithm {
    RsaSha1,
    RsaSha256,
}

impl SignatureAlgorithm {
    pub fn hash_algorithm(self) -> HashAlgorithm {
        match self {
            Self::RsaSha1 => HashAlgorithm::Sha1,
            Self::RsaSha256 => HashAlgorithm::Sha256,
        }
    }
}

impl CanonicalStr for SignatureAlgorithm {
    fn canonical_str(&self) -> &'static str {
        match self {
            Self::RsaSha1 => "rsa-sha1",
            Self::RsaSha256 => "rsa-sha256",
        }
    }
}

impl Display for SignatureAlgorithm {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        f.write_str(self.canonical_str())
    }
}

#[derive(Clone, Copy, Debug, Default, Eq, Hash, PartialEq)]
pub struct ParseAlgorithmError;

impl FromStr for SignatureAlgorithm {
    type Err = ParseAlgorithmError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        if s.eq_ignore_ascii_case("rsa-sha256") {
            Ok(Self::RsaSha256)
        } else if s.eq_ignore_ascii_case("rsa-sha1") {
            Ok(Self::RsaSha1)
        } else {
            Err(ParseAlgorithmError)
        }
    }
}

/// A canonicalization algorithm.
#[derive(Clone, Copy, Debug, Default, Eq, Hash, PartialEq)]
pub enum CanonicalizationAlgorithm {
    #[default]
    Simple,
    Relaxed,
}

impl CanonicalStr for CanonicalizationAlgorithm {
    fn canonical_str(&self) -> &'static str {
        match self {
            Self::Simple => "simple",
            Self::Relaxed => "relaxed",
        }
    }
}

impl Display for CanonicalizationAlgorithm {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        f.write_str(self.canonical_str())
    }
}

#[derive(Clone, Copy, Debug, Default, Eq, Hash, PartialEq)]
pub struct ParseCanonicalizationError;

impl FromStr for CanonicalizationAlgorithm {
    type Err = ParseCanonicalizationError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        if s.eq_ignore_ascii_case("simple") {
            Ok(Self::Simple)
        } else if s.eq_ignore_ascii_case("relaxed") {
            Ok(Self::Relaxed)
        } else {
            Err(ParseCanonicalizationError)
        }
    }
}

/// A pair of header and body canonicalization algorithms, as in the *c=* tag.
#[derive(Clone, Copy, Debug, Default, Eq, Hash, PartialEq)]
pub struct Canonicalization {
    pub header: CanonicalizationAlgorithm,
    pub body: CanonicalizationAlgorithm,
}

impl From<(CanonicalizationAlgorithm, CanonicalizationAlgorithm)> for Canonicalization {
    fn from((header, body): (CanonicalizationAlgorithm, CanonicalizationAlgorithm)) -> Self {
        Self { header, body }
    }
}

impl Display for Canonicalization {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        write!(f, "{}/{}", self.header, self.body)
    }
}

impl FromStr for Canonicalization {
    type Err = ParseCanonicalizationError;

    /// Parses `header[/body]`; the body algorithm defaults to *simple*.
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let (header, body) = match s.split_once('/') {
            Some((header, body)) => (header.parse()?, body.parse()?),
            None => (s.parse()?, CanonicalizationAlgorithm::Simple),
        };
        Ok(Self { header, body })
    }
}

/// An error that occurs when parsing a *DKIM-Signature* header.
#[derive(Clone, Copy, Debug, Eq, Hash, PartialEq)]
pub enum DkimSignatureError {
    InvalidTagList,
    DuplicateTag,
    MissingVersionTag,
    UnsupportedVersion,
    MissingAlgorithmTag,
    UnsupportedAlgorithm,
    MissingSignatureTag,
    EmptySignatureTag,
    MissingBodyHashTag,
    EmptyBodyHashTag,
    InvalidBase64,
    MissingDomainTag,
    InvalidDomain,
    MissingSignedHeadersTag,
    InvalidSignedHeaderName,
    InvalidIdentity,
    DomainMismatch,
    InvalidBodyLength,
    UnsupportedQueryMethod,
    MissingSelectorTag,
    InvalidSelector,
    InvalidTimestamp,
    InvalidExpiration,
    ExpirationNotAfterTimestamp,
    UnsupportedCanonicalization,
}

impl Display for DkimSignatureError {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        match self {
            Self::InvalidTagList => write!(f, "ill-formed tag list"),
            Self::DuplicateTag => write!(f, "duplicate tag"),
            Self::MissingVersionTag => write!(f, "v= tag missing"),
            Self::UnsupportedVersion => write!(f, "unsupported version"),
            Self::MissingAlgorithmTag => write!(f, "a= tag missing"),
            Self::UnsupportedAlgorithm => write!(f, "unsupported algorithm"),
            Self::MissingSignatureTag => write!(f, "b= tag missing"),
            Self::EmptySignatureTag => write!(f, "b= tag empty"),
            Self::MissingBodyHashTag => write!(f, "bh= tag missing"),
            Self::EmptyBodyHashTag => write!(f, "bh= tag empty"),
            Self::InvalidBase64 => write!(f, "invalid Base64 string"),
            Self::MissingDomainTag => write!(f, "d= tag missing"),
            Self::InvalidDomain => write!(f, "invalid signing domain"),
            Self::MissingSignedHeadersTag => write!(f, "h= tag missing"),
            Self::InvalidSignedHeaderName => write!(f, "invalid header name in h= tag"),
            Self::InvalidIdentity => write!(f, "invalid identity"),
            Self::DomainMismatch => write!(f, "identity not in signing domain"),
            Self::InvalidBodyLength => write!(f, "invalid body length"),
            Self::UnsupportedQueryMethod => write!(f, "unsupported query method"),
            Self::MissingSelectorTag => write!(f, "s= tag missing"),
            Self::InvalidSelector => write!(f, "invalid selector"),
            Self::InvalidTimestamp => write!(f, "invalid timestamp"),
            Self::InvalidExpiration => write!(f, "invalid expiration"),
            Self::ExpirationNotAfterTimestamp => write!(f, "expiration not after timestamp"),
            Self::UnsupportedCanonicalization => write!(f, "unsupported canonicalization"),
        }
    }
}

impl Error for DkimSignatureError {}

/// The tags of a parsed *DKIM-Signature* header.
#[derive(Clone, Debug, Eq, PartialEq)]
pub struct DkimSignature {
    pub algorithm: SignatureAlgorithm,
    pub signature_data: Box<[u8]>,
    pub body_hash: Box<[u8]>,
    pub canonicalization: Canonicalization,
    pub domain: String,
    pub signed_headers: Box<[FieldName]>,
    pub identity: Option<String>,
    /// The *l=* tag; values beyond the platform integer range saturate.
    pub body_length: Option<usize>,
    pub selector: String,
    pub timestamp: Option<u64>,
    pub expiration: Option<u64>,
}

impl DkimSignature {
    fn from_tag_list(tag_list: &TagList<'_>) -> Result<Self, DkimSignatureError> {
        let mut version = None;
        let mut algorithm = None;
        let mut signature = None;
        let mut body_hash = None;
        let mut canonicalization = None;
        let mut domain = None;
        let mut signed_headers = None;
        let mut identity = None;
        let mut body_length = None;
        let mut query_method = None;
        let mut selector = None;
        let mut timestamp = None;
        let mut expiration = None;

        for &TagSpec { name, value } in tag_list.as_ref() {
            match name {
                "v" => version = Some(value),
                "a" => algorithm = Some(value),
                "b" => signature = Some(value),
                "bh" => body_hash = Some(value),
                "c" => canonicalization = Some(value),
                "d" => domain = Some(value),
                "h" => signed_headers = Some(value),
                "i" => identity = Some(value),
                "l" => body_length = Some(value),
                "q" => query_method = Some(value),
                "s" => selector = Some(value),
                "t" => timestamp = Some(value),
                "x" => expiration = Some(value),
                // unknown tags are ignored
                _ => {}
            }
        }

        let version = version.ok_or(DkimSignatureError::MissingVersionTag)?;
        if version != "1" {
            return Err(DkimSignatureError::UnsupportedVersion);
        }

        let algorithm = algorithm
            .ok_or(DkimSignatureError::MissingAlgorithmTag)?
            .parse()
            .map_err(|_| DkimSignatureError::UnsupportedAlgorithm)?;

        let signature = signature.ok_or(DkimSignatureError::MissingSignatureTag)?;
        if signature.is_empty() {
            return Err(DkimSignatureError::EmptySignatureTag);
        }
        let signature_data = decode_base64_tag_value(signature)?;

        let body_hash = body_hash.ok_or(DkimSignatureError::MissingBodyHashTag)?;
        if body_hash.is_empty() {
            return Err(DkimSignatureError::EmptyBodyHashTag);
        }
        let body_hash = decode_base64_tag_value(body_hash)?;

        let domain = domain.ok_or(DkimSignatureError::MissingDomainTag)?;
        if domain.is_empty() || domain.contains(|c: char| c.is_whitespace()) {
            return Err(DkimSignatureError::InvalidDomain);
        }

        let signed_headers = signed_headers.ok_or(DkimSignatureError::MissingSignedHeadersTag)?;
        let signed_headers = tag_list::parse_colon_separated_tag_value(signed_headers)
            .into_iter()
            .map(FieldName::new)
            .collect::<Result<Box<[_]>, _>>()
            .map_err(|_| DkimSignatureError::InvalidSignedHeaderName)?;

        if let Some(identity) = identity {
            if !is_within_domain(identity, domain) {
                return Err(if identity.is_empty() {
                    DkimSignatureError::InvalidIdentity
                } else {
                    DkimSignatureError::DomainMismatch
                });
            }
        }

        let body_length = body_length.map(parse_body_length).transpose()?;

        if let Some(q) = query_method {
            if !q.eq_ignore_ascii_case("dns/txt") {
                return Err(DkimSignatureError::UnsupportedQueryMethod);
            }
        }

        let selector = selector.ok_or(DkimSignatureError::MissingSelectorTag)?;
        if selector.is_empty() || selector.contains(|c: char| c.is_whitespace()) {
            return Err(DkimSignatureError::InvalidSelector);
        }

        let timestamp = timestamp
            .map(|t| parse_u64(t).ok_or(DkimSignatureError::InvalidTimestamp))
            .transpose()?;
        let expiration = expiration
            .map(|x| parse_u64(x).ok_or(DkimSignatureError::InvalidExpiration))
            .transpose()?;

        if let (Some(t), Some(x)) = (timestamp, expiration) {
            if x < t {
                return Err(DkimSignatureError::ExpirationNotAfterTimestamp);
            }
        }

        let canonicalization = match canonicalization {
            Some(c) => c
                .parse()
                .map_err(|_| DkimSignatureError::UnsupportedCanonicalization)?,
            None => Canonicalization::default(),
        };

        Ok(Self {
            algorithm,
            signature_data: signature_data.into(),
            body_hash: body_hash.into(),
            canonicalization,
            domain: domain.into(),
            signed_headers,
            identity: identity.map(Into::into),
            body_length,
            selector: selector.into(),
            timestamp,
            expiration,
        })
    }
}

impl FromStr for DkimSignature {
    type Err = DkimSignatureError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let tag_list = TagList::from_str(s).map_err(|e| match e {
            TagListParseError::DuplicateTag => DkimSignatureError::DuplicateTag,
            TagListParseError::Syntax => DkimSignatureError::InvalidTagList,
        })?;
        Self::from_tag_list(&tag_list)
    }
}

fn decode_base64_tag_value(value: &str) -> Result<Vec<u8>, DkimSignatureError> {
    if !util::is_base64_charset(value) {
        return Err(DkimSignatureError::InvalidBase64);
    }
    let value = tag_list::strip_fws_from_tag_value(value);
    util::decode_base64(&value).map_err(|_| DkimSignatureError::InvalidBase64)
}

fn is_digits(s: &str) -> bool {
    !s.is_empty() && s.chars().all(|c| c.is_ascii_digit())
}

// timestamps too large for u64 saturate
fn parse_u64(s: &str) -> Option<u64> {
    if !is_digits(s) {
        return None;
    }
    Some(s.parse().unwrap_or(u64::MAX))
}

// §3.5: at most 76 digits, values too large for this platform cover the
// entire body anyway
fn parse_body_length(s: &str) -> Result<usize, DkimSignatureError> {
    if !is_digits(s) || s.len() > 76 {
        return Err(DkimSignatureError::InvalidBodyLength);
    }
    Ok(s.parse().unwrap_or(usize::MAX))
}

/// Whether an identity (*i=* tag) lies within a signing domain: it equals the
/// domain or ends with the domain preceded by `@` or `.`, ignoring case.
pub fn is_within_domain(identity: &str, domain: &str) -> bool {
    let (identity, domain) = (identity.to_ascii_lowercase(), domain.to_ascii_lowercase());

    if identity == domain {
        return true;
    }

    match identity.strip_suffix(&domain) {
        Some(prefix) => prefix.ends_with(['@', '.']),
        None => false,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use CanonicalizationAlgorithm::*;

    const BH: &str = "2jUSOH9NhtVGCQWNr9BrIAPreKQjO6Sn7XIkfJVOzv8=";

    fn make_value(extra: &str) -> String {
        format!("v=1; a=rsa-sha256; d=example.com; s=sel; h=From : To; bh={BH}; b=AAAA{extra}")
    }

    #[test]
    fn canonicalization_from_str() {
        assert_eq!("relaxed/simple".parse(), Ok(Canonicalization::from((Relaxed, Simple))));
        assert_eq!("Relaxed".parse(), Ok(Canonicalization::from((Relaxed, Simple))));
        assert_eq!("simple/RELAXED".parse(), Ok(Canonicalization::from((Simple, Relaxed))));
        assert_eq!("simple/other".parse::<Canonicalization>(), Err(ParseCanonicalizationError));
        assert_eq!(Canonicalization::from((Relaxed, Relaxed)).to_string(), "relaxed/relaxed");
    }

    #[test]
    fn dkim_signature_from_str_ok() {
        let value = " v=1; a=rsa-sha256; c=relaxed/relaxed; d=example.com;\r\n \
            i=@example.com; q=dns/txt; s=sel; t=1700000000; x=1700000100;\r\n \
            h=From:Subject; bh=2jUSOH9NhtVGCQWNr9BrIAPreKQjO6Sn7XIkfJVOzv8=; b=AA\r\n BB\r\n";

        let sig: DkimSignature = value.parse().unwrap();

        assert_eq!(
            sig,
            DkimSignature {
                algorithm: SignatureAlgorithm::RsaSha256,
                signature_data: Box::from(*b"\x00\x00\x41"),
                body_hash: util::decode_base64(BH).unwrap().into(),
                canonicalization: (Relaxed, Relaxed).into(),
                domain: "example.com".into(),
                signed_headers: [FieldName::new("From").unwrap(), FieldName::new("Subject").unwrap()].into(),
                identity: Some("@example.com".into()),
                body_length: None,
                selector: "sel".into(),
                timestamp: Some(1700000000),
                expiration: Some(1700000100),
            }
        );
    }

    #[test]
    fn dkim_signature_defaults() {
        let sig: DkimSignature = make_value("").parse().unwrap();

        assert_eq!(sig.canonicalization, Canonicalization::from((Simple, Simple)));
        assert_eq!(sig.signed_headers.len(), 2);
        assert_eq!(sig.identity, None);
        assert_eq!(sig.timestamp, None);
    }

    #[test]
    fn dkim_signature_invalid_tags() {
        use DkimSignatureError::*;

        let parse = |extra: &str| make_value(extra).parse::<DkimSignature>().map(|_| ());

        assert_eq!(parse("; v=1"), Err(DuplicateTag));
        assert_eq!(parse("; c=fancy"), Err(UnsupportedCanonicalization));
        assert_eq!(parse("; c=simple/fancy"), Err(UnsupportedCanonicalization));
        assert_eq!(parse("; q=http"), Err(UnsupportedQueryMethod));
        assert_eq!(parse("; l=12a"), Err(InvalidBodyLength));
        assert_eq!(parse(&format!("; l={}", "9".repeat(77))), Err(InvalidBodyLength));
        assert_eq!(parse("; t=now"), Err(InvalidTimestamp));
        assert_eq!(parse("; t=-1"), Err(InvalidTimestamp));
        assert_eq!(parse("; t=100; x=99"), Err(ExpirationNotAfterTimestamp));
        assert_eq!(parse("; i=joe@example.org"), Err(DomainMismatch));
        assert_eq!(parse("; i=joe@badexample.com"), Err(DomainMismatch));
        assert_eq!(parse("; junk"), Err(InvalidTagList));
        assert_eq!(parse("!"), Err(InvalidBase64));

        assert_eq!(parse("; l=10"), Ok(()));
        assert_eq!(parse("; t=100; x=100"), Ok(()));
        assert_eq!(parse("; i=joe@mail.EXAMPLE.com"), Ok(()));
        assert_eq!(parse("; i=example.com"), Ok(()));
        assert_eq!(parse("; z=unknown"), Ok(()));
    }

    #[test]
    fn dkim_signature_large_timestamps() {
        let huge = "9".repeat(30);

        let sig: DkimSignature = make_value(&format!("; t=100; x={huge}")).parse().unwrap();
        assert_eq!(sig.timestamp, Some(100));
        assert_eq!(sig.expiration, Some(u64::MAX));

        let sig: DkimSignature = make_value(&format!("; t={huge}")).parse().unwrap();
        assert_eq!(sig.timestamp, Some(u64::MAX));

        assert_eq!(
            make_value(&format!("; t={huge}; x=100")).parse::<DkimSignature>(),
            Err(DkimSignatureError::ExpirationNotAfterTimestamp)
        );
    }

    #[test]
    fn dkim_signature_missing_tags() {
        use DkimSignatureError::*;

        assert_eq!("a=rsa-sha256".parse::<DkimSignature>(), Err(MissingVersionTag));
        assert_eq!("v=2".parse::<DkimSignature>(), Err(UnsupportedVersion));
        assert_eq!("v=1".parse::<DkimSignature>(), Err(MissingAlgorithmTag));
        assert_eq!("v=1; a=ed25519-sha256".parse::<DkimSignature>(), Err(UnsupportedAlgorithm));
        assert_eq!("v=1; a=rsa-sha1".parse::<DkimSignature>(), Err(MissingSignatureTag));
        assert_eq!("v=1; a=rsa-sha1; b=".parse::<DkimSignature>(), Err(EmptySignatureTag));
        assert_eq!("v=1; a=rsa-sha1; b=AAAA".parse::<DkimSignature>(), Err(MissingBodyHashTag));
        assert_eq!(
            "v=1; a=rsa-sha1; b=AAAA; bh=AAAA".parse::<DkimSignature>(),
            Err(MissingDomainTag)
        );
        assert_eq!(
            "v=1; a=rsa-sha1; b=AAAA; bh=AAAA; d=x".parse::<DkimSignature>(),
            Err(MissingSignedHeadersTag)
        );
        assert_eq!(
            "v=1; a=rsa-sha1; b=AAAA; bh=AAAA; d=x; h=".parse::<DkimSignature>(),
            Err(InvalidSignedHeaderName)
        );
        assert_eq!(
            "v=1; a=rsa-sha1; b=AAAA; bh=AAAA; d=x; h=from".parse::<DkimSignature>(),
            Err(MissingSelectorTag)
        );
    }

    #[test]
    fn body_length_saturates() {
        let sig: DkimSignature = make_value(&format!("; l={}", "9".repeat(76))).parse().unwrap();

        assert_eq!(sig.body_length, Some(usize::MAX));
    }

    #[test]
    fn is_within_domain_ok() {
        assert!(is_within_domain("example.com", "example.com"));
        assert!(is_within_domain("@example.com", "example.com"));
        assert!(is_within_domain("sales.other.com", "other.com"));
        assert!(is_within_domain("JOE@Example.COM", "example.com"));

        assert!(!is_within_domain("joe@wrong.com", "other.com"));
        assert!(!is_within_domain("xother.com", "other.com"));
        assert!(!is_within_domain("", "other.com"));
    }
}
