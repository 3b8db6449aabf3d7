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

//! DKIM public key record.

use crate::{
    crypto::{HashAlgorithm, KeyType, RsaPublicKey},
    tag_list::{parse_colon_separated_tag_value, strip_fws_from_tag_value, TagList, TagSpec},
    util::{self, CanonicalStr},
};
use std::{
    error::Error,
    fmt::{self, Display, Formatter},
    str::FromStr,
};

#[derive(Clone, Copy, Debug, Eq, Hash, PartialEq)]
pub enum DkimKeyRecordParseError {
    InvalidBase64,
    TagListSyntax,
    UnsupportedVersion,
    MisplacedVersionTag,
    UnsupportedKeyType,
    NoSupportedHashAlgorithms,
    RevokedKey,
    MissingKeyTag,
}

impl Display for DkimKeyRecordParseError {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        match self {
            Self::InvalidBase64 => write!(f, "invalid Base64 string"),
            Self::TagListSyntax => write!(f, "invalid tag-list"),
            Self::UnsupportedVersion => write!(f, "unsupported version"),
            Self::MisplacedVersionTag => write!(f, "v= tag not initial"),
            Self::UnsupportedKeyType => write!(f, "unsupported key type"),
            Self::NoSupportedHashAlgorithms => write!(f, "no supported hash algorithms"),
            Self::RevokedKey => write!(f, "key revoked"),
            Self::MissingKeyTag => write!(f, "p= tag missing"),
        }
    }
}

impl Error for DkimKeyRecordParseError {}

/// A DKIM public key record.
#[derive(Clone, Debug, Eq, PartialEq)]
pub struct DkimKeyRecord {
    pub hash_algorithms: Box<[HashAlgorithm]>,  // non-empty
    pub key_type: KeyType,
    /// The decoded *p=* tag: DER of either a SubjectPublicKeyInfo or a bare
    /// RSAPublicKey structure.
    pub key_data: Box<[u8]>,
}

impl DkimKeyRecord {
    fn from_tag_list(tag_list: &TagList<'_>) -> Result<Self, DkimKeyRecordParseError> {
        let mut hash_algorithms = HashAlgorithm::all();
        let key_type = KeyType::Rsa;
        let mut key_data = None;

        for (i, &TagSpec { name, value }) in tag_list.as_ref().iter().enumerate() {
            match name {
                "v" => {
                    if i != 0 {
                        return Err(DkimKeyRecordParseError::MisplacedVersionTag);
                    }
                    if value != "DKIM1" {
                        return Err(DkimKeyRecordParseError::UnsupportedVersion);
                    }
                }
                "h" => {
                    hash_algorithms.clear();

                    // unknown hash algorithms are skipped
                    for s in parse_colon_separated_tag_value(value) {
                        let alg = HashAlgorithm::all()
                            .into_iter()
                            .find(|a| s.eq_ignore_ascii_case(a.canonical_str()));
                        if let Some(alg) = alg {
                            if !hash_algorithms.contains(&alg) {
                                hash_algorithms.push(alg);
                            }
                        }
                    }

                    if hash_algorithms.is_empty() {
                        return Err(DkimKeyRecordParseError::NoSupportedHashAlgorithms);
                    }
                }
                "k" => {
                    if !value.eq_ignore_ascii_case(key_type.canonical_str()) {
                        return Err(DkimKeyRecordParseError::UnsupportedKeyType);
                    }
                }
                "p" => {
                    if value.is_empty() {
                        return Err(DkimKeyRecordParseError::RevokedKey);
                    }

                    if !util::is_base64_charset(value) {
                        return Err(DkimKeyRecordParseError::InvalidBase64);
                    }
                    let s = util::decode_base64(&strip_fws_from_tag_value(value))
                        .map_err(|_| DkimKeyRecordParseError::InvalidBase64)?;

                    key_data = Some(s.into());
                }
                // §3.6.1: ‘Other tags MAY be present and MUST be ignored by any
                // implementation that does not understand them.’
                _ => {}
            }
        }

        let key_data = key_data.ok_or(DkimKeyRecordParseError::MissingKeyTag)?;

        Ok(Self {
            hash_algorithms: hash_algorithms.into(),
            key_type,
            key_data,
        })
    }

    /// Whether this key may be used with the given hash algorithm.
    pub fn allows_hash_algorithm(&self, hash_alg: HashAlgorithm) -> bool {
        self.hash_algorithms.contains(&hash_alg)
    }
}

impl FromStr for DkimKeyRecord {
    type Err = DkimKeyRecordParseError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let tag_list = match TagList::from_str(s) {
            Ok(r) => r,
            Err(_e) => {
                return Err(DkimKeyRecordParseError::TagListSyntax);
            }
        };

        Self::from_tag_list(&tag_list)
    }
}

/// Formats a public key as the text of a DKIM key record, suitable for
/// publishing in DNS at `<selector>._domainkey.<domain>`.
pub fn format_key_record(public_key: &RsaPublicKey) -> String {
    format!(
        "v=DKIM1; k={}; p={}",
        KeyType::Rsa.canonical_str(),
        util::encode_base64(public_key.to_spki_der())
    )
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::tag_list::TagList;

    #[test]
    fn dkim_key_record_from_tag_list_ok() {
        let tags = TagList::from_str("v=DKIM1; p=YW\r\n\tJj; k = rsa; n = notes;").unwrap();

        let dkim_key_record = DkimKeyRecord::from_tag_list(&tags).unwrap();

        assert_eq!(
            dkim_key_record,
            DkimKeyRecord {
                hash_algorithms: [HashAlgorithm::Sha1, HashAlgorithm::Sha256].into(),
                key_type: KeyType::Rsa,
                key_data: b"abc".to_vec().into(),
            }
        );
    }

    #[test]
    fn dkim_key_record_hash_algorithms() {
        let record: DkimKeyRecord = "v=DKIM1; h=SHA256 : md5; p=YWJj".parse().unwrap();

        assert!(record.allows_hash_algorithm(HashAlgorithm::Sha256));
        assert!(!record.allows_hash_algorithm(HashAlgorithm::Sha1));

        assert_eq!(
            "v=DKIM1; h=md5; p=YWJj".parse::<DkimKeyRecord>(),
            Err(DkimKeyRecordParseError::NoSupportedHashAlgorithms)
        );
    }

    #[test]
    fn dkim_key_record_from_str_errors() {
        use DkimKeyRecordParseError::*;

        let parse = |s: &str| s.parse::<DkimKeyRecord>().map(|_| ());

        assert_eq!(parse("v=DKIM1; p="), Err(RevokedKey));
        assert_eq!(parse("v=DKIM1; k=rsa"), Err(MissingKeyTag));
        assert_eq!(parse("v=DKIM2; p=YWJj"), Err(UnsupportedVersion));
        assert_eq!(parse("p=YWJj; v=DKIM1"), Err(MisplacedVersionTag));
        assert_eq!(parse("v=DKIM1; k=ed25519; p=YWJj"), Err(UnsupportedKeyType));
        assert_eq!(parse("v=DKIM1; p=YW;Jj"), Err(TagListSyntax));
        assert_eq!(parse("v=DKIM1; p=YW-Jj"), Err(InvalidBase64));
        assert_eq!(parse("v=DKIM1; p=YWJ"), Err(InvalidBase64));
        assert_eq!(parse("v=DKIM1; v=DKIM1; p=YWJj"), Err(TagListSyntax));

        assert_eq!(parse("p=YWJj"), Ok(()));
    }
}
