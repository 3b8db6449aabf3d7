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
    signature::{self, Canonicalization, SignatureAlgorithm},
    signer::ParameterError,
};
use std::time::SystemTime;

/// A generator for the body length limit tag.
#[derive(Clone, Copy, Debug, Default, Eq, Hash, PartialEq)]
pub enum BodyLength {
    /// Do not limit the body length: no *l=* tag.
    #[default]
    All,
    /// Sign only the body as presented: set *l=* to the canonicalized body
    /// length.
    OnlyMessageLength,
}

/// A generator for the timestamp tag.
#[derive(Clone, Copy, Debug, Default, Eq, Hash, PartialEq)]
pub enum Timestamp {
    #[default]
    Now,
    Exact(u64),
}

impl Timestamp {
    pub fn to_unix_secs(self) -> u64 {
        match self {
            Self::Now => SystemTime::now()
                .duration_since(SystemTime::UNIX_EPOCH)
                .map_or(0, |t| t.as_secs()),
            Self::Exact(t) => t,
        }
    }
}

/// Selection of headers to include in the h= tag.
#[derive(Clone, Debug, Default, Eq, PartialEq)]
pub enum HeaderSelection {
    /// Sign every header field present in the message, in message order.
    #[default]
    All,
    /// Sign the header fields present in the message whose names are given
    /// here (ignoring case), in message order.
    Manual(Vec<FieldName>),
}

impl HeaderSelection {
    pub fn includes(&self, name: &FieldName) -> bool {
        match self {
            Self::All => true,
            Self::Manual(names) => names.contains(name),
        }
    }
}

/// A request for creation of a DKIM signature.
#[derive(Clone, Debug, Eq, PartialEq)]
pub struct SignRequest {
    /// The signing domain to use in the *d=* tag.
    pub domain: String,
    /// The selector to use in the *s=* tag.
    pub selector: String,
    /// The signature algorithm to use in the *a=* tag.
    pub algorithm: SignatureAlgorithm,
    /// The agent or user identifier to use in the *i=* tag. When absent, the
    /// *i=* tag is `@` followed by the signing domain.
    pub identity: Option<String>,
    /// The canonicalization to use in the *c=* tag.
    pub canonicalization: Canonicalization,
    /// The selection of headers to include in the *h=* tag.
    pub header_selection: HeaderSelection,
    /// The strategy to use for generating the *l=* tag.
    pub body_length: BodyLength,
    /// The timestamp value to record in the *t=* tag.
    pub timestamp: Timestamp,
}

impl SignRequest {
    pub fn new(domain: impl Into<String>, selector: impl Into<String>) -> Self {
        Self {
            domain: domain.into(),
            selector: selector.into(),
            algorithm: SignatureAlgorithm::RsaSha256,
            identity: None,
            canonicalization: Default::default(),
            header_selection: Default::default(),
            body_length: Default::default(),
            timestamp: Default::default(),
        }
    }
}

// values end up verbatim in the tag list
fn is_tag_value_text(s: &str) -> bool {
    !s.is_empty() && !s.contains(|c: char| c == ';' || c.is_whitespace())
}

pub fn validate_request(request: &SignRequest) -> Result<(), ParameterError> {
    if !is_tag_value_text(&request.domain) || !is_tag_value_text(&request.selector) {
        return Err(ParameterError::InvalidTagValue);
    }

    if let Some(identity) = &request.identity {
        if !is_tag_value_text(identity) {
            return Err(ParameterError::InvalidTagValue);
        }
        if !signature::is_within_domain(identity, &request.domain) {
            return Err(ParameterError::IdentityNotInDomain);
        }
    }

    if let HeaderSelection::Manual(names) = &request.header_selection {
        if names.iter().any(|name| name.as_ref().contains(';')) {
            return Err(ParameterError::InvalidTagValue);
        }
    }

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn validate_request_identity() {
        let mut request = SignRequest::new("other.com", "sel");

        request.identity = Some("sales.other.com".into());
        assert_eq!(validate_request(&request), Ok(()));

        request.identity = Some("joe@Other.com".into());
        assert_eq!(validate_request(&request), Ok(()));

        request.domain = "wrong.com".into();
        assert_eq!(validate_request(&request), Err(ParameterError::IdentityNotInDomain));
    }

    #[test]
    fn validate_request_tag_values() {
        let request = SignRequest::new("example.com; x=1", "sel");
        assert_eq!(validate_request(&request), Err(ParameterError::InvalidTagValue));

        let request = SignRequest::new("example.com", "");
        assert_eq!(validate_request(&request), Err(ParameterError::InvalidTagValue));

        let mut request = SignRequest::new("example.com", "sel");
        request.header_selection = HeaderSelection::Manual(vec![FieldName::new("X;Y").unwrap()]);
        assert_eq!(validate_request(&request), Err(ParameterError::InvalidTagValue));
    }

    #[test]
    fn header_selection_includes() {
        let from = FieldName::new("From").unwrap();
        let to = FieldName::new("To").unwrap();

        assert!(HeaderSelection::All.includes(&from));

        let selection = HeaderSelection::Manual(vec![FieldName::new("FROM").unwrap()]);
        assert!(selection.includes(&from));
        assert!(!selection.includes(&to));
    }
}
