//! Representation of email header data and splitting of messages.

use std::{
    error::Error,
    fmt::{self, Debug, Display, Formatter},
    hash::{Hash, Hasher},
    str::FromStr,
};

pub type HeaderField = (FieldName, String);

#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub struct HeaderFieldError;

impl Display for HeaderFieldError {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        write!(f, "invalid header field")
    }
}

impl Error for HeaderFieldError {}

/// A header field name. Comparison and hashing ignore ASCII case.
#[derive(Clone, Eq)]
pub struct FieldName(Box<str>);

impl FieldName {
    pub fn new(value: impl Into<Box<str>>) -> Result<Self, HeaderFieldError> {
        let value = value.into();
        if value.is_empty() {
            return Err(HeaderFieldError);
        }
        if !value.chars().all(|c| c.is_ascii_graphic() && c != ':') {
            return Err(HeaderFieldError);
        }
        Ok(Self(value))
    }

    pub fn to_ascii_lowercase(&self) -> Self {
        Self(self.0.to_ascii_lowercase().into())
    }
}

impl AsRef<str> for FieldName {
    fn as_ref(&self) -> &str {
        &self.0
    }
}

impl Debug for FieldName {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        Debug::fmt(&self.0, f)
    }
}

impl Display for FieldName {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl PartialEq for FieldName {
    fn eq(&self, other: &Self) -> bool {
        self.0.eq_ignore_ascii_case(&other.0)
    }
}

impl PartialEq<&str> for FieldName {
    fn eq(&self, other: &&str) -> bool {
        self.0.eq_ignore_ascii_case(other)
    }
}

impl Hash for FieldName {
    fn hash<H: Hasher>(&self, state: &mut H) {
        self.0.to_ascii_lowercase().hash(state);
    }
}

/// An ordered collection of header fields.
///
/// Field values are stored as received after the colon, unfolded lines
/// included, each line terminated with CRLF.
#[derive(Clone, Debug, Default, Eq, PartialEq)]
pub struct HeaderFields(Vec<HeaderField>);

impl HeaderFields {
    pub fn new(fields: Vec<HeaderField>) -> Self {
        Self(fields)
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    /// Returns the first header field with the given name.
    pub fn find(&self, name: &str) -> Option<&HeaderField> {
        self.0.iter().find(|(n, _)| *n == name)
    }
}

impl AsRef<[HeaderField]> for HeaderFields {
    fn as_ref(&self) -> &[HeaderField] {
        &self.0
    }
}

impl From<HeaderFields> for Vec<HeaderField> {
    fn from(header_fields: HeaderFields) -> Self {
        header_fields.0
    }
}

impl FromStr for HeaderFields {
    type Err = MessageFormatError;

    /// Parses a header block. Parsing ends at the first empty line.
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let (headers, _) = split_message(s)?;
        Ok(headers)
    }
}

/// An error that occurs when a message cannot be split into header and body.
#[derive(Clone, Debug, Eq, Hash, PartialEq)]
pub struct MessageFormatError {
    pub line: String,
}

impl Display for MessageFormatError {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        write!(f, "unexpected line in message header: {:?}", self.line)
    }
}

impl Error for MessageFormatError {}

/// Splits an RFC 822 message into header fields and body.
///
/// Lines may be terminated with CRLF or LF. Continuation lines are appended to
/// the value of the preceding header field. An mbox `From ` envelope line is
/// skipped. The body lines following the first empty line are joined with
/// CRLF.
pub fn split_message(message: &str) -> Result<(HeaderFields, String), MessageFormatError> {
    let mut lines = message
        .split('\n')
        .map(|line| line.strip_suffix('\r').unwrap_or(line));

    let mut fields: Vec<HeaderField> = vec![];

    for line in lines.by_ref() {
        if line.is_empty() {
            break;
        }

        if line.starts_with([' ', '\t']) {
            match fields.last_mut() {
                Some((_, value)) => {
                    value.push_str(line);
                    value.push_str("\r\n");
                }
                None => return Err(MessageFormatError { line: line.into() }),
            }
        } else if let Some(name) = parse_field_name(line) {
            let mut value = String::from(&line[name.as_ref().len() + 1..]);
            value.push_str("\r\n");
            fields.push((name, value));
        } else if line.starts_with("From ") {
            // mbox envelope line
        } else {
            return Err(MessageFormatError { line: line.into() });
        }
    }

    let body = lines.collect::<Vec<_>>().join("\r\n");

    Ok((HeaderFields(fields), body))
}

fn parse_field_name(line: &str) -> Option<FieldName> {
    let (name, _) = line.split_once(':')?;
    FieldName::new(name).ok()
}
