use std::collections::HashSet;

fn is_fws(c: char) -> bool {
    matches!(c, ' ' | '\t' | '\r' | '\n')
}

pub fn trim_fws(s: &str) -> &str {
    s.trim_matches(is_fws)
}

/// Splits a colon-separated tag value such as the *h=* tag, trimming FWS
/// around the elements.
pub fn parse_colon_separated_tag_value(value: &str) -> Vec<&str> {
    value.split(':').map(trim_fws).collect()
}

pub fn strip_fws_from_tag_value(value: &str) -> String {
    value.chars().filter(|&c| !is_fws(c)).collect()
}

#[derive(Debug, PartialEq, Eq)]
pub struct TagSpec<'a> {
    pub name: &'a str,
    pub value: &'a str,
}

#[derive(Debug, PartialEq, Eq)]
pub enum TagListParseError {
    DuplicateTag,
    Syntax,
}

/// A list of `name=value` tags separated by semicolons.
///
/// Names and values are trimmed of surrounding FWS. Empty list elements (as
/// with a trailing semicolon) are ignored.
#[derive(Debug, PartialEq, Eq)]
pub struct TagList<'a>(Vec<TagSpec<'a>>);

impl<'a> AsRef<[TagSpec<'a>]> for TagList<'a> {
    fn as_ref(&self) -> &[TagSpec<'a>] {
        &self.0
    }
}

impl<'a> TagList<'a> {
    pub fn from_str(val: &'a str) -> Result<Self, TagListParseError> {
        let mut tags = vec![];
        let mut names_seen = HashSet::new();

        for spec in val.split(';') {
            if trim_fws(spec).is_empty() {
                continue;
            }

            let (name, value) = strip_tag_name_and_equals(spec).ok_or(TagListParseError::Syntax)?;

            if !names_seen.insert(name) {
                return Err(TagListParseError::DuplicateTag);
            }

            tags.push(TagSpec {
                name,
                value: trim_fws(value),
            });
        }

        Ok(TagList(tags))
    }
}

/// Splits a tag spec into its tag name and the rest following the `=`.
pub fn strip_tag_name_and_equals(spec: &str) -> Option<(&str, &str)> {
    let (name, rest) = spec.split_once('=')?;
    let name = trim_fws(name);
    is_tag_name(name).then_some((name, rest))
}

pub fn is_tag_name(s: &str) -> bool {
    let mut chars = s.chars();
    matches!(chars.next(), Some(c) if c.is_ascii_alphabetic())
        && chars.all(|c| c.is_ascii_alphanumeric() || c == '_')
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parse_colon_separated_tag_value_ok() {
        assert_eq!(
            parse_colon_separated_tag_value("ab:\r\n\tc\r\n\td : e"),
            ["ab", "c\r\n\td", "e"]
        );
        assert_eq!(parse_colon_separated_tag_value(""), [""]);
    }

    #[test]
    fn tag_list_from_str_ok() {
        let example = " v = 1 ; a=rsa-sha256;d=example.net; s=brisbane;
  c=simple; q=dns/txt; i=joe@eng.example.net;
  t=1117574938; x=1118006938;
  h=from:to:subject:date;
  bh=MTIzNDU2Nzg5MDEyMzQ1Njc4OTAxMjM0NTY3ODkwMTI=;
  b=dzdVyOfAKCdLXdJOc9G2q8LoXSlEniSbav+yuU4zGeeruD00lszZVoG4ZHRNiYzR";
        let example = example.replace('\n', "\r\n");

        let q = TagList::from_str(&example).unwrap();

        assert_eq!(q.as_ref().len(), 12);
        assert_eq!(q.as_ref()[0], TagSpec { name: "v", value: "1" });
        assert_eq!(q.as_ref()[10].value, "MTIzNDU2Nzg5MDEyMzQ1Njc4OTAxMjM0NTY3ODkwMTI=");
    }

    #[test]
    fn tag_list_from_str_errors() {
        assert_eq!(TagList::from_str("a=1; a=2"), Err(TagListParseError::DuplicateTag));
        assert_eq!(TagList::from_str("a=1; b"), Err(TagListParseError::Syntax));
        assert_eq!(TagList::from_str("1a=1"), Err(TagListParseError::Syntax));
        assert_eq!(TagList::from_str("a=1;;b=x=y;").unwrap().as_ref()[1].value, "x=y");
        assert!(TagList::from_str(" ").unwrap().as_ref().is_empty());
    }

    #[test]
    fn strip_tag_name_and_equals_ok() {
        assert_eq!(strip_tag_name_and_equals(" b = 2 "), Some(("b", " 2 ")));
        assert_eq!(strip_tag_name_and_equals(" b 2 "), None);
    }
}
