//! Canonicalization utilities.

use crate::{
    header::HeaderFields,
    signature::CanonicalizationAlgorithm,
};

const CRLF: &str = "\r\n";

fn is_wsp(c: char) -> bool {
    matches!(c, ' ' | '\t')
}

// collapses runs of WSP to a single space
fn compress_wsp(s: &str) -> String {
    let mut result = String::with_capacity(s.len());
    let mut in_wsp = false;
    for c in s.chars() {
        if is_wsp(c) {
            if !in_wsp {
                result.push(' ');
                in_wsp = true;
            }
        } else {
            result.push(c);
            in_wsp = false;
        }
    }
    result
}

/// Canonicalizes a single header field, returning name and value.
///
/// The value is expected as stored in [`HeaderFields`], that is, including
/// line terminators. Relaxed canonicalization always produces a value ending
/// in a single CRLF.
pub fn canonicalize_header(
    alg: CanonicalizationAlgorithm,
    name: &str,
    value: &str,
) -> (String, String) {
    match alg {
        CanonicalizationAlgorithm::Simple => (name.into(), value.into()),
        CanonicalizationAlgorithm::Relaxed => {
            let unfolded = value.replace(CRLF, "");
            let mut value = compress_wsp(&unfolded).trim_matches(is_wsp).to_owned();
            value.push_str(CRLF);
            (name.to_ascii_lowercase(), value)
        }
    }
}

/// Canonicalizes all header fields, preserving order.
pub fn canonicalize_headers(alg: CanonicalizationAlgorithm, headers: &HeaderFields) -> HeaderFields {
    let fields = headers
        .as_ref()
        .iter()
        .map(|(name, value)| {
            let (_, value) = canonicalize_header(alg, name.as_ref(), value);
            let name = match alg {
                CanonicalizationAlgorithm::Simple => name.clone(),
                CanonicalizationAlgorithm::Relaxed => name.to_ascii_lowercase(),
            };
            (name, value)
        })
        .collect();
    HeaderFields::new(fields)
}

/// Canonicalizes a message body.
///
/// Both algorithms reduce any trailing run of empty lines to a single CRLF,
/// so that an empty body becomes CRLF.
pub fn canonicalize_body(alg: CanonicalizationAlgorithm, body: &str) -> String {
    let body = match alg {
        CanonicalizationAlgorithm::Simple => body.to_owned(),
        CanonicalizationAlgorithm::Relaxed => body
            .split(CRLF)
            .map(|line| compress_wsp(line.trim_end_matches(is_wsp)))
            .collect::<Vec<_>>()
            .join(CRLF),
    };

    let mut result = body.trim_end_matches(CRLF).to_owned();
    result.push_str(CRLF);
    result
}

#[cfg(test)]
mod tests {
    use super::*;
    use CanonicalizationAlgorithm::*;

    #[test]
    fn canonicalize_header_relaxed() {
        assert_eq!(
            canonicalize_header(Relaxed, "SubJect", " AbC\r\n\t  dEf \t\r\n"),
            ("subject".to_owned(), "AbC dEf\r\n".to_owned())
        );
        assert_eq!(
            canonicalize_header(Relaxed, "X", "\r\n"),
            ("x".to_owned(), "\r\n".to_owned())
        );
    }

    #[test]
    fn canonicalize_header_simple() {
        assert_eq!(
            canonicalize_header(Simple, "SubJect", " AbC\r\n\t  dEf \t\r\n"),
            ("SubJect".to_owned(), " AbC\r\n\t  dEf \t\r\n".to_owned())
        );
    }

    #[test]
    fn canonicalize_headers_relaxed_ignores_case_and_spacing() {
        let a: HeaderFields = "Subject:  Hello   World\n".parse().unwrap();
        let b: HeaderFields = "SUBJECT: Hello\n\tWorld\n".parse().unwrap();

        let a = canonicalize_headers(Relaxed, &a);
        let b = canonicalize_headers(Relaxed, &b);

        assert_eq!(a, b);
        assert_eq!(a.as_ref()[0].0.as_ref(), "subject");
        assert_eq!(a.as_ref()[0].1, "Hello World\r\n");
    }

    #[test]
    fn canonicalize_body_relaxed() {
        assert_eq!(canonicalize_body(Relaxed, "line1 \r\nline2\t\r\n\r\n\r\n"), "line1\r\nline2\r\n");
        assert_eq!(canonicalize_body(Relaxed, " C \r\nD \t E\r\n\r\n\r\n"), " C\r\nD E\r\n");
        assert_eq!(canonicalize_body(Relaxed, ""), "\r\n");
        assert_eq!(canonicalize_body(Relaxed, "no newline  "), "no newline\r\n");
    }

    #[test]
    fn canonicalize_body_simple() {
        assert_eq!(canonicalize_body(Simple, " C \r\nD \t E\r\n\r\n\r\n"), " C \r\nD \t E\r\n");
        assert_eq!(canonicalize_body(Simple, ""), "\r\n");
        assert_eq!(canonicalize_body(Simple, "\r\n\r\n"), "\r\n");
        assert_eq!(canonicalize_body(Simple, "abc"), "abc\r\n");
    }

    #[test]
    fn canonicalize_body_idempotent() {
        let bodies = ["", "a\r\n", " x \t y \r\n\r\n", "\r\n\r\nz  \r\n \r\n"];

        for alg in [Simple, Relaxed] {
            for body in bodies {
                let once = canonicalize_body(alg, body);
                assert_eq!(canonicalize_body(alg, &once), once);
            }
        }
    }
}
