//! Request line grammar.
//!
//! ```text
//! Request         := DriftRequest | StandardRequest
//! DriftRequest    := "DRIFT" SP Params CRLF [RawBytes(size)]
//! Params          := "size=" Digits (";" | SP) "token=" Token   ; order-independent
//! StandardRequest := *( "Accept:" ... CRLF ) Locator CRLF
//! ```

use crate::protocol::error::RequestError;

/// Keyword opening an upload request.
pub const DRIFT_KEYWORD: &str = "DRIFT";

const HEADER_PREFIX: &str = "accept:";

/// A parsed request line.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Request {
    /// Fetch the resource named by `locator`.
    Standard { locator: String },
    /// Upload exactly `size` raw bytes, authorized by `token`.
    Drift { size: u64, token: String },
}

/// True for `Accept:` header lines, which precede the locator and are skipped.
pub fn is_header_line(line: &str) -> bool {
    line.get(..HEADER_PREFIX.len())
        .is_some_and(|prefix| prefix.eq_ignore_ascii_case(HEADER_PREFIX))
}

/// Classify one non-empty, non-header request line.
///
/// Any line that is not a Drift directive is taken as a locator verbatim;
/// locator validity is checked when the resource path is prepared.
pub fn parse(line: &str) -> Result<Request, RequestError> {
    let line = line.trim();

    let mut words = line.splitn(2, char::is_whitespace);
    if words.next() != Some(DRIFT_KEYWORD) {
        return Ok(Request::Standard {
            locator: line.to_string(),
        });
    }

    let params = words.next().map(str::trim).unwrap_or_default();
    if params.is_empty() {
        return Err(RequestError::MalformedDrift);
    }

    parse_drift_params(params)
}

fn parse_drift_params(params: &str) -> Result<Request, RequestError> {
    let mut size = None;
    let mut token = None;

    for pair in params
        .split(|c: char| c == ';' || c.is_whitespace())
        .filter(|p| !p.is_empty())
    {
        let Some((key, value)) = pair.split_once('=') else {
            continue;
        };
        match key {
            "size" if size.is_none() => size = parse_size(value),
            "token" if token.is_none() => token = parse_token(value),
            _ => {}
        }
    }

    match (size, token) {
        (Some(size), Some(token)) => Ok(Request::Drift { size, token }),
        _ => Err(RequestError::MissingDriftParam),
    }
}

fn parse_size(value: &str) -> Option<u64> {
    if value.is_empty() || !value.bytes().all(|b| b.is_ascii_digit()) {
        return None;
    }
    value.parse().ok()
}

fn parse_token(value: &str) -> Option<String> {
    if value.is_empty() || !value.bytes().all(|b| b.is_ascii_alphanumeric()) {
        return None;
    }
    Some(value.to_string())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn locator_line_is_standard() {
        assert_eq!(
            parse("sky://localhost/index.sky").unwrap(),
            Request::Standard {
                locator: "sky://localhost/index.sky".into()
            }
        );
    }

    #[test]
    fn any_text_is_a_locator() {
        assert_eq!(
            parse("  not a url  ").unwrap(),
            Request::Standard {
                locator: "not a url".into()
            }
        );
    }

    #[test]
    fn drift_with_semicolon() {
        assert_eq!(
            parse("DRIFT size=5;token=VALIDTOKEN").unwrap(),
            Request::Drift {
                size: 5,
                token: "VALIDTOKEN".into()
            }
        );
    }

    #[test]
    fn drift_params_are_order_independent() {
        assert_eq!(
            parse("DRIFT token=deadBEEF size=1024").unwrap(),
            Request::Drift {
                size: 1024,
                token: "deadBEEF".into()
            }
        );
    }

    #[test]
    fn drift_ignores_unknown_params() {
        assert_eq!(
            parse("DRIFT mime=text/sky;size=3;token=abc").unwrap(),
            Request::Drift {
                size: 3,
                token: "abc".into()
            }
        );
    }

    #[test]
    fn drift_without_params_is_malformed() {
        assert_eq!(parse("DRIFT").unwrap_err(), RequestError::MalformedDrift);
        assert_eq!(parse("DRIFT   ").unwrap_err(), RequestError::MalformedDrift);
    }

    #[test]
    fn drift_missing_token_or_size() {
        assert_eq!(
            parse("DRIFT size=5").unwrap_err(),
            RequestError::MissingDriftParam
        );
        assert_eq!(
            parse("DRIFT token=abc").unwrap_err(),
            RequestError::MissingDriftParam
        );
    }

    #[test]
    fn drift_rejects_bad_values() {
        for line in [
            "DRIFT size=-1;token=abc",
            "DRIFT size=5x;token=abc",
            "DRIFT size=;token=abc",
            "DRIFT size=5;token=",
            "DRIFT size=5;token=ab-cd",
            "DRIFT size=99999999999999999999999;token=abc",
        ] {
            assert_eq!(
                parse(line).unwrap_err(),
                RequestError::MissingDriftParam,
                "{line}"
            );
        }
    }

    #[test]
    fn keyword_must_stand_alone() {
        assert_eq!(
            parse("DRIFTER").unwrap(),
            Request::Standard {
                locator: "DRIFTER".into()
            }
        );
    }

    #[test]
    fn header_detection_is_case_insensitive() {
        assert!(is_header_line("Accept: text/sky"));
        assert!(is_header_line("ACCEPT:*/*"));
        assert!(is_header_line("accept:"));
        assert!(!is_header_line("Accepted"));
        assert!(!is_header_line("sky://host/accept:"));
        assert!(!is_header_line("é"));
    }
}
