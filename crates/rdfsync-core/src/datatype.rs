//! Lexical-form validation for the XSD datatypes the engine understands.
//!
//! Datatypes outside this set are treated as opaque and accept any lexical
//! form; the remote store remains the final authority on those.

use crate::error::CoreError;
use crate::term::Iri;
use crate::vocab::xsd;

/// Checks that `lexical` is a valid lexical form of `datatype`.
pub fn validate_lexical(lexical: &str, datatype: &Iri) -> Result<(), CoreError> {
    let valid = match datatype.as_str() {
        xsd::INTEGER | xsd::INT | xsd::LONG | xsd::SHORT => is_integer(lexical, true),
        xsd::NON_NEGATIVE_INTEGER => is_integer(lexical, false),
        xsd::DECIMAL => is_decimal(lexical),
        xsd::DOUBLE | xsd::FLOAT => is_double(lexical),
        xsd::BOOLEAN => matches!(lexical, "true" | "false" | "1" | "0"),
        xsd::DATE => is_date(lexical),
        xsd::DATE_TIME => is_date_time(lexical),
        xsd::ANY_URI => !lexical.chars().any(char::is_whitespace),
        _ => true,
    };
    if valid {
        Ok(())
    } else {
        Err(CoreError::DatatypeMismatch {
            lexical: lexical.to_string(),
            datatype: datatype.to_string(),
        })
    }
}

/// Checks the shape of a BCP 47 language tag: `primary(-subtag)*` with
/// alphabetic primary of 1-8 chars and alphanumeric subtags of 1-8 chars.
pub fn validate_language_tag(tag: &str) -> Result<(), CoreError> {
    let mut parts = tag.split('-');
    let primary_ok = parts
        .next()
        .is_some_and(|p| (1..=8).contains(&p.len()) && p.chars().all(|c| c.is_ascii_alphabetic()));
    let rest_ok =
        parts.all(|p| (1..=8).contains(&p.len()) && p.chars().all(|c| c.is_ascii_alphanumeric()));
    if primary_ok && rest_ok {
        Ok(())
    } else {
        Err(CoreError::InvalidLanguageTag {
            tag: tag.to_string(),
            reason: "expected primary(-subtag)* with 1-8 character parts".to_string(),
        })
    }
}

fn strip_sign(s: &str, allow_minus: bool) -> &str {
    match s.as_bytes().first() {
        Some(b'+') => &s[1..],
        Some(b'-') if allow_minus => &s[1..],
        _ => s,
    }
}

fn all_digits(s: &str) -> bool {
    !s.is_empty() && s.bytes().all(|b| b.is_ascii_digit())
}

fn is_integer(s: &str, allow_minus: bool) -> bool {
    all_digits(strip_sign(s, allow_minus))
}

fn is_decimal(s: &str) -> bool {
    let body = strip_sign(s, true);
    match body.split_once('.') {
        Some((int, frac)) => {
            (int.is_empty() || all_digits(int))
                && (frac.is_empty() || all_digits(frac))
                && !(int.is_empty() && frac.is_empty())
        }
        None => all_digits(body),
    }
}

fn is_double(s: &str) -> bool {
    matches!(s, "INF" | "+INF" | "-INF" | "NaN")
        || (!s.contains(char::is_alphabetic) || s.contains(['e', 'E'])) && s.parse::<f64>().is_ok()
}

fn is_date(s: &str) -> bool {
    let (date, _tz) = split_timezone(s);
    is_date_part(date)
}

fn is_date_time(s: &str) -> bool {
    let Some((date, time)) = s.split_once('T') else {
        return false;
    };
    let (time, _tz) = split_timezone(time);
    is_date_part(date) && is_time_part(time)
}

/// Splits a trailing `Z` or `±hh:mm` timezone designator off `s`.
fn split_timezone(s: &str) -> (&str, Option<&str>) {
    if let Some(stripped) = s.strip_suffix('Z') {
        return (stripped, Some("Z"));
    }
    if s.len() > 6 && s.is_char_boundary(s.len() - 6) {
        let (head, tail) = s.split_at(s.len() - 6);
        let bytes = tail.as_bytes();
        if tail.is_ascii()
            && matches!(bytes[0], b'+' | b'-')
            && all_digits(&tail[1..3])
            && bytes[3] == b':'
            && all_digits(&tail[4..6])
        {
            return (head, Some(tail));
        }
    }
    (s, None)
}

fn is_date_part(s: &str) -> bool {
    let body = s.strip_prefix('-').unwrap_or(s);
    let parts: Vec<&str> = body.split('-').collect();
    let [year, month, day] = parts.as_slice() else {
        return false;
    };
    year.len() >= 4
        && all_digits(year)
        && in_range(month, 1, 12)
        && in_range(day, 1, 31)
}

fn is_time_part(s: &str) -> bool {
    let (hms, frac) = match s.split_once('.') {
        Some((hms, frac)) => (hms, Some(frac)),
        None => (s, None),
    };
    let parts: Vec<&str> = hms.split(':').collect();
    let [h, m, sec] = parts.as_slice() else {
        return false;
    };
    in_range(h, 0, 24)
        && in_range(m, 0, 59)
        && in_range(sec, 0, 60)
        && frac.map_or(true, all_digits)
}

fn in_range(s: &str, min: u32, max: u32) -> bool {
    s.len() == 2 && all_digits(s) && s.parse::<u32>().is_ok_and(|v| (min..=max).contains(&v))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn dt(iri: &str) -> Iri {
        Iri::new(iri).unwrap()
    }

    #[test]
    fn test_integers() {
        assert!(validate_lexical("42", &dt(xsd::INTEGER)).is_ok());
        assert!(validate_lexical("-7", &dt(xsd::INTEGER)).is_ok());
        assert!(validate_lexical("+7", &dt(xsd::INT)).is_ok());
        assert!(validate_lexical("4.2", &dt(xsd::INTEGER)).is_err());
        assert!(validate_lexical("", &dt(xsd::INTEGER)).is_err());
        assert!(validate_lexical("-1", &dt(xsd::NON_NEGATIVE_INTEGER)).is_err());
    }

    #[test]
    fn test_decimals_and_doubles() {
        assert!(validate_lexical("3.14", &dt(xsd::DECIMAL)).is_ok());
        assert!(validate_lexical(".5", &dt(xsd::DECIMAL)).is_ok());
        assert!(validate_lexical(".", &dt(xsd::DECIMAL)).is_err());
        assert!(validate_lexical("1e10", &dt(xsd::DECIMAL)).is_err());
        assert!(validate_lexical("1e10", &dt(xsd::DOUBLE)).is_ok());
        assert!(validate_lexical("-INF", &dt(xsd::DOUBLE)).is_ok());
        assert!(validate_lexical("inf", &dt(xsd::DOUBLE)).is_err());
        assert!(validate_lexical("abc", &dt(xsd::DOUBLE)).is_err());
    }

    #[test]
    fn test_booleans() {
        for ok in ["true", "false", "1", "0"] {
            assert!(validate_lexical(ok, &dt(xsd::BOOLEAN)).is_ok());
        }
        assert!(validate_lexical("yes", &dt(xsd::BOOLEAN)).is_err());
    }

    #[test]
    fn test_dates() {
        assert!(validate_lexical("2024-02-29", &dt(xsd::DATE)).is_ok());
        assert!(validate_lexical("2024-02-29Z", &dt(xsd::DATE)).is_ok());
        assert!(validate_lexical("2024-13-01", &dt(xsd::DATE)).is_err());
        assert!(validate_lexical("2024-1-01", &dt(xsd::DATE)).is_err());
        assert!(validate_lexical("2024-05-01T10:30:00", &dt(xsd::DATE_TIME)).is_ok());
        assert!(validate_lexical("2024-05-01T10:30:00.125+02:00", &dt(xsd::DATE_TIME)).is_ok());
        assert!(validate_lexical("2024-05-01 10:30:00", &dt(xsd::DATE_TIME)).is_err());
    }

    #[test]
    fn test_unknown_datatype_is_opaque() {
        assert!(validate_lexical("anything", &dt("http://example.org/custom")).is_ok());
    }

    #[test]
    fn test_language_tags() {
        assert!(validate_language_tag("en").is_ok());
        assert!(validate_language_tag("en-gb").is_ok());
        assert!(validate_language_tag("zh-hant-tw").is_ok());
        assert!(validate_language_tag("").is_err());
        assert!(validate_language_tag("en_gb").is_err());
        assert!(validate_language_tag("toolongprimary").is_err());
    }
}
