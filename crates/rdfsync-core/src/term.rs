//! RDF terms: IRIs, literals, and the [`Term`] sum of the two.
//!
//! An [`Iri`] can only be obtained through validation, so every IRI held by
//! a [`Statement`](crate::statement::Statement) or an
//! [`Operation`](crate::operation::Operation) is known to be absolute and
//! free of characters that would break N-Triples or SPARQL encoding.
//! Blank nodes are not modelled: the engine addresses entities by IRI only.
//!
//! The `Display` impls of [`Literal`] and [`Term`] produce N-Triples term
//! syntax, which is also valid SPARQL term syntax.

use std::fmt;

use serde::{Deserialize, Serialize};

use crate::datatype;
use crate::error::CoreError;
use crate::vocab::{rdf, xsd};

// ---------------------------------------------------------------------------
// Iri
// ---------------------------------------------------------------------------

/// An absolute IRI such as `http://example.org/people/1`.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct Iri(String);

impl Iri {
    /// Parses and validates an absolute IRI.
    pub fn new(value: impl Into<String>) -> Result<Self, CoreError> {
        let value = value.into();
        validate_iri(&value)?;
        Ok(Iri(value))
    }

    /// Wraps a compile-time vocabulary constant.
    ///
    /// Only used for the constants in [`crate::vocab`], which are known to be
    /// valid.
    pub(crate) fn from_static(value: &'static str) -> Self {
        debug_assert!(validate_iri(value).is_ok(), "invalid vocabulary IRI {value}");
        Iri(value.to_string())
    }

    /// Returns the IRI text without angle brackets.
    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// Returns the trailing segment after the last `#` or `/`.
    ///
    /// Useful for compact display; falls back to the whole IRI.
    pub fn local_name(&self) -> &str {
        self.0
            .rsplit(['#', '/'])
            .find(|segment| !segment.is_empty())
            .unwrap_or(&self.0)
    }
}

fn validate_iri(value: &str) -> Result<(), CoreError> {
    let invalid = |reason: &str| CoreError::InvalidIri {
        iri: value.to_string(),
        reason: reason.to_string(),
    };

    if value.is_empty() {
        return Err(invalid("empty"));
    }
    let Some((scheme, rest)) = value.split_once(':') else {
        return Err(invalid("missing scheme"));
    };
    let mut scheme_chars = scheme.chars();
    match scheme_chars.next() {
        Some(c) if c.is_ascii_alphabetic() => {}
        _ => return Err(invalid("scheme must start with a letter")),
    }
    if !scheme_chars.all(|c| c.is_ascii_alphanumeric() || matches!(c, '+' | '-' | '.')) {
        return Err(invalid("scheme contains invalid characters"));
    }
    if rest.is_empty() {
        return Err(invalid("nothing after scheme"));
    }
    if let Some(c) = value
        .chars()
        .find(|c| c.is_whitespace() || c.is_control() || "<>\"{}|^`\\".contains(*c))
    {
        return Err(invalid(&format!("contains forbidden character {c:?}")));
    }
    Ok(())
}

impl TryFrom<String> for Iri {
    type Error = CoreError;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        Iri::new(value)
    }
}

impl TryFrom<&str> for Iri {
    type Error = CoreError;

    fn try_from(value: &str) -> Result<Self, Self::Error> {
        Iri::new(value)
    }
}

impl From<Iri> for String {
    fn from(iri: Iri) -> Self {
        iri.0
    }
}

impl AsRef<str> for Iri {
    fn as_ref(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for Iri {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

// ---------------------------------------------------------------------------
// Literal
// ---------------------------------------------------------------------------

/// An RDF literal: a lexical form with an optional datatype or language tag.
///
/// A literal without datatype or language is a plain `xsd:string`. Values
/// built through the constructors or deserialized are canonical: an explicit
/// `xsd:string`, or `rdf:langString` next to a tag, is dropped, so two
/// literals compare equal exactly when they denote the same RDF term.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(from = "LiteralRepr")]
pub struct Literal {
    /// The lexical form, unescaped.
    pub lexical: String,
    /// Declared datatype, if any.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub datatype: Option<Iri>,
    /// Language tag, if any (lowercased).
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub language: Option<String>,
}

#[derive(Deserialize)]
struct LiteralRepr {
    lexical: String,
    #[serde(default)]
    datatype: Option<Iri>,
    #[serde(default)]
    language: Option<String>,
}

impl From<LiteralRepr> for Literal {
    fn from(repr: LiteralRepr) -> Self {
        Literal {
            lexical: repr.lexical,
            datatype: repr.datatype,
            language: repr.language,
        }
        .canonical()
    }
}

impl Literal {
    /// Creates a plain string literal.
    pub fn plain(lexical: impl Into<String>) -> Self {
        Literal {
            lexical: lexical.into(),
            datatype: None,
            language: None,
        }
    }

    /// Creates a typed literal, validating the lexical form against the
    /// datatype.
    pub fn typed(lexical: impl Into<String>, datatype: Iri) -> Result<Self, CoreError> {
        let literal = Literal {
            lexical: lexical.into(),
            datatype: Some(datatype),
            language: None,
        };
        literal.validate()?;
        Ok(literal.canonical())
    }

    /// Creates a language-tagged string literal.
    pub fn lang(lexical: impl Into<String>, tag: &str) -> Result<Self, CoreError> {
        let literal = Literal {
            lexical: lexical.into(),
            datatype: None,
            language: Some(tag.to_ascii_lowercase()),
        };
        literal.validate()?;
        Ok(literal)
    }

    /// Checks the lexical form against the datatype and the language tag
    /// against BCP 47 shape.
    pub fn validate(&self) -> Result<(), CoreError> {
        if let Some(tag) = &self.language {
            datatype::validate_language_tag(tag)?;
            if let Some(dt) = &self.datatype {
                if dt.as_str() != rdf::LANG_STRING {
                    return Err(CoreError::InvalidLanguageTag {
                        tag: tag.clone(),
                        reason: format!("cannot be combined with datatype <{dt}>"),
                    });
                }
            }
            return Ok(());
        }
        match &self.datatype {
            Some(dt) => datatype::validate_lexical(&self.lexical, dt),
            None => Ok(()),
        }
    }

    /// Drops a datatype that the plain or tagged form already implies.
    pub fn canonical(mut self) -> Self {
        let implied = match (&self.datatype, &self.language) {
            (Some(dt), None) => dt.as_str() == xsd::STRING,
            (Some(dt), Some(_)) => dt.as_str() == rdf::LANG_STRING,
            (None, _) => false,
        };
        if implied {
            self.datatype = None;
        }
        self
    }

    /// Returns the effective datatype IRI (`xsd:string` for plain literals,
    /// `rdf:langString` for tagged ones).
    pub fn effective_datatype(&self) -> &str {
        match (&self.datatype, &self.language) {
            (Some(dt), _) => dt.as_str(),
            (None, Some(_)) => rdf::LANG_STRING,
            (None, None) => xsd::STRING,
        }
    }
}

impl fmt::Display for Literal {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("\"")?;
        for c in self.lexical.chars() {
            match c {
                '"' => f.write_str("\\\"")?,
                '\\' => f.write_str("\\\\")?,
                '\n' => f.write_str("\\n")?,
                '\r' => f.write_str("\\r")?,
                '\t' => f.write_str("\\t")?,
                c => write!(f, "{c}")?,
            }
        }
        f.write_str("\"")?;
        if let Some(tag) = &self.language {
            write!(f, "@{tag}")
        } else if let Some(dt) = &self.datatype {
            write!(f, "^^<{dt}>")
        } else {
            Ok(())
        }
    }
}

// ---------------------------------------------------------------------------
// Term
// ---------------------------------------------------------------------------

/// The object position of a statement: either a resource or a literal.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Term {
    Iri(Iri),
    Literal(Literal),
}

impl Term {
    /// Parses an IRI-valued term.
    pub fn iri(value: &str) -> Result<Self, CoreError> {
        Iri::new(value).map(Term::Iri)
    }

    /// Creates a plain string literal term.
    pub fn literal(value: impl Into<String>) -> Self {
        Term::Literal(Literal::plain(value))
    }

    /// Creates a typed literal term.
    pub fn typed(value: impl Into<String>, datatype: &str) -> Result<Self, CoreError> {
        Literal::typed(value, Iri::new(datatype)?).map(Term::Literal)
    }

    /// Returns the IRI if this term names a resource.
    pub fn as_iri(&self) -> Option<&Iri> {
        match self {
            Term::Iri(iri) => Some(iri),
            Term::Literal(_) => None,
        }
    }

    /// Returns the literal if this term is one.
    pub fn as_literal(&self) -> Option<&Literal> {
        match self {
            Term::Literal(lit) => Some(lit),
            Term::Iri(_) => None,
        }
    }

    /// See [`Literal::canonical`]. IRIs are returned unchanged.
    pub fn canonical(self) -> Self {
        match self {
            Term::Literal(lit) => Term::Literal(lit.canonical()),
            iri => iri,
        }
    }

    /// Validates the literal content of this term (IRIs are valid by
    /// construction).
    pub fn validate(&self) -> Result<(), CoreError> {
        match self {
            Term::Iri(_) => Ok(()),
            Term::Literal(lit) => lit.validate(),
        }
    }
}

impl From<Iri> for Term {
    fn from(iri: Iri) -> Self {
        Term::Iri(iri)
    }
}

impl From<Literal> for Term {
    fn from(lit: Literal) -> Self {
        Term::Literal(lit)
    }
}

impl fmt::Display for Term {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Term::Iri(iri) => write!(f, "<{iri}>"),
            Term::Literal(lit) => write!(f, "{lit}"),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_iri_accepts_absolute() {
        let iri = Iri::new("http://example.org/people/1").unwrap();
        assert_eq!(iri.as_str(), "http://example.org/people/1");
        assert!(Iri::new("urn:uuid:4b1d").is_ok());
    }

    #[test]
    fn test_iri_rejects_malformed() {
        for bad in ["", "no-scheme", "1http://x", "http:", "http://a b", "http://a>b"] {
            assert!(
                matches!(Iri::new(bad), Err(CoreError::InvalidIri { .. })),
                "{bad:?} should be rejected"
            );
        }
    }

    #[test]
    fn test_local_name() {
        assert_eq!(Iri::new("http://xmlns.com/foaf/0.1/name").unwrap().local_name(), "name");
        assert_eq!(Iri::new("http://example.org/ns#Person").unwrap().local_name(), "Person");
        assert_eq!(Iri::new("http://example.org/x/").unwrap().local_name(), "x");
    }

    #[test]
    fn test_literal_display_escapes() {
        let lit = Literal::plain("say \"hi\"\n\\");
        assert_eq!(lit.to_string(), r#""say \"hi\"\n\\""#);
    }

    #[test]
    fn test_typed_and_tagged_display() {
        let typed = Literal::typed("42", Iri::new(xsd::INTEGER).unwrap()).unwrap();
        assert_eq!(
            typed.to_string(),
            "\"42\"^^<http://www.w3.org/2001/XMLSchema#integer>"
        );
        let tagged = Literal::lang("bonjour", "FR").unwrap();
        assert_eq!(tagged.to_string(), "\"bonjour\"@fr");
    }

    #[test]
    fn test_typed_literal_mismatch() {
        let err = Literal::typed("forty-two", Iri::new(xsd::INTEGER).unwrap()).unwrap_err();
        assert!(matches!(err, CoreError::DatatypeMismatch { .. }));
    }

    #[test]
    fn test_language_with_datatype_rejected() {
        let lit = Literal {
            lexical: "x".into(),
            datatype: Some(Iri::new(xsd::INTEGER).unwrap()),
            language: Some("en".into()),
        };
        assert!(matches!(
            lit.validate(),
            Err(CoreError::InvalidLanguageTag { .. })
        ));
    }

    #[test]
    fn test_implied_datatypes_are_dropped() {
        let explicit = Term::typed("Alice", xsd::STRING).unwrap();
        assert_eq!(explicit, Term::literal("Alice"));

        let tagged = Literal {
            lexical: "chat".into(),
            datatype: Some(Iri::new(rdf::LANG_STRING).unwrap()),
            language: Some("fr".into()),
        };
        assert_eq!(tagged.canonical(), Literal::lang("chat", "fr").unwrap());

        let json = r#"{"literal":{"lexical":"Alice",
            "datatype":"http://www.w3.org/2001/XMLSchema#string"}}"#;
        let decoded: Term = serde_json::from_str(json).unwrap();
        assert_eq!(decoded, Term::literal("Alice"));

        // Other datatypes are kept.
        let typed = Term::typed("42", xsd::INTEGER).unwrap();
        assert_eq!(typed.clone().canonical(), typed);
    }

    #[test]
    fn test_term_display() {
        let term = Term::iri("http://example.org/a").unwrap();
        assert_eq!(term.to_string(), "<http://example.org/a>");
        assert_eq!(Term::literal("Alice").to_string(), "\"Alice\"");
    }

    #[test]
    fn test_iri_serde_validates() {
        let ok: Iri = serde_json::from_str("\"http://example.org/a\"").unwrap();
        assert_eq!(ok.as_str(), "http://example.org/a");
        assert!(serde_json::from_str::<Iri>("\"not an iri\"").is_err());
    }
}
