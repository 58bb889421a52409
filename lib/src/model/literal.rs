use crate::error::LanguageTagParseError;
use crate::model::uri::Uri;
use crate::model::vocab::{rdf, xsd};
use std::fmt;
use std::fmt::Write;

/// An owned RDF literal: a lexical value with a datatype, and a language tag
/// when the datatype is `rdf:langString`.
///
/// The default string formatter returns the N-Triples and Turtle compatible
/// representation:
/// ```
/// use terndb::model::{Literal, Uri};
/// use terndb::model::vocab::xsd;
///
/// assert_eq!("\"foo\\nbar\"", Literal::new_simple_literal("foo\nbar").to_string());
/// assert_eq!(
///     "\"1.5\"^^<http://www.w3.org/2001/XMLSchema#double>",
///     Literal::new_typed_literal("1.5", Uri::new(xsd::DOUBLE)).to_string()
/// );
/// assert_eq!(
///     "\"foo\"@en",
///     Literal::new_language_tagged_literal("foo", "en")?.to_string()
/// );
/// # Result::<_, terndb::error::LanguageTagParseError>::Ok(())
/// ```
#[derive(Eq, PartialEq, Ord, PartialOrd, Debug, Clone, Hash)]
pub struct Literal(LiteralContent);

#[derive(Eq, PartialEq, Ord, PartialOrd, Debug, Clone, Hash)]
enum LiteralContent {
    String(String),
    LanguageTaggedString { value: String, language: String },
    TypedLiteral { value: String, datatype: Uri },
}

impl Literal {
    /// Builds an `xsd:string` literal.
    #[inline]
    pub fn new_simple_literal(value: impl Into<String>) -> Self {
        Self(LiteralContent::String(value.into()))
    }

    /// Builds a literal with the given datatype.
    #[inline]
    pub fn new_typed_literal(value: impl Into<String>, datatype: impl Into<Uri>) -> Self {
        let value = value.into();
        let datatype = datatype.into();
        Self(if datatype == xsd::STRING {
            LiteralContent::String(value)
        } else {
            LiteralContent::TypedLiteral { value, datatype }
        })
    }

    /// Builds an `rdf:langString` literal.
    ///
    /// The language tag must be non-empty, at most 255 bytes (the size of the
    /// length prefix in the term encoding), and made of ASCII letters, digits
    /// and hyphens.
    #[inline]
    pub fn new_language_tagged_literal(
        value: impl Into<String>,
        language: impl Into<String>,
    ) -> Result<Self, LanguageTagParseError> {
        let language = language.into();
        if language.is_empty() {
            return Err(LanguageTagParseError { msg: "empty tag" });
        }
        if language.len() > 255 {
            return Err(LanguageTagParseError {
                msg: "tag longer than 255 bytes",
            });
        }
        if !language
            .bytes()
            .all(|b| b.is_ascii_alphanumeric() || b == b'-')
        {
            return Err(LanguageTagParseError {
                msg: "tag contains a character outside [a-zA-Z0-9-]",
            });
        }
        Ok(Self::new_language_tagged_literal_unchecked(value, language))
    }

    /// Builds an `rdf:langString` literal from a tag already known to be
    /// well-formed, e.g. one read back from the store.
    #[inline]
    pub fn new_language_tagged_literal_unchecked(
        value: impl Into<String>,
        language: impl Into<String>,
    ) -> Self {
        Self(LiteralContent::LanguageTaggedString {
            value: value.into(),
            language: language.into(),
        })
    }

    /// The lexical value of this literal.
    #[inline]
    pub fn value(&self) -> &str {
        match &self.0 {
            LiteralContent::String(value)
            | LiteralContent::LanguageTaggedString { value, .. }
            | LiteralContent::TypedLiteral { value, .. } => value,
        }
    }

    /// The language tag, for `rdf:langString` literals.
    #[inline]
    pub fn language(&self) -> Option<&str> {
        if let LiteralContent::LanguageTaggedString { language, .. } = &self.0 {
            Some(language)
        } else {
            None
        }
    }

    /// The datatype IRI of this literal.
    #[inline]
    pub fn datatype(&self) -> &str {
        match &self.0 {
            LiteralContent::String(_) => xsd::STRING,
            LiteralContent::LanguageTaggedString { .. } => rdf::LANG_STRING,
            LiteralContent::TypedLiteral { datatype, .. } => datatype.as_str(),
        }
    }
}

impl fmt::Display for Literal {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match &self.0 {
            LiteralContent::String(value) => print_quoted_str(value, f),
            LiteralContent::LanguageTaggedString { value, language } => {
                print_quoted_str(value, f)?;
                write!(f, "@{language}")
            }
            LiteralContent::TypedLiteral { value, datatype } => {
                print_quoted_str(value, f)?;
                write!(f, "^^{datatype}")
            }
        }
    }
}

impl From<&str> for Literal {
    #[inline]
    fn from(value: &str) -> Self {
        Self::new_simple_literal(value)
    }
}

impl From<String> for Literal {
    #[inline]
    fn from(value: String) -> Self {
        Self::new_simple_literal(value)
    }
}

impl From<bool> for Literal {
    #[inline]
    fn from(value: bool) -> Self {
        Self::new_typed_literal(value.to_string(), Uri::new_unchecked(xsd::BOOLEAN))
    }
}

impl From<i8> for Literal {
    #[inline]
    fn from(value: i8) -> Self {
        Self::new_typed_literal(value.to_string(), Uri::new_unchecked(xsd::BYTE))
    }
}

impl From<i16> for Literal {
    #[inline]
    fn from(value: i16) -> Self {
        Self::new_typed_literal(value.to_string(), Uri::new_unchecked(xsd::SHORT))
    }
}

impl From<i32> for Literal {
    #[inline]
    fn from(value: i32) -> Self {
        Self::new_typed_literal(value.to_string(), Uri::new_unchecked(xsd::INT))
    }
}

impl From<i64> for Literal {
    #[inline]
    fn from(value: i64) -> Self {
        Self::new_typed_literal(value.to_string(), Uri::new_unchecked(xsd::LONG))
    }
}

impl From<u8> for Literal {
    #[inline]
    fn from(value: u8) -> Self {
        Self::new_typed_literal(value.to_string(), Uri::new_unchecked(xsd::UNSIGNED_BYTE))
    }
}

impl From<u16> for Literal {
    #[inline]
    fn from(value: u16) -> Self {
        Self::new_typed_literal(value.to_string(), Uri::new_unchecked(xsd::UNSIGNED_SHORT))
    }
}

impl From<u32> for Literal {
    #[inline]
    fn from(value: u32) -> Self {
        Self::new_typed_literal(value.to_string(), Uri::new_unchecked(xsd::UNSIGNED_INT))
    }
}

impl From<u64> for Literal {
    #[inline]
    fn from(value: u64) -> Self {
        Self::new_typed_literal(value.to_string(), Uri::new_unchecked(xsd::UNSIGNED_LONG))
    }
}

impl From<f32> for Literal {
    #[inline]
    fn from(value: f32) -> Self {
        Self::new_typed_literal(value.to_string(), Uri::new_unchecked(xsd::FLOAT))
    }
}

impl From<f64> for Literal {
    #[inline]
    fn from(value: f64) -> Self {
        Self::new_typed_literal(value.to_string(), Uri::new_unchecked(xsd::DOUBLE))
    }
}

/// Prints a string in its quoted Turtle form: the named escapes for
/// `\t \b \n \r \f \\ \"` and `\uXXXX` for the remaining control characters.
pub(crate) fn print_quoted_str(string: &str, f: &mut impl Write) -> fmt::Result {
    f.write_char('"')?;
    for c in string.chars() {
        match c {
            '\u{08}' => f.write_str("\\b"),
            '\t' => f.write_str("\\t"),
            '\n' => f.write_str("\\n"),
            '\u{0C}' => f.write_str("\\f"),
            '\r' => f.write_str("\\r"),
            '"' => f.write_str("\\\""),
            '\\' => f.write_str("\\\\"),
            c if c < '\u{20}' || c == '\u{7F}' => write!(f, "\\u{:04X}", u32::from(c)),
            c => f.write_char(c),
        }?
    }
    f.write_char('"')
}
