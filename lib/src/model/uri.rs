use std::fmt;

/// An owned RDF URI node.
///
/// The constructor strips the characters that cannot appear in an N-Triples
/// IRI reference instead of rejecting the input; no other validation is
/// performed. The default string formatter returns the N-Triples and Turtle
/// compatible representation:
/// ```
/// use terndb::model::Uri;
///
/// assert_eq!("<http://example.com/foo>", Uri::new("http://example.com/foo").to_string());
/// ```
#[derive(Eq, PartialEq, Ord, PartialOrd, Debug, Clone, Hash, Default)]
pub struct Uri {
    iri: String,
}

impl Uri {
    /// Builds a URI from a string, stripping the characters ``<>"{}|^`\``
    /// as well as characters in the range 0x00-0x20.
    pub fn new(iri: impl AsRef<str>) -> Self {
        let iri = iri.as_ref();
        let mut out = String::with_capacity(iri.len());
        for ch in iri.chars() {
            match ch {
                '<' | '>' | '"' | '{' | '}' | '|' | '^' | '`' | '\\' => (),
                _ if ch <= '\x20' => (),
                _ => out.push(ch),
            }
        }
        Self { iri: out }
    }

    /// Builds a URI from a string known to contain none of the characters
    /// [`Uri::new`] strips, e.g. one read back from the store.
    #[inline]
    pub(crate) fn new_unchecked(iri: impl Into<String>) -> Self {
        Self { iri: iri.into() }
    }

    #[inline]
    pub fn as_str(&self) -> &str {
        &self.iri
    }

    #[inline]
    pub fn into_string(self) -> String {
        self.iri
    }

    #[inline]
    pub fn is_empty(&self) -> bool {
        self.iri.is_empty()
    }

    /// Resolves this URI against the given base and returns the absolute
    /// URI. A URI that already carries a scheme is returned unmodified.
    ///
    /// ```
    /// use terndb::model::Uri;
    ///
    /// let base = Uri::new("http://example.com/");
    /// assert_eq!(Uri::new("doc").resolve(&base).as_str(), "http://example.com/doc");
    /// assert_eq!(Uri::new("#frag").resolve(&base).as_str(), "http://example.com/#frag");
    /// assert_eq!(Uri::new("http://other.org/x").resolve(&base).as_str(), "http://other.org/x");
    /// ```
    pub fn resolve(&self, base: &Uri) -> Uri {
        if base.is_empty() || has_scheme(&self.iri) {
            return self.clone();
        }
        let base = base.as_str();
        match self.iri.chars().next() {
            Some('/') => Self::new_unchecked(format!(
                "{}{}",
                base.strip_suffix('/').unwrap_or(base),
                self.iri
            )),
            Some('#') => Self::new_unchecked(format!(
                "{}{}",
                base.strip_suffix('#').unwrap_or(base),
                self.iri
            )),
            _ => {
                if base.ends_with('/') || base.ends_with('#') {
                    Self::new_unchecked(format!("{base}{}", self.iri))
                } else {
                    Self::new_unchecked(format!("{base}/{}", self.iri))
                }
            }
        }
    }
}

/// Checks for a leading `scheme:` per RFC 3986: an ALPHA followed by
/// ALPHA / DIGIT / `+` / `-` / `.` up to a colon.
fn has_scheme(iri: &str) -> bool {
    let mut chars = iri.chars();
    match chars.next() {
        Some(c) if c.is_ascii_alphabetic() => (),
        _ => return false,
    }
    for c in chars {
        match c {
            ':' => return true,
            c if c.is_ascii_alphanumeric() || matches!(c, '+' | '-' | '.') => (),
            _ => return false,
        }
    }
    false
}

impl fmt::Display for Uri {
    #[inline]
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "<{}>", self.iri)
    }
}

impl From<&str> for Uri {
    #[inline]
    fn from(iri: &str) -> Self {
        Self::new(iri)
    }
}

impl From<String> for Uri {
    #[inline]
    fn from(iri: String) -> Self {
        Self::new(iri)
    }
}

impl PartialEq<str> for Uri {
    #[inline]
    fn eq(&self, other: &str) -> bool {
        self.as_str() == other
    }
}

impl PartialEq<&str> for Uri {
    #[inline]
    fn eq(&self, other: &&str) -> bool {
        self == *other
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn new_strips_forbidden_characters() {
        assert_eq!(
            Uri::new("http://ex.org/a b<c>\"d\"{e}|f|^g`h\\i").as_str(),
            "http://ex.org/abcdefghi"
        );
        assert_eq!(Uri::new("http://ex.org/\x01\x1f ok").as_str(), "http://ex.org/ok");
    }

    #[test]
    fn resolve_relative_references() {
        let base = Uri::new("http://ex.org/ns");
        assert_eq!(Uri::new("/doc").resolve(&base).as_str(), "http://ex.org/ns/doc");
        assert_eq!(Uri::new("doc").resolve(&base).as_str(), "http://ex.org/ns/doc");

        let slashed = Uri::new("http://ex.org/");
        assert_eq!(Uri::new("/doc").resolve(&slashed).as_str(), "http://ex.org/doc");
        assert_eq!(Uri::new("doc").resolve(&slashed).as_str(), "http://ex.org/doc");
        assert_eq!(Uri::new("#me").resolve(&slashed).as_str(), "http://ex.org/#me");

        assert_eq!(
            Uri::new("urn:isbn:123").resolve(&slashed).as_str(),
            "urn:isbn:123"
        );
        assert_eq!(
            Uri::new("relative").resolve(&Uri::new("")).as_str(),
            "relative"
        );
    }
}
