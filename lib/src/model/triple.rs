use crate::model::literal::Literal;
use crate::model::uri::Uri;
use std::fmt;

/// An RDF term: either a [`Uri`] or a [`Literal`].
#[derive(Eq, PartialEq, Ord, PartialOrd, Debug, Clone, Hash)]
pub enum Term {
    Uri(Uri),
    Literal(Literal),
}

impl Term {
    /// Returns the inner URI if this term is one.
    #[inline]
    pub fn as_uri(&self) -> Option<&Uri> {
        if let Self::Uri(uri) = self {
            Some(uri)
        } else {
            None
        }
    }

    /// Returns the inner literal if this term is one.
    #[inline]
    pub fn as_literal(&self) -> Option<&Literal> {
        if let Self::Literal(literal) = self {
            Some(literal)
        } else {
            None
        }
    }
}

impl fmt::Display for Term {
    #[inline]
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Uri(uri) => uri.fmt(f),
            Self::Literal(literal) => literal.fmt(f),
        }
    }
}

impl From<Uri> for Term {
    #[inline]
    fn from(uri: Uri) -> Self {
        Self::Uri(uri)
    }
}

impl From<Literal> for Term {
    #[inline]
    fn from(literal: Literal) -> Self {
        Self::Literal(literal)
    }
}

/// An RDF triple: subject and predicate are URIs, the object is any term.
///
/// The default string formatter returns the N-Triples statement without the
/// terminating dot:
/// ```
/// use terndb::model::{Triple, Uri};
///
/// assert_eq!(
///     "<http://ex.org/s> <http://ex.org/p> \"o\"",
///     Triple::new(
///         Uri::new("http://ex.org/s"),
///         Uri::new("http://ex.org/p"),
///         terndb::model::Literal::new_simple_literal("o")
///     )
///     .to_string()
/// );
/// ```
#[derive(Eq, PartialEq, Ord, PartialOrd, Debug, Clone, Hash)]
pub struct Triple {
    pub subject: Uri,
    pub predicate: Uri,
    pub object: Term,
}

impl Triple {
    #[inline]
    pub fn new(subject: Uri, predicate: Uri, object: impl Into<Term>) -> Self {
        Self {
            subject,
            predicate,
            object: object.into(),
        }
    }
}

impl fmt::Display for Triple {
    #[inline]
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} {} {}", self.subject, self.predicate, self.object)
    }
}
