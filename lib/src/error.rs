use std::error::Error;
use std::fmt;
use std::io;

/// An error related to storage operations (reads, writes...).
#[derive(Debug, thiserror::Error)]
#[non_exhaustive]
pub enum StorageError {
    /// The looked-up term or triple is not stored.
    #[error("not found")]
    NotFound,
    /// The term id space is exhausted.
    ///
    /// Term ids are 32 bits and are never reused, so a database that has
    /// allocated 2³²−1 ids cannot accept new terms. It stays usable for
    /// reads and for deletes.
    #[error("database full: term id limit reached")]
    Full,
    /// A language tag or datatype IRI does not fit the length-prefixed term
    /// encoding. Checked when a triple is inserted.
    #[error("{0} is longer than the 255 bytes the term encoding supports")]
    TermTooBig(&'static str),
    /// Stored data cannot be decoded.
    #[error(transparent)]
    Corruption(#[from] CorruptionError),
    /// An internal invariant was violated. This is a defect in the store,
    /// not in the caller's data.
    #[error("bug: {0}")]
    Bug(&'static str),
    /// Error from the OS I/O layer or the key-value engine.
    #[error(transparent)]
    Io(#[from] io::Error),
}

impl From<StorageError> for io::Error {
    #[inline]
    fn from(error: StorageError) -> Self {
        match error {
            StorageError::Io(error) => error,
            StorageError::Corruption(error) => error.into(),
            StorageError::NotFound => Self::new(io::ErrorKind::NotFound, error.to_string()),
            _ => Self::other(error.to_string()),
        }
    }
}

/// An error returned if some content of the database is corrupted.
#[derive(Debug, thiserror::Error)]
#[error("{msg}")]
pub struct CorruptionError {
    msg: String,
}

impl CorruptionError {
    /// Builds an error from a printable error message.
    #[inline]
    pub(crate) fn msg(msg: impl Into<String>) -> Self {
        Self { msg: msg.into() }
    }
}

impl From<CorruptionError> for io::Error {
    #[inline]
    fn from(error: CorruptionError) -> Self {
        Self::new(io::ErrorKind::InvalidData, error)
    }
}

/// An error raised while bulk-loading triples into the store.
///
/// Batches commit independently, so `committed` reports how many triples
/// were durably written before the failing batch rolled back.
#[derive(Debug, thiserror::Error)]
#[error("import aborted after {committed} committed triples")]
pub struct ImportError {
    pub committed: usize,
    #[source]
    pub source: StorageError,
}

/// A syntax error in a Turtle or N-Triples stream, with its position.
#[derive(Debug, Clone, thiserror::Error)]
#[error("parse error at line {line}, column {column}: {msg}")]
pub struct SyntaxError {
    pub(crate) line: u64,
    pub(crate) column: u64,
    pub(crate) msg: String,
}

impl SyntaxError {
    /// The 1-based line of the offending token.
    #[inline]
    pub fn line(&self) -> u64 {
        self.line
    }

    /// The 1-based column of the offending token.
    #[inline]
    pub fn column(&self) -> u64 {
        self.column
    }
}

/// An error while reading a Turtle or N-Triples stream: either invalid
/// syntax or an I/O failure of the underlying reader.
///
/// During bulk import only the syntax kind is recoverable (the statement is
/// dropped); an I/O failure terminates the import.
#[derive(Debug, thiserror::Error)]
pub enum TurtleParseError {
    #[error(transparent)]
    Syntax(#[from] SyntaxError),
    #[error(transparent)]
    Io(#[from] io::Error),
}

/// An invalid language tag given to [`Literal::new_language_tagged_literal`](crate::model::Literal::new_language_tagged_literal).
#[derive(Debug, Clone)]
pub struct LanguageTagParseError {
    pub(crate) msg: &'static str,
}

impl fmt::Display for LanguageTagParseError {
    #[inline]
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "invalid language tag: {}", self.msg)
    }
}

impl Error for LanguageTagParseError {}
