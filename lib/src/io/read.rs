//! Streaming reader for N-Triples and the Turtle subset the dump emits:
//! `@base` and `@prefix` directives, relative IRI references, prefixed
//! names, the `a` keyword, `;`/`,` continuations and quoted literals with
//! language tags or datatypes.

use crate::error::{SyntaxError, TurtleParseError};
use crate::model::vocab::rdf;
use crate::model::{Literal, Term, Triple, Uri};
use std::collections::HashMap;
use std::io::BufRead;

#[derive(Debug, Clone, PartialEq, Eq)]
enum Token {
    Eof,
    /// `<…>`, unescaped.
    IriRef(String),
    /// `ns:local` or `:local`.
    PrefixedName { prefix: String, local: String },
    /// `_:label`.
    BlankNode,
    /// `"…"`, unescaped.
    String(String),
    /// `@word`: a directive or a language tag, depending on position.
    At(String),
    /// `^^`.
    Caret,
    /// The `a` keyword.
    A,
    Comma,
    Semicolon,
    Dot,
}

/// A line-buffered tokenizer with one token of pushback.
struct Scanner<R: BufRead> {
    reader: R,
    line: String,
    pos: usize,
    row: u64,
    col: u64,
    eof: bool,
    peeked: Option<Token>,
}

impl<R: BufRead> Scanner<R> {
    fn new(reader: R) -> Self {
        Self {
            reader,
            line: String::new(),
            pos: 0,
            row: 0,
            col: 0,
            eof: false,
            peeked: None,
        }
    }

    fn error(&self, msg: impl Into<String>) -> SyntaxError {
        SyntaxError {
            line: self.row.max(1),
            column: self.col,
            msg: msg.into(),
        }
    }

    fn peek_char(&mut self) -> Result<Option<char>, TurtleParseError> {
        loop {
            if let Some(c) = self.line[self.pos..].chars().next() {
                return Ok(Some(c));
            }
            if self.eof {
                return Ok(None);
            }
            self.line.clear();
            self.pos = 0;
            if self.reader.read_line(&mut self.line)? == 0 {
                self.eof = true;
            } else {
                self.row += 1;
                self.col = 0;
            }
        }
    }

    fn next_char(&mut self) -> Result<Option<char>, TurtleParseError> {
        let c = self.peek_char()?;
        if let Some(c) = c {
            self.pos += c.len_utf8();
            self.col += 1;
        }
        Ok(c)
    }

    fn unread(&mut self, token: Token) {
        self.peeked = Some(token);
    }

    fn next_token(&mut self) -> Result<Token, TurtleParseError> {
        if let Some(token) = self.peeked.take() {
            return Ok(token);
        }
        loop {
            let Some(c) = self.next_char()? else {
                return Ok(Token::Eof);
            };
            return Ok(match c {
                ' ' | '\t' | '\r' | '\n' => continue,
                '#' => {
                    // comment until end of line
                    while !matches!(self.peek_char()?, None | Some('\n')) {
                        self.next_char()?;
                    }
                    continue;
                }
                '<' => Token::IriRef(self.scan_delimited('>', "IRI reference")?),
                '"' => Token::String(self.scan_delimited('"', "string literal")?),
                '@' => Token::At(self.scan_word()?),
                '^' => {
                    if self.next_char()? != Some('^') {
                        return Err(self.error("expected a second '^'").into());
                    }
                    Token::Caret
                }
                '.' => Token::Dot,
                ',' => Token::Comma,
                ';' => Token::Semicolon,
                '_' => {
                    if self.next_char()? != Some(':') {
                        return Err(self.error("expected ':' after '_'").into());
                    }
                    self.scan_word()?;
                    Token::BlankNode
                }
                c => {
                    let mut word = String::new();
                    word.push(c);
                    word.push_str(&self.scan_word()?);
                    if word == "a" {
                        Token::A
                    } else if let Some(colon) = word.find(':') {
                        Token::PrefixedName {
                            prefix: word[..colon].to_owned(),
                            local: word[colon + 1..].to_owned(),
                        }
                    } else {
                        return Err(self.error(format!("unexpected token {word:?}")).into());
                    }
                }
            });
        }
    }

    /// Scans until the closing delimiter on the same line, unescaping.
    fn scan_delimited(
        &mut self,
        stop: char,
        what: &str,
    ) -> Result<String, TurtleParseError> {
        let mut out = String::new();
        loop {
            match self.next_char()? {
                None | Some('\n') => {
                    return Err(self.error(format!("unterminated {what}")).into());
                }
                Some(c) if c == stop => return Ok(out),
                Some('\\') => out.push(self.scan_escape()?),
                Some(c) => out.push(c),
            }
        }
    }

    fn scan_escape(&mut self) -> Result<char, TurtleParseError> {
        Ok(match self.next_char()? {
            Some('t') => '\t',
            Some('b') => '\u{08}',
            Some('n') => '\n',
            Some('r') => '\r',
            Some('f') => '\u{0C}',
            Some('"') => '"',
            Some('\'') => '\'',
            Some('\\') => '\\',
            Some('u') => self.scan_unicode_escape(4)?,
            Some('U') => self.scan_unicode_escape(8)?,
            _ => return Err(self.error("illegal escape sequence").into()),
        })
    }

    fn scan_unicode_escape(&mut self, digits: u32) -> Result<char, TurtleParseError> {
        let mut value = 0;
        for _ in 0..digits {
            let digit = self
                .next_char()?
                .and_then(|c| c.to_digit(16))
                .ok_or_else(|| self.error("illegal escape sequence"))?;
            value = value * 16 + digit;
        }
        char::from_u32(value)
            .ok_or_else(|| self.error("escape sequence is not a Unicode scalar value").into())
    }

    /// Scans the remainder of a bare word: everything up to whitespace or a
    /// delimiter character.
    fn scan_word(&mut self) -> Result<String, TurtleParseError> {
        let mut word = String::new();
        while let Some(c) = self.peek_char()? {
            match c {
                ' ' | '\t' | '\r' | '\n' | '<' | '"' | ';' | ',' | '.' | '#' => break,
                c => {
                    word.push(c);
                    self.next_char()?;
                }
            }
        }
        Ok(word)
    }
}

/// A pull parser yielding one triple at a time.
///
/// Statements with blank nodes are reported as errors (there is no
/// skolemizer); after any error the parser resynchronizes at the next `.`
/// so a bad statement does not abort the rest of the stream. I/O errors are
/// terminal.
///
/// ```
/// use terndb::io::TurtleReader;
///
/// let data = b"@base <http://ex.org/> .\n<a> <p> \"x\"@en .\n";
/// let triples: Vec<_> = TurtleReader::new(&data[..])
///     .collect::<Result<Vec<_>, _>>()?;
/// assert_eq!(triples.len(), 1);
/// assert_eq!(triples[0].subject.as_str(), "http://ex.org/a");
/// # Result::<_, terndb::error::TurtleParseError>::Ok(())
/// ```
pub struct TurtleReader<R: BufRead> {
    scanner: Scanner<R>,
    base: Uri,
    prefixes: HashMap<String, Uri>,
    subject: Option<Uri>,
    predicate: Option<Uri>,
    failed: bool,
}

impl<R: BufRead> TurtleReader<R> {
    pub fn new(reader: R) -> Self {
        Self {
            scanner: Scanner::new(reader),
            base: Uri::default(),
            prefixes: HashMap::new(),
            subject: None,
            predicate: None,
            failed: false,
        }
    }

    /// Sets the base URI relative IRI references are resolved against until
    /// the first `@base` directive.
    pub fn with_base(mut self, base: impl Into<Uri>) -> Self {
        self.base = base.into();
        self
    }

    /// Parses the next triple. On a syntax error anywhere in the statement
    /// the reader recovers at the next `.` before reporting it, so one bad
    /// statement cannot derail the ones after it.
    fn read_triple(&mut self) -> Result<Option<Triple>, TurtleParseError> {
        match self.parse_statement() {
            Err(TurtleParseError::Syntax(error)) => {
                self.recover();
                Err(error.into())
            }
            other => other,
        }
    }

    /// Drops the rest of the current statement: everything up to the next
    /// `.`, skipping over further syntax errors on the way.
    fn recover(&mut self) {
        self.subject = None;
        self.predicate = None;
        loop {
            match self.scanner.next_token() {
                Ok(Token::Dot | Token::Eof) | Err(TurtleParseError::Io(_)) => break,
                _ => (),
            }
        }
    }

    fn parse_statement(&mut self) -> Result<Option<Triple>, TurtleParseError> {
        loop {
            let subject = match self.subject.clone() {
                Some(subject) => subject,
                None => match self.scanner.next_token()? {
                    Token::Eof => return Ok(None),
                    Token::At(directive) if directive == "base" => {
                        self.parse_base_directive()?;
                        continue;
                    }
                    Token::At(directive) if directive == "prefix" => {
                        self.parse_prefix_directive()?;
                        continue;
                    }
                    token => {
                        let subject = self.parse_uri(token, "a subject")?;
                        self.subject = Some(subject.clone());
                        subject
                    }
                },
            };
            let predicate = match self.predicate.clone() {
                Some(predicate) => predicate,
                None => {
                    let predicate = match self.scanner.next_token()? {
                        Token::A => Uri::new_unchecked(rdf::TYPE),
                        token => self.parse_uri(token, "a predicate")?,
                    };
                    self.predicate = Some(predicate.clone());
                    predicate
                }
            };

            let object = self.parse_object()?;
            let triple = Triple::new(subject, predicate, object);

            match self.scanner.next_token()? {
                Token::Dot => {
                    self.subject = None;
                    self.predicate = None;
                }
                Token::Semicolon => self.predicate = None,
                Token::Comma => (),
                _ => return Err(self.err("expected '.', ';' or ','")),
            }
            return Ok(Some(triple));
        }
    }

    fn parse_base_directive(&mut self) -> Result<(), TurtleParseError> {
        let Token::IriRef(iri) = self.scanner.next_token()? else {
            return Err(self.err("expected an IRI reference after @base"));
        };
        self.base = Uri::new(iri).resolve(&self.base);
        self.expect_dot("@base directive")
    }

    fn parse_prefix_directive(&mut self) -> Result<(), TurtleParseError> {
        let name = match self.scanner.next_token()? {
            Token::PrefixedName { prefix, local } if local.is_empty() => prefix,
            _ => {
                return Err(self.err("expected a 'prefix:' name after @prefix"));
            }
        };
        let Token::IriRef(iri) = self.scanner.next_token()? else {
            return Err(self.err("expected an IRI reference after the prefix name"));
        };
        let iri = Uri::new(iri).resolve(&self.base);
        self.prefixes.insert(name, iri);
        self.expect_dot("@prefix directive")
    }

    fn expect_dot(&mut self, what: &str) -> Result<(), TurtleParseError> {
        if self.scanner.next_token()? == Token::Dot {
            Ok(())
        } else {
            Err(self.err(format!("expected '.' to end the {what}")))
        }
    }

    fn parse_uri(&mut self, token: Token, role: &str) -> Result<Uri, TurtleParseError> {
        match token {
            Token::IriRef(iri) => Ok(Uri::new(iri).resolve(&self.base)),
            Token::PrefixedName { prefix, local } => {
                let Some(namespace) = self.prefixes.get(&prefix) else {
                    return Err(self.err(format!("unknown prefix {prefix:?}")));
                };
                Ok(Uri::new(format!("{}{local}", namespace.as_str())))
            }
            Token::BlankNode => {
                Err(self.err("blank nodes are not supported"))
            }
            _ => Err(self.err(format!("expected {role}"))),
        }
    }

    fn parse_object(&mut self) -> Result<Term, TurtleParseError> {
        match self.scanner.next_token()? {
            Token::String(value) => match self.scanner.next_token()? {
                Token::At(language) => Literal::new_language_tagged_literal(value, language)
                    .map(Into::into)
                    .map_err(|e| self.err(e.to_string())),
                Token::Caret => {
                    let token = self.scanner.next_token()?;
                    let datatype = self.parse_uri(token, "a datatype IRI")?;
                    Ok(Literal::new_typed_literal(value, datatype).into())
                }
                token => {
                    self.scanner.unread(token);
                    Ok(Literal::new_simple_literal(value).into())
                }
            },
            token => Ok(self.parse_uri(token, "an object")?.into()),
        }
    }

    fn err(&self, msg: impl Into<String>) -> TurtleParseError {
        self.scanner.error(msg).into()
    }
}

impl<R: BufRead> Iterator for TurtleReader<R> {
    type Item = Result<Triple, TurtleParseError>;

    fn next(&mut self) -> Option<Self::Item> {
        if self.failed {
            return None;
        }
        match self.read_triple() {
            Ok(Some(triple)) => Some(Ok(triple)),
            Ok(None) => None,
            Err(TurtleParseError::Io(e)) => {
                self.failed = true;
                Some(Err(TurtleParseError::Io(e)))
            }
            Err(e) => Some(Err(e)),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn parse(data: &str) -> Vec<Triple> {
        TurtleReader::new(data.as_bytes())
            .filter_map(Result::ok)
            .collect()
    }

    fn uri(s: &str) -> Uri {
        Uri::new(s)
    }

    #[test]
    fn parses_ntriples_statements() {
        let triples = parse(
            "<http://ex.org/a> <http://ex.org/p> <http://ex.org/b> .\n\
             <http://ex.org/a> <http://ex.org/p> \"hi\" .\n",
        );
        assert_eq!(
            triples,
            vec![
                Triple::new(uri("http://ex.org/a"), uri("http://ex.org/p"), uri("http://ex.org/b")),
                Triple::new(
                    uri("http://ex.org/a"),
                    uri("http://ex.org/p"),
                    Literal::new_simple_literal("hi")
                ),
            ]
        );
    }

    #[test]
    fn parses_language_tags_and_datatypes() {
        let triples = parse(
            "<http://ex.org/a> <http://ex.org/p> \"hei\"@no .\n\
             <http://ex.org/a> <http://ex.org/p> \"1\"^^<http://www.w3.org/2001/XMLSchema#int> .\n",
        );
        assert_eq!(
            triples[0].object,
            Literal::new_language_tagged_literal("hei", "no").unwrap().into()
        );
        assert_eq!(
            triples[1].object,
            Literal::from(1_i32).into()
        );
    }

    #[test]
    fn resolves_against_the_base_directive() {
        let triples = parse("@base <http://ex.org/> .\n<a> <p> <#frag> .\n");
        assert_eq!(
            triples,
            vec![Triple::new(
                uri("http://ex.org/a"),
                uri("http://ex.org/p"),
                uri("http://ex.org/#frag")
            )]
        );
    }

    #[test]
    fn initial_base_applies_before_any_directive() {
        let triples: Vec<_> = TurtleReader::new(&b"<a> <p> <b> .\n"[..])
            .with_base(Uri::new("http://ex.org/"))
            .collect::<Result<_, _>>()
            .unwrap();
        assert_eq!(triples[0].subject.as_str(), "http://ex.org/a");
    }

    #[test]
    fn expands_prefixed_names() {
        let triples = parse(
            "@prefix s: <http://schema.org/> .\n\
             @prefix : <http://ex.org/> .\n\
             :paris a s:City ; s:name \"Paris\"@fr .\n",
        );
        assert_eq!(
            triples,
            vec![
                Triple::new(
                    uri("http://ex.org/paris"),
                    uri(rdf::TYPE),
                    uri("http://schema.org/City")
                ),
                Triple::new(
                    uri("http://ex.org/paris"),
                    uri("http://schema.org/name"),
                    Literal::new_language_tagged_literal("Paris", "fr").unwrap()
                ),
            ]
        );
    }

    #[test]
    fn continuations_share_subject_and_predicate() {
        let triples = parse(
            "<http://e/s> <http://e/p> \"a\", \"b\" ;\n\t<http://e/q> \"c\" .\n",
        );
        assert_eq!(triples.len(), 3);
        assert!(triples.iter().all(|t| t.subject == uri("http://e/s")));
        assert_eq!(triples[1].predicate, uri("http://e/p"));
        assert_eq!(triples[2].predicate, uri("http://e/q"));
    }

    #[test]
    fn unescapes_string_literals() {
        let triples = parse("<http://e/s> <http://e/p> \"a\\tb\\\"c\\u0041\\U00000042\\n\" .\n");
        assert_eq!(
            triples[0].object,
            Literal::new_simple_literal("a\tb\"cAB\n").into()
        );
    }

    #[test]
    fn skips_comments() {
        let triples = parse(
            "# a comment\n<http://e/s> <http://e/p> \"x\" . # trailing\n",
        );
        assert_eq!(triples.len(), 1);
    }

    #[test]
    fn blank_nodes_are_reported_and_skipped() {
        let results: Vec<_> = TurtleReader::new(
            &b"_:b <http://e/p> \"x\" .\n<http://e/s> <http://e/p> _:b .\n<http://e/s> <http://e/p> \"ok\" .\n"[..],
        )
        .collect();
        assert_eq!(results.iter().filter(|r| r.is_err()).count(), 2);
        let ok: Vec<_> = results.into_iter().filter_map(Result::ok).collect();
        assert_eq!(ok.len(), 1);
        assert_eq!(ok[0].object, Literal::new_simple_literal("ok").into());
    }

    #[test]
    fn resynchronizes_after_a_syntax_error() {
        let results: Vec<_> = TurtleReader::new(
            &b"<http://e/s> <http://e/p> ?garbage words .\n<http://e/s> <http://e/p> \"ok\" .\n"[..],
        )
        .collect();
        assert!(results[0].is_err());
        let ok: Vec<_> = results.into_iter().filter_map(Result::ok).collect();
        assert_eq!(ok.len(), 1);
        assert_eq!(ok[0].object, Literal::new_simple_literal("ok").into());
    }

    #[test]
    fn an_unterminated_literal_does_not_cascade_into_wrong_triples() {
        let results: Vec<_> = TurtleReader::new(
            &b"<http://e/s> <http://e/p> \"unterminated .\n<http://e/a> <http://e/b> <http://e/c> .\n<http://e/s> <http://e/p> \"ok\" .\n"[..],
        )
        .collect();
        // the bad statement and the one its recovery consumes are lost,
        // but nothing is mis-parsed and the stream continues after them
        assert!(results[0].is_err());
        let ok: Vec<_> = results.into_iter().filter_map(Result::ok).collect();
        assert_eq!(ok.len(), 1);
        assert_eq!(ok[0].object, Literal::new_simple_literal("ok").into());
    }

    #[test]
    fn errors_carry_positions() {
        let mut reader = TurtleReader::new(&b"\n  ?bad\n"[..]);
        let Some(Err(TurtleParseError::Syntax(error))) = reader.next() else {
            panic!("expected a syntax error");
        };
        assert_eq!(error.line(), 2);
    }
}
