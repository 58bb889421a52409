//! The persisted binary formats: the tagged term encoding, the big-endian
//! id and compound-key encodings, and the bitmap (de)serialization.

use crate::error::{CorruptionError, StorageError};
use crate::model::vocab::xsd;
use crate::model::{Literal, Term, Uri};
use roaring::RoaringBitmap;
use std::io;

// Term type tags. The first byte of every encoded term; also the byte order
// that groups base-prefixed URIs first in the `iterms` bucket.
const TYPE_BASE_URI: u8 = 0x00;
const TYPE_URI: u8 = 0x01;
const TYPE_STRING_LITERAL: u8 = 0x02;
const TYPE_LANG_STRING_LITERAL: u8 = 0x03;
const TYPE_BOOLEAN_LITERAL: u8 = 0x04;
const TYPE_BYTE_LITERAL: u8 = 0x05;
const TYPE_INT_LITERAL: u8 = 0x06;
const TYPE_SHORT_LITERAL: u8 = 0x07;
const TYPE_LONG_LITERAL: u8 = 0x08;
const TYPE_INTEGER_LITERAL: u8 = 0x09;
const TYPE_UNSIGNED_SHORT_LITERAL: u8 = 0x0A;
const TYPE_UNSIGNED_INT_LITERAL: u8 = 0x0B;
const TYPE_UNSIGNED_LONG_LITERAL: u8 = 0x0C;
const TYPE_UNSIGNED_BYTE_LITERAL: u8 = 0x0D;
const TYPE_FLOAT_LITERAL: u8 = 0x0E;
const TYPE_DOUBLE_LITERAL: u8 = 0x0F;
const TYPE_DATE_TIME_STAMP_LITERAL: u8 = 0x10;
const TYPE_CUSTOM_LITERAL: u8 = 0xFF;

fn datatype_tag(datatype: &str) -> Option<u8> {
    Some(match datatype {
        xsd::BOOLEAN => TYPE_BOOLEAN_LITERAL,
        xsd::BYTE => TYPE_BYTE_LITERAL,
        xsd::INT => TYPE_INT_LITERAL,
        xsd::SHORT => TYPE_SHORT_LITERAL,
        xsd::LONG => TYPE_LONG_LITERAL,
        xsd::INTEGER => TYPE_INTEGER_LITERAL,
        xsd::UNSIGNED_SHORT => TYPE_UNSIGNED_SHORT_LITERAL,
        xsd::UNSIGNED_INT => TYPE_UNSIGNED_INT_LITERAL,
        xsd::UNSIGNED_LONG => TYPE_UNSIGNED_LONG_LITERAL,
        xsd::UNSIGNED_BYTE => TYPE_UNSIGNED_BYTE_LITERAL,
        xsd::FLOAT => TYPE_FLOAT_LITERAL,
        xsd::DOUBLE => TYPE_DOUBLE_LITERAL,
        xsd::DATE_TIME_STAMP => TYPE_DATE_TIME_STAMP_LITERAL,
        _ => return None,
    })
}

fn tag_datatype(tag: u8) -> Option<&'static str> {
    Some(match tag {
        TYPE_BOOLEAN_LITERAL => xsd::BOOLEAN,
        TYPE_BYTE_LITERAL => xsd::BYTE,
        TYPE_INT_LITERAL => xsd::INT,
        TYPE_SHORT_LITERAL => xsd::SHORT,
        TYPE_LONG_LITERAL => xsd::LONG,
        TYPE_INTEGER_LITERAL => xsd::INTEGER,
        TYPE_UNSIGNED_SHORT_LITERAL => xsd::UNSIGNED_SHORT,
        TYPE_UNSIGNED_INT_LITERAL => xsd::UNSIGNED_INT,
        TYPE_UNSIGNED_LONG_LITERAL => xsd::UNSIGNED_LONG,
        TYPE_UNSIGNED_BYTE_LITERAL => xsd::UNSIGNED_BYTE,
        TYPE_FLOAT_LITERAL => xsd::FLOAT,
        TYPE_DOUBLE_LITERAL => xsd::DOUBLE,
        TYPE_DATE_TIME_STAMP_LITERAL => xsd::DATE_TIME_STAMP,
        _ => return None,
    })
}

/// Encodes a term into its self-describing byte string.
///
/// The encoding is deterministic: equal terms always produce equal bytes, so
/// the `iterms` bucket can key on them. URIs starting with `base` keep only
/// the suffix under the dedicated tag.
pub fn encode_term(term: &Term, base: &str) -> Result<Vec<u8>, StorageError> {
    Ok(match term {
        Term::Uri(uri) => encode_uri(uri, base),
        Term::Literal(literal) => {
            let value = literal.value();
            if let Some(language) = literal.language() {
                if language.len() > 255 {
                    return Err(StorageError::TermTooBig("the language tag"));
                }
                let mut buffer = Vec::with_capacity(value.len() + language.len() + 2);
                buffer.push(TYPE_LANG_STRING_LITERAL);
                buffer.push(language.len() as u8);
                buffer.extend_from_slice(language.as_bytes());
                buffer.extend_from_slice(value.as_bytes());
                buffer
            } else {
                let datatype = literal.datatype();
                match datatype_tag(datatype) {
                    Some(tag) => tagged(tag, value),
                    None if datatype == xsd::STRING => tagged(TYPE_STRING_LITERAL, value),
                    None => {
                        if datatype.len() > 255 {
                            return Err(StorageError::TermTooBig("the datatype IRI"));
                        }
                        let mut buffer =
                            Vec::with_capacity(value.len() + datatype.len() + 2);
                        buffer.push(TYPE_CUSTOM_LITERAL);
                        buffer.push(datatype.len() as u8);
                        buffer.extend_from_slice(datatype.as_bytes());
                        buffer.extend_from_slice(value.as_bytes());
                        buffer
                    }
                }
            }
        }
    })
}

fn encode_uri(uri: &Uri, base: &str) -> Vec<u8> {
    if let Some(suffix) = uri.as_str().strip_prefix(base) {
        tagged(TYPE_BASE_URI, suffix)
    } else {
        tagged(TYPE_URI, uri.as_str())
    }
}

fn tagged(tag: u8, payload: &str) -> Vec<u8> {
    let mut buffer = Vec::with_capacity(payload.len() + 1);
    buffer.push(tag);
    buffer.extend_from_slice(payload.as_bytes());
    buffer
}

/// Decodes a term byte string written by [`encode_term`].
pub fn decode_term(buffer: &[u8], base: &str) -> Result<Term, CorruptionError> {
    let Some((&tag, payload)) = buffer.split_first() else {
        return Err(CorruptionError::msg(
            "cannot decode an empty byte string into an RDF term",
        ));
    };
    Ok(match tag {
        TYPE_BASE_URI => {
            let mut iri = String::with_capacity(base.len() + payload.len());
            iri.push_str(base);
            iri.push_str(utf8(payload)?);
            Uri::new_unchecked(iri).into()
        }
        TYPE_URI => Uri::new_unchecked(utf8(payload)?).into(),
        TYPE_STRING_LITERAL => Literal::new_simple_literal(utf8(payload)?).into(),
        TYPE_LANG_STRING_LITERAL => {
            let (language, value) = length_prefixed(payload, "rdf:langString")?;
            Literal::new_language_tagged_literal_unchecked(utf8(value)?, utf8(language)?)
                .into()
        }
        TYPE_CUSTOM_LITERAL => {
            let (datatype, value) = length_prefixed(payload, "a typed literal")?;
            Literal::new_typed_literal(utf8(value)?, Uri::new_unchecked(utf8(datatype)?))
                .into()
        }
        _ => {
            let Some(datatype) = tag_datatype(tag) else {
                return Err(CorruptionError::msg(format!(
                    "cannot decode an RDF term with the unknown type tag {tag:#04X}"
                )));
            };
            Literal::new_typed_literal(utf8(payload)?, Uri::new_unchecked(datatype)).into()
        }
    })
}

/// Splits a `length byte, length bytes, rest` payload, validating the length
/// against the remaining buffer.
fn length_prefixed<'a>(
    payload: &'a [u8],
    what: &str,
) -> Result<(&'a [u8], &'a [u8]), CorruptionError> {
    let Some((&len, rest)) = payload.split_first() else {
        return Err(CorruptionError::msg(format!(
            "cannot decode {what}: missing length byte"
        )));
    };
    if rest.len() < usize::from(len) {
        return Err(CorruptionError::msg(format!(
            "cannot decode {what}: length byte exceeds the buffer"
        )));
    }
    Ok(rest.split_at(usize::from(len)))
}

fn utf8(bytes: &[u8]) -> Result<&str, CorruptionError> {
    std::str::from_utf8(bytes)
        .map_err(|e| CorruptionError::msg(format!("stored term is not valid UTF-8: {e}")))
}

/// Encodes a term id as 4 big-endian bytes, so that byte-lexicographic key
/// order is numeric id order.
#[inline]
pub fn encode_id(id: u32) -> [u8; 4] {
    id.to_be_bytes()
}

#[inline]
pub fn decode_id(bytes: &[u8]) -> Result<u32, CorruptionError> {
    Ok(u32::from_be_bytes(bytes.try_into().map_err(|_| {
        CorruptionError::msg("term id is not 4 bytes")
    })?))
}

/// Encodes an index compound key: two big-endian ids, 8 bytes.
#[inline]
pub fn encode_pair(id1: u32, id2: u32) -> [u8; 8] {
    let mut key = [0; 8];
    key[..4].copy_from_slice(&id1.to_be_bytes());
    key[4..].copy_from_slice(&id2.to_be_bytes());
    key
}

#[inline]
pub fn decode_pair(key: &[u8]) -> Result<(u32, u32), CorruptionError> {
    if key.len() != 8 {
        return Err(CorruptionError::msg("index key is not 8 bytes"));
    }
    Ok((decode_id(&key[..4])?, decode_id(&key[4..])?))
}

pub fn encode_bitmap(bitmap: &RoaringBitmap) -> Result<Vec<u8>, io::Error> {
    let mut buffer = Vec::with_capacity(bitmap.serialized_size());
    bitmap.serialize_into(&mut buffer)?;
    Ok(buffer)
}

pub fn decode_bitmap(bytes: &[u8]) -> Result<RoaringBitmap, CorruptionError> {
    RoaringBitmap::deserialize_from(bytes)
        .map_err(|e| CorruptionError::msg(format!("cannot decode index bitmap: {e}")))
}
