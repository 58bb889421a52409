//! IRI constants for the vocabularies the store knows natively.

/// [RDF](https://www.w3.org/TR/rdf11-concepts/) vocabulary.
pub mod rdf {
    /// The class of language-tagged string literal values.
    pub const LANG_STRING: &str = "http://www.w3.org/1999/02/22-rdf-syntax-ns#langString";
    /// The subject is an instance of a class.
    pub const TYPE: &str = "http://www.w3.org/1999/02/22-rdf-syntax-ns#type";
}

/// [XML Schema datatypes](https://www.w3.org/TR/xmlschema11-2/) with a
/// dedicated tag in the term encoding.
pub mod xsd {
    /// True or false.
    pub const BOOLEAN: &str = "http://www.w3.org/2001/XMLSchema#boolean";
    /// 8-bit signed integers.
    pub const BYTE: &str = "http://www.w3.org/2001/XMLSchema#byte";
    /// A date and time with a required timezone.
    pub const DATE_TIME_STAMP: &str = "http://www.w3.org/2001/XMLSchema#dateTimeStamp";
    /// 64-bit floating point numbers.
    pub const DOUBLE: &str = "http://www.w3.org/2001/XMLSchema#double";
    /// 32-bit floating point numbers.
    pub const FLOAT: &str = "http://www.w3.org/2001/XMLSchema#float";
    /// 32-bit signed integers.
    pub const INT: &str = "http://www.w3.org/2001/XMLSchema#int";
    /// Arbitrary-size integers.
    pub const INTEGER: &str = "http://www.w3.org/2001/XMLSchema#integer";
    /// 64-bit signed integers.
    pub const LONG: &str = "http://www.w3.org/2001/XMLSchema#long";
    /// 16-bit signed integers.
    pub const SHORT: &str = "http://www.w3.org/2001/XMLSchema#short";
    /// Character strings.
    pub const STRING: &str = "http://www.w3.org/2001/XMLSchema#string";
    /// 8-bit unsigned integers.
    pub const UNSIGNED_BYTE: &str = "http://www.w3.org/2001/XMLSchema#unsignedByte";
    /// 32-bit unsigned integers.
    pub const UNSIGNED_INT: &str = "http://www.w3.org/2001/XMLSchema#unsignedInt";
    /// 64-bit unsigned integers.
    pub const UNSIGNED_LONG: &str = "http://www.w3.org/2001/XMLSchema#unsignedLong";
    /// 16-bit unsigned integers.
    pub const UNSIGNED_SHORT: &str = "http://www.w3.org/2001/XMLSchema#unsignedShort";
}
