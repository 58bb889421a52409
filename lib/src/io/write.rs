//! Helpers for emitting Turtle with base-URI abbreviation, used by the
//! dump. Unlike the model `Display` impls these strip the base prefix from
//! IRI references.

use crate::model::print_quoted_str;
use crate::model::vocab::xsd;
use crate::model::Term;

/// Appends `<iri>`, with the base prefix stripped when it matches.
pub(crate) fn push_iri_ref(out: &mut String, iri: &str, base: &str) {
    out.push('<');
    out.push_str(iri.strip_prefix(base).unwrap_or(iri));
    out.push('>');
}

/// Appends an object term in its Turtle form.
pub(crate) fn push_term(out: &mut String, term: &Term, base: &str) {
    match term {
        Term::Uri(uri) => push_iri_ref(out, uri.as_str(), base),
        Term::Literal(literal) => {
            // writing into a String cannot fail
            let _ = print_quoted_str(literal.value(), out);
            if let Some(language) = literal.language() {
                out.push('@');
                out.push_str(language);
            } else if literal.datatype() != xsd::STRING {
                out.push_str("^^");
                push_iri_ref(out, literal.datatype(), base);
            }
        }
    }
}
