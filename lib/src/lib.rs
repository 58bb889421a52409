//! Terndb is an embedded RDF triple store.
//!
//! Triples live in three bitmap-valued indices (SPO, OSP, POS) over a
//! [sled](https://sled.rs/) key-value database, with a persistent dictionary
//! mapping every RDF term to a 32-bit id. All writes are transactional and
//! keep the dictionary and the indices mutually consistent; terms are
//! garbage-collected when the last triple mentioning them is deleted.
//!
//! Usage example:
//!
//! ```
//! use terndb::model::{Literal, Triple, Uri};
//! use terndb::store::Store;
//!
//! let store = Store::new("http://example.com/")?;
//!
//! // insertion
//! let triple = Triple::new(
//!     Uri::new("http://example.com/alice"),
//!     Uri::new("http://example.com/knows"),
//!     Uri::new("http://example.com/bob"),
//! );
//! store.insert(&triple)?;
//!
//! // containment and description
//! assert!(store.has(&triple)?);
//! let graph = store.describe(&Uri::new("http://example.com/bob"), true)?;
//! assert_eq!(graph.len(), 1);
//!
//! // bulk import from Turtle
//! let data = b"@base <http://example.com/> .\n<bob> <knows> <alice> .\n";
//! assert_eq!(store.import(&data[..], 1000)?, 1);
//! # Result::<_, Box<dyn std::error::Error>>::Ok(())
//! ```

pub mod error;
pub mod io;
pub mod model;
mod storage;
pub mod store;
