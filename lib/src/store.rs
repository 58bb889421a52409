//! The public API of the triple store.

use crate::error::{ImportError, StorageError, TurtleParseError};
use crate::io::write::{push_iri_ref, push_term};
use crate::io::TurtleReader;
use crate::model::vocab::rdf;
use crate::model::{Graph, Term, Triple, Uri};
use crate::storage::binary_encoder::{decode_bitmap, decode_pair};
use crate::storage::{Iter, Storage};
use std::io::{self, BufRead, BufWriter, Write};
use std::path::{Path, PathBuf};

/// An embedded RDF triple store backed by a key-value database on disk.
///
/// Every term is assigned a 32-bit id by a persistent dictionary, and each
/// triple is kept in three bitmap-valued indices (SPO, OSP, POS) so that
/// containment, description and enumeration are single prefix seeks.
/// Inserts and deletes run in one key-value transaction each: the
/// dictionary and the indices can never diverge, and deleting the last
/// triple that mentions a term also drops the term.
///
/// A store is opened for one base URI, recorded on first open: URIs sharing
/// the base are stored (and dumped) abbreviated.
///
/// ```
/// use terndb::model::{Literal, Triple, Uri};
/// use terndb::store::Store;
///
/// let store = Store::new("http://example.com/")?;
///
/// let triple = Triple::new(
///     Uri::new("http://example.com/door"),
///     Uri::new("http://example.com/color"),
///     Literal::from("green"),
/// );
/// store.insert(&triple)?;
/// assert!(store.has(&triple)?);
///
/// let description = store.describe(&Uri::new("http://example.com/door"), false)?;
/// assert_eq!(description.len(), 1);
///
/// store.delete(&triple)?;
/// assert_eq!(store.stats()?.num_terms, 0);
/// # Result::<_, terndb::error::StorageError>::Ok(())
/// ```
#[derive(Clone)]
pub struct Store {
    storage: Storage,
    path: Option<PathBuf>,
}

/// A few figures about a store.
#[derive(Debug, Clone)]
pub struct Stats {
    /// The number of distinct terms in the dictionary.
    pub num_terms: usize,
    /// The database location, if it is not a temporary store.
    pub path: Option<PathBuf>,
    /// The size of the database on disk.
    pub size_in_bytes: u64,
}

impl Store {
    /// Opens a temporary store that is deleted on drop.
    pub fn new(base: &str) -> Result<Self, StorageError> {
        Ok(Self {
            storage: Storage::new(base)?,
            path: None,
        })
    }

    /// Opens the store at `path`, creating it if absent, and takes the
    /// exclusive file lock for the lifetime of the handle.
    ///
    /// The base URI is recorded on first open; opening an existing store
    /// with a different base fails.
    pub fn open(path: impl AsRef<Path>, base: &str) -> Result<Self, StorageError> {
        Ok(Self {
            storage: Storage::open(path.as_ref(), base)?,
            path: Some(path.as_ref().to_owned()),
        })
    }

    /// The base URI this store abbreviates against.
    #[inline]
    pub fn base(&self) -> &str {
        self.storage.base()
    }

    /// Adds a triple. Returns `true` if it was not already stored.
    ///
    /// The dictionary entries and all three index updates commit in a
    /// single transaction, or not at all.
    pub fn insert(&self, triple: &Triple) -> Result<bool, StorageError> {
        let subject = Term::Uri(triple.subject.clone());
        let predicate = Term::Uri(triple.predicate.clone());
        self.storage.transaction(|tx| {
            let s = tx.get_or_add_id(&subject)?;
            let p = tx.get_or_add_id(&predicate)?;
            let o = tx.get_or_add_id(&triple.object)?;
            tx.insert_triple(s, p, o)
        })
    }

    /// Removes a triple from the indices, and any term of it that no other
    /// triple references from the dictionary.
    ///
    /// Returns [`StorageError::NotFound`] if the triple is not stored.
    pub fn delete(&self, triple: &Triple) -> Result<(), StorageError> {
        let subject = Term::Uri(triple.subject.clone());
        let predicate = Term::Uri(triple.predicate.clone());
        self.storage.transaction(|tx| {
            let s = tx.get_id(&subject)?;
            let p = tx.get_id(&predicate)?;
            let o = tx.get_id(&triple.object)?;
            tx.remove_triple(s, p, o)
        })
    }

    /// Checks whether a triple is stored.
    pub fn has(&self, triple: &Triple) -> Result<bool, StorageError> {
        let Some(s) = self.storage.get_id(&Term::Uri(triple.subject.clone()))? else {
            return Ok(false);
        };
        let Some(p) = self.storage.get_id(&Term::Uri(triple.predicate.clone()))? else {
            return Ok(false);
        };
        let Some(o) = self.storage.get_id(&triple.object)? else {
            return Ok(false);
        };
        self.storage.contains_triple(s, p, o)
    }

    /// Returns the graph of all triples where `node` is the subject, and,
    /// if `as_object` is set, also those where it is the object. Unknown
    /// nodes yield an empty graph.
    pub fn describe(&self, node: &Uri, as_object: bool) -> Result<Graph, StorageError> {
        let mut graph = Graph::new();
        let Some(id) = self.storage.get_id(&Term::Uri(node.clone()))? else {
            return Ok(graph);
        };
        // SPO keys are subject∥predicate with a bitmap of objects
        self.join_entries(
            self.storage.spo_entries_for_id(id),
            &mut graph,
            |storage, key_half, bit| {
                Ok(Triple::new(
                    node.clone(),
                    expect_uri(storage.term_for_id(key_half)?)?,
                    storage.term_for_id(bit)?,
                ))
            },
        )?;
        if as_object {
            // OSP keys are object∥subject with a bitmap of predicates
            self.join_entries(
                self.storage.osp_entries_for_id(id),
                &mut graph,
                |storage, key_half, bit| {
                    Ok(Triple::new(
                        expect_uri(storage.term_for_id(key_half)?)?,
                        expect_uri(storage.term_for_id(bit)?)?,
                        Term::Uri(node.clone()),
                    ))
                },
            )?;
        }
        Ok(graph)
    }

    /// The shared skeleton of both describe scans: walk the keys sharing an
    /// id prefix, pair the second key half with every bitmap value and let
    /// the caller assemble the triple from the two roles.
    fn join_entries(
        &self,
        entries: Iter,
        graph: &mut Graph,
        mut make: impl FnMut(&Storage, u32, u32) -> Result<Triple, StorageError>,
    ) -> Result<(), StorageError> {
        for entry in entries {
            let (key, value) = entry.map_err(io::Error::from)?;
            let (_, key_half) = decode_pair(&key)?;
            for bit in &decode_bitmap(&value)? {
                graph.insert(make(&self.storage, key_half, bit)?);
            }
        }
        Ok(())
    }

    /// Iterates over every stored triple, in SPO index order.
    pub fn iter(&self) -> TripleIter {
        TripleIter {
            storage: self.storage.clone(),
            entries: self.storage.spo_entries(),
            current: None,
        }
    }

    /// Calls `f` for every stored triple. An error returned by `f` aborts
    /// the iteration and is propagated unchanged.
    pub fn for_each(
        &self,
        mut f: impl FnMut(Triple) -> Result<(), StorageError>,
    ) -> Result<(), StorageError> {
        for triple in self.iter() {
            f(triple?)?;
        }
        Ok(())
    }

    /// Reads a Turtle or N-Triples stream and stores its triples in batches
    /// of `batch_size`, each batch in one transaction.
    ///
    /// Statements that fail to parse are skipped. Returns the number of
    /// triples handed to the write path, including the final partial batch;
    /// on a storage failure the error carries the count committed by the
    /// preceding batches.
    pub fn import(
        &self,
        reader: impl BufRead,
        batch_size: usize,
    ) -> Result<usize, ImportError> {
        let mut graph = Graph::new();
        let mut total = 0;
        let mut in_batch = 0;
        for result in TurtleReader::new(reader).with_base(Uri::new(self.base())) {
            match result {
                Ok(triple) => {
                    graph.insert(triple);
                    in_batch += 1;
                }
                Err(TurtleParseError::Syntax(_)) => continue,
                Err(TurtleParseError::Io(e)) => {
                    return Err(ImportError {
                        committed: total,
                        source: e.into(),
                    });
                }
            }
            if in_batch >= batch_size {
                self.import_graph(&graph).map_err(|source| ImportError {
                    committed: total,
                    source,
                })?;
                total += in_batch;
                in_batch = 0;
                graph = Graph::new();
            }
        }
        if !graph.is_empty() {
            self.import_graph(&graph).map_err(|source| ImportError {
                committed: total,
                source,
            })?;
            total += in_batch;
        }
        Ok(total)
    }

    /// Stores every triple of an in-memory graph in one transaction.
    pub fn import_graph(&self, graph: &Graph) -> Result<(), StorageError> {
        self.storage.transaction(|tx| {
            for (subject, properties) in graph.nodes() {
                let s = tx.get_or_add_id(&Term::Uri(subject.clone()))?;
                for (predicate, objects) in properties {
                    let p = tx.get_or_add_id(&Term::Uri(predicate.clone()))?;
                    for object in objects {
                        let o = tx.get_or_add_id(object)?;
                        tx.insert_triple(s, p, o)?;
                    }
                }
            }
            Ok(())
        })
    }

    /// Writes the entire store as Turtle, walking the SPO index in key
    /// order and grouping statements by shared subject and predicate.
    pub fn dump(&self, writer: impl Write) -> Result<(), StorageError> {
        let base = self.storage.base();
        let mut writer = BufWriter::new(writer);
        write!(writer, "@base <{base}>")?;

        // ids start at 1, so 0 never matches a stored subject
        let mut current_subject = 0_u32;
        for entry in self.storage.spo_entries() {
            let (key, value) = entry.map_err(io::Error::from)?;
            let (s, p) = decode_pair(&key)?;

            let mut chunk = String::new();
            if s != current_subject {
                // terminates the @base line first time around
                chunk.push_str(" .\n");
                current_subject = s;
                let subject = expect_uri(self.storage.term_for_id(s)?)?;
                push_iri_ref(&mut chunk, subject.as_str(), base);
                chunk.push(' ');
            } else {
                chunk.push_str(" ;\n\t");
            }

            let predicate = expect_uri(self.storage.term_for_id(p)?)?;
            if predicate.as_str() == rdf::TYPE {
                chunk.push_str("a ");
            } else {
                push_iri_ref(&mut chunk, predicate.as_str(), base);
                chunk.push(' ');
            }

            for (i, bit) in decode_bitmap(&value)?.iter().enumerate() {
                if i > 0 {
                    chunk.push_str(", ");
                }
                push_term(&mut chunk, &self.storage.term_for_id(bit)?, base);
            }
            writer.write_all(chunk.as_bytes())?;
        }

        writer.write_all(b" .\n")?;
        writer.flush()?;
        Ok(())
    }

    /// Statistics about the store.
    pub fn stats(&self) -> Result<Stats, StorageError> {
        Ok(Stats {
            num_terms: self.storage.num_terms(),
            path: self.path.clone(),
            size_in_bytes: self.storage.size_on_disk()?,
        })
    }

    /// Blocks until all pending writes reached the disk.
    pub fn flush(&self) -> Result<(), StorageError> {
        self.storage.flush()
    }
}

/// An iterator over every triple of a store, joining each SPO key with its
/// object bitmap.
pub struct TripleIter {
    storage: Storage,
    entries: Iter,
    current: Option<(Uri, Uri, roaring::bitmap::IntoIter)>,
}

impl Iterator for TripleIter {
    type Item = Result<Triple, StorageError>;

    fn next(&mut self) -> Option<Self::Item> {
        loop {
            if let Some((subject, predicate, objects)) = &mut self.current {
                if let Some(bit) = objects.next() {
                    let subject = subject.clone();
                    let predicate = predicate.clone();
                    return Some(
                        self.storage
                            .term_for_id(bit)
                            .map(|object| Triple::new(subject, predicate, object)),
                    );
                }
                self.current = None;
            }
            let entry = self.entries.next()?;
            match self.decode_entry(entry) {
                Ok(current) => self.current = Some(current),
                Err(error) => return Some(Err(error)),
            }
        }
    }
}

impl TripleIter {
    fn decode_entry(
        &self,
        entry: Result<(sled::IVec, sled::IVec), sled::Error>,
    ) -> Result<(Uri, Uri, roaring::bitmap::IntoIter), StorageError> {
        let (key, value) = entry.map_err(io::Error::from)?;
        let (s, p) = decode_pair(&key)?;
        Ok((
            expect_uri(self.storage.term_for_id(s)?)?,
            expect_uri(self.storage.term_for_id(p)?)?,
            decode_bitmap(&value)?.into_iter(),
        ))
    }
}

/// Subjects and predicates are URIs by construction; a literal under one of
/// their ids means the indices or the dictionary are corrupted.
fn expect_uri(term: Term) -> Result<Uri, StorageError> {
    match term {
        Term::Uri(uri) => Ok(uri),
        Term::Literal(_) => Err(StorageError::Bug(
            "a subject or predicate id resolves to a literal",
        )),
    }
}
