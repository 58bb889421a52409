//! Low level storage primitives: the named buckets, the term dictionary,
//! the three triple indices and the transactional write protocol.

use crate::error::{CorruptionError, StorageError};
use crate::model::Term;
use crate::storage::backend::{Db, Tree};
pub(crate) use crate::storage::backend::Iter;
use crate::storage::binary_encoder::{
    decode_bitmap, decode_id, decode_term, encode_bitmap, encode_id, encode_pair, encode_term,
};
use roaring::RoaringBitmap;
use sled::transaction::{
    ConflictableTransactionError as SledConflictableTransactionError,
    TransactionError as SledTransactionError, TransactionalTree,
    UnabortableTransactionError as SledUnabortableTransactionError,
};
use std::io;
use std::path::Path;

mod backend;
pub mod binary_encoder;

const LATEST_STORAGE_VERSION: u64 = 1;

/// The largest assignable term id. Ids of deleted terms are not reclaimed,
/// so the practical capacity is lower than this for churning databases.
pub const MAX_TERM_ID: u64 = u32::MAX as u64;

const VERSION_KEY: &[u8] = b"version";
const BASE_KEY: &[u8] = b"base";
const ID_COUNTER_KEY: &[u8] = b"id_counter";

/// The buckets of the store.
///
/// `terms`/`iterms` hold the id↔bytes dictionary, `spo`/`osp`/`pos` map an
/// 8-byte compound key to a bitmap of the third component, and `meta` holds
/// the format version, the base URI and the id counter.
#[derive(Clone)]
pub struct Storage {
    db: Db,
    meta: Tree,
    terms: Tree,
    iterms: Tree,
    spo: Tree,
    osp: Tree,
    pos: Tree,
    base: String,
}

impl Storage {
    /// Opens a temporary storage that is deleted on drop.
    pub fn new(base: &str) -> Result<Self, StorageError> {
        Self::setup(Db::new()?, base)
    }

    pub fn open(path: &Path, base: &str) -> Result<Self, StorageError> {
        Self::setup(Db::open(path)?, base)
    }

    fn setup(db: Db, base: &str) -> Result<Self, StorageError> {
        let this = Self {
            meta: db.open_tree("meta")?,
            terms: db.open_tree("terms")?,
            iterms: db.open_tree("iterms")?,
            spo: db.open_tree("spo")?,
            osp: db.open_tree("osp")?,
            pos: db.open_tree("pos")?,
            db,
            base: base.to_owned(),
        };
        this.ensure_version()?;
        this.ensure_base()?;
        Ok(this)
    }

    fn ensure_version(&self) -> Result<(), StorageError> {
        match self.meta.get(VERSION_KEY)? {
            Some(bytes) => {
                let version =
                    u64::from_be_bytes(bytes.as_ref().try_into().map_err(|_| {
                        CorruptionError::msg("the storage version stamp is not 8 bytes")
                    })?);
                if version != LATEST_STORAGE_VERSION {
                    return Err(CorruptionError::msg(format!(
                        "the database uses storage format version {version} but this build only supports version {LATEST_STORAGE_VERSION}"
                    ))
                    .into());
                }
            }
            None => {
                self.meta
                    .insert(VERSION_KEY, LATEST_STORAGE_VERSION.to_be_bytes().to_vec())?;
            }
        }
        Ok(())
    }

    /// The base URI is recorded on first open and must match on every later
    /// open: tag-0x00 term encodings are only decodable under the base they
    /// were written with.
    fn ensure_base(&self) -> Result<(), StorageError> {
        match self.meta.get(BASE_KEY)? {
            Some(bytes) => {
                if bytes.as_ref() != self.base.as_bytes() {
                    return Err(CorruptionError::msg(format!(
                        "the database was created with base URI <{}> and cannot be opened with base URI <{}>",
                        String::from_utf8_lossy(&bytes),
                        self.base
                    ))
                    .into());
                }
            }
            None => {
                self.meta.insert(BASE_KEY, self.base.as_bytes().to_vec())?;
            }
        }
        Ok(())
    }

    #[inline]
    pub fn base(&self) -> &str {
        &self.base
    }

    pub fn num_terms(&self) -> usize {
        self.terms.len()
    }

    pub fn size_on_disk(&self) -> Result<u64, StorageError> {
        Ok(self.db.size_on_disk()?)
    }

    pub fn flush(&self) -> Result<(), StorageError> {
        self.db.flush()?;
        Ok(())
    }

    /// Looks up the id of a term, if it is stored.
    pub fn get_id(&self, term: &Term) -> Result<Option<u32>, StorageError> {
        let bytes = encode_term(term, &self.base)?;
        self.iterms
            .get(&bytes)?
            .map(|id| decode_id(&id))
            .transpose()
            .map_err(Into::into)
    }

    /// Looks up and decodes the term stored under an id.
    pub fn get_term(&self, id: u32) -> Result<Option<Term>, StorageError> {
        self.terms
            .get(&encode_id(id))?
            .map(|bytes| decode_term(&bytes, &self.base))
            .transpose()
            .map_err(Into::into)
    }

    /// Resolves an id taken out of an index key or bitmap. The dictionary
    /// entry must exist for every id the indices reference.
    pub fn term_for_id(&self, id: u32) -> Result<Term, StorageError> {
        self.get_term(id)?.ok_or(StorageError::Bug(
            "an index references a term id that is not in the dictionary",
        ))
    }

    pub fn contains_triple(&self, s: u32, p: u32, o: u32) -> Result<bool, StorageError> {
        match self.spo.get(&encode_pair(s, p))? {
            Some(bytes) => Ok(decode_bitmap(&bytes)?.contains(o)),
            None => Ok(false),
        }
    }

    /// All SPO entries, in key order.
    pub fn spo_entries(&self) -> Iter {
        self.spo.iter()
    }

    /// The SPO entries whose key starts with a subject id.
    pub fn spo_entries_for_id(&self, id: u32) -> Iter {
        self.spo.scan_prefix(&encode_id(id))
    }

    /// The OSP entries whose key starts with an object id.
    pub fn osp_entries_for_id(&self, id: u32) -> Iter {
        self.osp.scan_prefix(&encode_id(id))
    }

    /// Runs `f` inside a writable transaction spanning every bucket.
    /// All writes commit atomically, or not at all if `f` aborts.
    pub fn transaction<T>(
        &self,
        f: impl Fn(StorageTransaction<'_>) -> Result<T, ConflictableTransactionError>,
    ) -> Result<T, StorageError> {
        use sled::Transactional;

        let result = (
            self.meta.as_sled(),
            self.terms.as_sled(),
            self.iterms.as_sled(),
            self.spo.as_sled(),
            self.osp.as_sled(),
            self.pos.as_sled(),
        )
            .transaction(|(meta, terms, iterms, spo, osp, pos)| {
                f(StorageTransaction {
                    storage: self,
                    meta,
                    terms,
                    iterms,
                    spo,
                    osp,
                    pos,
                })
                .map_err(SledConflictableTransactionError::from)
            });
        match result {
            Ok(value) => Ok(value),
            Err(SledTransactionError::Abort(error)) => Err(error),
            Err(SledTransactionError::Storage(error)) => {
                Err(StorageError::Io(error.into()))
            }
        }
    }
}

/// A writable transaction over all six buckets.
pub struct StorageTransaction<'a> {
    storage: &'a Storage,
    meta: &'a TransactionalTree,
    terms: &'a TransactionalTree,
    iterms: &'a TransactionalTree,
    spo: &'a TransactionalTree,
    osp: &'a TransactionalTree,
    pos: &'a TransactionalTree,
}

impl StorageTransaction<'_> {
    /// Returns the id of a term, allocating one and writing both dictionary
    /// entries if the term is new.
    pub fn get_or_add_id(&self, term: &Term) -> Result<u32, ConflictableTransactionError> {
        let bytes = encode_term(term, self.storage.base())?;
        if let Some(id) = self.iterms.get(bytes.as_slice())? {
            return Ok(decode_id(&id)?);
        }
        let id = self.next_term_id()?;
        self.terms.insert(&encode_id(id)[..], bytes.as_slice())?;
        self.iterms.insert(bytes, &encode_id(id)[..])?;
        Ok(id)
    }

    /// Returns the id of a term, aborting with `NotFound` if it is not
    /// stored.
    pub fn get_id(&self, term: &Term) -> Result<u32, ConflictableTransactionError> {
        let bytes = encode_term(term, self.storage.base())?;
        match self.iterms.get(bytes)? {
            Some(id) => Ok(decode_id(&id)?),
            None => Err(StorageError::NotFound.into()),
        }
    }

    fn next_term_id(&self) -> Result<u32, ConflictableTransactionError> {
        let last = match self.meta.get(ID_COUNTER_KEY)? {
            Some(bytes) => u64::from_be_bytes(bytes.as_ref().try_into().map_err(|_| {
                CorruptionError::msg("the term id counter is not 8 bytes")
            })?),
            None => 0,
        };
        let next = last + 1;
        if next > MAX_TERM_ID {
            return Err(StorageError::Full.into());
        }
        self.meta.insert(ID_COUNTER_KEY, &next.to_be_bytes()[..])?;
        Ok(next as u32)
    }

    /// Adds a triple of resolved ids to the three indices. Returns `false`
    /// without touching anything if the triple is already stored.
    pub fn insert_triple(
        &self,
        s: u32,
        p: u32,
        o: u32,
    ) -> Result<bool, ConflictableTransactionError> {
        for (tree, k1, k2, v) in [
            (self.spo, s, p, o),
            (self.osp, o, s, p),
            (self.pos, p, o, s),
        ] {
            let key = encode_pair(k1, k2);
            let mut bitmap = match tree.get(&key)? {
                Some(bytes) => decode_bitmap(&bytes)?,
                None => RoaringBitmap::new(),
            };
            if !bitmap.insert(v) {
                // The indices agree, so the first one answers for all three.
                return Ok(false);
            }
            tree.insert(&key[..], encode_bitmap(&bitmap)?)?;
        }
        Ok(true)
    }

    /// Removes a triple of resolved ids from the three indices, deleting
    /// keys whose bitmap became empty, then sweeps the terms that no index
    /// references anymore out of the dictionary.
    ///
    /// Aborts with `NotFound` if the SPO index does not hold the triple.
    /// A miss in OSP or POS after SPO held it means the indices have
    /// diverged and aborts with `Bug`.
    pub fn remove_triple(
        &self,
        s: u32,
        p: u32,
        o: u32,
    ) -> Result<(), ConflictableTransactionError> {
        let entries = [
            (self.spo, s, p, o),
            (self.osp, o, s, p),
            (self.pos, p, o, s),
        ];
        let mut removed_keys: [Option<[u8; 8]>; 3] = [None; 3];
        for (index, (tree, k1, k2, v)) in entries.into_iter().enumerate() {
            let key = encode_pair(k1, k2);
            let Some(bytes) = tree.get(&key)? else {
                return Err(missing_on_delete(index));
            };
            let mut bitmap = decode_bitmap(&bytes)?;
            if !bitmap.remove(v) {
                return Err(missing_on_delete(index));
            }
            if bitmap.is_empty() {
                tree.remove(&key[..])?;
                removed_keys[index] = Some(key);
            } else {
                tree.insert(&key[..], encode_bitmap(&bitmap)?)?;
            }
        }
        self.remove_orphaned_terms(s, p, o, &removed_keys)
    }

    /// Removes each of the given terms from the dictionary if it no longer
    /// appears in any index.
    fn remove_orphaned_terms(
        &self,
        s: u32,
        p: u32,
        o: u32,
        removed_keys: &[Option<[u8; 8]>; 3],
    ) -> Result<(), ConflictableTransactionError> {
        let candidates = [
            Some(s),
            (p != s).then_some(p),
            (o != s && o != p).then_some(o),
        ];
        for id in candidates.into_iter().flatten() {
            if !self.is_referenced(id, removed_keys)? {
                self.remove_term(id)?;
            }
        }
        Ok(())
    }

    /// Checks whether any index key still starts with `id`, with one prefix
    /// seek per index. SPO keys lead with the subject, OSP keys with the
    /// object and POS keys with the predicate, so the three seeks cover
    /// every role the term can play.
    ///
    /// The seeks run against the base trees, which do not see this
    /// transaction's pending writes; the keys this transaction deleted (at
    /// most one per index) are skipped explicitly.
    fn is_referenced(
        &self,
        id: u32,
        removed_keys: &[Option<[u8; 8]>; 3],
    ) -> Result<bool, ConflictableTransactionError> {
        let prefix = encode_id(id);
        for (tree, removed) in [
            (&self.storage.spo, removed_keys[0]),
            (&self.storage.osp, removed_keys[1]),
            (&self.storage.pos, removed_keys[2]),
        ] {
            for entry in tree.scan_prefix(&prefix) {
                let (key, _) =
                    entry.map_err(|e| ConflictableTransactionError::Storage(e.into()))?;
                if removed.map_or(true, |removed| key.as_ref() != removed.as_slice()) {
                    return Ok(true);
                }
            }
        }
        Ok(false)
    }

    /// Deletes both dictionary entries of a term. The caller guarantees the
    /// term exists; a miss is an invariant violation.
    fn remove_term(&self, id: u32) -> Result<(), ConflictableTransactionError> {
        let Some(bytes) = self.terms.remove(&encode_id(id)[..])? else {
            return Err(StorageError::Bug(
                "the orphan sweep tried to remove a term that is already gone",
            )
            .into());
        };
        if self.iterms.remove(bytes)?.is_none() {
            return Err(StorageError::Bug(
                "a term is missing from the reverse dictionary",
            )
            .into());
        }
        Ok(())
    }
}

fn missing_on_delete(index: usize) -> ConflictableTransactionError {
    if index == 0 {
        StorageError::NotFound.into()
    } else {
        StorageError::Bug("a triple is missing from one of its secondary indices").into()
    }
}

/// An error within a transaction closure. `Abort` rolls the transaction
/// back and surfaces the inner error; `Conflict` makes the engine retry.
#[derive(Debug)]
pub enum ConflictableTransactionError {
    Abort(StorageError),
    Conflict,
    Storage(io::Error),
}

impl From<StorageError> for ConflictableTransactionError {
    #[inline]
    fn from(error: StorageError) -> Self {
        Self::Abort(error)
    }
}

impl From<CorruptionError> for ConflictableTransactionError {
    #[inline]
    fn from(error: CorruptionError) -> Self {
        Self::Abort(error.into())
    }
}

impl From<io::Error> for ConflictableTransactionError {
    #[inline]
    fn from(error: io::Error) -> Self {
        Self::Storage(error)
    }
}

impl From<SledUnabortableTransactionError> for ConflictableTransactionError {
    fn from(error: SledUnabortableTransactionError) -> Self {
        match error {
            SledUnabortableTransactionError::Conflict => Self::Conflict,
            SledUnabortableTransactionError::Storage(error) => Self::Storage(error.into()),
        }
    }
}

impl From<ConflictableTransactionError>
    for SledConflictableTransactionError<StorageError>
{
    fn from(error: ConflictableTransactionError) -> Self {
        match error {
            ConflictableTransactionError::Abort(error) => Self::Abort(error),
            ConflictableTransactionError::Conflict => Self::Conflict,
            ConflictableTransactionError::Storage(error) => Self::Storage(error.into()),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::{Literal, Uri};

    fn term(name: &str) -> Term {
        Uri::new(format!("http://test.org/{name}")).into()
    }

    fn insert(storage: &Storage, s: &Term, p: &Term, o: &Term) -> Result<bool, StorageError> {
        storage.transaction(|tx| {
            let s = tx.get_or_add_id(s)?;
            let p = tx.get_or_add_id(p)?;
            let o = tx.get_or_add_id(o)?;
            tx.insert_triple(s, p, o)
        })
    }

    fn remove(storage: &Storage, s: &Term, p: &Term, o: &Term) -> Result<(), StorageError> {
        storage.transaction(|tx| {
            let s = tx.get_id(s)?;
            let p = tx.get_id(p)?;
            let o = tx.get_id(o)?;
            tx.remove_triple(s, p, o)
        })
    }

    #[test]
    fn orphan_sweep_only_removes_unreferenced_terms() -> Result<(), StorageError> {
        let storage = Storage::new("http://test.org/")?;
        let (s, p) = (term("s"), term("p"));
        let o1: Term = Literal::new_simple_literal("one").into();
        let o2: Term = Literal::new_simple_literal("two").into();

        insert(&storage, &s, &p, &o1)?;
        insert(&storage, &s, &p, &o2)?;
        assert_eq!(storage.num_terms(), 4);

        remove(&storage, &s, &p, &o2)?;
        assert_eq!(storage.num_terms(), 3);
        assert!(storage.get_id(&o2)?.is_none());
        assert!(storage.get_id(&s)?.is_some());
        assert_no_empty_bitmaps(&storage)?;

        remove(&storage, &s, &p, &o1)?;
        assert_eq!(storage.num_terms(), 0);
        assert!(storage.terms.is_empty());
        assert!(storage.iterms.is_empty());
        assert!(storage.spo.is_empty());
        assert!(storage.osp.is_empty());
        assert!(storage.pos.is_empty());
        Ok(())
    }

    /// Keys whose bitmap would become empty must be deleted, never stored
    /// with a zero-cardinality value.
    fn assert_no_empty_bitmaps(storage: &Storage) -> Result<(), StorageError> {
        for tree in [&storage.spo, &storage.osp, &storage.pos] {
            for entry in tree.iter() {
                let (_, value) = entry.map_err(io::Error::from)?;
                assert!(!decode_bitmap(&value)?.is_empty());
            }
        }
        Ok(())
    }

    #[test]
    fn orphan_sweep_keeps_terms_referenced_by_other_subjects() -> Result<(), StorageError> {
        let storage = Storage::new("http://test.org/")?;
        let (a, b, p) = (term("a"), term("b"), term("p"));

        // b is the object of one triple and the subject of another
        insert(&storage, &a, &p, &b)?;
        insert(&storage, &b, &p, &a)?;

        remove(&storage, &a, &p, &b)?;
        assert!(storage.get_id(&a)?.is_some());
        assert!(storage.get_id(&b)?.is_some());
        assert!(storage.get_id(&p)?.is_some());

        remove(&storage, &b, &p, &a)?;
        assert_eq!(storage.num_terms(), 0);
        Ok(())
    }

    #[test]
    fn repeated_insert_leaves_the_indices_byte_identical() -> Result<(), StorageError> {
        let storage = Storage::new("http://test.org/")?;
        let (s, p, o) = (term("s"), term("p"), term("o"));

        assert!(insert(&storage, &s, &p, &o)?);
        let spo_before: Vec<_> = storage.spo.iter().collect::<Result<Vec<_>, _>>().unwrap();
        let terms_before = storage.num_terms();

        assert!(!insert(&storage, &s, &p, &o)?);
        let spo_after: Vec<_> = storage.spo.iter().collect::<Result<Vec<_>, _>>().unwrap();
        assert_eq!(spo_before, spo_after);
        assert_eq!(storage.num_terms(), terms_before);
        Ok(())
    }

    #[test]
    fn delete_of_absent_triple_aborts_with_not_found() -> Result<(), StorageError> {
        let storage = Storage::new("http://test.org/")?;
        let (s, p, o) = (term("s"), term("p"), term("o"));

        assert!(matches!(
            remove(&storage, &s, &p, &o),
            Err(StorageError::NotFound)
        ));

        // ids exist but the object bit does not
        insert(&storage, &s, &p, &o)?;
        insert(&storage, &s, &p, &term("other"))?;
        remove(&storage, &s, &p, &o)?;
        assert!(matches!(
            remove(&storage, &s, &p, &o),
            Err(StorageError::NotFound)
        ));
        Ok(())
    }

    #[test]
    fn aborted_transaction_rolls_everything_back() -> Result<(), StorageError> {
        let storage = Storage::new("http://test.org/")?;
        let (s, p, o) = (term("s"), term("p"), term("o"));

        let result = storage.transaction(|tx| {
            let s = tx.get_or_add_id(&s)?;
            let p = tx.get_or_add_id(&p)?;
            let o = tx.get_or_add_id(&o)?;
            tx.insert_triple(s, p, o)?;
            Err::<(), _>(StorageError::NotFound.into())
        });
        assert!(matches!(result, Err(StorageError::NotFound)));
        assert_eq!(storage.num_terms(), 0);
        assert!(storage.spo.is_empty());
        Ok(())
    }

    #[test]
    fn ids_are_not_reused() -> Result<(), StorageError> {
        let storage = Storage::new("http://test.org/")?;
        let (s, p, o) = (term("s"), term("p"), term("o"));

        insert(&storage, &s, &p, &o)?;
        let first = storage.get_id(&s)?.unwrap();
        remove(&storage, &s, &p, &o)?;
        insert(&storage, &s, &p, &o)?;
        assert!(storage.get_id(&s)?.unwrap() > first);
        Ok(())
    }
}
