//! Thin wrapper around the subset of [sled](https://sled.rs/) the store
//! uses, converting sled errors into `std::io::Error` at the boundary.

use std::io::Result;
use std::path::Path;

#[derive(Clone)]
pub struct Db(sled::Db);

impl Db {
    /// Opens a temporary database that is deleted on drop.
    pub fn new() -> Result<Self> {
        Ok(Self(sled::Config::new().temporary(true).open()?))
    }

    /// Opens a database directory, taking the exclusive file lock sled
    /// enforces for the lifetime of the handle.
    pub fn open(path: &Path) -> Result<Self> {
        Ok(Self(sled::Config::new().path(path).open()?))
    }

    pub fn open_tree(&self, name: &'static str) -> Result<Tree> {
        Ok(Tree(self.0.open_tree(name)?))
    }

    pub fn flush(&self) -> Result<()> {
        self.0.flush()?;
        Ok(())
    }

    pub fn size_on_disk(&self) -> Result<u64> {
        Ok(self.0.size_on_disk()?)
    }
}

#[derive(Clone)]
pub struct Tree(sled::Tree);

impl Tree {
    pub fn get(&self, key: &[u8]) -> Result<Option<sled::IVec>> {
        Ok(self.0.get(key)?)
    }

    pub fn insert(&self, key: &[u8], value: impl Into<sled::IVec>) -> Result<bool> {
        Ok(self.0.insert(key, value)?.is_none())
    }

    pub fn iter(&self) -> Iter {
        self.0.iter()
    }

    pub fn scan_prefix(&self, prefix: &[u8]) -> Iter {
        self.0.scan_prefix(prefix)
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    pub fn as_sled(&self) -> &sled::Tree {
        &self.0
    }
}

pub type Iter = sled::Iter;
