// storage/memory.rs from rustnx (c) 2025 NinjaCheetah & Contributors
// https://github.com/NinjaCheetah/rustnx
//
// Implements an Explorer backed entirely by memory.

use std::cell::{Cell, RefCell};
use std::collections::{HashMap, HashSet};
use crate::storage::{Explorer, StorageError};

#[derive(Debug, Default)]
/// An Explorer that keeps every file in memory. Useful for working with packages that have
/// already been loaded into RAM, and for tests.
pub struct MemoryExplorer {
    files: RefCell<HashMap<String, Vec<u8>>>,
    reading: RefCell<HashSet<String>>,
    writing: RefCell<HashSet<String>>,
    max_read: Cell<Option<usize>>,
}

impl MemoryExplorer {
    pub fn new() -> Self {
        Self::default()
    }

    /// Adds (or replaces) a file.
    pub fn insert(&self, path: &str, data: Vec<u8>) {
        self.files.borrow_mut().insert(path.to_string(), data);
    }

    /// Gets a copy of a file's data, if it exists.
    pub fn get(&self, path: &str) -> Option<Vec<u8>> {
        self.files.borrow().get(path).cloned()
    }

    /// Caps the number of bytes a single `read_range` call returns, to mimic backends that
    /// deliver short reads.
    pub fn set_max_read(&self, max_read: Option<usize>) {
        self.max_read.set(max_read);
    }

    /// Gets whether a file currently has an open read or write session.
    pub fn is_open(&self, path: &str) -> bool {
        self.reading.borrow().contains(path) || self.writing.borrow().contains(path)
    }
}

impl Explorer for MemoryExplorer {
    fn start_read(&self, path: &str) -> Result<(), StorageError> {
        if !self.files.borrow().contains_key(path) {
            return Err(StorageError::NotFound(path.to_string()));
        }
        if !self.reading.borrow_mut().insert(path.to_string()) {
            return Err(StorageError::AlreadyOpen(path.to_string()));
        }
        Ok(())
    }

    fn end_read(&self, path: &str) -> Result<(), StorageError> {
        if !self.reading.borrow_mut().remove(path) {
            return Err(StorageError::NotOpen(path.to_string()));
        }
        Ok(())
    }

    fn start_write(&self, path: &str) -> Result<(), StorageError> {
        if !self.files.borrow().contains_key(path) {
            return Err(StorageError::NotFound(path.to_string()));
        }
        if !self.writing.borrow_mut().insert(path.to_string()) {
            return Err(StorageError::AlreadyOpen(path.to_string()));
        }
        Ok(())
    }

    fn end_write(&self, path: &str) -> Result<(), StorageError> {
        if !self.writing.borrow_mut().remove(path) {
            return Err(StorageError::NotOpen(path.to_string()));
        }
        Ok(())
    }

    fn read_range(&self, path: &str, offset: u64, buf: &mut [u8]) -> Result<usize, StorageError> {
        let files = self.files.borrow();
        let data = files.get(path).ok_or_else(|| StorageError::NotFound(path.to_string()))?;
        if offset >= data.len() as u64 {
            return Ok(0);
        }
        let start = offset as usize;
        let mut len = buf.len().min(data.len() - start);
        if let Some(max_read) = self.max_read.get() {
            len = len.min(max_read);
        }
        buf[..len].copy_from_slice(&data[start..start + len]);
        Ok(len)
    }

    fn write_chunk(&self, path: &str, buf: &[u8]) -> Result<(), StorageError> {
        if !self.writing.borrow().contains(path) {
            return Err(StorageError::NotOpen(path.to_string()));
        }
        let mut files = self.files.borrow_mut();
        let data = files.get_mut(path).ok_or_else(|| StorageError::NotFound(path.to_string()))?;
        data.extend_from_slice(buf);
        Ok(())
    }

    fn create_file(&self, path: &str) -> Result<(), StorageError> {
        self.files.borrow_mut().insert(path.to_string(), Vec::new());
        Ok(())
    }

    fn delete_file(&self, path: &str) -> Result<(), StorageError> {
        self.files.borrow_mut().remove(path);
        Ok(())
    }

    fn file_size(&self, path: &str) -> Result<u64, StorageError> {
        self.files.borrow().get(path)
            .map(|data| data.len() as u64)
            .ok_or_else(|| StorageError::NotFound(path.to_string()))
    }

    fn exists(&self, path: &str) -> bool {
        self.files.borrow().contains_key(path)
    }
}
