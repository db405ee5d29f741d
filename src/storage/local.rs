// storage/local.rs from rustnx (c) 2025 NinjaCheetah & Contributors
// https://github.com/NinjaCheetah/rustnx
//
// Implements an Explorer backed by a directory on the local filesystem.

use std::cell::RefCell;
use std::collections::HashMap;
use std::fs::{self, File, OpenOptions};
use std::io::{ErrorKind, Read, Seek, SeekFrom, Write};
use std::path::{Component, Path, PathBuf};
use crate::storage::{Explorer, StorageError};

#[derive(Debug)]
/// An Explorer rooted at a directory. All paths passed to it are relative to that root, using
/// `/` as the separator.
pub struct LocalExplorer {
    root: PathBuf,
    reading: RefCell<HashMap<String, File>>,
    writing: RefCell<HashMap<String, File>>,
}

impl LocalExplorer {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        LocalExplorer {
            root: root.into(),
            reading: RefCell::new(HashMap::new()),
            writing: RefCell::new(HashMap::new()),
        }
    }

    /// Gets the directory this Explorer is rooted at.
    pub fn root(&self) -> &Path {
        &self.root
    }

    /// Resolves a relative path to its location on disk. Paths that would step outside of the
    /// root (`..`, `.` or platform-specific separators and prefixes) are rejected.
    pub fn full_path(&self, path: &str) -> Result<PathBuf, StorageError> {
        let mut full_path = self.root.clone();
        for part in path.split('/').filter(|part| !part.is_empty()) {
            let mut components = Path::new(part).components();
            match (components.next(), components.next()) {
                (Some(Component::Normal(name)), None) if name == part => full_path.push(part),
                _ => return Err(StorageError::InvalidPath(path.to_string())),
            }
        }
        Ok(full_path)
    }

    fn map_not_found(path: &str, err: std::io::Error) -> StorageError {
        if err.kind() == ErrorKind::NotFound {
            StorageError::NotFound(path.to_string())
        } else {
            StorageError::IO(err)
        }
    }
}

fn read_at(file: &mut File, offset: u64, buf: &mut [u8]) -> std::io::Result<usize> {
    file.seek(SeekFrom::Start(offset))?;
    file.read(buf)
}

impl Explorer for LocalExplorer {
    fn start_read(&self, path: &str) -> Result<(), StorageError> {
        if self.reading.borrow().contains_key(path) {
            return Err(StorageError::AlreadyOpen(path.to_string()));
        }
        let file = File::open(self.full_path(path)?).map_err(|e| Self::map_not_found(path, e))?;
        self.reading.borrow_mut().insert(path.to_string(), file);
        Ok(())
    }

    fn end_read(&self, path: &str) -> Result<(), StorageError> {
        self.reading.borrow_mut().remove(path).ok_or_else(|| StorageError::NotOpen(path.to_string()))?;
        Ok(())
    }

    fn start_write(&self, path: &str) -> Result<(), StorageError> {
        if self.writing.borrow().contains_key(path) {
            return Err(StorageError::AlreadyOpen(path.to_string()));
        }
        let file = OpenOptions::new().append(true).open(self.full_path(path)?)
            .map_err(|e| Self::map_not_found(path, e))?;
        self.writing.borrow_mut().insert(path.to_string(), file);
        Ok(())
    }

    fn end_write(&self, path: &str) -> Result<(), StorageError> {
        let mut file = self.writing.borrow_mut().remove(path).ok_or_else(|| StorageError::NotOpen(path.to_string()))?;
        file.flush()?;
        Ok(())
    }

    fn read_range(&self, path: &str, offset: u64, buf: &mut [u8]) -> Result<usize, StorageError> {
        if let Some(file) = self.reading.borrow_mut().get_mut(path) {
            return Ok(read_at(file, offset, buf)?);
        }
        // No session, so open the file just for this read.
        let mut file = File::open(self.full_path(path)?).map_err(|e| Self::map_not_found(path, e))?;
        Ok(read_at(&mut file, offset, buf)?)
    }

    fn write_chunk(&self, path: &str, buf: &[u8]) -> Result<(), StorageError> {
        let mut writing = self.writing.borrow_mut();
        let file = writing.get_mut(path).ok_or_else(|| StorageError::NotOpen(path.to_string()))?;
        file.write_all(buf)?;
        Ok(())
    }

    fn create_file(&self, path: &str) -> Result<(), StorageError> {
        let full_path = self.full_path(path)?;
        if let Some(parent) = full_path.parent() {
            fs::create_dir_all(parent)?;
        }
        File::create(full_path)?;
        Ok(())
    }

    fn delete_file(&self, path: &str) -> Result<(), StorageError> {
        match fs::remove_file(self.full_path(path)?) {
            Ok(()) => Ok(()),
            Err(err) if err.kind() == ErrorKind::NotFound => Ok(()),
            Err(err) => Err(StorageError::IO(err)),
        }
    }

    fn file_size(&self, path: &str) -> Result<u64, StorageError> {
        let metadata = fs::metadata(self.full_path(path)?).map_err(|e| Self::map_not_found(path, e))?;
        Ok(metadata.len())
    }

    fn exists(&self, path: &str) -> bool {
        self.full_path(path).is_ok_and(|full_path| full_path.is_file())
    }
}
