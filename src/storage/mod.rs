// storage/mod.rs from rustnx (c) 2025 NinjaCheetah & Contributors
// https://github.com/NinjaCheetah/rustnx
//
// Root for the storage backends and the Explorer trait that all file access goes through.

pub mod local;
pub mod memory;

use thiserror::Error;

pub use local::LocalExplorer;
pub use memory::MemoryExplorer;

#[derive(Debug, Error)]
pub enum StorageError {
    #[error("file `{0}` could not be found")]
    NotFound(String),
    #[error("file `{0}` is not open for this operation")]
    NotOpen(String),
    #[error("file `{0}` is already open")]
    AlreadyOpen(String),
    #[error("path `{0}` is not a valid relative path")]
    InvalidPath(String),
    #[error("storage io error")]
    IO(#[from] std::io::Error),
}

/// A byte-addressable store of named files. Packages, removable media and in-memory buffers are
/// all read and written through this trait so that the archive and install code never needs to
/// know where the bytes actually live.
///
/// Reads may be issued with or without an open read session. Writes require an open write
/// session, started with `start_write` and released with `end_write`.
pub trait Explorer {
    fn start_read(&self, path: &str) -> Result<(), StorageError>;
    fn end_read(&self, path: &str) -> Result<(), StorageError>;
    fn start_write(&self, path: &str) -> Result<(), StorageError>;
    fn end_write(&self, path: &str) -> Result<(), StorageError>;
    /// Reads up to `buf.len()` bytes starting at `offset`, returning how many were actually read.
    /// Reading at or past the end of the file returns 0.
    fn read_range(&self, path: &str, offset: u64, buf: &mut [u8]) -> Result<usize, StorageError>;
    /// Appends a chunk of data to a file that is open for writing.
    fn write_chunk(&self, path: &str, buf: &[u8]) -> Result<(), StorageError>;
    /// Creates an empty file, truncating any existing one.
    fn create_file(&self, path: &str) -> Result<(), StorageError>;
    /// Deletes a file. Deleting a file that doesn't exist is not an error.
    fn delete_file(&self, path: &str) -> Result<(), StorageError>;
    fn file_size(&self, path: &str) -> Result<u64, StorageError>;
    fn exists(&self, path: &str) -> bool;

    /// Keeps reading from `offset` until `buf` is full or the file runs out, returning how many
    /// bytes were filled.
    fn read_fully(&self, path: &str, offset: u64, buf: &mut [u8]) -> Result<usize, StorageError> {
        let mut filled = 0;
        while filled < buf.len() {
            let read = self.read_range(path, offset + filled as u64, &mut buf[filled..])?;
            if read == 0 {
                break;
            }
            filled += read;
        }
        Ok(filled)
    }

    /// Reads an entire file into memory.
    fn read_all(&self, path: &str) -> Result<Vec<u8>, StorageError> {
        let mut data = vec![0u8; self.file_size(path)? as usize];
        let read = self.read_fully(path, 0, &mut data)?;
        data.truncate(read);
        Ok(data)
    }

    /// Replaces a file with the provided data.
    fn write_all(&self, path: &str, data: &[u8]) -> Result<(), StorageError> {
        self.delete_file(path)?;
        self.create_file(path)?;
        let session = WriteSession::open(self, path)?;
        self.write_chunk(path, data)?;
        session.close()
    }
}

/// An open read session on a file. The session is released when the guard is dropped, so any
/// early return out of a transfer loop still closes the file.
pub struct ReadSession<'a, E: Explorer + ?Sized> {
    explorer: &'a E,
    path: String,
    open: bool,
}

impl<'a, E: Explorer + ?Sized> ReadSession<'a, E> {
    pub fn open(explorer: &'a E, path: &str) -> Result<Self, StorageError> {
        explorer.start_read(path)?;
        Ok(ReadSession { explorer, path: path.to_string(), open: true })
    }

    /// Ends the session and reports any error from releasing the file.
    pub fn close(mut self) -> Result<(), StorageError> {
        self.open = false;
        self.explorer.end_read(&self.path)
    }
}

impl<E: Explorer + ?Sized> Drop for ReadSession<'_, E> {
    fn drop(&mut self) {
        if self.open {
            if let Err(err) = self.explorer.end_read(&self.path) {
                tracing::warn!(path = %self.path, error = %err, "failed to end read session");
            }
        }
    }
}

/// An open write session on a file, released on drop like `ReadSession`.
pub struct WriteSession<'a, E: Explorer + ?Sized> {
    explorer: &'a E,
    path: String,
    open: bool,
}

impl<'a, E: Explorer + ?Sized> WriteSession<'a, E> {
    pub fn open(explorer: &'a E, path: &str) -> Result<Self, StorageError> {
        explorer.start_write(path)?;
        Ok(WriteSession { explorer, path: path.to_string(), open: true })
    }

    pub fn close(mut self) -> Result<(), StorageError> {
        self.open = false;
        self.explorer.end_write(&self.path)
    }
}

impl<E: Explorer + ?Sized> Drop for WriteSession<'_, E> {
    fn drop(&mut self) {
        if self.open {
            if let Err(err) = self.explorer.end_write(&self.path) {
                tracing::warn!(path = %self.path, error = %err, "failed to end write session");
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_session_released_on_drop() {
        let explorer = MemoryExplorer::new();
        explorer.insert("a.bin", vec![1, 2, 3]);
        {
            let _session = ReadSession::open(&explorer, "a.bin").unwrap();
            assert!(explorer.is_open("a.bin"));
        }
        assert!(!explorer.is_open("a.bin"));
        // Opening twice only works if the first session was actually released.
        let session = ReadSession::open(&explorer, "a.bin").unwrap();
        session.close().unwrap();
    }

    #[test]
    fn test_write_all_replaces_file() {
        let explorer = MemoryExplorer::new();
        explorer.write_all("out.bin", b"first contents").unwrap();
        explorer.write_all("out.bin", b"second").unwrap();
        assert_eq!(explorer.read_all("out.bin").unwrap(), b"second");
    }
}
