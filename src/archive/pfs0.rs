// archive/pfs0.rs from rustnx (c) 2025 NinjaCheetah & Contributors
// https://github.com/NinjaCheetah/rustnx
//
// Implements the structures and methods required for reading and building PFS0 containers (the
// format NSP packages are stored in).

use std::io::{Cursor, Read, Write};
use std::ops::ControlFlow;
use byteorder::{LittleEndian, ReadBytesExt, WriteBytesExt};
use sha2::{Digest, Sha256};
use thiserror::Error;
use crate::storage::{Explorer, ReadSession, StorageError, WriteSession};

#[derive(Debug, Error)]
pub enum PFS0Error {
    #[error("this does not appear to be a PFS0 container (missing magic number)")]
    NotPFS0Data,
    #[error("PFS0 {0} is truncated")]
    Truncated(&'static str),
    #[error("invalid file name at string table offset {0}")]
    InvalidFileName(u32),
    #[error("short read from entry {index} at offset {offset} (expected {expected} bytes, got {actual})")]
    ShortRead { index: usize, offset: u64, expected: usize, actual: usize },
    #[error("transfer was cancelled")]
    Cancelled,
    #[error("storage error while accessing PFS0 data")]
    Storage(#[from] StorageError),
    #[error("PFS0 data is not in a valid format")]
    IO(#[from] std::io::Error),
}

pub const PFS0_MAGIC: [u8; 4] = *b"PFS0";
/// Size of the fixed header (magic, entry count, string table size, reserved).
pub const HEADER_SIZE: u64 = 0x10;
/// Size of a single entry record.
pub const ENTRY_SIZE: u64 = 0x18;
/// The largest chunk moved per iteration when extracting an entry.
pub const TRANSFER_BUFFER_SIZE: usize = 0x800000;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
/// What to do when the backing storage returns fewer bytes than requested during a transfer.
pub enum ShortReadPolicy {
    /// Advance by however many bytes were delivered and keep going.
    Continue,
    /// Stop the transfer and report the short read.
    Fail,
}

#[derive(Debug, Clone)]
/// Options controlling how entries are streamed out of a container.
pub struct ExtractOptions {
    pub buffer_size: usize,
    pub short_reads: ShortReadPolicy,
}

impl Default for ExtractOptions {
    fn default() -> Self {
        ExtractOptions {
            buffer_size: TRANSFER_BUFFER_SIZE,
            short_reads: ShortReadPolicy::Continue,
        }
    }
}

#[derive(Debug, Clone)]
struct PFS0Header {
    file_count: u32,
    string_table_size: u32,
    reserved: u32,
}

#[derive(Debug, Clone)]
/// A single named file inside a PFS0 container.
pub struct PFS0Entry {
    /// Offset of the entry's data, relative to the end of the string table.
    pub offset: u64,
    pub size: u64,
    pub name_offset: u32,
    reserved: u32,
    pub name: String,
}

/// An open PFS0 container. The header, entry table and string table are read once when the
/// container is opened, and entry data is read on demand through the Explorer it was opened with.
pub struct PFS0<'a> {
    explorer: &'a dyn Explorer,
    path: String,
    header: PFS0Header,
    string_table: Vec<u8>,
    header_size: u64,
    entries: Vec<PFS0Entry>,
}

// Fills the whole buffer from the given offset, failing if the data runs out first.
fn read_exact_at(explorer: &dyn Explorer, path: &str, offset: u64, buf: &mut [u8], what: &'static str) -> Result<(), PFS0Error> {
    if explorer.read_fully(path, offset, buf)? < buf.len() {
        return Err(PFS0Error::Truncated(what));
    }
    Ok(())
}

impl<'a> PFS0<'a> {
    /// Opens the PFS0 container at `path` in the provided Explorer and reads its file table. A
    /// file without the PFS0 magic number is reported as `PFS0Error::NotPFS0Data`, which callers
    /// can treat as "not a package" rather than as a failure.
    pub fn open(explorer: &'a dyn Explorer, path: &str) -> Result<Self, PFS0Error> {
        let session = ReadSession::open(explorer, path)?;
        let mut raw_header = [0u8; HEADER_SIZE as usize];
        read_exact_at(explorer, path, 0, &mut raw_header, "header")?;
        let mut buf = Cursor::new(&raw_header[..]);
        let mut magic = [0u8; 4];
        buf.read_exact(&mut magic)?;
        if magic != PFS0_MAGIC {
            return Err(PFS0Error::NotPFS0Data);
        }
        let header = PFS0Header {
            file_count: buf.read_u32::<LittleEndian>()?,
            string_table_size: buf.read_u32::<LittleEndian>()?,
            reserved: buf.read_u32::<LittleEndian>()?,
        };
        // The string table sits right after the entry table, and entry data right after that.
        // Both tables have to fit in the file before anything is allocated for them.
        let string_table_offset = HEADER_SIZE + ENTRY_SIZE * header.file_count as u64;
        let header_size = string_table_offset + header.string_table_size as u64;
        let file_size = explorer.file_size(path)?;
        if string_table_offset > file_size {
            return Err(PFS0Error::Truncated("entry table"));
        }
        if header_size > file_size {
            return Err(PFS0Error::Truncated("string table"));
        }
        let mut string_table = vec![0u8; header.string_table_size as usize];
        read_exact_at(explorer, path, string_table_offset, &mut string_table, "string table")?;
        let mut entries = Vec::with_capacity(header.file_count as usize);
        for i in 0..header.file_count as u64 {
            let mut raw_entry = [0u8; ENTRY_SIZE as usize];
            read_exact_at(explorer, path, HEADER_SIZE + i * ENTRY_SIZE, &mut raw_entry, "entry table")?;
            let mut buf = Cursor::new(&raw_entry[..]);
            let offset = buf.read_u64::<LittleEndian>()?;
            let size = buf.read_u64::<LittleEndian>()?;
            let name_offset = buf.read_u32::<LittleEndian>()?;
            let reserved = buf.read_u32::<LittleEndian>()?;
            // Names run until a null byte or the end of the table, whichever comes first.
            let name_bin: Vec<u8> = string_table.iter()
                .skip(name_offset as usize)
                .take_while(|&&byte| byte != b'\0')
                .copied()
                .collect();
            let name = String::from_utf8(name_bin).map_err(|_| PFS0Error::InvalidFileName(name_offset))?;
            entries.push(PFS0Entry { offset, size, name_offset, reserved, name });
        }
        session.close()?;
        tracing::debug!(path, entries = entries.len(), header_size, "opened PFS0 container");
        Ok(PFS0 {
            explorer,
            path: path.to_string(),
            header,
            string_table,
            header_size,
            entries,
        })
    }

    /// Gets the path of the container within its Explorer.
    pub fn path(&self) -> &str {
        &self.path
    }

    /// Gets the Explorer the container is being read through.
    pub fn explorer(&self) -> &'a dyn Explorer {
        self.explorer
    }

    /// Gets the size of everything before the first byte of entry data.
    pub fn header_size(&self) -> u64 {
        self.header_size
    }

    /// Gets the raw string table, including any padding.
    pub fn string_table(&self) -> &[u8] {
        &self.string_table
    }

    pub fn entry_count(&self) -> usize {
        self.header.file_count as usize
    }

    pub fn entries(&self) -> &[PFS0Entry] {
        &self.entries
    }

    /// Gets the name of the entry at the specified index, or None if the index is out of range.
    pub fn entry_name(&self, index: usize) -> Option<&str> {
        self.entries.get(index).map(|entry| entry.name.as_str())
    }

    /// Gets the names of all entries, in the order they appear in the entry table.
    pub fn entry_names(&self) -> impl Iterator<Item = &str> {
        self.entries.iter().map(|entry| entry.name.as_str())
    }

    /// Gets the size of the entry at the specified index, or None if the index is out of range.
    pub fn entry_size(&self, index: usize) -> Option<u64> {
        self.entries.get(index).map(|entry| entry.size)
    }

    /// Finds an entry by name, ignoring ASCII case.
    pub fn find_entry_by_name(&self, name: &str) -> Option<usize> {
        self.entries.iter().position(|entry| entry.name.eq_ignore_ascii_case(name))
    }

    /// Gets the indices of every entry whose name ends with the provided extension (including
    /// the dot), ignoring ASCII case.
    pub fn find_entries_by_extension<'b>(&'b self, extension: &'b str) -> impl Iterator<Item = usize> + 'b {
        let extension = extension.to_ascii_lowercase();
        self.entries.iter().enumerate()
            .filter(move |(_, entry)| entry.name.to_ascii_lowercase().ends_with(&extension))
            .map(|(i, _)| i)
    }

    /// Reads data from an entry, starting `offset` bytes into it, and returns the number of bytes
    /// actually read. Reads never cross the end of the entry, so this may return less than
    /// `buf.len()`. An out of range index reads nothing.
    pub fn read_at(&self, index: usize, offset: u64, buf: &mut [u8]) -> Result<usize, PFS0Error> {
        let Some(entry) = self.entries.get(index) else {
            return Ok(0);
        };
        if offset >= entry.size {
            return Ok(0);
        }
        let len = (entry.size - offset).min(buf.len() as u64) as usize;
        let Some(absolute) = self.header_size.checked_add(entry.offset).and_then(|start| start.checked_add(offset)) else {
            return Ok(0);
        };
        let read = self.explorer.read_range(&self.path, absolute, &mut buf[..len])?;
        Ok(read)
    }

    /// Reads an entire entry into memory. An out of range index returns no data.
    pub fn read_entry(&self, index: usize) -> Result<Vec<u8>, PFS0Error> {
        let Some(entry) = self.entries.get(index) else {
            return Ok(Vec::new());
        };
        // Entry sizes come straight from the file, so make sure the data is there first.
        let end = self.header_size.checked_add(entry.offset).and_then(|start| start.checked_add(entry.size));
        if end.is_none_or(|end| end > self.explorer.file_size(&self.path).unwrap_or(0)) {
            return Err(PFS0Error::Truncated("entry data"));
        }
        let mut data = vec![0u8; entry.size as usize];
        let mut filled = 0;
        while filled < data.len() {
            let read = self.read_at(index, filled as u64, &mut data[filled..])?;
            if read == 0 {
                return Err(PFS0Error::Truncated("entry data"));
            }
            filled += read;
        }
        Ok(data)
    }

    /// Copies an entry to `dest_path` in the destination Explorer using the default options. The
    /// destination is always recreated, never appended to. Returns the number of bytes written.
    pub fn extract_to(&self, index: usize, dest: &dyn Explorer, dest_path: &str) -> Result<u64, PFS0Error> {
        self.extract_to_with_progress(index, dest, dest_path, &ExtractOptions::default(), |_, _| ControlFlow::Continue(()))
    }

    /// Copies an entry to `dest_path` in the destination Explorer, one bounded chunk at a time.
    /// After each chunk `progress` is called with the bytes copied so far and the entry size;
    /// returning `ControlFlow::Break` stops the transfer with `PFS0Error::Cancelled`.
    ///
    /// Any failure stops the transfer immediately and leaves a partially written destination
    /// behind for the caller to deal with. Both the source and destination sessions are released
    /// on every path out of the copy loop.
    pub fn extract_to_with_progress<F>(&self, index: usize, dest: &dyn Explorer, dest_path: &str,
                                       options: &ExtractOptions, mut progress: F) -> Result<u64, PFS0Error>
    where
        F: FnMut(u64, u64) -> ControlFlow<()>,
    {
        let Some(size) = self.entry_size(index) else {
            return Ok(0);
        };
        let chunk_size = options.buffer_size.max(1).min(size.max(1) as usize);
        let mut buf = vec![0u8; chunk_size];
        dest.delete_file(dest_path)?;
        dest.create_file(dest_path)?;
        let source = ReadSession::open(self.explorer, &self.path)?;
        let destination = WriteSession::open(dest, dest_path)?;
        let mut remaining = size;
        let mut offset: u64 = 0;
        while remaining > 0 {
            let expected = remaining.min(chunk_size as u64) as usize;
            let read = self.read_at(index, offset, &mut buf[..expected])?;
            if read == 0 || (read < expected && options.short_reads == ShortReadPolicy::Fail) {
                return Err(PFS0Error::ShortRead { index, offset, expected, actual: read });
            }
            dest.write_chunk(dest_path, &buf[..read])?;
            offset += read as u64;
            remaining -= read as u64;
            if progress(offset, size).is_break() {
                tracing::debug!(index, offset, "extraction cancelled");
                return Err(PFS0Error::Cancelled);
            }
        }
        destination.close()?;
        source.close()?;
        tracing::debug!(index, dest_path, size, "extracted PFS0 entry");
        Ok(size)
    }

    /// Streams an entry through SHA-256. Returns None for an out of range index.
    pub fn hash_entry(&self, index: usize) -> Result<Option<[u8; 32]>, PFS0Error> {
        let Some(size) = self.entry_size(index) else {
            return Ok(None);
        };
        let mut buf = vec![0u8; TRANSFER_BUFFER_SIZE.min(size.max(1) as usize)];
        let mut hasher = Sha256::new();
        let mut offset: u64 = 0;
        while offset < size {
            let read = self.read_at(index, offset, &mut buf)?;
            if read == 0 {
                return Err(PFS0Error::Truncated("entry data"));
            }
            hasher.update(&buf[..read]);
            offset += read as u64;
        }
        Ok(Some(hasher.finalize().into()))
    }
}

#[derive(Debug, Default)]
/// Builds new PFS0 containers from in-memory files.
pub struct PFS0Builder {
    files: Vec<(String, Vec<u8>)>,
}

impl PFS0Builder {
    pub fn new() -> Self {
        Self::default()
    }

    /// Adds a file. Files are stored in the order they are added.
    pub fn add_file(&mut self, name: &str, data: Vec<u8>) -> &mut Self {
        self.files.push((name.to_string(), data));
        self
    }

    /// Dumps the container into binary data that can be written to a file.
    pub fn to_bytes(&self) -> Result<Vec<u8>, std::io::Error> {
        let mut string_table: Vec<u8> = Vec::new();
        let mut name_offsets: Vec<u32> = Vec::with_capacity(self.files.len());
        for (name, _) in &self.files {
            name_offsets.push(string_table.len() as u32);
            string_table.write_all(name.as_bytes())?;
            string_table.write_u8(b'\0')?;
        }
        // Pad the string table so that entry data starts on a 0x20 byte boundary.
        let table_end = HEADER_SIZE as usize + ENTRY_SIZE as usize * self.files.len() + string_table.len();
        string_table.resize(string_table.len() + (((table_end + 31) & !31) - table_end), 0);
        let mut buf: Vec<u8> = Vec::new();
        buf.write_all(&PFS0_MAGIC)?;
        buf.write_u32::<LittleEndian>(self.files.len() as u32)?;
        buf.write_u32::<LittleEndian>(string_table.len() as u32)?;
        buf.write_u32::<LittleEndian>(0)?;
        let mut data_offset: u64 = 0;
        for ((_, data), name_offset) in self.files.iter().zip(&name_offsets) {
            buf.write_u64::<LittleEndian>(data_offset)?;
            buf.write_u64::<LittleEndian>(data.len() as u64)?;
            buf.write_u32::<LittleEndian>(*name_offset)?;
            buf.write_u32::<LittleEndian>(0)?;
            data_offset += data.len() as u64;
        }
        buf.write_all(&string_table)?;
        for (_, data) in &self.files {
            buf.write_all(data)?;
        }
        Ok(buf)
    }
}
