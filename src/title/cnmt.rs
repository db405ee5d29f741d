// title/cnmt.rs from rustnx (c) 2025 NinjaCheetah & Contributors
// https://github.com/NinjaCheetah/rustnx
//
// Implements the structures and methods required for parsing and editing packaged content meta
// (CNMT) records.

use std::io::{Cursor, Read, Write};
use byteorder::{LittleEndian, ReadBytesExt, WriteBytesExt};
use thiserror::Error;
use crate::title::ncm::{ContentInfo, ContentMetaKey, ContentMetaType, ContentType};

#[derive(Debug, Error)]
pub enum ContentMetaError {
    #[error("unknown content meta type {0:#x}")]
    UnknownMetaType(u8),
    #[error("unknown content type {0}")]
    UnknownContentType(u8),
    #[error("content meta data is not in a valid format")]
    IO(#[from] std::io::Error),
}

#[derive(Debug, Clone)]
pub struct ContentMetaHeader {
    pub title_id: u64,
    pub version: u32,
    pub meta_type: ContentMetaType,
    pub platform: u8,
    pub extended_header_size: u16,
    pub content_count: u16,
    pub content_meta_count: u16,
    pub attributes: u8,
    pub storage_id: u8,
    pub install_type: u8,
    reserved1: u8,
    pub required_download_system_version: u32,
    reserved2: [u8; 4],
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
/// A content record with the SHA-256 hash of the content it describes.
pub struct PackagedContentInfo {
    pub hash: [u8; 32],
    pub info: ContentInfo,
    pub id_offset: u8,
}

#[derive(Debug, Clone)]
/// A packaged content meta record, describing one title and the content it's made of.
pub struct ContentMeta {
    pub header: ContentMetaHeader,
    pub extended_header: Vec<u8>,
    pub contents: Vec<PackagedContentInfo>,
    pub content_metas: Vec<[u8; 0x10]>,
    // Whatever follows the records (normally a digest).
    trailer: Vec<u8>,
}

impl ContentMeta {
    pub fn from_bytes(data: &[u8]) -> Result<Self, ContentMetaError> {
        let mut buf = Cursor::new(data);
        let title_id = buf.read_u64::<LittleEndian>()?;
        let version = buf.read_u32::<LittleEndian>()?;
        let raw_meta_type = buf.read_u8()?;
        let meta_type = ContentMetaType::try_from(raw_meta_type).map_err(ContentMetaError::UnknownMetaType)?;
        let platform = buf.read_u8()?;
        let extended_header_size = buf.read_u16::<LittleEndian>()?;
        let content_count = buf.read_u16::<LittleEndian>()?;
        let content_meta_count = buf.read_u16::<LittleEndian>()?;
        let attributes = buf.read_u8()?;
        let storage_id = buf.read_u8()?;
        let install_type = buf.read_u8()?;
        let reserved1 = buf.read_u8()?;
        let required_download_system_version = buf.read_u32::<LittleEndian>()?;
        let mut reserved2 = [0u8; 4];
        buf.read_exact(&mut reserved2)?;
        let header = ContentMetaHeader {
            title_id,
            version,
            meta_type,
            platform,
            extended_header_size,
            content_count,
            content_meta_count,
            attributes,
            storage_id,
            install_type,
            reserved1,
            required_download_system_version,
            reserved2,
        };
        // The extended header differs for every meta type, and nothing here needs its fields.
        let mut extended_header = vec![0u8; extended_header_size as usize];
        buf.read_exact(&mut extended_header)?;
        let mut contents = Vec::with_capacity(content_count as usize);
        for _ in 0..content_count {
            let mut hash = [0u8; 32];
            buf.read_exact(&mut hash)?;
            let mut content_id = [0u8; 16];
            buf.read_exact(&mut content_id)?;
            // Content sizes are stored as 48-bit integers.
            let size = buf.read_u48::<LittleEndian>()?;
            let raw_content_type = buf.read_u8()?;
            let content_type = ContentType::try_from(raw_content_type).map_err(ContentMetaError::UnknownContentType)?;
            let id_offset = buf.read_u8()?;
            contents.push(PackagedContentInfo {
                hash,
                info: ContentInfo { content_id, size, content_type },
                id_offset,
            });
        }
        let mut content_metas = Vec::with_capacity(content_meta_count as usize);
        for _ in 0..content_meta_count {
            let mut content_meta = [0u8; 0x10];
            buf.read_exact(&mut content_meta)?;
            content_metas.push(content_meta);
        }
        let mut trailer = Vec::new();
        buf.read_to_end(&mut trailer)?;
        Ok(ContentMeta {
            header,
            extended_header,
            contents,
            content_metas,
            trailer,
        })
    }

    /// Creates a new record with no content, for the given title.
    pub fn new(title_id: u64, version: u32, meta_type: ContentMetaType) -> Self {
        ContentMeta {
            header: ContentMetaHeader {
                title_id,
                version,
                meta_type,
                platform: 0,
                extended_header_size: 0,
                content_count: 0,
                content_meta_count: 0,
                attributes: 0,
                storage_id: 0,
                install_type: 0,
                reserved1: 0,
                required_download_system_version: 0,
                reserved2: [0; 4],
            },
            extended_header: Vec::new(),
            contents: Vec::new(),
            content_metas: Vec::new(),
            trailer: Vec::new(),
        }
    }

    /// Dumps the record back into binary data. The counts in the header are recalculated from
    /// the records actually present.
    pub fn to_bytes(&self) -> Result<Vec<u8>, std::io::Error> {
        let mut buf = Vec::new();
        buf.write_u64::<LittleEndian>(self.header.title_id)?;
        buf.write_u32::<LittleEndian>(self.header.version)?;
        buf.write_u8(self.header.meta_type as u8)?;
        buf.write_u8(self.header.platform)?;
        buf.write_u16::<LittleEndian>(self.extended_header.len() as u16)?;
        buf.write_u16::<LittleEndian>(self.contents.len() as u16)?;
        buf.write_u16::<LittleEndian>(self.content_metas.len() as u16)?;
        buf.write_u8(self.header.attributes)?;
        buf.write_u8(self.header.storage_id)?;
        buf.write_u8(self.header.install_type)?;
        buf.write_u8(self.header.reserved1)?;
        buf.write_u32::<LittleEndian>(self.header.required_download_system_version)?;
        buf.write_all(&self.header.reserved2)?;
        buf.write_all(&self.extended_header)?;
        for content in &self.contents {
            buf.write_all(&content.hash)?;
            buf.write_all(&content.info.content_id)?;
            buf.write_u48::<LittleEndian>(content.info.size)?;
            buf.write_u8(content.info.content_type as u8)?;
            buf.write_u8(content.id_offset)?;
        }
        for content_meta in &self.content_metas {
            buf.write_all(content_meta)?;
        }
        buf.write_all(&self.trailer)?;
        Ok(buf)
    }

    pub fn key(&self) -> ContentMetaKey {
        ContentMetaKey {
            id: self.header.title_id,
            version: self.header.version,
            meta_type: self.header.meta_type,
            install_type: self.header.install_type,
        }
    }

    /// Gets the first content of the given type, if there is one.
    pub fn content(&self, content_type: ContentType) -> Option<&PackagedContentInfo> {
        self.contents.iter().find(|content| content.info.content_type == content_type)
    }
}
