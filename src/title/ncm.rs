// title/ncm.rs from rustnx (c) 2025 NinjaCheetah & Contributors
// https://github.com/NinjaCheetah/rustnx
//
// Implements the content types, content meta types and storage locations used to describe
// installed content, along with the ContentDatabase trait used to query it.

use std::fmt;
use crate::title::ServiceError;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[repr(u8)]
pub enum ContentType {
    Meta = 0,
    Program = 1,
    Data = 2,
    Control = 3,
    HtmlDocument = 4,
    LegalInformation = 5,
    DeltaFragment = 6,
}

impl ContentType {
    /// The six kinds of content that make up an installed title, in slot order.
    pub const TITLE_CONTENTS: [ContentType; 6] = [
        ContentType::Meta,
        ContentType::Program,
        ContentType::Data,
        ContentType::Control,
        ContentType::HtmlDocument,
        ContentType::LegalInformation,
    ];
}

impl TryFrom<u8> for ContentType {
    type Error = u8;

    fn try_from(value: u8) -> Result<Self, Self::Error> {
        match value {
            0 => Ok(ContentType::Meta),
            1 => Ok(ContentType::Program),
            2 => Ok(ContentType::Data),
            3 => Ok(ContentType::Control),
            4 => Ok(ContentType::HtmlDocument),
            5 => Ok(ContentType::LegalInformation),
            6 => Ok(ContentType::DeltaFragment),
            _ => Err(value),
        }
    }
}

impl fmt::Display for ContentType {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        match self {
            ContentType::Meta => write!(f, "Meta"),
            ContentType::Program => write!(f, "Program"),
            ContentType::Data => write!(f, "Data"),
            ContentType::Control => write!(f, "Control"),
            ContentType::HtmlDocument => write!(f, "HTML Document"),
            ContentType::LegalInformation => write!(f, "Legal Information"),
            ContentType::DeltaFragment => write!(f, "Delta Fragment"),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[repr(u8)]
pub enum ContentMetaType {
    SystemProgram = 0x01,
    SystemData = 0x02,
    SystemUpdate = 0x03,
    BootImagePackage = 0x04,
    BootImagePackageSafe = 0x05,
    Application = 0x80,
    Patch = 0x81,
    AddOnContent = 0x82,
    Delta = 0x83,
    DataPatch = 0x84,
}

impl TryFrom<u8> for ContentMetaType {
    type Error = u8;

    fn try_from(value: u8) -> Result<Self, Self::Error> {
        match value {
            0x01 => Ok(ContentMetaType::SystemProgram),
            0x02 => Ok(ContentMetaType::SystemData),
            0x03 => Ok(ContentMetaType::SystemUpdate),
            0x04 => Ok(ContentMetaType::BootImagePackage),
            0x05 => Ok(ContentMetaType::BootImagePackageSafe),
            0x80 => Ok(ContentMetaType::Application),
            0x81 => Ok(ContentMetaType::Patch),
            0x82 => Ok(ContentMetaType::AddOnContent),
            0x83 => Ok(ContentMetaType::Delta),
            0x84 => Ok(ContentMetaType::DataPatch),
            _ => Err(value),
        }
    }
}

impl fmt::Display for ContentMetaType {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        match self {
            ContentMetaType::SystemProgram => write!(f, "System Program"),
            ContentMetaType::SystemData => write!(f, "System Data"),
            ContentMetaType::SystemUpdate => write!(f, "System Update"),
            ContentMetaType::BootImagePackage => write!(f, "Boot Image Package"),
            ContentMetaType::BootImagePackageSafe => write!(f, "Boot Image Package (Safe)"),
            ContentMetaType::Application => write!(f, "Application"),
            ContentMetaType::Patch => write!(f, "Update"),
            ContentMetaType::AddOnContent => write!(f, "DLC"),
            ContentMetaType::Delta => write!(f, "Delta"),
            ContentMetaType::DataPatch => write!(f, "Data Patch"),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
/// The places content can be installed to.
pub enum Storage {
    GameCart,
    NandSystem,
    NandUser,
    SdCard,
}

impl Storage {
    /// Every storage location, in the order they're searched when locating a title.
    pub const ALL: [Storage; 4] = [Storage::SdCard, Storage::NandUser, Storage::NandSystem, Storage::GameCart];

    /// Gets the numeric storage ID used by the system for this location.
    pub fn storage_id(&self) -> u8 {
        match self {
            Storage::GameCart => 2,
            Storage::NandSystem => 3,
            Storage::NandUser => 4,
            Storage::SdCard => 5,
        }
    }

    pub fn from_storage_id(storage_id: u8) -> Option<Self> {
        match storage_id {
            2 => Some(Storage::GameCart),
            3 => Some(Storage::NandSystem),
            4 => Some(Storage::NandUser),
            5 => Some(Storage::SdCard),
            _ => None,
        }
    }
}

impl fmt::Display for Storage {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        match self {
            Storage::GameCart => write!(f, "Game Cart"),
            Storage::NandSystem => write!(f, "NAND (System)"),
            Storage::NandUser => write!(f, "NAND (User)"),
            Storage::SdCard => write!(f, "SD Card"),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
/// Uniquely identifies one installed content meta record.
pub struct ContentMetaKey {
    pub id: u64,
    pub version: u32,
    pub meta_type: ContentMetaType,
    pub install_type: u8,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
/// Describes one piece of content: its ID, size and what kind of content it is.
pub struct ContentInfo {
    pub content_id: [u8; 16],
    pub size: u64,
    pub content_type: ContentType,
}

/// The database of installed content. Implementations answer questions about what content meta
/// records exist in each storage location and which content belongs to them.
pub trait ContentDatabase {
    /// Lists the content meta records in a storage location, optionally only those of one type.
    fn list_content_meta(&self, meta_type: Option<ContentMetaType>, storage: Storage) -> Result<Vec<ContentMetaKey>, ServiceError>;
    /// Gets the content of a particular type belonging to a record, if the record has any.
    fn content_info(&self, key: &ContentMetaKey, storage: Storage, content_type: ContentType) -> Result<Option<ContentInfo>, ServiceError>;
    /// Removes a record and all of its content.
    fn remove_content_meta(&self, key: &ContentMetaKey, storage: Storage) -> Result<(), ServiceError>;
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_meta_type_conversion() {
        assert_eq!(ContentMetaType::try_from(0x80), Ok(ContentMetaType::Application));
        assert_eq!(ContentMetaType::try_from(0x82), Ok(ContentMetaType::AddOnContent));
        assert_eq!(ContentMetaType::try_from(0x00), Err(0x00));
        assert_eq!(ContentMetaType::Patch as u8, 0x81);
    }

    #[test]
    fn test_content_type_conversion() {
        for content_type in ContentType::TITLE_CONTENTS {
            assert_eq!(ContentType::try_from(content_type as u8), Ok(content_type));
        }
        assert_eq!(ContentType::try_from(7), Err(7));
    }

    #[test]
    fn test_storage_ids() {
        for storage in Storage::ALL {
            assert_eq!(Storage::from_storage_id(storage.storage_id()), Some(storage));
        }
        assert_eq!(Storage::from_storage_id(0), None);
    }
}
