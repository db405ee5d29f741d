// title/ticket.rs from rustnx (c) 2025 NinjaCheetah & Contributors
// https://github.com/NinjaCheetah/rustnx
//
// Implements the structures and methods required for Ticket parsing and editing.

use std::fmt;
use std::io::{Cursor, Read, Write};
use byteorder::{LittleEndian, ReadBytesExt, WriteBytesExt};
use thiserror::Error;
use crate::storage::{Explorer, StorageError};
use crate::title::es::RightsId;
use crate::title::ids::is_valid_ticket_signature;

#[derive(Debug, Error)]
pub enum TicketError {
    #[error("ticket signature type {0:#x} is not a known signature type")]
    InvalidSignature(u32),
    #[error("ticket data is truncated (expected {expected} bytes, got {actual})")]
    Truncated { expected: u64, actual: u64 },
    #[error("storage error while reading ticket")]
    Storage(#[from] StorageError),
    #[error("Ticket data is not in a valid format")]
    IO(#[from] std::io::Error),
}

/// Size of the signed data that follows a ticket's signature block.
pub const TICKET_DATA_SIZE: u64 = 0x180;
/// The size a ticket file normally occupies on disk, and the size tickets are imported with.
pub const TICKET_SIZE: u64 = 0x2C0;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TicketType {
    Common,
    Personalized,
}

impl fmt::Display for TicketType {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        match self {
            TicketType::Common => write!(f, "Common"),
            TicketType::Personalized => write!(f, "Personalized"),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[repr(u32)]
pub enum TicketSignature {
    Rsa4096Sha1 = 0x10000,
    Rsa2048Sha1 = 0x10001,
    EcdsaSha1 = 0x10002,
    Rsa4096Sha256 = 0x10003,
    Rsa2048Sha256 = 0x10004,
    EcdsaSha256 = 0x10005,
}

impl TicketSignature {
    pub fn from_raw(raw: u32) -> Option<Self> {
        match raw {
            0x10000 => Some(TicketSignature::Rsa4096Sha1),
            0x10001 => Some(TicketSignature::Rsa2048Sha1),
            0x10002 => Some(TicketSignature::EcdsaSha1),
            0x10003 => Some(TicketSignature::Rsa4096Sha256),
            0x10004 => Some(TicketSignature::Rsa2048Sha256),
            0x10005 => Some(TicketSignature::EcdsaSha256),
            _ => None,
        }
    }

    /// Gets the size of the whole signature block, including the 4-byte type and the padding
    /// that follows the signature itself.
    pub fn signature_size(&self) -> u64 {
        match self {
            TicketSignature::Rsa4096Sha1 | TicketSignature::Rsa4096Sha256 => 4 + 0x200 + 0x3C,
            TicketSignature::Rsa2048Sha1 | TicketSignature::Rsa2048Sha256 => 4 + 0x100 + 0x3C,
            TicketSignature::EcdsaSha1 | TicketSignature::EcdsaSha256 => 4 + 0x3C + 0x40,
        }
    }
}

impl fmt::Display for TicketSignature {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        match self {
            TicketSignature::Rsa4096Sha1 => write!(f, "RSA-4096 (SHA-1)"),
            TicketSignature::Rsa2048Sha1 => write!(f, "RSA-2048 (SHA-1)"),
            TicketSignature::EcdsaSha1 => write!(f, "ECDSA (SHA-1)"),
            TicketSignature::Rsa4096Sha256 => write!(f, "RSA-4096 (SHA-256)"),
            TicketSignature::Rsa2048Sha256 => write!(f, "RSA-2048 (SHA-256)"),
            TicketSignature::EcdsaSha256 => write!(f, "ECDSA (SHA-256)"),
        }
    }
}

/// Gets the size of the signature block for a raw signature type, or 0 if the type is unknown.
pub fn ticket_signature_size(raw: u32) -> u64 {
    TicketSignature::from_raw(raw).map_or(0, |signature| signature.signature_size())
}

#[derive(Debug, Clone)]
/// The signed body of a ticket.
pub struct TicketData {
    pub issuer: [u8; 0x40],
    pub title_key_block: [u8; 0x100],
    unknown1: [u8; 6],
    pub master_key_gen: u8,
    unknown2: u8,
    unknown3: [u8; 8],
    pub ticket_id: [u8; 8],
    pub device_id: [u8; 8],
    pub rights_id: RightsId,
    pub account_id: [u8; 4],
    unknown4: [u8; 0xC],
}

impl TicketData {
    pub fn from_bytes(data: &[u8]) -> Result<Self, std::io::Error> {
        let mut buf = Cursor::new(data);
        let mut issuer = [0u8; 0x40];
        buf.read_exact(&mut issuer)?;
        let mut title_key_block = [0u8; 0x100];
        buf.read_exact(&mut title_key_block)?;
        let mut unknown1 = [0u8; 6];
        buf.read_exact(&mut unknown1)?;
        let master_key_gen = buf.read_u8()?;
        let unknown2 = buf.read_u8()?;
        let mut unknown3 = [0u8; 8];
        buf.read_exact(&mut unknown3)?;
        let mut ticket_id = [0u8; 8];
        buf.read_exact(&mut ticket_id)?;
        let mut device_id = [0u8; 8];
        buf.read_exact(&mut device_id)?;
        let mut rights_id = [0u8; 16];
        buf.read_exact(&mut rights_id)?;
        let mut account_id = [0u8; 4];
        buf.read_exact(&mut account_id)?;
        let mut unknown4 = [0u8; 0xC];
        buf.read_exact(&mut unknown4)?;
        Ok(TicketData {
            issuer,
            title_key_block,
            unknown1,
            master_key_gen,
            unknown2,
            unknown3,
            ticket_id,
            device_id,
            rights_id: RightsId(rights_id),
            account_id,
            unknown4,
        })
    }

    pub fn to_bytes(&self) -> Result<Vec<u8>, std::io::Error> {
        let mut buf = Vec::with_capacity(TICKET_DATA_SIZE as usize);
        buf.write_all(&self.issuer)?;
        buf.write_all(&self.title_key_block)?;
        buf.write_all(&self.unknown1)?;
        buf.write_u8(self.master_key_gen)?;
        buf.write_u8(self.unknown2)?;
        buf.write_all(&self.unknown3)?;
        buf.write_all(&self.ticket_id)?;
        buf.write_all(&self.device_id)?;
        buf.write_all(&self.rights_id.0)?;
        buf.write_all(&self.account_id)?;
        buf.write_all(&self.unknown4)?;
        Ok(buf)
    }

    /// Gets the title key type byte, which is 0 for common tickets and 1 for personalized ones.
    pub fn title_key_type(&self) -> u8 {
        self.unknown1[1]
    }
}

#[derive(Debug, Clone)]
/// A complete ticket file: a signature block whose size depends on the signature type, followed
/// by the ticket data.
pub struct TicketFile {
    pub signature_type: TicketSignature,
    /// The signature and its padding, not including the 4-byte signature type.
    pub signature: Vec<u8>,
    pub data: TicketData,
}

impl TicketFile {
    /// Parses a ticket file. The signature type is validated before anything else so that no
    /// size derived from an unknown type is ever trusted.
    pub fn from_bytes(data: &[u8]) -> Result<Self, TicketError> {
        let mut buf = Cursor::new(data);
        let raw_signature = buf.read_u32::<LittleEndian>()?;
        let signature_type = TicketSignature::from_raw(raw_signature)
            .filter(|_| is_valid_ticket_signature(raw_signature))
            .ok_or(TicketError::InvalidSignature(raw_signature))?;
        let signature_size = signature_type.signature_size();
        let full_size = signature_size + TICKET_DATA_SIZE;
        if (data.len() as u64) < full_size {
            return Err(TicketError::Truncated { expected: full_size, actual: data.len() as u64 });
        }
        let signature = data[4..signature_size as usize].to_vec();
        let ticket_data = TicketData::from_bytes(&data[signature_size as usize..full_size as usize])?;
        Ok(TicketFile {
            signature_type,
            signature,
            data: ticket_data,
        })
    }

    /// Dumps the ticket back into binary data, padded out to the standard ticket file size.
    pub fn to_bytes(&self) -> Result<Vec<u8>, std::io::Error> {
        let mut buf = Vec::new();
        buf.write_u32::<LittleEndian>(self.signature_type as u32)?;
        buf.write_all(&self.signature)?;
        buf.write_all(&self.data.to_bytes()?)?;
        buf.resize(buf.len().max(TICKET_SIZE as usize), 0);
        Ok(buf)
    }

    /// Gets the size of the signature block plus the ticket data.
    pub fn full_size(&self) -> u64 {
        self.signature_type.signature_size() + TICKET_DATA_SIZE
    }

    pub fn ticket_type(&self) -> TicketType {
        if self.data.title_key_type() == 1 {
            TicketType::Personalized
        } else {
            TicketType::Common
        }
    }

    /// Gets the encrypted title key. For common tickets this is the first 16 bytes of the title
    /// key block; unwrapping it requires the matching title KEK and is left to the caller.
    pub fn title_key(&self) -> [u8; 16] {
        let mut title_key = [0u8; 16];
        title_key.copy_from_slice(&self.data.title_key_block[..16]);
        title_key
    }

    pub fn title_key_string(&self) -> String {
        hex::encode(self.title_key())
    }

    pub fn application_id(&self) -> u64 {
        self.data.rights_id.application_id()
    }

    pub fn key_generation(&self) -> u8 {
        self.data.master_key_gen
    }

    /// Gets the issuer string, without its trailing null bytes.
    pub fn issuer(&self) -> String {
        String::from_utf8_lossy(&self.data.issuer).trim_end_matches('\0').to_string()
    }

    /// Gets the installed-ticket view of this ticket.
    pub fn to_ticket(&self) -> Ticket {
        Ticket {
            rights_id: self.data.rights_id,
            ticket_type: self.ticket_type(),
        }
    }
}

/// Reads a ticket file through an Explorer. The 4-byte signature type is read and validated
/// first, then the ticket data is read from directly after the signature block it implies.
pub fn read_ticket_file(explorer: &dyn Explorer, path: &str) -> Result<TicketFile, TicketError> {
    let mut raw_signature = [0u8; 4];
    let read = explorer.read_fully(path, 0, &mut raw_signature)?;
    if read < raw_signature.len() {
        return Err(TicketError::Truncated { expected: 4, actual: read as u64 });
    }
    let raw_signature = u32::from_le_bytes(raw_signature);
    if !is_valid_ticket_signature(raw_signature) {
        return Err(TicketError::InvalidSignature(raw_signature));
    }
    let signature_size = ticket_signature_size(raw_signature);
    let full_size = signature_size + TICKET_DATA_SIZE;
    let mut data = vec![0u8; full_size as usize];
    let read = explorer.read_fully(path, 0, &mut data)?;
    if (read as u64) < full_size {
        return Err(TicketError::Truncated { expected: full_size, actual: read as u64 });
    }
    let ticket = TicketFile::from_bytes(&data)?;
    tracing::debug!(path, rights_id = %ticket.data.rights_id, "read ticket file");
    Ok(ticket)
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
/// An installed ticket, as reported by the RightsManager.
pub struct Ticket {
    pub rights_id: RightsId,
    pub ticket_type: TicketType,
}

impl Ticket {
    pub fn application_id(&self) -> u64 {
        self.rights_id.application_id()
    }

    pub fn key_generation(&self) -> u64 {
        self.rights_id.key_generation()
    }
}

impl fmt::Display for Ticket {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        write!(f, "{}", self.rights_id)
    }
}

#[cfg(test)]
pub(crate) mod tests {
    use super::*;
    use crate::storage::MemoryExplorer;

    const ALL_SIGNATURES: [TicketSignature; 6] = [
        TicketSignature::Rsa4096Sha1,
        TicketSignature::Rsa2048Sha1,
        TicketSignature::EcdsaSha1,
        TicketSignature::Rsa4096Sha256,
        TicketSignature::Rsa2048Sha256,
        TicketSignature::EcdsaSha256,
    ];

    /// Builds a ticket file with recognizable field values for tests.
    pub(crate) fn build_ticket(signature_type: TicketSignature, rights_id: RightsId, personalized: bool) -> Vec<u8> {
        let mut buf = Vec::new();
        buf.write_u32::<LittleEndian>(signature_type as u32).unwrap();
        buf.resize(signature_type.signature_size() as usize, 0xAA);
        let mut issuer = [0u8; 0x40];
        issuer[..26].copy_from_slice(b"Root-CA00000003-XS00000020");
        buf.write_all(&issuer).unwrap();
        let mut title_key_block = [0u8; 0x100];
        for (i, byte) in title_key_block.iter_mut().take(16).enumerate() {
            *byte = i as u8;
        }
        buf.write_all(&title_key_block).unwrap();
        buf.write_all(&[2, personalized as u8, 2, 0, 0, 0]).unwrap();
        buf.write_u8(0x0B).unwrap();
        buf.write_all(&[0u8; 9]).unwrap();
        buf.write_all(&[0x11; 8]).unwrap();
        buf.write_all(&[0x22; 8]).unwrap();
        buf.write_all(&rights_id.0).unwrap();
        buf.write_all(&[0x33; 4]).unwrap();
        buf.write_all(&[0u8; 0xC]).unwrap();
        buf.resize(buf.len().max(TICKET_SIZE as usize), 0);
        buf
    }

    #[test]
    fn test_signature_sizes() {
        let expected = [0x240, 0x140, 0x80, 0x240, 0x140, 0x80];
        for (signature, size) in ALL_SIGNATURES.iter().zip(expected) {
            assert_eq!(signature.signature_size(), size);
            assert_eq!(ticket_signature_size(*signature as u32), size);
        }
        assert_eq!(ticket_signature_size(0), 0);
        assert_eq!(ticket_signature_size(0x10006), 0);
        assert_eq!(ticket_signature_size(0xFFFF), 0);
    }

    #[test]
    fn test_full_size() {
        let rights_id = RightsId::new(0x0100ABCD00010000, 0x0B);
        for signature in ALL_SIGNATURES {
            let ticket = TicketFile::from_bytes(&build_ticket(signature, rights_id, false)).unwrap();
            assert_eq!(ticket.full_size(), signature.signature_size() + 0x180);
        }
    }

    #[test]
    fn test_rsa_2048_layout() {
        let rights_id = RightsId::new(0x0100ABCD00010000, 0x0B);
        let data = build_ticket(TicketSignature::Rsa2048Sha1, rights_id, false);
        assert_eq!(data.len() as u64, TICKET_SIZE);
        let ticket = TicketFile::from_bytes(&data).unwrap();
        assert_eq!(ticket.signature_type, TicketSignature::Rsa2048Sha1);
        assert_eq!(ticket.signature.len(), 0x100 + 0x3C);
        assert_eq!(ticket.full_size(), TICKET_SIZE);
        assert_eq!(ticket.data.rights_id, rights_id);
        assert_eq!(ticket.application_id(), 0x0100ABCD00010000);
        assert_eq!(ticket.key_generation(), 0x0B);
        assert_eq!(ticket.issuer(), "Root-CA00000003-XS00000020");
        assert_eq!(ticket.title_key_string(), "000102030405060708090a0b0c0d0e0f");
        assert_eq!(ticket.data.ticket_id, [0x11; 8]);
        assert_eq!(ticket.data.device_id, [0x22; 8]);
        assert_eq!(ticket.data.account_id, [0x33; 4]);
        assert_eq!(ticket.ticket_type(), TicketType::Common);
        assert_eq!(ticket.to_bytes().unwrap(), data);
    }

    #[test]
    fn test_personalized() {
        let rights_id = RightsId::new(0x0100ABCD00010000, 0x0B);
        let ticket = TicketFile::from_bytes(&build_ticket(TicketSignature::Rsa2048Sha256, rights_id, true)).unwrap();
        assert_eq!(ticket.ticket_type(), TicketType::Personalized);
        assert_eq!(ticket.to_ticket(), Ticket { rights_id, ticket_type: TicketType::Personalized });
    }

    #[test]
    fn test_invalid_signature() {
        let mut data = build_ticket(TicketSignature::Rsa2048Sha1, RightsId::default(), false);
        data[..4].copy_from_slice(&0x10006u32.to_le_bytes());
        assert!(matches!(TicketFile::from_bytes(&data), Err(TicketError::InvalidSignature(0x10006))));
        data[..4].copy_from_slice(&0u32.to_le_bytes());
        assert!(matches!(TicketFile::from_bytes(&data), Err(TicketError::InvalidSignature(0))));
    }

    #[test]
    fn test_truncated() {
        let mut data = build_ticket(TicketSignature::Rsa4096Sha256, RightsId::default(), false);
        data.truncate(0x300);
        assert!(matches!(TicketFile::from_bytes(&data), Err(TicketError::Truncated { expected: 0x3C0, actual: 0x300 })));
    }

    #[test]
    fn test_read_ticket_file() {
        let explorer = MemoryExplorer::new();
        let rights_id = RightsId::new(0x0100ABCD00011001, 0x0B);
        explorer.insert("a.tik", build_ticket(TicketSignature::EcdsaSha256, rights_id, false));
        let ticket = read_ticket_file(&explorer, "a.tik").unwrap();
        assert_eq!(ticket.signature_type, TicketSignature::EcdsaSha256);
        assert_eq!(ticket.data.rights_id, rights_id);
        explorer.insert("bad.tik", vec![0u8; 0x2C0]);
        assert!(matches!(read_ticket_file(&explorer, "bad.tik"), Err(TicketError::InvalidSignature(0))));
        explorer.insert("short.tik", vec![1, 0]);
        assert!(matches!(read_ticket_file(&explorer, "short.tik"), Err(TicketError::Truncated { expected: 4, actual: 2 })));
    }

    #[test]
    fn test_installed_ticket_ids() {
        let ticket = Ticket { rights_id: RightsId::new(0x0100ABCD00010000, 0x10), ticket_type: TicketType::Common };
        assert_eq!(ticket.application_id(), 0x0100ABCD00010000);
        assert_eq!(ticket.key_generation(), 0x10);
        assert_eq!(ticket.to_string(), "0100abcd000100000000000000000010");
    }
}
