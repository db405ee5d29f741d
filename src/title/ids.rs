// title/ids.rs from rustnx (c) 2025 NinjaCheetah & Contributors
// https://github.com/NinjaCheetah/rustnx
//
// Implements the functions used to classify and derive application IDs.

use crate::title::ncm::ContentMetaType;
use crate::title::ticket::TicketSignature;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ApplicationIdMask {
    Official,
    Homebrew,
    Invalid,
}

/// Gets whether a raw signature type falls inside the range of known ticket signature types.
pub const fn is_valid_ticket_signature(raw: u32) -> bool {
    raw >= TicketSignature::Rsa4096Sha1 as u32 && raw <= TicketSignature::EcdsaSha256 as u32
}

/// Gets the application ID of the base title that an update or DLC belongs to. Updates have bit
/// 0x800 set relative to their base title, while DLC has bit 0x1000 flipped and an index in the
/// low 12 bits. Any other type is already a base ID.
pub const fn get_base_application_id(application_id: u64, meta_type: ContentMetaType) -> u64 {
    match meta_type {
        ContentMetaType::Patch => application_id ^ 0x800,
        ContentMetaType::AddOnContent => (application_id ^ 0x1000) & !0xFFF,
        _ => application_id,
    }
}

/// Gets the index of a DLC within its base title.
pub const fn get_id_from_dlc_application_id(application_id: u64) -> u32 {
    (application_id & 0xFFF) as u32
}

/// Classifies an application ID by its high byte. Official titles live in the 01xxxxxxxxxxxxxx
/// range and homebrew in the 05xxxxxxxxxxxxxx range.
pub const fn is_valid_application_id(application_id: u64) -> ApplicationIdMask {
    match application_id >> 56 {
        0x01 => ApplicationIdMask::Official,
        0x05 => ApplicationIdMask::Homebrew,
        _ => ApplicationIdMask::Invalid,
    }
}

/// Formats an application ID the way it's normally displayed, as 16 uppercase hex digits.
pub fn format_application_id(application_id: u64) -> String {
    format!("{:016X}", application_id)
}
