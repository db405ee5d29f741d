// title/es.rs from rustnx (c) 2025 NinjaCheetah & Contributors
// https://github.com/NinjaCheetah/rustnx
//
// Implements Rights IDs and the RightsManager trait used to import, delete and list tickets.

use std::fmt;
use crate::title::ServiceError;
use crate::title::ticket::TicketType;

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, PartialOrd, Ord)]
/// The 128-bit ID that ties a ticket to a title. The first half is the application ID and the
/// second half the key generation, both stored big-endian.
pub struct RightsId(pub [u8; 16]);

impl RightsId {
    pub fn new(application_id: u64, key_generation: u64) -> Self {
        let mut id = [0u8; 16];
        id[..8].copy_from_slice(&application_id.to_be_bytes());
        id[8..].copy_from_slice(&key_generation.to_be_bytes());
        RightsId(id)
    }

    /// Parses a Rights ID from 32 hex digits.
    pub fn from_hex(hex_str: &str) -> Option<Self> {
        let bytes = hex::decode(hex_str).ok()?;
        Some(RightsId(bytes.try_into().ok()?))
    }

    pub fn application_id(&self) -> u64 {
        let mut high = [0u8; 8];
        high.copy_from_slice(&self.0[..8]);
        u64::from_be_bytes(high)
    }

    pub fn key_generation(&self) -> u64 {
        let mut low = [0u8; 8];
        low.copy_from_slice(&self.0[8..]);
        u64::from_be_bytes(low)
    }
}

impl fmt::Display for RightsId {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        f.write_str(&hex::encode(self.0))
    }
}

/// The service that owns installed tickets.
pub trait RightsManager {
    /// Imports a ticket along with the certificate chain it was signed with.
    fn import_ticket(&self, ticket: &[u8], cert: &[u8]) -> Result<(), ServiceError>;
    fn delete_ticket(&self, rights_id: &RightsId) -> Result<(), ServiceError>;
    fn count_tickets(&self, ticket_type: TicketType) -> Result<u32, ServiceError>;
    /// Lists up to `max` Rights IDs of installed tickets of the given type.
    fn list_tickets(&self, ticket_type: TicketType, max: usize) -> Result<Vec<RightsId>, ServiceError>;
}
