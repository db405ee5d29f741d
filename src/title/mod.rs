// title/mod.rs from rustnx (c) 2025 NinjaCheetah & Contributors
// https://github.com/NinjaCheetah/rustnx
//
// Root for all title-related modules and implementation of the high-level Title object.

pub mod cnmt;
pub mod es;
pub mod ids;
pub mod ncm;
pub mod ticket;

use thiserror::Error;
use crate::storage::StorageError;
use crate::title::es::RightsManager;
use crate::title::ncm::{ContentDatabase, ContentInfo, ContentMetaKey, ContentMetaType, ContentType, Storage};
use crate::title::ticket::{Ticket, TicketType};

/// The most records any single listing will return.
pub const MAX_TITLE_COUNT: usize = 64000;

#[derive(Debug, Error)]
/// An error reported by the content database or the rights manager.
pub enum ServiceError {
    #[error("{service} returned result code {code:#x}")]
    ResultCode { service: &'static str, code: u32 },
    #[error("the requested record does not exist")]
    NotFound,
    #[error("content meta record is invalid")]
    ContentMeta(#[from] cnmt::ContentMetaError),
    #[error("ticket is invalid")]
    Ticket(#[from] ticket::TicketError),
    #[error("storage error")]
    Storage(#[from] StorageError),
    #[error("io error")]
    IO(#[from] std::io::Error),
}

#[derive(Debug, Error)]
pub enum TitleError {
    #[error("no title with application ID {0:016X} is installed")]
    NotFound(u64),
    #[error("service call failed")]
    Service(#[from] ServiceError),
}

#[derive(Debug, Clone, PartialEq, Eq)]
/// The result of a listing that may have been cut short at `MAX_TITLE_COUNT`.
pub struct Listing<T> {
    pub items: Vec<T>,
    /// Whether more records existed than were returned.
    pub truncated: bool,
}

impl<T> Listing<T> {
    fn bounded(mut items: Vec<T>) -> Self {
        let truncated = items.len() > MAX_TITLE_COUNT;
        items.truncate(MAX_TITLE_COUNT);
        Listing { items, truncated }
    }
}

/// Formats a size in bytes using binary units, e.g. "1.50 MB".
pub fn format_size(bytes: u64) -> String {
    const UNITS: [&str; 4] = ["KB", "MB", "GB", "TB"];
    if bytes < 1024 {
        return format!("{} bytes", bytes);
    }
    let mut size = bytes as f64 / 1024.0;
    let mut unit = 0;
    while size >= 1024.0 && unit < UNITS.len() - 1 {
        size /= 1024.0;
        unit += 1;
    }
    format!("{:.2} {}", size, UNITS[unit])
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
/// One content slot of an installed title.
pub struct ContentId {
    pub content_type: ContentType,
    pub content_id: [u8; 16],
    pub location: Storage,
    /// Set when the title has no content of this type. Empty slots always have a size of 0.
    pub empty: bool,
    pub size: u64,
}

impl ContentId {
    pub fn empty(content_type: ContentType, location: Storage) -> Self {
        ContentId {
            content_type,
            content_id: [0; 16],
            location,
            empty: true,
            size: 0,
        }
    }

    pub fn from_info(info: &ContentInfo, location: Storage) -> Self {
        ContentId {
            content_type: info.content_type,
            content_id: info.content_id,
            location,
            empty: false,
            size: info.size,
        }
    }

    pub fn content_id_string(&self) -> String {
        hex::encode(self.content_id)
    }

    /// Gets the file name this content is stored under. Meta content uses the `.cnmt.nca`
    /// extension, everything else `.nca`.
    pub fn file_name(&self) -> String {
        match self.content_type {
            ContentType::Meta => format!("{}.cnmt.nca", self.content_id_string()),
            _ => format!("{}.nca", self.content_id_string()),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
/// A snapshot of the six content slots of an installed title.
pub struct TitleContents {
    pub meta: ContentId,
    pub program: ContentId,
    pub data: ContentId,
    pub control: ContentId,
    pub html_document: ContentId,
    pub legal_info: ContentId,
}

impl TitleContents {
    pub fn get(&self, content_type: ContentType) -> Option<&ContentId> {
        match content_type {
            ContentType::Meta => Some(&self.meta),
            ContentType::Program => Some(&self.program),
            ContentType::Data => Some(&self.data),
            ContentType::Control => Some(&self.control),
            ContentType::HtmlDocument => Some(&self.html_document),
            ContentType::LegalInformation => Some(&self.legal_info),
            ContentType::DeltaFragment => None,
        }
    }

    /// Iterates over all six slots, empty or not.
    pub fn iter(&self) -> impl Iterator<Item = &ContentId> {
        [&self.meta, &self.program, &self.data, &self.control, &self.html_document, &self.legal_info].into_iter()
    }

    /// Gets the combined size of every slot that isn't empty.
    pub fn total_size(&self) -> u64 {
        self.iter().filter(|content| !content.empty).map(|content| content.size).sum()
    }

    pub fn formatted_total_size(&self) -> String {
        format_size(self.total_size())
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
/// An installed title. Titles are snapshots of the content database; query it again to see any
/// changes.
pub struct Title {
    pub application_id: u64,
    pub meta_type: ContentMetaType,
    pub version: u32,
    pub record: ContentMetaKey,
    pub location: Storage,
}

impl Title {
    pub fn from_key(record: ContentMetaKey, location: Storage) -> Self {
        Title {
            application_id: record.id,
            meta_type: record.meta_type,
            version: record.version,
            record,
            location,
        }
    }

    /// Fetches all six content slots of the title from the content database, marking any kind
    /// the title doesn't have as empty.
    pub fn contents(&self, db: &dyn ContentDatabase) -> Result<TitleContents, TitleError> {
        let fetch = |content_type: ContentType| -> Result<ContentId, TitleError> {
            let info = db.content_info(&self.record, self.location, content_type)?;
            Ok(match info {
                Some(info) => ContentId::from_info(&info, self.location),
                None => ContentId::empty(content_type, self.location),
            })
        };
        Ok(TitleContents {
            meta: fetch(ContentType::Meta)?,
            program: fetch(ContentType::Program)?,
            data: fetch(ContentType::Data)?,
            control: fetch(ContentType::Control)?,
            html_document: fetch(ContentType::HtmlDocument)?,
            legal_info: fetch(ContentType::LegalInformation)?,
        })
    }

    pub fn is_base_title(&self) -> bool {
        !self.is_update() && !self.is_dlc() && !matches!(self.meta_type,
            ContentMetaType::SystemUpdate | ContentMetaType::Delta | ContentMetaType::DataPatch)
    }

    pub fn is_update(&self) -> bool {
        self.meta_type == ContentMetaType::Patch
    }

    pub fn is_dlc(&self) -> bool {
        self.meta_type == ContentMetaType::AddOnContent
    }

    /// Gets the application ID of the base title this title belongs to.
    pub fn base_application_id(&self) -> u64 {
        ids::get_base_application_id(self.application_id, self.meta_type)
    }

    /// Gets whether `other` is the base title of this title.
    pub fn check_base(&self, other: &Title) -> bool {
        self.base_application_id() == other.application_id && other.is_base_title()
    }

    pub fn formatted_application_id(&self) -> String {
        ids::format_application_id(self.application_id)
    }
}

fn list_titles(db: &dyn ContentDatabase, meta_type: Option<ContentMetaType>, storage: Storage) -> Result<Vec<Title>, TitleError> {
    let keys = db.list_content_meta(meta_type, storage)?;
    Ok(keys.into_iter().map(|key| Title::from_key(key, storage)).collect())
}

/// Lists the installed titles of one type in a storage location.
pub fn search_titles(db: &dyn ContentDatabase, meta_type: ContentMetaType, storage: Storage) -> Result<Listing<Title>, TitleError> {
    Ok(Listing::bounded(list_titles(db, Some(meta_type), storage)?))
}

/// Finds an installed title of any type by its application ID, searching every storage
/// location.
pub fn locate(db: &dyn ContentDatabase, application_id: u64) -> Result<Title, TitleError> {
    for storage in Storage::ALL {
        if let Some(title) = list_titles(db, None, storage)?.into_iter().find(|title| title.application_id == application_id) {
            return Ok(title);
        }
    }
    Err(TitleError::NotFound(application_id))
}

pub fn exists_title(db: &dyn ContentDatabase, meta_type: ContentMetaType, storage: Storage, application_id: u64) -> Result<bool, TitleError> {
    Ok(list_titles(db, Some(meta_type), storage)?.iter().any(|title| title.application_id == application_id))
}

/// Removes a title and all of its content. Nothing is retried or rolled back if the removal
/// fails partway through.
pub fn remove_title(db: &dyn ContentDatabase, title: &Title) -> Result<(), TitleError> {
    db.remove_content_meta(&title.record, title.location)?;
    tracing::info!(application_id = %title.formatted_application_id(), location = %title.location, "removed title");
    Ok(())
}

/// Lists every installed ticket, common tickets first.
pub fn get_all_tickets(rights: &dyn RightsManager) -> Result<Listing<Ticket>, TitleError> {
    let mut items = Vec::new();
    let mut total: usize = 0;
    for ticket_type in [TicketType::Common, TicketType::Personalized] {
        total += rights.count_tickets(ticket_type)? as usize;
        let remaining = MAX_TITLE_COUNT - items.len();
        let rights_ids = rights.list_tickets(ticket_type, remaining)?;
        items.extend(rights_ids.into_iter().take(remaining).map(|rights_id| Ticket { rights_id, ticket_type }));
    }
    let truncated = total > items.len();
    Ok(Listing { items, truncated })
}

pub fn remove_ticket(rights: &dyn RightsManager, ticket: &Ticket) -> Result<(), TitleError> {
    rights.delete_ticket(&ticket.rights_id)?;
    tracing::info!(rights_id = %ticket.rights_id, "removed ticket");
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::cell::RefCell;
    use crate::title::es::RightsId;

    #[derive(Default)]
    struct FakeDatabase {
        records: RefCell<Vec<(ContentMetaKey, Storage, Vec<ContentInfo>)>>,
        fail_removal: bool,
    }

    impl FakeDatabase {
        fn add(&self, id: u64, meta_type: ContentMetaType, storage: Storage, contents: Vec<ContentInfo>) {
            let key = ContentMetaKey { id, version: 0, meta_type, install_type: 0 };
            self.records.borrow_mut().push((key, storage, contents));
        }
    }

    impl ContentDatabase for FakeDatabase {
        fn list_content_meta(&self, meta_type: Option<ContentMetaType>, storage: Storage) -> Result<Vec<ContentMetaKey>, ServiceError> {
            Ok(self.records.borrow().iter()
                .filter(|(key, location, _)| *location == storage && meta_type.is_none_or(|t| key.meta_type == t))
                .map(|(key, _, _)| *key)
                .collect())
        }

        fn content_info(&self, key: &ContentMetaKey, storage: Storage, content_type: ContentType) -> Result<Option<ContentInfo>, ServiceError> {
            let records = self.records.borrow();
            let (_, _, contents) = records.iter()
                .find(|(k, location, _)| k == key && *location == storage)
                .ok_or(ServiceError::NotFound)?;
            Ok(contents.iter().find(|info| info.content_type == content_type).copied())
        }

        fn remove_content_meta(&self, key: &ContentMetaKey, storage: Storage) -> Result<(), ServiceError> {
            if self.fail_removal {
                return Err(ServiceError::ResultCode { service: "ncm", code: 0x805 });
            }
            self.records.borrow_mut().retain(|(k, location, _)| !(k == key && *location == storage));
            Ok(())
        }
    }

    struct FakeRights {
        common: Vec<RightsId>,
        personalized: Vec<RightsId>,
    }

    impl RightsManager for FakeRights {
        fn import_ticket(&self, _ticket: &[u8], _cert: &[u8]) -> Result<(), ServiceError> {
            Ok(())
        }

        fn delete_ticket(&self, rights_id: &RightsId) -> Result<(), ServiceError> {
            if self.common.contains(rights_id) || self.personalized.contains(rights_id) {
                Ok(())
            } else {
                Err(ServiceError::NotFound)
            }
        }

        fn count_tickets(&self, ticket_type: TicketType) -> Result<u32, ServiceError> {
            Ok(match ticket_type {
                TicketType::Common => self.common.len() as u32,
                TicketType::Personalized => self.personalized.len() as u32,
            })
        }

        fn list_tickets(&self, ticket_type: TicketType, max: usize) -> Result<Vec<RightsId>, ServiceError> {
            let ids = match ticket_type {
                TicketType::Common => &self.common,
                TicketType::Personalized => &self.personalized,
            };
            Ok(ids.iter().take(max).copied().collect())
        }
    }

    fn info(content_type: ContentType, size: u64) -> ContentInfo {
        ContentInfo { content_id: [content_type as u8; 16], size, content_type }
    }

    #[test]
    fn test_search_and_locate() {
        let db = FakeDatabase::default();
        db.add(0x0100ABCD00010000, ContentMetaType::Application, Storage::SdCard, vec![]);
        db.add(0x0100ABCD00010800, ContentMetaType::Patch, Storage::SdCard, vec![]);
        db.add(0x0100000000001000, ContentMetaType::Application, Storage::NandUser, vec![]);
        let apps = search_titles(&db, ContentMetaType::Application, Storage::SdCard).unwrap();
        assert_eq!(apps.items.len(), 1);
        assert!(!apps.truncated);
        assert_eq!(apps.items[0].application_id, 0x0100ABCD00010000);
        let title = locate(&db, 0x0100000000001000).unwrap();
        assert_eq!(title.location, Storage::NandUser);
        assert!(matches!(locate(&db, 0x0100000000002000), Err(TitleError::NotFound(0x0100000000002000))));
        assert!(exists_title(&db, ContentMetaType::Patch, Storage::SdCard, 0x0100ABCD00010800).unwrap());
        assert!(!exists_title(&db, ContentMetaType::Patch, Storage::NandUser, 0x0100ABCD00010800).unwrap());
    }

    #[test]
    fn test_search_truncates() {
        let db = FakeDatabase::default();
        for i in 0..(MAX_TITLE_COUNT as u64 + 3) {
            db.add(0x0100000000000000 | (i << 16), ContentMetaType::Application, Storage::SdCard, vec![]);
        }
        let apps = search_titles(&db, ContentMetaType::Application, Storage::SdCard).unwrap();
        assert_eq!(apps.items.len(), MAX_TITLE_COUNT);
        assert!(apps.truncated);
    }

    #[test]
    fn test_contents() {
        let db = FakeDatabase::default();
        db.add(0x0100ABCD00010000, ContentMetaType::Application, Storage::SdCard,
               vec![info(ContentType::Meta, 0x1000), info(ContentType::Program, 0x200000), info(ContentType::Control, 0x3000)]);
        let title = locate(&db, 0x0100ABCD00010000).unwrap();
        let contents = title.contents(&db).unwrap();
        assert!(!contents.program.empty);
        assert_eq!(contents.program.size, 0x200000);
        assert!(contents.data.empty);
        assert_eq!(contents.data.size, 0);
        assert!(contents.legal_info.empty);
        assert_eq!(contents.total_size(), 0x1000 + 0x200000 + 0x3000);
        assert_eq!(contents.iter().filter(|c| c.empty).count(), 3);
        assert_eq!(contents.meta.file_name(), format!("{}.cnmt.nca", "00".repeat(16)));
        assert_eq!(contents.control.file_name(), format!("{}.nca", "03".repeat(16)));
        assert_eq!(contents.get(ContentType::DeltaFragment), None);
    }

    #[test]
    fn test_classification() {
        let base = Title::from_key(ContentMetaKey { id: 0x0100ABCD00010000, version: 0, meta_type: ContentMetaType::Application, install_type: 0 }, Storage::SdCard);
        let update = Title::from_key(ContentMetaKey { id: 0x0100ABCD00010800, version: 0x10000, meta_type: ContentMetaType::Patch, install_type: 0 }, Storage::SdCard);
        let dlc = Title::from_key(ContentMetaKey { id: 0x0100ABCD00011003, version: 0, meta_type: ContentMetaType::AddOnContent, install_type: 0 }, Storage::SdCard);
        assert!(base.is_base_title() && !base.is_update() && !base.is_dlc());
        assert!(update.is_update() && !update.is_base_title());
        assert!(dlc.is_dlc() && !dlc.is_base_title());
        assert!(update.check_base(&base));
        assert!(dlc.check_base(&base));
        assert!(!base.check_base(&update));
        assert!(!dlc.check_base(&update));
        assert_eq!(update.formatted_application_id(), "0100ABCD00010800");
    }

    #[test]
    fn test_removal_surfaces_errors() {
        let db = FakeDatabase { fail_removal: true, ..Default::default() };
        db.add(0x0100ABCD00010000, ContentMetaType::Application, Storage::SdCard, vec![]);
        let title = locate(&db, 0x0100ABCD00010000).unwrap();
        assert!(matches!(remove_title(&db, &title), Err(TitleError::Service(ServiceError::ResultCode { code: 0x805, .. }))));
        let db = FakeDatabase::default();
        db.add(0x0100ABCD00010000, ContentMetaType::Application, Storage::SdCard, vec![]);
        remove_title(&db, &title).unwrap();
        assert!(matches!(locate(&db, 0x0100ABCD00010000), Err(TitleError::NotFound(_))));
    }

    #[test]
    fn test_tickets() {
        let rights = FakeRights {
            common: vec![RightsId::new(0x0100ABCD00010000, 0xB)],
            personalized: vec![RightsId::new(0x0100ABCD00010800, 0xC), RightsId::new(0x0100ABCD00011001, 0xC)],
        };
        let tickets = get_all_tickets(&rights).unwrap();
        assert_eq!(tickets.items.len(), 3);
        assert!(!tickets.truncated);
        assert_eq!(tickets.items[0].ticket_type, TicketType::Common);
        assert_eq!(tickets.items[2].ticket_type, TicketType::Personalized);
        remove_ticket(&rights, &tickets.items[1]).unwrap();
        let missing = Ticket { rights_id: RightsId::default(), ticket_type: TicketType::Common };
        assert!(matches!(remove_ticket(&rights, &missing), Err(TitleError::Service(ServiceError::NotFound))));
    }

    #[test]
    fn test_format_size() {
        assert_eq!(format_size(0), "0 bytes");
        assert_eq!(format_size(1023), "1023 bytes");
        assert_eq!(format_size(1536), "1.50 KB");
        assert_eq!(format_size(5 * 1024 * 1024), "5.00 MB");
        assert_eq!(format_size(3 * 1024 * 1024 * 1024), "3.00 GB");
    }
}
