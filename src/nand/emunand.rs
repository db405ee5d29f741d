// nand/emunand.rs from rustnx (c) 2025 NinjaCheetah & Contributors
// https://github.com/NinjaCheetah/rustnx
//
// Implements the structures and methods required for handling Switch EmuNANDs, which act as both
// the content database and the ticket store for installed titles.

use std::fs;
use std::ops::ControlFlow;
use std::path::{Path, PathBuf};
use thiserror::Error;
use crate::archive::pfs0::{ExtractOptions, PFS0, PFS0Error};
use crate::storage::{Explorer, LocalExplorer, StorageError};
use crate::title::{ids, ContentId, ServiceError};
use crate::title::cnmt::{ContentMeta, ContentMetaError, PackagedContentInfo};
use crate::title::es::{RightsId, RightsManager};
use crate::title::ncm::{ContentDatabase, ContentInfo, ContentMetaKey, ContentMetaType, ContentType, Storage};
use crate::title::ticket::{self, TicketError, TicketFile, TicketType};

#[derive(Debug, Error)]
pub enum EmuNANDError {
    #[error("EmuNAND requires the directory `{0}`, but a file with that name already exists")]
    DirectoryNameConflict(String),
    #[error("specified EmuNAND root does not exist")]
    RootNotFound,
    #[error("package does not contain a content meta (.cnmt) entry")]
    MissingContentMeta,
    #[error("package does not contain the content `{0}`")]
    MissingContent(String),
    #[error("content `{0}` does not match the hash in its content meta record")]
    HashMismatch(String),
    #[error("`{0}` is not a valid content file name")]
    InvalidContentName(String),
    #[error("PFS0 processing error")]
    PFS0(#[from] PFS0Error),
    #[error("content meta processing error")]
    ContentMeta(#[from] ContentMetaError),
    #[error("Ticket processing error")]
    Ticket(#[from] TicketError),
    #[error("EmuNAND service error")]
    Service(#[from] ServiceError),
    #[error("storage error occurred during EmuNAND operation")]
    Storage(#[from] StorageError),
    #[error("io error occurred during EmuNAND operation")]
    IO(#[from] std::io::Error),
}

fn safe_create_dir(dir: &Path) -> Result<(), EmuNANDError> {
    if !dir.exists() {
        fs::create_dir(dir)?;
    } else if !dir.is_dir() {
        return Err(EmuNANDError::DirectoryNameConflict(dir.display().to_string()));
    }
    Ok(())
}

/// Gets the directory under the EmuNAND root that holds a storage location.
pub fn storage_dir(storage: Storage) -> &'static str {
    match storage {
        Storage::GameCart => "gamecard",
        Storage::NandSystem => "system",
        Storage::NandUser => "user",
        Storage::SdCard => "sdcard",
    }
}

fn ticket_dir(ticket_type: TicketType) -> &'static str {
    match ticket_type {
        TicketType::Common => "ticket/common",
        TicketType::Personalized => "ticket/personalized",
    }
}

fn meta_path(storage: Storage, application_id: u64) -> String {
    format!("{}/Meta/{:016X}.cnmt", storage_dir(storage), application_id)
}

fn content_path(storage: Storage, info: &ContentInfo) -> String {
    format!("{}/Contents/{}", storage_dir(storage), ContentId::from_info(info, storage).file_name())
}

/// Parses the content ID out of a content file name like `<32 hex digits>.cnmt.nca`.
fn content_id_from_name(name: &str) -> Option<[u8; 16]> {
    let stem = name.split('.').next()?;
    hex::decode(stem).ok()?.try_into().ok()
}

#[derive(Debug, Clone, Default)]
/// Options that control how a package is installed.
pub struct InstallOptions {
    /// Check every content against the SHA-256 hash in the content meta record before copying it.
    pub verify_hashes: bool,
    pub extract: ExtractOptions,
}

/// An EmuNAND object that allows for creating and modifying Switch EmuNANDs.
pub struct EmuNAND {
    emunand_root: PathBuf,
    explorer: LocalExplorer,
}

impl EmuNAND {
    /// Open an existing EmuNAND in an EmuNAND instance that can be used to interact with it. This
    /// will initialize the basic directory structure if it doesn't already exist, but will not do
    /// anything beyond that.
    pub fn open(emunand_root: PathBuf) -> Result<Self, EmuNANDError> {
        if !emunand_root.exists() {
            return Err(EmuNANDError::RootNotFound);
        }
        for storage in Storage::ALL {
            let storage_root = emunand_root.join(storage_dir(storage));
            safe_create_dir(&storage_root)?;
            safe_create_dir(&storage_root.join("Contents"))?;
            safe_create_dir(&storage_root.join("Meta"))?;
        }
        safe_create_dir(&emunand_root.join("ticket"))?;
        safe_create_dir(&emunand_root.join("ticket").join("common"))?;
        safe_create_dir(&emunand_root.join("ticket").join("personalized"))?;
        let explorer = LocalExplorer::new(emunand_root.clone());
        Ok(EmuNAND {
            emunand_root,
            explorer,
        })
    }

    pub fn root(&self) -> &Path {
        &self.emunand_root
    }

    /// Gets the Explorer used to access files inside the EmuNAND.
    pub fn explorer(&self) -> &LocalExplorer {
        &self.explorer
    }

    /// Lists the names of the files in a directory of the EmuNAND that end with `extension`.
    fn list_files(&self, dir: &str, extension: &str) -> Result<Vec<String>, ServiceError> {
        let mut names = Vec::new();
        for entry in fs::read_dir(self.explorer.full_path(dir)?)? {
            let entry = entry?;
            if !entry.file_type()?.is_file() {
                continue;
            }
            if let Some(name) = entry.file_name().to_str() {
                if name.to_ascii_lowercase().ends_with(extension) {
                    names.push(name.to_string());
                }
            }
        }
        names.sort();
        Ok(names)
    }

    fn read_content_meta(&self, storage: Storage, application_id: u64) -> Result<ContentMeta, ServiceError> {
        let path = meta_path(storage, application_id);
        if !self.explorer.exists(&path) {
            return Err(ServiceError::NotFound);
        }
        Ok(ContentMeta::from_bytes(&self.explorer.read_all(&path)?)?)
    }

    /// Finds the directory an installed ticket lives in, if it's installed at all.
    fn find_ticket(&self, rights_id: &RightsId) -> Option<String> {
        [TicketType::Common, TicketType::Personalized].into_iter()
            .map(|ticket_type| format!("{}/{}.tik", ticket_dir(ticket_type), rights_id))
            .find(|path| self.explorer.exists(path))
    }

    /// Reads an installed ticket. Returns None if no ticket with that Rights ID is installed.
    pub fn ticket_file(&self, rights_id: &RightsId) -> Result<Option<TicketFile>, EmuNANDError> {
        match self.find_ticket(rights_id) {
            Some(path) => Ok(Some(ticket::read_ticket_file(&self.explorer, &path)?)),
            None => Ok(None),
        }
    }

    /// Install a PFS0 package (NSP) to the specified storage location. Any tickets in the package
    /// are imported first, then each content listed in the package's content meta record is
    /// copied out of the package, and finally the record itself is written so that the title
    /// shows up as installed.
    ///
    /// `progress` is called after every chunk copied with the name of the entry being copied,
    /// the bytes copied so far and the entry's size. Returning `ControlFlow::Break` cancels the
    /// install; content copied before the cancellation is left behind, but the record isn't
    /// written.
    pub fn install_package<F>(&self, package: &PFS0, storage: Storage, options: &InstallOptions,
                              mut progress: F) -> Result<ContentMetaKey, EmuNANDError>
    where
        F: FnMut(&str, u64, u64) -> ControlFlow<()>,
    {
        // Tickets are imported along with their matching certificate chain, when the package has
        // one.
        for index in package.find_entries_by_extension(".tik") {
            let name = package.entry_name(index).unwrap_or_default();
            let ticket_data = package.read_entry(index)?;
            let cert_name = format!("{}.cert", &name[..name.len() - 4]);
            let cert_data = match package.find_entry_by_name(&cert_name) {
                Some(cert_index) => package.read_entry(cert_index)?,
                None => Vec::new(),
            };
            self.import_ticket(&ticket_data, &cert_data)?;
        }
        let meta_index = package.find_entries_by_extension(".cnmt").next().ok_or(EmuNANDError::MissingContentMeta)?;
        let mut content_meta = ContentMeta::from_bytes(&package.read_entry(meta_index)?)?;
        for content in &content_meta.contents {
            if content.info.content_type == ContentType::Meta {
                continue;
            }
            let name = ContentId::from_info(&content.info, storage).file_name();
            let index = package.find_entry_by_name(&name).ok_or_else(|| EmuNANDError::MissingContent(name.clone()))?;
            if options.verify_hashes && package.hash_entry(index)? != Some(content.hash) {
                return Err(EmuNANDError::HashMismatch(name));
            }
            package.extract_to_with_progress(index, &self.explorer, &content_path(storage, &content.info),
                                             &options.extract, |written, total| progress(&name, written, total))?;
        }
        // The meta NCA that carries the record is installed as the title's Meta content.
        if content_meta.content(ContentType::Meta).is_none() {
            if let Some(index) = package.find_entries_by_extension(".cnmt.nca").next() {
                let name = package.entry_name(index).unwrap_or_default().to_string();
                let content_id = content_id_from_name(&name).ok_or_else(|| EmuNANDError::InvalidContentName(name.clone()))?;
                let info = ContentInfo {
                    content_id,
                    size: package.entry_size(index).unwrap_or(0),
                    content_type: ContentType::Meta,
                };
                let hash = package.hash_entry(index)?.unwrap_or([0; 32]);
                package.extract_to_with_progress(index, &self.explorer, &content_path(storage, &info),
                                                 &options.extract, |written, total| progress(&name, written, total))?;
                content_meta.contents.push(PackagedContentInfo { hash, info, id_offset: 0 });
            }
        }
        content_meta.header.storage_id = storage.storage_id();
        let key = content_meta.key();
        self.explorer.write_all(&meta_path(storage, key.id), &content_meta.to_bytes()?)?;
        tracing::info!(application_id = %ids::format_application_id(key.id), meta_type = %key.meta_type,
                       location = %storage, contents = content_meta.contents.len(), "installed package");
        Ok(key)
    }
}

impl ContentDatabase for EmuNAND {
    fn list_content_meta(&self, meta_type: Option<ContentMetaType>, storage: Storage) -> Result<Vec<ContentMetaKey>, ServiceError> {
        let mut keys = Vec::new();
        let meta_dir = format!("{}/Meta", storage_dir(storage));
        for name in self.list_files(&meta_dir, ".cnmt")? {
            let data = self.explorer.read_all(&format!("{}/{}", meta_dir, name))?;
            let key = ContentMeta::from_bytes(&data)?.key();
            if meta_type.is_none_or(|meta_type| key.meta_type == meta_type) {
                keys.push(key);
            }
        }
        Ok(keys)
    }

    fn content_info(&self, key: &ContentMetaKey, storage: Storage, content_type: ContentType) -> Result<Option<ContentInfo>, ServiceError> {
        let content_meta = self.read_content_meta(storage, key.id)?;
        if content_meta.key() != *key {
            return Err(ServiceError::NotFound);
        }
        Ok(content_meta.content(content_type).map(|content| content.info))
    }

    fn remove_content_meta(&self, key: &ContentMetaKey, storage: Storage) -> Result<(), ServiceError> {
        let content_meta = self.read_content_meta(storage, key.id)?;
        if content_meta.key() != *key {
            return Err(ServiceError::NotFound);
        }
        for content in &content_meta.contents {
            self.explorer.delete_file(&content_path(storage, &content.info))?;
        }
        self.explorer.delete_file(&meta_path(storage, key.id))?;
        Ok(())
    }
}

impl RightsManager for EmuNAND {
    fn import_ticket(&self, ticket: &[u8], cert: &[u8]) -> Result<(), ServiceError> {
        let ticket_file = TicketFile::from_bytes(ticket)?;
        let rights_id = ticket_file.data.rights_id;
        // A ticket can only be installed once, so replace any copy of the other type.
        if let Some(existing) = self.find_ticket(&rights_id) {
            self.explorer.delete_file(&existing)?;
        }
        let dir = ticket_dir(ticket_file.ticket_type());
        self.explorer.write_all(&format!("{}/{}.tik", dir, rights_id), ticket)?;
        if !cert.is_empty() {
            self.explorer.write_all(&format!("{}/{}.cert", dir, rights_id), cert)?;
        }
        tracing::info!(rights_id = %rights_id, ticket_type = %ticket_file.ticket_type(), "imported ticket");
        Ok(())
    }

    fn delete_ticket(&self, rights_id: &RightsId) -> Result<(), ServiceError> {
        let path = self.find_ticket(rights_id).ok_or(ServiceError::NotFound)?;
        self.explorer.delete_file(&path)?;
        self.explorer.delete_file(&format!("{}.cert", &path[..path.len() - 4]))?;
        Ok(())
    }

    fn count_tickets(&self, ticket_type: TicketType) -> Result<u32, ServiceError> {
        Ok(self.list_files(ticket_dir(ticket_type), ".tik")?.len() as u32)
    }

    fn list_tickets(&self, ticket_type: TicketType, max: usize) -> Result<Vec<RightsId>, ServiceError> {
        Ok(self.list_files(ticket_dir(ticket_type), ".tik")?.iter()
            .filter_map(|name| RightsId::from_hex(&name[..name.len() - 4]))
            .take(max)
            .collect())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::archive::pfs0::PFS0Builder;
    use crate::storage::MemoryExplorer;
    use crate::title;
    use crate::title::ticket::TicketSignature;
    use crate::title::ticket::tests::build_ticket;
    use sha2::{Digest, Sha256};

    const APP_ID: u64 = 0x0100ABCD00010000;

    fn packaged(content_id: [u8; 16], content_type: ContentType, data: &[u8]) -> PackagedContentInfo {
        PackagedContentInfo {
            hash: Sha256::digest(data).into(),
            info: ContentInfo { content_id, size: data.len() as u64, content_type },
            id_offset: 0,
        }
    }

    fn build_package(corrupt: bool) -> Vec<u8> {
        let program = vec![0x11u8; 0x300];
        let control = vec![0x22u8; 0x40];
        let mut meta = ContentMeta::new(APP_ID, 0, ContentMetaType::Application);
        meta.contents.push(packaged([0xA1; 16], ContentType::Program, &program));
        meta.contents.push(packaged([0xC2; 16], ContentType::Control, &control));
        let rights_id = RightsId::new(APP_ID, 0xB);
        let mut builder = PFS0Builder::new();
        builder
            .add_file(&format!("{}.nca", hex::encode([0xA1; 16])), if corrupt { vec![0u8; 0x300] } else { program })
            .add_file(&format!("{}.nca", hex::encode([0xC2; 16])), control)
            .add_file(&format!("{}.cnmt.nca", hex::encode([0x3E; 16])), vec![0x33u8; 0x80])
            .add_file("Application_0100abcd00010000.cnmt", meta.to_bytes().unwrap())
            .add_file(&format!("{}.tik", rights_id), build_ticket(TicketSignature::Rsa2048Sha256, rights_id, false))
            .add_file(&format!("{}.cert", rights_id), vec![0x44u8; 0x700]);
        builder.to_bytes().unwrap()
    }

    fn install(emunand: &EmuNAND, data: Vec<u8>, options: &InstallOptions) -> Result<ContentMetaKey, EmuNANDError> {
        let source = MemoryExplorer::new();
        source.insert("game.nsp", data);
        let package = PFS0::open(&source, "game.nsp")?;
        emunand.install_package(&package, Storage::SdCard, options, |_, _, _| ControlFlow::Continue(()))
    }

    #[test]
    fn test_open_creates_layout() {
        let dir = tempfile::tempdir().unwrap();
        let emunand = EmuNAND::open(dir.path().to_path_buf()).unwrap();
        assert!(dir.path().join("sdcard").join("Contents").is_dir());
        assert!(dir.path().join("system").join("Meta").is_dir());
        assert!(dir.path().join("ticket").join("personalized").is_dir());
        assert_eq!(emunand.root(), dir.path());
        assert!(matches!(EmuNAND::open(dir.path().join("missing")), Err(EmuNANDError::RootNotFound)));
    }

    #[test]
    fn test_directory_conflict() {
        let dir = tempfile::tempdir().unwrap();
        fs::write(dir.path().join("user"), b"not a directory").unwrap();
        assert!(matches!(EmuNAND::open(dir.path().to_path_buf()), Err(EmuNANDError::DirectoryNameConflict(_))));
    }

    #[test]
    fn test_install_and_query() {
        let dir = tempfile::tempdir().unwrap();
        let emunand = EmuNAND::open(dir.path().to_path_buf()).unwrap();
        let options = InstallOptions { verify_hashes: true, ..Default::default() };
        let key = install(&emunand, build_package(false), &options).unwrap();
        assert_eq!(key.id, APP_ID);
        let apps = title::search_titles(&emunand, ContentMetaType::Application, Storage::SdCard).unwrap();
        assert_eq!(apps.items.len(), 1);
        let installed = title::locate(&emunand, APP_ID).unwrap();
        assert_eq!(installed.location, Storage::SdCard);
        let contents = installed.contents(&emunand).unwrap();
        assert_eq!(contents.program.size, 0x300);
        assert_eq!(contents.control.size, 0x40);
        assert_eq!(contents.meta.content_id, [0x3E; 16]);
        assert!(contents.data.empty);
        assert_eq!(contents.total_size(), 0x300 + 0x40 + 0x80);
        let program_path = dir.path().join("sdcard").join("Contents").join(contents.program.file_name());
        assert_eq!(fs::read(program_path).unwrap(), vec![0x11u8; 0x300]);
        assert!(dir.path().join("sdcard").join("Contents").join(contents.meta.file_name()).exists());
        // The ticket and its certificate were imported as a common ticket.
        let tickets = title::get_all_tickets(&emunand).unwrap();
        assert_eq!(tickets.items.len(), 1);
        assert_eq!(tickets.items[0].ticket_type, TicketType::Common);
        assert_eq!(tickets.items[0].application_id(), APP_ID);
        let ticket_file = emunand.ticket_file(&tickets.items[0].rights_id).unwrap().unwrap();
        assert_eq!(ticket_file.application_id(), APP_ID);
        assert!(dir.path().join("ticket").join("common").join(format!("{}.cert", tickets.items[0].rights_id)).exists());
    }

    #[test]
    fn test_install_hash_mismatch() {
        let dir = tempfile::tempdir().unwrap();
        let emunand = EmuNAND::open(dir.path().to_path_buf()).unwrap();
        let options = InstallOptions { verify_hashes: true, ..Default::default() };
        assert!(matches!(install(&emunand, build_package(true), &options), Err(EmuNANDError::HashMismatch(_))));
        assert!(!title::exists_title(&emunand, ContentMetaType::Application, Storage::SdCard, APP_ID).unwrap());
        // Without verification the same package installs.
        install(&emunand, build_package(true), &InstallOptions::default()).unwrap();
        assert!(title::exists_title(&emunand, ContentMetaType::Application, Storage::SdCard, APP_ID).unwrap());
    }

    #[test]
    fn test_install_cancelled() {
        let dir = tempfile::tempdir().unwrap();
        let emunand = EmuNAND::open(dir.path().to_path_buf()).unwrap();
        let source = MemoryExplorer::new();
        source.insert("game.nsp", build_package(false));
        let package = PFS0::open(&source, "game.nsp").unwrap();
        let result = emunand.install_package(&package, Storage::SdCard, &InstallOptions::default(),
                                             |_, _, _| ControlFlow::Break(()));
        assert!(matches!(result, Err(EmuNANDError::PFS0(PFS0Error::Cancelled))));
        assert!(title::search_titles(&emunand, ContentMetaType::Application, Storage::SdCard).unwrap().items.is_empty());
    }

    #[test]
    fn test_install_missing_meta() {
        let dir = tempfile::tempdir().unwrap();
        let emunand = EmuNAND::open(dir.path().to_path_buf()).unwrap();
        let mut builder = PFS0Builder::new();
        builder.add_file("readme.txt", b"hello".to_vec());
        let result = install(&emunand, builder.to_bytes().unwrap(), &InstallOptions::default());
        assert!(matches!(result, Err(EmuNANDError::MissingContentMeta)));
    }

    #[test]
    fn test_remove_title() {
        let dir = tempfile::tempdir().unwrap();
        let emunand = EmuNAND::open(dir.path().to_path_buf()).unwrap();
        install(&emunand, build_package(false), &InstallOptions::default()).unwrap();
        let installed = title::locate(&emunand, APP_ID).unwrap();
        title::remove_title(&emunand, &installed).unwrap();
        assert!(matches!(title::locate(&emunand, APP_ID), Err(title::TitleError::NotFound(APP_ID))));
        assert_eq!(fs::read_dir(dir.path().join("sdcard").join("Contents")).unwrap().count(), 0);
        assert!(matches!(title::remove_title(&emunand, &installed),
                         Err(title::TitleError::Service(ServiceError::NotFound))));
    }

    #[test]
    fn test_ticket_management() {
        let dir = tempfile::tempdir().unwrap();
        let emunand = EmuNAND::open(dir.path().to_path_buf()).unwrap();
        let common = RightsId::new(APP_ID, 0xB);
        let personalized = RightsId::new(0x0100ABCD00010800, 0xC);
        emunand.import_ticket(&build_ticket(TicketSignature::Rsa2048Sha256, common, false), &[]).unwrap();
        emunand.import_ticket(&build_ticket(TicketSignature::Rsa4096Sha256, personalized, true), &[]).unwrap();
        assert_eq!(emunand.count_tickets(TicketType::Common).unwrap(), 1);
        assert_eq!(emunand.count_tickets(TicketType::Personalized).unwrap(), 1);
        assert_eq!(emunand.list_tickets(TicketType::Personalized, 10).unwrap(), vec![personalized]);
        assert!(emunand.list_tickets(TicketType::Common, 0).unwrap().is_empty());
        emunand.delete_ticket(&common).unwrap();
        assert_eq!(emunand.count_tickets(TicketType::Common).unwrap(), 0);
        assert!(matches!(emunand.delete_ticket(&common), Err(ServiceError::NotFound)));
        assert!(emunand.ticket_file(&common).unwrap().is_none());
        let mut bad = build_ticket(TicketSignature::Rsa2048Sha256, common, false);
        bad[0..4].copy_from_slice(&0x20000u32.to_le_bytes());
        assert!(matches!(emunand.import_ticket(&bad, &[]),
                         Err(ServiceError::Ticket(TicketError::InvalidSignature(0x20000)))));
    }

    #[test]
    fn test_install_update_alongside_base() {
        const PATCH_ID: u64 = 0x0100ABCD00010800;
        let package = |application_id: u64, meta_type: ContentMetaType, program: &[u8]| {
            let content_id = [(application_id >> 8) as u8; 16];
            let mut meta = ContentMeta::new(application_id, 0x10000, meta_type);
            meta.contents.push(packaged(content_id, ContentType::Program, program));
            let rights_id = RightsId::new(application_id, 0xC);
            let mut builder = PFS0Builder::new();
            builder
                .add_file(&format!("{}.nca", hex::encode(content_id)), program.to_vec())
                .add_file("meta.cnmt", meta.to_bytes().unwrap())
                .add_file(&format!("{}.tik", rights_id), build_ticket(TicketSignature::Rsa2048Sha256, rights_id, false));
            builder.to_bytes().unwrap()
        };
        let packages = tempfile::tempdir().unwrap();
        let dir = tempfile::tempdir().unwrap();
        fs::write(packages.path().join("base.nsp"), package(APP_ID, ContentMetaType::Application, &[0x5A; 0x1234])).unwrap();
        fs::write(packages.path().join("update.nsp"), package(PATCH_ID, ContentMetaType::Patch, &[0xA5; 0x999])).unwrap();
        let source = LocalExplorer::new(packages.path());
        let emunand = EmuNAND::open(dir.path().to_path_buf()).unwrap();
        // Small chunks make sure large entries are streamed in more than one piece.
        let options = InstallOptions {
            verify_hashes: true,
            extract: ExtractOptions { buffer_size: 0x100, ..Default::default() },
        };
        let mut chunks = 0;
        for (name, storage) in [("base.nsp", Storage::SdCard), ("update.nsp", Storage::NandUser)] {
            let package = PFS0::open(&source, name).unwrap();
            emunand.install_package(&package, storage, &options, |_, written, total| {
                assert!(written <= total);
                chunks += 1;
                ControlFlow::Continue(())
            }).unwrap();
        }
        assert_eq!(chunks, 0x1234 / 0x100 + 1 + 0x999 / 0x100 + 1);

        let base = title::locate(&emunand, APP_ID).unwrap();
        let update = title::locate(&emunand, PATCH_ID).unwrap();
        assert_eq!(base.location, Storage::SdCard);
        assert_eq!(update.location, Storage::NandUser);
        assert!(update.is_update());
        assert!(update.check_base(&base));
        assert_eq!(update.version, 0x10000);
        let contents = update.contents(&emunand).unwrap();
        assert_eq!(contents.program.size, 0x999);
        assert!(contents.meta.empty);
        assert_eq!(contents.formatted_total_size(), "2.40 KB");

        let tickets = title::get_all_tickets(&emunand).unwrap();
        assert_eq!(tickets.items.len(), 2);
        assert!(tickets.items.iter().all(|ticket| ticket.ticket_type == TicketType::Common));

        title::remove_title(&emunand, &update).unwrap();
        assert!(!title::exists_title(&emunand, ContentMetaType::Patch, Storage::NandUser, PATCH_ID).unwrap());
        assert!(title::exists_title(&emunand, ContentMetaType::Application, Storage::SdCard, APP_ID).unwrap());
        title::remove_ticket(&emunand, &tickets.items[0]).unwrap();
        assert_eq!(title::get_all_tickets(&emunand).unwrap().items.len(), 1);
    }
}
