// nand/emunand.rs from rustnx (c) 2025 NinjaCheetah & Contributors
// https://github.com/NinjaCheetah/rustnx
//
// Code for EmuNAND-related commands in the rustnx CLI.

use std::fs;
use std::ops::ControlFlow;
use std::path::{Path, PathBuf};
use anyhow::{bail, Context, Result};
use clap::{Subcommand, ValueEnum};
use glob::glob;
use rustnx::archive::pfs0;
use rustnx::nand::emunand;
use rustnx::title;
use rustnx::title::es::{RightsId, RightsManager};
use rustnx::title::ncm::{ContentMetaType, Storage};
use crate::archive::pfs0::local_file;

#[derive(Clone, Copy, ValueEnum)]
pub enum StorageArg {
    /// The SD card
    Sdcard,
    /// The user partition of the NAND
    User,
    /// The system partition of the NAND
    System,
    /// The inserted game card
    Gamecard,
}

impl From<StorageArg> for Storage {
    fn from(value: StorageArg) -> Self {
        match value {
            StorageArg::Sdcard => Storage::SdCard,
            StorageArg::User => Storage::NandUser,
            StorageArg::System => Storage::NandSystem,
            StorageArg::Gamecard => Storage::GameCart,
        }
    }
}

#[derive(Subcommand)]
#[command(arg_required_else_help = true)]
pub enum Commands {
    /// Install an NSP to an EmuNAND
    Install {
        /// The path to the NSP to install
        input: String,
        /// The path to the target EmuNAND
        emunand: String,
        /// The storage location to install the title to
        #[arg(short, long, value_enum, default_value_t = StorageArg::Sdcard)]
        storage: StorageArg,
        /// Verify the SHA-256 hash of every content before installing it
        #[arg(long)]
        verify: bool,
        /// The size of each chunk copied, in bytes
        #[arg(long, default_value_t = pfs0::TRANSFER_BUFFER_SIZE)]
        buffer_size: usize,
    },
    /// List the titles installed to an EmuNAND
    List {
        /// The path to the EmuNAND
        emunand: String,
        /// Only list titles in this storage location
        #[arg(short, long, value_enum)]
        storage: Option<StorageArg>,
    },
    /// Show the contents of an installed title
    Contents {
        /// The path to the EmuNAND
        emunand: String,
        /// The application ID of the title
        application_id: String,
    },
    /// Remove an installed title and all of its contents
    Remove {
        /// The path to the EmuNAND
        emunand: String,
        /// The application ID of the title to remove
        application_id: String,
    },
    /// List the tickets installed to an EmuNAND
    Tickets {
        /// The path to the EmuNAND
        emunand: String,
    },
    /// Remove an installed ticket
    RemoveTicket {
        /// The path to the EmuNAND
        emunand: String,
        /// The Rights ID of the ticket to remove
        rights_id: String,
    },
    /// Import tickets (and their certificates, if present) into an EmuNAND
    ImportTickets {
        /// A directory of tickets, or a glob pattern matching ticket files
        input: String,
        /// The path to the target EmuNAND
        emunand: String,
    },
}

const LISTED_TYPES: [ContentMetaType; 3] = [ContentMetaType::Application, ContentMetaType::Patch, ContentMetaType::AddOnContent];

fn open_emunand(emunand: &str) -> Result<emunand::EmuNAND> {
    let emunand_path = Path::new(emunand);
    if !emunand_path.exists() {
        bail!("Target EmuNAND directory \"{}\" could not be found.", emunand_path.display());
    }
    emunand::EmuNAND::open(emunand_path.to_path_buf())
        .with_context(|| format!("The EmuNAND at \"{}\" could not be opened.", emunand_path.display()))
}

fn parse_application_id(application_id: &str) -> Result<u64> {
    let trimmed = application_id.trim_start_matches("0x").trim_start_matches("0X");
    if trimmed.len() != 16 {
        bail!("Application ID \"{}\" must be 16 hex digits.", application_id);
    }
    u64::from_str_radix(trimmed, 16).with_context(|| format!("Application ID \"{}\" is not valid hex.", application_id))
}

pub fn install_package(input: &str, emunand: &str, storage: StorageArg, verify: bool, buffer_size: usize) -> Result<()> {
    let nsp_path = Path::new(input);
    if !nsp_path.exists() {
        bail!("Source NSP \"{}\" could not be found.", nsp_path.display());
    }
    let emunand = open_emunand(emunand)?;
    let (explorer, name) = local_file(nsp_path)?;
    let package = pfs0::PFS0::open(&explorer, &name)
        .with_context(|| format!("The provided NSP \"{}\" appears to be invalid.", nsp_path.display()))?;
    let options = emunand::InstallOptions {
        verify_hashes: verify,
        extract: pfs0::ExtractOptions { buffer_size, ..Default::default() },
    };
    let mut current = String::new();
    let key = emunand.install_package(&package, storage.into(), &options, |entry, written, total| {
        if entry != current {
            println!("Installing \"{}\" ({})...", entry, title::format_size(total));
            current = entry.to_string();
        }
        tracing::debug!(entry, written, total, "installing");
        ControlFlow::Continue(())
    }).with_context(|| format!("Failed to install NSP \"{}\".", nsp_path.display()))?;
    println!("Successfully installed {} {} (v{}) to EmuNAND at \"{}\"!", key.meta_type,
             title::ids::format_application_id(key.id), key.version, emunand.root().display());
    Ok(())
}

pub fn list_titles(emunand: &str, storage: Option<StorageArg>) -> Result<()> {
    let emunand = open_emunand(emunand)?;
    let locations: Vec<Storage> = match storage {
        Some(storage) => vec![storage.into()],
        None => Storage::ALL.to_vec(),
    };
    for location in locations {
        println!("{}", location);
        let mut found = false;
        for meta_type in LISTED_TYPES {
            let listing = title::search_titles(&emunand, meta_type, location)?;
            if listing.truncated {
                tracing::warn!(location = %location, meta_type = %meta_type, "title listing was truncated");
            }
            for installed in listing.items {
                found = true;
                println!("  {} ({}, v{})", installed.formatted_application_id(), installed.meta_type, installed.version);
            }
        }
        if !found {
            println!("  No titles installed.");
        }
    }
    Ok(())
}

pub fn show_contents(emunand: &str, application_id: &str) -> Result<()> {
    let application_id = parse_application_id(application_id)?;
    let emunand = open_emunand(emunand)?;
    let installed = title::locate(&emunand, application_id)?;
    let contents = installed.contents(&emunand)?;
    println!("Title {} ({}, v{})", installed.formatted_application_id(), installed.meta_type, installed.version);
    println!("  Location: {}", installed.location);
    if !installed.is_base_title() {
        println!("  Base Application ID: {}", title::ids::format_application_id(installed.base_application_id()));
    }
    println!("  Installed Size: {}", contents.formatted_total_size());
    println!("  Contents:");
    for content in contents.iter() {
        if content.empty {
            println!("    {}: None", content.content_type);
        } else {
            println!("    {}: {} ({})", content.content_type, content.file_name(), title::format_size(content.size));
        }
    }
    Ok(())
}

pub fn remove_title(emunand: &str, application_id: &str) -> Result<()> {
    let application_id = parse_application_id(application_id)?;
    let emunand = open_emunand(emunand)?;
    let installed = title::locate(&emunand, application_id)?;
    title::remove_title(&emunand, &installed)?;
    println!("Successfully removed title {} from {}!", installed.formatted_application_id(), installed.location);
    Ok(())
}

pub fn list_tickets(emunand: &str) -> Result<()> {
    let emunand = open_emunand(emunand)?;
    let tickets = title::get_all_tickets(&emunand)?;
    if tickets.items.is_empty() {
        println!("No tickets installed.");
        return Ok(());
    }
    for ticket in &tickets.items {
        println!("{} ({}, Application ID: {}, Key Generation: {})", ticket, ticket.ticket_type,
                 title::ids::format_application_id(ticket.application_id()), ticket.key_generation());
    }
    if tickets.truncated {
        println!("Only the first {} tickets are shown.", tickets.items.len());
    }
    Ok(())
}

pub fn remove_ticket(emunand: &str, rights_id: &str) -> Result<()> {
    let Some(rights_id) = RightsId::from_hex(rights_id) else {
        bail!("Rights ID \"{}\" must be 32 hex digits.", rights_id);
    };
    let emunand = open_emunand(emunand)?;
    let Some(ticket) = emunand.ticket_file(&rights_id)? else {
        bail!("No ticket with Rights ID {} is installed.", rights_id);
    };
    title::remove_ticket(&emunand, &ticket.to_ticket())?;
    println!("Successfully removed ticket {}!", rights_id);
    Ok(())
}

pub fn import_tickets(input: &str, emunand: &str) -> Result<()> {
    let in_path = Path::new(input);
    let pattern = if in_path.is_dir() {
        in_path.join("*.tik").to_string_lossy().to_string()
    } else {
        input.to_string()
    };
    let emunand = open_emunand(emunand)?;
    let paths: Vec<PathBuf> = glob(&pattern)
        .with_context(|| format!("\"{}\" is not a valid glob pattern.", pattern))?
        .filter_map(|path| path.ok())
        .collect();
    if paths.is_empty() {
        bail!("No tickets were found matching \"{}\".", pattern);
    }
    let mut imported = 0;
    for path in paths {
        let ticket_data = fs::read(&path).with_context(|| format!("Failed to open ticket \"{}\" for reading.", path.display()))?;
        let cert_path = path.with_extension("cert");
        let cert_data = if cert_path.exists() { fs::read(&cert_path)? } else { Vec::new() };
        match emunand.import_ticket(&ticket_data, &cert_data) {
            Ok(()) => imported += 1,
            Err(err) => println!("Skipping \"{}\": {}", path.display(), err),
        }
    }
    println!("Successfully imported {} ticket(s) to EmuNAND at \"{}\"!", imported, emunand.root().display());
    Ok(())
}
