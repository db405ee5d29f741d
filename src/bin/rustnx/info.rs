// info.rs from rustnx (c) 2025 NinjaCheetah & Contributors
// https://github.com/NinjaCheetah/rustnx
//
// Code for the info command in the rustnx CLI.

use std::fs;
use std::path::Path;
use anyhow::{bail, Context, Result};
use rustnx::archive::pfs0;
use rustnx::title::{self, cnmt, ids, ncm, ticket};
use crate::archive::pfs0::local_file;
use crate::filetypes::{SwitchFileType, identify_file_type};
use crate::title::ticket::print_ticket_info;

fn print_cnmt_info(meta: &cnmt::ContentMeta) {
    println!("Content Meta Info");
    println!("  Application ID: {}", ids::format_application_id(meta.header.title_id));
    println!("  Title Type: {}", meta.header.meta_type);
    println!("  Title Version: {}", meta.header.version);
    if matches!(meta.header.meta_type, ncm::ContentMetaType::Patch | ncm::ContentMetaType::AddOnContent) {
        println!("  Base Application ID: {}",
                 ids::format_application_id(ids::get_base_application_id(meta.header.title_id, meta.header.meta_type)));
    }
    if meta.header.meta_type == ncm::ContentMetaType::AddOnContent {
        println!("  DLC Index: {}", ids::get_id_from_dlc_application_id(meta.header.title_id));
    }
    println!("  Required System Version: {}", meta.header.required_download_system_version);
    println!("\nContent Info");
    println!("  Total Contents: {}", meta.contents.len());
    println!("  Content Records:");
    for content in &meta.contents {
        let content_id = title::ContentId::from_info(&content.info, ncm::Storage::SdCard);
        println!("    Content ID: {}", content_id.content_id_string());
        println!("      Content Type: {}", content.info.content_type);
        println!("      Content Size: {} ({} bytes)", title::format_size(content.info.size), content.info.size);
        println!("      Content Hash: {}", hex::encode(content.hash));
    }
}

fn print_nsp_info(input: &Path) -> Result<()> {
    let (explorer, name) = local_file(input)?;
    let package = pfs0::PFS0::open(&explorer, &name)
        .with_context(|| format!("The provided file \"{}\" is not a valid NSP.", input.display()))?;
    println!("NSP Info");
    println!("  Entries: {}", package.entry_count());
    let total: u64 = package.entries().iter().map(|entry| entry.size).sum();
    println!("  Total Size: {}", title::format_size(total));
    for entry in package.entries() {
        println!("    {} ({})", entry.name, title::format_size(entry.size));
    }
    if let Some(index) = package.find_entries_by_extension(".cnmt").next() {
        let meta = cnmt::ContentMeta::from_bytes(&package.read_entry(index)?)?;
        println!();
        print_cnmt_info(&meta);
    }
    for index in package.find_entries_by_extension(".tik") {
        let ticket = ticket::TicketFile::from_bytes(&package.read_entry(index)?)
            .with_context(|| format!("The ticket \"{}\" in this NSP appears to be invalid.", package.entry_name(index).unwrap_or_default()))?;
        println!();
        print_ticket_info(&ticket);
    }
    Ok(())
}

pub fn info(input: &str) -> Result<()> {
    let in_path = Path::new(input);
    if !in_path.exists() {
        bail!("Input file \"{}\" does not exist.", in_path.display());
    }
    match identify_file_type(input) {
        Some(SwitchFileType::Nsp) => {
            print_nsp_info(in_path)?;
        },
        Some(SwitchFileType::Ticket) => {
            let (explorer, name) = local_file(in_path)?;
            print_ticket_info(&ticket::read_ticket_file(&explorer, &name)?);
        },
        Some(SwitchFileType::Cnmt) => {
            let meta = cnmt::ContentMeta::from_bytes(&fs::read(in_path)?)
                .with_context(|| format!("The provided CNMT \"{}\" appears to be invalid.", in_path.display()))?;
            print_cnmt_info(&meta);
        },
        Some(SwitchFileType::Nca) => {
            bail!("NCA files are encrypted, so information cannot be displayed for them.");
        },
        None => {
            bail!("Information cannot be displayed for this file.");
        }
    }
    Ok(())
}
