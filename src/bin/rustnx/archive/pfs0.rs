// archive/pfs0.rs from rustnx (c) 2025 NinjaCheetah & Contributors
// https://github.com/NinjaCheetah/rustnx
//
// Code for the PFS0 listing/extraction commands in the rustnx CLI.

use std::fs;
use std::ops::ControlFlow;
use std::path::Path;
use anyhow::{bail, Context, Result};
use clap::Subcommand;
use rustnx::archive::pfs0::{self, ExtractOptions, ShortReadPolicy};
use rustnx::storage::LocalExplorer;
use rustnx::title;

#[derive(Subcommand)]
#[command(arg_required_else_help = true)]
pub enum Commands {
    /// List the entries in a PFS0 archive
    List {
        /// The path to the PFS0 archive to list
        input: String,
    },
    /// Extract entries from a PFS0 archive into a directory
    Extract {
        /// The path to the PFS0 archive to extract
        input: String,
        /// The directory to extract the entries to
        output: String,
        /// Only extract the entry with this name
        #[arg(short, long)]
        entry: Option<String>,
        /// The size of each chunk copied, in bytes
        #[arg(long, default_value_t = pfs0::TRANSFER_BUFFER_SIZE)]
        buffer_size: usize,
        /// Fail if the archive returns less data than requested, instead of continuing
        #[arg(long)]
        strict_reads: bool,
    }
}

/// Splits a path to a file on the local filesystem into an Explorer rooted at its parent
/// directory and the file's name within that Explorer.
pub fn local_file(path: &Path) -> Result<(LocalExplorer, String)> {
    let name = path.file_name().and_then(|name| name.to_str())
        .with_context(|| format!("\"{}\" is not a valid file path.", path.display()))?;
    let parent = path.parent().filter(|parent| !parent.as_os_str().is_empty()).unwrap_or(Path::new("."));
    Ok((LocalExplorer::new(parent), name.to_string()))
}

pub fn list_entries(input: &str) -> Result<()> {
    let in_path = Path::new(input);
    if !in_path.exists() {
        bail!("Source PFS0 archive \"{}\" could not be found.", in_path.display());
    }
    let (explorer, name) = local_file(in_path)?;
    let archive = pfs0::PFS0::open(&explorer, &name)
        .with_context(|| format!("The provided file \"{}\" is not a valid PFS0 archive.", in_path.display()))?;
    println!("PFS0 Archive: {} ({} entries)", in_path.display(), archive.entry_count());
    for (index, entry) in archive.entries().iter().enumerate() {
        println!("  [{}] {} ({})", index, entry.name, title::format_size(entry.size));
    }
    Ok(())
}

pub fn extract_entries(input: &str, output: &str, entry: &Option<String>, buffer_size: usize, strict_reads: bool) -> Result<()> {
    let in_path = Path::new(input);
    if !in_path.exists() {
        bail!("Source PFS0 archive \"{}\" could not be found.", in_path.display());
    }
    let out_path = Path::new(output);
    if out_path.exists() {
        if !out_path.is_dir() {
            bail!("A file already exists with the specified directory name!");
        }
    } else {
        fs::create_dir(out_path).with_context(|| format!("The output directory \"{}\" could not be created.", out_path.display()))?;
    }
    let (explorer, name) = local_file(in_path)?;
    let archive = pfs0::PFS0::open(&explorer, &name)
        .with_context(|| format!("The provided file \"{}\" is not a valid PFS0 archive.", in_path.display()))?;
    let indices: Vec<usize> = match entry {
        Some(entry) => match archive.find_entry_by_name(entry) {
            Some(index) => vec![index],
            None => bail!("The archive does not contain an entry named \"{}\".", entry),
        },
        None => (0..archive.entry_count()).collect(),
    };
    let options = ExtractOptions {
        buffer_size,
        short_reads: if strict_reads { ShortReadPolicy::Fail } else { ShortReadPolicy::Continue },
    };
    let dest = LocalExplorer::new(out_path);
    for index in indices {
        let entry_name = archive.entry_name(index).unwrap_or_default();
        let written = archive.extract_to_with_progress(index, &dest, entry_name, &options, |written, total| {
            tracing::debug!(entry = entry_name, written, total, "extracting");
            ControlFlow::Continue(())
        }).with_context(|| format!("Failed to extract entry \"{}\".", entry_name))?;
        println!("Extracted \"{}\" ({})", entry_name, title::format_size(written));
    }
    println!("Successfully extracted PFS0 archive \"{}\" to \"{}\"!", in_path.display(), out_path.display());
    Ok(())
}
