// title/ticket.rs from rustnx (c) 2025 NinjaCheetah & Contributors
// https://github.com/NinjaCheetah/rustnx
//
// Code for ticket-related commands in the rustnx CLI.

use std::path::Path;
use anyhow::{bail, Context, Result};
use clap::Subcommand;
use rustnx::title::{ids, ticket};
use crate::archive::pfs0::local_file;

#[derive(Subcommand)]
#[command(arg_required_else_help = true)]
pub enum Commands {
    /// Print the contents of a ticket file
    Info {
        /// The path to the ticket
        input: String,
    }
}

pub fn print_ticket_info(ticket: &ticket::TicketFile) {
    println!("Ticket Info");
    println!("  Rights ID: {}", ticket.data.rights_id);
    let application_id = ticket.application_id();
    let id_class = match ids::is_valid_application_id(application_id) {
        ids::ApplicationIdMask::Official => "Official",
        ids::ApplicationIdMask::Homebrew => "Homebrew",
        ids::ApplicationIdMask::Invalid => "Invalid",
    };
    println!("  Application ID: {} ({})", ids::format_application_id(application_id), id_class);
    println!("  Key Generation: {}", ticket.key_generation());
    println!("  Ticket Type: {}", ticket.ticket_type());
    println!("  Signature Type: {:?} ({:#x} bytes)", ticket.signature_type, ticket.signature_type.signature_size());
    println!("  Issuer: {}", ticket.issuer());
    println!("  Ticket Size: {:#x} bytes", ticket.full_size());
    if ticket.ticket_type() == ticket::TicketType::Common {
        println!("  Title Key (Encrypted): {}", ticket.title_key_string());
    } else {
        println!("  Title Key: N/A (Personalized)");
    }
}

pub fn ticket_info(input: &str) -> Result<()> {
    let in_path = Path::new(input);
    if !in_path.exists() {
        bail!("Source ticket \"{}\" could not be found.", in_path.display());
    }
    let (explorer, name) = local_file(in_path)?;
    let ticket = ticket::read_ticket_file(&explorer, &name)
        .with_context(|| format!("The provided ticket \"{}\" appears to be invalid.", in_path.display()))?;
    print_ticket_info(&ticket);
    Ok(())
}
