// main.rs from rustnx (c) 2025 NinjaCheetah & Contributors
// https://github.com/NinjaCheetah/rustnx
//
// Base for the rustnx CLI that handles argument parsing and directs execution to the proper module.

mod archive;
mod filetypes;
mod info;
mod nand;
mod title;

use anyhow::Result;
use clap::{Subcommand, Parser};
use tracing_subscriber::EnvFilter;

#[derive(Parser)]
#[command(version, about, long_about = None)]
struct Cli {
    /// Print debug logging to stderr (overridden by RUST_LOG)
    #[arg(short, long, global = true)]
    verbose: bool,
    #[command(subcommand)]
    command: Option<Commands>,
}

#[derive(Subcommand)]
#[command(arg_required_else_help = true)]
enum Commands {
    /// Manage Switch EmuNANDs
    Emunand {
        #[command(subcommand)]
        command: nand::emunand::Commands,
    },
    /// Get information about an NSP, ticket or CNMT file
    Info {
        /// The path to the file
        input: String,
    },
    /// List or extract the contents of a PFS0 archive (NSP)
    Pfs0 {
        #[command(subcommand)]
        command: archive::pfs0::Commands,
    },
    /// Inspect ticket files
    Ticket {
        #[command(subcommand)]
        command: title::ticket::Commands,
    },
}

fn init_logging(verbose: bool) {
    let env_filter = match EnvFilter::try_from_default_env() {
        Ok(filter) => filter,
        Err(_) => EnvFilter::new(if verbose { "debug" } else { "warn" }),
    };
    tracing_subscriber::fmt()
        .with_env_filter(env_filter)
        .with_writer(std::io::stderr)
        .with_target(false)
        .init();
}

fn main() -> Result<()> {
    let cli = Cli::parse();
    init_logging(cli.verbose);
    match &cli.command {
        Some(Commands::Emunand { command }) => {
            match command {
                nand::emunand::Commands::Install { input, emunand, storage, verify, buffer_size } => {
                    nand::emunand::install_package(input, emunand, *storage, *verify, *buffer_size)?
                },
                nand::emunand::Commands::List { emunand, storage } => {
                    nand::emunand::list_titles(emunand, *storage)?
                },
                nand::emunand::Commands::Contents { emunand, application_id } => {
                    nand::emunand::show_contents(emunand, application_id)?
                },
                nand::emunand::Commands::Remove { emunand, application_id } => {
                    nand::emunand::remove_title(emunand, application_id)?
                },
                nand::emunand::Commands::Tickets { emunand } => {
                    nand::emunand::list_tickets(emunand)?
                },
                nand::emunand::Commands::RemoveTicket { emunand, rights_id } => {
                    nand::emunand::remove_ticket(emunand, rights_id)?
                },
                nand::emunand::Commands::ImportTickets { input, emunand } => {
                    nand::emunand::import_tickets(input, emunand)?
                },
            }
        },
        Some(Commands::Info { input }) => {
            info::info(input)?
        },
        Some(Commands::Pfs0 { command }) => {
            match command {
                archive::pfs0::Commands::List { input } => {
                    archive::pfs0::list_entries(input)?
                },
                archive::pfs0::Commands::Extract { input, output, entry, buffer_size, strict_reads } => {
                    archive::pfs0::extract_entries(input, output, entry, *buffer_size, *strict_reads)?
                },
            }
        },
        Some(Commands::Ticket { command }) => {
            match command {
                title::ticket::Commands::Info { input } => {
                    title::ticket::ticket_info(input)?
                },
            }
        },
        None => { /* Clap handles no passed command by itself */}
    }
    Ok(())
}
