// filetypes.rs from rustnx (c) 2025 NinjaCheetah & Contributors
// https://github.com/NinjaCheetah/rustnx
//
// Common code for identifying Switch file types.

use std::{str, fs::File};
use std::io::Read;
use std::path::Path;
use regex::RegexBuilder;

#[derive(Debug)]
#[derive(PartialEq)]
pub enum SwitchFileType {
    Nsp,
    Ticket,
    Cnmt,
    Nca,
}

pub fn identify_file_type(input: &str) -> Option<SwitchFileType> {
    let input = Path::new(input);
    let re = RegexBuilder::new(r"\.cnmt$").case_insensitive(true).build().ok()?;
    // == NCA ==
    // Checked before CNMT, since meta NCAs are still NCAs and can't be read without decryption.
    if input.extension().is_some_and(|f| f.eq_ignore_ascii_case("nca")) {
        return Some(SwitchFileType::Nca);
    }
    // == CNMT ==
    if re.is_match(input.to_str()?) {
        return Some(SwitchFileType::Cnmt);
    }
    // == Ticket ==
    if input.extension().is_some_and(|f| f.eq_ignore_ascii_case("tik")) ||
        input.file_name().is_some_and(|f| f.eq_ignore_ascii_case("ticket.bin")) {
        return Some(SwitchFileType::Ticket);
    }
    // == NSP ==
    if input.extension().is_some_and(|f| f.eq_ignore_ascii_case("nsp")) {
        return Some(SwitchFileType::Nsp);
    }
    // Advanced NSP detection, where we read and compare the first 4 bytes (only if the path exists.)
    if input.is_file() {
        let mut f = File::open(input).ok()?;
        let mut magic_number = [0u8; 4];
        if f.read_exact(&mut magic_number).is_ok() && &magic_number == b"PFS0" {
            return Some(SwitchFileType::Nsp);
        }
    }

    // == No match found! ==
    None
}
