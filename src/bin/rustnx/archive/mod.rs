// archive/mod.rs from rustnx (c) 2025 NinjaCheetah & Contributors
// https://github.com/NinjaCheetah/rustnx
//
// Root for the archive commands in the rustnx CLI.

pub mod pfs0;
