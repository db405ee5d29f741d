// nand/mod.rs from rustnx (c) 2025 NinjaCheetah & Contributors
// https://github.com/NinjaCheetah/rustnx
//
// Root for the NAND commands in the rustnx CLI.

pub mod emunand;
