// nand/mod.rs from rustnx (c) 2025 NinjaCheetah & Contributors
// https://github.com/NinjaCheetah/rustnx
//
// Root for all NAND-related modules.

pub mod emunand;
