// archive/mod.rs from rustnx (c) 2025 NinjaCheetah & Contributors
// https://github.com/NinjaCheetah/rustnx
//
// Root for all archive formats.

pub mod pfs0;
