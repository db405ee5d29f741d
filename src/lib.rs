// lib.rs from rustnx (c) 2025 NinjaCheetah & Contributors
// https://github.com/NinjaCheetah/rustnx
//
// Root level module that imports the feature modules.

pub mod archive;
pub mod nand;
pub mod storage;
pub mod title;
