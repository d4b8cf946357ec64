// src/utils/mod.rs

pub mod command;
#[cfg(windows)]
pub mod registry;
#[cfg(windows)]
pub mod windows;
