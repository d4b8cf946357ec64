// src/system/mod.rs

//! Probes behind the toolbox subcommands: installed-app inventory, disk
//! health, security posture, logon autostarts, and winget upgrades.
//!
//! Each module pairs pure parsing helpers, which compile and test anywhere,
//! with collectors that do the actual registry and process work. The
//! collectors exist in a Windows flavor and a stub flavor that reports
//! unavailability, so the CLI wires up identically on every platform.

pub mod bloatware;
pub mod disk;
pub mod security;
pub mod startup;
pub mod winget;
