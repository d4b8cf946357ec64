// src/lib.rs

pub mod adapters;
pub mod constants;
pub mod errors;
pub mod orchestrator;
pub mod profiles;
pub mod settings;
pub mod system;
pub mod utils;
pub mod watcher;
