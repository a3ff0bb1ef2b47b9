//! CLI command handlers
//!
//! One module per command family; handlers print human-readable output
//! and surface friendly errors while the logs keep the detail

pub mod export;
pub mod history;
pub mod hospitals;
pub mod profile;
pub mod screen;

pub type CommandResult = Result<(), Box<dyn std::error::Error + Send + Sync>>;
