//! # Native Lens Common Library
//!
//! Shared code for the Native Lens services including:
//! - Species catalog (the fixed table of supported native trees)
//! - History data model shared by writers and readers of the ledger
//! - Bootstrap configuration loading and root folder resolution
//! - SQLite initialisation for the `settings` key/value table

pub mod config;
pub mod db;
pub mod error;
pub mod history;
pub mod species;

pub use error::{Error, Result};
pub use history::{DuplicatePolicy, HistoryEntry};
pub use species::{Species, SpeciesLabel};
