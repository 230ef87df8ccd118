//! Database initialisation shared by Native Lens services

pub mod init;

pub use init::{create_settings_table, init_database_pool};
