//! Errors shared by the Native Lens crates
//!
//! Only failures that originate in this crate live here: the SQLite pool,
//! filesystem setup of the root folder, and bootstrap configuration.
//! Services define their own enums and wrap this one.

use thiserror::Error;

pub type Result<T> = std::result::Result<T, Error>;

#[derive(Error, Debug)]
pub enum Error {
    /// Settings table or pool failure
    #[error("Database error: {0}")]
    Database(#[from] sqlx::Error),

    /// Root folder or database file could not be created
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// Missing or unreadable bootstrap configuration
    #[error("Configuration error: {0}")]
    Config(String),
}
