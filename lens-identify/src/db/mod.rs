//! Database access for lens-identify

pub mod settings;

pub use lens_common::db::init_database_pool;
