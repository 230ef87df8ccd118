//! HTTP API handlers for lens-identify
//!
//! Each view of the mobile client maps to a group of routes:
//! capture/upload → identify, history list → history, tree library and
//! tree information → trees.

pub mod health;
pub mod history;
pub mod identify;
pub mod settings;
pub mod trees;

pub use health::health_routes;
pub use history::history_routes;
pub use identify::identify_routes;
pub use settings::settings_routes;
pub use trees::tree_routes;
