//! Configuration loading
//!
//! Configuration structures live in `eatsorder-domain`; this module reads
//! them from the environment and from files.

pub mod loader;

// Re-export commonly used items
pub use loader::{load, load_from_env, load_from_file, probe_config_paths};
