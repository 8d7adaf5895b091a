//! Configuration module for Crawl-Admission
//!
//! This module handles loading, parsing, and validating TOML configuration files.
//! Every key has a default, so an empty file yields a usable configuration.
//!
//! # Example
//!
//! ```no_run
//! use crawl_admission::config::load_config;
//! use std::path::Path;
//!
//! let config = load_config(Path::new("config.toml")).unwrap();
//! println!("Politeness delay: {}ms", config.politeness.delay);
//! ```

mod parser;
mod types;
mod validation;

// Re-export types
pub use types::{Config, PolitenessConfig, StorageConfig};

// Re-export parser functions
pub use parser::{compute_config_hash, load_config, load_config_with_hash, parse_config};
