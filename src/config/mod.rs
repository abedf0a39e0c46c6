//! Configuration loading and validation
//!
//! Pagelens is configured through a TOML file with kebab-case keys. Every
//! value has a default, so the service can run without a config file.

mod parser;
mod types;
mod validation;

pub use parser::{compute_config_hash, load_config, load_config_with_hash};
pub use types::{Config, CrawlerConfig, StorageConfig};
pub use validation::validate;
