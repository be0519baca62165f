//! Shared content model, error model, and configuration for blockpath.
//!
//! This crate is the foundation depended on by all other blockpath crates.
//! It provides:
//! - [`BlockpathError`]: the unified error type
//! - The outliner content model ([`Page`], [`Block`], [`Fragment`], [`Snapshot`])
//! - Configuration ([`AppConfig`], [`TrackerConfig`], config loading)

pub mod config;
pub mod error;
pub mod types;

// Re-export public API at crate root for ergonomic imports.
pub use config::{
    AppConfig, DisplayConfig, HostConfig, TextConfig, TrackerConfig, TrackerSettings, config_dir,
    config_file_path, init_config, load_config, load_config_from, resolve_api_token,
};
pub use error::{BlockpathError, Result};
pub use types::{
    Block, BlockChild, BlockId, Fragment, Link, LinkUrl, ListItem, Macro, Page, PageId, PageRef,
    Snapshot,
};
