//! # Platter Common Library
//!
//! Shared code for the platter binaries:
//! - Common error type
//! - Configuration file discovery and TOML loading
//! - Millisecond wall-clock timestamps used to measure pulse spacing

pub mod config;
pub mod error;
pub mod time;

pub use error::{Error, Result};
