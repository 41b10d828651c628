//! Shared types, error taxonomy, and configuration for the Parley chat client.

pub mod config;
pub mod error;
pub mod types;

pub use config::ParleyConfig;
pub use error::{ChatError, Result};
pub use types::*;
