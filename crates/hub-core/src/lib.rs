//! `hub-core` — configuration and top-level error types shared by every hub crate.

pub mod config;
pub mod error;

pub use config::HubConfig;
pub use error::{HubError, Result};
