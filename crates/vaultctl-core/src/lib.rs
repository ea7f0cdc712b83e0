//! Core building blocks shared by the vaultctl binaries.
//!
//! Configuration, the history store, and provisioning workflows live here so
//! the operator surfaces can focus on argument handling instead of
//! reimplementing orchestration.

pub mod config;
pub mod dirvish;
pub mod error;
pub mod history;
pub mod logging;
pub mod workflow;

pub use config::{VaultctlConfig, DEFAULT_CONFIG_PATH};
pub use error::{VaultctlError, VaultctlResult};
pub use history::{History, HistoryEntry};
