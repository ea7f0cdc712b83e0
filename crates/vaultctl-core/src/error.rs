//! Shared error type for the vaultctl crates.

use thiserror::Error;

pub type VaultctlResult<T> = Result<T, VaultctlError>;

#[derive(Debug, Error)]
pub enum VaultctlError {
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// A configuration file or command invocation that cannot be acted on.
    #[error("invalid configuration: {0}")]
    InvalidConfig(String),

    /// A storage-provider operation that failed in a way the caller cannot
    /// recover from within the current invocation.
    #[error("{0}")]
    Provider(String),

    /// A human-readable size literal that cannot be resolved to bytes.
    #[error("can't interpret size {literal:?}")]
    SizeFormat { literal: String },

    #[error("failed to parse configuration: {0}")]
    TomlParse(#[from] toml::de::Error),

    #[error("failed to parse configuration: {0}")]
    Yaml(#[from] serde_yaml::Error),

    #[error("failed to encode history entry: {0}")]
    Json(#[from] serde_json::Error),
}
