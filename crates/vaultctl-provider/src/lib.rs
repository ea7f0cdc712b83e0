#![forbid(unsafe_code)]

//! Provider contracts shared across vaultctl.
//!
//! The rest of the workspace is free to define provisioning workflows and
//! operator surfaces without depending on concrete storage integrations.

pub mod volume;

pub use volume::VolumeProvider;
