//! Provider contract for quota-backed storage volumes.
//!
//! A volume is a mountable, quota-bounded unit named hierarchically under a
//! pool (`pool/customer` or `pool/customer/vault`). Implementations translate
//! these operations into backend commands; they report expected backend
//! failures as `Ok(false)` after logging them, so orchestration code can
//! decide whether to continue. Only unexpected conditions (a backend binary
//! that cannot be spawned at all) surface as `Err`.

use std::error::Error;
use std::path::Path;

/// Abstraction over the volume-management commands vaultctl needs.
pub trait VolumeProvider {
    type Error: Error + Send + Sync + 'static;

    /// Create `volume` mounted at `mountpoint`, optionally bounded by `quota`
    /// (a human-readable size literal passed through to the backend).
    ///
    /// Returns `Ok(true)` when the backend confirms the creation. On
    /// `Ok(false)` nothing may be assumed about partial state; no cleanup is
    /// attempted.
    fn create_volume(
        &self,
        volume: &str,
        mountpoint: &Path,
        quota: Option<&str>,
        compression: bool,
    ) -> Result<bool, Self::Error>;

    /// Change the quota of an existing volume to `quota`.
    ///
    /// The literal `none` lifts the quota. Implementations must refuse to
    /// shrink a volume below its current usage, and must refuse when the
    /// current usage cannot be determined.
    fn resize_volume(&self, volume: &str, quota: &str) -> Result<bool, Self::Error>;

    /// Destroy `volume` and everything beneath it, clearing its mountpoint
    /// first.
    fn remove_volume(&self, volume: &str) -> Result<bool, Self::Error>;

    /// Report the bytes currently used by `volume`, or `None` when the
    /// backend cannot provide a trustworthy reading.
    fn volume_usage(&self, volume: &str) -> Result<Option<u64>, Self::Error>;
}
