//! System-backed `VolumeProvider` implementation.
//!
//! Wraps the host `zfs` binary. The provider is stateless between calls:
//! every operation re-derives what it needs from its arguments and the
//! backend's own bookkeeping. Expected backend failures (nonzero exits) are
//! logged here and reported as `Ok(false)`; only spawn failures become `Err`.

use crate::command::ZfsCommand;
use crate::parse::Size;
use log::{error, info, warn};
use std::env;
use std::path::{Path, PathBuf};
use vaultctl_core::config::VaultctlConfig;
use vaultctl_core::error::{VaultctlError, VaultctlResult};
use vaultctl_provider::VolumeProvider;

pub const DEFAULT_ZFS_PATHS: &[&str] = &[
    "/usr/sbin/zfs",
    "/sbin/zfs",
    "/bin/zfs",
    "/usr/local/sbin/zfs",
];

/// Volume provider that manages quota-backed ZFS filesystems via the host
/// `zfs` binary.
#[derive(Debug, Clone)]
pub struct SystemZfsProvider {
    zfs: ZfsCommand,
}

impl SystemZfsProvider {
    /// Build a provider from configuration, resolving the `zfs` binary path.
    pub fn from_config(config: &VaultctlConfig) -> VaultctlResult<Self> {
        Ok(Self::with_binary(resolve_zfs_path(config)?))
    }

    /// Build a provider around an explicit binary path (no resolution).
    pub fn with_binary(binary: PathBuf) -> Self {
        Self {
            zfs: ZfsCommand::new(binary),
        }
    }
}

impl VolumeProvider for SystemZfsProvider {
    type Error = VaultctlError;

    fn create_volume(
        &self,
        volume: &str,
        mountpoint: &Path,
        quota: Option<&str>,
        compression: bool,
    ) -> VaultctlResult<bool> {
        let compression = if compression {
            "compression=on"
        } else {
            "compression=off"
        };
        let mountpoint = format!("mountpoint={}", mountpoint.display());

        let mut args = vec!["create", "-o", compression, "-o", "dedup=off"];
        let quota_opt;
        if let Some(quota) = quota {
            quota_opt = format!("quota={quota}");
            args.push("-o");
            args.push(&quota_opt);
        }
        args.push("-o");
        args.push(&mountpoint);
        args.push(volume);

        let out = self.zfs.run(&args, None)?;
        if out.status == 0 {
            info!("created volume {volume}");
            Ok(true)
        } else {
            error!(
                "creating volume {volume} failed: {}",
                out.stderr.trim_end()
            );
            Ok(false)
        }
    }

    fn resize_volume(&self, volume: &str, quota: &str) -> VaultctlResult<bool> {
        // The `none` sentinel lifts the quota; there is nothing to shrink
        // below, so the usage check does not apply.
        if !quota.eq_ignore_ascii_case("none") {
            let target = Size::parse(quota)?;
            let used = match self.volume_usage(volume)? {
                Some(bytes) => bytes,
                None => {
                    warn!("cannot verify that resizing {volume} is safe: usage unknown");
                    return Ok(false);
                }
            };
            if used > target.bytes() {
                warn!(
                    "refusing to resize {volume}: new quota {quota} ({}B) is below the {used}B currently used",
                    target.bytes()
                );
                return Ok(false);
            }
        }

        let quota_arg = format!("quota={quota}");
        let out = self.zfs.run(&["set", &quota_arg, volume], None)?;
        if out.status == 0 {
            info!("set quota for volume {volume} to {quota}");
            Ok(true)
        } else {
            error!(
                "setting quota for volume {volume} failed: {}",
                out.stderr.trim_end()
            );
            Ok(false)
        }
    }

    fn remove_volume(&self, volume: &str) -> VaultctlResult<bool> {
        // Clear the mountpoint before destroying. A volume that never had a
        // mountpoint legitimately fails this step, so its exit status is
        // deliberately not inspected.
        self.zfs.run(&["set", "mountpoint=none", volume], None)?;

        let out = self.zfs.run(&["destroy", "-r", "-f", volume], None)?;
        if out.status == 0 {
            info!("destroyed volume {volume}");
            Ok(true)
        } else {
            error!(
                "destroying volume {volume} failed: {}",
                out.stderr.trim_end()
            );
            Ok(false)
        }
    }

    fn volume_usage(&self, volume: &str) -> VaultctlResult<Option<u64>> {
        let out = self
            .zfs
            .run(&["get", "-H", "-o", "value", "-p", "used", volume], None)?;
        if out.status != 0 {
            error!(
                "usage query for volume {volume} failed: {}",
                out.stderr.trim_end()
            );
            return Ok(None);
        }

        match out.stdout.trim().parse::<u64>() {
            Ok(bytes) => {
                info!("volume {volume} uses {bytes}B");
                Ok(Some(bytes))
            }
            Err(_) => {
                error!(
                    "zfs returned a non-numeric usage for volume {volume}: {:?}",
                    out.stdout.trim()
                );
                Ok(None)
            }
        }
    }
}

fn resolve_zfs_path(config: &VaultctlConfig) -> VaultctlResult<PathBuf> {
    if let Some(path) = config
        .zfs
        .zfs_path
        .as_deref()
        .map(str::trim)
        .filter(|path| !path.is_empty())
    {
        let candidate = Path::new(path);
        if !candidate.exists() {
            return Err(VaultctlError::InvalidConfig(format!(
                "zfs binary not found at {}",
                candidate.display()
            )));
        }
        return Ok(candidate.to_path_buf());
    }

    for candidate in DEFAULT_ZFS_PATHS {
        let p = Path::new(candidate);
        if p.exists() {
            return Ok(p.to_path_buf());
        }
    }

    find_in_path("zfs").ok_or_else(|| {
        VaultctlError::InvalidConfig(format!(
            "unable to locate the zfs binary; tried {DEFAULT_ZFS_PATHS:?} and PATH"
        ))
    })
}

fn find_in_path(binary: &str) -> Option<PathBuf> {
    let paths = env::var_os("PATH")?;
    env::split_paths(&paths).find_map(|dir| {
        let candidate = dir.join(binary);
        if candidate.exists() {
            Some(candidate)
        } else {
            None
        }
    })
}
