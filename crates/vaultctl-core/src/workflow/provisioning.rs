//! Map customer/vault identifiers onto volumes and drive the provider.
//!
//! Volume names and mountpoints are derived fresh on every call from the
//! configured pool and backup root; nothing here holds state between
//! invocations. Concurrent invocations against the same volume are not
//! serialized; running two administrative commands for one customer at the
//! same time is the operator's responsibility.

use crate::config::{valid_name_segment, VaultctlConfig};
use crate::dirvish;
use crate::error::{VaultctlError, VaultctlResult};
use crate::history::History;
use std::path::PathBuf;
use vaultctl_provider::VolumeProvider;

/// Create a new customer volume, or a vault volume nested under a customer.
///
/// A bare customer creation requires a size; a vault may inherit the
/// customer's sizing policy and omit it. On successful vault creation the
/// dirvish configuration is generated (the client defaults to the vault name)
/// and both actions are recorded in the history.
pub fn provision<P>(
    config: &VaultctlConfig,
    provider: &P,
    history: &History,
    customer: &str,
    vault: Option<&str>,
    size: Option<&str>,
    client: Option<&str>,
) -> VaultctlResult<()>
where
    P: VolumeProvider<Error = VaultctlError>,
{
    ensure_segment("customer", customer)?;
    if let Some(vault) = vault {
        ensure_segment("vault", vault)?;
    }
    if vault.is_none() && size.is_none() {
        return Err(VaultctlError::InvalidConfig(
            "a new customer volume requires a size; pass --size or name a vault".to_string(),
        ));
    }

    let (volume, mountpoint) = volume_layout(config, customer, vault);
    let created =
        provider.create_volume(&volume, &mountpoint, size, config.zfs.compression)?;
    if !created {
        return Err(VaultctlError::Provider(format!(
            "failed to create volume {volume}"
        )));
    }
    history.add(customer, "create", vault, size)?;

    if let Some(vault) = vault {
        let client = client.unwrap_or(vault);
        dirvish::create_config(
            &config.zfs.root,
            customer,
            vault,
            client,
            &config.dirvish_excludes(),
        )?;
        history.add(customer, "config", Some(vault), None)?;
    }

    Ok(())
}

/// Change the quota of an existing customer or vault volume.
pub fn resize<P>(
    config: &VaultctlConfig,
    provider: &P,
    history: &History,
    customer: &str,
    vault: Option<&str>,
    size: &str,
) -> VaultctlResult<()>
where
    P: VolumeProvider<Error = VaultctlError>,
{
    ensure_segment("customer", customer)?;
    if let Some(vault) = vault {
        ensure_segment("vault", vault)?;
    }

    let (volume, _) = volume_layout(config, customer, vault);
    if !provider.resize_volume(&volume, size)? {
        return Err(VaultctlError::Provider(format!(
            "failed to resize volume {volume} to {size}"
        )));
    }
    history.add(customer, "resize", vault, Some(size))
}

/// Destroy a customer or vault volume, including everything beneath it.
pub fn remove<P>(
    config: &VaultctlConfig,
    provider: &P,
    history: &History,
    customer: &str,
    vault: Option<&str>,
) -> VaultctlResult<()>
where
    P: VolumeProvider<Error = VaultctlError>,
{
    ensure_segment("customer", customer)?;
    if let Some(vault) = vault {
        ensure_segment("vault", vault)?;
    }

    let (volume, _) = volume_layout(config, customer, vault);
    if !provider.remove_volume(&volume)? {
        return Err(VaultctlError::Provider(format!(
            "failed to remove volume {volume}"
        )));
    }
    history.add(customer, "remove", vault, None)
}

/// Derive the volume name and mountpoint for a customer or vault.
fn volume_layout(
    config: &VaultctlConfig,
    customer: &str,
    vault: Option<&str>,
) -> (String, PathBuf) {
    let mut volume = format!("{}/{customer}", config.zfs.pool);
    let mut mountpoint = config.zfs.root.join(customer);
    if let Some(vault) = vault {
        volume.push('/');
        volume.push_str(vault);
        mountpoint.push(vault);
    }
    (volume, mountpoint)
}

fn ensure_segment(what: &str, segment: &str) -> VaultctlResult<()> {
    if valid_name_segment(segment) {
        Ok(())
    } else {
        Err(VaultctlError::InvalidConfig(format!(
            "{what} name {segment:?} is not a valid volume segment"
        )))
    }
}
