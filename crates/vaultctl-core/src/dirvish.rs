//! Dirvish integration: vault configuration generation and the pre/post
//! backup-run triggers dirvish invokes on the server.

use crate::config::VaultctlConfig;
use crate::error::{VaultctlError, VaultctlResult};
use crate::history::History;
use log::info;
use std::env;
use std::fmt::Write as _;
use std::fs;
use std::path::{Path, PathBuf};

const ENV_CONFIG: &str = "VAULTCTL_CONFIG";
const ENV_SERVER: &str = "DIRVISH_SERVER";
const ENV_CLIENT: &str = "DIRVISH_CLIENT";
const ENV_VAULT: &str = "DIRVISH_VAULT";
const ENV_STATUS: &str = "DIRVISH_STATUS";

/// Write the default dirvish configuration for a freshly created vault.
///
/// The file lands at `<root>/<customer>/<vault>/dirvish/default.conf`, which
/// is inside the vault volume, so it is destroyed together with the vault.
pub fn create_config(
    root: &Path,
    customer: &str,
    vault: &str,
    client: &str,
    excludes: &[String],
) -> VaultctlResult<()> {
    let config_root = root.join(customer).join(vault).join("dirvish");
    fs::create_dir_all(&config_root)?;
    let config_path = config_root.join("default.conf");

    fs::write(&config_path, render_config(client, excludes))?;
    info!(
        "wrote dirvish configuration for vault {customer}/{vault} to {}",
        config_path.display()
    );
    println!(
        "You should now edit the dirvish configuration and run an initial backup.\n\
         $EDITOR {}\n\
         dirvish --vault {customer}/{vault} --init",
        config_path.display()
    );
    Ok(())
}

fn render_config(client: &str, excludes: &[String]) -> String {
    let mut conf = String::new();
    let _ = writeln!(conf, "client: {client}");
    conf.push_str(
        "tree: /\n\
         xdev: 0\n\
         index: gzip\n\
         log: gzip\n\
         image-default: %Y%m%d\n\
         exclude:\n",
    );
    for pattern in excludes {
        let _ = writeln!(conf, "\t{pattern}");
    }
    conf.push_str("pre-server: vaultctl-start\npost-server: vaultctl-stop\n");
    conf
}

/// Which end of a backup run a trigger fires on.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BackupPhase {
    Start,
    Stop,
}

/// Context dirvish hands to the server triggers through the environment.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BackupRun {
    pub server: String,
    pub client: String,
    pub customer: String,
    pub vault: String,
    /// Completion status; only present for the post-run trigger.
    pub status: Option<String>,
}

impl BackupRun {
    /// Read the trigger context from the environment dirvish sets up.
    ///
    /// `DIRVISH_VAULT` carries the vault path relative to the bank,
    /// i.e. `customer/vault`.
    pub fn from_env(phase: BackupPhase) -> VaultctlResult<Self> {
        let server = require_env(ENV_SERVER)?;
        let client = require_env(ENV_CLIENT)?;
        let vault_path = require_env(ENV_VAULT)?;

        let (customer, vault) = vault_path.split_once('/').ok_or_else(|| {
            VaultctlError::InvalidConfig(format!(
                "{ENV_VAULT} must look like customer/vault (got {vault_path:?})"
            ))
        })?;
        if customer.is_empty() || vault.is_empty() {
            return Err(VaultctlError::InvalidConfig(format!(
                "{ENV_VAULT} must look like customer/vault (got {vault_path:?})"
            )));
        }

        let status = match phase {
            BackupPhase::Start => None,
            BackupPhase::Stop => Some(require_env(ENV_STATUS)?),
        };

        Ok(Self {
            server,
            client,
            customer: customer.to_string(),
            vault: vault.to_string(),
            status,
        })
    }

    /// Append this run to the history store.
    pub fn record(&self, history: &History) -> VaultctlResult<()> {
        let command = match &self.status {
            None => "backup start".to_string(),
            Some(status) => format!("backup done ({status})"),
        };
        info!(
            "{command}: vault {}/{} for client {} on {}",
            self.customer, self.vault, self.client, self.server
        );
        history.add(&self.customer, &command, Some(&self.vault), None)
    }
}

/// Entry point shared by the `vaultctl-start` and `vaultctl-stop` trigger
/// binaries: resolve the configuration (honouring `VAULTCTL_CONFIG`), read
/// the dirvish environment, and record the run in the history.
pub fn run_trigger(phase: BackupPhase) -> VaultctlResult<()> {
    let config_path = env::var(ENV_CONFIG)
        .map(PathBuf::from)
        .unwrap_or_else(|_| VaultctlConfig::default_path().to_path_buf());
    let config = VaultctlConfig::load_or_bootstrap(&config_path)?;
    let history = History::open(&config.history.path)?;
    BackupRun::from_env(phase)?.record(&history)
}

fn require_env(key: &str) -> VaultctlResult<String> {
    env::var(key)
        .ok()
        .filter(|value| !value.is_empty())
        .ok_or_else(|| {
            VaultctlError::InvalidConfig(format!(
                "{key} is not set; this binary is meant to run as a dirvish server trigger"
            ))
        })
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::ffi::OsString;
    use std::sync::Mutex;
    use tempfile::tempdir;

    // Serialize environment mutations to avoid cross-test interference.
    static ENV_LOCK: Mutex<()> = Mutex::new(());

    struct EnvVarGuard {
        key: &'static str,
        prev: Option<OsString>,
    }

    impl EnvVarGuard {
        fn set(key: &'static str, value: impl AsRef<std::ffi::OsStr>) -> Self {
            let prev = env::var_os(key);
            env::set_var(key, value);
            EnvVarGuard { key, prev }
        }

        fn unset(key: &'static str) -> Self {
            let prev = env::var_os(key);
            env::remove_var(key);
            EnvVarGuard { key, prev }
        }
    }

    impl Drop for EnvVarGuard {
        fn drop(&mut self) {
            match self.prev.take() {
                Some(val) => env::set_var(self.key, val),
                None => env::remove_var(self.key),
            }
        }
    }

    #[test]
    fn config_is_written_inside_the_vault() {
        let dir = tempdir().unwrap();
        let excludes = vec!["/proc/*".to_string(), "*~".to_string()];

        create_config(
            dir.path(),
            "customer1",
            "www.example.com",
            "www.example.com",
            &excludes,
        )
        .unwrap();

        let conf = fs::read_to_string(
            dir.path()
                .join("customer1")
                .join("www.example.com")
                .join("dirvish")
                .join("default.conf"),
        )
        .unwrap();
        assert!(conf.starts_with("client: www.example.com\n"));
        assert!(conf.contains("\t/proc/*\n"));
        assert!(conf.contains("pre-server: vaultctl-start\n"));
        assert!(conf.contains("post-server: vaultctl-stop\n"));
    }

    #[test]
    fn trigger_context_reads_environment() {
        let _env_lock = ENV_LOCK.lock().unwrap();
        let _server = EnvVarGuard::set(ENV_SERVER, "backup01.example.com");
        let _client = EnvVarGuard::set(ENV_CLIENT, "www.example.com");
        let _vault = EnvVarGuard::set(ENV_VAULT, "customer1/www.example.com");
        let _status = EnvVarGuard::set(ENV_STATUS, "success");

        let start = BackupRun::from_env(BackupPhase::Start).unwrap();
        assert_eq!(start.customer, "customer1");
        assert_eq!(start.vault, "www.example.com");
        assert_eq!(start.status, None);

        let stop = BackupRun::from_env(BackupPhase::Stop).unwrap();
        assert_eq!(stop.status.as_deref(), Some("success"));
    }

    #[test]
    fn trigger_context_rejects_flat_vault_names() {
        let _env_lock = ENV_LOCK.lock().unwrap();
        let _server = EnvVarGuard::set(ENV_SERVER, "backup01.example.com");
        let _client = EnvVarGuard::set(ENV_CLIENT, "www.example.com");
        let _vault = EnvVarGuard::set(ENV_VAULT, "orphan-vault");

        assert!(matches!(
            BackupRun::from_env(BackupPhase::Start),
            Err(VaultctlError::InvalidConfig(_))
        ));
    }

    #[test]
    fn trigger_context_requires_the_environment() {
        let _env_lock = ENV_LOCK.lock().unwrap();
        let _server = EnvVarGuard::unset(ENV_SERVER);

        assert!(matches!(
            BackupRun::from_env(BackupPhase::Start),
            Err(VaultctlError::InvalidConfig(_))
        ));
    }

    #[test]
    fn completed_runs_land_in_history() {
        let _env_lock = ENV_LOCK.lock().unwrap();
        let dir = tempdir().unwrap();
        let history = History::open(dir.path().join("history.jsonl")).unwrap();

        let run = BackupRun {
            server: "backup01.example.com".to_string(),
            client: "192.0.2.1".to_string(),
            customer: "customer1".to_string(),
            vault: "mail.example.com".to_string(),
            status: Some("success".to_string()),
        };
        run.record(&history).unwrap();

        let lines = history.show(5).unwrap();
        assert_eq!(lines.len(), 1);
        assert!(lines[0].contains("backup done (success)"));
        assert!(lines[0].contains("vault \"mail.example.com\""));
    }
}
