//! Configuration model and helpers used by the vaultctl binaries.

use crate::error::{VaultctlError, VaultctlResult};
use directories_next::ProjectDirs;
use log::{info, warn};
use schemars::JsonSchema;
use serde::{Deserialize, Serialize};
use std::fs::{self, OpenOptions};
use std::io::{self, Write};
use std::path::{Path, PathBuf};

#[cfg(unix)]
use std::os::unix::fs::PermissionsExt;

pub const DEFAULT_CONFIG_PATH: &str = "/etc/vaultctl.toml";
const BOOTSTRAP_FILE_NAME: &str = "vaultctl.toml";
const APP_QUALIFIER: &str = "ch";
const APP_ORGANIZATION: &str = "vaultctl";
const APP_NAME: &str = "vaultctl";

/// Default exclude patterns written into generated dirvish configurations.
pub const DEFAULT_EXCLUDES: &[&str] = &[
    "/dev/*",
    "/tmp/*",
    "/var/tmp/*",
    "/run/*",
    "/var/run/*",
    "/proc/*",
    "/sys/*",
    "*.bak",
    "/var/cache/man/*",
    "/var/cache/apt/archives/*",
    "/var/cache/yum/*",
    "lost+found/",
    "*~",
];

pub(crate) fn project_dirs() -> Option<ProjectDirs> {
    ProjectDirs::from(APP_QUALIFIER, APP_ORGANIZATION, APP_NAME)
}

/// Lightweight sanity check that a volume name matches common ZFS patterns.
///
/// Volume names are slash-separated; every segment must be non-empty, must
/// not begin with a dash, and may only contain alphanumerics plus `_-:.`.
pub fn looks_like_volume_name(name: &str) -> bool {
    let trimmed = name.trim();
    if trimmed.is_empty() {
        return false;
    }

    trimmed.split('/').all(valid_name_segment)
}

/// Whether `segment` is acceptable as a single customer or vault name.
pub fn valid_name_segment(segment: &str) -> bool {
    if segment.is_empty() || segment.starts_with('-') {
        return false;
    }
    segment
        .chars()
        .all(|ch| ch.is_ascii_alphanumeric() || matches!(ch, '_' | '-' | ':' | '.'))
}

/// Pool and mount layout for the backup volumes.
#[derive(Debug, Clone, Serialize, Deserialize, JsonSchema)]
pub struct ZfsCfg {
    /// Pool (or parent volume) that customer volumes are created under.
    pub pool: String,

    /// Filesystem root that customer mountpoints are derived from.
    pub root: PathBuf,

    /// Optional override for the `zfs` CLI path.
    #[serde(default)]
    pub zfs_path: Option<String>,

    /// Whether new volumes are created with compression enabled.
    #[serde(default = "default_compression")]
    pub compression: bool,
}

fn default_compression() -> bool {
    true
}

impl Default for ZfsCfg {
    fn default() -> Self {
        Self {
            pool: "backup".to_string(),
            root: PathBuf::from("/srv/backup"),
            zfs_path: None,
            compression: default_compression(),
        }
    }
}

/// Location of the append-only administrative history log.
#[derive(Debug, Clone, Serialize, Deserialize, JsonSchema)]
pub struct HistoryCfg {
    #[serde(default = "default_history_path")]
    pub path: PathBuf,
}

fn default_history_path() -> PathBuf {
    PathBuf::from("/var/lib/vaultctl/history.jsonl")
}

impl Default for HistoryCfg {
    fn default() -> Self {
        Self {
            path: default_history_path(),
        }
    }
}

/// Knobs for the generated dirvish vault configuration.
#[derive(Debug, Clone, Default, Serialize, Deserialize, JsonSchema)]
pub struct DirvishCfg {
    /// Exclude patterns written into new vault configurations; the built-in
    /// defaults apply when unset.
    #[serde(default)]
    pub excludes: Option<Vec<String>>,
}

/// Top-level configuration snapshot loaded from disk.
#[derive(Debug, Clone, Serialize, Deserialize, JsonSchema)]
pub struct VaultctlConfig {
    pub zfs: ZfsCfg,

    #[serde(default)]
    pub history: HistoryCfg,

    #[serde(default)]
    pub dirvish: DirvishCfg,

    #[serde(skip)]
    pub path: PathBuf,

    #[serde(skip)]
    pub format: ConfigFormat,
}

/// Tracks whether we parsed TOML or YAML so diagnostics stay accurate.
#[derive(Debug, Clone, Copy, Default)]
pub enum ConfigFormat {
    #[default]
    Toml,
    Yaml,
}

impl VaultctlConfig {
    /// Return the canonical system-wide configuration path.
    pub fn default_path() -> &'static Path {
        Path::new(DEFAULT_CONFIG_PATH)
    }

    /// Resolve the per-user configuration path used for bootstrapping.
    pub fn user_config_path() -> Option<PathBuf> {
        project_dirs().map(|dirs| dirs.config_dir().join(BOOTSTRAP_FILE_NAME))
    }

    /// Load configuration from disk, creating a bootstrap copy when missing.
    ///
    /// If the requested path does not exist, vaultctl will attempt to
    /// materialise a bootstrap template at that location. When the caller
    /// requests the global default (`/etc/vaultctl.toml`) and the process
    /// lacks permission to create it, a per-user configuration is written to
    /// the platform config directory instead.
    pub fn load_or_bootstrap<P: AsRef<Path>>(path: P) -> VaultctlResult<Self> {
        let target = path.as_ref();
        if target.exists() {
            return Self::load(target);
        }

        match ensure_bootstrap_file(target) {
            Ok(created) => {
                if created {
                    info!("vaultctl config bootstrap created at {}", target.display());
                }
                Self::load(target)
            }
            Err(err) => {
                if target != Self::default_path() {
                    return Err(VaultctlError::InvalidConfig(format!(
                        "failed to initialise configuration at {}: {err}",
                        target.display()
                    )));
                }

                let user_path = Self::user_config_path().ok_or_else(|| {
                    VaultctlError::InvalidConfig(
                        "unable to determine user configuration directory; \
                        create /etc/vaultctl.toml manually"
                            .to_string(),
                    )
                })?;

                let created_user = ensure_bootstrap_file(&user_path).map_err(|io_err| {
                    VaultctlError::InvalidConfig(format!(
                        "failed to prepare bootstrap configuration at {}: {io_err}",
                        user_path.display()
                    ))
                })?;

                if created_user {
                    info!(
                        "vaultctl config bootstrap created at {}",
                        user_path.display()
                    );
                }

                warn!(
                    "configuration missing at {}; using per-user bootstrap at {}",
                    target.display(),
                    user_path.display()
                );

                Self::load(&user_path)
            }
        }
    }

    /// Read a config file from disk, detect format, and validate basics.
    pub fn load<P: AsRef<Path>>(path: P) -> VaultctlResult<Self> {
        let path = path.as_ref();
        let contents = fs::read_to_string(path)?;
        let is_toml = matches!(
            path.extension().and_then(|ext| ext.to_str()),
            Some(ext) if ext.eq_ignore_ascii_case("toml")
        );
        let mut cfg = if is_toml {
            toml::from_str::<Self>(&contents)?
        } else {
            serde_yaml::from_str::<Self>(&contents)?
        };

        cfg.path = path.to_path_buf();
        cfg.format = if is_toml {
            ConfigFormat::Toml
        } else {
            ConfigFormat::Yaml
        };

        if cfg.zfs.pool.trim().is_empty() {
            return Err(VaultctlError::InvalidConfig(
                "zfs.pool must name the pool backup volumes live under".to_string(),
            ));
        }

        Ok(cfg)
    }

    /// Perform a best-effort validation pass and return human-readable issues.
    pub fn validate(&self) -> Vec<String> {
        let mut issues = Vec::new();

        if self.zfs.pool.trim().is_empty() {
            issues.push("zfs.pool must not be empty".to_string());
        } else if !looks_like_volume_name(&self.zfs.pool) {
            issues.push(format!("zfs.pool is not a valid volume name: {}", self.zfs.pool));
        }

        if !self.zfs.root.is_absolute() {
            issues.push(format!(
                "zfs.root must be an absolute path (got {})",
                self.zfs.root.display()
            ));
        }

        if let Some(path) = &self.zfs.zfs_path {
            if path.trim().is_empty() {
                issues.push("zfs.zfs_path is set but empty".to_string());
            }
        }

        if self.history.path.as_os_str().is_empty() {
            issues.push("history.path must not be empty".to_string());
        }

        if let Some(excludes) = &self.dirvish.excludes {
            if excludes.iter().any(|pattern| pattern.trim().is_empty()) {
                issues.push("dirvish.excludes contains an empty pattern".to_string());
            }
        }

        issues
    }

    /// Exclude patterns to write into generated dirvish configurations.
    pub fn dirvish_excludes(&self) -> Vec<String> {
        match &self.dirvish.excludes {
            Some(list) if !list.is_empty() => list.clone(),
            _ => DEFAULT_EXCLUDES.iter().map(|s| s.to_string()).collect(),
        }
    }
}

fn render_bootstrap_template() -> String {
    let defaults = ZfsCfg::default();
    format!(
        "# Auto-generated vaultctl configuration bootstrap.\n\
         # Adjust the pool and backup root before provisioning customers.\n\
         \n\
         [zfs]\n\
         pool = \"{}\"\n\
         root = \"{}\"\n\
         # zfs_path = \"/usr/sbin/zfs\"\n\
         compression = true\n\
         \n\
         [history]\n\
         path = \"{}\"\n\
         \n\
         [dirvish]\n\
         # excludes = [\"/proc/*\", \"/sys/*\", \"/tmp/*\"]\n",
        defaults.pool,
        defaults.root.display(),
        default_history_path().display(),
    )
}

pub fn bootstrap_template() -> String {
    render_bootstrap_template()
}

fn ensure_bootstrap_file(path: &Path) -> io::Result<bool> {
    if path.exists() {
        return Ok(false);
    }

    if let Some(parent) = path.parent() {
        fs::create_dir_all(parent)?;
    }

    match OpenOptions::new().create_new(true).write(true).open(path) {
        Ok(mut file) => {
            let template = render_bootstrap_template();
            file.write_all(template.as_bytes())?;
            file.flush()?;
            #[cfg(unix)]
            {
                let mode = if path.starts_with("/etc/") { 0o640 } else { 0o600 };
                fs::set_permissions(path, PermissionsExt::from_mode(mode))?;
            }
            Ok(true)
        }
        Err(err) if err.kind() == io::ErrorKind::AlreadyExists => Ok(false),
        Err(err) => Err(err),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::tempdir;

    #[test]
    fn bootstrap_template_round_trips() {
        let cfg: VaultctlConfig = toml::from_str(&bootstrap_template()).unwrap();
        assert_eq!(cfg.zfs.pool, "backup");
        assert_eq!(cfg.zfs.root, PathBuf::from("/srv/backup"));
        assert!(cfg.zfs.compression);
        assert_eq!(cfg.history.path, default_history_path());
        assert!(cfg.dirvish.excludes.is_none());
    }

    #[test]
    fn load_or_bootstrap_creates_missing_file() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("vaultctl.toml");

        let cfg = VaultctlConfig::load_or_bootstrap(&path).unwrap();
        assert!(path.exists());
        assert_eq!(cfg.path, path);
        assert_eq!(cfg.zfs.pool, "backup");
    }

    #[test]
    fn load_rejects_empty_pool() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("vaultctl.toml");
        fs::write(&path, "[zfs]\npool = \"\"\nroot = \"/srv/backup\"\n").unwrap();

        assert!(matches!(
            VaultctlConfig::load(&path),
            Err(VaultctlError::InvalidConfig(_))
        ));
    }

    #[test]
    fn volume_name_validator_accepts_hierarchies() {
        assert!(looks_like_volume_name("backup"));
        assert!(looks_like_volume_name("backup/customer1"));
        assert!(looks_like_volume_name("backup/customer1/www.example.com"));
        assert!(looks_like_volume_name("tank/backup_2024"));

        assert!(!looks_like_volume_name(""));
        assert!(!looks_like_volume_name("backup//customer1"));
        assert!(!looks_like_volume_name("-backup/customer1"));
        assert!(!looks_like_volume_name("backup/space here"));
        assert!(!looks_like_volume_name("backup/customer@shadow"));
    }

    #[test]
    fn segment_validator_rejects_path_tricks() {
        assert!(valid_name_segment("customer1"));
        assert!(valid_name_segment("www.example.com"));

        assert!(!valid_name_segment(""));
        assert!(!valid_name_segment("a/b"));
        assert!(!valid_name_segment("-rf"));
    }

    #[test]
    fn validate_flags_relative_root() {
        let mut cfg: VaultctlConfig = toml::from_str(&bootstrap_template()).unwrap();
        cfg.zfs.root = PathBuf::from("srv/backup");

        let issues = cfg.validate();
        assert!(issues.iter().any(|issue| issue.contains("absolute")));
    }

    #[test]
    fn excludes_fall_back_to_defaults() {
        let mut cfg: VaultctlConfig = toml::from_str(&bootstrap_template()).unwrap();
        assert_eq!(cfg.dirvish_excludes().len(), DEFAULT_EXCLUDES.len());

        cfg.dirvish.excludes = Some(vec!["/custom/*".to_string()]);
        assert_eq!(cfg.dirvish_excludes(), vec!["/custom/*".to_string()]);
    }
}
