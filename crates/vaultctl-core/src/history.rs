//! Append-only history of administrative actions.
//!
//! Every entry is one JSON object per line so the log can be appended to
//! without rewriting and tailed with standard tools.

use crate::error::VaultctlResult;
use chrono::{DateTime, Local};
use log::warn;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::fs::{self, OpenOptions};
use std::io::Write;
use std::path::{Path, PathBuf};

/// Default number of entries `show` renders.
pub const DEFAULT_SHOW_COUNT: usize = 20;

/// Single recorded administrative action.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct HistoryEntry {
    /// When the action was recorded.
    pub timestamp: DateTime<Local>,
    /// The subcommand or trigger that ran, e.g. `create` or `resize`.
    pub command: String,
    /// Customer the action applied to.
    pub customer: String,
    /// Vault the action applied to, when vault-scoped.
    pub vault: Option<String>,
    /// Quota size involved, when the action carried one.
    pub size: Option<String>,
}

impl fmt::Display for HistoryEntry {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{} - {} customer \"{}\"",
            self.timestamp.format("%Y-%m-%d %H:%M:%S"),
            self.command,
            self.customer
        )?;
        if let Some(vault) = &self.vault {
            write!(f, " vault \"{vault}\"")?;
        }
        if let Some(size) = &self.size {
            write!(f, " with size {size}")?;
        }
        Ok(())
    }
}

/// Store and render the history of actions done with the vaultctl tool.
#[derive(Debug, Clone)]
pub struct History {
    path: PathBuf,
}

impl History {
    /// Open (or prepare) the history log at `path`, creating parent
    /// directories so the first append cannot fail on a missing directory.
    pub fn open<P: AsRef<Path>>(path: P) -> VaultctlResult<Self> {
        let path = path.as_ref().to_path_buf();
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent)?;
        }
        Ok(Self { path })
    }

    /// Append an entry, stamped with the current local time.
    pub fn add(
        &self,
        customer: &str,
        command: &str,
        vault: Option<&str>,
        size: Option<&str>,
    ) -> VaultctlResult<()> {
        let entry = HistoryEntry {
            timestamp: Local::now(),
            command: command.to_string(),
            customer: customer.to_string(),
            vault: vault.map(str::to_string),
            size: size.map(str::to_string),
        };

        let mut file = OpenOptions::new()
            .create(true)
            .append(true)
            .open(&self.path)?;
        let line = serde_json::to_string(&entry)?;
        writeln!(file, "{line}")?;
        Ok(())
    }

    /// Read back all recorded entries, oldest first.
    ///
    /// Unreadable lines are skipped with a warning; a damaged log must never
    /// keep the operator from seeing the rest of it.
    pub fn entries(&self) -> VaultctlResult<Vec<HistoryEntry>> {
        if !self.path.exists() {
            return Ok(Vec::new());
        }

        let contents = fs::read_to_string(&self.path)?;
        let mut entries = Vec::new();
        for (index, line) in contents.lines().enumerate() {
            if line.trim().is_empty() {
                continue;
            }
            match serde_json::from_str::<HistoryEntry>(line) {
                Ok(entry) => entries.push(entry),
                Err(err) => warn!(
                    "skipping unreadable history entry at {}:{}: {err}",
                    self.path.display(),
                    index + 1
                ),
            }
        }
        Ok(entries)
    }

    /// Render the newest `count` entries, oldest first.
    pub fn show(&self, count: usize) -> VaultctlResult<Vec<String>> {
        let entries = self.entries()?;
        let start = entries.len().saturating_sub(count);
        Ok(entries[start..].iter().map(ToString::to_string).collect())
    }
}
