//! vaultctl command-line interface for provisioning and managing per-customer
//! backup storage on a ZFS pool.

use anyhow::{anyhow, Context, Result};
use clap::{Parser, Subcommand};
use schemars::schema_for;
use serde_json::to_string_pretty;
use std::path::{Path, PathBuf};
use vaultctl_core::{
    config::DEFAULT_CONFIG_PATH, history::DEFAULT_SHOW_COUNT, logging, workflow, History,
    VaultctlConfig,
};
use vaultctl_zfs::SystemZfsProvider;

/// Top-level command-line options shared by every subcommand.
#[derive(Parser, Debug)]
#[command(
    name = "vaultctl",
    version,
    about = "Manage dirvish backups with an underlying ZFS storage pool."
)]
struct Cli {
    /// Path to the vaultctl configuration file.
    #[arg(short, long, default_value = DEFAULT_CONFIG_PATH)]
    config: PathBuf,

    #[command(subcommand)]
    command: Commands,
}

/// Subcommands covering the lifecycle of customers and their vaults.
#[derive(Subcommand, Debug)]
enum Commands {
    /// Create a new customer volume, or a vault nested under a customer.
    New {
        /// Customer name; a logical group of dirvish vaults.
        #[arg(short = 'n', long)]
        customer: Option<String>,

        /// Dirvish vault name or server hostname to back up (use an FQDN).
        #[arg(short = 'v', long)]
        vault: Option<String>,

        /// Quota for this customer or vault, human readable (e.g. 500M, 10G).
        #[arg(short = 's', long)]
        size: Option<String>,

        /// IP address or FQDN the vault backs up, when different from the
        /// vault name.
        #[arg(long)]
        client: Option<String>,
    },

    /// Change the quota of an existing customer or vault.
    Resize {
        /// Customer name.
        #[arg(short = 'n', long)]
        customer: Option<String>,

        /// Vault name, when resizing a single vault instead of the customer.
        #[arg(short = 'v', long)]
        vault: Option<String>,

        /// New quota, human readable, or `none` to lift it.
        #[arg(short = 's', long)]
        size: Option<String>,
    },

    /// Remove a customer or vault together with its backups.
    Remove {
        /// Customer name.
        #[arg(short = 'n', long)]
        customer: Option<String>,

        /// Vault name, when removing a single vault instead of the customer.
        #[arg(short = 'v', long)]
        vault: Option<String>,
    },

    /// Show the most recent administrative actions.
    Log {
        /// Number of entries to show.
        #[arg(long, default_value_t = DEFAULT_SHOW_COUNT)]
        count: usize,
    },

    /// Validate a configuration file or emit the config schema.
    Validate {
        /// Path to the configuration file to validate.
        #[arg(short = 'f', long, default_value = DEFAULT_CONFIG_PATH)]
        file: PathBuf,

        /// Output the JSON schema instead of validating a file.
        #[arg(long)]
        schema: bool,
    },
}

/// Entry point: parse arguments and surface errors with an exit code.
fn main() {
    if let Err(err) = run() {
        eprintln!("error: {err}");
        std::process::exit(1);
    }
}

/// Dispatch to the requested subcommand.
fn run() -> Result<()> {
    logging::init("info");
    let cli = Cli::parse();
    let config_path = cli.config.clone();

    match cli.command {
        Commands::New {
            customer,
            vault,
            size,
            client,
        } => {
            let customer = require_customer(customer)?;
            let (config, provider, history) = open_backend(&config_path)?;
            workflow::provision(
                &config,
                &provider,
                &history,
                &customer,
                vault.as_deref(),
                size.as_deref(),
                client.as_deref(),
            )?;
        }
        Commands::Resize {
            customer,
            vault,
            size,
        } => {
            let customer = require_customer(customer)?;
            let size = size.ok_or_else(|| anyhow!("a size is required (use --size)"))?;
            let (config, provider, history) = open_backend(&config_path)?;
            workflow::resize(
                &config,
                &provider,
                &history,
                &customer,
                vault.as_deref(),
                &size,
            )?;
        }
        Commands::Remove { customer, vault } => {
            let customer = require_customer(customer)?;
            let (config, provider, history) = open_backend(&config_path)?;
            workflow::remove(&config, &provider, &history, &customer, vault.as_deref())?;
        }
        Commands::Log { count } => {
            let config = load_cli_config(&config_path)?;
            let history = History::open(&config.history.path)?;
            for line in history.show(count)? {
                println!("{line}");
            }
        }
        Commands::Validate { file, schema } => {
            if schema {
                let schema = schema_for!(VaultctlConfig);
                println!("{}", to_string_pretty(&schema)?);
                return Ok(());
            }

            let config = VaultctlConfig::load(&file)
                .with_context(|| format!("failed to load {}", file.display()))?;
            let issues = config.validate();
            if issues.is_empty() {
                println!("{} is valid", file.display());
            } else {
                for issue in &issues {
                    eprintln!("{issue}");
                }
                return Err(anyhow!(
                    "{} has {} issue(s)",
                    file.display(),
                    issues.len()
                ));
            }
        }
    }

    Ok(())
}

fn require_customer(customer: Option<String>) -> Result<String> {
    customer.ok_or_else(|| anyhow!("a customer is required (use --customer)"))
}

fn load_cli_config(path: &Path) -> Result<VaultctlConfig> {
    let config = VaultctlConfig::load_or_bootstrap(path)
        .with_context(|| format!("failed to load configuration from {}", path.display()))?;

    if config.path != path {
        println!(
            "Using bootstrap configuration at {}.",
            config.path.display()
        );
    }

    Ok(config)
}

fn open_backend(path: &Path) -> Result<(VaultctlConfig, SystemZfsProvider, History)> {
    let config = load_cli_config(path)?;
    let provider = SystemZfsProvider::from_config(&config)?;
    let history = History::open(&config.history.path)?;
    Ok((config, provider, history))
}
