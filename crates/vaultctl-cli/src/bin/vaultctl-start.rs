//! Dirvish pre-server trigger: record the start of a backup run.

use vaultctl_core::dirvish::{run_trigger, BackupPhase};
use vaultctl_core::logging;

fn main() {
    logging::init("info");
    if let Err(err) = run_trigger(BackupPhase::Start) {
        eprintln!("error: {err}");
        std::process::exit(1);
    }
}
