//! Command-line arguments

use std::path::PathBuf;

use clap::Parser;

use crate::transfer::Mode;

#[derive(Parser, Debug)]
#[command(
    name = "registry-sync",
    version,
    about = "Reconcile registry items with spreadsheet extracts",
    long_about = None,
)]
pub struct Cli {
    /// Which extract family to process
    #[arg(value_enum)]
    pub mode: Mode,

    /// Selects `config_{suffix}.json` and names the log file
    pub config_suffix: String,

    /// Directory holding the config files
    #[arg(long, default_value = ".")]
    pub config_dir: PathBuf,
}
