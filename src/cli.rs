use clap::Parser;
use std::path::PathBuf;

// Build version with target info
const VERSION_INFO: &str = const_format::concatcp!(
    env!("CARGO_PKG_VERSION"), "\n",
    "Target: ", std::env::consts::ARCH, "-", std::env::consts::OS
);

/// Course video player
#[derive(Parser, Debug)]
#[command(author, version = VERSION_INFO, about, long_about = None)]
pub struct Args {
    /// Course catalog JSON file (omit to play the built-in demo course)
    #[arg(value_name = "CATALOG")]
    pub catalog: Option<PathBuf>,

    /// Course id to open (default: first course in the catalog)
    #[arg(short = 'C', long = "course", value_name = "ID")]
    pub course: Option<u32>,

    /// Select a specific video on startup
    #[arg(long = "video", value_name = "ID")]
    pub start_video: Option<u32>,

    /// Disable auto-advance to the next lesson on completion
    #[arg(long = "no-autoplay")]
    pub no_autoplay: bool,

    /// Keep progress in memory only (skip the on-disk progress store)
    #[arg(short = 'e', long = "ephemeral")]
    pub ephemeral: bool,

    /// Enable debug logging to file (default: corso.log)
    #[arg(short = 'l', long = "log", value_name = "LOG_FILE")]
    pub log_file: Option<Option<PathBuf>>,

    /// Increase logging verbosity (default: warn, -v: info, -vv: debug, -vvv+: trace)
    #[arg(short = 'v', long = "verbose", action = clap::ArgAction::Count)]
    pub verbosity: u8,

    /// Custom configuration directory (overrides default platform paths)
    #[arg(short = 'c', long = "config-dir", value_name = "DIR")]
    pub config_dir: Option<PathBuf>,
}
