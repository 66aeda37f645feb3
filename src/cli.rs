//! CLI argument parsing

use clap::{Parser, ValueEnum};
use std::path::PathBuf;

/// Backend providing the device connection
#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum Backend {
    /// SAM-BA monitor over a USB CDC serial port
    Samba,
    /// In-memory target emulator for testing
    Dummy,
}

#[derive(Parser, Debug)]
#[command(name = "rbossa")]
#[command(author, version, about = "Interactive shell for SAM-BA boot monitors", long_about = None)]
pub struct Cli {
    /// Verbosity level (-v, -vv)
    #[arg(short, long, action = clap::ArgAction::Count)]
    pub verbose: u8,

    /// Backend used by connect and scan
    #[arg(short, long, value_enum, default_value_t = Backend::Samba)]
    pub backend: Backend,

    /// Serial baud rate (USB CDC ports ignore it)
    #[arg(long)]
    pub baud: Option<u32>,

    /// Connect to this port before the first prompt
    #[arg(short, long)]
    pub port: Option<String>,

    /// Line history file (defaults to the per-user data directory)
    #[arg(long, conflicts_with = "no_history")]
    pub history: Option<PathBuf>,

    /// Do not load or save line history
    #[arg(long)]
    pub no_history: bool,
}

#[cfg(test)]
mod tests {
    use super::*;
    use clap::CommandFactory;

    #[test]
    fn test_cli_is_valid() {
        Cli::command().debug_assert();
    }

    #[test]
    fn test_defaults() {
        let cli = Cli::parse_from(["rbossa"]);
        assert_eq!(cli.backend, Backend::Samba);
        assert_eq!(cli.verbose, 0);
        assert!(cli.port.is_none());
        assert!(!cli.no_history);
    }

    #[test]
    fn test_flags() {
        let cli = Cli::parse_from(["rbossa", "-vv", "-b", "dummy", "-p", "dummy0", "--baud", "921600"]);
        assert_eq!(cli.verbose, 2);
        assert_eq!(cli.backend, Backend::Dummy);
        assert_eq!(cli.port.as_deref(), Some("dummy0"));
        assert_eq!(cli.baud, Some(921600));
    }

    #[test]
    fn test_history_conflict() {
        assert!(Cli::try_parse_from(["rbossa", "--history", "h", "--no-history"]).is_err());
    }
}
