//! Command line arguments
//!
//! Every host setting can also come from the configuration file; values given
//! here win over the file.

use clap::{ArgAction, CommandFactory, FromArgMatches, Parser};
use std::ffi::OsString;
use std::path::PathBuf;

use crate::core::version::long_version;

#[derive(Parser, Debug, Clone, Default, PartialEq)]
#[command(name = "observatory-watch")]
#[command(about = "Watch a site's Mozilla HTTP Observatory score and report changes")]
#[command(version)]
#[command(
    after_help = "Agent options (-o key=value): site, variant, changes_only, debug, \
                  expected_receive_period_in_days, hidden, rescan, max_poll_attempts, \
                  poll_delay_secs, api_base_url"
)]
pub struct Args {
    /// Configuration file path
    #[arg(short = 'c', long = "config-file", value_name = "FILE")]
    pub config_file: Option<PathBuf>,

    /// Hostname to scan
    #[arg(short = 's', long = "site", value_name = "HOST")]
    pub site: Option<String>,

    /// Observatory API to use
    #[arg(long = "variant", value_name = "VARIANT", value_parser = ["legacy-v1", "current-v2", "v1", "v2"])]
    pub variant: Option<String>,

    /// Set an agent option (repeatable)
    #[arg(short = 'o', long = "option", value_name = "KEY=VALUE", action = ArgAction::Append)]
    pub options: Vec<String>,

    /// Run a single check cycle and exit
    #[arg(long = "once")]
    pub once: bool,

    /// Validate the configuration and exit without contacting the API
    #[arg(long = "check-config")]
    pub check_config: bool,

    /// File holding the last known scan result
    #[arg(long = "state-file", value_name = "FILE")]
    pub state_file: Option<PathBuf>,

    /// Append events as JSON lines to this file instead of stdout
    #[arg(long = "events-file", value_name = "FILE")]
    pub events_file: Option<PathBuf>,

    /// POST events to this URL
    #[arg(long = "webhook-url", value_name = "URL")]
    pub webhook_url: Option<String>,

    /// Seconds between check cycles in watch mode
    #[arg(long = "schedule-interval-secs", value_name = "SECS", value_parser = clap::value_parser!(u64).range(1..))]
    pub schedule_interval_secs: Option<u64>,

    /// Abandon the scan poll of a check cycle after this many seconds
    #[arg(long = "cycle-timeout-secs", value_name = "SECS", value_parser = clap::value_parser!(u64).range(1..))]
    pub cycle_timeout_secs: Option<u64>,

    /// Log level
    #[arg(short = 'l', long = "log-level", value_name = "LEVEL", value_parser = ["trace", "debug", "info", "warn", "error", "off"])]
    pub log_level: Option<String>,

    /// Log output format
    #[arg(long = "log-format", value_name = "FORMAT", value_parser = ["text", "ext", "json"])]
    pub log_format: Option<String>,

    /// Log file path (use 'none' to disable file logging)
    #[arg(long = "log-file", value_name = "FILE")]
    pub log_file: Option<PathBuf>,

    /// Force colored log output
    #[arg(long = "color", action = ArgAction::SetTrue)]
    pub color: bool,

    /// Disable colored log output
    #[arg(long = "no-color", action = ArgAction::SetTrue, conflicts_with = "color")]
    pub no_color: bool,
}

impl Args {
    /// The clap command with build metadata attached to `--version`
    pub fn command_with_version() -> clap::Command {
        Self::command().long_version(long_version())
    }

    /// Parse from the process arguments, exiting on `--help`, `--version` or errors
    pub fn parse_from_env() -> Self {
        match Self::try_parse_from_args(std::env::args_os()) {
            Ok(args) => args,
            Err(e) => e.exit(),
        }
    }

    pub fn try_parse_from_args<I, T>(args: I) -> Result<Self, clap::Error>
    where
        I: IntoIterator<Item = T>,
        T: Into<OsString> + Clone,
    {
        let matches = Self::command_with_version().try_get_matches_from(args)?;
        Self::from_arg_matches(&matches)
    }

    /// Explicit color choice, `None` when neither flag was given
    pub fn color_choice(&self) -> Option<bool> {
        match (self.color, self.no_color) {
            (true, _) => Some(true),
            (_, true) => Some(false),
            _ => None,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn parse(args: &[&str]) -> Result<Args, clap::Error> {
        Args::try_parse_from_args(std::iter::once("observatory-watch").chain(args.iter().copied()))
    }

    #[test]
    fn test_defaults() {
        let args = parse(&[]).unwrap();
        assert_eq!(args, Args::default());
        assert_eq!(args.color_choice(), None);
    }

    #[test]
    fn test_agent_flags() {
        let args = parse(&[
            "--site",
            "example.com",
            "--variant",
            "v2",
            "-o",
            "rescan=true",
            "--option",
            "changes_only=false",
            "--once",
        ])
        .unwrap();

        assert_eq!(args.site.as_deref(), Some("example.com"));
        assert_eq!(args.variant.as_deref(), Some("v2"));
        assert_eq!(args.options, vec!["rescan=true", "changes_only=false"]);
        assert!(args.once);
        assert!(!args.check_config);
    }

    #[test]
    fn test_host_flags() {
        let args = parse(&[
            "--config-file=custom.toml",
            "--state-file",
            "/tmp/state.json",
            "--schedule-interval-secs",
            "3600",
            "--cycle-timeout-secs",
            "900",
            "--log-format",
            "json",
            "--no-color",
        ])
        .unwrap();

        assert_eq!(args.config_file, Some(PathBuf::from("custom.toml")));
        assert_eq!(args.state_file, Some(PathBuf::from("/tmp/state.json")));
        assert_eq!(args.schedule_interval_secs, Some(3600));
        assert_eq!(args.cycle_timeout_secs, Some(900));
        assert_eq!(args.log_format.as_deref(), Some("json"));
        assert_eq!(args.color_choice(), Some(false));
    }

    #[test]
    fn test_rejects_zero_interval() {
        assert!(parse(&["--schedule-interval-secs", "0"]).is_err());
    }

    #[test]
    fn test_rejects_unknown_variant() {
        assert!(parse(&["--variant", "v3"]).is_err());
    }

    #[test]
    fn test_color_flags_conflict() {
        assert!(parse(&["--color", "--no-color"]).is_err());
        assert_eq!(parse(&["--color"]).unwrap().color_choice(), Some(true));
    }

    #[test]
    fn test_long_version_carries_build_info() {
        let err = parse(&["--version"]).unwrap_err();
        assert_eq!(err.kind(), clap::error::ErrorKind::DisplayVersion);
        let rendered = Args::command_with_version().render_long_version();
        assert!(rendered.contains(env!("CARGO_PKG_VERSION")));
        assert!(rendered.contains("git"));
    }
}
