//! TOML configuration file loading and settings layering
//!
//! Built-in defaults are overlaid by the configuration file, which is in turn
//! overlaid by the command line. Agent options live in an `[agent]` table;
//! host settings are top-level kebab-case keys.

use std::path::{Path, PathBuf};

use crate::core::validation::{validate_http_url, ValidationError};
use crate::observatory::options::AgentOptions;

use super::args::Args;

pub const CONFIG_DIR_NAME: &str = "ObservatoryWatch";
pub const CONFIG_FILE_NAME: &str = "observatory-watch.toml";

/// Once a day, matching the agent's default schedule
pub const DEFAULT_SCHEDULE_INTERVAL_SECS: u64 = 86_400;

const HOST_KEYS: &[&str] = &[
    "log-level",
    "log-format",
    "log-file",
    "color",
    "state-file",
    "events-file",
    "webhook-url",
    "schedule-interval-secs",
    "cycle-timeout-secs",
];

/// Fully layered settings for one run of the binary
#[derive(Debug, Clone, PartialEq)]
pub struct Settings {
    pub agent: AgentOptions,
    pub log_level: Option<String>,
    pub log_format: Option<String>,
    pub log_file: Option<PathBuf>,
    /// `None` leaves the decision to terminal detection
    pub color: Option<bool>,
    pub state_file: Option<PathBuf>,
    pub events_file: Option<PathBuf>,
    pub webhook_url: Option<String>,
    pub schedule_interval_secs: u64,
    pub cycle_timeout_secs: Option<u64>,
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            agent: AgentOptions::default(),
            log_level: None,
            log_format: None,
            log_file: None,
            color: None,
            state_file: None,
            events_file: None,
            webhook_url: None,
            schedule_interval_secs: DEFAULT_SCHEDULE_INTERVAL_SECS,
            cycle_timeout_secs: None,
        }
    }
}

impl Settings {
    /// Layer defaults, the configuration file and `args`
    pub async fn load(args: &Args) -> Result<Self, ValidationError> {
        let mut settings = Self::default();

        if let Some(path) = Self::resolve_config_path(args.config_file.clone())? {
            let config = read_config_file(&path).await?;
            settings.apply_toml(&config).map_err(|e| {
                ValidationError::new(&format!(
                    "Error in configuration file {}: {}",
                    path.display(),
                    e
                ))
            })?;
            log::debug!("Loaded configuration from {}", path.display());
        }

        settings.apply_args(args)?;
        Ok(settings)
    }

    /// `<config dir>/ObservatoryWatch/observatory-watch.toml`
    pub fn default_config_path() -> Option<PathBuf> {
        dirs::config_dir().map(|d| d.join(CONFIG_DIR_NAME).join(CONFIG_FILE_NAME))
    }

    /// An explicitly given file must exist; the default one is optional
    pub fn resolve_config_path(
        config_file: Option<PathBuf>,
    ) -> Result<Option<PathBuf>, ValidationError> {
        match config_file {
            Some(path) if path.exists() => Ok(Some(path)),
            Some(path) => Err(ValidationError::new(&format!(
                "The specified configuration file does not exist: {}",
                path.display()
            ))),
            None => Ok(Self::default_config_path().filter(|path| path.exists())),
        }
    }

    /// Overlay values from a parsed configuration file
    pub fn apply_toml(&mut self, config: &toml::Table) -> Result<(), ValidationError> {
        let mut problems = Vec::new();

        for (key, value) in config {
            let applied = match key.as_str() {
                "agent" => match value.as_table() {
                    Some(table) => self.agent.apply_toml(table).map_err(|e| e.message().to_string()),
                    None => Err("'agent' must be a table".to_string()),
                },
                "log-level" => string_value(key, value).map(|s| self.log_level = Some(s)),
                "log-format" => string_value(key, value).map(|s| self.log_format = Some(s)),
                "log-file" => string_value(key, value).map(|s| self.log_file = optional_path(&s)),
                "color" => bool_value(key, value).map(|b| self.color = Some(b)),
                "state-file" => string_value(key, value).map(|s| self.state_file = Some(PathBuf::from(s))),
                "events-file" => {
                    string_value(key, value).map(|s| self.events_file = Some(PathBuf::from(s)))
                }
                "webhook-url" => string_value(key, value)
                    .and_then(|s| validate_http_url(&s).map_err(|e| format!("webhook-url: {}", e)))
                    .map(|url| self.webhook_url = Some(url)),
                "schedule-interval-secs" => {
                    seconds_value(key, value).map(|n| self.schedule_interval_secs = n)
                }
                "cycle-timeout-secs" => seconds_value(key, value).map(|n| self.cycle_timeout_secs = Some(n)),
                other => Err(format!(
                    "Unknown configuration key '{}'. Known keys: agent, {}",
                    other,
                    HOST_KEYS.join(", ")
                )),
            };
            if let Err(problem) = applied {
                problems.push(problem);
            }
        }

        match ValidationError::from_problems(problems) {
            Some(err) => Err(err),
            None => Ok(()),
        }
    }

    /// Overlay command line values; only flags that were given take effect
    pub fn apply_args(&mut self, args: &Args) -> Result<(), ValidationError> {
        let mut problems = Vec::new();

        if let Some(site) = &args.site {
            self.agent.set("site", site.as_str())?;
        }
        if let Some(variant) = &args.variant {
            self.agent.set("variant", variant.as_str())?;
        }
        for assignment in &args.options {
            if let Err(e) = self.agent.apply_assignment(assignment) {
                problems.push(e.message().to_string());
            }
        }

        if let Some(level) = &args.log_level {
            self.log_level = Some(level.clone());
        }
        if let Some(format) = &args.log_format {
            self.log_format = Some(format.clone());
        }
        if let Some(file) = &args.log_file {
            self.log_file = optional_path(&file.to_string_lossy());
        }
        if let Some(color) = args.color_choice() {
            self.color = Some(color);
        }
        if let Some(path) = &args.state_file {
            self.state_file = Some(path.clone());
        }
        if let Some(path) = &args.events_file {
            self.events_file = Some(path.clone());
        }
        if let Some(url) = &args.webhook_url {
            match validate_http_url(url) {
                Ok(url) => self.webhook_url = Some(url),
                Err(e) => problems.push(format!("--webhook-url: {}", e)),
            }
        }
        if let Some(secs) = args.schedule_interval_secs {
            self.schedule_interval_secs = secs;
        }
        if let Some(secs) = args.cycle_timeout_secs {
            self.cycle_timeout_secs = Some(secs);
        }

        match ValidationError::from_problems(problems) {
            Some(err) => Err(err),
            None => Ok(()),
        }
    }
}

async fn read_config_file(path: &Path) -> Result<toml::Table, ValidationError> {
    let contents = tokio::fs::read_to_string(path).await.map_err(|e| {
        ValidationError::new(&format!(
            "Error reading configuration file {}: {}",
            path.display(),
            e
        ))
    })?;
    toml::from_str::<toml::Table>(&contents).map_err(|e| {
        ValidationError::new(&format!(
            "Error parsing configuration file {}: {}",
            path.display(),
            e
        ))
    })
}

/// Magic values "none" and "-" disable file logging
fn optional_path(value: &str) -> Option<PathBuf> {
    if value.eq_ignore_ascii_case("none") || value == "-" {
        None
    } else {
        Some(PathBuf::from(value))
    }
}

fn string_value(key: &str, value: &toml::Value) -> Result<String, String> {
    value
        .as_str()
        .map(str::to_string)
        .ok_or_else(|| format!("'{}' must be a string, found {}", key, value.type_str()))
}

fn bool_value(key: &str, value: &toml::Value) -> Result<bool, String> {
    value
        .as_bool()
        .ok_or_else(|| format!("'{}' must be true or false, found {}", key, value.type_str()))
}

fn seconds_value(key: &str, value: &toml::Value) -> Result<u64, String> {
    match value.as_integer() {
        Some(n) if n > 0 => Ok(n as u64),
        _ => Err(format!("'{}' must be a positive number of seconds", key)),
    }
}
