//! Agent options and their validation
//!
//! Options are stored as strings, the way they arrive from a config file or a
//! `--option key=value` flag, and only become typed values in
//! [`AgentOptions::validate`]. Validation reports every problem at once.

use std::str::FromStr;
use std::time::Duration;

use crate::core::validation::{
    parse_bool_option, validate_hostname, validate_http_url, validate_non_negative_int,
    validate_positive_int, ValidationError,
};
use crate::observatory::types::ApiVariant;

pub const DEFAULT_EXPECTED_RECEIVE_PERIOD_IN_DAYS: u64 = 2;
pub const DEFAULT_MAX_POLL_ATTEMPTS: usize = 20;
pub const DEFAULT_POLL_DELAY_SECS: u64 = 30;

/// Option names accepted in the `[agent]` table and by `--option`
pub const OPTION_KEYS: &[&str] = &[
    "site",
    "variant",
    "changes_only",
    "debug",
    "expected_receive_period_in_days",
    "hidden",
    "rescan",
    "max_poll_attempts",
    "poll_delay_secs",
    "api_base_url",
];

/// Unvalidated agent options
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AgentOptions {
    pub site: Option<String>,
    pub variant: Option<String>,
    pub changes_only: Option<String>,
    pub debug: Option<String>,
    pub expected_receive_period_in_days: Option<String>,
    pub hidden: Option<String>,
    pub rescan: Option<String>,
    pub max_poll_attempts: Option<String>,
    pub poll_delay_secs: Option<String>,
    pub api_base_url: Option<String>,
}

impl Default for AgentOptions {
    /// The options a freshly created agent starts with
    fn default() -> Self {
        Self {
            debug: Some("false".to_string()),
            expected_receive_period_in_days: Some(
                DEFAULT_EXPECTED_RECEIVE_PERIOD_IN_DAYS.to_string(),
            ),
            hidden: Some("false".to_string()),
            rescan: Some("false".to_string()),
            changes_only: Some("true".to_string()),
            ..Self::empty()
        }
    }
}

impl AgentOptions {
    /// Options with nothing set, not even the defaults
    pub fn empty() -> Self {
        Self {
            site: None,
            variant: None,
            changes_only: None,
            debug: None,
            expected_receive_period_in_days: None,
            hidden: None,
            rescan: None,
            max_poll_attempts: None,
            poll_delay_secs: None,
            api_base_url: None,
        }
    }

    /// Default options targeting `site`
    pub fn for_site(site: &str) -> Self {
        Self {
            site: Some(site.to_string()),
            ..Self::default()
        }
    }

    fn slot_mut(&mut self, key: &str) -> Option<&mut Option<String>> {
        match key {
            "site" => Some(&mut self.site),
            "variant" => Some(&mut self.variant),
            "changes_only" => Some(&mut self.changes_only),
            "debug" => Some(&mut self.debug),
            "expected_receive_period_in_days" => Some(&mut self.expected_receive_period_in_days),
            "hidden" => Some(&mut self.hidden),
            "rescan" => Some(&mut self.rescan),
            "max_poll_attempts" => Some(&mut self.max_poll_attempts),
            "poll_delay_secs" => Some(&mut self.poll_delay_secs),
            "api_base_url" => Some(&mut self.api_base_url),
            _ => None,
        }
    }

    /// Set one option by name
    pub fn set(&mut self, key: &str, value: impl Into<String>) -> Result<(), ValidationError> {
        let slot = self.slot_mut(key).ok_or_else(|| {
            ValidationError::new(&format!(
                "Unknown agent option '{}'. Known options: {}",
                key,
                OPTION_KEYS.join(", ")
            ))
        })?;
        *slot = Some(value.into());
        Ok(())
    }

    /// Remove one option, so validation sees it as absent
    pub fn unset(&mut self, key: &str) -> Result<(), ValidationError> {
        let slot = self
            .slot_mut(key)
            .ok_or_else(|| ValidationError::new(&format!("Unknown agent option '{}'", key)))?;
        *slot = None;
        Ok(())
    }

    /// Builder form of [`AgentOptions::set`]
    pub fn with(mut self, key: &str, value: impl Into<String>) -> Result<Self, ValidationError> {
        self.set(key, value)?;
        Ok(self)
    }

    /// Parse a `key=value` assignment as given on the command line
    pub fn apply_assignment(&mut self, assignment: &str) -> Result<(), ValidationError> {
        let (key, value) = assignment.split_once('=').ok_or_else(|| {
            ValidationError::new(&format!(
                "Option '{}' must be written as key=value",
                assignment
            ))
        })?;
        self.set(key.trim(), value.trim())
    }

    /// Overlay options from an `[agent]` TOML table.
    ///
    /// Booleans and integers are accepted as well as strings.
    pub fn apply_toml(&mut self, table: &toml::Table) -> Result<(), ValidationError> {
        let mut problems = Vec::new();

        for (key, value) in table {
            let text = match value {
                toml::Value::String(s) => s.clone(),
                toml::Value::Boolean(b) => b.to_string(),
                toml::Value::Integer(i) => i.to_string(),
                other => {
                    problems.push(format!(
                        "Agent option '{}' must be a string, boolean or integer, found {}",
                        key,
                        other.type_str()
                    ));
                    continue;
                }
            };
            if let Err(e) = self.set(key, text) {
                problems.push(e.message().to_string());
            }
        }

        match ValidationError::from_problems(problems) {
            Some(err) => Err(err),
            None => Ok(()),
        }
    }

    /// Check every option and produce the typed configuration
    pub fn validate(&self) -> Result<AgentConfig, ValidationError> {
        let mut problems = Vec::new();

        let site = match self.site.as_deref() {
            None => {
                problems.push("Please provide 'site', the hostname to scan".to_string());
                String::new()
            }
            Some(raw) => validate_hostname(raw).unwrap_or_else(|e| {
                problems.push(e);
                String::new()
            }),
        };

        let variant = match self.variant.as_deref() {
            None => ApiVariant::default(),
            Some(raw) => ApiVariant::from_str(raw.trim()).unwrap_or_else(|_| {
                problems.push(format!(
                    "if provided, variant must be 'legacy-v1' or 'current-v2' (got '{}')",
                    raw
                ));
                ApiVariant::default()
            }),
        };

        let mut boolean = |name: &str, raw: Option<&String>, default: bool| match raw {
            None => default,
            Some(value) => parse_bool_option(value).unwrap_or_else(|| {
                problems.push(format!("if provided, {} must be true or false", name));
                default
            }),
        };

        let changes_only = boolean("changes_only", self.changes_only.as_ref(), true);
        let debug = boolean("debug", self.debug.as_ref(), false);
        let (hidden, rescan) = if variant.supports_scan_flags() {
            (
                boolean("hidden", self.hidden.as_ref(), false),
                boolean("rescan", self.rescan.as_ref(), false),
            )
        } else {
            (false, false)
        };

        let expected_receive_period_in_days = match self
            .expected_receive_period_in_days
            .as_deref()
            .map(validate_positive_int)
        {
            Some(Ok(days)) => days,
            _ => {
                problems.push(
                    "Please provide 'expected_receive_period_in_days' to indicate how many days \
                     can pass before this Agent is considered to be not working"
                        .to_string(),
                );
                DEFAULT_EXPECTED_RECEIVE_PERIOD_IN_DAYS
            }
        };

        let max_poll_attempts = match self.max_poll_attempts.as_deref() {
            None => DEFAULT_MAX_POLL_ATTEMPTS,
            Some(raw) => validate_positive_int(raw)
                .map(|n| n as usize)
                .unwrap_or_else(|e| {
                    problems.push(format!("max_poll_attempts: {}", e));
                    DEFAULT_MAX_POLL_ATTEMPTS
                }),
        };

        let poll_delay_secs = match self.poll_delay_secs.as_deref() {
            None => DEFAULT_POLL_DELAY_SECS,
            Some(raw) => validate_non_negative_int(raw).unwrap_or_else(|e| {
                problems.push(format!("poll_delay_secs: {}", e));
                DEFAULT_POLL_DELAY_SECS
            }),
        };

        let api_base_url = match self.api_base_url.as_deref() {
            None => variant.default_base_url().to_string(),
            Some(raw) => validate_http_url(raw).unwrap_or_else(|e| {
                problems.push(format!("api_base_url: {}", e));
                String::new()
            }),
        };

        if let Some(err) = ValidationError::from_problems(problems) {
            return Err(err);
        }

        Ok(AgentConfig {
            site,
            variant,
            changes_only,
            debug,
            expected_receive_period_in_days,
            hidden,
            rescan,
            max_poll_attempts,
            poll_delay: Duration::from_secs(poll_delay_secs),
            api_base_url,
        })
    }
}

/// Validated, immutable per-agent configuration
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AgentConfig {
    pub site: String,
    pub variant: ApiVariant,
    pub changes_only: bool,
    pub debug: bool,
    pub expected_receive_period_in_days: u64,
    /// Only sent to the analyze endpoint
    pub hidden: bool,
    /// Only sent to the analyze endpoint
    pub rescan: bool,
    pub max_poll_attempts: usize,
    pub poll_delay: Duration,
    pub api_base_url: String,
}

#[cfg(test)]
mod tests {
    use super::*;

    fn problems_of(options: &AgentOptions) -> Vec<String> {
        options.validate().unwrap_err().problems().to_vec()
    }

    #[test]
    fn test_defaults_validate_once_site_is_set() {
        let config = AgentOptions::for_site("example.com").validate().unwrap();
        assert_eq!(config.site, "example.com");
        assert_eq!(config.variant, ApiVariant::LegacyV1);
        assert!(config.changes_only);
        assert!(!config.debug);
        assert_eq!(config.expected_receive_period_in_days, 2);
        assert!(!config.hidden);
        assert!(!config.rescan);
        assert_eq!(config.max_poll_attempts, DEFAULT_MAX_POLL_ATTEMPTS);
        assert_eq!(config.poll_delay, Duration::from_secs(30));
        assert_eq!(config.api_base_url, "https://observatory-api.mdn.mozilla.net");
    }

    #[test]
    fn test_missing_site_is_rejected() {
        let problems = problems_of(&AgentOptions::default());
        assert_eq!(problems.len(), 1);
        assert!(problems[0].contains("site"));
    }

    #[test]
    fn test_non_boolean_flags_are_rejected() {
        for key in ["changes_only", "debug"] {
            let options = AgentOptions::for_site("example.com")
                .with(key, "maybe")
                .unwrap();
            let problems = problems_of(&options);
            assert_eq!(
                problems,
                vec![format!("if provided, {} must be true or false", key)]
            );
        }
    }

    #[test]
    fn test_scan_flags_validated_for_current_api_only() {
        let legacy = AgentOptions::for_site("example.com")
            .with("hidden", "sometimes")
            .unwrap()
            .with("rescan", "often")
            .unwrap();
        let config = legacy.validate().unwrap();
        assert!(!config.hidden);

        let current = legacy.with("variant", "current-v2").unwrap();
        let problems = problems_of(&current);
        assert_eq!(problems.len(), 2);
        assert!(problems.iter().any(|p| p.contains("hidden")));
        assert!(problems.iter().any(|p| p.contains("rescan")));
    }

    #[test]
    fn test_scan_flags_parsed_for_current_api() {
        let config = AgentOptions::for_site("example.com")
            .with("variant", "current-v2")
            .unwrap()
            .with("hidden", "true")
            .unwrap()
            .with("rescan", "TRUE")
            .unwrap()
            .validate()
            .unwrap();
        assert!(config.hidden);
        assert!(config.rescan);
        assert_eq!(
            config.api_base_url,
            "https://http-observatory.security.mozilla.org"
        );
    }

    #[test]
    fn test_receive_period_must_be_positive_and_present() {
        for bad in ["0", "-3", "soon", ""] {
            let options = AgentOptions::for_site("example.com")
                .with("expected_receive_period_in_days", bad)
                .unwrap();
            let problems = problems_of(&options);
            assert!(
                problems[0].contains("expected_receive_period_in_days"),
                "value {:?} gave {:?}",
                bad,
                problems
            );
        }

        let mut absent = AgentOptions::for_site("example.com");
        absent.unset("expected_receive_period_in_days").unwrap();
        assert!(absent.validate().is_err());
    }

    #[test]
    fn test_all_problems_reported_together() {
        let options = AgentOptions::empty()
            .with("debug", "loud")
            .unwrap()
            .with("changes_only", "sometimes")
            .unwrap();
        let problems = problems_of(&options);
        assert_eq!(problems.len(), 4, "{:?}", problems);
    }

    #[test]
    fn test_poll_tuning_options() {
        let config = AgentOptions::for_site("example.com")
            .with("max_poll_attempts", "3")
            .unwrap()
            .with("poll_delay_secs", "0")
            .unwrap()
            .with("api_base_url", "http://127.0.0.1:9000/")
            .unwrap()
            .validate()
            .unwrap();
        assert_eq!(config.max_poll_attempts, 3);
        assert_eq!(config.poll_delay, Duration::ZERO);
        assert_eq!(config.api_base_url, "http://127.0.0.1:9000");

        let bad = AgentOptions::for_site("example.com")
            .with("max_poll_attempts", "0")
            .unwrap();
        assert!(problems_of(&bad)[0].starts_with("max_poll_attempts"));
    }

    #[test]
    fn test_unknown_option_rejected() {
        let mut options = AgentOptions::default();
        assert!(options.set("colour", "blue").is_err());
        assert!(options.apply_assignment("no-equals-sign").is_err());
        options.apply_assignment("site = example.org").unwrap();
        assert_eq!(options.site.as_deref(), Some("example.org"));
    }

    #[test]
    fn test_apply_toml_accepts_native_types() {
        let table: toml::Table = toml::from_str(
            r#"
            site = "example.com"
            changes_only = false
            expected_receive_period_in_days = 5
            debug = "true"
            "#,
        )
        .unwrap();

        let mut options = AgentOptions::default();
        options.apply_toml(&table).unwrap();
        let config = options.validate().unwrap();
        assert!(!config.changes_only);
        assert!(config.debug);
        assert_eq!(config.expected_receive_period_in_days, 5);
    }

    #[test]
    fn test_apply_toml_rejects_unknown_and_nested_values() {
        let table: toml::Table = toml::from_str(
            r#"
            sites = "example.com"
            hidden = [true]
            "#,
        )
        .unwrap();

        let mut options = AgentOptions::default();
        let err = options.apply_toml(&table).unwrap_err();
        assert_eq!(err.problems().len(), 2);
    }
}
