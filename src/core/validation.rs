//! Validation utilities for agent options
//!
//! Options arrive as loosely typed strings (from TOML or the command line) and
//! are checked here before any network activity takes place.

use std::fmt;

/// One or more option validation failures
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ValidationError {
    message: String,
    problems: Vec<String>,
}

impl ValidationError {
    pub fn new(message: &str) -> Self {
        Self {
            message: message.to_string(),
            problems: vec![message.to_string()],
        }
    }

    /// Combine every collected problem into a single error.
    ///
    /// Returns `None` when nothing was collected.
    pub fn from_problems(problems: Vec<String>) -> Option<Self> {
        if problems.is_empty() {
            return None;
        }
        Some(Self {
            message: problems.join("; "),
            problems,
        })
    }

    pub fn message(&self) -> &str {
        &self.message
    }

    pub fn problems(&self) -> &[String] {
        &self.problems
    }
}

impl fmt::Display for ValidationError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.message)
    }
}

impl std::error::Error for ValidationError {}

impl crate::core::error_handling::ContextualError for ValidationError {
    fn is_user_actionable(&self) -> bool {
        true
    }

    fn user_message(&self) -> Option<&str> {
        Some(&self.message)
    }
}

/// Interpret an option value as a boolean.
///
/// Only `true` and `false` (any ASCII case, surrounding whitespace ignored)
/// are accepted; anything else yields `None`.
pub fn parse_bool_option(value: &str) -> Option<bool> {
    let trimmed = value.trim();
    if trimmed.eq_ignore_ascii_case("true") {
        Some(true)
    } else if trimmed.eq_ignore_ascii_case("false") {
        Some(false)
    } else {
        None
    }
}

/// Validate positive integer value
pub fn validate_positive_int(value: &str) -> Result<u64, String> {
    match value.trim().parse::<u64>() {
        Ok(0) => Err("Value must be greater than 0".to_string()),
        Ok(n) => Ok(n),
        Err(_) => Err(format!("'{}' is not a valid positive integer", value)),
    }
}

/// Validate non-negative integer value
pub fn validate_non_negative_int(value: &str) -> Result<u64, String> {
    value
        .trim()
        .parse::<u64>()
        .map_err(|_| format!("'{}' is not a valid non-negative integer", value))
}

/// Validate a bare hostname such as `example.com` or `localhost:8443`.
///
/// Schemes, paths, query strings and whitespace are rejected because the
/// value is passed to the API as the `host` query parameter.
pub fn validate_hostname(site: &str) -> Result<String, String> {
    let trimmed = site.trim();
    if trimmed.is_empty() {
        return Err("Site cannot be empty".to_string());
    }
    if trimmed.contains("://") {
        return Err(format!(
            "Site '{}' must be a hostname, not a URL (drop the scheme)",
            trimmed
        ));
    }
    if trimmed.contains(['/', '?', '#']) || trimmed.chars().any(char::is_whitespace) {
        return Err(format!(
            "Site '{}' must be a bare hostname without path, query or spaces",
            trimmed
        ));
    }
    if trimmed.starts_with('.') || trimmed.ends_with('.') || trimmed.contains("..") {
        return Err(format!("Site '{}' is not a valid hostname", trimmed));
    }
    Ok(trimmed.to_lowercase())
}

/// Validate an http(s) base URL, returning it without a trailing slash
pub fn validate_http_url(url: &str) -> Result<String, String> {
    let trimmed = url.trim();
    if !trimmed.starts_with("http://") && !trimmed.starts_with("https://") {
        return Err(format!(
            "Invalid URL scheme. Only http:// and https:// are supported: {}",
            trimmed
        ));
    }
    reqwest::Url::parse(trimmed).map_err(|e| format!("Invalid URL '{}': {}", trimmed, e))?;
    Ok(trimmed.trim_end_matches('/').to_string())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_bool_option() {
        assert_eq!(parse_bool_option("true"), Some(true));
        assert_eq!(parse_bool_option("false"), Some(false));
        assert_eq!(parse_bool_option(" TRUE "), Some(true));
        assert_eq!(parse_bool_option("False"), Some(false));
        assert_eq!(parse_bool_option("yes"), None);
        assert_eq!(parse_bool_option("1"), None);
        assert_eq!(parse_bool_option(""), None);
    }

    #[test]
    fn test_validate_positive_int() {
        assert_eq!(validate_positive_int("5").unwrap(), 5);
        assert_eq!(validate_positive_int(" 2 ").unwrap(), 2);
        assert!(validate_positive_int("0").is_err());
        assert!(validate_positive_int("-5").is_err());
        assert!(validate_positive_int("two").is_err());
        assert!(validate_positive_int("").is_err());
    }

    #[test]
    fn test_validate_non_negative_int() {
        assert_eq!(validate_non_negative_int("0").unwrap(), 0);
        assert_eq!(validate_non_negative_int("30").unwrap(), 30);
        assert!(validate_non_negative_int("-1").is_err());
    }

    #[test]
    fn test_validate_hostname() {
        assert_eq!(validate_hostname("Example.COM").unwrap(), "example.com");
        assert_eq!(validate_hostname("localhost:8443").unwrap(), "localhost:8443");
        assert!(validate_hostname("").is_err());
        assert!(validate_hostname("   ").is_err());
        assert!(validate_hostname("https://example.com").is_err());
        assert!(validate_hostname("example.com/path").is_err());
        assert!(validate_hostname("exa mple.com").is_err());
        assert!(validate_hostname("example..com").is_err());
    }

    #[test]
    fn test_validate_http_url() {
        assert_eq!(
            validate_http_url("https://observatory.example/").unwrap(),
            "https://observatory.example"
        );
        assert!(validate_http_url("http://127.0.0.1:8080").is_ok());
        assert!(validate_http_url("ftp://example.com").is_err());
        assert!(validate_http_url("https://").is_err());
    }

    #[test]
    fn test_validation_error_collects_problems() {
        assert!(ValidationError::from_problems(vec![]).is_none());

        let error = ValidationError::from_problems(vec![
            "first problem".to_string(),
            "second problem".to_string(),
        ])
        .unwrap();
        assert_eq!(error.problems().len(), 2);
        assert_eq!(error.to_string(), "first problem; second problem");
    }
}
