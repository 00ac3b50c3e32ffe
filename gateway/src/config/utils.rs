use std::env;
use std::str::FromStr;

use super::ConfigError;

/// Read an environment variable, treating unset and blank values the same.
pub(crate) fn env_var(name: &str) -> Option<String> {
    env::var(name)
        .ok()
        .map(|v| v.trim().to_string())
        .filter(|v| !v.is_empty())
}

/// Read and parse an environment variable.
pub(crate) fn parse_env<T>(name: &str) -> Result<Option<T>, ConfigError>
where
    T: FromStr,
    T::Err: std::fmt::Display,
{
    match env_var(name) {
        Some(raw) => raw
            .parse::<T>()
            .map(Some)
            .map_err(|e| ConfigError::InvalidValue {
                name: name.to_string(),
                message: e.to_string(),
            }),
        None => Ok(None),
    }
}

/// Parse a boolean flag. Accepts `true/false`, `1/0`, `yes/no`, `on/off`.
pub(crate) fn parse_bool(name: &str, raw: &str) -> Result<bool, ConfigError> {
    match raw.trim().to_ascii_lowercase().as_str() {
        "true" | "1" | "yes" | "on" => Ok(true),
        "false" | "0" | "no" | "off" => Ok(false),
        other => Err(ConfigError::InvalidValue {
            name: name.to_string(),
            message: format!("expected a boolean, got '{other}'"),
        }),
    }
}

pub(crate) fn parse_env_bool(name: &str) -> Result<Option<bool>, ConfigError> {
    env_var(name).map(|raw| parse_bool(name, &raw)).transpose()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_bool_variants() {
        for raw in ["true", "TRUE", "1", "yes", "On"] {
            assert!(parse_bool("FLAG", raw).unwrap(), "{raw}");
        }
        for raw in ["false", "0", "no", "OFF"] {
            assert!(!parse_bool("FLAG", raw).unwrap(), "{raw}");
        }
    }

    #[test]
    fn test_parse_bool_invalid() {
        let err = parse_bool("TLS_ENABLED", "maybe").unwrap_err();
        assert!(err.to_string().contains("TLS_ENABLED"));
    }
}
