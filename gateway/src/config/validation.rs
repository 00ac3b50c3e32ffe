use super::ConfigError;

/// TLS needs both a certificate and a key once enabled.
pub(crate) fn validate_tls(
    enabled: bool,
    cert_path: &Option<String>,
    key_path: &Option<String>,
) -> Result<(), ConfigError> {
    if !enabled {
        return Ok(());
    }
    match (cert_path, key_path) {
        (Some(_), Some(_)) => Ok(()),
        (None, _) => Err(ConfigError::Invalid(
            "TLS is enabled but no certificate path is set (TLS_CERT_PATH or server.tls.cert_path)"
                .to_string(),
        )),
        (_, None) => Err(ConfigError::Invalid(
            "TLS is enabled but no private key path is set (TLS_KEY_PATH or server.tls.key_path)"
                .to_string(),
        )),
    }
}

/// Search is either fully configured or not at all.
///
/// Returns `true` when all three of endpoint, index and key are present.
pub(crate) fn validate_search_credentials(
    endpoint: &Option<String>,
    index: &Option<String>,
    api_key: &Option<String>,
) -> Result<bool, ConfigError> {
    let present = [
        ("AZURE_SEARCH_ENDPOINT", endpoint.is_some()),
        ("AZURE_SEARCH_INDEX", index.is_some()),
        ("AZURE_SEARCH_API_KEY", api_key.is_some()),
    ];

    let set = present.iter().filter(|(_, is_set)| *is_set).count();
    match set {
        0 => Ok(false),
        3 => Ok(true),
        _ => {
            let missing: Vec<&str> = present
                .iter()
                .filter(|(_, is_set)| !is_set)
                .map(|(name, _)| *name)
                .collect();
            Err(ConfigError::Invalid(format!(
                "Incomplete search configuration, missing: {}",
                missing.join(", ")
            )))
        }
    }
}

/// The rate limiter cannot be built with a zero rate or burst.
pub(crate) fn validate_rate_limit(
    requests_per_second: u32,
    burst_size: u32,
) -> Result<(), ConfigError> {
    if requests_per_second == 0 {
        return Err(ConfigError::Invalid(
            "RATE_LIMIT_REQUESTS_PER_SECOND must be greater than 0".to_string(),
        ));
    }
    if burst_size == 0 {
        return Err(ConfigError::Invalid(
            "RATE_LIMIT_BURST_SIZE must be greater than 0".to_string(),
        ));
    }
    Ok(())
}
