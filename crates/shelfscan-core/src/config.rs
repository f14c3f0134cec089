use std::path::PathBuf;

use crate::app_config::AppConfig;
use crate::ConfigError;

/// Load application configuration from environment variables.
///
/// Calls `dotenvy::dotenv().ok()` to load `.env` files before reading env vars.
///
/// # Errors
///
/// Returns `ConfigError` if required env vars are missing or values are invalid.
pub fn load_app_config() -> Result<AppConfig, ConfigError> {
    dotenvy::dotenv().ok();
    load_app_config_from_env()
}

/// Load application configuration from environment variables already in the
/// process, without touching `.env` files.
///
/// # Errors
///
/// Returns `ConfigError` if required env vars are missing or values are invalid.
pub fn load_app_config_from_env() -> Result<AppConfig, ConfigError> {
    build_app_config(|key| std::env::var(key))
}

/// Build application configuration using the provided env-var lookup function.
///
/// This is the core parsing/validation logic, decoupled from the actual
/// environment so it can be tested with a pure `HashMap` lookup.
fn build_app_config<F>(lookup: F) -> Result<AppConfig, ConfigError>
where
    F: Fn(&str) -> Result<String, std::env::VarError>,
{
    let require = |var: &str| -> Result<String, ConfigError> {
        lookup(var).map_err(|_| ConfigError::MissingEnvVar(var.to_string()))
    };

    let or_default = |var: &str, default: &str| -> String {
        lookup(var).unwrap_or_else(|_| default.to_string())
    };

    let parse_u32 = |var: &str, default: &str| -> Result<u32, ConfigError> {
        let raw = or_default(var, default);
        raw.parse::<u32>().map_err(|e| ConfigError::InvalidEnvVar {
            var: var.to_string(),
            reason: e.to_string(),
        })
    };

    let parse_u64 = |var: &str, default: &str| -> Result<u64, ConfigError> {
        let raw = or_default(var, default);
        raw.parse::<u64>().map_err(|e| ConfigError::InvalidEnvVar {
            var: var.to_string(),
            reason: e.to_string(),
        })
    };

    let parse_usize = |var: &str, default: &str| -> Result<usize, ConfigError> {
        let raw = or_default(var, default);
        raw.parse::<usize>()
            .map_err(|e| ConfigError::InvalidEnvVar {
                var: var.to_string(),
                reason: e.to_string(),
            })
    };

    let catalog_base_url = require("SHELFSCAN_CATALOG_BASE_URL")?;
    let render_base_url = require("SHELFSCAN_RENDER_URL")?;
    let render_token = lookup("SHELFSCAN_RENDER_TOKEN").ok();

    let log_level = or_default("SHELFSCAN_LOG_LEVEL", "info");
    let session_path = PathBuf::from(or_default(
        "SHELFSCAN_SESSION_PATH",
        "./shelfscan_session.json",
    ));
    let checkpoint_path = PathBuf::from(or_default(
        "SHELFSCAN_CHECKPOINT_PATH",
        "./shelfscan_checkpoint.json",
    ));
    let checkpoint_interval = parse_usize("SHELFSCAN_CHECKPOINT_INTERVAL", "5")?;
    let checkpoint_queue = parse_usize("SHELFSCAN_CHECKPOINT_QUEUE", "32")?;

    let request_timeout_secs = parse_u64("SHELFSCAN_REQUEST_TIMEOUT_SECS", "30")?;
    let render_timeout_secs = parse_u64("SHELFSCAN_RENDER_TIMEOUT_SECS", "60")?;
    let user_agent = or_default("SHELFSCAN_USER_AGENT", "shelfscan/0.1 (catalog-collection)");

    let max_attempts = parse_u32("SHELFSCAN_MAX_ATTEMPTS", "3")?;
    let retry_backoff_base_ms = parse_u64("SHELFSCAN_RETRY_BACKOFF_BASE_MS", "500")?;

    let pacing_min_ms = parse_u64("SHELFSCAN_PACING_MIN_MS", "1000")?;
    let pacing_max_ms = parse_u64("SHELFSCAN_PACING_MAX_MS", "3000")?;
    if pacing_max_ms < pacing_min_ms {
        return Err(ConfigError::InvalidEnvVar {
            var: "SHELFSCAN_PACING_MAX_MS".to_string(),
            reason: format!("must be >= SHELFSCAN_PACING_MIN_MS ({pacing_min_ms})"),
        });
    }

    let challenge_max_retries = parse_u32("SHELFSCAN_CHALLENGE_MAX_RETRIES", "3")?;
    let challenge_timeout_secs = parse_u64("SHELFSCAN_CHALLENGE_TIMEOUT_SECS", "300")?;

    if max_attempts == 0 {
        return Err(ConfigError::InvalidEnvVar {
            var: "SHELFSCAN_MAX_ATTEMPTS".to_string(),
            reason: "must be at least 1".to_string(),
        });
    }

    Ok(AppConfig {
        catalog_base_url,
        render_base_url,
        render_token,
        log_level,
        session_path,
        checkpoint_path,
        checkpoint_interval,
        checkpoint_queue,
        request_timeout_secs,
        render_timeout_secs,
        user_agent,
        max_attempts,
        retry_backoff_base_ms,
        pacing_min_ms,
        pacing_max_ms,
        challenge_max_retries,
        challenge_timeout_secs,
    })
}

#[cfg(test)]
mod tests {
    use std::collections::HashMap;
    use std::env::VarError;

    use super::*;

    fn lookup_from_map<'a>(
        map: &'a HashMap<&'a str, &'a str>,
    ) -> impl Fn(&str) -> Result<String, VarError> + 'a {
        move |key| {
            map.get(key)
                .map(|v| (*v).to_string())
                .ok_or(VarError::NotPresent)
        }
    }

    /// Returns a map with all required env vars populated with valid defaults.
    fn full_env<'a>() -> HashMap<&'a str, &'a str> {
        let mut m = HashMap::new();
        m.insert("SHELFSCAN_CATALOG_BASE_URL", "https://catalog.example");
        m.insert("SHELFSCAN_RENDER_URL", "http://localhost:3030");
        m
    }

    #[test]
    fn fails_without_catalog_base_url() {
        let map: HashMap<&str, &str> = HashMap::new();
        let result = build_app_config(lookup_from_map(&map));
        assert!(
            matches!(result, Err(ConfigError::MissingEnvVar(ref v)) if v == "SHELFSCAN_CATALOG_BASE_URL"),
            "expected MissingEnvVar(SHELFSCAN_CATALOG_BASE_URL), got: {result:?}"
        );
    }

    #[test]
    fn fails_without_render_url() {
        let mut map: HashMap<&str, &str> = HashMap::new();
        map.insert("SHELFSCAN_CATALOG_BASE_URL", "https://catalog.example");
        let result = build_app_config(lookup_from_map(&map));
        assert!(
            matches!(result, Err(ConfigError::MissingEnvVar(ref v)) if v == "SHELFSCAN_RENDER_URL"),
            "expected MissingEnvVar(SHELFSCAN_RENDER_URL), got: {result:?}"
        );
    }

    #[test]
    fn succeeds_with_required_vars_and_applies_defaults() {
        let map = full_env();
        let cfg = build_app_config(lookup_from_map(&map)).expect("config should build");
        assert_eq!(cfg.catalog_base_url, "https://catalog.example");
        assert_eq!(cfg.render_token, None);
        assert_eq!(cfg.max_attempts, 3);
        assert_eq!(cfg.checkpoint_interval, 5);
        assert_eq!(cfg.request_timeout_secs, 30);
        assert_eq!(cfg.render_timeout_secs, 60);
        assert_eq!(cfg.challenge_timeout_secs, 300);
    }

    #[test]
    fn rejects_non_numeric_max_attempts() {
        let mut map = full_env();
        map.insert("SHELFSCAN_MAX_ATTEMPTS", "lots");
        let result = build_app_config(lookup_from_map(&map));
        assert!(
            matches!(result, Err(ConfigError::InvalidEnvVar { ref var, .. }) if var == "SHELFSCAN_MAX_ATTEMPTS"),
            "expected InvalidEnvVar(SHELFSCAN_MAX_ATTEMPTS), got: {result:?}"
        );
    }

    #[test]
    fn rejects_zero_max_attempts() {
        let mut map = full_env();
        map.insert("SHELFSCAN_MAX_ATTEMPTS", "0");
        let result = build_app_config(lookup_from_map(&map));
        assert!(
            matches!(result, Err(ConfigError::InvalidEnvVar { ref var, .. }) if var == "SHELFSCAN_MAX_ATTEMPTS"),
            "expected InvalidEnvVar(SHELFSCAN_MAX_ATTEMPTS), got: {result:?}"
        );
    }

    #[test]
    fn rejects_inverted_pacing_window() {
        let mut map = full_env();
        map.insert("SHELFSCAN_PACING_MIN_MS", "5000");
        map.insert("SHELFSCAN_PACING_MAX_MS", "1000");
        let result = build_app_config(lookup_from_map(&map));
        assert!(
            matches!(result, Err(ConfigError::InvalidEnvVar { ref var, .. }) if var == "SHELFSCAN_PACING_MAX_MS"),
            "expected InvalidEnvVar(SHELFSCAN_PACING_MAX_MS), got: {result:?}"
        );
    }

    #[test]
    fn debug_redacts_render_token() {
        let mut map = full_env();
        map.insert("SHELFSCAN_RENDER_TOKEN", "super-secret");
        let cfg = build_app_config(lookup_from_map(&map)).expect("config should build");
        let debug = format!("{cfg:?}");
        assert!(!debug.contains("super-secret"), "token leaked: {debug}");
        assert!(debug.contains("[redacted]"));
    }
}
