//! Environment variable processing for runtime configuration overrides.
//!
//! Env var prefix: `ITEST_RUNNER_`
//!
//! - `ITEST_RUNNER_RT_PATH` - override the `itestrt` executable path
//! - `ITEST_RUNNER_TIMEOUT` - override the runtime timeout (seconds)
//! - `ITEST_RUNNER_LICENSE_HOST` - override the license server host
//! - `ITEST_RUNNER_LICENSE_PORT` - override the license server port
//! - `ITEST_RUNNER_DB_URI` - override the database connection URI
//! - `ITEST_RUNNER_DB_TYPE` - override the database type (MySQL/PostgreSQL)
//! - `ITEST_RUNNER_DB_USERNAME` - override the database username
//! - `ITEST_RUNNER_DB_PASSWORD` - override the database password
//!
//! The host build environment is read from the unprefixed `WORKSPACE` and
//! `BUILD_ID` variables that CI servers export.

use super::{DatabaseSettings, DatabaseType, GlobalSettings};

const PREFIX: &str = "ITEST_RUNNER_";

/// Workspace directory exported by the CI server.
pub fn workspace_from_env() -> Option<String> {
    std::env::var("WORKSPACE").ok().filter(|s| !s.is_empty())
}

/// Build identifier exported by the CI server.
pub fn build_id_from_env() -> Option<String> {
    std::env::var("BUILD_ID").ok().filter(|s| !s.is_empty())
}

/// Apply individual env var overrides to the settings.
///
/// Each override is applied only if the env var is set and parses correctly.
/// Invalid values are logged and ignored.
pub fn apply_env_overrides(settings: &mut GlobalSettings) {
    if let Some(val) = env_str("RT_PATH") {
        settings.runner.path = val;
    }

    if let Some(val) = env_parse::<u64>("TIMEOUT") {
        settings.runner.timeout = Some(val);
    }

    if let Some(val) = env_str("LICENSE_HOST") {
        settings.license_server.host = val;
    }

    if let Some(val) = env_str("LICENSE_PORT") {
        settings.license_server.port = Some(val);
    }

    if let Some(val) = env_str("DB_URI") {
        database(settings).uri = val;
    }

    if let Some(val) = env_str("DB_TYPE") {
        match serde_plain::from_str::<DatabaseType>(&val) {
            Ok(db_type) => database(settings).db_type = Some(db_type),
            Err(_) => log::warn!("ignoring {PREFIX}DB_TYPE={val}: expected MySQL or PostgreSQL"),
        }
    }

    if let Some(val) = env_str("DB_USERNAME") {
        database(settings).username = val;
    }

    if let Some(val) = env_str("DB_PASSWORD") {
        database(settings).password = val;
    }
}

/// Summarize which env var overrides are currently active.
///
/// Returns a list of `(env_var_name, value)` pairs; the database password is masked.
pub fn detect_active_overrides() -> Vec<(String, String)> {
    let keys = [
        "RT_PATH",
        "TIMEOUT",
        "LICENSE_HOST",
        "LICENSE_PORT",
        "DB_URI",
        "DB_TYPE",
        "DB_USERNAME",
        "DB_PASSWORD",
    ];

    let mut active = Vec::new();
    for key in keys {
        let full = format!("{PREFIX}{key}");
        if let Ok(val) = std::env::var(&full) {
            if !val.is_empty() {
                let shown = if key == "DB_PASSWORD" { "****".to_string() } else { val };
                active.push((full, shown));
            }
        }
    }
    active
}

// --- helpers ---

fn database(settings: &mut GlobalSettings) -> &mut DatabaseSettings {
    settings.database.get_or_insert_with(DatabaseSettings::default)
}

fn env_str(suffix: &str) -> Option<String> {
    std::env::var(format!("{PREFIX}{suffix}"))
        .ok()
        .filter(|s| !s.is_empty())
}

fn env_parse<T: std::str::FromStr>(suffix: &str) -> Option<T> {
    let val = env_str(suffix)?;
    match val.parse() {
        Ok(parsed) => Some(parsed),
        Err(_) => {
            log::warn!("ignoring {PREFIX}{suffix}={val}: not a valid value");
            None
        }
    }
}
