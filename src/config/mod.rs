//! Global settings and per-run job requests, loaded from TOML.

use serde::{Deserialize, Deserializer, Serialize};
use std::path::Path;

use crate::core::error::{Error, Result};

pub mod env;
mod loader;
pub mod validate;
pub use loader::{DEFAULT_SETTINGS_FILE, SettingsLoader};

/// Command used when no runtime executable path is configured.
pub const DEFAULT_RUNNER_COMMAND: &str = "itestrt";

/// Process-wide settings shared by every run.
///
/// Loaded once at startup and never mutated by a run.
#[derive(Debug, Clone, Serialize, Deserialize, Default, PartialEq)]
pub struct GlobalSettings {
    /// iTest runtime settings.
    #[serde(default)]
    pub runner: RunnerSettings,

    /// License server endpoint.
    #[serde(default, rename = "license-server")]
    pub license_server: LicenseServerSettings,

    /// Optional results database profile used for report uploads.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub database: Option<DatabaseSettings>,
}

impl GlobalSettings {
    /// Parse settings from a TOML string.
    pub fn from_toml_str(content: &str) -> Result<Self> {
        Ok(toml::from_str(content)?)
    }

    /// Parse settings from a TOML file.
    pub fn from_toml_file(path: &Path) -> Result<Self> {
        let content = std::fs::read_to_string(path)
            .map_err(|e| Error::config(format!("failed to read {}: {}", path.display(), e)))?;
        Self::from_toml_str(&content)
    }

    /// Database username, if a database profile with a username is configured.
    pub fn database_username(&self) -> Option<&str> {
        self.database
            .as_ref()
            .map(|db| db.username.as_str())
            .filter(|u| !u.is_empty())
    }
}

/// iTest runtime (`itestrt`) settings.
#[derive(Debug, Clone, Serialize, Deserialize, Default, PartialEq)]
pub struct RunnerSettings {
    /// Path to the `itestrt` executable. Empty means "use `itestrt` from PATH".
    #[serde(default)]
    pub path: String,

    /// Kill the runtime after this many seconds.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub timeout: Option<u64>,
}

impl RunnerSettings {
    /// The executable token placed at the start of the command line.
    ///
    /// Paths containing whitespace are wrapped in double quotes.
    pub fn executable(&self) -> String {
        let path = self.path.trim();
        if path.is_empty() {
            DEFAULT_RUNNER_COMMAND.to_string()
        } else if path.chars().any(char::is_whitespace) {
            format!("\"{path}\"")
        } else {
            path.to_string()
        }
    }
}

/// License server endpoint.
#[derive(Debug, Clone, Serialize, Deserialize, Default, PartialEq)]
pub struct LicenseServerSettings {
    /// Host name or IP address.
    #[serde(default)]
    pub host: String,

    /// Port, kept as text so an empty value means "tool default".
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub port: Option<String>,
}

impl LicenseServerSettings {
    /// `host` or `host:port`, or `None` when no host is set.
    pub fn address(&self) -> Option<String> {
        let host = self.host.trim();
        if host.is_empty() {
            return None;
        }
        match self.port.as_deref().map(str::trim) {
            Some(port) if !port.is_empty() => Some(format!("{host}:{port}")),
            _ => Some(host.to_string()),
        }
    }
}

/// Results database profile.
///
/// Either `uri` is set, or the individual `host`/`port`/`name`/`type` fields are.
#[derive(Debug, Clone, Serialize, Deserialize, Default, PartialEq)]
#[serde(rename_all = "kebab-case")]
pub struct DatabaseSettings {
    /// Full connection URI. Takes precedence over the individual fields.
    #[serde(default)]
    pub uri: String,

    #[serde(default)]
    pub host: String,

    #[serde(default)]
    pub port: String,

    /// Catalog (database) name.
    #[serde(default)]
    pub name: String,

    #[serde(default, rename = "type", skip_serializing_if = "Option::is_none")]
    pub db_type: Option<DatabaseType>,

    #[serde(default)]
    pub username: String,

    #[serde(default)]
    pub password: String,
}

/// Supported results database engines.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum DatabaseType {
    #[serde(rename = "MySQL", alias = "mysql")]
    MySql,
    #[serde(rename = "PostgreSQL", alias = "postgresql")]
    PostgreSql,
}

serde_plain::derive_display_from_serialize!(DatabaseType);
serde_plain::derive_fromstr_from_deserialize!(DatabaseType);

impl DatabaseType {
    /// Infer the engine from a connection URI; anything not mentioning MySQL is PostgreSQL.
    pub fn from_uri(uri: &str) -> Self {
        if uri.to_lowercase().contains("mysql") {
            DatabaseType::MySql
        } else {
            DatabaseType::PostgreSql
        }
    }

    /// Lower-case scheme name used in connection URLs.
    pub fn scheme(self) -> &'static str {
        match self {
            DatabaseType::MySql => "mysql",
            DatabaseType::PostgreSql => "postgresql",
        }
    }
}

/// One build's test run request.
#[derive(Debug, Clone, Serialize, Deserialize, Default, PartialEq)]
#[serde(rename_all = "kebab-case")]
pub struct RunRequest {
    /// Workspace location handed to `--itar`; may use the `${WORKSPACE}` placeholder.
    #[serde(default)]
    pub workspace: String,

    /// Test case paths, in execution order.
    #[serde(default, rename = "testcases", deserialize_with = "list_or_csv")]
    pub test_cases: Vec<String>,

    #[serde(default)]
    pub testbed: String,

    /// `name=value` parameters, each passed as its own `--param`.
    #[serde(default, rename = "params", deserialize_with = "list_or_csv")]
    pub parameters: Vec<String>,

    #[serde(default)]
    pub param_file: String,

    /// Generate HTML reports (and upload to the database, if configured).
    #[serde(default)]
    pub report: bool,

    /// Custom tag attached to database uploads.
    #[serde(default, rename = "tag")]
    pub database_tag: String,
}

impl RunRequest {
    /// Build a request from the free-form field values of a job form.
    ///
    /// `test_cases` and `parameters` are comma separated; every value is trimmed.
    pub fn from_form(
        workspace: &str,
        test_cases: &str,
        testbed: &str,
        parameters: &str,
        param_file: &str,
        report: bool,
        database_tag: &str,
    ) -> Self {
        Self {
            workspace: workspace.trim().to_string(),
            test_cases: split_csv(test_cases),
            testbed: testbed.trim().to_string(),
            parameters: split_csv(parameters),
            param_file: param_file.trim().to_string(),
            report,
            database_tag: database_tag.trim().to_string(),
        }
    }

    /// Parse a job description from a TOML string.
    pub fn from_toml_str(content: &str) -> Result<Self> {
        Ok(toml::from_str(content)?)
    }

    /// Parse a job description from a TOML file.
    pub fn from_toml_file(path: &Path) -> Result<Self> {
        if !path.exists() {
            return Err(Error::FileNotFound(path.to_path_buf()));
        }
        Self::from_toml_str(&std::fs::read_to_string(path)?)
    }
}

/// Split a comma separated list, trimming entries and dropping blanks.
pub fn split_csv(value: &str) -> Vec<String> {
    value
        .split(',')
        .map(str::trim)
        .filter(|s| !s.is_empty())
        .map(String::from)
        .collect()
}

fn list_or_csv<'de, D>(deserializer: D) -> std::result::Result<Vec<String>, D::Error>
where
    D: Deserializer<'de>,
{
    #[derive(Deserialize)]
    #[serde(untagged)]
    enum ListOrCsv {
        List(Vec<String>),
        Csv(String),
    }

    Ok(match ListOrCsv::deserialize(deserializer)? {
        ListOrCsv::List(items) => items,
        ListOrCsv::Csv(csv) => split_csv(&csv),
    })
}
