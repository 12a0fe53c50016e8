use std::path::PathBuf;

/// Result type alias for itest-runner operations.
pub type Result<T> = std::result::Result<T, Error>;

/// Main error type for itest-runner.
#[derive(Debug, thiserror::Error)]
pub enum Error {
    /// Configuration-related errors.
    #[error("Configuration error: {0}")]
    Config(String),

    /// Process launch or wait failures.
    #[error("Runner error: {0}")]
    Runner(String),

    /// The run was cancelled before the tool finished.
    #[error("Execution interrupted: {0}")]
    Interrupted(String),

    /// Report directory or publishing failures.
    #[error("Report error: {0}")]
    Report(String),

    /// Build log could not be opened or written.
    #[error("Build log error: {0}")]
    Log(String),

    /// File not found.
    #[error("File not found: {}", .0.display())]
    FileNotFound(PathBuf),

    /// Missing required configuration field.
    #[error("Missing required configuration field: {0}")]
    MissingConfig(String),

    /// Invalid configuration value.
    #[error("Invalid configuration value for {field}: {value}")]
    InvalidConfig { field: String, value: String },

    /// IO error.
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// TOML deserialization error.
    #[error("TOML parsing error: {0}")]
    TomlDe(#[from] toml::de::Error),

    /// TOML serialization error.
    #[error("TOML serialization error: {0}")]
    TomlSer(#[from] toml::ser::Error),

    /// JSON error.
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    /// Invalid status pattern.
    #[error("Pattern error: {0}")]
    Pattern(#[from] regex::Error),
}

impl Error {
    /// Create a configuration error.
    pub fn config(msg: impl Into<String>) -> Self {
        Error::Config(msg.into())
    }

    /// Create a runner error.
    pub fn runner(msg: impl Into<String>) -> Self {
        Error::Runner(msg.into())
    }

    /// Create an interruption error.
    pub fn interrupted(msg: impl Into<String>) -> Self {
        Error::Interrupted(msg.into())
    }

    /// Create a report error.
    pub fn report(msg: impl Into<String>) -> Self {
        Error::Report(msg.into())
    }

    /// Create a build log error.
    pub fn log(msg: impl Into<String>) -> Self {
        Error::Log(msg.into())
    }

    /// Create an invalid configuration error.
    pub fn invalid(field: impl Into<String>, value: impl Into<String>) -> Self {
        Error::InvalidConfig {
            field: field.into(),
            value: value.into(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_display_messages() {
        assert_eq!(
            Error::config("bad value").to_string(),
            "Configuration error: bad value"
        );
        assert_eq!(
            Error::runner("sh not found").to_string(),
            "Runner error: sh not found"
        );
        assert_eq!(
            Error::interrupted("build aborted").to_string(),
            "Execution interrupted: build aborted"
        );
        assert_eq!(
            Error::report("no such directory").to_string(),
            "Report error: no such directory"
        );
        assert_eq!(
            Error::log("permission denied").to_string(),
            "Build log error: permission denied"
        );
    }

    #[test]
    fn test_error_file_not_found() {
        let err = Error::FileNotFound(PathBuf::from("/missing/job.toml"));
        assert_eq!(err.to_string(), "File not found: /missing/job.toml");
    }

    #[test]
    fn test_error_missing_config() {
        let err = Error::MissingConfig("license_server.host".to_string());
        assert_eq!(
            err.to_string(),
            "Missing required configuration field: license_server.host"
        );
    }

    #[test]
    fn test_error_invalid_config() {
        let err = Error::invalid("database.type", "oracle");
        assert_eq!(
            err.to_string(),
            "Invalid configuration value for database.type: oracle"
        );
    }

    #[test]
    fn test_error_from_io() {
        let io = std::io::Error::new(std::io::ErrorKind::NotFound, "gone");
        let err: Error = io.into();
        assert!(matches!(err, Error::Io(_)));
        assert_eq!(err.to_string(), "IO error: gone");
    }
}
