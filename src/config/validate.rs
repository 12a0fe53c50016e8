//! Configuration probes for the settings form.
//!
//! Probes never fail a run; they return a [`Validation`] message for display.
//! Endpoint checks are plain TCP connects, no protocol is spoken.

use std::net::{SocketAddr, TcpStream, ToSocketAddrs};
use std::time::Duration;

use super::{DEFAULT_RUNNER_COMMAND, DatabaseSettings, DatabaseType};

/// Port the license server listens on when none is configured.
pub const DEFAULT_LICENSE_PORT: u16 = 27000;

/// Connect timeout for endpoint probes.
pub const PROBE_TIMEOUT: Duration = Duration::from_millis(1000);

/// Outcome of a configuration probe.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Validation {
    Ok(String),
    Error(String),
}

impl Validation {
    fn ok(msg: impl Into<String>) -> Self {
        Validation::Ok(msg.into())
    }

    fn error(msg: impl Into<String>) -> Self {
        Validation::Error(msg.into())
    }

    /// Whether the probe succeeded.
    pub fn is_ok(&self) -> bool {
        matches!(self, Validation::Ok(_))
    }

    /// The probe message.
    pub fn message(&self) -> &str {
        match self {
            Validation::Ok(msg) | Validation::Error(msg) => msg,
        }
    }
}

impl std::fmt::Display for Validation {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Validation::Ok(msg) => write!(f, "OK: {msg}"),
            Validation::Error(msg) => write!(f, "ERROR: {msg}"),
        }
    }
}

/// Check that a configured runtime path points at the `itestrt` executable.
///
/// An empty path is accepted; the runtime is then looked up on PATH.
pub fn check_runner_path(path: &str) -> Validation {
    if !path.is_empty() && !path.contains(DEFAULT_RUNNER_COMMAND) {
        return Validation::error("RT path does not end at executable");
    }
    Validation::ok("Success")
}

/// Probe the license server with a TCP connect.
pub fn check_license_server(host: &str, port: &str) -> Validation {
    let host = host.trim();
    if host.is_empty() {
        return Validation::error("Must specify license server");
    }

    let port = port.trim();
    let port = if port.is_empty() {
        DEFAULT_LICENSE_PORT
    } else {
        match port.parse::<u16>() {
            Ok(port) => port,
            Err(e) => {
                log::debug!("invalid license server port {port:?}: {e}");
                return Validation::error("Client error");
            }
        }
    };

    if probe(host, port) {
        Validation::ok("Connected to license server")
    } else {
        Validation::error("Cannot reach license server")
    }
}

/// Check a database profile.
///
/// Without a URI every individual field is required. Username and password are
/// required in both modes. The endpoint is then probed with a TCP connect.
pub fn check_database(db: &DatabaseSettings) -> Validation {
    if db.uri.is_empty() {
        let missing = db.name.is_empty()
            || db.db_type.is_none()
            || db.host.is_empty()
            || db.port.is_empty()
            || db.username.is_empty()
            || db.password.is_empty();
        if missing {
            return Validation::error("Missing required field");
        }
    }

    if db.username.is_empty() || db.password.is_empty() {
        return Validation::error("Please specify username and password");
    }

    let Some((host, port)) = database_endpoint(db) else {
        return Validation::error("Cannot parse database URI");
    };

    log::debug!("probing database {}", connection_url(db));
    if probe(&host, port) {
        Validation::ok("Success")
    } else {
        Validation::error(format!("Cannot reach database server at {host}:{port}"))
    }
}

/// JDBC-style connection URL for a database profile.
///
/// The configured URI wins; otherwise `jdbc:<type>://<host>:<port>/<name>`.
pub fn connection_url(db: &DatabaseSettings) -> String {
    if !db.uri.is_empty() {
        return db.uri.clone();
    }
    let scheme = db.db_type.map(DatabaseType::scheme).unwrap_or_default();
    format!("jdbc:{}://{}:{}/{}", scheme, db.host, db.port, db.name)
}

/// Host and port to probe for a database profile.
fn database_endpoint(db: &DatabaseSettings) -> Option<(String, u16)> {
    if db.uri.is_empty() {
        let port = db.port.trim().parse().ok()?;
        return Some((db.host.trim().to_string(), port));
    }

    let db_type = db.db_type.unwrap_or_else(|| DatabaseType::from_uri(&db.uri));
    let (_, rest) = db.uri.split_once("://")?;
    let authority = rest.split(['/', '?']).next()?;
    let authority = authority.rsplit('@').next()?;
    let (host, port) = match authority.rsplit_once(':') {
        Some((host, port)) => (host, port.parse().ok()?),
        None => (authority, default_database_port(db_type)),
    };
    if host.is_empty() {
        return None;
    }
    Some((host.to_string(), port))
}

fn default_database_port(db_type: DatabaseType) -> u16 {
    match db_type {
        DatabaseType::MySql => 3306,
        DatabaseType::PostgreSql => 5432,
    }
}

fn probe(host: &str, port: u16) -> bool {
    let addrs: Vec<SocketAddr> = match (host, port).to_socket_addrs() {
        Ok(addrs) => addrs.collect(),
        Err(e) => {
            log::debug!("cannot resolve {host}: {e}");
            return false;
        }
    };
    addrs
        .iter()
        .any(|addr| TcpStream::connect_timeout(addr, PROBE_TIMEOUT).is_ok())
}
