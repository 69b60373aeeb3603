//! Server connection description.
//!
//! A `ConnectionDescriptor` names the server and, optionally, SQL
//! authentication credentials. Without credentials the connection uses the
//! caller's ambient (integrated) identity.

use crate::security::Credentials;
use crate::{Result, error::ScripterError};
use std::time::Duration;

/// Default TCP port for a default SQL Server instance.
pub const DEFAULT_PORT: u16 = 1433;

/// Connection parameters for one export run.
///
/// # Security
/// `Debug` and `Display` never include the password.
///
/// # Example
/// ```rust
/// use sqlscripter_core::config::ConnectionDescriptor;
///
/// let descriptor = ConnectionDescriptor::new("SQL01\\REPORTING")
///     .with_credentials("exporter".to_string(), Some("secret".to_string()));
///
/// assert!(!descriptor.uses_integrated_auth());
/// assert!(descriptor.validate().is_ok());
/// assert!(!descriptor.to_string().contains("secret"));
/// ```
#[derive(Debug, Clone)]
pub struct ConnectionDescriptor {
    /// Server address as typed by the user (`host`, `host,port`, `host\instance`)
    pub server: String,
    credentials: Option<Credentials>,
    /// TCP connect timeout
    pub connect_timeout: Duration,
    /// Accept the server certificate without validation
    pub trust_server_certificate: bool,
    /// Application name reported to the server
    pub application_name: String,
}

impl ConnectionDescriptor {
    /// Creates a descriptor using integrated authentication.
    pub fn new(server: impl Into<String>) -> Self {
        Self {
            server: server.into(),
            credentials: None,
            connect_timeout: Duration::from_secs(30),
            trust_server_certificate: false,
            application_name: "sqlscripter".to_string(),
        }
    }

    /// Switches to SQL authentication with the given login.
    pub fn with_credentials(mut self, username: String, password: Option<String>) -> Self {
        self.credentials = Some(Credentials::new(username, password));
        self
    }

    /// Sets the TCP connect timeout.
    pub fn with_connect_timeout(mut self, timeout: Duration) -> Self {
        self.connect_timeout = timeout;
        self
    }

    /// Accepts the server certificate without validation.
    pub fn with_trust_server_certificate(mut self, trust: bool) -> Self {
        self.trust_server_certificate = trust;
        self
    }

    /// SQL authentication credentials, if any.
    pub fn credentials(&self) -> Option<&Credentials> {
        self.credentials.as_ref()
    }

    /// True when no username was supplied.
    pub fn uses_integrated_auth(&self) -> bool {
        self.credentials.is_none()
    }

    /// Parsed form of [`Self::server`].
    pub fn address(&self) -> Result<ServerAddress> {
        ServerAddress::parse(&self.server)
    }

    /// Builds a descriptor from an `mssql://` or `sqlserver://` URL.
    ///
    /// Format: `mssql://[user[:password]@]host[:port][?instance=NAME]`.
    /// A URL without a username selects integrated authentication.
    ///
    /// # Errors
    /// Returns a configuration error for malformed URLs or other schemes.
    pub fn from_url(connection_url: &str) -> Result<Self> {
        let url = url::Url::parse(connection_url).map_err(|e| {
            ScripterError::configuration(format!("Invalid connection URL format: {}", e))
        })?;

        match url.scheme() {
            "mssql" | "sqlserver" => {}
            other => {
                return Err(ScripterError::configuration(format!(
                    "Unsupported connection URL scheme '{}'",
                    other
                )));
            }
        }

        let host = url
            .host_str()
            .filter(|host| !host.is_empty())
            .ok_or_else(|| ScripterError::configuration("Missing host in connection URL"))?;

        let instance = url
            .query_pairs()
            .find(|(key, _)| key == "instance")
            .map(|(_, value)| value.into_owned());

        let server = match (url.port(), instance) {
            (Some(port), _) => format!("{},{}", host, port),
            (None, Some(instance)) => format!("{}\\{}", host, instance),
            (None, None) => host.to_string(),
        };

        let mut descriptor = Self::new(server);
        if !url.username().is_empty() {
            descriptor = descriptor.with_credentials(
                url.username().to_string(),
                url.password().map(str::to_string),
            );
        }

        Ok(descriptor)
    }

    /// Validates connection parameters.
    ///
    /// # Errors
    /// Returns error if the server address or timeout is unusable.
    pub fn validate(&self) -> Result<()> {
        self.address()?;

        if let Some(credentials) = &self.credentials
            && credentials.username().is_empty()
        {
            return Err(ScripterError::configuration("username cannot be empty"));
        }

        if self.connect_timeout.is_zero() {
            return Err(ScripterError::configuration(
                "connect_timeout must be greater than 0",
            ));
        }

        Ok(())
    }
}

impl std::fmt::Display for ConnectionDescriptor {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match &self.credentials {
            Some(credentials) => write!(f, "{} (SQL login {})", self.server, credentials.username()),
            None => write!(f, "{} (integrated security)", self.server),
        }
    }
}

/// Network location parsed from a server string.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ServerAddress {
    /// Host name or IP address
    pub host: String,
    /// Explicit TCP port (`host,port`)
    pub port: Option<u16>,
    /// Named instance (`host\instance`), resolved through SQL Browser
    pub instance: Option<String>,
}

impl ServerAddress {
    /// Parses `host`, `host,port`, `host\instance` and `tcp:` prefixed forms.
    /// `.` and `(local)` mean the local machine. An explicit port takes
    /// precedence over an instance name.
    ///
    /// # Errors
    /// Returns a configuration error for an empty host or invalid port.
    pub fn parse(server: &str) -> Result<Self> {
        let trimmed = server.trim();
        let trimmed = trimmed
            .get(..4)
            .filter(|prefix| prefix.eq_ignore_ascii_case("tcp:"))
            .map_or(trimmed, |_| &trimmed[4..]);

        let (location, port) = match trimmed.split_once(',') {
            Some((location, port)) => {
                let port = port.trim().parse::<u16>().map_err(|_| {
                    ScripterError::configuration(format!("Invalid port in server '{}'", server))
                })?;
                if port == 0 {
                    return Err(ScripterError::configuration(
                        "port must be greater than 0",
                    ));
                }
                (location, Some(port))
            }
            None => (trimmed, None),
        };

        let (host, instance) = match location.split_once('\\') {
            Some((host, instance)) if !instance.is_empty() => (host, Some(instance.to_string())),
            Some((host, _)) => (host, None),
            None => (location, None),
        };

        let host = match host.trim() {
            "" => {
                return Err(ScripterError::configuration("server cannot be empty"));
            }
            "." | "(local)" => "localhost",
            other => other,
        };

        Ok(Self {
            host: host.to_string(),
            instance: if port.is_some() { None } else { instance },
            port,
        })
    }
}
