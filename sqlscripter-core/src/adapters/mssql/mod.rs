//! SQL Server scripting backend.
//!
//! One tiberius client per run, guarded by an async mutex; the exporter is
//! sequential so the lock is never contended. Enumeration reads the catalog
//! views directly and object definitions are rebuilt from catalog metadata
//! (`render`), so nothing beyond `VIEW DEFINITION` on the scripted databases
//! and read access to `msdb` is required.
//!
//! # Module Structure
//! - `catalog`: Enumeration queries per object category
//! - `render`: Definition queries and script generation per object category

mod catalog;
mod render;

use super::{ScriptingService, ServerConnector, write_script};
use crate::config::{ConnectionDescriptor, DEFAULT_PORT, ScriptingOptions};
use crate::models::{DbObject, ObjectScope, ObjectType};
use crate::{Result, error::ScripterError};
use async_trait::async_trait;
use std::path::Path;
use tiberius::{AuthMethod, Client, Config, FromSql, Query, Row, SqlBrowser};
use tokio::net::TcpStream;
use tokio::sync::Mutex;
use tokio_util::compat::{Compat, TokioAsyncWriteCompatExt};
use tracing::{debug, info};

type TdsClient = Client<Compat<TcpStream>>;

/// Connects to SQL Server with tiberius.
#[derive(Debug, Default, Clone, Copy)]
pub struct SqlServerConnector;

#[async_trait]
impl ServerConnector for SqlServerConnector {
    async fn connect(
        &self,
        descriptor: &ConnectionDescriptor,
    ) -> Result<Box<dyn ScriptingService>> {
        let scripter = SqlServerScripter::connect(descriptor).await?;
        Ok(Box::new(scripter))
    }
}

/// Builds the tiberius configuration for a descriptor.
///
/// # Security
/// The password is handed to tiberius only; it is never logged.
fn build_config(descriptor: &ConnectionDescriptor) -> Result<Config> {
    let address = descriptor.address()?;

    let mut config = Config::new();
    config.host(&address.host);
    match (address.port, address.instance.as_deref()) {
        (Some(port), _) => config.port(port),
        (None, Some(instance)) => config.instance_name(instance),
        (None, None) => config.port(DEFAULT_PORT),
    }
    config.application_name(&descriptor.application_name);

    match descriptor.credentials() {
        Some(credentials) => config.authentication(AuthMethod::sql_server(
            credentials.username(),
            credentials.password(),
        )),
        None => config.authentication(integrated_auth()?),
    }

    if descriptor.trust_server_certificate {
        config.trust_cert();
    }

    Ok(config)
}

#[cfg(any(windows, all(unix, feature = "integrated-auth")))]
fn integrated_auth() -> Result<AuthMethod> {
    Ok(AuthMethod::Integrated)
}

#[cfg(not(any(windows, all(unix, feature = "integrated-auth"))))]
fn integrated_auth() -> Result<AuthMethod> {
    Err(ScripterError::configuration(
        "Integrated authentication requires Windows or the `integrated-auth` feature; \
         supply a username for SQL authentication",
    ))
}

/// Classifies driver errors: transport failures end the run, anything the
/// server reports is a metadata failure.
fn map_error(context: &str, error: tiberius::error::Error) -> ScripterError {
    match error {
        tiberius::error::Error::Io { .. }
        | tiberius::error::Error::Tls(_)
        | tiberius::error::Error::Routing { .. } => ScripterError::connection_failed(context, error),
        other => ScripterError::metadata_failed(context, other),
    }
}

async fn open_client(descriptor: &ConnectionDescriptor) -> Result<TdsClient> {
    let mut config = build_config(descriptor)?;
    let context = format!("Failed to connect to {}", descriptor.server);

    // Azure SQL may redirect the login to another gateway once.
    for _ in 0..2 {
        let tcp = tokio::time::timeout(descriptor.connect_timeout, TcpStream::connect_named(&config))
            .await
            .map_err(|elapsed| {
                ScripterError::connection_failed(
                    format!("Timed out connecting to {}", descriptor.server),
                    std::io::Error::new(std::io::ErrorKind::TimedOut, elapsed),
                )
            })?
            .map_err(|e| map_error(&context, e))?;

        tcp.set_nodelay(true)
            .map_err(|e| ScripterError::connection_failed(context.as_str(), e))?;

        match Client::connect(config.clone(), tcp.compat_write()).await {
            Ok(client) => return Ok(client),
            Err(tiberius::error::Error::Routing { host, port }) => {
                debug!("Login redirected to {}:{}", host, port);
                config.host(&host);
                config.port(port);
            }
            Err(e) => return Err(ScripterError::connection_failed(context.as_str(), e)),
        }
    }

    Err(ScripterError::configuration(format!(
        "{}: too many login redirections",
        context
    )))
}

/// Extension trait for reading catalog columns with error context.
pub(crate) trait RowExt {
    /// Reads a nullable column by name.
    fn get_field<'a, T>(&'a self, field_name: &str) -> Result<Option<T>>
    where
        T: FromSql<'a>;

    fn text(&self, field_name: &str) -> Result<String> {
        Ok(self
            .get_field::<&str>(field_name)?
            .map(str::to_string)
            .unwrap_or_default())
    }

    fn optional_text(&self, field_name: &str) -> Result<Option<String>> {
        Ok(self.get_field::<&str>(field_name)?.map(str::to_string))
    }

    fn int(&self, field_name: &str) -> Result<i32> {
        Ok(self.get_field::<i32>(field_name)?.unwrap_or_default())
    }

    fn flag(&self, field_name: &str) -> Result<bool> {
        Ok(self.get_field::<bool>(field_name)?.unwrap_or_default())
    }
}

impl RowExt for Row {
    fn get_field<'a, T>(&'a self, field_name: &str) -> Result<Option<T>>
    where
        T: FromSql<'a>,
    {
        self.try_get(field_name)
            .map_err(|e| ScripterError::parse_field(field_name, e))
    }
}

/// Scripting session over one SQL Server connection.
pub struct SqlServerScripter {
    server: String,
    client: Mutex<TdsClient>,
}

impl SqlServerScripter {
    /// Connects and verifies the session with a version query.
    ///
    /// # Errors
    /// Returns a connection error if the server is unreachable or rejects
    /// the login, or a configuration error for an unusable descriptor.
    pub async fn connect(descriptor: &ConnectionDescriptor) -> Result<Self> {
        let client = open_client(descriptor).await?;
        let scripter = Self {
            server: descriptor.server.trim().to_string(),
            client: Mutex::new(client),
        };

        let version = scripter.server_version().await?;
        info!(
            "Connected to SQL Server: {}",
            version.lines().next().unwrap_or_default()
        );

        Ok(scripter)
    }

    /// Runs a query and collects its first result set.
    pub(crate) async fn fetch(&self, query: Query<'_>, context: &str) -> Result<Vec<Row>> {
        let mut client = self.client.lock().await;
        let stream = query
            .query(&mut *client)
            .await
            .map_err(|e| map_error(context, e))?;
        stream
            .into_first_result()
            .await
            .map_err(|e| map_error(context, e))
    }

    /// Runs a query expected to return at most one row.
    pub(crate) async fn fetch_one(&self, query: Query<'_>, context: &str) -> Result<Option<Row>> {
        Ok(self.fetch(query, context).await?.into_iter().next())
    }
}

#[async_trait]
impl ScriptingService for SqlServerScripter {
    fn server_name(&self) -> &str {
        &self.server
    }

    async fn server_version(&self) -> Result<String> {
        let row = self
            .fetch_one(Query::new("SELECT @@VERSION AS version"), "server version")
            .await?;
        match row {
            Some(row) => row.text("version"),
            None => Ok(String::new()),
        }
    }

    async fn list_databases(&self) -> Result<Vec<String>> {
        let rows = self
            .fetch(
                Query::new("SELECT name FROM sys.databases ORDER BY name"),
                "list databases",
            )
            .await?;
        rows.iter().map(|row| row.text("name")).collect()
    }

    async fn list_objects(
        &self,
        scope: &ObjectScope,
        object_type: ObjectType,
    ) -> Result<Vec<DbObject>> {
        let sql = catalog::enumeration_sql(scope, object_type)?;
        let context = format!("list {} objects in {}", object_type, scope);
        let rows = self.fetch(Query::new(sql), &context).await?;
        rows.iter()
            .map(|row| catalog::object_from_row(row, object_type, scope))
            .collect()
    }

    async fn script_object(
        &self,
        object: &DbObject,
        options: &ScriptingOptions,
        target: &Path,
    ) -> Result<()> {
        let script = render::render(self, object, options)
            .await
            .map_err(|e| match e {
                e if e.is_fatal() => e,
                e @ ScripterError::Scripting { .. } => e,
                other => ScripterError::scripting(object.qualified_name(), other.to_string()),
            })?;

        write_script(target, &script, options.encoding).await
    }
}
