//! Scripting backends.
//!
//! The export core talks to a server only through [`ScriptingService`],
//! obtained from a [`ServerConnector`]. The trait is object-safe so the
//! exporter can hold `Box<dyn ScriptingService>` and tests can substitute an
//! in-memory double.
//!
//! # Module Structure
//! - `script`: Script text assembly and file writing shared by backends
//! - `mssql`: SQL Server backend over tiberius (feature `mssql`)

use crate::config::{ConnectionDescriptor, ScriptingOptions};
use crate::models::{DbObject, ObjectScope, ObjectType};
use crate::Result;
use async_trait::async_trait;
use std::path::Path;

pub mod script;

#[cfg(feature = "mssql")]
pub mod mssql;

pub use script::{ScriptBuilder, quote_literal, quote_name, write_script};

/// A connected server able to enumerate and script its objects.
///
/// # Errors
/// Implementations report a lost connection with
/// [`ScripterError::Connection`](crate::error::ScripterError::Connection) so
/// the exporter stops the run, and a failure confined to one object with
/// [`ScripterError::Scripting`](crate::error::ScripterError::Scripting) so it
/// can be skipped.
#[async_trait]
pub trait ScriptingService: Send + Sync {
    /// Server name used for notifications and the output root directory.
    fn server_name(&self) -> &str;

    /// Product version string reported by the server.
    async fn server_version(&self) -> Result<String>;

    /// Every database on the server, in enumeration order.
    async fn list_databases(&self) -> Result<Vec<String>>;

    /// Objects of one category in a scope, with the flags consulted by
    /// exportability predicates.
    async fn list_objects(
        &self,
        scope: &ObjectScope,
        object_type: ObjectType,
    ) -> Result<Vec<DbObject>>;

    /// Renders one object's definition into `target`, replacing any
    /// existing file.
    async fn script_object(
        &self,
        object: &DbObject,
        options: &ScriptingOptions,
        target: &Path,
    ) -> Result<()>;
}

/// Opens scripting sessions.
#[async_trait]
pub trait ServerConnector: Send + Sync {
    /// Connects using the descriptor's authentication mode.
    ///
    /// # Errors
    /// Returns a connection error if the server cannot be reached or
    /// rejects the login.
    async fn connect(&self, descriptor: &ConnectionDescriptor)
    -> Result<Box<dyn ScriptingService>>;
}

/// The connector compiled into this build.
///
/// # Errors
/// Returns a configuration error when no backend feature is enabled.
pub fn default_connector() -> Result<Box<dyn ServerConnector>> {
    #[cfg(feature = "mssql")]
    {
        Ok(Box::new(mssql::SqlServerConnector))
    }
    #[cfg(not(feature = "mssql"))]
    {
        Err(crate::error::ScripterError::configuration(
            "SQL Server backend not available; compile with --features mssql",
        ))
    }
}
