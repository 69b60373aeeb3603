//! Core library for sqlscripter.
//!
//! sqlscripter writes the definition of every scriptable object on a SQL
//! Server instance into a directory tree, one `.sql` file per object, so the
//! tree can be committed to version control and diffed between runs.
//!
//! # Security Guarantees
//! - Passwords are never logged and are zeroed on drop
//! - Generated login passwords are replaced with a fixed placeholder
//! - All server operations are read-only
//!
//! # Architecture
//! - `adapters`: the [`ScriptingService`] seam and the SQL Server backend
//! - `export`: traversal, output layout and directory reconciliation
//! - `config`: connection, exclusion and scripting settings
//!
//! # Example
//! ```rust,no_run
//! use sqlscripter_core::{
//!     ConnectionDescriptor, ExportConfig, TracingSink, default_connector, export_server,
//! };
//! use tokio_util::sync::CancellationToken;
//!
//! # async fn run() -> sqlscripter_core::Result<()> {
//! let descriptor = ConnectionDescriptor::new("SQL01");
//! let config = ExportConfig::new("./scripts");
//! let connector = default_connector()?;
//!
//! let summary = export_server(
//!     connector.as_ref(),
//!     &descriptor,
//!     &config,
//!     &TracingSink,
//!     CancellationToken::new(),
//! )
//! .await?;
//! println!("{} objects exported", summary.objects_exported);
//! # Ok(())
//! # }
//! ```

pub mod adapters;
pub mod config;
pub mod error;
pub mod export;
pub mod logging;
pub mod models;
pub mod security;

// Re-export commonly used types
pub use adapters::{ScriptingService, ServerConnector, default_connector};
pub use config::{
    ConnectionDescriptor, DatabaseExclusions, ExportConfig, SYSTEM_DATABASES, ScriptEncoding,
    ScriptingOptions, ServerAddress,
};
pub use error::{Result, ScripterError};
pub use export::{CollectingSink, ExportSink, Exporter, TracingSink, export_server};
pub use models::{
    CategoryFailure, DbObject, ExportNotification, ExportSummary, ObjectFlags, ObjectScope,
    ObjectType,
};
