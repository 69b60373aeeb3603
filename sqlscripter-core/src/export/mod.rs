//! Server-wide export traversal.
//!
//! The exporter walks the server scope (logins, agent jobs) and then every
//! database that is not excluded, running each category in
//! [`SERVER_CATEGORIES`] / [`DATABASE_CATEGORIES`] through the same
//! procedure:
//!
//! 1. enumerate the category; if anything came back, prepare its directory
//! 2. script each exportable object to `<dir>/<sanitized name>.sql`
//! 3. redact login passwords, notify the sink
//! 4. remove the directory again if nothing was written
//!
//! Non-fatal failures abort only the category they happen in and are
//! recorded in the [`ExportSummary`]. Connection loss and cancellation end
//! the run.

mod category;
mod layout;
mod reconcile;
mod sanitize;
mod sink;

pub use category::{CategoryDescriptor, DATABASE_CATEGORIES, SERVER_CATEGORIES, descriptor_for};
pub use layout::OutputLayout;
pub use reconcile::{finalize_directory, prepare_directory};
pub use sanitize::{SCRIPT_EXTENSION, path_component, script_file_name};
pub use sink::{CollectingSink, ExportSink, TracingSink};

use crate::adapters::{ScriptingService, ServerConnector};
use crate::config::{ConnectionDescriptor, ExportConfig};
use crate::models::{DbObject, ExportNotification, ExportSummary, ObjectScope, ObjectType};
use crate::security::redact_login_password;
use crate::{Result, error::ScripterError};
use std::path::Path;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, trace, warn};

/// Connects to the server and exports everything below `config.output_root`.
///
/// # Errors
/// Returns an error if the configuration is invalid, the connection cannot
/// be established, the database list cannot be read, the connection is lost
/// mid-run, or `cancel` fires. Failures confined to one category are
/// reported in the returned summary instead.
pub async fn export_server(
    connector: &dyn ServerConnector,
    descriptor: &ConnectionDescriptor,
    config: &ExportConfig,
    sink: &dyn ExportSink,
    cancel: CancellationToken,
) -> Result<ExportSummary> {
    descriptor.validate()?;
    config.validate()?;

    info!("Connecting to {}", descriptor);
    let service = tokio::select! {
        () = cancel.cancelled() => return Err(ScripterError::Cancelled),
        connected = connector.connect(descriptor) => connected?,
    };
    info!("✓ Connected to {}", service.server_name());

    Exporter::new(service.as_ref(), config, sink, cancel)
        .run()
        .await
}

/// Drives one export over an already connected scripting service.
pub struct Exporter<'a> {
    service: &'a dyn ScriptingService,
    config: &'a ExportConfig,
    sink: &'a dyn ExportSink,
    cancel: CancellationToken,
    layout: OutputLayout,
}

impl<'a> Exporter<'a> {
    /// Creates an exporter writing below `config.output_root`.
    pub fn new(
        service: &'a dyn ScriptingService,
        config: &'a ExportConfig,
        sink: &'a dyn ExportSink,
        cancel: CancellationToken,
    ) -> Self {
        let layout = OutputLayout::new(&config.output_root, service.server_name());
        Self {
            service,
            config,
            sink,
            cancel,
            layout,
        }
    }

    /// Output directories used by this run.
    pub fn layout(&self) -> &OutputLayout {
        &self.layout
    }

    /// Exports the server scope and then every non-excluded database.
    pub async fn run(&self) -> Result<ExportSummary> {
        let mut summary = ExportSummary::new(self.service.server_name());
        info!(
            "Exporting {} to {}",
            self.service.server_name(),
            self.layout.server_root().display()
        );

        self.export_scope(&ObjectScope::Server, SERVER_CATEGORIES, &mut summary)
            .await?;

        self.check_cancelled()?;
        let databases = self.service.list_databases().await?;
        debug!("Server reports {} databases", databases.len());

        for database in databases {
            self.check_cancelled()?;

            if self.config.exclusions.contains(&database) {
                debug!("Skipping excluded database {}", database);
                summary.databases_excluded.push(database);
                continue;
            }

            info!("Exporting database {}", database);
            let scope = ObjectScope::Database(database.clone());
            self.export_scope(&scope, DATABASE_CATEGORIES, &mut summary)
                .await?;
            summary.databases_exported.push(database);
        }

        summary.finish();
        info!(
            "✓ Exported {} objects from {} databases ({} failed objects, {} failed categories)",
            summary.objects_exported,
            summary.databases_exported.len(),
            summary.objects_failed,
            summary.failures.len()
        );

        Ok(summary)
    }

    async fn export_scope(
        &self,
        scope: &ObjectScope,
        categories: &[CategoryDescriptor],
        summary: &mut ExportSummary,
    ) -> Result<()> {
        for category in categories {
            self.check_cancelled()?;
            self.export_category(scope, category, summary).await?;
        }
        Ok(())
    }

    /// Exports one category. Only fatal errors are returned; anything else
    /// is logged and recorded as a category failure.
    async fn export_category(
        &self,
        scope: &ObjectScope,
        category: &CategoryDescriptor,
        summary: &mut ExportSummary,
    ) -> Result<usize> {
        let destination = self.layout.category_dir(scope, category);
        let mut written = 0usize;

        let outcome = self
            .try_export_category(scope, category, &destination, &mut written, summary)
            .await;

        let outcome = match outcome {
            Err(e) if e.is_fatal() => return Err(e),
            Err(e) => {
                if !category.keep_directory
                    && let Err(cleanup) = finalize_directory(&destination, written).await
                {
                    warn!("{}", cleanup);
                }
                Err(e)
            }
            Ok(()) if category.keep_directory => Ok(()),
            Ok(()) => finalize_directory(&destination, written).await,
        };

        if let Err(e) = outcome {
            warn!("{} export in {} aborted: {}", category.object_type, scope, e);
            summary.record_failure(scope, category.object_type, e.to_string());
        } else if written > 0 {
            debug!("{} {} objects exported in {}", written, category.object_type, scope);
        }

        Ok(written)
    }

    async fn try_export_category(
        &self,
        scope: &ObjectScope,
        category: &CategoryDescriptor,
        destination: &Path,
        written: &mut usize,
        summary: &mut ExportSummary,
    ) -> Result<()> {
        let objects = match scope {
            ObjectScope::Database(database) if category.object_type == ObjectType::Database => {
                vec![DbObject::database(database.as_str())]
            }
            _ => {
                self.service
                    .list_objects(scope, category.object_type)
                    .await?
            }
        };

        if objects.is_empty() {
            trace!("No {} objects in {}", category.object_type, scope);
            return Ok(());
        }

        prepare_directory(destination).await?;

        for object in &objects {
            self.check_cancelled()?;

            if !(category.is_exportable)(object) {
                trace!("Skipping {} {}", category.object_type, object.qualified_name());
                continue;
            }

            let target = destination.join(script_file_name(&object.name));
            match self.script_object(category, object, &target).await {
                Ok(()) => {}
                Err(e @ ScripterError::Scripting { .. })
                    if self.config.scripting.continue_on_error =>
                {
                    warn!("Skipping {}: {}", object.qualified_name(), e);
                    discard_partial(&target).await;
                    summary.objects_failed += 1;
                    continue;
                }
                Err(e) => {
                    discard_partial(&target).await;
                    return Err(e);
                }
            }

            // The script is on disk from here on; a failed redaction keeps it.
            *written += 1;
            if category.redact_passwords && redact_login_password(&target)? {
                trace!("Redacted generated password in {}", target.display());
            }

            self.sink.notify(&ExportNotification {
                server: self.service.server_name().to_string(),
                database: scope.database().map(str::to_string),
                object_type: category.object_type,
                object_name: object.name.clone(),
                path: target.clone(),
            });
            summary.record_export(category.object_type);
        }

        Ok(())
    }

    async fn script_object(
        &self,
        category: &CategoryDescriptor,
        object: &DbObject,
        target: &Path,
    ) -> Result<()> {
        debug!(
            "Scripting {} {} to {}",
            category.object_type,
            object.qualified_name(),
            target.display()
        );

        self.service
            .script_object(object, &self.config.scripting, target)
            .await
    }

    fn check_cancelled(&self) -> Result<()> {
        if self.cancel.is_cancelled() {
            Err(ScripterError::Cancelled)
        } else {
            Ok(())
        }
    }
}

/// Removes a script left behind by a failed scripting call.
async fn discard_partial(target: &Path) {
    match tokio::fs::remove_file(target).await {
        Ok(()) => trace!("Removed partial script {}", target.display()),
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => {}
        Err(e) => warn!("Failed to remove partial script {}: {}", target.display(), e),
    }
}
