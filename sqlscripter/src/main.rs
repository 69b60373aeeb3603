//! SQL Server object-definition exporter.
//!
//! Connects to one server and writes every login, agent job, database and
//! database object definition to its own `.sql` file, reconciling the tree
//! left by earlier runs.
//!
//! # Security Guarantees
//! - Read-only server operations only
//! - No credentials stored or logged
//! - Generated login passwords never reach the output tree

use anyhow::{Context, bail};
use clap::Parser;
use sqlscripter::{
    Cli, Command, ConnectionArgs, ConsoleSink, ExportArgs, build_export_config,
    format_summary, resolve_descriptor,
};
use sqlscripter_core::error::redact_database_url;
use sqlscripter_core::logging::init_logging;
use sqlscripter_core::{ConnectionDescriptor, ScripterError, default_connector, export_server};
use tokio_util::sync::CancellationToken;
use tracing::{error, info, warn};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    init_logging(cli.global.verbose, cli.global.quiet, cli.global.log_format.into())?;

    match cli.into_command() {
        Command::Export(args) => export(&args).await,
        Command::Test(args) => test_connection(&args).await,
    }
}

fn descriptor_for(args: &ConnectionArgs) -> anyhow::Result<ConnectionDescriptor> {
    if let Some(url) = &args.url {
        info!("Target: {}", redact_database_url(url));
    }
    let descriptor = resolve_descriptor(args, |prompt| rpassword::prompt_password(prompt))?;
    descriptor.validate()?;
    Ok(descriptor)
}

/// Cancels `token` on the first Ctrl-C.
fn cancel_on_interrupt(token: CancellationToken) {
    tokio::spawn(async move {
        match tokio::signal::ctrl_c().await {
            Ok(()) => {
                warn!("Interrupt received, stopping after the current object");
                token.cancel();
            }
            Err(e) => warn!("Failed to listen for Ctrl-C: {}", e),
        }
    });
}

/// Exports the whole server and prints the summary.
async fn export(args: &ExportArgs) -> anyhow::Result<()> {
    let descriptor = descriptor_for(&args.connection)?;
    let config = build_export_config(args);
    let connector = default_connector()?;

    let cancel = CancellationToken::new();
    cancel_on_interrupt(cancel.clone());

    info!("Output: {}", config.output_root.display());
    let sink = ConsoleSink { json: args.json };
    let summary = match export_server(connector.as_ref(), &descriptor, &config, &sink, cancel).await
    {
        Ok(summary) => summary,
        Err(ScripterError::Cancelled) => bail!("Export cancelled; the output tree may be incomplete"),
        Err(e) => {
            error!("Export failed: {}", e);
            return Err(e).context(format!("Export of {} failed", descriptor.server));
        }
    };

    if args.json {
        println!(
            "{}",
            serde_json::to_string(&summary).context("Failed to serialize summary")?
        );
    } else {
        println!("{}", format_summary(&summary));
    }

    if !summary.failures.is_empty() {
        bail!(
            "{} categories could not be exported",
            summary.failures.len()
        );
    }

    Ok(())
}

/// Connects and reports the server version without exporting.
async fn test_connection(args: &ConnectionArgs) -> anyhow::Result<()> {
    let descriptor = descriptor_for(args)?;
    info!("Testing connection to {}", descriptor);

    let connector = default_connector()?;
    let service = connector.connect(&descriptor).await.map_err(|e| {
        error!("Connection test failed: {}", e);
        e
    })?;
    let version = service.server_version().await?;

    info!("✓ Connection test successful");
    println!("Connection to {} successful", service.server_name());
    if let Some(line) = version.lines().next() {
        println!("{}", line.trim());
    }

    Ok(())
}
