///
/// This module implements the CLI interface for arche-export: command parsing,
/// argument validation and the async entrypoint.
///
/// All export logic (graph building, the transaction protocol) lives in the
/// [`arche-export-core`] crate. This module only wires files, environment and the
/// HTTP client together.
///
/// ## How To Use
/// - From the shell: `arche-export export --config export.yaml --process process.yaml`
/// - To inspect the graphs without a repository: `arche-export render ... --output dir/`
/// - Programmatically and in tests: call [`run`] with a constructed [`Cli`].
///
/// [`arche-export-core`]: ../../arche-export-core/
use crate::load_config::{load_config, load_process};
use crate::upload::ArcheClient;
use anyhow::Result;
use arche_export_core::synchronise::{export, render};
use clap::{Parser, Subcommand};
use std::path::{Path, PathBuf};

/// CLI for arche-export: publish a digitised process to an ARCHE repository.
#[derive(Parser)]
#[clap(
    name = "arche-export",
    version,
    about = "Export a digitised process as linked resources into an ARCHE repository"
)]
pub struct Cli {
    #[clap(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand)]
pub enum Commands {
    /// Upload the process to the repository in one transaction
    Export {
        /// Path to the YAML export configuration
        #[clap(long)]
        config: PathBuf,
        /// Path to the YAML/JSON process description
        #[clap(long)]
        process: PathBuf,
    },
    /// Write the Turtle graphs of the process to a directory, without uploading
    Render {
        #[clap(long)]
        config: PathBuf,
        #[clap(long)]
        process: PathBuf,
        /// Output directory, created if missing
        #[clap(long)]
        output: PathBuf,
    },
}

/// Async CLI entrypoint for `main()` and integration tests.
pub async fn run(cli: Cli) -> Result<()> {
    tracing::info!("trace_initialised");

    match cli.command {
        Commands::Export { config, process } => {
            let config = load_config(config)?;
            let ctx = load_process(process)?;
            tracing::info!(command = "export", process = %ctx.process_title, "Starting export");
            let client = ArcheClient::new(&config.repository)
                .map_err(|e| anyhow::anyhow!("Failed to construct repository client: {e}"))?;
            match export(&ctx, &config, &client).await {
                Ok(report) => {
                    tracing::info!(
                        command = "export",
                        transaction_id = report.transaction_id,
                        resources = report.resources.len(),
                        created = report.created(),
                        updated = report.updated(),
                        "Export complete"
                    );
                    println!("{}", serde_json::to_string_pretty(&report)?);
                    Ok(())
                }
                Err(e) => {
                    tracing::error!(
                        command = "export",
                        input_error = e.is_input_error(),
                        error = %e,
                        "Export failed"
                    );
                    Err(anyhow::Error::new(e))
                }
            }
        }
        Commands::Render {
            config,
            process,
            output,
        } => {
            let config = load_config(config)?;
            let ctx = load_process(process)?;
            tracing::info!(command = "render", process = %ctx.process_title, "Rendering graphs");
            let documents = render(&ctx, &config)?;
            write_documents(&output, &documents).await?;
            tracing::info!(
                command = "render",
                documents = documents.len(),
                output = ?output,
                "Render complete"
            );
            Ok(())
        }
    }
}

/// One `NNN.ttl` file per graph, numbered in upload order.
async fn write_documents(output: &Path, documents: &[(String, String)]) -> Result<()> {
    tokio::fs::create_dir_all(output).await?;
    for (index, (identifier, turtle)) in documents.iter().enumerate() {
        let path = output.join(format!("{:03}.ttl", index + 1));
        tracing::debug!(identifier = %identifier, path = ?path, "Writing graph");
        tokio::fs::write(&path, turtle).await?;
    }
    Ok(())
}
